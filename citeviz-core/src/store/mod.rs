//! Tabular store: the papers, authors, and timeline relations held in memory.
//!
//! Relations are loaded once from a [`RelationSource`] and never mutated.
//! Every query derives a new [`Relation`]. Missing relations are not errors;
//! they simply produce empty results downstream.

pub mod aggregate;
pub mod filter;
pub mod relation;
pub mod source;

pub use aggregate::{COUNT_COLUMN, VALUE_COLUMN, group_by};
pub use filter::{Filter, apply_filters};
pub use relation::Relation;
pub use source::{CsvDirectorySource, MemorySource, RelationName, RelationSource};

use crate::error::StoreError;
use crate::plan::{Entity, Measure, SortOrder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Parameters of a grouped, filtered, aggregated relation query.
#[derive(Debug, Clone, Default)]
pub struct RelationQuery<'a> {
    pub groupby: Option<&'a str>,
    pub measure: Measure,
    pub aggregation_field: Option<&'a str>,
    pub filters: Option<&'a Map<String, Value>>,
    pub limit: Option<usize>,
    pub sort: SortOrder,
}

/// Headline facts about the loaded data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    pub papers_count: usize,
    pub authors_count: usize,
    pub year_range: Option<[i64; 2]>,
    pub available_fields: Vec<String>,
}

/// The three in-memory relations.
#[derive(Debug, Clone, Default)]
pub struct TabularStore {
    papers: Option<Relation>,
    authors: Option<Relation>,
    timeline: Option<Relation>,
}

impl TabularStore {
    /// Load every relation the source has. A relation that is missing or
    /// fails to load is left unset; the others still load.
    pub async fn load(source: &dyn RelationSource) -> Self {
        let mut store = Self::default();
        for name in RelationName::ALL {
            let loaded = match source.read(name).await {
                Ok(Some(relation)) => {
                    info!(
                        relation = %name,
                        rows = relation.len(),
                        source = %source.describe(),
                        "Loaded relation"
                    );
                    Some(relation)
                }
                Ok(None) => {
                    warn!(relation = %name, source = %source.describe(), "Relation not found");
                    None
                }
                Err(e) => {
                    warn!(relation = %name, error = %e, "Failed to load relation");
                    None
                }
            };
            store.set(name, loaded);
        }
        store
    }

    pub fn from_relations(
        papers: Option<Relation>,
        authors: Option<Relation>,
        timeline: Option<Relation>,
    ) -> Self {
        Self {
            papers,
            authors,
            timeline,
        }
    }

    fn set(&mut self, name: RelationName, relation: Option<Relation>) {
        match name {
            RelationName::Papers => self.papers = relation,
            RelationName::Authors => self.authors = relation,
            RelationName::Timeline => self.timeline = relation,
        }
    }

    pub fn papers(&self) -> Option<&Relation> {
        self.papers.as_ref()
    }

    pub fn authors(&self) -> Option<&Relation> {
        self.authors.as_ref()
    }

    /// The relation backing an entity.
    pub fn relation(&self, entity: Entity) -> Option<&Relation> {
        match entity {
            Entity::Papers => self.papers(),
            Entity::Authors => self.authors(),
        }
    }

    /// Filter, group, sort, and truncate the papers relation.
    ///
    /// Fails only on a malformed threshold filter.
    pub fn query_papers(&self, query: &RelationQuery<'_>) -> Result<Relation, StoreError> {
        let Some(papers) = &self.papers else {
            return Ok(Relation::empty());
        };
        let filtered = match query.filters {
            Some(filters) if !filters.is_empty() => apply_filters(papers, filters)?,
            _ => papers.clone(),
        };
        let grouped = match query.groupby {
            Some(key) if filtered.has_column(key) => {
                group_by(&filtered, key, query.measure, query.aggregation_field)
            }
            _ => filtered,
        };
        Ok(sort_and_limit(grouped, query))
    }

    /// Group or rank the authors relation. Filters are not applied.
    ///
    /// With an `aggregation_field` present in the relation, the result is
    /// the `name` column and that field projected onto `{name, value}`.
    pub fn query_authors(&self, query: &RelationQuery<'_>) -> Relation {
        let Some(authors) = &self.authors else {
            return Relation::empty();
        };
        if let Some(field) = query.aggregation_field
            && authors.has_column(field)
            && authors.has_column("name")
        {
            let ranked = authors.project(&[("name", "name"), (field, VALUE_COLUMN)]);
            return sort_and_limit(ranked, query);
        }
        let grouped = match query.groupby {
            Some(key) if authors.has_column(key) => {
                group_by(authors, key, query.measure, query.aggregation_field)
            }
            _ => authors.clone(),
        };
        sort_and_limit(grouped, query)
    }

    /// The explicit timeline if loaded, otherwise papers counted per year
    /// as `[year, paper_count]`, otherwise empty.
    pub fn timeline(&self) -> Relation {
        if let Some(timeline) = &self.timeline {
            return timeline.clone();
        }
        match &self.papers {
            Some(papers) if papers.has_column("year") => {
                group_by(papers, "year", Measure::Count, None)
                    .rename_column(COUNT_COLUMN, "paper_count")
                    .sort_by_column("year", false)
            }
            _ => Relation::empty(),
        }
    }

    pub fn summary(&self) -> DataSummary {
        let papers_count = self.papers.as_ref().map_or(0, Relation::len);
        let authors_count = self.authors.as_ref().map_or(0, Relation::len);
        let (available_fields, year_range) = match &self.papers {
            Some(papers) if !papers.is_empty() => (papers.columns().to_vec(), year_range(papers)),
            _ => (Vec::new(), None),
        };
        DataSummary {
            papers_count,
            authors_count,
            year_range,
            available_fields,
        }
    }
}

fn sort_and_limit(relation: Relation, query: &RelationQuery<'_>) -> Relation {
    let descending = query.sort.is_descending();
    let sorted = if relation.has_column(COUNT_COLUMN) {
        relation.sort_by_column(COUNT_COLUMN, descending)
    } else if relation.has_column(VALUE_COLUMN) {
        relation.sort_by_column(VALUE_COLUMN, descending)
    } else {
        relation
    };
    match query.limit {
        Some(n) if n > 0 => sorted.head(n),
        _ => sorted,
    }
}

fn year_range(papers: &Relation) -> Option<[i64; 2]> {
    let years = papers
        .column_values("year")?
        .filter_map(relation::as_number)
        .map(|y| y as i64);
    let (min, max) = years.fold(None, |acc: Option<(i64, i64)>, y| match acc {
        Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        None => Some((y, y)),
    })?;
    Some([min, max])
}
