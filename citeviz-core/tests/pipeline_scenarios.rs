//! End-to-end scenarios from CSV files through the executor and chart
//! templates.

use citeviz_core::{
    CsvDirectorySource, DataConfig, Entity, Intent, KeywordTranslator, NO_DATA_MESSAGE, Pipeline,
    QueryExecutor, QueryPlan, Relation, SortOrder, TabularStore, render,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn store_with_papers(papers: Relation) -> TabularStore {
    TabularStore::from_relations(Some(papers), None, None)
}

fn years(years: &[i64]) -> Relation {
    Relation::new(
        vec!["year".into()],
        years.iter().map(|y| vec![json!(y)]).collect(),
    )
}

#[test]
fn count_by_year_ascending() {
    let store = store_with_papers(years(&[2020, 2020, 2021]));
    let plan = QueryPlan::new(Intent::CountByField, Entity::Papers)
        .with_groupby("year")
        .with_sort(SortOrder::Asc);

    let batch = QueryExecutor::new(&store).execute(&plan).unwrap();
    assert_eq!(batch.category_field(), "category");
    assert_eq!(batch.value_field(), "value");

    let mut pairs: Vec<(i64, i64)> = batch
        .records()
        .iter()
        .map(|r| (r["category"].as_i64().unwrap(), r["value"].as_i64().unwrap()))
        .collect();
    let values: Vec<i64> = pairs.iter().map(|(_, v)| *v).collect();
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    pairs.sort();
    assert_eq!(pairs, vec![(2020, 2), (2021, 1)]);

    let chart = render(&plan, &batch);
    let categories: Vec<&str> = chart
        .data_values()
        .iter()
        .map(|r| r["category"].as_str().unwrap())
        .collect();
    assert!(categories.contains(&"2020"));
    assert!(categories.contains(&"2021"));
    assert_eq!(chart.spec["encoding"]["x"]["field"], "category");
    assert_eq!(chart.spec["encoding"]["y"]["field"], "value");
}

#[test]
fn top_two_cited_papers() {
    let papers = Relation::new(
        vec!["title".into(), "citations_count".into()],
        vec![
            vec![json!("Low"), json!(5)],
            vec![json!("High"), json!(50)],
            vec![json!("Middle"), json!(10)],
        ],
    );
    let store = store_with_papers(papers);
    let plan = QueryPlan::new(Intent::TopRanking, Entity::Papers)
        .with_aggregation_field("citations_count")
        .with_limit(2);

    let batch = QueryExecutor::new(&store).execute(&plan).unwrap();
    let ranked: Vec<(&str, f64)> = batch
        .records()
        .iter()
        .map(|r| (r["name"].as_str().unwrap(), r["value"].as_f64().unwrap()))
        .collect();
    assert_eq!(ranked, vec![("High...", 50.0), ("Middle...", 10.0)]);

    let chart = render(&plan, &batch);
    assert_eq!(chart.spec["encoding"]["x"]["field"], "value");
    assert_eq!(chart.spec["encoding"]["y"]["field"], "name");
}

#[test]
fn empty_store_gives_placeholder_chart() {
    let store = TabularStore::default();
    for intent in [
        Intent::CountByField,
        Intent::TopRanking,
        Intent::TrendAnalysis,
        Intent::Distribution,
        Intent::Comparison,
    ] {
        let plan = QueryPlan::new(intent, Entity::Papers);
        let batch = QueryExecutor::new(&store).execute(&plan).unwrap();
        assert!(batch.is_empty());

        let chart = render(&plan, &batch);
        assert!(chart.is_empty_chart());
        assert_eq!(chart.description, NO_DATA_MESSAGE);
        assert_eq!(chart.spec["encoding"]["text"]["value"], NO_DATA_MESSAGE);
    }
}

#[test]
fn distribution_of_twenty_distinct_values() {
    let papers = Relation::new(
        vec!["citations_count".into()],
        (1..=20).map(|v| vec![json!(v)]).collect(),
    );
    let store = store_with_papers(papers);
    let plan = QueryPlan::new(Intent::Distribution, Entity::Papers)
        .with_aggregation_field("citations_count");

    let batch = QueryExecutor::new(&store).execute(&plan).unwrap();
    assert_eq!(batch.len(), 20);
    assert!(batch.records().iter().all(|r| r["count"] == 1));

    let chart = render(&plan, &batch);
    assert_eq!(chart.description, "Distribution histogram");
    assert_eq!(chart.data_values().len(), 20);
}

#[test]
fn comparison_matches_count_by_field() {
    let store = store_with_papers(years(&[2019, 2020, 2020, 2022]));
    let count = QueryPlan::new(Intent::CountByField, Entity::Papers).with_groupby("year");
    let comparison = QueryPlan {
        intent: Intent::Comparison,
        ..count.clone()
    };
    let executor = QueryExecutor::new(&store);
    assert_eq!(
        executor.execute(&count).unwrap().into_records(),
        executor.execute(&comparison).unwrap().into_records()
    );
}

#[tokio::test]
async fn csv_directory_to_answer() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("citation_nodes.csv"),
        "title,year,field,citations_count\n\
         Paper A,2019,AI,10\n\
         Paper B,2020,AI,\n\
         Paper C,2020,Biology,3\n\
         Paper D,2021,AI,7\n",
    )
    .unwrap();

    let config = DataConfig {
        data_dir: dir.path().to_path_buf(),
        ..DataConfig::default()
    };
    let store = TabularStore::load(&CsvDirectorySource::from_config(&config)).await;
    assert_eq!(store.summary().papers_count, 4);
    assert!(store.authors().is_none());

    let timeline = store.timeline();
    assert_eq!(timeline.columns(), ["year", "paper_count"]);
    assert_eq!(timeline.len(), 3);

    let pipeline = Pipeline::new(Arc::new(store), Arc::new(KeywordTranslator));
    let answer = pipeline.ask("How many papers per field?").await.unwrap();
    assert_eq!(answer.query_plan.groupby.as_deref(), Some("field"));
    assert_eq!(answer.data.len(), 2);
    assert_eq!(answer.data.records()[0]["category"], "AI");
    assert_eq!(answer.data.records()[0]["value"], 3);

    let answer = pipeline.ask("Show the trend of papers over time").await.unwrap();
    let xs: Vec<i64> = answer
        .data
        .records()
        .iter()
        .map(|r| r["x"].as_i64().unwrap())
        .collect();
    assert_eq!(xs, vec![2019, 2020, 2021]);
    assert_eq!(answer.visualization.description, "Trend of y over x");

    let answer = pipeline.ask("Who are the top authors?").await.unwrap();
    assert!(answer.data.is_empty());
    assert_eq!(answer.visualization.description, NO_DATA_MESSAGE);
}
