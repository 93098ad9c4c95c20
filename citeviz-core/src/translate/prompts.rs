//! Prompt text sent to the language model when translating a question.

/// System message framing the model as a publication-data assistant.
pub const SYSTEM_MESSAGE: &str = "You help people explore a database of scientific publications. \
You turn questions about research output, citations, and authors into precise structured queries. \
Be exact and never invent fields that are not in the schema.";

const QUERY_PARSER_TEMPLATE: &str = r#"Convert the user's question about a scientific publication database into a query plan.

Schema:
- papers: id, title, year, field, journal, citations_count, patent_count
- authors: id, name, paper_count, collaboration_count
- timeline: year, paper_count

Question: {question}

Reply with one JSON object of this shape:
{
  "intent": "count_by_field | top_ranking | trend_analysis | distribution | comparison",
  "entity": "papers | authors",
  "groupby": "column to group by, e.g. year, field, journal",
  "measure": "count | sum | avg | max | min",
  "aggregation_field": "column to aggregate when measure is not count",
  "filters": {"column": "value, or a threshold such as \">=2019\" or \"<=100\""},
  "limit": 10,
  "sort": "asc | desc"
}

Examples:
Question: "Show me the number of papers by year"
Plan: {"intent": "count_by_field", "entity": "papers", "groupby": "year", "measure": "count", "filters": {}, "sort": "asc"}

Question: "Top 10 most cited papers"
Plan: {"intent": "top_ranking", "entity": "papers", "measure": "max", "aggregation_field": "citations_count", "limit": 10, "sort": "desc"}

Question: "Papers trend over the last 5 years"
Plan: {"intent": "trend_analysis", "entity": "papers", "groupby": "year", "measure": "count", "filters": {"year": ">=2019"}, "sort": "asc"}

Rules:
1. Output only the JSON object, with no commentary.
2. Use column names exactly as they appear in the schema.
3. When the question is ambiguous, pick the most reasonable reading.

Plan:"#;

/// The user prompt for one question.
pub fn query_parser_prompt(question: &str) -> String {
    QUERY_PARSER_TEMPLATE.replace("{question}", question)
}
