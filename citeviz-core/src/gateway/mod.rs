//! HTTP gateway exposing the pipeline as a small JSON API.
//!
//! Routes:
//! - `GET /health`
//! - `POST /api/chat` with `{"query": "..."}`
//! - `POST /api/analyze` with a query plan
//! - `GET /api/data/summary`
//! - `GET /api/examples`

pub mod server;

pub use server::{GatewayState, SharedGateway, router, run};

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Upper bound on one `/api/chat` request, translation included.
    pub request_timeout_secs: u64,
    /// Allow any origin, method, and header.
    pub cors_permissive: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            request_timeout_secs: 120,
            cors_permissive: true,
        }
    }
}

/// A themed group of example questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleCategory {
    pub category: String,
    pub queries: Vec<String>,
}

const EXAMPLES: &[(&str, &[&str])] = &[
    (
        "Count & Statistics",
        &[
            "Show me the number of papers by year",
            "How many papers per field?",
            "Count papers by journal",
        ],
    ),
    (
        "Rankings",
        &[
            "Top 10 most cited papers",
            "Top authors by publication count",
            "Most productive years",
        ],
    ),
    (
        "Trends",
        &[
            "Papers trend over the last 5 years",
            "Show publication growth",
            "Citation trend by year",
        ],
    ),
    (
        "Distributions",
        &[
            "Citation count distribution",
            "Patent count distribution",
            "Papers per author distribution",
        ],
    ),
];

/// The example question catalogue served by `/api/examples`.
pub fn example_queries() -> Vec<ExampleCategory> {
    EXAMPLES
        .iter()
        .map(|(category, queries)| ExampleCategory {
            category: category.to_string(),
            queries: queries.iter().map(|q| q.to_string()).collect(),
        })
        .collect()
}
