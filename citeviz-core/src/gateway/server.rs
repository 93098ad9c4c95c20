//! HTTP gateway server built on axum.

use super::{GatewayConfig, example_queries};
use crate::pipeline::{Answer, Pipeline};
use crate::plan::QueryPlan;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Thread-safe shared gateway reference for axum handlers.
pub type SharedGateway = Arc<GatewayState>;

/// State shared by every request. Nothing in it is mutated after startup.
pub struct GatewayState {
    pipeline: Pipeline,
    config: GatewayConfig,
    started_at: chrono::DateTime<Utc>,
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("config", &self.config)
            .field("translator", &self.pipeline.translator_kind())
            .finish()
    }
}

impl GatewayState {
    pub fn new(pipeline: Pipeline, config: GatewayConfig) -> Self {
        Self {
            pipeline,
            config,
            started_at: Utc::now(),
        }
    }

    pub fn shared(self) -> SharedGateway {
        Arc::new(self)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Uptime in seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_seconds().max(0) as u64
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    query: String,
}

#[derive(Serialize)]
struct ChatResponse<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
    #[serde(flatten)]
    answer: &'a Answer,
    success: bool,
}

/// Build the axum router.
pub fn router(shared: SharedGateway) -> Router {
    let cors = if shared.config.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/data/summary", get(summary_handler))
        .route("/api/examples", get(examples_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = json!({
        "error": message.into(),
        "success": false,
    });
    (status, Json(body)).into_response()
}

/// Health check endpoint.
async fn health_handler(State(gw): State<SharedGateway>) -> impl IntoResponse {
    let summary = gw.pipeline.store().summary();
    Json(json!({
        "status": "ok",
        "translator": gw.pipeline.translator_kind(),
        "data": {
            "papers_loaded": summary.papers_count,
            "authors_loaded": summary.authors_count,
        },
        "uptime_secs": gw.uptime_secs(),
    }))
}

/// Translate a question, run it, and return data, chart, and explanation.
async fn chat_handler(
    State(gw): State<SharedGateway>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let query = request.query.trim();
    if query.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Query is required");
    }

    let timeout = Duration::from_secs(gw.config.request_timeout_secs);
    match tokio::time::timeout(timeout, gw.pipeline.ask(query)).await {
        Ok(Ok(answer)) => {
            info!(records = answer.data.len(), "Response ready");
            Json(ChatResponse {
                query: Some(query),
                answer: &answer,
                success: true,
            })
            .into_response()
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to process query");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "Query timed out");
            error_response(StatusCode::GATEWAY_TIMEOUT, "Request timed out")
        }
    }
}

/// Run a caller-supplied query plan.
async fn analyze_handler(
    State(gw): State<SharedGateway>,
    payload: Result<Json<QueryPlan>, JsonRejection>,
) -> Response {
    let plan = match payload {
        Ok(Json(plan)) => plan,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let answer = gw.pipeline.analyze(plan);
    Json(ChatResponse {
        query: None,
        answer: &answer,
        success: true,
    })
    .into_response()
}

async fn summary_handler(State(gw): State<SharedGateway>) -> impl IntoResponse {
    Json(gw.pipeline.store().summary())
}

async fn examples_handler() -> impl IntoResponse {
    Json(example_queries())
}

/// Start the gateway server on the configured address. Stops on Ctrl-C.
pub async fn run(gw: SharedGateway) -> Result<(), std::io::Error> {
    let addr = format!("{}:{}", gw.config.host, gw.config.port);
    let app = router(gw);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TabularStore;
    use crate::translate::KeywordTranslator;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn shared() -> SharedGateway {
        let pipeline = Pipeline::new(
            Arc::new(TabularStore::default()),
            Arc::new(KeywordTranslator),
        );
        GatewayState::new(pipeline, GatewayConfig::default()).shared()
    }

    #[test]
    fn test_state_construction() {
        let gw = shared();
        assert_eq!(gw.config().port, 5001);
        assert_eq!(gw.pipeline().translator_kind(), "keyword");
    }

    #[tokio::test]
    async fn test_health_route() {
        let app = router(shared());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = router(shared());
        let response = app
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
