//! HTTP surface for question answering.
//!
//! - `POST /query` embeds the question, retrieves the nearest chunks and, when a completion
//!   model is configured, answers from them. Returns `{ "answer", "documents" }`.
//! - `GET /metrics` reports ingestion counters for this process.
//! - `GET /commands` lists the endpoints above for discovery by tools.

use crate::processing::{QueryApi, QueryError, QueryResponse};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the query API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: QueryApi + 'static,
{
    Router::new()
        .route("/query", post(query::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /query` endpoint.
#[derive(Deserialize)]
struct QueryRequest {
    question: String,
}

async fn query<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError>
where
    S: QueryApi,
{
    let response = service.ask(&request.question).await?;
    tracing::info!(
        documents = response.documents.len(),
        answered = !response.answer.is_empty(),
        "Query completed"
    );
    Ok(Json(response))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: QueryApi,
{
    Json(service.metrics_snapshot())
}

#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "query",
                method: "POST",
                path: "/query",
                description: "Retrieve the article chunks closest to a question and answer it from them. Response returns { \"answer\": string, \"documents\": [...] }.",
                request_example: Some(json!({
                    "question": "How do I use local AWS credentials in a React app?"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return ingestion counters (documents indexed, chunks indexed, documents failed).",
                request_example: None,
            },
        ],
    })
}

struct AppError(QueryError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            QueryError::EmptyQuestion => StatusCode::BAD_REQUEST,
            QueryError::Embedding(_) | QueryError::EmptyEmbedding | QueryError::Chat(_) => {
                StatusCode::BAD_GATEWAY
            }
            QueryError::Qdrant(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Query failed");
        }
        (status, self.0.to_string()).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(inner: QueryError) -> Self {
        Self(inner)
    }
}
