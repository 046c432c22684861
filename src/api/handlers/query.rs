use axum::{extract::State, Json};

use crate::api::middleware::AppError;
use crate::api::routes::AppState;
use crate::models::{QueryResult, SendQueryRequest};

/// Execute a SQL statement on one server.
///
/// Driver errors and timeouts are reported inside the result with status `error`; only
/// malformed requests are rejected.
pub async fn execute_query(
    State(state): State<AppState>,
    Json(payload): Json<SendQueryRequest>,
) -> Result<Json<QueryResult>, AppError> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("SQL query cannot be empty".to_string()));
    }

    tracing::info!("Executing SQL query on server {}", payload.server_id);
    let request = SendQueryRequest {
        server_id: payload.server_id,
        query: query.to_string(),
    };
    Ok(Json(state.queries.run_query(request).await))
}
