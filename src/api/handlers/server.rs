use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::routes::AppState;
use crate::models::ServerSummary;
use crate::services::{ColumnNameMapper, Transliterator};

/// List configured servers, without credentials
pub async fn list_servers(State(state): State<AppState>) -> Json<Vec<ServerSummary>> {
    tracing::info!("Listing servers");
    Json(state.queries.list_servers())
}

/// Show how a column header would be renamed on import
pub async fn transliterate(Path(text): Path<String>) -> Json<String> {
    Json(Transliterator::new().map_name(&text))
}
