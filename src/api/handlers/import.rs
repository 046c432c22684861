use axum::{extract::State, Json};

use crate::api::middleware::AppError;
use crate::api::routes::AppState;
use crate::models::{DatasetPreview, ImportPayload, PreviewPayload, QueryResult, TabularDataset};
use crate::services::import_service;

pub async fn import_data(
    State(state): State<AppState>,
    Json(payload): Json<ImportPayload>,
) -> Result<Json<QueryResult>, AppError> {
    tracing::info!(
        "Importing {} rows into {}.{} on server {}",
        payload.rows.len(),
        payload.schema_name,
        payload.table_name,
        payload.server_id
    );
    let request = payload.into_request()?;
    Ok(Json(state.imports.run(request).await))
}

pub async fn preview_import(
    Json(payload): Json<PreviewPayload>,
) -> Result<Json<DatasetPreview>, AppError> {
    let dataset = TabularDataset::from_json_rows(&payload.columns, &payload.rows)?;
    tracing::info!(
        "Previewing dataset with {} columns and {} rows",
        payload.columns.len(),
        dataset.row_count()
    );
    Ok(Json(import_service::preview(&dataset)))
}
