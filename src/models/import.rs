use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dataset::TabularDataset;
use crate::api::middleware::AppError;

/// Request to create a table from a dataset and load its rows
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub dataset: TabularDataset,
    pub table_name: String,
    pub schema_name: String,
    pub server_id: i64,
}

/// JSON body of an import request: header row plus row-major values
#[derive(Debug, Clone, Deserialize)]
pub struct ImportPayload {
    pub server_id: i64,
    pub schema_name: String,
    pub table_name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl ImportPayload {
    pub fn into_request(self) -> Result<ImportRequest, AppError> {
        let dataset = TabularDataset::from_json_rows(&self.columns, &self.rows)?;
        Ok(ImportRequest {
            dataset,
            table_name: self.table_name,
            schema_name: self.schema_name,
            server_id: self.server_id,
        })
    }
}

/// JSON body of a preview request
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewPayload {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

/// Column headers, leading rows rendered as text, and the types each dialect would get
#[derive(Debug, Clone, Serialize)]
pub struct DatasetPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub inferred_types: Vec<InferredColumn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InferredColumn {
    pub name: String,
    pub mysql: String,
    pub postgresql: String,
    pub oracle: String,
}
