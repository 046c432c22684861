use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One result row: column name to value, in the order the server returned the columns
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Success,
    Error,
}

/// Outcome of one dispatcher, query or import operation.
///
/// Only built through [`QueryResult::success`] and [`QueryResult::failed`], so an error
/// message never travels with a success status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub server: String,
    pub status: QueryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Vec<Row>,
    /// Elapsed seconds, rounded to milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

impl QueryResult {
    pub fn success(server: impl Into<String>, data: Vec<Row>, elapsed: Duration) -> Self {
        Self {
            server: server.into(),
            status: QueryStatus::Success,
            message: None,
            data,
            time: Some(round_secs(elapsed)),
        }
    }

    pub fn failed(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            status: QueryStatus::Error,
            message: Some(message.into()),
            data: Vec::new(),
            time: None,
        }
    }

    /// Attach an informational note to a success result. Error results keep their message.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        if self.is_success() {
            self.message = Some(note.into());
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }
}

fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}

/// Ad-hoc query request
#[derive(Debug, Clone, Deserialize)]
pub struct SendQueryRequest {
    pub server_id: i64,
    pub query: String,
}
