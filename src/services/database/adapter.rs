// Database adapter traits for multi-dialect support
use crate::api::middleware::AppError;
use crate::models::{CellValue, DatabaseServer, Dialect, Row};
use crate::services::schema::InsertTarget;

/// Opens ephemeral connections to servers of one dialect
#[async_trait::async_trait]
pub trait DatabaseAdapter: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Open a new connection. Nothing is reused between calls.
    async fn connect(
        &self,
        server: &DatabaseServer,
    ) -> Result<Box<dyn DatabaseConnection>, AppError>;
}

/// A single open connection.
///
/// The owner must call [`DatabaseConnection::close`] exactly once, whatever happened to
/// the statements run on it.
#[async_trait::async_trait]
pub trait DatabaseConnection: Send {
    /// Execute one statement; statements without a result set return no rows
    async fn execute(&mut self, sql: &str) -> Result<Vec<Row>, AppError>;

    /// Append `rows` (row-major, in `target.columns` order) and return the number inserted
    async fn insert_rows(
        &mut self,
        target: &InsertTarget,
        rows: &[Vec<&CellValue>],
    ) -> Result<u64, AppError>;

    /// Ask the server to stop whatever the connection was running when its caller gave
    /// up on it. Called before `close` on abandoned operations only.
    async fn cancel(&mut self) -> Result<(), AppError> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), AppError>;
}
