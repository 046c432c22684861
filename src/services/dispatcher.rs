// Query dispatcher
//
// Runs one operation against one server under a process-wide concurrency bound and a
// deadline. Every operation executes in its own task which owns the semaphore permit and
// the connection. The caller waits on that task with a timeout; if the deadline passes
// (or the caller goes away) the task is told to abandon its work, closes the connection,
// and only then gives the permit back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, OwnedSemaphorePermit, Semaphore};
use tracing::Instrument;
use uuid::Uuid;

use crate::api::middleware::AppError;
use crate::models::{DatabaseServer, QueryResult, Row, TabularDataset};
use crate::services::database::{AdapterFactory, DatabaseAdapter, DatabaseConnection};
use crate::services::schema::InsertTarget;

pub const DEFAULT_MAX_CONCURRENT: usize = 10;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Rows to append to an existing table
#[derive(Debug, Clone)]
pub struct BulkLoad {
    pub target: InsertTarget,
    pub dataset: Arc<TabularDataset>,
    pub chunk_size: usize,
}

enum Operation {
    Query(String),
    Load(BulkLoad),
}

impl Operation {
    fn kind(&self) -> &'static str {
        match self {
            Operation::Query(_) => "query",
            Operation::Load(_) => "bulk load",
        }
    }
}

enum Outcome {
    Rows(Vec<Row>),
    Inserted(u64),
}

pub struct QueryDispatcher {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    query_timeout: Duration,
    load_timeout: Duration,
    adapters: Arc<dyn AdapterFactory>,
}

impl QueryDispatcher {
    pub fn new(
        max_concurrent: usize,
        query_timeout: Duration,
        adapters: Arc<dyn AdapterFactory>,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            query_timeout,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            adapters,
        }
    }

    pub fn with_load_timeout(mut self, load_timeout: Duration) -> Self {
        self.load_timeout = load_timeout;
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Operations currently holding a permit, including ones still closing their
    /// connection after a timeout
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    /// Execute one statement. Never fails: errors and timeouts come back as error results.
    pub async fn run(&self, server: &DatabaseServer, query: &str) -> QueryResult {
        let operation = Operation::Query(query.to_string());
        match self.dispatch(server, operation, self.query_timeout).await {
            Ok((Outcome::Rows(rows), elapsed)) => {
                tracing::info!(
                    "Query on '{}' returned {} rows in {:?}",
                    server.name,
                    rows.len(),
                    elapsed
                );
                QueryResult::success(server.name.clone(), rows, elapsed)
            }
            Ok((Outcome::Inserted(_), _)) => QueryResult::failed(
                server.name.clone(),
                "Unexpected outcome for a query operation",
            ),
            Err(e) => failed(server, e),
        }
    }

    /// Append a dataset to a table in chunks, on one connection
    pub async fn load(&self, server: &DatabaseServer, load: BulkLoad) -> QueryResult {
        let table = load.target.qualified_table();
        match self.dispatch(server, Operation::Load(load), self.load_timeout).await {
            Ok((Outcome::Inserted(count), elapsed)) => {
                tracing::info!(
                    "Loaded {} rows into {} on '{}' in {:?}",
                    count,
                    table,
                    server.name,
                    elapsed
                );
                QueryResult::success(server.name.clone(), Vec::new(), elapsed)
                    .with_note(format!("Inserted {} rows into {}", count, table))
            }
            Ok((Outcome::Rows(_), _)) => QueryResult::failed(
                server.name.clone(),
                "Unexpected outcome for a bulk load operation",
            ),
            Err(e) => failed(server, e),
        }
    }

    async fn dispatch(
        &self,
        server: &DatabaseServer,
        operation: Operation,
        timeout: Duration,
    ) -> Result<(Outcome, Duration), AppError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("Dispatcher is shut down".to_string()))?;

        let operation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            op = %operation_id,
            server = %server.name,
            dialect = %server.dialect
        );
        tracing::debug!(parent: &span, "Dispatching {}", operation.kind());

        let adapter = self.adapters.adapter_for(server.dialect);
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let started = Instant::now();

        let mut task = tokio::spawn(
            run_operation(adapter, server.clone(), operation, cancel_rx, permit).instrument(span),
        );

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(Some(result))) => result.map(|outcome| (outcome, started.elapsed())),
            Ok(Ok(None)) => Err(AppError::Internal("Operation was cancelled".to_string())),
            Ok(Err(join_error)) => Err(AppError::Internal(format!(
                "Operation task failed: {}",
                join_error
            ))),
            Err(_) => {
                // The task keeps running only long enough to close its connection
                let _ = cancel_tx.send(());
                Err(AppError::Timeout(timeout))
            }
        }
    }
}

fn failed(server: &DatabaseServer, error: AppError) -> QueryResult {
    let message = error.to_string();
    tracing::error!("Server '{}' returned an error: {}", server.name, message);
    QueryResult::failed(server.name.clone(), message)
}

/// Body of the per-operation task. Returns `None` when cancelled.
async fn run_operation(
    adapter: Arc<dyn DatabaseAdapter>,
    server: DatabaseServer,
    operation: Operation,
    mut cancel_rx: oneshot::Receiver<()>,
    _permit: OwnedSemaphorePermit,
) -> Option<Result<Outcome, AppError>> {
    let mut connection: Option<Box<dyn DatabaseConnection>> = None;

    let outcome = {
        let work = perform(adapter.as_ref(), &server, &operation, &mut connection);
        tokio::select! {
            result = work => Some(result),
            _ = &mut cancel_rx => None,
        }
    };

    if outcome.is_none() {
        tracing::warn!("Abandoning {} on '{}' after timeout", operation.kind(), server.name);
        if let Some(conn) = connection.as_mut() {
            if let Err(e) = conn.cancel().await {
                tracing::warn!("Failed to cancel statement on '{}': {}", server.name, e);
            }
        }
    }

    if let Some(conn) = connection.take() {
        if let Err(e) = conn.close().await {
            tracing::warn!("Failed to close connection to '{}': {}", server.name, e);
        }
    }

    outcome
}

async fn perform(
    adapter: &dyn DatabaseAdapter,
    server: &DatabaseServer,
    operation: &Operation,
    slot: &mut Option<Box<dyn DatabaseConnection>>,
) -> Result<Outcome, AppError> {
    let conn = slot.insert(adapter.connect(server).await?);

    match operation {
        Operation::Query(sql) => {
            tracing::debug!("Executing: {}", sql);
            conn.execute(sql).await.map(Outcome::Rows)
        }
        Operation::Load(load) => {
            let chunk_size = load.chunk_size.max(1);
            let total_rows = load.dataset.row_count();
            let mut inserted = 0u64;
            let mut start = 0usize;

            while start < total_rows {
                let rows = load.dataset.rows(start, chunk_size);
                inserted += conn.insert_rows(&load.target, &rows).await?;
                start += chunk_size;
            }
            Ok(Outcome::Inserted(inserted))
        }
    }
}
