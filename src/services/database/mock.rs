// In-memory adapter for exercising the dispatcher and services without a database
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::middleware::AppError;
use crate::models::{CellValue, DatabaseServer, Dialect, Row};
use crate::services::database::adapter::{DatabaseAdapter, DatabaseConnection};
use crate::services::database::AdapterFactory;
use crate::services::schema::InsertTarget;

#[derive(Default)]
struct MockState {
    connects: AtomicUsize,
    closes: AtomicUsize,
    cancels: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    executed: Mutex<Vec<String>>,
    insert_batches: Mutex<Vec<usize>>,
    tables: Mutex<HashMap<String, Vec<Row>>>,
}

#[derive(Clone)]
pub struct MockAdapter {
    dialect: Dialect,
    delay: Duration,
    fail_on: Option<String>,
    refuse_connections: bool,
    state: Arc<MockState>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            dialect: Dialect::PostgreSql,
            delay: Duration::ZERO,
            fail_on: None,
            refuse_connections: false,
            state: Arc::new(MockState::default()),
        }
    }

    /// Every execute and insert sleeps this long first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Statements containing `needle` fail with a database error. Bulk inserts are
    /// checked as `INSERT INTO schema.table`.
    pub fn fail_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn refuse_connections(mut self) -> Self {
        self.refuse_connections = true;
        self
    }

    pub fn set_table(&self, name: &str, columns: &[&str], rows: Vec<Vec<CellValue>>) {
        let rows = rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(row)
                    .map(|(c, v)| (c.to_string(), v.to_json()))
                    .collect()
            })
            .collect();
        self.lock_tables().insert(name.to_string(), rows);
    }

    pub fn table(&self, name: &str) -> Vec<Row> {
        self.lock_tables().get(name).cloned().unwrap_or_default()
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.state.cancels.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.state.max_active.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.executed.lock().unwrap().clone()
    }

    /// Row counts of each insert_rows call, in order
    pub fn insert_batches(&self) -> Vec<usize> {
        self.state.insert_batches.lock().unwrap().clone()
    }

    fn lock_tables(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Row>>> {
        self.state.tables.lock().unwrap()
    }
}

impl AdapterFactory for MockAdapter {
    fn adapter_for(&self, dialect: Dialect) -> Arc<dyn DatabaseAdapter> {
        let mut adapter = self.clone();
        adapter.dialect = dialect;
        Arc::new(adapter)
    }
}

#[async_trait::async_trait]
impl DatabaseAdapter for MockAdapter {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn connect(
        &self,
        server: &DatabaseServer,
    ) -> Result<Box<dyn DatabaseConnection>, AppError> {
        if self.refuse_connections {
            return Err(AppError::Connection(format!(
                "Connection refused by '{}'",
                server.name
            )));
        }

        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(MockConnection {
            adapter: self.clone(),
        }))
    }
}

struct MockConnection {
    adapter: MockAdapter,
}

impl MockConnection {
    async fn pause(&self) {
        if !self.adapter.delay.is_zero() {
            tokio::time::sleep(self.adapter.delay).await;
        }
    }

    fn check(&self, statement: &str) -> Result<(), AppError> {
        match &self.adapter.fail_on {
            Some(needle) if statement.contains(needle.as_str()) => Err(AppError::Database(
                format!("Mock failure on statement: {}", statement),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl DatabaseConnection for MockConnection {
    async fn execute(&mut self, sql: &str) -> Result<Vec<Row>, AppError> {
        self.pause().await;
        self.adapter.state.executed.lock().unwrap().push(sql.to_string());
        self.check(sql)?;

        let rows = sql
            .trim()
            .strip_prefix("SELECT * FROM ")
            .map(|table| self.adapter.table(table.trim()))
            .unwrap_or_default();
        Ok(rows)
    }

    async fn insert_rows(
        &mut self,
        target: &InsertTarget,
        rows: &[Vec<&CellValue>],
    ) -> Result<u64, AppError> {
        self.pause().await;
        let table = target.qualified_table();
        self.check(&format!("INSERT INTO {}", table))?;

        let converted: Vec<Row> = rows
            .iter()
            .map(|row| {
                target
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(c, v)| (c.clone(), v.to_json()))
                    .collect()
            })
            .collect();

        self.adapter.state.insert_batches.lock().unwrap().push(rows.len());
        self.adapter
            .lock_tables()
            .entry(table)
            .or_default()
            .extend(converted);
        Ok(rows.len() as u64)
    }

    async fn cancel(&mut self) -> Result<(), AppError> {
        self.adapter.state.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), AppError> {
        self.adapter.state.active.fetch_sub(1, Ordering::SeqCst);
        self.adapter.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
