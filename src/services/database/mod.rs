// Database abstraction layer for multi-dialect support
pub mod adapter;
#[cfg(test)]
pub mod mock;
pub mod mysql;
pub mod oracle;
pub mod postgresql;

pub use adapter::{DatabaseAdapter, DatabaseConnection};
pub use mysql::MySQLAdapter;
pub use oracle::OracleAdapter;
pub use postgresql::PostgreSQLAdapter;

use crate::models::Dialect;
use std::sync::Arc;

/// Factory function to create the adapter for a dialect
pub fn create_adapter(dialect: Dialect) -> Arc<dyn DatabaseAdapter> {
    match dialect {
        Dialect::MySql => Arc::new(MySQLAdapter),
        Dialect::PostgreSql => Arc::new(PostgreSQLAdapter),
        Dialect::Oracle => Arc::new(OracleAdapter),
    }
}

/// Source of adapters for the dispatcher
pub trait AdapterFactory: Send + Sync {
    fn adapter_for(&self, dialect: Dialect) -> Arc<dyn DatabaseAdapter>;
}

/// The real drivers, one adapter per dialect
pub struct NativeAdapters {
    mysql: Arc<dyn DatabaseAdapter>,
    postgresql: Arc<dyn DatabaseAdapter>,
    oracle: Arc<dyn DatabaseAdapter>,
}

impl NativeAdapters {
    pub fn new() -> Self {
        Self {
            mysql: create_adapter(Dialect::MySql),
            postgresql: create_adapter(Dialect::PostgreSql),
            oracle: create_adapter(Dialect::Oracle),
        }
    }
}

impl Default for NativeAdapters {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterFactory for NativeAdapters {
    fn adapter_for(&self, dialect: Dialect) -> Arc<dyn DatabaseAdapter> {
        match dialect {
            Dialect::MySql => self.mysql.clone(),
            Dialect::PostgreSql => self.postgresql.clone(),
            Dialect::Oracle => self.oracle.clone(),
        }
    }
}
