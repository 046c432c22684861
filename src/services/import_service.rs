// Import orchestration
//
// Takes a tabular dataset to a populated table: resolve the server, map and validate
// names, infer column types, run the DDL one statement at a time, then bulk-load the rows.
// Every database step goes through the dispatcher, so imports share the global
// concurrency bound with ad-hoc queries.

use std::sync::Arc;

use serde::Deserialize;

use crate::api::middleware::AppError;
use crate::models::{
    DatabaseServer, DatasetPreview, Dialect, ImportRequest, InferredColumn, QueryResult,
    TabularDataset,
};
use crate::services::dispatcher::{BulkLoad, QueryDispatcher, DEFAULT_CHUNK_SIZE};
use crate::services::query_service::UNKNOWN_SERVER;
use crate::services::schema::{infer_column_type, infer_types, DdlGenerator, InsertTarget};
use crate::services::server_registry::ServerRegistry;
use crate::services::transliteration::ColumnNameMapper;
use crate::validation::IdentifierValidator;

/// Rows shown by a dataset preview
pub const PREVIEW_ROWS: usize = 50;

/// What to do when a DDL statement fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DdlFailurePolicy {
    /// Stop and return the failing statement's result
    #[default]
    FailFast,
    /// Log the failure and carry on with the next statement
    Continue,
}

pub struct ImportService {
    registry: Arc<ServerRegistry>,
    dispatcher: Arc<QueryDispatcher>,
    ddl: DdlGenerator,
    column_mapper: Option<Arc<dyn ColumnNameMapper>>,
    chunk_size: usize,
    ddl_policy: DdlFailurePolicy,
}

impl ImportService {
    pub fn new(
        registry: Arc<ServerRegistry>,
        dispatcher: Arc<QueryDispatcher>,
        ddl: DdlGenerator,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            ddl,
            column_mapper: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            ddl_policy: DdlFailurePolicy::default(),
        }
    }

    pub fn with_column_mapper(mut self, mapper: Arc<dyn ColumnNameMapper>) -> Self {
        self.column_mapper = Some(mapper);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_ddl_policy(mut self, policy: DdlFailurePolicy) -> Self {
        self.ddl_policy = policy;
        self
    }

    /// Create the table and load the dataset. Failures come back as error results.
    ///
    /// The reported time covers the bulk load only, not DDL.
    pub async fn run(&self, request: ImportRequest) -> QueryResult {
        let Some(server) = self.registry.get(request.server_id) else {
            tracing::error!("Import target server {} not found", request.server_id);
            return QueryResult::failed(
                UNKNOWN_SERVER,
                format!("Server {} not found", request.server_id),
            );
        };

        let ImportRequest {
            dataset,
            table_name,
            schema_name,
            ..
        } = request;

        let dataset = match self.prepare(dataset, &schema_name, &table_name, server.dialect) {
            Ok(dataset) => dataset,
            Err(e) => {
                tracing::error!("Import into '{}' rejected: {}", server.name, e);
                return QueryResult::failed(server.name.clone(), e.to_string());
            }
        };

        tracing::info!(
            "Importing {} rows x {} columns into {}.{} on '{}'",
            dataset.row_count(),
            dataset.columns().len(),
            schema_name,
            table_name,
            server.name
        );

        if let Some(failure) = self
            .create_table(server, &schema_name, &table_name, &dataset)
            .await
        {
            return failure;
        }

        let row_count = dataset.row_count();
        let load = BulkLoad {
            target: InsertTarget::for_dataset(server.dialect, schema_name, table_name, &dataset),
            dataset: Arc::new(dataset),
            chunk_size: self.chunk_size,
        };

        let result = self.dispatcher.load(server, load).await;
        if result.is_success() {
            tracing::info!("Import into '{}' completed: {} rows", server.name, row_count);
        }
        result.with_note(format!("Import completed: {} rows", row_count))
    }

    /// Apply the column mapper and validate every identifier for the dialect
    fn prepare(
        &self,
        dataset: TabularDataset,
        schema: &str,
        table: &str,
        dialect: Dialect,
    ) -> Result<TabularDataset, AppError> {
        let dataset = match &self.column_mapper {
            Some(mapper) => {
                let names = dataset
                    .columns()
                    .iter()
                    .map(|c| mapper.map_name(&c.name))
                    .collect();
                dataset.renamed(names)?
            }
            None => dataset,
        };

        IdentifierValidator::validate_import(schema, table, &dataset.column_names(), dialect)?;
        Ok(dataset)
    }

    /// Run the DDL statements in order. Returns the result to report if the import must stop.
    async fn create_table(
        &self,
        server: &DatabaseServer,
        schema: &str,
        table: &str,
        dataset: &TabularDataset,
    ) -> Option<QueryResult> {
        let decisions = infer_types(dataset, server.dialect);
        for decision in &decisions {
            tracing::debug!("Column {} -> {}", decision.column, decision.sql_type);
        }

        let statements = self.ddl.generate(schema, table, server.dialect, &decisions);
        for (idx, statement) in statements.iter().enumerate() {
            let result = self.dispatcher.run(server, statement).await;
            if result.is_success() {
                continue;
            }

            let reason = result.message.clone().unwrap_or_default();
            match self.ddl_policy {
                DdlFailurePolicy::FailFast => {
                    tracing::error!(
                        "DDL statement {} of {} failed on '{}': {}",
                        idx + 1,
                        statements.len(),
                        server.name,
                        reason
                    );
                    return Some(result);
                }
                DdlFailurePolicy::Continue => {
                    tracing::warn!(
                        "DDL statement {} of {} failed on '{}', continuing: {}",
                        idx + 1,
                        statements.len(),
                        server.name,
                        reason
                    );
                }
            }
        }
        None
    }
}

/// Headers, the leading rows as text, and the column types every dialect would get
pub fn preview(dataset: &TabularDataset) -> DatasetPreview {
    let rows = dataset
        .rows(0, PREVIEW_ROWS)
        .into_iter()
        .map(|row| row.into_iter().map(|cell| cell.to_string()).collect())
        .collect();

    let inferred_types = dataset
        .columns()
        .iter()
        .map(|column| InferredColumn {
            name: column.name.clone(),
            mysql: infer_column_type(&column.values, Dialect::MySql),
            postgresql: infer_column_type(&column.values, Dialect::PostgreSql),
            oracle: infer_column_type(&column.values, Dialect::Oracle),
        })
        .collect();

    DatasetPreview {
        headers: dataset.column_names(),
        rows,
        inferred_types,
    }
}
