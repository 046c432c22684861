// PostgreSQL adapter: one connection per operation, no pooling
use crate::api::middleware::AppError;
use crate::models::{CellValue, DatabaseServer, Dialect, Row};
use crate::services::database::adapter::{DatabaseAdapter, DatabaseConnection};
use crate::services::schema::InsertTarget;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls};

pub struct PostgreSQLAdapter;

#[async_trait::async_trait]
impl DatabaseAdapter for PostgreSQLAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    async fn connect(
        &self,
        server: &DatabaseServer,
    ) -> Result<Box<dyn DatabaseConnection>, AppError> {
        let url = server.connection_url()?;

        tracing::debug!("Opening PostgreSQL connection to {}", server.masked_address());
        let (client, connection) = tokio_postgres::connect(&url, NoTls).await.map_err(|e| {
            AppError::Connection(format!(
                "Failed to connect to PostgreSQL server '{}': {}",
                server.name, e
            ))
        })?;

        // The connection object drives the socket; it finishes once the client is dropped
        let server_name = server.name.clone();
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("PostgreSQL connection to '{}' ended with error: {}", server_name, e);
            }
        });

        Ok(Box::new(PostgreSQLConnection { client, driver }))
    }
}

pub struct PostgreSQLConnection {
    client: Client,
    driver: JoinHandle<()>,
}

#[async_trait::async_trait]
impl DatabaseConnection for PostgreSQLConnection {
    async fn execute(&mut self, sql: &str) -> Result<Vec<Row>, AppError> {
        let rows = self.client.query(sql, &[]).await.map_err(|e| {
            let error_details = if let Some(db_error) = e.as_db_error() {
                format!(
                    "Code: {}, Message: {}",
                    db_error.code().code(),
                    db_error.message()
                )
            } else {
                format!("{}", e)
            };
            AppError::Database(format!("Query execution failed: {}", error_details))
        })?;

        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn insert_rows(
        &mut self,
        target: &InsertTarget,
        rows: &[Vec<&CellValue>],
    ) -> Result<u64, AppError> {
        let per_statement = target.rows_per_statement(rows.len());
        let mut inserted = 0u64;

        for chunk in rows.chunks(per_statement) {
            let sql = target.insert_sql(chunk.len());
            let statement = self.client.prepare(&sql).await?;

            // Bind each cell as the type Postgres expects for its column
            let mut params: Vec<Box<dyn ToSql + Sync + Send>> =
                Vec::with_capacity(statement.params().len());
            for (cell, ty) in chunk.iter().flat_map(|row| row.iter()).zip(statement.params()) {
                params.push(cell_to_param(cell, ty)?);
            }
            let refs: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();

            inserted += self.client.execute(&statement, &refs).await?;
        }

        Ok(inserted)
    }

    async fn cancel(&mut self) -> Result<(), AppError> {
        // Without this, dropping the client waits for the running query to finish
        self.client
            .cancel_token()
            .cancel_query(NoTls)
            .await
            .map_err(AppError::from)
    }

    async fn close(self: Box<Self>) -> Result<(), AppError> {
        let PostgreSQLConnection { client, driver } = *self;
        drop(client);
        driver
            .await
            .map_err(|e| AppError::Connection(format!("PostgreSQL connection task failed: {}", e)))
    }
}

/// Convert a PostgreSQL row to a JSON object, keeping column order
fn row_to_json(row: &tokio_postgres::Row) -> Row {
    let mut row_obj = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value: Value = match column.type_().name() {
            "int2" => row
                .try_get::<_, Option<i16>>(idx)
                .ok()
                .flatten()
                .map(|v| json!(v))
                .unwrap_or(Value::Null),
            "int4" => row
                .try_get::<_, Option<i32>>(idx)
                .ok()
                .flatten()
                .map(|v| json!(v))
                .unwrap_or(Value::Null),
            "int8" => row
                .try_get::<_, Option<i64>>(idx)
                .ok()
                .flatten()
                .map(|v| json!(v))
                .unwrap_or(Value::Null),
            "float4" => row
                .try_get::<_, Option<f32>>(idx)
                .ok()
                .flatten()
                .map(|v| json!(v))
                .unwrap_or(Value::Null),
            "float8" => row
                .try_get::<_, Option<f64>>(idx)
                .ok()
                .flatten()
                .map(|v| json!(v))
                .unwrap_or(Value::Null),
            "bool" => row
                .try_get::<_, Option<bool>>(idx)
                .ok()
                .flatten()
                .map(Value::Bool)
                .unwrap_or(Value::Null),
            "timestamp" => row
                .try_get::<_, Option<NaiveDateTime>>(idx)
                .ok()
                .flatten()
                .map(|v| json!(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()))
                .unwrap_or(Value::Null),
            "timestamptz" => row
                .try_get::<_, Option<DateTime<Utc>>>(idx)
                .ok()
                .flatten()
                .map(|v| json!(v.to_rfc3339()))
                .unwrap_or(Value::Null),
            "date" => row
                .try_get::<_, Option<NaiveDate>>(idx)
                .ok()
                .flatten()
                .map(|v| json!(v.to_string()))
                .unwrap_or(Value::Null),
            "json" | "jsonb" => row
                .try_get::<_, Option<Value>>(idx)
                .ok()
                .flatten()
                .unwrap_or(Value::Null),
            _ => match row.try_get::<_, Option<String>>(idx) {
                Ok(Some(v)) => json!(v),
                Ok(None) => Value::Null,
                Err(_) => {
                    // Types without a text mapping (numeric, uuid, arrays, ...)
                    json!(format!("<{}>", column.type_().name()))
                }
            },
        };
        row_obj.insert(column.name().to_string(), value);
    }
    row_obj
}

fn mismatch(cell: &CellValue, ty: &Type) -> AppError {
    AppError::Validation(format!(
        "Value '{}' cannot be stored in a column of type {}",
        cell,
        ty.name()
    ))
}

fn cell_as_i64(cell: &CellValue, ty: &Type) -> Result<Option<i64>, AppError> {
    match cell {
        CellValue::Null => Ok(None),
        CellValue::Int(i) => Ok(Some(*i)),
        CellValue::Bool(b) => Ok(Some(i64::from(*b))),
        CellValue::Text(s) => s.trim().parse().map(Some).map_err(|_| mismatch(cell, ty)),
        _ => Err(mismatch(cell, ty)),
    }
}

fn cell_as_narrow<T: TryFrom<i64>>(cell: &CellValue, ty: &Type) -> Result<Option<T>, AppError> {
    cell_as_i64(cell, ty)?
        .map(|v| T::try_from(v).map_err(|_| mismatch(cell, ty)))
        .transpose()
}

fn cell_as_f64(cell: &CellValue, ty: &Type) -> Result<Option<f64>, AppError> {
    match cell {
        CellValue::Null => Ok(None),
        CellValue::Int(i) => Ok(Some(*i as f64)),
        CellValue::Float(f) => Ok(Some(*f)),
        CellValue::Text(s) => s.trim().parse().map(Some).map_err(|_| mismatch(cell, ty)),
        _ => Err(mismatch(cell, ty)),
    }
}

fn cell_as_bool(cell: &CellValue, ty: &Type) -> Result<Option<bool>, AppError> {
    match cell {
        CellValue::Null => Ok(None),
        CellValue::Bool(b) => Ok(Some(*b)),
        CellValue::Int(0) => Ok(Some(false)),
        CellValue::Int(1) => Ok(Some(true)),
        CellValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(Some(true)),
            "false" | "f" | "0" => Ok(Some(false)),
            _ => Err(mismatch(cell, ty)),
        },
        _ => Err(mismatch(cell, ty)),
    }
}

fn cell_as_datetime(cell: &CellValue, ty: &Type) -> Result<Option<NaiveDateTime>, AppError> {
    match cell {
        CellValue::Null => Ok(None),
        CellValue::DateTime(dt) => Ok(Some(*dt)),
        _ => Err(mismatch(cell, ty)),
    }
}

fn cell_as_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Null => None,
        other => Some(other.to_string()),
    }
}

/// Owned bind parameter for a cell, typed after the prepared statement's parameter
fn cell_to_param(cell: &CellValue, ty: &Type) -> Result<Box<dyn ToSql + Sync + Send>, AppError> {
    let param: Box<dyn ToSql + Sync + Send> = match ty.name() {
        "int2" => Box::new(cell_as_narrow::<i16>(cell, ty)?),
        "int4" => Box::new(cell_as_narrow::<i32>(cell, ty)?),
        "int8" => Box::new(cell_as_i64(cell, ty)?),
        "float4" => Box::new(cell_as_f64(cell, ty)?.map(|f| f as f32)),
        "float8" => Box::new(cell_as_f64(cell, ty)?),
        "bool" => Box::new(cell_as_bool(cell, ty)?),
        "timestamp" => Box::new(cell_as_datetime(cell, ty)?),
        "timestamptz" => Box::new(cell_as_datetime(cell, ty)?.map(|dt| dt.and_utc())),
        "date" => Box::new(cell_as_datetime(cell, ty)?.map(|dt| dt.date())),
        _ => Box::new(cell_as_text(cell)),
    };
    Ok(param)
}
