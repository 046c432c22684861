// Oracle adapter
//
// The Oracle driver is blocking, so every call runs on the blocking thread pool. The
// connection travels into the worker and back; if the awaiting future is dropped the
// worker still owns it and closes it when it finishes.
use crate::api::middleware::AppError;
use crate::models::{CellValue, DatabaseServer, Dialect, Row};
use crate::services::database::adapter::{DatabaseAdapter, DatabaseConnection};
use crate::services::schema::{classify, ColumnCategory, InsertTarget};
use chrono::NaiveDateTime;
use oracle::sql_type::{OracleType, ToSql};
use oracle::Connection;
use serde_json::{json, Value};

/// Longest string bound as VARCHAR2; anything longer goes in as a CLOB
const MAX_VARCHAR2_BYTES: usize = 4000;

pub struct OracleAdapter;

#[async_trait::async_trait]
impl DatabaseAdapter for OracleAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    async fn connect(
        &self,
        server: &DatabaseServer,
    ) -> Result<Box<dyn DatabaseConnection>, AppError> {
        let username = server.username.clone();
        let password = server.password.clone();
        let connect_string = server.oracle_connect_string();
        let server_name = server.name.clone();

        tracing::debug!("Opening Oracle connection to {}", server.masked_address());
        let conn = tokio::task::spawn_blocking(move || {
            let mut conn = Connection::connect(&username, &password, &connect_string)?;
            conn.set_autocommit(true);
            Ok::<_, oracle::Error>(conn)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Oracle connect worker failed: {}", e)))?
        .map_err(|e| {
            AppError::Connection(format!(
                "Failed to connect to Oracle server '{}': {}",
                server_name, e
            ))
        })?;

        Ok(Box::new(OracleConnection { conn: Some(conn) }))
    }
}

pub struct OracleConnection {
    conn: Option<Connection>,
}

impl OracleConnection {
    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&mut self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Connection) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| AppError::Connection("Oracle connection is not open".to_string()))?;

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = f(&conn);
            (conn, result)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Oracle worker failed: {}", e)))?;

        self.conn = Some(conn);
        result
    }
}

#[async_trait::async_trait]
impl DatabaseConnection for OracleConnection {
    async fn execute(&mut self, sql: &str) -> Result<Vec<Row>, AppError> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.statement(&sql).build()?;
            if !stmt.is_query() {
                stmt.execute(&[])?;
                return Ok(Vec::new());
            }

            let rows = stmt.query(&[])?;
            let columns: Vec<(String, OracleType)> = rows
                .column_info()
                .iter()
                .map(|c| (c.name().to_string(), c.oracle_type().clone()))
                .collect();

            let mut json_rows = Vec::new();
            for row in rows {
                let row = row?;
                let mut row_obj = Row::new();
                for (idx, (name, oracle_type)) in columns.iter().enumerate() {
                    row_obj.insert(name.clone(), oracle_value_to_json(&row, idx, oracle_type));
                }
                json_rows.push(row_obj);
            }
            Ok(json_rows)
        })
        .await
    }

    async fn insert_rows(
        &mut self,
        target: &InsertTarget,
        rows: &[Vec<&CellValue>],
    ) -> Result<u64, AppError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let sql = target.insert_sql(1);
        let batch_size = target.rows_per_statement(rows.len());

        // An array batch keeps one bind type per column, so every cell is converted to
        // its column's type rather than its own
        let kinds: Vec<BindKind> = (0..target.columns.len())
            .map(|idx| bind_kind(target, rows, idx))
            .collect();
        let params = rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| cell_to_param(cell, *kind))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let table = target.qualified_table();

        self.with_conn(move |conn| {
            let mut batch = conn.batch(&sql, batch_size).build()?;
            for (idx, kind) in kinds.iter().enumerate() {
                batch.set_type(idx + 1, &kind.oracle_type())?;
            }
            for row in &params {
                let refs: Vec<&dyn ToSql> = row.iter().map(|p| p.as_ref() as &dyn ToSql).collect();
                batch.append_row(&refs)?;
            }
            batch
                .execute()
                .map_err(|e| AppError::Database(format!("Insert into {} failed: {}", table, e)))?;
            Ok(params.len() as u64)
        })
        .await
    }

    async fn close(self: Box<Self>) -> Result<(), AppError> {
        let OracleConnection { conn } = *self;
        match conn {
            Some(conn) => tokio::task::spawn_blocking(move || conn.close())
                .await
                .map_err(|e| AppError::Internal(format!("Oracle close worker failed: {}", e)))?
                .map_err(|e| {
                    AppError::Connection(format!("Failed to close Oracle connection: {}", e))
                }),
            None => Ok(()),
        }
    }
}

fn oracle_value_to_json(row: &oracle::Row, idx: usize, oracle_type: &OracleType) -> Value {
    match oracle_type {
        OracleType::Number(precision, 0) if *precision > 0 && *precision <= 18 => row
            .get::<usize, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        OracleType::Int64 => row
            .get::<usize, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        OracleType::Number(..)
        | OracleType::Float(_)
        | OracleType::BinaryDouble
        | OracleType::BinaryFloat => row
            .get::<usize, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        _ => match row.get::<usize, Option<String>>(idx) {
            Ok(Some(v)) => json!(v),
            Ok(None) => Value::Null,
            Err(_) => json!(format!("<{}>", oracle_type)),
        },
    }
}

/// Oracle bind type of one insert column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindKind {
    Integer,
    Float,
    DateTime,
    /// Longest rendered value in the batch, in bytes
    Text(usize),
}

impl BindKind {
    fn oracle_type(self) -> OracleType {
        match self {
            BindKind::Integer => OracleType::Int64,
            BindKind::Float => OracleType::BinaryDouble,
            BindKind::DateTime => OracleType::Timestamp(6),
            BindKind::Text(len) if len > MAX_VARCHAR2_BYTES => OracleType::CLOB,
            BindKind::Text(len) => OracleType::Varchar2(len.max(1) as u32),
        }
    }
}

/// Bind kind for column `idx`, from the dataset-wide category when the target carries
/// one and from this batch otherwise
fn bind_kind(target: &InsertTarget, rows: &[Vec<&CellValue>], idx: usize) -> BindKind {
    let cells: Vec<&CellValue> = rows.iter().filter_map(|row| row.get(idx).copied()).collect();
    let category = target.categories.get(idx).copied().unwrap_or_else(|| {
        let values: Vec<CellValue> = cells.iter().map(|cell| (*cell).clone()).collect();
        classify(&values)
    });

    match category {
        // NUMBER(1) for booleans
        ColumnCategory::Integer { .. } | ColumnCategory::Boolean => BindKind::Integer,
        ColumnCategory::Float => BindKind::Float,
        ColumnCategory::DateTime => BindKind::DateTime,
        ColumnCategory::Empty | ColumnCategory::Text { .. } => {
            BindKind::Text(cells.iter().map(|c| c.to_string().len()).max().unwrap_or(0))
        }
    }
}

fn mismatch(cell: &CellValue, kind: BindKind) -> AppError {
    AppError::Validation(format!(
        "Value '{}' cannot be bound as {:?}",
        cell,
        kind.oracle_type()
    ))
}

fn cell_to_param(cell: &CellValue, kind: BindKind) -> Result<Box<dyn ToSql + Send>, AppError> {
    let param: Box<dyn ToSql + Send> = match kind {
        BindKind::Integer => Box::new(match cell {
            CellValue::Null => None,
            CellValue::Int(i) => Some(*i),
            CellValue::Bool(b) => Some(i64::from(*b)),
            _ => return Err(mismatch(cell, kind)),
        }),
        BindKind::Float => Box::new(match cell {
            CellValue::Null => None,
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => return Err(mismatch(cell, kind)),
        }),
        BindKind::DateTime => Box::new(match cell {
            CellValue::Null => None::<NaiveDateTime>,
            CellValue::DateTime(dt) => Some(*dt),
            _ => return Err(mismatch(cell, kind)),
        }),
        BindKind::Text(_) => Box::new(match cell {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }),
    };
    Ok(param)
}
