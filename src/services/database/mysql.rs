// MySQL adapter: one connection per operation, no pooling
use crate::api::middleware::AppError;
use crate::models::{CellValue, DatabaseServer, Dialect, Row};
use crate::services::database::adapter::{DatabaseAdapter, DatabaseConnection};
use crate::services::schema::InsertTarget;
use chrono::{Datelike, Timelike};
use mysql_async::{prelude::*, Conn, Opts, Params, Row as MySqlRow, Value as MySqlValue};
use serde_json::{json, Value};

pub struct MySQLAdapter;

#[async_trait::async_trait]
impl DatabaseAdapter for MySQLAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn connect(
        &self,
        server: &DatabaseServer,
    ) -> Result<Box<dyn DatabaseConnection>, AppError> {
        let url = server.connection_url()?;
        let opts = Opts::from_url(&url)
            .map_err(|e| AppError::Config(format!("Invalid MySQL URL: {}", e)))?;

        tracing::debug!("Opening MySQL connection to {}", server.masked_address());
        let conn = Conn::new(opts).await.map_err(|e| {
            AppError::Connection(format!(
                "Failed to connect to MySQL server '{}': {}",
                server.name, e
            ))
        })?;

        Ok(Box::new(MySQLConnection { conn }))
    }
}

pub struct MySQLConnection {
    conn: Conn,
}

#[async_trait::async_trait]
impl DatabaseConnection for MySQLConnection {
    async fn execute(&mut self, sql: &str) -> Result<Vec<Row>, AppError> {
        let rows: Vec<MySqlRow> = self
            .conn
            .query(sql)
            .await
            .map_err(|e| AppError::Database(format!("Query execution failed: {}", e)))?;

        // Convert rows to JSON
        let mut json_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let mut row_obj = Row::new();
            let columns = row.columns_ref();

            for (idx, column) in columns.iter().enumerate() {
                let column_name = column.name_str();
                let value: Value = match row.get_opt::<MySqlValue, usize>(idx) {
                    Some(Ok(mysql_val)) => mysql_value_to_json(mysql_val),
                    Some(Err(_)) => Value::Null,
                    None => Value::Null,
                };
                row_obj.insert(column_name.to_string(), value);
            }
            json_rows.push(row_obj);
        }

        Ok(json_rows)
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
            let params: Vec<MySqlValue> = chunk
                .iter()
                .flat_map(|row| row.iter().map(|cell| cell_to_mysql_value(cell)))
                .collect();

            self.conn
                .exec_drop(sql.as_str(), Params::Positional(params))
                .await
                .map_err(|e| {
                    AppError::Database(format!(
                        "Insert into {} failed: {}",
                        target.qualified_table(),
                        e
                    ))
                })?;
            inserted += self.conn.affected_rows();
        }

        Ok(inserted)
    }

    async fn close(self: Box<Self>) -> Result<(), AppError> {
        self.conn
            .disconnect()
            .await
            .map_err(|e| AppError::Connection(format!("Failed to close MySQL connection: {}", e)))
    }
}

/// Helper function to convert MySQL Value to JSON Value
fn mysql_value_to_json(mysql_val: MySqlValue) -> Value {
    match mysql_val {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Bytes(bytes) => {
            // Try to convert to UTF-8 string
            match String::from_utf8(bytes) {
                Ok(s) => json!(s),
                Err(_) => Value::Null,
            }
        }
        MySqlValue::Int(i) => json!(i),
        MySqlValue::UInt(u) => json!(u),
        MySqlValue::Float(f) => json!(f),
        MySqlValue::Double(d) => json!(d),
        MySqlValue::Date(y, m, d, h, min, s, _) => {
            json!(format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, m, d, h, min, s))
        }
        MySqlValue::Time(is_neg, d, h, m, s, _) => {
            let sign = if is_neg { "-" } else { "" };
            let total_hours = d * 24 + h as u32;
            json!(format!("{}{}:{:02}:{:02}", sign, total_hours, m, s))
        }
    }
}

fn cell_to_mysql_value(cell: &CellValue) -> MySqlValue {
    match cell {
        CellValue::Null => MySqlValue::NULL,
        CellValue::Int(i) => MySqlValue::Int(*i),
        CellValue::Float(f) => MySqlValue::Double(*f),
        CellValue::Bool(b) => MySqlValue::Int(i64::from(*b)),
        CellValue::DateTime(dt) => MySqlValue::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1_000,
        ),
        CellValue::Text(s) => MySqlValue::Bytes(s.clone().into_bytes()),
    }
}
