// Tabular dataset model
//
// Columnar representation of an uploaded table: ordered, uniquely named columns, each
// holding the same number of typed, possibly-null cells.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::api::middleware::AppError;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
];

/// A single typed cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Decode a JSON cell. Strings stay text; `TabularDataset::from_json_rows` promotes
    /// whole timestamp columns.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Int(i)
                } else if n.is_u64() {
                    // Beyond i64: keep the exact digits
                    CellValue::Text(n.to_string())
                } else {
                    n.as_f64().map(CellValue::Float).unwrap_or(CellValue::Null)
                }
            }
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    /// JSON form of a stored cell, for the in-memory test adapter
    #[cfg(test)]
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Int(i) => Value::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::DateTime(_) | CellValue::Text(_) => Value::String(self.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Naive timestamps only. Strings carrying a UTC offset do not parse.
fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetColumn {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl DatasetColumn {
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Turn a text column into a datetime column when every non-null value parses as a
    /// timestamp. Columns with any other value are left as they are.
    fn promote_datetimes(&mut self) {
        let parsed: Option<Vec<CellValue>> = self
            .values
            .iter()
            .map(|value| match value {
                CellValue::Null => Some(CellValue::Null),
                CellValue::Text(s) => parse_datetime(s).map(CellValue::DateTime),
                _ => None,
            })
            .collect();

        if let Some(values) = parsed {
            if values.iter().any(|v| !v.is_null()) {
                self.values = values;
            }
        }
    }
}

/// Validated tabular dataset
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    columns: Vec<DatasetColumn>,
    row_count: usize,
}

impl TabularDataset {
    pub fn new(columns: Vec<DatasetColumn>) -> Result<Self, AppError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(AppError::Validation(format!(
                    "Duplicate column name: '{}'",
                    column.name
                )));
            }
        }

        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != row_count) {
            return Err(AppError::Validation(format!(
                "Column '{}' has {} values, expected {}",
                bad.name,
                bad.values.len(),
                row_count
            )));
        }

        Ok(Self { columns, row_count })
    }

    /// Build from a header row and row-major JSON values
    pub fn from_json_rows(headers: &[String], rows: &[Vec<Value>]) -> Result<Self, AppError> {
        let mut columns: Vec<DatasetColumn> = headers
            .iter()
            .map(|h| DatasetColumn::new(h.clone(), Vec::with_capacity(rows.len())))
            .collect();

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(AppError::Validation(format!(
                    "Row {} has {} values, expected {}",
                    idx,
                    row.len(),
                    headers.len()
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(CellValue::from_json(value));
            }
        }

        for column in &mut columns {
            column.promote_datetimes();
        }
        Self::new(columns)
    }

    pub fn columns(&self) -> &[DatasetColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Same data under new column names, in the same order
    pub fn renamed(self, names: Vec<String>) -> Result<Self, AppError> {
        if names.len() != self.columns.len() {
            return Err(AppError::Validation(format!(
                "Expected {} column names, got {}",
                self.columns.len(),
                names.len()
            )));
        }
        let columns = self
            .columns
            .into_iter()
            .zip(names)
            .map(|(column, name)| DatasetColumn::new(name, column.values))
            .collect();
        Self::new(columns)
    }

    /// Row-major view of the rows in `start..start + len`, clamped to the dataset
    pub fn rows(&self, start: usize, len: usize) -> Vec<Vec<&CellValue>> {
        let end = start.saturating_add(len).min(self.row_count);
        (start.min(end)..end)
            .map(|row| self.columns.iter().map(|c| &c.values[row]).collect())
            .collect()
    }
}
