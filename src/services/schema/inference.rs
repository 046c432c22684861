// Schema inference
//
// Derives one SQL column type per dataset column for a target dialect. Classification
// drops nulls first, then applies the precedence integer > float > boolean > datetime >
// text; the dialect's type table turns the category into a type name.

use serde::Serialize;

use super::type_table::{DialectTypeTable, DEFAULT_TEXT_LENGTH};
use crate::models::{CellValue, Dialect, TabularDataset};

/// Value category of a column after nulls are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnCategory {
    /// Every cell is null (or the column is empty)
    Empty,
    Integer { min: i64, max: i64 },
    Float,
    Boolean,
    DateTime,
    /// Longest serialized value, in characters
    Text { max_len: u64 },
}

/// SQL type chosen for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnTypeDecision {
    pub column: String,
    pub sql_type: String,
}

pub fn classify(values: &[CellValue]) -> ColumnCategory {
    let non_null: Vec<&CellValue> = values.iter().filter(|v| !v.is_null()).collect();
    if non_null.is_empty() {
        return ColumnCategory::Empty;
    }

    let ints: Option<Vec<i64>> = non_null
        .iter()
        .map(|v| match v {
            CellValue::Int(i) => Some(*i),
            _ => None,
        })
        .collect();
    if let Some(ints) = ints {
        let min = ints.iter().copied().min().unwrap_or(0);
        let max = ints.iter().copied().max().unwrap_or(0);
        return ColumnCategory::Integer { min, max };
    }

    if non_null
        .iter()
        .all(|v| matches!(v, CellValue::Int(_) | CellValue::Float(_)))
    {
        return ColumnCategory::Float;
    }
    if non_null.iter().all(|v| matches!(v, CellValue::Bool(_))) {
        return ColumnCategory::Boolean;
    }
    if non_null.iter().all(|v| matches!(v, CellValue::DateTime(_))) {
        return ColumnCategory::DateTime;
    }

    let max_len = non_null
        .iter()
        .map(|v| v.to_string().chars().count() as u64)
        .max()
        .unwrap_or(0);
    ColumnCategory::Text { max_len }
}

/// Type name for a category in a dialect. Total over every (dialect, category) pair.
pub fn sql_type_for(category: ColumnCategory, dialect: Dialect) -> String {
    let table = DialectTypeTable::for_dialect(dialect);
    match category {
        ColumnCategory::Empty => table.text_type(DEFAULT_TEXT_LENGTH),
        ColumnCategory::Integer { min, max } => table.integer_type(min, max).to_string(),
        ColumnCategory::Float => table.float.to_string(),
        ColumnCategory::Boolean => table.boolean.to_string(),
        ColumnCategory::DateTime => table.datetime.to_string(),
        ColumnCategory::Text { max_len } => {
            // Twice the longest value, never a zero-length column
            let length = max_len.saturating_mul(2).max(1);
            table.text_type(length)
        }
    }
}

pub fn infer_column_type(values: &[CellValue], dialect: Dialect) -> String {
    sql_type_for(classify(values), dialect)
}

/// Decisions for every column, in dataset order
pub fn infer_types(dataset: &TabularDataset, dialect: Dialect) -> Vec<ColumnTypeDecision> {
    dataset
        .columns()
        .iter()
        .map(|column| ColumnTypeDecision {
            column: column.name.clone(),
            sql_type: infer_column_type(&column.values, dialect),
        })
        .collect()
}
