// INSERT statement construction for bulk loads

use super::inference::{classify, ColumnCategory};
use crate::models::{Dialect, TabularDataset};

/// Bind parameter limit per statement for MySQL and PostgreSQL wire protocols
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Table a bulk load appends to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTarget {
    pub dialect: Dialect,
    pub schema: String,
    pub table: String,
    pub columns: Vec<String>,
    /// Category of each column over the whole dataset, in column order
    pub categories: Vec<ColumnCategory>,
}

impl InsertTarget {
    pub fn for_dataset(
        dialect: Dialect,
        schema: impl Into<String>,
        table: impl Into<String>,
        dataset: &TabularDataset,
    ) -> Self {
        Self {
            dialect,
            schema: schema.into(),
            table: table.into(),
            columns: dataset.column_names(),
            categories: dataset
                .columns()
                .iter()
                .map(|column| classify(&column.values))
                .collect(),
        }
    }

    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Rows per statement: the requested chunk size, capped by the bind parameter limit
    pub fn rows_per_statement(&self, chunk_size: usize) -> usize {
        let width = self.columns.len().max(1);
        let chunk_size = chunk_size.max(1);
        match self.dialect {
            Dialect::MySql | Dialect::PostgreSql => chunk_size.min(MAX_BIND_PARAMS / width).max(1),
            // Oracle binds one row per statement and batches rows client-side
            Dialect::Oracle => chunk_size,
        }
    }

    /// Parameterized INSERT for `rows` rows.
    ///
    /// MySQL and PostgreSQL get one multi-row VALUES list; Oracle always gets the single
    /// row form used for array binding.
    pub fn insert_sql(&self, rows: usize) -> String {
        let width = self.columns.len();
        let values = match self.dialect {
            Dialect::MySql => {
                let row = format!("({})", vec!["?"; width].join(", "));
                vec![row; rows.max(1)].join(", ")
            }
            Dialect::PostgreSql => (0..rows.max(1))
                .map(|r| {
                    let params: Vec<String> =
                        (1..=width).map(|c| format!("${}", r * width + c)).collect();
                    format!("({})", params.join(", "))
                })
                .collect::<Vec<_>>()
                .join(", "),
            Dialect::Oracle => {
                let params: Vec<String> = (1..=width).map(|c| format!(":{}", c)).collect();
                format!("({})", params.join(", "))
            }
        };

        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.qualified_table(),
            self.columns.join(", "),
            values
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::{CellValue, DatasetColumn};

    fn target(dialect: Dialect, width: usize) -> InsertTarget {
        InsertTarget {
            dialect,
            schema: "s".to_string(),
            table: "t".to_string(),
            columns: (0..width).map(|i| format!("c{}", i)).collect(),
            categories: vec![ColumnCategory::Empty; width],
        }
    }

    #[test]
    fn test_mysql_multi_row() {
        let sql = target(Dialect::MySql, 2).insert_sql(2);
        assert_eq!(sql, "INSERT INTO s.t (c0, c1) VALUES (?, ?), (?, ?)");
    }

    #[test]
    fn test_postgres_numbered_params() {
        let sql = target(Dialect::PostgreSql, 2).insert_sql(2);
        assert_eq!(sql, "INSERT INTO s.t (c0, c1) VALUES ($1, $2), ($3, $4)");
    }

    #[test]
    fn test_oracle_single_row() {
        let sql = target(Dialect::Oracle, 3).insert_sql(50);
        assert_eq!(sql, "INSERT INTO s.t (c0, c1, c2) VALUES (:1, :2, :3)");
    }

    #[test]
    fn test_rows_per_statement_respects_param_limit() {
        assert_eq!(target(Dialect::PostgreSql, 2).rows_per_statement(1000), 1000);
        assert_eq!(target(Dialect::MySql, 100).rows_per_statement(1000), 655);
        assert_eq!(target(Dialect::Oracle, 100).rows_per_statement(1000), 1000);
        assert_eq!(target(Dialect::MySql, 2).rows_per_statement(0), 1);
    }

    #[test]
    fn test_for_dataset_classifies_whole_columns() {
        let dataset = TabularDataset::new(vec![
            DatasetColumn::new("code", vec![CellValue::Int(12345), CellValue::Text("ab".into())]),
            DatasetColumn::new("qty", vec![CellValue::Null, CellValue::Int(4)]),
        ])
        .unwrap();

        let target = InsertTarget::for_dataset(Dialect::Oracle, "S", "T", &dataset);
        assert_eq!(target.columns, vec!["code", "qty"]);
        assert_eq!(
            target.categories,
            vec![
                ColumnCategory::Text { max_len: 5 },
                ColumnCategory::Integer { min: 4, max: 4 }
            ]
        );
    }
}
