// DDL generation
//
// Turns column type decisions into the ordered statement list for a dialect. Schema
// creation always comes before table creation. Identifiers are interpolated unquoted, so
// callers validate them first (see `validation::IdentifierValidator`).

use super::inference::ColumnTypeDecision;
use crate::models::Dialect;

/// ORA-01920: user name conflicts with another user or role name
const ORA_USER_EXISTS: i32 = -1920;

/// ORA-00955: name is already used by an existing object
const ORA_NAME_EXISTS: i32 = -955;

#[derive(Debug, Clone)]
pub struct DdlGenerator {
    oracle_schema_password: String,
}

impl DdlGenerator {
    /// `oracle_schema_password` is the password given to Oracle schema owners created
    /// during import.
    pub fn new(oracle_schema_password: impl Into<String>) -> Self {
        Self {
            oracle_schema_password: oracle_schema_password.into(),
        }
    }

    pub fn generate(
        &self,
        schema: &str,
        table: &str,
        dialect: Dialect,
        columns: &[ColumnTypeDecision],
    ) -> Vec<String> {
        let columns_def = column_definitions(columns);

        match dialect {
            Dialect::MySql => vec![
                format!("CREATE DATABASE IF NOT EXISTS {}", schema),
                format!("USE {}", schema),
                // Qualified because every statement runs on its own connection
                format!(
                    "CREATE TABLE IF NOT EXISTS {}.{} ({})",
                    schema, table, columns_def
                ),
            ],
            Dialect::PostgreSql => vec![
                format!("CREATE SCHEMA IF NOT EXISTS {}", schema),
                format!(
                    "CREATE TABLE IF NOT EXISTS {}.{} ({})",
                    schema, table, columns_def
                ),
            ],
            // Oracle has no IF NOT EXISTS; existing users and tables are tolerated
            Dialect::Oracle => vec![
                self.oracle_create_user(schema),
                oracle_ignoring(
                    &format!("CREATE TABLE {}.{} ({})", schema, table, columns_def),
                    ORA_NAME_EXISTS,
                ),
            ],
        }
    }

    fn oracle_create_user(&self, schema: &str) -> String {
        // A quoted password cannot contain '"'
        let password = self.oracle_schema_password.replace('"', "");
        oracle_ignoring(
            &format!("CREATE USER {} IDENTIFIED BY \"{}\"", schema, password),
            ORA_USER_EXISTS,
        )
    }
}

/// PL/SQL block running `statement` dynamically and swallowing only `sqlcode`
fn oracle_ignoring(statement: &str, sqlcode: i32) -> String {
    format!(
        "BEGIN\n    EXECUTE IMMEDIATE '{}';\nEXCEPTION\n    WHEN OTHERS THEN\n        IF SQLCODE != {} THEN\n            RAISE;\n        END IF;\nEND;",
        statement.replace('\'', "''"),
        sqlcode
    )
}

fn column_definitions(columns: &[ColumnTypeDecision]) -> String {
    columns
        .iter()
        .map(|c| format!("{} {}", c.column, c.sql_type))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decisions() -> Vec<ColumnTypeDecision> {
        vec![
            ColumnTypeDecision {
                column: "id".to_string(),
                sql_type: "SMALLINT".to_string(),
            },
            ColumnTypeDecision {
                column: "name".to_string(),
                sql_type: "VARCHAR(2)".to_string(),
            },
        ]
    }

    fn generator() -> DdlGenerator {
        DdlGenerator::new("Secret123")
    }

    #[test]
    fn test_mysql_statements() {
        let sql = generator().generate("sales", "orders", Dialect::MySql, &decisions());
        assert_eq!(sql.len(), 3);
        assert_eq!(sql[0], "CREATE DATABASE IF NOT EXISTS sales");
        assert_eq!(sql[1], "USE sales");
        assert_eq!(
            sql[2],
            "CREATE TABLE IF NOT EXISTS sales.orders (id SMALLINT, name VARCHAR(2))"
        );
    }

    #[test]
    fn test_postgres_statements() {
        let sql = generator().generate("sales", "orders", Dialect::PostgreSql, &decisions());
        assert_eq!(sql.len(), 2);
        assert_eq!(sql[0], "CREATE SCHEMA IF NOT EXISTS sales");
        assert_eq!(
            sql[1],
            "CREATE TABLE IF NOT EXISTS sales.orders (id SMALLINT, name VARCHAR(2))"
        );
    }

    #[test]
    fn test_oracle_statements() {
        let sql = generator().generate("SALES", "ORDERS", Dialect::Oracle, &decisions());
        assert_eq!(sql.len(), 2);
        assert!(sql[0].starts_with("BEGIN"));
        assert!(sql[0].contains("CREATE USER SALES IDENTIFIED BY \"Secret123\""));
        assert!(sql[0].contains("SQLCODE != -1920"));
        assert!(sql[0].trim_end().ends_with("END;"));

        assert!(sql[1].starts_with("BEGIN"));
        assert!(sql[1]
            .contains("EXECUTE IMMEDIATE 'CREATE TABLE SALES.ORDERS (id SMALLINT, name VARCHAR(2))'"));
        assert!(sql[1].contains("SQLCODE != -955"));
        assert!(!sql[1].contains("-1920"));
    }

    #[test]
    fn test_oracle_existing_table_is_tolerated_and_other_errors_raised() {
        let sql = generator().generate("S", "T", Dialect::Oracle, &decisions());
        let create_table = &sql[1];
        let handler = create_table.split("EXCEPTION").nth(1).unwrap();
        assert!(handler.contains("IF SQLCODE != -955 THEN"));
        assert!(handler.contains("RAISE;"));
    }

    #[test]
    fn test_oracle_password_quotes_are_escaped() {
        let sql = DdlGenerator::new("it's\"pw").generate("S", "T", Dialect::Oracle, &decisions());
        assert!(sql[0].contains("IDENTIFIED BY \"it''spw\"'"), "{}", sql[0]);
    }

    #[test]
    fn test_schema_always_precedes_table() {
        for dialect in Dialect::ALL {
            let sql = generator().generate("s", "t", dialect, &decisions());
            let table_idx = sql.iter().position(|s| s.contains("CREATE TABLE")).unwrap();
            assert_eq!(table_idx, sql.len() - 1);
            assert!(sql[0].contains(" s") || sql[0].contains("USER s"));
        }
    }

    #[test]
    fn test_column_order_is_preserved() {
        let mut cols = decisions();
        cols.reverse();
        let sql = generator().generate("s", "t", Dialect::PostgreSql, &cols);
        assert!(sql[1].ends_with("(name VARCHAR(2), id SMALLINT)"));
    }
}
