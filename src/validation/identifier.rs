use crate::api::middleware::AppError;
use crate::models::Dialect;
use crate::services::schema::DialectTypeTable;

/// Validation for schema, table and column names that end up unquoted in generated SQL
pub struct IdentifierValidator;

impl IdentifierValidator {
    /// Accept `^[A-Za-z_][A-Za-z0-9_]*$` within the dialect's length limit
    pub fn validate(name: &str, kind: &str, dialect: Dialect) -> Result<(), AppError> {
        let mut chars = name.chars();
        let first = chars
            .next()
            .ok_or_else(|| AppError::Validation(format!("{} name cannot be empty", kind)))?;

        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(AppError::Validation(format!(
                "Invalid {} name '{}': must start with a letter or underscore",
                kind, name
            )));
        }

        if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
            return Err(AppError::Validation(format!(
                "Invalid {} name '{}': character '{}' is not allowed",
                kind, name, bad
            )));
        }

        let max_len = DialectTypeTable::for_dialect(dialect).max_identifier_len;
        if name.len() > max_len {
            return Err(AppError::Validation(format!(
                "Invalid {} name '{}': longer than {} characters allowed by {}",
                kind, name, max_len, dialect
            )));
        }

        Ok(())
    }

    /// Validate every identifier of an import in one pass
    pub fn validate_import(
        schema: &str,
        table: &str,
        columns: &[String],
        dialect: Dialect,
    ) -> Result<(), AppError> {
        Self::validate(schema, "Schema", dialect)?;
        Self::validate(table, "Table", dialect)?;
        if columns.is_empty() {
            return Err(AppError::Validation(
                "Dataset must contain at least one column".to_string(),
            ));
        }
        for column in columns {
            Self::validate(column, "Column", dialect)?;
        }
        Ok(())
    }
}
