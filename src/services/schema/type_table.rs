// Per-dialect type decision tables
//
// Every SQL type name, integer range threshold and text ceiling used by inference lives
// here as plain data.

use crate::models::Dialect;

/// Inclusive integer range covered by one integer tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn covers(&self, min: i64, max: i64) -> bool {
        self.min <= min && max <= self.max
    }
}

/// Range of the smallest integer tier
pub const SMALL_INT_RANGE: IntRange = IntRange::new(-32_768, 32_767);
/// Range of the medium tier (upper bound is inclusive of 8_388_608)
pub const MEDIUM_INT_RANGE: IntRange = IntRange::new(-8_388_608, 8_388_608);
/// Range of the standard 32-bit tier
pub const STANDARD_INT_RANGE: IntRange = IntRange::new(i32::MIN as i64, i32::MAX as i64);

/// Bounded text size used when a column holds only nulls
pub const DEFAULT_TEXT_LENGTH: u64 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectTypeTable {
    pub small_int: &'static str,
    /// `None` when the dialect has no medium integer tier
    pub medium_int: Option<&'static str>,
    pub standard_int: &'static str,
    pub big_int: &'static str,
    pub float: &'static str,
    pub boolean: &'static str,
    pub datetime: &'static str,
    /// Bounded text type name, rendered as `NAME(n)`
    pub bounded_text: &'static str,
    /// Largest `n` the bounded text type accepts
    pub text_ceiling: u64,
    pub large_text: &'static str,
    /// Longest identifier the dialect accepts
    pub max_identifier_len: usize,
}

pub const MYSQL_TYPES: DialectTypeTable = DialectTypeTable {
    small_int: "SMALLINT",
    medium_int: Some("MEDIUMINT"),
    standard_int: "INT",
    big_int: "BIGINT",
    float: "DOUBLE",
    boolean: "BOOLEAN",
    datetime: "DATETIME",
    bounded_text: "VARCHAR",
    text_ceiling: 65_535,
    large_text: "TEXT",
    max_identifier_len: 64,
};

pub const POSTGRES_TYPES: DialectTypeTable = DialectTypeTable {
    small_int: "smallint",
    medium_int: None,
    standard_int: "integer",
    big_int: "bigint",
    float: "DOUBLE PRECISION",
    boolean: "BOOLEAN",
    datetime: "TIMESTAMP",
    bounded_text: "VARCHAR",
    text_ceiling: 10_485_760,
    large_text: "TEXT",
    max_identifier_len: 63,
};

pub const ORACLE_TYPES: DialectTypeTable = DialectTypeTable {
    small_int: "NUMBER(5)",
    medium_int: Some("NUMBER(7)"),
    standard_int: "PLS_INTEGER",
    big_int: "NUMBER(19)",
    float: "BINARY_DOUBLE",
    boolean: "NUMBER(1)",
    datetime: "TIMESTAMP",
    bounded_text: "VARCHAR2",
    text_ceiling: 4_000,
    large_text: "CLOB",
    max_identifier_len: 128,
};

impl DialectTypeTable {
    pub fn for_dialect(dialect: Dialect) -> &'static DialectTypeTable {
        match dialect {
            Dialect::MySql => &MYSQL_TYPES,
            Dialect::PostgreSql => &POSTGRES_TYPES,
            Dialect::Oracle => &ORACLE_TYPES,
        }
    }

    /// Smallest integer tier covering `[min, max]`
    pub fn integer_type(&self, min: i64, max: i64) -> &'static str {
        if SMALL_INT_RANGE.covers(min, max) {
            return self.small_int;
        }
        if let Some(medium) = self.medium_int {
            if MEDIUM_INT_RANGE.covers(min, max) {
                return medium;
            }
        }
        if STANDARD_INT_RANGE.covers(min, max) {
            return self.standard_int;
        }
        self.big_int
    }

    /// Bounded text of `length` characters, or the large text type past the ceiling
    pub fn text_type(&self, length: u64) -> String {
        if length <= self.text_ceiling {
            format!("{}({})", self.bounded_text, length)
        } else {
            self.large_text.to_string()
        }
    }
}
