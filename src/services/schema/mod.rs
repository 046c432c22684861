// Schema inference, DDL generation and INSERT construction
pub mod ddl;
pub mod inference;
pub mod insert;
pub mod type_table;

pub use ddl::DdlGenerator;
pub use inference::{classify, infer_column_type, infer_types, ColumnCategory, ColumnTypeDecision};
pub use insert::InsertTarget;
pub use type_table::DialectTypeTable;
