pub mod database; // Per-dialect drivers behind one adapter trait
pub mod dispatcher;
pub mod import_service;
pub mod query_service;
pub mod schema; // Type inference and DDL generation
pub mod server_registry;
pub mod transliteration;

pub use dispatcher::*;
pub use import_service::*;
pub use query_service::*;
pub use server_registry::*;
pub use transliteration::*;
