pub mod dataset;
pub mod import;
pub mod query;
pub mod server;

pub use dataset::*;
pub use import::*;
pub use query::*;
pub use server::*;
