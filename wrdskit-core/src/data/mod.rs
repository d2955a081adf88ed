//! Table sources, caching and column mapping

pub mod cache;
pub mod file;
pub mod provider;
pub mod schema;

pub use cache::TableCache;
pub use file::FileTableSource;
pub use provider::{MemoryTableSource, SourceError, TableRef, TableSource};
pub use schema::{MembershipColumns, SchemaError};
