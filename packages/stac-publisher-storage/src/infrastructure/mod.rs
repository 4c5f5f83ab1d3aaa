//! Infrastructure layer - DocumentSource adapters
//!
//! - `memory`: map-backed source
//! - `sqlite`: SQLite adapter (feature `sqlite`)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryDocumentSource;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDocumentSource;
