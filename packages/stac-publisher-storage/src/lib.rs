//! Document source for the STAC publisher
//!
//! > "A document is published once it has stopped changing."
//!
//! The publisher polls a searchable index for documents whose status is `new`
//! and whose modification time lies on either side of a cutoff, then flips the
//! status of published documents to `queued` in one bulk mutation.
//!
//! ## Core Principles
//!
//! 1. **Status gating**: only `new` documents are returned by searches
//! 2. **Bulk mutation**: status changes are expressed as one update over an identifier set
//! 3. **Cursor paging**: searches never rely on a single oversized page
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stac_publisher_storage::{DocumentSource, SqliteDocumentSource, StatusUpdate, DocumentStatus};
//!
//! let source = SqliteDocumentSource::open("documents.db")?;
//! let page = source.search(&query, None).await?;
//!
//! source
//!     .update_by_query(&StatusUpdate::new(
//!         "item_id",
//!         ids,
//!         DocumentStatus::New,
//!         DocumentStatus::Queued,
//!     ))
//!     .await?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{
    lookup_field, Document, DocumentSource, DocumentStatus, PageCursor, RangeOp, SearchHit,
    SearchPage, SearchQuery, StatusUpdate, TimeRange, UpdateOutcome,
};

pub use infrastructure::InMemoryDocumentSource;

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteDocumentSource;
