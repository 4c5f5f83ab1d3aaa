//! SQLite adapter for DocumentSource
//!
//! Schema:
//! - `documents(id TEXT PRIMARY KEY, mod_time INTEGER, status TEXT, source TEXT)`
//! - `mod_time` is stored as microseconds since the Unix epoch
//! - `source` is the JSON body; field paths are resolved with `json_extract`
//!
//! Pagination is keyset-based on `id`. Bulk status updates run as a single
//! `UPDATE` statement over a `json_each` identifier list.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

use crate::domain::{
    Document, DocumentSource, DocumentStatus, PageCursor, RangeOp, SearchHit, SearchPage,
    SearchQuery, StatusUpdate, UpdateOutcome,
};
use crate::{Result, StorageError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id       TEXT PRIMARY KEY,
    mod_time INTEGER NOT NULL,
    status   TEXT NOT NULL,
    source   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_status_mod_time
    ON documents (status, mod_time);
"#;

pub struct SqliteDocumentSource {
    conn: Mutex<Connection>,
}

impl SqliteDocumentSource {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("Opened SQLite document source at {}", path.display());
        Self::from_connection(conn)
    }

    pub fn new_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or replace a document
    pub fn upsert(&self, document: &Document) -> Result<()> {
        let source = serde_json::to_string(&document.source)?;
        self.conn.lock().execute(
            "INSERT INTO documents (id, mod_time, status, source) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                mod_time = excluded.mod_time,
                status = excluded.status,
                source = excluded.source",
            params![
                document.id,
                document.mod_time.timestamp_micros(),
                document.status.as_str(),
                source
            ],
        )?;
        Ok(())
    }

    /// Batch upsert inside one transaction
    pub fn upsert_all(&self, documents: &[Document]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO documents (id, mod_time, status, source) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    mod_time = excluded.mod_time,
                    status = excluded.status,
                    source = excluded.source",
            )?;
            for document in documents {
                let source = serde_json::to_string(&document.source)?;
                stmt.execute(params![
                    document.id,
                    document.mod_time.timestamp_micros(),
                    document.status.as_str(),
                    source
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Get a document by ID
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` if no row has this ID
    pub fn get(&self, id: &str) -> Result<Document> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT id, mod_time, status, source FROM documents WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let (id, micros, status, source) =
            row.ok_or_else(|| StorageError::document_not_found(id))?;

        Ok(Document {
            id,
            mod_time: from_micros(micros)?,
            status: DocumentStatus::parse(&status),
            source: serde_json::from_str(&source)?,
        })
    }
}

fn comparison(op: RangeOp) -> &'static str {
    match op {
        RangeOp::AtOrBefore => "<=",
        RangeOp::StrictlyAfter => ">",
    }
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StorageError::serialization(format!("mod_time out of range: {}", micros)))
}

/// Convert a dotted field path into a SQLite JSON path (`$."a"."b"`)
fn json_path(field: &str) -> Result<String> {
    if field.is_empty() {
        return Err(StorageError::invalid_query("field path must not be empty"));
    }

    let mut path = String::from("$");
    for segment in field.split('.') {
        if segment.is_empty() || segment.contains('"') {
            return Err(StorageError::invalid_query(format!(
                "invalid field path: {}",
                field
            )));
        }
        path.push_str(".\"");
        path.push_str(segment);
        path.push('"');
    }
    Ok(path)
}

#[async_trait]
impl DocumentSource for SqliteDocumentSource {
    async fn search(
        &self,
        query: &SearchQuery,
        cursor: Option<&PageCursor>,
    ) -> Result<SearchPage> {
        if query.page_size == 0 {
            return Err(StorageError::invalid_query("page_size must be positive"));
        }
        // One extra row tells us whether another page exists
        let limit = i64::try_from(query.page_size)
            .ok()
            .and_then(|size| size.checked_add(1))
            .ok_or_else(|| {
                StorageError::invalid_query(format!("page_size too large: {}", query.page_size))
            })?;

        let op = comparison(query.range.op);
        let cutoff = query.range.cutoff.timestamp_micros();
        let status = query.status.as_str();
        let after = cursor.map(|c| c.as_str().to_string());

        let conn = self.conn.lock();

        let total: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM documents WHERE status = ?1 AND mod_time {} ?2",
                op
            ),
            params![status, cutoff],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT id, mod_time, source FROM documents
             WHERE status = ?1 AND mod_time {} ?2 AND (?3 IS NULL OR id > ?3)
             ORDER BY id
             LIMIT ?4",
            op
        ))?;
        let rows = stmt
            .query_map(
                params![status, cutoff, after, limit],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let has_more = rows.len() > query.page_size;
        let mut hits = Vec::with_capacity(rows.len().min(query.page_size));
        for (id, micros, source) in rows.into_iter().take(query.page_size) {
            hits.push(SearchHit {
                id,
                mod_time: from_micros(micros)?,
                source: serde_json::from_str(&source)?,
            });
        }

        let next = if has_more {
            hits.last().map(|hit| PageCursor::new(hit.id.clone()))
        } else {
            None
        };

        debug!(
            "SQLite search (mod_time {} {}): {} hits, total {}",
            op,
            query.range.cutoff,
            hits.len(),
            total
        );

        Ok(SearchPage {
            hits,
            total: total as u64,
            next,
        })
    }

    async fn update_by_query(&self, update: &StatusUpdate) -> Result<UpdateOutcome> {
        let path = json_path(&update.field)?;
        let values = serde_json::to_string(&update.values)?;
        let from = update.from.as_str();
        let status = update.status.as_str();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let matched: i64 = tx.query_row(
            "SELECT COUNT(*) FROM documents
             WHERE json_extract(source, ?1) IN (SELECT value FROM json_each(?2))
               AND status IN (?3, ?4)",
            params![path, values, from, status],
            |row| row.get(0),
        )?;

        let updated = tx.execute(
            "UPDATE documents SET status = ?1
             WHERE json_extract(source, ?2) IN (SELECT value FROM json_each(?3))
               AND status = ?4
               AND status <> ?1",
            params![status, path, values, from],
        )?;

        tx.commit()?;

        Ok(UpdateOutcome {
            matched: matched as u64,
            updated: updated as u64,
        })
    }
}
