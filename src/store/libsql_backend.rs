//! libSQL backend for messages and blocklist entries.
//!
//! Supports local file and in-memory databases. Both tables live in the same
//! database under the names given in [`TableNames`].

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};

use super::migrations;
use super::tables::{TableName, TableNames};
use super::traits::{BlocklistStore, MessagePage, MessageStore};
use crate::error::DatabaseError;
use crate::message::{Message, parse_received};
use crate::throttle::BlocklistEntry;

const MESSAGE_COLUMNS: &str = "message_id, message_type, source, destination, body, language, translated_body, message_status, received";

/// libSQL database backend.
///
/// Holds a single connection reused for all operations.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    tables: TableNames,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path, tables: TableNames) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::with_database(db, tables).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory(tables: TableNames) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::with_database(db, tables).await
    }

    async fn with_database(db: LibSqlDatabase, tables: TableNames) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn, &tables).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            tables,
        })
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    pub async fn table_exists(&self, table: &TableName) -> Result<bool, DatabaseError> {
        migrations::table_exists(self.conn(), table).await
    }

    /// Fail with `NotFound` unless both configured tables exist.
    pub async fn ensure_tables(&self) -> Result<(), DatabaseError> {
        for table in [&self.tables.messages, &self.tables.blocklist] {
            if !self.table_exists(table).await? {
                return Err(DatabaseError::NotFound {
                    entity: "table".into(),
                    id: table.to_string(),
                });
            }
            info!(table = %table, "Table present");
        }
        Ok(())
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Map a libsql Row to a Message. Column order matches MESSAGE_COLUMNS.
fn row_to_message(row: &libsql::Row) -> Result<Message, DatabaseError> {
    let get = |idx: i32| -> Result<String, DatabaseError> {
        row.get::<String>(idx)
            .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))
    };

    let type_str = get(1)?;
    let status_str = get(7)?;
    let received_str = get(8)?;

    Ok(Message {
        id: get(0)?,
        r#type: type_str.parse().map_err(DatabaseError::Serialization)?,
        source: get(2)?,
        destination: get(3)?,
        body: get(4)?,
        language: get(5)?,
        translated_body: get(6)?,
        status: status_str.parse().map_err(DatabaseError::Serialization)?,
        received: parse_received(&received_str).map_err(|e| {
            DatabaseError::Serialization(format!("received {received_str:?}: {e}"))
        })?,
    })
}

async fn collect_messages(mut rows: libsql::Rows) -> Result<Vec<Message>, DatabaseError> {
    let mut messages = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("scan: {e}")))?
    {
        messages.push(row_to_message(&row)?);
    }
    Ok(messages)
}

// ── Trait implementations ───────────────────────────────────────────

#[async_trait]
impl MessageStore for LibSqlBackend {
    async fn put(&self, message: &Message) -> Result<(), DatabaseError> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            self.tables.messages.quoted()
        );
        self.conn()
            .execute(
                &sql,
                params![
                    message.id.as_str(),
                    message.r#type.as_str(),
                    message.source.as_str(),
                    message.destination.as_str(),
                    message.body.as_str(),
                    message.language.as_str(),
                    message.translated_body.as_str(),
                    message.status.as_str(),
                    message.received_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("put {}: {e}", message.id)))?;

        debug!(id = %message.id, "Message written");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Message>, DatabaseError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM {} WHERE message_id = ?1",
            self.tables.messages.quoted()
        );
        let mut rows = self
            .conn()
            .query(&sql, params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("get {id}: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_message(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get {id}: {e}"))),
        }
    }

    async fn scan_page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<MessagePage, DatabaseError> {
        let limit = limit.max(1);
        // One extra row tells us whether another page exists.
        let fetch = (limit + 1) as i64;
        let table = self.tables.messages.quoted();

        let rows = match after {
            Some(cursor) => {
                self.conn()
                    .query(
                        &format!(
                            "SELECT {MESSAGE_COLUMNS} FROM {table} WHERE message_id > ?1 ORDER BY message_id LIMIT ?2"
                        ),
                        params![cursor, fetch],
                    )
                    .await
            }
            None => {
                self.conn()
                    .query(
                        &format!(
                            "SELECT {MESSAGE_COLUMNS} FROM {table} ORDER BY message_id LIMIT ?1"
                        ),
                        params![fetch],
                    )
                    .await
            }
        }
        .map_err(|e| DatabaseError::Query(format!("scan_page: {e}")))?;

        let mut messages = collect_messages(rows).await?;
        let next = if messages.len() > limit {
            messages.truncate(limit);
            messages.last().map(|m| m.id.clone())
        } else {
            None
        };
        Ok(MessagePage { messages, next })
    }
}

#[async_trait]
impl BlocklistStore for LibSqlBackend {
    async fn list_entries(&self) -> Result<Vec<BlocklistEntry>, DatabaseError> {
        let sql = format!(
            "SELECT throttle_type, throttle_values FROM {} ORDER BY rowid",
            self.tables.blocklist.quoted()
        );
        let mut rows = self
            .conn()
            .query(&sql, ())
            .await
            .map_err(|e| DatabaseError::Query(format!("list_entries: {e}")))?;

        let mut entries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_entries: {e}")))?
        {
            let throttle_type: String = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
            let raw_values: String = row
                .get(1)
                .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
            let values: BTreeSet<String> = serde_json::from_str(&raw_values).map_err(|e| {
                warn!(throttle_type = %throttle_type, "Unreadable throttle values");
                DatabaseError::Serialization(format!("throttle_values for {throttle_type}: {e}"))
            })?;
            entries.push(BlocklistEntry {
                r#type: throttle_type,
                values,
            });
        }
        debug!(count = entries.len(), "Loaded blocklist entries");
        Ok(entries)
    }

    async fn put_entry(&self, entry: &BlocklistEntry) -> Result<(), DatabaseError> {
        let values = serde_json::to_string(&entry.values)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let sql = format!(
            "INSERT OR REPLACE INTO {} (throttle_type, throttle_values, updated_at) VALUES (?1, ?2, ?3)",
            self.tables.blocklist.quoted()
        );
        self.conn()
            .execute(
                &sql,
                params![entry.r#type.as_str(), values, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("put_entry: {e}")))?;

        info!(throttle_type = %entry.r#type, values = entry.values.len(), "Blocklist entry saved");
        Ok(())
    }

    async fn delete_entry(&self, throttle_type: &str) -> Result<bool, DatabaseError> {
        let sql = format!(
            "DELETE FROM {} WHERE throttle_type = ?1",
            self.tables.blocklist.quoted()
        );
        let affected = self
            .conn()
            .execute(&sql, params![throttle_type])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_entry: {e}")))?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageStatus, MessageType};

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory(TableNames::default()).await.unwrap()
    }

    fn make_message(id: &str, body: &str) -> Message {
        Message::sms(id, "+15551234567", "+15550000000", body)
    }

    // ── Message tests ───────────────────────────────────────────────

    #[tokio::test]
    async fn put_and_get_roundtrip() {
        let db = test_db().await;
        let msg = make_message("m1", "Hola").with_translation("es", "Hello");

        db.put(&msg).await.unwrap();

        let loaded = db.get("m1").await.unwrap().unwrap();
        assert_eq!(loaded, msg);
        assert_eq!(loaded.r#type, MessageType::Sms);
        assert_eq!(loaded.status, MessageStatus::Pending);
    }

    #[tokio::test]
    async fn get_not_found() {
        let db = test_db().await;
        assert!(db.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_is_last_write_wins() {
        let db = test_db().await;
        db.put(&make_message("m1", "first").with_translation("es", "uno"))
            .await
            .unwrap();

        let mut second = make_message("m1", "second");
        second.status = MessageStatus::Posted;
        db.put(&second).await.unwrap();

        let loaded = db.get("m1").await.unwrap().unwrap();
        assert_eq!(loaded.body, "second");
        assert_eq!(loaded.status, MessageStatus::Posted);
        // Full replace: enrichment from the first write is gone.
        assert!(loaded.language.is_empty());
        assert_eq!(db.scan_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn put_many_counts_writes() {
        let db = test_db().await;
        let batch: Vec<Message> = (1..=3).map(|i| make_message(&format!("m{i}"), "x")).collect();
        assert_eq!(db.put_many(&batch).await.unwrap(), 3);
        assert_eq!(db.put_many(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn scan_pages_by_id() {
        let db = test_db().await;
        for id in ["c", "a", "e", "b", "d"] {
            db.put(&make_message(id, "x")).await.unwrap();
        }

        let first = db.scan_page(None, 2).await.unwrap();
        let ids: Vec<&str> = first.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(first.next.as_deref(), Some("b"));

        let second = db.scan_page(first.next.as_deref(), 2).await.unwrap();
        let ids: Vec<&str> = second.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["c", "d"]);

        let last = db.scan_page(second.next.as_deref(), 2).await.unwrap();
        assert_eq!(last.messages.len(), 1);
        assert!(last.next.is_none());
    }

    #[tokio::test]
    async fn scan_all_drains_every_page() {
        let db = test_db().await;
        let total = crate::store::SCAN_PAGE_SIZE + 7;
        for i in 0..total {
            db.put(&make_message(&format!("m{i:05}"), "x")).await.unwrap();
        }
        let all = db.scan_all().await.unwrap();
        assert_eq!(all.len(), total);
        assert_eq!(all[0].id, "m00000");
        assert_eq!(all[total - 1].id, format!("m{:05}", total - 1));
    }

    #[tokio::test]
    async fn scan_all_empty_table() {
        let db = test_db().await;
        assert!(db.scan_all().await.unwrap().is_empty());
    }

    // ── Blocklist tests ─────────────────────────────────────────────

    #[tokio::test]
    async fn blocklist_put_list_delete() {
        let db = test_db().await;
        assert!(db.list_entries().await.unwrap().is_empty());

        db.put_entry(&BlocklistEntry::sms_numbers(["+1", "+2"]))
            .await
            .unwrap();
        db.put_entry(&BlocklistEntry::new("keyword", ["STOP"]))
            .await
            .unwrap();

        let entries = db.list_entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].r#type, "smsnumber");
        assert!(entries[0].blocks("+2"));
        assert_eq!(entries[1].r#type, "keyword");

        assert!(db.delete_entry("keyword").await.unwrap());
        assert!(!db.delete_entry("keyword").await.unwrap());
        assert_eq!(db.list_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blocklist_put_replaces_values() {
        let db = test_db().await;
        db.put_entry(&BlocklistEntry::sms_numbers(["+1"]))
            .await
            .unwrap();
        db.put_entry(&BlocklistEntry::sms_numbers(["+9"]))
            .await
            .unwrap();

        let entries = db.list_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].blocks("+9"));
        assert!(!entries[0].blocks("+1"));
    }

    // ── Setup checks ────────────────────────────────────────────────

    #[tokio::test]
    async fn ensure_tables_after_migrations() {
        let db = test_db().await;
        db.ensure_tables().await.unwrap();
        assert!(db.table_exists(&db.tables().messages).await.unwrap());
    }

    #[tokio::test]
    async fn local_file_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("lordlaser.db");

        {
            let db = LibSqlBackend::new_local(&path, TableNames::default())
                .await
                .unwrap();
            db.put(&make_message("m1", "kept")).await.unwrap();
        }

        assert!(path.exists());
        let db = LibSqlBackend::new_local(&path, TableNames::default())
            .await
            .unwrap();
        assert_eq!(db.get("m1").await.unwrap().unwrap().body, "kept");
    }
}
