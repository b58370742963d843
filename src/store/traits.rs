//! Storage traits consumed by the pipeline and the API.

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::{DatabaseError, PartialWrite};
use crate::message::Message;
use crate::throttle::BlocklistEntry;

/// Page size `scan_all` uses when draining the table.
pub const SCAN_PAGE_SIZE: usize = 500;

/// One page of a keyset scan.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    /// Cursor for the next page; `None` once the table is exhausted.
    pub next: Option<String>,
}

/// Message persistence keyed by `Message::id`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert or fully replace the record with this message's ID.
    async fn put(&self, message: &Message) -> Result<(), DatabaseError>;

    async fn get(&self, id: &str) -> Result<Option<Message>, DatabaseError>;

    /// Up to `limit` messages with IDs strictly after `after`, in ID order.
    async fn scan_page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<MessagePage, DatabaseError>;

    /// Sequential `put`s. Stops at the first failure; earlier writes stay.
    async fn put_many(&self, messages: &[Message]) -> Result<usize, PartialWrite> {
        let mut written = 0;
        for message in messages {
            if let Err(source) = self.put(message).await {
                error!(id = %message.id, written, error = %source, "Couldn't put message");
                return Err(PartialWrite { written, source });
            }
            written += 1;
        }
        debug!(written, "Messages written");
        Ok(written)
    }

    /// Every stored message, in ID order.
    async fn scan_all(&self) -> Result<Vec<Message>, DatabaseError> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.scan_page(cursor.as_deref(), SCAN_PAGE_SIZE).await?;
            all.extend(page.messages);
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(all)
    }
}

/// Read side of the blocklist, plus the admin writes behind the API.
#[async_trait]
pub trait BlocklistStore: Send + Sync {
    /// All current entries. Never cached; every call reads the store.
    async fn list_entries(&self) -> Result<Vec<BlocklistEntry>, DatabaseError>;

    /// Insert or replace the entry for `entry.type`.
    async fn put_entry(&self, entry: &BlocklistEntry) -> Result<(), DatabaseError>;

    /// Returns whether an entry was removed.
    async fn delete_entry(&self, throttle_type: &str) -> Result<bool, DatabaseError>;
}
