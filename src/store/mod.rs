//! Persistence layer — libSQL-backed storage for messages and blocklist entries.

pub mod libsql_backend;
pub mod migrations;
pub mod tables;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use tables::{TableName, TableNames};
pub use traits::{BlocklistStore, MessagePage, MessageStore, SCAN_PAGE_SIZE};
