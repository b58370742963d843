//! Version-tracked schema migrations for the libSQL backend.
//!
//! Table names are configurable, so each migration is a template applied to
//! one configured table and tracked per table in `_migrations`. `{table}`
//! expands to the quoted name and `{name}` to the raw name.

use libsql::Connection;
use tracing::info;

use super::tables::{TableName, TableNames};
use crate::error::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Messages,
    Blocklist,
}

struct Migration {
    version: i64,
    name: &'static str,
    target: Target,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_messages",
        target: Target::Messages,
        sql: r#"
            CREATE TABLE IF NOT EXISTS {table} (
                message_id TEXT PRIMARY KEY,
                message_type TEXT NOT NULL,
                source TEXT NOT NULL,
                destination TEXT NOT NULL,
                body TEXT NOT NULL,
                language TEXT NOT NULL DEFAULT '',
                translated_body TEXT NOT NULL DEFAULT '',
                message_status TEXT NOT NULL DEFAULT 'PENDING',
                received TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 1,
        name: "create_throttles",
        target: Target::Blocklist,
        sql: r#"
            CREATE TABLE IF NOT EXISTS {table} (
                throttle_type TEXT PRIMARY KEY,
                throttle_values TEXT NOT NULL DEFAULT '[]',
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
        "#,
    },
    Migration {
        version: 2,
        name: "index_message_status",
        target: Target::Messages,
        sql: r#"
            CREATE INDEX IF NOT EXISTS "{name}_status_idx" ON {table}(message_status, received);
        "#,
    },
];

/// Apply every pending migration to the configured tables.
pub async fn run_migrations(conn: &Connection, tables: &TableNames) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            table_name TEXT NOT NULL,
            version INTEGER NOT NULL,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (table_name, version)
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    for (target, table) in [
        (Target::Messages, &tables.messages),
        (Target::Blocklist, &tables.blocklist),
    ] {
        let current = current_version(conn, table).await?;
        for migration in MIGRATIONS
            .iter()
            .filter(|m| m.target == target && m.version > current)
        {
            info!(
                table = %table,
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            let sql = migration
                .sql
                .replace("{table}", &table.quoted())
                .replace("{name}", table.as_str());
            conn.execute_batch(&sql).await.map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration V{} ({}) on {table} failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            record_version(conn, table, migration.version, migration.name).await?;
        }
    }

    info!(
        messages = %tables.messages,
        blocklist = %tables.blocklist,
        "Database migrations complete"
    );
    Ok(())
}

/// Whether a table with this exact name exists.
pub async fn table_exists(conn: &Connection, table: &TableName) -> Result<bool, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            libsql::params![table.as_str()],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("table_exists: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("table_exists: {e}")))?;

    match row {
        Some(row) => {
            let count: i64 = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("table_exists: {e}")))?;
            Ok(count > 0)
        }
        None => Ok(false),
    }
}

/// Highest applied version for `table`, or 0.
async fn current_version(conn: &Connection, table: &TableName) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COALESCE(MAX(version), 0) FROM _migrations WHERE table_name = ?1",
            libsql::params![table.as_str()],
        )
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => row.get::<i64>(0).map_err(|e| {
            DatabaseError::Migration(format!("Failed to parse migration version: {e}"))
        }),
        None => Ok(0),
    }
}

async fn record_version(
    conn: &Connection,
    table: &TableName,
    version: i64,
    name: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (table_name, version, name) VALUES (?1, ?2, ?3)",
        libsql::params![table.as_str(), version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}
