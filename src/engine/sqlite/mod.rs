//! `SQLite` Database Engine Implementation
//!
//! This module implements the `StoreConnection` trait for `SQLite` databases.
//!
//! # Features
//! - File-based connections (`/path/to/pantry.db`)
//! - In-memory connections (`:memory:`), private to the connection
//! - `AUTOINCREMENT` ids so deleted ids are never handed out again
//!
//! # Implementation Notes
//! - Uses `rusqlite` (synchronous driver, no async needed)
//! - `CURRENT_TIMESTAMP` is stored as `YYYY-MM-DD HH:MM:SS` text in UTC
//! - `modified` is refreshed explicitly by the UPDATE statement

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use tracing::debug;

use crate::engine::{
    ConnectionConfig, DatabaseType, Item, ItemTable, NewItem, StoreConnection, TableName,
};
use crate::error::{NativeCode, PantryError, Result};

/// Path that selects a private in-memory database
pub const MEMORY_PATH: &str = ":memory:";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `SQLite` connection
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    /// Open (creating if needed) the database file named by `config.database`
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        // Validate config is for SQLite
        if config.engine != DatabaseType::SQLite {
            return Err(PantryError::invalid_input(format!(
                "Expected SQLite engine, got {}",
                config.engine
            )));
        }

        if config.database.is_empty() {
            return Err(PantryError::invalid_input("SQLite requires a database file path"));
        }

        let conn = if config.database == MEMORY_PATH {
            Connection::open_in_memory()
        } else {
            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
            Connection::open_with_flags(&config.database, flags)
        }
        .map_err(|e| connection_error(&e))?;

        debug!(file = %config.database, "opened sqlite database");
        Ok(Self { conn })
    }
}

impl StoreConnection for SqliteConnection {
    fn server_version(&mut self) -> Result<String> {
        let version: String = self
            .conn
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .map_err(|e| connection_error(&e))?;

        Ok(format!("SQLite {version}"))
    }

    fn ping(&mut self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| connection_error(&e))
    }

    fn probe_first(&mut self, table: &TableName) -> Result<bool> {
        let found = self
            .conn
            .query_row(&format!("SELECT id FROM \"{table}\" WHERE id = 1"), [], |row| {
                row.get::<_, i64>(0)
            })
            .optional()
            .map_err(|e| query_error("probe", &e))?;

        Ok(found.is_some())
    }

    fn recreate_table(&mut self, table: &TableName) -> Result<()> {
        // Dropping an AUTOINCREMENT table also clears its sqlite_sequence row
        self.conn
            .execute_batch(&format!(
                "DROP TABLE IF EXISTS \"{table}\";
                 CREATE TABLE \"{table}\" (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name VARCHAR(25),
                    description VARCHAR(50),
                    qty VARCHAR(10),
                    modified TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
                 );"
            ))
            .map_err(|e| query_error("reset", &e))
    }

    fn max_id(&mut self, table: &TableName) -> Result<Option<i64>> {
        self.conn
            .query_row(&format!("SELECT MAX(id) FROM \"{table}\""), [], |row| row.get(0))
            .map_err(|e| query_error("max id", &e))
    }

    fn fetch_all(&mut self, table: &TableName) -> Result<ItemTable> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, name, description, qty, modified FROM \"{table}\""))
            .map_err(|e| query_error("prepare list", &e))?;

        let columns: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();

        let rows = stmt
            .query_map([], item_from_row)
            .map_err(|e| query_error("list", &e))?
            .collect::<std::result::Result<Vec<Item>, _>>()
            .map_err(|e| query_error("collect rows", &e))?;

        Ok(ItemTable::new(columns, rows))
    }

    fn fetch_one(&mut self, table: &TableName, id: i64) -> Result<Option<Item>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT id, name, description, qty, modified FROM \"{table}\" WHERE id = ?1"
                ),
                params![id],
                item_from_row,
            )
            .optional()
            .map_err(|e| query_error("select", &e))
    }

    fn insert(&mut self, table: &TableName, item: &NewItem) -> Result<i64> {
        self.conn
            .execute(
                &format!("INSERT INTO \"{table}\" (name, description, qty) VALUES (?1, ?2, ?3)"),
                params![item.name, item.description, item.qty],
            )
            .map_err(|e| query_error("insert", &e))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update(&mut self, table: &TableName, id: i64, item: &NewItem) -> Result<u64> {
        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE \"{table}\"
                     SET name = ?1, description = ?2, qty = ?3, modified = CURRENT_TIMESTAMP
                     WHERE id = ?4"
                ),
                params![item.name, item.description, item.qty, id],
            )
            .map_err(|e| query_error("update", &e))?;

        Ok(changed as u64)
    }

    fn delete(&mut self, table: &TableName, id: i64) -> Result<u64> {
        let removed = self
            .conn
            .execute(&format!("DELETE FROM \"{table}\" WHERE id = ?1"), params![id])
            .map_err(|e| query_error("delete", &e))?;

        Ok(removed as u64)
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().map_err(|(_, e)| connection_error(&e))
    }
}

/// Map a result row onto an `Item`
fn item_from_row(row: &Row) -> rusqlite::Result<Item> {
    let modified: Option<String> = row.get(4)?;

    Ok(Item {
        id: row.get(0)?,
        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        qty: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        modified: modified.and_then(|s| parse_timestamp(&s)),
    })
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

fn native_code(e: &rusqlite::Error) -> Option<NativeCode> {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => {
            Some(NativeCode::Numeric(i64::from(err.extended_code)))
        }
        _ => None,
    }
}

fn connection_error(e: &rusqlite::Error) -> PantryError {
    match native_code(e) {
        Some(code) => PantryError::connection_failed_with_code(code, e.to_string()),
        None => PantryError::connection_failed(e.to_string()),
    }
}

fn query_error(operation: &str, e: &rusqlite::Error) -> PantryError {
    PantryError::query_failed(format!("sqlite {operation} failed: {e}"))
}
