//! Database Engine Traits and Core Types
//!
//! This module defines the core abstractions for database engines.
//! Each engine (`PostgreSQL`, `MySQL`, `SQLite`) implements the `StoreConnection` trait
//! over one live connection.
//!
//! # Synchronous Design
//! Every trait method blocks until the store answers. The async drivers are driven by a
//! private current-thread runtime owned by the connection, so nothing runs in the
//! background while the session waits on the terminal.
//!
//! # Engine Isolation
//! Each engine implementation is completely independent.
//! No shared SQL helpers or cross-engine abstractions.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{PantryError, Result};
use crate::signal::Interrupt;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

/// Maximum length of the `name` column, in characters
pub const NAME_MAX_LEN: usize = 25;

/// Maximum length of the `description` column, in characters
pub const DESCRIPTION_MAX_LEN: usize = 50;

/// Maximum length of the `qty` column, in characters
pub const QTY_MAX_LEN: usize = 10;

/// Column labels in their fixed display order
pub const ITEM_COLUMNS: [&str; 5] = ["id", "name", "description", "qty", "modified"];

/// Supported database engine types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL` database
    Postgres,
    /// `MySQL` database (includes `MariaDB`)
    #[default]
    MySQL,
    /// `SQLite` database
    SQLite,
}

impl DatabaseType {
    /// Get the engine name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        }
    }

    /// Default TCP port for client-server engines
    #[must_use]
    pub const fn default_port(&self) -> Option<u16> {
        match self {
            Self::Postgres => Some(5432),
            Self::MySQL => Some(3306),
            Self::SQLite => None,
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = PantryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySQL),
            "sqlite" => Ok(Self::SQLite),
            other => Err(PantryError::invalid_input(format!(
                "unknown engine '{other}', expected mysql, postgres or sqlite"
            ))),
        }
    }
}

/// Connection configuration snapshot
///
/// For `SQLite`, `database` holds the file path (`:memory:` for a private in-memory
/// database) and the host/user/password fields are ignored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Database engine type
    pub engine: DatabaseType,

    /// Hostname (for postgres/mysql)
    pub host: String,

    /// Port number, engine default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Username (for postgres/mysql)
    pub user: String,

    /// Password (for postgres/mysql)
    /// WARNING: Sensitive data, do not log or include in error messages
    pub password: String,

    /// Database name, or file path for sqlite
    pub database: String,

    /// Inventory table name, validated with [`TableName::parse`] before use
    pub table: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            engine: DatabaseType::MySQL,
            host: "localhost".to_string(),
            port: None,
            user: "pantryuser".to_string(),
            password: "pantrypassword".to_string(),
            database: "pantrydb".to_string(),
            table: "Food".to_string(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("table", &self.table)
            .finish()
    }
}

impl ConnectionConfig {
    /// Create a new `PostgreSQL` connection config
    #[must_use]
    pub fn postgres(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            engine: DatabaseType::Postgres,
            host: host.into(),
            port: Some(port),
            user: user.into(),
            password: password.into(),
            database: database.into(),
            table: table.into(),
        }
    }

    /// Create a new `MySQL` connection config
    #[must_use]
    pub fn mysql(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            engine: DatabaseType::MySQL,
            host: host.into(),
            port: Some(port),
            user: user.into(),
            password: password.into(),
            database: database.into(),
            table: table.into(),
        }
    }

    /// Create a new `SQLite` connection config
    #[must_use]
    pub fn sqlite(file: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            engine: DatabaseType::SQLite,
            host: String::new(),
            port: None,
            user: String::new(),
            password: String::new(),
            database: file.into(),
            table: table.into(),
        }
    }

    /// Port to dial, falling back to the engine default
    #[must_use]
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.engine.default_port())
    }
}

/// A table identifier that is safe to splice into SQL
///
/// Grammar: an ASCII letter or underscore followed by up to 63 ASCII letters,
/// digits or underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Maximum identifier length accepted by all three engines
    pub const MAX_LEN: usize = 64;

    /// Validate a raw identifier
    pub fn parse(raw: &str) -> Result<Self> {
        let mut chars = raw.chars();
        let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_start || !valid_rest || raw.len() > Self::MAX_LEN {
            return Err(PantryError::invalid_input(format!(
                "table name '{raw}' must start with a letter or underscore, contain only \
                 letters, digits and underscores, and be at most {} characters",
                Self::MAX_LEN
            )));
        }

        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One inventory row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Free-form quantity text, never interpreted as a number
    pub qty: String,
    /// Set by the store on create and update; `None` if the store returned no usable value
    pub modified: Option<NaiveDateTime>,
}

/// The mutable fields of an item, checked against the column limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub qty: String,
}

impl NewItem {
    /// Validate field lengths (counted in characters, not bytes)
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        qty: impl Into<String>,
    ) -> Result<Self> {
        let item = Self { name: name.into(), description: description.into(), qty: qty.into() };

        check_len("name", &item.name, NAME_MAX_LEN)?;
        check_len("description", &item.description, DESCRIPTION_MAX_LEN)?;
        check_len("qty", &item.qty, QTY_MAX_LEN)?;

        Ok(item)
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(PantryError::invalid_input(format!(
            "{field} is {len} characters long, the limit is {max}"
        )));
    }
    Ok(())
}

/// All rows of the inventory table together with the column labels the store reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTable {
    pub columns: Vec<String>,
    pub rows: Vec<Item>,
}

impl ItemTable {
    /// Use the fixed column labels when the store reported none (empty result sets on some drivers)
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Item>) -> Self {
        let columns = if columns.is_empty() {
            ITEM_COLUMNS.iter().map(|c| (*c).to_string()).collect()
        } else {
            columns
        };
        Self { columns, rows }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One live connection to an inventory store
///
/// Every method commits immediately; there are no multi-statement transactions.
/// Implementations only ever see identifiers that passed [`TableName::parse`].
pub trait StoreConnection {
    /// Human-readable server version (e.g. `MySQL 8.0.35`)
    fn server_version(&mut self) -> Result<String>;

    /// Trivial liveness probe
    fn ping(&mut self) -> Result<()>;

    /// Whether the row with id 1 can be selected (schema exists and has data)
    fn probe_first(&mut self, table: &TableName) -> Result<bool>;

    /// Drop the table if present and create it with the canonical schema
    fn recreate_table(&mut self, table: &TableName) -> Result<()>;

    /// Largest id in the table, `None` when empty
    fn max_id(&mut self, table: &TableName) -> Result<Option<i64>>;

    /// Every row in natural storage order
    fn fetch_all(&mut self, table: &TableName) -> Result<ItemTable>;

    /// One row by id
    fn fetch_one(&mut self, table: &TableName, id: i64) -> Result<Option<Item>>;

    /// Insert a row, returning the id the store assigned
    fn insert(&mut self, table: &TableName, item: &NewItem) -> Result<i64>;

    /// Overwrite the mutable fields and refresh `modified`, returning the number of rows matched
    fn update(&mut self, table: &TableName, id: i64, item: &NewItem) -> Result<u64>;

    /// Delete a row, returning the number of rows removed
    fn delete(&mut self, table: &TableName, id: i64) -> Result<u64>;

    /// Close the connection
    fn close(self: Box<Self>) -> Result<()>;
}

/// Open a connection for the configured engine
///
/// Client-server engines give up with [`PantryError::Interrupted`] as soon as
/// `interrupt` is raised. `SQLite` calls are local and never wait on it.
pub fn open(config: &ConnectionConfig, interrupt: &Interrupt) -> Result<Box<dyn StoreConnection>> {
    match config.engine {
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => Ok(Box::new(sqlite::SqliteConnection::open(config)?)),

        #[cfg(feature = "mysql")]
        DatabaseType::MySQL => {
            Ok(Box::new(mysql::MySqlConnection::open(config, interrupt.clone())?))
        }

        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => {
            Ok(Box::new(postgres::PostgresConnection::open(config, interrupt.clone())?))
        }

        #[allow(unreachable_patterns)]
        other => Err(PantryError::invalid_input(format!(
            "the {other} engine is not compiled into this build"
        ))),
    }
}
