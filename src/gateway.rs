//! Persistence Gateway
//!
//! The only component that talks to the inventory store. It owns at most one
//! live [`StoreConnection`] plus the validated table name, and turns every
//! lower-level failure into a boolean, an `Option`, or a displayable error so
//! the session can report it and carry on.
//!
//! Failures are logged here with `tracing`; callers only see the outcome.
//! An interrupted operation is reported like any other failure; the raised
//! interrupt is picked up by the next prompt.

use tracing::{debug, info, warn};

use crate::engine::{self, ConnectionConfig, Item, ItemTable, NewItem, StoreConnection, TableName};
use crate::error::{PantryError, Result};
use crate::signal::Interrupt;

/// Connection lifecycle, schema check/reset and row CRUD for one table
pub struct PersistenceGateway {
    config: ConnectionConfig,
    table: TableName,
    connection: Option<Box<dyn StoreConnection>>,
    interrupt: Interrupt,
}

impl PersistenceGateway {
    /// Create a disconnected gateway. Fails if the table name is not a safe identifier.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let table = TableName::parse(&config.table)?;
        Ok(Self { config, table, connection: None, interrupt: Interrupt::new() })
    }

    /// Abandon blocking store calls when `interrupt` is raised
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    #[must_use]
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// True iff a connection is open and answers a trivial probe
    pub fn status(&mut self) -> bool {
        self.connection.as_mut().is_some_and(|conn| match conn.ping() {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "liveness probe failed");
                false
            }
        })
    }

    /// Open a new connection, returning the server version
    ///
    /// Any connection already held is closed first. The error displays as
    /// `ERROR <code>: <description>`.
    pub fn connect(&mut self) -> Result<String> {
        self.disconnect();

        let mut conn = engine::open(&self.config, &self.interrupt).inspect_err(|e| {
            warn!(engine = %self.config.engine, error = %e, "connection failed");
        })?;

        let version = conn.server_version().unwrap_or_else(|e| {
            debug!(error = %e, "could not read server version");
            format!("{} (version unknown)", self.config.engine)
        });

        info!(engine = %self.config.engine, table = %self.table, %version, "connected");
        self.connection = Some(conn);
        Ok(version)
    }

    /// Close the open connection; false if none was open
    pub fn disconnect(&mut self) -> bool {
        let Some(conn) = self.connection.take() else {
            return false;
        };

        if let Err(e) = conn.close() {
            debug!(error = %e, "connection did not close cleanly");
        }
        info!(engine = %self.config.engine, "disconnected");
        true
    }

    /// True iff the row with id 1 exists; false for an empty or missing table
    pub fn check_initialized(&mut self) -> bool {
        self.attempt("check", |conn, table| conn.probe_first(table)).unwrap_or(false)
    }

    /// Drop and recreate the table. Does nothing unless `confirm` is true.
    pub fn reset(&mut self, confirm: bool) -> bool {
        if !confirm {
            return false;
        }

        let done = self.attempt("reset", |conn, table| conn.recreate_table(table)).is_some();
        if done {
            info!(table = %self.table, "table recreated");
        }
        done
    }

    /// One past the largest id; `None` when the table is empty or unreachable
    pub fn next_id(&mut self) -> Option<i64> {
        self.attempt("next id", |conn, table| conn.max_id(table)).flatten().map(|max| max + 1)
    }

    /// Every row in natural storage order
    pub fn list_all(&mut self) -> Option<ItemTable> {
        self.attempt("list", |conn, table| conn.fetch_all(table))
    }

    /// Insert a row; the store assigns its id and timestamp
    pub fn insert(&mut self, name: &str, description: &str, qty: &str) -> Result<i64> {
        let item = NewItem::new(name, description, qty)?;
        let id = self.run(|conn, table| conn.insert(table, &item)).inspect_err(|e| {
            warn!(operation = "insert", error = %e, "store operation failed");
        })?;

        debug!(id, "item inserted");
        Ok(id)
    }

    /// Overwrite the mutable fields of row `id`. False if no row matched.
    pub fn update(&mut self, id: i64, name: &str, description: &str, qty: &str) -> bool {
        let item = match NewItem::new(name, description, qty) {
            Ok(item) => item,
            Err(e) => {
                debug!(id, error = %e, "update rejected");
                return false;
            }
        };

        let matched = self.attempt("update", |conn, table| conn.update(table, id, &item));
        matched.is_some_and(|rows| rows > 0)
    }

    /// Delete row `id`. False if no row was removed.
    pub fn remove(&mut self, id: i64) -> bool {
        let removed = self.attempt("delete", |conn, table| conn.delete(table, id));
        removed.is_some_and(|rows| rows > 0)
    }

    pub fn select_one(&mut self, id: i64) -> Option<Item> {
        self.attempt("select", |conn, table| conn.fetch_one(table, id)).flatten()
    }

    fn run<T>(
        &mut self,
        op: impl FnOnce(&mut dyn StoreConnection, &TableName) -> Result<T>,
    ) -> Result<T> {
        let conn = self.connection.as_mut().ok_or(PantryError::NotConnected)?;
        op(&mut **conn, &self.table)
    }

    fn attempt<T>(
        &mut self,
        operation: &str,
        op: impl FnOnce(&mut dyn StoreConnection, &TableName) -> Result<T>,
    ) -> Option<T> {
        match self.run(op) {
            Ok(value) => Some(value),
            Err(PantryError::NotConnected) => {
                debug!(operation, "no open connection");
                None
            }
            Err(PantryError::Interrupted) => {
                debug!(operation, "store operation interrupted");
                None
            }
            Err(e) => {
                warn!(operation, error = %e, "store operation failed");
                None
            }
        }
    }
}

impl Drop for PersistenceGateway {
    fn drop(&mut self) {
        self.disconnect();
    }
}
