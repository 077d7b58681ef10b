//! `PostgreSQL` Database Engine Implementation
//!
//! This module implements the `StoreConnection` trait for `PostgreSQL` databases.
//!
//! # Features
//! - Client-server connections via TCP
//! - Identity column for ids, `TIMESTAMP` default for `modified`
//!
//! # Implementation Notes
//! - Uses `tokio-postgres` (async driver) on a private current-thread tokio runtime
//! - The connection future is spawned on that runtime, so it only makes progress
//!   while a statement is being awaited with `block_on`
//! - Every `block_on` races the interrupt, so Ctrl-C abandons a hung server
//! - `modified` is refreshed explicitly by the UPDATE statement
//! - Identifiers are always double-quoted so mixed-case table names survive

use chrono::NaiveDateTime;
use tokio::runtime::Runtime;
use tokio_postgres::{Client, Config, NoTls, Row};
use tracing::debug;

use crate::engine::{
    ConnectionConfig, DatabaseType, Item, ItemTable, NewItem, StoreConnection, TableName,
};
use crate::error::{NativeCode, PantryError, Result};
use crate::signal::Interrupt;

/// `PostgreSQL` connection
pub struct PostgresConnection {
    runtime: Runtime,
    client: Client,
    interrupt: Interrupt,
}

impl PostgresConnection {
    /// Connect to the server described by `config`
    pub fn open(config: &ConnectionConfig, interrupt: Interrupt) -> Result<Self> {
        // Validate config is for PostgreSQL
        if config.engine != DatabaseType::Postgres {
            return Err(PantryError::invalid_input(format!(
                "Expected PostgreSQL engine, got {}",
                config.engine
            )));
        }

        // Build connection config
        let pg_config = build_pg_config(config)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                PantryError::engine_error("postgres", format!("Failed to start runtime: {e}"))
            })?;

        // Connect to PostgreSQL
        let (client, connection) = interrupt
            .block_on(&runtime, pg_config.connect(NoTls))?
            .map_err(|e| connection_error(&e))?;

        // Note: Connection errors are not logged in detail to prevent credential leakage
        runtime.spawn(async move {
            if connection.await.is_err() {
                debug!("postgres connection closed with an error");
            }
        });

        debug!(host = %config.host, database = %config.database, "connected to postgres");
        Ok(Self { runtime, client, interrupt })
    }
}

impl StoreConnection for PostgresConnection {
    fn server_version(&mut self) -> Result<String> {
        let row = self
            .interrupt
            .block_on(&self.runtime, self.client.query_one("SELECT version()", &[]))?
            .map_err(|e| connection_error(&e))?;

        // Extract version number (e.g., "PostgreSQL 15.3 on x86_64..." -> "15.3")
        let version_string: String = row.try_get(0).map_err(|e| query_error("version", &e))?;
        let version = version_string.split_whitespace().nth(1).unwrap_or("unknown");

        Ok(format!("PostgreSQL {version}"))
    }

    fn ping(&mut self) -> Result<()> {
        if self.client.is_closed() {
            return Err(PantryError::connection_failed("connection closed"));
        }

        self.interrupt
            .block_on(&self.runtime, self.client.simple_query("SELECT 1"))?
            .map(|_| ())
            .map_err(|e| connection_error(&e))
    }

    fn probe_first(&mut self, table: &TableName) -> Result<bool> {
        let sql = format!("SELECT id FROM \"{table}\" WHERE id = 1");
        let row = self
            .interrupt
            .block_on(&self.runtime, self.client.query_opt(sql.as_str(), &[]))?
            .map_err(|e| query_error("probe", &e))?;

        Ok(row.is_some())
    }

    fn recreate_table(&mut self, table: &TableName) -> Result<()> {
        self.interrupt
            .block_on(
                &self.runtime,
                self.client.batch_execute(&format!(
                "DROP TABLE IF EXISTS \"{table}\";
                 CREATE TABLE \"{table}\" (
                    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                    name VARCHAR(25),
                    description VARCHAR(50),
                    qty VARCHAR(10),
                    modified TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
                 );"
                )),
            )?
            .map_err(|e| query_error("reset", &e))
    }

    fn max_id(&mut self, table: &TableName) -> Result<Option<i64>> {
        let sql = format!("SELECT MAX(id) FROM \"{table}\"");
        let row = self
            .interrupt
            .block_on(&self.runtime, self.client.query_one(sql.as_str(), &[]))?
            .map_err(|e| query_error("max id", &e))?;

        row.try_get(0).map_err(|e| query_error("max id", &e))
    }

    fn fetch_all(&mut self, table: &TableName) -> Result<ItemTable> {
        let Self { runtime, client, interrupt } = self;

        interrupt.block_on(runtime, async {
            let stmt = client
                .prepare(&format!("SELECT id, name, description, qty, modified FROM \"{table}\""))
                .await
                .map_err(|e| query_error("prepare list", &e))?;

            let columns: Vec<String> =
                stmt.columns().iter().map(|col| col.name().to_string()).collect();

            let rows = client.query(&stmt, &[]).await.map_err(|e| query_error("list", &e))?;

            let items = rows.iter().map(item_from_row).collect::<Result<Vec<_>>>()?;
            Ok::<_, PantryError>(ItemTable::new(columns, items))
        })?
    }

    fn fetch_one(&mut self, table: &TableName, id: i64) -> Result<Option<Item>> {
        let sql =
            format!("SELECT id, name, description, qty, modified FROM \"{table}\" WHERE id = $1");
        let row = self
            .interrupt
            .block_on(&self.runtime, self.client.query_opt(sql.as_str(), &[&id]))?
            .map_err(|e| query_error("select", &e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    fn insert(&mut self, table: &TableName, item: &NewItem) -> Result<i64> {
        let sql = format!(
            "INSERT INTO \"{table}\" (name, description, qty) VALUES ($1, $2, $3) RETURNING id"
        );
        let row = self
            .interrupt
            .block_on(
                &self.runtime,
                self.client.query_one(sql.as_str(), &[&item.name, &item.description, &item.qty]),
            )?
            .map_err(|e| query_error("insert", &e))?;

        row.try_get(0).map_err(|e| query_error("insert", &e))
    }

    fn update(&mut self, table: &TableName, id: i64, item: &NewItem) -> Result<u64> {
        let sql = format!(
            "UPDATE \"{table}\"
             SET name = $1, description = $2, qty = $3, modified = CURRENT_TIMESTAMP
             WHERE id = $4"
        );
        self.interrupt
            .block_on(
                &self.runtime,
                self.client
                    .execute(sql.as_str(), &[&item.name, &item.description, &item.qty, &id]),
            )?
            .map_err(|e| query_error("update", &e))
    }

    fn delete(&mut self, table: &TableName, id: i64) -> Result<u64> {
        let sql = format!("DELETE FROM \"{table}\" WHERE id = $1");
        self.interrupt
            .block_on(&self.runtime, self.client.execute(sql.as_str(), &[&id]))?
            .map_err(|e| query_error("delete", &e))
    }

    fn close(self: Box<Self>) -> Result<()> {
        // Dropping the client ends the connection task
        let Self { runtime, client, .. } = *self;
        drop(client);
        drop(runtime);
        Ok(())
    }
}

/// Build `PostgreSQL` connection config from `ConnectionConfig`
fn build_pg_config(config: &ConnectionConfig) -> Result<Config> {
    if config.host.is_empty() {
        return Err(PantryError::invalid_input("PostgreSQL requires a hostname"));
    }

    if config.user.is_empty() {
        return Err(PantryError::invalid_input("PostgreSQL requires a username"));
    }

    if config.database.is_empty() {
        return Err(PantryError::invalid_input("PostgreSQL requires a database name"));
    }

    let port = config
        .effective_port()
        .ok_or_else(|| PantryError::invalid_input("PostgreSQL requires a port"))?;

    let mut pg_config = Config::new();
    pg_config
        .host(&config.host)
        .port(port)
        .user(&config.user)
        .password(&config.password)
        .dbname(&config.database);

    Ok(pg_config)
}

/// Map a result row onto an `Item`
fn item_from_row(row: &Row) -> Result<Item> {
    let name: Option<String> = row.try_get(1).map_err(|e| query_error("read name", &e))?;
    let description: Option<String> =
        row.try_get(2).map_err(|e| query_error("read description", &e))?;
    let qty: Option<String> = row.try_get(3).map_err(|e| query_error("read qty", &e))?;
    let modified: Option<NaiveDateTime> =
        row.try_get(4).map_err(|e| query_error("read modified", &e))?;

    Ok(Item {
        id: row.try_get(0).map_err(|e| query_error("read id", &e))?,
        name: name.unwrap_or_default(),
        description: description.unwrap_or_default(),
        qty: qty.unwrap_or_default(),
        modified,
    })
}

fn native_code(e: &tokio_postgres::Error) -> Option<NativeCode> {
    e.code().map(|state| NativeCode::SqlState(state.code().to_string()))
}

fn server_message(e: &tokio_postgres::Error) -> String {
    e.as_db_error().map_or_else(|| e.to_string(), |db| db.message().to_string())
}

fn connection_error(e: &tokio_postgres::Error) -> PantryError {
    match native_code(e) {
        Some(code) => PantryError::connection_failed_with_code(code, server_message(e)),
        None => PantryError::connection_failed(server_message(e)),
    }
}

fn query_error(operation: &str, e: &tokio_postgres::Error) -> PantryError {
    let code = native_code(e).map_or_else(String::new, |c| format!(" (code {c})"));
    PantryError::query_failed(format!("postgres {operation} failed{code}: {}", server_message(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_database_error() {
        let config = ConnectionConfig::postgres("localhost", 5432, "user", "pass", "", "Food");

        let result = build_pg_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().message().contains("requires a database name"));
    }

    #[test]
    fn test_open_wrong_engine() {
        let mut config = ConnectionConfig::postgres("localhost", 5432, "user", "pass", "db", "Food");
        config.engine = DatabaseType::SQLite;

        let result = PostgresConnection::open(&config, Interrupt::new());
        assert!(result.is_err());
        assert!(result.err().unwrap().message().contains("Expected PostgreSQL engine"));
    }

    #[test]
    fn test_build_pg_config_uses_default_port() {
        let mut config = ConnectionConfig::postgres("localhost", 5432, "user", "pass", "db", "Food");
        config.port = None;

        let pg_config = build_pg_config(&config).unwrap();
        assert_eq!(pg_config.get_ports(), &[5432]);
        assert_eq!(pg_config.get_dbname(), Some("db"));
    }

    #[test]
    fn test_interrupt_abandons_silent_server() {
        // Completes the TCP handshake through the backlog, then never answers the startup message
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ConnectionConfig::postgres("127.0.0.1", port, "user", "pass", "db", "Food");

        let interrupt = Interrupt::new();
        let raiser = interrupt.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(200));
            raiser.raise();
        });

        let result = PostgresConnection::open(&config, interrupt);
        handle.join().unwrap();
        assert!(matches!(result, Err(PantryError::Interrupted)));
        drop(listener);
    }

    #[test]
    #[ignore] // Requires running PostgreSQL instance
    fn test_crud_against_server() {
        let config = ConnectionConfig::postgres(
            "localhost",
            5432,
            "pantryuser",
            "pantrypassword",
            "pantrydb",
            "PantryTest",
        );
        let table = TableName::parse("PantryTest").unwrap();

        let mut conn =
            PostgresConnection::open(&config, Interrupt::new()).expect("Connection failed");
        assert!(conn.server_version().unwrap().starts_with("PostgreSQL"));

        conn.recreate_table(&table).unwrap();
        let item = NewItem::new("Rice", "White rice", "2 bags").unwrap();
        assert_eq!(conn.insert(&table, &item).unwrap(), 1);
        assert_eq!(conn.update(&table, 1, &item).unwrap(), 1);
        assert_eq!(conn.delete(&table, 1).unwrap(), 1);
        assert_eq!(conn.max_id(&table).unwrap(), None);
        Box::new(conn).close().unwrap();
    }
}
