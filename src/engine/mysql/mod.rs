//! MySQL Database Engine Implementation
//!
//! This module implements the `StoreConnection` trait for MySQL databases (including MariaDB).
//!
//! # Features
//! - Client-server connections via TCP
//! - MySQL and MariaDB version detection
//! - `AUTO_INCREMENT` ids and an auto-updating `modified` TIMESTAMP
//!
//! # Implementation Notes
//! - Uses `mysql_async` (async driver) on a private current-thread tokio runtime
//! - Every call is `block_on`, so the driver never runs while the session is idle
//! - Every `block_on` races the interrupt, so Ctrl-C abandons a hung server
//! - DDL commits implicitly; DML runs in autocommit mode
//! - `modified` is set explicitly by UPDATE, as `ON UPDATE` skips no-op rewrites
//! - MySQL reports *changed* rows for UPDATE, so a zero count is re-checked
//!   against the table before it is reported as "no such row"

use chrono::{NaiveDate, NaiveDateTime};
use mysql_async::{prelude::*, Conn, OptsBuilder, Row, Value};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::engine::{
    ConnectionConfig, DatabaseType, Item, ItemTable, NewItem, StoreConnection, TableName,
};
use crate::error::{NativeCode, PantryError, Result};
use crate::signal::Interrupt;

/// MySQL connection
pub struct MySqlConnection {
    runtime: Runtime,
    conn: Conn,
    interrupt: Interrupt,
}

impl MySqlConnection {
    /// Connect to the server described by `config`
    pub fn open(config: &ConnectionConfig, interrupt: Interrupt) -> Result<Self> {
        // Validate config is for MySQL
        if config.engine != DatabaseType::MySQL {
            return Err(PantryError::invalid_input(format!(
                "Expected MySQL engine, got {}",
                config.engine
            )));
        }

        // Build connection options
        let opts = build_mysql_opts(config)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PantryError::engine_error("mysql", format!("Failed to start runtime: {e}")))?;

        // Connect to MySQL
        let conn =
            interrupt.block_on(&runtime, Conn::new(opts))?.map_err(|e| connection_error(&e))?;

        debug!(host = %config.host, database = %config.database, "connected to mysql");
        Ok(Self { runtime, conn, interrupt })
    }

    /// Whether a row with the given id exists
    fn exists(&mut self, table: &TableName, id: i64) -> Result<bool> {
        let Self { runtime, conn, interrupt } = self;
        let found: Option<Row> = interrupt
            .block_on(runtime, conn.exec_first(format!("SELECT id FROM `{table}` WHERE id = ?"), (id,)))?
            .map_err(|e| query_error("select", &e))?;

        Ok(found.is_some())
    }
}

impl StoreConnection for MySqlConnection {
    fn server_version(&mut self) -> Result<String> {
        let Self { runtime, conn, interrupt } = self;

        // Get MySQL version
        let version_string: Option<String> = interrupt
            .block_on(runtime, conn.query_first("SELECT VERSION()"))?
            .map_err(|e| connection_error(&e))?;

        let version_string = version_string
            .ok_or_else(|| PantryError::connection_failed("No version returned"))?;

        // Detect MySQL vs MariaDB
        let (_, server_info) = parse_mysql_version(&version_string);
        Ok(server_info)
    }

    fn ping(&mut self) -> Result<()> {
        let Self { runtime, conn, interrupt } = self;
        interrupt.block_on(runtime, conn.ping())?.map_err(|e| connection_error(&e))
    }

    fn probe_first(&mut self, table: &TableName) -> Result<bool> {
        self.exists(table, 1)
    }

    fn recreate_table(&mut self, table: &TableName) -> Result<()> {
        let Self { runtime, conn, interrupt } = self;

        interrupt
            .block_on(runtime, conn.query_drop(format!("DROP TABLE IF EXISTS `{table}`")))?
            .map_err(|e| query_error("drop table", &e))?;

        interrupt
            .block_on(
                runtime,
                conn.query_drop(format!(
                    "CREATE TABLE `{table}` (
                        id INT NOT NULL AUTO_INCREMENT,
                        PRIMARY KEY (id),
                        name VARCHAR(25),
                        description VARCHAR(50),
                        qty VARCHAR(10),
                        modified TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
                    )"
                )),
            )?
            .map_err(|e| query_error("create table", &e))
    }

    fn max_id(&mut self, table: &TableName) -> Result<Option<i64>> {
        let Self { runtime, conn, interrupt } = self;

        // MAX() over an empty table yields one NULL row
        let max: Option<Option<i64>> = interrupt
            .block_on(runtime, conn.query_first(format!("SELECT MAX(id) FROM `{table}`")))?
            .map_err(|e| query_error("max id", &e))?;

        Ok(max.flatten())
    }

    fn fetch_all(&mut self, table: &TableName) -> Result<ItemTable> {
        let Self { runtime, conn, interrupt } = self;

        interrupt.block_on(runtime, async {
            let mut result = conn
                .query_iter(format!("SELECT id, name, description, qty, modified FROM `{table}`"))
                .await
                .map_err(|e| query_error("list", &e))?;

            // Column metadata is available even when the result set is empty
            let columns: Vec<String> =
                result.columns_ref().iter().map(|col| col.name_str().to_string()).collect();

            let rows: Vec<Row> = result.collect().await.map_err(|e| query_error("list", &e))?;

            let items = rows.into_iter().map(item_from_row).collect::<Result<Vec<_>>>()?;
            Ok::<_, PantryError>(ItemTable::new(columns, items))
        })?
    }

    fn fetch_one(&mut self, table: &TableName, id: i64) -> Result<Option<Item>> {
        let Self { runtime, conn, interrupt } = self;

        let row: Option<Row> = interrupt
            .block_on(
                runtime,
                conn.exec_first(
                    format!("SELECT id, name, description, qty, modified FROM `{table}` WHERE id = ?"),
                    (id,),
                ),
            )?
            .map_err(|e| query_error("select", &e))?;

        row.map(item_from_row).transpose()
    }

    fn insert(&mut self, table: &TableName, item: &NewItem) -> Result<i64> {
        let Self { runtime, conn, interrupt } = self;

        interrupt
            .block_on(
                runtime,
                conn.exec_drop(
                    format!("INSERT INTO `{table}` (name, description, qty) VALUES (?, ?, ?)"),
                    (item.name.as_str(), item.description.as_str(), item.qty.as_str()),
                ),
            )?
            .map_err(|e| query_error("insert", &e))?;

        let id = conn
            .last_insert_id()
            .ok_or_else(|| PantryError::engine_error("mysql", "No insert id returned"))?;

        i64::try_from(id)
            .map_err(|_| PantryError::engine_error("mysql", format!("insert id {id} out of range")))
    }

    fn update(&mut self, table: &TableName, id: i64, item: &NewItem) -> Result<u64> {
        let changed = {
            let Self { runtime, conn, interrupt } = &mut *self;
            interrupt
                .block_on(
                    runtime,
                    conn.exec_drop(
                        format!(
                            "UPDATE `{table}`
                             SET name = ?, description = ?, qty = ?, modified = CURRENT_TIMESTAMP
                             WHERE id = ?"
                        ),
                        (item.name.as_str(), item.description.as_str(), item.qty.as_str(), id),
                    ),
                )?
                .map_err(|e| query_error("update", &e))?;
            conn.affected_rows()
        };

        // A rewrite within the same second changes nothing but still matched the row
        if changed == 0 && self.exists(table, id)? {
            return Ok(1);
        }

        Ok(changed)
    }

    fn delete(&mut self, table: &TableName, id: i64) -> Result<u64> {
        let Self { runtime, conn, interrupt } = self;

        interrupt
            .block_on(runtime, conn.exec_drop(format!("DELETE FROM `{table}` WHERE id = ?"), (id,)))?
            .map_err(|e| query_error("delete", &e))?;

        Ok(conn.affected_rows())
    }

    fn close(self: Box<Self>) -> Result<()> {
        let Self { runtime, conn, interrupt } = *self;
        interrupt
            .block_on(&runtime, conn.disconnect())?
            .map_err(|e| PantryError::engine_error("mysql", format!("Failed to disconnect: {e}")))
    }
}

/// Build MySQL connection options from `ConnectionConfig`
fn build_mysql_opts(config: &ConnectionConfig) -> Result<OptsBuilder> {
    if config.host.is_empty() {
        return Err(PantryError::invalid_input("MySQL requires a hostname"));
    }

    if config.user.is_empty() {
        return Err(PantryError::invalid_input("MySQL requires a username"));
    }

    if config.database.is_empty() {
        return Err(PantryError::invalid_input("MySQL requires a database name"));
    }

    let port = config
        .effective_port()
        .ok_or_else(|| PantryError::invalid_input("MySQL requires a port"))?;

    let opts = OptsBuilder::default()
        .ip_or_hostname(config.host.clone())
        .tcp_port(port)
        .user(Some(config.user.clone()))
        .pass(Some(config.password.clone()))
        .db_name(Some(config.database.clone()));

    Ok(opts)
}

/// Parse MySQL version string to detect MySQL vs MariaDB
fn parse_mysql_version(version_string: &str) -> (String, String) {
    // Example MySQL: "8.0.35"
    // Example MariaDB: "10.11.2-MariaDB"

    if version_string.to_uppercase().contains("MARIADB") {
        let version = version_string.split('-').next().unwrap_or("unknown").to_string();
        let info = format!("MariaDB {version}");
        (version, info)
    } else {
        let version =
            version_string.split_whitespace().next().unwrap_or(version_string).to_string();
        let info = format!("MySQL {version}");
        (version, info)
    }
}

/// Map a result row onto an `Item`
fn item_from_row(mut row: Row) -> Result<Item> {
    let id: i64 = take(&mut row, 0)?;
    let name: Option<String> = take(&mut row, 1)?;
    let description: Option<String> = take(&mut row, 2)?;
    let qty: Option<String> = take(&mut row, 3)?;
    let modified: Value = take(&mut row, 4)?;

    Ok(Item {
        id,
        name: name.unwrap_or_default(),
        description: description.unwrap_or_default(),
        qty: qty.unwrap_or_default(),
        modified: timestamp_from_value(&modified),
    })
}

fn take<T: FromValue>(row: &mut Row, idx: usize) -> Result<T> {
    row.take_opt(idx)
        .ok_or_else(|| PantryError::query_failed(format!("Missing column at index {idx}")))?
        .map_err(|e| PantryError::query_failed(format!("Bad value at index {idx}: {e}")))
}

/// Convert a MySQL DATETIME/TIMESTAMP value; zero dates map to `None`
fn timestamp_from_value(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Date(year, month, day, hour, minute, second, micro) => {
            NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))?
                .and_hms_micro_opt(
                    u32::from(*hour),
                    u32::from(*minute),
                    u32::from(*second),
                    *micro,
                )
        }
        Value::Bytes(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()),
        _ => None,
    }
}

fn native_code(e: &mysql_async::Error) -> Option<NativeCode> {
    match e {
        mysql_async::Error::Server(server) => Some(NativeCode::Numeric(i64::from(server.code))),
        _ => None,
    }
}

fn server_message(e: &mysql_async::Error) -> String {
    match e {
        mysql_async::Error::Server(server) => server.message.clone(),
        other => other.to_string(),
    }
}

fn connection_error(e: &mysql_async::Error) -> PantryError {
    match native_code(e) {
        Some(code) => PantryError::connection_failed_with_code(code, server_message(e)),
        None => PantryError::connection_failed(server_message(e)),
    }
}

fn query_error(operation: &str, e: &mysql_async::Error) -> PantryError {
    let code = native_code(e).map_or_else(String::new, |c| format!(" (code {c})"));
    PantryError::query_failed(format!("mysql {operation} failed{code}: {}", server_message(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mysql_version() {
        let (version, info) = parse_mysql_version("8.0.35");
        assert_eq!(version, "8.0.35");
        assert_eq!(info, "MySQL 8.0.35");

        let (version, info) = parse_mysql_version("10.11.2-MariaDB");
        assert_eq!(version, "10.11.2");
        assert_eq!(info, "MariaDB 10.11.2");
    }

    #[test]
    fn test_open_wrong_engine() {
        let mut config =
            ConnectionConfig::mysql("localhost", 3306, "root", "password", "test", "Food");
        config.engine = DatabaseType::Postgres;

        let result = MySqlConnection::open(&config, Interrupt::new());
        assert!(result.is_err());
        assert!(result.err().unwrap().message().contains("Expected MySQL engine"));
    }

    #[test]
    fn test_open_missing_host() {
        let config = ConnectionConfig::mysql("", 3306, "root", "password", "test", "Food");

        let result = MySqlConnection::open(&config, Interrupt::new());
        assert!(result.is_err());
        assert!(result.err().unwrap().message().contains("MySQL requires a hostname"));
    }

    #[test]
    fn test_timestamp_from_value() {
        let value = Value::Date(2024, 3, 1, 12, 30, 45, 0);
        let ts = timestamp_from_value(&value).unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 12:30:45");

        // Zero dates are legal in MySQL but not in chrono
        assert!(timestamp_from_value(&Value::Date(0, 0, 0, 0, 0, 0, 0)).is_none());
        assert!(timestamp_from_value(&Value::NULL).is_none());

        let text = Value::Bytes(b"2024-03-01 12:30:45".to_vec());
        assert!(timestamp_from_value(&text).is_some());
    }

    #[test]
    fn test_interrupt_abandons_silent_server() {
        // Accepts TCP connections through the backlog but never sends a handshake
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ConnectionConfig::mysql("127.0.0.1", port, "root", "", "test", "Food");

        let interrupt = Interrupt::new();
        let raiser = interrupt.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(200));
            raiser.raise();
        });

        let result = MySqlConnection::open(&config, interrupt);
        handle.join().unwrap();
        assert!(matches!(result, Err(PantryError::Interrupted)));
        drop(listener);
    }

    // Note: Integration tests require a running MySQL instance
    // They are marked with #[ignore] and should be run with:
    // cargo test --features mysql -- --ignored

    #[test]
    #[ignore] // Requires running MySQL instance
    fn test_crud_against_server() {
        let config = ConnectionConfig::mysql(
            "localhost",
            3306,
            "pantryuser",
            "pantrypassword",
            "pantrydb",
            "PantryTest",
        );
        let table = TableName::parse("PantryTest").unwrap();

        let mut conn = MySqlConnection::open(&config, Interrupt::new()).expect("Connection failed");
        assert!(conn.server_version().unwrap().contains("M"));

        conn.recreate_table(&table).unwrap();
        let item = NewItem::new("Rice", "White rice", "2 bags").unwrap();
        assert_eq!(conn.insert(&table, &item).unwrap(), 1);

        // Identical rewrite still counts as matched
        assert_eq!(conn.update(&table, 1, &item).unwrap(), 1);
        assert_eq!(conn.update(&table, 42, &item).unwrap(), 0);

        assert_eq!(conn.delete(&table, 1).unwrap(), 1);
        assert_eq!(conn.max_id(&table).unwrap(), None);
        Box::new(conn).close().unwrap();
    }
}
