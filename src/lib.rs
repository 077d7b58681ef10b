//! Pantry - Interactive Inventory Manager
//!
//! Pantry keeps a small food inventory (name, description, quantity, last
//! modified) in a single SQL table and manages it through nested text menus.
//!
//! # Core Principles
//! - One user, one terminal, one live connection at a time
//! - Vendor-specific SQL per engine, no query abstraction layer
//! - Every store failure is reported and the session carries on
//! - Only Quit and Ctrl-C end a session, and both disconnect cleanly
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`engine`] - Store connection trait and the `SQLite`, `MySQL` and `PostgreSQL` engines
//! - [`gateway`] - Connection lifecycle and row CRUD with soft failures
//! - [`menu`] - Menu model and numeric selection validation
//! - [`prompt`] - Terminal I/O boundary (interactive and scripted)
//! - [`session`] - The menu-driven state machine and its handlers
//! - [`output`] - Rendering of inventory rows
//! - [`config`] - Layered configuration and logging setup
//! - [`signal`] - Ctrl-C watcher and interruptible blocking calls

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod menu;
pub mod output;
pub mod prompt;
pub mod session;
pub mod signal;

// Re-export commonly used types for convenience
pub use config::{
    load_with_precedence, resolve_connection, save_connection, LogFormat, LoggingConfig,
    PantryConfig, StoredConnection,
};
pub use engine::{
    ConnectionConfig, DatabaseType, Item, ItemTable, NewItem, StoreConnection, TableName,
};
pub use error::{NativeCode, PantryError, Result};
pub use gateway::PersistenceGateway;
pub use menu::{validate_numeric, Command, Menu, MenuEntry, MenuKind};
pub use prompt::{Prompter, ScriptedPrompter, TerminalPrompter};
pub use session::{Outcome, SessionController};
pub use signal::Interrupt;
