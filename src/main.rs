//! Pantry CLI Entry Point
//!
//! Loads the layered configuration, starts logging on stderr, installs the
//! Ctrl-C watcher and hands the terminal to the interactive session.
//! Exits 0 on Quit and on Ctrl-C.

use anyhow::Context;
use clap::Parser;
use tracing::info;

use pantry::config;
use pantry::signal::watch_interrupts;
use pantry::{SessionController, TerminalPrompter};

/// Pantry - interactive pantry inventory manager
#[derive(Parser)]
#[command(name = "pantry")]
#[command(about = "Menu-driven pantry inventory manager for SQLite, MySQL and PostgreSQL")]
#[command(version)]
struct Cli {}

fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();

    let settings = config::load_with_precedence().context("Failed to load configuration")?;
    settings.logging.init().context("Failed to start logging")?;

    let connection =
        config::resolve_connection(&settings).context("Failed to resolve connection settings")?;
    let save_path = config::local_config_path().context("Failed to locate local config")?;
    let interrupt = watch_interrupts().context("Failed to install Ctrl-C handler")?;

    info!(engine = %connection.engine, "pantry starting");
    println!("Welcome to Pantry v{}", env!("CARGO_PKG_VERSION"));

    let mut session = SessionController::new(TerminalPrompter::new(interrupt.clone()), connection)
        .with_save_path(save_path)
        .with_interrupt(interrupt);
    session.begin().context("Session ended with an error")?;

    info!("pantry stopped");
    Ok(())
}
