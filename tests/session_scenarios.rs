//! Scripted Session Tests
//!
//! Drives `SessionController` end to end through `ScriptedPrompter` against
//! `SQLite` databases. Each scenario lists the exact answers a user would type
//! and then checks what was shown and what ended up in the table.

#![cfg(feature = "sqlite")]

use std::path::Path;

use pantry::config;
use pantry::menu::{Command, MenuKind, INVALID_INPUT};
use pantry::session::{Outcome, OPEN_DATABASE_FIRST};
use pantry::{
    ConnectionConfig, DatabaseType, PersistenceGateway, ScriptedPrompter, SessionController,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn memory_config() -> ConnectionConfig {
    ConnectionConfig::sqlite(":memory:", "Food")
}

fn file_config(path: &Path) -> ConnectionConfig {
    ConnectionConfig::sqlite(path.to_string_lossy().into_owned(), "Food")
}

/// Create an initialized database file holding `names`
fn seeded_file(dir: &TempDir, names: &[&str]) -> ConnectionConfig {
    let config = file_config(&dir.path().join("pantry.db"));
    let mut gateway = PersistenceGateway::new(config.clone()).unwrap();
    gateway.connect().unwrap();
    assert!(gateway.reset(true));
    for name in names {
        gateway.insert(name, "seeded", "1").unwrap();
    }
    config
}

fn run_session(config: ConnectionConfig, answers: &[&str]) -> ScriptedPrompter {
    let mut session =
        SessionController::new(ScriptedPrompter::new(answers.iter().copied()), config);
    session.begin().expect("session ends cleanly");
    session.into_prompter()
}

fn connected_session(
    config: ConnectionConfig,
    answers: &[&str],
) -> SessionController<ScriptedPrompter> {
    let mut script = vec!["n"];
    script.extend_from_slice(answers);
    let mut session = SessionController::new(ScriptedPrompter::new(script), config);
    session.dispatch(Command::OpenDatabase).unwrap();
    session
}

fn names(config: &ConnectionConfig) -> Vec<String> {
    let mut gateway = PersistenceGateway::new(config.clone()).unwrap();
    gateway.connect().unwrap();
    gateway.list_all().unwrap().rows.into_iter().map(|item| item.name).collect()
}

// ============================================================================
// Full Walkthrough
// ============================================================================

#[test]
fn test_full_walkthrough() {
    let prompter = run_session(
        memory_config(),
        &[
            "n", // use defaults
            "1", // Database Options
            "1", // Check Database
            "y", "y", // initialize
            "4", // Back to Main Menu
            "0", // Data Entry
            "0", // Input Foods
            "y", "Rice", "White rice", "2 bags", "n", //
            "1", // Modify Foods
            "y", "1", "", "Brown rice", "", "n", //
            "2", // Delete Foods
            "y", "1", "y", "n", //
            "3", // Back to Main Menu
            "2", // Quit Program
        ],
    );

    assert_eq!(prompter.remaining(), 0);
    for expected in [
        "Using default connection values",
        "Connected to database.",
        "It appears the database has not been initialized",
        "Successfully initialized database!",
        "ID | NAME | DESCRIPTION | QTY | MODIFIED",
        "No items in database yet.",
        "Item #1 added.",
        "#1 -> Rice: White rice, 2 bags (",
        "-> Now editing the following entry:",
        "? Change name? [Rice]",
        "Entry #1 Modified Successfully",
        "#1 -> Rice: Brown rice, 2 bags (",
        "Item #1 deleted successfully!",
        "Database disconnected successfully.",
        "Exiting!",
    ] {
        assert!(prompter.output_contains(expected), "missing output: {expected}");
    }
    assert!(!prompter.output_contains(INVALID_INPUT));
    assert!(!prompter.output_contains("Keyboard Interrupted"));
}

// ============================================================================
// Connection Setup
// ============================================================================

#[test]
fn test_connection_failure_then_data_guard() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir.path().join("missing").join("pantry.db"));

    let prompter = run_session(config, &["n", "0", "2"]);

    assert!(prompter.output_contains("ERROR "));
    assert_eq!(prompter.count(OPEN_DATABASE_FIRST), 1);
    assert!(!prompter.output_contains("-> Data Menu"));
    assert!(prompter.output_contains("Database already disconnected!"));
    assert!(prompter.output_contains("Exiting!"));
}

#[test]
fn test_configure_connection_and_save_defaults() {
    let dir = TempDir::new().unwrap();
    let save_path = dir.path().join(".pantry").join("config.json");

    let script = [
        "y",        // configure
        "sqlite",   // engine
        ":memory:", // database file
        "bad-name", // rejected table name
        "Snacks",   // table
        "y",        // save defaults
        "2",        // quit
    ];
    let mut session =
        SessionController::new(ScriptedPrompter::new(script), ConnectionConfig::default())
            .with_save_path(&save_path);
    session.begin().unwrap();

    assert_eq!(session.config().engine, DatabaseType::SQLite);
    assert_eq!(session.config().table, "Snacks");

    let prompter = session.into_prompter();
    assert!(prompter.output_contains("Invalid input: table name 'bad-name'"));
    assert!(prompter.output_contains("Connected to database."));
    assert!(prompter.output_contains("Settings saved."));

    let saved = config::load_file(&save_path).unwrap().unwrap();
    assert_eq!(saved.connection.config.engine, DatabaseType::SQLite);
    assert_eq!(saved.connection.config.database, ":memory:");
    assert_eq!(saved.connection.config.table, "Snacks");
}

#[test]
fn test_unchanged_settings_are_not_offered_for_saving() {
    let dir = TempDir::new().unwrap();
    let save_path = dir.path().join("config.json");

    let mut session = SessionController::new(ScriptedPrompter::new(["n", "2"]), memory_config())
        .with_save_path(&save_path);
    session.begin().unwrap();

    assert!(!session.prompter().output_contains("Save these settings"));
    assert!(!save_path.exists());
}

#[test]
fn test_settings_from_failed_connect_are_offered_once_connected() {
    let dir = TempDir::new().unwrap();
    let save_path = dir.path().join("config.json");
    let pending = dir.path().join("later");
    let database = pending.join("pantry.db").to_string_lossy().into_owned();

    let script = [
        "y",               // configure
        "",                // keep sqlite
        database.as_str(), // directory does not exist yet
        "Snacks",          // table
        "n",               // retry with the edited settings
        "y",               // save defaults
        "n",               // reconnect after closing
    ];
    let mut session = SessionController::new(ScriptedPrompter::new(script), memory_config())
        .with_save_path(&save_path);

    session.dispatch(Command::OpenDatabase).unwrap();
    assert!(session.prompter().output_contains("ERROR "));
    assert!(!session.prompter().output_contains("Save these settings"));

    std::fs::create_dir_all(&pending).unwrap();
    session.dispatch(Command::OpenDatabase).unwrap();
    assert!(session.prompter().output_contains("Settings saved."));

    let saved = config::load_file(&save_path).unwrap().unwrap();
    assert_eq!(saved.connection.config.database, database);
    assert_eq!(saved.connection.config.table, "Snacks");

    // Saved settings are the new baseline
    session.dispatch(Command::CloseDatabase).unwrap();
    session.dispatch(Command::OpenDatabase).unwrap();
    let prompter = session.into_prompter();
    assert_eq!(prompter.count("Save these settings"), 1);
    assert_eq!(prompter.remaining(), 0);
}

#[test]
fn test_open_database_when_connected() {
    let mut session = connected_session(memory_config(), &[]);

    session.dispatch(Command::OpenDatabase).unwrap();
    assert!(session.prompter().output_contains("Already connected to database!"));
}

#[test]
fn test_close_database_twice() {
    let mut session = connected_session(memory_config(), &[]);

    session.dispatch(Command::CloseDatabase).unwrap();
    session.dispatch(Command::CloseDatabase).unwrap();

    assert_eq!(session.prompter().count("Database disconnected successfully."), 1);
    assert_eq!(session.prompter().count("Database already disconnected!"), 1);
}

// ============================================================================
// Menus and Interrupts
// ============================================================================

#[test]
fn test_data_menu_requires_connection() {
    let mut session = connected_session(memory_config(), &[]);
    session.dispatch(Command::CloseDatabase).unwrap();
    session.dispatch(Command::Switch(MenuKind::Data)).unwrap();

    assert_eq!(session.step().unwrap(), Outcome::Continue);
    assert_eq!(session.selector(), MenuKind::Main);
    assert!(session.prompter().output_contains(OPEN_DATABASE_FIRST));
}

#[test]
fn test_menu_rejects_out_of_range_and_non_digits() {
    let prompter = run_session(memory_config(), &["n", "3", "x", "-1", "2"]);

    assert_eq!(prompter.count(INVALID_INPUT), 3);
    assert!(prompter.output_contains("? Select an option [0-2]:"));
    assert!(prompter.output_contains("Exiting!"));
}

#[test]
fn test_every_menu_validates_its_own_range() {
    let mut session = connected_session(memory_config(), &["1", "5", "4", "0", "4", "3", "2"]);

    // Main -> Database (5 entries: "5" rejected, "4" accepted)
    assert_eq!(session.step().unwrap(), Outcome::Continue);
    assert_eq!(session.selector(), MenuKind::Database);
    assert_eq!(session.step().unwrap(), Outcome::Continue);
    assert_eq!(session.selector(), MenuKind::Main);

    // Main -> Data (4 entries: "4" rejected, "3" accepted)
    assert_eq!(session.step().unwrap(), Outcome::Continue);
    assert_eq!(session.step().unwrap(), Outcome::Continue);
    assert_eq!(session.selector(), MenuKind::Main);

    assert_eq!(session.step().unwrap(), Outcome::Terminate);
    assert_eq!(session.prompter().count(INVALID_INPUT), 2);
    assert!(session.prompter().output_contains("? Select an option [0-4]:"));
    assert!(session.prompter().output_contains("? Select an option [0-3]:"));
}

#[test]
fn test_interrupt_runs_shutdown() {
    let prompter = run_session(memory_config(), &["n", "0", "0"]);

    assert!(prompter.output_contains("Keyboard Interrupted"));
    assert!(prompter.output_contains("Database disconnected successfully."));
    let last = prompter.transcript().last().unwrap();
    assert_eq!(last, "Exiting!");
}

#[test]
fn test_interrupt_before_connecting() {
    let prompter = run_session(memory_config(), &[]);

    assert!(prompter.output_contains("Keyboard Interrupted"));
    assert!(prompter.output_contains("Database not loaded in this instance"));
    assert!(prompter.output_contains("Exiting!"));
}

// ============================================================================
// Data Entry Loops
// ============================================================================

#[test]
fn test_input_loop_reports_over_long_fields() {
    let dir = TempDir::new().unwrap();
    let config = seeded_file(&dir, &[]);
    let long_name = "n".repeat(26);

    let mut session = connected_session(
        config.clone(),
        &["y", long_name.as_str(), "desc", "1", "y", "Tea", "Green", "1 box", "n"],
    );
    session.dispatch(Command::InputItems).unwrap();

    assert!(session.prompter().output_contains("name is 26 characters long, the limit is 25"));
    assert!(session.prompter().output_contains("Item #1 added."));
    assert_eq!(names(&config), vec!["Tea"]);
}

#[test]
fn test_modify_loop_rejects_bad_ids_and_continues() {
    let dir = TempDir::new().unwrap();
    let config = seeded_file(&dir, &["Rice", "Beans"]);

    let mut session = connected_session(
        config.clone(),
        &["y", "9", "y", "0", "y", "abc", "y", "2", "Lentils", "", "", "n"],
    );
    session.dispatch(Command::ModifyItems).unwrap();

    let prompter = session.prompter();
    assert_eq!(prompter.count(INVALID_INPUT), 3);
    assert!(prompter.output_contains("Entry #9 appears to not exist, please retry"));
    assert!(prompter.output_contains("Entry #0 appears to not exist, please retry"));
    assert!(prompter.output_contains("Entry #abc appears to not exist, please retry"));
    assert!(prompter.output_contains("Entry #2 Modified Successfully"));
    assert_eq!(names(&config), vec!["Rice", "Lentils"]);
}

#[test]
fn test_modify_loop_reports_deleted_gap() {
    let dir = TempDir::new().unwrap();
    let config = seeded_file(&dir, &["Rice", "Beans", "Oats"]);
    {
        let mut gateway = PersistenceGateway::new(config.clone()).unwrap();
        gateway.connect().unwrap();
        assert!(gateway.remove(2));
    }

    // 2 is inside [1, next id) but no longer exists
    let mut session = connected_session(config, &["y", "2", "n"]);
    session.dispatch(Command::ModifyItems).unwrap();

    assert!(!session.prompter().output_contains(INVALID_INPUT));
    assert!(session.prompter().output_contains("Entry #2 appears to not exist, please retry"));
}

#[test]
fn test_modify_keeps_fields_on_empty_input() {
    let dir = TempDir::new().unwrap();
    let config = seeded_file(&dir, &["Rice"]);

    let mut session = connected_session(config.clone(), &["y", "1", "", "", "5 kg", "n"]);
    session.dispatch(Command::ModifyItems).unwrap();

    let mut gateway = PersistenceGateway::new(config).unwrap();
    gateway.connect().unwrap();
    let item = gateway.select_one(1).unwrap();
    assert_eq!(
        (item.name.as_str(), item.description.as_str(), item.qty.as_str()),
        ("Rice", "seeded", "5 kg")
    );
}

#[test]
fn test_delete_loop_second_confirmation_exits() {
    let dir = TempDir::new().unwrap();
    let config = seeded_file(&dir, &["Rice", "Beans"]);

    let mut session = connected_session(config.clone(), &["y", "1", "n"]);
    session.dispatch(Command::DeleteItems).unwrap();

    assert_eq!(session.prompter().remaining(), 0);
    assert!(!session.prompter().output_contains("deleted"));
    assert_eq!(names(&config), vec!["Rice", "Beans"]);
}

#[test]
fn test_delete_loop_invalid_id_continues() {
    let dir = TempDir::new().unwrap();
    let config = seeded_file(&dir, &["Rice", "Beans", "Oats"]);

    let mut session = connected_session(config.clone(), &["y", "4", "y", "2", "y", "n"]);
    session.dispatch(Command::DeleteItems).unwrap();

    assert_eq!(session.prompter().count(INVALID_INPUT), 1);
    assert!(session.prompter().output_contains("Item #2 deleted successfully!"));
    assert_eq!(names(&config), vec!["Rice", "Oats"]);

    let mut gateway = PersistenceGateway::new(config).unwrap();
    gateway.connect().unwrap();
    assert_eq!(gateway.next_id(), Some(4));
}

#[test]
fn test_display_without_table() {
    let mut session = connected_session(memory_config(), &["n"]);
    session.dispatch(Command::InputItems).unwrap();

    assert!(session.prompter().output_contains("No information retrieved - try connecting first?"));
}

// ============================================================================
// Check and Reset
// ============================================================================

#[test]
fn test_reset_flow_second_confirmation_declined() {
    let dir = TempDir::new().unwrap();
    let config = seeded_file(&dir, &["Rice", "Beans"]);

    let mut session = connected_session(config.clone(), &["y", "n"]);
    session.dispatch(Command::ResetDatabase).unwrap();

    assert!(!session.prompter().output_contains("Successfully initialized database!"));
    assert!(!session.prompter().output_contains("Wipe unsuccessful"));
    assert_eq!(names(&config), vec!["Rice", "Beans"]);
}

#[test]
fn test_reset_flow_confirmed_wipes_table() {
    let dir = TempDir::new().unwrap();
    let config = seeded_file(&dir, &["Rice", "Beans"]);

    let mut session = connected_session(config.clone(), &["yes", "Y"]);
    session.dispatch(Command::ResetDatabase).unwrap();

    assert!(session.prompter().output_contains("Successfully initialized database!"));
    assert!(names(&config).is_empty());
}

#[test]
fn test_reset_flow_reports_failure_when_disconnected() {
    let mut session = connected_session(memory_config(), &["y", "y"]);
    session.dispatch(Command::CloseDatabase).unwrap();
    session.dispatch(Command::ResetDatabase).unwrap();

    assert!(session.prompter().output_contains("Wipe unsuccessful - check DB connection?"));
}

#[test]
fn test_check_database_already_initialized() {
    let dir = TempDir::new().unwrap();
    let config = seeded_file(&dir, &["Rice"]);

    let mut session = connected_session(config, &[]);
    session.dispatch(Command::CheckDatabase).unwrap();

    assert!(session.prompter().output_contains("Database already initialized!"));
    assert!(!session.prompter().output_contains("(WARNING"));
}

#[test]
fn test_check_database_declined_leaves_table() {
    let dir = TempDir::new().unwrap();
    let config = seeded_file(&dir, &[]);

    let mut session = connected_session(config.clone(), &["n"]);
    session.dispatch(Command::CheckDatabase).unwrap();

    let prompter = session.prompter();
    assert!(prompter.output_contains("It appears the database has not been initialized"));
    assert!(prompter.output_contains("? (WARNING: This will erase all data!) [y/N]"));
    assert!(!prompter.output_contains("Are you really sure?"));
    assert!(names(&config).is_empty());
}
