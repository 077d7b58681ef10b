//! Interactive session controller
//!
//! Owns the menu selector, the connection snapshot, the gateway and the
//! prompter. [`SessionController::begin`] forces the connection-setup step,
//! then loops: show the menu the selector points at, dispatch the chosen
//! [`Command`], repeat until a handler returns [`Outcome::Terminate`].
//!
//! Every store failure is reported to the user and the loop goes on. Only Quit
//! and Ctrl-C end the session, and both run the shutdown handler.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config;
use crate::engine::{ConnectionConfig, DatabaseType, TableName};
use crate::error::{PantryError, Result};
use crate::gateway::PersistenceGateway;
use crate::menu::{parse_numeric, Command, Menu, MenuKind, INVALID_INPUT};
use crate::output::{render_entry, render_table};
use crate::prompt::Prompter;
use crate::signal::Interrupt;

/// Reported when a handler needs the gateway before one was ever built
pub const NOT_LOADED: &str = "Database not loaded in this instance";

/// Shown when the data menu is selected without a live connection
pub const OPEN_DATABASE_FIRST: &str = "!!! YOU MUST OPEN THE DATABASE FIRST!";

/// Whether the run loop keeps going after a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Terminate,
}

pub struct SessionController<P: Prompter> {
    prompter: P,
    config: ConnectionConfig,
    /// Last snapshot that was loaded or connected successfully
    baseline: ConnectionConfig,
    gateway: Option<PersistenceGateway>,
    interrupt: Interrupt,
    selector: MenuKind,
    main_menu: Menu,
    data_menu: Menu,
    database_menu: Menu,
    save_path: Option<PathBuf>,
}

impl<P: Prompter> SessionController<P> {
    /// `config` is the snapshot offered as defaults by the connection step
    pub fn new(prompter: P, config: ConnectionConfig) -> Self {
        let (main_menu, data_menu, database_menu) = build_menus();
        Self {
            prompter,
            baseline: config.clone(),
            config,
            gateway: None,
            interrupt: Interrupt::new(),
            selector: MenuKind::Main,
            main_menu,
            data_menu,
            database_menu,
            save_path: None,
        }
    }

    /// Offer to save changed connection settings to this file after connecting
    #[must_use]
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    /// Share the Ctrl-C state with every gateway this session opens
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    #[must_use]
    pub fn selector(&self) -> MenuKind {
        self.selector
    }

    pub fn select_menu(&mut self, kind: MenuKind) {
        self.selector = kind;
    }

    /// Current connection snapshot
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[must_use]
    pub fn gateway(&self) -> Option<&PersistenceGateway> {
        self.gateway.as_ref()
    }

    #[must_use]
    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn into_prompter(self) -> P {
        self.prompter
    }

    /// Run the session to completion
    ///
    /// A Ctrl-C anywhere prints a notice and runs the shutdown handler; it is
    /// not an error. Other failures also shut down before being returned.
    pub fn begin(&mut self) -> Result<()> {
        match self.run() {
            Ok(()) => Ok(()),
            Err(PantryError::Interrupted) => {
                // Handled here; the shutdown below must not see it again
                self.interrupt.take();
                self.prompter.say("Keyboard Interrupted");
                self.shutdown();
                Ok(())
            }
            Err(e) => {
                self.shutdown();
                Err(e)
            }
        }
    }

    fn run(&mut self) -> Result<()> {
        self.selector = MenuKind::Main;
        self.connect()?;

        while self.step()? == Outcome::Continue {}
        Ok(())
    }

    /// Show the selected menu once and dispatch the chosen command
    pub fn step(&mut self) -> Result<Outcome> {
        if self.selector == MenuKind::Data && !self.connected() {
            self.prompter.say(OPEN_DATABASE_FIRST);
            self.selector = MenuKind::Main;
            return Ok(Outcome::Continue);
        }

        let menu = match self.selector {
            MenuKind::Main => &self.main_menu,
            MenuKind::Data => &self.data_menu,
            MenuKind::Database => &self.database_menu,
        };
        let command = menu.display(&mut self.prompter)?;
        self.dispatch(command)
    }

    /// Run the handler for `command`
    pub fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        debug!(?command, "dispatching");
        match command {
            Command::Switch(kind) => self.selector = kind,
            Command::InputItems => self.input_items()?,
            Command::ModifyItems => self.modify_items()?,
            Command::DeleteItems => self.delete_items()?,
            Command::OpenDatabase => self.connect()?,
            Command::CheckDatabase => self.check()?,
            Command::CloseDatabase => self.disconnect(),
            Command::ResetDatabase => self.reset_flow()?,
            Command::Quit => return Ok(self.shutdown()),
        }
        Ok(Outcome::Continue)
    }

    fn connected(&mut self) -> bool {
        self.gateway.as_mut().is_some_and(PersistenceGateway::status)
    }

    /// Connection setup: optionally edit the snapshot, then open a fresh gateway
    fn connect(&mut self) -> Result<()> {
        if self.connected() {
            self.prompter.say("Already connected to database!");
            return Ok(());
        }

        let candidate =
            if self.prompter.confirm("Configure DB Connection? (no = use defaults) [y/N]:")? {
                self.prompt_config()?
            } else {
                self.prompter.say("Using default connection values");
                self.config.clone()
            };

        let mut gateway = match PersistenceGateway::new(candidate.clone()) {
            Ok(gateway) => gateway.with_interrupt(self.interrupt.clone()),
            Err(e) => {
                self.prompter.say(&e.message());
                return Ok(());
            }
        };

        let result = gateway.connect();
        self.config = candidate;
        self.gateway = Some(gateway);

        match result {
            Ok(version) => {
                self.prompter.say("Connected to database.");
                self.prompter.say(&format!("Server version: {version}"));
                if self.config != self.baseline {
                    self.baseline = self.config.clone();
                    self.offer_save()?;
                }
            }
            Err(PantryError::Interrupted) => return Err(PantryError::Interrupted),
            Err(e) => self.prompter.say(&e.message()),
        }
        Ok(())
    }

    /// Ask for every connection field; empty answers keep the current value
    fn prompt_config(&mut self) -> Result<ConnectionConfig> {
        let mut next = self.config.clone();

        next.engine = self.ask_engine(next.engine)?;
        if next.engine != DatabaseType::SQLite {
            next.host = self.prompter.ask_with_default("Hostname of the database server", &next.host)?;
            next.port = self.ask_port(next.port)?;
            next.user = self.prompter.ask_with_default("Username", &next.user)?;

            let password = self.prompter.read_secret("Password (empty keeps the current one)")?;
            if !password.is_empty() {
                next.password = password;
            }
        }

        let database_prompt = if next.engine == DatabaseType::SQLite {
            "Database file (:memory: for a scratch database)"
        } else {
            "Name of the database"
        };
        next.database = self.prompter.ask_with_default(database_prompt, &next.database)?;
        next.table = self.ask_table(&next.table)?;

        Ok(next)
    }

    fn ask_engine(&mut self, current: DatabaseType) -> Result<DatabaseType> {
        loop {
            let answer = self
                .prompter
                .ask_with_default("Database engine (mysql, postgres, sqlite)", current.as_str())?;
            match answer.parse() {
                Ok(engine) => return Ok(engine),
                Err(e) => self.prompter.say(&e.message()),
            }
        }
    }

    fn ask_port(&mut self, current: Option<u16>) -> Result<Option<u16>> {
        let shown = current.map_or_else(|| "default".to_string(), |p| p.to_string());
        loop {
            let answer = self.prompter.ask_with_default("Port", &shown)?;
            if answer == shown {
                return Ok(current);
            }
            match parse_numeric(&answer, u64::from(u16::MAX) + 1, 1) {
                Some(port) => return Ok(u16::try_from(port).ok()),
                None => self.prompter.say(INVALID_INPUT),
            }
        }
    }

    fn ask_table(&mut self, current: &str) -> Result<String> {
        loop {
            let answer = self.prompter.ask_with_default("Name of the table", current)?;
            match TableName::parse(&answer) {
                Ok(table) => return Ok(table.as_str().to_string()),
                Err(e) => self.prompter.say(&e.message()),
            }
        }
    }

    fn offer_save(&mut self) -> Result<()> {
        let Some(path) = self.save_path.clone() else {
            return Ok(());
        };

        let prompt = format!("Save these settings as defaults in {}? [y/N]", path.display());
        if !self.prompter.confirm(&prompt)? {
            return Ok(());
        }

        match config::save_connection(&path, &self.config) {
            Ok(()) => {
                info!(path = %path.display(), "connection settings saved");
                self.prompter.say("Settings saved.");
            }
            Err(e) => self.prompter.say(&e.message()),
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        let message = match self.gateway.as_mut().map(PersistenceGateway::disconnect) {
            Some(true) => "Database disconnected successfully.",
            Some(false) => "Database already disconnected!",
            None => NOT_LOADED,
        };
        self.prompter.say(message);
    }

    /// Header plus one line per row
    fn display(&mut self) {
        let Some(table) = self.gateway.as_mut().and_then(PersistenceGateway::list_all) else {
            self.prompter.say("No information retrieved - try connecting first?");
            return;
        };

        let mut lines = render_table(&table).into_iter();
        if let Some(header) = lines.next() {
            self.prompter.say(&header);
        }
        if table.is_empty() {
            self.prompter.say("No items in database yet.");
        }
        for line in lines {
            self.prompter.say(&line);
        }
    }

    fn input_items(&mut self) -> Result<()> {
        loop {
            self.display();
            if !self.prompter.confirm("Input new item? [y/N]")? {
                return Ok(());
            }

            let name = self.prompter.read_line("Name of item?:")?;
            let description = self.prompter.read_line("Description?:")?;
            let qty = self.prompter.read_line("Quantity of item?:")?;

            let Some(gateway) = self.gateway.as_mut() else {
                self.prompter.say(NOT_LOADED);
                continue;
            };
            match gateway.insert(&name, &description, &qty) {
                Ok(id) => self.prompter.say(&format!("Item #{id} added.")),
                Err(e) => self.prompter.say(&e.message()),
            }
        }
    }

    fn modify_items(&mut self) -> Result<()> {
        loop {
            self.display();
            if !self.prompter.confirm("Modify item? [y/N]")? {
                return Ok(());
            }

            let answer = self.prompter.read_line("ID of item?:")?;
            let Some(item) = self
                .validated_id(&answer)
                .and_then(|id| self.gateway.as_mut().and_then(|g| g.select_one(id)))
            else {
                self.prompter
                    .say(&format!("Entry #{} appears to not exist, please retry", answer.trim()));
                continue;
            };

            self.prompter.say("-> Now editing the following entry:");
            self.prompter.say(&render_entry(&item));

            let name = self.prompter.ask_with_default("Change name?", &item.name)?;
            let description =
                self.prompter.ask_with_default("Change description?", &item.description)?;
            let qty = self.prompter.ask_with_default("Change quantity?", &item.qty)?;

            let updated = self
                .gateway
                .as_mut()
                .is_some_and(|g| g.update(item.id, &name, &description, &qty));
            if updated {
                self.prompter.say(&format!("Entry #{} Modified Successfully", item.id));
            } else {
                self.prompter.say(&format!("Entry #{} NOT Modified - Error Occurred", item.id));
            }
        }
    }

    fn delete_items(&mut self) -> Result<()> {
        loop {
            self.display();
            if !self.prompter.confirm("Delete item? [y/N]")? {
                return Ok(());
            }

            let answer = self.prompter.read_line("ID of item?:")?;
            let Some(id) = self.validated_id(&answer) else {
                continue;
            };

            if !self.prompter.confirm("Are you sure you want to delete item? [y/N]")? {
                return Ok(());
            }

            if self.gateway.as_mut().is_some_and(|g| g.remove(id)) {
                self.prompter.say(&format!("Item #{id} deleted successfully!"));
            } else {
                self.prompter.say(&format!("Item #{id} NOT DELETED!"));
            }
        }
    }

    /// Check `answer` against `[1, next id)`, reporting invalid input
    fn validated_id(&mut self, answer: &str) -> Option<i64> {
        let upper = self
            .gateway
            .as_mut()
            .and_then(PersistenceGateway::next_id)
            .and_then(|next| u64::try_from(next).ok())
            .unwrap_or(1);

        let id = parse_numeric(answer, upper, 1).and_then(|id| i64::try_from(id).ok());
        if id.is_none() {
            self.prompter.say(INVALID_INPUT);
        }
        id
    }

    fn check(&mut self) -> Result<()> {
        let Some(gateway) = self.gateway.as_mut() else {
            self.prompter.say(NOT_LOADED);
            return Ok(());
        };

        if gateway.check_initialized() {
            self.prompter.say("Database already initialized!");
            return Ok(());
        }

        self.prompter.say("It appears the database has not been initialized");
        self.prompter.say("Would you like to initialize the database?");
        self.reset_flow()
    }

    /// Two confirmations gate the single destructive reset
    fn reset_flow(&mut self) -> Result<()> {
        if self.gateway.is_none() {
            self.prompter.say(NOT_LOADED);
            return Ok(());
        }

        if !self.prompter.confirm("(WARNING: This will erase all data!) [y/N]")? {
            return Ok(());
        }
        if !self.prompter.confirm("Are you really sure? [y/N]")? {
            return Ok(());
        }

        if self.gateway.as_mut().is_some_and(|g| g.reset(true)) {
            self.prompter.say("Successfully initialized database!");
        } else {
            self.prompter.say("Wipe unsuccessful - check DB connection?");
        }
        Ok(())
    }

    /// Disconnect, say goodbye and end the loop
    fn shutdown(&mut self) -> Outcome {
        self.disconnect();
        self.prompter.say("Exiting!");
        Outcome::Terminate
    }
}

fn build_menus() -> (Menu, Menu, Menu) {
    let mut main_menu = Menu::new("Main Menu");
    main_menu
        .add_entry("Data Entry", Command::Switch(MenuKind::Data))
        .add_entry("Database Options", Command::Switch(MenuKind::Database))
        .add_entry("Quit Program", Command::Quit);

    let mut data_menu = Menu::new("Data Menu");
    data_menu
        .add_entry("Input Foods", Command::InputItems)
        .add_entry("Modify Foods", Command::ModifyItems)
        .add_entry("Delete Foods", Command::DeleteItems)
        .add_entry("Back to Main Menu", Command::Switch(MenuKind::Main));

    let mut database_menu = Menu::new("Database Menu");
    database_menu
        .add_entry("Open Database", Command::OpenDatabase)
        .add_entry("Check Database", Command::CheckDatabase)
        .add_entry("Close Database", Command::CloseDatabase)
        .add_entry("RESET DATABASE", Command::ResetDatabase)
        .add_entry("Back to Main Menu", Command::Switch(MenuKind::Main));

    (main_menu, data_menu, database_menu)
}
