//! Menu model
//!
//! A [`Menu`] is an ordered list of entries. The ordinal of an entry is its
//! position, and that number is what the user types to select it.

use crate::error::{PantryError, Result};
use crate::prompt::Prompter;

/// Message shown when a numeric answer fails validation
pub const INVALID_INPUT: &str = "INVALID INPUT, PLEASE RETRY!";

/// Which menu the session is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuKind {
    Main,
    Data,
    Database,
}

/// What a menu entry does when selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Switch(MenuKind),
    InputItems,
    ModifyItems,
    DeleteItems,
    OpenDatabase,
    CheckDatabase,
    CloseDatabase,
    ResetDatabase,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub ordinal: usize,
    pub label: String,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    header: String,
    entries: Vec<MenuEntry>,
}

impl Menu {
    pub fn new(header: impl Into<String>) -> Self {
        Self { header: header.into(), entries: Vec::new() }
    }

    /// Append an entry; its ordinal is the number of entries before it
    pub fn add_entry(&mut self, label: impl Into<String>, command: Command) -> &mut Self {
        let ordinal = self.entries.len();
        self.entries.push(MenuEntry { ordinal, label: label.into(), command });
        self
    }

    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    #[must_use]
    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    /// Header line followed by one line per entry
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        std::iter::once(format!("-> {}", self.header))
            .chain(self.entries.iter().map(|e| format!("--> {} - {}", e.ordinal, e.label)))
            .collect()
    }

    /// Show the menu until a valid ordinal is entered and return its command
    ///
    /// Invalid answers re-prompt; only an interrupt or I/O failure escapes.
    pub fn display<P: Prompter + ?Sized>(&self, prompter: &mut P) -> Result<Command> {
        if self.entries.is_empty() {
            return Err(PantryError::invalid_input(format!("menu '{}' has no entries", self.header)));
        }

        let count = self.entries.len();
        loop {
            for line in self.render() {
                prompter.say(&line);
            }

            let answer = prompter.read_line(&format!("Select an option [0-{}]:", count - 1))?;
            if let Some(selected) = parse_numeric(&answer, count as u64, 0) {
                if let Some(entry) = usize::try_from(selected).ok().and_then(|i| self.entries.get(i))
                {
                    return Ok(entry.command);
                }
            }

            prompter.say(INVALID_INPUT);
        }
    }
}

/// Parse `input` as a non-negative integer in `[lower_inclusive, upper_exclusive)`
///
/// Surrounding whitespace is ignored; signs, decimals and anything but ASCII
/// digits are rejected.
#[must_use]
pub fn parse_numeric(input: &str, upper_exclusive: u64, lower_inclusive: u64) -> Option<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // Digit-only strings only fail to parse on overflow, which is out of range anyway
    let value: u64 = trimmed.parse().ok()?;
    (lower_inclusive <= value && value < upper_exclusive).then_some(value)
}

/// Whether `input` is a digit string whose value lies in `[lower_inclusive, upper_exclusive)`
#[must_use]
pub fn validate_numeric(input: &str, upper_exclusive: u64, lower_inclusive: u64) -> bool {
    parse_numeric(input, upper_exclusive, lower_inclusive).is_some()
}
