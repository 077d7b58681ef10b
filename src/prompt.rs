//! Terminal I/O boundary
//!
//! The session never touches stdin/stdout directly; it talks to a [`Prompter`].
//! [`TerminalPrompter`] is the interactive implementation, [`ScriptedPrompter`]
//! replays canned answers and records everything shown, for tests.
//!
//! Ctrl-C at any prompt surfaces as [`PantryError::Interrupted`].

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};
use std::thread;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::error::{PantryError, Result};
use crate::output::is_affirmative;
use crate::signal::Interrupt;

/// Line-oriented user interaction
pub trait Prompter {
    /// Show `prompt` and read one line of input, without the trailing newline
    fn read_line(&mut self, prompt: &str) -> Result<String>;

    /// Like [`Prompter::read_line`], without echoing the input
    fn read_secret(&mut self, prompt: &str) -> Result<String> {
        self.read_line(prompt)
    }

    /// Print one line of output
    fn say(&mut self, message: &str);

    /// Ask for a value showing the current one; empty input keeps `current`
    fn ask_with_default(&mut self, prompt: &str, current: &str) -> Result<String> {
        let answer = self.read_line(&format!("{prompt} [{current}]"))?;
        if answer.is_empty() {
            Ok(current.to_string())
        } else {
            Ok(answer)
        }
    }

    /// Yes/no question; anything but an affirmative answer is "no"
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.read_line(prompt)?;
        Ok(is_affirmative(&answer))
    }
}

/// Interactive prompter on the controlling terminal
///
/// Uses `dialoguer` when stdin is a terminal and plain line reads otherwise
/// (pipes, redirected files). End of input counts as an interrupt.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
    interactive: bool,
    interrupt: Interrupt,
    lines: Option<LineReader>,
}

impl TerminalPrompter {
    /// `interrupt` is raised by the SIGINT watcher
    #[must_use]
    pub fn new(interrupt: Interrupt) -> Self {
        Self {
            theme: ColorfulTheme::default(),
            interactive: io::stdin().is_terminal(),
            interrupt,
            lines: None,
        }
    }

    /// Consume a pending interrupt
    fn check_interrupt(&self) -> Result<()> {
        if self.interrupt.take() {
            return Err(PantryError::Interrupted);
        }
        Ok(())
    }

    fn read_plain(&mut self, prompt: &str) -> Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt} ")?;
        stdout.flush()?;

        if self.lines.is_none() {
            self.lines = Some(LineReader::spawn()?);
        }
        let Some(reader) = self.lines.as_mut() else {
            return Err(PantryError::Interrupted);
        };

        let line = match reader.next(&self.interrupt) {
            Err(PantryError::Interrupted) => {
                self.interrupt.take();
                return Err(PantryError::Interrupted);
            }
            other => other?,
        };

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Stdin lines read on a background thread
///
/// A blocking read restarts after SIGINT, so waiting on a channel instead
/// lets a pending line wait be abandoned when the interrupt is raised.
struct LineReader {
    runtime: Runtime,
    lines: mpsc::UnboundedReceiver<io::Result<String>>,
}

impl LineReader {
    fn spawn() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let (sender, lines) = mpsc::unbounded_channel();

        thread::Builder::new().name("pantry-stdin".into()).spawn(move || {
            let stdin = io::stdin();
            loop {
                let mut line = String::new();
                match stdin.lock().read_line(&mut line) {
                    // Dropping the sender reports end of input
                    Ok(0) => break,
                    Ok(_) => {
                        if sender.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        let _ = sender.send(Err(e));
                        break;
                    }
                }
            }
        })?;

        Ok(Self { runtime, lines })
    }

    /// Next line, or `Interrupted` on end of input or a raised interrupt
    fn next(&mut self, interrupt: &Interrupt) -> Result<String> {
        match interrupt.block_on(&self.runtime, self.lines.recv())? {
            Some(Ok(line)) => Ok(line),
            Some(Err(e)) => Err(map_io(e)),
            None => Err(PantryError::Interrupted),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.check_interrupt()?;

        let answer = if self.interactive {
            Input::<String>::with_theme(&self.theme)
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .map_err(map_dialoguer)?
        } else {
            self.read_plain(prompt)?
        };

        self.check_interrupt()?;
        Ok(answer)
    }

    fn read_secret(&mut self, prompt: &str) -> Result<String> {
        if !self.interactive {
            return self.read_line(prompt);
        }

        self.check_interrupt()?;
        let answer = Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(map_dialoguer)?;

        self.check_interrupt()?;
        Ok(answer)
    }

    fn say(&mut self, message: &str) {
        println!("{message}");
    }
}

fn map_io(err: io::Error) -> PantryError {
    if err.kind() == io::ErrorKind::Interrupted {
        PantryError::Interrupted
    } else {
        PantryError::Io(err)
    }
}

fn map_dialoguer(err: dialoguer::Error) -> PantryError {
    match err {
        dialoguer::Error::IO(io) => map_io(io),
    }
}

/// Prompter that replays canned answers and records the conversation
///
/// Running out of answers behaves like Ctrl-C, so a script that ends early
/// still drives the session through its shutdown path.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { answers: answers.into_iter().map(Into::into).collect(), transcript: Vec::new() }
    }

    /// Every prompt and message in order; prompts are prefixed with `? `
    #[must_use]
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Answers not consumed yet
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    /// Whether any transcript line contains `needle`
    #[must_use]
    pub fn output_contains(&self, needle: &str) -> bool {
        self.transcript.iter().any(|line| line.contains(needle))
    }

    /// Number of transcript lines containing `needle`
    #[must_use]
    pub fn count(&self, needle: &str) -> usize {
        self.transcript.iter().filter(|line| line.contains(needle)).count()
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.transcript.push(format!("? {prompt}"));
        self.answers.pop_front().ok_or(PantryError::Interrupted)
    }

    fn say(&mut self, message: &str) {
        self.transcript.push(message.to_string());
    }
}
