//! Interactive credential prompts.

use std::io::{BufRead, IsTerminal, Write};

use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use secrecy::SecretString;

use crate::{Error, Result};

/// Source of credentials the provisioner cannot find elsewhere.
pub trait Prompter: Send {
    /// Ask for the login on `host`.
    fn username(&mut self, host: &str) -> Result<String>;

    /// Ask for the password of `user` on `host`.
    fn password(&mut self, host: &str, user: &str) -> Result<SecretString>;

    /// Ask for a two-factor authentication code.
    fn one_time_code(&mut self) -> Result<String>;

    /// Show a non-fatal warning.
    fn warn(&mut self, message: &str);
}

/// Prompts on the controlling terminal, or reads lines from stdin when it
/// is not a terminal.
///
/// Interrupting the password prompt prints `^C` and exits with status 1.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    /// Create a terminal prompter.
    pub fn new() -> Self {
        Self
    }

    fn interactive() -> bool {
        std::io::stdin().is_terminal()
    }

    fn read_line(prompt: &str) -> Result<String> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{} ", prompt)?;
        stderr.flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Prompter for TerminalPrompter {
    fn username(&mut self, host: &str) -> Result<String> {
        let prompt = format!("{} username:", host);
        if !Self::interactive() {
            return Self::read_line(&prompt);
        }
        Text::new(&prompt).prompt().map_err(prompt_error)
    }

    fn password(&mut self, host: &str, user: &str) -> Result<SecretString> {
        let prompt = format!("{} password for {} (never stored):", host, user);
        if !Self::interactive() {
            return Self::read_line(&prompt).map(SecretString::from);
        }

        match Password::new(&prompt)
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Hidden)
            .prompt()
        {
            Ok(password) => Ok(SecretString::from(password)),
            Err(InquireError::OperationInterrupted) => {
                eprintln!("^C");
                std::process::exit(1);
            }
            Err(err) => Err(prompt_error(err)),
        }
    }

    fn one_time_code(&mut self) -> Result<String> {
        let prompt = "two-factor authentication code:";
        if !Self::interactive() {
            return Self::read_line(prompt);
        }
        Text::new(prompt).prompt().map_err(prompt_error)
    }

    fn warn(&mut self, message: &str) {
        eprintln!("warning: {}", message);
    }
}

fn prompt_error(err: InquireError) -> Error {
    match err {
        InquireError::IO(io) => Error::Io(io),
        other => Error::Prompt(other.to_string()),
    }
}
