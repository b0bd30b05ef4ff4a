//! Yes/no confirmation before destructive operations

use std::io::{self, BufRead, IsTerminal, Write};

use thiserror::Error;

/// Confirmation errors
#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("confirmation required but stdin is not a terminal; use --force or set GOENV_ASSUME_YES=1")]
    NonInteractive,

    #[error("failed to read confirmation: {0}")]
    Io(#[from] io::Error),
}

/// Asks the user before a destructive step.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> Result<bool, ConfirmError>;
}

/// Terminal prompt on stdin/stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prompt {
    assume_yes: bool,
}

impl Prompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirm for Prompt {
    fn confirm(&self, prompt: &str) -> Result<bool, ConfirmError> {
        if self.assume_yes {
            return Ok(true);
        }
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Err(ConfirmError::NonInteractive);
        }
        ask(prompt, &mut stdin.lock(), &mut io::stderr())
    }
}

/// Write `prompt` and read one answer line.
fn ask<R: BufRead, W: Write>(prompt: &str, input: &mut R, out: &mut W) -> Result<bool, ConfirmError> {
    write!(out, "{} [y/N] ", prompt)?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(parse_answer(&line))
}

/// `y` or `yes`, case-insensitive. Anything else is no.
pub fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
