//! External process abstraction

use std::collections::BTreeMap;
use std::process::Command;

/// A command to run: program, arguments and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Variables added to the inherited environment
    pub env: BTreeMap<String, String>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Shell-like rendering for messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit status was zero
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Stdout followed by stderr, as a terminal would show them.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        out.push_str(&self.stderr);
        out
    }
}

/// Errors launching a process
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs external commands to completion.
pub trait ProcessRunner {
    /// Run `command` and capture its output.
    ///
    /// A non-zero exit is reported through [`ProcessOutput::success`], not
    /// as an error.
    fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput, ProcessError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        (**self).run(command)
    }
}

/// [`ProcessRunner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .envs(&command.env)
            .output()
            .map_err(|source| ProcessError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        Ok(ProcessOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = ProcessCommand::new("go")
            .arg("clean")
            .arg("-modcache")
            .env("GOMODCACHE", "/tmp/mod");

        assert_eq!(cmd.display(), "go clean -modcache");
        assert_eq!(cmd.env.get("GOMODCACHE").map(String::as_str), Some("/tmp/mod"));
    }

    #[test]
    fn test_combined_output() {
        let output = ProcessOutput {
            success: true,
            stdout: "out\n".to_string(),
            stderr: "err\n".to_string(),
        };
        assert_eq!(output.combined(), "out\nerr\n");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let result = SystemRunner.run(&ProcessCommand::new("toolcache-definitely-not-a-binary"));
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }
}
