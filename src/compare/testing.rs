//! Scripted executor for pipeline tests.

use crate::ports::{CommandExecutor, ExecError, GitCommand};
use std::cell::RefCell;
use std::collections::HashMap;

/// Replays canned output per command; anything unscripted fails like git would.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: HashMap<GitCommand, Result<String, String>>,
    calls: RefCell<Vec<GitCommand>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(mut self, command: GitCommand, stdout: &str) -> Self {
        self.responses.insert(command, Ok(stdout.to_string()));
        self
    }

    pub fn fail(mut self, command: GitCommand, stderr: &str) -> Self {
        self.responses.insert(command, Err(stderr.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<GitCommand> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, command: &GitCommand) -> Result<String, ExecError> {
        self.calls.borrow_mut().push(command.clone());
        match self.responses.get(command) {
            Some(Ok(stdout)) => Ok(stdout.clone()),
            Some(Err(stderr)) => Err(ExecError::Failed {
                command: command.to_string(),
                code: Some(128),
                stderr: stderr.clone(),
            }),
            None => Err(ExecError::Failed {
                command: command.to_string(),
                code: Some(128),
                stderr: format!("fatal: unscripted command {}", command),
            }),
        }
    }
}
