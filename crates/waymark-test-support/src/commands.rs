//! Test command handlers: mock `CommandHandler` implementations for tests.

use std::sync::Mutex;

use waymark_core::command::{CommandHandler, HostCommand};
use waymark_core::error::DomainError;

/// A handler that records every dispatched command and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingCommandHandler {
    dispatched: Mutex<Vec<HostCommand>>,
}

impl RecordingCommandHandler {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the commands dispatched so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn dispatched(&self) -> Vec<HostCommand> {
        self.dispatched.lock().unwrap().clone()
    }
}

impl CommandHandler for RecordingCommandHandler {
    fn dispatch(&self, command: &HostCommand) -> Result<(), DomainError> {
        self.dispatched.lock().unwrap().push(command.clone());
        Ok(())
    }
}

/// A handler that records every command it is given and then rejects it.
#[derive(Debug, Default)]
pub struct FailingCommandHandler {
    attempted: Mutex<Vec<HostCommand>>,
}

impl FailingCommandHandler {
    /// Returns a snapshot of the commands that were attempted.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn attempted(&self) -> Vec<HostCommand> {
        self.attempted.lock().unwrap().clone()
    }
}

impl CommandHandler for FailingCommandHandler {
    fn dispatch(&self, command: &HostCommand) -> Result<(), DomainError> {
        self.attempted.lock().unwrap().push(command.clone());
        Err(DomainError::Dispatch(format!(
            "host rejected {}",
            command.command_type()
        )))
    }
}
