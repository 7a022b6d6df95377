//! Host command abstractions.
//!
//! Scenes never navigate, launch battles or grant rewards themselves. They
//! emit opaque commands that the embedding application executes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A command forwarded verbatim to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostCommand {
    /// Navigate to a screen.
    NavigateTo {
        /// Target screen name.
        screen: String,
        /// Opaque navigation parameters.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        params: BTreeMap<String, serde_json::Value>,
    },
    /// Launch a battle.
    TriggerBattle {
        /// Chapter identifier.
        chapter_id: String,
        /// Battle identifier within the chapter.
        battle_id: String,
    },
    /// Grant a reward.
    TriggerReward {
        /// Reward kind, e.g. `pack` or `currency`.
        kind: String,
        /// Opaque reward payload.
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl HostCommand {
    /// The type name for this command (for logging/routing).
    #[must_use]
    pub fn command_type(&self) -> &'static str {
        match self {
            Self::NavigateTo { .. } => "navigate_to",
            Self::TriggerBattle { .. } => "trigger_battle",
            Self::TriggerReward { .. } => "trigger_reward",
        }
    }
}

/// Host-supplied executor for [`HostCommand`]s.
pub trait CommandHandler: Send + Sync {
    /// Executes a command.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Dispatch` (or any other variant) when the host
    /// cannot execute the command. The engine logs the failure and keeps
    /// running the scene.
    fn dispatch(&self, command: &HostCommand) -> Result<(), DomainError>;
}

/// A handler that accepts and discards every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCommandHandler;

impl CommandHandler for NoopCommandHandler {
    fn dispatch(&self, _command: &HostCommand) -> Result<(), DomainError> {
        Ok(())
    }
}
