//! Domain events recorded by the scene engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use waymark_core::command::HostCommand;
use waymark_core::event::{DomainEvent, EventMetadata};

use super::execution::EndReason;

/// Event type for [`SceneStarted`].
pub const SCENE_STARTED_EVENT_TYPE: &str = "scenes.scene_started";
/// Event type for [`SceneEnded`].
pub const SCENE_ENDED_EVENT_TYPE: &str = "scenes.scene_ended";
/// Event type for [`FlagChanged`].
pub const FLAG_CHANGED_EVENT_TYPE: &str = "scenes.flag_changed";
/// Event type for [`ProgressChanged`].
pub const PROGRESS_CHANGED_EVENT_TYPE: &str = "scenes.progress_changed";
/// Event type for [`CommandDispatched`].
pub const COMMAND_DISPATCHED_EVENT_TYPE: &str = "scenes.command_dispatched";
/// Event type for [`CommandFailed`].
pub const COMMAND_FAILED_EVENT_TYPE: &str = "scenes.command_failed";

/// Emitted when a scene run enters `Running`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneStarted {
    /// The scene.
    pub scene_id: String,
    /// Content version of the scene.
    pub version: u32,
    /// The run.
    pub run_id: Uuid,
}

/// Emitted when a scene run ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneEnded {
    /// The scene.
    pub scene_id: String,
    /// The run.
    pub run_id: Uuid,
    /// How the run ended.
    pub reason: EndReason,
    /// Authoring diagnostic for aborted runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// Flags whose value differs from the start of the run.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub changed_flags: BTreeMap<String, bool>,
    /// Counters whose value differs from the start of the run.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub changed_progress: BTreeMap<String, i64>,
}

/// Emitted when a flag changes value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagChanged {
    /// Flag name.
    pub flag: String,
    /// Previous value.
    pub old: bool,
    /// New value.
    pub new: bool,
}

/// Emitted when a progress counter changes value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressChanged {
    /// Counter name.
    pub key: String,
    /// Previous value.
    pub old: i64,
    /// New value.
    pub new: i64,
}

/// Emitted when the host command handler accepted a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDispatched {
    /// The scene that issued the command.
    pub scene_id: String,
    /// The command.
    pub command: HostCommand,
}

/// Emitted when the host command handler rejected a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailed {
    /// The scene that issued the command.
    pub scene_id: String,
    /// The command.
    pub command: HostCommand,
    /// Handler error message.
    pub error: String,
}

/// Event payload variants for the scene engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneEventKind {
    /// A scene run started.
    SceneStarted(SceneStarted),
    /// A scene run ended.
    SceneEnded(SceneEnded),
    /// A flag changed.
    FlagChanged(FlagChanged),
    /// A counter changed.
    ProgressChanged(ProgressChanged),
    /// A host command was dispatched.
    CommandDispatched(CommandDispatched),
    /// A host command failed.
    CommandFailed(CommandFailed),
}

impl SceneEventKind {
    /// The routing name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SceneStarted(_) => SCENE_STARTED_EVENT_TYPE,
            Self::SceneEnded(_) => SCENE_ENDED_EVENT_TYPE,
            Self::FlagChanged(_) => FLAG_CHANGED_EVENT_TYPE,
            Self::ProgressChanged(_) => PROGRESS_CHANGED_EVENT_TYPE,
            Self::CommandDispatched(_) => COMMAND_DISPATCHED_EVENT_TYPE,
            Self::CommandFailed(_) => COMMAND_FAILED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the scene engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: SceneEventKind,
}

impl DomainEvent for SceneEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.kind).unwrap_or_default()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
