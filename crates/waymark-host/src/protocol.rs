//! Console wire format.

use serde::{Deserialize, Serialize};
use waymark_core::command::HostCommand;
use waymark_core::event::{DomainEvent, EventMetadata};
use waymark_core::geometry::Rect;
use waymark_scenes::TriggerEvent;
use waymark_scenes::domain::events::SceneEvent;
use waymark_scenes::domain::execution::RunTicket;
use waymark_scenes::domain::snapshot::PresentationSnapshot;

/// One request line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ConsoleRequest {
    /// Raise a trigger event.
    Event {
        /// The event.
        event: TriggerEvent,
    },
    /// List the scenes an event would start, without starting one.
    Peek {
        /// The event.
        event: TriggerEvent,
    },
    /// Start a scene by id.
    Start {
        /// Scene id.
        scene_id: String,
    },
    /// Select a choice option.
    Choose {
        /// Zero-based option index.
        index: usize,
    },
    /// Acknowledge the current dialogue line or masked highlight.
    Ack,
    /// Resume a `wait` step now. Without a ticket the current wait resumes.
    Resume {
        /// Ticket from the snapshot's `resumeTicket`.
        #[serde(default)]
        ticket: Option<RunTicket>,
    },
    /// Write a flag.
    SetFlag {
        /// Flag name.
        flag: String,
        /// New value.
        value: bool,
    },
    /// Write a progress counter.
    SetProgress {
        /// Counter name.
        key: String,
        /// New value.
        value: i64,
    },
    /// Interrupt the active scene.
    Stop,
    /// Register an anchor with fixed geometry. No rect means not yet laid
    /// out.
    RegisterAnchor {
        /// Anchor id.
        anchor_id: String,
        /// Geometry.
        #[serde(default)]
        rect: Option<Rect>,
    },
    /// Remove an anchor.
    UnregisterAnchor {
        /// Anchor id.
        anchor_id: String,
    },
    /// Report `anchorsReady` once every listed anchor is measurable.
    WaitForAnchors {
        /// Anchors to wait for.
        anchor_ids: Vec<String>,
        /// Delay before the first attempt.
        #[serde(default)]
        initial_delay_ms: Option<u64>,
        /// Delay between attempts.
        #[serde(default)]
        interval_ms: Option<u64>,
        /// Attempts before giving up silently.
        #[serde(default)]
        max_attempts: Option<u32>,
    },
}

/// One output line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ConsoleOutput {
    /// Presentation changed.
    Snapshot {
        /// New presentation state.
        snapshot: PresentationSnapshot,
    },
    /// The host should execute a command.
    Command {
        /// The command.
        command: HostCommand,
    },
    /// The engine recorded a domain event.
    Event {
        /// Routing name.
        event_type: String,
        /// Event metadata.
        metadata: EventMetadata,
        /// Event payload.
        payload: serde_json::Value,
    },
    /// Every anchor of a `waitForAnchors` request became measurable.
    AnchorsReady {
        /// The anchors waited for.
        anchor_ids: Vec<String>,
    },
    /// Scenes an event would start, best first.
    Eligible {
        /// Scene ids.
        scene_ids: Vec<String>,
    },
    /// A request failed.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl From<&SceneEvent> for ConsoleOutput {
    fn from(event: &SceneEvent) -> Self {
        Self::Event {
            event_type: event.event_type().to_owned(),
            metadata: event.metadata().clone(),
            payload: event.to_payload(),
        }
    }
}
