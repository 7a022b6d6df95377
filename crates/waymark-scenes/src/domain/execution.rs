//! Interpreter state types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a scene run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// Reached `end` or ran past the last step.
    Completed,
    /// Stopped early: replaced by another scene, stopped by the host, or
    /// aborted on an authoring error.
    Interrupted,
}

/// What an externally resumed suspension is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "for", rename_all = "camelCase")]
pub enum ExternalWait {
    /// A dialogue line or masked highlight awaiting acknowledgement.
    Acknowledgement,
    /// A `wait` step awaiting the host's timer.
    Timer {
        /// Requested delay.
        ms: u64,
    },
    /// A `waitForFlag` step awaiting a flag value.
    Flag {
        /// Watched flag.
        flag: String,
        /// Value that resumes the scene.
        value: bool,
    },
}

/// Lifecycle of the interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RunnerState {
    /// No scene has run yet.
    #[default]
    Idle,
    /// Executing steps.
    Running,
    /// Suspended on a `choice` step.
    WaitingForChoice,
    /// Suspended until the host resumes the scene.
    WaitingForExternal {
        /// What the scene waits for.
        wait: ExternalWait,
    },
    /// The last run finished.
    Ended {
        /// How it finished.
        reason: EndReason,
    },
}

impl RunnerState {
    /// Returns whether a scene is active (running or suspended).
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Running | Self::WaitingForChoice | Self::WaitingForExternal { .. }
        )
    }
}

/// Identifies one suspension of one run. Resumes carrying a ticket that is
/// no longer current are ignored, so a timer armed by a discarded run never
/// advances a newer one. `seq` grows with every suspension of the run, so a
/// loop that comes back to the same step gets a fresh ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTicket {
    /// The run.
    pub run_id: Uuid,
    /// The suspended step.
    pub step_index: usize,
    /// Suspension counter within the run.
    pub seq: u64,
}
