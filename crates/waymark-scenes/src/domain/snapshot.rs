//! The normalized state handed to presentation after every step.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;
use waymark_core::geometry::Rect;

use super::execution::{RunTicket, RunnerState};
use super::step::Dialogue;

/// Options of the pending choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoicePrompt {
    /// Prompt above the options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Option labels in display order; selection is by index.
    pub options: Vec<String>,
}

/// The anchored region presentation should point at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightTarget {
    /// Anchor id.
    pub anchor_id: String,
    /// Whether input outside the region is blocked.
    pub mask_input: bool,
    /// Resolved geometry. `None` until measured, or when unmeasurable.
    pub rect: Option<Rect>,
}

/// A non-blocking hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HintView {
    /// Hint text or key.
    pub text: String,
    /// Anchor the hint points at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_id: Option<String>,
}

/// A visible character portrait.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortraitView {
    /// Expression variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Screen position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// Everything presentation needs to render the active scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationSnapshot {
    /// Active scene, if any.
    pub scene_id: Option<String>,
    /// Active run, if any.
    pub run_id: Option<Uuid>,
    /// Interpreter state.
    pub state: RunnerState,
    /// Dialogue line awaiting acknowledgement.
    pub dialogue: Option<Dialogue>,
    /// Pending choice.
    pub choice: Option<ChoicePrompt>,
    /// Current highlight.
    pub highlight: Option<HighlightTarget>,
    /// Current hint.
    pub hint: Option<HintView>,
    /// Whether input is blocked outside the highlight.
    pub input_masked: bool,
    /// Background asset.
    pub background: Option<String>,
    /// Visible portraits keyed by character.
    pub portraits: BTreeMap<String, PortraitView>,
    /// Overlay asset.
    pub overlay: Option<String>,
    /// Music track.
    pub music: Option<String>,
    /// One-shot sound cued by the last executed step.
    pub sound: Option<String>,
    /// Ticket to hand back when resuming the current suspension.
    pub resume_ticket: Option<RunTicket>,
}

/// Host-supplied renderer for [`PresentationSnapshot`]s.
pub trait Presenter: Send + Sync {
    /// Renders a snapshot. Called whenever the snapshot changes.
    fn present(&self, snapshot: &PresentationSnapshot);
}

/// A presenter that renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&self, _snapshot: &PresentationSnapshot) {}
}
