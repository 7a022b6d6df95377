//! Interpreter instructions.
//!
//! Steps are plain data authored by content designers as a flat list.
//! Control flow is expressed with labels and jumps, never nesting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use waymark_core::command::HostCommand;

/// A line of dialogue. Text and speaker may be literal or a localization
/// key; both are opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialogue {
    /// Speaker name or key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Line text or key.
    pub text: String,
    /// Portrait asset shown next to the line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait: Option<String>,
}

/// One selectable option of a `choice` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    /// Option label or key.
    pub label: String,
    /// Label to jump to after selection. Absent means fall through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goto: Option<String>,
    /// Flags written when the option is selected.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set_flags: BTreeMap<String, bool>,
}

/// A single interpreter instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    /// Jump target. No-op when executed.
    Label {
        /// Label name, unique within the scene.
        name: String,
    },
    /// Unconditional jump.
    Goto {
        /// Target label.
        label: String,
    },
    /// Branch on a flag.
    If {
        /// Flag to read.
        flag: String,
        /// Label to jump to when the flag is set.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        then: Option<String>,
        /// Label to jump to when the flag is clear.
        #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
        otherwise: Option<String>,
    },
    /// Branch on a counter lying within `[min, max]`.
    CheckProgress {
        /// Counter to read.
        key: String,
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
        /// Label to jump to when in range.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        then: Option<String>,
        /// Label to jump to when out of range.
        #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
        otherwise: Option<String>,
    },
    /// Completes the scene.
    End,
    /// Shows a dialogue line and waits for acknowledgement.
    Say(Dialogue),
    /// Presents options and waits for a selection.
    Choice {
        /// Optional prompt shown above the options.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
        /// Selectable options, in display order.
        options: Vec<ChoiceOption>,
    },
    /// Suspends until the host's timer resumes the scene.
    Wait {
        /// Requested delay in milliseconds.
        ms: u64,
    },
    /// Suspends until a flag takes the given value.
    WaitForFlag {
        /// Flag to watch.
        flag: String,
        /// Value that resumes the scene.
        #[serde(default = "default_true")]
        value: bool,
    },
    /// Points presentation at an anchored UI region.
    Highlight {
        /// Anchor to measure.
        anchor_id: String,
        /// Block input and wait for acknowledgement.
        #[serde(default)]
        mask_input: bool,
    },
    /// Removes the current highlight.
    ClearHighlight,
    /// Sets or flips the input mask.
    ToggleInputMask {
        /// Explicit state. Absent flips the current state.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enabled: Option<bool>,
    },
    /// Shows a non-blocking hint.
    Hint {
        /// Hint text or key.
        text: String,
        /// Anchor the hint points at.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        anchor_id: Option<String>,
    },
    /// Writes a flag.
    SetFlag {
        /// Flag name.
        flag: String,
        /// New value.
        value: bool,
    },
    /// Writes a counter.
    SetProgress {
        /// Counter name.
        key: String,
        /// New value.
        value: i64,
    },
    /// Adds to a counter.
    IncrementProgress {
        /// Counter name.
        key: String,
        /// Amount to add.
        #[serde(default = "default_increment")]
        by: i64,
    },
    /// Replaces the background.
    Background {
        /// Background asset.
        asset: String,
    },
    /// Shows or updates a character portrait.
    Portrait {
        /// Character id.
        character: String,
        /// Expression variant.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expression: Option<String>,
        /// Screen position, e.g. `left`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<String>,
    },
    /// Hides a character portrait.
    ClearPortrait {
        /// Character id.
        character: String,
    },
    /// Sets or clears the overlay.
    Overlay {
        /// Overlay asset. Absent clears it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asset: Option<String>,
    },
    /// Starts a music track.
    PlayMusic {
        /// Track asset.
        track: String,
    },
    /// Stops the music.
    StopMusic,
    /// Plays a one-shot sound.
    PlaySound {
        /// Sound asset.
        sound: String,
    },
    /// Host command: navigate to a screen.
    NavigateTo {
        /// Target screen.
        screen: String,
        /// Opaque navigation parameters.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        params: BTreeMap<String, serde_json::Value>,
    },
    /// Host command: launch a battle.
    TriggerBattle {
        /// Chapter id.
        chapter_id: String,
        /// Battle id.
        battle_id: String,
    },
    /// Host command: grant a reward.
    TriggerReward {
        /// Reward kind.
        kind: String,
        /// Opaque payload.
        #[serde(default)]
        payload: serde_json::Value,
    },
}

fn default_true() -> bool {
    true
}

fn default_increment() -> i64 {
    1
}

impl Step {
    /// The step type name, as used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Label { .. } => "label",
            Self::Goto { .. } => "goto",
            Self::If { .. } => "if",
            Self::CheckProgress { .. } => "checkProgress",
            Self::End => "end",
            Self::Say(_) => "say",
            Self::Choice { .. } => "choice",
            Self::Wait { .. } => "wait",
            Self::WaitForFlag { .. } => "waitForFlag",
            Self::Highlight { .. } => "highlight",
            Self::ClearHighlight => "clearHighlight",
            Self::ToggleInputMask { .. } => "toggleInputMask",
            Self::Hint { .. } => "hint",
            Self::SetFlag { .. } => "setFlag",
            Self::SetProgress { .. } => "setProgress",
            Self::IncrementProgress { .. } => "incrementProgress",
            Self::Background { .. } => "background",
            Self::Portrait { .. } => "portrait",
            Self::ClearPortrait { .. } => "clearPortrait",
            Self::Overlay { .. } => "overlay",
            Self::PlayMusic { .. } => "playMusic",
            Self::StopMusic => "stopMusic",
            Self::PlaySound { .. } => "playSound",
            Self::NavigateTo { .. } => "navigateTo",
            Self::TriggerBattle { .. } => "triggerBattle",
            Self::TriggerReward { .. } => "triggerReward",
        }
    }

    /// The host command this step forwards, if it is a command step.
    #[must_use]
    pub fn host_command(&self) -> Option<HostCommand> {
        match self {
            Self::NavigateTo { screen, params } => Some(HostCommand::NavigateTo {
                screen: screen.clone(),
                params: params.clone(),
            }),
            Self::TriggerBattle {
                chapter_id,
                battle_id,
            } => Some(HostCommand::TriggerBattle {
                chapter_id: chapter_id.clone(),
                battle_id: battle_id.clone(),
            }),
            Self::TriggerReward { kind, payload } => Some(HostCommand::TriggerReward {
                kind: kind.clone(),
                payload: payload.clone(),
            }),
            _ => None,
        }
    }

    /// Labels this step can jump to.
    #[must_use]
    pub fn jump_targets(&self) -> Vec<&str> {
        match self {
            Self::Goto { label } => vec![label.as_str()],
            Self::If { then, otherwise, .. } | Self::CheckProgress { then, otherwise, .. } => {
                then.iter().chain(otherwise).map(String::as_str).collect()
            }
            Self::Choice { options, .. } => options
                .iter()
                .filter_map(|option| option.goto.as_deref())
                .collect(),
            _ => Vec::new(),
        }
    }
}
