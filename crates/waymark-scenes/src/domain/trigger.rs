//! Triggers declared by scenes and the events raised by the application.
//!
//! Matching is asymmetric: an optional field on a scene's declared trigger
//! is a wildcard, while the incoming event is always fully specified.

use serde::{Deserialize, Serialize};

/// Outcome of a finished battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleResult {
    /// The player won.
    Victory,
    /// The player lost.
    Defeat,
    /// Neither side won.
    Draw,
}

/// A trigger shape declared on a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Trigger {
    /// The application launched for the first time.
    FirstLaunch,
    /// A screen was entered.
    EnterScreen {
        /// Screen name.
        screen: String,
    },
    /// A battle started. Absent fields match any chapter/battle.
    BattleStart {
        /// Chapter filter.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chapter: Option<String>,
        /// Battle filter.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        battle: Option<String>,
    },
    /// A battle ended with the given result.
    BattleEnd {
        /// Required result.
        result: BattleResult,
    },
    /// The player performed an in-battle action.
    BattleAction {
        /// Action name.
        action: String,
    },
    /// The story advanced. An absent battle matches any battle of the chapter.
    StoryProgress {
        /// Chapter.
        chapter: String,
        /// Battle filter.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        battle: Option<String>,
    },
    /// A card pack was opened. An absent pack type matches any pack.
    PackOpened {
        /// Pack type filter.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pack_type: Option<String>,
    },
    /// An achievement was unlocked.
    Achievement {
        /// Achievement id.
        id: String,
    },
    /// Raised explicitly by host code.
    Manual {
        /// Manual trigger id.
        id: String,
    },
}

/// An event raised by screens or gameplay code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TriggerEvent {
    /// The application launched for the first time.
    FirstLaunch,
    /// A screen was entered.
    EnterScreen {
        /// Screen name.
        screen: String,
    },
    /// A battle started.
    BattleStart {
        /// Chapter id.
        chapter: String,
        /// Battle id.
        battle: String,
    },
    /// A battle ended.
    BattleEnd {
        /// Result.
        result: BattleResult,
    },
    /// The player performed an in-battle action.
    BattleAction {
        /// Action name.
        action: String,
    },
    /// The story advanced.
    StoryProgress {
        /// Chapter id.
        chapter: String,
        /// Battle id.
        battle: String,
    },
    /// A card pack was opened.
    PackOpened {
        /// Pack type.
        pack_type: String,
    },
    /// An achievement was unlocked.
    Achievement {
        /// Achievement id.
        id: String,
    },
    /// Raised explicitly by host code.
    Manual {
        /// Manual trigger id.
        id: String,
    },
}

impl TriggerEvent {
    /// The event shape name, as used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FirstLaunch => "first-launch",
            Self::EnterScreen { .. } => "enter-screen",
            Self::BattleStart { .. } => "battle-start",
            Self::BattleEnd { .. } => "battle-end",
            Self::BattleAction { .. } => "battle-action",
            Self::StoryProgress { .. } => "story-progress",
            Self::PackOpened { .. } => "pack-opened",
            Self::Achievement { .. } => "achievement",
            Self::Manual { .. } => "manual",
        }
    }
}

impl Trigger {
    /// Returns whether this declared trigger accepts `event`.
    #[must_use]
    pub fn matches(&self, event: &TriggerEvent) -> bool {
        match (self, event) {
            (Self::FirstLaunch, TriggerEvent::FirstLaunch) => true,
            (Self::EnterScreen { screen }, TriggerEvent::EnterScreen { screen: raised }) => {
                screen == raised
            }
            (
                Self::BattleStart { chapter, battle },
                TriggerEvent::BattleStart {
                    chapter: raised_chapter,
                    battle: raised_battle,
                },
            ) => wildcard(chapter.as_deref(), raised_chapter) && wildcard(battle.as_deref(), raised_battle),
            (Self::BattleEnd { result }, TriggerEvent::BattleEnd { result: raised }) => {
                result == raised
            }
            (Self::BattleAction { action }, TriggerEvent::BattleAction { action: raised }) => {
                action == raised
            }
            (
                Self::StoryProgress { chapter, battle },
                TriggerEvent::StoryProgress {
                    chapter: raised_chapter,
                    battle: raised_battle,
                },
            ) => chapter == raised_chapter && wildcard(battle.as_deref(), raised_battle),
            (Self::PackOpened { pack_type }, TriggerEvent::PackOpened { pack_type: raised }) => {
                wildcard(pack_type.as_deref(), raised)
            }
            (Self::Achievement { id }, TriggerEvent::Achievement { id: raised })
            | (Self::Manual { id }, TriggerEvent::Manual { id: raised }) => id == raised,
            _ => false,
        }
    }
}

/// A declared `None` accepts any raised value.
fn wildcard(declared: Option<&str>, raised: &str) -> bool {
    declared.is_none_or(|value| value == raised)
}
