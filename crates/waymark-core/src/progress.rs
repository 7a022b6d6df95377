//! Persisted per-user progress.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Flags, counters and scene completion for one namespace.
///
/// Serializes to the flat persistence record
/// `{ flags, progress, completedScenes, lastSeenAt }`. Missing fields
/// deserialize as empty so older records stay loadable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeProgress {
    /// Named booleans. An absent flag reads as `false`.
    pub flags: BTreeMap<String, bool>,
    /// Named counters. An absent counter reads as `0`.
    pub progress: BTreeMap<String, i64>,
    /// Scenes that ran to completion. A set, so an id appears at most once.
    pub completed_scenes: BTreeSet<String>,
    /// Epoch milliseconds at which each scene was last started or finished.
    pub last_seen_at: BTreeMap<String, i64>,
}

impl RuntimeProgress {
    /// Reads a flag.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.flags.get(key).copied().unwrap_or(false)
    }

    /// Reads a counter.
    #[must_use]
    pub fn counter(&self, key: &str) -> i64 {
        self.progress.get(key).copied().unwrap_or(0)
    }

    /// Writes a flag and returns the value it replaced.
    pub fn set_flag(&mut self, key: &str, value: bool) -> bool {
        self.flags.insert(key.to_owned(), value).unwrap_or(false)
    }

    /// Writes a counter and returns the value it replaced.
    pub fn set_counter(&mut self, key: &str, value: i64) -> i64 {
        self.progress.insert(key.to_owned(), value).unwrap_or(0)
    }

    /// Returns whether the scene has been completed.
    #[must_use]
    pub fn is_completed(&self, scene_id: &str) -> bool {
        self.completed_scenes.contains(scene_id)
    }

    /// Records completion of a scene at `at_millis`. Returns `false` if the
    /// scene was already completed (the timestamp is still refreshed).
    pub fn mark_completed(&mut self, scene_id: &str, at_millis: i64) -> bool {
        self.touch(scene_id, at_millis);
        self.completed_scenes.insert(scene_id.to_owned())
    }

    /// Records that a scene was seen at `at_millis`.
    pub fn touch(&mut self, scene_id: &str, at_millis: i64) {
        self.last_seen_at.insert(scene_id.to_owned(), at_millis);
    }
}

/// The key under which progress is persisted: an authenticated user id or
/// the shared anonymous namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Namespace used when no user is signed in.
    pub const ANONYMOUS: &'static str = "anonymous";

    /// Namespace for an authenticated user. A blank id falls back to the
    /// anonymous namespace.
    #[must_use]
    pub fn user(user_id: &str) -> Self {
        let trimmed = user_id.trim();
        if trimmed.is_empty() {
            Self::anonymous()
        } else {
            Self(trimmed.to_owned())
        }
    }

    /// The anonymous namespace.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_owned())
    }

    /// Resolves an optional user id.
    #[must_use]
    pub fn for_user(user_id: Option<&str>) -> Self {
        user_id.map_or_else(Self::anonymous, Self::user)
    }

    /// Returns the namespace key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether this is the anonymous namespace.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
