//! Start conditions evaluated against persisted progress.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use waymark_core::progress::RuntimeProgress;

/// Flag equalities and counter thresholds that must all hold for a scene
/// to start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    /// Each flag must currently equal the given value.
    pub flags: BTreeMap<String, bool>,
    /// Each counter must currently be at least the given threshold.
    pub progress: BTreeMap<String, i64>,
}

impl Condition {
    /// Returns whether every requirement holds. An empty condition is
    /// trivially satisfied.
    #[must_use]
    pub fn is_satisfied(&self, progress: &RuntimeProgress) -> bool {
        self.flags
            .iter()
            .all(|(flag, expected)| progress.flag(flag) == *expected)
            && self
                .progress
                .iter()
                .all(|(key, threshold)| progress.counter(key) >= *threshold)
    }
}
