//! Trigger arbitration.
//!
//! Selection is a pure function of the registry, the raised event and the
//! progress store, so identical inputs always pick the same scene.

use std::sync::Arc;

use waymark_core::progress::RuntimeProgress;

use super::registry::SceneRegistry;
use crate::domain::scene::SceneDefinition;
use crate::domain::trigger::TriggerEvent;

/// Lists the scenes `event` may start, best first.
///
/// Completed scenes, the `active` scene, scenes with no matching trigger
/// and scenes whose condition fails are dropped. Survivors are ordered by
/// descending priority; ties keep registration order.
#[must_use]
pub fn eligible_scenes(
    registry: &SceneRegistry,
    event: &TriggerEvent,
    progress: &RuntimeProgress,
    active: Option<&str>,
) -> Vec<Arc<SceneDefinition>> {
    let mut eligible: Vec<Arc<SceneDefinition>> = registry
        .iter()
        .filter(|scene| !progress.is_completed(&scene.id))
        .filter(|scene| active != Some(scene.id.as_str()))
        .filter(|scene| scene.responds_to(event))
        .filter(|scene| scene.condition_holds(progress))
        .cloned()
        .collect();
    eligible.sort_by(|a, b| b.priority.cmp(&a.priority));
    eligible
}

/// Picks the scene `event` starts, if any.
#[must_use]
pub fn select_scene(
    registry: &SceneRegistry,
    event: &TriggerEvent,
    progress: &RuntimeProgress,
    active: Option<&str>,
) -> Option<Arc<SceneDefinition>> {
    eligible_scenes(registry, event, progress, active)
        .into_iter()
        .next()
}
