//! The set of scenes the engine can start.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::scene::SceneDefinition;

/// Scenes keyed by id, iterated in registration order.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    scenes: Vec<Arc<SceneDefinition>>,
    index: HashMap<String, usize>,
}

impl SceneRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a scene. A replaced scene keeps its original
    /// registration position. Returns `true` if a scene was replaced.
    pub fn upsert(&mut self, scene: SceneDefinition) -> bool {
        let scene = Arc::new(scene);
        if let Some(&position) = self.index.get(&scene.id) {
            self.scenes[position] = scene;
            true
        } else {
            self.index.insert(scene.id.clone(), self.scenes.len());
            self.scenes.push(scene);
            false
        }
    }

    /// Removes a scene. Returns `true` if it was registered.
    pub fn remove(&mut self, scene_id: &str) -> bool {
        let Some(position) = self.index.remove(scene_id) else {
            return false;
        };
        self.scenes.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        true
    }

    /// Looks up a scene by id.
    #[must_use]
    pub fn get(&self, scene_id: &str) -> Option<&Arc<SceneDefinition>> {
        self.index.get(scene_id).map(|&position| &self.scenes[position])
    }

    /// Iterates scenes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SceneDefinition>> {
        self.scenes.iter()
    }

    /// Number of registered scenes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Returns whether no scene is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
