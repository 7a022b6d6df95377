//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// None of these cross the engine's public boundary as a panic: each is
/// either returned to the caller, logged, or turned into a scene
/// interruption.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No scene is registered under the given id.
    #[error("scene not found: {0}")]
    SceneNotFound(String),

    /// Scene content is malformed (missing label target, duplicate id,
    /// runaway jump loop).
    #[error("authoring error in scene {scene_id}: {message}")]
    Authoring {
        /// The scene carrying the defect.
        scene_id: String,
        /// What is wrong with it.
        message: String,
    },

    /// Progress could not be loaded or saved.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The host command handler rejected a command.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// An operation was invoked in a state that does not accept it.
    #[error("validation error: {0}")]
    Validation(String),

    /// Scene catalog content could not be parsed.
    #[error("catalog error: {0}")]
    Catalog(String),
}

impl DomainError {
    /// Shorthand for an [`DomainError::Authoring`] error.
    pub fn authoring(scene_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authoring {
            scene_id: scene_id.into(),
            message: message.into(),
        }
    }
}
