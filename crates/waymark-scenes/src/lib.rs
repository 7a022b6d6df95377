//! Waymark: scene definitions, trigger matching and the scene interpreter.
//!
//! Responsible for deciding which scene an application event starts,
//! executing that scene's flat step script with labels, jumps, branches and
//! suspension points, and recording completion in the shared progress store.

pub mod application;
pub mod domain;

pub use application::engine::{EngineDependencies, SceneEngine};
pub use domain::scene::SceneDefinition;
pub use domain::trigger::{Trigger, TriggerEvent};
