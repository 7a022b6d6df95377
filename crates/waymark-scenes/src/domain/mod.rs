//! Scene content and the interpreter that runs it.

pub mod condition;
pub mod events;
pub mod execution;
pub mod interpreter;
pub mod scene;
pub mod snapshot;
pub mod step;
pub mod trigger;
