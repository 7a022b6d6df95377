//! Application layer: scene registration, trigger arbitration, catalog
//! loading and the engine that ties them to the interpreter.

pub mod catalog;
pub mod engine;
pub mod matcher;
pub mod registry;
