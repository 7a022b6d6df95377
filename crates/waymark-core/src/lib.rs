//! Waymark Core: shared abstractions for the scene engine.
//!
//! This crate defines the ports and value types every other crate depends
//! on: time, errors, domain events, host commands, persisted progress and
//! anchor geometry. It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod gateway;
pub mod geometry;
pub mod progress;
