//! Shared test doubles and utilities for the Waymark scene engine.

mod anchors;
mod clock;
mod commands;
mod gateway;

pub use anchors::ScriptedMeasure;
pub use clock::{FixedClock, fixed_now};
pub use commands::{FailingCommandHandler, RecordingCommandHandler};
pub use gateway::{EmptyGateway, FailingGateway, RecordingGateway};
