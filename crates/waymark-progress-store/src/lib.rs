//! Waymark Progress Store: `ProgressGateway` adapters.
//!
//! [`JsonFileGateway`] keeps one JSON record per namespace on disk;
//! [`MemoryGateway`] keeps records for the lifetime of the process.

pub mod error;
pub mod json_file_gateway;
pub mod memory_gateway;

pub use json_file_gateway::JsonFileGateway;
pub use memory_gateway::MemoryGateway;
