//! Waymark Host: drives a scene engine over newline-delimited JSON.
//!
//! Requests arrive one per line on the input stream; presentation
//! snapshots, host commands, engine events and errors leave one per line on
//! the output stream.

pub mod config;
pub mod console;
pub mod error;
pub mod protocol;
