//! Waymark: anchor registry and readiness poller.
//!
//! UI regions register an asynchronous measurement under an anchor id while
//! they are mounted. Highlight steps resolve geometry through the registry,
//! and UI code uses the poller to wait until its anchors are measurable
//! before raising the next trigger.

pub mod cancel;
pub mod poller;
pub mod registry;

pub use cancel::CancelToken;
pub use poller::{AnchorPoller, PollHandle, PollOptions, PollOutcome};
pub use registry::{AnchorRegistry, MeasureFn};
pub use waymark_core::geometry::{AnchorMeasure, Rect};
