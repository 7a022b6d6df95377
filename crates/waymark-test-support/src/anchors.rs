//! Test anchors: scripted `AnchorMeasure` implementations for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use waymark_core::geometry::{AnchorMeasure, Rect};

/// A measurement that reports `None` until its `ready_on`-th call and the
/// configured rectangle from then on. Counts every call.
#[derive(Debug)]
pub struct ScriptedMeasure {
    ready_on: Option<usize>,
    rect: Rect,
    calls: AtomicUsize,
}

impl ScriptedMeasure {
    /// A measurement that never becomes ready.
    #[must_use]
    pub fn never() -> Self {
        Self {
            ready_on: None,
            rect: Rect::new(0.0, 0.0, 0.0, 0.0),
            calls: AtomicUsize::new(0),
        }
    }

    /// A measurement that returns `rect` from its `call`-th invocation on
    /// (1-based).
    #[must_use]
    pub fn ready_on(call: usize, rect: Rect) -> Self {
        Self {
            ready_on: Some(call),
            rect,
            calls: AtomicUsize::new(0),
        }
    }

    /// A measurement that is ready on the first call.
    #[must_use]
    pub fn ready(rect: Rect) -> Self {
        Self::ready_on(1, rect)
    }

    /// Returns how many times `measure` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnchorMeasure for ScriptedMeasure {
    async fn measure(&self) -> Option<Rect> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.ready_on {
            Some(ready_on) if call >= ready_on => Some(self.rect),
            _ => None,
        }
    }
}
