//! Anchor id → measurement registry.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, warn};
use waymark_core::geometry::{AnchorMeasure, Rect};

type Entries = HashMap<String, Arc<dyn AnchorMeasure>>;

/// Shared registry of mounted UI regions.
///
/// Cloning yields another handle onto the same entries, so the engine and
/// every UI region can hold one. Re-registering an id replaces the previous
/// measurement: the last writer wins.
#[derive(Clone, Default)]
pub struct AnchorRegistry {
    entries: Arc<RwLock<Entries>>,
}

impl AnchorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `measure` under `anchor_id`. Returns `true` if an earlier
    /// registration was replaced.
    pub fn register(&self, anchor_id: impl Into<String>, measure: Arc<dyn AnchorMeasure>) -> bool {
        let anchor_id = anchor_id.into();
        let replaced = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(anchor_id.clone(), measure)
            .is_some();
        debug!(anchor_id = %anchor_id, replaced, "anchor registered");
        replaced
    }

    /// Registers a closure returning a measurement future.
    pub fn register_fn<F, Fut>(&self, anchor_id: impl Into<String>, measure: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Rect>> + Send + 'static,
    {
        self.register(anchor_id, Arc::new(MeasureFn(measure)))
    }

    /// Removes `anchor_id` unconditionally. Returns `true` if it was present.
    pub fn unregister(&self, anchor_id: &str) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(anchor_id)
            .is_some();
        debug!(anchor_id = %anchor_id, removed, "anchor unregistered");
        removed
    }

    /// Measures `anchor_id`.
    ///
    /// Returns `None` for unknown ids and for regions that are unmounted,
    /// zero-sized or report non-finite geometry. A measurement that panics
    /// also yields `None`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub async fn get_rect(&self, anchor_id: &str) -> Option<Rect> {
        // The lock is released before awaiting the measurement.
        let measure = self.lookup(anchor_id)?;
        match tokio::spawn(async move { measure.measure().await }).await {
            Ok(rect) => rect.filter(Rect::is_measurable),
            Err(err) => {
                warn!(anchor_id = %anchor_id, error = %err, "anchor measurement failed");
                None
            }
        }
    }

    /// Returns the registered anchor ids, sorted.
    #[must_use]
    pub fn get_all_anchors(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Returns whether `anchor_id` is currently registered.
    #[must_use]
    pub fn contains(&self, anchor_id: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(anchor_id)
    }

    fn lookup(&self, anchor_id: &str) -> Option<Arc<dyn AnchorMeasure>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(anchor_id)
            .cloned()
    }
}

impl fmt::Debug for AnchorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnchorRegistry")
            .field("anchors", &self.get_all_anchors())
            .finish()
    }
}

/// Adapts a closure into an [`AnchorMeasure`].
pub struct MeasureFn<F>(pub F);

#[async_trait]
impl<F, Fut> AnchorMeasure for MeasureFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Option<Rect>> + Send,
{
    async fn measure(&self) -> Option<Rect> {
        (self.0)().await
    }
}
