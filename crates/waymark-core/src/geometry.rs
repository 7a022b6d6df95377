//! Anchor geometry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A rectangle in the host's single layout coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle can be highlighted only if every component is finite and
    /// it has a positive area.
    #[must_use]
    pub fn is_measurable(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Measurement of one mounted UI region.
///
/// Implementations return `None` while the region is unmounted or not yet
/// laid out. Callers never assume the future completes synchronously.
#[async_trait]
pub trait AnchorMeasure: Send + Sync {
    /// Measures the region.
    async fn measure(&self) -> Option<Rect>;
}
