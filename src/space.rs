//! This module defines the plane in which clicks live.
//!  - the click point type
//!  - the squared Euclidian distance function

use serde::{Deserialize, Serialize};

/// A click on a page, in page coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClickPoint {
    pub x: f64,
    pub y: f64,
}

impl ClickPoint {
    /// Builds a new click point.
    pub fn new(x: f64, y: f64) -> Self {
        ClickPoint { x, y }
    }

    /// True when neither coordinate is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Squared Euclidian distance in the plane.
pub fn squared_dist(p1: &ClickPoint, p2: &ClickPoint) -> f64 {
    let dx = p1.x - p2.x;
    let dy = p1.y - p2.y;
    dx * dx + dy * dy
}
