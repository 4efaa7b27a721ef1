// src/calibration.rs
use crate::landmark::WRIST;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Height,
    Width,
}

/// Fixed pixels-per-centimeter ratios for a camera at a fixed working distance.
///
/// Measurements touching the wrist run mostly along the frame's vertical axis,
/// finger-span measurements mostly along the horizontal one. This only holds for
/// the expected hand posture in front of one camera setup; nothing here accounts
/// for distance to the camera or lens intrinsics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub height_px_per_cm: f64,
    pub width_px_per_cm: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            height_px_per_cm: 15.79,
            width_px_per_cm: 11.81,
        }
    }
}

impl Calibration {
    pub fn axis_for(&self, a: &str, b: &str) -> Axis {
        if a == WRIST || b == WRIST {
            Axis::Height
        } else {
            Axis::Width
        }
    }

    pub fn ratio(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Height => self.height_px_per_cm,
            Axis::Width => self.width_px_per_cm,
        }
    }

    pub fn ratio_for(&self, a: &str, b: &str) -> f64 {
        self.ratio(self.axis_for(a, b))
    }
}
