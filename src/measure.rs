// src/measure.rs - Pixel and centimeter distances between named landmarks
use crate::calibration::{Axis, Calibration};
use crate::error::Result;
use crate::landmark::{FilteredLandmarkSet, MIDDLE_FINGER_TIP, PINKY_FINGER_MCP, THUMB_IP, WRIST};
use nalgebra::Point2;

/// Wrist to middle fingertip.
pub const HAND_LENGTH: (&str, &str) = (MIDDLE_FINGER_TIP, WRIST);
/// Thumb IP joint to pinky knuckle.
pub const HAND_SPAN: (&str, &str) = (THUMB_IP, PINKY_FINGER_MCP);

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub from: String,
    pub to: String,
    pub start: Point2<f64>,
    pub end: Point2<f64>,
    pub axis: Axis,
    pub pixel_length: f64,
    pub centimeter_length: f64,
}

impl Measurement {
    pub fn cm_label(&self) -> String {
        format!("{:.2} cm", self.centimeter_length)
    }

    pub fn px_label(&self) -> String {
        format!("{:.2} px", self.pixel_length)
    }

    pub fn midpoint(&self) -> Point2<f64> {
        nalgebra::center(&self.start, &self.end)
    }
}

/// Distance between landmarks `from` and `to`, converted with the ratio for their axis.
///
/// Fails with `MissingLandmark` if either name is absent from `landmarks`.
pub fn measure(
    landmarks: &FilteredLandmarkSet,
    from: &str,
    to: &str,
    calibration: &Calibration,
) -> Result<Measurement> {
    let start = landmarks.require(from)?;
    let end = landmarks.require(to)?;

    let pixel_length = nalgebra::distance(&start.position, &end.position);
    let axis = calibration.axis_for(from, to);
    let centimeter_length = pixel_length / calibration.ratio(axis);

    Ok(Measurement {
        from: from.to_string(),
        to: to.to_string(),
        start: start.position,
        end: end.position,
        axis,
        pixel_length,
        centimeter_length,
    })
}

pub fn hand_length(landmarks: &FilteredLandmarkSet, calibration: &Calibration) -> Result<Measurement> {
    measure(landmarks, HAND_LENGTH.0, HAND_LENGTH.1, calibration)
}

pub fn hand_span(landmarks: &FilteredLandmarkSet, calibration: &Calibration) -> Result<Measurement> {
    measure(landmarks, HAND_SPAN.0, HAND_SPAN.1, calibration)
}
