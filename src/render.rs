// src/render.rs - Render callbacks invoked once per processed hand
use crate::calibration::Calibration;
use crate::error::Result;
use crate::landmark::FilteredLandmarkSet;
use crate::measure::{self, Measurement};
use crate::overlay::{self, Overlay, Recommendation, WHITE};
use crate::recommend::RecommendationTable;
use image::Rgb;

pub trait FrameRenderer {
    /// Draw one hand. An `Err` means the frame produced no measurement.
    fn render(&mut self, overlay: &mut Overlay, landmarks: &FilteredLandmarkSet) -> Result<()>;
}

impl<F> FrameRenderer for F
where
    F: FnMut(&mut Overlay, &FilteredLandmarkSet) -> Result<()>,
{
    fn render(&mut self, overlay: &mut Overlay, landmarks: &FilteredLandmarkSet) -> Result<()> {
        self(overlay, landmarks)
    }
}

#[derive(Debug, Clone)]
pub struct HandMeasurements {
    pub length: Measurement,
    pub span: Measurement,
}

/// Default callback: landmark markers plus the hand span and hand length lines.
///
/// Both lines or neither: if any of the four measured landmarks is missing the
/// frame gets its markers only and `render` returns `MissingLandmark`. That also
/// holds when only a span landmark is missing and the hand length alone could be
/// measured, so such a frame gets no recommendation either.
#[derive(Debug, Clone)]
pub struct MeasurementRenderer {
    calibration: Calibration,
    line_color: Rgb<u8>,
}

impl MeasurementRenderer {
    pub fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            line_color: WHITE,
        }
    }

    pub fn draw(&self, overlay: &mut Overlay, landmarks: &FilteredLandmarkSet) -> Result<HandMeasurements> {
        for landmark in landmarks.iter() {
            overlay.point(
                landmark.position,
                overlay::POINT_RADIUS,
                overlay::finger_color(landmark.finger()),
            );
        }

        // Both lines or neither
        let span = measure::hand_span(landmarks, &self.calibration)?;
        let length = measure::hand_length(landmarks, &self.calibration)?;

        overlay.measurement(&span, self.line_color);
        overlay.measurement(&length, self.line_color);

        Ok(HandMeasurements { length, span })
    }
}

impl FrameRenderer for MeasurementRenderer {
    fn render(&mut self, overlay: &mut Overlay, landmarks: &FilteredLandmarkSet) -> Result<()> {
        self.draw(overlay, landmarks).map(|_| ())
    }
}

/// Draws the measurements and attaches the mouse recommendation for the hand length.
#[derive(Debug, Clone)]
pub struct RecommendationRenderer {
    measurements: MeasurementRenderer,
    table: RecommendationTable,
}

impl RecommendationRenderer {
    pub fn new(calibration: Calibration, table: RecommendationTable) -> Self {
        Self {
            measurements: MeasurementRenderer::new(calibration),
            table,
        }
    }
}

impl FrameRenderer for RecommendationRenderer {
    fn render(&mut self, overlay: &mut Overlay, landmarks: &FilteredLandmarkSet) -> Result<()> {
        let HandMeasurements { length, .. } = self.measurements.draw(overlay, landmarks)?;

        let (bucket, items) = self.table.recommend(length.centimeter_length);
        tracing::debug!(
            "Hand length {:.2} cm -> {} ({} items)",
            length.centimeter_length,
            bucket,
            items.len()
        );

        overlay.set_recommendation(Recommendation {
            bucket,
            hand_length_cm: length.centimeter_length,
            items: items.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::landmark::{Landmark, LandmarkFilter};
    use crate::overlay::Shape;
    use crate::recommend::SizeBucket;

    fn landmarks(points: &[(&str, f64, f64)]) -> FilteredLandmarkSet {
        let raw: Vec<Landmark> = points
            .iter()
            .map(|(name, x, y)| Landmark::new(*name, *x, *y))
            .collect();
        LandmarkFilter::default().apply(&raw)
    }

    fn complete_hand() -> FilteredLandmarkSet {
        landmarks(&[
            ("thumb_ip", 0.0, 0.0),
            ("middle_finger_tip", 100.0, 0.0),
            ("pinky_finger_mcp", 200.0, 0.0),
            ("wrist", 100.0, 158.0),
        ])
    }

    #[test]
    fn default_renderer_draws_points_and_lines() {
        let mut overlay = Overlay::default();
        MeasurementRenderer::new(Calibration::default())
            .render(&mut overlay, &complete_hand())
            .unwrap();

        let points = overlay
            .shapes()
            .iter()
            .filter(|s| matches!(s, Shape::Point { .. }))
            .count();
        let lines = overlay
            .shapes()
            .iter()
            .filter(|s| matches!(s, Shape::Line { .. }))
            .count();
        assert_eq!(points, 4);
        assert_eq!(lines, 2);
        assert_eq!(overlay.measurements().len(), 2);
        assert!(overlay.recommendation().is_none());
    }

    #[test]
    fn recommendation_renderer_classifies_hand_length() {
        let mut overlay = Overlay::default();
        let mut renderer =
            RecommendationRenderer::new(Calibration::default(), RecommendationTable::default());
        renderer.render(&mut overlay, &complete_hand()).unwrap();

        let recommendation = overlay.recommendation().unwrap();
        assert_eq!(recommendation.bucket, SizeBucket::Small);
        assert!((recommendation.hand_length_cm - 10.01).abs() < 0.01);
        assert_eq!(recommendation.items, RecommendationTable::default().small);
    }

    #[test]
    fn missing_wrist_draws_no_lines_and_no_recommendation() {
        let partial = landmarks(&[
            ("thumb_ip", 0.0, 0.0),
            ("middle_finger_tip", 100.0, 0.0),
            ("pinky_finger_mcp", 200.0, 0.0),
        ]);
        let mut overlay = Overlay::default();
        let mut renderer =
            RecommendationRenderer::new(Calibration::default(), RecommendationTable::default());
        let err = renderer.render(&mut overlay, &partial).unwrap_err();

        assert!(matches!(err, Error::MissingLandmark(ref name) if name == "wrist"));
        assert!(overlay.measurements().is_empty());
        assert!(overlay.recommendation().is_none());
        assert!(overlay
            .shapes()
            .iter()
            .all(|s| matches!(s, Shape::Point { .. })));
    }

    #[test]
    fn missing_span_landmark_also_drops_the_recommendation() {
        let no_thumb = landmarks(&[
            ("middle_finger_tip", 100.0, 0.0),
            ("pinky_finger_mcp", 200.0, 0.0),
            ("wrist", 100.0, 158.0),
        ]);
        let mut overlay = Overlay::default();
        let mut renderer =
            RecommendationRenderer::new(Calibration::default(), RecommendationTable::default());
        let err = renderer.render(&mut overlay, &no_thumb).unwrap_err();

        assert!(matches!(err, Error::MissingLandmark(ref name) if name == "thumb_ip"));
        assert!(overlay.measurements().is_empty());
        assert!(overlay.recommendation().is_none());
        assert_eq!(overlay.shapes().len(), 3);
    }

    #[test]
    fn closures_are_renderers() {
        let mut calls = 0;
        {
            let mut renderer = |overlay: &mut Overlay, set: &FilteredLandmarkSet| -> Result<()> {
                calls += 1;
                overlay.text(nalgebra::Point2::origin(), format!("{} landmarks", set.len()), WHITE);
                Ok(())
            };
            let mut overlay = Overlay::default();
            renderer.render(&mut overlay, &complete_hand()).unwrap();
            assert_eq!(overlay.shapes().len(), 1);
        }
        assert_eq!(calls, 1);
    }
}
