// src/overlay.rs - Per-frame drawing surface filled by the render callbacks
use crate::measure::Measurement;
use crate::recommend::SizeBucket;
use image::Rgb;
use nalgebra::{Point2, Vector2};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

pub const POINT_RADIUS: f64 = 3.0;
/// Horizontal offset of the pixel-length label from the centimeter label.
pub const PX_LABEL_OFFSET: f64 = 100.0;

/// Marker colour for a finger group ("thumb", "index", ..., "wrist").
pub fn finger_color(finger: &str) -> Rgb<u8> {
    match finger.to_lowercase().as_str() {
        "thumb" => Rgb([255, 0, 0]),
        "index" => Rgb([0, 0, 255]),
        "middle" => Rgb([255, 255, 0]),
        "ring" => Rgb([0, 128, 0]),
        "pinky" => Rgb([255, 192, 203]),
        _ => WHITE,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point {
        center: Point2<f64>,
        radius: f64,
        color: Rgb<u8>,
    },
    Line {
        from: Point2<f64>,
        to: Point2<f64>,
        color: Rgb<u8>,
    },
    Text {
        anchor: Point2<f64>,
        text: String,
        color: Rgb<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub bucket: SizeBucket,
    pub hand_length_cm: f64,
    pub items: Vec<String>,
}

/// Shapes in frame pixel coordinates plus whatever the renderer measured and recommended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    shapes: Vec<Shape>,
    measurements: Vec<Measurement>,
    recommendation: Option<Recommendation>,
}

impl Overlay {
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.measurements.clear();
        self.recommendation = None;
    }

    pub fn point(&mut self, center: Point2<f64>, radius: f64, color: Rgb<u8>) {
        self.shapes.push(Shape::Point { center, radius, color });
    }

    pub fn line(&mut self, from: Point2<f64>, to: Point2<f64>, color: Rgb<u8>) {
        self.shapes.push(Shape::Line { from, to, color });
    }

    pub fn text(&mut self, anchor: Point2<f64>, text: impl Into<String>, color: Rgb<u8>) {
        self.shapes.push(Shape::Text {
            anchor,
            text: text.into(),
            color,
        });
    }

    /// Line between the measured landmarks with its cm and px labels.
    pub fn measurement(&mut self, measurement: &Measurement, color: Rgb<u8>) {
        self.line(measurement.start, measurement.end, color);

        let mid = measurement.midpoint();
        self.text(mid, measurement.cm_label(), BLACK);
        self.text(
            mid + Vector2::new(PX_LABEL_OFFSET, 0.0),
            measurement.px_label(),
            BLACK,
        );
        self.measurements.push(measurement.clone());
    }

    pub fn set_recommendation(&mut self, recommendation: Recommendation) {
        self.recommendation = Some(recommendation);
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        self.recommendation.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.recommendation.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Axis;

    fn sample_measurement() -> Measurement {
        Measurement {
            from: "middle_finger_tip".into(),
            to: "wrist".into(),
            start: Point2::new(100.0, 100.0),
            end: Point2::new(100.0, 300.0),
            axis: Axis::Height,
            pixel_length: 200.0,
            centimeter_length: 12.67,
        }
    }

    #[test]
    fn measurement_draws_line_and_two_labels() {
        let mut overlay = Overlay::default();
        overlay.measurement(&sample_measurement(), WHITE);

        assert_eq!(overlay.shapes().len(), 3);
        assert!(matches!(overlay.shapes()[0], Shape::Line { .. }));
        match &overlay.shapes()[1] {
            Shape::Text { anchor, text, .. } => {
                assert_eq!(*anchor, Point2::new(100.0, 200.0));
                assert_eq!(text, "12.67 cm");
            }
            other => panic!("unexpected shape {:?}", other),
        }
        match &overlay.shapes()[2] {
            Shape::Text { anchor, text, .. } => {
                assert_eq!(*anchor, Point2::new(200.0, 200.0));
                assert_eq!(text, "200.00 px");
            }
            other => panic!("unexpected shape {:?}", other),
        }
        assert_eq!(overlay.measurements().len(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut overlay = Overlay::default();
        overlay.point(Point2::new(1.0, 1.0), POINT_RADIUS, WHITE);
        overlay.set_recommendation(Recommendation {
            bucket: SizeBucket::Small,
            hand_length_cm: 10.0,
            items: vec!["a.jpg".into()],
        });
        assert!(!overlay.is_empty());
        overlay.clear();
        assert!(overlay.is_empty());
        assert!(overlay.measurements().is_empty());
    }

    #[test]
    fn finger_palette() {
        assert_eq!(finger_color("thumb"), Rgb([255, 0, 0]));
        assert_eq!(finger_color("Pinky"), Rgb([255, 192, 203]));
        assert_eq!(finger_color("wrist"), WHITE);
    }
}
