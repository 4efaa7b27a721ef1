// src/landmark.rs - Named hand landmarks and the keypoint allow-list filter
use crate::error::{Error, Result};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// Keypoint names as produced by MediaPipe Hands
pub const THUMB_IP: &str = "thumb_ip";
pub const MIDDLE_FINGER_TIP: &str = "middle_finger_tip";
pub const PINKY_FINGER_MCP: &str = "pinky_finger_mcp";
pub const WRIST: &str = "wrist";

pub const USED_KEYPOINTS: [&str; 4] = [THUMB_IP, MIDDLE_FINGER_TIP, PINKY_FINGER_MCP, WRIST];

/// A named 2D point in video-frame pixel space (y pointing down).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "KeypointRecord", into = "KeypointRecord")]
pub struct Landmark {
    pub name: String,
    pub position: Point2<f64>,
}

// Wire shape used by detectors: {"name": .., "x": .., "y": ..}
#[derive(Serialize, Deserialize)]
struct KeypointRecord {
    name: String,
    x: f64,
    y: f64,
}

impl From<KeypointRecord> for Landmark {
    fn from(record: KeypointRecord) -> Self {
        Landmark::new(record.name, record.x, record.y)
    }
}

impl From<Landmark> for KeypointRecord {
    fn from(landmark: Landmark) -> Self {
        KeypointRecord {
            x: landmark.position.x,
            y: landmark.position.y,
            name: landmark.name,
        }
    }
}

impl Landmark {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            position: Point2::new(x, y),
        }
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    /// Finger group of the keypoint, e.g. "thumb" for "thumb_ip".
    pub fn finger(&self) -> &str {
        self.name.split('_').next().unwrap_or_default()
    }

    /// Mirror the point around the vertical centre line of a frame `width` pixels wide.
    pub fn mirrored(&self, width: f64) -> Self {
        Self {
            name: self.name.clone(),
            position: Point2::new(width - self.position.x, self.position.y),
        }
    }
}

/// One detected hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub keypoints: Vec<Landmark>,
}

impl Hand {
    pub fn new(keypoints: Vec<Landmark>) -> Self {
        Self { keypoints }
    }

    pub fn mirrored(&self, width: f64) -> Self {
        Self {
            keypoints: self.keypoints.iter().map(|lm| lm.mirrored(width)).collect(),
        }
    }
}

/// Landmarks of one frame restricted to the allow-list.
///
/// Holds at most one landmark per name, in the order the detector reported them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredLandmarkSet {
    landmarks: Vec<Landmark>,
}

impl FilteredLandmarkSet {
    pub fn get(&self, name: &str) -> Option<&Landmark> {
        self.landmarks.iter().find(|lm| lm.name == name)
    }

    pub fn require(&self, name: &str) -> Result<&Landmark> {
        self.get(name)
            .ok_or_else(|| Error::MissingLandmark(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> + '_ {
        self.landmarks.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.landmarks.iter().map(|lm| lm.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LandmarkFilter {
    allowed: Vec<String>,
}

impl Default for LandmarkFilter {
    fn default() -> Self {
        Self::new(USED_KEYPOINTS)
    }
}

impl LandmarkFilter {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, name: &str) -> bool {
        self.allowed.iter().any(|allowed| allowed == name)
    }

    /// Keep only allow-listed landmarks. A repeated name keeps its first occurrence.
    pub fn apply(&self, raw: &[Landmark]) -> FilteredLandmarkSet {
        let mut landmarks: Vec<Landmark> = Vec::with_capacity(self.allowed.len());

        for landmark in raw {
            if !self.allows(&landmark.name) {
                continue;
            }
            if landmarks.iter().any(|kept| kept.name == landmark.name) {
                continue;
            }
            landmarks.push(landmark.clone());
        }

        FilteredLandmarkSet { landmarks }
    }
}
