// src/recommend.rs - Hand length to mouse size buckets
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeBucket {
    Small,
    Medium,
    Large,
}

impl fmt::Display for SizeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SizeBucket::Small => "small",
            SizeBucket::Medium => "medium",
            SizeBucket::Large => "large",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationTable {
    /// Hand lengths from here up to `large_from_cm` (exclusive) are medium.
    pub medium_from_cm: f64,
    /// Hand lengths from here up are large.
    pub large_from_cm: f64,
    pub small: Vec<String>,
    pub medium: Vec<String>,
    pub large: Vec<String>,
}

impl Default for RecommendationTable {
    fn default() -> Self {
        Self {
            medium_from_cm: 18.0,
            large_from_cm: 20.0,
            small: vec!["hyperx-pulsefire.jpg".into(), "mx-master-3s.jpg".into()],
            medium: vec!["razer-deathadder.jpg".into(), "logitech-g502x.jpg".into()],
            large: vec!["glorious-model-o.jpg".into(), "steelseries-rival600.jpg".into()],
        }
    }
}

impl RecommendationTable {
    /// Half-open buckets: `[.., medium)`, `[medium, large)`, `[large, ..]`.
    /// Zero and negative lengths land in `Small`.
    pub fn classify(&self, hand_length_cm: f64) -> SizeBucket {
        if hand_length_cm < self.medium_from_cm {
            SizeBucket::Small
        } else if hand_length_cm < self.large_from_cm {
            SizeBucket::Medium
        } else {
            SizeBucket::Large
        }
    }

    pub fn items(&self, bucket: SizeBucket) -> &[String] {
        match bucket {
            SizeBucket::Small => &self.small,
            SizeBucket::Medium => &self.medium,
            SizeBucket::Large => &self.large,
        }
    }

    pub fn recommend(&self, hand_length_cm: f64) -> (SizeBucket, &[String]) {
        let bucket = self.classify(hand_length_cm);
        (bucket, self.items(bucket))
    }
}
