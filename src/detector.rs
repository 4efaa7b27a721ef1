// src/detector.rs - Hand landmark detector capability
use crate::error::{Error, Result};
use crate::landmark::Hand;
use async_trait::async_trait;
use image::DynamicImage;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOptions {
    /// Report coordinates mirrored around the frame's vertical centre line.
    pub flip_horizontal: bool,
}

/// Something that finds hands in a video frame.
///
/// Landmark coordinates are frame pixels. Implementations return zero or more hands;
/// callers only look at the first one.
#[async_trait]
pub trait HandDetector: Send {
    async fn detect(&mut self, frame: &DynamicImage, options: DetectOptions) -> Result<Vec<Hand>>;
}

/// Plays back recorded detector output, one entry per frame, looping at the end.
///
/// Recordings hold un-mirrored coordinates; `flip_horizontal` is applied on playback
/// against the width of the frame passed in.
#[derive(Debug, Clone)]
pub struct ReplayDetector {
    frames: Vec<Vec<Hand>>,
    cursor: usize,
}

impl ReplayDetector {
    pub fn new(frames: Vec<Vec<Hand>>) -> Self {
        Self { frames, cursor: 0 }
    }

    /// JSON file holding an array of frames, each an array of hands.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::DetectorUnavailable(format!(
                "Cannot read replay file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let frames: Vec<Vec<Hand>> = serde_json::from_str(&content).map_err(|e| {
            Error::DetectorUnavailable(format!(
                "Invalid replay file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        tracing::info!("Loaded {} recorded frames from {}", frames.len(), path.as_ref().display());
        Ok(Self::new(frames))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[async_trait]
impl HandDetector for ReplayDetector {
    async fn detect(&mut self, frame: &DynamicImage, options: DetectOptions) -> Result<Vec<Hand>> {
        if self.frames.is_empty() {
            return Ok(Vec::new());
        }

        let hands = &self.frames[self.cursor % self.frames.len()];
        self.cursor = self.cursor.wrapping_add(1);

        if options.flip_horizontal {
            let width = f64::from(frame.width());
            Ok(hands.iter().map(|hand| hand.mirrored(width)).collect())
        } else {
            Ok(hands.clone())
        }
    }
}
