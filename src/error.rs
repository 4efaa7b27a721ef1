// src/error.rs
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A named landmark needed for a measurement is absent from this frame.
    #[error("landmark '{0}' not detected in this frame")]
    MissingLandmark(String),

    /// Camera could not be opened (no device, permission denied).
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// The hand detector could not be started.
    #[error("hand detector unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("hand detection failed: {0}")]
    Detection(String),

    #[error("hand detection timed out after {0:?}")]
    DetectionTimeout(Duration),

    #[error("frame capture failed: {0}")]
    Capture(String),

    #[error("no frame from the video source within {0:?}")]
    CaptureTimeout(Duration),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Failures that only affect the current frame cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MissingLandmark(_)
                | Error::Detection(_)
                | Error::DetectionTimeout(_)
                | Error::Capture(_)
                | Error::CaptureTimeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
