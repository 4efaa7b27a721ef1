//! Hand size measurement from 2D hand landmarks.
//!
//! Each video frame goes through the same pipeline:
//! 1. an injected [`detector::HandDetector`] finds hands and their named landmarks,
//! 2. [`landmark::LandmarkFilter`] keeps the keypoints of interest of the first hand,
//! 3. [`measure`] turns landmark pairs into pixel and centimeter lengths using the
//!    per-axis ratios in [`calibration::Calibration`],
//! 4. [`recommend::RecommendationTable`] maps the hand length to a mouse size bucket.
//!
//! [`pipeline::FrameLoop`] drives this at the configured frame rate and hands
//! every result to the render callbacks in [`render`].

pub mod calibration;
pub mod config;
pub mod detector;
pub mod error;
pub mod landmark;
pub mod measure;
pub mod mediapipe_bridge;
pub mod overlay;
pub mod pipeline;
pub mod recommend;
pub mod render;
pub mod video;

pub use error::{Error, Result};
