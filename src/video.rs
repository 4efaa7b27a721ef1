// src/video.rs - Frame sources: live camera and still images
use crate::config::VideoConfig;
use crate::error::{Error, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use std::path::Path;

/// Frames are grabbed on a blocking worker thread, so sources must be `Send`.
pub trait FrameSource: Send {
    /// Grab the next frame. Blocks until one is available.
    fn capture(&mut self) -> Result<DynamicImage>;

    fn resolution(&self) -> (u32, u32);
}

pub struct CameraSource {
    camera: Camera,
}

impl CameraSource {
    /// Open the configured camera and start streaming. Fails with `DeviceUnavailable`.
    pub fn open(config: &VideoConfig) -> Result<Self> {
        tracing::debug!(
            "Opening camera {} at {}x{}@{}",
            config.camera_index,
            config.width,
            config.height,
            config.fps
        );

        let format = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(CameraIndex::Index(config.camera_index), requested)
            .map_err(|e| Error::DeviceUnavailable(format!("Failed to open camera: {}", e)))?;

        camera
            .open_stream()
            .map_err(|e| Error::DeviceUnavailable(format!("Failed to open camera stream: {}", e)))?;

        let resolution = camera.resolution();
        tracing::info!(
            "Camera '{}' streaming at {}x{}@{}",
            camera.info().human_name(),
            resolution.width(),
            resolution.height(),
            camera.frame_rate()
        );

        Ok(Self { camera })
    }

    pub fn name(&self) -> String {
        self.camera.info().human_name()
    }
}

impl FrameSource for CameraSource {
    fn capture(&mut self) -> Result<DynamicImage> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| Error::Capture(format!("Failed to capture frame: {}", e)))?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::Capture(format!("Failed to decode frame: {}", e)))?;

        Ok(DynamicImage::ImageRgb8(decoded))
    }

    fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::debug!("Failed to stop camera stream: {}", e);
        }
    }
}

/// Serves the same image for every frame.
#[derive(Debug, Clone)]
pub struct StillImageSource {
    image: DynamicImage,
}

impl StillImageSource {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Load an image and scale it to the configured video size.
    pub fn open<P: AsRef<Path>>(path: P, config: &VideoConfig) -> Result<Self> {
        let image = image::open(path.as_ref()).map_err(|e| {
            Error::DeviceUnavailable(format!("Cannot load image {}: {}", path.as_ref().display(), e))
        })?;

        let image = if image.width() != config.width || image.height() != config.height {
            image.resize_exact(config.width, config.height, FilterType::Triangle)
        } else {
            image
        };
        Ok(Self::new(image))
    }

    /// Black frames of the configured size, for replaying recorded landmarks without a camera.
    pub fn blank(config: &VideoConfig) -> Self {
        Self::new(DynamicImage::new_rgb8(config.width, config.height))
    }
}

impl FrameSource for StillImageSource {
    fn capture(&mut self) -> Result<DynamicImage> {
        Ok(self.image.clone())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}
