// src/bin/camera_test.rs - Open the configured camera and grab one frame
use hand_sizer::config::AppConfig;
use hand_sizer::video::{CameraSource, FrameSource};
use hand_sizer::Error;

fn main() {
    tracing_subscriber::fmt::init();

    println!("Testing camera access...\n");

    let config = match AppConfig::load(None) {
        Ok(config) => config,
        Err(e) => {
            println!("✗ Failed to load configuration: {}", e);
            return;
        }
    };

    let mut camera = match CameraSource::open(&config.video) {
        Ok(camera) => camera,
        Err(Error::DeviceUnavailable(reason)) => {
            println!("✗ {}", reason);
            println!("\nPossible causes:");
            println!("1. Camera is being used by another app");
            println!("2. Camera permissions not granted");
            println!("3. No camera connected");
            return;
        }
        Err(e) => {
            println!("✗ {}", e);
            return;
        }
    };

    let (width, height) = camera.resolution();
    println!("✓ Camera '{}' opened at {}x{}", camera.name(), width, height);

    match camera.capture() {
        Ok(frame) => println!("✓ Frame captured successfully ({}x{})", frame.width(), frame.height()),
        Err(e) => println!("✗ {}", e),
    }
}
