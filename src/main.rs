// src/main.rs
mod app;
mod ui;

use anyhow::{bail, Context};
use clap::Parser;
use eframe::egui;
use hand_sizer::config::AppConfig;
use hand_sizer::detector::{HandDetector, ReplayDetector};
use hand_sizer::mediapipe_bridge::ProcessDetector;
use hand_sizer::pipeline::{self, CancelHandle, FrameLoop, FrameOutput, LoopHandle, LoopObserver};
use hand_sizer::render::{FrameRenderer, MeasurementRenderer, RecommendationRenderer};
use hand_sizer::video::{CameraSource, FrameSource, StillImageSource};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "hand_sizer", about = "Measure your hand with a webcam and get a mouse size recommendation")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Camera index, overrides the configuration
    #[arg(long)]
    camera: Option<u32>,

    /// Use a still image instead of the camera
    #[arg(long)]
    image: Option<PathBuf>,

    /// Replay recorded landmarks (JSON) instead of running the detector process
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Landmark detector command, overrides the configuration
    #[arg(long)]
    detector_cmd: Option<String>,

    /// Only draw measurements, no recommendation
    #[arg(long)]
    measure_only: bool,

    /// Run without a window and log a report per frame
    #[arg(long)]
    headless: bool,

    /// Stop after this many frames (headless only)
    #[arg(long)]
    frames: Option<u64>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// List available cameras and exit
    #[arg(long)]
    list_cameras: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    if args.list_cameras {
        return list_cameras();
    }

    let config = load_config(&args)?;

    if let Some(path) = &args.write_config {
        config
            .to_file(path)
            .with_context(|| format!("Failed to write configuration to {}", path.display()))?;
        tracing::info!("Configuration written to {}", path.display());
        return Ok(());
    }

    if args.headless {
        run_headless(config, args)
    } else {
        run_gui(config, args)
    }
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(index) = args.camera {
        config.video.camera_index = index;
    }
    if let Some(command) = &args.detector_cmd {
        config.detector.command = Some(command.clone());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn list_cameras() -> anyhow::Result<()> {
    let cameras = nokhwa::query(nokhwa::utils::ApiBackend::Auto).context("Failed to query cameras")?;
    println!("Found {} camera(s):", cameras.len());
    for camera in &cameras {
        println!("  [{}] {}", camera.index(), camera.human_name());
    }
    Ok(())
}

/// Assemble the frame loop. Must run inside the tokio runtime that will drive it.
fn build_loop(config: &AppConfig, args: &Args) -> hand_sizer::Result<FrameLoop> {
    let source: Box<dyn FrameSource> = match (&args.image, &args.replay) {
        (Some(path), _) => Box::new(StillImageSource::open(path, &config.video)?),
        (None, Some(_)) => Box::new(StillImageSource::blank(&config.video)),
        (None, None) => Box::new(CameraSource::open(&config.video)?),
    };

    let detector: Box<dyn HandDetector> = match &args.replay {
        Some(path) => Box::new(ReplayDetector::from_file(path)?),
        None => Box::new(ProcessDetector::spawn(&config.detector)?),
    };

    let renderer: Box<dyn FrameRenderer> = if args.measure_only {
        Box::new(MeasurementRenderer::new(config.calibration))
    } else {
        Box::new(RecommendationRenderer::new(
            config.calibration,
            config.recommendations.clone(),
        ))
    };

    Ok(FrameLoop::new(config, source, detector, renderer))
}

fn run_gui(config: AppConfig, args: Args) -> anyhow::Result<()> {
    let assets_dir = config.assets_dir.clone();
    let show_recommendations = !args.measure_only;

    let handle = LoopHandle::spawn(move || build_loop(&config, &args)).context("Failed to start frame loop")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 760.0])
            .with_min_inner_size([900.0, 600.0]),
        centered: true,
        ..Default::default()
    };

    let result = eframe::run_native(
        "Hand Sizer",
        options,
        Box::new(move |cc| Box::new(app::HandSizerApp::new(cc, handle, assets_dir, show_recommendations))),
    );

    if let Err(e) = result {
        bail!("Error running application: {}", e);
    }
    Ok(())
}

fn run_headless(config: AppConfig, args: Args) -> anyhow::Result<()> {
    if args.frames == Some(0) {
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create runtime")?;

    let result = runtime.block_on(async {
        let frame_loop = build_loop(&config, &args).context("Failed to start frame loop")?;
        let observer = frame_loop.observer();
        let (cancel, shutdown) = pipeline::cancel_pair();

        tokio::join!(frame_loop.run(shutdown), report_frames(observer, cancel, args.frames));
        Ok::<_, anyhow::Error>(())
    });
    runtime.shutdown_background();
    result
}

async fn report_frames(mut observer: LoopObserver, cancel: CancelHandle, max_frames: Option<u64>) {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cycles = 0u64;

    loop {
        tokio::select! {
            changed = observer.stats.changed() => {
                if changed.is_err() {
                    break;
                }
                cycles += 1;

                if observer.frames.has_changed().unwrap_or(false) {
                    if let Some(output) = observer.frames.borrow_and_update().clone() {
                        log_report(&output);
                    }
                }

                if max_frames.is_some_and(|max| cycles >= max) {
                    cancel.cancel();
                    break;
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                cancel.cancel();
                break;
            }
        }
    }

    let stats = *observer.stats.borrow();
    tracing::info!("{:.1} fps, {:.1} ms per cycle", stats.fps, stats.avg_cycle_ms);
}

fn log_report(output: &FrameOutput) {
    if output.hands_detected == 0 {
        tracing::info!("Frame {}: no hand", output.index);
        return;
    }

    let lengths: Vec<String> = output
        .overlay
        .measurements()
        .iter()
        .map(|m| format!("{}-{} {} ({})", m.from, m.to, m.cm_label(), m.px_label()))
        .collect();

    match output.overlay.recommendation() {
        Some(recommendation) => tracing::info!(
            "Frame {}: {} -> {} [{}]",
            output.index,
            lengths.join(", "),
            recommendation.bucket,
            recommendation.items.join(", ")
        ),
        None if output.measured => tracing::info!("Frame {}: {}", output.index, lengths.join(", ")),
        None => tracing::info!("Frame {}: hand found but not measured", output.index),
    }
}
