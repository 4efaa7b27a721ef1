//! Frame loop behaviour with deterministic sources and detectors

use async_trait::async_trait;
use hand_sizer::config::AppConfig;
use hand_sizer::detector::{DetectOptions, HandDetector, ReplayDetector};
use hand_sizer::landmark::{FilteredLandmarkSet, Hand, Landmark};
use hand_sizer::overlay::{Overlay, Shape};
use hand_sizer::pipeline::{cancel_pair, FrameLoop, FrameOutput, LoopHandle, LoopObserver, LoopState};
use hand_sizer::recommend::SizeBucket;
use hand_sizer::render::{MeasurementRenderer, RecommendationRenderer};
use hand_sizer::video::{FrameSource, StillImageSource};
use hand_sizer::{Error, Result};
use image::DynamicImage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.video.width = 64;
    config.video.height = 48;
    config.video.fps = 200;
    config.video.flip_horizontal = false;
    config.video.capture_timeout_ms = 50;
    config.detector.timeout_ms = 50;
    config
}

/// Vertical hand: wrist below the middle fingertip by `length_px`, span of 100 px.
fn hand(length_px: f64) -> Hand {
    Hand::new(vec![
        Landmark::new("wrist", 50.0, 300.0),
        Landmark::new("thumb_ip", 0.0, 200.0),
        Landmark::new("index_finger_tip", 30.0, 300.0 - length_px),
        Landmark::new("middle_finger_tip", 50.0, 300.0 - length_px),
        Landmark::new("pinky_finger_mcp", 100.0, 200.0),
    ])
}

fn hand_without_wrist() -> Hand {
    Hand::new(hand(158.0).keypoints.into_iter().filter(|lm| lm.name != "wrist").collect())
}

enum Step {
    Hands(Vec<Hand>),
    Fail,
    Hang,
}

/// Plays a fixed script, then keeps returning `then`.
struct ScriptedDetector {
    steps: VecDeque<Step>,
    then: Vec<Hand>,
}

impl ScriptedDetector {
    fn new(steps: Vec<Step>, then: Vec<Hand>) -> Self {
        Self {
            steps: steps.into(),
            then,
        }
    }
}

#[async_trait]
impl HandDetector for ScriptedDetector {
    async fn detect(&mut self, _frame: &DynamicImage, _options: DetectOptions) -> Result<Vec<Hand>> {
        match self.steps.pop_front() {
            Some(Step::Hands(hands)) => Ok(hands),
            Some(Step::Fail) => Err(Error::Detection("scripted failure".to_string())),
            Some(Step::Hang) => {
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
            None => Ok(self.then.clone()),
        }
    }
}

/// Fails the first `failures` captures.
struct FlakySource {
    failures: usize,
    inner: StillImageSource,
}

impl FrameSource for FlakySource {
    fn capture(&mut self) -> Result<DynamicImage> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(Error::Capture("scripted failure".to_string()));
        }
        self.inner.capture()
    }

    fn resolution(&self) -> (u32, u32) {
        self.inner.resolution()
    }
}

/// Blocks in `capture` for the given delays, one per call, then answers immediately.
struct StallingSource {
    delays: VecDeque<Duration>,
    inner: StillImageSource,
}

impl FrameSource for StallingSource {
    fn capture(&mut self) -> Result<DynamicImage> {
        if let Some(delay) = self.delays.pop_front() {
            std::thread::sleep(delay);
        }
        self.inner.capture()
    }

    fn resolution(&self) -> (u32, u32) {
        self.inner.resolution()
    }
}

fn recommending_loop(config: &AppConfig, detector: impl HandDetector + 'static) -> FrameLoop {
    FrameLoop::new(
        config,
        Box::new(StillImageSource::blank(&config.video)),
        Box::new(detector),
        Box::new(RecommendationRenderer::new(
            config.calibration,
            config.recommendations.clone(),
        )),
    )
}

/// Run the loop until `done` accepts a published frame, then cancel it.
async fn run_until<F>(frame_loop: FrameLoop, mut done: F) -> (Vec<Arc<FrameOutput>>, LoopObserver)
where
    F: FnMut(&FrameOutput) -> bool,
{
    let mut observer = frame_loop.observer();
    let (cancel, shutdown) = cancel_pair();
    let mut seen = Vec::new();

    let watcher = async {
        while observer.frames.changed().await.is_ok() {
            let output = observer.frames.borrow_and_update().clone();
            if let Some(output) = output {
                let finished = done(&output);
                seen.push(output);
                if finished {
                    break;
                }
            }
        }
        cancel.cancel();
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(frame_loop.run(shutdown), watcher);
    })
    .await
    .expect("frame loop did not finish in time");

    (seen, observer)
}

#[tokio::test]
async fn loop_survives_detector_errors_and_timeouts() {
    let config = test_config();
    let detector = ScriptedDetector::new(vec![Step::Fail, Step::Hang], vec![hand(158.0)]);

    let (seen, observer) = run_until(recommending_loop(&config, detector), |output| output.measured).await;

    let last = seen.last().unwrap();
    assert!(last.measured);
    assert_eq!(last.index, 2);

    let stats = *observer.stats.borrow();
    assert_eq!(stats.frames_skipped, 2);
    assert!(stats.frames_measured >= 1);
    assert_eq!(*observer.state.borrow(), LoopState::Stopped);
}

#[tokio::test]
async fn loop_survives_capture_errors() {
    let config = test_config();
    let source = FlakySource {
        failures: 2,
        inner: StillImageSource::blank(&config.video),
    };
    let frame_loop = FrameLoop::new(
        &config,
        Box::new(source),
        Box::new(ReplayDetector::new(vec![vec![hand(158.0)]])),
        Box::new(MeasurementRenderer::new(config.calibration)),
    );

    let (seen, observer) = run_until(frame_loop, |output| output.measured).await;

    assert_eq!(seen[0].index, 2);
    assert_eq!(observer.stats.borrow().frames_skipped, 2);
}

#[tokio::test]
async fn stalled_capture_times_out_and_loop_recovers() {
    let config = test_config();
    let source = StallingSource {
        delays: VecDeque::from(vec![Duration::from_millis(200)]),
        inner: StillImageSource::blank(&config.video),
    };
    let frame_loop = FrameLoop::new(
        &config,
        Box::new(source),
        Box::new(ReplayDetector::new(vec![vec![hand(158.0)]])),
        Box::new(MeasurementRenderer::new(config.calibration)),
    );

    let (seen, observer) = run_until(frame_loop, |output| output.measured).await;

    assert!(seen.last().unwrap().measured);
    // Every timed-out cycle waited on the same capture
    let stats = *observer.stats.borrow();
    assert!(stats.frames_skipped >= 1);
    assert_eq!(seen[0].index, stats.frames_skipped);
}

#[tokio::test]
async fn only_first_hand_is_measured() {
    let config = test_config();
    // 158 px -> 10.01 cm (small), 400 px -> 25.33 cm (large)
    let detector = ReplayDetector::new(vec![vec![hand(158.0), hand(400.0)]]);

    let (seen, _) = run_until(recommending_loop(&config, detector), |output| output.measured).await;

    let output = seen.last().unwrap();
    assert_eq!(output.hands_detected, 2);
    let recommendation = output.overlay.recommendation().unwrap();
    assert_eq!(recommendation.bucket, SizeBucket::Small);
    assert!((recommendation.hand_length_cm - 10.006).abs() < 0.001);
}

#[tokio::test]
async fn frame_without_wrist_is_skipped_and_next_frame_proceeds() {
    let config = test_config();
    let detector = ScriptedDetector::new(vec![Step::Hands(vec![hand_without_wrist()])], vec![hand(158.0)]);

    let (seen, observer) = run_until(recommending_loop(&config, detector), |output| output.measured).await;

    let first = &seen[0];
    assert_eq!(first.index, 0);
    assert_eq!(first.hands_detected, 1);
    assert!(!first.measured);
    assert!(first.overlay.measurements().is_empty());
    assert!(first.overlay.recommendation().is_none());
    // Allow-listed points are still drawn
    let points = first
        .overlay
        .shapes()
        .iter()
        .filter(|shape| matches!(shape, Shape::Point { .. }))
        .count();
    assert_eq!(points, 3);

    assert!(seen.last().unwrap().measured);
    let stats = *observer.stats.borrow();
    assert_eq!(stats.frames_skipped, 1);
    assert!(stats.frames_measured >= 1);
}

#[tokio::test]
async fn frames_without_hands_publish_an_empty_overlay() {
    let config = test_config();
    let detector = ReplayDetector::new(vec![vec![]]);

    let (seen, observer) = run_until(recommending_loop(&config, detector), |output| output.index >= 1).await;

    assert!(seen.iter().all(|output| output.hands_detected == 0 && output.overlay.is_empty()));
    assert_eq!(observer.stats.borrow().frames_skipped, 0);
}

#[tokio::test]
async fn overlay_is_cleared_between_frames() {
    let config = test_config();
    let detector = ReplayDetector::new(vec![vec![hand(158.0)], vec![]]);

    let (seen, _) = run_until(recommending_loop(&config, detector), |output| output.index >= 1).await;

    let empty = seen.iter().find(|output| output.index == 1).unwrap();
    assert_eq!(empty.hands_detected, 0);
    assert!(empty.overlay.is_empty());
}

#[tokio::test]
async fn custom_render_callback_receives_filtered_landmarks() {
    let config = test_config();
    let received: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    let frame_loop = FrameLoop::new(
        &config,
        Box::new(StillImageSource::blank(&config.video)),
        Box::new(ReplayDetector::new(vec![vec![hand(158.0)]])),
        Box::new(move |_overlay: &mut Overlay, landmarks: &FilteredLandmarkSet| -> Result<()> {
            *sink.lock().unwrap() = landmarks.names().map(str::to_string).collect();
            Ok(())
        }),
    );

    run_until(frame_loop, |output| output.measured).await;

    assert_eq!(
        *received.lock().unwrap(),
        vec!["wrist", "thumb_ip", "middle_finger_tip", "pinky_finger_mcp"]
    );
}

#[tokio::test]
async fn flipped_replay_is_mirrored_against_frame_width() {
    let mut config = test_config();
    config.video.width = 640;
    config.video.flip_horizontal = true;
    let detector = ReplayDetector::new(vec![vec![hand(158.0)]]);

    let (seen, _) = run_until(recommending_loop(&config, detector), |output| output.measured).await;

    let output = seen.last().unwrap();
    let wrist = output
        .overlay
        .shapes()
        .iter()
        .find_map(|shape| match shape {
            Shape::Point { center, .. } if center.y == 300.0 && center.x > 100.0 => Some(*center),
            _ => None,
        })
        .unwrap();
    assert_eq!(wrist.x, 590.0);
    assert_eq!(output.frame.width(), 640);
}

#[tokio::test]
async fn cancelled_loop_stops_without_processing() {
    let config = test_config();
    let frame_loop = recommending_loop(&config, ReplayDetector::new(vec![vec![hand(158.0)]]));
    let observer = frame_loop.observer();
    let (cancel, shutdown) = cancel_pair();

    cancel.cancel();
    assert!(cancel.is_cancelled());
    frame_loop.run(shutdown).await;

    assert_eq!(*observer.state.borrow(), LoopState::Stopped);
    assert_eq!(observer.stats.borrow().frames_processed, 0);
    assert!(observer.frames.borrow().is_none());
}

#[test]
fn loop_handle_reports_startup_failure() {
    let result = LoopHandle::spawn(|| Err(Error::DeviceUnavailable("no camera".to_string())));

    assert!(matches!(result, Err(Error::DeviceUnavailable(_))));
}

#[test]
fn loop_handle_runs_until_stopped() {
    let config = test_config();
    let handle = LoopHandle::spawn(move || {
        Ok(recommending_loop(
            &config,
            ReplayDetector::new(vec![vec![hand(158.0)]]),
        ))
    })
    .unwrap();

    let observer = handle.observer();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while observer.stats.borrow().frames_measured == 0 {
        assert!(std::time::Instant::now() < deadline, "no frame measured");
        std::thread::sleep(Duration::from_millis(5));
    }

    handle.stop();
    assert_eq!(*observer.state.borrow(), LoopState::Stopped);
}

#[test]
fn stopping_does_not_wait_for_a_stalled_capture() {
    let config = test_config();
    let handle = LoopHandle::spawn(move || {
        let source = StallingSource {
            delays: VecDeque::from(vec![Duration::from_secs(3); 4]),
            inner: StillImageSource::blank(&config.video),
        };
        Ok(FrameLoop::new(
            &config,
            Box::new(source),
            Box::new(ReplayDetector::new(vec![vec![hand(158.0)]])),
            Box::new(MeasurementRenderer::new(config.calibration)),
        ))
    })
    .unwrap();

    let observer = handle.observer();
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while observer.stats.borrow().frames_skipped == 0 {
        assert!(std::time::Instant::now() < deadline, "stalled capture never timed out");
        std::thread::sleep(Duration::from_millis(5));
    }

    let started = std::time::Instant::now();
    handle.stop();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(*observer.state.borrow(), LoopState::Stopped);
}
