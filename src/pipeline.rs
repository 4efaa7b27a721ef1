// src/pipeline.rs - Frame loop: capture -> detect -> filter -> render, one frame in flight
use crate::config::AppConfig;
use crate::detector::{DetectOptions, HandDetector};
use crate::error::{Error, Result};
use crate::landmark::LandmarkFilter;
use crate::overlay::Overlay;
use crate::render::FrameRenderer;
use crate::video::FrameSource;
use image::DynamicImage;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const STATS_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Capturing,
    Measuring,
    Rendering,
    Stopped,
}

/// Everything produced by one frame cycle.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub index: u64,
    /// Frame as it should be displayed (mirrored when the detector was asked to flip).
    pub frame: DynamicImage,
    pub overlay: Overlay,
    pub hands_detected: usize,
    /// A hand was found and the render callback completed its measurement.
    pub measured: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStats {
    pub frames_processed: u64,
    pub frames_measured: u64,
    pub frames_skipped: u64,
    pub avg_cycle_ms: f32,
    pub fps: f32,
}

#[derive(Debug, Clone)]
pub struct LoopObserver {
    pub frames: watch::Receiver<Option<Arc<FrameOutput>>>,
    pub state: watch::Receiver<LoopState>,
    pub stats: watch::Receiver<LoopStats>,
}

/// Stops a running frame loop.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

pub fn cancel_pair() -> (CancelHandle, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, rx)
}

struct CycleTimer {
    started: Instant,
    cycle_times: VecDeque<f32>,
    tick_times: VecDeque<Instant>,
}

impl CycleTimer {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            cycle_times: VecDeque::with_capacity(STATS_WINDOW),
            tick_times: VecDeque::with_capacity(STATS_WINDOW),
        }
    }

    fn start(&mut self) {
        self.started = Instant::now();
    }

    fn finish(&mut self, stats: &mut LoopStats) {
        let now = Instant::now();
        self.cycle_times.push_front((now - self.started).as_secs_f32() * 1000.0);
        self.cycle_times.truncate(STATS_WINDOW);
        self.tick_times.push_front(now);
        self.tick_times.truncate(STATS_WINDOW);

        stats.avg_cycle_ms = self.cycle_times.iter().sum::<f32>() / self.cycle_times.len() as f32;
        if let (Some(newest), Some(oldest)) = (self.tick_times.front(), self.tick_times.back()) {
            let span = (*newest - *oldest).as_secs_f32();
            if span > 0.0 {
                stats.fps = (self.tick_times.len() - 1) as f32 / span;
            }
        }
    }
}

type CaptureOutcome = (Box<dyn FrameSource>, Result<DynamicImage>);

/// Owns the frame source between captures. Each capture runs on the blocking pool;
/// a capture that outlives its timeout stays pending and is awaited again next cycle
/// instead of starting a second one.
enum CaptureSlot {
    Ready(Box<dyn FrameSource>),
    Pending(JoinHandle<CaptureOutcome>),
    Lost,
}

impl CaptureSlot {
    async fn next_frame(&mut self, timeout: Duration) -> Result<DynamicImage> {
        let mut task = match std::mem::replace(self, CaptureSlot::Lost) {
            CaptureSlot::Ready(mut source) => tokio::task::spawn_blocking(move || {
                let frame = source.capture();
                (source, frame)
            }),
            CaptureSlot::Pending(task) => task,
            CaptureSlot::Lost => {
                return Err(Error::DeviceUnavailable("frame source lost after a failed capture".to_string()));
            }
        };

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok((source, frame))) => {
                *self = CaptureSlot::Ready(source);
                frame
            }
            Ok(Err(e)) => Err(Error::DeviceUnavailable(format!("capture task failed: {}", e))),
            Err(_) => {
                *self = CaptureSlot::Pending(task);
                Err(Error::CaptureTimeout(timeout))
            }
        }
    }
}

pub struct FrameLoop {
    capture: CaptureSlot,
    detector: Box<dyn HandDetector>,
    renderer: Box<dyn FrameRenderer>,
    filter: LandmarkFilter,
    overlay: Overlay,
    options: DetectOptions,
    frame_interval: Duration,
    capture_timeout: Duration,
    detect_timeout: Duration,
    frame_index: u64,
    stats: LoopStats,
    timer: CycleTimer,
    frames_tx: watch::Sender<Option<Arc<FrameOutput>>>,
    state_tx: watch::Sender<LoopState>,
    stats_tx: watch::Sender<LoopStats>,
    observer: LoopObserver,
}

impl FrameLoop {
    pub fn new(
        config: &AppConfig,
        source: Box<dyn FrameSource>,
        detector: Box<dyn HandDetector>,
        renderer: Box<dyn FrameRenderer>,
    ) -> Self {
        let (frames_tx, frames) = watch::channel(None);
        let (state_tx, state) = watch::channel(LoopState::Idle);
        let (stats_tx, stats) = watch::channel(LoopStats::default());

        Self {
            capture: CaptureSlot::Ready(source),
            detector,
            renderer,
            filter: LandmarkFilter::new(config.landmarks.used.iter().cloned()),
            overlay: Overlay::default(),
            options: DetectOptions {
                flip_horizontal: config.video.flip_horizontal,
            },
            frame_interval: config.video.frame_interval(),
            capture_timeout: config.video.capture_timeout(),
            detect_timeout: config.detector.timeout(),
            frame_index: 0,
            stats: LoopStats::default(),
            timer: CycleTimer::new(),
            frames_tx,
            state_tx,
            stats_tx,
            observer: LoopObserver { frames, state, stats },
        }
    }

    pub fn observer(&self) -> LoopObserver {
        self.observer.clone()
    }

    fn set_state(&self, state: LoopState) {
        self.state_tx.send_replace(state);
    }

    /// Run cycles at the configured rate until `shutdown` turns true or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.set_state(LoopState::Running);
        tracing::info!("Frame loop started ({:?} per frame)", self.frame_interval);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            self.timer.start();
            let outcome = tokio::select! {
                outcome = self.cycle() => outcome,
                _ = shutdown.changed() => break,
            };
            self.record(outcome);
            self.set_state(LoopState::Running);
        }

        self.set_state(LoopState::Stopped);
        tracing::info!(
            "Frame loop stopped after {} frames ({} measured, {} skipped)",
            self.stats.frames_processed,
            self.stats.frames_measured,
            self.stats.frames_skipped
        );
    }

    async fn cycle(&mut self) -> Result<FrameOutput> {
        self.overlay.clear();

        self.set_state(LoopState::Capturing);
        let frame = self.capture.next_frame(self.capture_timeout).await?;

        self.set_state(LoopState::Measuring);
        let hands = tokio::time::timeout(self.detect_timeout, self.detector.detect(&frame, self.options))
            .await
            .map_err(|_| Error::DetectionTimeout(self.detect_timeout))??;

        self.set_state(LoopState::Rendering);
        let mut measured = false;

        // Only the first hand is measured
        if let Some(hand) = hands.first() {
            let landmarks = self.filter.apply(&hand.keypoints);
            match self.renderer.render(&mut self.overlay, &landmarks) {
                Ok(()) => measured = true,
                Err(Error::MissingLandmark(name)) => {
                    tracing::debug!("Frame {}: landmark '{}' missing, skipping measurement", self.frame_index, name);
                }
                Err(e) => return Err(e),
            }
        }

        let frame = if self.options.flip_horizontal {
            DynamicImage::ImageRgb8(image::imageops::flip_horizontal(&frame.to_rgb8()))
        } else {
            frame
        };

        Ok(FrameOutput {
            index: self.frame_index,
            frame,
            overlay: self.overlay.clone(),
            hands_detected: hands.len(),
            measured,
        })
    }

    fn record(&mut self, outcome: Result<FrameOutput>) {
        match outcome {
            Ok(output) => {
                self.stats.frames_processed += 1;
                if output.measured {
                    self.stats.frames_measured += 1;
                } else if output.hands_detected > 0 {
                    self.stats.frames_skipped += 1;
                }
                self.frames_tx.send_replace(Some(Arc::new(output)));
            }
            Err(e) => {
                self.stats.frames_skipped += 1;
                if e.is_recoverable() {
                    tracing::warn!("Frame {} skipped: {}", self.frame_index, e);
                } else {
                    tracing::error!("Frame {} failed: {}", self.frame_index, e);
                }
            }
        }

        self.frame_index += 1;
        self.timer.finish(&mut self.stats);
        self.stats_tx.send_replace(self.stats);
    }
}

/// A frame loop running on its own thread with a current-thread runtime.
pub struct LoopHandle {
    cancel: CancelHandle,
    observer: LoopObserver,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl LoopHandle {
    /// Build the loop on a new thread and start it.
    ///
    /// `build` runs inside the loop's runtime, so it may open devices and spawn processes
    /// that are tied to that thread. Its error is returned here and nothing keeps running.
    pub fn spawn<F>(build: F) -> Result<Self>
    where
        F: FnOnce() -> Result<FrameLoop> + Send + 'static,
    {
        let (cancel, shutdown) = cancel_pair();
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<LoopObserver>>(1);

        let thread = std::thread::Builder::new()
            .name("frame-loop".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(Error::Io(e)));
                        return;
                    }
                };

                let frame_loop = {
                    let _guard = runtime.enter();
                    match build() {
                        Ok(frame_loop) => frame_loop,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    }
                };

                if ready_tx.send(Ok(frame_loop.observer())).is_err() {
                    return;
                }
                runtime.block_on(frame_loop.run(shutdown));
                // A capture stuck in the device must not hold up the join
                runtime.shutdown_background();
            })?;

        match ready_rx.recv() {
            Ok(Ok(observer)) => Ok(Self {
                cancel,
                observer,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "frame loop thread exited during startup",
                )))
            }
        }
    }

    pub fn observer(&self) -> LoopObserver {
        self.observer.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait for the loop thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Frame loop thread panicked");
            }
        }
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
