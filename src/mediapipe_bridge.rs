// src/mediapipe_bridge.rs - Hand detection through an external MediaPipe Hands process
//
// Protocol, one exchange per frame:
//   -> {"width":W,"height":H,"flip_horizontal":bool,"max_hands":N}\n  followed by W*H*3 RGB bytes
//   <- [{"keypoints":[{"name":"wrist","x":..,"y":..}, ...]}, ...]\n
use crate::config::DetectorConfig;
use crate::detector::{DetectOptions, HandDetector};
use crate::error::{Error, Result};
use crate::landmark::Hand;
use async_trait::async_trait;
use image::DynamicImage;
use serde::Serialize;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

#[derive(Debug, Serialize)]
struct FrameHeader {
    width: u32,
    height: u32,
    flip_horizontal: bool,
    max_hands: u32,
}

struct Bridge {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

pub struct ProcessDetector {
    config: DetectorConfig,
    bridge: Bridge,
    // Set while an exchange is in progress; still set on entry means the last one was cancelled
    in_flight: bool,
    line: String,
}

impl ProcessDetector {
    /// Start the configured landmark process. Must be called inside a tokio runtime.
    pub fn spawn(config: &DetectorConfig) -> Result<Self> {
        let bridge = Self::start(config)?;
        Ok(Self {
            config: config.clone(),
            bridge,
            in_flight: false,
            line: String::new(),
        })
    }

    fn start(config: &DetectorConfig) -> Result<Bridge> {
        let program = config
            .command
            .as_deref()
            .ok_or_else(|| Error::DetectorUnavailable("no detector command configured".to_string()))?;

        tracing::info!("Starting landmark process: {} {}", program, config.args.join(" "));

        let mut child = Command::new(program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::DetectorUnavailable(format!("Failed to start '{}': {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::DetectorUnavailable("landmark process has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::DetectorUnavailable("landmark process has no stdout".to_string()))?;

        Ok(Bridge {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    async fn restart(&mut self) -> Result<()> {
        tracing::warn!("Previous detection was interrupted, restarting landmark process");
        if let Err(e) = self.bridge.child.kill().await {
            tracing::debug!("Failed to kill landmark process: {}", e);
        }
        self.bridge = Self::start(&self.config)?;
        self.in_flight = false;
        Ok(())
    }

    async fn exchange(&mut self, frame: &DynamicImage, options: DetectOptions) -> Result<Vec<Hand>> {
        let rgb = frame.to_rgb8();
        let header = FrameHeader {
            width: rgb.width(),
            height: rgb.height(),
            flip_horizontal: options.flip_horizontal,
            max_hands: self.config.max_hands,
        };
        let mut header_line = serde_json::to_vec(&header)?;
        header_line.push(b'\n');

        let stdin = &mut self.bridge.stdin;
        stdin.write_all(&header_line).await.map_err(write_failed)?;
        stdin.write_all(rgb.as_raw()).await.map_err(write_failed)?;
        stdin.flush().await.map_err(write_failed)?;

        self.line.clear();
        let read = self
            .bridge
            .stdout
            .read_line(&mut self.line)
            .await
            .map_err(|e| Error::Detection(format!("Failed to read from landmark process: {}", e)))?;
        if read == 0 {
            return Err(Error::Detection("landmark process closed its output".to_string()));
        }

        serde_json::from_str(self.line.trim())
            .map_err(|e| Error::Detection(format!("Malformed landmark output: {}", e)))
    }
}

fn write_failed(e: std::io::Error) -> Error {
    Error::Detection(format!("Failed to send frame to landmark process: {}", e))
}

#[async_trait]
impl HandDetector for ProcessDetector {
    async fn detect(&mut self, frame: &DynamicImage, options: DetectOptions) -> Result<Vec<Hand>> {
        if self.in_flight {
            self.restart().await?;
        }

        self.in_flight = true;
        let hands = self.exchange(frame, options).await;
        self.in_flight = false;
        hands
    }
}
