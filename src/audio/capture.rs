use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::error::{Result, VoiceError};

/// Capture sample rate expected by the wire format (mono PCM16).
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Default number of samples per captured frame (256ms at 16kHz).
pub const DEFAULT_FRAME_SAMPLES: usize = 4096;

/// One captured microphone frame: mono float samples in [-1, 1] at the
/// capture sample rate, tagged with a capture-order sequence index.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub seq: u64,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, seq: u64) -> Self {
        Self {
            samples,
            sample_rate: CAPTURE_SAMPLE_RATE,
            seq,
        }
    }
}

/// Microphone capture backend trait
///
/// The platform capture API is an external collaborator behind this seam.
/// A started device delivers a lazy, lossless sequence of frames for as
/// long as it stays open; a stopped device is not restartable mid-session
/// (a new session start opens it again).
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire the microphone and start capturing.
    ///
    /// Returns a channel receiver that will receive audio frames in capture
    /// order. Fails with `DeviceUnavailable` if the microphone is denied or
    /// absent.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Release the microphone. No further frames are produced afterwards.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the device is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// Capture device for tests and offline runs.
///
/// Frames are injected externally through a [`CaptureProbe`] instead of
/// coming from real hardware; the probe also exposes start/stop counters so
/// resource-release behavior can be asserted.
pub struct MockCaptureDevice {
    name: String,
    fail_start: bool,
    capturing: bool,
    injector: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl MockCaptureDevice {
    pub fn new() -> Self {
        Self {
            name: "mock-capture".to_string(),
            fail_start: false,
            capturing: false,
            injector: Arc::new(Mutex::new(None)),
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A device whose `start` always fails with `DeviceUnavailable`.
    pub fn unavailable() -> Self {
        Self {
            fail_start: true,
            ..Self::new()
        }
    }

    /// Handle for injecting frames and observing device usage after the
    /// device itself has been handed to a controller.
    pub fn probe(&self) -> CaptureProbe {
        CaptureProbe {
            injector: Arc::clone(&self.injector),
            starts: Arc::clone(&self.starts),
            stops: Arc::clone(&self.stops),
        }
    }
}

impl Default for MockCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureDevice for MockCaptureDevice {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.fail_start {
            return Err(VoiceError::DeviceUnavailable(
                "permission denied".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        *self.injector.lock().expect("injector lock") = Some(tx);
        self.capturing = true;
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        // Dropping the sender ends the frame stream on the consumer side.
        *self.injector.lock().expect("injector lock") = None;
        self.capturing = false;
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// External handle onto a [`MockCaptureDevice`].
#[derive(Clone)]
pub struct CaptureProbe {
    injector: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl CaptureProbe {
    /// Sender for injecting frames, if the device is currently capturing.
    pub fn frame_sender(&self) -> Option<mpsc::Sender<AudioFrame>> {
        self.injector.lock().expect("injector lock").clone()
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}
