use std::collections::HashMap;
use std::time::{Duration, Instant};

use std::sync::Arc;
use tokio::sync::mpsc;

use super::codec::playback_duration;
use crate::error::Result;

/// Monotonic time source for playback scheduling.
///
/// Injected so the watermark algorithm is testable without real audio
/// hardware; production code uses [`MonotonicClock`].
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Clock backed by `std::time::Instant`, anchored at creation.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A decoded buffer scheduled for playback at an absolute clock time.
#[derive(Debug, Clone)]
pub struct PlaybackItem {
    pub id: u64,
    pub samples: Vec<f32>,
    pub start: Duration,
    pub duration: Duration,
}

/// Event emitted by a playback sink when an item completes naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Finished { item_id: u64 },
}

/// Output audio device trait
///
/// The platform playback API is an external collaborator behind this seam.
/// It must support device-level scheduled starts (play this buffer at time
/// T), not just "play immediately".
#[async_trait::async_trait]
pub trait PlaybackSink: Send + Sync {
    /// Acquire the output device.
    ///
    /// Returns a channel receiver that reports natural completion of
    /// scheduled items.
    async fn start(&mut self) -> Result<mpsc::Receiver<PlaybackEvent>>;

    /// Schedule an item to begin playing at `item.start` on the clock the
    /// scheduler was built with.
    fn schedule(&mut self, item: &PlaybackItem) -> Result<()>;

    /// Force-stop everything currently scheduled or playing. Stopped items
    /// do not report completion.
    fn stop_all(&mut self);

    /// Release the output device
    async fn stop(&mut self) -> Result<()>;

    fn name(&self) -> &str;
}

/// Schedules decoded buffers back-to-back with no gap and no overlap.
///
/// Maintains the `next_start_time` watermark: each buffer starts at
/// `max(watermark, now)` and advances the watermark by its duration. When
/// the network delivers faster than real time the buffers queue up
/// seamlessly; at real-time cadence they start exactly on arrival.
pub struct PlaybackScheduler {
    clock: Arc<dyn Clock>,
    sink: Box<dyn PlaybackSink>,
    next_start_time: Duration,
    next_item_id: u64,
    active: HashMap<u64, PlaybackItem>,
}

impl PlaybackScheduler {
    pub fn new(clock: Arc<dyn Clock>, sink: Box<dyn PlaybackSink>) -> Self {
        Self {
            clock,
            sink,
            next_start_time: Duration::ZERO,
            next_item_id: 0,
            active: HashMap::new(),
        }
    }

    /// Acquire the output device and get its completion event stream.
    pub async fn start(&mut self) -> Result<mpsc::Receiver<PlaybackEvent>> {
        self.sink.start().await
    }

    /// Schedule a decoded buffer; returns its computed start time.
    pub fn enqueue(&mut self, samples: Vec<f32>) -> Result<Duration> {
        let now = self.clock.now();
        let duration = playback_duration(samples.len());
        let start = self.next_start_time.max(now);

        let id = self.next_item_id;
        self.next_item_id += 1;

        let item = PlaybackItem {
            id,
            samples,
            start,
            duration,
        };
        self.sink.schedule(&item)?;

        self.next_start_time = start + duration;
        self.active.insert(id, item);

        Ok(start)
    }

    /// Record natural completion of an item.
    ///
    /// Returns true when this completion drained the active-set, which is
    /// the Speaking -> Listening signal for the controller.
    pub fn mark_finished(&mut self, item_id: u64) -> bool {
        if self.active.remove(&item_id).is_some() {
            self.active.is_empty()
        } else {
            false
        }
    }

    /// Force-stop every active item, clear the active-set and reset the
    /// watermark to zero.
    pub fn stop_all(&mut self) {
        self.sink.stop_all();
        self.active.clear();
        self.next_start_time = Duration::ZERO;
    }

    /// Release the output device
    pub async fn stop(&mut self) -> Result<()> {
        self.sink.stop().await
    }

    pub fn next_start_time(&self) -> Duration {
        self.next_start_time
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
