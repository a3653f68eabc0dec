// Shared test doubles for the voice session pipeline: a manually advanced
// clock, a playback sink that records scheduled items, and a transport
// connector backed by in-memory channels.
//
// Not every test file uses every helper.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use voice_session::audio::{
    CaptureProbe, Clock, MockCaptureDevice, PlaybackEvent, PlaybackItem, PlaybackSink,
};
use voice_session::error::{Result, VoiceError};
use voice_session::transport::{
    Connector, InboundMessage, LiveConfig, OutboundCommand, TransportSession,
};
use voice_session::{SessionController, SessionState};

/// Clock that only moves when the test says so.
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Duration::ZERO),
        }
    }

    pub fn set_ms(&self, ms: u64) {
        *self.now.lock().unwrap() = Duration::from_millis(ms);
    }

    pub fn advance_ms(&self, ms: u64) {
        *self.now.lock().unwrap() += Duration::from_millis(ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }
}

/// Playback sink that records every scheduled item instead of playing it.
pub struct RecordingSink {
    scheduled: Arc<Mutex<Vec<PlaybackItem>>>,
    stop_all_count: Arc<AtomicUsize>,
    start_count: Arc<AtomicUsize>,
    stop_count: Arc<AtomicUsize>,
    events: Arc<Mutex<Option<mpsc::Sender<PlaybackEvent>>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            scheduled: Arc::new(Mutex::new(Vec::new())),
            stop_all_count: Arc::new(AtomicUsize::new(0)),
            start_count: Arc::new(AtomicUsize::new(0)),
            stop_count: Arc::new(AtomicUsize::new(0)),
            events: Arc::new(Mutex::new(None)),
        }
    }

    pub fn probe(&self) -> SinkProbe {
        SinkProbe {
            scheduled: Arc::clone(&self.scheduled),
            stop_all_count: Arc::clone(&self.stop_all_count),
            events: Arc::clone(&self.events),
        }
    }
}

#[async_trait::async_trait]
impl PlaybackSink for RecordingSink {
    async fn start(&mut self) -> Result<mpsc::Receiver<PlaybackEvent>> {
        let (tx, rx) = mpsc::channel(64);
        *self.events.lock().unwrap() = Some(tx);
        self.start_count.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    fn schedule(&mut self, item: &PlaybackItem) -> Result<()> {
        self.scheduled.lock().unwrap().push(item.clone());
        Ok(())
    }

    fn stop_all(&mut self) {
        self.stop_all_count.fetch_add(1, Ordering::SeqCst);
    }

    async fn stop(&mut self) -> Result<()> {
        *self.events.lock().unwrap() = None;
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording-sink"
    }
}

/// External handle onto a [`RecordingSink`] after it moved into a scheduler.
#[derive(Clone)]
pub struct SinkProbe {
    scheduled: Arc<Mutex<Vec<PlaybackItem>>>,
    stop_all_count: Arc<AtomicUsize>,
    events: Arc<Mutex<Option<mpsc::Sender<PlaybackEvent>>>>,
}

impl SinkProbe {
    pub fn scheduled(&self) -> Vec<PlaybackItem> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn scheduled_len(&self) -> usize {
        self.scheduled.lock().unwrap().len()
    }

    pub fn stop_all_count(&self) -> usize {
        self.stop_all_count.load(Ordering::SeqCst)
    }

    /// Report natural completion of a scheduled item.
    pub async fn finish(&self, item_id: u64) {
        let sender = self.events.lock().unwrap().clone();
        if let Some(tx) = sender {
            tx.send(PlaybackEvent::Finished { item_id })
                .await
                .expect("playback event consumer gone");
        }
    }
}

/// Transport handed to the test when a mock connection opens: the
/// receiving end of outbound commands and the sending end of inbound
/// messages.
pub struct MockTransport {
    pub outbound: mpsc::Receiver<OutboundCommand>,
    pub inbound: mpsc::Sender<InboundMessage>,
}

impl MockTransport {
    /// Next outbound command, or panic after a short wait.
    pub async fn next_outbound(&mut self) -> OutboundCommand {
        tokio::time::timeout(Duration::from_secs(2), self.outbound.recv())
            .await
            .expect("timed out waiting for outbound command")
            .expect("outbound channel closed")
    }
}

/// Connector producing channel-backed transport sessions.
pub struct MockConnector {
    fail: bool,
    open_count: AtomicUsize,
    slot: Mutex<Option<MockTransport>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            fail: false,
            open_count: AtomicUsize::new(0),
            slot: Mutex::new(None),
        }
    }

    /// A connector whose `open` always fails.
    pub fn refusing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    /// The transport created by the most recent successful `open`.
    pub fn take_transport(&self) -> MockTransport {
        self.slot
            .lock()
            .unwrap()
            .take()
            .expect("no transport was opened")
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    async fn open(&self, _config: &LiveConfig) -> Result<TransportSession> {
        self.open_count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VoiceError::Connect("connection refused".to_string()));
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        *self.slot.lock().unwrap() = Some(MockTransport {
            outbound: outbound_rx,
            inbound: inbound_tx,
        });

        Ok(TransportSession::from_parts(outbound_tx, inbound_rx))
    }
}

/// A controller wired to mocks, plus every probe a test needs.
pub struct Harness {
    pub controller: SessionController,
    pub connector: Arc<MockConnector>,
    pub capture: CaptureProbe,
    pub sink: SinkProbe,
    pub clock: Arc<ManualClock>,
}

pub fn harness() -> Harness {
    harness_with(MockCaptureDevice::new(), MockConnector::new())
}

pub fn harness_with(device: MockCaptureDevice, connector: MockConnector) -> Harness {
    let capture = device.probe();
    let sink = RecordingSink::new();
    let sink_probe = sink.probe();
    let clock = Arc::new(ManualClock::new());
    let connector = Arc::new(connector);

    let controller = SessionController::new(
        LiveConfig::default(),
        connector.clone(),
        Box::new(device),
        Box::new(sink),
        clock.clone(),
    );

    Harness {
        controller,
        connector,
        capture,
        sink: sink_probe,
        clock,
    }
}

/// Poll until the controller reaches `expected`, or panic after 2 seconds.
pub async fn wait_for_state(controller: &SessionController, expected: SessionState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if controller.status().await == expected {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "timed out waiting for state {:?}, still {:?}",
                expected,
                controller.status().await
            );
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
