use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::state::SessionState;
use super::transcript::{Speaker, TranscriptAssembler, TranscriptEntry};
use crate::audio::{
    decode_chunk, encode_frame, AudioFrame, CaptureDevice, Clock, PlaybackEvent,
    PlaybackScheduler, PlaybackSink,
};
use crate::error::{Result, VoiceError};
use crate::transport::{Connector, FrameSender, InboundMessage, LiveConfig, TransportSession};

/// Everything owned by one running session. Present only between a
/// successful `start` and the next teardown; every exit path drops it in
/// full.
struct ActiveSession {
    session_id: String,
    transport: TransportSession,
    send_task: JoinHandle<()>,
    dispatch_task: JoinHandle<()>,
}

/// Terminal outcome of the inbound dispatcher.
enum Outcome {
    Closed,
    Failed(String),
}

/// Top-level state machine of the voice assistant session.
///
/// Owns capture, transport, playback scheduling and transcript assembly,
/// orchestrates startup/shutdown, and exposes status plus a transcript
/// snapshot to the UI layer. All inbound messages are handled by a single
/// dispatcher task, so transcript merges and playback scheduling never race
/// with each other.
#[derive(Clone)]
pub struct SessionController {
    live: LiveConfig,
    connector: Arc<dyn Connector>,
    capture: Arc<Mutex<Box<dyn CaptureDevice>>>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    state: Arc<Mutex<SessionState>>,
    last_error: Arc<Mutex<Option<String>>>,
    transcript: Arc<Mutex<TranscriptAssembler>>,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

impl SessionController {
    pub fn new(
        live: LiveConfig,
        connector: Arc<dyn Connector>,
        capture: Box<dyn CaptureDevice>,
        sink: Box<dyn PlaybackSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            live,
            connector,
            capture: Arc::new(Mutex::new(capture)),
            scheduler: Arc::new(Mutex::new(PlaybackScheduler::new(clock, sink))),
            state: Arc::new(Mutex::new(SessionState::Idle)),
            last_error: Arc::new(Mutex::new(None)),
            transcript: Arc::new(Mutex::new(TranscriptAssembler::new())),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Current session state (copy-out snapshot).
    pub async fn status(&self) -> SessionState {
        *self.state.lock().await
    }

    /// Human-readable cause of the last failure, if the state is `Error`.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Ordered read-only transcript snapshot for the UI.
    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().await.snapshot()
    }

    /// UI toggle: start when idle or errored, stop otherwise.
    pub async fn toggle(&self) -> Result<()> {
        match self.status().await {
            SessionState::Idle | SessionState::Error => self.start().await,
            _ => {
                self.stop().await;
                Ok(())
            }
        }
    }

    /// Start a voice session: acquire the microphone, open the transport,
    /// then run the capture->encode->send loop and the inbound dispatcher.
    ///
    /// Safe to call while already active (logged no-op, no second device
    /// handle or transport). On failure the state becomes `Error` and
    /// everything acquired so far is released.
    pub async fn start(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            warn!("Voice session already active; ignoring start");
            return Ok(());
        }

        let session_id = format!("voice-{}", Uuid::new_v4());
        info!("Starting voice session: {}", session_id);

        self.transcript.lock().await.clear();
        *self.last_error.lock().await = None;
        self.set_state(SessionState::Connecting).await;

        // Microphone first; nothing else needs unwinding if it is denied.
        let frames = {
            let mut capture = self.capture.lock().await;
            match capture.start().await {
                Ok(rx) => rx,
                Err(e) => {
                    self.fail(&e).await;
                    return Err(e);
                }
            }
        };

        let mut transport = match self.connector.open(&self.live).await {
            Ok(t) => t,
            Err(e) => {
                self.release_capture().await;
                self.fail(&e).await;
                return Err(e);
            }
        };

        let Some(inbound) = transport.take_inbound() else {
            let e = VoiceError::Connect("inbound stream already consumed".to_string());
            self.release_capture().await;
            transport.close().await;
            self.fail(&e).await;
            return Err(e);
        };

        let playback_events = {
            let mut scheduler = self.scheduler.lock().await;
            scheduler.stop_all(); // fresh watermark for this session
            match scheduler.start().await {
                Ok(rx) => rx,
                Err(e) => {
                    self.release_capture().await;
                    transport.close().await;
                    self.fail(&e).await;
                    return Err(e);
                }
            }
        };

        let sender = match transport.frame_sender() {
            Ok(sender) => sender,
            Err(e) => {
                self.release_capture().await;
                transport.close().await;
                self.fail(&e).await;
                return Err(e);
            }
        };

        let send_task = tokio::spawn(run_send_loop(frames, sender));

        let controller = self.clone();
        let dispatch_task =
            tokio::spawn(async move { controller.run_dispatcher(inbound, playback_events).await });

        *active = Some(ActiveSession {
            session_id: session_id.clone(),
            transport,
            send_task,
            dispatch_task,
        });
        drop(active);

        self.set_state(SessionState::Listening).await;
        info!("Voice session started: {}", session_id);
        Ok(())
    }

    /// Stop the session and return to `Idle`.
    ///
    /// Idempotent and safe from any state, including before the first
    /// `start`. Always terminates capture, force-stops playback, resets the
    /// watermark, and closes the transport best-effort under a bounded
    /// timeout.
    pub async fn stop(&self) {
        self.shutdown(SessionState::Idle, None).await;
    }

    /// Single consumer of inbound messages and playback completions.
    async fn run_dispatcher(
        self,
        mut inbound: mpsc::Receiver<InboundMessage>,
        mut playback_events: mpsc::Receiver<PlaybackEvent>,
    ) {
        let mut playback_open = true;

        let outcome = loop {
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(message) => {
                        if let Some(outcome) = self.handle_inbound(message).await {
                            break outcome;
                        }
                    }
                    None => break Outcome::Closed,
                },
                event = playback_events.recv(), if playback_open => match event {
                    Some(PlaybackEvent::Finished { item_id }) => {
                        self.handle_playback_finished(item_id).await;
                    }
                    None => {
                        // Sink went away; keep serving inbound messages.
                        playback_open = false;
                    }
                },
            }
        };

        // Teardown runs in its own task: this task is itself part of the
        // active session and gets aborted during shutdown.
        match outcome {
            Outcome::Closed => {
                info!("Live session ended gracefully");
                let controller = self.clone();
                tokio::spawn(async move {
                    controller.shutdown(SessionState::Idle, None).await;
                });
            }
            Outcome::Failed(cause) => {
                error!("Live session failed: {}", cause);
                let controller = self.clone();
                tokio::spawn(async move {
                    controller.shutdown(SessionState::Error, Some(cause)).await;
                });
            }
        }
    }

    /// Handle one inbound message; returns a terminal outcome when the
    /// stream has ended.
    async fn handle_inbound(&self, message: InboundMessage) -> Option<Outcome> {
        match message {
            InboundMessage::InputTranscript { text, is_final } => {
                self.transcript
                    .lock()
                    .await
                    .apply(Speaker::User, &text, is_final);
                None
            }
            InboundMessage::OutputTranscript { text, is_final } => {
                self.set_state(SessionState::Speaking).await;
                self.transcript
                    .lock()
                    .await
                    .apply(Speaker::Assistant, &text, is_final);
                None
            }
            InboundMessage::AudioChunk(bytes) => {
                match decode_chunk(&bytes) {
                    Ok(samples) => {
                        let enqueued = self.scheduler.lock().await.enqueue(samples);
                        match enqueued {
                            Ok(start) => {
                                self.set_state(SessionState::Speaking).await;
                                debug!("Scheduled {} byte chunk at {:?}", bytes.len(), start);
                            }
                            Err(e) => warn!("Dropping unschedulable audio chunk: {}", e),
                        }
                    }
                    // Failure isolation: one bad buffer never aborts the session.
                    Err(e) => warn!("Dropping undecodable audio chunk: {}", e),
                }
                None
            }
            InboundMessage::SessionError(cause) => Some(Outcome::Failed(cause)),
            InboundMessage::SessionClosed => Some(Outcome::Closed),
        }
    }

    async fn handle_playback_finished(&self, item_id: u64) {
        let drained = self.scheduler.lock().await.mark_finished(item_id);
        if drained && self.status().await == SessionState::Speaking {
            self.set_state(SessionState::Listening).await;
        }
    }

    /// Tear everything down in guaranteed order and land in `final_state`.
    ///
    /// Order matters: stop capture so no further frames are produced, then
    /// force-stop playback and reset the watermark, then close the
    /// transport (bounded), then abort the session tasks.
    async fn shutdown(&self, final_state: SessionState, cause: Option<String>) {
        let taken = self.active.lock().await.take();

        if let Some(active) = &taken {
            info!("Stopping voice session: {}", active.session_id);
        }

        self.release_capture().await;

        {
            let mut scheduler = self.scheduler.lock().await;
            scheduler.stop_all();
            if let Err(e) = scheduler.stop().await {
                warn!("Failed to release playback device: {}", e);
            }
        }

        if let Some(mut active) = taken {
            active.send_task.abort();
            active.transport.close().await;
            active.dispatch_task.abort();
        }

        *self.last_error.lock().await = cause;
        self.set_state(final_state).await;
        debug!("Voice session torn down; state={}", final_state);
    }

    /// Stop the capture device, releasing the microphone.
    async fn release_capture(&self) {
        let mut capture = self.capture.lock().await;
        if capture.is_capturing() {
            if let Err(e) = capture.stop().await {
                warn!("Failed to stop capture device {}: {}", capture.name(), e);
            }
        }
    }

    async fn fail(&self, err: &VoiceError) {
        *self.last_error.lock().await = Some(err.to_string());
        self.set_state(SessionState::Error).await;
    }

    async fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().await;
        if *state != next {
            info!("Session state: {} -> {}", state, next);
            *state = next;
        }
    }
}

/// Capture -> encode -> send loop.
///
/// One task, one ordered channel: every frame captured while the device is
/// open is encoded and offered to the transport exactly once, in capture
/// order. Send failures are logged and capture continues; a persistently
/// failing transport surfaces through the inbound stream instead.
async fn run_send_loop(mut frames: mpsc::Receiver<AudioFrame>, sender: FrameSender) {
    debug!("Capture send loop started");

    while let Some(frame) = frames.recv().await {
        let chunk = encode_frame(&frame);
        if let Err(e) = sender.send(chunk).await {
            warn!("Failed to send audio frame {}: {}", frame.seq, e);
        }
    }

    debug!("Capture send loop stopped");
}
