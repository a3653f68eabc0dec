use thiserror::Error;

/// Errors produced by the voice session pipeline.
///
/// Device- and connection-level failures are fatal to `start()` and surface
/// through the controller as a state change; everything else is recovered
/// locally (logged, buffer dropped, capture continues).
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Microphone permission denied or no capture device present.
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(String),

    /// Opening the live transport session failed (network or auth).
    #[error("failed to open live session: {0}")]
    Connect(String),

    /// A single outbound audio frame could not be sent. Non-fatal; a
    /// persistently failing transport surfaces through the inbound stream.
    #[error("failed to send audio frame: {0}")]
    Send(String),

    /// The remote service reported a session-level error.
    #[error("live session error: {0}")]
    Session(String),

    /// An inbound audio payload could not be decoded. The affected buffer
    /// is dropped; the session continues.
    #[error("failed to decode audio payload: {0}")]
    Decode(String),

    /// The transport session has already been closed.
    #[error("session already closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, VoiceError>;
