pub mod audio;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;

pub use audio::{
    AudioFrame, CaptureDevice, CaptureProbe, Clock, MockCaptureDevice, MonotonicClock,
    PlaybackEvent, PlaybackItem, PlaybackScheduler, PlaybackSink,
};
pub use config::Config;
pub use error::VoiceError;
pub use session::{SessionController, SessionState, Speaker, TranscriptAssembler, TranscriptEntry};
pub use transport::{
    Connector, EncodedChunk, InboundMessage, LiveConfig, LiveConnector, TransportSession,
};
