//! Duplex transport to the remote conversational service
//!
//! The wire protocol is treated as an opaque bidirectional channel with a
//! documented message contract: a setup message opens the session, encoded
//! PCM frames flow out, transcription fragments and synthesized audio flow
//! back in, and the inbound stream always terminates with a closed or
//! error message.

pub mod live;
pub mod messages;
pub mod session;

pub use live::{Connector, LiveConnector, API_KEY_ENV};
pub use messages::{
    parse_server_message, realtime_input_message, setup_message, EncodedChunk, InboundMessage,
    LiveConfig, DEFAULT_LIVE_URL, DEFAULT_MODEL, DEFAULT_VOICE,
};
pub use session::{FrameSender, OutboundCommand, TransportSession, CLOSE_TIMEOUT};
