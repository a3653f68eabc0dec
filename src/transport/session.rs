use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::warn;

use super::messages::{EncodedChunk, InboundMessage};
use crate::error::{Result, VoiceError};

/// How long `close` waits for the transport to acknowledge the close
/// command before abandoning it, so session teardown always terminates.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Command consumed by a transport's write loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    /// Send one encoded audio frame. Submission order is preserved.
    Frame(EncodedChunk),
    /// Close the connection gracefully. No frames follow.
    Close,
}

/// An open bidirectional session with the conversational service.
///
/// The concrete transport lives behind two channels: outbound commands feed
/// its write loop, inbound messages arrive from its read loop. The inbound
/// stream is single-consumer and ends with `SessionClosed` or
/// `SessionError`; once ended no further items are produced.
pub struct TransportSession {
    outbound: Option<mpsc::Sender<OutboundCommand>>,
    inbound: Option<mpsc::Receiver<InboundMessage>>,
}

impl TransportSession {
    /// Assemble a session from its channel halves.
    ///
    /// Used by the WebSocket connector and by tests standing up a fake
    /// transport.
    pub fn from_parts(
        outbound: mpsc::Sender<OutboundCommand>,
        inbound: mpsc::Receiver<InboundMessage>,
    ) -> Self {
        Self {
            outbound: Some(outbound),
            inbound: Some(inbound),
        }
    }

    /// Offer one encoded frame to the transport.
    ///
    /// Fire-and-forget for the caller: order is preserved, and a failure
    /// here is non-fatal (a persistently failing transport surfaces as a
    /// terminal inbound message instead).
    pub async fn send(&self, chunk: EncodedChunk) -> Result<()> {
        let Some(outbound) = &self.outbound else {
            return Err(VoiceError::Closed);
        };

        outbound
            .send(OutboundCommand::Frame(chunk))
            .await
            .map_err(|_| VoiceError::Send("transport write loop is gone".to_string()))
    }

    /// Cloneable sender for the capture send loop.
    pub fn frame_sender(&self) -> Result<FrameSender> {
        let outbound = self.outbound.clone().ok_or(VoiceError::Closed)?;
        Ok(FrameSender { outbound })
    }

    /// Take the inbound message stream. Yields `Some` exactly once.
    pub fn take_inbound(&mut self) -> Option<mpsc::Receiver<InboundMessage>> {
        self.inbound.take()
    }

    /// Close the session. Idempotent and best-effort: waits at most
    /// [`CLOSE_TIMEOUT`] for the write loop to accept the close command,
    /// then releases this side's resources regardless.
    pub async fn close(&mut self) {
        let Some(outbound) = self.outbound.take() else {
            return;
        };

        match timeout(CLOSE_TIMEOUT, outbound.send(OutboundCommand::Close)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => warn!("transport write loop already gone during close"),
            Err(_) => warn!("transport close timed out; abandoning connection"),
        }
        // Dropping the sender lets the write loop shut the socket down.
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_none()
    }
}

/// Order-preserving handle for submitting frames from the capture loop.
#[derive(Clone)]
pub struct FrameSender {
    outbound: mpsc::Sender<OutboundCommand>,
}

impl FrameSender {
    pub async fn send(&self, chunk: EncodedChunk) -> Result<()> {
        self.outbound
            .send(OutboundCommand::Frame(chunk))
            .await
            .map_err(|_| VoiceError::Send("transport write loop is gone".to_string()))
    }
}
