// WebSocket transport to the live conversational service.
//
// The socket is split into independent read and write loops bridged to the
// controller through channels, so sending frames and receiving messages
// never block each other.

use futures::stream::StreamExt;
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::messages::{
    parse_server_message, realtime_input_message, setup_message, InboundMessage, LiveConfig,
};
use super::session::{OutboundCommand, TransportSession};
use crate::error::{Result, VoiceError};

/// Environment variable holding the connection credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const CHANNEL_CAPACITY: usize = 64;

/// Opens transport sessions against a conversational service.
///
/// The seam between the controller and the concrete wire protocol; tests
/// substitute a fake connector built on [`TransportSession::from_parts`].
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, config: &LiveConfig) -> Result<TransportSession>;
}

/// WebSocket connector for the live service.
pub struct LiveConnector {
    api_key: String,
}

impl LiveConnector {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Read the connection credential from the environment.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| VoiceError::Connect(format!("{API_KEY_ENV} is not set")))?;
        Ok(Self::new(api_key))
    }
}

#[async_trait::async_trait]
impl Connector for LiveConnector {
    async fn open(&self, config: &LiveConfig) -> Result<TransportSession> {
        let url = format!("{}?key={}", config.url, self.api_key);
        debug!("Connecting to live service at {}", config.url);

        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| VoiceError::Connect(format!("websocket connect failed: {e}")))?;

        let (mut write, read) = ws_stream.split();

        // The setup message must be the first thing on the wire.
        let setup = setup_message(config);
        write
            .send(Message::Text(setup.to_string().into()))
            .await
            .map_err(|e| VoiceError::Connect(format!("failed to send setup message: {e}")))?;

        info!(model = %config.model, voice = %config.voice, "Live session opened");

        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(write_loop(write, outbound_rx));
        tokio::spawn(read_loop(read, inbound_tx));

        Ok(TransportSession::from_parts(outbound_tx, inbound_rx))
    }
}

type WsSink = futures::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

async fn write_loop(mut write: WsSink, mut rx: mpsc::Receiver<OutboundCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            OutboundCommand::Frame(chunk) => {
                let payload = realtime_input_message(&chunk).to_string();
                if let Err(e) = write.send(Message::Text(payload.into())).await {
                    error!("Write error: {}", e);
                    break;
                }
            }
            OutboundCommand::Close => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }

    // Either the session was dropped or the socket failed; shut the sink
    // down so the server sees a clean close.
    let _ = write.close().await;
    debug!("Transport write loop stopped");
}

async fn read_loop(mut read: WsStream, tx: mpsc::Sender<InboundMessage>) {
    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => match parse_server_message(&text) {
                Ok(messages) => {
                    for message in messages {
                        if tx.send(message).await.is_err() {
                            debug!("Inbound consumer gone; stopping read loop");
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!("Skipping unparseable server message: {}", e);
                }
            },
            Some(Ok(Message::Close(_))) | None => {
                debug!("Live session closed by server");
                let _ = tx.send(InboundMessage::SessionClosed).await;
                return;
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(_)) => {}
            Some(Err(e)) => {
                error!("Read error: {}", e);
                let _ = tx.send(InboundMessage::SessionError(e.to_string())).await;
                return;
            }
        }
    }
}
