use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, VoiceError};

/// Default WebSocket endpoint of the live conversational service.
pub const DEFAULT_LIVE_URL: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default model and voice requested when opening a session.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";
pub const DEFAULT_VOICE: &str = "Zephyr";

/// Fixed configuration used to open a live session: model id, audio-only
/// response modality, voice id, and transcription for both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    pub url: String,
    pub model: String,
    pub voice: String,
    #[serde(default = "enabled")]
    pub input_transcription: bool,
    #[serde(default = "enabled")]
    pub output_transcription: bool,
}

fn enabled() -> bool {
    true
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LIVE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            input_transcription: true,
            output_transcription: true,
        }
    }
}

/// An encoded audio frame ready for the wire: opaque PCM16 bytes plus the
/// declared format. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// One message received from the live service, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Transcription of the user's speech (cumulative per turn).
    InputTranscript { text: String, is_final: bool },
    /// Transcription of the assistant's speech (incremental deltas).
    OutputTranscript { text: String, is_final: bool },
    /// Synthesized speech, PCM16 at 24kHz.
    AudioChunk(Vec<u8>),
    /// The service reported an abnormal session failure.
    SessionError(String),
    /// The service ended the session. Always the last message.
    SessionClosed,
}

/// Setup message sent immediately after the socket opens.
pub fn setup_message(config: &LiveConfig) -> serde_json::Value {
    let mut setup = json!({
        "model": config.model,
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": config.voice }
                }
            }
        },
    });

    if config.input_transcription {
        setup["inputAudioTranscription"] = json!({});
    }
    if config.output_transcription {
        setup["outputAudioTranscription"] = json!({});
    }

    json!({ "setup": setup })
}

/// Outbound realtime audio message wrapping one encoded frame.
pub fn realtime_input_message(chunk: &EncodedChunk) -> serde_json::Value {
    json!({
        "realtimeInput": {
            "media": {
                "data": base64::engine::general_purpose::STANDARD.encode(&chunk.data),
                "mimeType": chunk.mime_type,
            }
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    input_transcription: Option<Transcription>,
    output_transcription: Option<Transcription>,
    model_turn: Option<ModelTurn>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Transcription {
    #[serde(default)]
    text: String,
    #[serde(default)]
    is_final: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    data: String,
}

/// Parse one server JSON message into inbound messages.
///
/// A single wire message normally populates one variant, but transcription
/// and audio may legally coexist; they are yielded in a fixed order so the
/// dispatcher still sees a deterministic sequence.
pub fn parse_server_message(text: &str) -> Result<Vec<InboundMessage>> {
    let message: ServerMessage = serde_json::from_str(text)
        .map_err(|e| VoiceError::Session(format!("malformed server message: {e}")))?;

    let mut out = Vec::new();
    let Some(content) = message.server_content else {
        return Ok(out);
    };

    if let Some(t) = content.input_transcription {
        out.push(InboundMessage::InputTranscript {
            text: t.text,
            is_final: t.is_final,
        });
    }
    if let Some(t) = content.output_transcription {
        out.push(InboundMessage::OutputTranscript {
            text: t.text,
            is_final: t.is_final,
        });
    }
    if let Some(turn) = content.model_turn {
        for part in turn.parts {
            if let Some(inline) = part.inline_data {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(inline.data.as_bytes())
                    .map_err(|e| {
                        VoiceError::Decode(format!("invalid base64 audio payload: {e}"))
                    })?;
                out.push(InboundMessage::AudioChunk(bytes));
            }
        }
    }

    Ok(out)
}
