// PCM16 conversion between float samples and the wire format.
//
// Capture frames are scaled to 16-bit signed little-endian at 16kHz;
// inbound synthesized audio is the inverse at 24kHz. No resampling or
// filtering happens anywhere in the pipeline.

use std::time::Duration;

use crate::audio::capture::AudioFrame;
use crate::error::{Result, VoiceError};
use crate::transport::EncodedChunk;

/// Output sample rate of synthesized audio from the service (mono PCM16).
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// Declared format of outbound audio frames.
pub const PCM16_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Encode a captured frame into the wire format.
///
/// Float samples in [-1, 1] are scaled by 32768, rounded and clamped to the
/// i16 range, then packed little-endian.
pub fn encode_frame(frame: &AudioFrame) -> EncodedChunk {
    let mut data = Vec::with_capacity(frame.samples.len() * 2);
    for &sample in &frame.samples {
        let scaled = (sample * 32768.0).round();
        let value = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        data.extend_from_slice(&value.to_le_bytes());
    }

    EncodedChunk {
        data,
        mime_type: PCM16_MIME_TYPE.to_string(),
    }
}

/// Decode an inbound synthesized-audio payload into playable samples.
///
/// Bytes are reinterpreted as 16-bit signed little-endian samples and
/// rescaled to floats by dividing by 32768.
pub fn decode_chunk(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 2 != 0 {
        return Err(VoiceError::Decode(format!(
            "payload length {} is not a whole number of PCM16 samples",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

/// Playback duration of a decoded buffer at the output sample rate.
pub fn playback_duration(sample_count: usize) -> Duration {
    Duration::from_secs_f64(sample_count as f64 / PLAYBACK_SAMPLE_RATE as f64)
}
