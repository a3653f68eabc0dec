pub mod capture;
pub mod codec;
pub mod playback;

pub use capture::{
    AudioFrame, CaptureDevice, CaptureProbe, MockCaptureDevice, CAPTURE_SAMPLE_RATE,
    DEFAULT_FRAME_SAMPLES,
};
pub use codec::{
    decode_chunk, encode_frame, playback_duration, PCM16_MIME_TYPE, PLAYBACK_SAMPLE_RATE,
};
pub use playback::{
    Clock, MonotonicClock, PlaybackEvent, PlaybackItem, PlaybackScheduler, PlaybackSink,
};
