//! Voice session state machine and transcript assembly
//!
//! This module provides the `SessionController` abstraction that manages:
//! - Microphone capture and the encode->send loop
//! - The duplex transport session lifecycle
//! - Playback scheduling of synthesized audio
//! - Transcript assembly from partial/final fragments
//! - The UI-visible session state machine

mod controller;
mod state;
mod transcript;

pub use controller::SessionController;
pub use state::SessionState;
pub use transcript::{Speaker, TranscriptAssembler, TranscriptEntry};
