use serde::{Deserialize, Serialize};

/// Conversational state of a voice session, as shown to the UI.
///
/// Exactly one value is active at a time and only the `SessionController`
/// mutates it. `Processing` is a transient display hint used between turns;
/// it has no teardown semantics of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Listening,
    Speaking,
    Processing,
    Error,
}

impl SessionState {
    /// True while a session owns the microphone and transport.
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Error)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Listening => "listening",
            SessionState::Speaking => "speaking",
            SessionState::Processing => "processing",
            SessionState::Error => "error",
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
