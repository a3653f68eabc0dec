use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// A single entry in the ordered conversation transcript.
///
/// Entries are append-only: once `is_final` is set the entry is never
/// mutated again, and a later fragment from the same speaker opens a new
/// entry instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: u64,
    pub speaker: Speaker,
    pub text: String,
    pub is_final: bool,

    /// When this entry was first created
    pub timestamp: DateTime<Utc>,
}

/// Assembles partial/final transcript fragments into a coherent transcript.
///
/// The merge rule is asymmetric because the remote service reports the two
/// directions differently: user transcription arrives as cumulative text per
/// turn (each update replaces the previous one), while assistant
/// transcription arrives as incremental deltas (each update extends the
/// previous one). This is an observed contract of the service, not a
/// unified rule.
#[derive(Debug, Default)]
pub struct TranscriptAssembler {
    entries: Vec<TranscriptEntry>,
    next_id: u64,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one inbound fragment for a speaker.
    ///
    /// If the most recent entry for the same speaker is not yet final, the
    /// fragment merges into it (replace for the user, append for the
    /// assistant) and updates its finality; otherwise a new entry is
    /// appended. Entries are never reordered across speakers.
    pub fn apply(&mut self, speaker: Speaker, text: &str, is_final: bool) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.speaker == speaker)
        {
            if !entry.is_final {
                match speaker {
                    Speaker::User => {
                        entry.text.clear();
                        entry.text.push_str(text);
                    }
                    Speaker::Assistant => entry.text.push_str(text),
                }
                entry.is_final = is_final;
                return;
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(TranscriptEntry {
            id,
            speaker,
            text: text.to_string(),
            is_final,
            timestamp: Utc::now(),
        });
    }

    /// Read-only copy of the transcript, in entry creation order.
    pub fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.entries.clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
