//! CallArtifact - Transcript, extraction output and raw payload of a call
//!
//! Paired 1:1 with a Call. `raw_payload` is audit-only and must never be
//! exposed to external readers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::{CallEvent, TranscriptTurn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallArtifact {
    pub call_id: Uuid,
    pub transcript_text: Option<String>,
    /// Structured turns (`[{speaker, content, start_secs}]`)
    pub transcript_json: Option<serde_json::Value>,
    /// Normalized extraction output
    pub answers_json: Option<serde_json::Value>,
    #[serde(skip_serializing)]
    pub raw_payload: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl CallArtifact {
    /// Empty artifact, as created by intake
    pub fn new(call_id: Uuid) -> Self {
        Self {
            call_id,
            transcript_text: None,
            transcript_json: None,
            answers_json: None,
            raw_payload: None,
            updated_at: Utc::now(),
        }
    }

    pub fn has_transcript(&self) -> bool {
        self.transcript_text
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
            || self.stored_turns().iter().any(TranscriptTurn::is_substantive)
    }

    pub fn has_answers(&self) -> bool {
        self.answers_json.is_some()
    }

    /// Overwrite the stored transcript with whatever the event carries.
    ///
    /// Fields the event does not carry are left alone, so a lean event with
    /// only text never wipes turns stored earlier.
    pub fn store_transcript(&mut self, event: &CallEvent) {
        if let Some(text) = event.transcript_text() {
            self.transcript_text = Some(text.to_string());
        }
        if !event.turns.is_empty() {
            self.transcript_json = serde_json::to_value(&event.turns).ok();
        }
    }

    pub fn stored_turns(&self) -> Vec<TranscriptTurn> {
        self.transcript_json
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    pub fn clear_answers(&mut self) {
        self.answers_json = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CallEventKind, Speaker};

    #[test]
    fn test_store_transcript_keeps_existing_turns() {
        let mut artifact = CallArtifact::new(Uuid::new_v4());
        let rich = CallEvent::new(CallEventKind::Analyzed, "c1").with_turns(vec![
            TranscriptTurn::new(Speaker::Agent, "Hi, I'd like to book a table"),
            TranscriptTurn::new(Speaker::Callee, "Sure, for how many?"),
        ]);
        artifact.store_transcript(&rich);

        let lean = CallEvent::new(CallEventKind::Ended, "c1").with_transcript("Agent: Hi");
        artifact.store_transcript(&lean);

        assert_eq!(artifact.transcript_text.as_deref(), Some("Agent: Hi"));
        assert_eq!(artifact.stored_turns().len(), 2);
        assert!(artifact.has_transcript());
    }

    #[test]
    fn test_blank_transcript_is_not_a_transcript() {
        let mut artifact = CallArtifact::new(Uuid::new_v4());
        artifact.store_transcript(&CallEvent::new(CallEventKind::Ended, "c1").with_transcript("  "));
        assert!(!artifact.has_transcript());
    }
}
