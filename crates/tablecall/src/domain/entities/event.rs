//! CallEvent - Typed lifecycle event from the voice provider
//!
//! Webhook payloads are loosely typed; they are converted into this shape at
//! the boundary so no decision logic ever branches on raw JSON fields.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::CallStatus;

/// Lifecycle events the core reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallEventKind {
    Started,
    Connected,
    /// Leaner completion event, delivered first
    Ended,
    /// Richer completion event carrying the provider's call analysis
    Analyzed,
}

impl CallEventKind {
    /// Map a provider event name; unknown names are not ours to handle.
    pub fn from_provider(name: &str) -> Option<Self> {
        match name {
            "call_started" => Some(Self::Started),
            "call_connected" | "call_answered" => Some(Self::Connected),
            "call_ended" => Some(Self::Ended),
            "call_analyzed" => Some(Self::Analyzed),
            _ => None,
        }
    }

    /// Status implied by a progress event. Completion events have no fixed
    /// target: it depends on the outcome classification.
    pub fn progress_target(self) -> Option<CallStatus> {
        match self {
            Self::Started => Some(CallStatus::Calling),
            Self::Connected => Some(CallStatus::Connected),
            Self::Ended | Self::Analyzed => None,
        }
    }

    pub fn is_completion(self) -> bool {
        matches!(self, Self::Ended | Self::Analyzed)
    }

    pub fn is_rich(self) -> bool {
        matches!(self, Self::Analyzed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "call_started",
            Self::Connected => "call_connected",
            Self::Ended => "call_ended",
            Self::Analyzed => "call_analyzed",
        }
    }
}

impl std::fmt::Display for CallEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who spoke a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// Our calling agent
    Agent,
    /// Whoever picked up at the restaurant
    Callee,
}

impl Speaker {
    /// Provider roles are `agent` and `user`; anything not ours is the callee.
    pub fn from_role(role: &str) -> Self {
        if role.eq_ignore_ascii_case("agent") {
            Speaker::Agent
        } else {
            Speaker::Callee
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Speaker::Agent => "Agent",
            Speaker::Callee => "Restaurant",
        }
    }
}

/// One turn of the structured transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub speaker: Speaker,
    pub content: String,
    /// Offset from call start, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_secs: Option<f64>,
}

impl TranscriptTurn {
    pub fn new(speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            speaker,
            content: content.into(),
            start_secs: None,
        }
    }

    pub fn at(mut self, start_secs: f64) -> Self {
        self.start_secs = Some(start_secs);
        self
    }

    pub fn is_substantive(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// A validated provider event for one call
#[derive(Debug, Clone, PartialEq)]
pub struct CallEvent {
    pub kind: CallEventKind,
    pub provider_call_id: String,
    pub transcript: Option<String>,
    pub turns: Vec<TranscriptTurn>,
    pub disconnection_reason: Option<String>,
    pub duration_ms: Option<u64>,
    /// Provider's own voicemail verdict
    pub in_voicemail: Option<bool>,
    /// Provider's success flag; kept in the classifier trail only
    pub call_successful: Option<bool>,
}

impl CallEvent {
    pub fn new(kind: CallEventKind, provider_call_id: impl Into<String>) -> Self {
        Self {
            kind,
            provider_call_id: provider_call_id.into(),
            transcript: None,
            turns: Vec::new(),
            disconnection_reason: None,
            duration_ms: None,
            in_voicemail: None,
            call_successful: None,
        }
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    pub fn with_turns(mut self, turns: Vec<TranscriptTurn>) -> Self {
        self.turns = turns;
        self
    }

    pub fn with_disconnection_reason(mut self, reason: impl Into<String>) -> Self {
        self.disconnection_reason = Some(reason.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_voicemail_flag(mut self, in_voicemail: bool) -> Self {
        self.in_voicemail = Some(in_voicemail);
        self
    }

    /// Raw transcript text, ignoring whitespace-only payloads
    pub fn transcript_text(&self) -> Option<&str> {
        self.transcript
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    pub fn has_transcript(&self) -> bool {
        self.transcript_text().is_some() || self.turns.iter().any(TranscriptTurn::is_substantive)
    }
}
