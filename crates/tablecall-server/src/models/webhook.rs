//! Provider webhook DTOs
//!
//! Loosely typed on purpose: every field the provider may omit is optional.
//! `into_event` is the only place raw fields are read.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use tablecall::{CallEvent, CallEventKind, Speaker, TranscriptTurn};

/// Lifecycle webhook sent by the voice provider
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProviderWebhook {
    /// `call_started`, `call_connected`, `call_ended` or `call_analyzed`
    pub event: String,
    #[serde(default)]
    pub call: Option<ProviderCall>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProviderCall {
    pub call_id: Option<String>,
    /// Plain transcript, `Agent: ...` / `User: ...` lines
    pub transcript: Option<String>,
    /// Structured transcript turns
    pub transcript_object: Option<Vec<ProviderTurn>>,
    pub disconnection_reason: Option<String>,
    pub duration_ms: Option<u64>,
    /// Epoch milliseconds; used when `duration_ms` is absent
    pub start_timestamp: Option<i64>,
    pub end_timestamp: Option<i64>,
    pub call_analysis: Option<CallAnalysis>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProviderTurn {
    /// `agent` or `user`
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub words: Vec<ProviderWord>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProviderWord {
    /// Seconds from call start
    pub start: Option<f64>,
}

/// Provider-side analysis, only present on `call_analyzed`
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CallAnalysis {
    pub in_voicemail: Option<bool>,
    pub call_successful: Option<bool>,
}

/// What an envelope turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Event(CallEvent),
    MissingCallId,
    UnsupportedEvent(String),
}

impl ProviderWebhook {
    pub fn into_event(self) -> InboundEvent {
        let Some(kind) = CallEventKind::from_provider(self.event.trim()) else {
            return InboundEvent::UnsupportedEvent(self.event);
        };
        let call = self.call.unwrap_or_default();
        let Some(call_id) = call.call_id.filter(|id| !id.trim().is_empty()) else {
            return InboundEvent::MissingCallId;
        };

        let turns = call
            .transcript_object
            .unwrap_or_default()
            .into_iter()
            .map(|turn| {
                let start = turn.words.iter().find_map(|w| w.start);
                let converted = TranscriptTurn::new(Speaker::from_role(&turn.role), turn.content);
                match start {
                    Some(secs) => converted.at(secs),
                    None => converted,
                }
            })
            .collect();

        let duration_ms = call.duration_ms.or_else(|| {
            match (call.start_timestamp, call.end_timestamp) {
                (Some(start), Some(end)) if end >= start => u64::try_from(end - start).ok(),
                _ => None,
            }
        });

        let analysis = call.call_analysis.unwrap_or_default();
        InboundEvent::Event(CallEvent {
            kind,
            provider_call_id: call_id.trim().to_string(),
            transcript: call.transcript,
            turns,
            disconnection_reason: call.disconnection_reason,
            duration_ms,
            in_voicemail: analysis.in_voicemail,
            call_successful: analysis.call_successful,
        })
    }
}

/// Acknowledgement body for deliveries that were accepted but not acted on
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    /// Always `ignored`
    pub status: String,
    pub reason: String,
}

impl WebhookAck {
    pub fn ignored(reason: impl Into<String>) -> Self {
        Self {
            status: "ignored".to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> InboundEvent {
        serde_json::from_value::<ProviderWebhook>(json)
            .unwrap()
            .into_event()
    }

    #[test]
    fn test_analyzed_envelope_is_typed() {
        let inbound = parse(serde_json::json!({
            "event": "call_analyzed",
            "call": {
                "call_id": "call_abc",
                "transcript": "Agent: Hi\nUser: Hello",
                "transcript_object": [
                    {"role": "agent", "content": "Hi", "words": [{"word": "Hi", "start": 0.8}]},
                    {"role": "user", "content": "Hello", "words": []}
                ],
                "disconnection_reason": "user_hangup",
                "start_timestamp": 1000,
                "end_timestamp": 61000,
                "call_analysis": {"in_voicemail": false, "call_successful": true}
            }
        }));

        let InboundEvent::Event(event) = inbound else {
            panic!("expected an event, got {inbound:?}");
        };
        assert_eq!(event.kind, CallEventKind::Analyzed);
        assert_eq!(event.provider_call_id, "call_abc");
        assert_eq!(event.duration_ms, Some(60_000));
        assert_eq!(event.in_voicemail, Some(false));
        assert_eq!(event.turns[0].speaker, Speaker::Agent);
        assert_eq!(event.turns[0].start_secs, Some(0.8));
        assert_eq!(event.turns[1].speaker, Speaker::Callee);
        assert_eq!(event.turns[1].start_secs, None);
    }

    #[test]
    fn test_missing_call_id() {
        assert_eq!(
            parse(serde_json::json!({"event": "call_ended", "call": {"call_id": " "}})),
            InboundEvent::MissingCallId
        );
        assert_eq!(parse(serde_json::json!({"event": "call_ended"})), InboundEvent::MissingCallId);
    }

    #[test]
    fn test_unknown_event_is_unsupported() {
        assert_eq!(
            parse(serde_json::json!({"event": "transcript_updated", "call": {"call_id": "c"}})),
            InboundEvent::UnsupportedEvent("transcript_updated".to_string())
        );
    }
}
