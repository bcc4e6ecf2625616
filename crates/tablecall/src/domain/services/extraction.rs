//! Extraction contract
//!
//! Builds the prompt sent to the structured-output model and validates what
//! comes back. The response schema depends on the call intent: reservation
//! calls ask for a nested `outcome` object plus answers and notes,
//! questions-only calls ask for answers and notes only.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::entities::{Call, ReservationOutcome, ReservationRequest};
use crate::domain::errors::DomainError;
use crate::domain::services::datetime::normalize_local_datetime;
use crate::domain::services::questions::questions_asked;
use crate::domain::value_objects::{CallIntent, ReservationStatus};

const RESERVATION_SCHEMA: &str = r#"{
  "outcome": {
    "status": "confirmed | unavailable | needs_followup | failed",
    "details": "short summary of what the restaurant said",
    "confirmed_time": "YYYY-MM-DDTHH:mm:ss local time of the booking, or null",
    "party_size": "number or null",
    "name": "name the booking is under, or null",
    "callback_phone": "number the restaurant asked to call back on, or null",
    "confirmation_number": "string or null",
    "failure_reason": "why it was not booked, or null",
    "failure_category": "fully_booked | closed | requires_deposit | no_reservations | other | null"
  },
  "answers": [{ "question": "question as asked", "answer": "answer, or null if not answered" }],
  "notes": "anything else worth telling the requester, or null"
}"#;

const QUESTIONS_SCHEMA: &str = r#"{
  "answers": [{ "question": "question as asked", "answer": "answer, or null if not answered" }],
  "notes": "anything else worth telling the requester, or null"
}"#;

/// Everything the model needs to read a transcript
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub intent: CallIntent,
    pub restaurant_name: Option<String>,
    pub timezone: Option<String>,
    pub reservation_request: Option<ReservationRequest>,
    /// Questions the agent actually asked
    pub questions: Vec<String>,
    /// Normalized, speaker-labelled transcript
    pub transcript: String,
}

impl ExtractionContext {
    pub fn for_call(call: &Call, transcript: String) -> Self {
        Self {
            intent: call.call_intent,
            restaurant_name: call.restaurant_name.clone(),
            timezone: call.timezone.clone(),
            reservation_request: call
                .tracks_reservation()
                .then(|| call.reservation_request.clone())
                .flatten(),
            questions: questions_asked(call),
            transcript,
        }
    }

    pub fn response_schema(&self) -> &'static str {
        match self.intent {
            CallIntent::MakeReservation => RESERVATION_SCHEMA,
            CallIntent::QuestionsOnly => QUESTIONS_SCHEMA,
        }
    }

    pub fn system_prompt(&self) -> String {
        let goal = match self.intent {
            CallIntent::MakeReservation => {
                "The agent called a restaurant to book a reservation and to ask the listed questions."
            }
            CallIntent::QuestionsOnly => {
                "The agent called a restaurant only to ask the listed questions."
            }
        };
        format!(
            "You read phone call transcripts between our calling agent and a restaurant and \
             report what happened as JSON.\n{goal}\n\
             Only report what the restaurant actually said; use null when something was not \
             covered. Times are the restaurant's local time.\n\
             Respond with a single JSON object matching exactly this shape:\n{}",
            self.response_schema()
        )
    }

    pub fn user_prompt(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!("Call intent: {}\n", self.intent));
        if let Some(name) = &self.restaurant_name {
            prompt.push_str(&format!("Restaurant: {name}\n"));
        }
        if let Some(tz) = &self.timezone {
            prompt.push_str(&format!("Restaurant timezone: {tz}\n"));
        }

        if let Some(request) = &self.reservation_request {
            prompt.push_str("\n## Reservation request\n");
            let fields = [
                ("Date", request.date.clone()),
                ("Time", request.time.clone()),
                ("Party size", request.party_size.map(|n| n.to_string())),
                ("Name", request.name.clone()),
                ("Callback phone", request.callback_phone.clone()),
                ("Special requests", request.special_requests.clone()),
            ];
            for (label, value) in fields {
                if let Some(value) = value {
                    prompt.push_str(&format!("- {label}: {value}\n"));
                }
            }
        }

        if !self.questions.is_empty() {
            prompt.push_str("\n## Questions asked\n");
            for question in &self.questions {
                prompt.push_str(&format!("- {question}\n"));
            }
        }

        prompt.push_str("\n## Transcript\n");
        prompt.push_str(&self.transcript);
        prompt
    }
}

/// One answered (or unanswered) question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedAnswer {
    pub question: String,
    pub answer: Option<String>,
}

/// Validated extraction output, as stored in `answers_json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ReservationOutcome>,
    pub answers: Vec<ExtractedAnswer>,
    pub notes: Option<String>,
}

impl ExtractionResult {
    /// Rewrite `confirmed_time` as a zone-less local wall clock.
    ///
    /// Values that cannot be read as a date-time are dropped rather than
    /// failing the whole extraction.
    pub fn normalize_times(mut self, timezone: Option<&str>) -> Self {
        if let Some(outcome) = self.outcome.as_mut() {
            if let Some(raw) = outcome.confirmed_time.take() {
                match normalize_local_datetime(&raw, timezone) {
                    Ok(local) => outcome.confirmed_time = Some(local),
                    Err(e) => tracing::warn!(value = %raw, error = %e, "Dropping unreadable confirmed_time"),
                }
            }
        }
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Parse and validate raw model output for the given intent.
///
/// Empty or unparsable output, or output missing the required shape, is an
/// error: callers treat it as an extraction failure, never a partial success.
pub fn parse_extraction(raw: &str, intent: CallIntent) -> Result<ExtractionResult, DomainError> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(DomainError::Validation("Extraction returned empty output".to_string()));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| DomainError::Validation(format!("Extraction output is not JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| DomainError::Validation("Extraction output is not a JSON object".to_string()))?;

    let answers = match object.get("answers") {
        Some(Value::Array(items)) => items.iter().map(parse_answer).collect::<Result<Vec<_>, _>>()?,
        Some(Value::Null) | None => {
            return Err(DomainError::Validation("Extraction output has no answers array".to_string()))
        }
        Some(_) => return Err(DomainError::Validation("`answers` must be an array".to_string())),
    };

    let outcome = match intent {
        CallIntent::MakeReservation => match object.get("outcome") {
            Some(Value::Object(outcome)) => Some(parse_outcome(outcome)?),
            _ => {
                return Err(DomainError::Validation(
                    "Reservation extraction has no outcome object".to_string(),
                ))
            }
        },
        CallIntent::QuestionsOnly => None,
    };

    Ok(ExtractionResult {
        outcome,
        answers,
        notes: object.get("notes").and_then(text_value),
    })
}

fn parse_answer(item: &Value) -> Result<ExtractedAnswer, DomainError> {
    let question = item
        .get("question")
        .and_then(text_value)
        .ok_or_else(|| DomainError::Validation("Answer entry without a question".to_string()))?;
    Ok(ExtractedAnswer {
        question,
        answer: item.get("answer").and_then(text_value),
    })
}

fn parse_outcome(outcome: &serde_json::Map<String, Value>) -> Result<ReservationOutcome, DomainError> {
    let field = |name: &str| outcome.get(name).and_then(text_value);

    let status_raw = field("status")
        .ok_or_else(|| DomainError::Validation("Outcome without a status".to_string()))?;
    let status = match status_raw.parse::<ReservationStatus>() {
        // A finished call never leaves the booking merely "requested".
        Ok(ReservationStatus::Requested) => ReservationStatus::NeedsFollowup,
        Ok(status) => status,
        Err(e) => return Err(DomainError::Validation(e)),
    };

    let party_size = match outcome.get("party_size") {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    };

    Ok(ReservationOutcome {
        status,
        details: field("details"),
        confirmed_time: field("confirmed_time"),
        party_size,
        name: field("name"),
        callback_phone: field("callback_phone"),
        confirmation_number: field("confirmation_number"),
        failure_reason: field("failure_reason"),
        failure_category: field("failure_category"),
    })
}

/// Non-empty string (numbers are stringified); null and blanks become `None`.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() && !s.eq_ignore_ascii_case("null") => {
            Some(s.trim().to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(inner) = raw.strip_prefix("```") else {
        return raw;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_output_is_parsed() {
        let raw = r#"{
            "outcome": {
                "status": "confirmed",
                "details": "Booked for four at 7pm",
                "confirmed_time": "2026-01-27T00:00:00Z",
                "party_size": "4",
                "name": "Alex",
                "callback_phone": null,
                "confirmation_number": 1234,
                "failure_reason": null,
                "failure_category": null
            },
            "answers": [{"question": "Is there parking?", "answer": "Street parking only"}],
            "notes": ""
        }"#;

        let result = parse_extraction(raw, CallIntent::MakeReservation).unwrap();
        let outcome = result.outcome.clone().unwrap();
        assert_eq!(outcome.status, ReservationStatus::Confirmed);
        assert_eq!(outcome.party_size, Some(4));
        assert_eq!(outcome.confirmation_number.as_deref(), Some("1234"));
        assert_eq!(outcome.callback_phone, None);
        assert_eq!(result.notes, None);
        assert_eq!(result.answers[0].answer.as_deref(), Some("Street parking only"));

        let normalized = result.normalize_times(Some("America/Toronto"));
        assert_eq!(
            normalized.outcome.unwrap().confirmed_time.as_deref(),
            Some("2026-01-26T19:00:00")
        );
    }

    #[test]
    fn test_questions_only_ignores_outcome() {
        let raw = r#"{"outcome": {"status": "confirmed"}, "answers": [], "notes": "closed Mondays"}"#;
        let result = parse_extraction(raw, CallIntent::QuestionsOnly).unwrap();
        assert!(result.outcome.is_none());
        assert_eq!(result.notes.as_deref(), Some("closed Mondays"));
        assert!(result.to_json().get("outcome").is_none());
    }

    #[test]
    fn test_malformed_outputs_are_failures() {
        for raw in ["", "   ", "not json", "[]", r#"{"notes": "x"}"#, r#"{"answers": {}}"#] {
            assert!(
                parse_extraction(raw, CallIntent::QuestionsOnly).is_err(),
                "accepted {raw:?}"
            );
        }
        assert!(parse_extraction(r#"{"answers": []}"#, CallIntent::MakeReservation).is_err());
        assert!(parse_extraction(
            r#"{"outcome": {"status": "maybe"}, "answers": []}"#,
            CallIntent::MakeReservation
        )
        .is_err());
    }

    #[test]
    fn test_fenced_json_is_accepted() {
        let raw = "```json\n{\"answers\": [], \"notes\": null}\n```";
        assert!(parse_extraction(raw, CallIntent::QuestionsOnly).is_ok());
    }

    #[test]
    fn test_requested_status_becomes_needs_followup() {
        let raw = r#"{"outcome": {"status": "requested"}, "answers": []}"#;
        let result = parse_extraction(raw, CallIntent::MakeReservation).unwrap();
        assert_eq!(result.outcome.unwrap().status, ReservationStatus::NeedsFollowup);
    }

    #[test]
    fn test_unreadable_confirmed_time_is_dropped() {
        let raw = r#"{"outcome": {"status": "confirmed", "confirmed_time": "7ish"}, "answers": []}"#;
        let result = parse_extraction(raw, CallIntent::MakeReservation)
            .unwrap()
            .normalize_times(Some("America/Toronto"));
        assert_eq!(result.outcome.unwrap().confirmed_time, None);
    }

    #[test]
    fn test_user_prompt_lists_request_and_questions() {
        let mut call = Call::new("call_1", CallIntent::MakeReservation);
        call.restaurant_name = Some("Luigi's".into());
        call.timezone = Some("America/Toronto".into());
        call.reservation_request = Some(ReservationRequest {
            date: Some("2026-01-26".into()),
            time: Some("19:00".into()),
            party_size: Some(4),
            ..ReservationRequest::default()
        });
        call.question_presets = vec!["patio".into()];

        let ctx = ExtractionContext::for_call(&call, "Agent: Hi".into());
        let prompt = ctx.user_prompt();
        assert!(prompt.contains("Restaurant: Luigi's"));
        assert!(prompt.contains("- Party size: 4"));
        assert!(prompt.contains("- Do you have outdoor or patio seating?"));
        assert!(prompt.ends_with("Agent: Hi"));
        assert!(ctx.system_prompt().contains("\"outcome\""));
    }

    #[test]
    fn test_questions_only_context_drops_reservation_request() {
        let mut call = Call::new("call_1", CallIntent::QuestionsOnly);
        call.reservation_request = Some(ReservationRequest::default());
        let ctx = ExtractionContext::for_call(&call, String::new());
        assert!(ctx.reservation_request.is_none());
        assert!(!ctx.system_prompt().contains("\"outcome\""));
    }
}
