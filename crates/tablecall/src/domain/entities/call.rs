//! Call - Outbound call record
//!
//! Created by the intake API in `queued`/`calling`; mutated only by the
//! transition planner and the extraction orchestrator; never deleted here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reservation::{ReservationOutcome, ReservationRequest};
use crate::domain::value_objects::{CallIntent, CallStatus, FailureReason, ReservationStatus};

/// Longest failure detail persisted on a call
pub const MAX_FAILURE_DETAILS_LEN: usize = 500;

/// Call - Record of one outbound phone call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: Uuid,
    /// Call id assigned by the voice provider
    pub provider_call_id: String,
    pub status: CallStatus,
    /// True between "transcript received, human confirmed" and the end of extraction
    pub is_extracting: bool,
    pub call_intent: CallIntent,
    pub reservation_status: Option<ReservationStatus>,
    pub reservation_result: Option<serde_json::Value>,
    pub failure_reason: Option<String>,
    pub failure_details: Option<String>,
    pub restaurant_name: Option<String>,
    /// IANA timezone of the restaurant (e.g. `America/Toronto`)
    pub timezone: Option<String>,
    pub reservation_request: Option<ReservationRequest>,
    /// Preset question keys chosen at intake
    pub question_presets: Vec<String>,
    pub custom_questions: Vec<String>,
    /// Durable extraction claim; set before the extraction service is invoked
    pub extraction_started_at: Option<DateTime<Utc>>,
    /// Set when a corrective event flipped the terminal outcome
    pub corrected_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency counter, bumped on every write
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Call {
    /// Create a queued call the way intake does
    pub fn new(provider_call_id: impl Into<String>, call_intent: CallIntent) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            provider_call_id: provider_call_id.into(),
            status: CallStatus::Queued,
            is_extracting: false,
            call_intent,
            reservation_status: call_intent
                .tracks_reservation()
                .then_some(ReservationStatus::Requested),
            reservation_result: None,
            failure_reason: None,
            failure_details: None,
            restaurant_name: None,
            timezone: None,
            reservation_request: None,
            question_presets: Vec::new(),
            custom_questions: Vec::new(),
            extraction_started_at: None,
            corrected_at: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Terminal and not waiting on extraction
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal() && !self.is_extracting
    }

    pub fn tracks_reservation(&self) -> bool {
        self.call_intent.tracks_reservation()
    }

    /// Whether another worker holds a live extraction claim.
    pub fn extraction_claim_active(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        match self.extraction_started_at {
            Some(started) => now - started < lease,
            None => false,
        }
    }

    pub fn failure(&self) -> Option<FailureReason> {
        self.failure_reason.as_deref().and_then(|r| r.parse().ok())
    }

    pub fn set_failure(&mut self, reason: FailureReason, details: Option<String>) {
        self.failure_reason = Some(reason.as_str().to_string());
        self.failure_details = details.map(|d| truncate_details(&d));
    }

    pub fn clear_failure(&mut self) {
        self.failure_reason = None;
        self.failure_details = None;
    }

    /// Move a reservation still at `requested` to `needs_followup`.
    ///
    /// Returns true when the reservation was repaired. Questions-only calls
    /// are never touched.
    pub fn repair_stuck_reservation(&mut self, reason: FailureReason) -> bool {
        if !self.tracks_reservation()
            || self.reservation_status != Some(ReservationStatus::Requested)
        {
            return false;
        }
        let outcome = ReservationOutcome::needs_followup(reason);
        self.reservation_status = Some(outcome.status);
        self.reservation_result = Some(outcome.to_json());
        true
    }

    /// Put a follow-up that an earlier failure synthesized back to `requested`.
    ///
    /// Used when a correction reopens the call, so the next extraction or
    /// failure writes its own outcome. Extracted outcomes are left alone.
    pub fn reopen_synthesized_followup(&mut self) -> bool {
        let synthesized = self.reservation_status == Some(ReservationStatus::NeedsFollowup)
            && self
                .reservation_result
                .as_ref()
                .and_then(|result| result.get("failure_reason"))
                .is_some_and(|reason| !reason.is_null());
        if !synthesized {
            return false;
        }
        self.reservation_status = Some(ReservationStatus::Requested);
        self.reservation_result = None;
        true
    }

    /// Copy an extracted outcome onto the call (reservation calls only).
    pub fn record_reservation_outcome(&mut self, outcome: &ReservationOutcome) -> bool {
        if !self.tracks_reservation() {
            return false;
        }
        self.reservation_status = Some(outcome.status);
        self.reservation_result = Some(outcome.to_json());
        true
    }

    /// Undo whatever extraction wrote to the reservation fields.
    pub fn clear_reservation_outcome(&mut self) {
        if !self.tracks_reservation() {
            return;
        }
        self.reservation_status = Some(ReservationStatus::Requested);
        self.reservation_result = None;
    }
}

/// Truncate diagnostics on a char boundary.
pub fn truncate_details(details: &str) -> String {
    if details.len() <= MAX_FAILURE_DETAILS_LEN {
        return details.to_string();
    }
    let mut end = MAX_FAILURE_DETAILS_LEN;
    while !details.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &details[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reservation_call_starts_requested() {
        let call = Call::new("call_1", CallIntent::MakeReservation);
        assert_eq!(call.status, CallStatus::Queued);
        assert_eq!(call.reservation_status, Some(ReservationStatus::Requested));

        let call = Call::new("call_2", CallIntent::QuestionsOnly);
        assert_eq!(call.reservation_status, None);
    }

    #[test]
    fn test_repair_only_touches_requested_reservations() {
        let mut call = Call::new("call_1", CallIntent::MakeReservation);
        assert!(call.repair_stuck_reservation(FailureReason::Voicemail));
        assert_eq!(call.reservation_status, Some(ReservationStatus::NeedsFollowup));
        let result = call.reservation_result.clone().unwrap();
        assert_eq!(result["failure_reason"], "voicemail");
        assert_eq!(result["failure_category"], "no_human_reached");

        // second repair is a no-op
        assert!(!call.repair_stuck_reservation(FailureReason::Busy));
        assert_eq!(call.reservation_result.unwrap()["failure_reason"], "voicemail");
    }

    #[test]
    fn test_reopen_only_resets_synthesized_followups() {
        let mut call = Call::new("call_1", CallIntent::MakeReservation);
        call.repair_stuck_reservation(FailureReason::Voicemail);
        assert!(call.reopen_synthesized_followup());
        assert_eq!(call.reservation_status, Some(ReservationStatus::Requested));
        assert!(call.reservation_result.is_none());

        // a follow-up the extraction read from the transcript stays
        call.record_reservation_outcome(&ReservationOutcome {
            status: ReservationStatus::NeedsFollowup,
            details: Some("Call back after 4pm".into()),
            confirmed_time: None,
            party_size: None,
            name: None,
            callback_phone: None,
            confirmation_number: None,
            failure_reason: None,
            failure_category: None,
        });
        assert!(!call.reopen_synthesized_followup());
        assert_eq!(call.reservation_status, Some(ReservationStatus::NeedsFollowup));
    }

    #[test]
    fn test_questions_only_is_never_repaired() {
        let mut call = Call::new("call_1", CallIntent::QuestionsOnly);
        assert!(!call.repair_stuck_reservation(FailureReason::NoAnswer));
        call.clear_reservation_outcome();
        assert!(call.reservation_status.is_none());
        assert!(call.reservation_result.is_none());
    }

    #[test]
    fn test_extraction_claim_lease() {
        let mut call = Call::new("call_1", CallIntent::QuestionsOnly);
        let now = Utc::now();
        assert!(!call.extraction_claim_active(now, Duration::seconds(120)));

        call.extraction_started_at = Some(now - Duration::seconds(30));
        assert!(call.extraction_claim_active(now, Duration::seconds(120)));

        call.extraction_started_at = Some(now - Duration::seconds(300));
        assert!(!call.extraction_claim_active(now, Duration::seconds(120)));
    }

    #[test]
    fn test_failure_details_are_truncated() {
        let mut call = Call::new("call_1", CallIntent::QuestionsOnly);
        call.set_failure(FailureReason::ExtractionFailed, Some("é".repeat(400)));
        let details = call.failure_details.unwrap();
        assert!(details.len() <= MAX_FAILURE_DETAILS_LEN + '…'.len_utf8());
        assert!(details.ends_with('…'));
        assert_eq!(call.failure_reason.as_deref(), Some("extraction_failed"));
    }
}
