//! Reservation - Requested booking and extracted outcome

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{FailureReason, ReservationStatus};

/// Booking details captured by intake when the call was requested
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationRequest {
    /// Requested date (`YYYY-MM-DD`)
    pub date: Option<String>,
    /// Requested time (`HH:mm`, local to the restaurant)
    pub time: Option<String>,
    pub party_size: Option<u32>,
    /// Name the booking should be under
    pub name: Option<String>,
    pub callback_phone: Option<String>,
    pub special_requests: Option<String>,
}

/// Reservation outcome, as read from the transcript or synthesized when the
/// call never reached anyone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationOutcome {
    pub status: ReservationStatus,
    pub details: Option<String>,
    /// Local wall-clock time, `YYYY-MM-DDTHH:mm:ss`, no zone suffix
    pub confirmed_time: Option<String>,
    pub party_size: Option<u32>,
    pub name: Option<String>,
    pub callback_phone: Option<String>,
    pub confirmation_number: Option<String>,
    pub failure_reason: Option<String>,
    pub failure_category: Option<String>,
}

impl ReservationOutcome {
    /// Outcome used when a reservation must be followed up by a person.
    pub fn needs_followup(reason: FailureReason) -> Self {
        Self {
            status: ReservationStatus::NeedsFollowup,
            details: Some(reason.callback_message().to_string()),
            confirmed_time: None,
            party_size: None,
            name: None,
            callback_phone: None,
            confirmation_number: None,
            failure_reason: Some(reason.as_str().to_string()),
            failure_category: Some(
                if reason.is_no_human() {
                    "no_human_reached"
                } else {
                    "processing"
                }
                .to_string(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
