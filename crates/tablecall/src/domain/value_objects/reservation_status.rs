//! ReservationStatus - Where a reservation request stands

use serde::{Deserialize, Serialize};

/// Reservation status (only meaningful for `make_reservation` calls)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Set by intake; waiting for the call outcome
    Requested,
    Confirmed,
    /// Restaurant could not offer the requested slot
    Unavailable,
    /// A person has to call back or follow up
    NeedsFollowup,
    Failed,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Requested => "requested",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Unavailable => "unavailable",
            ReservationStatus::NeedsFollowup => "needs_followup",
            ReservationStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "requested" => Ok(ReservationStatus::Requested),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "unavailable" | "not_available" => Ok(ReservationStatus::Unavailable),
            "needs_followup" | "needs_follow_up" => Ok(ReservationStatus::NeedsFollowup),
            "failed" => Ok(ReservationStatus::Failed),
            _ => Err(format!("Unknown reservation status: {}", s)),
        }
    }
}
