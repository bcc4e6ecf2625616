//! CallIntent - What an outbound call is trying to achieve

use serde::{Deserialize, Serialize};

/// Call intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallIntent {
    /// Book a table (and optionally ask questions)
    MakeReservation,
    /// Only gather information
    QuestionsOnly,
}

impl CallIntent {
    pub fn as_str(self) -> &'static str {
        match self {
            CallIntent::MakeReservation => "make_reservation",
            CallIntent::QuestionsOnly => "questions_only",
        }
    }

    /// Only reservation calls carry `reservation_status` / `reservation_result`.
    pub fn tracks_reservation(self) -> bool {
        matches!(self, CallIntent::MakeReservation)
    }
}

impl std::fmt::Display for CallIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "make_reservation" => Ok(CallIntent::MakeReservation),
            "questions_only" => Ok(CallIntent::QuestionsOnly),
            _ => Err(format!("Unknown call intent: {}", s)),
        }
    }
}
