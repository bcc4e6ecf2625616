//! CallStatus - Lifecycle status of an outbound call
//!
//! Progression is forward-only: `queued → calling → connected → completed`,
//! with `failed` reachable from every non-terminal state. The allowed moves
//! are spelled out as a predecessor table instead of comparing ordinals, so
//! reordering the enum can never change what is permitted.

use serde::{Deserialize, Serialize};

/// Call lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Queued,
    Calling,
    Connected,
    Completed,
    Failed,
}

impl CallStatus {
    pub const ALL: [CallStatus; 5] = [
        CallStatus::Queued,
        CallStatus::Calling,
        CallStatus::Connected,
        CallStatus::Completed,
        CallStatus::Failed,
    ];

    /// Completed and failed end the call's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Failed)
    }

    /// Statuses from which a call may move into `self` during normal progression.
    pub fn allowed_predecessors(self) -> &'static [CallStatus] {
        use CallStatus::*;
        match self {
            Queued => &[],
            Calling => &[Queued],
            Connected => &[Queued, Calling],
            Completed => &[Queued, Calling, Connected],
            Failed => &[Queued, Calling, Connected],
        }
    }

    /// Whether `next` is a legal forward move from `self`.
    pub fn can_advance_to(self, next: CallStatus) -> bool {
        next.allowed_predecessors().contains(&self)
    }

    /// Corrective flips between the two terminal outcomes.
    ///
    /// These bypass the predecessor table and are only ever applied once per
    /// call by the transition planner.
    pub fn is_corrective_flip(self, next: CallStatus) -> bool {
        matches!(
            (self, next),
            (CallStatus::Completed, CallStatus::Failed) | (CallStatus::Failed, CallStatus::Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Queued => "queued",
            CallStatus::Calling => "calling",
            CallStatus::Connected => "connected",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(CallStatus::Queued),
            "calling" => Ok(CallStatus::Calling),
            "connected" => Ok(CallStatus::Connected),
            "completed" => Ok(CallStatus::Completed),
            "failed" => Ok(CallStatus::Failed),
            _ => Err(format!("Unknown call status: {}", s)),
        }
    }
}
