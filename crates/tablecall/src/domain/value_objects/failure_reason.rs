//! FailureReason - Why a call did not produce a usable result

use serde::{Deserialize, Serialize};

/// Failure reason recorded on the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Voicemail or answering machine picked up
    Voicemail,
    NoAnswer,
    Busy,
    /// The dial itself never connected
    DialFailed,
    /// A person answered but no transcript was delivered
    TranscriptMissing,
    ExtractionFailed,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::Voicemail => "voicemail",
            FailureReason::NoAnswer => "no_answer",
            FailureReason::Busy => "busy",
            FailureReason::DialFailed => "dial_failed",
            FailureReason::TranscriptMissing => "transcript_missing",
            FailureReason::ExtractionFailed => "extraction_failed",
        }
    }

    /// Categories that mean nobody was reached on the line.
    pub fn is_no_human(self) -> bool {
        matches!(
            self,
            FailureReason::Voicemail
                | FailureReason::NoAnswer
                | FailureReason::Busy
                | FailureReason::DialFailed
        )
    }

    /// Message shown to the person who asked for the call.
    pub fn callback_message(self) -> &'static str {
        match self {
            FailureReason::Voicemail => {
                "The call reached voicemail. Please call the restaurant back to book."
            }
            FailureReason::NoAnswer => {
                "Nobody answered the phone. Please try the restaurant again later."
            }
            FailureReason::Busy => "The line was busy. Please try the restaurant again later.",
            FailureReason::DialFailed => {
                "The call could not be placed. Please check the number and call the restaurant directly."
            }
            FailureReason::TranscriptMissing => {
                "The call connected but no transcript was captured. Please confirm with the restaurant."
            }
            FailureReason::ExtractionFailed => {
                "The call finished but the outcome could not be read. Please confirm with the restaurant."
            }
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FailureReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voicemail" => Ok(FailureReason::Voicemail),
            "no_answer" => Ok(FailureReason::NoAnswer),
            "busy" => Ok(FailureReason::Busy),
            "dial_failed" => Ok(FailureReason::DialFailed),
            "transcript_missing" => Ok(FailureReason::TranscriptMissing),
            "extraction_failed" => Ok(FailureReason::ExtractionFailed),
            _ => Err(format!("Unknown failure reason: {}", s)),
        }
    }
}
