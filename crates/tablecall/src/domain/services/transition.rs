//! Status Transition Engine
//!
//! Decides what a provider event does to a call. Planning is pure: the
//! planner looks at the current call, the typed event and (for completion
//! events) the outcome classification, and returns a [`TransitionPlan`]
//! listing the effects in order. The application layer applies the plan
//! under the per-call lock, persists it, and runs extraction when the plan
//! asks for it.
//!
//! Status only moves forward along [`CallStatus::allowed_predecessors`]. The
//! one exception is a corrective flip between `completed` and `failed`,
//! allowed once per call and only on the rich completion event.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::{Call, CallArtifact, CallEvent, CallEventKind};
use crate::domain::services::classifier::Classification;
use crate::domain::value_objects::{CallStatus, FailureReason};

/// How a plan relates to the call's current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Forward move along the predecessor table
    Advance,
    /// Already terminal, finishing the work the lean event started
    Continue,
    /// One-shot completed/failed flip or transcript recovery
    Correction,
    /// Duplicate, stale or out-of-order delivery
    Noop,
}

/// A single effect of a transition, applied in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "value")]
pub enum TransitionAction {
    SetStatus(CallStatus),
    StoreTranscript,
    /// Mark the call as waiting on extraction
    BeginExtraction,
    /// Hand the call to the extraction orchestrator after persisting
    RunExtraction { corrective: bool },
    /// Human reached on the lean event; extraction waits for the rich one
    AwaitRicherEvent,
    MarkTranscriptMissing,
    MarkNoHumanReached(FailureReason),
    ClearFailure,
    /// Drop answers and any reservation outcome a previous extraction wrote
    ClearExtractionOutput,
    /// Move a reservation stuck at `requested` to `needs_followup`
    RepairReservation(FailureReason),
    /// Drop a follow-up synthesized by the failure being corrected
    ReopenReservation,
    RecordCorrection,
}

/// Outcome of planning one event against one call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionPlan {
    pub from: CallStatus,
    pub to: CallStatus,
    pub event: CallEventKind,
    pub kind: TransitionKind,
    pub actions: Vec<TransitionAction>,
    /// Short machine-readable reason, for logs
    pub reason: &'static str,
    /// Diagnostics written alongside a no-human failure reason
    pub failure_details: Option<String>,
}

impl TransitionPlan {
    fn noop(call: &Call, event: CallEventKind, reason: &'static str) -> Self {
        Self {
            from: call.status,
            to: call.status,
            event,
            kind: TransitionKind::Noop,
            actions: Vec::new(),
            reason,
            failure_details: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.kind == TransitionKind::Noop
    }

    /// `Some(corrective)` when the plan hands off to extraction
    pub fn extraction(&self) -> Option<bool> {
        self.actions.iter().find_map(|action| match action {
            TransitionAction::RunExtraction { corrective } => Some(*corrective),
            _ => None,
        })
    }

    /// Apply every state effect to the call and its artifact.
    ///
    /// `RunExtraction` is a hand-off marker and changes nothing here.
    pub fn apply(
        &self,
        call: &mut Call,
        artifact: &mut CallArtifact,
        event: &CallEvent,
        now: DateTime<Utc>,
    ) {
        if self.is_noop() {
            return;
        }

        for action in &self.actions {
            match *action {
                TransitionAction::SetStatus(status) => call.status = status,
                TransitionAction::StoreTranscript => artifact.store_transcript(event),
                TransitionAction::BeginExtraction => call.is_extracting = true,
                TransitionAction::RunExtraction { .. } => {}
                TransitionAction::AwaitRicherEvent => {
                    tracing::warn!(
                        provider_call_id = %call.provider_call_id,
                        "Human reached on {}; extraction waits for {}, nothing runs if it never arrives",
                        CallEventKind::Ended,
                        CallEventKind::Analyzed
                    );
                }
                TransitionAction::MarkTranscriptMissing => {
                    call.is_extracting = false;
                    call.extraction_started_at = None;
                    call.set_failure(
                        FailureReason::TranscriptMissing,
                        Some(format!("{} carried no transcript", self.event)),
                    );
                    call.repair_stuck_reservation(FailureReason::TranscriptMissing);
                }
                TransitionAction::MarkNoHumanReached(reason) => {
                    call.is_extracting = false;
                    call.extraction_started_at = None;
                    call.set_failure(reason, self.failure_details.clone());
                }
                TransitionAction::ClearFailure => call.clear_failure(),
                TransitionAction::ClearExtractionOutput => {
                    artifact.clear_answers();
                    call.clear_reservation_outcome();
                }
                TransitionAction::RepairReservation(reason) => {
                    if call.repair_stuck_reservation(reason) {
                        tracing::info!(
                            provider_call_id = %call.provider_call_id,
                            reason = %reason,
                            "Reservation moved to needs_followup"
                        );
                    }
                }
                TransitionAction::ReopenReservation => {
                    call.reopen_synthesized_followup();
                }
                TransitionAction::RecordCorrection => call.corrected_at = Some(now),
            }
        }

        call.updated_at = now;
        artifact.updated_at = now;
    }
}

/// Plan the effect of `event` on `call`.
///
/// `classification` is consulted for completion events only; without one the
/// call is treated as having reached a person, but that default never counts
/// as evidence against an earlier no-human decision. `transcript_available`
/// is true when either the event or the stored artifact holds a usable
/// transcript.
pub fn plan_transition(
    call: &Call,
    event: &CallEvent,
    classification: Option<&Classification>,
    transcript_available: bool,
) -> TransitionPlan {
    if let Some(target) = event.kind.progress_target() {
        return plan_progress(call, event.kind, target);
    }

    let verdict = Verdict::from_classification(classification);

    if !call.status.is_terminal() {
        return plan_completion(call, event, &verdict, transcript_available);
    }

    if !event.kind.is_rich() {
        return TransitionPlan::noop(call, event.kind, "lean_event_after_completion");
    }

    if call.is_extracting {
        plan_unsettled_rich(call, event, &verdict, transcript_available)
    } else {
        plan_settled_rich(call, event, &verdict, transcript_available)
    }
}

/// Classification reduced to what the planner needs
struct Verdict {
    no_human: Option<FailureReason>,
    /// A rule positively found a person; the silent default does not count
    human_evidence: bool,
    summary: Option<String>,
}

impl Verdict {
    fn from_classification(classification: Option<&Classification>) -> Self {
        match classification {
            Some(c) if c.no_human_reached => Self {
                no_human: Some(c.reason.unwrap_or(FailureReason::NoAnswer)),
                human_evidence: false,
                summary: Some(c.summary()),
            },
            Some(c) => Self {
                no_human: None,
                human_evidence: c.decided_by.is_some(),
                summary: None,
            },
            None => Self {
                no_human: None,
                human_evidence: false,
                summary: None,
            },
        }
    }
}

fn plan_progress(call: &Call, event: CallEventKind, target: CallStatus) -> TransitionPlan {
    if !call.status.can_advance_to(target) {
        return TransitionPlan::noop(call, event, "not_a_forward_move");
    }
    TransitionPlan {
        from: call.status,
        to: target,
        event,
        kind: TransitionKind::Advance,
        actions: vec![TransitionAction::SetStatus(target)],
        reason: "progress",
        failure_details: None,
    }
}

/// First completion event for a call that is not terminal yet.
fn plan_completion(
    call: &Call,
    event: &CallEvent,
    verdict: &Verdict,
    transcript_available: bool,
) -> TransitionPlan {
    let mut actions = Vec::new();

    let (to, reason) = match verdict.no_human {
        Some(failure) => {
            actions.push(TransitionAction::SetStatus(CallStatus::Failed));
            if event.has_transcript() {
                actions.push(TransitionAction::StoreTranscript);
            }
            actions.push(TransitionAction::MarkNoHumanReached(failure));
            actions.push(TransitionAction::RepairReservation(failure));
            (CallStatus::Failed, "no_human_reached")
        }
        None => {
            actions.push(TransitionAction::SetStatus(CallStatus::Completed));
            if event.has_transcript() {
                actions.push(TransitionAction::StoreTranscript);
            }
            if transcript_available {
                actions.push(TransitionAction::BeginExtraction);
                actions.push(extraction_step(event.kind, false));
                (CallStatus::Completed, "human_reached")
            } else {
                actions.push(TransitionAction::MarkTranscriptMissing);
                (CallStatus::Completed, "transcript_missing")
            }
        }
    };

    TransitionPlan {
        from: call.status,
        to,
        event: event.kind,
        kind: TransitionKind::Advance,
        actions,
        reason,
        failure_details: verdict.summary.clone(),
    }
}

/// Rich event for a call completed by the lean event and still extracting.
fn plan_unsettled_rich(
    call: &Call,
    event: &CallEvent,
    verdict: &Verdict,
    transcript_available: bool,
) -> TransitionPlan {
    match verdict.no_human {
        // A call that was already corrected keeps its corrected outcome.
        Some(failure) if call.corrected_at.is_none() => {
            correction_to_failed(call, event.kind, failure, verdict.summary.clone())
        }
        _ => {
            let mut actions = Vec::new();
            if event.has_transcript() {
                actions.push(TransitionAction::StoreTranscript);
            }
            let reason = if transcript_available {
                actions.push(TransitionAction::RunExtraction { corrective: false });
                "extraction_ready"
            } else {
                actions.push(TransitionAction::MarkTranscriptMissing);
                "transcript_missing"
            };
            TransitionPlan {
                from: call.status,
                to: call.status,
                event: event.kind,
                kind: TransitionKind::Continue,
                actions,
                reason,
                failure_details: None,
            }
        }
    }
}

/// Rich event for a settled call: a no-op unless it contradicts the earlier
/// decision with evidence of its own or brings the transcript that was missing.
fn plan_settled_rich(
    call: &Call,
    event: &CallEvent,
    verdict: &Verdict,
    transcript_available: bool,
) -> TransitionPlan {
    if call.corrected_at.is_some() {
        return TransitionPlan::noop(call, event.kind, "already_corrected");
    }

    match (call.status, verdict.no_human) {
        (status, Some(failure)) if status.is_corrective_flip(CallStatus::Failed) => {
            correction_to_failed(call, event.kind, failure, verdict.summary.clone())
        }
        (status, None)
            if verdict.human_evidence && status.is_corrective_flip(CallStatus::Completed) =>
        {
            let mut actions = vec![
                TransitionAction::SetStatus(CallStatus::Completed),
                TransitionAction::ClearFailure,
                TransitionAction::ReopenReservation,
            ];
            if event.has_transcript() {
                actions.push(TransitionAction::StoreTranscript);
            }
            if transcript_available {
                actions.push(TransitionAction::BeginExtraction);
                actions.push(TransitionAction::RunExtraction { corrective: true });
            } else {
                actions.push(TransitionAction::MarkTranscriptMissing);
            }
            actions.push(TransitionAction::RecordCorrection);
            TransitionPlan {
                from: call.status,
                to: CallStatus::Completed,
                event: event.kind,
                kind: TransitionKind::Correction,
                actions,
                reason: "corrected_to_completed",
                failure_details: None,
            }
        }
        (CallStatus::Completed, None)
            if call.failure() == Some(FailureReason::TranscriptMissing)
                && event.has_transcript() =>
        {
            TransitionPlan {
                from: call.status,
                to: call.status,
                event: event.kind,
                kind: TransitionKind::Correction,
                actions: vec![
                    TransitionAction::ClearFailure,
                    TransitionAction::ReopenReservation,
                    TransitionAction::StoreTranscript,
                    TransitionAction::BeginExtraction,
                    TransitionAction::RunExtraction { corrective: true },
                    TransitionAction::RecordCorrection,
                ],
                reason: "transcript_recovered",
                failure_details: None,
            }
        }
        _ => TransitionPlan::noop(call, event.kind, "duplicate_completion"),
    }
}

fn correction_to_failed(
    call: &Call,
    event: CallEventKind,
    failure: FailureReason,
    summary: Option<String>,
) -> TransitionPlan {
    TransitionPlan {
        from: call.status,
        to: CallStatus::Failed,
        event,
        kind: TransitionKind::Correction,
        actions: vec![
            TransitionAction::SetStatus(CallStatus::Failed),
            TransitionAction::ClearExtractionOutput,
            TransitionAction::MarkNoHumanReached(failure),
            TransitionAction::RepairReservation(failure),
            TransitionAction::RecordCorrection,
        ],
        reason: "corrected_to_failed",
        failure_details: summary,
    }
}

fn extraction_step(event: CallEventKind, corrective: bool) -> TransitionAction {
    if event.is_rich() {
        TransitionAction::RunExtraction { corrective }
    } else {
        TransitionAction::AwaitRicherEvent
    }
}
