//! Extraction Orchestrator (Use Case)
//!
//! Turns a stored transcript into answers and a reservation outcome. The
//! caller claims the call with [`ExtractionService::prepare`], persists that
//! claim, and only then calls [`ExtractionService::execute`], which does the
//! external call and writes the results onto the call and artifact (it never
//! saves).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};

use tablecall::domain::{format_transcript, parse_extraction};
use tablecall::{
    Call, CallArtifact, ChatMessage, CompletionOptions, DomainError, ExtractionContext,
    ExtractionProvider, ExtractionResult, FailureReason,
};

/// What `prepare` decided for this delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionClaim {
    /// Claim taken; run extraction once the claim is persisted
    Run,
    /// Answers already stored and no correction asked for
    SkipExisting,
    /// Another delivery holds a live claim; this delivery changes nothing
    InProgress,
}

/// Application service for transcript extraction
pub struct ExtractionService<P: ExtractionProvider + ?Sized> {
    provider: Option<Arc<P>>,
    timeout: Duration,
    lease: chrono::Duration,
}

impl<P: ExtractionProvider + ?Sized> ExtractionService<P> {
    pub fn new(provider: Option<Arc<P>>, timeout: Duration, lease: Duration) -> Self {
        Self {
            provider,
            timeout,
            lease: chrono::Duration::from_std(lease).unwrap_or(chrono::Duration::seconds(120)),
        }
    }

    /// Decide whether this delivery runs extraction, and claim it if so.
    pub fn prepare(
        &self,
        call: &mut Call,
        artifact: &CallArtifact,
        corrective: bool,
        now: DateTime<Utc>,
    ) -> ExtractionClaim {
        if call.extraction_claim_active(now, self.lease) {
            return ExtractionClaim::InProgress;
        }
        if artifact.has_answers() && !corrective {
            call.is_extracting = false;
            call.extraction_started_at = None;
            return ExtractionClaim::SkipExisting;
        }

        if call.extraction_started_at.is_some() {
            tracing::warn!(
                provider_call_id = %call.provider_call_id,
                "Taking over an expired extraction claim"
            );
        }
        // Postgres keeps microseconds; the claim is compared after a round trip.
        call.extraction_started_at = Some(now.trunc_subsecs(6));
        ExtractionClaim::Run
    }

    /// Run extraction for a claimed call and record the result.
    ///
    /// Failures never propagate: they become `extraction_failed` on the call.
    pub async fn execute(&self, call: &mut Call, artifact: &mut CallArtifact, now: DateTime<Utc>) {
        match self.extract(call, artifact).await {
            Ok(result) => {
                let result = result.normalize_times(call.timezone.as_deref());
                artifact.answers_json = Some(result.to_json());
                if let Some(outcome) = &result.outcome {
                    call.record_reservation_outcome(outcome);
                }
                call.clear_failure();
                tracing::info!(
                    provider_call_id = %call.provider_call_id,
                    answers = result.answers.len(),
                    reservation_status = ?call.reservation_status,
                    "Extraction stored"
                );
            }
            Err(e) => {
                artifact.clear_answers();
                call.set_failure(FailureReason::ExtractionFailed, Some(e.to_string()));
                call.repair_stuck_reservation(FailureReason::ExtractionFailed);
                tracing::warn!(
                    provider_call_id = %call.provider_call_id,
                    error = %e,
                    "Extraction failed"
                );
            }
        }

        call.is_extracting = false;
        call.extraction_started_at = None;
        call.updated_at = now;
        artifact.updated_at = now;
    }

    /// Copy what `execute` wrote onto freshly loaded rows.
    ///
    /// Returns false when the fresh call no longer carries `claimed_at`, in
    /// which case someone else owns the call now and the results are dropped.
    pub fn carry_over(
        &self,
        result: (&Call, &CallArtifact),
        fresh: (&mut Call, &mut CallArtifact),
        claimed_at: DateTime<Utc>,
    ) -> bool {
        let (call, artifact) = result;
        let (fresh_call, fresh_artifact) = fresh;
        if fresh_call.extraction_started_at != Some(claimed_at) {
            return false;
        }

        fresh_call.is_extracting = call.is_extracting;
        fresh_call.extraction_started_at = None;
        fresh_call.reservation_status = call.reservation_status;
        fresh_call.reservation_result = call.reservation_result.clone();
        fresh_call.failure_reason = call.failure_reason.clone();
        fresh_call.failure_details = call.failure_details.clone();
        fresh_call.updated_at = call.updated_at;
        fresh_artifact.answers_json = artifact.answers_json.clone();
        fresh_artifact.updated_at = artifact.updated_at;
        true
    }

    async fn extract(
        &self,
        call: &Call,
        artifact: &CallArtifact,
    ) -> Result<ExtractionResult, DomainError> {
        let transcript = format_transcript(&artifact.stored_turns(), artifact.transcript_text.as_deref())
            .ok_or_else(|| DomainError::Validation("No transcript stored for extraction".to_string()))?;
        let provider = self.provider.as_ref().ok_or_else(|| {
            DomainError::ExternalService("No extraction provider configured".to_string())
        })?;

        let context = ExtractionContext::for_call(call, transcript);
        let messages = vec![
            ChatMessage::system(context.system_prompt()),
            ChatMessage::user(context.user_prompt()),
        ];

        tracing::debug!(
            provider_call_id = %call.provider_call_id,
            provider = provider.provider_name(),
            model = provider.model_id(),
            questions = context.questions.len(),
            "Requesting extraction"
        );

        let response = tokio::time::timeout(
            self.timeout,
            provider.complete(&messages, &CompletionOptions::default()),
        )
        .await
        .map_err(|_| DomainError::Timeout(self.timeout.as_millis() as u64))??;

        tracing::debug!(
            provider_call_id = %call.provider_call_id,
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            total_tokens = response.usage.total_tokens,
            finish_reason = ?response.finish_reason,
            "Extraction response received"
        );
        if response.finish_reason.as_deref() == Some("length") {
            return Err(DomainError::ExternalService(format!(
                "Extraction output truncated after {} completion tokens",
                response.usage.completion_tokens
            )));
        }

        parse_extraction(&response.content, call.call_intent)
    }
}
