//! Webhook Application Service (Use Case)
//!
//! One provider delivery, end to end: verify, type, classify, plan, apply,
//! persist, and extract when the plan asks for it. Deliveries for the same
//! call are serialized in-process; writes are guarded by the call revision
//! and replanned against fresh state on conflict.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use tablecall::{
    plan_transition, Call, CallArtifact, CallEvent, CallRepository, DomainError,
    ExtractionProvider, OutcomeClassifier, TransitionKind,
};

use super::extraction_service::{ExtractionClaim, ExtractionService};
use super::locks::CallLocks;
use crate::models::{InboundEvent, ProviderWebhook};
use crate::signature::{SignatureError, SignatureVerifier};

/// Save attempts per delivery before giving up on a contended call
const MAX_SAVE_ATTEMPTS: usize = 3;

/// Rejections that must not touch any state
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] SignatureError),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Result of an accepted delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Planned and, unless the plan was a no-op, persisted
    Processed(TransitionKind),
    /// Acknowledged without looking further
    Ignored(&'static str),
    /// Storage failed; logged and acknowledged anyway
    StorageFailure,
}

/// Application service for provider webhooks
pub struct WebhookService<R, P>
where
    R: CallRepository + ?Sized,
    P: ExtractionProvider + ?Sized,
{
    repo: Arc<R>,
    verifier: SignatureVerifier,
    classifier: OutcomeClassifier,
    extraction: ExtractionService<P>,
    locks: CallLocks,
}

impl<R, P> WebhookService<R, P>
where
    R: CallRepository + ?Sized,
    P: ExtractionProvider + ?Sized,
{
    pub fn new(
        repo: Arc<R>,
        verifier: SignatureVerifier,
        classifier: OutcomeClassifier,
        extraction: ExtractionService<P>,
    ) -> Self {
        Self {
            repo,
            verifier,
            classifier,
            extraction,
            locks: CallLocks::new(),
        }
    }

    /// Handle one raw delivery.
    pub async fn handle(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, IngestError> {
        if let Err(e) = self
            .verifier
            .verify(body, signature, Utc::now().timestamp_millis())
        {
            tracing::warn!(error = %e, "Rejected webhook signature");
            return Err(e.into());
        }

        let raw: Value =
            serde_json::from_slice(body).map_err(|e| IngestError::Malformed(e.to_string()))?;
        let envelope: ProviderWebhook = serde_json::from_value(raw.clone())
            .map_err(|e| IngestError::Malformed(e.to_string()))?;

        let event = match envelope.into_event() {
            InboundEvent::Event(event) => event,
            InboundEvent::MissingCallId => {
                tracing::info!("Webhook without call_id ignored");
                return Ok(WebhookOutcome::Ignored("missing_call_id"));
            }
            InboundEvent::UnsupportedEvent(name) => {
                tracing::debug!(event = %name, "Unsupported webhook event ignored");
                return Ok(WebhookOutcome::Ignored("unsupported_event"));
            }
        };

        match self.process(&event, raw).await {
            Ok(outcome) => {
                tracing::info!(
                    provider_call_id = %event.provider_call_id,
                    event = %event.kind,
                    outcome = ?outcome,
                    "Webhook handled"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(
                    provider_call_id = %event.provider_call_id,
                    event = %event.kind,
                    error = %e,
                    "Failed to persist webhook"
                );
                Ok(WebhookOutcome::StorageFailure)
            }
        }
    }

    async fn process(&self, event: &CallEvent, raw: Value) -> Result<WebhookOutcome, DomainError> {
        let _guard = self.locks.acquire(&event.provider_call_id).await;

        let classification = event
            .kind
            .is_completion()
            .then(|| self.classifier.classify(event));

        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let Some((mut call, mut artifact)) = self.load(&event.provider_call_id).await? else {
                tracing::info!(
                    provider_call_id = %event.provider_call_id,
                    "Webhook for unknown call ignored"
                );
                return Ok(WebhookOutcome::Ignored("unknown_call"));
            };

            let now = Utc::now();
            let transcript_available = event.has_transcript() || artifact.has_transcript();
            let plan = plan_transition(&call, event, classification.as_ref(), transcript_available);
            if plan.is_noop() {
                tracing::debug!(
                    provider_call_id = %call.provider_call_id,
                    status = %call.status,
                    reason = plan.reason,
                    "Nothing to do"
                );
                return Ok(WebhookOutcome::Processed(TransitionKind::Noop));
            }

            plan.apply(&mut call, &mut artifact, event, now);
            artifact.raw_payload = Some(raw.clone());

            let claim = match plan.extraction() {
                Some(corrective) => {
                    match self.extraction.prepare(&mut call, &artifact, corrective, now) {
                        ExtractionClaim::InProgress => {
                            tracing::info!(
                                provider_call_id = %call.provider_call_id,
                                "Extraction already running elsewhere; delivery dropped"
                            );
                            return Ok(WebhookOutcome::Processed(TransitionKind::Noop));
                        }
                        claim => Some(claim),
                    }
                }
                None => None,
            };

            let saved = match self.repo.save(&call, &artifact).await {
                Ok(saved) => saved,
                Err(e) if e.is_conflict() && attempt < MAX_SAVE_ATTEMPTS => {
                    tracing::warn!(
                        provider_call_id = %call.provider_call_id,
                        attempt,
                        "Call changed underneath us; replanning"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            tracing::info!(
                provider_call_id = %saved.provider_call_id,
                event = %plan.event,
                from = %plan.from,
                to = %plan.to,
                kind = ?plan.kind,
                reason = plan.reason,
                decided_by = ?classification.as_ref().and_then(|c| c.decided_by),
                "Transition applied"
            );

            if claim == Some(ExtractionClaim::Run) {
                if let Some(claimed_at) = saved.extraction_started_at {
                    self.run_extraction(saved, artifact, claimed_at).await?;
                }
            }
            return Ok(WebhookOutcome::Processed(plan.kind));
        }

        Err(DomainError::Conflict(format!(
            "call {} still contended after {MAX_SAVE_ATTEMPTS} attempts",
            event.provider_call_id
        )))
    }

    /// Extract for a persisted claim, then write the result back.
    async fn run_extraction(
        &self,
        mut call: Call,
        mut artifact: CallArtifact,
        claimed_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.extraction
            .execute(&mut call, &mut artifact, Utc::now())
            .await;

        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let err = match self.repo.save(&call, &artifact).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_conflict() && attempt < MAX_SAVE_ATTEMPTS => e,
                Err(e) => return Err(e),
            };

            let Some((mut fresh, mut fresh_artifact)) = self.load(&call.provider_call_id).await?
            else {
                return Err(err);
            };
            if !self.extraction.carry_over(
                (&call, &artifact),
                (&mut fresh, &mut fresh_artifact),
                claimed_at,
            ) {
                tracing::warn!(
                    provider_call_id = %call.provider_call_id,
                    "Extraction claim lost; discarding results"
                );
                return Ok(());
            }
            call = fresh;
            artifact = fresh_artifact;
        }

        Ok(())
    }

    async fn load(
        &self,
        provider_call_id: &str,
    ) -> Result<Option<(Call, CallArtifact)>, DomainError> {
        let Some(call) = self.repo.find_by_provider_id(provider_call_id).await? else {
            return Ok(None);
        };
        let artifact = self
            .repo
            .find_artifact(call.id)
            .await?
            .unwrap_or_else(|| CallArtifact::new(call.id));
        Ok(Some((call, artifact)))
    }
}
