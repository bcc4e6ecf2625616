//! Test doubles shared by the application tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use tablecall::{
    Call, CallArtifact, CallRepository, ChatMessage, CompletionOptions, CompletionResponse,
    DomainError, ExtractionProvider, TokenUsage,
};

use crate::adapters::memory::InMemoryCallRepository;

/// Extraction provider that always answers with the same text
pub struct ScriptedProvider {
    reply: String,
    delay: Option<Duration>,
    finish_reason: String,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            delay: None,
            finish_reason: "stop".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn finishing_with(mut self, finish_reason: impl Into<String>) -> Self {
        self.finish_reason = finish_reason.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(messages.len(), 2, "system and user prompt expected");
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(CompletionResponse {
            content: self.reply.clone(),
            model: "scripted".to_string(),
            usage: TokenUsage {
                prompt_tokens: 400,
                completion_tokens: 60,
                total_tokens: 460,
            },
            finish_reason: Some(self.finish_reason.clone()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// Repository whose reads work and whose writes always fail
pub struct UnwritableRepository {
    inner: InMemoryCallRepository,
}

impl UnwritableRepository {
    pub fn seeded(call: Call) -> Self {
        let inner = InMemoryCallRepository::new();
        inner.insert(call);
        Self { inner }
    }
}

#[async_trait]
impl CallRepository for UnwritableRepository {
    async fn find_by_provider_id(
        &self,
        provider_call_id: &str,
    ) -> Result<Option<Call>, DomainError> {
        self.inner.find_by_provider_id(provider_call_id).await
    }

    async fn find_artifact(&self, call_id: Uuid) -> Result<Option<CallArtifact>, DomainError> {
        self.inner.find_artifact(call_id).await
    }

    async fn save(&self, _call: &Call, _artifact: &CallArtifact) -> Result<Call, DomainError> {
        Err(DomainError::Repository("connection reset by peer".to_string()))
    }
}
