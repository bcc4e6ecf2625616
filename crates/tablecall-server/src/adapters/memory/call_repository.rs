//! In-memory implementation of CallRepository
//!
//! Same revision-guard semantics as the Postgres adapter, plus a write
//! counter so tests can assert that duplicate deliveries wrote nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use tablecall::{Call, CallArtifact, CallRepository, DomainError};

#[derive(Default)]
pub struct InMemoryCallRepository {
    rows: Mutex<HashMap<Uuid, (Call, CallArtifact)>>,
    writes: AtomicUsize,
}

impl InMemoryCallRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a call and an empty artifact, the way intake does
    pub fn insert(&self, call: Call) -> Call {
        let artifact = CallArtifact::new(call.id);
        self.lock().insert(call.id, (call.clone(), artifact));
        call
    }

    pub fn get(&self, provider_call_id: &str) -> Option<(Call, CallArtifact)> {
        self.lock()
            .values()
            .find(|(call, _)| call.provider_call_id == provider_call_id)
            .cloned()
    }

    /// Successful saves so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, (Call, CallArtifact)>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CallRepository for InMemoryCallRepository {
    async fn find_by_provider_id(
        &self,
        provider_call_id: &str,
    ) -> Result<Option<Call>, DomainError> {
        Ok(self.get(provider_call_id).map(|(call, _)| call))
    }

    async fn find_artifact(&self, call_id: Uuid) -> Result<Option<CallArtifact>, DomainError> {
        Ok(self.lock().get(&call_id).map(|(_, artifact)| artifact.clone()))
    }

    async fn save(&self, call: &Call, artifact: &CallArtifact) -> Result<Call, DomainError> {
        let mut rows = self.lock();
        let (stored, stored_artifact) = rows
            .get_mut(&call.id)
            .ok_or_else(|| DomainError::not_found("call", call.id))?;

        if stored.revision != call.revision {
            return Err(DomainError::Conflict(format!(
                "call {} changed since revision {}",
                call.id, call.revision
            )));
        }

        let mut saved = call.clone();
        saved.revision += 1;
        *stored = saved.clone();
        *stored_artifact = artifact.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablecall::CallIntent;

    #[tokio::test]
    async fn test_stale_revision_is_rejected() {
        let repo = InMemoryCallRepository::new();
        let call = repo.insert(Call::new("call_1", CallIntent::QuestionsOnly));
        let artifact = CallArtifact::new(call.id);

        let saved = repo.save(&call, &artifact).await.unwrap();
        assert_eq!(saved.revision, 1);

        let err = repo.save(&call, &artifact).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.writes(), 1);
    }
}
