//! Call Repository Port
//!
//! Call and artifact rows are created by intake; this core only reads them
//! and writes them back together.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, Call, CallArtifact};

/// Repository interface for calls and their artifacts
#[async_trait]
pub trait CallRepository: Send + Sync {
    /// Find a call by the id the voice provider assigned
    async fn find_by_provider_id(&self, provider_call_id: &str)
        -> Result<Option<Call>, DomainError>;

    /// Find the artifact paired with a call
    async fn find_artifact(&self, call_id: Uuid) -> Result<Option<CallArtifact>, DomainError>;

    /// Write a call and its artifact atomically.
    ///
    /// The write only succeeds when the stored revision still equals
    /// `call.revision`; otherwise it fails with [`DomainError::Conflict`] and
    /// nothing is written. Returns the call with its new revision.
    async fn save(&self, call: &Call, artifact: &CallArtifact) -> Result<Call, DomainError>;
}
