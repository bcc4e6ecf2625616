//! PostgreSQL implementation of CallRepository

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tablecall::{Call, CallArtifact, CallRepository, DomainError, ReservationRequest};

/// PostgreSQL implementation of CallRepository
pub struct PgCallRepository {
    pool: PgPool,
}

impl PgCallRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct CallRow {
    id: Uuid,
    provider_call_id: String,
    status: String,
    is_extracting: bool,
    call_intent: String,
    reservation_status: Option<String>,
    reservation_result: Option<serde_json::Value>,
    failure_reason: Option<String>,
    failure_details: Option<String>,
    restaurant_name: Option<String>,
    timezone: Option<String>,
    reservation_request: Option<serde_json::Value>,
    question_presets: Vec<String>,
    custom_questions: Vec<String>,
    extraction_started_at: Option<chrono::DateTime<chrono::Utc>>,
    corrected_at: Option<chrono::DateTime<chrono::Utc>>,
    revision: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

// Text columns are checked by the schema, but intake writes them too.
impl TryFrom<CallRow> for Call {
    type Error = DomainError;

    fn try_from(row: CallRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt =
            |field: &str, e: String| DomainError::Repository(format!("call {id}: bad {field}: {e}"));

        let reservation_request = match row.reservation_request {
            Some(value) => Some(
                serde_json::from_value::<ReservationRequest>(value)
                    .map_err(|e| corrupt("reservation_request", e.to_string()))?,
            ),
            None => None,
        };
        let reservation_status = match row.reservation_status.as_deref() {
            Some(s) => Some(s.parse().map_err(|e| corrupt("reservation_status", e))?),
            None => None,
        };

        Ok(Self {
            id: row.id,
            status: row.status.parse().map_err(|e| corrupt("status", e))?,
            call_intent: row.call_intent.parse().map_err(|e| corrupt("call_intent", e))?,
            reservation_status,
            reservation_request,
            provider_call_id: row.provider_call_id,
            is_extracting: row.is_extracting,
            reservation_result: row.reservation_result,
            failure_reason: row.failure_reason,
            failure_details: row.failure_details,
            restaurant_name: row.restaurant_name,
            timezone: row.timezone,
            question_presets: row.question_presets,
            custom_questions: row.custom_questions,
            extraction_started_at: row.extraction_started_at,
            corrected_at: row.corrected_at,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CallArtifactRow {
    call_id: Uuid,
    transcript_text: Option<String>,
    transcript_json: Option<serde_json::Value>,
    answers_json: Option<serde_json::Value>,
    raw_payload: Option<serde_json::Value>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<CallArtifactRow> for CallArtifact {
    fn from(row: CallArtifactRow) -> Self {
        Self {
            call_id: row.call_id,
            transcript_text: row.transcript_text,
            transcript_json: row.transcript_json,
            answers_json: row.answers_json,
            raw_payload: row.raw_payload,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CallRepository for PgCallRepository {
    async fn find_by_provider_id(
        &self,
        provider_call_id: &str,
    ) -> Result<Option<Call>, DomainError> {
        let row = sqlx::query_as::<_, CallRow>("SELECT * FROM calls WHERE provider_call_id = $1")
            .bind(provider_call_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        row.map(Call::try_from).transpose()
    }

    async fn find_artifact(&self, call_id: Uuid) -> Result<Option<CallArtifact>, DomainError> {
        let row = sqlx::query_as::<_, CallArtifactRow>(
            "SELECT * FROM call_artifacts WHERE call_id = $1",
        )
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn save(&self, call: &Call, artifact: &CallArtifact) -> Result<Call, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        let reservation_request = call
            .reservation_request
            .as_ref()
            .and_then(|r| serde_json::to_value(r).ok());

        // Guarded on the revision we loaded; a concurrent writer bumps it first.
        let row = sqlx::query_as::<_, CallRow>(
            r#"
            UPDATE calls
            SET status = $3, is_extracting = $4, reservation_status = $5,
                reservation_result = $6, failure_reason = $7, failure_details = $8,
                reservation_request = $9, extraction_started_at = $10, corrected_at = $11,
                revision = revision + 1, updated_at = NOW()
            WHERE id = $1 AND revision = $2
            RETURNING *
            "#,
        )
        .bind(call.id)
        .bind(call.revision)
        .bind(call.status.as_str())
        .bind(call.is_extracting)
        .bind(call.reservation_status.map(|s| s.as_str()))
        .bind(&call.reservation_result)
        .bind(&call.failure_reason)
        .bind(&call.failure_details)
        .bind(reservation_request)
        .bind(call.extraction_started_at)
        .bind(call.corrected_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        let Some(row) = row else {
            return Err(DomainError::Conflict(format!(
                "call {} changed since revision {}",
                call.id, call.revision
            )));
        };

        sqlx::query(
            r#"
            INSERT INTO call_artifacts
                (call_id, transcript_text, transcript_json, answers_json, raw_payload, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (call_id) DO UPDATE
            SET transcript_text = EXCLUDED.transcript_text,
                transcript_json = EXCLUDED.transcript_json,
                answers_json = EXCLUDED.answers_json,
                raw_payload = EXCLUDED.raw_payload,
                updated_at = NOW()
            "#,
        )
        .bind(call.id)
        .bind(&artifact.transcript_text)
        .bind(&artifact.transcript_json)
        .bind(&artifact.answers_json)
        .bind(&artifact.raw_payload)
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::Repository(e.to_string()))?;

        Call::try_from(row)
    }
}
