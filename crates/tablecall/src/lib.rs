//! Tablecall Domain Library
//!
//! Core domain types and interfaces for the outbound call lifecycle:
//! webhook events from the voice provider, human/voicemail classification,
//! forward-only status transitions and transcript extraction contracts.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain/`): Pure business entities and logic
//!   - `entities/`: Core domain models (Call, CallArtifact, CallEvent)
//!   - `value_objects/`: Immutable value types (CallStatus, CallIntent, ...)
//!   - `services/`: Pure domain services (classifier, transitions, extraction)
//!   - `errors/`: Domain-specific error types
//!
//! - **Ports** (`ports/`): Abstract interfaces (traits)
//!   - `repositories/`: Call state store
//!   - `services/`: Extraction (structured-output LLM) provider
//!
//! # Usage
//!
//! ```rust,ignore
//! use tablecall::domain::{Call, CallEvent, OutcomeClassifier, plan_transition};
//! use tablecall::ports::{CallRepository, ExtractionProvider};
//! ```

pub mod domain;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    plan_transition, Call, CallArtifact, CallEvent, CallEventKind, CallIntent, CallStatus,
    Classification, ClassifierConfig, DomainError, ExtractionContext, ExtractionResult,
    FailureReason, OutcomeClassifier, ReservationOutcome, ReservationRequest, ReservationStatus,
    Speaker, TranscriptTurn, TransitionAction, TransitionKind, TransitionPlan,
};
pub use ports::{
    CallRepository, ChatMessage, CompletionOptions, CompletionResponse, ExtractionProvider,
    MessageRole, TokenUsage,
};
