//! Domain Services
//!
//! Pure decision logic: outcome classification, status transition planning,
//! and the extraction contract (prompting, validation, normalization).

pub mod classifier;
pub mod datetime;
pub mod extraction;
pub mod questions;
pub mod transcript;
pub mod transition;

pub use classifier::{Classification, ClassifierConfig, Evidence, OutcomeClassifier, Rule, Verdict};
pub use datetime::normalize_local_datetime;
pub use extraction::{parse_extraction, ExtractedAnswer, ExtractionContext, ExtractionResult};
pub use questions::{preset_question, questions_asked};
pub use transcript::{format_transcript, parse_text_turns};
pub use transition::{plan_transition, TransitionAction, TransitionKind, TransitionPlan};
