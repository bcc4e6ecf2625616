//! Infrastructure Adapters
//!
//! Implementations of domain ports for external systems.

#[cfg(test)]
pub mod memory;
pub mod openai;
pub mod postgres;

// Re-exports
pub use openai::OpenAiExtractionProvider;
pub use postgres::PgCallRepository;
