//! Application Layer (Use Cases)
//!
//! Orchestrates domain operations and coordinates between
//! repositories and external services.

mod extraction_service;
mod locks;
#[cfg(test)]
pub(crate) mod testing;
mod webhook_service;

pub use extraction_service::ExtractionService;
pub use webhook_service::{IngestError, WebhookOutcome, WebhookService};
