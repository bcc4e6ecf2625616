//! Tablecall Data Models
//!
//! - Webhook: provider envelope and acknowledgement bodies

mod webhook;

pub use webhook::*;
