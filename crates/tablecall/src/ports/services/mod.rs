//! Service Ports
//!
//! Abstract interfaces for external services.

mod extraction_provider;

pub use extraction_provider::*;
