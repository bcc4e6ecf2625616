//! Tablecall API Routes
//!
//! - /webhooks/provider - Voice provider lifecycle webhooks
//! - /swagger-ui - OpenAPI documentation

pub mod swagger;
pub mod webhook;
