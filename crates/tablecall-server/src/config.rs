//! Server configuration
//!
//! Read from the Shuttle secret store at startup. Lookups go through a
//! closure so the parsing rules can be tested without a secret store.

use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::adapters::openai::DEFAULT_BASE_URL;

pub const DEFAULT_EXTRACTION_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Shared secret for provider webhook signatures
    pub webhook_secret: String,
    pub signature_tolerance: Duration,
    /// Without a key, extraction fails fast
    pub openai_api_key: Option<String>,
    pub extraction_model: String,
    pub extraction_base_url: String,
    pub extraction_timeout: Duration,
    /// How long an extraction claim blocks redeliveries
    pub extraction_lease: Duration,
    pub human_min_duration_ms: u64,
}

impl AppConfig {
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str, default: u64| -> anyhow::Result<u64> {
            match get(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a whole number, got {raw:?}")),
                None => Ok(default),
            }
        };

        let webhook_secret = get("PROVIDER_WEBHOOK_SECRET")
            .ok_or_else(|| anyhow!("PROVIDER_WEBHOOK_SECRET is required"))?;

        Ok(Self {
            webhook_secret,
            signature_tolerance: Duration::from_secs(number("SIGNATURE_TOLERANCE_SECS", 300)?),
            openai_api_key: get("OPENAI_API_KEY"),
            extraction_model: get("EXTRACTION_MODEL")
                .unwrap_or_else(|| DEFAULT_EXTRACTION_MODEL.to_string()),
            extraction_base_url: get("EXTRACTION_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            extraction_timeout: Duration::from_millis(number("EXTRACTION_TIMEOUT_MS", 20_000)?),
            extraction_lease: Duration::from_secs(number("EXTRACTION_LEASE_SECS", 120)?),
            human_min_duration_ms: number("HUMAN_MIN_DURATION_MS", 5_000)?,
        })
    }
}
