//! Provider webhook signatures
//!
//! Header format: `x-call-signature: v=<unix-ms>,d=<hex>` where
//! `d = hex(HMAC-SHA256(secret, raw_body || <unix-ms>))`. The digest covers the
//! raw request bytes, so verification must happen before any parsing.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-call-signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,
    #[error("malformed signature header")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Stale,
    #[error("signature mismatch")]
    Mismatch,
}

#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance: Duration,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    /// Verify `header` against the raw body, in constant time.
    pub fn verify(
        &self,
        body: &[u8],
        header: Option<&str>,
        now_ms: i64,
    ) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::Missing)?;
        let (timestamp, digest) = parse_header(header).ok_or(SignatureError::Malformed)?;

        let ts_ms = timestamp
            .parse::<i64>()
            .map_err(|_| SignatureError::Malformed)?;
        let skew = now_ms.abs_diff(ts_ms);
        if u128::from(skew) > self.tolerance.as_millis() {
            return Err(SignatureError::Stale);
        }

        let expected = hex::decode(digest).map_err(|_| SignatureError::Malformed)?;
        let mut mac = self.mac().ok_or(SignatureError::Mismatch)?;
        mac.update(body);
        mac.update(timestamp.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Produce a header value for `body` at `ts_ms`.
    pub fn sign(&self, body: &[u8], ts_ms: i64) -> Option<String> {
        let timestamp = ts_ms.to_string();
        let mut mac = self.mac()?;
        mac.update(body);
        mac.update(timestamp.as_bytes());
        Some(format!(
            "v={timestamp},d={}",
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    fn mac(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.as_bytes()).ok()
    }
}

/// Split `v=<ts>,d=<hex>` in either order.
fn parse_header(header: &str) -> Option<(&str, &str)> {
    let mut timestamp = None;
    let mut digest = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("v", value)) => timestamp = Some(value.trim()),
            Some(("d", value)) => digest = Some(value.trim()),
            _ => {}
        }
    }
    Some((timestamp?, digest?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_769_472_000_000;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new("test-secret", Duration::from_secs(300))
    }

    #[test]
    fn test_signed_body_verifies() {
        let body = br#"{"event":"call_ended","call":{"call_id":"c1"}}"#;
        let header = verifier().sign(body, NOW).unwrap();
        assert!(header.starts_with(&format!("v={NOW},d=")));
        assert_eq!(verifier().verify(body, Some(&header), NOW + 1_000), Ok(()));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let header = verifier().sign(b"{\"a\":1}", NOW).unwrap();
        assert_eq!(
            verifier().verify(b"{\"a\":2}", Some(&header), NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let header = SignatureVerifier::new("other", Duration::from_secs(300))
            .sign(b"{}", NOW)
            .unwrap();
        assert_eq!(verifier().verify(b"{}", Some(&header), NOW), Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let header = verifier().sign(b"{}", NOW).unwrap();
        assert_eq!(
            verifier().verify(b"{}", Some(&header), NOW + 301_000),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn test_missing_or_garbled_header() {
        assert_eq!(verifier().verify(b"{}", None, NOW), Err(SignatureError::Missing));
        for header in ["", "sha256=abc", "v=abc,d=00", "v=1,d=not-hex", "d=00"] {
            assert!(verifier().verify(b"{}", Some(header), NOW).is_err(), "{header}");
        }
    }
}
