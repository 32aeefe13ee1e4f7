//! Webhook signatures in the `t=<unix>,v1=<hex>` header format.
//!
//! The signed payload is `"{t}.{raw body}"`, MACed with HMAC-SHA256 under the
//! shared webhook secret. Verification works on the exact bytes received;
//! a re-serialized body would not reproduce the signature.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Header the gateway puts the signature in
pub const SIGNATURE_HEADER: &str = "stripe-signature";

const SCHEME: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    Malformed,

    #[error("no signature matches the payload")]
    Mismatch,

    #[error("signature timestamp is outside the tolerance window")]
    Expired,
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Header value signing `payload` at `timestamp`
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let digest = mac_for(secret, timestamp, payload).finalize().into_bytes();
    format!("t={},{}={}", timestamp, SCHEME, hex::encode(digest))
}

/// Check `header` against `payload`
///
/// Any one matching `v1` entry is enough, so secrets can be rotated. The
/// comparison is constant-time.
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            SCHEME => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }

    let matched = candidates.iter().any(|candidate| match hex::decode(candidate) {
        Ok(bytes) => mac_for(secret, timestamp, payload).verify_slice(&bytes).is_ok(),
        Err(_) => false,
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    let tolerance = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
    if now.saturating_sub(timestamp).abs() > tolerance {
        return Err(SignatureError::Expired);
    }
    Ok(())
}
