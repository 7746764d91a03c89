// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth `state` parameter.
//!
//! Wire format: base64url(`nonce|timestamp_hex|signature_hex`), where the
//! signature is HMAC-SHA256 over `nonce|timestamp_hex`. The nonce is also
//! stored in a callback-scoped cookie so a state minted for one browser
//! cannot complete a sign-in in another.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// How long a sign-in attempt may take, in milliseconds.
pub const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

const NONCE_BYTES: usize = 16;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> anyhow::Result<u128> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis())
}

/// Fresh random hex nonce.
pub fn generate_nonce() -> anyhow::Result<String> {
    let mut bytes = [0u8; NONCE_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| anyhow::anyhow!("system random source unavailable"))?;
    Ok(hex::encode(bytes))
}

fn signature(payload: &str, secret: &[u8]) -> anyhow::Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("HMAC init failed: {}", e))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a signed state carrying `nonce` issued at `issued_at_ms`.
pub fn sign_state(nonce: &str, issued_at_ms: u128, secret: &[u8]) -> anyhow::Result<String> {
    let payload = format!("{}|{:x}", nonce, issued_at_ms);
    let signed = format!("{}|{}", payload, signature(&payload, secret)?);
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify signature and age; returns the embedded nonce.
pub fn verify_state(state: &str, secret: &[u8], now_ms: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }
    let (nonce, timestamp_hex, signature_hex) = (parts[0], parts[1], parts[2]);

    let payload = format!("{}|{}", nonce, timestamp_hex);
    let expected = signature(&payload, secret).ok()?;
    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_at = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if issued_at > now_ms || now_ms - issued_at > STATE_MAX_AGE_MS {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(nonce.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"secret_key";
    const ISSUED: u128 = 1_700_000_000_000;

    #[test]
    fn test_verify_state_success() {
        let state = sign_state("abc123", ISSUED, SECRET).unwrap();
        assert_eq!(
            verify_state(&state, SECRET, ISSUED + 1_000),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_verify_state_invalid_signature() {
        let forged = URL_SAFE_NO_PAD.encode(format!("abc123|{:x}|deadbeef", ISSUED));
        assert_eq!(verify_state(&forged, SECRET, ISSUED), None);
    }

    #[test]
    fn test_verify_state_wrong_secret() {
        let state = sign_state("abc123", ISSUED, SECRET).unwrap();
        assert_eq!(verify_state(&state, b"wrong_key", ISSUED), None);
    }

    #[test]
    fn test_verify_state_expired() {
        let state = sign_state("abc123", ISSUED, SECRET).unwrap();
        assert_eq!(
            verify_state(&state, SECRET, ISSUED + STATE_MAX_AGE_MS + 1),
            None
        );
        // Issued in the future
        assert_eq!(verify_state(&state, SECRET, ISSUED - 1), None);
    }

    #[test]
    fn test_verify_state_malformed() {
        let encoded_state = URL_SAFE_NO_PAD.encode("invalid|format");
        assert_eq!(verify_state(&encoded_state, SECRET, ISSUED), None);
        assert_eq!(verify_state("not base64!!", SECRET, ISSUED), None);
    }

    #[test]
    fn test_generate_nonce_is_random_hex() {
        let a = generate_nonce().unwrap();
        let b = generate_nonce().unwrap();
        assert_eq!(a.len(), NONCE_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
