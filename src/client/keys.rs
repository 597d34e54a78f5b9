//! Key material for the local session cache.
//!
//! Both the encryption key and the signing key are derived from the device
//! fingerprint and are never written anywhere. Copy the cache file to
//! another machine and the fingerprint — and therefore the keys — change,
//! so the blob cannot be decrypted, let alone re-signed.

use std::num::NonZeroU32;

use chrono::NaiveDateTime;
use hmac::{Hmac, Mac};
use ring::pbkdf2;
use sha2::Sha256;

use crate::error::AuthError;
use crate::fingerprint::DeviceId;

type HmacSha256 = Hmac<Sha256>;

/// Application-scoped PBKDF2 salt. Fixed by design: the derivation input
/// (the device fingerprint) is what varies per machine.
const CACHE_KEY_SALT: &[u8] = b"tether-auth.cache.v1";

/// Label mixed into the encryption-key derivation input.
const ENCRYPTION_LABEL: &str = "session-cache-encryption";

/// Label mixed into the signing-key derivation input. Distinct from the
/// encryption label so the two keys are independent.
const SIGNING_LABEL: &str = "session-cache-signing";

const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derive the 256-bit AES key that encrypts the cache blob.
pub fn derive_cache_key(device_id: &DeviceId) -> [u8; 32] {
    derive(device_id, ENCRYPTION_LABEL)
}

/// Derive the HMAC key that signs the cached record.
pub fn derive_signing_key(device_id: &DeviceId) -> [u8; 32] {
    derive(device_id, SIGNING_LABEL)
}

fn derive(device_id: &DeviceId, label: &str) -> [u8; 32] {
    let input = format!("{}:{}", device_id.as_str(), label);
    let mut key = [0u8; 32];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        NonZeroU32::new(PBKDF2_ITERATIONS).expect("iterations is non-zero"),
        CACHE_KEY_SALT,
        input.as_bytes(),
        &mut key,
    );
    key
}

/// Canonical string covered by the record signature. Field order is part
/// of the format; changing it invalidates existing caches.
fn canonical_record(
    token: &str,
    user_id: i32,
    expires_at: NaiveDateTime,
    device_id: &DeviceId,
) -> String {
    format!(
        "{}|{}|{}|{}",
        token,
        user_id,
        expires_at.and_utc().timestamp(),
        device_id.as_str()
    )
}

/// HMAC-SHA256 signature over the canonical record, hex-encoded.
pub fn sign_record(
    token: &str,
    user_id: i32,
    expires_at: NaiveDateTime,
    device_id: &DeviceId,
) -> Result<String, AuthError> {
    let key = derive_signing_key(device_id);
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| AuthError::Crypto(format!("failed to key hmac: {}", e)))?;
    mac.update(canonical_record(token, user_id, expires_at, device_id).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time verification of a record signature.
pub fn verify_record_signature(
    token: &str,
    user_id: i32,
    expires_at: NaiveDateTime,
    device_id: &DeviceId,
    signature_hex: &str,
) -> Result<bool, AuthError> {
    let Ok(signature) = hex::decode(signature_hex) else {
        return Ok(false);
    };
    let key = derive_signing_key(device_id);
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| AuthError::Crypto(format!("failed to key hmac: {}", e)))?;
    mac.update(canonical_record(token, user_id, expires_at, device_id).as_bytes());
    Ok(mac.verify_slice(&signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn keys_differ_per_device_and_per_label() {
        let a = DeviceId::new("aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa");
        let b = DeviceId::new("bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb");

        assert_ne!(derive_cache_key(&a), derive_cache_key(&b));
        assert_ne!(derive_cache_key(&a), derive_signing_key(&a));
        assert_eq!(derive_cache_key(&a), derive_cache_key(&a));
    }

    #[test]
    fn signature_round_trip_and_mismatch() {
        let device = DeviceId::new("aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa");
        let other = DeviceId::new("bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb");
        let expires = Utc::now().naive_utc();

        let sig = sign_record("tok", 7, expires, &device).unwrap();
        assert!(verify_record_signature("tok", 7, expires, &device, &sig).unwrap());
        assert!(!verify_record_signature("tok", 8, expires, &device, &sig).unwrap());
        assert!(!verify_record_signature("tok", 7, expires, &other, &sig).unwrap());
        assert!(!verify_record_signature("tok", 7, expires, &device, "zz-not-hex").unwrap());
    }
}
