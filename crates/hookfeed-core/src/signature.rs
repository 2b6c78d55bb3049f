//! Webhook signature verification
//!
//! GitHub signs every delivery with HMAC-SHA256 over the raw request body and
//! sends the digest as `sha256=<hex>`. Verification must run on the exact bytes
//! received, before any parsing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix identifying the digest algorithm in the signature header.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Returns true when `presented_signature` is a valid `sha256=` HMAC of
/// `raw_payload` under `shared_secret`.
///
/// The digest comparison is constant-time.
pub fn verify(raw_payload: &[u8], presented_signature: &str, shared_secret: &[u8]) -> bool {
    let Some(hex_digest) = presented_signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    let Ok(presented) = hex::decode(hex_digest) else {
        return false;
    };

    // HMAC accepts keys of any length
    let Ok(mut mac) = HmacSha256::new_from_slice(shared_secret) else {
        return false;
    };
    mac.update(raw_payload);
    mac.verify_slice(&presented).is_ok()
}

/// Produce the `sha256=<hex>` header value for a payload.
pub fn sign(raw_payload: &[u8], shared_secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(shared_secret)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(raw_payload);
    format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    )
}
