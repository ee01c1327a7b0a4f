//! Deterministic keys derived from URLs and client addresses.

use sha2::{Digest, Sha256};

const LOCK_KEY_PREFIX: &str = "page_metrics_storage_lock_";

/// Storage slug for a URL: hex-encoded SHA-256 of the URL bytes.
pub fn url_slug(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Storage lock key for a client address.
///
/// The address is whatever the caller could best determine (a forwarded-for
/// header or the peer IP). It is trivially spoofable and only serves as a
/// coarse rate limit, never as an identity.
pub fn client_lock_key(address: &str) -> String {
    format!("{LOCK_KEY_PREFIX}{}", hex::encode(Sha256::digest(address.as_bytes())))
}
