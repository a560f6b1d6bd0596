//! Webhook authenticity: base64-encoded HMAC-SHA256 over the raw request body.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing")]
    Missing,
    #[error("signature header is not valid base64")]
    Malformed,
    #[error("signature does not match request body")]
    Mismatch,
    #[error("webhook secret cannot be used as an hmac key")]
    InvalidKey,
}

pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Compares in constant time via `Mac::verify_slice`.
pub fn verify(secret: &[u8], body: &[u8], claimed: Option<&str>) -> Result<(), SignatureError> {
    let claimed = claimed.map(str::trim).filter(|value| !value.is_empty());
    let Some(claimed) = claimed else {
        return Err(SignatureError::Missing);
    };
    let claimed_bytes = STANDARD.decode(claimed).map_err(|_| SignatureError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(body);
    mac.verify_slice(&claimed_bytes).map_err(|_| SignatureError::Mismatch)
}
