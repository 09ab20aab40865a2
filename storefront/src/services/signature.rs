// storefront/src/services/signature.rs

//! HMAC-SHA512 webhook signatures, hex encoded, keyed with the gateway secret.

use crate::errors::{AppError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

fn keyed(secret: &str) -> Result<HmacSha512> {
  HmacSha512::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Internal(format!("Invalid HMAC key: {}", e)))
}

pub fn sign(secret: &str, payload: &[u8]) -> Result<String> {
  let mut mac = keyed(secret)?;
  mac.update(payload);
  Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `signature_hex` against the exact `payload` bytes in constant time.
pub fn verify(secret: &str, payload: &[u8], signature_hex: &str) -> Result<()> {
  let expected = hex::decode(signature_hex.trim()).map_err(|_| AppError::InvalidSignature)?;
  let mut mac = keyed(secret)?;
  mac.update(payload);
  mac.verify_slice(&expected).map_err(|_| AppError::InvalidSignature)
}
