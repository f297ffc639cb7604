//! HMAC-SHA256 signing of cookie values.
//!
//! A signed value has the form `value.signature`, where the signature is the
//! standard-alphabet base64 of `HMAC-SHA256(secret, value)` with padding removed.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CookieError;

type HmacSha256 = Hmac<Sha256>;

/// Standard alphabet, accepting input with or without trailing `=`.
pub(crate) const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Append an HMAC-SHA256 signature of `value` to it.
pub fn sign(value: &str, secret: &str) -> Result<String, CookieError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| CookieError::InvalidSecret)?;
    mac.update(value.as_bytes());
    let signature = STANDARD_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{value}.{signature}"))
}

/// Verify a signed value against `secret`, returning the unsigned part.
///
/// Returns `None` when the value carries no signature or the signature does
/// not match.
pub fn unsign<'a>(signed: &'a str, secret: &str) -> Option<&'a str> {
    let (value, signature) = signed.rsplit_once('.')?;
    let signature = LENIENT.decode(signature).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(value.as_bytes());
    mac.verify_slice(&signature).ok()?;
    Some(value)
}
