use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::crypto::secret::Secret;
use crate::error::{Result, SessionError};

type HmacSha256 = Hmac<Sha256>;

/// Separator between the value and its signature.
const SEPARATOR: char = '.';

/// Computes the unpadded base64 HMAC-SHA256 of `value` under `secret`.
fn mac(value: &str, secret: &Secret) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SessionError::Configuration(format!("HMAC key error: {}", e)))?;
    mac.update(value.as_bytes());

    Ok(general_purpose::STANDARD_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Signs a value, producing `value.signature`.
///
/// The output is byte-compatible with the `cookie-signature` format used by
/// express-style session cookies.
///
/// # Arguments
///
/// * `value` - The value to sign, typically a session id.
/// * `secret` - The signing secret.
pub fn sign(value: &str, secret: &Secret) -> Result<String> {
    let signature = mac(value, secret)?;
    Ok(format!("{}{}{}", value, SEPARATOR, signature))
}

/// Verifies a signed value and returns the original value.
///
/// # Returns
///
/// `Some(value)` if the signature matches, `None` if the input is malformed
/// or was signed with a different secret.
pub fn unsign(signed: &str, secret: &Secret) -> Option<String> {
    let (value, _) = signed.rsplit_once(SEPARATOR)?;
    let expected = sign(value, secret).ok()?;

    if expected.as_bytes().ct_eq(signed.as_bytes()).into() {
        Some(value.to_string())
    } else {
        None
    }
}
