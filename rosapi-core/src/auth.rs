//! Legacy login challenge-response
//!
//! Devices older than the one-step cleartext login answer the first
//! `/login` with a hex challenge in the `ret` attribute. The client must
//! reply with an MD5 digest over the password and the challenge.

use md5::{Digest, Md5};

use crate::error::Result;

/// Compute the `response` attribute for a legacy login challenge
///
/// # Algorithm
///
/// 1. Hex-decode the challenge
/// 2. MD5 over `0x00 ‖ password ‖ challenge`
/// 3. Prefix the lowercase hex digest with `00`
///
/// # Arguments
///
/// * `password` - The user's password
/// * `challenge` - Hex string from the `ret` attribute
///
/// # Errors
///
/// Returns `Error::InvalidChallenge` if `challenge` is not valid hex.
///
/// # Examples
///
/// ```
/// use rosapi_core::auth;
///
/// let response = auth::challenge_response("admin", "ebddd18303a54111e2dea05a92ab46b4").unwrap();
/// assert_eq!(response.len(), 34);
/// assert!(response.starts_with("00"));
/// ```
pub fn challenge_response(password: &str, challenge: &str) -> Result<String> {
    let challenge = hex::decode(challenge)?;

    let mut hasher = Md5::new();
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    hasher.update(&challenge);
    let digest = hasher.finalize();

    Ok(format!("00{}", hex::encode(digest)))
}
