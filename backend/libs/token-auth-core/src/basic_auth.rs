//! Basic scheme credential codec (`user:password` <-> base64)

use crate::error::{AuthError, AuthResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};

pub fn encode_basic(user: &str, password: &str) -> String {
    STANDARD.encode(format!("{user}:{password}"))
}

/// Decode a Basic credential into `(user, password)`.
///
/// The decoded value is split on the first `:` only, so passwords may contain
/// colons and either side may be empty.
pub fn decode_basic(token: &str) -> AuthResult<(String, String)> {
    let decoded = STANDARD
        .decode(token)
        .map_err(|_| AuthError::InvalidBase64)?;
    let credentials = String::from_utf8(decoded).map_err(|_| AuthError::InvalidBase64)?;

    let (user, password) = credentials
        .split_once(':')
        .ok_or(AuthError::MissingSeparator)?;

    Ok((user.to_string(), password.to_string()))
}
