//! `Authorization` header scheme parsing
//!
//! Splits a raw header value of the form `<Scheme> <credential>` into an
//! [`AuthTokenType`] and the credential string. Scheme names are matched
//! case-insensitively; the credential keeps its internal whitespace.

use crate::error::{AuthError, AuthResult};
use std::fmt;
use std::str::FromStr;

/// Metadata / header key carrying the credential
pub const AUTHORIZATION_HEADER: &str = "authorization";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthTokenType {
    #[default]
    Unknown,
    Basic,
    Bearer,
}

impl AuthTokenType {
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthTokenType::Unknown => "Unknown",
            AuthTokenType::Basic => "Basic",
            AuthTokenType::Bearer => "Bearer",
        }
    }

    /// Format an outbound header value, e.g. `Bearer eyJ...`
    pub fn header_value(&self, credential: &str) -> String {
        format!("{} {}", self.scheme(), credential)
    }
}

impl fmt::Display for AuthTokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for AuthTokenType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("basic") {
            Ok(AuthTokenType::Basic)
        } else if s.eq_ignore_ascii_case("bearer") {
            Ok(AuthTokenType::Bearer)
        } else {
            Err(AuthError::InvalidScheme)
        }
    }
}

/// Parse a raw `Authorization` header value.
///
/// The whole value is trimmed, split on the first space, and the remainder is
/// trimmed again. A present-but-empty credential is not an error here; call
/// [`require_credential`] before resolving a principal.
///
/// ## Errors
///
/// `AuthError::InvalidScheme` if the value is blank, has no space separator,
/// or names a scheme other than `Basic` / `Bearer`.
pub fn parse_authorization(raw: &str) -> AuthResult<(AuthTokenType, String)> {
    let (scheme, rest) = raw
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidScheme)?;

    let token_type = scheme.parse::<AuthTokenType>()?;
    Ok((token_type, rest.trim().to_string()))
}

/// Reject an empty credential with `AuthError::EmptyToken`
pub fn require_credential(credential: &str) -> AuthResult<&str> {
    if credential.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer() {
        let (token_type, token) = parse_authorization("Bearer token123").unwrap();
        assert_eq!(token_type, AuthTokenType::Bearer);
        assert_eq!(token, "token123");
    }

    #[test]
    fn test_parse_basic() {
        let (token_type, token) = parse_authorization("Basic dXNlcjpwYXNz").unwrap();
        assert_eq!(token_type, AuthTokenType::Basic);
        assert_eq!(token, "dXNlcjpwYXNz");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        for raw in ["Bearer abc", "bearer abc", "BEARER abc", "bEaReR abc"] {
            let (token_type, token) = parse_authorization(raw).unwrap();
            assert_eq!(token_type, AuthTokenType::Bearer, "{raw}");
            assert_eq!(token, "abc");
        }

        let (token_type, _) = parse_authorization("bAsIc abc").unwrap();
        assert_eq!(token_type, AuthTokenType::Basic);
    }

    #[test]
    fn test_trims_surrounding_whitespace() {
        let (token_type, token) = parse_authorization("   Bearer   token123   ").unwrap();
        assert_eq!(token_type, AuthTokenType::Bearer);
        assert_eq!(token, "token123");
    }

    #[test]
    fn test_keeps_internal_whitespace() {
        let (_, token) = parse_authorization("Bearer   a b  c   ").unwrap();
        assert_eq!(token, "a b  c");
    }

    #[test]
    fn test_invalid_headers() {
        for raw in ["", "   ", "Bearer", "Bearer   ", "Token abc", "Digest abc"] {
            let result = parse_authorization(raw);
            assert!(
                matches!(result, Err(AuthError::InvalidScheme)),
                "expected InvalidScheme for {raw:?}"
            );
        }
    }

    #[test]
    fn test_require_credential() {
        assert!(matches!(require_credential(""), Err(AuthError::EmptyToken)));
        assert_eq!(require_credential("abc").unwrap(), "abc");
    }

    #[test]
    fn test_header_value() {
        assert_eq!(AuthTokenType::Bearer.header_value("t"), "Bearer t");
        assert_eq!(AuthTokenType::Basic.to_string(), "Basic");
    }
}
