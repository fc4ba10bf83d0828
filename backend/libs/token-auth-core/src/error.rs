//! Error taxonomy shared by the parser, the JWT service and both transport bindings.

use thiserror::Error;

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid authorization scheme")]
    InvalidScheme,

    #[error("Empty token")]
    EmptyToken,

    #[error("Invalid base64 credential")]
    InvalidBase64,

    #[error("Basic credential is missing the ':' separator")]
    MissingSeparator,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token header has no key id")]
    MissingKeyId,

    #[error("Failed to resolve public key for kid {kid}: {reason}")]
    KeyResolution { kid: String, reason: String },

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token issuer mismatch")]
    IssuerMismatch,

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Invalid token lifetime: {0}")]
    InvalidTokenLifetime(String),

    #[error("Principal resolution failed: {0}")]
    PrincipalResolutionFailed(String),

    #[error("Authorities lookup failed: {0}")]
    AuthoritiesLookupFailed(String),

    #[error("Insufficient authority")]
    InsufficientAuthority,

    #[error("Invalid route key: {0}")]
    InvalidRouteKey(String),

    #[error("Random generation failed: {0}")]
    Random(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl AuthError {
    /// True when the caller's credentials are at fault (401/403), false when a
    /// dependency or local configuration failed (500).
    pub fn is_caller_fault(&self) -> bool {
        !matches!(
            self,
            AuthError::AuthoritiesLookupFailed(_)
                | AuthError::Signing(_)
                | AuthError::InvalidKey(_)
                | AuthError::InvalidTokenLifetime(_)
                | AuthError::InvalidRouteKey(_)
                | AuthError::Random(_)
                | AuthError::PasswordHash(_)
        )
    }
}
