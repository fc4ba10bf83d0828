//! JWT issuance and verification with key rotation support
//!
//! Tokens are signed with an RSA-family algorithm only. No symmetric
//! algorithms are accepted, so an HS256 token signed with the public key can
//! never verify.
//!
//! ## Key rotation
//!
//! The service holds exactly one active key pair. Every issued token carries
//! the active key id in its `kid` header. When a token arrives with a
//! different `kid`, the injected [`KeyResolver`] is asked for the matching
//! public key; the service itself keeps no key history.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use jsonwebtoken::Algorithm;
//! use token_auth_core::jwt::{Claims, JwtKeyMaterial, JwtTokenService, NoKeyResolver};
//!
//! # async fn example(private_pem: &str, public_pem: &str) -> anyhow::Result<()> {
//! let material = JwtKeyMaterial::from_rsa_pem(
//!     Algorithm::RS256,
//!     private_pem,
//!     public_pem,
//!     "2024-10",
//!     Utc::now() + Duration::days(90),
//! )?;
//! let service = JwtTokenService::new(material, "nova", Duration::hours(1), Arc::new(NoKeyResolver))?;
//!
//! let mut claims = Claims::new();
//! claims.insert("sub".to_string(), "user-1".into());
//! let token = service.generate_token(claims)?;
//! let verified = service.verify_token(&token).await?;
//! assert_eq!(verified["sub"], "user-1");
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Claim set carried by a token: caller claims plus `iss`, `iat`, `exp`
pub type Claims = serde_json::Map<String, Value>;

pub const CLAIM_ISSUER: &str = "iss";
pub const CLAIM_ISSUED_AT: &str = "iat";
pub const CLAIM_EXPIRY: &str = "exp";

/// Default signing algorithm
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::RS256;

/// Upper bound on the configured token lifetime
pub const MAX_TOKEN_LIFETIME_DAYS: i64 = 366;

pub fn is_rsa_family(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

// ============================================================================
// Key Resolution
// ============================================================================

/// Looks up the public key for a `kid` that is not the active key id.
///
/// Implementations may perform I/O. The future is dropped when the request is
/// cancelled; retries and caching are the implementation's concern.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, kid: &str) -> anyhow::Result<DecodingKey>;
}

/// Resolver for deployments without rotation: every foreign `kid` is rejected
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeyResolver;

#[async_trait]
impl KeyResolver for NoKeyResolver {
    async fn resolve(&self, kid: &str) -> anyhow::Result<DecodingKey> {
        Err(anyhow::anyhow!("no public key available for kid {kid}"))
    }
}

/// Fixed set of previously published public keys
#[derive(Clone, Default)]
pub struct StaticKeyResolver {
    keys: HashMap<String, DecodingKey>,
}

impl StaticKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, kid: impl Into<String>, key: DecodingKey) -> Self {
        self.keys.insert(kid.into(), key);
        self
    }

    pub fn with_rsa_pem(self, kid: impl Into<String>, public_key_pem: &str) -> AuthResult<Self> {
        let key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| AuthError::InvalidKey(format!("Failed to parse RSA public key: {e}")))?;
        Ok(self.with_key(kid, key))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyResolver for StaticKeyResolver {
    async fn resolve(&self, kid: &str) -> anyhow::Result<DecodingKey> {
        self.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown kid {kid}"))
    }
}

/// Adapts an async closure `kid -> public key` into a [`KeyResolver`]
pub struct FnKeyResolver<F> {
    resolve: F,
}

impl<F> FnKeyResolver<F> {
    pub fn new(resolve: F) -> Self {
        Self { resolve }
    }
}

#[async_trait]
impl<F, Fut> KeyResolver for FnKeyResolver<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<DecodingKey>> + Send,
{
    async fn resolve(&self, kid: &str) -> anyhow::Result<DecodingKey> {
        (self.resolve)(kid.to_string()).await
    }
}

// ============================================================================
// Key Material
// ============================================================================

/// The active key pair and its identity
#[derive(Clone)]
pub struct JwtKeyMaterial {
    pub algorithm: Algorithm,
    pub encoding_key: EncodingKey,
    pub decoding_key: DecodingKey,
    pub key_id: String,
    pub key_expiration: DateTime<Utc>,
}

impl JwtKeyMaterial {
    /// Parse an RSA key pair from PEM strings (PKCS#1 or PKCS#8 private key)
    pub fn from_rsa_pem(
        algorithm: Algorithm,
        private_key_pem: &str,
        public_key_pem: &str,
        key_id: impl Into<String>,
        key_expiration: DateTime<Utc>,
    ) -> AuthResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| AuthError::InvalidKey(format!("Failed to parse RSA private key: {e}")))?;

        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| AuthError::InvalidKey(format!("Failed to parse RSA public key: {e}")))?;

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
            key_id: key_id.into(),
            key_expiration,
        })
    }
}

impl fmt::Debug for JwtKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .field("key_expiration", &self.key_expiration)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Token Service
// ============================================================================

/// Issues and verifies bearer tokens. Immutable after construction and safe
/// to share across tasks behind an `Arc`.
pub struct JwtTokenService {
    material: JwtKeyMaterial,
    issuer: String,
    token_lifetime: Duration,
    key_resolver: Arc<dyn KeyResolver>,
}

impl JwtTokenService {
    /// ## Errors
    ///
    /// - `AuthError::InvalidKey` if the algorithm is not RSA-family
    /// - `AuthError::InvalidTokenLifetime` unless `0 < token_lifetime <= 366 days`
    pub fn new(
        material: JwtKeyMaterial,
        issuer: impl Into<String>,
        token_lifetime: Duration,
        key_resolver: Arc<dyn KeyResolver>,
    ) -> AuthResult<Self> {
        if !is_rsa_family(material.algorithm) {
            return Err(AuthError::InvalidKey(format!(
                "{:?} is not an RSA signing algorithm",
                material.algorithm
            )));
        }

        if token_lifetime <= Duration::zero() || token_lifetime > Duration::days(MAX_TOKEN_LIFETIME_DAYS) {
            return Err(AuthError::InvalidTokenLifetime(format!(
                "{}s is outside 1s..={MAX_TOKEN_LIFETIME_DAYS}d",
                token_lifetime.num_seconds()
            )));
        }

        Ok(Self {
            material,
            issuer: issuer.into(),
            token_lifetime,
            key_resolver,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.material.key_id
    }

    pub fn key_expiration(&self) -> DateTime<Utc> {
        self.material.key_expiration
    }

    pub fn is_key_expired(&self) -> bool {
        Utc::now() >= self.material.key_expiration
    }

    pub fn token_lifetime(&self) -> Duration {
        self.token_lifetime
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn algorithm(&self) -> Algorithm {
        self.material.algorithm
    }

    /// Sign a token carrying `claims`.
    ///
    /// `iss`, `iat` and `exp` are written after the caller claims, so a caller
    /// can never override them.
    pub fn generate_token(&self, mut claims: Claims) -> AuthResult<String> {
        let now = Utc::now();
        let expiry = now
            .checked_add_signed(self.token_lifetime)
            .ok_or_else(|| AuthError::Signing("token expiry out of range".to_string()))?;

        claims.insert(CLAIM_ISSUER.to_string(), Value::from(self.issuer.clone()));
        claims.insert(CLAIM_ISSUED_AT.to_string(), Value::from(now.timestamp()));
        claims.insert(CLAIM_EXPIRY.to_string(), Value::from(expiry.timestamp()));

        let mut header = Header::new(self.material.algorithm);
        header.kid = Some(self.material.key_id.clone());

        encode(&header, &claims, &self.material.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify a compact token and return its full claim set.
    ///
    /// Checks run in order: header, `kid`, signature, `exp`, `iss`.
    pub async fn verify_token(&self, token: &str) -> AuthResult<Claims> {
        let header = decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        // Rotated keys may use another RSA-family algorithm; never a symmetric one
        if !is_rsa_family(header.alg) {
            return Err(AuthError::SignatureInvalid);
        }

        let claims = if kid == self.material.key_id {
            self.decode_signed(token, header.alg, &self.material.decoding_key)?
        } else {
            debug!(kid = %kid, active_kid = %self.material.key_id, "Resolving rotated JWT key");
            let key = self.key_resolver.resolve(&kid).await.map_err(|e| {
                warn!(kid = %kid, error = %e, "JWT key resolution failed");
                AuthError::KeyResolution {
                    kid: kid.clone(),
                    reason: e.to_string(),
                }
            })?;
            self.decode_signed(token, header.alg, &key)?
        };

        let expiry = claims
            .get(CLAIM_EXPIRY)
            .and_then(Value::as_i64)
            .ok_or_else(|| AuthError::MalformedToken("missing or invalid exp claim".to_string()))?;
        if Utc::now().timestamp() >= expiry {
            return Err(AuthError::TokenExpired);
        }

        match claims.get(CLAIM_ISSUER).and_then(Value::as_str) {
            Some(issuer) if issuer == self.issuer => Ok(claims),
            _ => Err(AuthError::IssuerMismatch),
        }
    }

    fn decode_signed(&self, token: &str, algorithm: Algorithm, key: &DecodingKey) -> AuthResult<Claims> {
        // exp and iss are checked by verify_token so the error order stays fixed
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::new();

        decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::SignatureInvalid
                }
                ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                    AuthError::InvalidKey(e.to_string())
                }
                _ => AuthError::MalformedToken(e.to_string()),
            })
    }
}

impl fmt::Debug for JwtTokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtTokenService")
            .field("material", &self.material)
            .field("issuer", &self.issuer)
            .field("token_lifetime", &self.token_lifetime)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
