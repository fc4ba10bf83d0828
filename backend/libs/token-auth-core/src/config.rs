//! Security settings
//!
//! Loaded from environment variables (plus a `.env` file in debug builds):
//!
//! | variable | default |
//! |---|---|
//! | `JWT_PRIVATE_KEY_PEM` | required |
//! | `JWT_PUBLIC_KEY_PEM` | required |
//! | `JWT_KEY_ID` | required |
//! | `JWT_ISSUER` | required |
//! | `JWT_TOKEN_TTL_SECS` | `3600` |
//! | `JWT_KEY_EXPIRES_AT` | now + 90 days (RFC 3339) |
//! | `JWT_ALGORITHM` | `RS256` |
//! | `HTTP_PERMIT_ALL` | empty, comma-separated route keys |
//! | `HTTP_ROUTE_AUTHORITIES` | empty, `GET:/admin/*=ADMIN\|OPS;ANY:/me=` |
//! | `GRPC_SECURED_METHODS` | empty, `/pkg.Svc/Method=ADMIN;/pkg.Svc/Other=` |

use crate::jwt::{is_rsa_family, JwtKeyMaterial, JwtTokenService, KeyResolver, DEFAULT_ALGORITHM};
use crate::policy::{HttpSecurityConfig, RouteKey, SecuredMethod};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::sync::Arc;
use tracing::info;

const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
const DEFAULT_KEY_LIFETIME_DAYS: i64 = 90;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySettings {
    pub jwt: JwtSettings,
    #[serde(default)]
    pub http: HttpRouteSettings,
    #[serde(default)]
    pub grpc_secured_methods: Vec<SecuredMethod>,
}

impl SecuritySettings {
    pub fn from_env() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
        }

        let settings = Self {
            jwt: JwtSettings::from_env()?,
            http: HttpRouteSettings::from_env()?,
            grpc_secured_methods: parse_secured_methods(&env::var("GRPC_SECURED_METHODS").unwrap_or_default())?,
        };

        info!(
            key_id = %settings.jwt.key_id,
            issuer = %settings.jwt.issuer,
            permit_all = settings.http.permit_all.len(),
            protected_routes = settings.http.authorities.len(),
            secured_methods = settings.grpc_secured_methods.len(),
            "Security settings loaded"
        );

        Ok(settings)
    }
}

/// JWT signing settings
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtSettings {
    pub private_key_pem: String,
    pub public_key_pem: String,
    pub key_id: String,
    pub issuer: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
    pub key_expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

fn default_token_ttl_secs() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_algorithm() -> String {
    format!("{DEFAULT_ALGORITHM:?}")
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("key_expires_at", &self.key_expires_at)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            private_key_pem: env::var("JWT_PRIVATE_KEY_PEM").context("JWT_PRIVATE_KEY_PEM must be set")?,
            public_key_pem: env::var("JWT_PUBLIC_KEY_PEM").context("JWT_PUBLIC_KEY_PEM must be set")?,
            key_id: env::var("JWT_KEY_ID").context("JWT_KEY_ID must be set")?,
            issuer: env::var("JWT_ISSUER").context("JWT_ISSUER must be set")?,
            token_ttl_secs: env::var("JWT_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| DEFAULT_TOKEN_TTL_SECS.to_string())
                .parse()
                .context("Invalid JWT_TOKEN_TTL_SECS")?,
            key_expires_at: env::var("JWT_KEY_EXPIRES_AT")
                .ok()
                .map(|raw| DateTime::parse_from_rfc3339(&raw).map(|t| t.with_timezone(&Utc)))
                .transpose()
                .context("Invalid JWT_KEY_EXPIRES_AT (expected RFC 3339)")?,
            algorithm: env::var("JWT_ALGORITHM").unwrap_or_else(|_| default_algorithm()),
        })
    }

    pub fn algorithm(&self) -> Result<Algorithm> {
        let algorithm: Algorithm = self
            .algorithm
            .parse()
            .map_err(|e| anyhow!("Unknown JWT algorithm {}: {e}", self.algorithm))?;

        if !is_rsa_family(algorithm) {
            return Err(anyhow!("JWT algorithm {} is not RSA-family", self.algorithm));
        }
        Ok(algorithm)
    }

    pub fn key_material(&self) -> Result<JwtKeyMaterial> {
        let key_expiration = self
            .key_expires_at
            .unwrap_or_else(|| Utc::now() + Duration::days(DEFAULT_KEY_LIFETIME_DAYS));

        JwtKeyMaterial::from_rsa_pem(
            self.algorithm()?,
            &self.private_key_pem,
            &self.public_key_pem,
            self.key_id.clone(),
            key_expiration,
        )
        .context("Failed to load JWT key material")
    }

    pub fn build_service(&self, key_resolver: Arc<dyn KeyResolver>) -> Result<JwtTokenService> {
        let token_lifetime = Duration::try_seconds(self.token_ttl_secs)
            .with_context(|| format!("JWT_TOKEN_TTL_SECS out of range: {}", self.token_ttl_secs))?;

        JwtTokenService::new(self.key_material()?, self.issuer.clone(), token_lifetime, key_resolver)
            .context("Failed to build JWT token service")
    }
}

/// HTTP route policy in its textual configuration form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpRouteSettings {
    #[serde(default)]
    pub permit_all: Vec<String>,
    /// `(route key, authorities)` pairs
    #[serde(default)]
    pub authorities: Vec<(String, HashSet<String>)>,
}

impl HttpRouteSettings {
    fn from_env() -> Result<Self> {
        let permit_all = env::var("HTTP_PERMIT_ALL")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect();

        let authorities = parse_assignments(&env::var("HTTP_ROUTE_AUTHORITIES").unwrap_or_default())
            .context("Invalid HTTP_ROUTE_AUTHORITIES")?;

        Ok(Self {
            permit_all,
            authorities,
        })
    }

    pub fn build(&self) -> Result<HttpSecurityConfig> {
        let mut config = HttpSecurityConfig::new();
        for raw in &self.permit_all {
            config = config.permit(RouteKey::parse(raw)?);
        }
        for (raw, authorities) in &self.authorities {
            config = config.require(RouteKey::parse(raw)?, authorities.iter().cloned());
        }
        Ok(config)
    }
}

/// Parse `KEY=A|B;KEY2=` into `(key, authorities)` pairs
fn parse_assignments(raw: &str) -> Result<Vec<(String, HashSet<String>)>> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            // rsplit: route keys contain ':' but never '='
            let (key, authorities) = entry
                .rsplit_once('=')
                .ok_or_else(|| anyhow!("missing '=' in {entry}"))?;
            let authorities = authorities
                .split('|')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
            Ok((key.trim().to_string(), authorities))
        })
        .collect()
}

fn parse_secured_methods(raw: &str) -> Result<Vec<SecuredMethod>> {
    let methods = parse_assignments(raw)
        .context("Invalid GRPC_SECURED_METHODS")?
        .into_iter()
        .map(|(method, authorities)| SecuredMethod { method, authorities })
        .collect();
    Ok(methods)
}
