//! Token authentication and authorization core for Nova services
//!
//! Transport-agnostic pieces shared by the gRPC and Actix bindings:
//!
//! - `scheme`: `Authorization` header parsing (`Basic` / `Bearer`)
//! - `basic_auth`: `user:password` credential codec
//! - `jwt`: RS-family token issuance and verification with key rotation
//! - `policy`: route key and RPC method authorization policy
//! - `principal`: the application-supplied principal resolver seam
//! - `context`: request-scoped storage of the authenticated caller
//! - `config`: settings loaded from the environment
//! - `password`, `random_string`: credential helpers

pub mod basic_auth;
pub mod config;
pub mod context;
pub mod error;
pub mod jwt;
pub mod password;
pub mod policy;
pub mod principal;
pub mod random_string;
pub mod scheme;

pub use basic_auth::{decode_basic, encode_basic};
pub use config::SecuritySettings;
pub use context::ContextStore;
pub use error::{AuthError, AuthResult};
pub use jwt::{Claims, JwtKeyMaterial, JwtTokenService, KeyResolver};
pub use policy::{has_any_authority, HttpSecurityConfig, RouteKey, SecuredMethod};
pub use principal::{Authentication, JwtClaimsResolver, PrincipalResolver};
pub use scheme::{parse_authorization, AuthTokenType};

// Re-exported so embedders can name key types without a direct dependency
pub use jsonwebtoken::{Algorithm, DecodingKey};
