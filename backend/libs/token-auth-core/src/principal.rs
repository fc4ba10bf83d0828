//! Principal resolution seam
//!
//! The embedding application maps credentials to its own principal type `T`
//! by implementing [`PrincipalResolver`]. The transport bindings only decide
//! when it is called and with which credential.

use crate::error::{AuthError, AuthResult};
use crate::jwt::{Claims, JwtTokenService};
use crate::policy::has_any_authority;
use crate::scheme::{parse_authorization, require_credential, AuthTokenType};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Maps credentials to an application principal and a principal to its
/// authorities.
///
/// Both calls may perform I/O. The bindings poll them inside the request
/// task, so cancelling the request drops the future. Retry policy belongs
/// to the implementation.
#[async_trait]
pub trait PrincipalResolver<T>: Send + Sync {
    async fn get_principal(&self, token_type: AuthTokenType, credential: &str) -> anyhow::Result<T>;

    async fn get_authorities(&self, principal: &T) -> anyhow::Result<HashSet<String>>;
}

#[async_trait]
impl<T, R> PrincipalResolver<T> for Arc<R>
where
    T: Send + Sync,
    R: PrincipalResolver<T> + ?Sized,
{
    async fn get_principal(&self, token_type: AuthTokenType, credential: &str) -> anyhow::Result<T> {
        (**self).get_principal(token_type, credential).await
    }

    async fn get_authorities(&self, principal: &T) -> anyhow::Result<HashSet<String>> {
        (**self).get_authorities(principal).await
    }
}

/// A successfully authenticated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication<T> {
    pub token_type: AuthTokenType,
    pub token: String,
    pub principal: T,
}

/// Parse a raw `Authorization` value and resolve its principal.
///
/// ## Errors
///
/// - `InvalidScheme` / `EmptyToken` from the header parser
/// - `PrincipalResolutionFailed` when the resolver rejects the credential
pub async fn authenticate<T, R>(resolver: &R, raw_header: &str) -> AuthResult<Authentication<T>>
where
    R: PrincipalResolver<T> + ?Sized,
{
    let (token_type, token) = parse_authorization(raw_header)?;
    require_credential(&token)?;

    let principal = resolver
        .get_principal(token_type, &token)
        .await
        .map_err(|e| AuthError::PrincipalResolutionFailed(e.to_string()))?;

    Ok(Authentication {
        token_type,
        token,
        principal,
    })
}

/// Check `principal` against a non-empty `required` authority set.
///
/// ## Errors
///
/// - `AuthoritiesLookupFailed` when the resolver backend fails
/// - `InsufficientAuthority` when no required authority is held
pub async fn authorize<T, R>(resolver: &R, principal: &T, required: &HashSet<String>) -> AuthResult<()>
where
    T: Sync,
    R: PrincipalResolver<T> + ?Sized,
{
    let held = resolver
        .get_authorities(principal)
        .await
        .map_err(|e| AuthError::AuthoritiesLookupFailed(e.to_string()))?;

    if has_any_authority(required, &held) {
        Ok(())
    } else {
        Err(AuthError::InsufficientAuthority)
    }
}

/// Resolver for services whose principal is the verified claim set of a
/// bearer token. Authorities are read from a string-array claim.
pub struct JwtClaimsResolver {
    service: Arc<JwtTokenService>,
    authorities_claim: String,
}

impl JwtClaimsResolver {
    pub const DEFAULT_AUTHORITIES_CLAIM: &'static str = "authorities";

    pub fn new(service: Arc<JwtTokenService>) -> Self {
        Self {
            service,
            authorities_claim: Self::DEFAULT_AUTHORITIES_CLAIM.to_string(),
        }
    }

    pub fn with_authorities_claim(mut self, claim: impl Into<String>) -> Self {
        self.authorities_claim = claim.into();
        self
    }
}

#[async_trait]
impl PrincipalResolver<Claims> for JwtClaimsResolver {
    async fn get_principal(&self, token_type: AuthTokenType, credential: &str) -> anyhow::Result<Claims> {
        if token_type != AuthTokenType::Bearer {
            anyhow::bail!("{token_type} credentials are not accepted");
        }
        Ok(self.service.verify_token(credential).await?)
    }

    async fn get_authorities(&self, principal: &Claims) -> anyhow::Result<HashSet<String>> {
        let authorities = match principal.get(&self.authorities_claim) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(single)) => HashSet::from([single.clone()]),
            _ => HashSet::new(),
        };
        Ok(authorities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct User {
        id: String,
        roles: Vec<String>,
    }

    struct TokenTable;

    #[async_trait]
    impl PrincipalResolver<User> for TokenTable {
        async fn get_principal(&self, token_type: AuthTokenType, credential: &str) -> anyhow::Result<User> {
            match (token_type, credential) {
                (AuthTokenType::Bearer, "admin-token") => Ok(User {
                    id: "1".to_string(),
                    roles: vec!["ADMIN".to_string()],
                }),
                (AuthTokenType::Bearer, "broken-token") => Ok(User {
                    id: "broken".to_string(),
                    roles: vec![],
                }),
                _ => anyhow::bail!("unknown token"),
            }
        }

        async fn get_authorities(&self, principal: &User) -> anyhow::Result<HashSet<String>> {
            if principal.id == "broken" {
                anyhow::bail!("authority store unavailable");
            }
            Ok(principal.roles.iter().cloned().collect())
        }
    }

    fn admin() -> HashSet<String> {
        HashSet::from(["ADMIN".to_string()])
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let auth = authenticate(&TokenTable, "Bearer admin-token").await.unwrap();
        assert_eq!(auth.token_type, AuthTokenType::Bearer);
        assert_eq!(auth.token, "admin-token");
        assert_eq!(auth.principal.id, "1");
    }

    #[tokio::test]
    async fn test_authenticate_invalid_scheme() {
        let result = authenticate(&TokenTable, "Token admin-token").await;
        assert!(matches!(result, Err(AuthError::InvalidScheme)));
    }

    #[tokio::test]
    async fn test_authenticate_resolver_failure() {
        let result = authenticate(&TokenTable, "Basic dXNlcjpwYXNz").await;
        assert!(matches!(result, Err(AuthError::PrincipalResolutionFailed(_))));
    }

    #[tokio::test]
    async fn test_authorize() {
        let auth = authenticate(&TokenTable, "Bearer admin-token").await.unwrap();
        assert!(authorize(&TokenTable, &auth.principal, &admin()).await.is_ok());

        let ops = HashSet::from(["OPS".to_string()]);
        let result = authorize(&TokenTable, &auth.principal, &ops).await;
        assert!(matches!(result, Err(AuthError::InsufficientAuthority)));
    }

    #[tokio::test]
    async fn test_authorize_lookup_failure() {
        let auth = authenticate(&TokenTable, "Bearer broken-token").await.unwrap();
        let result = authorize(&TokenTable, &auth.principal, &admin()).await;
        assert!(matches!(result, Err(AuthError::AuthoritiesLookupFailed(_))));
    }

    #[tokio::test]
    async fn test_arc_resolver_delegates() {
        let resolver: Arc<dyn PrincipalResolver<User>> = Arc::new(TokenTable);
        let auth = authenticate(&resolver, "Bearer admin-token").await.unwrap();
        assert_eq!(auth.principal.id, "1");
    }
}
