//! Request extension trait for reading the security context in handlers

use token_auth_core::context::{AccessTokenEntry, PrincipalEntry, TokenTypeEntry};
use token_auth_core::AuthTokenType;
use tonic::{Request, Status};

/// Access to the caller attached by [`RpcTokenInterceptor`](crate::RpcTokenInterceptor)
///
/// Every accessor fails with `Status::unauthenticated` when the value is
/// absent, which happens for unsecured methods or when the interceptor is
/// not installed.
///
/// ```rust,no_run
/// use grpc_token_auth::SecurityContextExt;
/// use tonic::{Request, Response, Status};
///
/// #[derive(Clone)]
/// struct User {
///     id: String,
/// }
///
/// async fn whoami(request: Request<()>) -> Result<Response<String>, Status> {
///     let user = request.principal::<User>()?;
///     Ok(Response::new(user.id.clone()))
/// }
/// ```
pub trait SecurityContextExt {
    /// The resolved principal. `P` must match the resolver's principal type.
    fn principal<P>(&self) -> Result<&P, Status>
    where
        P: Clone + Send + Sync + 'static;

    /// The raw credential, without its scheme
    fn access_token(&self) -> Result<&str, Status>;

    fn auth_token_type(&self) -> Result<AuthTokenType, Status>;
}

impl<M> SecurityContextExt for Request<M> {
    fn principal<P>(&self) -> Result<&P, Status>
    where
        P: Clone + Send + Sync + 'static,
    {
        self.extensions()
            .get::<PrincipalEntry<P>>()
            .map(|entry| &entry.0)
            .ok_or_else(|| Status::unauthenticated("no authenticated principal"))
    }

    fn access_token(&self) -> Result<&str, Status> {
        self.extensions()
            .get::<AccessTokenEntry>()
            .map(|entry| entry.0.as_str())
            .ok_or_else(|| Status::unauthenticated("no access token"))
    }

    fn auth_token_type(&self) -> Result<AuthTokenType, Status> {
        self.extensions()
            .get::<TokenTypeEntry>()
            .map(|entry| entry.0)
            .ok_or_else(|| Status::unauthenticated("no authorization scheme"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        id: String,
    }

    #[test]
    fn test_absent_context_is_unauthenticated() {
        let request = Request::new(());
        assert_eq!(request.principal::<User>().unwrap_err().code(), Code::Unauthenticated);
        assert_eq!(request.access_token().unwrap_err().code(), Code::Unauthenticated);
        assert_eq!(request.auth_token_type().unwrap_err().code(), Code::Unauthenticated);
    }

    #[test]
    fn test_reads_attached_values() {
        let mut request = Request::new(());
        request.extensions_mut().insert(TokenTypeEntry(AuthTokenType::Bearer));
        request.extensions_mut().insert(AccessTokenEntry("abc".to_string()));
        request.extensions_mut().insert(PrincipalEntry(User { id: "7".to_string() }));

        assert_eq!(request.auth_token_type().unwrap(), AuthTokenType::Bearer);
        assert_eq!(request.access_token().unwrap(), "abc");
        assert_eq!(request.principal::<User>().unwrap().id, "7");
        // Different principal type reads as absent
        assert!(request.principal::<String>().is_err());
    }
}
