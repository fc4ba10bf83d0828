//! Server-side token interceptor
//!
//! Authenticates and authorizes a unary call in a single pass before the
//! handler runs. The method identifier is the request path
//! (`/package.Service/Method`) and only methods listed as
//! [`SecuredMethod`]s are checked; everything else passes through untouched.
//!
//! ## Flow
//!
//! 1. Method not secured -> handler
//! 2. Exactly one `authorization` value, else `Unauthenticated`
//! 3. Scheme valid and credential non-empty, else `Unauthenticated`
//! 4. Principal resolved, else `Unauthenticated`
//! 5. Method requires authorities: lookup failure -> `Internal`,
//!    no matching authority -> `PermissionDenied`
//! 6. Token type, credential and principal attached to request extensions

use crate::deadline;
use crate::status::to_status;
use http::HeaderMap;
use std::marker::PhantomData;
use std::sync::Arc;
use token_auth_core::context;
use token_auth_core::policy::find_secured_method;
use token_auth_core::principal::{authenticate, authorize};
use token_auth_core::scheme::AUTHORIZATION_HEADER;
use token_auth_core::{PrincipalResolver, SecuredMethod};
use tonic::Status;
use tracing::{debug, error, warn};

pub struct RpcTokenInterceptor<T, R> {
    resolver: Arc<R>,
    secured_methods: Arc<[SecuredMethod]>,
    _principal: PhantomData<fn() -> T>,
}

impl<T, R> Clone for RpcTokenInterceptor<T, R> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            secured_methods: self.secured_methods.clone(),
            _principal: PhantomData,
        }
    }
}

impl<T, R> RpcTokenInterceptor<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: PrincipalResolver<T>,
{
    pub fn new(resolver: Arc<R>, secured_methods: Vec<SecuredMethod>) -> Self {
        Self {
            resolver,
            secured_methods: secured_methods.into(),
            _principal: PhantomData,
        }
    }

    pub fn secured_methods(&self) -> &[SecuredMethod] {
        &self.secured_methods
    }

    /// Check one incoming call. On success the request is returned with the
    /// security context attached to its extensions.
    pub async fn intercept<B>(&self, mut request: http::Request<B>) -> Result<http::Request<B>, Status> {
        let method = request.uri().path().to_string();

        let Some(secured) = find_secured_method(&self.secured_methods, &method) else {
            return Ok(request);
        };

        let raw_header = single_authorization(request.headers()).map_err(|status| {
            warn!(method = %method, reason = %status.message(), "Rejected call without usable authorization metadata");
            status
        })?;
        let deadline = deadline::from_headers(request.headers());

        let authentication = deadline::bounded(deadline, authenticate::<T, R>(&self.resolver, &raw_header))
            .await?
            .map_err(|e| {
                warn!(method = %method, error = %e, "Authentication failed");
                to_status(&e)
            })?;

        if !secured.authorities.is_empty() {
            deadline::bounded(
                deadline,
                authorize::<T, R>(&self.resolver, &authentication.principal, &secured.authorities),
            )
            .await?
            .map_err(|e| {
                if e.is_caller_fault() {
                    warn!(method = %method, error = %e, "Authorization denied");
                } else {
                    error!(method = %method, error = %e, "Authority lookup failed");
                }
                to_status(&e)
            })?;
        }

        debug!(
            method = %method,
            token_type = %authentication.token_type,
            "Call authenticated"
        );

        context::attach(request.extensions_mut(), authentication);
        Ok(request)
    }
}

/// The `authorization` metadata must carry exactly one ASCII value
fn single_authorization(headers: &HeaderMap) -> Result<String, Status> {
    let mut values = headers.get_all(AUTHORIZATION_HEADER).iter();

    let value = values
        .next()
        .ok_or_else(|| Status::unauthenticated("missing authorization metadata"))?;
    if values.next().is_some() {
        return Err(Status::unauthenticated("multiple authorization values"));
    }

    value
        .to_str()
        .map(str::to_string)
        .map_err(|_| Status::unauthenticated("invalid authorization metadata"))
}
