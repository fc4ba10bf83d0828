//! Stage 2: enforce route authorities for an authenticated caller

use crate::responders::{DefaultResponders, HttpResponders};
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;
use token_auth_core::principal::authorize;
use token_auth_core::{context, AuthError};
use token_auth_core::{HttpSecurityConfig, PrincipalResolver};
use tracing::{error, warn};

/// Authorization middleware
///
/// Must run after [`Authenticate`](crate::Authenticate); in actix that means
/// it is registered *before* it, since the last `wrap` runs first:
///
/// ```rust,ignore
/// App::new()
///     .wrap(Authorize::new(resolver.clone(), config.clone()))
///     .wrap(Authenticate::new(resolver, config))
/// ```
///
/// Permit-all routes pass through. Otherwise a missing principal is 401, a
/// route with required authorities the principal does not hold is 403, and
/// a failed authority lookup is 500.
pub struct Authorize<T, R, H = DefaultResponders> {
    resolver: Arc<R>,
    config: Arc<HttpSecurityConfig>,
    responders: Arc<H>,
    _principal: PhantomData<fn() -> T>,
}

impl<T, R> Authorize<T, R, DefaultResponders> {
    pub fn new(resolver: Arc<R>, config: Arc<HttpSecurityConfig>) -> Self {
        Self {
            resolver,
            config,
            responders: Arc::new(DefaultResponders),
            _principal: PhantomData,
        }
    }
}

impl<T, R, H> Authorize<T, R, H> {
    pub fn with_responders<H2: HttpResponders>(self, responders: H2) -> Authorize<T, R, H2> {
        Authorize {
            resolver: self.resolver,
            config: self.config,
            responders: Arc::new(responders),
            _principal: PhantomData,
        }
    }
}

impl<S, B, T, R, H> Transform<S, ServiceRequest> for Authorize<T, R, H>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    T: Clone + Send + Sync + 'static,
    R: PrincipalResolver<T> + 'static,
    H: HttpResponders,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthorizeMiddleware<S, T, R, H>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthorizeMiddleware {
            service: Rc::new(service),
            resolver: self.resolver.clone(),
            config: self.config.clone(),
            responders: self.responders.clone(),
            _principal: PhantomData,
        }))
    }
}

pub struct AuthorizeMiddleware<S, T, R, H> {
    service: Rc<S>,
    resolver: Arc<R>,
    config: Arc<HttpSecurityConfig>,
    responders: Arc<H>,
    _principal: PhantomData<fn() -> T>,
}

impl<S, B, T, R, H> Service<ServiceRequest> for AuthorizeMiddleware<S, T, R, H>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    T: Clone + Send + Sync + 'static,
    R: PrincipalResolver<T> + 'static,
    H: HttpResponders,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let resolver = self.resolver.clone();
        let config = self.config.clone();
        let responders = self.responders.clone();

        Box::pin(async move {
            let method = req.method().as_str().to_string();
            let path = req.path().to_string();

            if config.is_permitted(&method, &path) {
                return service.call(req).await.map(ServiceResponse::map_into_left_body);
            }

            // Cloned out so the extensions borrow is not held across the lookup
            let principal = context::principal::<T, _>(&*req.extensions()).cloned();
            let Some(principal) = principal else {
                warn!(method = %method, path = %path, "No authenticated principal on secured route");
                let response = responders.unauthorized(req.request());
                return Ok(req.into_response(response).map_into_right_body());
            };

            if let Some(required) = config.required_authorities(&method, &path) {
                if let Err(e) = authorize::<T, R>(&resolver, &principal, required).await {
                    let response = match e {
                        AuthError::InsufficientAuthority => {
                            warn!(method = %method, path = %path, "Insufficient authority");
                            responders.forbidden(req.request())
                        }
                        e => {
                            error!(method = %method, path = %path, error = %e, "Authority lookup failed");
                            responders.internal_error(req.request())
                        }
                    };
                    return Ok(req.into_response(response).map_into_right_body());
                }
            }

            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}
