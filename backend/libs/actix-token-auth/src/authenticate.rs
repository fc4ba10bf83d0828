//! Stage 1: authenticate the caller and attach the security context

use crate::responders::{DefaultResponders, HttpResponders};
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{Error, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;
use token_auth_core::context;
use token_auth_core::principal::authenticate;
use token_auth_core::{HttpSecurityConfig, PrincipalResolver};
use tracing::{debug, warn};

/// Authentication middleware
///
/// Requests matching a permit-all route pass through untouched. Everything
/// else must carry `Authorization: <Basic|Bearer> <credential>` that the
/// resolver accepts, otherwise the request is answered by the responders
/// and never reaches the handler.
///
/// ```rust,no_run
/// use actix_token_auth::Authenticate;
/// use actix_web::App;
/// use std::sync::Arc;
/// use token_auth_core::{Claims, HttpSecurityConfig, JwtClaimsResolver, JwtTokenService, RouteKey};
///
/// # fn example(service: Arc<JwtTokenService>) {
/// let config = Arc::new(HttpSecurityConfig::new().permit(RouteKey::any("/health")));
/// let authenticate: Authenticate<Claims, JwtClaimsResolver> =
///     Authenticate::new(Arc::new(JwtClaimsResolver::new(service)), config);
/// let app = App::new().wrap(authenticate);
/// # }
/// ```
pub struct Authenticate<T, R, H = DefaultResponders> {
    resolver: Arc<R>,
    config: Arc<HttpSecurityConfig>,
    responders: Arc<H>,
    _principal: PhantomData<fn() -> T>,
}

impl<T, R> Authenticate<T, R, DefaultResponders> {
    pub fn new(resolver: Arc<R>, config: Arc<HttpSecurityConfig>) -> Self {
        Self {
            resolver,
            config,
            responders: Arc::new(DefaultResponders),
            _principal: PhantomData,
        }
    }
}

impl<T, R, H> Authenticate<T, R, H> {
    pub fn with_responders<H2: HttpResponders>(self, responders: H2) -> Authenticate<T, R, H2> {
        Authenticate {
            resolver: self.resolver,
            config: self.config,
            responders: Arc::new(responders),
            _principal: PhantomData,
        }
    }
}

impl<S, B, T, R, H> Transform<S, ServiceRequest> for Authenticate<T, R, H>
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
    type Transform = AuthenticateMiddleware<S, T, R, H>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticateMiddleware {
            service: Rc::new(service),
            resolver: self.resolver.clone(),
            config: self.config.clone(),
            responders: self.responders.clone(),
            _principal: PhantomData,
        }))
    }
}

pub struct AuthenticateMiddleware<S, T, R, H> {
    service: Rc<S>,
    resolver: Arc<R>,
    config: Arc<HttpSecurityConfig>,
    responders: Arc<H>,
    _principal: PhantomData<fn() -> T>,
}

impl<S, B, T, R, H> Service<ServiceRequest> for AuthenticateMiddleware<S, T, R, H>
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
            if config.is_permitted(req.method().as_str(), req.path()) {
                return service.call(req).await.map(ServiceResponse::map_into_left_body);
            }

            let raw_header = match req.headers().get(AUTHORIZATION).map(|value| value.to_str()) {
                Some(Ok(raw)) => raw.to_string(),
                _ => {
                    warn!(path = %req.path(), "Missing or unreadable Authorization header");
                    let response = responders.missing_authorization_header(req.request());
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            let authentication = match authenticate::<T, R>(&resolver, &raw_header).await {
                Ok(authentication) => authentication,
                Err(e) => {
                    warn!(path = %req.path(), error = %e, "Authentication failed");
                    let response = responders.unauthorized(req.request());
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            debug!(
                path = %req.path(),
                token_type = %authentication.token_type,
                "Request authenticated"
            );
            context::attach(&mut *req.extensions_mut(), authentication);

            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}
