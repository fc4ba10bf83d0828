//! Tower Layer running the token interceptor in front of a tonic server
//!
//! ```ignore
//! Server::builder()
//!     .layer(RpcAuthLayer::new(interceptor))
//!     .add_service(MyServiceServer::new(svc))
//! ```

use crate::interceptor::RpcTokenInterceptor;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use token_auth_core::PrincipalResolver;
use tonic::body::BoxBody;
use tower::{Layer, Service};

pub struct RpcAuthLayer<T, R> {
    interceptor: RpcTokenInterceptor<T, R>,
}

impl<T, R> Clone for RpcAuthLayer<T, R> {
    fn clone(&self) -> Self {
        Self {
            interceptor: self.interceptor.clone(),
        }
    }
}

impl<T, R> RpcAuthLayer<T, R> {
    pub fn new(interceptor: RpcTokenInterceptor<T, R>) -> Self {
        Self { interceptor }
    }
}

impl<S, T, R> Layer<S> for RpcAuthLayer<T, R> {
    type Service = RpcAuthService<S, T, R>;

    fn layer(&self, service: S) -> Self::Service {
        RpcAuthService {
            inner: service,
            interceptor: self.interceptor.clone(),
        }
    }
}

pub struct RpcAuthService<S, T, R> {
    inner: S,
    interceptor: RpcTokenInterceptor<T, R>,
}

impl<S: Clone, T, R> Clone for RpcAuthService<S, T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            interceptor: self.interceptor.clone(),
        }
    }
}

impl<S, T, R, ReqBody> Service<http::Request<ReqBody>> for RpcAuthService<S, T, R>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<BoxBody>> + Clone + Send + 'static,
    S::Future: Send,
    T: Clone + Send + Sync + 'static,
    R: PrincipalResolver<T> + 'static,
    ReqBody: Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: http::Request<ReqBody>) -> Self::Future {
        // The clone may not be ready; keep the one that was polled
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let interceptor = self.interceptor.clone();

        Box::pin(async move {
            match interceptor.intercept(request).await {
                Ok(request) => inner.call(request).await,
                Err(status) => Ok(status.into_http()),
            }
        })
    }
}
