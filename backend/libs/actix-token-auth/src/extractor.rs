//! Handler-side access to the authenticated principal

use actix_web::dev::Payload;
use actix_web::{error::ErrorUnauthorized, Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{ready, Ready};
use std::ops::Deref;
use token_auth_core::context;

/// The principal attached by [`Authenticate`](crate::Authenticate)
///
/// Extraction fails with 401 when no principal of type `T` is present.
///
/// ```rust,ignore
/// async fn me(user: Authenticated<User>) -> impl Responder {
///     HttpResponse::Ok().json(&user.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticated<T>(pub T);

impl<T> Authenticated<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Authenticated<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> FromRequest for Authenticated<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            context::principal::<T, _>(&*req.extensions())
                .cloned()
                .map(Authenticated)
                .ok_or_else(|| ErrorUnauthorized("not authenticated")),
        )
    }
}
