//! Request-scoped security context
//!
//! After authentication the token type, the raw credential and the resolved
//! principal are stored in the request's extension map under three distinct
//! wrapper types. Both transports use the same wrappers, so downstream code
//! (audit logging, entitlement checks) reads them the same way regardless of
//! whether the call arrived over gRPC or HTTP.
//!
//! Readers get `None` when a value is absent or stored with a different type;
//! neither case is an error.

use crate::principal::Authentication;
use crate::scheme::AuthTokenType;

/// Key for the scheme the caller authenticated with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTypeEntry(pub AuthTokenType);

/// Key for the raw credential (without the scheme prefix)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenEntry(pub String);

/// Key for the resolved principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalEntry<T>(pub T);

/// Type-keyed request storage
pub trait ContextStore {
    fn put<V: Clone + Send + Sync + 'static>(&mut self, value: V);

    fn fetch<V: Clone + Send + Sync + 'static>(&self) -> Option<&V>;
}

impl ContextStore for http::Extensions {
    fn put<V: Clone + Send + Sync + 'static>(&mut self, value: V) {
        self.insert(value);
    }

    fn fetch<V: Clone + Send + Sync + 'static>(&self) -> Option<&V> {
        self.get::<V>()
    }
}

#[cfg(feature = "actix")]
impl ContextStore for actix_web::dev::Extensions {
    fn put<V: Clone + Send + Sync + 'static>(&mut self, value: V) {
        self.insert(value);
    }

    fn fetch<V: Clone + Send + Sync + 'static>(&self) -> Option<&V> {
        self.get::<V>()
    }
}

/// Store an authenticated caller. Called once per request, right after
/// authentication succeeds.
pub fn attach<S, T>(store: &mut S, authentication: Authentication<T>)
where
    S: ContextStore + ?Sized,
    T: Clone + Send + Sync + 'static,
{
    store.put(TokenTypeEntry(authentication.token_type));
    store.put(AccessTokenEntry(authentication.token));
    store.put(PrincipalEntry(authentication.principal));
}

pub fn auth_token_type<S: ContextStore + ?Sized>(store: &S) -> Option<AuthTokenType> {
    store.fetch::<TokenTypeEntry>().map(|entry| entry.0)
}

pub fn access_token<S: ContextStore + ?Sized>(store: &S) -> Option<&str> {
    store.fetch::<AccessTokenEntry>().map(|entry| entry.0.as_str())
}

pub fn principal<T, S>(store: &S) -> Option<&T>
where
    T: Clone + Send + Sync + 'static,
    S: ContextStore + ?Sized,
{
    store.fetch::<PrincipalEntry<T>>().map(|entry| &entry.0)
}
