//! Route and method authorization policy
//!
//! HTTP routes are configured with route keys of the form `METHOD:/path`.
//! `ANY` matches every method and a trailing `/*` turns the key into a prefix
//! match:
//!
//! | key | matches |
//! |---|---|
//! | `GET:/secure` | only `GET /secure` |
//! | `ANY:/health` | `/health` with any method |
//! | `GET:/wild/*` | `GET /wild/` and everything below it |
//! | `ANY:/common/*` | everything below `/common/`, any method |
//!
//! Lookup order is exact method, exact `ANY`, method wildcards, `ANY`
//! wildcards. Wildcards of the same class are tried in configuration order;
//! overlapping wildcards are a configuration error with no defined winner.
//!
//! RPC methods are fully qualified already, so they use a plain list of
//! [`SecuredMethod`] keyed by exact method name.

use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Method placeholder matching every HTTP method
pub const ANY_METHOD: &str = "ANY";

const WILDCARD_SUFFIX: &str = "/*";

/// `METHOD:path` composite key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    method: String,
    path: String,
}

impl RouteKey {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
        }
    }

    pub fn any(path: &str) -> Self {
        Self::new(ANY_METHOD, path)
    }

    /// Parse `METHOD:/path`; the method part must be non-empty and the path
    /// must start with `/`.
    pub fn parse(raw: &str) -> AuthResult<Self> {
        let (method, path) = raw
            .trim()
            .split_once(':')
            .ok_or_else(|| AuthError::InvalidRouteKey(raw.to_string()))?;

        if method.is_empty() || !path.starts_with('/') {
            return Err(AuthError::InvalidRouteKey(raw.to_string()));
        }

        Ok(Self::new(method, path))
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_any_method(&self) -> bool {
        self.method == ANY_METHOD
    }

    pub fn is_wildcard(&self) -> bool {
        self.path.ends_with(WILDCARD_SUFFIX)
    }

    /// `GET:/wild/*` -> `/wild/`
    fn wildcard_prefix(&self) -> &str {
        &self.path[..self.path.len() - 1]
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.method, self.path)
    }
}

impl FromStr for RouteKey {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone)]
struct WildcardEntry<V> {
    key: RouteKey,
    value: V,
}

/// Route key lookup table with exact and prefix-wildcard entries
#[derive(Debug, Clone)]
pub struct RouteTable<V> {
    exact: HashMap<RouteKey, V>,
    wildcards: Vec<WildcardEntry<V>>,
}

impl<V> Default for RouteTable<V> {
    fn default() -> Self {
        Self {
            exact: HashMap::new(),
            wildcards: Vec::new(),
        }
    }
}

impl<V> RouteTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `key`
    pub fn insert(&mut self, key: RouteKey, value: V) {
        if key.is_wildcard() {
            match self.wildcards.iter_mut().find(|entry| entry.key == key) {
                Some(entry) => entry.value = value,
                None => self.wildcards.push(WildcardEntry { key, value }),
            }
        } else {
            self.exact.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the entry governing `method` + `path`
    pub fn lookup(&self, method: &str, path: &str) -> Option<&V> {
        let method = method.to_ascii_uppercase();

        if let Some(value) = self.exact.get(&RouteKey::new(&method, path)) {
            return Some(value);
        }
        if let Some(value) = self.exact.get(&RouteKey::any(path)) {
            return Some(value);
        }

        let method_match = self
            .wildcards
            .iter()
            .filter(|entry| !entry.key.is_any_method())
            .find(|entry| entry.key.method == method && path.starts_with(entry.key.wildcard_prefix()));
        if let Some(entry) = method_match {
            return Some(&entry.value);
        }

        self.wildcards
            .iter()
            .filter(|entry| entry.key.is_any_method())
            .find(|entry| path.starts_with(entry.key.wildcard_prefix()))
            .map(|entry| &entry.value)
    }

    pub fn contains(&self, method: &str, path: &str) -> bool {
        self.lookup(method, path).is_some()
    }
}

/// HTTP security configuration: authentication-exempt routes and the
/// authority sets demanded by protected routes
#[derive(Debug, Clone, Default)]
pub struct HttpSecurityConfig {
    permit_all: RouteTable<()>,
    authorities: RouteTable<HashSet<String>>,
}

impl HttpSecurityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exempt `key` from authentication
    pub fn permit(mut self, key: RouteKey) -> Self {
        self.permit_all.insert(key, ());
        self
    }

    /// Require any of `authorities` on `key`. An empty set means
    /// "authenticated is enough".
    pub fn require<I, S>(mut self, key: RouteKey, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorities
            .insert(key, authorities.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_permitted(&self, method: &str, path: &str) -> bool {
        self.permit_all.contains(method, path)
    }

    /// Authorities required for the route, or `None` when any authenticated
    /// principal may pass
    pub fn required_authorities(&self, method: &str, path: &str) -> Option<&HashSet<String>> {
        self.authorities
            .lookup(method, path)
            .filter(|authorities| !authorities.is_empty())
    }
}

/// RPC method requiring authentication, optionally with authorities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuredMethod {
    pub method: String,
    #[serde(default)]
    pub authorities: HashSet<String>,
}

impl SecuredMethod {
    pub fn new<I, S>(method: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method: method.into(),
            authorities: authorities.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn find_secured_method<'a>(methods: &'a [SecuredMethod], method: &str) -> Option<&'a SecuredMethod> {
    methods.iter().find(|secured| secured.method == method)
}

/// True iff `required` and `held` share at least one authority.
///
/// An empty `required` set returns false; callers treat it as "no specific
/// authority needed" before calling this.
pub fn has_any_authority(required: &HashSet<String>, held: &HashSet<String>) -> bool {
    required.iter().any(|authority| held.contains(authority))
}
