//! Actix-web binding for token authentication
//!
//! Two independently composable middleware stages:
//!
//! - [`Authenticate`]: parses `Authorization`, resolves the principal and
//!   attaches the security context (401 on failure)
//! - [`Authorize`]: checks the route's required authorities against the
//!   attached principal (401 / 403 / 500)
//!
//! Handlers read the caller with the [`Authenticated`] extractor or
//! `token_auth_core::context` on the request extensions.

mod authenticate;
mod authorize;
mod extractor;
mod responders;

pub use authenticate::{Authenticate, AuthenticateMiddleware};
pub use authorize::{Authorize, AuthorizeMiddleware};
pub use extractor::Authenticated;
pub use responders::{DefaultResponders, HttpResponders};
