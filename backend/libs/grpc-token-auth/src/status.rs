//! Mapping of core authentication errors to gRPC status codes
//!
//! Messages are deliberately generic: resolver and verifier details go to
//! the log, never to the caller.

use token_auth_core::AuthError;
use tonic::Status;

pub fn to_status(error: &AuthError) -> Status {
    match error {
        AuthError::InvalidScheme | AuthError::EmptyToken => {
            Status::unauthenticated("missing or invalid authorization header")
        }
        AuthError::InsufficientAuthority => Status::permission_denied("insufficient permissions"),
        e if e.is_caller_fault() => Status::unauthenticated("invalid token"),
        _ => Status::internal("authorization check failed"),
    }
}
