//! gRPC binding for token authentication
//!
//! ## Components
//!
//! - **RpcTokenInterceptor**: authenticates and authorizes secured methods
//! - **RpcAuthLayer**: tower layer installing the interceptor on a tonic server
//! - **SecurityContextExt**: handler access to the authenticated caller
//! - **ClientTokenInterceptor**: attaches `Basic` / `Bearer` credentials to outgoing calls
//!
//! ## Usage
//!
//! ```rust,no_run
//! use grpc_token_auth::{RpcAuthLayer, RpcTokenInterceptor};
//! use std::sync::Arc;
//! use token_auth_core::{JwtClaimsResolver, JwtTokenService, SecuredMethod};
//!
//! # fn example(service: Arc<JwtTokenService>) {
//! let interceptor = RpcTokenInterceptor::new(
//!     Arc::new(JwtClaimsResolver::new(service)),
//!     vec![SecuredMethod::new("/user.UserService/DeleteUser", ["ADMIN"])],
//! );
//! let layer = RpcAuthLayer::new(interceptor);
//! // Server::builder().layer(layer).add_service(...)
//! # }
//! ```
//!
//! Status mapping: missing or malformed credentials and failed principal
//! resolution are `Unauthenticated`, missing authority is `PermissionDenied`,
//! an authority lookup failure is `Internal`.

mod client;
pub mod deadline;
mod extensions;
mod interceptor;
mod layer;
pub mod status;

pub use client::ClientTokenInterceptor;
pub use extensions::SecurityContextExt;
pub use interceptor::RpcTokenInterceptor;
pub use layer::{RpcAuthLayer, RpcAuthService};
pub use status::to_status;

// Re-export tonic Status for convenience
pub use tonic::Status;
