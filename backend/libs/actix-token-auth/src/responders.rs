//! Rejection responses for the HTTP middleware
//!
//! The embedding application owns the response format. Each callback fully
//! builds the response; the middleware only decides which one to call.

use actix_web::{HttpRequest, HttpResponse};
use serde_json::json;

pub trait HttpResponders: 'static {
    /// No `Authorization` header, or one that is not valid UTF-8
    fn missing_authorization_header(&self, req: &HttpRequest) -> HttpResponse;

    /// Bad scheme, empty credential or an unresolvable principal
    fn unauthorized(&self, req: &HttpRequest) -> HttpResponse;

    fn forbidden(&self, req: &HttpRequest) -> HttpResponse;

    /// The authority lookup itself failed
    fn internal_error(&self, _req: &HttpRequest) -> HttpResponse {
        HttpResponse::InternalServerError().json(json!({ "error": "authorization check failed" }))
    }
}

/// JSON `{"error": ...}` bodies with the matching status code
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponders;

impl HttpResponders for DefaultResponders {
    fn missing_authorization_header(&self, _req: &HttpRequest) -> HttpResponse {
        HttpResponse::Unauthorized().json(json!({ "error": "missing authorization header" }))
    }

    fn unauthorized(&self, _req: &HttpRequest) -> HttpResponse {
        HttpResponse::Unauthorized().json(json!({ "error": "unauthorized" }))
    }

    fn forbidden(&self, _req: &HttpRequest) -> HttpResponse {
        HttpResponse::Forbidden().json(json!({ "error": "forbidden" }))
    }
}
