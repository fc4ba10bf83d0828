//! Integration tests for the actix middleware pair
//!
//! Route policy under test:
//!
//! - `ANY:/health`, `ANY:/public/*`: no authentication
//! - `GET:/secure`, `GET:/wild/*`: `ADMIN`
//! - `ANY:/common/*`: `USER`
//! - `GET:/me`: any authenticated caller

use actix_token_auth::{Authenticate, Authenticated, Authorize, DefaultResponders, HttpResponders};
use actix_web::http::StatusCode;
use actix_web::{test, web, App, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use token_auth_core::{AuthTokenType, HttpSecurityConfig, PrincipalResolver, RouteKey};

#[derive(Debug, Clone, PartialEq)]
struct User {
    name: String,
    authorities: HashSet<String>,
}

impl User {
    fn new(name: &str, authorities: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            authorities: authorities.iter().map(|a| a.to_string()).collect(),
        }
    }
}

struct UserTable;

#[async_trait]
impl PrincipalResolver<User> for UserTable {
    async fn get_principal(&self, token_type: AuthTokenType, credential: &str) -> anyhow::Result<User> {
        anyhow::ensure!(token_type == AuthTokenType::Bearer, "bearer tokens only");
        match credential {
            "admin-token" => Ok(User::new("alice", &["ADMIN"])),
            "user-token" => Ok(User::new("bob", &["USER"])),
            "broken-token" => Ok(User::new("carol", &[])),
            _ => anyhow::bail!("unknown token"),
        }
    }

    async fn get_authorities(&self, user: &User) -> anyhow::Result<HashSet<String>> {
        anyhow::ensure!(user.name != "carol", "directory unavailable");
        Ok(user.authorities.clone())
    }
}

type UserAuthenticate = Authenticate<User, UserTable>;
type UserAuthorize = Authorize<User, UserTable>;

fn security_config() -> Arc<HttpSecurityConfig> {
    Arc::new(
        HttpSecurityConfig::new()
            .permit(RouteKey::any("/health"))
            .permit(RouteKey::any("/public/*"))
            .require(RouteKey::new("GET", "/secure"), ["ADMIN"])
            .require(RouteKey::new("GET", "/wild/*"), ["ADMIN"])
            .require(RouteKey::any("/common/*"), ["USER"])
            .require(RouteKey::new("GET", "/me"), Vec::<String>::new()),
    )
}

async fn whoami(user: Authenticated<User>) -> HttpResponse {
    HttpResponse::Ok().body(user.name.clone())
}

async fn open() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

macro_rules! routes {
    ($app:expr) => {
        $app.route("/health", web::get().to(open))
            .route("/public/{tail:.*}", web::get().to(open))
            .route("/secure", web::get().to(whoami))
            .route("/me", web::get().to(whoami))
            .route("/wild/{tail:.*}", web::get().to(whoami))
            .route("/common/{tail:.*}", web::route().to(whoami))
    };
}

macro_rules! secured_app {
    () => {{
        let resolver = Arc::new(UserTable);
        let config = security_config();
        test::init_service(routes!(App::new()
            .wrap(UserAuthorize::new(resolver.clone(), config.clone()))
            .wrap(UserAuthenticate::new(resolver, config))))
        .await
    }};
}

fn get(uri: &str, token: Option<&str>) -> test::TestRequest {
    let req = test::TestRequest::get().uri(uri);
    match token {
        Some(token) => req.insert_header(("Authorization", format!("Bearer {token}"))),
        None => req,
    }
}

#[actix_web::test]
async fn test_secure_route_allows_admin() {
    let app = secured_app!();

    let resp = test::call_service(&app, get("/secure", Some("admin-token")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&test::read_body(resp).await[..], b"alice");
}

#[actix_web::test]
async fn test_secure_route_denies_user() {
    let app = secured_app!();

    let resp = test::call_service(&app, get("/secure", Some("user-token")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "forbidden");
}

#[actix_web::test]
async fn test_unauthenticated_is_rejected_before_authority_check() {
    let app = secured_app!();

    let resp = test::call_service(&app, get("/secure", None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "missing authorization header");
}

#[actix_web::test]
async fn test_invalid_scheme_and_unknown_token() {
    let app = secured_app!();

    let req = test::TestRequest::get()
        .uri("/secure")
        .insert_header(("Authorization", "Token admin-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unauthorized");

    let resp = test::call_service(&app, get("/secure", Some("forged")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_empty_credential_is_unauthorized() {
    let app = secured_app!();

    let req = test::TestRequest::get()
        .uri("/me")
        .insert_header(("Authorization", "Bearer    "))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_permit_all_routes_skip_authentication() {
    let app = secured_app!();

    let resp = test::call_service(&app, get("/health", None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, get("/public/docs/index.html", None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_wildcard_route() {
    let app = secured_app!();

    let resp = test::call_service(&app, get("/wild/anything", Some("admin-token")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, get("/wild/", Some("admin-token")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, get("/wild/anything", Some("user-token")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_any_method_wildcard_route() {
    let app = secured_app!();

    for req in [
        test::TestRequest::post(),
        test::TestRequest::put(),
        test::TestRequest::delete(),
    ] {
        let req = req
            .uri("/common/items/1")
            .insert_header(("Authorization", "Bearer user-token"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::post()
        .uri("/common/items/1")
        .insert_header(("Authorization", "Bearer admin-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_authenticated_only_route() {
    let app = secured_app!();

    let resp = test::call_service(&app, get("/me", Some("user-token")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&test::read_body(resp).await[..], b"bob");

    // No authority lookup happens, so the failing directory is never consulted
    let resp = test::call_service(&app, get("/me", Some("broken-token")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_authority_lookup_failure_is_internal_error() {
    let app = secured_app!();

    let resp = test::call_service(&app, get("/secure", Some("broken-token")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn test_authorize_without_principal_is_unauthorized() {
    let app = test::init_service(routes!(App::new().wrap(UserAuthorize::new(
        Arc::new(UserTable),
        security_config()
    ))))
    .await;

    let resp = test::call_service(&app, get("/secure", Some("admin-token")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(&app, get("/health", None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_extractor_without_middleware_is_unauthorized() {
    let app = test::init_service(routes!(App::new())).await;

    let resp = test::call_service(&app, get("/me", Some("admin-token")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

struct TeapotResponders;

impl HttpResponders for TeapotResponders {
    fn missing_authorization_header(&self, req: &HttpRequest) -> HttpResponse {
        DefaultResponders.missing_authorization_header(req)
    }

    fn unauthorized(&self, req: &HttpRequest) -> HttpResponse {
        DefaultResponders.unauthorized(req)
    }

    fn forbidden(&self, req: &HttpRequest) -> HttpResponse {
        HttpResponse::build(StatusCode::IM_A_TEAPOT).body(format!("no entry: {}", req.path()))
    }
}

#[actix_web::test]
async fn test_custom_responders() {
    let resolver = Arc::new(UserTable);
    let config = security_config();
    let app = test::init_service(routes!(App::new()
        .wrap(UserAuthorize::new(resolver.clone(), config.clone()).with_responders(TeapotResponders))
        .wrap(UserAuthenticate::new(resolver, config))))
    .await;

    let resp = test::call_service(&app, get("/secure", Some("user-token")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(&test::read_body(resp).await[..], b"no entry: /secure");
}
