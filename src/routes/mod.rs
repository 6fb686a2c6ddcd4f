/// Route registration table
///
/// Every endpoint is declared once in `route_table()`. `configure` registers
/// the table with actix, and `docs::openapi_document` renders the same table
/// as an OpenAPI document, so the two cannot drift apart.

mod auth;
mod docs;
mod health_check;

pub use auth::{login, logout, refresh, signup, REFRESH_TOKEN_HEADER};
pub use docs::{openapi, openapi_document, OPENAPI_PATH};
pub use health_check::health_check;

use actix_web::{http::Method, web, Route};

use crate::auth::TokenDecoder;
use crate::middleware::JwtMiddleware;

/// One documented endpoint
pub struct RouteSpec {
    pub method: Method,
    pub path: &'static str,
    pub summary: &'static str,
    pub requires_bearer: bool,
    /// Required JSON body fields, if the endpoint takes a body
    pub body_fields: &'static [&'static str],
    /// Required request headers besides `Authorization`
    pub headers: &'static [&'static str],
    pub responses: &'static [(u16, &'static str)],
    /// Attaches the handler to a route of `method`
    pub handler: fn(Route) -> Route,
}

pub fn route_table() -> Vec<RouteSpec> {
    vec![
        RouteSpec {
            method: Method::GET,
            path: "/health_check",
            summary: "Liveness probe",
            requires_bearer: false,
            body_fields: &[],
            headers: &[],
            responses: &[(200, "Service is up")],
            handler: |route| route.to(health_check),
        },
        RouteSpec {
            method: Method::POST,
            path: "/auth/signup",
            summary: "Register a new user",
            requires_bearer: false,
            body_fields: &["username", "password", "nickname"],
            headers: &[],
            responses: &[
                (201, "User created; returns username and nickname"),
                (400, "VALIDATION_ERROR or USER_ALREADY_EXISTS"),
            ],
            handler: |route| route.to(signup),
        },
        RouteSpec {
            method: Method::POST,
            path: "/auth/login",
            summary: "Exchange credentials for an access/refresh token pair",
            requires_bearer: false,
            body_fields: &["username", "password"],
            headers: &[],
            responses: &[
                (200, "access_token and refresh_token"),
                (400, "VALIDATION_ERROR or INVALID_CREDENTIALS"),
            ],
            handler: |route| route.to(login),
        },
        RouteSpec {
            method: Method::POST,
            path: "/auth/logout",
            summary: "Blacklist the refresh token given in X-Refresh-Token",
            requires_bearer: true,
            body_fields: &[],
            headers: &[REFRESH_TOKEN_HEADER],
            responses: &[
                (200, "Logged out"),
                (400, "REFRESH_TOKEN_REQUIRED or LOGOUT_FAILED"),
                (401, "Bearer access token missing, expired or invalid"),
            ],
            handler: |route| route.to(logout),
        },
        RouteSpec {
            method: Method::POST,
            path: "/auth/refresh",
            summary: "Issue a new access token from a refresh token",
            requires_bearer: false,
            body_fields: &["refresh_token"],
            headers: &[],
            responses: &[
                (200, "access_token"),
                (401, "Refresh token missing, expired, invalid or blacklisted"),
            ],
            handler: |route| route.to(refresh),
        },
    ]
}

/// Registers every route in the table, wrapping bearer-protected ones in `JwtMiddleware`.
pub fn configure(cfg: &mut web::ServiceConfig, decoder: &TokenDecoder) {
    for spec in route_table() {
        let route = (spec.handler)(web::method(spec.method.clone()));
        if spec.requires_bearer {
            cfg.service(
                web::resource(spec.path)
                    .route(route)
                    .wrap(JwtMiddleware::new(decoder.clone())),
            );
        } else {
            cfg.service(web::resource(spec.path).route(route));
        }
    }
    cfg.route(OPENAPI_PATH, web::get().to(openapi));
}
