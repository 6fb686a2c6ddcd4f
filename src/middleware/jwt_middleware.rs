/// Bearer Authentication Middleware
///
/// Validates the access token from the Authorization header and injects its
/// claims into request extensions for route handlers. Rejections render the
/// standard error body with `TOKEN_NOT_FOUND`, `TOKEN_EXPIRED` or `INVALID_TOKEN`.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{TokenDecoder, TokenKind};
use crate::error::{AppError, AuthError};

/// Guards a route with a bearer access token
#[derive(Clone)]
pub struct JwtMiddleware {
    decoder: TokenDecoder,
}

impl JwtMiddleware {
    pub fn new(decoder: TokenDecoder) -> Self {
        Self { decoder }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            decoder: self.decoder.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    decoder: TokenDecoder,
}

/// Extracts the token from `Authorization: Bearer <token>`.
fn bearer_token(req: &ServiceRequest) -> Result<String, AuthError> {
    let header = match req.headers().get(AUTHORIZATION) {
        Some(value) => value.to_str().map_err(|_| AuthError::TokenInvalid)?,
        None => return Err(AuthError::TokenMissing),
    };

    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("Bearer") && !token.trim().is_empty() => {
            Ok(token.trim().to_string())
        }
        _ if header.trim().is_empty() => Err(AuthError::TokenMissing),
        _ => Err(AuthError::TokenInvalid),
    }
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let verified = bearer_token(&req)
            .and_then(|token| self.decoder.decode(&token, TokenKind::Access));

        match verified {
            Ok(claims) => {
                tracing::debug!(user_id = %claims.sub, "Bearer token accepted");
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move { Ok(service.call(req).await?.map_into_left_body()) })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), reason = %e, "Bearer token rejected");
                // Rendered here so outer middleware still decorates the 401
                let res = req.error_response(AppError::Auth(e)).map_into_right_body();
                Box::pin(async move { Ok(res) })
            }
        }
    }
}
