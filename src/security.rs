/// Security headers middleware
///
/// Responses to requests addressed to a local host (`localhost`, `127.0.0.1`)
/// carry `Cross-Origin-Opener-Policy: same-origin`.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1"];
const COOP_HEADER: &str = "cross-origin-opener-policy";

/// Strips the port from a `Host` value.
fn host_name(host: &str) -> &str {
    host.split(':').next().unwrap_or(host)
}

pub fn is_local_host(host: &str) -> bool {
    LOCAL_HOSTS.contains(&host_name(host))
}

pub struct SecurityHeaders;

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SecurityHeadersService {
            service: Rc::new(service),
        }))
    }
}

pub struct SecurityHeadersService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let local = is_local_host(req.connection_info().host());
        let service = self.service.clone();

        Box::pin(async move {
            let mut res = service.call(req).await?;
            if local {
                res.headers_mut().insert(
                    HeaderName::from_static(COOP_HEADER),
                    HeaderValue::from_static("same-origin"),
                );
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::header::HOST, test, web, App, HttpResponse};

    #[::core::prelude::v1::test]
    fn test_local_host_detection() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("localhost:8000"));
        assert!(is_local_host("127.0.0.1:8080"));
        assert!(!is_local_host("api.example.com"));
        assert!(!is_local_host("localhost.example.com"));
    }

    #[actix_web::test]
    async fn test_coop_header_only_for_local_hosts() {
        let app = test::init_service(
            App::new()
                .wrap(SecurityHeaders)
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let local = test::TestRequest::get()
            .uri("/")
            .insert_header((HOST, "localhost:8000"))
            .to_request();
        let res = test::call_service(&app, local).await;
        assert_eq!(res.headers().get(COOP_HEADER).unwrap(), "same-origin");

        let remote = test::TestRequest::get()
            .uri("/")
            .insert_header((HOST, "api.example.com"))
            .to_request();
        let res = test::call_service(&app, remote).await;
        assert!(res.headers().get(COOP_HEADER).is_none());
    }
}
