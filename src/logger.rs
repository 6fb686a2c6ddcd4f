use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::info;
use tracing::Instrument;
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The id assigned to the current request, available from request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Request logging middleware
/// Tags every request with an id, logs its outcome and latency, and echoes
/// the id back in `x-request-id`. Downstream events are recorded inside a
/// `request` span carrying the same id.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
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
        let start_time = Instant::now();
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|id| !id.is_empty() && id.len() <= 64)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let method = req.method().to_string();
        let path = req.path().to_string();

        info!("[{}] {} {} started", request_id, method, path);

        req.extensions_mut().insert(RequestId(request_id.clone()));
        let span = tracing::info_span!("request", request_id = %request_id);
        let service = self.service.clone();

        Box::pin(async move {
            let mut res = match service.call(req).await {
                Ok(res) => res,
                Err(e) => {
                    // Errors escaping inner middleware still get a log line
                    info!(
                        "[{}] {} {} -> {} ({}ms)",
                        request_id,
                        method,
                        path,
                        e.as_response_error().status_code().as_u16(),
                        start_time.elapsed().as_millis()
                    );
                    return Err(e);
                }
            };

            info!(
                "[{}] {} {} -> {} ({}ms)",
                request_id,
                method,
                path,
                res.status().as_u16(),
                start_time.elapsed().as_millis()
            );

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            Ok(res)
        }.instrument(span))
    }
}
