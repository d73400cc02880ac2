//! Request-scoped context.
//!
//! # Responsibilities
//! - Tag every request with an `x-request-id` (UUID v4) and echo it back
//! - Attach the request's deadline as an [`OperationContext`]
//! - Derive the client identity used for rate limiting
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Client identity comes from the transport peer only; forwarding headers
//!   such as `X-Forwarded-For` are client-controlled and never consulted

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

use crate::resilience::OperationContext;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Key shared by requests that carry no connection info.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Layer that assigns a request ID when the client did not send one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer that copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Access to the request ID set by [`set_request_id_layer`].
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.extensions()
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .unwrap_or("-")
    }
}

/// Client identity: the peer IP, or [`UNKNOWN_CLIENT`].
pub fn client_key<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Attach a deadline of `now + request_timeout` to the request.
pub async fn request_context_middleware(
    State(request_timeout): State<Duration>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    req.extensions_mut()
        .insert(OperationContext::with_timeout(request_timeout));
    next.run(req).await
}
