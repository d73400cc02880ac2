//! Security response headers.
//!
//! # Responsibilities
//! - Add hardening headers to every response
//! - Strip headers that fingerprint the server stack
//!
//! # Design Decisions
//! - API responses are never cacheable
//! - The CSP allows nothing: responses are JSON, never rendered

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

const CONTENT_SECURITY_POLICY: &str = "default-src 'none'; frame-ancestors 'none';";

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("cache-control", "no-store, no-cache, must-revalidate, private, max-age=0"),
    ("pragma", "no-cache"),
    ("expires", "0"),
    ("surrogate-control", "no-store"),
    ("x-robots-tag", "noindex, nofollow, noarchive, nosnippet, notranslate, noimageindex"),
    ("x-permitted-cross-domain-policies", "none"),
    ("cross-origin-embedder-policy", "require-corp"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("content-security-policy", CONTENT_SECURITY_POLICY),
];

const STRIPPED_HEADERS: &[&str] = &["x-powered-by", "x-aspnet-version", "x-aspnetmvc-version"];

/// Middleware adding hardening headers to the response.
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply_security_headers(&mut response);
    response
}

pub fn apply_security_headers(response: &mut Response) {
    let headers = response.headers_mut();

    for &(name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    headers.remove(header::SERVER);
    for name in STRIPPED_HEADERS {
        headers.remove(*name);
    }
}
