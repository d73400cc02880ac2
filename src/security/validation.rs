//! Request validation chain.
//!
//! # Stages (in order)
//! 1. Method allow-list
//! 2. Request target length
//! 3. Declared body size
//! 4. Header count, names and values
//! 5. URL path, raw and percent-decoded
//! 6. Content-Type for requests carrying a body
//!
//! # Design Decisions
//! - Cheap structural checks run before content scans
//! - The first rejecting stage ends the chain; nothing after it runs
//! - Client-facing messages are generic; detail goes to the logs, redacted

use std::fmt::Debug;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::percent_decode_str;

use crate::config::ValidationConfig;
use crate::security::patterns::{
    contains_control_characters, redact, BlocklistInspector, ContentInspector,
};

/// Kind of security event raised by a rejecting stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    InvalidHttpMethod,
    UrlTooLong,
    RequestBodyTooLarge,
    InvalidContentLength,
    TooManyHeaders,
    InvalidHeaderName,
    HeaderValueTooLong,
    SuspiciousHeaderValue,
    ControlCharsInHeader,
    InvalidUrlEncoding,
    SuspiciousUrlPath,
    ControlCharsInPath,
    NullByteInPath,
    MissingContentType,
    InvalidContentType,
}

impl SecurityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEvent::InvalidHttpMethod => "INVALID_HTTP_METHOD",
            SecurityEvent::UrlTooLong => "URL_TOO_LONG",
            SecurityEvent::RequestBodyTooLarge => "REQUEST_BODY_TOO_LARGE",
            SecurityEvent::InvalidContentLength => "INVALID_CONTENT_LENGTH",
            SecurityEvent::TooManyHeaders => "TOO_MANY_HEADERS",
            SecurityEvent::InvalidHeaderName => "INVALID_HEADER_NAME",
            SecurityEvent::HeaderValueTooLong => "HEADER_VALUE_TOO_LONG",
            SecurityEvent::SuspiciousHeaderValue => "SUSPICIOUS_HEADER_VALUE",
            SecurityEvent::ControlCharsInHeader => "CONTROL_CHARS_IN_HEADER",
            SecurityEvent::InvalidUrlEncoding => "INVALID_URL_ENCODING",
            SecurityEvent::SuspiciousUrlPath => "SUSPICIOUS_URL_PATH",
            SecurityEvent::ControlCharsInPath => "CONTROL_CHARS_IN_PATH",
            SecurityEvent::NullByteInPath => "NULL_BYTE_IN_PATH",
            SecurityEvent::MissingContentType => "MISSING_CONTENT_TYPE",
            SecurityEvent::InvalidContentType => "INVALID_CONTENT_TYPE",
        }
    }
}

impl std::fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a stage that refused the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub event: SecurityEvent,
    /// Safe to show the client.
    pub message: &'static str,
    /// Server-side diagnostics. May hold attacker input; redact before logging.
    pub detail: String,
}

impl Rejection {
    fn new(
        status: StatusCode,
        event: SecurityEvent,
        message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            event,
            message,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

/// A single stateless check in the chain.
pub trait ValidationStage: Send + Sync + Debug {
    /// Stage name for logging.
    fn name(&self) -> &'static str;

    /// `Ok` passes the request on; `Err` ends the chain.
    fn check(&self, req: &Request<Body>) -> Result<(), Rejection>;
}

/// Only listed methods get through.
#[derive(Debug, Clone)]
pub struct MethodStage {
    allowed: Vec<Method>,
}

impl MethodStage {
    pub fn new(allowed: Vec<Method>) -> Self {
        Self { allowed }
    }
}

impl ValidationStage for MethodStage {
    fn name(&self) -> &'static str {
        "method"
    }

    fn check(&self, req: &Request<Body>) -> Result<(), Rejection> {
        if self.allowed.contains(req.method()) {
            return Ok(());
        }
        Err(Rejection::new(
            StatusCode::METHOD_NOT_ALLOWED,
            SecurityEvent::InvalidHttpMethod,
            "Method not allowed",
            req.method().as_str(),
        ))
    }
}

/// Ceiling on the request target (path and query).
#[derive(Debug, Clone)]
pub struct UrlLengthStage {
    max: usize,
}

impl UrlLengthStage {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl ValidationStage for UrlLengthStage {
    fn name(&self) -> &'static str {
        "url_length"
    }

    fn check(&self, req: &Request<Body>) -> Result<(), Rejection> {
        let len = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().len())
            .unwrap_or_else(|| req.uri().to_string().len());

        if len <= self.max {
            return Ok(());
        }
        Err(Rejection::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            SecurityEvent::UrlTooLong,
            "Request URL too large",
            format!("URL length: {}", len),
        ))
    }
}

/// Ceiling on the declared body size, checked before any body is read.
#[derive(Debug, Clone)]
pub struct BodySizeStage {
    max: u64,
}

impl BodySizeStage {
    pub fn new(max: u64) -> Self {
        Self { max }
    }
}

impl ValidationStage for BodySizeStage {
    fn name(&self) -> &'static str {
        "body_size"
    }

    fn check(&self, req: &Request<Body>) -> Result<(), Rejection> {
        let Some(value) = req.headers().get(header::CONTENT_LENGTH) else {
            return Ok(());
        };

        let declared = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                Rejection::new(
                    StatusCode::BAD_REQUEST,
                    SecurityEvent::InvalidContentLength,
                    "Invalid Content-Length",
                    String::from_utf8_lossy(value.as_bytes()),
                )
            })?;

        if declared <= self.max {
            return Ok(());
        }
        Err(Rejection::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            SecurityEvent::RequestBodyTooLarge,
            "Request body too large",
            format!("Content-Length: {}", declared),
        ))
    }
}

/// Header count, name charset, value length and value content.
#[derive(Debug, Clone)]
pub struct HeaderStage {
    max_count: usize,
    max_name_length: usize,
    max_value_length: usize,
    inspector: Arc<dyn ContentInspector>,
}

impl HeaderStage {
    pub fn new(config: &ValidationConfig, inspector: Arc<dyn ContentInspector>) -> Self {
        Self {
            max_count: config.max_header_count,
            max_name_length: config.max_header_name_length,
            max_value_length: config.max_header_value_length,
            inspector,
        }
    }

    fn valid_name(&self, name: &str) -> bool {
        !name.is_empty()
            && name.len() <= self.max_name_length
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }
}

impl ValidationStage for HeaderStage {
    fn name(&self) -> &'static str {
        "headers"
    }

    fn check(&self, req: &Request<Body>) -> Result<(), Rejection> {
        let headers = req.headers();

        if headers.keys_len() > self.max_count {
            return Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                SecurityEvent::TooManyHeaders,
                "Too many headers",
                format!("Header count: {}", headers.keys_len()),
            ));
        }

        for name in headers.keys() {
            let name = name.as_str();
            if !self.valid_name(name) {
                return Err(Rejection::new(
                    StatusCode::BAD_REQUEST,
                    SecurityEvent::InvalidHeaderName,
                    "Invalid header name",
                    name,
                ));
            }

            for value in headers.get_all(name) {
                let raw = value.as_bytes();
                if raw.len() > self.max_value_length {
                    return Err(Rejection::new(
                        StatusCode::BAD_REQUEST,
                        SecurityEvent::HeaderValueTooLong,
                        "Header value too long",
                        format!("Header: {}, Length: {}", name, raw.len()),
                    ));
                }

                let text = String::from_utf8_lossy(raw);
                if self.inspector.is_suspicious(&text) {
                    return Err(Rejection::new(
                        StatusCode::BAD_REQUEST,
                        SecurityEvent::SuspiciousHeaderValue,
                        "Invalid header value",
                        format!("Header: {}, Value: {}", name, text),
                    ));
                }

                if contains_control_characters(&text) {
                    return Err(Rejection::new(
                        StatusCode::BAD_REQUEST,
                        SecurityEvent::ControlCharsInHeader,
                        "Invalid characters in header",
                        format!("Header: {}", name),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Path checks on both the raw and the percent-decoded form.
#[derive(Debug, Clone)]
pub struct PathStage {
    inspector: Arc<dyn ContentInspector>,
}

impl PathStage {
    pub fn new(inspector: Arc<dyn ContentInspector>) -> Self {
        Self { inspector }
    }
}

impl ValidationStage for PathStage {
    fn name(&self) -> &'static str {
        "path"
    }

    fn check(&self, req: &Request<Body>) -> Result<(), Rejection> {
        let path = req.uri().path();

        let decoded = decode_path(path).ok_or_else(|| {
            Rejection::new(
                StatusCode::BAD_REQUEST,
                SecurityEvent::InvalidUrlEncoding,
                "Invalid URL encoding",
                path,
            )
        })?;

        if self.inspector.is_suspicious(path) || self.inspector.is_suspicious(&decoded) {
            return Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                SecurityEvent::SuspiciousUrlPath,
                "Invalid URL path",
                path,
            ));
        }

        if contains_control_characters(path) || contains_control_characters(&decoded) {
            return Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                SecurityEvent::ControlCharsInPath,
                "Invalid characters in URL path",
                path,
            ));
        }

        if path.contains('\0') || decoded.contains('\0') {
            return Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                SecurityEvent::NullByteInPath,
                "Invalid characters in URL path",
                path,
            ));
        }

        Ok(())
    }
}

/// Requests carrying a body must declare an allowed Content-Type.
#[derive(Debug, Clone)]
pub struct ContentTypeStage {
    allowed: Vec<String>,
}

impl ContentTypeStage {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    fn carries_body(req: &Request<Body>) -> bool {
        if matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
            return false;
        }
        let headers = req.headers();
        let declared = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .is_some_and(|len| len > 0);
        declared || headers.contains_key(header::TRANSFER_ENCODING)
    }
}

impl ValidationStage for ContentTypeStage {
    fn name(&self) -> &'static str {
        "content_type"
    }

    fn check(&self, req: &Request<Body>) -> Result<(), Rejection> {
        if !Self::carries_body(req) {
            return Ok(());
        }

        let Some(value) = req.headers().get(header::CONTENT_TYPE) else {
            return Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                SecurityEvent::MissingContentType,
                "Content-Type header required",
                "",
            ));
        };

        let content_type = String::from_utf8_lossy(value.as_bytes()).to_lowercase();
        if self.allowed.iter().any(|a| content_type.starts_with(a.as_str())) {
            return Ok(());
        }
        Err(Rejection::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            SecurityEvent::InvalidContentType,
            "Unsupported content type",
            content_type,
        ))
    }
}

/// Percent-decode a path, treating `+` as a space.
///
/// Returns `None` on a malformed escape.
pub fn decode_path(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !well_formed {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = path.replace('+', " ");
    Some(percent_decode_str(&spaced).decode_utf8_lossy().into_owned())
}

/// The ordered chain of validation stages.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    stages: Vec<Arc<dyn ValidationStage>>,
    inspector: Arc<dyn ContentInspector>,
}

impl RequestValidator {
    /// Build the standard chain with the default blocklist.
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::with_inspector(config, Arc::new(BlocklistInspector::default()))
    }

    /// Build the standard chain around a custom inspector.
    pub fn with_inspector(config: &ValidationConfig, inspector: Arc<dyn ContentInspector>) -> Self {
        let methods = config
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse::<Method>().ok())
            .collect();

        let stages: Vec<Arc<dyn ValidationStage>> = vec![
            Arc::new(MethodStage::new(methods)),
            Arc::new(UrlLengthStage::new(config.max_url_length)),
            Arc::new(BodySizeStage::new(config.max_body_size)),
            Arc::new(HeaderStage::new(config, Arc::clone(&inspector))),
            Arc::new(PathStage::new(Arc::clone(&inspector))),
            Arc::new(ContentTypeStage::new(&config.allowed_content_types)),
        ];

        Self { stages, inspector }
    }

    /// Build a chain from explicit stages.
    pub fn from_stages(
        stages: Vec<Arc<dyn ValidationStage>>,
        inspector: Arc<dyn ContentInspector>,
    ) -> Self {
        Self { stages, inspector }
    }

    /// Run every stage in order, stopping at the first rejection.
    pub fn validate(&self, req: &Request<Body>) -> Result<(), Rejection> {
        for stage in &self.stages {
            if let Err(rejection) = stage.check(req) {
                tracing::trace!(stage = stage.name(), "Validation stage rejected request");
                return Err(rejection);
            }
        }
        Ok(())
    }

    /// Emit a structured security event with suspicious content redacted.
    pub fn log_rejection(&self, rejection: &Rejection, req: &Request<Body>, client: &str) {
        let inspector = self.inspector.as_ref();
        tracing::warn!(
            event_type = rejection.event.as_str(),
            details = redact(inspector, &rejection.detail),
            client = %client,
            path = redact(inspector, req.uri().path()),
            method = %req.method(),
            "Security validation failed"
        );
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> RequestValidator {
        RequestValidator::from_config(&ValidationConfig::default())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn rejected(req: &Request<Body>) -> Rejection {
        validator().validate(req).expect_err("request should be rejected")
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(
            validator().stage_names(),
            vec!["method", "url_length", "body_size", "headers", "path", "content_type"]
        );
    }

    #[test]
    fn test_plain_get_passes() {
        let req = Request::builder()
            .uri("/projects?page=2")
            .header("user-agent", "Mozilla/5.0 (X11; Linux x86_64)")
            .header("accept", "application/json")
            .body(Body::empty())
            .unwrap();
        assert_eq!(validator().validate(&req), Ok(()));
    }

    #[test]
    fn test_method_not_allowed() {
        let req = Request::builder()
            .method(Method::DELETE)
            .uri("/contact")
            .body(Body::empty())
            .unwrap();
        let rejection = rejected(&req);
        assert_eq!(rejection.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(rejection.event, SecurityEvent::InvalidHttpMethod);
    }

    #[test]
    fn test_method_checked_before_path() {
        let req = Request::builder()
            .method(Method::PUT)
            .uri("/../../etc/passwd")
            .body(Body::empty())
            .unwrap();
        assert_eq!(rejected(&req).event, SecurityEvent::InvalidHttpMethod);
    }

    #[test]
    fn test_url_too_long() {
        let uri = format!("/test?{}", "a".repeat(1100));
        let rejection = rejected(&get(&uri));
        assert_eq!(rejection.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(rejection.message, "Request URL too large");
    }

    #[test]
    fn test_declared_body_too_large() {
        let req = Request::builder()
            .uri("/contact")
            .header(header::CONTENT_LENGTH, (1024 * 1024 + 1).to_string())
            .body(Body::empty())
            .unwrap();
        let rejection = rejected(&req);
        assert_eq!(rejection.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(rejection.event, SecurityEvent::RequestBodyTooLarge);
    }

    #[test]
    fn test_too_many_headers() {
        let mut builder = Request::builder().uri("/contact");
        for i in 0..51 {
            builder = builder.header(format!("x-custom-{}", i), "v");
        }
        let rejection = rejected(&builder.body(Body::empty()).unwrap());
        assert_eq!(rejection.event, SecurityEvent::TooManyHeaders);
    }

    #[test]
    fn test_invalid_header_name() {
        let req = Request::builder()
            .uri("/contact")
            .header("x.custom", "v")
            .body(Body::empty())
            .unwrap();
        assert_eq!(rejected(&req).event, SecurityEvent::InvalidHeaderName);
    }

    #[test]
    fn test_header_value_too_long() {
        let req = Request::builder()
            .uri("/contact")
            .header("x-custom", "a".repeat(8193))
            .body(Body::empty())
            .unwrap();
        assert_eq!(rejected(&req).event, SecurityEvent::HeaderValueTooLong);
    }

    #[test]
    fn test_suspicious_header_value() {
        let req = Request::builder()
            .uri("/contact")
            .header("referer", "javascript:alert(1)")
            .body(Body::empty())
            .unwrap();
        let rejection = rejected(&req);
        assert_eq!(rejection.status, StatusCode::BAD_REQUEST);
        assert_eq!(rejection.event, SecurityEvent::SuspiciousHeaderValue);
    }

    #[test]
    fn test_control_characters_in_header() {
        let req = Request::builder()
            .uri("/contact")
            .header("x-custom", axum::http::HeaderValue::from_bytes(b"a\xc2\x85b").unwrap())
            .body(Body::empty())
            .unwrap();
        assert_eq!(rejected(&req).event, SecurityEvent::ControlCharsInHeader);
    }

    #[test]
    fn test_path_traversal() {
        let rejection = rejected(&get("/../../../etc/passwd"));
        assert_eq!(rejection.status, StatusCode::BAD_REQUEST);
        assert_eq!(rejection.event, SecurityEvent::SuspiciousUrlPath);
        assert!(!rejection.message.contains("../"));
    }

    #[test]
    fn test_encoded_traversal() {
        assert_eq!(
            rejected(&get("/files/%2e%2e%2fsecret")).event,
            SecurityEvent::SuspiciousUrlPath
        );
        // Double-encoded: one decode exposes the encoded marker.
        assert_eq!(
            rejected(&get("/files/%252e%252e%252f")).event,
            SecurityEvent::SuspiciousUrlPath
        );
    }

    #[test]
    fn test_encoded_script_in_path() {
        assert_eq!(
            rejected(&get("/search/%3Cscript%3E")).event,
            SecurityEvent::SuspiciousUrlPath
        );
    }

    #[test]
    fn test_malformed_escape() {
        assert_eq!(rejected(&get("/bad%zzpath")).event, SecurityEvent::InvalidUrlEncoding);
        assert_eq!(rejected(&get("/trailing%2")).event, SecurityEvent::InvalidUrlEncoding);
    }

    #[test]
    fn test_encoded_control_characters_in_path() {
        assert_eq!(rejected(&get("/a%07b")).event, SecurityEvent::ControlCharsInPath);
        assert_eq!(rejected(&get("/a%00b")).event, SecurityEvent::ControlCharsInPath);
    }

    #[test]
    fn test_content_type_for_bodies() {
        let mut config = ValidationConfig::default();
        config.allowed_methods.push("POST".into());
        let validator = RequestValidator::from_config(&config);

        let missing = Request::builder()
            .method(Method::POST)
            .uri("/contact")
            .header(header::CONTENT_LENGTH, "2")
            .body(Body::from("{}"))
            .unwrap();
        let rejection = validator.validate(&missing).unwrap_err();
        assert_eq!(rejection.status, StatusCode::BAD_REQUEST);
        assert_eq!(rejection.event, SecurityEvent::MissingContentType);

        let wrong = Request::builder()
            .method(Method::POST)
            .uri("/contact")
            .header(header::CONTENT_LENGTH, "2")
            .header(header::CONTENT_TYPE, "text/xml")
            .body(Body::from("{}"))
            .unwrap();
        assert_eq!(
            validator.validate(&wrong).unwrap_err().status,
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );

        let json = Request::builder()
            .method(Method::POST)
            .uri("/contact")
            .header(header::CONTENT_LENGTH, "2")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from("{}"))
            .unwrap();
        assert_eq!(validator.validate(&json), Ok(()));
    }

    #[test]
    fn test_validation_is_repeatable() {
        let validator = validator();
        let bad = get("/../../../etc/passwd");
        let good = get("/reviews");
        for _ in 0..3 {
            assert!(validator.validate(&bad).is_err());
            assert!(validator.validate(&good).is_ok());
        }
    }

    #[test]
    fn test_custom_inspector() {
        #[derive(Debug)]
        struct DenyAdmin;
        impl ContentInspector for DenyAdmin {
            fn is_suspicious(&self, input: &str) -> bool {
                input.contains("admin")
            }
        }

        let validator =
            RequestValidator::with_inspector(&ValidationConfig::default(), Arc::new(DenyAdmin));
        assert!(validator.validate(&get("/admin")).is_err());
        // Traversal is no longer the inspector's concern.
        assert!(validator.validate(&get("/a/../b")).is_ok());
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/a%20b+c").as_deref(), Some("/a b c"));
        assert_eq!(decode_path("/a%2Bb").as_deref(), Some("/a+b"));
        assert_eq!(decode_path("/a%"), None);
    }
}
