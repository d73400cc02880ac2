//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router: routes, protection pipeline, supporting layers
//! - Bind to a listener and serve with connection info for client identity
//! - Drain on shutdown, then stop pipeline background work

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{PortfolioConfig, SecurityConfig};
use crate::content::ContentStore;
use crate::http::handlers;
use crate::http::pipeline::ProtectionPipeline;
use crate::http::request::{
    propagate_request_id_layer, request_context_middleware, set_request_id_layer, RequestIdExt,
};
use crate::observability::metrics;
use crate::security::headers::security_headers_middleware;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    /// Budget for a single store read.
    pub operation_timeout: Duration,
}

/// HTTP server for the portfolio API.
pub struct HttpServer {
    router: Router,
    pipeline: ProtectionPipeline,
    config: PortfolioConfig,
}

impl HttpServer {
    /// Create a server. Must be called inside a Tokio runtime.
    pub fn new(config: PortfolioConfig, store: Arc<dyn ContentStore>) -> Self {
        let pipeline = ProtectionPipeline::from_config(&config);
        let state = AppState {
            store,
            operation_timeout: config.timeouts.operation(),
        };
        let router = build_router(&config, state, &pipeline);
        Self {
            router,
            pipeline,
            config,
        }
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pipeline(&self) -> &ProtectionPipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, then drain and stop background tasks.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        self.pipeline.shutdown().await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Compose routes and layers.
///
/// Request order, outermost first: request ID, trace, request timeout,
/// metrics, deadline context, security headers, validation, admission gate,
/// global limit, client limit, CORS, panic catching, handler. Security
/// headers sit outside the pipeline so rejections carry them too.
#[allow(deprecated)]
pub fn build_router(config: &PortfolioConfig, state: AppState, pipeline: &ProtectionPipeline) -> Router {
    let routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/contact", get(handlers::contact))
        .route("/projects", get(handlers::projects))
        .route("/tech/projects", get(handlers::projects))
        .route("/games/projects", get(handlers::game_projects))
        .route("/finance/projects", get(handlers::finance_projects))
        .route("/games/played/carousel", get(handlers::games_played_carousel))
        .route("/reviews", get(handlers::reviews))
        .with_state(state)
        .layer(CatchPanicLayer::new())
        .layer(cors_layer(&config.security));

    let mut protected = pipeline.apply(routes);
    if config.security.enable_headers {
        protected = protected.layer(middleware::from_fn(security_headers_middleware));
    }

    protected
        .layer(middleware::from_fn_with_state(
            config.timeouts.request(),
            request_context_middleware,
        ))
        .layer(middleware::from_fn(track_metrics))
        .layer(TimeoutLayer::new(config.timeouts.request()))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                request_id = %req.request_id(),
            )
        }))
        .layer(set_request_id_layer())
}

fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 60 * 60))
}

async fn track_metrics(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let response = next.run(req).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentData, StaticContentStore};
    use crate::content::{Contact, GamePlayed, Project, ProjectType, Review, StoreError};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    /// Store whose every read blocks its thread.
    struct BlockingStore(Duration);

    impl ContentStore for BlockingStore {
        fn contact(&self) -> Result<Contact, StoreError> {
            std::thread::sleep(self.0);
            Err(StoreError::NotFound("contact"))
        }

        fn projects(&self, _kind: ProjectType) -> Result<Vec<Project>, StoreError> {
            std::thread::sleep(self.0);
            Ok(Vec::new())
        }

        fn reviews(&self) -> Result<Vec<Review>, StoreError> {
            std::thread::sleep(self.0);
            Ok(Vec::new())
        }

        fn games_played(&self) -> Result<Vec<GamePlayed>, StoreError> {
            std::thread::sleep(self.0);
            Ok(Vec::new())
        }
    }

    fn test_config() -> PortfolioConfig {
        let mut config = PortfolioConfig::default();
        config.security.allowed_origins = vec!["https://portfolio.example".to_string()];
        config
    }

    fn router_with(config: &PortfolioConfig, operation_timeout: Duration) -> (Router, ProtectionPipeline) {
        let pipeline = ProtectionPipeline::from_config(config);
        let state = AppState {
            store: Arc::new(StaticContentStore::sample()),
            operation_timeout,
        };
        (build_router(config, state, &pipeline), pipeline)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_content_routes() {
        let (app, _pipeline) = router_with(&test_config(), Duration::from_secs(5));

        let response = app.clone().oneshot(get_req("/contact")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"]["email"], "owner@example.com");

        let response = app.clone().oneshot(get_req("/projects")).await.unwrap();
        let body = json_body(response).await;
        let projects = body["message"].as_array().unwrap();
        assert!(projects.iter().all(|p| p["project_type"] == "tech"));

        let response = app.clone().oneshot(get_req("/reviews")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["message"][0]["rating"], 5);

        let response = app.clone().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_missing_contact_returns_404() {
        let config = test_config();
        let pipeline = ProtectionPipeline::from_config(&config);
        let state = AppState {
            store: Arc::new(StaticContentStore::new(ContentData::default())),
            operation_timeout: Duration::from_secs(5),
        };
        let app = build_router(&config, state, &pipeline);

        let response = app.oneshot(get_req("/contact")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "NOT_FOUND");
    }

    #[tokio::test(start_paused = true)]
    async fn test_thirty_first_request_is_rate_limited() {
        let (app, pipeline) = router_with(&test_config(), Duration::from_secs(5));

        for i in 0..30 {
            let response = app.clone().oneshot(get_req("/health")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "request {}", i + 1);
        }

        let response = app.clone().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json_body(response).await["error"], "Rate limit exceeded");

        pipeline.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_carry_security_headers() {
        let mut config = test_config();
        config.rate_limit.burst_size = 1;
        let (app, pipeline) = router_with(&config, Duration::from_secs(5));

        let response = app.clone().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");

        let response = app.clone().oneshot(get_req("/../etc/passwd")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_project_category_routes() {
        let (app, _pipeline) = router_with(&test_config(), Duration::from_secs(5));

        for (uri, kind) in [
            ("/tech/projects", "tech"),
            ("/games/projects", "game"),
            ("/finance/projects", "finance"),
        ] {
            let response = app.clone().oneshot(get_req(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
            let body = json_body(response).await;
            let projects = body["message"].as_array().unwrap();
            assert!(!projects.is_empty(), "{}", uri);
            assert!(projects.iter().all(|p| p["project_type"] == kind), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_games_played_carousel_shows_first_five() {
        let (app, _pipeline) = router_with(&test_config(), Duration::from_secs(5));

        let response = app
            .oneshot(get_req("/games/played/carousel"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let games = body["message"].as_array().unwrap();
        assert_eq!(games.len(), 5);
        assert_eq!(games[0]["title"], "Outer Wilds");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_store_reads_respect_deadline() {
        let config = test_config();
        let pipeline = ProtectionPipeline::from_config(&config);
        let state = AppState {
            store: Arc::new(BlockingStore(Duration::from_millis(800))),
            operation_timeout: Duration::from_millis(50),
        };
        let app = build_router(&config, state, &pipeline);

        // More blocked reads than worker threads.
        let calls: Vec<_> = (0..4)
            .map(|_| {
                let app = app.clone();
                tokio::spawn(async move {
                    let start = Instant::now();
                    let response = app.oneshot(get_req("/reviews")).await.unwrap();
                    (response.status(), start.elapsed())
                })
            })
            .collect();

        for call in calls {
            let (status, elapsed) = call.await.unwrap();
            assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
            assert!(elapsed < Duration::from_millis(400), "{:?}", elapsed);
        }
    }

    #[tokio::test]
    async fn test_path_traversal_rejected_without_echo() {
        let (app, _pipeline) = router_with(&test_config(), Duration::from_secs(5));

        let response = app
            .oneshot(get_req("/../../../etc/passwd"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("../"));
        assert!(!text.contains("passwd"));
    }

    #[tokio::test]
    async fn test_one_nanosecond_budget_returns_408() {
        let (app, _pipeline) = router_with(&test_config(), Duration::from_nanos(1));

        for _ in 0..20 {
            let response = app.clone().oneshot(get_req("/projects")).await.unwrap();
            assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
            assert_eq!(json_body(response).await["code"], "TIMEOUT");
        }
    }

    #[tokio::test]
    async fn test_supporting_layers() {
        let (app, _pipeline) = router_with(&test_config(), Duration::from_secs(5));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "https://portfolio.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(
            headers["access-control-allow-origin"],
            "https://portfolio.example"
        );
        assert!(!headers.contains_key("server"));
    }

    #[tokio::test]
    async fn test_client_request_id_is_echoed() {
        let (app, _pipeline) = router_with(&test_config(), Duration::from_secs(5));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_unknown_route_still_passes_pipeline() {
        let (app, _pipeline) = router_with(&test_config(), Duration::from_secs(5));

        let response = app.clone().oneshot(get_req("/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/contact")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
