//! Protection pipeline.
//!
//! # Data Flow
//! ```text
//! Request
//!     → validation_middleware   (400 / 405 / 413 / 415)
//!     → admission_middleware    (503, permit held until the response)
//!     → global_rate_middleware  (429)
//!     → client_rate_middleware  (429)
//!     → inner layers and handlers
//! ```
//!
//! # Design Decisions
//! - Each component is built once from config and handed to its middleware
//!   as state; nothing lives in module-level statics
//! - Cheap structural checks run before anything that takes a permit or a
//!   token
//! - Rejections carry a fixed message; the request never reaches a handler

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Json, Router,
};

use crate::config::PortfolioConfig;
use crate::http::request::client_key;
use crate::observability::metrics;
use crate::security::{AdmissionGate, ClientRateLimiter, GlobalRateLimiter, RequestValidator};

const BUSY_MESSAGE: &str = "Server is busy, try again later";
const GLOBAL_LIMIT_MESSAGE: &str = "Global rate limit exceeded";
const CLIENT_LIMIT_MESSAGE: &str = "Rate limit exceeded";

/// The admission and validation components, wired in a fixed order.
#[derive(Debug, Clone)]
pub struct ProtectionPipeline {
    validator: Arc<RequestValidator>,
    gate: AdmissionGate,
    global: Option<Arc<GlobalRateLimiter>>,
    client: Option<Arc<ClientRateLimiter>>,
}

impl ProtectionPipeline {
    /// Build every component from config. Starts the per-client eviction
    /// task, so must run inside a Tokio runtime.
    pub fn from_config(config: &PortfolioConfig) -> Self {
        let global = config
            .global_rate_limit
            .enabled
            .then(|| Arc::new(GlobalRateLimiter::new(&config.global_rate_limit)));
        let client = config
            .rate_limit
            .enabled
            .then(|| Arc::new(ClientRateLimiter::start(&config.rate_limit)));

        Self::new(
            RequestValidator::from_config(&config.validation),
            AdmissionGate::new(&config.concurrency),
            global,
            client,
        )
    }

    pub fn new(
        validator: RequestValidator,
        gate: AdmissionGate,
        global: Option<Arc<GlobalRateLimiter>>,
        client: Option<Arc<ClientRateLimiter>>,
    ) -> Self {
        Self {
            validator: Arc::new(validator),
            gate,
            global,
            client,
        }
    }

    /// Wrap `router` so every request passes through the pipeline first.
    pub fn apply<S>(&self, mut router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        // Layers added last run first.
        if let Some(client) = &self.client {
            router = router.layer(from_fn_with_state(Arc::clone(client), client_rate_middleware));
        }
        if let Some(global) = &self.global {
            router = router.layer(from_fn_with_state(Arc::clone(global), global_rate_middleware));
        }
        router
            .layer(from_fn_with_state(self.gate.clone(), admission_middleware))
            .layer(from_fn_with_state(
                Arc::clone(&self.validator),
                validation_middleware,
            ))
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn client_limiter(&self) -> Option<&Arc<ClientRateLimiter>> {
        self.client.as_ref()
    }

    pub fn global_limiter(&self) -> Option<&Arc<GlobalRateLimiter>> {
        self.global.as_ref()
    }

    /// Stop background work and wait for it to finish.
    pub async fn shutdown(&self) {
        if let Some(client) = &self.client {
            client.stop().await;
            tracing::info!("Client rate limiter stopped");
        }
    }
}

fn reject(status: StatusCode, message: &'static str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

pub async fn validation_middleware(
    State(validator): State<Arc<RequestValidator>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match validator.validate(&req) {
        Ok(()) => next.run(req).await,
        Err(rejection) => {
            validator.log_rejection(&rejection, &req, &client_key(&req));
            metrics::record_rejection(rejection.event.as_str());
            rejection.into_response()
        }
    }
}

pub async fn admission_middleware(
    State(gate): State<AdmissionGate>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(permit) = gate.admit().await else {
        tracing::warn!(
            client = %client_key(&req),
            path = %req.uri().path(),
            method = %req.method(),
            in_flight = gate.in_flight(),
            "Admission gate saturated"
        );
        metrics::record_rate_limited("concurrency");
        return reject(StatusCode::SERVICE_UNAVAILABLE, BUSY_MESSAGE);
    };

    metrics::record_in_flight(gate.in_flight());
    let response = next.run(req).await;
    drop(permit);
    metrics::record_in_flight(gate.in_flight());
    response
}

pub async fn global_rate_middleware(
    State(limiter): State<Arc<GlobalRateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if limiter.allow() {
        return next.run(req).await;
    }

    tracing::warn!(
        client = %client_key(&req),
        path = %req.uri().path(),
        method = %req.method(),
        "Global rate limit exceeded"
    );
    metrics::record_rate_limited("global");
    reject(StatusCode::TOO_MANY_REQUESTS, GLOBAL_LIMIT_MESSAGE)
}

pub async fn client_rate_middleware(
    State(limiter): State<Arc<ClientRateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&req);
    let allowed = limiter.allow(&client);
    metrics::record_tracked_clients(limiter.tracked_clients());

    if allowed {
        return next.run(req).await;
    }

    tracing::warn!(
        client = %client,
        path = %req.uri().path(),
        method = %req.method(),
        "Client rate limit exceeded"
    );
    metrics::record_rate_limited("client");
    reject(StatusCode::TOO_MANY_REQUESTS, CLIENT_LIMIT_MESSAGE)
}
