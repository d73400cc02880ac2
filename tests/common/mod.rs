//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use portfolio_api::config::PortfolioConfig;
use portfolio_api::content::{
    Contact, ContentStore, GamePlayed, Project, ProjectType, Review, StaticContentStore,
    StoreError,
};
use portfolio_api::http::HttpServer;
use portfolio_api::lifecycle::Shutdown;
use tokio::task::JoinHandle;

/// A server running on a loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to finish draining.
    pub async fn stop(self) {
        assert_eq!(self.shutdown.trigger("test teardown"), 1, "server stopped listening early");
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked");
        result.expect("server returned an error");
    }
}

/// Start the server on an ephemeral port with the sample content.
pub async fn start_server(config: PortfolioConfig) -> TestServer {
    start_server_with_store(config, Arc::new(StaticContentStore::sample())).await
}

pub async fn start_server_with_store(
    mut config: PortfolioConfig,
    store: Arc<dyn ContentStore>,
) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, store);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Non-pooled client so every request opens its own connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Store whose reads block the calling thread for `delay`.
#[derive(Debug)]
pub struct SlowStore {
    pub delay: Duration,
    inner: StaticContentStore,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: StaticContentStore::sample(),
        }
    }
}

impl ContentStore for SlowStore {
    fn contact(&self) -> Result<Contact, StoreError> {
        std::thread::sleep(self.delay);
        self.inner.contact()
    }

    fn projects(&self, kind: ProjectType) -> Result<Vec<Project>, StoreError> {
        std::thread::sleep(self.delay);
        self.inner.projects(kind)
    }

    fn reviews(&self) -> Result<Vec<Review>, StoreError> {
        std::thread::sleep(self.delay);
        self.inner.reviews()
    }

    fn games_played(&self) -> Result<Vec<GamePlayed>, StoreError> {
        std::thread::sleep(self.delay);
        self.inner.games_played()
    }
}
