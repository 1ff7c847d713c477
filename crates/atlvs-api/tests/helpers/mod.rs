//! Test helpers: build the real router on top of the in-memory stores.
//!
//! Run from workspace root: `cargo test -p atlvs-api`.

pub mod auth;

use atlvs_api::setup::routes::setup_routes;
use atlvs_api::setup::services::build_state;
use atlvs_core::{Config, GateServiceConfig};
use atlvs_gate::auth::JwtAuthProvider;
use atlvs_gate::memory::InMemoryStore;
use atlvs_gate::{AuditSink, AuthProvider, GateStores};
use axum_test::TestServer;
use std::sync::Arc;
use std::time::Duration;

pub use auth::{bearer, mint_token, TestUser, TEST_JWT_SECRET};

/// API path for tests (e.g. `/api/v1/context`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", atlvs_core::constants::API_PREFIX, path)
}

pub fn test_config() -> Config {
    let config = GateServiceConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgresql://localhost/atlvs_test".to_string()),
        "AUTH_JWT_SECRET" => Some(TEST_JWT_SECRET.to_string()),
        "ENVIRONMENT" => Some("test".to_string()),
        _ => None,
    })
    .expect("test configuration is valid");
    Config(Box::new(config))
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Wait for detached audit appends to land.
    pub async fn settle_audit(&self, expected: usize) {
        for _ in 0..100 {
            if self.store.audit_entries().await.len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

pub struct TestAppBuilder {
    store: Arc<InMemoryStore>,
    provider: Option<Arc<dyn AuthProvider>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl TestAppBuilder {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            provider: None,
            audit_sink: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn build(self) -> TestApp {
        let config = test_config();
        let provider = self.provider.unwrap_or_else(|| {
            Arc::new(JwtAuthProvider::new(
                TEST_JWT_SECRET,
                config.auth_jwt_audience(),
            ))
        });
        let mut stores = GateStores::in_memory(self.store.clone());
        if let Some(sink) = self.audit_sink {
            stores = stores.with_audit_sink(sink);
        }

        let state = build_state(&config, provider, stores, None);
        let router = setup_routes(&config, state).expect("router builds");
        TestApp {
            server: TestServer::new(router).expect("test server starts"),
            store: self.store,
        }
    }
}

/// Test app with the default JWT provider.
pub fn setup_test_app(store: Arc<InMemoryStore>) -> TestApp {
    TestAppBuilder::new(store).build()
}
