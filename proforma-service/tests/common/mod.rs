#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use proforma_service::config::ProformaConfig;
use proforma_service::domain::DraftBuilder;
use proforma_service::models::{Customer, NewCustomer};
use proforma_service::services::{init_metrics, MemoryStore};
use proforma_service::startup::{build_router, AppState};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::{Arc, Once};
use tower::util::ServiceExt;

static TRACING: Once = Once::new();

fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// The service wired over an in-memory store.
pub struct TestApp {
    pub state: AppState,
    pub store: MemoryStore,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with_timeout(1_000)
    }

    /// Same as [`TestApp::spawn`] with every store call bounded by
    /// `timeout_ms`.
    pub fn spawn_with_timeout(timeout_ms: u64) -> Self {
        init_test_tracing();
        init_metrics();

        let store = MemoryStore::new();
        let mut config = ProformaConfig::in_memory();
        config.store.timeout_ms = timeout_ms;
        let state = AppState::new(config, Arc::new(store.clone()));

        TestApp { state, store }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn customer(&self, name: &str) -> Customer {
        self.state
            .customers
            .create(NewCustomer {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .expect("Failed to create customer")
    }

    /// Send a JSON request through the router and decode the JSON reply.
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Send a bodiless request and return the reply as text.
    pub async fn request_text(&self, method: &str, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A draft holding `items` as (description, unit price, quantity) and
/// `expenses` as (concept, amount).
pub fn draft_with(items: &[(&str, Decimal, u32)], expenses: &[(&str, Decimal)]) -> DraftBuilder {
    let mut draft = DraftBuilder::new();
    for (position, (description, price, quantity)) in items.iter().enumerate() {
        let index = if position == 0 { 0 } else { draft.add_item_slot() };
        draft
            .update_item(index, *description, *price, *quantity)
            .unwrap();
    }
    for (concept, amount) in expenses {
        let index = draft.add_expense_slot();
        draft.update_expense(index, *concept, *amount).unwrap();
    }
    draft
}

/// Parse a decimal rendered as a JSON string.
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal encoded as string")
        .parse()
        .expect("valid decimal")
}
