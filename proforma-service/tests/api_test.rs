//! HTTP surface tests driven through the router with `oneshot`.

mod common;

use axum::http::StatusCode;
use common::{decimal, TestApp};
use proforma_service::config::ProformaConfig;
use proforma_service::startup::Application;
use proforma_service::services::Collection;
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::{Duration, Instant};

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn();
    let (status, body) = app.request("GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "proforma-service");

    let (status, _) = app.request("GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn hung_store_fails_health_within_timeout() {
    let app = TestApp::spawn();
    app.store.stall_next_health_check(Duration::from_secs(30));

    let started = Instant::now();
    let (status, body) = app.request("GET", "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert!(started.elapsed() < Duration::from_secs(10));

    app.store.stall_next_health_check(Duration::from_secs(30));
    let (status, _) = app.request("GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn customer_identifiers_are_validated() {
    let app = TestApp::spawn();
    let (status, body) = app
        .request(
            "POST",
            "/customers",
            Some(json!({
                "name": "Hotel Miraflores",
                "phone": "98765",
                "tax_id": "20123456789",
                "installation_service": true
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["violations"], json!(["phone must be exactly 9 digits"]));
    assert_eq!(app.store.count(Collection::Customers), 0);
}

#[tokio::test]
async fn customers_are_listed_by_name() {
    let app = TestApp::spawn();
    for name in ["Zoila", "Alberto", "Marta"] {
        let (status, _) = app
            .request("POST", "/customers", Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.request("GET", "/customers", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alberto", "Marta", "Zoila"]);
}

#[tokio::test]
async fn draft_edit_commit_and_history_round() {
    let app = TestApp::spawn();
    let customer = app.customer("Lucía Quispe").await;

    let (status, draft) = app.request("POST", "/drafts", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let draft_id = draft["draft_id"].as_str().unwrap().to_string();
    assert_eq!(draft["items"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .request(
            "PUT",
            &format!("/drafts/{}/items/0", draft_id),
            Some(json!({ "description": "Corte acrílico", "unit_price": "50.00", "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, added) = app
        .request("POST", &format!("/drafts/{}/items", draft_id), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["index"], 1);

    let (_, draft) = app
        .request(
            "PUT",
            &format!("/drafts/{}/items/1", draft_id),
            Some(json!({ "description": "Grabado", "unit_price": "15.50", "quantity": 1 })),
        )
        .await;
    assert_eq!(decimal(&draft["totals"]["sale_total"]), dec!(115.50));

    let (_, added) = app
        .request("POST", &format!("/drafts/{}/expenses", draft_id), None)
        .await;
    assert_eq!(added["index"], 0);
    let (_, draft) = app
        .request(
            "PUT",
            &format!("/drafts/{}/expenses/0", draft_id),
            Some(json!({ "concept": "Plancha", "amount": "40.00" })),
        )
        .await;
    assert_eq!(decimal(&draft["totals"]["profit"]), dec!(75.50));

    let (status, committed) = app
        .request(
            "POST",
            &format!("/drafts/{}/commit", draft_id),
            Some(json!({
                "customer_id": customer.customer_id,
                "document_type": "contract",
                "advance": "15.50",
                "delivery_date": "2026-11-02"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(decimal(&committed["sale"]["total_amount"]), dec!(115.50));

    let (_, draft) = app
        .request("GET", &format!("/drafts/{}", draft_id), None)
        .await;
    assert_eq!(draft["items"].as_array().unwrap().len(), 1);
    assert!(draft["expenses"].as_array().unwrap().is_empty());

    let (status, history) = app.request("GET", "/sales", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["revision"], 1);
    let record = &history["sales"][0];
    assert_eq!(record["document_type"], "contract");
    assert_eq!(decimal(&record["balance_due"]), dec!(100.00));
    assert_eq!(decimal(&record["profit"]), dec!(75.50));
    assert_eq!(record["customer"]["name"], "Lucía Quispe");
}

#[tokio::test]
async fn empty_commit_reports_no_items() {
    let app = TestApp::spawn();
    let customer = app.customer("Ana").await;
    let (_, draft) = app.request("POST", "/drafts", None).await;
    let draft_id = draft["draft_id"].as_str().unwrap();

    let (status, body) = app
        .request(
            "POST",
            &format!("/drafts/{}/commit", draft_id),
            Some(json!({ "customer_id": customer.customer_id, "document_type": "quote" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["violations"], json!(["no items"]));
}

#[tokio::test]
async fn out_of_range_slot_is_unprocessable() {
    let app = TestApp::spawn();
    let (_, draft) = app.request("POST", "/drafts", None).await;
    let draft_id = draft["draft_id"].as_str().unwrap();

    let (status, body) = app
        .request(
            "PUT",
            &format!("/drafts/{}/expenses/3", draft_id),
            Some(json!({ "concept": "Flete", "amount": "10" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["violations"],
        json!(["expense slot 3 is out of range (draft has 0)"])
    );
}

#[tokio::test]
async fn oversized_price_is_refused_and_draft_stays_readable() {
    let app = TestApp::spawn();
    let (_, draft) = app.request("POST", "/drafts", None).await;
    let draft_id = draft["draft_id"].as_str().unwrap();

    let (status, body) = app
        .request(
            "PUT",
            &format!("/drafts/{}/items/0", draft_id),
            Some(json!({
                "description": "Corte",
                "unit_price": "79228162514264337593543950335",
                "quantity": 2
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["violations"],
        json!(["unit price 79228162514264337593543950335 exceeds the maximum of 9999999999.99"])
    );

    let (status, body) = app
        .request("GET", &format!("/drafts/{}", draft_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["totals"]["sale_total"]), dec!(0));
}

#[tokio::test]
async fn metrics_include_http_requests() {
    let app = TestApp::spawn();
    app.request("GET", "/health", None).await;

    let (status, body) = app.request_text("GET", "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("http_requests_total"));
    assert!(body.contains("http_request_duration_seconds"));
}

#[tokio::test]
async fn unknown_draft_is_not_found() {
    let app = TestApp::spawn();
    let missing = uuid::Uuid::new_v4();

    let (status, _) = app
        .request("GET", &format!("/drafts/{}", missing), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request("DELETE", &format!("/drafts/{}", missing), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn discarded_draft_is_gone() {
    let app = TestApp::spawn();
    let (_, draft) = app.request("POST", "/drafts", None).await;
    let draft_id = draft["draft_id"].as_str().unwrap();

    let (status, _) = app
        .request("DELETE", &format!("/drafts/{}", draft_id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request("GET", &format!("/drafts/{}", draft_id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transient_store_failure_asks_client_to_retry() {
    let app = TestApp::spawn();
    app.store.fail_next_insert(Collection::Customers);

    let response = {
        use axum::body::Body;
        use axum::http::Request;
        use tower::util::ServiceExt;

        app.router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/customers")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "name": "Ana" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    };

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response
        .headers()
        .contains_key(axum::http::header::RETRY_AFTER));
}

#[tokio::test]
async fn expense_lifecycle_over_http() {
    let app = TestApp::spawn();
    let customer = app.customer("Rosa").await;
    let mut draft = common::draft_with(&[("Vinilo", dec!(100.00), 1)], &[]);
    let committed = app
        .state
        .committer
        .commit(
            &mut draft,
            proforma_service::services::CommitRequest {
                customer_id: customer.customer_id,
                document_type: proforma_service::models::DocumentType::Quote,
                advance: rust_decimal::Decimal::ZERO,
                delivery_date: None,
            },
        )
        .await
        .unwrap();
    let sale_id = committed.sale.sale_id;

    let (status, expense) = app
        .request(
            "POST",
            &format!("/sales/{}/expenses", sale_id),
            Some(json!({ "concept": "Material", "amount": "20.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let expense_id = expense["expense_id"].as_str().unwrap().to_string();

    let (status, record) = app
        .request(
            "PUT",
            &format!("/sales/{}/advance", sale_id),
            Some(json!({ "advance": "60.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&record["balance_due"]), dec!(40.00));
    assert_eq!(decimal(&record["profit"]), dec!(80.00));

    let (status, _) = app
        .request("DELETE", &format!("/expenses/{}", expense_id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, record) = app
        .request("GET", &format!("/sales/{}", sale_id), None)
        .await;
    assert_eq!(decimal(&record["profit"]), dec!(100.00));

    let (status, _) = app
        .request("DELETE", &format!("/expenses/{}", expense_id), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn server_drains_and_stops_on_request() {
    let mut config = ProformaConfig::in_memory();
    config.common.port = 0;
    let app = Application::build(config)
        .await
        .expect("Failed to build application");
    assert_ne!(app.port(), 0);

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(app.run_until_stopped(async {
        let _ = stopped.await;
    }));

    stop.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
