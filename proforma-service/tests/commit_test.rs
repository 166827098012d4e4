//! Sale commit integration tests over the in-memory store.

mod common;

use common::{draft_with, TestApp};
use proforma_service::domain::{DraftBuilder, ValidationError};
use proforma_service::models::DocumentType;
use proforma_service::services::{Collection, CommitRequest, SalesError, StoreError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use uuid::Uuid;

fn request(customer_id: Uuid, advance: Decimal) -> CommitRequest {
    CommitRequest {
        customer_id,
        document_type: DocumentType::Contract,
        advance,
        delivery_date: None,
    }
}

fn assert_nothing_written(app: &TestApp) {
    assert_eq!(app.store.count(Collection::Sales), 0);
    assert_eq!(app.store.count(Collection::SaleItems), 0);
    assert_eq!(app.store.count(Collection::Expenses), 0);
}

#[tokio::test]
async fn commit_persists_header_items_and_expenses() {
    let app = TestApp::spawn();
    let customer = app.customer("Lucía Quispe").await;
    let mut draft = draft_with(
        &[("Corte acrílico", dec!(50.00), 2), ("Grabado", dec!(15.50), 1)],
        &[("Plancha acrílico 3mm", dec!(30.00))],
    );

    let committed = app
        .state
        .committer
        .commit(&mut draft, request(customer.customer_id, dec!(50.00)))
        .await
        .expect("commit should succeed");

    assert_eq!(committed.sale.total_amount, dec!(115.50));
    assert_eq!(committed.sale.advance_amount, dec!(50.00));
    assert_eq!(committed.sale.document_type(), DocumentType::Contract);
    assert_eq!(committed.items.len(), 2);
    assert_eq!(committed.items[0].line_total, dec!(100.00));
    assert_eq!(committed.items[0].sort_order, 0);
    assert_eq!(committed.items[1].sort_order, 1);
    assert!(committed
        .items
        .iter()
        .all(|i| i.sale_id == committed.sale.sale_id));
    assert_eq!(committed.expenses.len(), 1);
    assert_eq!(committed.expenses[0].sale_id, committed.sale.sale_id);

    assert_eq!(app.store.count(Collection::Sales), 1);
    assert_eq!(app.store.count(Collection::SaleItems), 2);
    assert_eq!(app.store.count(Collection::Expenses), 1);
}

#[tokio::test]
async fn successful_commit_resets_draft_and_bumps_revision() {
    let app = TestApp::spawn();
    let customer = app.customer("Taller Norte").await;
    let mut draft = draft_with(&[("Corte MDF", dec!(12.00), 3)], &[]);
    let before = app.state.history.revision().current();

    app.state
        .committer
        .commit(&mut draft, request(customer.customer_id, Decimal::ZERO))
        .await
        .unwrap();

    assert_eq!(draft, DraftBuilder::new());
    assert_eq!(app.state.history.revision().current(), before + 1);
}

#[tokio::test]
async fn invalid_slots_are_dropped_not_rejected() {
    let app = TestApp::spawn();
    let customer = app.customer("Ana Torres").await;
    let mut draft = draft_with(
        &[("Letras corpóreas", dec!(80.00), 1), ("", dec!(10.00), 1)],
        &[("", dec!(5.00))],
    );
    draft.add_item_slot();
    draft.add_expense_slot();

    let committed = app
        .state
        .committer
        .commit(&mut draft, request(customer.customer_id, Decimal::ZERO))
        .await
        .unwrap();

    assert_eq!(committed.items.len(), 1);
    assert!(committed.expenses.is_empty());
    assert_eq!(committed.sale.total_amount, dec!(80.00));
}

#[tokio::test]
async fn empty_draft_fails_with_no_items() {
    let app = TestApp::spawn();
    let customer = app.customer("Ana Torres").await;
    let mut draft = DraftBuilder::new();

    let err = app
        .state
        .committer
        .commit(&mut draft, request(customer.customer_id, Decimal::ZERO))
        .await
        .unwrap_err();

    match err {
        SalesError::Validation(errors) => {
            assert!(errors.contains(&ValidationError::NoItems));
            assert_eq!(errors.to_string(), "no items");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_nothing_written(&app);
}

#[tokio::test]
async fn advance_above_total_is_rejected() {
    let app = TestApp::spawn();
    let customer = app.customer("Ana Torres").await;
    let mut draft = draft_with(&[("Señalética", dec!(100.00), 1)], &[]);
    let before = draft.clone();

    let err = app
        .state
        .committer
        .commit(&mut draft, request(customer.customer_id, dec!(120.00)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SalesError::Validation(ref errors) if errors.contains(&ValidationError::AdvanceExceedsTotal {
            advance: dec!(120.00),
            total: dec!(100.00),
        })
    ));
    assert_eq!(draft, before);
    assert_nothing_written(&app);
}

#[tokio::test]
async fn unknown_customer_is_rejected() {
    let app = TestApp::spawn();
    let ghost = Uuid::new_v4();
    let mut draft = draft_with(&[("Corte", dec!(10.00), 1)], &[]);

    let err = app
        .state
        .committer
        .commit(&mut draft, request(ghost, Decimal::ZERO))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SalesError::Validation(ref errors) if errors.contains(&ValidationError::UnknownCustomer(ghost))
    ));
    assert_nothing_written(&app);
}

#[tokio::test]
async fn line_item_failure_rolls_back_the_header() {
    let app = TestApp::spawn();
    let customer = app.customer("Carlos Ramos").await;
    let mut draft = draft_with(
        &[("Corte acrílico", dec!(50.00), 2), ("Grabado", dec!(15.50), 1)],
        &[("Tinta", dec!(8.00))],
    );
    let before = draft.clone();

    app.store.fail_next_insert(Collection::SaleItems);
    let err = app
        .state
        .committer
        .commit(&mut draft, request(customer.customer_id, Decimal::ZERO))
        .await
        .unwrap_err();

    assert!(matches!(err, SalesError::Store(ref e) if e.is_retryable()));
    assert_nothing_written(&app);
    assert_eq!(draft, before, "a failed commit keeps the draft for another try");
}

#[tokio::test]
async fn expense_failure_rolls_back_header_and_items() {
    let app = TestApp::spawn();
    let customer = app.customer("Carlos Ramos").await;
    let mut draft = draft_with(
        &[("Corte acrílico", dec!(50.00), 2)],
        &[("Plancha", dec!(20.00)), ("Flete", dec!(10.00))],
    );

    app.store.fail_next_insert(Collection::Expenses);
    assert!(app
        .state
        .committer
        .commit(&mut draft, request(customer.customer_id, Decimal::ZERO))
        .await
        .is_err());
    assert_nothing_written(&app);

    // The same draft goes through once the store recovers.
    let committed = app
        .state
        .committer
        .commit(&mut draft, request(customer.customer_id, Decimal::ZERO))
        .await
        .unwrap();
    assert_eq!(committed.expenses.len(), 2);
    assert_eq!(app.store.count(Collection::Sales), 1);
}

#[tokio::test]
async fn header_failure_writes_nothing() {
    let app = TestApp::spawn();
    let customer = app.customer("Rosa Huamán").await;
    let mut draft = draft_with(
        &[("Letrero MDF", dec!(80.00), 1)],
        &[("Plancha MDF", dec!(25.00))],
    );
    let before = draft.clone();

    app.store.fail_next_insert(Collection::Sales);
    let err = app
        .state
        .committer
        .commit(&mut draft, request(customer.customer_id, dec!(20.00)))
        .await
        .unwrap_err();

    assert!(matches!(err, SalesError::Store(ref e) if e.is_retryable()));
    assert_nothing_written(&app);
    assert_eq!(draft, before);
}

#[tokio::test]
async fn timeout_between_writes_rolls_back() {
    let app = TestApp::spawn_with_timeout(50);
    let customer = app.customer("Rosa Huamán").await;
    let mut draft = draft_with(
        &[("Letrero MDF", dec!(80.00), 1), ("Grabado", dec!(15.00), 2)],
        &[("Plancha MDF", dec!(25.00))],
    );
    let before = draft.clone();

    app.store
        .stall_next_insert(Collection::SaleItems, Duration::from_secs(5));
    let err = app
        .state
        .committer
        .commit(&mut draft, request(customer.customer_id, Decimal::ZERO))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SalesError::Store(StoreError::Timeout {
            operation: "insert_line_item",
            ..
        })
    ));
    assert_nothing_written(&app);
    assert_eq!(draft, before);
}

#[tokio::test]
async fn slow_commit_acknowledgement_is_not_retryable() {
    let app = TestApp::spawn_with_timeout(50);
    let customer = app.customer("Rosa Huamán").await;
    let mut draft = draft_with(&[("Letrero MDF", dec!(80.00), 1)], &[]);
    let revision = app.state.history.revision().current();

    app.store.stall_next_commit(Duration::from_secs(5));
    let err = app
        .state
        .committer
        .commit(&mut draft, request(customer.customer_id, Decimal::ZERO))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SalesError::Store(StoreError::OutcomeUnknown {
            operation: "commit",
            ..
        })
    ));
    assert!(!matches!(err, SalesError::Store(ref e) if e.is_retryable()));
    assert_eq!(err.reason(), "store_outcome_unknown");
    // The write did land; only its acknowledgement was lost.
    assert_eq!(app.store.count(Collection::Sales), 1);
    assert_eq!(app.state.history.revision().current(), revision);
}
