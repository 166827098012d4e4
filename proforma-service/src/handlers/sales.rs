use crate::dtos::{AddExpenseRequest, UpdateAdvanceRequest};
use crate::models::Expense;
use crate::services::{HistoryPage, SaleRecord};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

pub async fn list_sales(State(state): State<AppState>) -> Result<Json<HistoryPage>, AppError> {
    Ok(Json(state.history.list_sales().await?))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> Result<Json<SaleRecord>, AppError> {
    Ok(Json(state.history.get_sale(sale_id).await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_advance(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    Json(request): Json<UpdateAdvanceRequest>,
) -> Result<Json<SaleRecord>, AppError> {
    request.validate()?;
    let record = state
        .history
        .update_advance(sale_id, request.advance)
        .await?;
    Ok(Json(record))
}

#[tracing::instrument(skip(state, request))]
pub async fn add_expense(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    Json(request): Json<AddExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    request.validate()?;
    let expense = state
        .history
        .add_expense(sale_id, &request.concept, request.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[tracing::instrument(skip(state))]
pub async fn delete_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.history.delete_expense(expense_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
