use crate::dtos::CreateCustomerRequest;
use crate::models::Customer;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;
use validator::Validate;

#[tracing::instrument(skip(state, request))]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    request.validate()?;
    let customer = state.customers.create(request.into()).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Customer>>, AppError> {
    Ok(Json(state.customers.list().await?))
}
