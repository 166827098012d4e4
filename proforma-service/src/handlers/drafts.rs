//! Draft editing over HTTP. Every edit answers with the whole draft and its
//! live totals so a client can redraw from a single response.

use crate::dtos::{
    CommitDraftRequest, DraftResponse, SlotAddedResponse, UpdateExpenseRequest, UpdateItemRequest,
};
use crate::domain::DraftBuilder;
use crate::services::{CommittedSale, SharedDraft};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

fn session(state: &AppState, draft_id: Uuid) -> Result<SharedDraft, AppError> {
    state
        .drafts
        .get(draft_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Draft {} not found", draft_id)))
}

pub async fn create_draft(State(state): State<AppState>) -> (StatusCode, Json<DraftResponse>) {
    let draft_id = state.drafts.create();
    let draft = DraftBuilder::new();
    (
        StatusCode::CREATED,
        Json(DraftResponse::new(draft_id, &draft)),
    )
}

pub async fn get_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
) -> Result<Json<DraftResponse>, AppError> {
    let shared = session(&state, draft_id)?;
    let draft = shared.lock().await;
    Ok(Json(DraftResponse::new(draft_id, &draft)))
}

pub async fn discard_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.drafts.discard(draft_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!(
            "Draft {} not found",
            draft_id
        )))
    }
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
) -> Result<(StatusCode, Json<SlotAddedResponse>), AppError> {
    let shared = session(&state, draft_id)?;
    let mut draft = shared.lock().await;
    let index = draft.add_item_slot();
    Ok((
        StatusCode::CREATED,
        Json(SlotAddedResponse {
            index,
            draft: DraftResponse::new(draft_id, &draft),
        }),
    ))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path((draft_id, index)): Path<(Uuid, usize)>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    request.validate()?;
    let shared = session(&state, draft_id)?;
    let mut draft = shared.lock().await;
    draft.update_item(index, request.description, request.unit_price, request.quantity)?;
    Ok(Json(DraftResponse::new(draft_id, &draft)))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path((draft_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<DraftResponse>, AppError> {
    let shared = session(&state, draft_id)?;
    let mut draft = shared.lock().await;
    draft.remove_item(index)?;
    Ok(Json(DraftResponse::new(draft_id, &draft)))
}

pub async fn add_expense(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
) -> Result<(StatusCode, Json<SlotAddedResponse>), AppError> {
    let shared = session(&state, draft_id)?;
    let mut draft = shared.lock().await;
    let index = draft.add_expense_slot();
    Ok((
        StatusCode::CREATED,
        Json(SlotAddedResponse {
            index,
            draft: DraftResponse::new(draft_id, &draft),
        }),
    ))
}

pub async fn update_expense(
    State(state): State<AppState>,
    Path((draft_id, index)): Path<(Uuid, usize)>,
    Json(request): Json<UpdateExpenseRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    request.validate()?;
    let shared = session(&state, draft_id)?;
    let mut draft = shared.lock().await;
    draft.update_expense(index, request.concept, request.amount)?;
    Ok(Json(DraftResponse::new(draft_id, &draft)))
}

pub async fn remove_expense(
    State(state): State<AppState>,
    Path((draft_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<DraftResponse>, AppError> {
    let shared = session(&state, draft_id)?;
    let mut draft = shared.lock().await;
    draft.remove_expense(index)?;
    Ok(Json(DraftResponse::new(draft_id, &draft)))
}

/// Persist the draft as a sale. The session stays open with a reset draft.
#[tracing::instrument(skip(state, request))]
pub async fn commit_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
    Json(request): Json<CommitDraftRequest>,
) -> Result<(StatusCode, Json<CommittedSale>), AppError> {
    request.validate()?;
    let shared = session(&state, draft_id)?;
    let mut draft = shared.lock().await;
    let committed = state.committer.commit(&mut draft, request.into()).await?;
    Ok((StatusCode::CREATED, Json(committed)))
}
