use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use devteam_core::domain::draft::{Draft, DraftId, DraftPatch};
use devteam_core::errors::ApplicationError;
use devteam_db::repositories::{DraftRepository, RepositoryError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::api::{bad_request, not_found, reject, ApiError};

const DRAFT_NOT_FOUND: &str = "Draft not found";

#[derive(Clone)]
pub struct DraftsState {
    drafts: Arc<dyn DraftRepository>,
}

#[derive(Debug, Deserialize)]
pub struct DraftCreate {
    pub owner: String,
    pub payload: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct DraftUpdate {
    pub owner: Option<String>,
    pub payload: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub id: String,
    pub owner: String,
    pub payload: Map<String, Value>,
    pub updated_at: DateTime<Utc>,
}

impl From<Draft> for DraftResponse {
    fn from(draft: Draft) -> Self {
        Self {
            id: draft.id.0,
            owner: draft.owner,
            payload: draft.payload,
            updated_at: draft.updated_at,
        }
    }
}

pub fn router(drafts: Arc<dyn DraftRepository>) -> Router {
    Router::new()
        .route("/v1/drafts", get(list_drafts).post(create_draft))
        .route("/v1/drafts/{id}", get(get_draft).put(update_draft).delete(delete_draft))
        .with_state(DraftsState { drafts })
}

fn storage(route: &'static str) -> impl Fn(RepositoryError) -> ApiError {
    move |error| reject(route, ApplicationError::Persistence(error.to_string()))
}

fn object_payload(payload: Value) -> Result<Map<String, Value>, ApiError> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(bad_request("payload must be a JSON object")),
    }
}

pub async fn list_drafts(
    State(state): State<DraftsState>,
) -> Result<Json<Vec<DraftResponse>>, ApiError> {
    let drafts = state.drafts.list().await.map_err(storage("/v1/drafts"))?;
    Ok(Json(drafts.into_iter().map(DraftResponse::from).collect()))
}

pub async fn create_draft(
    State(state): State<DraftsState>,
    Json(request): Json<DraftCreate>,
) -> Result<(StatusCode, Json<DraftResponse>), ApiError> {
    let payload = object_payload(request.payload)?;
    let draft = Draft::new(request.owner, payload);
    state.drafts.save(draft.clone()).await.map_err(storage("/v1/drafts"))?;

    info!(event_name = "drafts.created", draft_id = %draft.id.0, "draft created");
    Ok((StatusCode::CREATED, Json(draft.into())))
}

pub async fn get_draft(
    State(state): State<DraftsState>,
    Path(id): Path<String>,
) -> Result<Json<DraftResponse>, ApiError> {
    let draft = state
        .drafts
        .find_by_id(&DraftId(id))
        .await
        .map_err(storage("/v1/drafts/{id}"))?
        .ok_or_else(|| not_found(DRAFT_NOT_FOUND))?;
    Ok(Json(draft.into()))
}

pub async fn update_draft(
    State(state): State<DraftsState>,
    Path(id): Path<String>,
    Json(request): Json<DraftUpdate>,
) -> Result<Json<DraftResponse>, ApiError> {
    let payload = request.payload.map(object_payload).transpose()?;
    let mut draft = state
        .drafts
        .find_by_id(&DraftId(id))
        .await
        .map_err(storage("/v1/drafts/{id}"))?
        .ok_or_else(|| not_found(DRAFT_NOT_FOUND))?;

    draft.apply(DraftPatch { owner: request.owner, payload });
    state.drafts.save(draft.clone()).await.map_err(storage("/v1/drafts/{id}"))?;

    info!(event_name = "drafts.updated", draft_id = %draft.id.0, "draft updated");
    Ok(Json(draft.into()))
}

pub async fn delete_draft(
    State(state): State<DraftsState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed =
        state.drafts.delete(&DraftId(id.clone())).await.map_err(storage("/v1/drafts/{id}"))?;
    if !removed {
        return Err(not_found(DRAFT_NOT_FOUND));
    }

    info!(event_name = "drafts.deleted", draft_id = %id, "draft deleted");
    Ok(StatusCode::NO_CONTENT)
}
