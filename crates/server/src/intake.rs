//! Intake routes.
//!
//! - `POST /intake/start`   open a conversation, optionally seeding `projectName`
//! - `POST /intake/answer`  fill one slot
//! - `GET  /intake/status`  slots, gaps and the next question
//! - `POST /intake/commit`  write the requirements document and merge the API contract
//! - `GET  /openapi.json`   the current contract document as JSON

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use devteam_agent::contract;
use devteam_agent::{CommitReport, IntakeRuntime, IntakeStatus};
use devteam_core::domain::conversation::ConversationId;
use devteam_core::domain::slots::{ConversationState, SlotName};
use devteam_core::errors::ApplicationError;
use devteam_core::flows::IntakeStage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{bad_request, reject, ApiError};

#[derive(Clone)]
pub struct IntakeState {
    runtime: Arc<IntakeRuntime>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default, alias = "project_name")]
    pub project_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    #[serde(alias = "conversation_id")]
    pub conversation_id: String,
    #[serde(alias = "slot_name")]
    pub slot_name: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    #[serde(alias = "conversation_id")]
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub conversation_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub conversation_id: String,
    pub stage: IntakeStage,
    pub slots: ConversationState,
    pub gaps: Vec<SlotName>,
    pub next_question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub artifacts: Vec<String>,
    pub message: String,
    pub degraded: bool,
}

impl From<IntakeStatus> for StatusResponse {
    fn from(status: IntakeStatus) -> Self {
        Self {
            conversation_id: status.conversation_id.0,
            stage: status.stage,
            slots: status.slots,
            gaps: status.gaps,
            next_question: status.next_question,
        }
    }
}

impl From<CommitReport> for CommitResponse {
    fn from(report: CommitReport) -> Self {
        Self { artifacts: report.artifacts, message: report.message, degraded: report.degraded }
    }
}

pub fn router(runtime: Arc<IntakeRuntime>) -> Router {
    Router::new()
        .route("/intake/start", post(start))
        .route("/intake/answer", post(answer))
        .route("/intake/status", get(status))
        .route("/intake/commit", post(commit))
        .route("/openapi.json", get(openapi))
        .with_state(IntakeState { runtime })
}

/// The body is optional; an empty one starts an unnamed conversation.
pub async fn start(
    State(state): State<IntakeState>,
    body: Bytes,
) -> Result<Json<StartResponse>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice::<StartRequest>(&body)
            .map_err(|error| bad_request(format!("invalid request body: {error}")))?
    };

    let started = state
        .runtime
        .start(request.project_name)
        .await
        .map_err(|failure| reject("/intake/start", failure))?;

    Ok(Json(StartResponse {
        conversation_id: started.conversation_id.0,
        message: started.message,
    }))
}

pub async fn answer(
    State(state): State<IntakeState>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = ConversationId(request.conversation_id);
    let status = state
        .runtime
        .answer(&id, &request.slot_name, &request.value)
        .await
        .map_err(|failure| reject("/intake/answer", failure))?;

    Ok(Json(status.into()))
}

pub async fn status(
    State(state): State<IntakeState>,
    Query(query): Query<ConversationRef>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = ConversationId(query.conversation_id);
    let status =
        state.runtime.status(&id).await.map_err(|failure| reject("/intake/status", failure))?;

    Ok(Json(status.into()))
}

pub async fn commit(
    State(state): State<IntakeState>,
    Json(request): Json<ConversationRef>,
) -> Result<Json<CommitResponse>, ApiError> {
    let id = ConversationId(request.conversation_id);
    let report =
        state.runtime.commit(&id).await.map_err(|failure| reject("/intake/commit", failure))?;

    Ok(Json(report.into()))
}

pub async fn openapi(State(state): State<IntakeState>) -> Result<Json<Value>, ApiError> {
    contract::current_document_json(state.runtime.generator().contract_path())
        .await
        .map(Json)
        .map_err(|error| reject("/openapi.json", ApplicationError::Persistence(error.to_string())))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Bytes,
        extract::{Query, State},
        http::StatusCode,
        Json,
    };
    use devteam_agent::{ArtifactGenerator, IntakeRuntime, ScriptedLlmClient};
    use devteam_core::config::ArtifactsConfig;
    use devteam_core::flows::IntakeStage;
    use devteam_db::repositories::InMemoryConversationRepository;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::intake::{
        answer, commit, openapi, start, status, AnswerRequest, ConversationRef, IntakeState,
    };

    fn state(dir: &TempDir, responses: &[&str]) -> State<IntakeState> {
        let settings = ArtifactsConfig {
            documents_dir: dir.path().join("docs/prds"),
            contract_path: dir.path().join("contracts/api.yaml"),
            template_path: dir.path().join("docs/templates/PRD_TEMPLATE.md"),
        };
        let llm = Arc::new(ScriptedLlmClient::new(responses.iter().copied()));
        let generator = Arc::new(ArtifactGenerator::new(llm, settings));
        let conversations = Arc::new(InMemoryConversationRepository::default());
        let runtime = IntakeRuntime::new(conversations, generator);
        State(IntakeState { runtime: Arc::new(runtime) })
    }

    async fn started(state: &State<IntakeState>, body: &'static str) -> String {
        let Json(response) =
            start(state.clone(), Bytes::from_static(body.as_bytes())).await.expect("start");
        response.conversation_id
    }

    fn answer_request(id: &str, slot: &str, value: serde_json::Value) -> Json<AnswerRequest> {
        Json(AnswerRequest {
            conversation_id: id.to_string(),
            slot_name: slot.to_string(),
            value,
        })
    }

    #[tokio::test]
    async fn start_accepts_empty_body_and_project_name() {
        let dir = TempDir::new().expect("tempdir");
        let state = state(&dir, &[]);

        let unnamed = started(&state, "").await;
        let named = started(&state, r#"{"projectName": "Shop"}"#).await;
        assert_ne!(unnamed, named);

        let Json(status) = status(state.clone(), Query(ConversationRef { conversation_id: named }))
            .await
            .expect("status");
        assert_eq!(status.slots.project_name.as_deref(), Some("Shop"));
        assert_eq!(status.stage, IntakeStage::InProgress);
    }

    #[tokio::test]
    async fn start_rejects_malformed_body() {
        let dir = TempDir::new().expect("tempdir");
        let result = start(state(&dir, &[]), Bytes::from_static(b"{not json")).await;

        let (status, _) = result.err().expect("malformed body");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn answer_rejects_unknown_slot_and_unknown_conversation() {
        let dir = TempDir::new().expect("tempdir");
        let state = state(&dir, &[]);
        let id = started(&state, "").await;

        let (code, body) = answer(state.clone(), answer_request(&id, "colour", json!("red")))
            .await
            .err()
            .expect("unknown slot");
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(body.0.error.contains("colour"));

        let (code, _) =
            answer(state.clone(), answer_request("conv_nope", "timeline", json!("Q3")))
                .await
                .err()
                .expect("unknown conversation");
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn commit_with_gap_lists_missing_slot() {
        let dir = TempDir::new().expect("tempdir");
        let state = state(&dir, &[]);
        let id = started(&state, r#"{"project_name": "Shop"}"#).await;
        for (slot, value) in [("target_users", json!("Shoppers")), ("key_features", json!("cart"))] {
            answer(state.clone(), answer_request(&id, slot, value)).await.expect("answer");
        }

        let (code, body) = commit(state.clone(), Json(ConversationRef { conversation_id: id }))
            .await
            .err()
            .expect("gap remains");

        assert_eq!(code, StatusCode::BAD_REQUEST);
        let body = serde_json::to_value(&body.0).expect("serialize body");
        assert_eq!(body["missing"], json!(["project_description"]));
        assert!(!dir.path().join("contracts/api.yaml").exists());
    }

    #[tokio::test]
    async fn openapi_serves_base_document_before_any_commit() {
        let dir = TempDir::new().expect("tempdir");
        let Json(document) = openapi(state(&dir, &[])).await.expect("document");

        assert_eq!(document["openapi"], json!("3.0.0"));
        assert!(document["paths"]["/v1/drafts"].is_object());
    }
}
