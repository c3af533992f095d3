use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use devteam_db::{ping, DbPool};
use serde::Serialize;
use tracing::warn;

pub const SERVICE_NAME: &str = "devteam";

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(HealthState { db_pool })
}

pub async fn healthz() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "healthy", service: SERVICE_NAME })
}

pub async fn readyz(State(state): State<HealthState>) -> (StatusCode, Json<ReadinessResponse>) {
    match ping(&state.db_pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadinessResponse { status: "ready", database: "connected", error: None }),
        ),
        Err(error) => {
            warn!(
                event_name = "system.health.not_ready",
                correlation_id = "readyz",
                error = %error,
                "database readiness probe failed"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    database: "disconnected",
                    error: Some(error.to_string()),
                }),
            )
        }
    }
}
