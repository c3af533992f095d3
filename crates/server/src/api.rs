use axum::{http::StatusCode, Json};
use devteam_core::domain::slots::SlotName;
use devteam_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<SlotName>,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn status_code(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message.into(), missing: Vec::new() }))
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorBody { error: message.into(), missing: Vec::new() }))
}

/// Maps an application failure onto its HTTP status. Internal details stay in the log.
pub fn reject(route: &'static str, failure: ApplicationError) -> ApiError {
    let correlation_id = Uuid::new_v4().to_string();
    let mapped = failure.into_interface(correlation_id);
    let status = status_code(&mapped);

    let (message, missing) = match &mapped {
        InterfaceError::BadRequest { message, missing, .. } => (message.clone(), missing.clone()),
        InterfaceError::Internal { .. } | InterfaceError::ServiceUnavailable { .. } => {
            (mapped.user_message().to_string(), Vec::new())
        }
        other => (other.message().to_string(), Vec::new()),
    };

    if status.is_server_error() {
        error!(
            event_name = "api.request.failed",
            correlation_id = mapped.correlation_id(),
            route,
            status = status.as_u16(),
            error = mapped.message(),
            "request failed"
        );
    } else {
        warn!(
            event_name = "api.request.rejected",
            correlation_id = mapped.correlation_id(),
            route,
            status = status.as_u16(),
            error = mapped.message(),
            "request rejected"
        );
    }

    (status, Json(ErrorBody { error: message, missing }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use devteam_core::domain::slots::SlotName;
    use devteam_core::errors::{ApplicationError, DomainError};
    use devteam_core::flows::{FlowEvent, FlowTransitionError, IntakeStage};

    use crate::api::reject;

    #[test]
    fn missing_slots_become_bad_request_with_list() {
        let failure = ApplicationError::Domain(DomainError::FlowTransition(
            FlowTransitionError::MissingRequiredSlots {
                state: IntakeStage::InProgress,
                missing: vec![SlotName::ProjectDescription],
            },
        ));

        let (status, body) = reject("/intake/commit", failure);

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.missing, vec![SlotName::ProjectDescription]);
        assert!(body.0.error.contains("project_description"));
    }

    #[test]
    fn committed_conversation_maps_to_conflict() {
        let failure = ApplicationError::Domain(DomainError::FlowTransition(
            FlowTransitionError::InvalidTransition {
                state: IntakeStage::Committed,
                event: FlowEvent::CommitRequested,
            },
        ));

        let (status, body) = reject("/intake/commit", failure);
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.0.missing.is_empty());
    }

    #[test]
    fn persistence_detail_is_not_exposed() {
        let (status, body) =
            reject("/intake/commit", ApplicationError::Persistence("disk full at /srv".to_string()));

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.0.error.contains("/srv"));
    }

    #[test]
    fn unknown_conversation_is_not_found() {
        let (status, _) =
            reject("/intake/status", ApplicationError::not_found("conversation", "conv_x"));
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
