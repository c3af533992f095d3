use thiserror::Error;

use crate::domain::slots::SlotName;
use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown slot `{0}`")]
    UnknownSlot(String),
    #[error("invalid value for slot `{slot}`: {reason}")]
    InvalidSlotValue { slot: SlotName, reason: String },
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    /// Required slots still missing, when this error is a premature commit.
    pub fn missing_slots(&self) -> Option<&[SlotName]> {
        match self {
            Self::Domain(DomainError::FlowTransition(
                FlowTransitionError::MissingRequiredSlots { missing, .. },
            )) => Some(missing),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, missing: Vec<SlotName>, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested resource does not exist.",
            Self::Conflict { .. } => {
                "The request conflicts with the current state of the resource."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        let missing = value.missing_slots().map(<[SlotName]>::to_vec).unwrap_or_default();
        let message = value.to_string();

        match value {
            ApplicationError::Domain(DomainError::FlowTransition(
                FlowTransitionError::InvalidTransition { .. },
            ))
            | ApplicationError::Conflict(_) => {
                Self::Conflict { message, correlation_id: unassigned() }
            }
            ApplicationError::Domain(DomainError::FlowTransition(
                FlowTransitionError::MissingRequiredSlots { .. },
            ))
            | ApplicationError::Domain(DomainError::UnknownSlot(_))
            | ApplicationError::Domain(DomainError::InvalidSlotValue { .. })
            | ApplicationError::Domain(DomainError::InvariantViolation(_)) => {
                Self::BadRequest { message, missing, correlation_id: unassigned() }
            }
            ApplicationError::NotFound { .. } => {
                Self::NotFound { message, correlation_id: unassigned() }
            }
            ApplicationError::Integration(_) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned() }
            }
            ApplicationError::Persistence(_) | ApplicationError::Configuration(_) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::slots::SlotName;
    use crate::errors::{ApplicationError, DomainError, InterfaceError};
    use crate::flows::{FlowEvent, FlowTransitionError, IntakeStage};

    #[test]
    fn missing_slots_map_to_bad_request_listing_gaps() {
        let interface = ApplicationError::from(DomainError::from(
            FlowTransitionError::MissingRequiredSlots {
                state: IntakeStage::InProgress,
                missing: vec![SlotName::ProjectDescription],
            },
        ))
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref missing, ref correlation_id, .. }
                if missing == &vec![SlotName::ProjectDescription] && correlation_id == "req-1"
        ));
        assert_eq!(interface.message(), "missing required information: project_description");
    }

    #[test]
    fn unknown_slot_is_a_bad_request_with_user_safe_message() {
        let interface = ApplicationError::from(DomainError::UnknownSlot("colour".to_owned()))
            .into_interface("req-2");

        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn not_found_maps_to_not_found() {
        let interface =
            ApplicationError::not_found("conversation", "conv_missing").into_interface("req-3");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert_eq!(interface.message(), "conversation not found: conv_missing");
    }

    #[test]
    fn transitions_out_of_committed_map_to_conflict() {
        let interface = ApplicationError::from(DomainError::from(
            FlowTransitionError::InvalidTransition {
                state: IntakeStage::Committed,
                event: FlowEvent::AnswerAccepted,
            },
        ))
        .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Conflict { .. }));
    }

    #[test]
    fn persistence_error_maps_to_internal() {
        let interface = ApplicationError::Persistence("disk full".to_owned()).into_interface("r5");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.correlation_id(), "r5");
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn integration_error_maps_to_service_unavailable() {
        let interface = ApplicationError::Integration("model timeout".to_owned()).into_interface("r6");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
    }
}
