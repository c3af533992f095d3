pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod intake;

pub use domain::artifact::{Artifact, ArtifactKind};
pub use domain::conversation::{Conversation, ConversationId};
pub use domain::draft::{Draft, DraftId, DraftPatch};
pub use domain::slots::{ConversationState, SlotKind, SlotName, SlotValue};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{FlowEngine, FlowEvent, IntakeFlow, IntakeStage};
pub use intake::{SlotFillEngine, SlotSchema, SlotStatus};
