use serde::{Deserialize, Serialize};

use crate::domain::slots::SlotName;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStage {
    Started,
    InProgress,
    Ready,
    Committed,
}

impl IntakeStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::InProgress => "in_progress",
            Self::Ready => "ready",
            Self::Committed => "committed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "started" => Some(Self::Started),
            "in_progress" => Some(Self::InProgress),
            "ready" => Some(Self::Ready),
            "committed" => Some(Self::Committed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    AnswerAccepted,
    CommitRequested,
    ArtifactsGenerated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    pub missing_required_slots: Vec<SlotName>,
}

impl FlowContext {
    pub fn with_gaps(gaps: Vec<SlotName>) -> Self {
        Self { missing_required_slots: gaps }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    PromptForMissingSlots,
    GenerateRequirementsDocument,
    MergeApiContract,
    RecordArtifacts,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: IntakeStage,
    pub to: IntakeStage,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
