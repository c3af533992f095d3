use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use devteam_core::domain::conversation::{Conversation, ConversationId};
use devteam_core::domain::slots::{ConversationState, SlotName};
use devteam_core::errors::{ApplicationError, DomainError};
use devteam_core::flows::{
    FlowContext, FlowEngine, FlowEvent, FlowTransitionError, IntakeFlow, IntakeStage,
};
use devteam_core::intake::SlotFillEngine;
use devteam_db::repositories::{ConversationRepository, RepositoryError};

use crate::generator::ArtifactGenerator;

pub const START_MESSAGE: &str = "Intake started. Please provide project details.";
pub const COMMIT_MESSAGE: &str = "PRD generated and contracts updated successfully";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedIntake {
    pub conversation_id: ConversationId,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeStatus {
    pub conversation_id: ConversationId,
    pub stage: IntakeStage,
    pub slots: ConversationState,
    pub gaps: Vec<SlotName>,
    pub next_question: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    pub artifacts: Vec<String>,
    pub message: String,
    /// True when the requirements document was written without content.
    pub degraded: bool,
}

/// Drives intake conversations: slot filling, status and the two-phase commit.
pub struct IntakeRuntime {
    conversations: Arc<dyn ConversationRepository>,
    generator: Arc<ArtifactGenerator>,
    slots: SlotFillEngine,
    flow: FlowEngine<IntakeFlow>,
    commits_in_flight: Mutex<HashSet<ConversationId>>,
}

struct CommitGuard<'a> {
    in_flight: &'a Mutex<HashSet<ConversationId>>,
    id: ConversationId,
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.id);
        }
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    match error {
        RepositoryError::Conflict(message) => ApplicationError::Conflict(message),
        other => ApplicationError::Persistence(other.to_string()),
    }
}

fn closed(stage: IntakeStage, event: FlowEvent) -> ApplicationError {
    DomainError::from(FlowTransitionError::InvalidTransition { state: stage, event }).into()
}

impl IntakeRuntime {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        generator: Arc<ArtifactGenerator>,
    ) -> Self {
        Self::with_engines(conversations, generator, SlotFillEngine::default(), FlowEngine::default())
    }

    pub fn with_engines(
        conversations: Arc<dyn ConversationRepository>,
        generator: Arc<ArtifactGenerator>,
        slots: SlotFillEngine,
        flow: FlowEngine<IntakeFlow>,
    ) -> Self {
        Self { conversations, generator, slots, flow, commits_in_flight: Mutex::new(HashSet::new()) }
    }

    pub fn generator(&self) -> &ArtifactGenerator {
        &self.generator
    }

    pub async fn start(&self, project_name: Option<String>) -> Result<StartedIntake, ApplicationError> {
        let mut conversation = Conversation::start();
        conversation.stage = self.flow.initial_stage();

        if let Some(name) = project_name.filter(|name| !name.trim().is_empty()) {
            self.slots.apply_answer(
                &mut conversation.slots,
                SlotName::ProjectName,
                &Value::String(name),
            )?;
            let gaps = self.slots.gaps(&conversation.slots);
            conversation.stage = self
                .flow
                .apply(conversation.stage, &FlowEvent::AnswerAccepted, &FlowContext::with_gaps(gaps))
                .map_err(DomainError::from)?
                .to;
        }

        let conversation_id = conversation.id.clone();
        self.conversations.create(conversation).await.map_err(persistence)?;

        info!(
            event_name = "intake.conversation.started",
            conversation_id = %conversation_id,
            "intake conversation started"
        );

        Ok(StartedIntake { conversation_id, message: START_MESSAGE.to_string() })
    }

    pub async fn answer(
        &self,
        id: &ConversationId,
        slot_name: &str,
        value: &Value,
    ) -> Result<IntakeStatus, ApplicationError> {
        let slot = slot_name.parse::<SlotName>().map_err(|error| {
            warn!(
                event_name = "intake.answer.rejected",
                conversation_id = %id,
                slot = slot_name,
                reason = "unknown_slot",
                "answer rejected"
            );
            error
        })?;

        self.ensure_not_committing(id)?;
        let mut conversation = self.load(id).await?;
        if conversation.stage.is_terminal() {
            return Err(closed(conversation.stage, FlowEvent::AnswerAccepted));
        }

        if let Err(error) = self.slots.apply_answer(&mut conversation.slots, slot, value) {
            warn!(
                event_name = "intake.answer.rejected",
                conversation_id = %id,
                slot = %slot,
                error = %error,
                "answer rejected"
            );
            return Err(error.into());
        }

        let gaps = self.slots.gaps(&conversation.slots);
        let outcome = self
            .flow
            .apply(conversation.stage, &FlowEvent::AnswerAccepted, &FlowContext::with_gaps(gaps))
            .map_err(DomainError::from)?;
        conversation.stage = outcome.to;
        conversation.touch();

        self.ensure_not_committing(id)?;
        self.conversations.save(conversation.clone()).await.map_err(persistence)?;

        info!(
            event_name = "intake.answer.accepted",
            conversation_id = %id,
            slot = %slot,
            stage = conversation.stage.as_str(),
            "answer accepted"
        );

        Ok(self.status_of(conversation))
    }

    pub async fn status(&self, id: &ConversationId) -> Result<IntakeStatus, ApplicationError> {
        let conversation = self.load(id).await?;
        Ok(self.status_of(conversation))
    }

    /// Generates both artifacts, then marks the conversation committed. A failure
    /// while writing artifacts leaves the conversation `Ready` so it can be retried.
    pub async fn commit(&self, id: &ConversationId) -> Result<CommitReport, ApplicationError> {
        let _guard = self.begin_commit(id)?;

        let mut conversation = self.load(id).await?;
        if conversation.stage.is_terminal() {
            return Err(closed(conversation.stage, FlowEvent::CommitRequested));
        }

        let gaps = self.slots.gaps(&conversation.slots);
        let requested = self
            .flow
            .apply(conversation.stage, &FlowEvent::CommitRequested, &FlowContext::with_gaps(gaps))
            .map_err(|error| {
                warn!(
                    event_name = "intake.commit.rejected",
                    conversation_id = %id,
                    error = %error,
                    "commit rejected"
                );
                DomainError::from(error)
            })?;
        conversation.stage = requested.to;

        let artifacts = self.generator.generate(&conversation.slots).await.map_err(|error| {
            error!(
                event_name = "intake.commit.failed",
                conversation_id = %id,
                error = %error,
                "artifact generation failed"
            );
            ApplicationError::Persistence(error.to_string())
        })?;

        let generated = self
            .flow
            .apply(conversation.stage, &FlowEvent::ArtifactsGenerated, &FlowContext::default())
            .map_err(DomainError::from)?;
        conversation.stage = generated.to;
        conversation.artifacts.extend(artifacts.iter().cloned());
        conversation.touch();
        self.conversations.save(conversation).await.map_err(persistence)?;

        let degraded = artifacts.iter().any(|artifact| artifact.empty);
        info!(
            event_name = "intake.commit.completed",
            conversation_id = %id,
            artifacts = artifacts.len(),
            degraded,
            "intake committed"
        );

        Ok(CommitReport {
            artifacts: artifacts.into_iter().map(|artifact| artifact.path).collect(),
            message: COMMIT_MESSAGE.to_string(),
            degraded,
        })
    }

    fn begin_commit(&self, id: &ConversationId) -> Result<CommitGuard<'_>, ApplicationError> {
        let mut in_flight = self
            .commits_in_flight
            .lock()
            .map_err(|_| ApplicationError::Persistence("commit registry is poisoned".to_string()))?;
        if !in_flight.insert(id.clone()) {
            return Err(ApplicationError::Conflict(format!(
                "a commit is already in progress for conversation {id}"
            )));
        }
        Ok(CommitGuard { in_flight: &self.commits_in_flight, id: id.clone() })
    }

    /// A commit saves its own snapshot, so answers arriving meanwhile would be lost.
    fn ensure_not_committing(&self, id: &ConversationId) -> Result<(), ApplicationError> {
        let in_flight = self
            .commits_in_flight
            .lock()
            .map_err(|_| ApplicationError::Persistence("commit registry is poisoned".to_string()))?;
        if in_flight.contains(id) {
            warn!(
                event_name = "intake.answer.rejected",
                conversation_id = %id,
                reason = "commit_in_progress",
                "answer rejected"
            );
            return Err(ApplicationError::Conflict(format!(
                "a commit is in progress for conversation {id}"
            )));
        }
        Ok(())
    }

    async fn load(&self, id: &ConversationId) -> Result<Conversation, ApplicationError> {
        self.conversations
            .find_by_id(id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::not_found("conversation", id.0.clone()))
    }

    fn status_of(&self, conversation: Conversation) -> IntakeStatus {
        let status = self.slots.status(&conversation.slots);
        IntakeStatus {
            conversation_id: conversation.id,
            stage: conversation.stage,
            slots: conversation.slots,
            gaps: status.gaps,
            next_question: status.next_question,
        }
    }
}
