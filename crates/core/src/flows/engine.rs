use thiserror::Error;

use crate::domain::slots::SlotName;
use crate::flows::states::{FlowAction, FlowContext, FlowEvent, IntakeStage, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_stage(&self) -> IntakeStage;
    fn transition(
        &self,
        current: IntakeStage,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

#[derive(Clone, Debug, Default)]
pub struct IntakeFlow;

impl FlowDefinition for IntakeFlow {
    fn initial_stage(&self) -> IntakeStage {
        IntakeStage::Started
    }

    fn transition(
        &self,
        current: IntakeStage,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_intake(current, event, context)
    }
}

#[derive(Clone, Debug)]
pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_stage(&self) -> IntakeStage {
        self.flow.initial_stage()
    }

    pub fn apply(
        &self,
        current: IntakeStage,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }
}

impl Default for FlowEngine<IntakeFlow> {
    fn default() -> Self {
        Self::new(IntakeFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("missing required information: {}", join_slots(.missing))]
    MissingRequiredSlots { state: IntakeStage, missing: Vec<SlotName> },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: IntakeStage, event: FlowEvent },
}

fn join_slots(slots: &[SlotName]) -> String {
    slots.iter().map(|slot| slot.as_str()).collect::<Vec<_>>().join(", ")
}

fn transition_intake(
    current: IntakeStage,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        GenerateRequirementsDocument, MergeApiContract, PromptForMissingSlots, RecordArtifacts,
    };
    use FlowEvent::{AnswerAccepted, ArtifactsGenerated, CommitRequested};
    use IntakeStage::{Committed, InProgress, Ready, Started};

    let gaps = &context.missing_required_slots;
    let (to, actions) = match (current, event) {
        (Started | InProgress | Ready, AnswerAccepted) => {
            if gaps.is_empty() {
                (Ready, Vec::new())
            } else {
                (InProgress, vec![PromptForMissingSlots])
            }
        }
        (Started | InProgress | Ready, CommitRequested) => {
            if !gaps.is_empty() {
                return Err(FlowTransitionError::MissingRequiredSlots {
                    state: current,
                    missing: gaps.clone(),
                });
            }
            (Ready, vec![GenerateRequirementsDocument, MergeApiContract])
        }
        (Ready, ArtifactsGenerated) => (Committed, vec![RecordArtifacts]),
        (Committed, _) | (Started | InProgress, ArtifactsGenerated) => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current, to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::domain::slots::SlotName;
    use crate::flows::engine::{FlowEngine, FlowTransitionError, IntakeFlow};
    use crate::flows::states::{FlowAction, FlowContext, FlowEvent, IntakeStage};

    #[test]
    fn intake_happy_path_reaches_committed() {
        let engine = FlowEngine::new(IntakeFlow);
        let mut stage = engine.initial_stage();
        assert_eq!(stage, IntakeStage::Started);

        stage = engine
            .apply(
                stage,
                &FlowEvent::AnswerAccepted,
                &FlowContext::with_gaps(vec![SlotName::TargetUsers]),
            )
            .expect("started -> in progress")
            .to;
        assert_eq!(stage, IntakeStage::InProgress);

        stage = engine
            .apply(stage, &FlowEvent::AnswerAccepted, &FlowContext::default())
            .expect("in progress -> ready")
            .to;
        assert_eq!(stage, IntakeStage::Ready);

        let commit = engine
            .apply(stage, &FlowEvent::CommitRequested, &FlowContext::default())
            .expect("ready commit");
        assert_eq!(commit.to, IntakeStage::Ready);
        assert_eq!(
            commit.actions,
            vec![FlowAction::GenerateRequirementsDocument, FlowAction::MergeApiContract]
        );

        let committed = engine
            .apply(commit.to, &FlowEvent::ArtifactsGenerated, &FlowContext::default())
            .expect("ready -> committed");
        assert_eq!(committed.to, IntakeStage::Committed);
        assert!(committed.to.is_terminal());
    }

    #[test]
    fn answer_on_optional_slot_moves_started_to_in_progress() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(
                IntakeStage::Started,
                &FlowEvent::AnswerAccepted,
                &FlowContext::with_gaps(vec![SlotName::ProjectName, SlotName::KeyFeatures]),
            )
            .expect("answer accepted");

        assert_eq!(outcome.to, IntakeStage::InProgress);
        assert_eq!(outcome.actions, vec![FlowAction::PromptForMissingSlots]);
    }

    #[test]
    fn commit_with_gaps_names_missing_slots() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(
                IntakeStage::InProgress,
                &FlowEvent::CommitRequested,
                &FlowContext::with_gaps(vec![SlotName::ProjectDescription]),
            )
            .expect_err("commit must be rejected");

        assert_eq!(
            error,
            FlowTransitionError::MissingRequiredSlots {
                state: IntakeStage::InProgress,
                missing: vec![SlotName::ProjectDescription],
            }
        );
        assert_eq!(error.to_string(), "missing required information: project_description");
    }

    #[test]
    fn committed_stage_rejects_everything() {
        let engine = FlowEngine::default();
        for event in
            [FlowEvent::AnswerAccepted, FlowEvent::CommitRequested, FlowEvent::ArtifactsGenerated]
        {
            let error = engine
                .apply(IntakeStage::Committed, &event, &FlowContext::default())
                .expect_err("committed is terminal");
            assert!(matches!(
                error,
                FlowTransitionError::InvalidTransition { state: IntakeStage::Committed, .. }
            ));
        }
    }

    #[test]
    fn artifacts_cannot_be_recorded_before_ready() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(IntakeStage::InProgress, &FlowEvent::ArtifactsGenerated, &FlowContext::default())
            .expect_err("not ready");

        assert!(matches!(error, FlowTransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let engine = FlowEngine::default();
        let script = [
            (FlowEvent::AnswerAccepted, vec![SlotName::ProjectDescription]),
            (FlowEvent::AnswerAccepted, Vec::new()),
            (FlowEvent::CommitRequested, Vec::new()),
            (FlowEvent::ArtifactsGenerated, Vec::new()),
        ];

        let run = |engine: &FlowEngine<IntakeFlow>| {
            let mut stage = engine.initial_stage();
            let mut actions = Vec::new();
            for (event, gaps) in &script {
                let outcome = engine
                    .apply(stage, event, &FlowContext::with_gaps(gaps.clone()))
                    .expect("deterministic run");
                actions.push(outcome.actions);
                stage = outcome.to;
            }
            (stage, actions)
        };

        let first = run(&engine);
        let second = run(&engine);

        assert_eq!(first, second);
        assert_eq!(first.0, IntakeStage::Committed);
    }
}
