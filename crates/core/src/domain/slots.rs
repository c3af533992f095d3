use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    ProjectName,
    ProjectDescription,
    TargetUsers,
    KeyFeatures,
    TechnicalRequirements,
    SuccessMetrics,
    Timeline,
    BudgetConstraints,
    IntegrationRequirements,
    DataEntities,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    Scalar,
    Sequence,
}

impl SlotName {
    pub const ALL: [SlotName; 10] = [
        SlotName::ProjectName,
        SlotName::ProjectDescription,
        SlotName::TargetUsers,
        SlotName::KeyFeatures,
        SlotName::TechnicalRequirements,
        SlotName::SuccessMetrics,
        SlotName::Timeline,
        SlotName::BudgetConstraints,
        SlotName::IntegrationRequirements,
        SlotName::DataEntities,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProjectName => "project_name",
            Self::ProjectDescription => "project_description",
            Self::TargetUsers => "target_users",
            Self::KeyFeatures => "key_features",
            Self::TechnicalRequirements => "technical_requirements",
            Self::SuccessMetrics => "success_metrics",
            Self::Timeline => "timeline",
            Self::BudgetConstraints => "budget_constraints",
            Self::IntegrationRequirements => "integration_requirements",
            Self::DataEntities => "data_entities",
        }
    }

    pub fn kind(self) -> SlotKind {
        match self {
            Self::KeyFeatures | Self::IntegrationRequirements | Self::DataEntities => {
                SlotKind::Sequence
            }
            _ => SlotKind::Scalar,
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotName {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str() == normalized)
            .ok_or_else(|| DomainError::UnknownSlot(value.to_string()))
    }
}

/// A validated answer, already normalized to the shape its slot stores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Text(String),
    List(Vec<String>),
}

/// Slot values collected for one intake session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub target_users: Option<String>,
    pub key_features: Option<Vec<String>>,
    pub technical_requirements: Option<String>,
    pub success_metrics: Option<String>,
    pub timeline: Option<String>,
    pub budget_constraints: Option<String>,
    pub integration_requirements: Option<Vec<String>>,
    pub data_entities: Option<Vec<String>>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_filled(&self, slot: SlotName) -> bool {
        match self.get(slot) {
            Some(SlotValue::Text(_)) => true,
            Some(SlotValue::List(items)) => !items.is_empty(),
            None => false,
        }
    }

    pub fn get(&self, slot: SlotName) -> Option<SlotValue> {
        match slot {
            SlotName::ProjectName => self.project_name.clone().map(SlotValue::Text),
            SlotName::ProjectDescription => self.project_description.clone().map(SlotValue::Text),
            SlotName::TargetUsers => self.target_users.clone().map(SlotValue::Text),
            SlotName::KeyFeatures => self.key_features.clone().map(SlotValue::List),
            SlotName::TechnicalRequirements => {
                self.technical_requirements.clone().map(SlotValue::Text)
            }
            SlotName::SuccessMetrics => self.success_metrics.clone().map(SlotValue::Text),
            SlotName::Timeline => self.timeline.clone().map(SlotValue::Text),
            SlotName::BudgetConstraints => self.budget_constraints.clone().map(SlotValue::Text),
            SlotName::IntegrationRequirements => {
                self.integration_requirements.clone().map(SlotValue::List)
            }
            SlotName::DataEntities => self.data_entities.clone().map(SlotValue::List),
        }
    }

    /// Overwrites one field. The value must already match the slot's kind.
    pub fn set(&mut self, slot: SlotName, value: SlotValue) -> Result<(), DomainError> {
        match (slot.kind(), value) {
            (SlotKind::Scalar, SlotValue::Text(text)) => {
                let field = match slot {
                    SlotName::ProjectName => &mut self.project_name,
                    SlotName::ProjectDescription => &mut self.project_description,
                    SlotName::TargetUsers => &mut self.target_users,
                    SlotName::TechnicalRequirements => &mut self.technical_requirements,
                    SlotName::SuccessMetrics => &mut self.success_metrics,
                    SlotName::Timeline => &mut self.timeline,
                    SlotName::BudgetConstraints => &mut self.budget_constraints,
                    _ => return Err(kind_mismatch(slot)),
                };
                *field = Some(text);
                Ok(())
            }
            (SlotKind::Sequence, SlotValue::List(items)) => {
                let field = match slot {
                    SlotName::KeyFeatures => &mut self.key_features,
                    SlotName::IntegrationRequirements => &mut self.integration_requirements,
                    SlotName::DataEntities => &mut self.data_entities,
                    _ => return Err(kind_mismatch(slot)),
                };
                *field = Some(items);
                Ok(())
            }
            _ => Err(kind_mismatch(slot)),
        }
    }

    pub fn filled_slots(&self) -> Vec<(SlotName, SlotValue)> {
        SlotName::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|value| (slot, value)))
            .collect()
    }
}

fn kind_mismatch(slot: SlotName) -> DomainError {
    DomainError::InvalidSlotValue {
        slot,
        reason: match slot.kind() {
            SlotKind::Scalar => "expected a text value".to_string(),
            SlotKind::Sequence => "expected a list value".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversationState, SlotKind, SlotName, SlotValue};
    use crate::errors::DomainError;

    #[test]
    fn slot_names_parse_from_wire_names() {
        for slot in SlotName::ALL {
            assert_eq!(slot.as_str().parse::<SlotName>().expect("known slot"), slot);
        }
        assert_eq!(
            serde_json::to_string(&SlotName::KeyFeatures).expect("serialize"),
            "\"key_features\""
        );
    }

    #[test]
    fn unknown_slot_name_is_rejected() {
        let error = "favourite_colour".parse::<SlotName>().expect_err("must reject");
        assert_eq!(error, DomainError::UnknownSlot("favourite_colour".to_string()));
    }

    #[test]
    fn sequence_slots_are_the_list_typed_fields() {
        let sequences = SlotName::ALL
            .into_iter()
            .filter(|slot| slot.kind() == SlotKind::Sequence)
            .collect::<Vec<_>>();
        assert_eq!(
            sequences,
            vec![SlotName::KeyFeatures, SlotName::IntegrationRequirements, SlotName::DataEntities]
        );
    }

    #[test]
    fn empty_list_does_not_count_as_filled() {
        let mut state = ConversationState::new();
        state.key_features = Some(Vec::new());
        assert!(!state.is_filled(SlotName::KeyFeatures));

        state.key_features = Some(vec!["cart".to_string()]);
        assert!(state.is_filled(SlotName::KeyFeatures));
    }

    #[test]
    fn set_rejects_value_of_the_wrong_kind() {
        let mut state = ConversationState::new();
        let error = state
            .set(SlotName::ProjectName, SlotValue::List(vec!["x".to_string()]))
            .expect_err("scalar slot cannot hold a list");

        assert!(matches!(error, DomainError::InvalidSlotValue { slot: SlotName::ProjectName, .. }));
        assert_eq!(state, ConversationState::default());
    }

    #[test]
    fn filled_slots_follow_declaration_order() {
        let mut state = ConversationState::new();
        state.set(SlotName::Timeline, SlotValue::Text("Q3".to_string())).expect("set timeline");
        state.set(SlotName::ProjectName, SlotValue::Text("Shop".to_string())).expect("set name");

        let names = state.filled_slots().into_iter().map(|(slot, _)| slot).collect::<Vec<_>>();
        assert_eq!(names, vec![SlotName::ProjectName, SlotName::Timeline]);
    }
}
