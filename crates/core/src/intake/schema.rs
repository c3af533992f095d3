use crate::domain::slots::SlotName;

/// Static slot definitions. Required order is load-bearing: the first gap decides the
/// next question.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlotSchema;

const REQUIRED_SLOTS: [SlotName; 4] = [
    SlotName::ProjectName,
    SlotName::ProjectDescription,
    SlotName::TargetUsers,
    SlotName::KeyFeatures,
];

impl SlotSchema {
    pub fn required(&self) -> &'static [SlotName] {
        &REQUIRED_SLOTS
    }

    pub fn question(&self, slot: SlotName) -> &'static str {
        match slot {
            SlotName::ProjectName => "What is the name of your project?",
            SlotName::ProjectDescription => "Please provide a brief description of your project.",
            SlotName::TargetUsers => "Who are the target users for this project?",
            SlotName::KeyFeatures => {
                "What are the key features you want to implement? (comma-separated list)"
            }
            SlotName::TechnicalRequirements => "Do you have any specific technical requirements?",
            SlotName::SuccessMetrics => "How will you measure the success of this project?",
            SlotName::Timeline => "What is your target timeline for this project?",
            SlotName::BudgetConstraints => "Are there any budget constraints we should consider?",
            SlotName::IntegrationRequirements => {
                "Do you need to integrate with any external systems?"
            }
            SlotName::DataEntities => {
                "What are the main data entities in your system? (e.g., users, products, orders)"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::SlotSchema;
    use crate::domain::slots::SlotName;

    #[test]
    fn required_slots_keep_declaration_order() {
        assert_eq!(
            SlotSchema.required(),
            &[
                SlotName::ProjectName,
                SlotName::ProjectDescription,
                SlotName::TargetUsers,
                SlotName::KeyFeatures
            ]
        );
        assert!(!SlotSchema.required().contains(&SlotName::DataEntities));
    }

    #[test]
    fn every_slot_has_a_distinct_question() {
        let questions =
            SlotName::ALL.into_iter().map(|slot| SlotSchema.question(slot)).collect::<BTreeSet<_>>();
        assert_eq!(questions.len(), SlotName::ALL.len());
    }
}
