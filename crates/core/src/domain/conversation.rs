use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::artifact::Artifact;
use crate::domain::slots::ConversationState;
use crate::flows::IntakeStage;

pub const CONVERSATION_ID_PREFIX: &str = "conv_";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn generate() -> Self {
        Self(format!("{CONVERSATION_ID_PREFIX}{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub stage: IntakeStage,
    pub slots: ConversationState,
    pub artifacts: Vec<Artifact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::generate(),
            stage: IntakeStage::Started,
            slots: ConversationState::new(),
            artifacts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::{Conversation, ConversationId, CONVERSATION_ID_PREFIX};
    use crate::flows::IntakeStage;

    #[test]
    fn generated_ids_carry_prefix_and_hex_suffix() {
        let id = ConversationId::generate();
        let suffix = id.0.strip_prefix(CONVERSATION_ID_PREFIX).expect("prefixed id");

        assert_eq!(suffix.len(), 32);
        assert!(suffix.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
        assert_ne!(id, ConversationId::generate());
    }

    #[test]
    fn new_conversation_starts_empty() {
        let conversation = Conversation::start();
        assert_eq!(conversation.stage, IntakeStage::Started);
        assert!(conversation.slots.filled_slots().is_empty());
        assert!(conversation.artifacts.is_empty());
    }
}
