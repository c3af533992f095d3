use std::collections::HashMap;

use tokio::sync::RwLock;

use devteam_core::domain::conversation::{Conversation, ConversationId};
use devteam_core::domain::draft::{Draft, DraftId};

use super::{ConversationRepository, DraftRepository, RepositoryError};

/// Process-local conversation store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryConversationRepository {
    conversations: RwLock<HashMap<String, Conversation>>,
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn create(&self, conversation: Conversation) -> Result<(), RepositoryError> {
        let mut conversations = self.conversations.write().await;
        if conversations.contains_key(&conversation.id.0) {
            return Err(RepositoryError::Conflict(format!(
                "conversation {} already exists",
                conversation.id
            )));
        }
        conversations.insert(conversation.id.0.clone(), conversation);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(&id.0).cloned())
    }

    async fn save(&self, conversation: Conversation) -> Result<(), RepositoryError> {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id.0.clone(), conversation);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryDraftRepository {
    drafts: RwLock<HashMap<String, Draft>>,
}

#[async_trait::async_trait]
impl DraftRepository for InMemoryDraftRepository {
    async fn list(&self) -> Result<Vec<Draft>, RepositoryError> {
        let drafts = self.drafts.read().await;
        let mut listed = drafts.values().cloned().collect::<Vec<_>>();
        listed.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(listed)
    }

    async fn find_by_id(&self, id: &DraftId) -> Result<Option<Draft>, RepositoryError> {
        let drafts = self.drafts.read().await;
        Ok(drafts.get(&id.0).cloned())
    }

    async fn save(&self, draft: Draft) -> Result<(), RepositoryError> {
        let mut drafts = self.drafts.write().await;
        drafts.insert(draft.id.0.clone(), draft);
        Ok(())
    }

    async fn delete(&self, id: &DraftId) -> Result<bool, RepositoryError> {
        let mut drafts = self.drafts.write().await;
        Ok(drafts.remove(&id.0).is_some())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use devteam_core::domain::conversation::Conversation;
    use devteam_core::domain::draft::{Draft, DraftId};
    use devteam_core::domain::slots::{SlotName, SlotValue};

    use crate::repositories::{
        ConversationRepository, DraftRepository, InMemoryConversationRepository,
        InMemoryDraftRepository, RepositoryError,
    };

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object payload")
    }

    #[tokio::test]
    async fn in_memory_conversation_repo_round_trip() {
        let repo = InMemoryConversationRepository::default();
        let mut conversation = Conversation::start();
        repo.create(conversation.clone()).await.expect("create conversation");

        conversation
            .slots
            .set(SlotName::ProjectName, SlotValue::Text("Shop".to_string()))
            .expect("set slot");
        repo.save(conversation.clone()).await.expect("save conversation");

        let found = repo.find_by_id(&conversation.id).await.expect("find conversation");
        assert_eq!(found, Some(conversation));
    }

    #[tokio::test]
    async fn creating_an_existing_conversation_conflicts() {
        let repo = InMemoryConversationRepository::default();
        let conversation = Conversation::start();
        repo.create(conversation.clone()).await.expect("create conversation");

        let error = repo.create(conversation).await.expect_err("duplicate id");
        assert!(matches!(error, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn in_memory_draft_repo_crud() {
        let repo = InMemoryDraftRepository::default();
        let draft = Draft::new("alice", payload(json!({"key": "value"})));

        repo.save(draft.clone()).await.expect("save draft");
        assert_eq!(repo.find_by_id(&draft.id).await.expect("find"), Some(draft.clone()));
        assert_eq!(repo.list().await.expect("list"), vec![draft.clone()]);

        assert!(repo.delete(&draft.id).await.expect("delete"));
        assert!(!repo.delete(&draft.id).await.expect("second delete"));
        assert_eq!(repo.find_by_id(&DraftId(draft.id.0.clone())).await.expect("find"), None);
    }
}
