use async_trait::async_trait;
use thiserror::Error;

use devteam_core::domain::conversation::{Conversation, ConversationId};
use devteam_core::domain::draft::{Draft, DraftId};

pub mod conversation;
pub mod draft;
pub mod memory;

pub use conversation::SqlConversationRepository;
pub use draft::SqlDraftRepository;
pub use memory::{InMemoryConversationRepository, InMemoryDraftRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Inserts a new conversation. Fails with `Conflict` when the id is taken.
    async fn create(&self, conversation: Conversation) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &ConversationId)
        -> Result<Option<Conversation>, RepositoryError>;
    async fn save(&self, conversation: Conversation) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait DraftRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Draft>, RepositoryError>;
    async fn find_by_id(&self, id: &DraftId) -> Result<Option<Draft>, RepositoryError>;
    async fn save(&self, draft: Draft) -> Result<(), RepositoryError>;
    /// Returns `false` when nothing was stored under `id`.
    async fn delete(&self, id: &DraftId) -> Result<bool, RepositoryError>;
}
