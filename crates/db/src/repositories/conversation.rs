use chrono::Utc;
use sqlx::{Row, Sqlite, Transaction};
use uuid::Uuid;

use devteam_core::domain::artifact::Artifact;
use devteam_core::domain::conversation::{Conversation, ConversationId};
use devteam_core::domain::slots::{ConversationState, SlotName, SlotValue};
use devteam_core::flows::IntakeStage;

use super::draft::parse_timestamp;
use super::{ConversationRepository, RepositoryError};
use crate::DbPool;

/// Conversation store backed by the `conversations`, `slots` and `artifacts` tables.
pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_slots(&self, id: &ConversationId) -> Result<ConversationState, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query("SELECT slot_name, slot_value FROM slots WHERE conversation_id = ?")
                .bind(&id.0)
                .fetch_all(&self.pool)
                .await?;

        let mut state = ConversationState::new();
        for row in &rows {
            let name: String =
                row.try_get("slot_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let raw: String =
                row.try_get("slot_value").map_err(|e| RepositoryError::Decode(e.to_string()))?;

            let slot = name
                .parse::<SlotName>()
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let value = serde_json::from_str::<SlotValue>(&raw)
                .map_err(|e| RepositoryError::Decode(format!("slot {slot}: {e}")))?;
            state.set(slot, value).map_err(|e| RepositoryError::Decode(e.to_string()))?;
        }
        Ok(state)
    }

    async fn load_artifacts(&self, id: &ConversationId) -> Result<Vec<Artifact>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT artifact_type, artifact_path, is_empty FROM artifacts
             WHERE conversation_id = ? ORDER BY position ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let kind: String = row
                    .try_get("artifact_type")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let path: String = row
                    .try_get("artifact_path")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let empty: bool =
                    row.try_get("is_empty").map_err(|e| RepositoryError::Decode(e.to_string()))?;

                match kind.as_str() {
                    "prd" => Ok(Artifact::prd(path, empty)),
                    "contract" => Ok(Artifact::contract(path)),
                    other => Err(RepositoryError::Decode(format!("unknown artifact type `{other}`"))),
                }
            })
            .collect()
    }
}

fn project_name(conversation: &Conversation) -> Option<&str> {
    conversation.slots.project_name.as_deref()
}

async fn write_children(
    tx: &mut Transaction<'_, Sqlite>,
    conversation: &Conversation,
) -> Result<(), RepositoryError> {
    let now = Utc::now().to_rfc3339();

    for (slot, value) in conversation.slots.filled_slots() {
        let encoded =
            serde_json::to_string(&value).map_err(|e| RepositoryError::Decode(e.to_string()))?;
        sqlx::query(
            "INSERT INTO slots (id, conversation_id, slot_name, slot_value, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(conversation_id, slot_name) DO UPDATE SET
                 slot_value = excluded.slot_value,
                 updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&conversation.id.0)
        .bind(slot.as_str())
        .bind(encoded)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;
    }

    for (position, artifact) in conversation.artifacts.iter().enumerate() {
        sqlx::query(
            "INSERT INTO artifacts
                 (id, conversation_id, artifact_type, artifact_path, is_empty, position, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(conversation_id, artifact_type, artifact_path) DO UPDATE SET
                 is_empty = excluded.is_empty,
                 position = excluded.position",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&conversation.id.0)
        .bind(artifact.kind.as_str())
        .bind(&artifact.path)
        .bind(artifact.empty)
        .bind(position as i64)
        .bind(&now)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn create(&self, conversation: Conversation) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO conversations (id, project_name, stage, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&conversation.id.0)
        .bind(project_name(&conversation))
        .bind(conversation.stage.as_str())
        .bind(conversation.created_at.to_rfc3339())
        .bind(conversation.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => {
                return Err(RepositoryError::Conflict(format!(
                    "conversation {} already exists",
                    conversation.id
                )));
            }
            Err(error) => return Err(error.into()),
        }

        write_children(&mut tx, &conversation).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, stage, created_at, updated_at FROM conversations WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stage_str: String =
            row.try_get("stage").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let created_at_str: String =
            row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let updated_at_str: String =
            row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let stage = IntakeStage::parse(&stage_str)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown stage `{stage_str}`")))?;

        Ok(Some(Conversation {
            id: id.clone(),
            stage,
            slots: self.load_slots(id).await?,
            artifacts: self.load_artifacts(id).await?,
            created_at: parse_timestamp("created_at", &created_at_str)?,
            updated_at: parse_timestamp("updated_at", &updated_at_str)?,
        }))
    }

    async fn save(&self, conversation: Conversation) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO conversations (id, project_name, stage, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 project_name = excluded.project_name,
                 stage = excluded.stage,
                 updated_at = excluded.updated_at",
        )
        .bind(&conversation.id.0)
        .bind(project_name(&conversation))
        .bind(conversation.stage.as_str())
        .bind(conversation.created_at.to_rfc3339())
        .bind(conversation.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        write_children(&mut tx, &conversation).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use devteam_core::domain::artifact::Artifact;
    use devteam_core::domain::conversation::{Conversation, ConversationId};
    use devteam_core::domain::slots::{SlotName, SlotValue};
    use devteam_core::flows::IntakeStage;

    use super::SqlConversationRepository;
    use crate::repositories::{ConversationRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlConversationRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlConversationRepository::new(pool)
    }

    #[tokio::test]
    async fn conversation_with_slots_and_artifacts_round_trips() {
        let repo = setup().await;
        let mut conversation = Conversation::start();
        conversation
            .slots
            .set(SlotName::ProjectName, SlotValue::Text("Shop".to_string()))
            .expect("set name");
        repo.create(conversation.clone()).await.expect("create");

        conversation
            .slots
            .set(
                SlotName::KeyFeatures,
                SlotValue::List(vec!["cart".to_string(), "checkout".to_string()]),
            )
            .expect("set features");
        conversation.stage = IntakeStage::Committed;
        conversation.artifacts = vec![
            Artifact::prd("docs/prds/FT-20260101_000000.md", true),
            Artifact::contract("contracts/api.yaml"),
        ];
        repo.save(conversation.clone()).await.expect("save");

        let found = repo.find_by_id(&conversation.id).await.expect("find").expect("stored");
        assert_eq!(found.stage, IntakeStage::Committed);
        assert_eq!(found.slots, conversation.slots);
        assert_eq!(found.artifacts, conversation.artifacts);
    }

    #[tokio::test]
    async fn slot_answers_overwrite_previous_rows() {
        let repo = setup().await;
        let mut conversation = Conversation::start();
        repo.create(conversation.clone()).await.expect("create");

        for name in ["Shop", "Market"] {
            conversation
                .slots
                .set(SlotName::ProjectName, SlotValue::Text(name.to_string()))
                .expect("set name");
            repo.save(conversation.clone()).await.expect("save");
        }

        let found = repo.find_by_id(&conversation.id).await.expect("find").expect("stored");
        assert_eq!(found.slots.project_name.as_deref(), Some("Market"));
    }

    #[tokio::test]
    async fn duplicate_create_is_a_conflict() {
        let repo = setup().await;
        let conversation = Conversation::start();
        repo.create(conversation.clone()).await.expect("create");

        let error = repo.create(conversation).await.expect_err("duplicate");
        assert!(matches!(error, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let repo = setup().await;
        let found = repo
            .find_by_id(&ConversationId("conv_missing".to_string()))
            .await
            .expect("query succeeds");
        assert!(found.is_none());
    }
}
