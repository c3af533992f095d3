use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::Row;

use devteam_core::domain::draft::{Draft, DraftId};

use super::{DraftRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDraftRepository {
    pool: DbPool,
}

impl SqlDraftRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_draft(row: &sqlx::sqlite::SqliteRow) -> Result<Draft, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let owner: String = row.try_get("owner").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let payload_json: String =
        row.try_get("payload").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let payload = match serde_json::from_str::<Value>(&payload_json)
        .map_err(|e| RepositoryError::Decode(format!("payload: {e}")))?
    {
        Value::Object(map) => map,
        other => {
            return Err(RepositoryError::Decode(format!(
                "payload for draft {id} is not an object: {other}"
            )))
        }
    };

    Ok(Draft {
        id: DraftId(id),
        owner,
        payload,
        updated_at: parse_timestamp("updated_at", &updated_at_str)?,
    })
}

fn encode_payload(payload: &Map<String, Value>) -> Result<String, RepositoryError> {
    serde_json::to_string(payload).map_err(|e| RepositoryError::Decode(e.to_string()))
}

#[async_trait::async_trait]
impl DraftRepository for SqlDraftRepository {
    async fn list(&self) -> Result<Vec<Draft>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, owner, payload, updated_at FROM drafts ORDER BY updated_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_draft).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(&self, id: &DraftId) -> Result<Option<Draft>, RepositoryError> {
        let row = sqlx::query("SELECT id, owner, payload, updated_at FROM drafts WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_draft(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, draft: Draft) -> Result<(), RepositoryError> {
        let payload = encode_payload(&draft.payload)?;

        sqlx::query(
            "INSERT INTO drafts (id, owner, payload, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 owner = excluded.owner,
                 payload = excluded.payload,
                 updated_at = excluded.updated_at",
        )
        .bind(&draft.id.0)
        .bind(&draft.owner)
        .bind(payload)
        .bind(draft.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &DraftId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM drafts WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
