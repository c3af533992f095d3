use std::sync::Arc;

use devteam_agent::{build_client, ArtifactGenerator, IntakeRuntime, LlmClient, LlmError};
use devteam_core::config::{AppConfig, IntakeStore};
use devteam_db::repositories::{
    ConversationRepository, DraftRepository, InMemoryConversationRepository,
    SqlConversationRepository, SqlDraftRepository,
};
use devteam_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<IntakeRuntime>,
    pub drafts: Arc<dyn DraftRepository>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("language model client could not be built: {0}")]
    Llm(#[from] LlmError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let llm = build_client(&config.llm)?;
    bootstrap_with_client(config, llm).await
}

pub async fn bootstrap_with_client(
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        provider = llm.provider_name(),
        intake_store = config.intake.store.as_str(),
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    if config.database.run_migrations {
        migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
        info!(
            event_name = "system.bootstrap.migrations_applied",
            correlation_id = "bootstrap",
            "database migrations applied"
        );
    }

    let conversations: Arc<dyn ConversationRepository> = match config.intake.store {
        IntakeStore::Memory => Arc::new(InMemoryConversationRepository::default()),
        IntakeStore::Database => Arc::new(SqlConversationRepository::new(db_pool.clone())),
    };
    let generator = Arc::new(ArtifactGenerator::new(llm, config.artifacts.clone()));
    let runtime = Arc::new(IntakeRuntime::new(conversations, generator));
    let drafts: Arc<dyn DraftRepository> = Arc::new(SqlDraftRepository::new(db_pool.clone()));

    Ok(Application { config, db_pool, runtime, drafts })
}

/// Single-connection in-memory database with artifacts rooted at `root`.
#[cfg(test)]
pub(crate) fn test_config(root: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".to_string();
    config.database.max_connections = 1;
    config.artifacts.documents_dir = root.join("docs/prds");
    config.artifacts.contract_path = root.join("contracts/api.yaml");
    config.artifacts.template_path = root.join("docs/templates/PRD_TEMPLATE.md");
    config
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use devteam_agent::ScriptedLlmClient;
    use devteam_core::config::LlmProvider;
    use tempfile::TempDir;

    use crate::bootstrap::{
        bootstrap_with_client, bootstrap_with_config, test_config, BootstrapError,
    };

    #[tokio::test]
    async fn bootstrap_fails_fast_when_provider_lacks_api_key() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = test_config(dir.path());
        config.llm.provider = LlmProvider::OpenAi;
        config.llm.api_key = None;

        let error = bootstrap_with_config(config).await.err().expect("missing api key must fail");
        assert!(matches!(error, BootstrapError::Llm(_)));
        assert!(error.to_string().contains("llm.api_key"));
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_runtime() {
        let dir = TempDir::new().expect("tempdir");
        let app = bootstrap_with_client(
            test_config(dir.path()),
            Arc::new(ScriptedLlmClient::default()),
        )
        .await
        .expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('drafts', 'conversations', 'slots', 'artifacts')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected intake tables after bootstrap");
        assert_eq!(table_count, 4);

        let started = app.runtime.start(None).await.expect("runtime is usable");
        assert!(started.conversation_id.0.starts_with("conv_"));
        assert!(app.drafts.list().await.expect("drafts table is reachable").is_empty());

        app.db_pool.close().await;
    }
}
