use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use devteam_core::config::ArtifactsConfig;
use devteam_core::domain::artifact::Artifact;
use devteam_core::domain::slots::ConversationState;

use crate::contract;
use crate::llm::{generate_json, LlmClient};
use crate::prd;

const MAX_PRD_NAME_ATTEMPTS: u32 = 1000;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("i/o failure at `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("contract document `{path}` is invalid: {reason}")]
    ContractFormat { path: PathBuf, reason: String },
    #[error("prompt template failed to render: {0}")]
    Template(String),
}

/// Produces the requirements document and merges the API contract for a finished intake.
pub struct ArtifactGenerator {
    llm: Arc<dyn LlmClient>,
    settings: ArtifactsConfig,
    // Serializes read-modify-write cycles on the shared contract file.
    contract_lock: Mutex<()>,
}

impl ArtifactGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, settings: ArtifactsConfig) -> Self {
        Self { llm, settings, contract_lock: Mutex::new(()) }
    }

    pub fn contract_path(&self) -> &Path {
        &self.settings.contract_path
    }

    /// Returns `[prd, contract]`. On failure no requirements document is left behind.
    pub async fn generate(&self, state: &ConversationState) -> Result<Vec<Artifact>, GenerationError> {
        // Reject an unusable contract before spending a model call.
        contract::load_document(&self.settings.contract_path).await?;

        let prd = self.generate_prd(state).await?;
        match self.update_contract(state).await {
            Ok(contract) => Ok(vec![prd, contract]),
            Err(error) => {
                discard(Path::new(&prd.path)).await;
                Err(error)
            }
        }
    }

    pub async fn generate_prd(&self, state: &ConversationState) -> Result<Artifact, GenerationError> {
        let template = prd::load_template(&self.settings.template_path).await;
        let prompt = prd::render_prompt(state, &template)?;

        let generation = generate_json(self.llm.as_ref(), &prompt, &prd::response_schema()).await;
        let content = prd::extract_content(&generation.value);
        let empty = content.trim().is_empty();

        let path = write_unique(&self.settings.documents_dir, &prd_file_stem(Utc::now()), &content)
            .await?;

        if empty {
            warn!(
                event_name = "artifacts.prd.empty",
                path = %path.display(),
                degraded = generation.degraded,
                attempts = generation.attempts,
                "requirements document written without content"
            );
        } else {
            info!(
                event_name = "artifacts.prd.written",
                path = %path.display(),
                attempts = generation.attempts,
                "requirements document written"
            );
        }

        Ok(Artifact::prd(path.display().to_string(), empty))
    }

    pub async fn update_contract(
        &self,
        state: &ConversationState,
    ) -> Result<Artifact, GenerationError> {
        let path = &self.settings.contract_path;
        let entities = state.data_entities.clone().unwrap_or_default();

        let _guard = self.contract_lock.lock().await;
        let mut document = contract::load_document(path).await?;
        contract::merge_entities(&mut document, &entities);
        contract::write_document(path, &document).await?;

        info!(
            event_name = "artifacts.contract.merged",
            path = %path.display(),
            entities = entities.len(),
            "api contract updated"
        );

        Ok(Artifact::contract(path.display().to_string()))
    }
}

pub fn prd_file_stem(now: DateTime<Utc>) -> String {
    format!("FT-{}", now.format("%Y%m%d_%H%M%S"))
}

async fn discard(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await {
        warn!(
            event_name = "artifacts.prd.discard_failed",
            path = %path.display(),
            error = %error,
            "could not remove requirements document from failed generation"
        );
    }
}

/// Creates `{stem}.md`, or `{stem}-2.md`, `{stem}-3.md`, ... when taken. Never overwrites.
async fn write_unique(dir: &Path, stem: &str, content: &str) -> Result<PathBuf, GenerationError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| GenerationError::Io { path: dir.to_path_buf(), source })?;

    for counter in 1..=MAX_PRD_NAME_ATTEMPTS {
        let name =
            if counter == 1 { format!("{stem}.md") } else { format!("{stem}-{counter}.md") };
        let path = dir.join(name);

        let opened = tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await;
        let mut file = match opened {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(GenerationError::Io { path, source }),
        };

        file.write_all(content.as_bytes())
            .await
            .map_err(|source| GenerationError::Io { path: path.clone(), source })?;
        file.flush().await.map_err(|source| GenerationError::Io { path: path.clone(), source })?;
        return Ok(path);
    }

    Err(GenerationError::Io {
        path: dir.join(format!("{stem}.md")),
        source: std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "no free requirements document name left for this second",
        ),
    })
}
