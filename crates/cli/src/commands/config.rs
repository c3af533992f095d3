use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use devteam_core::config::AppConfig;
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{load_config, CommandResult, CONFIG};

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> CommandResult {
    let config = match load_config(CONFIG) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::report(lines.join("\n"), true)
}

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let database = &config.database;
    let llm = &config.llm;
    let server = &config.server;
    let artifacts = &config.artifacts;

    vec![
        Field::new("database.url", database.url.clone(), &["DEVTEAM_DATABASE_URL"]),
        Field::new(
            "database.max_connections",
            database.max_connections.to_string(),
            &["DEVTEAM_DATABASE_MAX_CONNECTIONS"],
        ),
        Field::new(
            "database.timeout_secs",
            database.timeout_secs.to_string(),
            &["DEVTEAM_DATABASE_TIMEOUT_SECS"],
        ),
        Field::new(
            "database.run_migrations",
            database.run_migrations.to_string(),
            &["DEVTEAM_DATABASE_RUN_MIGRATIONS"],
        ),
        Field::new("llm.provider", llm.provider.as_str(), &["DEVTEAM_LLM_PROVIDER"]),
        Field::new("llm.model", llm.model.clone(), &["DEVTEAM_LLM_MODEL"]),
        Field::new(
            "llm.base_url",
            llm.base_url.as_deref().unwrap_or("<unset>"),
            &["DEVTEAM_LLM_BASE_URL"],
        ),
        Field::new(
            "llm.api_key",
            redact_secret(llm.api_key.as_ref().map(|key| key.expose_secret())),
            &["DEVTEAM_LLM_API_KEY"],
        ),
        Field::new("llm.timeout_secs", llm.timeout_secs.to_string(), &["DEVTEAM_LLM_TIMEOUT_SECS"]),
        Field::new("llm.max_retries", llm.max_retries.to_string(), &["DEVTEAM_LLM_MAX_RETRIES"]),
        Field::new("llm.max_tokens", llm.max_tokens.to_string(), &["DEVTEAM_LLM_MAX_TOKENS"]),
        Field::new(
            "server.bind_address",
            server.bind_address.clone(),
            &["DEVTEAM_SERVER_BIND_ADDRESS"],
        ),
        Field::new("server.port", server.port.to_string(), &["DEVTEAM_SERVER_PORT"]),
        Field::new(
            "server.graceful_shutdown_secs",
            server.graceful_shutdown_secs.to_string(),
            &["DEVTEAM_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        Field::new(
            "artifacts.documents_dir",
            artifacts.documents_dir.display().to_string(),
            &["DEVTEAM_ARTIFACTS_DOCUMENTS_DIR"],
        ),
        Field::new(
            "artifacts.contract_path",
            artifacts.contract_path.display().to_string(),
            &["DEVTEAM_ARTIFACTS_CONTRACT_PATH"],
        ),
        Field::new(
            "artifacts.template_path",
            artifacts.template_path.display().to_string(),
            &["DEVTEAM_ARTIFACTS_TEMPLATE_PATH"],
        ),
        Field::new("intake.store", config.intake.store.as_str(), &["DEVTEAM_INTAKE_STORE"]),
        Field::new(
            "cors.allowed_origins",
            config.cors.allowed_origins.join(","),
            &["DEVTEAM_CORS_ALLOWED_ORIGINS"],
        ),
        Field::new(
            "logging.level",
            config.logging.level.clone(),
            &["DEVTEAM_LOGGING_LEVEL", "DEVTEAM_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            config.logging.format.as_str(),
            &["DEVTEAM_LOGGING_FORMAT", "DEVTEAM_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("devteam.toml"), PathBuf::from("config/devteam.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a recognisable key prefix such as `sk-` and hides the rest.
fn redact_secret(secret: Option<&str>) -> String {
    let Some(secret) = secret.map(str::trim) else {
        return "<unset>".to_string();
    };
    if secret.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = secret.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
