pub mod config;
pub mod doctor;
pub mod migrate;

use devteam_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

pub const MIGRATE: &str = "migrate";
pub const CONFIG: &str = "config";
pub const DOCTOR: &str = "doctor";

/// Exit code for a doctor run with at least one failing check.
pub const EXIT_CHECKS_FAILED: u8 = 1;

/// Failure classes shared by every command; each owns a distinct exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    ConfigValidation,
    RuntimeInit,
    DbConnectivity,
    Migration,
}

impl ErrorClass {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::ConfigValidation => 2,
            Self::RuntimeInit => 3,
            Self::DbConnectivity => 4,
            Self::Migration => 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'static str,
    error_class: Option<ErrorClass>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let outcome =
            CommandOutcome { command, status: "ok", error_class: None, message: message.into() };
        Self { exit_code: 0, output: render_outcome(&outcome) }
    }

    pub fn failure(command: &str, error_class: ErrorClass, message: impl Into<String>) -> Self {
        let outcome = CommandOutcome {
            command,
            status: "error",
            error_class: Some(error_class),
            message: message.into(),
        };
        Self { exit_code: error_class.exit_code(), output: render_outcome(&outcome) }
    }

    /// Free-form report output (config table, doctor report).
    pub fn report(output: String, passed: bool) -> Self {
        Self { exit_code: if passed { 0 } else { EXIT_CHECKS_FAILED }, output }
    }
}

/// Loads configuration the way the server does, mapping failures to a `config_validation` outcome.
pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            ErrorClass::ConfigValidation,
            format!("config validation failed: {error}"),
        )
    })
}

pub(crate) fn current_thread_runtime(
    command: &str,
) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            ErrorClass::RuntimeInit,
            format!("failed to initialize async runtime: {error}"),
        )
    })
}

fn render_outcome(outcome: &CommandOutcome<'_>) -> String {
    serde_json::to_string(outcome).unwrap_or_else(|error| {
        serde_json::json!({
            "command": outcome.command,
            "status": "error",
            "error_class": "serialization",
            "message": error.to_string(),
        })
        .to_string()
    })
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{CommandResult, ErrorClass, MIGRATE};

    #[test]
    fn failure_carries_class_and_its_exit_code() {
        let result = CommandResult::failure(MIGRATE, ErrorClass::DbConnectivity, "refused");
        assert_eq!(result.exit_code, 4);

        let payload: Value = serde_json::from_str(&result.output).expect("json outcome");
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "db_connectivity");
        assert_eq!(payload["message"], "refused");
    }

    #[test]
    fn success_has_null_error_class() {
        let result = CommandResult::success(MIGRATE, "done");
        let payload: Value = serde_json::from_str(&result.output).expect("json outcome");
        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["status"], "ok");
        assert!(payload["error_class"].is_null());
    }

    #[test]
    fn exit_codes_are_distinct_per_class() {
        let codes = [
            ErrorClass::ConfigValidation,
            ErrorClass::RuntimeInit,
            ErrorClass::DbConnectivity,
            ErrorClass::Migration,
        ]
        .map(ErrorClass::exit_code);
        assert_eq!(codes, [2, 3, 4, 5]);
    }
}
