use devteam_agent::build_client;
use devteam_core::config::{AppConfig, LoadOptions};
use devteam_db::{connect_with_settings, ping};
use serde::Serialize;

use crate::commands::{current_thread_runtime, CommandResult, DOCTOR};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const SKIPPED_CHECKS: [&str; 3] =
    ["llm_provider_readiness", "artifact_paths", "database_connectivity"];

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let passed = report.overall_status == CheckStatus::Pass;

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult::report(output, passed)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_provider(&config));
            checks.push(check_artifact_paths(&config));
            checks.push(check_database_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(SKIPPED_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Builds the client without calling the provider.
fn check_llm_provider(config: &AppConfig) -> DoctorCheck {
    match build_client(&config.llm) {
        Ok(client) => DoctorCheck {
            name: "llm_provider_readiness",
            status: CheckStatus::Pass,
            details: format!(
                "{} client ready (model `{}`, timeout {}s)",
                client.provider_name(),
                config.llm.model,
                config.llm.timeout_secs
            ),
        },
        Err(error) => DoctorCheck {
            name: "llm_provider_readiness",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_artifact_paths(config: &AppConfig) -> DoctorCheck {
    let artifacts = &config.artifacts;
    let template = if artifacts.template_path.exists() {
        format!("template `{}`", artifacts.template_path.display())
    } else {
        "built-in template (no template file found)".to_string()
    };

    DoctorCheck {
        name: "artifact_paths",
        status: CheckStatus::Pass,
        details: format!(
            "documents in `{}`, contract at `{}`, {template}",
            artifacts.documents_dir.display(),
            artifacts.contract_path.display()
        ),
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match current_thread_runtime(DOCTOR) {
        Ok(runtime) => runtime,
        Err(failure) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: failure.output,
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        let checked = ping(&pool).await.map_err(|error| format!("database ping failed: {error}"));
        pool.close().await;
        checked
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
