use std::path::Path;

use serde_json::{json, Value};
use tera::{Context, Tera};
use tracing::warn;

use devteam_core::domain::slots::ConversationState;

use crate::generator::GenerationError;

pub const NONE_SPECIFIED: &str = "None specified";
pub const NOT_SPECIFIED: &str = "Not specified";

/// Field the model is asked to fill with the finished markdown.
pub const PRD_CONTENT_FIELD: &str = "prd_content";

pub const FALLBACK_TEMPLATE: &str = "# Product Requirements Document: {project_name}

{project_description}

{target_users}

{key_features}

{technical_requirements}

{success_metrics}

{timeline}

{budget_constraints}

{integration_requirements}

{data_entities}
";

const PROMPT_TEMPLATE: &str = "Generate a comprehensive Product Requirements Document (PRD) based on the following project information:

Project Name: {{ project_name }}
Description: {{ project_description }}
Target Users: {{ target_users }}
Key Features: {{ key_features }}
Technical Requirements: {{ technical_requirements }}
Success Metrics: {{ success_metrics }}
Timeline: {{ timeline }}
Budget Constraints: {{ budget_constraints }}
Integration Requirements: {{ integration_requirements }}
Data Entities: {{ data_entities }}

Use this template structure:
{{ template }}

Return only the filled PRD content in markdown format.";

pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": { PRD_CONTENT_FIELD: { "type": "string" } }
    })
}

/// Reads the operator's template, or the built-in one when the file is absent or unreadable.
pub async fn load_template(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(template) => template,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => FALLBACK_TEMPLATE.to_string(),
        Err(error) => {
            warn!(
                event_name = "artifacts.template.unreadable",
                path = %path.display(),
                error = %error,
                "template could not be read; using built-in template"
            );
            FALLBACK_TEMPLATE.to_string()
        }
    }
}

pub fn render_prompt(state: &ConversationState, template: &str) -> Result<String, GenerationError> {
    let mut context = Context::new();
    context.insert("project_name", &text_or(&state.project_name, NONE_SPECIFIED));
    context.insert("project_description", &text_or(&state.project_description, NONE_SPECIFIED));
    context.insert("target_users", &text_or(&state.target_users, NONE_SPECIFIED));
    context.insert("key_features", &list_or(&state.key_features));
    context.insert(
        "technical_requirements",
        &text_or(&state.technical_requirements, NONE_SPECIFIED),
    );
    context.insert("success_metrics", &text_or(&state.success_metrics, NONE_SPECIFIED));
    context.insert("timeline", &text_or(&state.timeline, NOT_SPECIFIED));
    context.insert("budget_constraints", &text_or(&state.budget_constraints, NONE_SPECIFIED));
    context.insert("integration_requirements", &list_or(&state.integration_requirements));
    context.insert("data_entities", &list_or(&state.data_entities));
    context.insert("template", template);

    Tera::one_off(PROMPT_TEMPLATE, &context, false)
        .map_err(|error| GenerationError::Template(error.to_string()))
}

/// The markdown body from a model reply; anything but a string yields "".
pub fn extract_content(value: &Value) -> String {
    value.get(PRD_CONTENT_FIELD).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn text_or(value: &Option<String>, default: &str) -> String {
    value.as_deref().filter(|text| !text.trim().is_empty()).unwrap_or(default).to_string()
}

fn list_or(value: &Option<Vec<String>>) -> String {
    match value {
        Some(items) if !items.is_empty() => items.join(", "),
        _ => NONE_SPECIFIED.to_string(),
    }
}
