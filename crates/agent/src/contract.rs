use std::path::{Path, PathBuf};

use serde_json::json;
use serde_yaml::{Mapping, Value};

use crate::generator::GenerationError;

/// Collection path segment for an entity: lowercased, inner whitespace joined by `_`, pluralized.
pub fn collection_segment(entity: &str) -> String {
    let base = entity.split_whitespace().collect::<Vec<_>>().join("_").to_lowercase();
    pluralize(&base)
}

pub fn pluralize(word: &str) -> String {
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| word.ends_with(suffix)) {
        return format!("{word}es");
    }
    let mut chars = word.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(before) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{word}s")
}

fn schema_name(entity: &str) -> String {
    entity.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Starting document when no contract file exists yet.
pub fn base_document() -> Value {
    let document = json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Agentic Dev Team API",
            "version": "1.0.0",
            "description": "Multi-agent web development system API"
        },
        "paths": {},
        "components": {
            "schemas": {
                "Draft": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "owner": { "type": "string" },
                        "payload": { "type": "object" },
                        "updated_at": { "type": "string", "format": "date-time" }
                    }
                },
                "DraftCreate": {
                    "type": "object",
                    "properties": {
                        "owner": { "type": "string" },
                        "payload": { "type": "object" }
                    },
                    "required": ["owner", "payload"]
                },
                "DraftUpdate": {
                    "type": "object",
                    "properties": {
                        "owner": { "type": "string" },
                        "payload": { "type": "object" }
                    }
                }
            }
        }
    });

    let mut document = to_yaml(document);
    if let Some(paths) = document.get_mut("paths").and_then(Value::as_mapping_mut) {
        let (collection, item) = resource_paths("draft", "Draft", "/v1/drafts");
        paths.insert(Value::from("/v1/drafts"), collection);
        paths.insert(Value::from("/v1/drafts/{id}"), item);
    }
    document
}

fn to_yaml(value: serde_json::Value) -> Value {
    serde_yaml::to_value(value).unwrap_or(Value::Null)
}

fn id_parameter() -> serde_json::Value {
    json!([{
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string", "format": "uuid" }
    }])
}

/// Collection and item path objects for one resource.
fn resource_paths(singular: &str, schema: &str, collection_path: &str) -> (Value, Value) {
    let plural = collection_path.rsplit('/').next().unwrap_or(singular);
    let entity_ref = format!("#/components/schemas/{schema}");
    let create_ref = format!("#/components/schemas/{schema}Create");
    let update_ref = format!("#/components/schemas/{schema}Update");

    let collection = json!({
        "get": {
            "summary": format!("List {plural}"),
            "responses": {
                "200": {
                    "description": format!("List of {plural}"),
                    "content": { "application/json": { "schema": {
                        "type": "array",
                        "items": { "$ref": entity_ref }
                    } } }
                }
            }
        },
        "post": {
            "summary": format!("Create {singular}"),
            "requestBody": {
                "content": { "application/json": { "schema": { "$ref": create_ref } } }
            },
            "responses": {
                "201": {
                    "description": format!("{schema} created"),
                    "content": { "application/json": { "schema": { "$ref": entity_ref } } }
                }
            }
        }
    });

    let item = json!({
        "get": {
            "summary": format!("Get {singular} by ID"),
            "parameters": id_parameter(),
            "responses": {
                "200": {
                    "description": format!("{schema} details"),
                    "content": { "application/json": { "schema": { "$ref": entity_ref } } }
                }
            }
        },
        "put": {
            "summary": format!("Update {singular}"),
            "parameters": id_parameter(),
            "requestBody": {
                "content": { "application/json": { "schema": { "$ref": update_ref } } }
            },
            "responses": {
                "200": {
                    "description": format!("{schema} updated"),
                    "content": { "application/json": { "schema": { "$ref": entity_ref } } }
                }
            }
        },
        "delete": {
            "summary": format!("Delete {singular}"),
            "parameters": id_parameter(),
            "responses": { "204": { "description": format!("{schema} deleted") } }
        }
    });

    (to_yaml(collection), to_yaml(item))
}

fn entity_schemas(schema: &str) -> [(String, Value); 3] {
    [
        (
            schema.to_string(),
            to_yaml(json!({
                "type": "object",
                "properties": { "id": { "type": "string", "format": "uuid" } }
            })),
        ),
        (format!("{schema}Create"), to_yaml(json!({ "type": "object" }))),
        (format!("{schema}Update"), to_yaml(json!({ "type": "object" }))),
    ]
}

fn child_mapping<'a>(parent: &'a mut Mapping, key: &str) -> Option<&'a mut Mapping> {
    let key = Value::from(key);
    if !parent.get(&key).is_some_and(Value::is_mapping) {
        parent.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    parent.get_mut(&key).and_then(Value::as_mapping_mut)
}

/// Overwrites the paths and component schemas of every named entity. Other keys are untouched.
pub fn merge_entities(document: &mut Mapping, entities: &[String]) {
    for entity in entities.iter().map(|entity| entity.trim()).filter(|entity| !entity.is_empty()) {
        let singular = schema_name(entity).to_lowercase();
        let schema = schema_name(entity);
        let collection_path = format!("/v1/{}", collection_segment(entity));
        let (collection, item) = resource_paths(&singular, &schema, &collection_path);

        if let Some(paths) = child_mapping(document, "paths") {
            paths.insert(Value::from(collection_path.clone()), collection);
            paths.insert(Value::from(format!("{collection_path}/{{id}}")), item);
        }

        let schemas = child_mapping(document, "components")
            .and_then(|components| child_mapping(components, "schemas"));
        if let Some(schemas) = schemas {
            for (name, definition) in entity_schemas(&schema) {
                schemas.insert(Value::from(name), definition);
            }
        }
    }
}

/// Reads the contract at `path`, or the base document when the file does not exist.
pub async fn load_document(path: &Path) -> Result<Mapping, GenerationError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return match base_document() {
                Value::Mapping(mapping) => Ok(mapping),
                _ => Err(GenerationError::ContractFormat {
                    path: path.to_path_buf(),
                    reason: "base document is not a mapping".to_string(),
                }),
            };
        }
        Err(source) => return Err(GenerationError::Io { path: path.to_path_buf(), source }),
    };

    match serde_yaml::from_str::<Value>(&raw) {
        Ok(Value::Mapping(mapping)) => Ok(mapping),
        Ok(_) => Err(GenerationError::ContractFormat {
            path: path.to_path_buf(),
            reason: "top-level YAML value is not a mapping".to_string(),
        }),
        Err(error) => Err(GenerationError::ContractFormat {
            path: path.to_path_buf(),
            reason: error.to_string(),
        }),
    }
}

pub async fn write_document(path: &Path, document: &Mapping) -> Result<(), GenerationError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| GenerationError::Io { path: parent.to_path_buf(), source })?;
    }
    let rendered = serde_yaml::to_string(document).map_err(|error| {
        GenerationError::ContractFormat { path: path.to_path_buf(), reason: error.to_string() }
    })?;
    // Written beside the target and renamed over it so readers never see a partial document.
    let staging = staging_path(path);
    if let Err(source) = tokio::fs::write(&staging, rendered).await {
        return Err(GenerationError::Io { path: staging, source });
    }
    if let Err(source) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(GenerationError::Io { path: path.to_path_buf(), source });
    }
    Ok(())
}

/// `contracts/api.yaml` stages through `contracts/.api.yaml.tmp`.
pub fn staging_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// The contract as served over HTTP: the file when present, else the base document.
pub async fn current_document_json(path: &Path) -> Result<serde_json::Value, GenerationError> {
    let document = load_document(path).await?;
    serde_json::to_value(&document).map_err(|error| GenerationError::ContractFormat {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })
}
