use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(pub String);

impl DraftId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub owner: String,
    pub payload: Map<String, Value>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DraftPatch {
    pub owner: Option<String>,
    pub payload: Option<Map<String, Value>>,
}

impl Draft {
    pub fn new(owner: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self { id: DraftId::generate(), owner: owner.into(), payload, updated_at: Utc::now() }
    }

    pub fn apply(&mut self, patch: DraftPatch) {
        if let Some(owner) = patch.owner {
            self.owner = owner;
        }
        if let Some(payload) = patch.payload {
            self.payload = payload;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{Draft, DraftPatch};

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object payload")
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut draft = Draft::new("alice", payload(json!({"key": "value"})));
        let before = draft.updated_at;

        draft.apply(DraftPatch { owner: None, payload: Some(payload(json!({"updated": true}))) });

        assert_eq!(draft.owner, "alice");
        assert_eq!(Value::Object(draft.payload.clone()), json!({"updated": true}));
        assert!(draft.updated_at >= before);
    }

    #[test]
    fn generated_ids_are_distinct() {
        let first = Draft::new("a", Map::new());
        let second = Draft::new("a", Map::new());
        assert_ne!(first.id, second.id);
    }
}
