use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::slots::{ConversationState, SlotKind, SlotName, SlotValue};
use crate::errors::DomainError;
use crate::intake::schema::SlotSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStatus {
    pub gaps: Vec<SlotName>,
    pub next_question: Option<String>,
}

/// Gap detection, question sequencing and answer validation.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlotFillEngine {
    schema: SlotSchema,
}

impl SlotFillEngine {
    pub fn new(schema: SlotSchema) -> Self {
        Self { schema }
    }

    /// Missing required slots, in required declaration order.
    pub fn gaps(&self, state: &ConversationState) -> Vec<SlotName> {
        self.schema.required().iter().copied().filter(|slot| !state.is_filled(*slot)).collect()
    }

    pub fn next_question(&self, gaps: &[SlotName]) -> Option<&'static str> {
        gaps.first().map(|slot| self.schema.question(*slot))
    }

    pub fn status(&self, state: &ConversationState) -> SlotStatus {
        let gaps = self.gaps(state);
        let next_question = self.next_question(&gaps).map(str::to_string);
        SlotStatus { gaps, next_question }
    }

    /// Normalizes a raw answer into the slot's stored shape, or explains why it was rejected.
    pub fn validate_value(&self, slot: SlotName, value: &Value) -> Result<SlotValue, DomainError> {
        match slot.kind() {
            SlotKind::Scalar => {
                let text = scalar_text(value).ok_or_else(|| invalid(slot, "expected a text value"))?;
                if text.is_empty() {
                    return Err(invalid(slot, "value must not be blank"));
                }
                Ok(SlotValue::Text(text))
            }
            SlotKind::Sequence => {
                let items = match value {
                    Value::String(raw) => {
                        if raw.trim().is_empty() {
                            return Err(invalid(slot, "value must not be blank"));
                        }
                        raw.split(',')
                            .map(str::trim)
                            .filter(|item| !item.is_empty())
                            .map(str::to_string)
                            .collect::<Vec<_>>()
                    }
                    Value::Array(entries) => {
                        let mut items = Vec::with_capacity(entries.len());
                        for entry in entries {
                            let text = scalar_text(entry)
                                .ok_or_else(|| invalid(slot, "list items must be text values"))?;
                            if !text.is_empty() {
                                items.push(text);
                            }
                        }
                        items
                    }
                    _ => return Err(invalid(slot, "expected a list or comma-separated text")),
                };

                if items.is_empty() {
                    return Err(invalid(slot, "list must contain at least one item"));
                }
                Ok(SlotValue::List(items))
            }
        }
    }

    /// Validates then overwrites the named slot. A rejected answer leaves `state` untouched.
    pub fn apply_answer(
        &self,
        state: &mut ConversationState,
        slot: SlotName,
        value: &Value,
    ) -> Result<(), DomainError> {
        let normalized = self.validate_value(slot, value)?;
        state.set(slot, normalized)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn invalid(slot: SlotName, reason: &str) -> DomainError {
    DomainError::InvalidSlotValue { slot, reason: reason.to_string() }
}
