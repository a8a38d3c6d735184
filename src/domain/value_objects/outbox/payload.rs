use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stored payload document. Opaque to the queue, written once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct OutboxPayload(Value);

impl OutboxPayload {
    pub fn new(value: Value) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    fn validate(value: &Value) -> Result<(), String> {
        if !value.is_object() {
            return Err("Outbox payload must be a JSON object".to_string());
        }
        Ok(())
    }
}

impl From<OutboxPayload> for Value {
    fn from(payload: OutboxPayload) -> Self {
        payload.0
    }
}
