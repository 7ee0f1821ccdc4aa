use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Metadata attached to every overlay event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique identifier for this event
    pub event_id: Uuid,

    /// When the event was constructed
    pub timestamp: DateTime<Utc>,

    /// Id of the notification that caused the event, when the sender supplied one
    pub correlation_id: Option<Uuid>,

    /// Notes added by the dispatcher, such as a create applied as an update
    pub context: Value,
}

impl EventMetadata {
    pub fn new(correlation_id: Option<Uuid>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            correlation_id,
            context: json!({}),
        }
    }

    /// Add a key to the context object.
    pub fn with_note(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Value::Object(map) = &mut self.context {
            map.insert(key.to_string(), value.into());
        }
        self
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new(None)
    }
}
