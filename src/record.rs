use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One log entry as it travels through the formatting pipeline.
///
/// `fields` is the open part of the record: structured event fields plus
/// whatever pipeline steps attach (e.g. `fileName`, `lineNumber`). It is
/// flattened into the top-level object when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub message: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl LogRecord {
    /// A bare `INFO` record carrying only `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: "INFO".to_string(),
            target: String::new(),
            module_path: None,
            file: None,
            line: None,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set `name` to `value`, or remove it when `value` is `None`.
    pub fn set_field<V: Into<Value>>(&mut self, name: &str, value: Option<V>) {
        match value {
            Some(v) => {
                self.fields.insert(name.to_string(), v.into());
            }
            None => {
                self.fields.remove(name);
            }
        }
    }
}
