//! Uniform result record returned by every tool execution.
//!
//! The envelope is an open record: `success` and `error` are always present
//! on the wire, everything else is tool specific. Extra fields are keyed by
//! name; their order carries no meaning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{ success, error?, ...fields }`, serialized flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ResultEnvelope {
    /// An empty successful envelope
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
            fields: Map::new(),
        }
    }

    /// A failed envelope carrying a human readable message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            fields: Map::new(),
        }
    }

    /// Builder-style insert of an extra field.
    ///
    /// `success` and `error` are reserved: use the struct fields instead.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if key == "success" || key == "error" {
            tracing::warn!(target: "envelope", key = %key, "Ignoring reserved envelope key");
            return;
        }
        self.fields.insert(key, value.into());
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Reads a field as a list of strings, skipping non-string items
    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        self.fields.get(key)?.as_array().map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::with_capacity(self.fields.len() + 2);
        obj.insert("success".to_string(), Value::Bool(self.success));
        if let Some(err) = &self.error {
            obj.insert("error".to_string(), Value::String(err.clone()));
        }
        for (k, v) in &self.fields {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

impl From<ResultEnvelope> for Value {
    fn from(env: ResultEnvelope) -> Self {
        env.to_value()
    }
}
