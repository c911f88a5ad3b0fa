//! JSON Schema values with a lazily compiled validator.

use crate::error::{RestToolsError, Result};
use jsonschema::Validator;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};
use std::fmt;
use std::sync::{Arc, OnceLock};

type Compiled = std::result::Result<Arc<Validator>, String>;

/// A JSON Schema kept in its wire form, plus the validator compiled from it.
///
/// The validator is compiled on first use and published once; every later caller (on any thread)
/// reads the same compiled value without locking. A compile failure is cached the same way.
///
/// The compiled form always belongs to the current raw form: [`Schema::set_raw`] takes `&mut self`
/// and discards the cell, so the next use recompiles.
#[derive(Clone)]
pub struct Schema {
    raw: Value,
    compiled: OnceLock<Compiled>,
}

impl Schema {
    #[must_use]
    pub fn new(raw: Value) -> Self {
        Self {
            raw,
            compiled: OnceLock::new(),
        }
    }

    /// The schema of a tool that takes no declared arguments: `{"type":"object"}`.
    #[must_use]
    pub fn empty_object() -> Self {
        Self::new(json!({"type": "object"}))
    }

    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    #[must_use]
    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Replace the raw form. The compiled validator is rebuilt lazily on next use.
    pub fn set_raw(&mut self, raw: Value) {
        self.raw = raw;
        self.compiled = OnceLock::new();
    }

    /// Whether the validator has already been compiled (successfully or not).
    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// Compiled validator for the current raw form.
    ///
    /// # Errors
    ///
    /// Returns [`RestToolsError::Schema`] if the raw form is not a valid JSON Schema.
    pub fn validator(&self) -> Result<Arc<Validator>> {
        self.compiled
            .get_or_init(|| {
                jsonschema::validator_for(&self.raw)
                    .map(Arc::new)
                    .map_err(|e| e.to_string())
            })
            .clone()
            .map_err(RestToolsError::Schema)
    }

    /// Validate an instance against this schema.
    ///
    /// # Errors
    ///
    /// - [`RestToolsError::Schema`] if the schema itself does not compile
    /// - [`RestToolsError::Validation`] with all violations joined by `"; "`
    pub fn validate(&self, instance: &Value) -> Result<()> {
        let validator = self.validator()?;
        let messages: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| {
                let path = e.instance_path().to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();

        if messages.is_empty() {
            Ok(())
        } else {
            Err(RestToolsError::Validation(messages.join("; ")))
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("raw", &self.raw)
            .field("compiled", &self.is_compiled())
            .finish()
    }
}

impl From<Value> for Schema {
    fn from(raw: Value) -> Self {
        Self::new(raw)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::new)
    }
}
