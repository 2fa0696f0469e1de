use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::{PayloadValidator, ValidationError, ValidationOptions};
use crate::types::Document;

/// Declared type of a payload field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    #[default]
    Any,
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Number => "a number",
            FieldKind::Integer => "an integer",
            FieldKind::Boolean => "a boolean",
            FieldKind::Object => "an object",
            FieldKind::Array => "an array",
            FieldKind::Any => "a value",
        }
    }
}

/// Rule for a single payload field.
///
/// `min`/`max` bound the character count of strings, the item count of
/// arrays and the value of numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldRule {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
}

impl FieldRule {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Check one value, returning the (possibly converted) value to keep
    fn check(&self, key: &str, value: Value, convert: bool) -> Result<Value, String> {
        let value = if convert { self.coerce(value) } else { value };
        let type_error = || format!("\"{}\" must be {}", key, self.kind.describe());

        match (&self.kind, &value) {
            (FieldKind::Any, _) => {}
            (FieldKind::String, Value::String(s)) => {
                self.check_bounds(key, s.chars().count() as f64, "length", "characters long")?
            }
            (FieldKind::Number, Value::Number(n)) => {
                self.check_value_bounds(key, n.as_f64().unwrap_or_default())?
            }
            (FieldKind::Integer, Value::Number(n)) => {
                if !(n.is_i64() || n.is_u64()) {
                    return Err(type_error());
                }
                self.check_value_bounds(key, n.as_f64().unwrap_or_default())?
            }
            (FieldKind::Boolean, Value::Bool(_)) => {}
            (FieldKind::Object, Value::Object(_)) => {}
            (FieldKind::Array, Value::Array(items)) => {
                self.check_bounds(key, items.len() as f64, "count", "items")?
            }
            _ => return Err(type_error()),
        }

        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(&value) {
                let listed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                return Err(format!("\"{}\" must be one of [{}]", key, listed.join(", ")));
            }
        }

        Ok(value)
    }

    /// Query-string transports deliver every value as text
    fn coerce(&self, value: Value) -> Value {
        let Value::String(text) = &value else {
            return value;
        };
        let trimmed = text.trim();
        match self.kind {
            FieldKind::Integer => trimmed
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or(value),
            FieldKind::Number => trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(value),
            FieldKind::Boolean => match trimmed {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => value,
            },
            _ => value,
        }
    }

    fn check_bounds(&self, key: &str, size: f64, noun: &str, unit: &str) -> Result<(), String> {
        if let Some(min) = self.min {
            if size < min {
                return Err(format!("\"{}\" {} must be at least {} {}", key, noun, min, unit));
            }
        }
        if let Some(max) = self.max {
            if size > max {
                return Err(format!(
                    "\"{}\" {} must be less than or equal to {} {}",
                    key, noun, max, unit
                ));
            }
        }
        Ok(())
    }

    fn check_value_bounds(&self, key: &str, n: f64) -> Result<(), String> {
        if let Some(min) = self.min {
            if n < min {
                return Err(format!("\"{}\" must be greater than or equal to {}", key, min));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                return Err(format!("\"{}\" must be less than or equal to {}", key, max));
            }
        }
        Ok(())
    }
}

/// Declarative payload schema: field name to rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadSchema {
    pub fields: BTreeMap<String, FieldRule>,
}

impl PayloadSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.insert(name.into(), rule);
        self
    }

    /// Validate and sanitize a payload against this schema
    pub fn check(
        &self,
        mut payload: Document,
        options: &ValidationOptions,
    ) -> Result<Document, ValidationError> {
        let mut errors = Vec::new();
        let mut sanitized = Document::new();

        for (key, rule) in &self.fields {
            match payload.remove(key) {
                Some(value) => match rule.check(key, value, options.convert) {
                    Ok(value) => {
                        sanitized.insert(key.clone(), value);
                    }
                    Err(e) => errors.push(e),
                },
                None if rule.required => errors.push(format!("\"{}\" is required", key)),
                None => {}
            }
            if options.abort_early && !errors.is_empty() {
                return Err(ValidationError::new(errors));
            }
        }

        // Whatever is left was not declared
        for (key, value) in payload {
            if options.strip_unknown {
                continue;
            }
            if options.allow_unknown {
                sanitized.insert(key, value);
                continue;
            }
            errors.push(format!("\"{}\" is not allowed", key));
            if options.abort_early {
                break;
            }
        }

        if errors.is_empty() {
            Ok(sanitized)
        } else {
            Err(ValidationError::new(errors))
        }
    }
}

/// Built-in validator over [`PayloadSchema`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

#[async_trait]
impl PayloadValidator for SchemaValidator {
    async fn validate(
        &self,
        payload: Document,
        schema: Option<&PayloadSchema>,
        options: &ValidationOptions,
    ) -> Result<Document, ValidationError> {
        match schema {
            Some(schema) => schema.check(payload, options),
            None => Ok(payload),
        }
    }
}
