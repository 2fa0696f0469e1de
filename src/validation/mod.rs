//! Payload validation seam.
//!
//! Handlers only talk to [`PayloadValidator`]; [`SchemaValidator`] is the
//! built-in implementation over declarative [`PayloadSchema`] rules.

pub mod schema;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Document;

pub use schema::{FieldKind, FieldRule, PayloadSchema, SchemaValidator};

/// Validation failure carrying the validator's diagnostic
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub details: Vec<String>,
}

impl ValidationError {
    pub fn new(details: Vec<String>) -> Self {
        Self {
            message: details.join("; "),
            details,
        }
    }

    pub fn single(detail: impl Into<String>) -> Self {
        Self::new(vec![detail.into()])
    }
}

/// Options forwarded verbatim from the resource config (`validationOpts`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ValidationOptions {
    /// Accept fields the schema does not declare
    pub allow_unknown: bool,
    /// Drop undeclared fields instead of rejecting them
    pub strip_unknown: bool,
    /// Stop at the first failing field
    pub abort_early: bool,
    /// Coerce text values to the declared scalar type
    pub convert: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            allow_unknown: false,
            strip_unknown: false,
            abort_early: true,
            convert: true,
        }
    }
}

/// Contract the handlers rely on: payload in, sanitized payload or diagnostic out.
///
/// A missing schema means "accept as-is".
#[async_trait]
pub trait PayloadValidator: Send + Sync {
    async fn validate(
        &self,
        payload: Document,
        schema: Option<&PayloadSchema>,
        options: &ValidationOptions,
    ) -> Result<Document, ValidationError>;
}
