/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored document: field name to JSON value
pub type Document = Map<String, Value>;

/// Store-assigned identifier field carried by every persisted document
pub const ID_FIELD: &str = "_id";

/// Field recording which principal owns a document
pub const OWNER_FIELD: &str = "uId";

/// Access label that passes every coarse and ownership check
pub const ADMIN_ACCESS: &str = "admin";

/// Access label required by an operation when the resource config is silent
pub const DEFAULT_ACCESS: &str = "normal";

/// The five operations produced for every resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Read,
    Find,
    Update,
    Delete,
}

impl Operation {
    /// Verb used in access-denied messages ("You do not have {verb} access")
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read | Operation::Find => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Authenticated identity making a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub access: String,
}

impl Principal {
    pub fn new(id: impl Into<String>, access: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            access: access.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.access == ADMIN_ACCESS
    }
}

/// Transport-agnostic request handed to every handler
///
/// `payload` is the query string for read-style transports or the body
/// otherwise; the handlers never look at where it came from.
#[derive(Debug, Clone, Default)]
pub struct CrudRequest {
    pub principal: Option<Principal>,
    pub payload: Document,
    pub id: Option<String>,
}

impl CrudRequest {
    pub fn new(principal: Option<Principal>) -> Self {
        Self {
            principal,
            ..Default::default()
        }
    }

    pub fn with_payload(mut self, payload: Document) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Fixed acknowledgment body for update and delete
pub fn acknowledgment(message: &str) -> Value {
    serde_json::json!({ "error": null, "message": message })
}
