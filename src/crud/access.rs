//! Coarse access-label gate and post-fetch ownership check.
//!
//! Unauthenticated requests pass both checks. Authorization here is a
//! property of authenticated sessions only; routes that must reject
//! anonymous callers need an authentication layer in front of them.

use serde_json::Value;

use crate::types::{Document, Operation, Principal, OWNER_FIELD};

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(String),
}

/// Coarse check, run before any I/O: admin or an exact label match
pub fn allow(principal: Option<&Principal>, required_access: &str) -> bool {
    match principal {
        None => true,
        Some(p) => p.is_admin() || p.access == required_access,
    }
}

/// [`allow`] with the denial reason for `op`
pub fn check_access(principal: Option<&Principal>, required_access: &str, op: Operation) -> AccessDecision {
    if allow(principal, required_access) {
        AccessDecision::Allow
    } else {
        AccessDecision::Deny(format!("You do not have {} access", op.verb()))
    }
}

/// Row-level check against a fetched document's owner field
pub fn owns(principal: Option<&Principal>, doc: &Document) -> bool {
    match principal {
        None => true,
        Some(p) if p.is_admin() => true,
        Some(p) => matches!(doc.get(OWNER_FIELD), Some(Value::String(owner)) if *owner == p.id),
    }
}

/// [`owns`] with the denial reason for `op`
pub fn check_ownership(principal: Option<&Principal>, doc: &Document, op: Operation) -> AccessDecision {
    if owns(principal, doc) {
        return AccessDecision::Allow;
    }
    let action = match op {
        Operation::Update => "update",
        Operation::Delete => "delete",
        _ => "see",
    };
    AccessDecision::Deny(format!("You are not permitted to {} this", action))
}

/// Owner value forced into list filters; `None` when no scoping applies
pub fn scope_owner(principal: Option<&Principal>) -> Option<&str> {
    match principal {
        Some(p) if !p.is_admin() => Some(p.id.as_str()),
        _ => None,
    }
}
