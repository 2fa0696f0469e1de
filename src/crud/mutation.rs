//! Insert- and update-time document preparation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::crud::config::{CreateConfig, UpdateConfig};
use crate::hashing::{HashError, SecretHasher};
use crate::types::{Document, Principal, OWNER_FIELD};

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("\"{0}\" must be a string")]
    SecretNotString(String),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Timestamp representation written into date fields
pub fn timestamp(now: DateTime<Utc>) -> Value {
    Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Build the document to insert from a validated payload.
///
/// A null owner field in `defaults` only switches stamping on and is never
/// copied, so anonymous inserts carry an owner only if the caller sent one.
/// Any other owner default is copied like the rest.
pub fn prepare_insert(
    create: &CreateConfig,
    payload: Document,
    principal: Option<&Principal>,
    hasher: &SecretHasher,
    now: DateTime<Utc>,
) -> Result<Document, MutationError> {
    let mut doc: Document = create
        .defaults
        .iter()
        .filter(|(key, value)| !(key.as_str() == OWNER_FIELD && value.is_null()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    doc.extend(payload);

    if let Some(field) = &create.date {
        doc.insert(field.clone(), timestamp(now));
    }

    if let Some(field) = &create.bcrypt {
        hash_field(&mut doc, field, hasher)?;
    }

    if let Some(principal) = principal {
        if create.stamps_owner() {
            doc.insert(OWNER_FIELD.to_string(), Value::String(principal.id.clone()));
        }
    }

    Ok(doc)
}

/// Build the field patch for an update from a validated payload.
///
/// An empty secret is written through unhashed.
pub fn prepare_patch(
    update: &UpdateConfig,
    mut patch: Document,
    hasher: &SecretHasher,
    now: DateTime<Utc>,
) -> Result<Document, MutationError> {
    if let Some(field) = &update.bcrypt {
        if !matches!(patch.get(field), Some(Value::String(secret)) if secret.is_empty()) {
            hash_field(&mut patch, field, hasher)?;
        }
    }

    if let Some(field) = &update.date {
        patch.insert(field.clone(), timestamp(now));
    }

    Ok(patch)
}

/// Replace a secret with its hash; absent or null values are left alone
fn hash_field(doc: &mut Document, field: &str, hasher: &SecretHasher) -> Result<(), MutationError> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(secret)) => {
            let hashed = hasher.hash(secret)?;
            doc.insert(field.to_string(), Value::String(hashed));
            Ok(())
        }
        Some(_) => Err(MutationError::SecretNotString(field.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn payload_overrides_defaults() {
        let create = CreateConfig {
            defaults: doc(json!({"active": true, "role": "normal"})),
            ..Default::default()
        };
        let out = prepare_insert(
            &create,
            doc(json!({"role": "editor"})),
            None,
            &SecretHasher::new(),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(Value::Object(out), json!({"active": true, "role": "editor"}));
    }

    #[test]
    fn stamps_date_field() {
        let create = CreateConfig {
            date: Some("createdAt".to_string()),
            ..Default::default()
        };
        let out = prepare_insert(&create, Document::new(), None, &SecretHasher::new(), fixed_now()).unwrap();
        assert_eq!(out["createdAt"], json!("2024-05-20T12:00:00.000Z"));
    }

    #[test]
    fn hashes_secret_field() {
        let hasher = SecretHasher::new();
        let create = CreateConfig {
            bcrypt: Some("password".to_string()),
            ..Default::default()
        };
        let out = prepare_insert(&create, doc(json!({"password": "hunter22"})), None, &hasher, fixed_now()).unwrap();
        let hashed = out["password"].as_str().unwrap();
        assert_ne!(hashed, "hunter22");
        assert!(hasher.verify("hunter22", hashed).unwrap());
    }

    #[test]
    fn non_string_secret_is_rejected() {
        let create = CreateConfig {
            bcrypt: Some("password".to_string()),
            ..Default::default()
        };
        let err = prepare_insert(&create, doc(json!({"password": 42})), None, &SecretHasher::new(), fixed_now())
            .unwrap_err();
        assert!(matches!(err, MutationError::SecretNotString(field) if field == "password"));
    }

    #[test]
    fn owner_is_stamped_only_for_authenticated_callers() {
        let create = CreateConfig {
            defaults: doc(json!({"uId": null})),
            ..Default::default()
        };
        let hasher = SecretHasher::new();

        let anonymous = prepare_insert(&create, doc(json!({"name": "a"})), None, &hasher, fixed_now()).unwrap();
        assert_eq!(Value::Object(anonymous), json!({"name": "a"}));

        let user = Principal::new("u1", "normal");
        let spoofed = doc(json!({"name": "a", "uId": "someone-else"}));
        let owned = prepare_insert(&create, spoofed, Some(&user), &hasher, fixed_now()).unwrap();
        assert_eq!(Value::Object(owned), json!({"name": "a", "uId": "u1"}));
    }

    #[test]
    fn literal_owner_default_is_copied_for_anonymous_callers() {
        let create = CreateConfig {
            defaults: doc(json!({"uId": "system"})),
            ..Default::default()
        };
        let hasher = SecretHasher::new();

        let anonymous = prepare_insert(&create, doc(json!({"name": "a"})), None, &hasher, fixed_now()).unwrap();
        assert_eq!(Value::Object(anonymous), json!({"name": "a", "uId": "system"}));

        let user = Principal::new("u1", "normal");
        let owned = prepare_insert(&create, doc(json!({"name": "a"})), Some(&user), &hasher, fixed_now()).unwrap();
        assert_eq!(owned["uId"], json!("u1"));
    }

    #[test]
    fn owner_is_not_stamped_without_declaration() {
        let user = Principal::new("u1", "normal");
        let out = prepare_insert(
            &CreateConfig::default(),
            doc(json!({"name": "a"})),
            Some(&user),
            &SecretHasher::new(),
            fixed_now(),
        )
        .unwrap();
        assert!(!out.contains_key(OWNER_FIELD));
    }

    #[test]
    fn patch_hashes_present_secret_and_stamps_date() {
        let hasher = SecretHasher::new();
        let update = UpdateConfig {
            bcrypt: Some("password".to_string()),
            date: Some("updatedAt".to_string()),
            ..Default::default()
        };

        let out = prepare_patch(&update, doc(json!({"password": "newpass1"})), &hasher, fixed_now()).unwrap();
        assert!(hasher.verify("newpass1", out["password"].as_str().unwrap()).unwrap());
        assert_eq!(out["updatedAt"], json!("2024-05-20T12:00:00.000Z"));

        let out = prepare_patch(&update, doc(json!({"name": "b"})), &hasher, fixed_now()).unwrap();
        assert!(!out.contains_key("password"));
        assert_eq!(out["name"], json!("b"));
    }

    #[test]
    fn patch_leaves_empty_secret_unhashed() {
        let update = UpdateConfig {
            bcrypt: Some("password".to_string()),
            ..Default::default()
        };
        let out = prepare_patch(&update, doc(json!({"password": ""})), &SecretHasher::new(), fixed_now()).unwrap();
        assert_eq!(out["password"], json!(""));
    }
}
