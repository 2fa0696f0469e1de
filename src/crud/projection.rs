use crate::crud::config::ReadConfig;
use crate::types::Document;

/// Which projection a read config asks for; the whitelist wins when both are set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection<'a> {
    None,
    Whitelist(&'a [String]),
    Blacklist(&'a [String]),
}

impl<'a> Projection<'a> {
    pub fn from_config(read: &'a ReadConfig) -> Self {
        match (&read.whitelist, &read.blacklist) {
            (Some(fields), _) => Projection::Whitelist(fields),
            (None, Some(fields)) => Projection::Blacklist(fields),
            (None, None) => Projection::None,
        }
    }

    pub fn apply(&self, doc: Document) -> Document {
        match self {
            Projection::None => doc,
            Projection::Whitelist(fields) => whitelist(doc, fields),
            Projection::Blacklist(fields) => blacklist(doc, fields),
        }
    }

    pub fn apply_all(&self, docs: Vec<Document>) -> Vec<Document> {
        match self {
            Projection::None => docs,
            _ => docs.into_iter().map(|doc| self.apply(doc)).collect(),
        }
    }
}

/// New document holding only the listed fields present in the source
pub fn whitelist(mut doc: Document, fields: &[String]) -> Document {
    let mut out = Document::new();
    for key in fields {
        if let Some(value) = doc.remove(key) {
            out.insert(key.clone(), value);
        }
    }
    out
}

/// Source document minus the listed fields
pub fn blacklist(mut doc: Document, fields: &[String]) -> Document {
    for key in fields {
        doc.remove(key);
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn whitelist_keeps_only_present_listed_fields() {
        let out = whitelist(
            doc(json!({"_id": 1, "name": "a", "secret": "x", "note": null})),
            &names(&["name", "missing", "note"]),
        );
        assert_eq!(Value::Object(out), json!({"name": "a", "note": null}));
    }

    #[test]
    fn blacklist_removes_listed_fields() {
        let out = blacklist(
            doc(json!({"_id": 1, "secret": "x", "v": 1})),
            &names(&["secret", "missing"]),
        );
        assert_eq!(Value::Object(out), json!({"_id": 1, "v": 1}));
    }

    #[test]
    fn whitelist_takes_precedence() {
        let read = ReadConfig {
            whitelist: Some(names(&["v"])),
            blacklist: Some(names(&["v"])),
            ..Default::default()
        };
        let projection = Projection::from_config(&read);
        assert!(matches!(projection, Projection::Whitelist(_)));

        let docs = vec![doc(json!({"_id": 1, "v": 1})), doc(json!({"_id": 2, "v": 2}))];
        let out = projection.apply_all(docs);
        assert_eq!(out, vec![doc(json!({"v": 1})), doc(json!({"v": 2}))]);
    }

    #[test]
    fn no_projection_returns_documents_untouched() {
        let read = ReadConfig::default();
        let source = doc(json!({"_id": 1, "secret": "x"}));
        assert_eq!(Projection::from_config(&read).apply(source.clone()), source);
    }
}
