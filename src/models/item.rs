//! Item and Identifier: the evaluated content and its named handles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::doc::Doc;

/// One piece of evaluated content (a call, transcript, or form).
///
/// An item is the single shared record for one real-world artifact; multiple
/// scores may attach feedback to it. Items are created through
/// upsert-by-identifiers and never deleted by this crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    pub id: String,
    pub account_id: Option<String>,
    pub evaluation_id: Option<String>,
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub text: Option<String>,
    /// Free-form metadata, stored remotely as serialized JSON text.
    pub metadata: Option<Doc>,
    /// Legacy identifier list kept on the item itself for readers that query
    /// the item directly; the indexed `Identifier` rows are authoritative.
    pub identifiers: Option<Doc>,
    pub attached_files: Option<Vec<String>>,
    pub score_id: Option<String>,
    pub is_evaluation: Option<bool>,
    /// "evaluation" or "prediction"
    pub created_by_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Parse the legacy identifier list stored on the item, tolerating both
    /// JSON-text and structured forms. Unparseable content yields an empty
    /// list.
    pub fn legacy_identifiers(&self) -> Vec<LegacyIdentifierEntry> {
        let Some(doc) = &self.identifiers else {
            return Vec::new();
        };
        match doc.to_value() {
            serde_json::Value::Array(entries) => entries
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// One entry of the legacy on-item identifier list.
///
/// Older writers stored the handle value under `id`; newer ones use `value`.
/// Both are accepted on read; `effective_value` picks whichever is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LegacyIdentifierEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl LegacyIdentifierEntry {
    pub fn effective_value(&self) -> Option<&str> {
        self.value.as_deref().or(self.id.as_deref())
    }
}

/// One standalone `(itemId, name, value)` handle row, stored separately so
/// lookups by value scoped to an account hit an index.
///
/// Within an account a value resolves to at most one item; the lookup takes
/// the first match and logs when duplicates appear.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Identifier {
    pub id: Option<String>,
    pub item_id: String,
    pub account_id: Option<String>,
    pub name: String,
    pub value: String,
    pub url: Option<String>,
    pub position: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
