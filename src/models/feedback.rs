//! FeedbackItem: one human review of one AI prediction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::Item;

/// One reviewer correction record for an evaluated item under one score.
///
/// `initial_answer_value` is the AI's original answer, `final_answer_value`
/// the reviewer's corrected answer. Both are independently nullable;
/// analytics only considers records where both are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedbackItem {
    pub id: String,
    pub account_id: Option<String>,
    pub scorecard_id: Option<String>,
    pub score_id: Option<String>,
    pub item_id: Option<String>,
    /// Deduplication key, derived as `"<scoreId>:<formId>"`. The store keeps
    /// at most one record per cache key.
    pub cache_key: Option<String>,
    pub initial_answer_value: Option<String>,
    pub final_answer_value: Option<String>,
    pub initial_comment_value: Option<String>,
    pub final_comment_value: Option<String>,
    pub edit_comment_value: Option<String>,
    pub edited_at: Option<DateTime<Utc>>,
    pub editor_name: Option<String>,
    pub is_agreement: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Lazily-loaded related item; populated when the query requested it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

impl FeedbackItem {
    /// Derive the deduplication cache key for a (score, form) pair.
    pub fn cache_key_for(score_id: &str, form_id: &str) -> String {
        format!("{}:{}", score_id, form_id)
    }

    /// Whether this record carries reviewer edit commentary.
    pub fn has_edit_comment(&self) -> bool {
        self.edit_comment_value
            .as_deref()
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    /// The (initial, final) answer pair, when both sides are present.
    pub fn answer_pair(&self) -> Option<(&str, &str)> {
        match (self.initial_answer_value.as_deref(), self.final_answer_value.as_deref()) {
            (Some(initial), Some(r#final)) => Some((initial, r#final)),
            _ => None,
        }
    }
}
