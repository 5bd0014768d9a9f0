//! Feedback retrieval engine: orchestrates resolution-scoped queries with
//! value filtering and limit prioritization, plus the search surface that
//! wraps results with context for display.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::api::DataClient;
use super::feedback_query::FeedbackQuery;
use super::sampler;
use crate::models::FeedbackItem;
use crate::utils::{ApiResult, TimeWindow, normalize_value};

/// Parameters for one retrieval.
#[derive(Debug, Clone)]
pub struct FindRequest {
    pub account_id: String,
    pub scorecard_id: String,
    pub score_id: String,
    pub window: TimeWindow,
    /// Keep only items whose initial answer equals this (normalized)
    pub initial_value: Option<String>,
    /// Keep only items whose final answer equals this (normalized)
    pub final_value: Option<String>,
    pub limit: Option<usize>,
    pub prioritize_edit_comments: bool,
}

impl FindRequest {
    pub fn new(
        account_id: impl Into<String>,
        scorecard_id: impl Into<String>,
        score_id: impl Into<String>,
        window: TimeWindow,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            scorecard_id: scorecard_id.into(),
            score_id: score_id.into(),
            window,
            initial_value: None,
            final_value: None,
            limit: None,
            prioritize_edit_comments: true,
        }
    }
}

/// Context block attached to search results so callers can see exactly what
/// was queried.
#[derive(Debug, Clone, Serialize)]
pub struct SearchContext {
    pub scorecard_name: String,
    pub score_name: String,
    pub scorecard_id: String,
    pub score_id: String,
    pub account_id: String,
    pub filters: serde_json::Value,
    pub total_found: usize,
}

/// Token-efficient projection of one feedback item for search output.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackItemSummary {
    pub item_id: Option<String>,
    pub external_id: Option<String>,
    pub initial_value: Option<String>,
    pub final_value: Option<String>,
    pub initial_explanation: Option<String>,
    pub final_explanation: Option<String>,
    pub edit_comment: Option<String>,
}

impl From<&FeedbackItem> for FeedbackItemSummary {
    fn from(item: &FeedbackItem) -> Self {
        Self {
            item_id: item.item_id.clone(),
            external_id: item.item.as_ref().and_then(|i| i.external_id.clone()),
            initial_value: item.initial_answer_value.clone(),
            final_value: item.final_answer_value.clone(),
            initial_explanation: item.initial_comment_value.clone(),
            final_explanation: item.final_comment_value.clone(),
            edit_comment: item.edit_comment_value.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub context: SearchContext,
    pub feedback_items: Vec<FeedbackItemSummary>,
}

pub struct FeedbackFinder {
    query: FeedbackQuery,
}

impl FeedbackFinder {
    pub fn new(client: Arc<dyn DataClient>) -> Self {
        Self { query: FeedbackQuery::new(client) }
    }

    pub fn query(&self) -> &FeedbackQuery {
        &self.query
    }

    /// Retrieve feedback items for a score in a window, applying the value
    /// filters and then the prioritized limit.
    pub async fn find(&self, request: &FindRequest) -> ApiResult<Vec<FeedbackItem>> {
        tracing::info!(
            "Finding feedback items for scorecard {}, score {} in window {} .. {}",
            request.scorecard_id,
            request.score_id,
            request.window.start,
            request.window.end
        );

        let mut items = self
            .query
            .list_feedback(
                &request.account_id,
                &request.scorecard_id,
                &request.score_id,
                &request.window,
                None,
                None,
            )
            .await?;

        if request.initial_value.is_some() || request.final_value.is_some() {
            let want_initial = request.initial_value.as_deref().map(normalize_value);
            let want_final = request.final_value.as_deref().map(normalize_value);
            items.retain(|item| {
                let initial_ok = want_initial.as_deref().is_none_or(|want| {
                    item.initial_answer_value
                        .as_deref()
                        .is_some_and(|have| normalize_value(have) == want)
                });
                let final_ok = want_final.as_deref().is_none_or(|want| {
                    item.final_answer_value
                        .as_deref()
                        .is_some_and(|have| normalize_value(have) == want)
                });
                initial_ok && final_ok
            });
            tracing::info!("After value filtering: {} items", items.len());
        }

        if request.limit.is_some() {
            items = sampler::prioritize_edit_comments(
                items,
                request.limit,
                request.prioritize_edit_comments,
            );
            tracing::info!("After prioritization and limit: {} items", items.len());
        }

        // The index query already sorts by updatedAt descending; the
        // fallback path gives no ordering guarantee.
        Ok(items)
    }

    /// High-level search: retrieval plus context and per-item summaries.
    pub async fn search(
        &self,
        scorecard_name: &str,
        score_name: &str,
        request: &FindRequest,
    ) -> ApiResult<SearchResult> {
        let items = self.find(request).await?;
        let summaries: Vec<FeedbackItemSummary> =
            items.iter().map(FeedbackItemSummary::from).collect();

        let context = SearchContext {
            scorecard_name: scorecard_name.to_string(),
            score_name: score_name.to_string(),
            scorecard_id: request.scorecard_id.clone(),
            score_id: request.score_id.clone(),
            account_id: request.account_id.clone(),
            filters: json!({
                "initial_value": request.initial_value,
                "final_value": request.final_value,
                "start": request.window.start.to_rfc3339(),
                "end": request.window.end.to_rfc3339(),
                "limit": request.limit,
                "prioritize_edit_comments": request.prioritize_edit_comments,
            }),
            total_found: summaries.len(),
        };

        Ok(SearchResult { context, feedback_items: summaries })
    }
}

/// Human message for an empty search, naming the active filters.
pub fn empty_search_message(
    score_name: &str,
    scorecard_name: &str,
    initial_value: Option<&str>,
    final_value: Option<&str>,
) -> String {
    let mut filters = Vec::new();
    if let Some(v) = initial_value {
        filters.push(format!("initial value '{}'", v));
    }
    if let Some(v) = final_value {
        filters.push(format!("final value '{}'", v));
    }
    let filter_text = if filters.is_empty() {
        String::new()
    } else {
        format!(" with {}", filters.join(" and "))
    };
    format!(
        "No feedback items found for score '{}' in scorecard '{}'{}.",
        score_name, scorecard_name, filter_text
    )
}
