// Data API Module
// Purpose: Provide a unified interface to the remote review data service
// Design: Async trait so services stay testable against an in-memory impl

mod graphql;

pub use graphql::GraphQlClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{FeedbackItem, Identifier, Item, ScoreResult, Scorecard};
use crate::utils::{ApiResult, TimeWindow};

/// One page of a paginated list result.
#[derive(Debug, Clone, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

/// Parameters for the composite feedback index query keyed by
/// `(accountId, scorecardId, scoreId, updatedAt)`.
#[derive(Debug, Clone)]
pub struct FeedbackIndexQuery {
    pub account_id: String,
    pub scorecard_id: String,
    pub score_id: String,
    pub window: TimeWindow,
    /// Page size for the index query (default 100)
    pub page_size: usize,
    /// Fetch the nested item in the same request
    pub with_item: bool,
}

impl FeedbackIndexQuery {
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
            page_size: 100,
            with_item: true,
        }
    }
}

/// Index scope for score result queries, narrowest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreResultScope {
    Score(String),
    Scorecard(String),
    Account(String),
}

/// Mutation input for creating or updating a FeedbackItem. `id` is set only
/// on update; unset optional fields are omitted from the payload so updates
/// merge instead of clearing.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItemInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub account_id: String,
    pub scorecard_id: String,
    pub score_id: String,
    pub cache_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_answer_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_answer_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_comment_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_comment_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_comment_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_agreement: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

/// Mutation input for creating or updating an Item. `metadata` and
/// `identifiers` are pre-serialized JSON text, matching the stored shape.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_evaluation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_type: Option<String>,
}

/// Mutation input for one Identifier row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierInput {
    pub item_id: String,
    pub account_id: String,
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub position: i32,
}

/// Unified interface to the remote data service.
///
/// The production implementation speaks GraphQL over HTTP; tests use an
/// in-memory implementation. Every list result carries `items` plus an
/// opaque continuation token.
#[async_trait]
pub trait DataClient: Send + Sync {
    // ========================================
    // Scorecards & Scores
    // ========================================

    /// Get a scorecard by id, with sections and scores.
    async fn get_scorecard(&self, id: &str) -> ApiResult<Option<Scorecard>>;

    /// Get a scorecard by external id within an account.
    async fn get_scorecard_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> ApiResult<Option<Scorecard>>;

    /// Get a scorecard by key within an account.
    async fn get_scorecard_by_key(
        &self,
        account_id: &str,
        key: &str,
    ) -> ApiResult<Option<Scorecard>>;

    /// List all scorecards for an account (shallow; no sections).
    async fn list_scorecards(&self, account_id: &str) -> ApiResult<Vec<Scorecard>>;

    // ========================================
    // Feedback
    // ========================================

    /// One page of the composite feedback index query (sorted by updatedAt
    /// descending on the primary path).
    async fn query_feedback_page(
        &self,
        query: &FeedbackIndexQuery,
        next_token: Option<String>,
    ) -> ApiResult<Page<FeedbackItem>>;

    /// One page of the fallback filtered list: equality on account,
    /// scorecard, and score plus `updatedAt >= cutoff`. No server-side sort
    /// guarantee.
    async fn list_feedback_filtered(
        &self,
        account_id: &str,
        scorecard_id: &str,
        score_id: &str,
        cutoff: DateTime<Utc>,
        limit: usize,
        next_token: Option<String>,
    ) -> ApiResult<Page<FeedbackItem>>;

    /// Fetch one feedback record by id, with its nested item.
    async fn get_feedback_item(&self, id: &str) -> ApiResult<Option<FeedbackItem>>;

    /// Cache-key index lookup used by upserts.
    async fn find_feedback_by_cache_key(&self, cache_key: &str)
    -> ApiResult<Option<FeedbackItem>>;

    /// One page of the filtered composite-key lookup
    /// (account + scorecard + score + cacheKey equality).
    async fn list_feedback_by_composite_key(
        &self,
        account_id: &str,
        scorecard_id: &str,
        score_id: &str,
        cache_key: &str,
        next_token: Option<String>,
    ) -> ApiResult<Page<FeedbackItem>>;

    async fn create_feedback_item(&self, input: FeedbackItemInput) -> ApiResult<FeedbackItem>;

    async fn update_feedback_item(&self, input: FeedbackItemInput) -> ApiResult<FeedbackItem>;

    // ========================================
    // Score Results
    // ========================================

    /// One page of score results in the given scope with an
    /// `updatedAt between` range, using the narrowest matching index.
    async fn query_score_results_page(
        &self,
        scope: &ScoreResultScope,
        window: &TimeWindow,
        limit: usize,
        next_token: Option<String>,
    ) -> ApiResult<Page<ScoreResult>>;

    // ========================================
    // Items & Identifiers
    // ========================================

    async fn get_item(&self, id: &str) -> ApiResult<Option<Item>>;

    /// Find an item by `externalId` equality within an account.
    async fn find_item_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> ApiResult<Option<Item>>;

    async fn create_item(&self, input: ItemInput) -> ApiResult<Item>;

    async fn update_item(&self, input: ItemInput) -> ApiResult<Item>;

    /// Index lookup of an identifier row by value scoped to an account.
    /// When duplicates exist the first match wins and a warning is logged.
    async fn find_identifier_by_value(
        &self,
        account_id: &str,
        value: &str,
    ) -> ApiResult<Option<Identifier>>;

    async fn create_identifier(&self, input: IdentifierInput) -> ApiResult<Identifier>;
}
