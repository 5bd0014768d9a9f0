//! Shared test fixtures: an in-memory DataClient plus record builders.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{
    Connection, Doc, FeedbackItem, Identifier, Item, ScoreResult, Scorecard, Section,
};
use crate::services::api::{
    DataClient, FeedbackIndexQuery, FeedbackItemInput, IdentifierInput, ItemInput, Page,
    ScoreResultScope,
};
use crate::utils::{ApiError, ApiResult, TimeWindow};

pub const ACCOUNT: &str = "acct-test";

/// In-memory DataClient with switchable failure modes and call counters.
#[derive(Default)]
pub struct MockDataClient {
    pub scorecards: Mutex<Vec<Scorecard>>,
    pub feedback: Mutex<Vec<FeedbackItem>>,
    pub score_results: Mutex<Vec<ScoreResult>>,
    pub items: Mutex<Vec<Item>>,
    pub identifiers: Mutex<Vec<Identifier>>,

    /// Force the feedback index query to fail with a schema mismatch
    pub fail_index_query: AtomicBool,
    /// Scorecard ids whose index queries fail with a transport error
    pub failing_scorecards: Mutex<HashSet<String>>,

    /// Number of feedback index pages served
    pub feedback_pages: AtomicUsize,
    /// Number of fallback (filtered list) pages served
    pub fallback_pages: AtomicUsize,
    /// Number of score result pages served
    pub result_pages: AtomicUsize,
}

impl MockDataClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scorecard(&self, scorecard: Scorecard) {
        self.scorecards.lock().unwrap().push(scorecard);
    }

    pub fn add_feedback(&self, item: FeedbackItem) {
        self.feedback.lock().unwrap().push(item);
    }

    pub fn add_score_result(&self, result: ScoreResult) {
        self.score_results.lock().unwrap().push(result);
    }

    pub fn add_item(&self, item: Item) {
        self.items.lock().unwrap().push(item);
    }

    pub fn result_page_count(&self) -> usize {
        self.result_pages.load(Ordering::SeqCst)
    }

    fn attach_item(&self, mut feedback: FeedbackItem) -> FeedbackItem {
        if feedback.item.is_none()
            && let Some(item_id) = &feedback.item_id
        {
            feedback.item = self
                .items
                .lock()
                .unwrap()
                .iter()
                .find(|i| &i.id == item_id)
                .cloned();
        }
        feedback
    }

    fn paginate<T: Clone>(items: Vec<T>, page_size: usize, next_token: Option<String>) -> Page<T> {
        let offset: usize = next_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (offset + page_size).min(items.len());
        let page_items = items[offset.min(items.len())..end].to_vec();
        let next = if end < items.len() { Some(end.to_string()) } else { None };
        Page { items: page_items, next_token: next }
    }
}

#[async_trait]
impl DataClient for MockDataClient {
    async fn get_scorecard(&self, id: &str) -> ApiResult<Option<Scorecard>> {
        Ok(self
            .scorecards
            .lock()
            .unwrap()
            .iter()
            .find(|sc| sc.id == id)
            .cloned())
    }

    async fn get_scorecard_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> ApiResult<Option<Scorecard>> {
        Ok(self
            .scorecards
            .lock()
            .unwrap()
            .iter()
            .find(|sc| {
                sc.account_id.as_deref() == Some(account_id)
                    && sc.external_id.as_deref() == Some(external_id)
            })
            .cloned())
    }

    async fn get_scorecard_by_key(
        &self,
        account_id: &str,
        key: &str,
    ) -> ApiResult<Option<Scorecard>> {
        Ok(self
            .scorecards
            .lock()
            .unwrap()
            .iter()
            .find(|sc| {
                sc.account_id.as_deref() == Some(account_id) && sc.key.as_deref() == Some(key)
            })
            .cloned())
    }

    async fn list_scorecards(&self, account_id: &str) -> ApiResult<Vec<Scorecard>> {
        Ok(self
            .scorecards
            .lock()
            .unwrap()
            .iter()
            .filter(|sc| sc.account_id.as_deref() == Some(account_id))
            .cloned()
            .collect())
    }

    async fn query_feedback_page(
        &self,
        query: &FeedbackIndexQuery,
        next_token: Option<String>,
    ) -> ApiResult<Page<FeedbackItem>> {
        if self.fail_index_query.load(Ordering::SeqCst) {
            return Err(ApiError::SchemaMismatch(
                "Validation error of type FieldUndefined: unknown index".into(),
            ));
        }
        if self
            .failing_scorecards
            .lock()
            .unwrap()
            .contains(&query.scorecard_id)
        {
            return Err(ApiError::Transport("connection reset".into()));
        }

        self.feedback_pages.fetch_add(1, Ordering::SeqCst);

        let mut matching: Vec<FeedbackItem> = self
            .feedback
            .lock()
            .unwrap()
            .iter()
            .filter(|fb| {
                fb.account_id.as_deref() == Some(query.account_id.as_str())
                    && fb.scorecard_id.as_deref() == Some(query.scorecard_id.as_str())
                    && fb.score_id.as_deref() == Some(query.score_id.as_str())
                    && fb.updated_at.is_some_and(|t| {
                        t >= query.window.start && t <= query.window.end
                    })
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let matching: Vec<FeedbackItem> = if query.with_item {
            matching.into_iter().map(|fb| self.attach_item(fb)).collect()
        } else {
            matching
        };

        Ok(Self::paginate(matching, query.page_size, next_token))
    }

    async fn list_feedback_filtered(
        &self,
        account_id: &str,
        scorecard_id: &str,
        score_id: &str,
        cutoff: DateTime<Utc>,
        limit: usize,
        next_token: Option<String>,
    ) -> ApiResult<Page<FeedbackItem>> {
        if self
            .failing_scorecards
            .lock()
            .unwrap()
            .contains(scorecard_id)
        {
            return Err(ApiError::Transport("connection reset".into()));
        }
        self.fallback_pages.fetch_add(1, Ordering::SeqCst);
        let matching: Vec<FeedbackItem> = self
            .feedback
            .lock()
            .unwrap()
            .iter()
            .filter(|fb| {
                fb.account_id.as_deref() == Some(account_id)
                    && fb.scorecard_id.as_deref() == Some(scorecard_id)
                    && fb.score_id.as_deref() == Some(score_id)
                    && fb.updated_at.is_some_and(|t| t >= cutoff)
            })
            .cloned()
            .collect();
        Ok(Self::paginate(matching, limit, next_token))
    }

    async fn get_feedback_item(&self, id: &str) -> ApiResult<Option<FeedbackItem>> {
        let found = self
            .feedback
            .lock()
            .unwrap()
            .iter()
            .find(|fb| fb.id == id)
            .cloned();
        Ok(found.map(|fb| self.attach_item(fb)))
    }

    async fn find_feedback_by_cache_key(
        &self,
        cache_key: &str,
    ) -> ApiResult<Option<FeedbackItem>> {
        Ok(self
            .feedback
            .lock()
            .unwrap()
            .iter()
            .find(|fb| fb.cache_key.as_deref() == Some(cache_key))
            .cloned())
    }

    async fn list_feedback_by_composite_key(
        &self,
        account_id: &str,
        scorecard_id: &str,
        score_id: &str,
        cache_key: &str,
        next_token: Option<String>,
    ) -> ApiResult<Page<FeedbackItem>> {
        let matching: Vec<FeedbackItem> = self
            .feedback
            .lock()
            .unwrap()
            .iter()
            .filter(|fb| {
                fb.account_id.as_deref() == Some(account_id)
                    && fb.scorecard_id.as_deref() == Some(scorecard_id)
                    && fb.score_id.as_deref() == Some(score_id)
                    && fb.cache_key.as_deref() == Some(cache_key)
            })
            .cloned()
            .collect();
        Ok(Self::paginate(matching, 25, next_token))
    }

    async fn create_feedback_item(&self, input: FeedbackItemInput) -> ApiResult<FeedbackItem> {
        let now = Utc::now();
        let created = FeedbackItem {
            id: Uuid::new_v4().to_string(),
            account_id: Some(input.account_id),
            scorecard_id: Some(input.scorecard_id),
            score_id: Some(input.score_id),
            cache_key: Some(input.cache_key),
            item_id: input.item_id,
            initial_answer_value: input.initial_answer_value,
            final_answer_value: input.final_answer_value,
            initial_comment_value: input.initial_comment_value,
            final_comment_value: input.final_comment_value,
            edit_comment_value: input.edit_comment_value,
            is_agreement: input.is_agreement,
            edited_at: input.edited_at,
            editor_name: input.editor_name,
            created_at: Some(now),
            updated_at: Some(now),
            item: None,
        };
        self.feedback.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_feedback_item(&self, input: FeedbackItemInput) -> ApiResult<FeedbackItem> {
        let id = input
            .id
            .clone()
            .ok_or_else(|| ApiError::validation("update requires id"))?;
        let mut store = self.feedback.lock().unwrap();
        let record = store
            .iter_mut()
            .find(|fb| fb.id == id)
            .ok_or_else(|| ApiError::not_found(format!("feedback {}", id)))?;

        if input.initial_answer_value.is_some() {
            record.initial_answer_value = input.initial_answer_value;
        }
        if input.final_answer_value.is_some() {
            record.final_answer_value = input.final_answer_value;
        }
        if input.initial_comment_value.is_some() {
            record.initial_comment_value = input.initial_comment_value;
        }
        if input.final_comment_value.is_some() {
            record.final_comment_value = input.final_comment_value;
        }
        if input.edit_comment_value.is_some() {
            record.edit_comment_value = input.edit_comment_value;
        }
        if input.is_agreement.is_some() {
            record.is_agreement = input.is_agreement;
        }
        if input.item_id.is_some() {
            record.item_id = input.item_id;
        }
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }

    async fn query_score_results_page(
        &self,
        scope: &ScoreResultScope,
        window: &TimeWindow,
        limit: usize,
        next_token: Option<String>,
    ) -> ApiResult<Page<ScoreResult>> {
        self.result_pages.fetch_add(1, Ordering::SeqCst);
        let matching: Vec<ScoreResult> = self
            .score_results
            .lock()
            .unwrap()
            .iter()
            .filter(|sr| match scope {
                ScoreResultScope::Score(id) => sr.score_id.as_deref() == Some(id.as_str()),
                ScoreResultScope::Scorecard(id) => {
                    sr.scorecard_id.as_deref() == Some(id.as_str())
                },
                ScoreResultScope::Account(id) => sr.account_id.as_deref() == Some(id.as_str()),
            })
            .filter(|sr| {
                sr.updated_at
                    .is_some_and(|t| t >= window.start && t <= window.end)
            })
            .cloned()
            .collect();
        Ok(Self::paginate(matching, limit, next_token))
    }

    async fn get_item(&self, id: &str) -> ApiResult<Option<Item>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|item| item.id == id)
            .cloned())
    }

    async fn find_item_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> ApiResult<Option<Item>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|item| {
                item.account_id.as_deref() == Some(account_id)
                    && item.external_id.as_deref() == Some(external_id)
            })
            .cloned())
    }

    async fn create_item(&self, input: ItemInput) -> ApiResult<Item> {
        let now = Utc::now();
        let created = Item {
            id: Uuid::new_v4().to_string(),
            account_id: input.account_id,
            evaluation_id: input.evaluation_id,
            external_id: input.external_id,
            description: input.description,
            text: input.text,
            metadata: input.metadata.map(Doc::Text),
            identifiers: input.identifiers.map(Doc::Text),
            is_evaluation: input.is_evaluation,
            created_by_type: input.created_by_type,
            created_at: Some(now),
            updated_at: Some(now),
            ..Default::default()
        };
        self.items.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_item(&self, input: ItemInput) -> ApiResult<Item> {
        let id = input
            .id
            .clone()
            .ok_or_else(|| ApiError::validation("update requires id"))?;
        let mut store = self.items.lock().unwrap();
        let record = store
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| ApiError::not_found(format!("item {}", id)))?;

        if input.description.is_some() {
            record.description = input.description;
        }
        if input.text.is_some() {
            record.text = input.text;
        }
        if let Some(metadata) = input.metadata {
            record.metadata = Some(Doc::Text(metadata));
        }
        if let Some(identifiers) = input.identifiers {
            record.identifiers = Some(Doc::Text(identifiers));
        }
        if input.external_id.is_some() {
            record.external_id = input.external_id;
        }
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }

    async fn find_identifier_by_value(
        &self,
        account_id: &str,
        value: &str,
    ) -> ApiResult<Option<Identifier>> {
        Ok(self
            .identifiers
            .lock()
            .unwrap()
            .iter()
            .find(|ident| {
                ident.account_id.as_deref() == Some(account_id) && ident.value == value
            })
            .cloned())
    }

    async fn create_identifier(&self, input: IdentifierInput) -> ApiResult<Identifier> {
        let created = Identifier {
            id: Some(Uuid::new_v4().to_string()),
            item_id: input.item_id,
            account_id: Some(input.account_id),
            name: input.name,
            value: input.value,
            url: input.url,
            position: Some(input.position),
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        self.identifiers.lock().unwrap().push(created.clone());
        Ok(created)
    }
}

// ========================================
// Fixture builders
// ========================================

/// A fixed timestamp well inside any recent window.
pub fn ts(days_ago: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days_ago)
}

pub fn scorecard_fixture(id: &str, name: &str, scores: Vec<crate::models::Score>) -> Scorecard {
    Scorecard {
        id: id.into(),
        name: Some(name.into()),
        account_id: Some(ACCOUNT.into()),
        external_id: Some(format!("ext-{}", id)),
        sections: Some(Connection {
            items: vec![Section {
                id: format!("{}-sec-1", id),
                scores: Some(Connection { items: scores }),
                ..Default::default()
            }],
        }),
        ..Default::default()
    }
}

pub fn score_fixture(id: &str, name: &str, external_id: &str) -> crate::models::Score {
    crate::models::Score {
        id: id.into(),
        name: Some(name.into()),
        external_id: Some(external_id.into()),
        ..Default::default()
    }
}

pub struct FeedbackFixture<'a> {
    pub id: &'a str,
    pub scorecard_id: &'a str,
    pub score_id: &'a str,
    pub initial: Option<&'a str>,
    pub r#final: Option<&'a str>,
    pub edit_comment: Option<&'a str>,
    pub days_ago: i64,
}

impl Default for FeedbackFixture<'_> {
    fn default() -> Self {
        Self {
            id: "fb-1",
            scorecard_id: "sc-1",
            score_id: "s-1",
            initial: Some("Yes"),
            r#final: Some("Yes"),
            edit_comment: None,
            days_ago: 1,
        }
    }
}

pub fn feedback_fixture(fixture: FeedbackFixture) -> FeedbackItem {
    FeedbackItem {
        id: fixture.id.into(),
        account_id: Some(ACCOUNT.into()),
        scorecard_id: Some(fixture.scorecard_id.into()),
        score_id: Some(fixture.score_id.into()),
        item_id: Some(format!("item-{}", fixture.id)),
        cache_key: Some(format!("{}:{}", fixture.score_id, fixture.id)),
        initial_answer_value: fixture.initial.map(Into::into),
        final_answer_value: fixture.r#final.map(Into::into),
        edit_comment_value: fixture.edit_comment.map(Into::into),
        is_agreement: match (fixture.initial, fixture.r#final) {
            (Some(i), Some(f)) => Some(i == f),
            _ => None,
        },
        created_at: Some(ts(fixture.days_ago)),
        updated_at: Some(ts(fixture.days_ago)),
        ..Default::default()
    }
}

pub fn score_result_fixture(
    id: &str,
    scorecard_id: &str,
    score_id: &str,
    cost_json: Option<serde_json::Value>,
    metadata_json: Option<serde_json::Value>,
) -> ScoreResult {
    ScoreResult {
        id: id.into(),
        account_id: Some(ACCOUNT.into()),
        scorecard_id: Some(scorecard_id.into()),
        score_id: Some(score_id.into()),
        item_id: Some(format!("item-{}", id)),
        cost: cost_json.map(|v| serde_json::from_value(v).unwrap()),
        metadata: metadata_json.map(|v| serde_json::from_value(v).unwrap()),
        updated_at: Some(ts(0)),
        created_at: Some(ts(0)),
        ..Default::default()
    }
}
