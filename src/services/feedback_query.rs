//! Feedback query layer: index-optimized paginated reads with fallback.
//!
//! The primary path drives the composite index keyed by
//! `(accountId, scorecardId, scoreId, updatedAt)` sorted descending. When
//! the index query fails (schema mismatch included), the layer logs a
//! warning and retries with the generic filtered list, which carries no
//! server-side sort guarantee.

use std::sync::Arc;

use super::api::{DataClient, FeedbackIndexQuery, FeedbackItemInput};
use crate::models::FeedbackItem;
use crate::utils::{ApiResult, TimeWindow};

/// Page size for the fallback filtered list.
const FALLBACK_PAGE_SIZE: usize = 1000;

pub struct FeedbackQuery {
    client: Arc<dyn DataClient>,
}

impl FeedbackQuery {
    pub fn new(client: Arc<dyn DataClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn DataClient> {
        &self.client
    }

    /// Fetch all feedback for one (account, scorecard, score) in a window.
    ///
    /// Pagination terminates when the continuation token is absent or
    /// `max_items` is reached.
    pub async fn list_feedback(
        &self,
        account_id: &str,
        scorecard_id: &str,
        score_id: &str,
        window: &TimeWindow,
        page_size: Option<usize>,
        max_items: Option<usize>,
    ) -> ApiResult<Vec<FeedbackItem>> {
        let mut query =
            FeedbackIndexQuery::new(account_id, scorecard_id, score_id, window.clone());
        if let Some(size) = page_size {
            query.page_size = size;
        }

        match self.list_via_index(&query, max_items).await {
            Ok(items) => {
                tracing::info!("Retrieved {} feedback items from index query", items.len());
                Ok(items)
            },
            Err(e) => {
                tracing::warn!("Index query failed, falling back to filtered list: {}", e);
                let items = self
                    .list_via_filter(account_id, scorecard_id, score_id, window, max_items)
                    .await?;
                tracing::info!("Retrieved {} feedback items from fallback query", items.len());
                Ok(items)
            },
        }
    }

    async fn list_via_index(
        &self,
        query: &FeedbackIndexQuery,
        max_items: Option<usize>,
    ) -> ApiResult<Vec<FeedbackItem>> {
        let mut all_items = Vec::new();
        let mut next_token = None;

        loop {
            let page = self.client.query_feedback_page(query, next_token).await?;
            all_items.extend(page.items);
            tracing::debug!("Fetched feedback page (total: {})", all_items.len());

            if let Some(cap) = max_items
                && all_items.len() >= cap
            {
                all_items.truncate(cap);
                break;
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(all_items)
    }

    async fn list_via_filter(
        &self,
        account_id: &str,
        scorecard_id: &str,
        score_id: &str,
        window: &TimeWindow,
        max_items: Option<usize>,
    ) -> ApiResult<Vec<FeedbackItem>> {
        let mut all_items = Vec::new();
        let mut next_token = None;

        loop {
            let page = self
                .client
                .list_feedback_filtered(
                    account_id,
                    scorecard_id,
                    score_id,
                    window.start,
                    FALLBACK_PAGE_SIZE,
                    next_token,
                )
                .await?;
            all_items.extend(page.items);

            if let Some(cap) = max_items
                && all_items.len() >= cap
            {
                all_items.truncate(cap);
                break;
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(all_items)
    }

    /// Fetch specific feedback records by id. Misses and per-record errors
    /// are logged and skipped; the reload path treats them non-fatally.
    pub async fn get_feedback_items_by_ids(&self, ids: &[String]) -> Vec<FeedbackItem> {
        let mut found = Vec::with_capacity(ids.len());
        let mut errors = 0usize;

        for id in ids {
            match self.client.get_feedback_item(id).await {
                Ok(Some(item)) => found.push(item),
                Ok(None) => {
                    tracing::warn!("Feedback item {} not found", id);
                    errors += 1;
                },
                Err(e) => {
                    tracing::error!("Error fetching feedback item {}: {}", id, e);
                    errors += 1;
                },
            }
        }

        tracing::info!("Fetched {} of {} feedback items ({} errors)", found.len(), ids.len(), errors);
        found
    }

    /// Create-or-update a feedback record through the cache-key index.
    ///
    /// Lookup by cache key; update the existing record when found (unset
    /// optional fields are left untouched), create otherwise. Returns the
    /// record and whether it was created.
    pub async fn upsert_by_cache_key(
        &self,
        mut input: FeedbackItemInput,
    ) -> ApiResult<(FeedbackItem, bool)> {
        match self.client.find_feedback_by_cache_key(&input.cache_key).await? {
            Some(existing) => {
                tracing::debug!(
                    "Updating existing feedback item {} for cache key {}",
                    existing.id,
                    input.cache_key
                );
                input.id = Some(existing.id);
                Ok((self.client.update_feedback_item(input).await?, false))
            },
            None => {
                tracing::debug!("Creating feedback item for cache key {}", input.cache_key);
                input.id = None;
                Ok((self.client.create_feedback_item(input).await?, true))
            },
        }
    }

    /// Composite-key lookup: paginate the filtered list for one cache key
    /// and return the winner. More than one record for a composite key
    /// should not happen; when it does, the most recently updated wins and
    /// a warning is logged.
    pub async fn get_by_composite_key(
        &self,
        account_id: &str,
        scorecard_id: &str,
        score_id: &str,
        cache_key: &str,
    ) -> ApiResult<Option<FeedbackItem>> {
        let mut all_items = Vec::new();
        let mut next_token = None;

        loop {
            let page = self
                .client
                .list_feedback_by_composite_key(
                    account_id,
                    scorecard_id,
                    score_id,
                    cache_key,
                    next_token,
                )
                .await?;
            all_items.extend(page.items);
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        if all_items.len() > 1 {
            tracing::warn!(
                "Found {} feedback items with composite key account={}, scorecard={}, score={}, \
                 cache_key={}; using the most recently updated",
                all_items.len(),
                account_id,
                scorecard_id,
                score_id,
                cache_key
            );
            all_items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        }

        Ok(all_items.into_iter().next())
    }
}
