//! Dataset construction: stratified sampling of feedback into a Frame.
//!
//! Three modes share one row schema: normal (retrieve, then confusion-cell
//! sampling), single-item (one feedback record by id, identity-checked), and
//! reload (refresh value columns for an existing row set by stable feedback
//! ids while preserving rows and identifiers).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use super::api::DataClient;
use super::feedback_finder::{FeedbackFinder, FindRequest};
use super::item_upsert::{IdentifierHandle, IdentifierSet, ItemUpserter, ItemUpsertRequest};
use super::sampler;
use crate::models::{COL_FEEDBACK_ITEM_ID, COL_METADATA, FeedbackItem, Frame, Item, dataset_columns};
use crate::utils::{ApiError, ApiResult, TimeWindow};

/// Client-specific identifier extraction seam. Implementations derive named
/// handles (form/report/session ids and the like) from a feedback record
/// and its item; the builder upserts the item under those handles and puts
/// them first in the row's `IDs` document.
pub trait IdentifierExtractor: Send + Sync {
    fn extract(&self, feedback: &FeedbackItem, item: &Item) -> Vec<IdentifierHandle>;
}

/// Parameters for one dataset build.
#[derive(Debug, Clone)]
pub struct DatasetRequest {
    pub account_id: String,
    pub scorecard_id: String,
    pub score_id: String,
    pub score_name: String,
    pub window: TimeWindow,
    pub limit: Option<usize>,
    pub limit_per_cell: Option<usize>,
    pub initial_value: Option<String>,
    pub final_value: Option<String>,
    /// Restrict the dataset to one specific feedback record
    pub feedback_id: Option<String>,
    /// Score-name to output-column renames
    pub column_mappings: BTreeMap<String, String>,
}

impl DatasetRequest {
    /// The output column name for the score, after mappings.
    pub fn score_column(&self) -> String {
        self.column_mappings
            .get(&self.score_name)
            .cloned()
            .unwrap_or_else(|| self.score_name.clone())
    }
}

pub struct DatasetBuilder {
    client: Arc<dyn DataClient>,
    finder: FeedbackFinder,
    upserter: ItemUpserter,
    extractor: Option<Arc<dyn IdentifierExtractor>>,
}

impl DatasetBuilder {
    pub fn new(client: Arc<dyn DataClient>) -> Self {
        Self {
            finder: FeedbackFinder::new(Arc::clone(&client)),
            upserter: ItemUpserter::new(Arc::clone(&client)),
            client,
            extractor: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn IdentifierExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build a dataset frame. An empty result still carries the full column
    /// list.
    pub async fn build(&self, request: &DatasetRequest) -> ApiResult<Frame> {
        let sampled = if let Some(feedback_id) = &request.feedback_id {
            self.fetch_single(request, feedback_id).await?
        } else {
            let mut find = FindRequest::new(
                &request.account_id,
                &request.scorecard_id,
                &request.score_id,
                request.window.clone(),
            );
            find.initial_value = request.initial_value.clone();
            find.final_value = request.final_value.clone();
            // Limits are applied by the sampler, not at retrieval
            let items = self.finder.find(&find).await?;
            if items.is_empty() {
                tracing::warn!("No feedback items found for dataset");
                return Ok(Frame::new(dataset_columns(&request.score_column())));
            }
            tracing::info!("Found {} feedback items", items.len());
            let sampled =
                sampler::sample_confusion_cells(items, request.limit_per_cell, request.limit);
            tracing::info!("Sampled {} items from confusion matrix", sampled.len());
            sampled
        };

        let score_column = request.score_column();
        if score_column != request.score_name {
            tracing::info!(
                "Column mapping applied: '{}' -> '{}'",
                request.score_name,
                score_column
            );
        }

        let mut frame = Frame::new(dataset_columns(&score_column));
        for feedback in &sampled {
            let row = self.build_row(request, feedback).await?;
            frame.push_row(row)?;
        }

        tracing::info!(
            "Created dataset with {} rows and {} columns",
            frame.len(),
            frame.columns.len()
        );
        Ok(frame)
    }

    /// Refresh value columns of an existing frame by re-reading each row's
    /// feedback record. The row set, order, and identifier columns are
    /// preserved; rows whose record disappeared keep their prior values.
    pub async fn reload(&self, request: &DatasetRequest, mut frame: Frame) -> ApiResult<Frame> {
        let ids = frame.column_values(COL_FEEDBACK_ITEM_ID);
        if ids.is_empty() {
            tracing::warn!("Reload requested for a frame without feedback ids");
            return Ok(frame);
        }
        tracing::info!("Reloading values for {} dataset rows", ids.len());

        let fetched = self.finder.query().get_feedback_items_by_ids(&ids).await;
        let by_id = crate::utils::vec_to_map(fetched, |fb| fb.id.clone());

        let score_column = request.score_column();
        let comment_column = format!("{} comment", score_column);
        let edit_comment_column = format!("{} edit comment", score_column);

        let mut updated = 0usize;
        for (row_index, feedback_id) in ids.iter().enumerate() {
            let Some(feedback) = by_id.get(feedback_id) else {
                tracing::warn!(
                    "Feedback item {} not found during reload, keeping existing values",
                    feedback_id
                );
                continue;
            };

            frame.set_cell(
                row_index,
                &score_column,
                feedback
                    .final_answer_value
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            )?;
            frame.set_cell(
                row_index,
                &comment_column,
                Value::String(determine_score_comment(feedback)),
            )?;
            frame.set_cell(
                row_index,
                &edit_comment_column,
                Value::String(feedback.edit_comment_value.clone().unwrap_or_default()),
            )?;

            let item = self.ensure_item(feedback).await;
            frame.set_cell(
                row_index,
                COL_METADATA,
                Value::String(metadata_document(feedback, item.as_ref())),
            )?;
            updated += 1;
        }

        tracing::info!("Updated {} of {} rows", updated, ids.len());
        Ok(frame)
    }

    async fn fetch_single(
        &self,
        request: &DatasetRequest,
        feedback_id: &str,
    ) -> ApiResult<Vec<FeedbackItem>> {
        tracing::info!("Fetching specific feedback item: {}", feedback_id);
        let feedback = self
            .client
            .get_feedback_item(feedback_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Feedback item not found: {}", feedback_id)))?;

        let scorecard_ok = feedback.scorecard_id.as_deref() == Some(request.scorecard_id.as_str());
        let score_ok = feedback.score_id.as_deref() == Some(request.score_id.as_str());
        if !scorecard_ok || !score_ok {
            return Err(ApiError::validation(format!(
                "Feedback item {} belongs to scorecard {:?}/score {:?}, expected scorecard {}/score {}",
                feedback_id,
                feedback.scorecard_id,
                feedback.score_id,
                request.scorecard_id,
                request.score_id
            )));
        }
        Ok(vec![feedback])
    }

    async fn build_row(
        &self,
        request: &DatasetRequest,
        feedback: &FeedbackItem,
    ) -> ApiResult<Vec<Value>> {
        let item = self.ensure_item(feedback).await;

        let ids_json = self.ids_document(request, feedback, item.as_ref()).await;
        let metadata_json = metadata_document(feedback, item.as_ref());

        let text = item
            .as_ref()
            .and_then(|i| i.text.clone())
            .unwrap_or_default();

        let call_date = serde_json::from_str::<Value>(&metadata_json)
            .ok()
            .and_then(|doc| doc.get("call_date").cloned())
            .filter(|v| !v.is_null())
            .unwrap_or(Value::Null);

        Ok(vec![
            feedback
                .item_id
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
            Value::String(feedback.id.clone()),
            Value::String(ids_json),
            Value::String(metadata_json),
            Value::String(text),
            call_date,
            feedback
                .final_answer_value
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
            Value::String(determine_score_comment(feedback)),
            Value::String(feedback.edit_comment_value.clone().unwrap_or_default()),
        ])
    }

    /// The nested item usually rides along with the feedback record; fetch
    /// it only when missing or when its text was not included.
    async fn ensure_item(&self, feedback: &FeedbackItem) -> Option<Item> {
        if let Some(item) = &feedback.item
            && item.text.is_some()
        {
            return Some(item.clone());
        }
        let item_id = feedback
            .item
            .as_ref()
            .map(|i| i.id.clone())
            .or_else(|| feedback.item_id.clone())?;
        match self.client.get_item(&item_id).await {
            Ok(found) => found.or_else(|| feedback.item.clone()),
            Err(e) => {
                tracing::warn!("Failed to load item {}: {}", item_id, e);
                feedback.item.clone()
            },
        }
    }

    /// Build the `IDs` cell: extractor-derived handles first (upserting the
    /// item under them), then the external id, then legacy on-item entries,
    /// then the item id as a final fallback handle.
    async fn ids_document(
        &self,
        request: &DatasetRequest,
        feedback: &FeedbackItem,
        item: Option<&Item>,
    ) -> String {
        let mut entries: Vec<Value> = Vec::new();
        let Some(item) = item else {
            return serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string());
        };

        if let Some(extractor) = &self.extractor {
            let handles = extractor.extract(feedback, item);
            if !handles.is_empty() {
                for handle in &handles {
                    let mut entry = json!({
                        "name": IdentifierSet::display_name(
                            &IdentifierSet::normalize_key(&handle.key)
                        ),
                        "value": handle.value,
                    });
                    if let Some(url) = &handle.url {
                        entry["url"] = json!(url);
                    }
                    entries.push(entry);
                }

                let identifiers = IdentifierSet::from_handles(handles);
                if !identifiers.is_empty() {
                    let upsert = ItemUpsertRequest {
                        account_id: feedback
                            .account_id
                            .clone()
                            .unwrap_or_else(|| request.account_id.clone()),
                        identifiers,
                        external_id: item.external_id.clone().or_else(|| Some(item.id.clone())),
                        text: item.text.clone(),
                        metadata: item.metadata.as_ref().and_then(|d| d.to_object()),
                        ..Default::default()
                    };
                    let outcome = self.upserter.upsert_by_identifiers(&upsert).await;
                    match outcome.error {
                        Some(error) => {
                            tracing::warn!("Error upserting item with identifiers: {}", error)
                        },
                        None => tracing::debug!(
                            "Upserted item {:?} (was_created: {})",
                            outcome.item_id,
                            outcome.was_created
                        ),
                    }
                }
            }
        }

        if let Some(external_id) = &item.external_id {
            entries.push(json!({
                "name": "External ID",
                "value": external_id,
                "url": Value::Null,
            }));
        }

        for legacy in item.legacy_identifiers() {
            if let Some(value) = legacy.effective_value() {
                entries.push(json!({
                    "name": legacy.name,
                    "value": value,
                    "url": legacy.url,
                }));
            }
        }

        entries.push(json!({
            "name": "Item ID",
            "value": item.id,
            "url": Value::Null,
        }));

        serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
    }
}

fn iso(value: &Option<DateTime<Utc>>) -> Value {
    match value {
        Some(dt) => Value::String(dt.to_rfc3339()),
        None => Value::Null,
    }
}

/// Build the metadata cell: feedback scalar fields, an `item` sub-document,
/// and the item's own metadata merged in at the top level (with a JSON-text
/// `other_data` field parsed into a document when possible).
pub fn metadata_document(feedback: &FeedbackItem, item: Option<&Item>) -> String {
    let mut metadata = Map::new();
    metadata.insert("feedback_item_id".into(), json!(feedback.id));
    metadata.insert("scorecard_id".into(), json!(feedback.scorecard_id));
    metadata.insert("score_id".into(), json!(feedback.score_id));
    metadata.insert("account_id".into(), json!(feedback.account_id));
    metadata.insert("created_at".into(), iso(&feedback.created_at));
    metadata.insert("updated_at".into(), iso(&feedback.updated_at));
    metadata.insert("edited_at".into(), iso(&feedback.edited_at));
    metadata.insert("editor_name".into(), json!(feedback.editor_name));
    metadata.insert("is_agreement".into(), json!(feedback.is_agreement));
    metadata.insert("cache_key".into(), json!(feedback.cache_key));
    metadata.insert("initial_answer_value".into(), json!(feedback.initial_answer_value));
    metadata.insert("initial_comment_value".into(), json!(feedback.initial_comment_value));

    if let Some(item) = item {
        metadata.insert(
            "item".into(),
            json!({
                "item_id": item.id,
                "external_id": item.external_id,
                "item_created_at": iso(&item.created_at),
                "item_updated_at": iso(&item.updated_at),
                "item_metadata": item.metadata.as_ref().map(|d| d.to_value()),
            }),
        );

        if let Some(item_meta) = item.metadata.as_ref().and_then(|d| d.to_object()) {
            for (key, value) in item_meta {
                metadata.insert(key, value);
            }
        }
    }

    if let Some(Value::String(raw)) = metadata.get("other_data").cloned()
        && let Ok(parsed @ Value::Object(_)) = serde_json::from_str::<Value>(&raw)
    {
        metadata.insert("other_data".into(), parsed);
    }

    serde_json::to_string(&metadata).unwrap_or_else(|_| "{}".to_string())
}

/// Choose the dataset comment for a row. Comparisons are case-insensitive
/// on trimmed strings:
/// 1. edit comment is "agree" with no final comment -> initial comment
/// 2. final comment is "agree" -> initial comment
/// 3. a meaningful edit comment wins over the final comment
/// 4. then a meaningful final comment
/// 5. then the initial comment
pub fn determine_score_comment(feedback: &FeedbackItem) -> String {
    let edit = feedback.edit_comment_value.clone().unwrap_or_default();
    let r#final = feedback.final_comment_value.clone().unwrap_or_default();
    let initial = feedback.initial_comment_value.clone().unwrap_or_default();

    let edit_lower = edit.trim().to_lowercase();
    let final_lower = r#final.trim().to_lowercase();

    if edit_lower == "agree" && r#final.is_empty() {
        return initial;
    }
    if final_lower == "agree" {
        return initial;
    }
    if !edit.is_empty() && edit_lower != "agree" {
        return edit;
    }
    if !r#final.is_empty() && final_lower != "agree" {
        return r#final;
    }
    initial
}
