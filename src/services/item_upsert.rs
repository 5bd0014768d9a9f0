//! Item deduplication: upsert-by-identifiers with hierarchical lookup.
//!
//! Multiple upstream processes observe the same real-world artifact; this
//! service prevents duplicate items by resolving structured identifiers
//! against the indexed Identifier rows before creating anything. Lookup
//! order is strictest first: form handle, then report/session handles with
//! relationship validation (two forms under different reports must never
//! merge), then client-specific handles, then external id equality.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::api::{DataClient, IdentifierInput, ItemInput};
use crate::models::Item;
use crate::utils::{ApiResult, StringExt};

pub const KEY_FORM_ID: &str = "formId";
pub const KEY_REPORT_ID: &str = "reportId";
pub const KEY_SESSION_ID: &str = "sessionId";
pub const KEY_CLIENT_ID: &str = "clientId";

/// Handles whose values must agree before two records may share an item.
const CRITICAL_KEYS: [&str; 2] = [KEY_REPORT_ID, KEY_SESSION_ID];

/// One named handle for an item, optionally with a display URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierHandle {
    pub key: String,
    pub value: String,
    pub url: Option<String>,
}

/// An ordered set of identifier handles with canonicalized keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierSet {
    handles: Vec<IdentifierHandle>,
}

impl IdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalize a handle name: `"form ID"`, `"Form"`, and `"formId"`
    /// all map to `formId`; unknown names pass through trimmed.
    pub fn normalize_key(name: &str) -> String {
        let squashed: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match squashed.as_str() {
            "formid" | "form" => KEY_FORM_ID.to_string(),
            "reportid" | "report" => KEY_REPORT_ID.to_string(),
            "sessionid" | "session" => KEY_SESSION_ID.to_string(),
            "clientid" | "client" | "ccid" => KEY_CLIENT_ID.to_string(),
            _ => name.trim().to_string(),
        }
    }

    /// Display name used for Identifier rows and dataset ID documents.
    pub fn display_name(key: &str) -> &str {
        match key {
            KEY_FORM_ID => "Form",
            KEY_REPORT_ID => "Report",
            KEY_SESSION_ID => "Session",
            KEY_CLIENT_ID => "Client ID",
            other => other,
        }
    }

    /// Legacy on-item entry name for a canonical key.
    fn legacy_name(key: &str) -> &str {
        match key {
            KEY_FORM_ID => "form ID",
            KEY_REPORT_ID => "report ID",
            KEY_SESSION_ID => "session ID",
            KEY_CLIENT_ID => "client ID",
            other => other,
        }
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.insert_with_url(key, value, None);
    }

    pub fn insert_with_url(&mut self, key: &str, value: impl Into<String>, url: Option<String>) {
        let key = Self::normalize_key(key);
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        // Last write wins for a repeated key
        self.handles.retain(|h| h.key != key);
        self.handles.push(IdentifierHandle { key, value, url });
    }

    pub fn from_handles(handles: Vec<IdentifierHandle>) -> Self {
        let mut set = Self::new();
        for handle in handles {
            set.insert_with_url(&handle.key, handle.value, handle.url);
        }
        set
    }

    pub fn get(&self, key: &str) -> Option<&IdentifierHandle> {
        self.handles.iter().find(|h| h.key == key)
    }

    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.get(key).map(|h| h.value.as_str())
    }

    pub fn form_id(&self) -> Option<&str> {
        self.value_of(KEY_FORM_ID)
    }

    pub fn report_id(&self) -> Option<&str> {
        self.value_of(KEY_REPORT_ID)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.value_of(KEY_SESSION_ID)
    }

    pub fn client_id(&self) -> Option<&str> {
        self.value_of(KEY_CLIENT_ID)
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handles in canonical order: form, report, session, client, then
    /// anything else in insertion order.
    pub fn ordered(&self) -> Vec<&IdentifierHandle> {
        let rank = |key: &str| match key {
            KEY_FORM_ID => 0,
            KEY_REPORT_ID => 1,
            KEY_SESSION_ID => 2,
            KEY_CLIENT_ID => 3,
            _ => 4,
        };
        let mut ordered: Vec<&IdentifierHandle> = self.handles.iter().collect();
        ordered.sort_by_key(|h| rank(&h.key));
        ordered
    }

    /// Serialize to the legacy on-item identifier list
    /// (`[{name, id, url?}, ...]`) kept for backward compatibility.
    pub fn to_legacy_json(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let entries: Vec<Value> = self
            .ordered()
            .iter()
            .map(|handle| {
                let mut entry = json!({
                    "name": Self::legacy_name(&handle.key),
                    "id": handle.value,
                });
                if let Some(url) = &handle.url {
                    entry["url"] = json!(url);
                }
                entry
            })
            .collect();
        serde_json::to_string(&entries).ok()
    }
}

/// Result of one upsert. Errors are carried in-band so callers can treat
/// them non-fatally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub item_id: Option<String>,
    pub was_created: bool,
    pub error: Option<String>,
}

/// Parameters for one item upsert.
#[derive(Debug, Clone, Default)]
pub struct ItemUpsertRequest {
    pub account_id: String,
    pub identifiers: IdentifierSet,
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub text: Option<String>,
    pub metadata: Option<Map<String, Value>>,
    pub evaluation_id: Option<String>,
    pub is_evaluation: bool,
}

pub struct ItemUpserter {
    client: Arc<dyn DataClient>,
}

impl ItemUpserter {
    pub fn new(client: Arc<dyn DataClient>) -> Self {
        Self { client }
    }

    /// Upsert an item by structured identifiers. Never panics or errors out;
    /// failures surface through the outcome's `error` field.
    pub async fn upsert_by_identifiers(&self, request: &ItemUpsertRequest) -> UpsertOutcome {
        if request.account_id.trim().is_empty() {
            return UpsertOutcome {
                item_id: None,
                was_created: false,
                error: Some("Missing required account_id parameter".to_string()),
            };
        }

        match self.upsert_inner(request).await {
            Ok(outcome) => outcome,
            Err(e) => UpsertOutcome {
                item_id: None,
                was_created: false,
                error: Some(format!("Exception during item upsert: {}", e)),
            },
        }
    }

    async fn upsert_inner(&self, request: &ItemUpsertRequest) -> ApiResult<UpsertOutcome> {
        let mut existing = self
            .lookup_by_identifiers(&request.account_id, &request.identifiers)
            .await?;

        if existing.is_none()
            && let Some(external_id) = request.external_id.clean()
        {
            tracing::debug!("Identifier lookup missed, trying externalId {}", external_id);
            existing = self
                .client
                .find_item_by_external_id(&request.account_id, &external_id)
                .await?;
        }

        match existing {
            Some(item) => {
                let updated = self.update_item(&item, request).await?;
                Ok(UpsertOutcome { item_id: Some(updated.id), was_created: false, error: None })
            },
            None => {
                let created = self.create_item(request).await?;
                self.create_identifier_records(&created.id, &request.account_id, &request.identifiers)
                    .await;
                Ok(UpsertOutcome { item_id: Some(created.id), was_created: true, error: None })
            },
        }
    }

    /// Hierarchical identifier lookup, strictest handle first. Candidates
    /// reached through any indexed handle must pass relationship validation
    /// so a record from one report never absorbs another report's forms.
    async fn lookup_by_identifiers(
        &self,
        account_id: &str,
        identifiers: &IdentifierSet,
    ) -> ApiResult<Option<Item>> {
        if identifiers.is_empty() {
            return Ok(None);
        }

        if let Some(form_id) = identifiers.form_id() {
            tracing::debug!("Primary lookup by form handle: {}", form_id);
            if let Some(item) = self.item_for_identifier_value(account_id, form_id).await? {
                if validate_relationship(&item, identifiers) {
                    return Ok(Some(item));
                }
                tracing::warn!(
                    "Item {} matched form handle {} but failed relationship validation; rejecting candidate",
                    item.id,
                    form_id
                );
            }
        }

        // Report-level lookup: one report may span multiple forms that
        // should share an item. Report handles are preferred over session
        // handles.
        let report_level: Vec<&str> = [identifiers.report_id(), identifiers.session_id()]
            .into_iter()
            .flatten()
            .collect();
        for value in report_level {
            tracing::debug!("Report-level lookup for handle value: {}", value);
            if let Some(item) = self.item_for_identifier_value(account_id, value).await? {
                if validate_relationship(&item, identifiers) {
                    return Ok(Some(item));
                }
                tracing::warn!(
                    "Item {} failed relationship validation for handle {}; possible cross-contamination",
                    item.id,
                    value
                );
            }
        }

        if let Some(client_id) = identifiers.client_id() {
            tracing::debug!("Fallback lookup by client handle: {}", client_id);
            if let Some(item) = self.item_for_identifier_value(account_id, client_id).await? {
                return Ok(Some(item));
            }
        }

        Ok(None)
    }

    async fn item_for_identifier_value(
        &self,
        account_id: &str,
        value: &str,
    ) -> ApiResult<Option<Item>> {
        let Some(identifier) = self
            .client
            .find_identifier_by_value(account_id, value)
            .await?
        else {
            return Ok(None);
        };
        if identifier.item_id.trim().is_empty() {
            return Ok(None);
        }
        self.client.get_item(&identifier.item_id).await
    }

    async fn update_item(&self, existing: &Item, request: &ItemUpsertRequest) -> ApiResult<Item> {
        tracing::debug!("Updating existing item {}", existing.id);
        let input = ItemInput {
            id: Some(existing.id.clone()),
            description: request.description.clone(),
            text: request.text.clone(),
            metadata: match &request.metadata {
                Some(map) => Some(serde_json::to_string(map)?),
                None => None,
            },
            external_id: request.external_id.clone(),
            identifiers: request.identifiers.to_legacy_json(),
            ..Default::default()
        };
        self.client.update_item(input).await
    }

    async fn create_item(&self, request: &ItemUpsertRequest) -> ApiResult<Item> {
        tracing::debug!("Creating new item for account {}", request.account_id);
        let evaluation_id = request.evaluation_id.clone().unwrap_or_else(|| {
            if request.is_evaluation {
                String::new()
            } else {
                "prediction-default".to_string()
            }
        });
        let input = ItemInput {
            account_id: Some(request.account_id.clone()),
            evaluation_id: Some(evaluation_id),
            external_id: request.external_id.clone(),
            description: request.description.clone(),
            text: request.text.clone(),
            metadata: match &request.metadata {
                Some(map) => Some(serde_json::to_string(map)?),
                None => None,
            },
            identifiers: request.identifiers.to_legacy_json(),
            is_evaluation: Some(request.is_evaluation),
            created_by_type: Some(
                if request.is_evaluation { "evaluation" } else { "prediction" }.to_string(),
            ),
            ..Default::default()
        };
        self.client.create_item(input).await
    }

    /// Materialize one Identifier row per handle with an ordered position.
    /// Creation failures (including concurrent-create duplicates) are soft:
    /// logged and skipped.
    async fn create_identifier_records(
        &self,
        item_id: &str,
        account_id: &str,
        identifiers: &IdentifierSet,
    ) {
        let mut position = 1;
        for handle in identifiers.ordered() {
            let input = IdentifierInput {
                item_id: item_id.to_string(),
                account_id: account_id.to_string(),
                name: IdentifierSet::display_name(&handle.key).to_string(),
                value: handle.value.clone(),
                url: handle.url.clone(),
                position,
            };
            match self.client.create_identifier(input).await {
                Ok(_) => {
                    tracing::debug!(
                        "Created {} identifier '{}' for item {}",
                        IdentifierSet::display_name(&handle.key),
                        handle.value,
                        item_id
                    );
                },
                Err(e) => {
                    tracing::warn!(
                        "Failed to create identifier '{}' for item {}: {}",
                        handle.value,
                        item_id,
                        e
                    );
                },
            }
            position += 1;
        }
    }
}

/// Check whether an item may accept these identifiers: every critical
/// handle (report, session) present on both sides must match exactly.
pub fn validate_relationship(item: &Item, incoming: &IdentifierSet) -> bool {
    let mut existing = IdentifierSet::new();
    for entry in item.legacy_identifiers() {
        if let Some(value) = entry.effective_value() {
            existing.insert_with_url(&entry.name, value, entry.url.clone());
        }
    }

    for key in CRITICAL_KEYS {
        if let (Some(existing_value), Some(new_value)) =
            (existing.value_of(key), incoming.value_of(key))
            && existing_value != new_value
        {
            tracing::warn!(
                "Relationship mismatch on {}: existing={}, new={}",
                key,
                existing_value,
                new_value
            );
            return false;
        }
    }
    true
}
