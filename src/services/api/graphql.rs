// GraphQL Data Client
// Purpose: Implement the DataClient trait against the remote GraphQL endpoint

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::{
    DataClient, FeedbackIndexQuery, FeedbackItemInput, IdentifierInput, ItemInput, Page,
    ScoreResultScope,
};
use crate::models::{FeedbackItem, Identifier, Item, ScoreResult, Scorecard};
use crate::utils::{ApiError, ApiResult, TimeWindow};

const FEEDBACK_FIELDS: &str = "id accountId scorecardId scoreId itemId cacheKey \
     initialAnswerValue finalAnswerValue initialCommentValue finalCommentValue \
     editCommentValue editedAt editorName isAgreement createdAt updatedAt";

const FEEDBACK_ITEM_RELATION: &str =
    "item { id externalId description text metadata identifiers createdAt updatedAt }";

const SCORE_RESULT_FIELDS: &str = "id value itemId accountId scorecardId scoreId code type \
     createdAt updatedAt score { id name } cost metadata";

const ITEM_FIELDS: &str = "id externalId description text accountId evaluationId scoreId \
     updatedAt createdAt isEvaluation createdByType identifiers metadata attachedFiles";

const SCORECARD_SECTIONS: &str = "sections { items { id name order \
     scores { items { id name key externalId order championVersionId } } } }";

pub struct GraphQlClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GraphQlClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build HTTP client for data API: {}", e);
                reqwest::Client::default()
            });

        Self { http_client, endpoint: endpoint.into(), api_key: api_key.into() }
    }

    /// Execute one GraphQL operation and return the `data` object.
    ///
    /// A top-level `errors` list fails the call: schema-shaped messages map
    /// to `SchemaMismatch` (recoverable by the query layer), everything else
    /// to `Remote`.
    async fn execute(&self, query: &str, variables: Value) -> ApiResult<Value> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Transport(format!("HTTP {}: {}", status, error_text)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Remote(format!("invalid response body: {}", e)))?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            let message = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join("; ");
            if is_schema_error(&message) {
                return Err(ApiError::SchemaMismatch(message));
            }
            return Err(ApiError::Remote(message));
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    /// Decode the list payload under `key` into a page, skipping rows that
    /// fail to deserialize rather than failing the whole page.
    fn decode_page<T: DeserializeOwned>(data: &Value, key: &str) -> Page<T> {
        let list = data.get(key).cloned().unwrap_or(Value::Null);
        let next_token = list
            .get("nextToken")
            .and_then(Value::as_str)
            .map(str::to_string);
        let raw_items = match list.get("items") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        let mut items = Vec::with_capacity(raw_items.len());
        for row in raw_items {
            match serde_json::from_value::<T>(row) {
                Ok(value) => items.push(value),
                Err(e) => {
                    tracing::warn!("Failed to deserialize '{}' row: {}", key, e);
                },
            }
        }

        Page { items, next_token }
    }

    fn decode_record<T: DeserializeOwned>(data: &Value, key: &str) -> ApiResult<Option<T>> {
        match data.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(record) => Ok(Some(serde_json::from_value(record.clone())?)),
        }
    }

    async fn list_scorecards_filtered(
        &self,
        filter: Value,
    ) -> ApiResult<Vec<Scorecard>> {
        let query = "query ListScorecards($filter: ModelScorecardFilterInput, $limit: Int) {
            listScorecards(filter: $filter, limit: $limit) {
                items { id name key externalId accountId createdAt updatedAt }
                nextToken
            }
        }";
        let data = self
            .execute(query, json!({ "filter": filter, "limit": 1000 }))
            .await?;
        Ok(Self::decode_page::<Scorecard>(&data, "listScorecards").items)
    }
}

fn is_schema_error(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("fieldundefined")
        || lowered.contains("unknown field")
        || lowered.contains("unknown type")
        || lowered.contains("cannot query field")
        || lowered.contains("validation error of type")
}

#[async_trait]
impl DataClient for GraphQlClient {
    async fn get_scorecard(&self, id: &str) -> ApiResult<Option<Scorecard>> {
        let query = format!(
            "query GetScorecard($id: ID!) {{
                getScorecard(id: $id) {{
                    id name key externalId accountId {}
                }}
            }}",
            SCORECARD_SECTIONS
        );
        let data = self.execute(&query, json!({ "id": id })).await?;
        Self::decode_record(&data, "getScorecard")
    }

    async fn get_scorecard_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> ApiResult<Option<Scorecard>> {
        let found = self
            .list_scorecards_filtered(json!({
                "accountId": { "eq": account_id },
                "externalId": { "eq": external_id },
            }))
            .await?;
        match found.into_iter().next() {
            // Re-fetch by id so sections come along
            Some(scorecard) => self.get_scorecard(&scorecard.id).await,
            None => Ok(None),
        }
    }

    async fn get_scorecard_by_key(
        &self,
        account_id: &str,
        key: &str,
    ) -> ApiResult<Option<Scorecard>> {
        let found = self
            .list_scorecards_filtered(json!({
                "accountId": { "eq": account_id },
                "key": { "eq": key },
            }))
            .await?;
        match found.into_iter().next() {
            Some(scorecard) => self.get_scorecard(&scorecard.id).await,
            None => Ok(None),
        }
    }

    async fn list_scorecards(&self, account_id: &str) -> ApiResult<Vec<Scorecard>> {
        self.list_scorecards_filtered(json!({ "accountId": { "eq": account_id } }))
            .await
    }

    async fn query_feedback_page(
        &self,
        query: &FeedbackIndexQuery,
        next_token: Option<String>,
    ) -> ApiResult<Page<FeedbackItem>> {
        let item_relation = if query.with_item { FEEDBACK_ITEM_RELATION } else { "" };
        let gql = format!(
            "query ListFeedbackItemsByIndex(
                $accountId: String!,
                $compositeSortKey: ModelFeedbackItemByAccountScorecardScoreUpdatedAtCompositeKeyConditionInput,
                $limit: Int,
                $nextToken: String,
                $sortDirection: ModelSortDirection
            ) {{
                listFeedbackItemByAccountIdAndScorecardIdAndScoreIdAndUpdatedAt(
                    accountId: $accountId,
                    scorecardIdScoreIdUpdatedAt: $compositeSortKey,
                    limit: $limit,
                    nextToken: $nextToken,
                    sortDirection: $sortDirection
                ) {{
                    items {{ {} {} }}
                    nextToken
                }}
            }}",
            FEEDBACK_FIELDS, item_relation
        );

        let (start, end) = query.window.to_rfc3339();
        let variables = json!({
            "accountId": query.account_id,
            "compositeSortKey": {
                "between": [
                    {
                        "scorecardId": query.scorecard_id,
                        "scoreId": query.score_id,
                        "updatedAt": start,
                    },
                    {
                        "scorecardId": query.scorecard_id,
                        "scoreId": query.score_id,
                        "updatedAt": end,
                    }
                ]
            },
            "limit": query.page_size,
            "nextToken": next_token,
            "sortDirection": "DESC",
        });

        let data = self.execute(&gql, variables).await?;
        Ok(Self::decode_page(
            &data,
            "listFeedbackItemByAccountIdAndScorecardIdAndScoreIdAndUpdatedAt",
        ))
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
        let gql = format!(
            "query ListFeedbackItems(
                $filter: ModelFeedbackItemFilterInput,
                $limit: Int,
                $nextToken: String
            ) {{
                listFeedbackItems(filter: $filter, limit: $limit, nextToken: $nextToken) {{
                    items {{ {} }}
                    nextToken
                }}
            }}",
            FEEDBACK_FIELDS
        );

        let variables = json!({
            "filter": {
                "and": [
                    { "accountId": { "eq": account_id } },
                    { "scorecardId": { "eq": scorecard_id } },
                    { "scoreId": { "eq": score_id } },
                    { "updatedAt": { "ge": cutoff.to_rfc3339() } },
                ]
            },
            "limit": limit,
            "nextToken": next_token,
        });

        let data = self.execute(&gql, variables).await?;
        Ok(Self::decode_page(&data, "listFeedbackItems"))
    }

    async fn get_feedback_item(&self, id: &str) -> ApiResult<Option<FeedbackItem>> {
        let gql = format!(
            "query GetFeedbackItem($id: ID!) {{
                getFeedbackItem(id: $id) {{ {} {} }}
            }}",
            FEEDBACK_FIELDS, FEEDBACK_ITEM_RELATION
        );
        let data = self.execute(&gql, json!({ "id": id })).await?;
        Self::decode_record(&data, "getFeedbackItem")
    }

    async fn find_feedback_by_cache_key(
        &self,
        cache_key: &str,
    ) -> ApiResult<Option<FeedbackItem>> {
        let gql = format!(
            "query GetFeedbackItemByCacheKey($cacheKey: String!, $limit: Int) {{
                listFeedbackItemByCacheKey(cacheKey: $cacheKey, limit: $limit) {{
                    items {{ {} }}
                    nextToken
                }}
            }}",
            FEEDBACK_FIELDS
        );
        let data = self
            .execute(&gql, json!({ "cacheKey": cache_key, "limit": 1 }))
            .await?;
        let page: Page<FeedbackItem> = Self::decode_page(&data, "listFeedbackItemByCacheKey");
        Ok(page.items.into_iter().next())
    }

    async fn list_feedback_by_composite_key(
        &self,
        account_id: &str,
        scorecard_id: &str,
        score_id: &str,
        cache_key: &str,
        next_token: Option<String>,
    ) -> ApiResult<Page<FeedbackItem>> {
        let gql = format!(
            "query GetFeedbackItemByCompositeKey(
                $filter: ModelFeedbackItemFilterInput!,
                $limit: Int,
                $nextToken: String
            ) {{
                listFeedbackItems(filter: $filter, limit: $limit, nextToken: $nextToken) {{
                    items {{ {} }}
                    nextToken
                }}
            }}",
            FEEDBACK_FIELDS
        );
        let variables = json!({
            "filter": {
                "and": [
                    { "accountId": { "eq": account_id } },
                    { "scorecardId": { "eq": scorecard_id } },
                    { "scoreId": { "eq": score_id } },
                    { "cacheKey": { "eq": cache_key } },
                ]
            },
            "limit": 25,
            "nextToken": next_token,
        });
        let data = self.execute(&gql, variables).await?;
        Ok(Self::decode_page(&data, "listFeedbackItems"))
    }

    async fn create_feedback_item(&self, input: FeedbackItemInput) -> ApiResult<FeedbackItem> {
        let gql = format!(
            "mutation CreateFeedbackItem($input: CreateFeedbackItemInput!) {{
                createFeedbackItem(input: $input) {{ {} }}
            }}",
            FEEDBACK_FIELDS
        );
        let data = self
            .execute(&gql, json!({ "input": serde_json::to_value(&input)? }))
            .await?;
        Self::decode_record(&data, "createFeedbackItem")?
            .ok_or_else(|| ApiError::Remote("createFeedbackItem returned no record".into()))
    }

    async fn update_feedback_item(&self, input: FeedbackItemInput) -> ApiResult<FeedbackItem> {
        let gql = format!(
            "mutation UpdateFeedbackItem($input: UpdateFeedbackItemInput!) {{
                updateFeedbackItem(input: $input) {{ {} }}
            }}",
            FEEDBACK_FIELDS
        );
        let data = self
            .execute(&gql, json!({ "input": serde_json::to_value(&input)? }))
            .await?;
        Self::decode_record(&data, "updateFeedbackItem")?
            .ok_or_else(|| ApiError::Remote("updateFeedbackItem returned no record".into()))
    }

    async fn query_score_results_page(
        &self,
        scope: &ScoreResultScope,
        window: &TimeWindow,
        limit: usize,
        next_token: Option<String>,
    ) -> ApiResult<Page<ScoreResult>> {
        // Narrowest available index for the scope
        let (query_name, key_field, key_value) = match scope {
            ScoreResultScope::Score(id) => {
                ("listScoreResultByScoreIdAndUpdatedAt", "scoreId", id.clone())
            },
            ScoreResultScope::Scorecard(id) => {
                ("listScoreResultByScorecardIdAndUpdatedAt", "scorecardId", id.clone())
            },
            ScoreResultScope::Account(id) => {
                ("listScoreResultByAccountIdAndUpdatedAt", "accountId", id.clone())
            },
        };

        let gql = format!(
            "query ListScoreResults($key: String!, $startTime: String!, $endTime: String!, \
              $nextToken: String, $limit: Int) {{
                {}(
                    {}: $key,
                    updatedAt: {{ between: [$startTime, $endTime] }},
                    nextToken: $nextToken,
                    limit: $limit
                ) {{
                    items {{ {} }}
                    nextToken
                }}
            }}",
            query_name, key_field, SCORE_RESULT_FIELDS
        );

        let (start, end) = window.to_rfc3339();
        let variables = json!({
            "key": key_value,
            "startTime": start,
            "endTime": end,
            "nextToken": next_token,
            "limit": limit,
        });

        let data = self.execute(&gql, variables).await?;
        Ok(Self::decode_page(&data, query_name))
    }

    async fn get_item(&self, id: &str) -> ApiResult<Option<Item>> {
        let gql = format!(
            "query GetItem($id: ID!) {{
                getItem(id: $id) {{ {} }}
            }}",
            ITEM_FIELDS
        );
        let data = self.execute(&gql, json!({ "id": id })).await?;
        Self::decode_record(&data, "getItem")
    }

    async fn find_item_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> ApiResult<Option<Item>> {
        let gql = format!(
            "query ListItems($filter: ModelItemFilterInput, $limit: Int) {{
                listItems(filter: $filter, limit: $limit) {{
                    items {{ {} }}
                    nextToken
                }}
            }}",
            ITEM_FIELDS
        );
        let variables = json!({
            "filter": {
                "and": [
                    { "accountId": { "eq": account_id } },
                    { "externalId": { "eq": external_id } },
                ]
            },
            "limit": 1,
        });
        let data = self.execute(&gql, variables).await?;
        let page: Page<Item> = Self::decode_page(&data, "listItems");
        Ok(page.items.into_iter().next())
    }

    async fn create_item(&self, input: ItemInput) -> ApiResult<Item> {
        let gql = format!(
            "mutation CreateItem($input: CreateItemInput!) {{
                createItem(input: $input) {{ {} }}
            }}",
            ITEM_FIELDS
        );
        let data = self
            .execute(&gql, json!({ "input": serde_json::to_value(&input)? }))
            .await?;
        Self::decode_record(&data, "createItem")?
            .ok_or_else(|| ApiError::Remote("createItem returned no record".into()))
    }

    async fn update_item(&self, input: ItemInput) -> ApiResult<Item> {
        let gql = format!(
            "mutation UpdateItem($input: UpdateItemInput!) {{
                updateItem(input: $input) {{ {} }}
            }}",
            ITEM_FIELDS
        );
        let data = self
            .execute(&gql, json!({ "input": serde_json::to_value(&input)? }))
            .await?;
        Self::decode_record(&data, "updateItem")?
            .ok_or_else(|| ApiError::Remote("updateItem returned no record".into()))
    }

    async fn find_identifier_by_value(
        &self,
        account_id: &str,
        value: &str,
    ) -> ApiResult<Option<Identifier>> {
        let gql = "query ListIdentifierByValue($value: String!, $filter: ModelIdentifierFilterInput, $limit: Int) {
            listIdentifierByValue(value: $value, filter: $filter, limit: $limit) {
                items { id itemId accountId name value url position createdAt updatedAt }
                nextToken
            }
        }";
        let variables = json!({
            "value": value,
            "filter": { "accountId": { "eq": account_id } },
            "limit": 10,
        });
        let data = self.execute(gql, variables).await?;
        let page: Page<Identifier> = Self::decode_page(&data, "listIdentifierByValue");
        if page.items.len() > 1 {
            tracing::warn!(
                "Identifier value '{}' resolves to {} items in account {}; using the first",
                value,
                page.items.len(),
                account_id
            );
        }
        Ok(page.items.into_iter().next())
    }

    async fn create_identifier(&self, input: IdentifierInput) -> ApiResult<Identifier> {
        let gql = "mutation CreateIdentifier($input: CreateIdentifierInput!) {
            createIdentifier(input: $input) {
                id itemId accountId name value url position createdAt updatedAt
            }
        }";
        let data = self
            .execute(gql, json!({ "input": serde_json::to_value(&input)? }))
            .await?;
        Self::decode_record(&data, "createIdentifier")?
            .ok_or_else(|| ApiError::Remote("createIdentifier returned no record".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_classification() {
        assert!(is_schema_error("Validation error of type FieldUndefined: ..."));
        assert!(is_schema_error("Cannot query field 'foo' on type 'Query'"));
        assert!(!is_schema_error("Request throttled"));
    }

    #[test]
    fn test_decode_page_skips_bad_rows() {
        let data = json!({
            "listFeedbackItems": {
                "items": [
                    { "id": "fb-1" },
                    { "id": ["not", "a", "string"] },
                ],
                "nextToken": "t1",
            }
        });
        let page: Page<FeedbackItem> = GraphQlClient::decode_page(&data, "listFeedbackItems");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "fb-1");
        assert_eq!(page.next_token.as_deref(), Some("t1"));
    }

    #[test]
    fn test_decode_page_missing_key() {
        let page: Page<FeedbackItem> = GraphQlClient::decode_page(&json!({}), "listFeedbackItems");
        assert!(page.items.is_empty());
        assert!(page.next_token.is_none());
    }
}
