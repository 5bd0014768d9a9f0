//! ScoreResult: one produced prediction record with optional cost fields.
//!
//! Only the cost substructure matters to this crate. Cost may live in the
//! top-level `cost` field or nested under `metadata.cost`; both shapes are
//! accepted, with the top-level field preferred.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::doc::Doc;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreResult {
    pub id: String,
    pub value: Option<String>,
    pub item_id: Option<String>,
    pub account_id: Option<String>,
    pub scorecard_id: Option<String>,
    pub score_id: Option<String>,
    pub code: Option<String>,
    pub r#type: Option<String>,
    pub score: Option<ScoreRef>,
    pub cost: Option<Doc>,
    pub metadata: Option<Doc>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Nested `score { id name }` reference returned alongside results.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreRef {
    pub id: String,
    pub name: Option<String>,
}

/// The cost fields of one result, parsed into fixed-decimal money and
/// integer token/call counts. Missing fields default to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CostBundle {
    pub total_cost: Decimal,
    pub input_cost: Decimal,
    pub output_cost: Decimal,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub cached_tokens: i64,
    pub llm_calls: i64,
}

impl ScoreResult {
    /// Extract the cost substructure, preferring the explicit top-level
    /// `cost` field and falling back to `metadata.cost`. Returns None when
    /// neither location holds a non-empty object.
    pub fn cost_bundle(&self) -> Option<CostBundle> {
        let cost_obj = self
            .cost
            .as_ref()
            .and_then(|d| d.to_object())
            .filter(|m| !m.is_empty())
            .or_else(|| {
                let meta = self.metadata.as_ref()?.to_object()?;
                match meta.get("cost") {
                    Some(Value::Object(map)) if !map.is_empty() => Some(map.clone()),
                    Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                        Ok(Value::Object(map)) if !map.is_empty() => Some(map),
                        _ => None,
                    },
                    _ => None,
                }
            })?;

        Some(CostBundle {
            total_cost: parse_decimal(cost_obj.get("total_cost")),
            input_cost: parse_decimal(cost_obj.get("input_cost")),
            output_cost: parse_decimal(cost_obj.get("output_cost")),
            prompt_tokens: parse_int(cost_obj.get("prompt_tokens")),
            completion_tokens: parse_int(cost_obj.get("completion_tokens")),
            cached_tokens: parse_int(cost_obj.get("cached_tokens")),
            llm_calls: parse_int(cost_obj.get("llm_calls")),
        })
    }
}

/// Parse a decimal out of a JSON number or numeric string; anything else
/// counts as zero. Money never goes through f64 arithmetic.
pub fn parse_decimal(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(Decimal::ZERO),
        Some(Value::Number(n)) => n.to_string().parse().unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

fn parse_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| {
            n.as_f64().map(|f| f as i64).unwrap_or(0)
        }),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
