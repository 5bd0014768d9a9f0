//! Identifier resolution for scorecards and scores.
//!
//! User-facing commands accept ids, external ids, keys, names, or partial
//! names. Resolution order is part of the observable contract and must stay
//! stable for ambiguous inputs:
//!
//! Scorecards: id (UUID-shaped) -> externalId -> key -> exact name ->
//! substring name. Scores (within one scorecard): id -> exact
//! case-insensitive name -> key -> externalId -> case-insensitive substring.

use uuid::Uuid;

use super::api::DataClient;
use crate::models::{Score, Scorecard};
use crate::utils::{ApiError, ApiResult};

/// Whether a user string is plausibly a record id rather than an external
/// id, key, or name. Record ids are long and dashed; external ids are
/// typically short numeric strings.
fn looks_like_id(value: &str) -> bool {
    Uuid::parse_str(value).is_ok() || (value.len() > 20 && value.contains('-'))
}

/// Resolve a scorecard identifier to the full scorecard (with sections).
pub async fn resolve_scorecard(
    client: &dyn DataClient,
    account_id: &str,
    identifier: &str,
) -> ApiResult<Scorecard> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(ApiError::validation("scorecard identifier is required"));
    }

    if looks_like_id(identifier) {
        tracing::debug!("Scorecard identifier '{}' looks like an id, fetching by id", identifier);
        if let Some(scorecard) = client.get_scorecard(identifier).await? {
            return Ok(scorecard);
        }
    }

    if let Some(scorecard) = client
        .get_scorecard_by_external_id(account_id, identifier)
        .await?
    {
        return Ok(scorecard);
    }

    if let Some(scorecard) = client.get_scorecard_by_key(account_id, identifier).await? {
        return Ok(scorecard);
    }

    // Name matching: exact first, then substring, both case-insensitive.
    let scorecards = client.list_scorecards(account_id).await?;
    let lowered = identifier.to_lowercase();

    let by_exact_name = scorecards
        .iter()
        .find(|sc| sc.name.as_deref().is_some_and(|n| n.to_lowercase() == lowered));
    let by_substring = scorecards
        .iter()
        .find(|sc| sc.name.as_deref().is_some_and(|n| n.to_lowercase().contains(&lowered)));

    if let Some(found) = by_exact_name.or(by_substring) {
        // The list query is shallow; re-fetch for sections and scores.
        if let Some(scorecard) = client.get_scorecard(&found.id).await? {
            return Ok(scorecard);
        }
        return Ok(found.clone());
    }

    Err(ApiError::not_found(format!("Scorecard not found: {}", identifier)))
}

/// Resolve a score identifier within an already-resolved scorecard.
pub fn resolve_score<'a>(scorecard: &'a Scorecard, identifier: &str) -> ApiResult<&'a Score> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(ApiError::validation("score identifier is required"));
    }
    let lowered = identifier.to_lowercase();

    if let Some(score) = scorecard.all_scores().find(|s| s.id == identifier) {
        return Ok(score);
    }

    if let Some(score) = scorecard
        .all_scores()
        .find(|s| s.name.as_deref().is_some_and(|n| n.to_lowercase() == lowered))
    {
        return Ok(score);
    }

    if let Some(score) = scorecard
        .all_scores()
        .find(|s| s.key.as_deref() == Some(identifier))
    {
        return Ok(score);
    }

    if let Some(score) = scorecard
        .all_scores()
        .find(|s| s.external_id.as_deref() == Some(identifier))
    {
        return Ok(score);
    }

    if let Some(score) = scorecard
        .all_scores()
        .find(|s| s.name.as_deref().is_some_and(|n| n.to_lowercase().contains(&lowered)))
    {
        return Ok(score);
    }

    Err(ApiError::not_found(format!(
        "Score not found in scorecard '{}': {}",
        scorecard.display_name(),
        identifier
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Connection, Section};

    fn scorecard_with_scores(scores: Vec<Score>) -> Scorecard {
        Scorecard {
            id: "sc-1".into(),
            name: Some("Quality Review".into()),
            sections: Some(Connection {
                items: vec![Section {
                    id: "sec-1".into(),
                    scores: Some(Connection { items: scores }),
                    ..Default::default()
                }],
            }),
            ..Default::default()
        }
    }

    fn score(id: &str, name: &str, key: Option<&str>, external_id: Option<&str>) -> Score {
        Score {
            id: id.into(),
            name: Some(name.into()),
            key: key.map(Into::into),
            external_id: external_id.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_looks_like_id() {
        assert!(looks_like_id("f4076c72-e74b-4eaf-afd6-d4f61c9f0142"));
        assert!(!looks_like_id("97"));
        assert!(!looks_like_id("compliance-check"));
    }

    #[test]
    fn test_resolve_score_exact_name_beats_substring() {
        let scorecard = scorecard_with_scores(vec![
            score("s-1", "Greeting Extended", None, None),
            score("s-2", "Greeting", None, None),
        ]);
        let found = resolve_score(&scorecard, "greeting").unwrap();
        assert_eq!(found.id, "s-2");
    }

    #[test]
    fn test_resolve_score_by_external_id_before_substring() {
        let scorecard = scorecard_with_scores(vec![
            score("s-1", "Contains 42 somewhere", None, None),
            score("s-2", "Other", None, Some("42")),
        ]);
        let found = resolve_score(&scorecard, "42").unwrap();
        assert_eq!(found.id, "s-2");
    }

    #[test]
    fn test_resolve_score_substring_fallback() {
        let scorecard =
            scorecard_with_scores(vec![score("s-1", "Agent Misrepresentation", None, None)]);
        let found = resolve_score(&scorecard, "misrepresent").unwrap();
        assert_eq!(found.id, "s-1");
    }

    #[test]
    fn test_resolve_score_not_found() {
        let scorecard = scorecard_with_scores(vec![score("s-1", "Greeting", None, None)]);
        let err = resolve_score(&scorecard, "nonexistent").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
