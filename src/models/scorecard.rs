//! Scorecard, Section, and Score: read-only rubric structure.
//!
//! Scorecards contain ordered sections; sections contain ordered scores.
//! This crate only resolves identifiers against them and enumerates scores;
//! it never writes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Scorecard {
    pub id: String,
    pub name: Option<String>,
    pub key: Option<String>,
    pub external_id: Option<String>,
    pub account_id: Option<String>,
    pub sections: Option<Connection<Section>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Section {
    pub id: String,
    pub name: Option<String>,
    pub order: Option<i32>,
    pub scores: Option<Connection<Score>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Score {
    pub id: String,
    pub name: Option<String>,
    pub key: Option<String>,
    pub external_id: Option<String>,
    pub order: Option<i32>,
    pub champion_version_id: Option<String>,
}

impl Score {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// GraphQL list nesting: `{ items: [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Connection<T> {
    pub items: Vec<T>,
}

/// One enumerable score with a non-empty external id, in analysis order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreEntry {
    pub score_id: String,
    pub score_name: String,
    pub external_id: String,
}

impl Scorecard {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Iterate every score across all sections, in stored order.
    pub fn all_scores(&self) -> impl Iterator<Item = &Score> {
        self.sections
            .iter()
            .flat_map(|c| c.items.iter())
            .flat_map(|section| section.scores.iter().flat_map(|c| c.items.iter()))
    }

    /// Enumerate scores eligible for analysis: non-empty `external_id`,
    /// ordered by section position then intra-section score order (the
    /// score's `order` field, falling back to its index).
    pub fn enumerate_scores(&self) -> Vec<ScoreEntry> {
        let mut positioned: Vec<(usize, i32, ScoreEntry)> = Vec::new();

        if let Some(sections) = &self.sections {
            for (section_index, section) in sections.items.iter().enumerate() {
                let Some(scores) = &section.scores else { continue };
                for (score_index, score) in scores.items.iter().enumerate() {
                    let Some(external_id) = score.external_id.as_deref().filter(|s| !s.is_empty())
                    else {
                        tracing::debug!(
                            "Score '{}' (ID: {}) is missing externalId, skipping",
                            score.display_name(),
                            score.id
                        );
                        continue;
                    };
                    let order = score.order.unwrap_or(score_index as i32);
                    positioned.push((
                        section_index,
                        order,
                        ScoreEntry {
                            score_id: score.id.clone(),
                            score_name: score.display_name().to_string(),
                            external_id: external_id.to_string(),
                        },
                    ));
                }
            }
        }

        positioned.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        positioned.into_iter().map(|(_, _, entry)| entry).collect()
    }
}
