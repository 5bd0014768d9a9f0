//! Agreement analytics engine.
//!
//! Two surfaces: a single-score summary (context + analysis +
//! recommendation) and a scorecard-level summary that analyzes every
//! enumerable score, computes overall metrics over the concatenation, and
//! composes a compact summary warning from the per-score warnings.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::api::DataClient;
use super::feedback_finder::{FeedbackFinder, FindRequest, SearchContext};
use super::metrics;
use crate::models::{
    ClassCount, ConfusionMatrix, DateRange, FeedbackItem, Score, ScoreAnalysis, Scorecard,
};
use crate::utils::{ApiResult, TimeWindow};

/// Analysis block of a single-score summary document.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryAnalysis {
    pub ac1: Option<f64>,
    pub accuracy: Option<f64>,
    pub total_items: usize,
    pub agreements: usize,
    pub disagreements: usize,
    pub confusion_matrix: Option<ConfusionMatrix>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub class_distribution: Vec<ClassCount>,
    pub predicted_class_distribution: Vec<ClassCount>,
    pub warning: Option<String>,
}

impl From<ScoreAnalysis> for SummaryAnalysis {
    fn from(a: ScoreAnalysis) -> Self {
        Self {
            ac1: a.ac1,
            accuracy: a.accuracy,
            total_items: a.item_count,
            agreements: a.agreements,
            disagreements: a.mismatches,
            confusion_matrix: a.confusion_matrix,
            precision: a.precision,
            recall: a.recall,
            class_distribution: a.class_distribution,
            predicted_class_distribution: a.predicted_class_distribution,
            warning: a.warning,
        }
    }
}

/// Single-score summary document.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    pub context: SearchContext,
    pub analysis: SummaryAnalysis,
    pub recommendation: String,
}

/// One score's entry in a scorecard-level summary.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreSummary {
    pub score_id: String,
    pub score_name: String,
    pub external_id: Option<String>,
    #[serde(flatten)]
    pub analysis: ScoreAnalysis,
    pub classes_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Scorecard-level summary document.
#[derive(Debug, Clone, Serialize)]
pub struct ScorecardSummary {
    pub overall_ac1: Option<f64>,
    pub total_items: usize,
    pub total_mismatches: usize,
    pub total_agreements: usize,
    pub accuracy: Option<f64>,
    pub scores: Vec<ScoreSummary>,
    pub total_feedback_items_retrieved: usize,
    pub date_range: DateRange,
    pub message: String,
    pub classes_count: usize,
    pub label_distribution: BTreeMap<String, usize>,
    pub confusion_matrix: Option<ConfusionMatrix>,
    pub class_distribution: Vec<ClassCount>,
    pub predicted_class_distribution: Vec<ClassCount>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    /// Summary warning composed from the per-score warnings
    pub warning: Option<String>,
}

pub struct AnalysisService {
    finder: FeedbackFinder,
}

impl AnalysisService {
    pub fn new(client: Arc<dyn DataClient>) -> Self {
        Self { finder: FeedbackFinder::new(client) }
    }

    pub fn finder(&self) -> &FeedbackFinder {
        &self.finder
    }

    /// Summarize agreement for one score over a window.
    pub async fn summarize_score(
        &self,
        account_id: &str,
        scorecard: &Scorecard,
        score: &Score,
        window: &TimeWindow,
    ) -> ApiResult<SummaryResult> {
        // Full population: no limit, no prioritization
        let mut request = FindRequest::new(account_id, &scorecard.id, &score.id, window.clone());
        request.prioritize_edit_comments = false;
        let items = self.finder.find(&request).await?;

        let analysis = analyze_items(&items);
        let recommendation = generate_recommendation(&analysis);

        let context = SearchContext {
            scorecard_name: scorecard.display_name().to_string(),
            score_name: score.display_name().to_string(),
            scorecard_id: scorecard.id.clone(),
            score_id: score.id.clone(),
            account_id: account_id.to_string(),
            filters: json!({
                "start": window.start.to_rfc3339(),
                "end": window.end.to_rfc3339(),
            }),
            total_found: analysis.item_count,
        };

        Ok(SummaryResult { context, analysis: analysis.into(), recommendation })
    }

    /// Summarize a whole scorecard: per-score analyses plus overall metrics
    /// over every retrieved pair. When `only_score` is given, just that
    /// score is processed but the document shape is unchanged.
    pub async fn summarize_scorecard(
        &self,
        account_id: &str,
        scorecard: &Scorecard,
        only_score: Option<&Score>,
        window: &TimeWindow,
    ) -> ApiResult<ScorecardSummary> {
        let entries: Vec<(String, String, Option<String>)> = match only_score {
            Some(score) => vec![(
                score.id.clone(),
                score.display_name().to_string(),
                score.external_id.clone(),
            )],
            None => scorecard
                .enumerate_scores()
                .into_iter()
                .map(|e| (e.score_id, e.score_name, Some(e.external_id)))
                .collect(),
        };

        if entries.is_empty() {
            let msg = "No scores identified for analysis.";
            tracing::warn!("{} (scorecard {})", msg, scorecard.id);
            return Ok(ScorecardSummary {
                overall_ac1: None,
                total_items: 0,
                total_mismatches: 0,
                total_agreements: 0,
                accuracy: None,
                scores: Vec::new(),
                total_feedback_items_retrieved: 0,
                date_range: DateRange::from(window),
                message: msg.to_string(),
                classes_count: 2,
                label_distribution: BTreeMap::new(),
                confusion_matrix: None,
                class_distribution: Vec::new(),
                predicted_class_distribution: Vec::new(),
                precision: None,
                recall: None,
                warning: None,
            });
        }

        let mut score_summaries = Vec::with_capacity(entries.len());
        let mut all_items: Vec<FeedbackItem> = Vec::new();
        let mut retrieved_count = 0usize;

        for (score_id, score_name, external_id) in &entries {
            tracing::info!("Processing score '{}' (ID: {})", score_name, score_id);
            let mut request = FindRequest::new(account_id, &scorecard.id, score_id, window.clone());
            request.prioritize_edit_comments = false;
            let items = self.finder.find(&request).await?;
            retrieved_count += items.len();

            let summary = if items.is_empty() {
                tracing::warn!("No feedback items for score '{}' in range", score_name);
                ScoreSummary {
                    score_id: score_id.clone(),
                    score_name: score_name.clone(),
                    external_id: external_id.clone(),
                    analysis: ScoreAnalysis::empty("No data."),
                    classes_count: 2,
                    message: Some("No feedback items found in the specified date range.".into()),
                }
            } else {
                let analysis = analyze_items(&items);
                let classes_count = analysis.classes_count().max(2);
                ScoreSummary {
                    score_id: score_id.clone(),
                    score_name: score_name.clone(),
                    external_id: external_id.clone(),
                    analysis,
                    classes_count,
                    message: None,
                }
            };

            tracing::info!(
                "Score '{}': AC1={:?}, items={}, agreements={}, mismatches={}",
                score_name,
                summary.analysis.ac1,
                summary.analysis.item_count,
                summary.analysis.agreements,
                summary.analysis.mismatches
            );
            all_items.extend(items);
            score_summaries.push(summary);
        }

        let overall = analyze_items(&all_items);
        let warning = generate_summary_warning(&score_summaries);
        let classes_count = overall.classes_count().max(2);

        Ok(ScorecardSummary {
            overall_ac1: overall.ac1,
            total_items: overall.item_count,
            total_mismatches: overall.mismatches,
            total_agreements: overall.agreements,
            accuracy: overall.accuracy,
            scores: score_summaries,
            total_feedback_items_retrieved: retrieved_count,
            date_range: DateRange::from(window),
            message: format!("Processed {} score(s).", entries.len()),
            classes_count,
            label_distribution: overall.label_distribution,
            confusion_matrix: overall.confusion_matrix,
            class_distribution: overall.class_distribution,
            predicted_class_distribution: overall.predicted_class_distribution,
            precision: overall.precision,
            recall: overall.recall,
            warning,
        })
    }
}

/// Run the metrics kernel over the valid pairs of a feedback population.
pub fn analyze_items(items: &[FeedbackItem]) -> ScoreAnalysis {
    if items.is_empty() {
        return ScoreAnalysis::empty("No feedback items found");
    }
    let pairs: Vec<(String, String)> = items
        .iter()
        .filter_map(|item| {
            item.answer_pair()
                .map(|(initial, r#final)| (initial.to_string(), r#final.to_string()))
        })
        .collect();
    if pairs.is_empty() {
        return ScoreAnalysis::empty("No valid feedback pairs found");
    }
    metrics::analyze_pairs(&pairs)
}

/// Rule-based recommendation synthesis from accuracy and AC1 bands.
pub fn generate_recommendation(analysis: &ScoreAnalysis) -> String {
    if analysis.item_count == 0 {
        return "No feedback data available. No further analysis possible.".to_string();
    }

    let accuracy = analysis.accuracy.unwrap_or(0.0);
    let warning = analysis.warning.as_deref().unwrap_or("");
    let mut recommendations: Vec<&str> = Vec::new();

    if accuracy < 70.0 {
        recommendations.push("Low accuracy detected");
        if warning.contains("Single class") {
            recommendations.push("Use `find` to examine why predictions are all wrong");
        } else if warning.contains("Imbalanced") {
            recommendations
                .push("Use `find` with specific value filters to examine false positives and negatives");
        } else {
            recommendations.push("Use `find` to examine disagreement patterns");
        }
    } else if accuracy < 85.0 {
        recommendations.push("Moderate accuracy - room for improvement");
        recommendations.push("Use `find` to examine specific error patterns");
    }

    if let Some(ac1) = analysis.ac1 {
        if ac1 < 0.0 {
            recommendations.push("Systematic disagreement requires immediate attention");
        } else if ac1 < 0.4 {
            recommendations.push("Poor agreement between AI and human reviewers");
        } else if ac1 < 0.6 {
            recommendations.push("Fair agreement - investigate borderline cases");
        }
    }

    if warning.contains("Single class") {
        recommendations.push("Examine why AI predictions lack diversity");
    } else if warning.contains("Imbalanced") {
        recommendations.push("Focus on minority class prediction accuracy");
    }

    if recommendations.is_empty() {
        recommendations
            .push("Good performance - use `find` to examine edge cases for further improvement");
    }

    format!("{}.", recommendations.join(". "))
}

/// Compose the scorecard-level summary warning from per-score warnings.
///
/// Format: "All scores" / "1 score" / "N scores with", followed by the
/// warning kinds present; three or more kinds are rendered one per line.
pub fn generate_summary_warning(scores: &[ScoreSummary]) -> Option<String> {
    if scores.is_empty() {
        return None;
    }

    let mut disagreement = 0usize;
    let mut random_chance = 0usize;
    let mut single_class = 0usize;
    let mut imbalanced = 0usize;
    let mut no_data = 0usize;
    let mut scores_with_warnings = 0usize;

    for score in scores {
        let Some(warning) = score.analysis.warning.as_deref() else { continue };
        scores_with_warnings += 1;
        if warning.contains("Systematic disagreement") {
            disagreement += 1;
        } else if warning.contains("Random chance") {
            random_chance += 1;
        } else if warning.contains("Single class") {
            single_class += 1;
        } else if warning.contains("Imbalanced classes") {
            imbalanced += 1;
        } else if warning.contains("No data") {
            no_data += 1;
        }
    }

    if scores_with_warnings == 0 {
        return None;
    }

    let all_affected = scores_with_warnings == scores.len();
    let score_phrase = if all_affected {
        "All scores".to_string()
    } else if scores_with_warnings == 1 {
        "1 score".to_string()
    } else {
        format!("{} scores with", scores_with_warnings)
    };

    let mut kinds: Vec<&str> = Vec::new();
    if disagreement > 0 {
        kinds.push("disagreement");
    }
    if random_chance > 0 {
        kinds.push("random chance");
    }
    if single_class > 0 {
        kinds.push("single class");
    }
    if imbalanced > 0 {
        kinds.push("imbalanced");
    }
    if no_data > 0 {
        kinds.push("no data");
    }

    let compact = all_affected || scores_with_warnings == 1;
    let text = match kinds.len() {
        0 => return None,
        1 => {
            if compact {
                format!("{}: {}.", score_phrase, kinds[0])
            } else {
                format!("{} {}.", score_phrase, kinds[0])
            }
        },
        2 => {
            if compact {
                format!("{}: {} and {}.", score_phrase, kinds[0], kinds[1])
            } else {
                format!("{} {} and {}.", score_phrase, kinds[0], kinds[1])
            }
        },
        _ => {
            let lines: Vec<String> = kinds.iter().map(|k| format!(" {}", k)).collect();
            if compact {
                format!("{} with multiple issues:\n{}.", score_phrase, lines.join("\n"))
            } else {
                format!("{} multiple issues:\n{}.", score_phrase, lines.join("\n"))
            }
        },
    };

    Some(text)
}
