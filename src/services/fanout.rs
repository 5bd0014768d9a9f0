//! Scorecard fan-out: bound-concurrent per-scorecard analysis for the
//! "all scorecards" mode of the feedback and cost surfaces.
//!
//! One scorecard failing must never cancel the batch; failures become
//! placeholder entries carrying `error`. Result order is rank-derived, not
//! input order: AC1 descending (nulls last) for feedback, total cost
//! descending for costs.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::analysis::{AnalysisService, ScorecardSummary};
use super::api::DataClient;
use super::costs::{
    CostAnalyzer, CostPick, CostReportGroup, CostRequest, GroupBy, WindowEcho, distribution_numbers,
    item_analysis, pick_summary,
};
use crate::models::DateRange;
use crate::utils::{ApiResult, TimeWindow};

/// Fan-out width bounds; requests outside are clamped.
pub const MAX_CONCURRENCY: usize = 16;
pub const DEFAULT_CONCURRENCY: usize = 4;
/// Feedback analyses are lighter per call, so they fan out wider by default.
pub const DEFAULT_FEEDBACK_CONCURRENCY: usize = 10;

fn clamp_concurrency(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).clamp(1, MAX_CONCURRENCY)
}

/// Outcome of one scorecard's feedback analysis: a full summary, or an
/// error placeholder with the uniform skeleton.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FeedbackOutcome {
    Summary(ScorecardSummary),
    Error {
        overall_ac1: Option<f64>,
        total_items: usize,
        error: String,
        scores: Vec<Value>,
    },
}

impl FeedbackOutcome {
    fn total_items(&self) -> usize {
        match self {
            FeedbackOutcome::Summary(s) => s.total_items,
            FeedbackOutcome::Error { total_items, .. } => *total_items,
        }
    }

    fn ac1(&self) -> Option<f64> {
        match self {
            FeedbackOutcome::Summary(s) => s.overall_ac1,
            FeedbackOutcome::Error { overall_ac1, .. } => *overall_ac1,
        }
    }

    fn is_error(&self) -> bool {
        matches!(self, FeedbackOutcome::Error { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScorecardFeedbackEntry {
    pub scorecard_id: String,
    pub scorecard_name: String,
    pub scorecard_external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
    #[serde(flatten)]
    pub outcome: FeedbackOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllScorecardsFeedback {
    pub mode: &'static str,
    pub total_scorecards_analyzed: usize,
    pub total_scorecards_with_data: usize,
    pub total_scorecards_without_data: usize,
    pub total_scorecards_filtered: usize,
    pub date_range: DateRange,
    pub scorecards: Vec<ScorecardFeedbackEntry>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScorecardCostEntry {
    pub scorecard_id: String,
    pub scorecard_name: String,
    pub scorecard_external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub summary: CostPick,
    #[serde(rename = "itemAnalysis")]
    pub item_analysis: super::costs::ItemAnalysis,
    pub groups: Vec<CostReportGroup>,
    pub window: WindowEcho,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllScorecardsCosts {
    pub mode: &'static str,
    pub total_scorecards_analyzed: usize,
    pub total_scorecards_with_data: usize,
    pub total_scorecards_without_data: usize,
    pub date_range: DateRange,
    pub window: WindowEcho,
    pub scorecards: Vec<ScorecardCostEntry>,
    pub message: String,
}

pub struct ScorecardFanOut {
    client: Arc<dyn DataClient>,
    analysis: Arc<AnalysisService>,
}

impl ScorecardFanOut {
    pub fn new(client: Arc<dyn DataClient>) -> Self {
        let analysis = Arc::new(AnalysisService::new(Arc::clone(&client)));
        Self { client, analysis }
    }

    /// Analyze feedback agreement for every scorecard in the account.
    ///
    /// Scorecards with no feedback are filtered from the output (error
    /// placeholders are kept); survivors are ranked by overall AC1
    /// descending with nulls and errors last.
    pub async fn feedback_all_scorecards(
        &self,
        account_id: &str,
        window: &TimeWindow,
        concurrency: Option<usize>,
    ) -> ApiResult<AllScorecardsFeedback> {
        let scorecards = self.client.list_scorecards(account_id).await?;
        let total = scorecards.len();
        tracing::info!("Analyzing {} scorecards for feedback (all-scorecards mode)", total);

        let width = clamp_concurrency(concurrency, DEFAULT_FEEDBACK_CONCURRENCY);
        let semaphore = Arc::new(Semaphore::new(width));
        let mut tasks: JoinSet<(usize, ScorecardFeedbackEntry)> = JoinSet::new();

        for (index, scorecard) in scorecards.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let client = Arc::clone(&self.client);
            let analysis = Arc::clone(&self.analysis);
            let account_id = account_id.to_string();
            let window = window.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                tracing::info!(
                    "[{}/{}] Analyzing scorecard '{}'",
                    index + 1,
                    total,
                    scorecard.display_name()
                );

                // The account listing is shallow; re-fetch for sections.
                let full = match client.get_scorecard(&scorecard.id).await {
                    Ok(Some(full)) => full,
                    Ok(None) => scorecard.clone(),
                    Err(e) => {
                        tracing::error!(
                            "Error loading scorecard '{}': {}",
                            scorecard.display_name(),
                            e
                        );
                        return (
                            index,
                            error_feedback_entry(&scorecard, e.to_string()),
                        );
                    },
                };

                let outcome = match analysis
                    .summarize_scorecard(&account_id, &full, None, &window)
                    .await
                {
                    Ok(summary) => FeedbackOutcome::Summary(summary),
                    Err(e) => {
                        tracing::error!(
                            "Error analyzing scorecard '{}': {}",
                            full.display_name(),
                            e
                        );
                        FeedbackOutcome::Error {
                            overall_ac1: None,
                            total_items: 0,
                            error: e.to_string(),
                            scores: Vec::new(),
                        }
                    },
                };

                (
                    index,
                    ScorecardFeedbackEntry {
                        scorecard_id: full.id.clone(),
                        scorecard_name: full.display_name().to_string(),
                        scorecard_external_id: full.external_id.clone(),
                        rank: None,
                        outcome,
                    },
                )
            });
        }

        let mut entries: Vec<ScorecardFeedbackEntry> = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, entry)) => entries.push(entry),
                Err(e) => tracing::error!("Scorecard analysis task panicked: {}", e),
            }
        }

        // Drop zero-data successes; error placeholders always stay visible.
        let before_filter = entries.len();
        entries.retain(|e| e.outcome.is_error() || e.outcome.total_items() > 0);
        let filtered = before_filter - entries.len();
        if filtered > 0 {
            tracing::info!("Filtered out {} scorecard(s) with no feedback data", filtered);
        }

        // Rank: AC1 descending, null AC1 (including errors) last.
        entries.sort_by(|a, b| match (a.outcome.ac1(), b.outcome.ac1()) {
            (Some(left), Some(right)) => {
                right.partial_cmp(&left).unwrap_or(std::cmp::Ordering::Equal)
            },
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        for (rank, entry) in entries.iter_mut().enumerate() {
            entry.rank = Some(rank + 1);
        }

        let with_data = entries
            .iter()
            .filter(|e| e.outcome.total_items() > 0)
            .count();
        let analyzed = entries.len();

        Ok(AllScorecardsFeedback {
            mode: "all_scorecards",
            total_scorecards_analyzed: analyzed,
            total_scorecards_with_data: with_data,
            total_scorecards_without_data: analyzed - with_data,
            total_scorecards_filtered: filtered,
            date_range: DateRange::from(window),
            scorecards: entries,
            message: format!(
                "Analyzed {} scorecard(s) with feedback data, sorted by overall AC1 \
                 (best to worst). Filtered out {} scorecard(s) with no data.",
                analyzed, filtered
            ),
        })
    }

    /// Aggregate costs for every scorecard in the account, ranked by total
    /// cost descending. Each scorecard gets its own analyzer so the
    /// single-entry caches stay per-worker.
    pub async fn costs_all_scorecards(
        &self,
        base_request: &CostRequest,
        window: &TimeWindow,
        concurrency: Option<usize>,
    ) -> ApiResult<AllScorecardsCosts> {
        let scorecards = self.client.list_scorecards(&base_request.account_id).await?;
        let total = scorecards.len();
        tracing::info!("Analyzing costs across {} scorecards (all-scorecards mode)", total);

        let width = clamp_concurrency(concurrency, DEFAULT_CONCURRENCY);
        let semaphore = Arc::new(Semaphore::new(width));
        let mut tasks: JoinSet<ScorecardCostEntry> = JoinSet::new();

        for (index, scorecard) in scorecards.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let client = Arc::clone(&self.client);
            let request = CostRequest {
                scorecard_id: Some(scorecard.id.clone()),
                score_id: None,
                ..base_request.clone()
            };
            let window_echo = WindowEcho { hours: request.hours, days: request.days };

            tasks.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                tracing::info!(
                    "[{}/{}] Cost analysis for scorecard '{}'",
                    index + 1,
                    total,
                    scorecard.display_name()
                );

                let analyzer = CostAnalyzer::new(client);
                let analysis = match analyzer.analyze(&request, Some(GroupBy::Score)).await {
                    Ok(analysis) => analysis,
                    Err(e) => {
                        tracing::error!(
                            "Cost analysis failed for scorecard '{}': {}",
                            scorecard.display_name(),
                            e
                        );
                        return error_cost_entry(&scorecard, e.to_string(), window_echo);
                    },
                };
                let raw = analyzer.list_raw(&request).await.unwrap_or_default();

                let total_cost = analysis
                    .headline
                    .costs
                    .total_cost
                    .parse::<Decimal>()
                    .unwrap_or(Decimal::ZERO);
                let total_calls = analysis
                    .headline
                    .calls
                    .total_calls
                    .parse::<Decimal>()
                    .unwrap_or(Decimal::ZERO);

                let mut groups: Vec<CostReportGroup> = analysis
                    .groups
                    .iter()
                    .map(|g| CostReportGroup {
                        group: g.group.clone(),
                        summary: pick_summary(&g.costs, &g.calls),
                        distribution: distribution_numbers(&g.costs),
                    })
                    .collect();
                groups.sort_by(|a, b| {
                    let left =
                        a.summary.average_cost.parse::<Decimal>().unwrap_or(Decimal::ZERO);
                    let right =
                        b.summary.average_cost.parse::<Decimal>().unwrap_or(Decimal::ZERO);
                    right.cmp(&left)
                });

                ScorecardCostEntry {
                    scorecard_id: scorecard.id.clone(),
                    scorecard_name: scorecard.display_name().to_string(),
                    scorecard_external_id: scorecard.external_id.clone(),
                    rank: None,
                    error: None,
                    summary: pick_summary(&analysis.headline.costs, &analysis.headline.calls),
                    item_analysis: item_analysis(&raw, total_cost, total_calls),
                    groups,
                    window: window_echo,
                }
            });
        }

        let mut entries: Vec<ScorecardCostEntry> = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::error!("Scorecard cost task panicked: {}", e),
            }
        }

        // Highest total cost first; zero-cost scorecards fall to the end
        entries.sort_by(|a, b| {
            let left = a.summary.total_cost.parse::<Decimal>().unwrap_or(Decimal::ZERO);
            let right = b.summary.total_cost.parse::<Decimal>().unwrap_or(Decimal::ZERO);
            right.cmp(&left)
        });
        for (rank, entry) in entries.iter_mut().enumerate() {
            entry.rank = Some(rank + 1);
        }

        let with_data = entries.iter().filter(|e| e.summary.count > 0).count();
        let analyzed = entries.len();

        Ok(AllScorecardsCosts {
            mode: "all_scorecards",
            total_scorecards_analyzed: analyzed,
            total_scorecards_with_data: with_data,
            total_scorecards_without_data: analyzed - with_data,
            date_range: DateRange::from(window),
            window: WindowEcho { hours: base_request.hours, days: base_request.days },
            scorecards: entries,
            message: "Analyzed costs across all scorecards (sorted by total cost desc by default)."
                .to_string(),
        })
    }
}

fn error_feedback_entry(
    scorecard: &crate::models::Scorecard,
    error: String,
) -> ScorecardFeedbackEntry {
    ScorecardFeedbackEntry {
        scorecard_id: scorecard.id.clone(),
        scorecard_name: scorecard.display_name().to_string(),
        scorecard_external_id: scorecard.external_id.clone(),
        rank: None,
        outcome: FeedbackOutcome::Error {
            overall_ac1: None,
            total_items: 0,
            error,
            scores: Vec::new(),
        },
    }
}

fn error_cost_entry(
    scorecard: &crate::models::Scorecard,
    error: String,
    window: WindowEcho,
) -> ScorecardCostEntry {
    ScorecardCostEntry {
        scorecard_id: scorecard.id.clone(),
        scorecard_name: scorecard.display_name().to_string(),
        scorecard_external_id: scorecard.external_id.clone(),
        rank: None,
        error: Some(error),
        summary: CostPick {
            average_cost: "0".to_string(),
            count: 0,
            total_cost: "0".to_string(),
            average_calls: "0".to_string(),
        },
        item_analysis: super::costs::ItemAnalysis {
            count: 0,
            total_cost: 0.0,
            average_cost: 0.0,
            average_calls: 0.0,
        },
        groups: Vec::new(),
        window,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_concurrency() {
        assert_eq!(clamp_concurrency(None, 4), 4);
        assert_eq!(clamp_concurrency(Some(0), 4), 1);
        assert_eq!(clamp_concurrency(Some(99), 4), MAX_CONCURRENCY);
        assert_eq!(clamp_concurrency(Some(8), 4), 8);
    }
}
