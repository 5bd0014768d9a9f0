//! Cost aggregation over score results.
//!
//! Loads score results for a time window through the narrowest available
//! index (score, scorecard, or account scope), keeps a single-entry
//! parameter cache so repeated identical analyses skip the remote
//! pagination, and computes headline, grouped, and five-number-summary
//! statistics. All money math is fixed decimal; outputs serialize decimals
//! as strings.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::MathematicalOps;
use serde::Serialize;

use super::api::{DataClient, ScoreResultScope};
use crate::models::{CostBundle, ScoreResult};
use crate::utils::{ApiError, ApiResult, TimeWindow};

/// Page size for score result index queries.
const RESULT_PAGE_SIZE: usize = 1000;

/// Grouping dimension for cost analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Scorecard,
    Score,
    ScorecardScore,
}

impl std::str::FromStr for GroupBy {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scorecard" => Ok(GroupBy::Scorecard),
            "score" => Ok(GroupBy::Score),
            "scorecard_score" => Ok(GroupBy::ScorecardScore),
            other => Err(ApiError::validation(format!("unknown group_by: {}", other))),
        }
    }
}

/// Parameters for one cost analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRequest {
    pub account_id: String,
    pub days: i64,
    pub hours: Option<i64>,
    pub scorecard_id: Option<String>,
    pub score_id: Option<String>,
    /// Explicit window override; bypasses the parameter cache.
    pub window: Option<TimeWindow>,
    /// Cap on fetched results; partially fetched data is never cached.
    pub max_items: Option<usize>,
}

impl CostRequest {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            days: 7,
            hours: None,
            scorecard_id: None,
            score_id: None,
            window: None,
            max_items: None,
        }
    }

    fn effective_window(&self) -> TimeWindow {
        if let Some(window) = &self.window {
            return window.clone();
        }
        match self.hours {
            Some(hours) => TimeWindow::last_hours(hours),
            None => TimeWindow::last_days(self.days),
        }
    }

    fn scope(&self) -> ScoreResultScope {
        if let Some(score_id) = &self.score_id {
            ScoreResultScope::Score(score_id.clone())
        } else if let Some(scorecard_id) = &self.scorecard_id {
            ScoreResultScope::Scorecard(scorecard_id.clone())
        } else {
            ScoreResultScope::Account(self.account_id.clone())
        }
    }

    fn cache_key(&self) -> CacheKey {
        CacheKey {
            account_id: self.account_id.clone(),
            days: self.days,
            hours: self.hours,
            scorecard_id: self.scorecard_id.clone(),
            score_id: self.score_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    account_id: String,
    days: i64,
    hours: Option<i64>,
    scorecard_id: Option<String>,
    score_id: Option<String>,
}

struct CacheEntry {
    key: CacheKey,
    results: Vec<ScoreResult>,
}

/// Accumulated totals over one group of cost-bearing results.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CostGroupTotals {
    pub count: usize,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub cached_tokens: i64,
    pub llm_calls: i64,
    // Decimals serialize as strings
    pub input_cost: Decimal,
    pub output_cost: Decimal,
    pub total_cost: Decimal,
}

impl CostGroupTotals {
    fn add(&mut self, cost: &CostBundle) {
        self.count += 1;
        self.total_cost += cost.total_cost;
        self.input_cost += cost.input_cost;
        self.output_cost += cost.output_cost;
        self.prompt_tokens += cost.prompt_tokens;
        self.completion_tokens += cost.completion_tokens;
        self.cached_tokens += cost.cached_tokens;
        self.llm_calls += cost.llm_calls;
    }
}

/// Filter echo in cost documents.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CostFilters {
    #[serde(rename = "scorecardId")]
    pub scorecard_id: Option<String>,
    #[serde(rename = "scoreId")]
    pub score_id: Option<String>,
}

/// Per-(scorecard, score) totals document.
#[derive(Debug, Clone, Serialize)]
pub struct CostSummaryGroup {
    #[serde(rename = "scorecardId")]
    pub scorecard_id: String,
    #[serde(rename = "scoreId")]
    pub score_id: String,
    #[serde(rename = "scoreName")]
    pub score_name: Option<String>,
    #[serde(flatten)]
    pub totals: CostGroupTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostSummary {
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub days: i64,
    pub hours: Option<i64>,
    pub filters: CostFilters,
    pub totals: CostGroupTotals,
    pub groups: Vec<CostSummaryGroup>,
}

/// Five-number summary plus mean and population stddev over `total_cost`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CostStats {
    pub count: usize,
    pub total_cost: String,
    pub average_cost: String,
    pub stddev_cost: String,
    pub median_cost: String,
    pub q1_cost: String,
    pub q3_cost: String,
    pub iqr_cost: String,
    pub min_cost: String,
    pub max_cost: String,
}

/// The same distribution statistics over `llm_calls`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CallStats {
    pub total_calls: String,
    pub average_calls: String,
    pub stddev_calls: String,
    pub median_calls: String,
    pub q1_calls: String,
    pub q3_calls: String,
    pub iqr_calls: String,
    pub min_calls: String,
    pub max_calls: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Headline {
    #[serde(flatten)]
    pub costs: CostStats,
    #[serde(flatten)]
    pub calls: CallStats,
}

/// Group label of one analysis bucket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupKey {
    #[serde(rename = "scorecardId", skip_serializing_if = "Option::is_none")]
    pub scorecard_id: Option<String>,
    #[serde(rename = "scoreId", skip_serializing_if = "Option::is_none")]
    pub score_id: Option<String>,
    #[serde(rename = "scoreName", skip_serializing_if = "Option::is_none")]
    pub score_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostAnalysisGroup {
    pub group: GroupKey,
    #[serde(flatten)]
    pub costs: CostStats,
    #[serde(flatten)]
    pub calls: CallStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostAnalysis {
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub days: i64,
    pub hours: Option<i64>,
    pub filters: CostFilters,
    pub headline: Headline,
    pub groups: Vec<CostAnalysisGroup>,
    #[serde(rename = "scoreNameIndex")]
    pub score_name_index: BTreeMap<String, String>,
}

/// Item-level rollup: distinct cost-bearing items and per-item averages.
/// Results without an `itemId` are excluded from the distinct count.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemAnalysis {
    pub count: usize,
    pub total_cost: f64,
    pub average_cost: f64,
    pub average_calls: f64,
}

pub struct CostAnalyzer {
    client: Arc<dyn DataClient>,
    cache: Mutex<Option<CacheEntry>>,
}

impl CostAnalyzer {
    pub fn new(client: Arc<dyn DataClient>) -> Self {
        Self { client, cache: Mutex::new(None) }
    }

    pub fn clear_cache(&self) {
        if let Ok(mut guard) = self.cache.lock() {
            *guard = None;
        }
    }

    /// Load score results for the request, consulting the single-entry
    /// parameter cache. Explicit windows and capped loads bypass the cache
    /// so partial data never poisons it.
    async fn load(&self, request: &CostRequest) -> ApiResult<Vec<ScoreResult>> {
        let cacheable = request.window.is_none() && request.max_items.is_none();
        let key = request.cache_key();

        if cacheable
            && let Ok(guard) = self.cache.lock()
            && let Some(entry) = guard.as_ref()
            && entry.key == key
        {
            tracing::debug!("Cost cache hit for account {}", request.account_id);
            return Ok(entry.results.clone());
        }

        let window = request.effective_window();
        let scope = request.scope();
        let mut results = Vec::new();
        let mut next_token = None;

        loop {
            let page = self
                .client
                .query_score_results_page(&scope, &window, RESULT_PAGE_SIZE, next_token)
                .await?;
            results.extend(page.items);

            if let Some(cap) = request.max_items
                && results.len() >= cap
            {
                results.truncate(cap);
                break;
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        tracing::info!("Loaded {} score results for cost analysis", results.len());

        if cacheable
            && let Ok(mut guard) = self.cache.lock()
        {
            *guard = Some(CacheEntry { key, results: results.clone() });
        }

        Ok(results)
    }

    /// Raw cost-bearing view of the loaded results (for item analysis).
    pub async fn list_raw(&self, request: &CostRequest) -> ApiResult<Vec<ScoreResult>> {
        self.load(request).await
    }

    /// Aggregate totals overall and per (scorecard, score) pair.
    pub async fn summarize(&self, request: &CostRequest) -> ApiResult<CostSummary> {
        let results = self.load(request).await?;

        let mut totals = CostGroupTotals::default();
        let mut groups: BTreeMap<(String, String), CostGroupTotals> = BTreeMap::new();
        let mut names: BTreeMap<(String, String), String> = BTreeMap::new();

        for result in &results {
            let Some(cost) = result.cost_bundle() else { continue };
            let key = (
                result.scorecard_id.clone().unwrap_or_default(),
                result.score_id.clone().unwrap_or_default(),
            );
            groups.entry(key.clone()).or_default().add(&cost);
            totals.add(&cost);
            if let Some(name) = result.score.as_ref().and_then(|s| s.name.clone()) {
                names.entry(key).or_insert(name);
            }
        }

        let group_list = groups
            .into_iter()
            .map(|((scorecard_id, score_id), group_totals)| CostSummaryGroup {
                score_name: names.get(&(scorecard_id.clone(), score_id.clone())).cloned(),
                scorecard_id,
                score_id,
                totals: group_totals,
            })
            .collect();

        Ok(CostSummary {
            account_id: request.account_id.clone(),
            days: request.days,
            hours: request.hours,
            filters: CostFilters {
                scorecard_id: request.scorecard_id.clone(),
                score_id: request.score_id.clone(),
            },
            totals,
            groups: group_list,
        })
    }

    /// Compute headline and box-plot-friendly metrics, optionally grouped.
    pub async fn analyze(
        &self,
        request: &CostRequest,
        group_by: Option<GroupBy>,
    ) -> ApiResult<CostAnalysis> {
        let results = self.load(request).await?;

        let mut overall_costs: Vec<Decimal> = Vec::new();
        let mut overall_calls: Vec<Decimal> = Vec::new();
        let mut grouped: BTreeMap<(Option<String>, Option<String>), (Vec<Decimal>, Vec<Decimal>)> =
            BTreeMap::new();
        let mut score_name_index: BTreeMap<String, String> = BTreeMap::new();

        for result in &results {
            let Some(cost) = result.cost_bundle() else { continue };
            let total = cost.total_cost;
            let calls = Decimal::from(cost.llm_calls);
            overall_costs.push(total);
            overall_calls.push(calls);

            let scorecard_id = result.scorecard_id.clone();
            let score_id = result.score_id.clone();
            if let (Some(sid), Some(name)) = (
                score_id.as_ref(),
                result.score.as_ref().and_then(|s| s.name.as_ref()),
            ) {
                score_name_index
                    .entry(sid.clone())
                    .or_insert_with(|| name.clone());
            }

            let group_key = match group_by {
                Some(GroupBy::Scorecard) => Some((scorecard_id, None)),
                Some(GroupBy::Score) => Some((None, score_id)),
                Some(GroupBy::ScorecardScore) => Some((scorecard_id, score_id)),
                None => None,
            };
            if let Some(key) = group_key {
                let bucket = grouped.entry(key).or_default();
                bucket.0.push(total);
                bucket.1.push(calls);
            }
        }

        let headline = Headline {
            costs: build_cost_stats(&overall_costs),
            calls: build_call_stats(&overall_calls),
        };

        let groups = grouped
            .into_iter()
            .map(|((scorecard_id, score_id), (costs, calls))| CostAnalysisGroup {
                group: GroupKey {
                    score_name: score_id
                        .as_ref()
                        .and_then(|sid| score_name_index.get(sid).cloned()),
                    scorecard_id,
                    score_id,
                },
                costs: build_cost_stats(&costs),
                calls: build_call_stats(&calls),
            })
            .collect();

        Ok(CostAnalysis {
            account_id: request.account_id.clone(),
            days: request.days,
            hours: request.hours,
            filters: CostFilters {
                scorecard_id: request.scorecard_id.clone(),
                score_id: request.score_id.clone(),
            },
            headline,
            groups,
            score_name_index,
        })
    }
}

/// Distinct-item rollup over cost-bearing results.
pub fn item_analysis(
    results: &[ScoreResult],
    total_cost: Decimal,
    total_calls: Decimal,
) -> ItemAnalysis {
    let mut item_ids = std::collections::BTreeSet::new();
    for result in results {
        if result.cost_bundle().is_some()
            && let Some(item_id) = &result.item_id
        {
            item_ids.insert(item_id.clone());
        }
    }

    let count = item_ids.len();
    let divisor = Decimal::from(count.max(1));
    let (avg_cost, avg_calls) = if count == 0 {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        (total_cost / divisor, total_calls / divisor)
    };

    ItemAnalysis {
        count,
        total_cost: total_cost.to_f64().unwrap_or(0.0),
        average_cost: avg_cost.to_f64().unwrap_or(0.0),
        average_calls: avg_calls.to_f64().unwrap_or(0.0),
    }
}

/// Median: exact middle, averaging the two central values for even counts.
fn median(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / Decimal::TWO
    }
}

/// Linear-interpolation percentile:
/// `q = sorted[f] * (c - k) + sorted[c] * (k - f)` with `k = (n-1) * p`,
/// `f = floor(k)`, `c = f + 1`, clipped to the last index.
pub fn percentile(values: &[Decimal], p: f64) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let n = sorted.len();
    let k = (n - 1) as f64 * p;
    let f = k.floor() as usize;
    let c = f + 1;
    if c >= n {
        return sorted[n - 1];
    }
    let upper_weight = Decimal::from_f64(k - f as f64).unwrap_or(Decimal::ZERO);
    let lower_weight = Decimal::ONE - upper_weight;
    sorted[f] * lower_weight + sorted[c] * upper_weight
}

/// Population standard deviation.
fn stddev(values: &[Decimal]) -> Decimal {
    let n = values.len();
    if n <= 1 {
        return Decimal::ZERO;
    }
    let count = Decimal::from(n);
    let mean = values.iter().copied().sum::<Decimal>() / count;
    let variance = values
        .iter()
        .map(|x| {
            let d = *x - mean;
            d * d
        })
        .sum::<Decimal>()
        / count;
    variance.sqrt().unwrap_or_else(|| {
        Decimal::from_f64(variance.to_f64().unwrap_or(0.0).sqrt()).unwrap_or(Decimal::ZERO)
    })
}

fn build_cost_stats(values: &[Decimal]) -> CostStats {
    let n = values.len();
    let total: Decimal = values.iter().copied().sum();
    let average = if n == 0 { Decimal::ZERO } else { total / Decimal::from(n) };
    let q1 = percentile(values, 0.25);
    let q3 = percentile(values, 0.75);
    CostStats {
        count: n,
        total_cost: total.to_string(),
        average_cost: average.to_string(),
        stddev_cost: stddev(values).to_string(),
        median_cost: median(values).to_string(),
        q1_cost: q1.to_string(),
        q3_cost: q3.to_string(),
        iqr_cost: (q3 - q1).to_string(),
        min_cost: values.iter().min().copied().unwrap_or(Decimal::ZERO).to_string(),
        max_cost: values.iter().max().copied().unwrap_or(Decimal::ZERO).to_string(),
    }
}

fn build_call_stats(values: &[Decimal]) -> CallStats {
    let n = values.len();
    let total: Decimal = values.iter().copied().sum();
    let average = if n == 0 { Decimal::ZERO } else { total / Decimal::from(n) };
    let q1 = percentile(values, 0.25);
    let q3 = percentile(values, 0.75);
    CallStats {
        total_calls: total.to_string(),
        average_calls: average.to_string(),
        stddev_calls: stddev(values).to_string(),
        median_calls: median(values).to_string(),
        q1_calls: q1.to_string(),
        q3_calls: q3.to_string(),
        iqr_calls: (q3 - q1).to_string(),
        min_calls: values.iter().min().copied().unwrap_or(Decimal::ZERO).to_string(),
        max_calls: values.iter().max().copied().unwrap_or(Decimal::ZERO).to_string(),
    }
}

/// Headline fields picked for compact summary displays.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CostPick {
    pub average_cost: String,
    pub count: usize,
    pub total_cost: String,
    pub average_calls: String,
}

pub fn pick_summary(costs: &CostStats, calls: &CallStats) -> CostPick {
    CostPick {
        average_cost: costs.average_cost.clone(),
        count: costs.count,
        total_cost: costs.total_cost.clone(),
        average_calls: calls.average_calls.clone(),
    }
}

/// Numeric five-number summary for chart consumers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DistributionNumbers {
    pub min_cost: f64,
    pub q1_cost: f64,
    pub median_cost: f64,
    pub q3_cost: f64,
    pub max_cost: f64,
}

fn stat_f64(raw: &str) -> f64 {
    raw.parse::<Decimal>()
        .ok()
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0)
}

pub fn distribution_numbers(costs: &CostStats) -> DistributionNumbers {
    DistributionNumbers {
        min_cost: stat_f64(&costs.min_cost),
        q1_cost: stat_f64(&costs.q1_cost),
        median_cost: stat_f64(&costs.median_cost),
        q3_cost: stat_f64(&costs.q3_cost),
        max_cost: stat_f64(&costs.max_cost),
    }
}

/// Time-window echo used in report documents.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WindowEcho {
    pub hours: Option<i64>,
    pub days: i64,
}

/// One breakdown row of a summary-mode report.
#[derive(Debug, Clone, Serialize)]
pub struct CostReportGroup {
    pub group: GroupKey,
    #[serde(flatten)]
    pub summary: CostPick,
    #[serde(flatten)]
    pub distribution: DistributionNumbers,
}

/// Summary-mode cost report document.
#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    #[serde(rename = "scorecardName")]
    pub scorecard_name: Option<String>,
    pub summary: CostPick,
    #[serde(rename = "itemAnalysis")]
    pub item_analysis: ItemAnalysis,
    pub window: WindowEcho,
    pub filters: CostFilters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<CostReportGroup>>,
}

/// Pick the default grouping for a breakdown when none was requested:
/// per-score at scorecard level, per-scorecard at account level, and no
/// further breakdown when already score-scoped.
pub fn default_group_by(request: &CostRequest, breakdown: bool) -> Option<GroupBy> {
    if !breakdown {
        return None;
    }
    match (&request.scorecard_id, &request.score_id) {
        (Some(_), None) => Some(GroupBy::Score),
        (None, None) => Some(GroupBy::Scorecard),
        _ => None,
    }
}

/// Shape an analysis into the summary-mode report, optionally with grouped
/// breakdown rows sorted by highest average cost.
pub fn build_cost_report(
    analysis: &CostAnalysis,
    raw_results: &[ScoreResult],
    scorecard_name: Option<String>,
    breakdown: bool,
) -> CostReport {
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

    let groups = if breakdown && !analysis.groups.is_empty() {
        let mut rows: Vec<CostReportGroup> = analysis
            .groups
            .iter()
            .map(|g| CostReportGroup {
                group: g.group.clone(),
                summary: pick_summary(&g.costs, &g.calls),
                distribution: distribution_numbers(&g.costs),
            })
            .collect();
        rows.sort_by(|a, b| {
            let left = a.summary.average_cost.parse::<Decimal>().unwrap_or(Decimal::ZERO);
            let right = b.summary.average_cost.parse::<Decimal>().unwrap_or(Decimal::ZERO);
            right.cmp(&left)
        });
        Some(rows)
    } else {
        None
    };

    CostReport {
        scorecard_name,
        summary: pick_summary(&analysis.headline.costs, &analysis.headline.calls),
        item_analysis: item_analysis(raw_results, total_cost, total_calls),
        window: WindowEcho { hours: analysis.hours, days: analysis.days },
        filters: analysis.filters.clone(),
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimals(values: &[&str]) -> Vec<Decimal> {
        values.iter().map(|v| v.parse().unwrap()).collect()
    }

    #[test]
    fn test_percentile_endpoints() {
        let values = decimals(&["1", "2", "3", "4", "5"]);
        assert_eq!(percentile(&values, 0.0), Decimal::from(1));
        assert_eq!(percentile(&values, 1.0), Decimal::from(5));
    }

    #[test]
    fn test_percentile_monotone_in_p() {
        let values = decimals(&["0.1", "0.7", "0.2", "0.9", "0.4"]);
        let mut last = percentile(&values, 0.0);
        for step in 1..=20 {
            let p = step as f64 / 20.0;
            let q = percentile(&values, p);
            assert!(q >= last, "percentile must be monotone in p");
            last = q;
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = decimals(&["1", "3"]);
        // k = 0.5, f = 0, c = 1 -> 1*0.5 + 3*0.5
        assert_eq!(percentile(&values, 0.5), Decimal::from(2));
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&decimals(&["3", "1", "2"])), Decimal::from(2));
        assert_eq!(
            median(&decimals(&["4", "1", "2", "3"])),
            decimals(&["2.5"])[0]
        );
        assert_eq!(median(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_stddev_population() {
        // Population stddev of [2, 4] is 1
        assert_eq!(stddev(&decimals(&["2", "4"])), Decimal::ONE);
        assert_eq!(stddev(&decimals(&["5"])), Decimal::ZERO);
    }

    #[test]
    fn test_build_stats_totals() {
        let stats = build_cost_stats(&decimals(&["0.10", "0.02"]));
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_cost, "0.12");
        assert_eq!(stats.min_cost, "0.02");
        assert_eq!(stats.max_cost, "0.10");
    }

    #[test]
    fn test_group_by_parse() {
        assert_eq!("scorecard".parse::<GroupBy>().unwrap(), GroupBy::Scorecard);
        assert_eq!("scorecard_score".parse::<GroupBy>().unwrap(), GroupBy::ScorecardScore);
        assert!("bogus".parse::<GroupBy>().is_err());
    }
}
