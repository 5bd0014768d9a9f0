pub mod analysis;
pub mod api;
pub mod costs;
pub mod dataset;
pub mod fanout;
pub mod feedback_finder;
pub mod feedback_query;
pub mod item_upsert;
pub mod metrics;
pub mod resolver;
pub mod sampler;

pub use analysis::{
    AnalysisService, ScoreSummary, ScorecardSummary, SummaryAnalysis, SummaryResult,
    generate_recommendation, generate_summary_warning,
};
pub use api::{
    DataClient, FeedbackIndexQuery, FeedbackItemInput, GraphQlClient, IdentifierInput, ItemInput,
    Page, ScoreResultScope,
};
pub use costs::{
    CostAnalysis, CostAnalyzer, CostReport, CostRequest, CostSummary, GroupBy, build_cost_report,
    default_group_by,
};
pub use dataset::{DatasetBuilder, DatasetRequest, IdentifierExtractor, determine_score_comment};
pub use fanout::{
    AllScorecardsCosts, AllScorecardsFeedback, DEFAULT_CONCURRENCY, DEFAULT_FEEDBACK_CONCURRENCY,
    MAX_CONCURRENCY, ScorecardFanOut,
};
pub use feedback_finder::{
    FeedbackFinder, FeedbackItemSummary, FindRequest, SearchContext, SearchResult,
    empty_search_message,
};
pub use feedback_query::FeedbackQuery;
pub use item_upsert::{
    IdentifierHandle, IdentifierSet, ItemUpsertRequest, ItemUpserter, UpsertOutcome,
};
pub use resolver::{resolve_score, resolve_scorecard};
