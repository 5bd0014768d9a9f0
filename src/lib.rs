//! Concord Library
//!
//! Feedback alignment analytics over a remote review data service:
//! agreement summaries (confusion matrix, accuracy, Gwet's AC1), feedback
//! search with edit-comment prioritization, cost aggregation, and stratified
//! training-dataset construction.

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::Config;
pub use services::{
    AnalysisService, CostAnalyzer, DataClient, DatasetBuilder, FeedbackFinder, GraphQlClient,
    ItemUpserter, ScorecardFanOut,
};
pub use utils::{ApiError, ApiResult, OutputFormat, TimeWindow};
