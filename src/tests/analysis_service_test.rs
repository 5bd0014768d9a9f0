use std::sync::Arc;

use super::common::{
    ACCOUNT, FeedbackFixture, MockDataClient, feedback_fixture, score_fixture, scorecard_fixture,
};
use crate::services::AnalysisService;
use crate::utils::TimeWindow;

/// 10 reviews, all final answers "Yes": 7 agreements plus 3 corrected from
/// "No". The balanced-binary reference scenario.
fn seed_binary_population(client: &MockDataClient, scorecard_id: &str, score_id: &str) {
    for i in 0..7 {
        client.add_feedback(feedback_fixture(FeedbackFixture {
            id: Box::leak(format!("{}-agree-{}", score_id, i).into_boxed_str()),
            scorecard_id: Box::leak(scorecard_id.to_string().into_boxed_str()),
            score_id: Box::leak(score_id.to_string().into_boxed_str()),
            initial: Some("Yes"),
            r#final: Some("Yes"),
            ..Default::default()
        }));
    }
    for i in 0..3 {
        client.add_feedback(feedback_fixture(FeedbackFixture {
            id: Box::leak(format!("{}-corrected-{}", score_id, i).into_boxed_str()),
            scorecard_id: Box::leak(scorecard_id.to_string().into_boxed_str()),
            score_id: Box::leak(score_id.to_string().into_boxed_str()),
            initial: Some("No"),
            r#final: Some("Yes"),
            ..Default::default()
        }));
    }
}

#[tokio::test]
async fn test_single_score_summary_balanced_binary() {
    let client = Arc::new(MockDataClient::new());
    let scorecard = scorecard_fixture("sc-1", "QA", vec![score_fixture("s-1", "Greeting", "101")]);
    client.add_scorecard(scorecard.clone());
    seed_binary_population(&client, "sc-1", "s-1");

    let service = AnalysisService::new(client);
    let score = score_fixture("s-1", "Greeting", "101");
    let result = service
        .summarize_score(ACCOUNT, &scorecard, &score, &TimeWindow::last_days(14))
        .await
        .unwrap();

    let analysis = &result.analysis;
    assert_eq!(analysis.total_items, 10);
    assert_eq!(analysis.agreements, 7);
    assert_eq!(analysis.disagreements, 3);
    assert_eq!(analysis.accuracy, Some(70.0));
    assert_eq!(analysis.agreements + analysis.disagreements, analysis.total_items);

    let matrix = analysis.confusion_matrix.as_ref().unwrap();
    assert_eq!(matrix.labels, vec!["No", "Yes"]);
    // Row sums equal the final-value distribution
    let row_sums = matrix.row_sums();
    assert_eq!(row_sums.get("Yes"), Some(&10));
    // Column sums equal the initial-value distribution
    let col_sums = matrix.column_sums();
    assert_eq!(col_sums.get("Yes"), Some(&7));
    assert_eq!(col_sums.get("No"), Some(&3));

    let ac1 = analysis.ac1.unwrap();
    assert!(ac1 > 0.0 && ac1 <= 1.0);

    // All final values are "Yes"
    assert_eq!(analysis.warning.as_deref(), Some("Single class (Yes)"));

    assert_eq!(result.context.scorecard_name, "QA");
    assert_eq!(result.context.score_name, "Greeting");
    assert_eq!(result.context.total_found, 10);
    assert!(!result.recommendation.is_empty());
}

#[tokio::test]
async fn test_pairs_with_missing_answers_are_excluded() {
    let client = Arc::new(MockDataClient::new());
    let scorecard = scorecard_fixture("sc-1", "QA", vec![score_fixture("s-1", "Greeting", "101")]);
    client.add_scorecard(scorecard.clone());
    client.add_feedback(feedback_fixture(FeedbackFixture {
        id: "fb-full",
        initial: Some("Yes"),
        r#final: Some("Yes"),
        ..Default::default()
    }));
    client.add_feedback(feedback_fixture(FeedbackFixture {
        id: "fb-no-final",
        initial: Some("Yes"),
        r#final: None,
        ..Default::default()
    }));

    let service = AnalysisService::new(client);
    let score = score_fixture("s-1", "Greeting", "101");
    let result = service
        .summarize_score(ACCOUNT, &scorecard, &score, &TimeWindow::last_days(14))
        .await
        .unwrap();

    assert_eq!(result.analysis.total_items, 1);
}

#[tokio::test]
async fn test_empty_population_summary() {
    let client = Arc::new(MockDataClient::new());
    let scorecard = scorecard_fixture("sc-1", "QA", vec![score_fixture("s-1", "Greeting", "101")]);
    client.add_scorecard(scorecard.clone());

    let service = AnalysisService::new(client);
    let score = score_fixture("s-1", "Greeting", "101");
    let result = service
        .summarize_score(ACCOUNT, &scorecard, &score, &TimeWindow::last_days(14))
        .await
        .unwrap();

    assert_eq!(result.analysis.total_items, 0);
    assert_eq!(result.analysis.ac1, None);
    assert_eq!(result.analysis.warning.as_deref(), Some("No feedback items found"));
    assert_eq!(
        result.recommendation,
        "No feedback data available. No further analysis possible."
    );
}

#[tokio::test]
async fn test_scorecard_summary_covers_all_scores() {
    let client = Arc::new(MockDataClient::new());
    let scorecard = scorecard_fixture(
        "sc-1",
        "QA",
        vec![
            score_fixture("s-1", "Greeting", "101"),
            score_fixture("s-2", "Closing", "102"),
            score_fixture("s-3", "Empty Score", "103"),
        ],
    );
    client.add_scorecard(scorecard.clone());
    seed_binary_population(&client, "sc-1", "s-1");
    // s-2 gets perfect two-class agreement
    for (i, label) in ["Yes", "No", "Yes", "No"].iter().enumerate() {
        client.add_feedback(feedback_fixture(FeedbackFixture {
            id: Box::leak(format!("s2-{}", i).into_boxed_str()),
            score_id: "s-2",
            initial: Some(label),
            r#final: Some(label),
            ..Default::default()
        }));
    }
    // s-3 has no feedback at all

    let service = AnalysisService::new(client);
    let summary = service
        .summarize_scorecard(ACCOUNT, &scorecard, None, &TimeWindow::last_days(14))
        .await
        .unwrap();

    assert_eq!(summary.scores.len(), 3);
    assert_eq!(summary.total_feedback_items_retrieved, 14);
    assert_eq!(summary.total_items, 14);
    assert_eq!(summary.total_agreements + summary.total_mismatches, summary.total_items);

    let empty_entry = summary.scores.iter().find(|s| s.score_id == "s-3").unwrap();
    assert_eq!(empty_entry.analysis.warning.as_deref(), Some("No data."));
    assert_eq!(
        empty_entry.message.as_deref(),
        Some("No feedback items found in the specified date range.")
    );

    let perfect = summary.scores.iter().find(|s| s.score_id == "s-2").unwrap();
    assert_eq!(perfect.analysis.accuracy, Some(100.0));
    assert!((perfect.analysis.ac1.unwrap() - 1.0).abs() < 1e-9);

    assert_eq!(summary.message, "Processed 3 score(s).");
    // s-1 single class + s-3 no data -> two warning kinds
    assert_eq!(
        summary.warning.as_deref(),
        Some("2 scores with single class and no data.")
    );
}

#[tokio::test]
async fn test_scorecard_summary_without_scores() {
    let client = Arc::new(MockDataClient::new());
    let scorecard = scorecard_fixture("sc-1", "QA", vec![]);
    client.add_scorecard(scorecard.clone());

    let service = AnalysisService::new(client);
    let summary = service
        .summarize_scorecard(ACCOUNT, &scorecard, None, &TimeWindow::last_days(14))
        .await
        .unwrap();

    assert!(summary.scores.is_empty());
    assert_eq!(summary.total_items, 0);
    assert_eq!(summary.message, "No scores identified for analysis.");
}
