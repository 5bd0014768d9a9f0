use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Duration;

use super::common::{ACCOUNT, FeedbackFixture, MockDataClient, feedback_fixture, ts};
use crate::services::FeedbackQuery;
use crate::utils::TimeWindow;

fn seeded_client(count: usize) -> Arc<MockDataClient> {
    let client = Arc::new(MockDataClient::new());
    for i in 0..count {
        client.add_feedback(feedback_fixture(FeedbackFixture {
            id: Box::leak(format!("fb-{}", i).into_boxed_str()),
            days_ago: 1,
            ..Default::default()
        }));
    }
    client
}

#[tokio::test]
async fn test_index_query_paginates_to_exhaustion() {
    let client = seeded_client(5);
    let query = FeedbackQuery::new(client.clone());

    let items = query
        .list_feedback(ACCOUNT, "sc-1", "s-1", &TimeWindow::last_days(7), Some(2), None)
        .await
        .unwrap();

    assert_eq!(items.len(), 5);
    // 5 items at page size 2 -> 3 pages
    assert_eq!(client.feedback_pages.load(Ordering::SeqCst), 3);
    assert_eq!(client.fallback_pages.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_caller_cap_stops_pagination() {
    let client = seeded_client(10);
    let query = FeedbackQuery::new(client.clone());

    let items = query
        .list_feedback(ACCOUNT, "sc-1", "s-1", &TimeWindow::last_days(7), Some(3), Some(4))
        .await
        .unwrap();

    assert_eq!(items.len(), 4);
    assert!(client.feedback_pages.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_schema_mismatch_falls_back_to_filtered_list() {
    let client = seeded_client(4);
    client.fail_index_query.store(true, Ordering::SeqCst);
    let query = FeedbackQuery::new(client.clone());

    let items = query
        .list_feedback(ACCOUNT, "sc-1", "s-1", &TimeWindow::last_days(7), None, None)
        .await
        .unwrap();

    // The fallback still delivers every record
    assert_eq!(items.len(), 4);
    assert!(client.fallback_pages.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_window_excludes_old_records() {
    let client = seeded_client(3);
    client.add_feedback(feedback_fixture(FeedbackFixture {
        id: "fb-old",
        days_ago: 90,
        ..Default::default()
    }));
    let query = FeedbackQuery::new(client);

    let items = query
        .list_feedback(ACCOUNT, "sc-1", "s-1", &TimeWindow::last_days(7), None, None)
        .await
        .unwrap();

    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|fb| fb.id != "fb-old"));
}

#[tokio::test]
async fn test_index_order_is_updated_at_descending() {
    let client = Arc::new(MockDataClient::new());
    for (id, days_ago) in [("fb-a", 3), ("fb-b", 1), ("fb-c", 2)] {
        client.add_feedback(feedback_fixture(FeedbackFixture {
            id,
            days_ago,
            ..Default::default()
        }));
    }
    let query = FeedbackQuery::new(client);

    let items = query
        .list_feedback(ACCOUNT, "sc-1", "s-1", &TimeWindow::last_days(7), None, None)
        .await
        .unwrap();

    let ids: Vec<&str> = items.iter().map(|fb| fb.id.as_str()).collect();
    assert_eq!(ids, vec!["fb-b", "fb-c", "fb-a"]);
}

#[tokio::test]
async fn test_composite_key_duplicates_pick_most_recent() {
    let client = Arc::new(MockDataClient::new());
    let mut older = feedback_fixture(FeedbackFixture {
        id: "fb-old",
        ..Default::default()
    });
    older.cache_key = Some("s-1:777".into());
    older.updated_at = Some(ts(5));
    older.final_answer_value = Some("No".into());
    let mut newer = feedback_fixture(FeedbackFixture {
        id: "fb-new",
        ..Default::default()
    });
    newer.cache_key = Some("s-1:777".into());
    newer.updated_at = Some(ts(5) + Duration::hours(6));
    newer.final_answer_value = Some("Yes".into());
    client.add_feedback(older);
    client.add_feedback(newer);

    let query = FeedbackQuery::new(client);
    let winner = query
        .get_by_composite_key(ACCOUNT, "sc-1", "s-1", "s-1:777")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(winner.id, "fb-new");
    assert_eq!(winner.final_answer_value.as_deref(), Some("Yes"));
}

#[tokio::test]
async fn test_upsert_by_cache_key_creates_then_updates() {
    let client = Arc::new(MockDataClient::new());
    let query = FeedbackQuery::new(client.clone());

    let input = crate::services::FeedbackItemInput {
        account_id: ACCOUNT.into(),
        scorecard_id: "sc-1".into(),
        score_id: "s-1".into(),
        cache_key: "s-1:777".into(),
        initial_answer_value: Some("Yes".into()),
        final_answer_value: Some("No".into()),
        ..Default::default()
    };

    let (created, was_created) = query.upsert_by_cache_key(input.clone()).await.unwrap();
    assert!(was_created);
    assert_eq!(created.cache_key.as_deref(), Some("s-1:777"));

    // Same cache key updates in place; unset fields survive
    let mut second = input;
    second.final_answer_value = Some("Yes".into());
    second.initial_answer_value = None;
    let (updated, was_created) = query.upsert_by_cache_key(second).await.unwrap();

    assert!(!was_created);
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.final_answer_value.as_deref(), Some("Yes"));
    assert_eq!(updated.initial_answer_value.as_deref(), Some("Yes"));
    assert_eq!(client.feedback.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_by_ids_skips_missing() {
    let client = seeded_client(2);
    let query = FeedbackQuery::new(client);

    let found = query
        .get_feedback_items_by_ids(&[
            "fb-0".to_string(),
            "fb-missing".to_string(),
            "fb-1".to_string(),
        ])
        .await;

    let ids: Vec<&str> = found.iter().map(|fb| fb.id.as_str()).collect();
    assert_eq!(ids, vec!["fb-0", "fb-1"]);
}
