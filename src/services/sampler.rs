//! Edit-comment prioritization and confusion-cell sampling.
//!
//! Items carrying reviewer edit commentary teach more than commentless
//! ones, so whenever a limit forces a choice, commented items fill slots
//! first. Selection within each group is shuffled, so results are
//! deterministic in size but stochastic in membership.

use rand::seq::SliceRandom;

use crate::models::FeedbackItem;
use crate::utils::group_by;

/// Apply a limit with edit-comment priority.
///
/// With `prioritize` off the whole population is shuffled and truncated.
/// With it on: all commented items fit -> shuffled commented items first,
/// then shuffled commentless fill; otherwise a shuffled sample of the
/// commented items alone.
pub fn prioritize_edit_comments(
    items: Vec<FeedbackItem>,
    limit: Option<usize>,
    prioritize: bool,
) -> Vec<FeedbackItem> {
    let Some(limit) = limit else {
        return items;
    };
    if items.len() <= limit {
        return items;
    }

    let mut rng = rand::thread_rng();

    if !prioritize {
        let mut shuffled = items;
        shuffled.shuffle(&mut rng);
        shuffled.truncate(limit);
        return shuffled;
    }

    let (mut with_comments, mut without_comments): (Vec<_>, Vec<_>) =
        items.into_iter().partition(FeedbackItem::has_edit_comment);

    with_comments.shuffle(&mut rng);
    without_comments.shuffle(&mut rng);

    if with_comments.len() >= limit {
        with_comments.truncate(limit);
        return with_comments;
    }

    let remaining = limit - with_comments.len();
    with_comments.extend(without_comments.into_iter().take(remaining));
    with_comments
}

/// Stratified sampling over the confusion matrix of a feedback population.
///
/// Items are partitioned by their `(initial, final)` answer pair; each cell
/// is capped at `limit_per_cell` with edit-comment priority, then the
/// concatenation is capped at `limit` under the same rule. Items missing
/// either answer never enter a cell.
pub fn sample_confusion_cells(
    items: Vec<FeedbackItem>,
    limit_per_cell: Option<usize>,
    limit: Option<usize>,
) -> Vec<FeedbackItem> {
    let usable: Vec<FeedbackItem> = items
        .into_iter()
        .filter(|item| item.answer_pair().is_some())
        .collect();

    let cells = group_by(usable, |item| {
        let (initial, r#final) = item.answer_pair().expect("filtered above");
        (initial.to_string(), r#final.to_string())
    });

    tracing::debug!("Sampling from {} confusion matrix cells", cells.len());

    let mut sampled = Vec::new();
    for ((initial, r#final), cell_items) in cells {
        let before = cell_items.len();
        let cell_sample = prioritize_edit_comments(cell_items, limit_per_cell, true);
        tracing::debug!(
            "Cell ({}, {}): sampled {} of {} items",
            initial,
            r#final,
            cell_sample.len(),
            before
        );
        sampled.extend(cell_sample);
    }

    prioritize_edit_comments(sampled, limit, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, initial: &str, r#final: &str, edit_comment: Option<&str>) -> FeedbackItem {
        FeedbackItem {
            id: id.into(),
            initial_answer_value: Some(initial.into()),
            final_answer_value: Some(r#final.into()),
            edit_comment_value: edit_comment.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_limit_returns_everything() {
        let items = vec![item("1", "Yes", "Yes", None), item("2", "No", "No", None)];
        let result = prioritize_edit_comments(items.clone(), None, true);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_under_limit_returns_everything_in_order() {
        let items = vec![item("1", "Yes", "Yes", None), item("2", "No", "No", None)];
        let result = prioritize_edit_comments(items.clone(), Some(5), true);
        assert_eq!(result, items);
    }

    #[test]
    fn test_all_commented_items_kept_when_they_fit() {
        // Invariant: with |W| <= limit, every commented item appears
        let mut items: Vec<FeedbackItem> = (0..20)
            .map(|i| item(&format!("plain-{}", i), "Yes", "No", None))
            .collect();
        items.push(item("w-1", "Yes", "No", Some("note one")));
        items.push(item("w-2", "Yes", "No", Some("note two")));

        let result = prioritize_edit_comments(items, Some(5), true);
        assert_eq!(result.len(), 5);
        let ids: Vec<&str> = result.iter().map(|i| i.id.as_str()).collect();
        assert!(ids.contains(&"w-1"));
        assert!(ids.contains(&"w-2"));
    }

    #[test]
    fn test_commented_overflow_samples_only_commented() {
        let items: Vec<FeedbackItem> = (0..10)
            .map(|i| item(&format!("w-{}", i), "Yes", "No", Some("note")))
            .chain((0..10).map(|i| item(&format!("plain-{}", i), "Yes", "No", None)))
            .collect();

        let result = prioritize_edit_comments(items, Some(4), true);
        assert_eq!(result.len(), 4);
        assert!(result.iter().all(FeedbackItem::has_edit_comment));
    }

    #[test]
    fn test_unprioritized_limit_is_plain_sample() {
        let items: Vec<FeedbackItem> = (0..10)
            .map(|i| item(&format!("x-{}", i), "Yes", "No", None))
            .collect();
        let result = prioritize_edit_comments(items, Some(3), false);
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_per_cell_caps() {
        // 15 items across three (initial, final) cells with limit_per_cell=2
        let mut items = Vec::new();
        for i in 0..5 {
            items.push(item(&format!("aa-{}", i), "A", "A", None));
            items.push(item(&format!("ab-{}", i), "A", "B", (i == 0).then_some("note")));
            items.push(item(&format!("cc-{}", i), "C", "C", None));
        }

        let result = sample_confusion_cells(items, Some(2), None);
        assert_eq!(result.len(), 6);

        // Cell (A,B) had one commented item; it must survive the cap
        assert!(result.iter().any(|i| i.id == "ab-0"));
    }

    #[test]
    fn test_global_cap_after_cell_caps() {
        let items: Vec<FeedbackItem> = (0..12)
            .map(|i| item(&format!("x-{}", i), "A", "B", (i < 3).then_some("note")))
            .collect();
        let result = sample_confusion_cells(items, Some(8), Some(4));
        assert_eq!(result.len(), 4);
        // The three commented items all fit within the global cap
        let commented = result.iter().filter(|i| i.has_edit_comment()).count();
        assert_eq!(commented, 3);
    }

    #[test]
    fn test_items_missing_answers_excluded_from_cells() {
        let mut incomplete = item("no-final", "Yes", "Yes", None);
        incomplete.final_answer_value = None;
        let items = vec![incomplete, item("ok", "Yes", "Yes", None)];
        let result = sample_confusion_cells(items, None, None);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "ok");
    }
}
