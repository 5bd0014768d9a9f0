//! Metrics kernel: pure, deterministic agreement statistics.
//!
//! Inputs are parallel label sequences: `reference` is the reviewer's final
//! answer (ground truth), `predictions` the AI's initial answer. Everything
//! here is synchronous and side-effect-free.

use std::collections::BTreeMap;

use crate::models::{ClassCount, ConfusionMatrix, ConfusionRow, ScoreAnalysis};

/// Tolerance for the class-balance check: every class count must be within
/// 20% of the uniform expectation.
const BALANCE_TOLERANCE: f64 = 0.2;

/// Build a confusion matrix over the sorted union of labels seen on either
/// side. Rows are actual (reference) classes, columns predicted classes.
pub fn confusion_matrix(reference: &[String], predictions: &[String]) -> ConfusionMatrix {
    let mut labels: Vec<String> = reference
        .iter()
        .chain(predictions.iter())
        .cloned()
        .collect();
    labels.sort();
    labels.dedup();

    let mut matrix = Vec::with_capacity(labels.len());
    for actual in &labels {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for predicted in &labels {
            let count = reference
                .iter()
                .zip(predictions.iter())
                .filter(|(r, p)| *r == actual && *p == predicted)
                .count();
            counts.insert(predicted.clone(), count);
        }
        matrix.push(ConfusionRow {
            actual_class_label: actual.clone(),
            predicted_class_counts: counts,
        });
    }

    ConfusionMatrix { labels, matrix }
}

/// Precision and recall as percentages.
///
/// With exactly two classes the first label in the provided class list is
/// treated as positive; with more, per-class values are macro-averaged with
/// an unweighted mean. Zero denominators contribute 0, never NaN.
pub fn precision_recall(
    reference: &[String],
    predictions: &[String],
    classes: &[String],
) -> (Option<f64>, Option<f64>) {
    if classes.is_empty() || reference.is_empty() {
        return (None, None);
    }

    let rate = |hits: usize, total: usize| -> f64 {
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    };

    let class_stats = |positive: &String| -> (f64, f64) {
        let true_positives = reference
            .iter()
            .zip(predictions.iter())
            .filter(|(r, p)| *r == positive && *p == positive)
            .count();
        let false_positives = reference
            .iter()
            .zip(predictions.iter())
            .filter(|(r, p)| *r != positive && *p == positive)
            .count();
        let false_negatives = reference
            .iter()
            .zip(predictions.iter())
            .filter(|(r, p)| *r == positive && *p != positive)
            .count();
        (
            rate(true_positives, true_positives + false_positives),
            rate(true_positives, true_positives + false_negatives),
        )
    };

    if classes.len() == 2 {
        let (precision, recall) = class_stats(&classes[0]);
        (Some(precision * 100.0), Some(recall * 100.0))
    } else {
        let stats: Vec<(f64, f64)> = classes.iter().map(class_stats).collect();
        let n = stats.len() as f64;
        let macro_precision = stats.iter().map(|(p, _)| p).sum::<f64>() / n;
        let macro_recall = stats.iter().map(|(_, r)| r).sum::<f64>() / n;
        (Some(macro_precision * 100.0), Some(macro_recall * 100.0))
    }
}

/// Gwet's AC1 chance-corrected agreement coefficient.
///
/// `AC1 = (p_a - p_e) / (1 - p_e)` with observed agreement `p_a` and chance
/// agreement `p_e = sum_k pi_k (1 - pi_k) / (K - 1)` over the K classes
/// present, where `pi_k` is the empirical marginal across both raters.
/// Returns None with fewer than two classes or no items.
pub fn gwet_ac1(reference: &[String], predictions: &[String]) -> Option<f64> {
    let n = reference.len().min(predictions.len());
    if n == 0 {
        return None;
    }

    let mut marginals: BTreeMap<&String, usize> = BTreeMap::new();
    for label in reference.iter().take(n).chain(predictions.iter().take(n)) {
        *marginals.entry(label).or_default() += 1;
    }
    let k = marginals.len();
    if k < 2 {
        return None;
    }

    let agreements = reference
        .iter()
        .zip(predictions.iter())
        .take(n)
        .filter(|(r, p)| r == p)
        .count();
    let p_a = agreements as f64 / n as f64;

    let two_n = (2 * n) as f64;
    let p_e: f64 = marginals
        .values()
        .map(|&count| {
            let pi = count as f64 / two_n;
            pi * (1.0 - pi)
        })
        .sum::<f64>()
        / (k as f64 - 1.0);

    Some((p_a - p_e) / (1.0 - p_e))
}

/// Count labels into a distribution.
pub fn distribution(values: &[String]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value.clone()).or_insert(0) += 1;
    }
    counts
}

/// Distribution formatted for display: count descending, label ascending on
/// ties so output is deterministic.
pub fn format_class_distribution(counts: &BTreeMap<String, usize>) -> Vec<ClassCount> {
    let mut formatted: Vec<ClassCount> = counts
        .iter()
        .map(|(label, count)| ClassCount { label: label.clone(), count: *count })
        .collect();
    formatted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    formatted
}

/// A distribution is balanced when every class count sits within 20% of the
/// uniform expectation. A single class is "balanced" here; the single-class
/// condition is reported separately.
pub fn is_balanced(counts: &BTreeMap<String, usize>) -> bool {
    if counts.len() <= 1 {
        return true;
    }
    let total: usize = counts.values().sum();
    let expected = total as f64 / counts.len() as f64;
    counts
        .values()
        .all(|&count| (count as f64 - expected).abs() <= expected * BALANCE_TOLERANCE)
}

/// Compose the distribution warnings for one analysis:
/// AC1 < 0, AC1 == 0, single class, imbalanced classes. Joined with "; ".
pub fn warnings_for(ac1: Option<f64>, final_counts: &BTreeMap<String, usize>) -> Option<String> {
    let mut warnings = Vec::new();

    if let Some(value) = ac1 {
        if value < 0.0 {
            warnings.push("Systematic disagreement".to_string());
        } else if value == 0.0 {
            warnings.push("Random chance agreement".to_string());
        }
    }

    if final_counts.len() == 1 {
        let label = final_counts.keys().next().expect("non-empty");
        warnings.push(format!("Single class ({})", label));
    } else if final_counts.len() > 1 && !is_balanced(final_counts) {
        warnings.push("Imbalanced classes".to_string());
    }

    if warnings.is_empty() { None } else { Some(warnings.join("; ")) }
}

/// Full agreement analysis over (initial, final) answer pairs.
///
/// Pairs with either side missing must be filtered out by the caller; this
/// function treats its input as the valid population.
pub fn analyze_pairs(pairs: &[(String, String)]) -> ScoreAnalysis {
    if pairs.is_empty() {
        return ScoreAnalysis::empty("No feedback items found");
    }

    let initial: Vec<String> = pairs.iter().map(|(i, _)| i.clone()).collect();
    let r#final: Vec<String> = pairs.iter().map(|(_, f)| f.clone()).collect();

    let total = pairs.len();
    let agreements = pairs.iter().filter(|(i, f)| i == f).count();
    let mismatches = total - agreements;
    let accuracy = agreements as f64 / total as f64 * 100.0;

    let final_counts = distribution(&r#final);
    let initial_counts = distribution(&initial);

    let ac1 = gwet_ac1(&r#final, &initial);
    let matrix = confusion_matrix(&r#final, &initial);
    let classes: Vec<String> = final_counts.keys().cloned().collect();
    let (precision, recall) = precision_recall(&r#final, &initial, &classes);
    let warning = warnings_for(ac1, &final_counts);

    ScoreAnalysis {
        ac1,
        accuracy: Some(accuracy),
        item_count: total,
        agreements,
        mismatches,
        class_distribution: format_class_distribution(&final_counts),
        predicted_class_distribution: format_class_distribution(&initial_counts),
        label_distribution: final_counts,
        confusion_matrix: Some(matrix),
        precision,
        recall,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(spec: &[(&str, &str, usize)]) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (initial, r#final, count) in spec {
            for _ in 0..*count {
                out.push((initial.to_string(), r#final.to_string()));
            }
        }
        out
    }

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_confusion_matrix_sums_match_distributions() {
        let reference = labels(&["Yes", "Yes", "No", "Yes"]);
        let predictions = labels(&["Yes", "No", "No", "Yes"]);
        let matrix = confusion_matrix(&reference, &predictions);

        assert_eq!(matrix.labels, vec!["No", "Yes"]);
        assert_eq!(matrix.row_sums(), distribution(&reference));
        assert_eq!(matrix.column_sums(), distribution(&predictions));
    }

    #[test]
    fn test_precision_recall_binary_first_label_positive() {
        // Positive class is "No" (first in sorted order)
        let reference = labels(&["No", "No", "Yes", "Yes"]);
        let predictions = labels(&["No", "Yes", "No", "Yes"]);
        let classes = labels(&["No", "Yes"]);
        let (precision, recall) = precision_recall(&reference, &predictions, &classes);
        // TP=1, FP=1, FN=1
        assert_eq!(precision, Some(50.0));
        assert_eq!(recall, Some(50.0));
    }

    #[test]
    fn test_precision_recall_zero_denominator_yields_zero() {
        // Positive class "A" never predicted: precision denominator is 0
        let reference = labels(&["A", "B"]);
        let predictions = labels(&["B", "B"]);
        let classes = labels(&["A", "B"]);
        let (precision, recall) = precision_recall(&reference, &predictions, &classes);
        assert_eq!(precision, Some(0.0));
        assert_eq!(recall, Some(0.0));
    }

    #[test]
    fn test_precision_recall_macro_average() {
        let reference = labels(&["A", "B", "C", "A", "B", "C"]);
        let predictions = labels(&["A", "B", "C", "A", "B", "C"]);
        let classes = labels(&["A", "B", "C"]);
        let (precision, recall) = precision_recall(&reference, &predictions, &classes);
        assert_eq!(precision, Some(100.0));
        assert_eq!(recall, Some(100.0));
    }

    #[test]
    fn test_ac1_perfect_agreement() {
        let reference = labels(&["Yes", "No", "Yes", "No"]);
        let ac1 = gwet_ac1(&reference, &reference).unwrap();
        assert!((ac1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ac1_single_class_is_none() {
        let reference = labels(&["Yes", "Yes", "Yes"]);
        assert_eq!(gwet_ac1(&reference, &reference), None);
    }

    #[test]
    fn test_ac1_within_bounds() {
        let reference = labels(&["Yes", "No", "Yes", "No", "Yes"]);
        let predictions = labels(&["No", "Yes", "No", "Yes", "No"]);
        let ac1 = gwet_ac1(&reference, &predictions).unwrap();
        assert!((-1.0..=1.0).contains(&ac1));
        assert!(ac1 < 0.0);
    }

    #[test]
    fn test_ac1_known_value() {
        // Reference all "Yes"; predictions 7 "Yes" + 3 "No".
        // One reference class but two classes overall, so K=2.
        let reference = labels(&["Yes"; 10]);
        let mut predictions = labels(&["Yes"; 7]);
        predictions.extend(labels(&["No"; 3]));
        let ac1 = gwet_ac1(&reference, &predictions).unwrap();
        // p_a = 0.7, pi_yes = 17/20, pi_no = 3/20
        // p_e = (0.85*0.15 + 0.15*0.85) / 1 = 0.255
        let expected = (0.7 - 0.255) / (1.0 - 0.255);
        assert!((ac1 - expected).abs() < 1e-9);
    }

    #[test]
    fn test_balance_check() {
        let balanced = distribution(&labels(&["A", "A", "B", "B"]));
        assert!(is_balanced(&balanced));

        let imbalanced = distribution(&labels(&["A", "A", "A", "A", "A", "B"]));
        assert!(!is_balanced(&imbalanced));

        let single = distribution(&labels(&["A", "A"]));
        assert!(is_balanced(&single));
    }

    #[test]
    fn test_warnings_composition() {
        let single = distribution(&labels(&["Yes", "Yes"]));
        assert_eq!(warnings_for(None, &single).as_deref(), Some("Single class (Yes)"));

        let imbalanced = distribution(&labels(&["A", "A", "A", "A", "A", "B"]));
        assert_eq!(
            warnings_for(Some(-0.2), &imbalanced).as_deref(),
            Some("Systematic disagreement; Imbalanced classes")
        );

        assert_eq!(
            warnings_for(Some(0.0), &imbalanced).as_deref(),
            Some("Random chance agreement; Imbalanced classes")
        );

        let balanced = distribution(&labels(&["A", "B"]));
        assert_eq!(warnings_for(Some(0.5), &balanced), None);
    }

    #[test]
    fn test_analyze_pairs_empty() {
        let analysis = analyze_pairs(&[]);
        assert_eq!(analysis.item_count, 0);
        assert_eq!(analysis.ac1, None);
        assert_eq!(analysis.accuracy, None);
        assert_eq!(analysis.warning.as_deref(), Some("No feedback items found"));
    }

    #[test]
    fn test_analyze_pairs_balanced_binary_scenario() {
        // 10 reviews, every final answer "Yes": 7 agreements plus 3 where
        // the AI said "No" and the reviewer corrected to "Yes"
        let population = pairs(&[("Yes", "Yes", 7), ("No", "Yes", 3)]);
        let analysis = analyze_pairs(&population);

        assert_eq!(analysis.item_count, 10);
        assert_eq!(analysis.agreements, 7);
        assert_eq!(analysis.mismatches, 3);
        assert_eq!(analysis.accuracy, Some(70.0));
        assert_eq!(analysis.agreements + analysis.mismatches, analysis.item_count);

        let matrix = analysis.confusion_matrix.as_ref().unwrap();
        assert_eq!(matrix.labels, vec!["No", "Yes"]);
        assert_eq!(matrix.row_sums(), analysis.label_distribution);

        let ac1 = analysis.ac1.unwrap();
        assert!(ac1 > 0.0);
        assert!((-1.0..=1.0).contains(&ac1));

        // All final values are "Yes" -> single class warning names the label
        assert_eq!(analysis.warning.as_deref(), Some("Single class (Yes)"));
    }

    #[test]
    fn test_analyze_pairs_accuracy_invariant() {
        let population = pairs(&[("A", "A", 4), ("A", "B", 2), ("B", "B", 6)]);
        let analysis = analyze_pairs(&population);
        let expected = analysis.agreements as f64 / analysis.item_count as f64 * 100.0;
        assert!((analysis.accuracy.unwrap() - expected).abs() < 1e-9);
    }
}
