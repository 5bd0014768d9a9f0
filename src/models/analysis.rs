//! Shared analytic records produced by the metrics kernel and the analysis
//! services. These are in-memory/result-document types, never persisted.

use std::collections::BTreeMap;

use serde::Serialize;

/// Confusion matrix in the row-object form the display layer expects:
/// sorted label list plus one row per actual class with per-predicted-class
/// counts.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub matrix: Vec<ConfusionRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfusionRow {
    #[serde(rename = "actualClassLabel")]
    pub actual_class_label: String,
    #[serde(rename = "predictedClassCounts")]
    pub predicted_class_counts: BTreeMap<String, usize>,
}

impl ConfusionMatrix {
    /// Row sums keyed by actual class label (equals the final-value
    /// distribution by construction).
    pub fn row_sums(&self) -> BTreeMap<String, usize> {
        self.matrix
            .iter()
            .map(|row| {
                (row.actual_class_label.clone(), row.predicted_class_counts.values().sum())
            })
            .collect()
    }

    /// Column sums keyed by predicted class label (equals the initial-value
    /// distribution by construction).
    pub fn column_sums(&self) -> BTreeMap<String, usize> {
        let mut sums: BTreeMap<String, usize> = BTreeMap::new();
        for row in &self.matrix {
            for (label, count) in &row.predicted_class_counts {
                *sums.entry(label.clone()).or_default() += count;
            }
        }
        sums
    }
}

/// One bar of a class distribution, sorted by count descending in outputs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassCount {
    pub label: String,
    pub count: usize,
}

/// Full agreement analysis over one population of feedback pairs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreAnalysis {
    pub ac1: Option<f64>,
    pub accuracy: Option<f64>,
    pub item_count: usize,
    pub agreements: usize,
    pub mismatches: usize,
    pub label_distribution: BTreeMap<String, usize>,
    pub confusion_matrix: Option<ConfusionMatrix>,
    pub class_distribution: Vec<ClassCount>,
    pub predicted_class_distribution: Vec<ClassCount>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub warning: Option<String>,
}

impl ScoreAnalysis {
    /// The empty analysis used when no usable pairs exist.
    pub fn empty(warning: &str) -> Self {
        Self {
            ac1: None,
            accuracy: None,
            item_count: 0,
            agreements: 0,
            mismatches: 0,
            label_distribution: BTreeMap::new(),
            confusion_matrix: None,
            class_distribution: Vec::new(),
            predicted_class_distribution: Vec::new(),
            precision: None,
            recall: None,
            warning: Some(warning.to_string()),
        }
    }

    /// Number of distinct final-value classes observed.
    pub fn classes_count(&self) -> usize {
        self.label_distribution.len()
    }
}

/// ISO-rendered date range echoed in summary documents.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl From<&crate::utils::TimeWindow> for DateRange {
    fn from(window: &crate::utils::TimeWindow) -> Self {
        let (start, end) = window.to_rfc3339();
        Self { start, end }
    }
}
