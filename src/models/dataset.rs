//! Frame: the in-memory tabular dataset produced by the dataset builder.
//!
//! Column order is fixed and part of the contract:
//! `content_id, feedback_item_id, IDs, metadata, text, call_date,
//! <score>, <score> comment, <score> edit comment`.
//! The `IDs` and `metadata` cells hold serialized JSON strings. On-disk
//! encoding is a collaborator's job (`utils::dataset_file`).

use serde::Serialize;
use serde_json::Value;

use crate::utils::{ApiError, ApiResult};

pub const COL_CONTENT_ID: &str = "content_id";
pub const COL_FEEDBACK_ITEM_ID: &str = "feedback_item_id";
pub const COL_IDS: &str = "IDs";
pub const COL_METADATA: &str = "metadata";
pub const COL_TEXT: &str = "text";
pub const COL_CALL_DATE: &str = "call_date";

/// The full fixed column list for a dataset keyed on one score column name.
pub fn dataset_columns(score_column: &str) -> Vec<String> {
    vec![
        COL_CONTENT_ID.to_string(),
        COL_FEEDBACK_ITEM_ID.to_string(),
        COL_IDS.to_string(),
        COL_METADATA.to_string(),
        COL_TEXT.to_string(),
        COL_CALL_DATE.to_string(),
        score_column.to_string(),
        format!("{} comment", score_column),
        format!("{} edit comment", score_column),
    ]
}

/// A column-ordered table of JSON cells.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row; its width must match the column list.
    pub fn push_row(&mut self, row: Vec<Value>) -> ApiResult<()> {
        if row.len() != self.columns.len() {
            return Err(ApiError::validation(format!(
                "row has {} cells, frame has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn set_cell(&mut self, row: usize, column: &str, value: Value) -> ApiResult<()> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| ApiError::validation(format!("unknown column: {}", column)))?;
        let cells = self
            .rows
            .get_mut(row)
            .ok_or_else(|| ApiError::validation(format!("row {} out of range", row)))?;
        cells[idx] = value;
        Ok(())
    }

    /// All values of one column as strings (None cells excluded).
    pub fn column_values(&self, column: &str) -> Vec<String> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(idx))
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}
