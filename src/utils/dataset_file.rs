//! Dataset persistence collaborator: CSV encoding of a `Frame`.
//!
//! The builder itself never touches the filesystem; the CLI hands a finished
//! frame to this writer. JSON string cells (metadata, IDs) are written
//! verbatim; nulls become empty fields.

use std::path::Path;

use serde_json::Value;

use super::error::{ApiError, ApiResult};
use crate::models::Frame;

/// Write a frame to a CSV file with a header row in frame column order.
pub fn write_frame_csv(frame: &Frame, path: &Path) -> ApiResult<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| ApiError::Validation(format!("cannot open {}: {}", path.display(), e)))?;

    writer
        .write_record(&frame.columns)
        .map_err(|e| ApiError::Validation(format!("csv header write failed: {}", e)))?;

    for row in &frame.rows {
        let record: Vec<String> = row.iter().map(cell_to_field).collect();
        writer
            .write_record(&record)
            .map_err(|e| ApiError::Validation(format!("csv row write failed: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| ApiError::Validation(format!("csv flush failed: {}", e)))?;
    tracing::info!("Wrote {} rows to {}", frame.len(), path.display());
    Ok(())
}

fn cell_to_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read a frame back from a CSV file. Cells come back as strings; empty
/// fields become nulls. Used by the dataset reload mode.
pub fn read_frame_csv(path: &Path) -> ApiResult<Frame> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| ApiError::Validation(format!("cannot read {}: {}", path.display(), e)))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| ApiError::Validation(format!("csv header read failed: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut frame = Frame::new(columns);
    for record in reader.records() {
        let record =
            record.map_err(|e| ApiError::Validation(format!("csv row read failed: {}", e)))?;
        let row: Vec<Value> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Value::Null
                } else {
                    Value::String(field.to_string())
                }
            })
            .collect();
        frame.push_row(row)?;
    }

    tracing::info!("Loaded {} rows from {}", frame.len(), path.display());
    Ok(frame)
}
