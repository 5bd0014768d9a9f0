//! Output rendering for analysis result documents.
//!
//! Every non-error result is a structured document serializable as JSON or
//! as a commented YAML variant: same structural body, with a contextual
//! `#`-comment header prepended in YAML mode.

use serde::Serialize;
use serde_json::json;

use super::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(ApiError::validation(format!("unknown output format: {}", other))),
        }
    }
}

/// Render a result document in the requested format.
///
/// In YAML mode, `header` lines are emitted as a comment block followed by a
/// blank line; the structural body is unchanged relative to JSON mode.
pub fn render<T: Serialize>(
    value: &T,
    format: OutputFormat,
    header: Option<&str>,
) -> ApiResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => {
            let body = serde_yaml::to_string(value)
                .map_err(|e| ApiError::Validation(format!("YAML encoding failed: {}", e)))?;
            match header {
                Some(text) => Ok(format!("{}\n{}", comment_block(text), body)),
                None => Ok(body),
            }
        },
    }
}

/// Turn free text into a `#`-prefixed YAML comment block.
fn comment_block(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() { "#".to_string() } else { format!("# {}", line) }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The uniform error document: `error` plus the same empty-collection
/// skeleton used on success, so callers can read fields either way.
pub fn error_document(message: &str) -> serde_json::Value {
    json!({
        "error": message,
        "scorecards": [],
        "scores": [],
    })
}
