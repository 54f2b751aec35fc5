//! Text summary builder for CLI output.
//!
//! Formats a completed run's results as human-readable lines for text mode.

use crate::model::RunResult;

/// Pre-formatted lines for text output.
pub struct TextSummary {
    pub lines: Vec<String>,
}

pub fn build_text_summary(results: &[RunResult]) -> TextSummary {
    let mut lines = Vec::new();
    lines.push(format!("{} output(s) generated", results.len()));

    for (i, result) in results.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("--- [{}] {} ---", i + 1, result.name));
        if !result.system.is_empty() {
            lines.push(format!("system: {}", result.system));
        }
        lines.push(format!("user: {}", result.user));
        lines.push(format!("response: {}", result.response));
    }

    TextSummary { lines }
}
