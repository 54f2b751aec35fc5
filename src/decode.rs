//! Terminal-payload decoding.
//!
//! The engine's `done` event carries newline-delimited JSON, one result per
//! line. Decoding is all-or-nothing: results are committed wholesale, so a
//! single malformed line fails the entire decode.

use crate::model::RunResult;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid result record at line {line}: {text:?}")]
pub struct DecodeError {
    /// Zero-based line index within the payload.
    pub line: usize,
    /// The offending line, verbatim.
    pub text: String,
    #[source]
    pub source: serde_json::Error,
}

/// Parse a terminal payload into the result sequence, preserving line order.
/// Empty lines are skipped so a trailing newline is not an error.
pub fn decode_results(payload: &str) -> Result<Vec<RunResult>, DecodeError> {
    payload
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(line, text)| {
            serde_json::from_str(text).map_err(|source| DecodeError {
                line,
                text: text.to_string(),
                source,
            })
        })
        .collect()
}
