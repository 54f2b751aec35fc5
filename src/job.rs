//! Job file loading.
//!
//! Job files are plain JSON matching the [`JobSpec`] wire shape. Parsing
//! happens here, independently of the run lifecycle.

use crate::model::JobSpec;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::path::Path;

pub fn load(path: &Path) -> Result<JobSpec> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading job file {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing job file {}", path.display()))
}

/// Starter job shown when no file is given on the command line.
pub fn template() -> JobSpec {
    let mut variables = IndexMap::new();
    variables.insert("{{topic}}".to_string(), vec!["the Rust borrow checker".to_string()]);
    JobSpec {
        prompt: "Explain {{topic}} in two sentences.".into(),
        system: "You are a concise technical writer.".into(),
        variables,
        local_models: Vec::new(),
        remote_models: Vec::new(),
    }
}
