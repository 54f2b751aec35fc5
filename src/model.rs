use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Client-side configuration for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Evaluation engine executable.
    pub engine: PathBuf,
    pub use_gpu: bool,
    /// NDJSON destination for the engine; a timestamped default is used when unset.
    pub output: Option<PathBuf>,
    /// Delay before the advisory tab switch after submit and after completion.
    #[serde(with = "humantime_serde")]
    pub focus_delay: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalModel {
    pub path: String,
    pub template_path: String,
    pub architecture: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteModel {
    pub name: String,
    pub api_base_url: String,
}

/// An evaluation job in its canonical mapping form.
///
/// `variables` keeps insertion order; the engine expands the cartesian
/// product of the value lists into prompt variants. Job files on disk use
/// the same shape (camelCase keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub prompt: String,
    pub system: String,
    pub variables: IndexMap<String, Vec<String>>,
    pub local_models: Vec<LocalModel>,
    pub remote_models: Vec<RemoteModel>,
}

/// One named variable and its value list, addressable by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableEntry {
    pub key: String,
    pub values: Vec<String>,
}

/// Positional projection of a [`JobSpec`] for the editing surface.
///
/// Variables become an ordered sequence so entries can be inserted and
/// removed by index while a name is being retyped; the canonical mapping
/// form is re-derived on submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditableJob {
    pub prompt: String,
    pub system: String,
    pub variables: Vec<VariableEntry>,
    pub local_models: Vec<LocalModel>,
    pub remote_models: Vec<RemoteModel>,
}

/// Project the mapping form into the positional form, preserving insertion order.
pub fn to_editable(spec: &JobSpec) -> EditableJob {
    EditableJob {
        prompt: spec.prompt.clone(),
        system: spec.system.clone(),
        variables: spec
            .variables
            .iter()
            .map(|(key, values)| VariableEntry {
                key: key.clone(),
                values: values.clone(),
            })
            .collect(),
        local_models: spec.local_models.clone(),
        remote_models: spec.remote_models.clone(),
    }
}

/// Re-derive the mapping form from the positional form.
///
/// Duplicate keys are legal mid-edit; the last occurrence wins and keeps the
/// first occurrence's position. This is policy, not an error.
pub fn from_editable(job: &EditableJob) -> JobSpec {
    let mut variables = IndexMap::with_capacity(job.variables.len());
    for entry in &job.variables {
        variables.insert(entry.key.clone(), entry.values.clone());
    }
    JobSpec {
        prompt: job.prompt.clone(),
        system: job.system.clone(),
        variables,
        local_models: job.local_models.clone(),
        remote_models: job.remote_models.clone(),
    }
}

/// The exact wire payload the engine reads from stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission(String);

impl Submission {
    /// Serialize a job into its wire form. No validation happens here —
    /// malformed jobs (e.g. empty model lists) are the engine's to reject.
    pub fn encode(spec: &JobSpec) -> Result<Self, serde_json::Error> {
        serde_json::to_string(spec).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One engine output, one per (model × variable combination).
/// Arrival order is preserved and significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub name: String,
    pub system: String,
    pub user: String,
    pub response: String,
}

/// Run lifecycle state, owned by the controller; everything else observes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

/// Events crossing the process boundary for one run: zero or more `Log`
/// fragments followed by exactly one `Done`.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Opaque text fragment; may contain terminal control sequences.
    Log(String),
    /// Terminal event: the run's newline-delimited JSON result payload.
    Done { payload: String },
}

/// Events emitted by the controller for presentation layers.
#[derive(Debug, Clone)]
pub enum AppEvent {
    RunStateChanged(RunState),
    LogFragment(String),
    /// Wholesale replacement of the committed result sequence.
    ResultsCommitted(Vec<RunResult>),
    Notice(Notice),
    /// Advisory focus request; presentation layers may ignore it.
    FocusTab(Tab),
}

/// A user-facing status message. Sticky notices stay until replaced;
/// transient ones expire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub sticky: bool,
}

impl Notice {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sticky: false,
        }
    }

    pub fn sticky(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sticky: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Editor,
    Logs,
    Results,
    Help,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Editor, Tab::Logs, Tab::Results, Tab::Help];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Editor => "Editor",
            Tab::Logs => "Logs",
            Tab::Results => "Results",
            Tab::Help => "Help",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Tab {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> JobSpec {
        let mut variables = IndexMap::new();
        variables.insert("{{topic}}".to_string(), vec!["rust".into(), "go".into()]);
        variables.insert("{{tone}}".to_string(), vec!["formal".into()]);
        JobSpec {
            prompt: "Write about {{topic}} in a {{tone}} tone".into(),
            system: "You are a writer".into(),
            variables,
            local_models: vec![LocalModel {
                path: "models/llama.gguf".into(),
                template_path: "templates/llama.txt".into(),
                architecture: "llama".into(),
            }],
            remote_models: vec![RemoteModel {
                name: "gpt-4".into(),
                api_base_url: "https://api.openai.com/v1".into(),
            }],
        }
    }

    #[test]
    fn round_trip_preserves_spec() {
        let spec = sample_spec();
        assert_eq!(from_editable(&to_editable(&spec)), spec);
    }

    #[test]
    fn to_editable_preserves_insertion_order() {
        let editable = to_editable(&sample_spec());
        let keys: Vec<&str> = editable.variables.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, ["{{topic}}", "{{tone}}"]);
    }

    #[test]
    fn from_editable_keeps_last_duplicate() {
        let job = EditableJob {
            variables: vec![
                VariableEntry {
                    key: "a".into(),
                    values: vec!["old".into()],
                },
                VariableEntry {
                    key: "b".into(),
                    values: vec!["kept".into()],
                },
                VariableEntry {
                    key: "a".into(),
                    values: vec!["new".into()],
                },
            ],
            ..Default::default()
        };
        let spec = from_editable(&job);
        assert_eq!(spec.variables.len(), 2);
        assert_eq!(spec.variables["a"], vec!["new".to_string()]);
        assert_eq!(spec.variables["b"], vec!["kept".to_string()]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let job = EditableJob {
            variables: vec![
                VariableEntry {
                    key: "x".into(),
                    values: vec!["1".into()],
                },
                VariableEntry {
                    key: "x".into(),
                    values: vec!["2".into()],
                },
            ],
            ..Default::default()
        };
        let once = from_editable(&job);
        let twice = from_editable(&to_editable(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn positional_ops_preserve_untouched_entries() {
        let mut editable = to_editable(&sample_spec());
        editable.variables.insert(1, VariableEntry::default());
        assert_eq!(editable.variables[0].key, "{{topic}}");
        assert_eq!(editable.variables[2].key, "{{tone}}");
        editable.variables.remove(1);
        assert_eq!(
            editable
                .variables
                .iter()
                .map(|v| v.key.as_str())
                .collect::<Vec<_>>(),
            ["{{topic}}", "{{tone}}"]
        );
    }

    #[test]
    fn submission_uses_camel_case_wire_keys() {
        let wire = Submission::encode(&sample_spec()).unwrap();
        let json: serde_json::Value = serde_json::from_str(wire.as_str()).unwrap();
        assert!(json.get("localModels").is_some());
        assert!(json.get("remoteModels").is_some());
        assert_eq!(json["localModels"][0]["templatePath"], "templates/llama.txt");
        assert_eq!(
            json["remoteModels"][0]["apiBaseUrl"],
            "https://api.openai.com/v1"
        );
    }

    #[test]
    fn job_files_keep_variable_order() {
        let raw = r#"{
            "prompt": "p",
            "system": "s",
            "variables": { "{{z}}": ["1"], "{{a}}": ["2"] },
            "localModels": [],
            "remoteModels": []
        }"#;
        let spec: JobSpec = serde_json::from_str(raw).unwrap();
        let keys: Vec<&String> = spec.variables.keys().collect();
        assert_eq!(keys, ["{{z}}", "{{a}}"]);
    }
}
