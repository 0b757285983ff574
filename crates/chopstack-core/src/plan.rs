//! The plan model: [`Task`], [`Phase`], [`Plan`], and their runtime state.
//!
//! This module owns the static shape of a plan plus the small amount of
//! mutable state a task accumulates as the execution engine drives it
//! (state, retry count, commit hash, branch, worktree path). It does not
//! decide whether a plan is *safe* to run — that is [`crate::validate`]'s
//! job — nor does it touch the filesystem or a VCS; it is pure data plus
//! parsing.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Complexity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Complexity {
    Xs,
    S,
    M,
    L,
    Xl,
}

impl Complexity {
    /// Weight used for critical-path estimation. Each step up roughly
    /// doubles expected effort — this is a relative estimate, not a time unit.
    pub fn weight(self) -> u32 {
        match self {
            Complexity::Xs => 1,
            Complexity::S => 2,
            Complexity::M => 4,
            Complexity::L => 8,
            Complexity::Xl => 16,
        }
    }
}

// ---------------------------------------------------------------------------
// TaskState — runtime lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Ready,
    Running,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Pending
    }
}

impl TaskState {
    /// Returns `true` when a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, target),
            (Pending, Ready)
                | (Ready, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
                | (Pending, Skipped)
                | (Ready, Skipped)
                | (Ready, Cancelled)
                | (Failed, Ready) // retry
                | (Failed, Skipped)
                | (Failed, Cancelled)
        )
    }
}

#[derive(Debug, Error)]
#[error("invalid task state transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: TaskState,
    pub to: TaskState,
}

/// One entry in a task's append-only state history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: TaskState,
    pub to: TaskState,
    pub at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: String,
    pub complexity: Complexity,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub dependencies: HashSet<String>,
    #[serde(default)]
    pub phase: Option<String>,

    // --- Runtime state, absent from a freshly-parsed plan file ---
    #[serde(default)]
    pub state: TaskState,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub state_history: Vec<StateTransition>,
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub worktree_path: Option<String>,
}

impl Task {
    /// Apply a state transition, recording it in `state_history`.
    ///
    /// Returns an error (and leaves the task unchanged) if the transition
    /// is not valid from the current state.
    pub fn transition(&mut self, to: TaskState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(&to) {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state_history.push(StateTransition {
            from: self.state,
            to,
            at: Utc::now(),
        });
        self.state = to;
        Ok(())
    }

    /// `true` once every id in `dependencies` is present (and completed) in `completed`.
    pub fn dependencies_satisfied(&self, completed: &HashSet<&str>) -> bool {
        self.dependencies.iter().all(|d| completed.contains(d.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStrategy {
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub name: String,
    pub strategy: PhaseStrategy,
    pub tasks: Vec<String>,
    #[serde(default)]
    pub requires: HashSet<String>,
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanStrategy {
    Sequential,
    Parallel,
    PhasedParallel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanMode {
    Plan,
    Execute,
    Validate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub strategy: PlanStrategy,
    #[serde(default)]
    pub phases: Option<Vec<Phase>>,
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub success_metrics: Option<Vec<String>>,
    #[serde(default)]
    pub mode: Option<PlanMode>,
}

impl Plan {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}

// ---------------------------------------------------------------------------
// Legacy schema adapter (deprecated input, DESIGN NOTES §9)
// ---------------------------------------------------------------------------

/// The legacy flat task schema (`touches`/`produces`/`requires`/
/// `estimatedLines`/`agentPrompt`), kept only as a conversion source into
/// the canonical [`Task`]. Never consumed directly by the validator or the
/// execution engine.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyTask {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub touches: Vec<String>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub estimated_lines: Option<u32>,
    #[serde(default)]
    pub agent_prompt: Option<String>,
}

/// Convert a legacy flat task into the canonical [`Task`] shape.
///
/// `touches` and `produces` are unioned into `files`; `estimated_lines` maps
/// onto the nearest [`Complexity`] bucket; `agent_prompt`, if present,
/// becomes the task description (padded to the 50-char minimum the
/// validator enforces, since legacy prompts are sometimes terse).
pub fn from_legacy(legacy: LegacyTask) -> Task {
    let mut files: Vec<String> = legacy.touches;
    for p in legacy.produces {
        if !files.contains(&p) {
            files.push(p);
        }
    }

    let complexity = match legacy.estimated_lines.unwrap_or(0) {
        0..=20 => Complexity::Xs,
        21..=80 => Complexity::S,
        81..=250 => Complexity::M,
        251..=600 => Complexity::L,
        _ => Complexity::Xl,
    };

    let mut description = legacy
        .agent_prompt
        .clone()
        .unwrap_or_else(|| legacy.title.clone().unwrap_or_else(|| legacy.id.clone()));
    while description.len() < 50 {
        description.push_str(" (migrated from legacy plan schema)");
    }

    Task {
        id: legacy.id.clone(),
        name: legacy.title.unwrap_or(legacy.id),
        description,
        complexity,
        acceptance_criteria: Vec::new(),
        files,
        dependencies: legacy.requires.into_iter().collect(),
        phase: None,
        state: TaskState::Pending,
        retry_count: 0,
        max_retries: 0,
        state_history: Vec::new(),
        commit_hash: None,
        branch_name: None,
        worktree_path: None,
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PlanParseError {
    #[error("yaml parse error: {0}")]
    Yaml(String),
    #[error("json parse error: {0}")]
    Json(String),
    #[error("unsupported plan file extension: {0}")]
    UnsupportedExtension(String),
}

const KNOWN_PLAN_KEYS: &[&str] = &[
    "name",
    "strategy",
    "phases",
    "tasks",
    "success_metrics",
    "mode",
];

/// A parsed plan plus any warnings collected along the way (currently:
/// unrecognized top-level keys, tolerated rather than rejected).
#[derive(Debug, Clone)]
pub struct ParsedPlan {
    pub plan: Plan,
    pub warnings: Vec<String>,
}

pub fn parse_yaml(text: &str) -> Result<ParsedPlan, PlanParseError> {
    let raw: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| PlanParseError::Yaml(e.to_string()))?;
    let warnings = collect_warnings(raw.as_mapping().into_iter().flat_map(|m| {
        m.keys()
            .filter_map(|k| k.as_str().map(|s| s.to_string()))
    }));
    let plan: Plan = serde_yaml::from_value(raw).map_err(|e| PlanParseError::Yaml(e.to_string()))?;
    Ok(ParsedPlan { plan, warnings })
}

pub fn parse_json(text: &str) -> Result<ParsedPlan, PlanParseError> {
    let raw: serde_json::Value =
        serde_json::from_str(text).map_err(|e| PlanParseError::Json(e.to_string()))?;
    let warnings = collect_warnings(
        raw.as_object()
            .into_iter()
            .flat_map(|m| m.keys().cloned()),
    );
    let plan: Plan =
        serde_json::from_value(raw).map_err(|e| PlanParseError::Json(e.to_string()))?;
    Ok(ParsedPlan { plan, warnings })
}

fn collect_warnings(keys: impl Iterator<Item = String>) -> Vec<String> {
    keys.filter(|k| !KNOWN_PLAN_KEYS.contains(&k.as_str()))
        .map(|k| format!("unrecognized top-level plan key: {k}"))
        .collect()
}

/// Parse a plan from a file path, dispatching on extension (`.yaml`/`.yml`
/// as YAML, `.json` as JSON).
pub fn parse_file(path: &std::path::Path, text: &str) -> Result<ParsedPlan, PlanParseError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => parse_yaml(text),
        Some("json") => parse_json(text),
        other => Err(PlanParseError::UnsupportedExtension(
            other.unwrap_or("").to_string(),
        )),
    }
}

pub fn to_yaml(plan: &Plan) -> Result<String, PlanParseError> {
    serde_yaml::to_string(plan).map_err(|e| PlanParseError::Yaml(e.to_string()))
}

pub fn to_json(plan: &Plan) -> Result<String, PlanParseError> {
    serde_json::to_string_pretty(plan).map_err(|e| PlanParseError::Json(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> Plan {
        Plan {
            name: "demo".into(),
            strategy: PlanStrategy::Parallel,
            phases: None,
            tasks: vec![Task {
                id: "root".into(),
                name: "Root task".into(),
                description: "a".repeat(50),
                complexity: Complexity::M,
                acceptance_criteria: vec!["it works".into()],
                files: vec!["src/lib.rs".into()],
                dependencies: HashSet::new(),
                phase: None,
                state: TaskState::Pending,
                retry_count: 0,
                max_retries: 2,
                state_history: Vec::new(),
                commit_hash: None,
                branch_name: None,
                worktree_path: None,
            }],
            success_metrics: None,
            mode: None,
        }
    }

    #[test]
    fn yaml_round_trip() {
        let plan = sample_plan();
        let yaml = to_yaml(&plan).unwrap();
        let parsed = parse_yaml(&yaml).unwrap();
        assert_eq!(parsed.plan.name, plan.name);
        assert_eq!(parsed.plan.tasks.len(), 1);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn json_round_trip() {
        let plan = sample_plan();
        let json = to_json(&plan).unwrap();
        let parsed = parse_json(&json).unwrap();
        assert_eq!(parsed.plan.tasks[0].id, "root");
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn unknown_top_level_key_is_a_warning_not_an_error() {
        let yaml = r#"
name: demo
strategy: parallel
tasks:
  - id: a
    name: A
    description: "01234567890123456789012345678901234567890123456789"
    complexity: M
unexpected_field: true
"#;
        let parsed = parse_yaml(yaml).unwrap();
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("unexpected_field"));
    }

    #[test]
    fn unknown_task_field_is_rejected() {
        let yaml = r#"
name: demo
strategy: parallel
tasks:
  - id: a
    name: A
    description: "01234567890123456789012345678901234567890123456789"
    complexity: M
    bogus: true
"#;
        assert!(parse_yaml(yaml).is_err());
    }

    #[test]
    fn state_machine_rejects_invalid_transition() {
        let mut task = sample_plan().tasks.remove(0);
        assert!(task.transition(TaskState::Running).is_err());
        assert!(task.transition(TaskState::Ready).is_ok());
        assert!(task.transition(TaskState::Running).is_ok());
        assert!(task.transition(TaskState::Completed).is_ok());
        assert_eq!(task.state_history.len(), 3);
    }

    #[test]
    fn legacy_task_converts_files_and_complexity() {
        let legacy = LegacyTask {
            id: "legacy-1".into(),
            title: Some("Legacy task".into()),
            touches: vec!["a.rs".into()],
            produces: vec!["b.rs".into(), "a.rs".into()],
            requires: vec!["legacy-0".into()],
            estimated_lines: Some(300),
            agent_prompt: None,
        };
        let task = from_legacy(legacy);
        assert_eq!(task.files, vec!["a.rs", "b.rs"]);
        assert_eq!(task.complexity, Complexity::L);
        assert!(task.dependencies.contains("legacy-0"));
    }
}
