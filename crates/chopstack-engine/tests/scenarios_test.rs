//! End-to-end execution scenarios spanning the DAG validator, the task
//! orchestrator, and the VCS engine, run through [`ExecutionEngine::run`].

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chopstack_core::config::Config;
use chopstack_core::plan::{Complexity, Plan, PlanStrategy, Task, TaskState};
use chopstack_core::result::TaskOutcome;
use chopstack_engine::engine::{ExecutionEngine, ExecutionOptions};
use chopstack_harness::adapter::{
    AdapterError, AdapterHandle, AdapterOutcome, AdapterRequest, ExecutionAdapter, StreamEvent,
};
use chopstack_harness::stub::StubAdapter;
use chopstack_vcs::backend::VcsBackend;
use chopstack_vcs::git_runner::mock::MockGitRunner;
use chopstack_vcs::git_runner::GitOutput;
use chopstack_vcs::merge_commit::MergeCommitBackend;
use chopstack_vcs::worktree_engine::WorktreeEngine;

fn task(id: &str, deps: &[&str], max_retries: u32) -> Task {
    Task {
        id: id.into(),
        name: format!("Task {id}"),
        description: "x".repeat(60),
        complexity: Complexity::S,
        acceptance_criteria: Vec::new(),
        files: vec![format!("{id}.rs")],
        dependencies: deps.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
        phase: None,
        state: TaskState::Pending,
        retry_count: 0,
        max_retries,
        state_history: Vec::new(),
        commit_hash: None,
        branch_name: None,
        worktree_path: None,
    }
}

fn plan(name: &str, tasks: Vec<Task>) -> Plan {
    Plan {
        name: name.into(),
        strategy: PlanStrategy::Parallel,
        phases: None,
        tasks,
        success_metrics: None,
        mode: None,
    }
}

/// An adapter whose outcome depends on the requesting task id, so a single
/// engine run can exercise several tasks with different results.
struct ScriptedByIdAdapter {
    outcomes: HashMap<String, AdapterOutcome>,
}

impl ScriptedByIdAdapter {
    fn new(outcomes: Vec<(&str, AdapterOutcome)>) -> Self {
        Self {
            outcomes: outcomes.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}

#[async_trait::async_trait]
impl ExecutionAdapter for ScriptedByIdAdapter {
    async fn spawn(&self, request: AdapterRequest) -> Result<Box<dyn AdapterHandle>, AdapterError> {
        let outcome = self.outcomes.get(&request.task_id).cloned().unwrap_or(AdapterOutcome {
            exit_code: 0,
            files_changed: Vec::new(),
            stderr: None,
        });
        Ok(Box::new(ScriptedHandle { outcome: Some(outcome) }))
    }

    fn name(&self) -> &str {
        "scripted-by-id"
    }
}

/// An adapter that fails its first invocation and succeeds on the second,
/// recording the prompt it received each time.
struct FlakyAdapter {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FlakyAdapter {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl ExecutionAdapter for FlakyAdapter {
    async fn spawn(&self, request: AdapterRequest) -> Result<Box<dyn AdapterHandle>, AdapterError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let outcome = if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            AdapterOutcome {
                exit_code: 1,
                files_changed: Vec::new(),
                stderr: Some("missing import X".to_string()),
            }
        } else {
            AdapterOutcome {
                exit_code: 0,
                files_changed: vec!["t.rs".to_string()],
                stderr: None,
            }
        };
        Ok(Box::new(ScriptedHandle { outcome: Some(outcome) }))
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

struct ScriptedHandle {
    outcome: Option<AdapterOutcome>,
}

#[async_trait::async_trait]
impl AdapterHandle for ScriptedHandle {
    async fn next_event(&mut self) -> Result<Option<StreamEvent>, AdapterError> {
        Ok(None)
    }

    async fn wait(self: Box<Self>) -> Result<AdapterOutcome, AdapterError> {
        Ok(self.outcome.expect("outcome consumed exactly once"))
    }

    async fn terminate(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// Stub a clean merge of `branch` on `mock`: a non-empty diff against HEAD
/// followed by a successful `--no-ff` merge.
fn stub_clean_merge(mock: &MockGitRunner, branch: &str) {
    mock.stub(&format!("diff --stat HEAD {branch}"), GitOutput::ok("1 file changed"));
    mock.stub(&format!("merge --no-ff --no-commit {branch}"), GitOutput::ok(""));
}

/// *Diamond plan, merge-commit mode.* `root`, `left`, `right`, `merge` with
/// deps `{root -> left, root -> right, {left, right} -> merge}`, disjoint
/// files per task. Three layers, width-2 middle layer, all four commits
/// land, four branches fold into the trunk, no conflicts.
#[tokio::test]
async fn diamond_plan_merge_commit_mode() {
    let mut plan = plan(
        "diamond",
        vec![
            task("root", &[], 0),
            task("left", &["root"], 0),
            task("right", &["root"], 0),
            task("merge", &["left", "right"], 0),
        ],
    );

    let dir = tempfile::tempdir().unwrap();
    let worktree_engine = WorktreeEngine::new(dir.path(), Config::default(), Box::new(MockGitRunner::new()));

    let backend_git = MockGitRunner::new();
    backend_git.stub("rev-parse HEAD", GitOutput::ok("c0ffee\n"));
    for branch in ["chopstack/root", "chopstack/left", "chopstack/right", "chopstack/merge"] {
        stub_clean_merge(&backend_git, branch);
    }
    let backend: Arc<dyn VcsBackend> = Arc::new(MergeCommitBackend::new(Box::new(backend_git)));

    let adapter = Arc::new(StubAdapter::succeeding(vec!["changed.rs".into()]));
    let bus = chopstack_bus::event_bus::EventBus::new();
    let engine = ExecutionEngine::new(adapter, bus, worktree_engine, backend, None, Config::default());

    let opts = ExecutionOptions::new(dir.path(), "main");
    let result = engine.run(&mut plan, &opts).await.unwrap();

    assert!(result.succeeded(), "{:?}", result.failed_tasks().collect::<Vec<_>>());
    assert_eq!(result.tasks.len(), 4);
    assert_eq!(result.tasks.iter().filter(|t| t.outcome == TaskOutcome::Success).count(), 4);
    assert_eq!(result.branches.len(), 4, "all four task branches should reach the trunk");
    assert_eq!(result.commits.len(), 4, "one merge commit per folded branch");
    assert!(result.commits.iter().all(|c| c == "c0ffee"));
}

/// *Retry with context.* A single task whose adapter fails on the first
/// invocation, succeeds on the second. `maxRetries = 1`. The second
/// invocation's prompt carries the first attempt's error text.
#[tokio::test]
async fn retry_with_context_reaches_completion() {
    let mut plan = plan("retry-demo", vec![task("t", &[], 1)]);

    let dir = tempfile::tempdir().unwrap();
    let worktree_engine = WorktreeEngine::new(dir.path(), Config::default(), Box::new(MockGitRunner::new()));

    let backend_git = MockGitRunner::new();
    backend_git.stub("rev-parse HEAD", GitOutput::ok("decade\n"));
    let backend: Arc<dyn VcsBackend> = Arc::new(MergeCommitBackend::new(Box::new(backend_git)));

    let adapter = Arc::new(FlakyAdapter::new());
    let bus = chopstack_bus::event_bus::EventBus::new();
    let engine = ExecutionEngine::new(adapter.clone(), bus, worktree_engine, backend, None, Config::default());

    let opts = ExecutionOptions::new(dir.path(), "main");
    let result = engine.run(&mut plan, &opts).await.unwrap();

    assert!(result.succeeded());
    assert_eq!(result.tasks.len(), 1);
    assert_eq!(result.tasks[0].outcome, TaskOutcome::Success);
    assert_eq!(result.retries.len(), 1, "exactly one retry should have been logged");
    assert_eq!(result.retries[0].task_id, "t");

    let prompts = adapter.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2, "adapter should have been invoked twice");
    assert!(
        prompts[1].contains("missing import X"),
        "retried prompt should carry the first attempt's error: {}",
        prompts[1]
    );
}

/// *Continue-on-error.* Three tasks in one layer with disjoint files; task
/// `b` fails with no retries remaining, `continueOnError = true`. `a` and
/// `c` complete, `b` is failed, nothing is skipped.
#[tokio::test]
async fn continue_on_error_runs_remaining_siblings() {
    let mut plan = plan(
        "continue-on-error-demo",
        vec![task("a", &[], 0), task("b", &[], 0), task("c", &[], 0)],
    );

    let dir = tempfile::tempdir().unwrap();
    let worktree_engine = WorktreeEngine::new(dir.path(), Config::default(), Box::new(MockGitRunner::new()));

    let backend_git = MockGitRunner::new();
    backend_git.stub("rev-parse HEAD", GitOutput::ok("feedcafe\n"));
    stub_clean_merge(&backend_git, "chopstack/a");
    stub_clean_merge(&backend_git, "chopstack/c");
    let backend: Arc<dyn VcsBackend> = Arc::new(MergeCommitBackend::new(Box::new(backend_git)));

    let adapter = Arc::new(ScriptedByIdAdapter::new(vec![
        (
            "a",
            AdapterOutcome { exit_code: 0, files_changed: vec!["a.rs".into()], stderr: None },
        ),
        (
            "b",
            AdapterOutcome { exit_code: 1, files_changed: Vec::new(), stderr: Some("boom".into()) },
        ),
        (
            "c",
            AdapterOutcome { exit_code: 0, files_changed: vec!["c.rs".into()], stderr: None },
        ),
    ]));

    let bus = chopstack_bus::event_bus::EventBus::new();
    let engine = ExecutionEngine::new(adapter, bus, worktree_engine, backend, None, Config::default());

    let mut opts = ExecutionOptions::new(dir.path(), "main");
    opts.continue_on_error = true;

    let result = engine.run(&mut plan, &opts).await.unwrap();

    assert_eq!(result.tasks.len(), 3);
    assert!(!result.succeeded());

    let by_id: HashMap<&str, TaskOutcome> =
        result.tasks.iter().map(|t| (t.task_id.as_str(), t.outcome)).collect();
    assert_eq!(by_id["a"], TaskOutcome::Success);
    assert_eq!(by_id["b"], TaskOutcome::Failure);
    assert_eq!(by_id["c"], TaskOutcome::Success);
    assert!(
        result.tasks.iter().all(|t| t.outcome != TaskOutcome::Skipped),
        "no task depends on b, so nothing should be skipped"
    );
    assert_eq!(result.branches.len(), 2, "only a and c reach the trunk");
}
