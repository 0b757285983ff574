//! The execution engine: drives a validated plan layer by layer, dispatching
//! tasks through the orchestrator, integrating successful work through the
//! VCS engine, retrying failures with an augmented prompt, and assembling
//! the final branch stack.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chopstack_agents::retry::build_retry_prompt;
use chopstack_agents::task_orchestrator::{TaskOrchestrator, TaskRequest, TaskStatus};
use chopstack_bus::event_bus::EventBus;
use chopstack_bus::protocol::{BusEvent, LogLevel};
use chopstack_core::config::Config;
use chopstack_core::plan::{PhaseStrategy, Plan, PlanMode, PlanStrategy, TaskState};
use chopstack_core::result::{ExecutionResult, RetryRecord, TaskOutcome, TaskResultEntry};
use chopstack_core::validate::{compute_execution_layers, validate_plan, LayeringError};
use chopstack_harness::adapter::ExecutionAdapter;
use chopstack_harness::commit_message::build_deterministic_message;
use chopstack_telemetry::metrics::global_metrics;
use chopstack_telemetry::tracing_setup::create_operation_span;
use chopstack_vcs::backend::{CommitOptions, StackCapable, VcsBackend};
use chopstack_vcs::stack_engine::{build_stack_from_tasks, submit_stack, CompletedTask};
use chopstack_vcs::worktree_engine::WorktreeEngine;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("plan failed validation: {0:?}")]
    Invalid(Vec<String>),
    #[error("dependency graph contains a cycle, cannot compute execution layers")]
    Cyclic,
}

impl From<LayeringError> for EngineError {
    fn from(_: LayeringError) -> Self {
        EngineError::Cyclic
    }
}

/// Which integration strategy the VCS engine should assemble the stack with.
/// Distinct from [`chopstack_core::config::ConflictStrategy`], which governs
/// how a single conflict is resolved once one is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsMode {
    MergeCommit,
    Stacked,
}

#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    pub mode: PlanMode,
    pub vcs_mode: VcsMode,
    pub workdir: PathBuf,
    pub continue_on_error: bool,
    pub dry_run: bool,
    pub agent: String,
    pub permissive_validation: bool,
    /// Caller-supplied concurrency cap; the engine still never exceeds the
    /// plan's own widest layer.
    pub max_parallelization: Option<usize>,
    /// The ref new worktrees are created from before the first layer.
    pub parent_ref: String,
}

impl ExecutionOptions {
    pub fn new(workdir: impl Into<PathBuf>, parent_ref: impl Into<String>) -> Self {
        Self {
            mode: PlanMode::Execute,
            vcs_mode: VcsMode::MergeCommit,
            workdir: workdir.into(),
            continue_on_error: false,
            dry_run: false,
            agent: "default".to_string(),
            permissive_validation: false,
            max_parallelization: None,
            parent_ref: parent_ref.into(),
        }
    }
}

/// Ties the DAG validator, the per-task orchestrator, and the VCS engine
/// together into the layered run described by the execution algorithm.
pub struct ExecutionEngine {
    orchestrator: Arc<TaskOrchestrator>,
    bus: EventBus,
    worktree_engine: WorktreeEngine,
    backend: Arc<dyn VcsBackend>,
    stack_capable: Option<Arc<dyn StackCapable>>,
    config: Config,
    cancellation: CancellationToken,
}

impl ExecutionEngine {
    pub fn new(
        adapter: Arc<dyn ExecutionAdapter>,
        bus: EventBus,
        worktree_engine: WorktreeEngine,
        backend: Arc<dyn VcsBackend>,
        stack_capable: Option<Arc<dyn StackCapable>>,
        config: Config,
    ) -> Self {
        Self {
            orchestrator: Arc::new(TaskOrchestrator::new(adapter, bus.clone())),
            bus,
            worktree_engine,
            backend,
            stack_capable,
            config,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Cancel the run in progress: every in-flight adapter is terminated, no
    /// further tasks in the current or future layers are dispatched.
    pub fn cancel(&self) {
        self.cancellation.cancel();
        self.orchestrator.cancel_all();
    }

    /// Run a plan to completion. Wraps the actual drive loop in a named
    /// operation span so every task span and log record below it carries a
    /// shared trace id.
    pub async fn run(&self, plan: &mut Plan, opts: &ExecutionOptions) -> Result<ExecutionResult, EngineError> {
        let (span, trace_id) = create_operation_span("execute");
        self.run_inner(plan, opts, trace_id).instrument(span).await
    }

    async fn run_inner(
        &self,
        plan: &mut Plan,
        opts: &ExecutionOptions,
        trace_id: String,
    ) -> Result<ExecutionResult, EngineError> {
        let started = Instant::now();
        let validation = validate_plan(plan);
        if !validation.valid && !opts.permissive_validation {
            return Err(EngineError::Invalid(validation.errors));
        }

        let layers = compute_execution_layers(plan)?;
        let widest = layers.iter().map(|l| l.len()).max().unwrap_or(0);
        self.bus.publish(BusEvent::Log {
            level: LogLevel::Info,
            message: format!(
                "plan '{}': {} tasks across {} layer(s), widest {}",
                plan.name,
                plan.tasks.len(),
                layers.len(),
                widest
            ),
            metadata: Some(serde_json::json!({ "trace_id": trace_id })),
        });

        let base_cap = opts
            .max_parallelization
            .map(|cap| cap.min(widest.max(1)))
            .unwrap_or(widest.max(1));

        let mut result = ExecutionResult::new(plan.name.clone());
        let mut integration_ref = opts.parent_ref.clone();
        let mut skipped: HashSet<String> = HashSet::new();
        let simulate = matches!(opts.mode, PlanMode::Validate) || opts.dry_run;

        'layers: for layer in &layers {
            if self.cancellation.is_cancelled() {
                break;
            }

            let layer_started = Instant::now();
            let runnable: Vec<String> = layer.iter().filter(|id| !skipped.contains(*id)).cloned().collect();

            if simulate {
                for id in &runnable {
                    if let Some(task) = plan.task_mut(id) {
                        let _ = task.transition(TaskState::Ready);
                        let _ = task.transition(TaskState::Running);
                        let _ = task.transition(TaskState::Completed);
                    }
                    result.tasks.push(TaskResultEntry {
                        task_id: id.clone(),
                        outcome: TaskOutcome::Success,
                        duration_ms: 0,
                        error: None,
                        commit_hash: None,
                    });
                }
                continue;
            }

            if runnable.is_empty() {
                continue;
            }

            let worktree_tasks: Vec<(String, String)> =
                runnable.iter().map(|id| (id.clone(), integration_ref.clone())).collect();

            let contexts = match self.worktree_engine.create_worktrees_for_tasks(&worktree_tasks) {
                Ok(contexts) => contexts,
                Err(e) => {
                    for id in &runnable {
                        result.tasks.push(TaskResultEntry {
                            task_id: id.clone(),
                            outcome: TaskOutcome::Failure,
                            duration_ms: 0,
                            error: Some(e.to_string()),
                            commit_hash: None,
                        });
                    }
                    self.mark_dependents_skipped(plan, &runnable, &layers, &mut skipped, &mut result);
                    if !opts.continue_on_error {
                        break 'layers;
                    }
                    continue;
                }
            };

            let context_by_task: HashMap<String, usize> =
                contexts.iter().enumerate().map(|(i, c)| (c.task_id.clone(), i)).collect();

            let mut completed_this_layer: Vec<CompletedTask> = Vec::new();
            let mut pending: Vec<String> = runnable.clone();

            while !pending.is_empty() {
                for id in &pending {
                    if let Some(task) = plan.task_mut(id) {
                        if task.state == TaskState::Pending {
                            let _ = task.transition(TaskState::Ready);
                        }
                        let _ = task.transition(TaskState::Running);
                    }
                }

                let layer_cap = self.layer_cap(plan, &pending, base_cap);
                let outcomes = self.dispatch_layer(plan, &pending, &contexts, &context_by_task, layer_cap).await;
                pending.clear();

                for (task_id, status, error, files_changed, duration_ms) in outcomes {
                    global_metrics().record_histogram("task_duration_seconds", duration_ms as f64 / 1000.0);
                    match status {
                        TaskStatus::Success => {
                            let ctx_idx = context_by_task.get(&task_id).copied();
                            let task_name = plan.task(&task_id).map(|t| t.name.clone()).unwrap_or_else(|| task_id.clone());
                            let commit_message = build_deterministic_message(
                                &task_name,
                                files_changed.as_deref().unwrap_or(&[]),
                            );
                            let commit_hash = ctx_idx.and_then(|i| {
                                let ctx = &contexts[i];
                                self.backend
                                    .commit(
                                        &commit_message,
                                        &ctx.absolute_path,
                                        CommitOptions {
                                            files: files_changed.as_deref(),
                                            ..Default::default()
                                        },
                                    )
                                    .ok()
                            });

                            if let Some(task) = plan.task_mut(&task_id) {
                                let _ = task.transition(TaskState::Completed);
                                task.commit_hash = commit_hash.clone();
                                if let Some(idx) = ctx_idx {
                                    task.branch_name = Some(contexts[idx].branch_name.clone());
                                    task.worktree_path = Some(contexts[idx].worktree_path.clone());
                                }
                            }

                            if commit_hash.is_none() {
                                result.tasks.push(TaskResultEntry {
                                    task_id: task_id.clone(),
                                    outcome: TaskOutcome::Failure,
                                    duration_ms,
                                    error: Some("commit integration failed".to_string()),
                                    commit_hash: None,
                                });
                                self.mark_dependents_skipped(plan, &[task_id.clone()], &layers, &mut skipped, &mut result);
                                if !opts.continue_on_error {
                                    break 'layers;
                                }
                                continue;
                            }

                            result.tasks.push(TaskResultEntry {
                                task_id: task_id.clone(),
                                outcome: TaskOutcome::Success,
                                duration_ms,
                                error: None,
                                commit_hash: commit_hash.clone(),
                            });
                            if let Some(idx) = ctx_idx {
                                completed_this_layer.push(CompletedTask {
                                    task_id: task_id.clone(),
                                    branch_name: contexts[idx].branch_name.clone(),
                                });
                            }
                        }
                        TaskStatus::Cancelled => {
                            if let Some(task) = plan.task_mut(&task_id) {
                                let _ = task.transition(TaskState::Cancelled);
                            }
                            result.tasks.push(TaskResultEntry {
                                task_id: task_id.clone(),
                                outcome: TaskOutcome::Failure,
                                duration_ms,
                                error: Some("cancelled".to_string()),
                                commit_hash: None,
                            });
                        }
                        TaskStatus::Failure => {
                            let retry_again = plan.task_mut(&task_id).map(|task| {
                                let _ = task.transition(TaskState::Failed);
                                task.retry_count < task.max_retries
                            });

                            if retry_again == Some(true) {
                                let touched = files_changed.clone().unwrap_or_default();
                                let last_error = error.clone().unwrap_or_default();
                                if let Some(task) = plan.task_mut(&task_id) {
                                    task.retry_count += 1;
                                    let original_prompt = build_task_prompt(task);
                                    task.description = build_retry_prompt(&original_prompt, &last_error, &touched);
                                    let _ = task.transition(TaskState::Ready);
                                }
                                result.retries.push(RetryRecord {
                                    task_id: task_id.clone(),
                                    attempt: plan.task(&task_id).map(|t| t.retry_count).unwrap_or(0),
                                    reason: last_error,
                                });
                                pending.push(task_id);
                            } else {
                                result.tasks.push(TaskResultEntry {
                                    task_id: task_id.clone(),
                                    outcome: TaskOutcome::Failure,
                                    duration_ms,
                                    error,
                                    commit_hash: None,
                                });
                                self.mark_dependents_skipped(plan, &[task_id.clone()], &layers, &mut skipped, &mut result);
                                if !opts.continue_on_error {
                                    break 'layers;
                                }
                            }
                        }
                    }
                }
            }

            let conflict_strategy = self.config.conflict_strategy;
            match build_stack_from_tasks(
                self.backend.as_ref(),
                self.stack_capable.as_deref(),
                conflict_strategy,
                &completed_this_layer,
                &integration_ref,
                &self.bus,
                &opts.workdir,
            ) {
                Ok(stack_result) => {
                    result.branches.extend(stack_result.branches.clone());
                    result.commits.extend(stack_result.commits.clone());
                    if let Some(last) = stack_result.commits.last() {
                        integration_ref = last.clone();
                    }
                    if !stack_result.conflicts.is_empty() {
                        warn!(layer = ?layer, conflicts = stack_result.conflicts.len(), "unresolved integration conflicts in layer");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "stack assembly failed for layer");
                }
            }

            let keep_branch = matches!(opts.vcs_mode, VcsMode::Stacked) || !self.config.cleanup_on_success;
            if let Err(e) = self.worktree_engine.cleanup_worktrees(&contexts, keep_branch) {
                warn!(error = %e, "worktree cleanup failed");
            }

            global_metrics().record_histogram("layer_duration_seconds", layer_started.elapsed().as_secs_f64());
        }

        if self.config.stack_submission.enabled && !result.branches.is_empty() {
            result.pr_urls = submit_stack(
                self.backend.as_ref(),
                &result.branches,
                self.config.stack_submission.draft,
                self.config.stack_submission.auto_merge,
                &opts.workdir,
            );
        }

        result.total_duration_ms = started.elapsed().as_millis() as u64;
        self.bus.publish(BusEvent::Log {
            level: LogLevel::Info,
            message: format!(
                "execution done: {} succeeded, {} failed",
                result.tasks.iter().filter(|t| matches!(t.outcome, TaskOutcome::Success)).count(),
                result.failed_tasks().count()
            ),
            metadata: None,
        });

        Ok(result)
    }

    /// The concurrency cap for one dispatch of `runnable`, honoring the
    /// plan's declared [`PlanStrategy`]. `sequential` always dispatches one
    /// task at a time; `phased-parallel` drops to one whenever any runnable
    /// task belongs to a phase declared `sequential`; `parallel` is
    /// unaffected and uses `base_cap` as before.
    fn layer_cap(&self, plan: &Plan, runnable: &[String], base_cap: usize) -> usize {
        match plan.strategy {
            PlanStrategy::Sequential => 1,
            PlanStrategy::Parallel => base_cap,
            PlanStrategy::PhasedParallel => {
                let in_sequential_phase = runnable.iter().any(|id| {
                    plan.task(id)
                        .and_then(|t| t.phase.as_deref())
                        .and_then(|phase_id| {
                            plan.phases.as_ref().and_then(|phases| phases.iter().find(|p| p.id == phase_id))
                        })
                        .map(|phase| phase.strategy == PhaseStrategy::Sequential)
                        .unwrap_or(false)
                });
                if in_sequential_phase {
                    1
                } else {
                    base_cap
                }
            }
        }
    }

    /// Dispatch every id in `ids` concurrently, bounded by `cap`, and
    /// collect each terminal outcome.
    #[allow(clippy::type_complexity)]
    async fn dispatch_layer(
        &self,
        plan: &Plan,
        ids: &[String],
        contexts: &[chopstack_core::worktree::WorktreeContext],
        context_by_task: &HashMap<String, usize>,
        cap: usize,
    ) -> Vec<(String, TaskStatus, Option<String>, Option<Vec<String>>, u64)> {
        let semaphore = Arc::new(Semaphore::new(cap.max(1)));
        let mut set = tokio::task::JoinSet::new();

        for id in ids {
            let Some(task) = plan.task(id) else { continue };
            let Some(&ctx_idx) = context_by_task.get(id) else { continue };
            let ctx = &contexts[ctx_idx];

            let request = TaskRequest {
                task_id: task.id.clone(),
                title: task.name.clone(),
                prompt: build_task_prompt(task),
                files: task.files.clone(),
                workdir: ctx.absolute_path.clone(),
            };

            let orchestrator = self.orchestrator.clone();
            let permit = semaphore.clone();
            set.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore never closed");
                let outcome = orchestrator.run_task(request).await;
                (
                    outcome.task_id,
                    outcome.status,
                    outcome.error,
                    outcome.files_changed,
                    outcome.duration.as_millis() as u64,
                )
            });
        }

        let mut results = Vec::with_capacity(ids.len());
        while let Some(joined) = set.join_next().await {
            if let Ok(outcome) = joined {
                results.push(outcome);
            }
        }
        results
    }

    /// Recursively mark every transitive dependent of `failed_ids` as
    /// skipped, across all layers (a dependent may live several layers
    /// downstream of the task that failed).
    fn mark_dependents_skipped(
        &self,
        plan: &mut Plan,
        failed_ids: &[String],
        layers: &[Vec<String>],
        skipped: &mut HashSet<String>,
        result: &mut ExecutionResult,
    ) {
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for task in &plan.tasks {
            for dep in &task.dependencies {
                dependents.entry(dep.clone()).or_default().push(task.id.clone());
            }
        }

        let mut queue: Vec<String> = failed_ids.to_vec();
        let _ = layers;
        while let Some(id) = queue.pop() {
            if let Some(children) = dependents.get(&id) {
                for child in children.clone() {
                    if skipped.insert(child.clone()) {
                        if let Some(task) = plan.task_mut(&child) {
                            let _ = task.transition(TaskState::Skipped);
                        }
                        result.tasks.push(TaskResultEntry {
                            task_id: child.clone(),
                            outcome: TaskOutcome::Skipped,
                            duration_ms: 0,
                            error: None,
                            commit_hash: None,
                        });
                        queue.push(child);
                    }
                }
            }
        }
    }
}

/// The prompt handed to the adapter for a fresh (non-retried) attempt: the
/// task description plus its acceptance criteria, since the canonical
/// [`chopstack_core::plan::Task`] carries no separate prompt field.
fn build_task_prompt(task: &chopstack_core::plan::Task) -> String {
    if task.acceptance_criteria.is_empty() {
        return task.description.clone();
    }
    let mut prompt = task.description.clone();
    prompt.push_str("\n\nAcceptance criteria:\n");
    for criterion in &task.acceptance_criteria {
        prompt.push_str(&format!("- {criterion}\n"));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chopstack_core::config::Config;
    use chopstack_core::plan::{Complexity, PlanStrategy, Task};
    use chopstack_harness::stub::StubAdapter;
    use chopstack_vcs::git_runner::mock::MockGitRunner;
    use chopstack_vcs::git_runner::GitOutput;
    use chopstack_vcs::merge_commit::MergeCommitBackend;
    use std::collections::HashSet as StdHashSet;

    fn task(id: &str, deps: &[&str]) -> Task {
        Task {
            id: id.into(),
            name: id.into(),
            description: "x".repeat(60),
            complexity: Complexity::S,
            acceptance_criteria: Vec::new(),
            files: vec![format!("{id}.rs")],
            dependencies: deps.iter().map(|s| s.to_string()).collect::<StdHashSet<_>>(),
            phase: None,
            state: TaskState::Pending,
            retry_count: 0,
            max_retries: 1,
            state_history: Vec::new(),
            commit_hash: None,
            branch_name: None,
            worktree_path: None,
        }
    }

    fn sample_plan() -> Plan {
        Plan {
            name: "demo".into(),
            strategy: PlanStrategy::Parallel,
            phases: None,
            tasks: vec![task("a", &[]), task("b", &["a"])],
            success_metrics: None,
            mode: None,
        }
    }

    #[tokio::test]
    async fn invalid_plan_is_rejected_before_any_side_effect() {
        let mut plan = Plan {
            name: "bad".into(),
            strategy: PlanStrategy::Parallel,
            phases: None,
            tasks: vec![],
            success_metrics: None,
            mode: None,
        };
        let bus = EventBus::new();
        let git = Box::new(MockGitRunner::new());
        let worktree_engine = WorktreeEngine::new(std::env::temp_dir(), Config::default(), git);
        let backend: Arc<dyn VcsBackend> = Arc::new(MergeCommitBackend::new(Box::new(MockGitRunner::new())));
        let engine = ExecutionEngine::new(
            Arc::new(StubAdapter::succeeding(vec![])),
            bus,
            worktree_engine,
            backend,
            None,
            Config::default(),
        );
        let opts = ExecutionOptions::new(std::env::temp_dir(), "main");
        let err = engine.run(&mut plan, &opts).await.unwrap_err();
        assert!(matches!(err, EngineError::Invalid(_)));
    }

    #[tokio::test]
    async fn validate_mode_marks_every_task_success_without_touching_vcs() {
        let mut plan = sample_plan();
        let bus = EventBus::new();
        let git = Box::new(MockGitRunner::new());
        let worktree_engine = WorktreeEngine::new(std::env::temp_dir(), Config::default(), git);
        let backend: Arc<dyn VcsBackend> = Arc::new(MergeCommitBackend::new(Box::new(MockGitRunner::new())));
        let engine = ExecutionEngine::new(
            Arc::new(StubAdapter::succeeding(vec![])),
            bus,
            worktree_engine,
            backend,
            None,
            Config::default(),
        );
        let mut opts = ExecutionOptions::new(std::env::temp_dir(), "main");
        opts.mode = PlanMode::Validate;

        let result = engine.run(&mut plan, &opts).await.unwrap();
        assert_eq!(result.tasks.len(), 2);
        assert!(result.succeeded());
        assert!(result.commits.is_empty());
    }

    #[tokio::test]
    async fn successful_layer_integrates_and_advances_the_integration_ref() {
        let mut plan = Plan {
            name: "demo".into(),
            strategy: PlanStrategy::Parallel,
            phases: None,
            tasks: vec![task("a", &[])],
            success_metrics: None,
            mode: None,
        };

        let dir = tempfile::tempdir().unwrap();
        let worktree_git = MockGitRunner::new();
        let worktree_engine = WorktreeEngine::new(dir.path(), Config::default(), Box::new(worktree_git));

        let backend_git = MockGitRunner::new();
        backend_git.stub("rev-parse HEAD", GitOutput::ok("c0ffee\n"));
        let backend: Arc<dyn VcsBackend> = Arc::new(MergeCommitBackend::new(Box::new(backend_git)));

        let bus = EventBus::new();
        let engine = ExecutionEngine::new(
            Arc::new(StubAdapter::succeeding(vec!["a.rs".into()])),
            bus,
            worktree_engine,
            backend,
            None,
            Config::default(),
        );

        let opts = ExecutionOptions::new(dir.path(), "main");
        let result = engine.run(&mut plan, &opts).await.unwrap();
        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.tasks[0].outcome, TaskOutcome::Success);
        assert_eq!(result.tasks[0].commit_hash, Some("c0ffee".to_string()));
    }

    fn bare_engine() -> ExecutionEngine {
        let bus = EventBus::new();
        let worktree_engine = WorktreeEngine::new(std::env::temp_dir(), Config::default(), Box::new(MockGitRunner::new()));
        let backend: Arc<dyn VcsBackend> = Arc::new(MergeCommitBackend::new(Box::new(MockGitRunner::new())));
        ExecutionEngine::new(Arc::new(StubAdapter::succeeding(vec![])), bus, worktree_engine, backend, None, Config::default())
    }

    #[test]
    fn sequential_strategy_always_caps_at_one() {
        let mut plan = sample_plan();
        plan.strategy = PlanStrategy::Sequential;
        let engine = bare_engine();
        assert_eq!(engine.layer_cap(&plan, &["a".to_string(), "b".to_string()], 4), 1);
    }

    #[test]
    fn phased_parallel_caps_at_one_only_when_a_runnable_task_is_in_a_sequential_phase() {
        let mut plan = sample_plan();
        plan.strategy = PlanStrategy::PhasedParallel;
        plan.task_mut("a").unwrap().phase = Some("setup".to_string());
        plan.phases = Some(vec![chopstack_core::plan::Phase {
            id: "setup".into(),
            name: "Setup".into(),
            strategy: PhaseStrategy::Sequential,
            tasks: vec!["a".to_string()],
            requires: StdHashSet::new(),
        }]);
        let engine = bare_engine();

        assert_eq!(engine.layer_cap(&plan, &["a".to_string()], 4), 1);
        assert_eq!(engine.layer_cap(&plan, &["b".to_string()], 4), 4);
    }
}
