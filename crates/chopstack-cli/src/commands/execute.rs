use std::path::{Path, PathBuf};
use std::sync::Arc;

use chopstack_bus::event_bus::EventBus;
use chopstack_bus::renderer::{RenderMode, Renderer};
use chopstack_core::config::SettingsManager;
use chopstack_core::plan::parse_file;
use chopstack_engine::engine::{ExecutionEngine, ExecutionOptions, VcsMode};
use chopstack_harness::adapter::ExecutionAdapter;
use chopstack_harness::subprocess::SubprocessAdapter;
use chopstack_vcs::backend::{StackCapable, VcsBackend};
use chopstack_vcs::git_runner::RealGitRunner;
use chopstack_vcs::merge_commit::MergeCommitBackend;
use chopstack_vcs::stacked::StackedBackend;
use chopstack_vcs::worktree_engine::WorktreeEngine;

/// Everything a caller needs to specify to run a plan, independent of how
/// it was gathered (CLI flags today, a future programmatic caller later).
pub struct ExecuteArgs {
    pub plan_path: PathBuf,
    pub workdir: PathBuf,
    pub parent_ref: String,
    pub vcs_mode: VcsMode,
    pub stack_cli: String,
    pub agent_bin: String,
    pub agent_args: Vec<String>,
    pub continue_on_error: bool,
    pub dry_run: bool,
    pub validate_only: bool,
    pub permissive: bool,
    pub max_parallelism: Option<usize>,
    pub render_mode: RenderMode,
    pub out_path: Option<PathBuf>,
}

pub async fn run(args: ExecuteArgs) -> anyhow::Result<bool> {
    let text = std::fs::read_to_string(&args.plan_path).map_err(|e| {
        anyhow::anyhow!("could not read plan file {}: {e}", args.plan_path.display())
    })?;
    let mut parsed = parse_file(&args.plan_path, &text).map_err(|e| {
        anyhow::anyhow!("could not parse plan file {}: {e}", args.plan_path.display())
    })?;
    for warning in &parsed.warnings {
        tracing::warn!("{warning}");
    }

    let config = SettingsManager::project_local(args.workdir.clone()).load_or_default();

    let bus = EventBus::new();
    let (renderer, rx) = chopstack_bus::renderer::subscribe_renderer(&bus, args.render_mode);
    let render_handle = std::thread::spawn(move || renderer.run_to_stdout(rx));

    let worktree_engine = WorktreeEngine::new(args.workdir.clone(), config.clone(), Box::new(RealGitRunner));

    let (backend, stack_capable): (Arc<dyn VcsBackend>, Option<Arc<dyn StackCapable>>) = match args.vcs_mode {
        VcsMode::MergeCommit => (Arc::new(MergeCommitBackend::new(Box::new(RealGitRunner))), None),
        VcsMode::Stacked => {
            let backend = Arc::new(StackedBackend::new(Box::new(RealGitRunner), args.stack_cli.clone()));
            (backend.clone(), Some(backend))
        }
    };

    let adapter: Arc<dyn ExecutionAdapter> =
        Arc::new(SubprocessAdapter::new(args.agent_bin.clone(), args.agent_args.clone()));

    let engine = ExecutionEngine::new(adapter, bus.clone(), worktree_engine, backend, stack_capable, config);

    let mut opts = ExecutionOptions::new(args.workdir.clone(), args.parent_ref.clone());
    opts.vcs_mode = args.vcs_mode;
    opts.continue_on_error = args.continue_on_error;
    opts.dry_run = args.dry_run;
    opts.agent = args.agent_bin.clone();
    opts.permissive_validation = args.permissive;
    opts.max_parallelization = args.max_parallelism;
    if args.validate_only {
        opts.mode = chopstack_core::plan::PlanMode::Validate;
    }

    let result = engine.run(&mut parsed.plan, &opts).await?;
    drop(engine);
    drop(bus);
    let _ = render_handle.join();

    println!(
        "{}: {} task(s), {} commit(s), {} retr(y/ies)",
        result.plan_name,
        result.tasks.len(),
        result.commits.len(),
        result.retries.len()
    );
    for failed in result.failed_tasks() {
        println!("  failed: {} ({})", failed.task_id, failed.error.as_deref().unwrap_or("unknown error"));
    }

    if let Some(out_path) = &args.out_path {
        write_json(out_path, &result)?;
    }

    Ok(result.succeeded())
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
