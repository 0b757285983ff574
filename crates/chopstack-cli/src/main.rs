mod commands;

use std::path::PathBuf;

use chopstack_bus::renderer::RenderMode;
use chopstack_engine::engine::VcsMode;
use clap::{Parser, Subcommand, ValueEnum};

/// Chopstack -- decompose a spec into a task DAG and run it through
/// isolated worktrees and parallel coding-agent subprocesses.
#[derive(Parser)]
#[command(name = "chopstack", version, about)]
struct Cli {
    /// Increase log verbosity (human-readable; set RUST_LOG for finer control).
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a plan file's structure without running anything.
    Validate {
        /// Path to a plan file (.yaml/.yml/.json).
        plan: PathBuf,
        /// Output the gate report as JSON.
        #[arg(short = 'j', long)]
        json: bool,
    },

    /// Execute a validated plan: worktrees, task dispatch, stack assembly.
    Execute {
        /// Path to a plan file (.yaml/.yml/.json).
        plan: PathBuf,
        /// Repository root to run in (worktrees and branches are created relative to this).
        #[arg(short = 'w', long, default_value = ".")]
        workdir: PathBuf,
        /// The ref new worktrees are created from before the first layer.
        #[arg(long, default_value = "HEAD")]
        parent_ref: String,
        /// Branch-integration strategy.
        #[arg(long, value_enum, default_value_t = VcsModeArg::MergeCommit)]
        vcs_mode: VcsModeArg,
        /// External stacking CLI binary name, used only when --vcs-mode=stacked.
        #[arg(long, default_value = "gt")]
        stack_cli: String,
        /// Coding-agent binary to spawn per task.
        #[arg(long)]
        agent_bin: String,
        /// Extra argument to pass to the agent binary (repeatable).
        #[arg(long = "agent-arg")]
        agent_args: Vec<String>,
        /// Keep running remaining tasks after an unrecovered failure.
        #[arg(long)]
        continue_on_error: bool,
        /// Simulate the run: mark every task completed without spawning agents or touching git.
        #[arg(long)]
        dry_run: bool,
        /// Validate the plan and compute layers only; equivalent to --dry-run at the engine level.
        #[arg(long)]
        validate_only: bool,
        /// Treat validation errors as warnings and attempt the run anyway.
        #[arg(long)]
        permissive: bool,
        /// Cap concurrent tasks within a layer (never exceeds the layer's own width).
        #[arg(long)]
        max_parallelism: Option<usize>,
        /// Write the run's `ExecutionResult` as JSON to this path.
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,
        /// Output verbosity for the rendered event stream.
        #[arg(long, value_enum, default_value_t = RenderModeArg::Normal)]
        render: RenderModeArg,
    },

    /// Process gates: structural checks run outside the engine's own pipeline.
    Gates {
        #[command(subcommand)]
        command: GatesCommands,
    },

    /// Inspect or initialise the run configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum GatesCommands {
    /// Flag a specification too thin to decompose into a plan.
    Spec {
        /// Path to a specification file.
        spec: PathBuf,
        #[arg(short = 'j', long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration.
    Show {
        #[arg(short = 'p', long = "project", default_value = ".")]
        project: PathBuf,
        #[arg(short = 'j', long)]
        json: bool,
    },
    /// Write a default `.chopstack/config.toml`.
    Init {
        #[arg(short = 'p', long = "project", default_value = ".")]
        project: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum VcsModeArg {
    MergeCommit,
    Stacked,
}

impl From<VcsModeArg> for VcsMode {
    fn from(v: VcsModeArg) -> Self {
        match v {
            VcsModeArg::MergeCommit => VcsMode::MergeCommit,
            VcsModeArg::Stacked => VcsMode::Stacked,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RenderModeArg {
    Quiet,
    Normal,
    Verbose,
}

impl From<RenderModeArg> for RenderMode {
    fn from(v: RenderModeArg) -> Self {
        match v {
            RenderModeArg::Quiet => RenderMode::Quiet,
            RenderModeArg::Normal => RenderMode::Normal,
            RenderModeArg::Verbose => RenderMode::Verbose,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    chopstack_telemetry::logging::init_logging("chopstack-cli", default_level);

    let ok = match cli.command {
        Commands::Validate { plan, json } => commands::validate::run(&plan, json)?,
        Commands::Execute {
            plan,
            workdir,
            parent_ref,
            vcs_mode,
            stack_cli,
            agent_bin,
            agent_args,
            continue_on_error,
            dry_run,
            validate_only,
            permissive,
            max_parallelism,
            out,
            render,
        } => {
            commands::execute::run(commands::execute::ExecuteArgs {
                plan_path: plan,
                workdir,
                parent_ref,
                vcs_mode: vcs_mode.into(),
                stack_cli,
                agent_bin,
                agent_args,
                continue_on_error,
                dry_run,
                validate_only,
                permissive,
                max_parallelism,
                render_mode: render.into(),
                out_path: out,
            })
            .await?
        }
        Commands::Gates { command } => match command {
            GatesCommands::Spec { spec, json } => commands::gates::spec(&spec, json)?,
        },
        Commands::Config { command } => {
            match command {
                ConfigCommands::Show { project, json } => commands::config::show(&project, json)?,
                ConfigCommands::Init { project } => commands::config::init(&project)?,
            }
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
