//! The `stacked` backend: delegates parent-child branch tracking and
//! submission to an external stacking CLI (e.g. a Graphite- or
//! spr-style tool). The binary name is configurable so tests and
//! alternate tools can substitute their own.

use std::path::Path;

use crate::backend::{
    CommitOptions, CreateBranchOptions, MergeOutcome, StackCapable, SubmitOptions, VcsBackend, VcsError,
    VcsResult,
};
use crate::git_runner::GitRunner;

pub struct StackedBackend {
    git: Box<dyn GitRunner>,
    /// Name of the external stacking CLI binary, e.g. `"gt"`.
    stack_cli: String,
}

impl StackedBackend {
    pub fn new(git: Box<dyn GitRunner>, stack_cli: impl Into<String>) -> Self {
        Self {
            git,
            stack_cli: stack_cli.into(),
        }
    }

    fn run_git(&self, workdir: &Path, args: &[&str]) -> VcsResult<String> {
        let output = self
            .git
            .run(workdir, args)
            .map_err(|e| VcsError::new(args.join(" "), e))?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(VcsError::new(args.join(" "), output.stderr))
        }
    }

    /// The stacking CLI is itself a subprocess, not something `GitRunner`
    /// models — it is invoked the same way an execution adapter would be,
    /// via `std::process::Command`, since it is not git.
    fn run_stack_cli(&self, workdir: &Path, args: &[&str]) -> VcsResult<String> {
        let output = std::process::Command::new(&self.stack_cli)
            .args(args)
            .current_dir(workdir)
            .output()
            .map_err(|e| VcsError::new(format!("{} {}", self.stack_cli, args.join(" ")), e.to_string()))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(VcsError::new(
                format!("{} {}", self.stack_cli, args.join(" ")),
                String::from_utf8_lossy(&output.stderr).to_string(),
            ))
        }
    }
}

impl VcsBackend for StackedBackend {
    fn is_available(&self) -> bool {
        std::process::Command::new(&self.stack_cli)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn initialize(&self, workdir: &Path, trunk: Option<&str>) -> VcsResult<()> {
        let mut args = vec!["init"];
        if let Some(trunk) = trunk {
            args.push("--trunk");
            args.push(trunk);
        }
        self.run_stack_cli(workdir, &args).map(|_| ())
    }

    fn create_branch(
        &self,
        branch_name: &str,
        opts: CreateBranchOptions<'_>,
        workdir: &Path,
    ) -> VcsResult<()> {
        if let (Some(parent), true) = (opts.parent, opts.track) {
            self.run_git(workdir, &["checkout", "-b", branch_name, parent])?;
            self.track_branch(branch_name, parent, workdir)?;
            return Ok(());
        }
        let start_point = opts.base.or(opts.parent).unwrap_or("HEAD");
        self.run_git(workdir, &["branch", branch_name, start_point])?;
        Ok(())
    }

    fn delete_branch(&self, name: &str, workdir: &Path) -> VcsResult<()> {
        self.run_git(workdir, &["branch", "-D", name])?;
        Ok(())
    }

    fn commit(&self, message: &str, workdir: &Path, opts: CommitOptions<'_>) -> VcsResult<String> {
        match opts.files {
            Some(files) if !files.is_empty() => {
                let mut args = vec!["add"];
                args.extend(files.iter().map(|s| s.as_str()));
                self.run_git(workdir, &args)?;
            }
            _ => {
                self.run_git(workdir, &["add", "-A"])?;
            }
        }
        let mut commit_args = vec!["commit", "-m", message];
        if opts.allow_empty {
            commit_args.push("--allow-empty");
        }
        self.run_git(workdir, &commit_args)?;

        if !opts.no_restack {
            let _ = self.restack("HEAD", workdir);
        }

        let sha = self.run_git(workdir, &["rev-parse", "HEAD"])?;
        Ok(sha.trim().to_string())
    }

    fn submit(&self, opts: SubmitOptions<'_>, workdir: &Path) -> VcsResult<Vec<String>> {
        let mut args = vec!["submit"];
        if opts.draft {
            args.push("--draft");
        }
        if opts.auto_merge {
            args.push("--auto-merge");
        }
        for branch in opts.branches {
            args.push(branch.as_str());
        }
        for extra in opts.extra_args {
            args.push(extra.as_str());
        }
        let stdout = self.run_stack_cli(workdir, &args)?;
        Ok(stdout.lines().filter(|l| l.starts_with("http")).map(|s| s.to_string()).collect())
    }

    fn has_conflicts(&self, workdir: &Path) -> VcsResult<bool> {
        let output = self.run_git(workdir, &["diff", "--name-only", "--diff-filter=U"])?;
        Ok(!output.trim().is_empty())
    }

    fn conflicted_files(&self, workdir: &Path) -> VcsResult<Vec<String>> {
        let output = self.run_git(workdir, &["diff", "--name-only", "--diff-filter=U"])?;
        Ok(output.lines().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
    }

    fn abort_merge(&self, workdir: &Path) -> VcsResult<()> {
        self.run_git(workdir, &["merge", "--abort"])?;
        Ok(())
    }

    /// In stacked mode, integration is a cherry-pick of the task branch's
    /// tip commit onto the current branch rather than a merge commit —
    /// the stacking CLI's tracking relationship carries the history.
    fn merge_branch(&self, branch: &str, workdir: &Path) -> VcsResult<MergeOutcome> {
        let diff = self.run_git(workdir, &["diff", "--stat", "HEAD", branch])?;
        if diff.trim().is_empty() {
            return Ok(MergeOutcome::NothingToMerge);
        }

        let tip = self.run_git(workdir, &["rev-parse", branch])?;
        let output = self
            .git
            .run(workdir, &["cherry-pick", "--no-commit", tip.trim()])
            .map_err(|e| VcsError::new("git cherry-pick", e))?;

        if output.success {
            let sha = self
                .run_git(workdir, &["commit", "-m", &format!("Integrate '{branch}'")])
                .and_then(|_| self.run_git(workdir, &["rev-parse", "HEAD"]))?;
            Ok(MergeOutcome::Merged(sha.trim().to_string()))
        } else if self.has_conflicts(workdir)? {
            Ok(MergeOutcome::Conflict(self.conflicted_files(workdir)?))
        } else {
            Err(VcsError::new("git cherry-pick", output.stderr))
        }
    }

    fn read_conflict_sides(&self, path: &str, workdir: &Path) -> VcsResult<(String, String)> {
        let ours = self.run_git(workdir, &["show", &format!(":2:{path}")]).unwrap_or_default();
        let theirs = self.run_git(workdir, &["show", &format!(":3:{path}")]).unwrap_or_default();
        Ok((ours, theirs))
    }

    fn stage_resolved_content(&self, path: &str, content: &str, workdir: &Path) -> VcsResult<()> {
        let full_path = workdir.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VcsError::new(format!("create_dir_all {path}"), e.to_string()))?;
        }
        std::fs::write(&full_path, content)
            .map_err(|e| VcsError::new(format!("write {path}"), e.to_string()))?;
        self.run_git(workdir, &["add", path])?;
        Ok(())
    }
}

impl StackCapable for StackedBackend {
    fn track_branch(&self, branch: &str, parent: &str, workdir: &Path) -> VcsResult<()> {
        self.run_stack_cli(workdir, &["track", branch, "--parent", parent])
            .map(|_| ())
    }

    fn restack(&self, branch: &str, workdir: &Path) -> VcsResult<()> {
        self.run_stack_cli(workdir, &["restack", branch]).map(|_| ())
    }

    fn stack_info(&self, workdir: &Path) -> VcsResult<Vec<String>> {
        let stdout = self.run_stack_cli(workdir, &["log", "--stack"])?;
        Ok(stdout.lines().map(|s| s.to_string()).collect())
    }
}
