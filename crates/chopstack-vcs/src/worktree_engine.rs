//! Worktree lifecycle: one git worktree per task, rooted under the
//! configured shadow path, with crash-safe collision reporting and
//! age-based cleanup of anything left behind by an aborted run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chopstack_core::config::Config;
use chopstack_core::worktree::{branch_name_for, sanitize_name, WorktreeContext};
use tracing::{info, warn};

use crate::backend::{VcsError, VcsResult};
use crate::git_runner::GitRunner;

pub struct WorktreeEngine {
    repo_root: PathBuf,
    config: Config,
    git: Box<dyn GitRunner>,
}

impl WorktreeEngine {
    pub fn new(repo_root: impl Into<PathBuf>, config: Config, git: Box<dyn GitRunner>) -> Self {
        Self {
            repo_root: repo_root.into(),
            config,
            git,
        }
    }

    fn worktree_dir(&self, task_id: &str) -> PathBuf {
        self.repo_root
            .join(&self.config.shadow_path)
            .join(sanitize_name(task_id))
    }

    /// Create one worktree per `(task_id, base_ref)` pair, in order.
    ///
    /// If a worktree or branch of the expected name already exists (a
    /// crashed previous run), this returns an error naming the exact
    /// `git worktree remove` / `git branch -D` commands a user would run
    /// to clear it, rather than silently reusing or deleting it.
    pub fn create_worktrees_for_tasks(
        &self,
        tasks: &[(String, String)],
    ) -> VcsResult<Vec<WorktreeContext>> {
        let mut created = Vec::with_capacity(tasks.len());
        for (task_id, base_ref) in tasks {
            created.push(self.create_one(task_id, base_ref)?);
        }
        Ok(created)
    }

    fn create_one(&self, task_id: &str, base_ref: &str) -> VcsResult<WorktreeContext> {
        let branch_name = branch_name_for(&self.config.branch_prefix, task_id);
        let worktree_path = self.worktree_dir(task_id);

        if worktree_path.exists() {
            return Err(VcsError::new(
                "worktree add",
                format!(
                    "worktree already exists at {}; previous run may have crashed. \
                     Clean up with: git worktree remove --force {} && git branch -D {}",
                    worktree_path.display(),
                    worktree_path.display(),
                    branch_name
                ),
            ));
        }

        if let Some(parent) = worktree_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VcsError::new("mkdir", e.to_string()))?;
        }

        info!(task_id, branch = %branch_name, path = %worktree_path.display(), "creating worktree");

        let path_str = worktree_path.to_string_lossy().to_string();
        let output = self
            .git
            .run(
                &self.repo_root,
                &["worktree", "add", "-b", &branch_name, &path_str, base_ref],
            )
            .map_err(|e| VcsError::new("git worktree add", e))?;

        if !output.success {
            return Err(VcsError::new("git worktree add", output.stderr));
        }

        Ok(WorktreeContext::new(
            task_id.to_string(),
            branch_name,
            sanitize_name(task_id),
            worktree_path,
            base_ref.to_string(),
        ))
    }

    /// Remove each worktree's directory. Branch deletion is governed by
    /// `keep_branch` (kept for stacked workflows, deleted otherwise).
    pub fn cleanup_worktrees(
        &self,
        contexts: &[WorktreeContext],
        keep_branch: bool,
    ) -> VcsResult<()> {
        for ctx in contexts {
            let path_str = ctx.absolute_path.to_string_lossy().to_string();
            match self.git.run(&self.repo_root, &["worktree", "remove", "--force", &path_str]) {
                Ok(output) if output.success => {}
                Ok(output) => warn!(task_id = %ctx.task_id, stderr = %output.stderr, "worktree remove failed"),
                Err(e) => warn!(task_id = %ctx.task_id, error = %e, "worktree remove failed"),
            }

            if !keep_branch {
                if let Err(e) = self.git.run(&self.repo_root, &["branch", "-D", &ctx.branch_name]) {
                    warn!(branch = %ctx.branch_name, error = %e, "branch delete failed");
                }
            }
        }
        Ok(())
    }

    /// Remove worktree directories under the shadow path that are older
    /// than `max_age`, regardless of which run created them.
    pub fn cleanup_stale(&self, max_age: Duration) -> VcsResult<Vec<PathBuf>> {
        let shadow_dir = self.repo_root.join(&self.config.shadow_path);
        let mut removed = Vec::new();
        if !shadow_dir.exists() {
            return Ok(removed);
        }

        let cutoff = std::time::SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);

        let entries = std::fs::read_dir(&shadow_dir).map_err(|e| VcsError::new("readdir", e.to_string()))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            if modified < cutoff {
                let path_str = path.to_string_lossy().to_string();
                match self.git.run(&self.repo_root, &["worktree", "remove", "--force", &path_str]) {
                    Ok(output) if output.success => removed.push(path),
                    Ok(output) => warn!(path = %path.display(), stderr = %output.stderr, "stale worktree removal failed"),
                    Err(e) => warn!(path = %path.display(), error = %e, "stale worktree removal failed"),
                }
            }
        }
        Ok(removed)
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }
}
