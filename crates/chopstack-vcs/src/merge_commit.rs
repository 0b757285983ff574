//! The `merge-commit` backend: plain git, no stacking CLI required. Stack
//! assembly merges each task's branch into the target with `--no-ff`,
//! stopping at the first conflict.

use std::path::Path;

use crate::backend::{
    CommitOptions, CreateBranchOptions, MergeOutcome, SubmitOptions, VcsBackend, VcsError, VcsResult,
};
use crate::git_runner::GitRunner;

pub struct MergeCommitBackend {
    git: Box<dyn GitRunner>,
}

impl MergeCommitBackend {
    pub fn new(git: Box<dyn GitRunner>) -> Self {
        Self { git }
    }

    fn run(&self, workdir: &Path, args: &[&str]) -> VcsResult<String> {
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
}

impl VcsBackend for MergeCommitBackend {
    fn is_available(&self) -> bool {
        self.git
            .run(Path::new("."), &["--version"])
            .map(|o| o.success)
            .unwrap_or(false)
    }

    fn initialize(&self, workdir: &Path, trunk: Option<&str>) -> VcsResult<()> {
        let output = self
            .git
            .run(workdir, &["rev-parse", "--is-inside-work-tree"])
            .map_err(|e| VcsError::new("rev-parse", e))?;
        if output.success {
            return Ok(());
        }
        self.run(workdir, &["init", "-b", trunk.unwrap_or("main")])?;
        Ok(())
    }

    fn create_branch(
        &self,
        branch_name: &str,
        opts: CreateBranchOptions<'_>,
        workdir: &Path,
    ) -> VcsResult<()> {
        let start_point = opts.base.or(opts.parent).unwrap_or("HEAD");
        self.run(workdir, &["branch", branch_name, start_point])?;
        Ok(())
    }

    fn delete_branch(&self, name: &str, workdir: &Path) -> VcsResult<()> {
        self.run(workdir, &["branch", "-D", name])?;
        Ok(())
    }

    fn commit(&self, message: &str, workdir: &Path, opts: CommitOptions<'_>) -> VcsResult<String> {
        match opts.files {
            Some(files) if !files.is_empty() => {
                let mut args = vec!["add"];
                args.extend(files.iter().map(|s| s.as_str()));
                self.run(workdir, &args)?;
            }
            _ => {
                self.run(workdir, &["add", "-A"])?;
            }
        }

        let mut commit_args = vec!["commit", "-m", message];
        if opts.allow_empty {
            commit_args.push("--allow-empty");
        }
        self.run(workdir, &commit_args)?;
        let sha = self.run(workdir, &["rev-parse", "HEAD"])?;
        Ok(sha.trim().to_string())
    }

    fn submit(&self, _opts: SubmitOptions<'_>, _workdir: &Path) -> VcsResult<Vec<String>> {
        // No review-system integration for plain git; the caller is
        // expected to push and open a PR through their own tooling.
        Ok(Vec::new())
    }

    fn has_conflicts(&self, workdir: &Path) -> VcsResult<bool> {
        let output = self.run(workdir, &["diff", "--name-only", "--diff-filter=U"])?;
        Ok(!output.trim().is_empty())
    }

    fn conflicted_files(&self, workdir: &Path) -> VcsResult<Vec<String>> {
        let output = self.run(workdir, &["diff", "--name-only", "--diff-filter=U"])?;
        Ok(output.lines().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
    }

    fn abort_merge(&self, workdir: &Path) -> VcsResult<()> {
        self.run(workdir, &["merge", "--abort"])?;
        Ok(())
    }

    /// Merge `branch` into whatever is currently checked out, using
    /// `--no-ff` so the merge remains visible in history.
    fn merge_branch(&self, branch: &str, workdir: &Path) -> VcsResult<MergeOutcome> {
        let diff = self.run(workdir, &["diff", "--stat", "HEAD", branch])?;
        if diff.trim().is_empty() {
            return Ok(MergeOutcome::NothingToMerge);
        }

        let output = self
            .git
            .run(workdir, &["merge", "--no-ff", "--no-commit", branch])
            .map_err(|e| VcsError::new("git merge --no-ff", e))?;

        if output.success {
            let sha = self.run(workdir, &["commit", "-m", &format!("Merge branch '{branch}'")])
                .and_then(|_| self.run(workdir, &["rev-parse", "HEAD"]))?;
            Ok(MergeOutcome::Merged(sha.trim().to_string()))
        } else if self.has_conflicts(workdir)? {
            Ok(MergeOutcome::Conflict(self.conflicted_files(workdir)?))
        } else {
            Err(VcsError::new("git merge --no-ff", output.stderr))
        }
    }

    fn read_conflict_sides(&self, path: &str, workdir: &Path) -> VcsResult<(String, String)> {
        let ours = self.run(workdir, &["show", &format!(":2:{path}")]).unwrap_or_default();
        let theirs = self.run(workdir, &["show", &format!(":3:{path}")]).unwrap_or_default();
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
        self.run(workdir, &["add", path])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git_runner::mock::MockGitRunner;

    #[test]
    fn commit_stages_named_files_and_returns_sha() {
        let mock = MockGitRunner::new();
        mock.stub("rev-parse HEAD", crate::git_runner::GitOutput::ok("deadbeef\n"));
        let backend = MergeCommitBackend::new(Box::new(mock));
        let sha = backend
            .commit(
                "msg",
                Path::new("."),
                CommitOptions {
                    files: Some(&["a.rs".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(sha, "deadbeef");
    }

    #[test]
    fn submit_returns_empty_for_plain_git() {
        let mock = MockGitRunner::new();
        let backend = MergeCommitBackend::new(Box::new(mock));
        let urls = backend
            .submit(SubmitOptions::default(), Path::new("."))
            .unwrap();
        assert!(urls.is_empty());
    }
}
