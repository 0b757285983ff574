//! Stack assembly: folding each completed task's commit into a target
//! branch, in topological order, applying the configured conflict policy
//! at the first collision.

use std::path::Path;

use chopstack_bus::event_bus::EventBus;
use chopstack_bus::protocol::BusEvent;
use chopstack_core::config::ConflictStrategy;
use tracing::info;

use crate::backend::{CommitOptions, MergeOutcome, StackCapable, SubmitOptions, VcsBackend, VcsResult};
use crate::conflict::{self, ConflictedFile, Resolution};

/// One task whose work is ready to fold into the integration branch.
#[derive(Debug, Clone)]
pub struct CompletedTask {
    pub task_id: String,
    pub branch_name: String,
}

#[derive(Debug, Clone)]
pub struct ConflictRecord {
    pub task_id: String,
    pub files: Vec<String>,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Default)]
pub struct StackBuildResult {
    pub branches: Vec<String>,
    pub commits: Vec<String>,
    pub pr_urls: Vec<String>,
    pub conflicts: Vec<ConflictRecord>,
}

/// Integrate every task in `completed` (already in topological order) onto
/// `parent_branch`, currently checked out in `workdir`. Stops at the first
/// conflict the policy cannot resolve; everything folded in before that
/// point is still reflected in the returned result. Every successful fold
/// — clean merge or auto-resolved conflict — publishes a
/// [`BusEvent::VcsBranchCreated`] and [`BusEvent::VcsCommit`] pair on `bus`.
pub fn build_stack_from_tasks(
    backend: &dyn VcsBackend,
    stack_capable: Option<&dyn StackCapable>,
    strategy: ConflictStrategy,
    completed: &[CompletedTask],
    parent_branch: &str,
    bus: &EventBus,
    workdir: &Path,
) -> VcsResult<StackBuildResult> {
    let mut result = StackBuildResult::default();

    for task in completed {
        info!(task_id = %task.task_id, branch = %task.branch_name, "integrating task branch");

        if let Some(stack_capable) = stack_capable {
            let _ = stack_capable.restack(&task.branch_name, workdir);
        }

        match backend.merge_branch(&task.branch_name, workdir)? {
            MergeOutcome::NothingToMerge => continue,
            MergeOutcome::Merged(sha) => {
                result.branches.push(task.branch_name.clone());
                result.commits.push(sha.clone());
                publish_fold(bus, &task.branch_name, parent_branch, &sha, &[]);
            }
            MergeOutcome::Conflict(files) => {
                let mut resolved_files = Vec::with_capacity(files.len());
                let mut all_resolved = true;

                for path in &files {
                    let (ours, theirs) = backend.read_conflict_sides(path, workdir)?;
                    let conflict = ConflictedFile {
                        path: path.clone(),
                        ours,
                        theirs,
                        theirs_is_chopstack_branch: task.branch_name.starts_with("chopstack/"),
                    };
                    let resolution = conflict::handle(strategy, &conflict);
                    if resolution == Resolution::Unresolved {
                        all_resolved = false;
                    }
                    resolved_files.push((path.clone(), resolution));
                }

                let primary = resolved_files
                    .first()
                    .map(|(_, r)| r.clone())
                    .unwrap_or(Resolution::Unresolved);
                result.conflicts.push(ConflictRecord {
                    task_id: task.task_id.clone(),
                    files: files.clone(),
                    resolution: primary,
                });

                if all_resolved {
                    // Re-stage every file's merged text, then complete the
                    // commit that a clean merge would otherwise have made.
                    for (path, resolution) in &resolved_files {
                        if let Resolution::Resolved { merged, .. } = resolution {
                            backend.stage_resolved_content(path, merged, workdir)?;
                        }
                    }
                    let message = format!("Merge branch '{}' (auto-resolved conflicts)", task.branch_name);
                    let sha = backend.commit(&message, workdir, CommitOptions::default())?;
                    result.branches.push(task.branch_name.clone());
                    result.commits.push(sha.clone());
                    publish_fold(bus, &task.branch_name, parent_branch, &sha, &files);
                } else {
                    // `fail`: abort and stop. `manual`: leave the tree
                    // conflicted and stop. Either way the caller sees the
                    // conflict in the result and decides next steps.
                    if matches!(strategy, ConflictStrategy::Fail) {
                        backend.abort_merge(workdir).ok();
                    }
                    break;
                }
            }
        }
    }

    Ok(result)
}

fn publish_fold(bus: &EventBus, branch_name: &str, parent_branch: &str, sha: &str, files_changed: &[String]) {
    bus.publish(BusEvent::VcsBranchCreated {
        branch_name: branch_name.to_string(),
        parent_branch: parent_branch.to_string(),
    });
    bus.publish(BusEvent::VcsCommit {
        branch_name: branch_name.to_string(),
        message: sha.to_string(),
        files_changed: files_changed.to_vec(),
    });
}

/// Submit the assembled stack's branches for review, if the backend
/// supports it. Submission failure is never fatal to the overall result.
pub fn submit_stack(
    backend: &dyn VcsBackend,
    branches: &[String],
    draft: bool,
    auto_merge: bool,
    workdir: &Path,
) -> Vec<String> {
    backend
        .submit(
            SubmitOptions {
                branches,
                draft,
                auto_merge,
                extra_args: &[],
            },
            workdir,
        )
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git_runner::mock::MockGitRunner;
    use crate::merge_commit::MergeCommitBackend;

    #[test]
    fn stops_at_first_unresolved_conflict_under_fail_strategy() {
        let mock = MockGitRunner::new();
        mock.stub(
            "diff --stat HEAD chopstack/task-a",
            crate::git_runner::GitOutput::ok("1 file changed"),
        );
        mock.stub(
            "merge --no-ff --no-commit chopstack/task-a",
            crate::git_runner::GitOutput {
                success: false,
                stdout: String::new(),
                stderr: "CONFLICT".into(),
            },
        );
        mock.stub(
            "diff --name-only --diff-filter=U",
            crate::git_runner::GitOutput::ok("conflicted.rs\n"),
        );

        let backend = MergeCommitBackend::new(Box::new(mock));
        let tasks = vec![CompletedTask {
            task_id: "task-a".into(),
            branch_name: "chopstack/task-a".into(),
        }];

        let bus = EventBus::new();
        let result = build_stack_from_tasks(
            &backend,
            None,
            ConflictStrategy::Fail,
            &tasks,
            "main",
            &bus,
            Path::new("."),
        )
        .unwrap();

        assert_eq!(result.conflicts.len(), 1);
        assert!(result.branches.is_empty());
        assert!(result.commits.is_empty());
    }

    #[test]
    fn resolved_conflict_stages_merged_text_and_records_a_commit() {
        let mock = MockGitRunner::new();
        mock.stub(
            "diff --stat HEAD chopstack/task-a",
            crate::git_runner::GitOutput::ok("1 file changed"),
        );
        mock.stub(
            "merge --no-ff --no-commit chopstack/task-a",
            crate::git_runner::GitOutput {
                success: false,
                stdout: String::new(),
                stderr: "CONFLICT".into(),
            },
        );
        mock.stub(
            "diff --name-only --diff-filter=U",
            crate::git_runner::GitOutput::ok("conflicted.rs\n"),
        );
        mock.stub("show :2:conflicted.rs", crate::git_runner::GitOutput::ok("same text"));
        mock.stub("show :3:conflicted.rs", crate::git_runner::GitOutput::ok("same text"));
        mock.stub("rev-parse HEAD", crate::git_runner::GitOutput::ok("resolved123\n"));

        let backend = MergeCommitBackend::new(Box::new(mock));
        let tasks = vec![CompletedTask {
            task_id: "task-a".into(),
            branch_name: "chopstack/task-a".into(),
        }];

        let workdir = tempfile::tempdir().unwrap();
        let bus = EventBus::new();
        let result = build_stack_from_tasks(
            &backend,
            None,
            ConflictStrategy::Auto,
            &tasks,
            "main",
            &bus,
            workdir.path(),
        )
        .unwrap();

        assert_eq!(result.branches, vec!["chopstack/task-a".to_string()]);
        assert_eq!(result.commits, vec!["resolved123".to_string()]);
    }

    #[test]
    fn skips_task_branch_with_nothing_to_merge() {
        let mock = MockGitRunner::new();
        let backend = MergeCommitBackend::new(Box::new(mock));
        let tasks = vec![CompletedTask {
            task_id: "task-a".into(),
            branch_name: "chopstack/task-a".into(),
        }];
        let bus = EventBus::new();
        let result = build_stack_from_tasks(
            &backend,
            None,
            ConflictStrategy::Auto,
            &tasks,
            "main",
            &bus,
            Path::new("."),
        )
        .unwrap();
        assert!(result.branches.is_empty());
        assert!(result.conflicts.is_empty());
    }
}
