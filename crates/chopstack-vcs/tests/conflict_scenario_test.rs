//! End-to-end scenario: two sequential task branches collide during stack
//! assembly and the `auto` conflict strategy resolves the collision instead
//! of aborting the run.

use chopstack_bus::event_bus::EventBus;
use chopstack_core::config::ConflictStrategy;
use chopstack_vcs::backend::VcsBackend;
use chopstack_vcs::git_runner::mock::MockGitRunner;
use chopstack_vcs::git_runner::GitOutput;
use chopstack_vcs::merge_commit::MergeCommitBackend;
use chopstack_vcs::stack_engine::{build_stack_from_tasks, CompletedTask};

#[test]
fn auto_strategy_resolves_conflict_and_both_branches_reach_trunk() {
    let mock = MockGitRunner::new();

    // First task's branch merges cleanly.
    mock.stub(
        "diff --stat HEAD chopstack/first",
        GitOutput::ok("1 file changed"),
    );
    mock.stub(
        "merge --no-ff --no-commit chopstack/first",
        GitOutput::ok(""),
    );

    // Second task's branch collides with the first's changes to the same
    // block; the merge command itself reports failure with CONFLICT markers.
    mock.stub(
        "diff --stat HEAD chopstack/second",
        GitOutput::ok("1 file changed"),
    );
    mock.stub(
        "merge --no-ff --no-commit chopstack/second",
        GitOutput {
            success: false,
            stdout: String::new(),
            stderr: "CONFLICT (content): Merge conflict in src/imports.ts".into(),
        },
    );
    mock.stub(
        "diff --name-only --diff-filter=U",
        GitOutput::ok("src/imports.ts\n"),
    );
    mock.stub("show :2:src/imports.ts", GitOutput::ok("use a;\nuse b;"));
    mock.stub("show :3:src/imports.ts", GitOutput::ok("use a;\nuse c;"));
    mock.stub("rev-parse HEAD", GitOutput::ok("d00dfeed\n"));

    let backend = MergeCommitBackend::new(Box::new(mock));
    let tasks = vec![
        CompletedTask {
            task_id: "first".into(),
            branch_name: "chopstack/first".into(),
        },
        CompletedTask {
            task_id: "second".into(),
            branch_name: "chopstack/second".into(),
        },
    ];

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

    assert_eq!(result.conflicts.len(), 1, "expected one recorded conflict");
    assert_eq!(result.conflicts[0].task_id, "second");
    assert!(
        matches!(
            result.conflicts[0].resolution,
            chopstack_vcs::conflict::Resolution::Resolved { .. }
        ),
        "auto strategy should resolve the conflict, got {:?}",
        result.conflicts[0].resolution
    );

    // Both branches folded into the trunk: the first via a clean merge, the
    // second via the resolved conflict — and both commits landed for real.
    assert!(result.branches.contains(&"chopstack/first".to_string()));
    assert!(result.branches.contains(&"chopstack/second".to_string()));
    assert_eq!(result.commits.len(), 2, "the resolved conflict must also produce a commit");
    assert!(result.commits.iter().all(|sha| sha == "d00dfeed"));

    // `is_available` reflects the underlying `git --version` probe the mock
    // always answers successfully, confirming the backend is usable in the
    // same run that just resolved a conflict.
    assert!(backend.is_available());
}
