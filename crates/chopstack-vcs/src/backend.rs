//! The polymorphic VCS port: required operations every backend supports,
//! plus an optional capability surface for backends that understand
//! stacked (parent-child) branches.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("vcs command failed: {command}: {diagnostic}")]
pub struct VcsError {
    pub command: String,
    pub diagnostic: String,
}

impl VcsError {
    pub fn new(command: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            diagnostic: diagnostic.into(),
        }
    }
}

pub type VcsResult<T> = Result<T, VcsError>;

#[derive(Debug, Clone, Default)]
pub struct CreateBranchOptions<'a> {
    pub base: Option<&'a str>,
    pub parent: Option<&'a str>,
    pub track: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CommitOptions<'a> {
    pub files: Option<&'a [String]>,
    pub allow_empty: bool,
    pub no_restack: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SubmitOptions<'a> {
    pub branches: &'a [String],
    pub draft: bool,
    pub auto_merge: bool,
    pub extra_args: &'a [String],
}

/// Required operations every backend implements, whether it speaks plain
/// git or delegates to a stacking-aware CLI.
pub trait VcsBackend: Send + Sync {
    fn is_available(&self) -> bool;

    fn initialize(&self, workdir: &Path, trunk: Option<&str>) -> VcsResult<()>;

    /// Creates `branch_name` from `base` (or `parent`, or `HEAD`, in that
    /// order of precedence). When `opts.track` is set and the backend
    /// supports stacking, the branch is additionally registered as a
    /// child of `opts.parent`.
    fn create_branch(
        &self,
        branch_name: &str,
        opts: CreateBranchOptions<'_>,
        workdir: &Path,
    ) -> VcsResult<()>;

    fn delete_branch(&self, name: &str, workdir: &Path) -> VcsResult<()>;

    /// Stages `opts.files` (or everything modified, if `None`) and commits.
    /// Returns the resulting commit hash.
    fn commit(&self, message: &str, workdir: &Path, opts: CommitOptions<'_>) -> VcsResult<String>;

    /// Returns one review URL per branch that was actually submitted.
    /// Backends with no review-system integration return an empty list.
    fn submit(&self, opts: SubmitOptions<'_>, workdir: &Path) -> VcsResult<Vec<String>>;

    fn has_conflicts(&self, workdir: &Path) -> VcsResult<bool>;

    fn conflicted_files(&self, workdir: &Path) -> VcsResult<Vec<String>>;

    fn abort_merge(&self, workdir: &Path) -> VcsResult<()>;

    /// Integrate `branch` into whatever is currently checked out in
    /// `workdir`, the primitive stack assembly is built on. Not part of
    /// the original required-operations list but needed by both concrete
    /// backends to realize it.
    fn merge_branch(&self, branch: &str, workdir: &Path) -> VcsResult<MergeOutcome>;

    /// Reads both sides of a conflicted path directly from the index
    /// (stage 2 is "ours", stage 3 is "theirs"), bypassing the
    /// conflict-marker text git writes into the worktree. A side missing
    /// entirely (an add/add conflict where one parent has no blob at that
    /// path) reads as empty rather than failing.
    fn read_conflict_sides(&self, path: &str, workdir: &Path) -> VcsResult<(String, String)>;

    /// Writes `content` to `path` in the worktree and stages it,
    /// overwriting whatever conflict markers git left there.
    fn stage_resolved_content(&self, path: &str, content: &str, workdir: &Path) -> VcsResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged(String),
    Conflict(Vec<String>),
    NothingToMerge,
}

/// Optional capability a backend may expose when it understands
/// parent-child branch stacks. Queried dynamically rather than assumed,
/// since the merge-commit backend has no notion of a stack.
pub trait StackCapable {
    fn track_branch(&self, branch: &str, parent: &str, workdir: &Path) -> VcsResult<()>;

    fn restack(&self, branch: &str, workdir: &Path) -> VcsResult<()>;

    fn stack_info(&self, workdir: &Path) -> VcsResult<Vec<String>>;
}
