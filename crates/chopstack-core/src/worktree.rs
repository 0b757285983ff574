//! The static description of a task's isolated worktree.
//!
//! [`WorktreeContext`] is pure data — `chopstack-vcs` is the crate that
//! actually shells out to `git worktree add`/`remove`; this type is what it
//! hands back (and what gets persisted in run state) so the rest of the
//! workspace never needs to know how a worktree was created.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorktreeContext {
    pub task_id: String,
    pub branch_name: String,
    /// Path relative to the shadow directory configured for the run.
    pub worktree_path: String,
    pub absolute_path: PathBuf,
    pub base_ref: String,
    pub created: DateTime<Utc>,
}

impl WorktreeContext {
    pub fn new(
        task_id: impl Into<String>,
        branch_name: impl Into<String>,
        worktree_path: impl Into<String>,
        absolute_path: PathBuf,
        base_ref: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            branch_name: branch_name.into(),
            worktree_path: worktree_path.into(),
            absolute_path,
            base_ref: base_ref.into(),
            created: Utc::now(),
        }
    }
}

/// Derive a filesystem- and git-ref-safe name from a task id: lowercase,
/// non-alphanumeric runs collapsed to a single `-`, trimmed of leading and
/// trailing separators.
pub fn sanitize_name(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut last_was_sep = false;
    for ch in id.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('-');
            last_was_sep = true;
        }
    }
    out.trim_matches('-').to_string()
}

/// Build the conventional branch name for a task: `{prefix}{sanitized-id}`.
pub fn branch_name_for(prefix: &str, task_id: &str) -> String {
    format!("{prefix}{}", sanitize_name(task_id))
}
