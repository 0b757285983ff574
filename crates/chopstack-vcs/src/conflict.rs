//! Conflict resolution policy for stack assembly: `fail` aborts immediately,
//! `manual` leaves the tree conflicted for the caller, and `auto` applies a
//! fixed textual-merge precedence before falling back to `manual`.

use chopstack_core::config::ConflictStrategy;
use serde::Serialize;

/// One side of a conflicted hunk as the engine sees it: the incoming
/// task's content and the current trunk/parent content it collided with.
#[derive(Debug, Clone)]
pub struct ConflictedFile {
    pub path: String,
    pub ours: String,
    pub theirs: String,
    /// `true` when `theirs` originates from a chopstack-managed branch
    /// (used by precedence rule (e)).
    pub theirs_is_chopstack_branch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Resolution {
    /// Resolved automatically; carries the rule that fired and the merged text.
    Resolved { rule: &'static str, merged: String },
    /// Could not be resolved automatically; caller falls back to manual handling.
    Unresolved,
}

/// Apply the fixed auto-resolution precedence from rule (a) through (e).
/// Returns `Resolution::Unresolved` if none of the rules apply.
pub fn resolve_auto(conflict: &ConflictedFile) -> Resolution {
    let ours_trimmed = conflict.ours.trim();
    let theirs_trimmed = conflict.theirs.trim();

    // (a) whitespace-only difference: keep the non-empty trimmed side.
    if ours_trimmed == theirs_trimmed {
        let merged = if !ours_trimmed.is_empty() {
            conflict.ours.clone()
        } else {
            conflict.theirs.clone()
        };
        return Resolution::Resolved {
            rule: "whitespace-only",
            merged,
        };
    }

    // (b) both sides are import/export blocks: union the lines.
    if is_import_export_block(&conflict.ours) && is_import_export_block(&conflict.theirs) {
        let mut lines: Vec<&str> = conflict.ours.lines().chain(conflict.theirs.lines()).collect();
        lines.sort_unstable();
        lines.dedup();
        return Resolution::Resolved {
            rule: "import-export-union",
            merged: lines.join("\n"),
        };
    }

    // (c) both sides parse as JSON object fragments: merge keys (incoming
    // task's value wins on key collision).
    if let (Ok(a), Ok(b)) = (
        serde_json::from_str::<serde_json::Value>(&conflict.ours),
        serde_json::from_str::<serde_json::Value>(&conflict.theirs),
    ) {
        if let (Some(a), Some(b)) = (a.as_object(), b.as_object()) {
            let mut merged = b.clone();
            for (k, v) in a {
                merged.insert(k.clone(), v.clone());
            }
            if let Ok(text) = serde_json::to_string_pretty(&serde_json::Value::Object(merged)) {
                return Resolution::Resolved {
                    rule: "json-key-union",
                    merged: text,
                };
            }
        }
    }

    // (d) one side is empty: take the other.
    if ours_trimmed.is_empty() {
        return Resolution::Resolved {
            rule: "empty-side",
            merged: conflict.theirs.clone(),
        };
    }
    if theirs_trimmed.is_empty() {
        return Resolution::Resolved {
            rule: "empty-side",
            merged: conflict.ours.clone(),
        };
    }

    // (e) prefer the incoming task's side when it's on a chopstack branch,
    // otherwise keep the trunk side.
    if conflict.theirs_is_chopstack_branch {
        Resolution::Resolved {
            rule: "prefer-incoming",
            merged: conflict.ours.clone(),
        }
    } else {
        Resolution::Unresolved
    }
}

fn is_import_export_block(text: &str) -> bool {
    !text.trim().is_empty()
        && text
            .lines()
            .all(|l| {
                let l = l.trim();
                l.is_empty() || l.starts_with("import ") || l.starts_with("export ") || l.starts_with("use ")
            })
}

/// Decide how a conflict should be handled under the configured strategy.
/// `fail` and `manual` never invoke the auto-resolution rules.
pub fn handle(strategy: ConflictStrategy, conflict: &ConflictedFile) -> Resolution {
    match strategy {
        ConflictStrategy::Fail | ConflictStrategy::Manual => Resolution::Unresolved,
        ConflictStrategy::Auto => resolve_auto(conflict),
    }
}
