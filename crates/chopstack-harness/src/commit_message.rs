//! Commit message generation for completed tasks.
//!
//! [`CommitMessageProvider`] mirrors the shape of an LLM-backed provider
//! (see the teacher's `LlmProvider` trait this is grounded on) without
//! committing this crate to any particular LLM client: a default,
//! deterministic generator is always available, and a real provider can be
//! substituted by anything implementing the trait.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommitMessageError {
    #[error("commit message provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait CommitMessageProvider: Send + Sync {
    async fn generate(
        &self,
        task_name: &str,
        files_changed: &[String],
    ) -> Result<String, CommitMessageError>;
}

/// Produces a conventional-commit-shaped message from the task name and
/// changed file list, with no external calls. Used whenever no LLM-backed
/// provider is configured, and as the retry-safe fallback when one fails.
pub struct DeterministicCommitMessages;

#[async_trait::async_trait]
impl CommitMessageProvider for DeterministicCommitMessages {
    async fn generate(
        &self,
        task_name: &str,
        files_changed: &[String],
    ) -> Result<String, CommitMessageError> {
        Ok(build_deterministic_message(task_name, files_changed))
    }
}

pub fn build_deterministic_message(task_name: &str, files_changed: &[String]) -> String {
    let summary = task_name.trim();
    let mut message = format!("chopstack: {summary}");
    if !files_changed.is_empty() {
        message.push_str("\n\n");
        for file in files_changed {
            message.push_str(&format!("- {file}\n"));
        }
    }
    message.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_message_lists_changed_files() {
        let msg = build_deterministic_message("Add OAuth2 login", &["a.rs".into(), "b.rs".into()]);
        assert!(msg.starts_with("chopstack: Add OAuth2 login"));
        assert!(msg.contains("- a.rs"));
        assert!(msg.contains("- b.rs"));
    }

    #[tokio::test]
    async fn provider_wraps_the_deterministic_builder() {
        let provider = DeterministicCommitMessages;
        let msg = provider.generate("Fix bug", &[]).await.unwrap();
        assert_eq!(msg, "chopstack: Fix bug");
    }
}
