//! Building the augmented prompt for a retried task: the original prompt
//! plus the captured error, the files already touched, and a
//! machine-readable hint for the agent to key off of.

/// Compose the retry prompt handed to a task's next attempt.
///
/// Pure and deterministic so it's unit-testable without spinning up an
/// orchestrator: given the same inputs it always produces the same text.
pub fn build_retry_prompt(original_prompt: &str, last_error: &str, touched_files: &[String]) -> String {
    let mut prompt = String::with_capacity(original_prompt.len() + last_error.len() + 128);
    prompt.push_str(original_prompt);
    prompt.push_str("\n\n---\n");
    prompt.push_str("The previous attempt at this task failed. Before retrying, take the following into account:\n\n");
    prompt.push_str(&format!("Previous error:\n{last_error}\n\n"));

    if touched_files.is_empty() {
        prompt.push_str("No files were modified in the previous attempt.\n");
    } else {
        prompt.push_str("Files already touched by the previous attempt:\n");
        for file in touched_files {
            prompt.push_str(&format!("- {file}\n"));
        }
    }

    prompt.push_str(&format!("\nHint: {}\n", machine_readable_hint(last_error)));
    prompt
}

/// A short, structured hint derived from the error text — e.g. a
/// cherry-pick conflict names the conflicting files so the agent doesn't
/// have to re-derive them from the raw error.
fn machine_readable_hint(last_error: &str) -> String {
    if last_error.contains("conflict") || last_error.contains("CONFLICT") {
        "previous attempt failed during integration with conflicts; review the overlap before re-editing those files".to_string()
    } else if last_error.contains("timeout") {
        "previous attempt exceeded its time budget; prefer smaller, incremental edits".to_string()
    } else {
        "previous attempt failed; review the error above before retrying".to_string()
    }
}
