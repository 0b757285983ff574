//! A mockable seam around the `git` CLI, one level below [`crate::backend`].
//!
//! Every backend shells out through this trait rather than
//! `std::process::Command` directly so tests can substitute a recording
//! fake without a real repository on disk.

use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

pub trait GitRunner: Send + Sync {
    fn run(&self, dir: &Path, args: &[&str]) -> Result<GitOutput, String>;
}

pub struct RealGitRunner;

impl GitRunner for RealGitRunner {
    fn run(&self, dir: &Path, args: &[&str]) -> Result<GitOutput, String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| e.to_string())?;

        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records every invocation and replays canned responses keyed by the
    /// joined argument string, falling back to a generic success.
    pub struct MockGitRunner {
        pub calls: Mutex<Vec<(String, Vec<String>)>>,
        pub responses: Mutex<std::collections::HashMap<String, GitOutput>>,
    }

    impl MockGitRunner {
        pub fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                responses: Mutex::new(std::collections::HashMap::new()),
            }
        }

        pub fn stub(&self, args_key: &str, output: GitOutput) {
            self.responses.lock().unwrap().insert(args_key.to_string(), output);
        }
    }

    impl GitRunner for MockGitRunner {
        fn run(&self, dir: &Path, args: &[&str]) -> Result<GitOutput, String> {
            let key = args.join(" ");
            self.calls
                .lock()
                .unwrap()
                .push((dir.display().to_string(), args.iter().map(|s| s.to_string()).collect()));
            Ok(self
                .responses
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .unwrap_or_else(|| GitOutput::ok("")))
        }
    }
}
