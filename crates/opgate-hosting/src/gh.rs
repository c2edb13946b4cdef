//! `gh` CLI backed hosting platform.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{HostingError, HostingResult};
use crate::HostingPlatform;

/// Runs pull request actions through the GitHub CLI.
///
/// Authentication is whatever `gh` is configured with (usually `GH_TOKEN`).
#[derive(Debug, Clone)]
pub struct GhCli {
    program: String,
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new("gh")
    }
}

impl GhCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full argument vector for a reviewer request.
    pub fn add_reviewers_command(&self, target: &str, reviewers: &str) -> Vec<String> {
        self.command(&["pr", "edit", target, "--add-reviewer", reviewers])
    }

    /// Full argument vector for a comment.
    pub fn comment_command(&self, target: &str, body: &str) -> Vec<String> {
        self.command(&["pr", "comment", target, "--body", body])
    }

    /// Full argument vector for an approval.
    pub fn approve_command(&self, target: &str) -> Vec<String> {
        self.command(&["pr", "review", target, "--approve"])
    }

    fn command(&self, args: &[&str]) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(args.iter().map(|a| a.to_string()))
            .collect()
    }

    async fn run(&self, command: Vec<String>) -> HostingResult<()> {
        debug!("Running {:?}", command);
        let output = Command::new(&command[0])
            .args(&command[1..])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| HostingError::Spawn {
                program: command[0].clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(HostingError::CommandFailed {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!("{}", String::from_utf8_lossy(&output.stdout).trim());
        Ok(())
    }
}

#[async_trait]
impl HostingPlatform for GhCli {
    async fn add_reviewers(&self, target: &str, reviewers: &str) -> HostingResult<()> {
        self.run(self.add_reviewers_command(target, reviewers)).await
    }

    async fn comment(&self, target: &str, body: &str) -> HostingResult<()> {
        self.run(self.comment_command(target, body)).await
    }

    async fn approve(&self, target: &str) -> HostingResult<()> {
        self.run(self.approve_command(target)).await
    }
}
