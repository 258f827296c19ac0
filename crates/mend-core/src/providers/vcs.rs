//! Version-control provider.
//!
//! Shells out to the `git` binary via `tokio::process` with explicit
//! timeouts. Missing push credentials degrade to local-commit-only
//! (`push` returns `Ok(false)`) rather than raising.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{CommitIdentity, HealConfig};
use crate::domain::{MendError, Result};

/// Trait for version-control backends.
#[async_trait]
pub trait VcsProvider: Send + Sync {
    /// Clone `url` into `dest` (shallow) and configure the commit identity.
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Create and check out a new branch.
    async fn create_branch(&self, repo: &Path, branch: &str) -> Result<()>;

    /// Stage everything and commit with the given message.
    async fn commit_all(&self, repo: &Path, message: &str) -> Result<()>;

    /// Push the branch to origin. Returns `Ok(false)` when credentials are
    /// missing or the remote rejects the push.
    async fn push(&self, repo: &Path, branch: &str) -> Result<bool>;
}

/// Production git CLI backend.
pub struct GitCli {
    identity: CommitIdentity,
    token: Option<String>,
    clone_timeout: Duration,
    push_timeout: Duration,
}

impl GitCli {
    pub fn new(config: &HealConfig) -> Self {
        Self {
            identity: config.identity.clone(),
            token: config.push_token.clone(),
            clone_timeout: Duration::from_secs(config.timeouts.clone_secs),
            push_timeout: Duration::from_secs(config.timeouts.push_secs),
        }
    }

    /// Rewrite a github.com https URL to carry the token, when configured.
    fn authenticated_url(&self, url: &str) -> String {
        match &self.token {
            Some(token) if url.starts_with("https://github.com") => {
                url.replacen("https://github.com", &format!("https://{token}@github.com"), 1)
            }
            _ => url.to_string(),
        }
    }

    /// Run a git command with a timeout, returning its output.
    async fn run_git(
        &self,
        dir: Option<&Path>,
        args: &[&str],
        timeout: Duration,
    ) -> Result<std::process::Output> {
        let mut command = tokio::process::Command::new("git");
        command.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        let child = command
            .spawn()
            .map_err(|e| MendError::Git(format!("failed to run git: {e}")))?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| MendError::Timeout {
                operation: format!("git {}", args.first().copied().unwrap_or("")),
                seconds: timeout.as_secs(),
            })?
            .map_err(|e| MendError::Git(format!("git execution failed: {e}")))?;

        Ok(output)
    }

    /// Run a git command and require exit code 0.
    async fn run_git_checked(
        &self,
        dir: Option<&Path>,
        args: &[&str],
        timeout: Duration,
    ) -> Result<std::process::Output> {
        let output = self.run_git(dir, args, timeout).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MendError::Git(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or(""),
                stderr.trim()
            )));
        }
        Ok(output)
    }
}

/// Timeout for the quick local git operations (branch, add, commit).
const LOCAL_GIT_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
impl VcsProvider for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let clone_url = self.authenticated_url(url);
        if clone_url != url {
            info!("using authenticated clone");
        }
        let dest_str = dest.to_string_lossy().to_string();

        self.run_git_checked(
            None,
            &["clone", "--depth", "1", &clone_url, &dest_str],
            self.clone_timeout,
        )
        .await?;

        // Commit identity is local to the clone
        self.run_git_checked(
            Some(dest),
            &["config", "user.name", &self.identity.name],
            LOCAL_GIT_TIMEOUT,
        )
        .await?;
        self.run_git_checked(
            Some(dest),
            &["config", "user.email", &self.identity.email],
            LOCAL_GIT_TIMEOUT,
        )
        .await?;

        info!(dest = %dest.display(), "cloned repository");
        Ok(())
    }

    async fn create_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        self.run_git_checked(Some(repo), &["checkout", "-b", branch], LOCAL_GIT_TIMEOUT)
            .await?;
        info!(branch, "created and checked out branch");
        Ok(())
    }

    async fn commit_all(&self, repo: &Path, message: &str) -> Result<()> {
        self.run_git_checked(Some(repo), &["add", "."], LOCAL_GIT_TIMEOUT)
            .await?;
        self.run_git_checked(Some(repo), &["commit", "-m", message], LOCAL_GIT_TIMEOUT)
            .await?;
        info!(message, "committed changes");
        Ok(())
    }

    async fn push(&self, repo: &Path, branch: &str) -> Result<bool> {
        if self.token.is_none() {
            warn!("no push token configured; skipping push");
            return Ok(false);
        }

        // The origin remote already carries the token from the clone
        let output = self
            .run_git(
                Some(repo),
                &["push", "--set-upstream", "origin", branch],
                self.push_timeout,
            )
            .await?;

        if output.status.success() {
            info!(branch, "pushed to origin");
            Ok(true)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(branch, error = %stderr.trim(), "push rejected");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn test_git() -> GitCli {
        GitCli::new(&HealConfig::default())
    }

    fn run_git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_source_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        std::fs::write(dir.path().join("README.md"), "# source\n").unwrap();
        run_git(dir.path(), &["add", "."]);
        run_git(dir.path(), &["commit", "-m", "initial"]);
        dir
    }

    #[test]
    fn authenticated_url_rewrites_github_only() {
        let mut config = HealConfig::default();
        config.push_token = Some("tok123".to_string());
        let git = GitCli::new(&config);

        assert_eq!(
            git.authenticated_url("https://github.com/a/b.git"),
            "https://tok123@github.com/a/b.git"
        );
        assert_eq!(
            git.authenticated_url("https://gitlab.com/a/b.git"),
            "https://gitlab.com/a/b.git"
        );

        let bare = test_git();
        assert_eq!(
            bare.authenticated_url("https://github.com/a/b.git"),
            "https://github.com/a/b.git"
        );
    }

    #[tokio::test]
    async fn clone_branch_commit_cycle() {
        let source = make_source_repo();
        let work = tempfile::tempdir().unwrap();
        let dest = work.path().join("clone");
        let git = test_git();

        git.clone_repo(&source.path().to_string_lossy(), &dest)
            .await
            .unwrap();
        assert!(dest.join("README.md").exists());

        git.create_branch(&dest, "TEAM_LEAD_AI_Fix").await.unwrap();
        std::fs::write(dest.join("NOTES.md"), "detected\n").unwrap();
        git.commit_all(&dest, "[AI-AGENT] Detection: Found 1 failures")
            .await
            .unwrap();

        let output = StdCommand::new("git")
            .args(["log", "--oneline"])
            .current_dir(&dest)
            .output()
            .unwrap();
        let log = String::from_utf8_lossy(&output.stdout);
        assert!(log.contains("[AI-AGENT] Detection"));
    }

    #[tokio::test]
    async fn push_without_token_returns_false() {
        let source = make_source_repo();
        let git = test_git();
        let pushed = git.push(source.path(), "main").await.unwrap();
        assert!(!pushed);
    }

    #[tokio::test]
    async fn clone_missing_source_is_an_error() {
        let work = tempfile::tempdir().unwrap();
        let git = test_git();
        let result = git
            .clone_repo("/nonexistent/repo/path", &work.path().join("clone"))
            .await;
        assert!(result.is_err());
    }
}
