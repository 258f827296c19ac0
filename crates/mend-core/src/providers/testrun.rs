//! Test execution provider.
//!
//! Selects a runner family from the repository contents: a Node manifest
//! implies the npm family, pytest markers imply the Python family, and a
//! repository with neither degrades to a lint-only pass. Every variant
//! exposes the same run/parse contract, and a non-zero exit is captured
//! as raw output, never raised.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::{HealConfig, HealTimeouts};
use crate::domain::{Failure, Language, MendError, Result};
use crate::parser;

/// Runner family selected from the repository contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectedStack {
    /// `package.json` present: npm test family.
    Node,
    /// pytest markers present: pytest family.
    Python,
    /// No runner detected: lint-only pass.
    LintOnly,
}

impl DetectedStack {
    /// Select the runner family for a repository.
    ///
    /// A repository carrying both a Node manifest and pytest markers runs
    /// the Node family.
    pub fn detect(repo: &Path) -> Self {
        if repo.join("package.json").is_file() {
            return DetectedStack::Node;
        }
        if repo.join("pytest.ini").is_file() || has_pytest_markers(repo) {
            return DetectedStack::Python;
        }
        DetectedStack::LintOnly
    }

    /// Parse raw runner output into failures.
    pub fn parse(&self, raw_output: &str) -> Vec<Failure> {
        match self {
            DetectedStack::Node => parser::parse(raw_output, Language::JavaScript),
            DetectedStack::Python => parser::parse(raw_output, Language::Python),
            DetectedStack::LintOnly => parser::parse_lint_json(raw_output),
        }
    }
}

/// Any file named `test_*.py` or `*_test.py`, outside dot-dirs.
fn has_pytest_markers(repo: &Path) -> bool {
    WalkDir::new(repo)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.depth() > 0 && entry.file_type().is_dir() && name.starts_with('.'))
        })
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .any(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            (name.starts_with("test_") && name.ends_with(".py")) || name.ends_with("_test.py")
        })
}

/// Output of one check run.
#[derive(Debug, Clone)]
pub struct CheckOutput {
    /// Runner family that produced the output.
    pub stack: DetectedStack,

    /// Combined stdout/stderr of the run.
    pub raw_output: String,
}

impl CheckOutput {
    /// Parse the raw output into failures.
    pub fn failures(&self) -> Vec<Failure> {
        self.stack.parse(&self.raw_output)
    }
}

/// Trait for test execution backends.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    /// Run the repository's checks and capture the raw output.
    async fn run(&self, repo: &Path) -> Result<CheckOutput>;
}

/// Captured process output.
struct Capture {
    stdout: String,
    stderr: String,
}

impl Capture {
    fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Production executor shelling out to the detected runner.
pub struct ProcessTestExecutor {
    timeouts: HealTimeouts,
}

impl ProcessTestExecutor {
    pub fn new(config: &HealConfig) -> Self {
        Self {
            timeouts: config.timeouts.clone(),
        }
    }

    /// Spawn a command, capturing output regardless of exit code.
    async fn run_command(
        &self,
        repo: &Path,
        program: &str,
        args: &[&str],
        timeout_secs: u64,
    ) -> Result<Capture> {
        let child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(repo)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MendError::TestExecution(format!("failed to run {program}: {e}")))?;

        let output = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| MendError::Timeout {
            operation: format!("{program} {}", args.join(" ")),
            seconds: timeout_secs,
        })?
        .map_err(|e| MendError::TestExecution(format!("{program} execution failed: {e}")))?;

        Ok(Capture {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Lint command whose absence degrades to empty output.
    async fn run_lint_command(&self, repo: &Path, program: &str, args: &[&str]) -> String {
        match self
            .run_command(repo, program, args, self.timeouts.lint_secs)
            .await
        {
            Ok(capture) => capture.stdout,
            Err(e) => {
                warn!(program, error = %e, "lint command unavailable");
                String::new()
            }
        }
    }

    async fn run_node(&self, repo: &Path) -> Result<CheckOutput> {
        // Dependencies are needed to run tests; an install failure is
        // logged and the tests are still attempted.
        info!("installing dependencies");
        match self
            .run_command(
                repo,
                "npm",
                &["install", "--prefer-offline", "--no-audit"],
                self.timeouts.install_secs,
            )
            .await
        {
            Ok(_) => info!("dependencies installed"),
            Err(e) => warn!(error = %e, "dependency install failed; running tests anyway"),
        }

        let capture = self
            .run_command(repo, "npm", &["test"], self.timeouts.test_secs)
            .await?;

        Ok(CheckOutput {
            stack: DetectedStack::Node,
            raw_output: capture.combined(),
        })
    }

    async fn run_python(&self, repo: &Path) -> Result<CheckOutput> {
        let capture = self
            .run_command(repo, "pytest", &["--tb=short"], self.timeouts.test_secs)
            .await?;

        Ok(CheckOutput {
            stack: DetectedStack::Python,
            raw_output: capture.combined(),
        })
    }

    async fn run_lint(&self, repo: &Path) -> Result<CheckOutput> {
        info!("no test runner detected, running linters");
        let eslint = self
            .run_lint_command(repo, "npx", &["eslint", ".", "--format", "json"])
            .await;
        let flake8 = self
            .run_lint_command(repo, "flake8", &[".", "--format=json"])
            .await;

        Ok(CheckOutput {
            stack: DetectedStack::LintOnly,
            raw_output: format!("{}\n{}", eslint.trim(), flake8.trim()),
        })
    }
}

#[async_trait]
impl TestExecutor for ProcessTestExecutor {
    async fn run(&self, repo: &Path) -> Result<CheckOutput> {
        let stack = DetectedStack::detect(repo);
        info!(stack = ?stack, "running checks");
        match stack {
            DetectedStack::Node => self.run_node(repo).await,
            DetectedStack::Python => self.run_python(repo).await,
            DetectedStack::LintOnly => self.run_lint(repo).await,
        }
    }
}
