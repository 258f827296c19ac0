//! Storage trait definitions for Mend
//!
//! `HealStore` is the single persistence abstraction the healing
//! orchestrator writes through. It records three entity kinds:
//! - Run: one end-to-end healing attempt against a repository
//! - Fix: the treatment of one classified failure within a run
//! - Iteration: one fix-apply-retest cycle within a run
//!
//! The store is a passive record-keeper: all lifecycle decisions are made
//! by the orchestrator, and writes from a single run arrive in loop order.
//! An in-memory fake is provided for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Digest of the originating heal request (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestDigest(String);

impl RequestDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        RequestDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for RequestDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(RequestDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for RequestDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a healing run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random RunId
    pub fn new() -> Self {
        RunId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a fix record.
///
/// Issued at `record_fix` time and carried forward by the orchestrator into
/// the later status update, so a fix is always addressed directly rather
/// than re-located by matching file/line/status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixId(pub String);

impl FixId {
    /// Generate a new random FixId
    pub fn new() -> Self {
        FixId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for FixId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FixId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Lifecycle status of a healing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run is in flight
    Running,
    /// All checks passed (either clean on arrival or healed)
    Passed,
    /// Checks still failing after the retry budget
    Failed,
    /// The run itself aborted on an unexpected error
    FailedRun,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Passed => "PASSED",
            RunStatus::Failed => "FAILED",
            RunStatus::FailedRun => "FAILED_RUN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(RunStatus::Running),
            "PASSED" => Some(RunStatus::Passed),
            "FAILED" => Some(RunStatus::Failed),
            "FAILED_RUN" => Some(RunStatus::FailedRun),
            _ => None,
        }
    }
}

/// Lifecycle status of a fix record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixStatus {
    /// Failure detected, no confirmed treatment yet
    Detected,
    /// Patch applied and the failure did not resurface
    Fixed,
    /// Patch applied but the failure resurfaced on re-test
    Failed,
}

impl FixStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixStatus::Detected => "DETECTED",
            FixStatus::Fixed => "FIXED",
            FixStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DETECTED" => Some(FixStatus::Detected),
            "FIXED" => Some(FixStatus::Fixed),
            "FAILED" => Some(FixStatus::Failed),
            _ => None,
        }
    }
}

/// Lifecycle status of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IterationStatus {
    /// Iteration in flight
    Running,
    /// Re-test after this iteration's fixes reported zero failures
    Passed,
    /// Iteration ended with failures remaining (or no fixes generated)
    FailedRun,
}

impl IterationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IterationStatus::Running => "RUNNING",
            IterationStatus::Passed => "PASSED",
            IterationStatus::FailedRun => "FAILED_RUN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(IterationStatus::Running),
            "PASSED" => Some(IterationStatus::Passed),
            "FAILED_RUN" => Some(IterationStatus::FailedRun),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Data supplied when a run is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRun {
    /// Digest of the originating request
    pub request_digest: RequestDigest,
    /// Repository URL being healed
    pub repo_url: String,
    /// Requesting team name
    pub team_name: String,
    /// Team leader name
    pub leader_name: String,
    /// Branch the healing commits land on
    pub branch_name: String,
}

/// Aggregate totals written when a run reaches a terminal healing outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTotals {
    /// Terminal status (`Passed` or `Failed`)
    pub status: RunStatus,
    /// Failures detected by the initial test pass
    pub failures_detected: u32,
    /// Fix records that reached `FIXED`
    pub fixes_applied: u32,
    /// Loop iterations consumed
    pub iterations_used: u32,
    /// Commits made on the healing branch
    pub commit_count: u32,
    /// Wall-clock duration in seconds
    pub duration_seconds: u64,
    /// Score base component
    pub base_score: i64,
    /// Score speed bonus component
    pub speed_bonus: i64,
    /// Score efficiency penalty component
    pub efficiency_penalty: i64,
    /// Final score (base + bonus - penalty, unclamped)
    pub final_score: i64,
}

/// Full run record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealRunRecord {
    pub run_id: RunId,
    pub request_digest: RequestDigest,
    pub repo_url: String,
    pub team_name: String,
    pub leader_name: String,
    pub branch_name: String,
    pub status: RunStatus,
    pub failures_detected: u32,
    pub fixes_applied: u32,
    pub iterations_used: u32,
    pub commit_count: u32,
    pub duration_seconds: u64,
    pub base_score: i64,
    pub speed_bonus: i64,
    pub efficiency_penalty: i64,
    pub final_score: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Data supplied when a fix is first recorded (status starts at `DETECTED`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFix {
    pub run_id: RunId,
    /// File path relative to the repository root
    pub file: String,
    /// 1-indexed line number (0 = unknown)
    pub line: u32,
    /// Bug taxonomy tag (e.g. "IMPORT", "SYNTAX")
    pub bug_type: String,
    /// Commit message associated with the detection
    pub commit_message: String,
    /// Short human-readable fix description
    pub description: String,
}

/// Full fix record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixRecord {
    pub fix_id: FixId,
    pub run_id: RunId,
    pub file: String,
    pub line: u32,
    pub bug_type: String,
    pub commit_message: String,
    pub status: FixStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One loop iteration record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub run_id: RunId,
    /// 1-indexed iteration number within the run
    pub number: u32,
    pub status: IterationStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// HealStore
// ---------------------------------------------------------------------------

/// Healing-run persistence store.
///
/// Guarantees:
/// - A run transitions: Running → Passed | Failed | FailedRun (terminal).
/// - `finish_run`/`fail_run` reject runs that are not Running, as do
///   `record_fix` and `start_iteration`.
/// - Fixes and iterations are returned in the order they were written.
/// - `record_fix` returns a [`FixId`] that addresses the record directly in
///   later `mark_fix` calls; the store never matches by attributes.
#[async_trait]
pub trait HealStore: Send + Sync {
    /// Create a new run in `RUNNING` state, returning its unique ID.
    async fn create_run(&self, new_run: NewRun) -> StorageResult<RunId>;

    /// Finalize a run with aggregate totals. Fails if the run is not running.
    async fn finish_run(&self, run_id: &RunId, totals: RunTotals) -> StorageResult<()>;

    /// Mark a run as `FAILED_RUN` with an error message.
    async fn fail_run(&self, run_id: &RunId, error_message: &str) -> StorageResult<()>;

    /// Retrieve a run record by ID.
    async fn get_run(&self, run_id: &RunId) -> StorageResult<HealRunRecord>;

    /// List all runs, newest first.
    async fn list_runs(&self) -> StorageResult<Vec<HealRunRecord>>;

    /// Record a newly detected fix (status `DETECTED`), returning its ID.
    async fn record_fix(&self, fix: NewFix) -> StorageResult<FixId>;

    /// Update a fix's status (and optionally its commit message) by ID.
    async fn mark_fix(
        &self,
        fix_id: &FixId,
        status: FixStatus,
        commit_message: Option<String>,
    ) -> StorageResult<()>;

    /// List a run's fixes in creation order.
    async fn list_fixes(&self, run_id: &RunId) -> StorageResult<Vec<FixRecord>>;

    /// Record the start of iteration `number` (status `RUNNING`).
    async fn start_iteration(&self, run_id: &RunId, number: u32) -> StorageResult<()>;

    /// Finalize iteration `number` with a terminal status.
    async fn finish_iteration(
        &self,
        run_id: &RunId,
        number: u32,
        status: IterationStatus,
    ) -> StorageResult<()>;

    /// List a run's iterations in start order.
    async fn list_iterations(&self, run_id: &RunId) -> StorageResult<Vec<IterationRecord>>;
}
