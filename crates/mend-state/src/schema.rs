//! Schema definitions for Mend SurrealDB tables
//!
//! Tables:
//! - heal_runs: one row per healing run
//! - fixes: one row per detected/treated failure
//! - iterations: one row per fix-apply-retest cycle
//!
//! Rows use string statuses and JSON-friendly types; conversion to the
//! typed `storage_traits` records happens at the store boundary (Layer 0
//! cannot depend on Layer 1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

// ---------------------------------------------------------------------------
// heal_runs
// ---------------------------------------------------------------------------

/// Healing run row stored in SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealRunRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Unique run ID (UUID string)
    pub run_id: String,
    /// SHA256 hex digest of the originating request
    pub request_digest: String,
    /// Repository URL being healed
    pub repo_url: String,
    /// Requesting team name
    pub team_name: String,
    /// Team leader name
    pub leader_name: String,
    /// Healing branch name
    pub branch_name: String,
    /// Run status: "RUNNING" | "PASSED" | "FAILED" | "FAILED_RUN"
    pub status: String,
    /// Failures detected by the initial test pass
    pub failures_detected: u32,
    /// Fix records that reached FIXED
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
    /// Final score (unclamped)
    pub final_score: i64,
    /// Error message if the run aborted
    pub error_message: Option<String>,
    /// Created timestamp
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    /// Finished timestamp (if terminal)
    #[serde(default, with = "surreal_datetime_opt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl HealRunRow {
    /// Create a new run row in "RUNNING" state
    pub fn new(
        run_id: String,
        request_digest: String,
        repo_url: String,
        team_name: String,
        leader_name: String,
        branch_name: String,
    ) -> Self {
        HealRunRow {
            id: None,
            run_id,
            request_digest,
            repo_url,
            team_name,
            leader_name,
            branch_name,
            status: "RUNNING".to_string(),
            failures_detected: 0,
            fixes_applied: 0,
            iterations_used: 0,
            commit_count: 0,
            duration_seconds: 0,
            base_score: 0,
            speed_bonus: 0,
            efficiency_penalty: 0,
            final_score: 0,
            error_message: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Apply terminal totals to the row
    #[allow(clippy::too_many_arguments)]
    pub fn finish(
        mut self,
        status: String,
        failures_detected: u32,
        fixes_applied: u32,
        iterations_used: u32,
        commit_count: u32,
        duration_seconds: u64,
        base_score: i64,
        speed_bonus: i64,
        efficiency_penalty: i64,
        final_score: i64,
    ) -> Self {
        self.status = status;
        self.failures_detected = failures_detected;
        self.fixes_applied = fixes_applied;
        self.iterations_used = iterations_used;
        self.commit_count = commit_count;
        self.duration_seconds = duration_seconds;
        self.base_score = base_score;
        self.speed_bonus = speed_bonus;
        self.efficiency_penalty = efficiency_penalty;
        self.final_score = final_score;
        self.finished_at = Some(Utc::now());
        self
    }

    /// Mark the run as aborted
    pub fn fail_run(mut self, error_message: String) -> Self {
        self.status = "FAILED_RUN".to_string();
        self.error_message = Some(error_message);
        self.finished_at = Some(Utc::now());
        self
    }
}

// ---------------------------------------------------------------------------
// fixes
// ---------------------------------------------------------------------------

/// Fix row stored in SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Unique fix ID (UUID string)
    pub fix_id: String,
    /// Run this fix belongs to
    pub run_id: String,
    /// File path relative to the repository root
    pub file: String,
    /// 1-indexed line number (0 = unknown)
    pub line: u32,
    /// Bug taxonomy tag
    pub bug_type: String,
    /// Associated commit message
    pub commit_message: String,
    /// Fix status: "DETECTED" | "FIXED" | "FAILED"
    pub status: String,
    /// Short fix description
    pub description: String,
    /// Created timestamp
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    /// Last status-change timestamp
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl FixRow {
    /// Create a new fix row in "DETECTED" state
    pub fn new(
        fix_id: String,
        run_id: String,
        file: String,
        line: u32,
        bug_type: String,
        commit_message: String,
        description: String,
    ) -> Self {
        let now = Utc::now();
        FixRow {
            id: None,
            fix_id,
            run_id,
            file,
            line,
            bug_type,
            commit_message,
            status: "DETECTED".to_string(),
            description,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status transition
    pub fn mark(mut self, status: String, commit_message: Option<String>) -> Self {
        self.status = status;
        if let Some(message) = commit_message {
            self.commit_message = message;
        }
        self.updated_at = Utc::now();
        self
    }
}

// ---------------------------------------------------------------------------
// iterations
// ---------------------------------------------------------------------------

/// Iteration row stored in SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Run this iteration belongs to
    pub run_id: String,
    /// 1-indexed iteration number within the run
    pub number: u32,
    /// Iteration status: "RUNNING" | "PASSED" | "FAILED_RUN"
    pub status: String,
    /// Started timestamp
    #[serde(with = "surreal_datetime")]
    pub started_at: DateTime<Utc>,
    /// Finished timestamp (if terminal)
    #[serde(default, with = "surreal_datetime_opt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl IterationRow {
    /// Create a new iteration row in "RUNNING" state
    pub fn new(run_id: String, number: u32) -> Self {
        IterationRow {
            id: None,
            run_id,
            number,
            status: "RUNNING".to_string(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Finalize the iteration
    pub fn finish(mut self, status: String) -> Self {
        self.status = status;
        self.finished_at = Some(Utc::now());
        self
    }
}
