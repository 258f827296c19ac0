//! Result summary assembly.
//!
//! Reconstructs the caller-facing summary from the persisted run, fix,
//! and iteration records after finalization. The serialized form is the
//! `results.json` artifact that survives workspace cleanup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mend_state::{HealStore, RunId, RunStatus};

use crate::domain::Result;

/// Score breakdown as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: i64,
    pub speed_bonus: i64,
    pub efficiency_penalty: i64,
    pub final_score: i64,
}

/// One treated failure in the summary, in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSummary {
    pub file: String,
    pub bug_type: String,
    pub line: u32,
    pub commit_message: String,
    pub status: String,
    pub description: String,
}

/// One loop pass in the summary timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub iteration: u32,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Complete result summary for one healing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub repository: String,
    pub team_name: String,
    pub team_leader: String,
    pub branch_name: String,
    pub total_failures: u32,
    pub total_fixes_applied: u32,
    pub iterations_used: u32,
    pub retry_limit: u32,
    pub ci_cd_status: String,
    pub total_time_seconds: u64,
    pub score: ScoreBreakdown,
    pub fixes: Vec<FixSummary>,
    pub timeline: Vec<TimelineEntry>,
}

/// Build the summary for a finalized run.
pub async fn build_summary(
    store: &dyn HealStore,
    run_id: &RunId,
    retry_limit: u32,
) -> Result<ResultSummary> {
    let run = store.get_run(run_id).await?;
    let fixes = store.list_fixes(run_id).await?;
    let iterations = store.list_iterations(run_id).await?;

    let ci_cd_status = if run.status == RunStatus::Passed {
        "PASSED"
    } else {
        "FAILED"
    };

    Ok(ResultSummary {
        repository: run.repo_url,
        team_name: run.team_name,
        team_leader: run.leader_name,
        branch_name: run.branch_name,
        total_failures: run.failures_detected,
        total_fixes_applied: run.fixes_applied,
        iterations_used: run.iterations_used,
        retry_limit,
        ci_cd_status: ci_cd_status.to_string(),
        total_time_seconds: run.duration_seconds,
        score: ScoreBreakdown {
            base: run.base_score,
            speed_bonus: run.speed_bonus,
            efficiency_penalty: run.efficiency_penalty,
            final_score: run.final_score,
        },
        fixes: fixes
            .into_iter()
            .map(|f| FixSummary {
                file: f.file,
                bug_type: f.bug_type,
                line: f.line,
                commit_message: f.commit_message,
                status: f.status.as_str().to_string(),
                description: f.description,
            })
            .collect(),
        timeline: iterations
            .into_iter()
            .map(|i| TimelineEntry {
                iteration: i.number,
                status: i.status.as_str().to_string(),
                timestamp: i.started_at,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mend_state::fakes::MemoryHealStore;
    use mend_state::{FixStatus, IterationStatus, NewFix, NewRun, RequestDigest, RunTotals};

    #[tokio::test]
    async fn summary_reflects_persisted_records() {
        let store = MemoryHealStore::new();
        let run_id = store
            .create_run(NewRun {
                request_digest: RequestDigest::from_bytes(b"req"),
                repo_url: "https://github.com/acme/widget.git".to_string(),
                team_name: "Acme".to_string(),
                leader_name: "Casey".to_string(),
                branch_name: "ACME_CASEY_AI_Fix".to_string(),
            })
            .await
            .unwrap();

        let fix_id = store
            .record_fix(NewFix {
                run_id: run_id.clone(),
                file: "src/a.test.js".to_string(),
                line: 6,
                bug_type: "LOGIC".to_string(),
                commit_message: "[DETECTED] LOGIC error in src/a.test.js:6".to_string(),
                description: "fix expected value".to_string(),
            })
            .await
            .unwrap();
        store
            .mark_fix(&fix_id, FixStatus::Fixed, None)
            .await
            .unwrap();

        store.start_iteration(&run_id, 1).await.unwrap();
        store
            .finish_iteration(&run_id, 1, IterationStatus::Passed)
            .await
            .unwrap();

        store
            .finish_run(
                &run_id,
                RunTotals {
                    status: mend_state::RunStatus::Passed,
                    failures_detected: 1,
                    fixes_applied: 1,
                    iterations_used: 1,
                    commit_count: 1,
                    duration_seconds: 80,
                    base_score: 100,
                    speed_bonus: 10,
                    efficiency_penalty: 0,
                    final_score: 110,
                },
            )
            .await
            .unwrap();

        let summary = build_summary(&store, &run_id, 5).await.unwrap();
        assert_eq!(summary.ci_cd_status, "PASSED");
        assert_eq!(summary.total_failures, 1);
        assert_eq!(summary.total_fixes_applied, 1);
        assert_eq!(summary.retry_limit, 5);
        assert_eq!(summary.score.final_score, 110);
        assert_eq!(summary.fixes.len(), 1);
        assert_eq!(summary.fixes[0].status, "FIXED");
        assert_eq!(summary.timeline.len(), 1);
        assert_eq!(summary.timeline[0].iteration, 1);
    }

    #[tokio::test]
    async fn failed_run_reports_failed_ci_status() {
        let store = MemoryHealStore::new();
        let run_id = store
            .create_run(NewRun {
                request_digest: RequestDigest::from_bytes(b"req"),
                repo_url: "url".to_string(),
                team_name: "t".to_string(),
                leader_name: "l".to_string(),
                branch_name: "T_L_AI_Fix".to_string(),
            })
            .await
            .unwrap();
        store
            .finish_run(
                &run_id,
                RunTotals {
                    status: mend_state::RunStatus::Failed,
                    failures_detected: 3,
                    fixes_applied: 0,
                    iterations_used: 5,
                    commit_count: 5,
                    duration_seconds: 600,
                    base_score: 100,
                    speed_bonus: 0,
                    efficiency_penalty: 0,
                    final_score: 100,
                },
            )
            .await
            .unwrap();

        let summary = build_summary(&store, &run_id, 5).await.unwrap();
        assert_eq!(summary.ci_cd_status, "FAILED");
        assert_eq!(summary.iterations_used, 5);
    }
}
