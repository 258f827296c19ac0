//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryHealStore`, which satisfies the `HealStore` contract
//! without any external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::storage_traits::*;

#[derive(Debug)]
struct RunState {
    record: HealRunRecord,
    fixes: Vec<FixRecord>,
    iterations: Vec<IterationRecord>,
}

/// In-memory heal store backed by a `HashMap<RunId, RunState>`.
#[derive(Debug, Default)]
pub struct MemoryHealStore {
    runs: Mutex<HashMap<String, RunState>>,
}

impl MemoryHealStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HealStore for MemoryHealStore {
    async fn create_run(&self, new_run: NewRun) -> StorageResult<RunId> {
        let run_id = RunId::new();
        let record = HealRunRecord {
            run_id: run_id.clone(),
            request_digest: new_run.request_digest,
            repo_url: new_run.repo_url,
            team_name: new_run.team_name,
            leader_name: new_run.leader_name,
            branch_name: new_run.branch_name,
            status: RunStatus::Running,
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
        };
        let mut runs = self.runs.lock().unwrap();
        runs.insert(
            run_id.0.clone(),
            RunState {
                record,
                fixes: Vec::new(),
                iterations: Vec::new(),
            },
        );
        Ok(run_id)
    }

    async fn finish_run(&self, run_id: &RunId, totals: RunTotals) -> StorageResult<()> {
        let mut runs = self.runs.lock().unwrap();
        let state = runs
            .get_mut(&run_id.0)
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        if state.record.status != RunStatus::Running {
            return Err(StorageError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: state.record.status.as_str().to_string(),
                expected: "RUNNING".to_string(),
            });
        }
        let record = &mut state.record;
        record.status = totals.status;
        record.failures_detected = totals.failures_detected;
        record.fixes_applied = totals.fixes_applied;
        record.iterations_used = totals.iterations_used;
        record.commit_count = totals.commit_count;
        record.duration_seconds = totals.duration_seconds;
        record.base_score = totals.base_score;
        record.speed_bonus = totals.speed_bonus;
        record.efficiency_penalty = totals.efficiency_penalty;
        record.final_score = totals.final_score;
        record.finished_at = Some(Utc::now());
        Ok(())
    }

    async fn fail_run(&self, run_id: &RunId, error_message: &str) -> StorageResult<()> {
        let mut runs = self.runs.lock().unwrap();
        let state = runs
            .get_mut(&run_id.0)
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        if state.record.status != RunStatus::Running {
            return Err(StorageError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: state.record.status.as_str().to_string(),
                expected: "RUNNING".to_string(),
            });
        }
        state.record.status = RunStatus::FailedRun;
        state.record.error_message = Some(error_message.to_string());
        state.record.finished_at = Some(Utc::now());
        Ok(())
    }

    async fn get_run(&self, run_id: &RunId) -> StorageResult<HealRunRecord> {
        let runs = self.runs.lock().unwrap();
        runs.get(&run_id.0)
            .map(|state| state.record.clone())
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })
    }

    async fn list_runs(&self) -> StorageResult<Vec<HealRunRecord>> {
        let runs = self.runs.lock().unwrap();
        let mut records: Vec<HealRunRecord> =
            runs.values().map(|state| state.record.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn record_fix(&self, fix: NewFix) -> StorageResult<FixId> {
        let mut runs = self.runs.lock().unwrap();
        let state = runs
            .get_mut(&fix.run_id.0)
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: fix.run_id.0.clone(),
            })?;
        if state.record.status != RunStatus::Running {
            return Err(StorageError::InvalidRunState {
                run_id: fix.run_id.0.clone(),
                status: state.record.status.as_str().to_string(),
                expected: "RUNNING".to_string(),
            });
        }
        let fix_id = FixId::new();
        let now = Utc::now();
        state.fixes.push(FixRecord {
            fix_id: fix_id.clone(),
            run_id: fix.run_id,
            file: fix.file,
            line: fix.line,
            bug_type: fix.bug_type,
            commit_message: fix.commit_message,
            status: FixStatus::Detected,
            description: fix.description,
            created_at: now,
            updated_at: now,
        });
        Ok(fix_id)
    }

    async fn mark_fix(
        &self,
        fix_id: &FixId,
        status: FixStatus,
        commit_message: Option<String>,
    ) -> StorageResult<()> {
        let mut runs = self.runs.lock().unwrap();
        for state in runs.values_mut() {
            if let Some(fix) = state.fixes.iter_mut().find(|f| &f.fix_id == fix_id) {
                fix.status = status;
                if let Some(message) = commit_message {
                    fix.commit_message = message;
                }
                fix.updated_at = Utc::now();
                return Ok(());
            }
        }
        Err(StorageError::FixNotFound {
            fix_id: fix_id.0.clone(),
        })
    }

    async fn list_fixes(&self, run_id: &RunId) -> StorageResult<Vec<FixRecord>> {
        let runs = self.runs.lock().unwrap();
        let state = runs
            .get(&run_id.0)
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        Ok(state.fixes.clone())
    }

    async fn start_iteration(&self, run_id: &RunId, number: u32) -> StorageResult<()> {
        let mut runs = self.runs.lock().unwrap();
        let state = runs
            .get_mut(&run_id.0)
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        if state.record.status != RunStatus::Running {
            return Err(StorageError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: state.record.status.as_str().to_string(),
                expected: "RUNNING".to_string(),
            });
        }
        state.iterations.push(IterationRecord {
            run_id: run_id.clone(),
            number,
            status: IterationStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
        });
        Ok(())
    }

    async fn finish_iteration(
        &self,
        run_id: &RunId,
        number: u32,
        status: IterationStatus,
    ) -> StorageResult<()> {
        let mut runs = self.runs.lock().unwrap();
        let state = runs
            .get_mut(&run_id.0)
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        let iteration = state
            .iterations
            .iter_mut()
            .find(|i| i.number == number)
            .ok_or_else(|| StorageError::IterationNotFound {
                run_id: run_id.0.clone(),
                number,
            })?;
        iteration.status = status;
        iteration.finished_at = Some(Utc::now());
        Ok(())
    }

    async fn list_iterations(&self, run_id: &RunId) -> StorageResult<Vec<IterationRecord>> {
        let runs = self.runs.lock().unwrap();
        let state = runs
            .get(&run_id.0)
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        Ok(state.iterations.clone())
    }
}
