//! SurrealDB-backed HealStore implementation
//!
//! Uses `schema::HealRunRow`, `schema::FixRow`, and `schema::IterationRow`
//! for persistence, converting to/from `storage_traits` types at the
//! boundary.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::migrations;
use crate::schema::{FixRow, HealRunRow, IterationRow};
use crate::storage_traits::{
    FixId, FixRecord, FixStatus, HealRunRecord, HealStore, IterationRecord, IterationStatus,
    NewFix, NewRun, RequestDigest, RunId, RunStatus, RunTotals, StorageResult,
};

/// SurrealDB-backed implementation of [`HealStore`].
pub struct SurrealHealStore {
    db: Surreal<Any>,
}

impl SurrealHealStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `mend/main`, and runs `init_schema`.
    pub async fn in_memory() -> crate::Result<Self> {
        let db = surrealdb::engine::any::connect("mem://")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        db.use_ns("mend")
            .use_db("main")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealHealStore connected (in-memory)");
        Ok(Self { db })
    }

    /// Create from environment variables.
    ///
    /// Connects to `SURREALDB_URL` when set; otherwise falls back to local
    /// persistence in `.mend/db`.
    pub async fn from_env() -> crate::Result<Self> {
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            let db = surrealdb::engine::any::connect(&url)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

            db.use_ns("mend")
                .use_db("main")
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

            migrations::init_schema(&db).await?;
            info!("SurrealHealStore connected ({})", url);
            return Ok(Self { db });
        }

        // Default to local persistence in .mend/db
        let path = ".mend/db";
        std::fs::create_dir_all(path).map_err(|e| {
            StorageError::Connection(format!(
                "Failed to create database directory {}: {}",
                path, e
            ))
        })?;
        let url = format!("surrealkv://{}", path);
        info!("No SURREALDB_URL found, using local persistence: {}", url);

        let db = surrealdb::engine::any::connect(&url)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns("mend")
            .use_db("main")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        Ok(Self { db })
    }

    // -- private helpers -----------------------------------------------------

    /// Fetch a run row by ID, returning the DB row or RunNotFound.
    async fn fetch_run(&self, rid: &str) -> StorageResult<HealRunRow> {
        let rid_owned = rid.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM heal_runs WHERE run_id = $rid")
            .bind(("rid", rid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<HealRunRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: rid.to_string(),
            })
    }

    /// Fetch a run row and verify it is in "RUNNING" state.
    async fn fetch_running(&self, rid: &str) -> StorageResult<HealRunRow> {
        let row = self.fetch_run(rid).await?;
        if row.status != "RUNNING" {
            return Err(StorageError::InvalidRunState {
                run_id: rid.to_string(),
                status: row.status,
                expected: "RUNNING".to_string(),
            });
        }
        Ok(row)
    }

    /// Fetch a fix row by ID, returning the DB row or FixNotFound.
    async fn fetch_fix(&self, fid: &str) -> StorageResult<FixRow> {
        let fid_owned = fid.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM fixes WHERE fix_id = $fid")
            .bind(("fid", fid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<FixRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::FixNotFound {
                fix_id: fid.to_string(),
            })
    }

    /// Convert a `schema::HealRunRow` (DB row) into a `storage_traits::HealRunRecord`.
    fn row_to_run_record(row: HealRunRow) -> StorageResult<HealRunRecord> {
        let status = RunStatus::parse(&row.status)
            .ok_or_else(|| StorageError::Backend(format!("unknown run status: {}", row.status)))?;

        Ok(HealRunRecord {
            run_id: RunId(row.run_id),
            request_digest: RequestDigest::try_from(row.request_digest)?,
            repo_url: row.repo_url,
            team_name: row.team_name,
            leader_name: row.leader_name,
            branch_name: row.branch_name,
            status,
            failures_detected: row.failures_detected,
            fixes_applied: row.fixes_applied,
            iterations_used: row.iterations_used,
            commit_count: row.commit_count,
            duration_seconds: row.duration_seconds,
            base_score: row.base_score,
            speed_bonus: row.speed_bonus,
            efficiency_penalty: row.efficiency_penalty,
            final_score: row.final_score,
            error_message: row.error_message,
            created_at: row.created_at,
            finished_at: row.finished_at,
        })
    }

    /// Convert a `schema::FixRow` (DB row) into a `storage_traits::FixRecord`.
    fn row_to_fix_record(row: FixRow) -> StorageResult<FixRecord> {
        let status = FixStatus::parse(&row.status)
            .ok_or_else(|| StorageError::Backend(format!("unknown fix status: {}", row.status)))?;

        Ok(FixRecord {
            fix_id: FixId(row.fix_id),
            run_id: RunId(row.run_id),
            file: row.file,
            line: row.line,
            bug_type: row.bug_type,
            commit_message: row.commit_message,
            status,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// Convert a `schema::IterationRow` (DB row) into a `storage_traits::IterationRecord`.
    fn row_to_iteration_record(row: IterationRow) -> StorageResult<IterationRecord> {
        let status = IterationStatus::parse(&row.status).ok_or_else(|| {
            StorageError::Backend(format!("unknown iteration status: {}", row.status))
        })?;

        Ok(IterationRecord {
            run_id: RunId(row.run_id),
            number: row.number,
            status,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}

#[async_trait]
impl HealStore for SurrealHealStore {
    async fn create_run(&self, new_run: NewRun) -> StorageResult<RunId> {
        let run_id = RunId::new();
        let db_row = HealRunRow::new(
            run_id.0.clone(),
            new_run.request_digest.as_str().to_string(),
            new_run.repo_url,
            new_run.team_name,
            new_run.leader_name,
            new_run.branch_name,
        );

        debug!(run_id = %run_id, "creating heal run");

        let _created: Option<HealRunRow> = self
            .db
            .create("heal_runs")
            .content(db_row)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(run_id)
    }

    async fn finish_run(&self, run_id: &RunId, totals: RunTotals) -> StorageResult<()> {
        let row = self.fetch_running(&run_id.0).await?;

        let updated = row.finish(
            totals.status.as_str().to_string(),
            totals.failures_detected,
            totals.fixes_applied,
            totals.iterations_used,
            totals.commit_count,
            totals.duration_seconds,
            totals.base_score,
            totals.speed_bonus,
            totals.efficiency_penalty,
            totals.final_score,
        );
        let rid_owned = run_id.0.clone();

        self.db
            .query("UPDATE heal_runs CONTENT $row WHERE run_id = $rid")
            .bind(("row", updated))
            .bind(("rid", rid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn fail_run(&self, run_id: &RunId, error_message: &str) -> StorageResult<()> {
        let row = self.fetch_running(&run_id.0).await?;

        let updated = row.fail_run(error_message.to_string());
        let rid_owned = run_id.0.clone();

        self.db
            .query("UPDATE heal_runs CONTENT $row WHERE run_id = $rid")
            .bind(("row", updated))
            .bind(("rid", rid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get_run(&self, run_id: &RunId) -> StorageResult<HealRunRecord> {
        let row = self.fetch_run(&run_id.0).await?;
        Self::row_to_run_record(row)
    }

    async fn list_runs(&self) -> StorageResult<Vec<HealRunRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM heal_runs ORDER BY created_at DESC")
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<HealRunRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(Self::row_to_run_record).collect()
    }

    async fn record_fix(&self, fix: NewFix) -> StorageResult<FixId> {
        // Verify the run exists and is still open for writes
        self.fetch_running(&fix.run_id.0).await?;

        let fix_id = FixId::new();
        let db_row = FixRow::new(
            fix_id.0.clone(),
            fix.run_id.0,
            fix.file,
            fix.line,
            fix.bug_type,
            fix.commit_message,
            fix.description,
        );

        let _created: Option<FixRow> = self
            .db
            .create("fixes")
            .content(db_row)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(fix_id)
    }

    async fn mark_fix(
        &self,
        fix_id: &FixId,
        status: FixStatus,
        commit_message: Option<String>,
    ) -> StorageResult<()> {
        let row = self.fetch_fix(&fix_id.0).await?;

        let updated = row.mark(status.as_str().to_string(), commit_message);
        let fid_owned = fix_id.0.clone();

        self.db
            .query("UPDATE fixes CONTENT $row WHERE fix_id = $fid")
            .bind(("row", updated))
            .bind(("fid", fid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn list_fixes(&self, run_id: &RunId) -> StorageResult<Vec<FixRecord>> {
        // Verify run exists
        self.fetch_run(&run_id.0).await?;

        let rid_owned = run_id.0.clone();
        let mut res = self
            .db
            .query("SELECT * FROM fixes WHERE run_id = $rid ORDER BY created_at ASC")
            .bind(("rid", rid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<FixRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(Self::row_to_fix_record).collect()
    }

    async fn start_iteration(&self, run_id: &RunId, number: u32) -> StorageResult<()> {
        self.fetch_running(&run_id.0).await?;

        let db_row = IterationRow::new(run_id.0.clone(), number);

        let _created: Option<IterationRow> = self
            .db
            .create("iterations")
            .content(db_row)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn finish_iteration(
        &self,
        run_id: &RunId,
        number: u32,
        status: IterationStatus,
    ) -> StorageResult<()> {
        let rid_owned = run_id.0.clone();
        let mut res = self
            .db
            .query("SELECT * FROM iterations WHERE run_id = $rid AND number = $number")
            .bind(("rid", rid_owned))
            .bind(("number", number))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<IterationRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::IterationNotFound {
                run_id: run_id.0.clone(),
                number,
            })?;

        let updated = row.finish(status.as_str().to_string());
        let rid_owned = run_id.0.clone();

        self.db
            .query("UPDATE iterations CONTENT $row WHERE run_id = $rid AND number = $number")
            .bind(("row", updated))
            .bind(("rid", rid_owned))
            .bind(("number", number))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn list_iterations(&self, run_id: &RunId) -> StorageResult<Vec<IterationRecord>> {
        // Verify run exists
        self.fetch_run(&run_id.0).await?;

        let rid_owned = run_id.0.clone();
        let mut res = self
            .db
            .query("SELECT * FROM iterations WHERE run_id = $rid ORDER BY number ASC")
            .bind(("rid", rid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<IterationRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(Self::row_to_iteration_record).collect()
    }
}
