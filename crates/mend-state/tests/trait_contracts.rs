//! Trait contract tests for HealStore.
//!
//! These tests verify the behavioral contract of the storage trait using
//! the in-memory fake and the SurrealDB in-memory backend. Any conforming
//! implementation must pass these.

use mend_state::fakes::MemoryHealStore;
use mend_state::storage_traits::*;
use mend_state::{StorageError, SurrealHealStore};

fn sample_run(repo: &str) -> NewRun {
    NewRun {
        request_digest: RequestDigest::from_bytes(repo.as_bytes()),
        repo_url: repo.to_string(),
        team_name: "Dockhands".to_string(),
        leader_name: "Jordan Reyes".to_string(),
        branch_name: "DOCKHANDS_JORDAN_REYES_AI_Fix".to_string(),
    }
}

fn sample_fix(run_id: &RunId, file: &str, line: u32) -> NewFix {
    NewFix {
        run_id: run_id.clone(),
        file: file.to_string(),
        line,
        bug_type: "TYPE_ERROR".to_string(),
        commit_message: format!("[DETECTED] TYPE_ERROR error in {}:{}", file, line),
        description: "fix type mismatch".to_string(),
    }
}

fn passed_totals() -> RunTotals {
    RunTotals {
        status: RunStatus::Passed,
        failures_detected: 2,
        fixes_applied: 2,
        iterations_used: 1,
        commit_count: 1,
        duration_seconds: 45,
        base_score: 100,
        speed_bonus: 10,
        efficiency_penalty: 0,
        final_score: 110,
    }
}

// ===========================================================================
// MemoryHealStore contract tests
// ===========================================================================

#[tokio::test]
async fn store_create_run_returns_unique_ids() {
    let store = MemoryHealStore::new();
    let id1 = store
        .create_run(sample_run("https://github.com/a/a.git"))
        .await
        .unwrap();
    let id2 = store
        .create_run(sample_run("https://github.com/a/a.git"))
        .await
        .unwrap();

    assert_ne!(id1, id2);
}

#[tokio::test]
async fn store_get_run_returns_created_run() {
    let store = MemoryHealStore::new();
    let run_id = store
        .create_run(sample_run("https://github.com/a/b.git"))
        .await
        .unwrap();

    let record = store.get_run(&run_id).await.unwrap();
    assert_eq!(record.run_id, run_id);
    assert_eq!(record.status, RunStatus::Running);
    assert_eq!(record.repo_url, "https://github.com/a/b.git");
    assert!(record.finished_at.is_none());
}

#[tokio::test]
async fn store_get_run_not_found() {
    let store = MemoryHealStore::new();
    let bogus = RunId("nonexistent".to_string());
    let err = store.get_run(&bogus).await.unwrap_err();

    assert!(matches!(err, StorageError::RunNotFound { .. }));
}

#[tokio::test]
async fn store_finish_run_sets_terminal_state() {
    let store = MemoryHealStore::new();
    let run_id = store
        .create_run(sample_run("https://github.com/a/c.git"))
        .await
        .unwrap();

    store.finish_run(&run_id, passed_totals()).await.unwrap();

    let record = store.get_run(&run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::Passed);
    assert_eq!(record.iterations_used, 1);
    assert_eq!(record.final_score, 110);
    assert!(record.finished_at.is_some());
}

#[tokio::test]
async fn store_cannot_finish_twice() {
    let store = MemoryHealStore::new();
    let run_id = store
        .create_run(sample_run("https://github.com/a/d.git"))
        .await
        .unwrap();
    store.finish_run(&run_id, passed_totals()).await.unwrap();

    let err = store
        .finish_run(&run_id, passed_totals())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidRunState { .. }));
}

#[tokio::test]
async fn store_fail_run_records_message() {
    let store = MemoryHealStore::new();
    let run_id = store
        .create_run(sample_run("https://github.com/a/e.git"))
        .await
        .unwrap();

    store
        .fail_run(&run_id, "clone failed: permission denied")
        .await
        .unwrap();

    let record = store.get_run(&run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::FailedRun);
    assert_eq!(
        record.error_message.as_deref(),
        Some("clone failed: permission denied")
    );
}

#[tokio::test]
async fn store_fix_lifecycle_by_id() {
    let store = MemoryHealStore::new();
    let run_id = store
        .create_run(sample_run("https://github.com/a/f.git"))
        .await
        .unwrap();

    let fix_id = store
        .record_fix(sample_fix(&run_id, "src/sum.test.js", 6))
        .await
        .unwrap();

    let fixes = store.list_fixes(&run_id).await.unwrap();
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].status, FixStatus::Detected);
    assert_eq!(fixes[0].fix_id, fix_id);

    store
        .mark_fix(
            &fix_id,
            FixStatus::Fixed,
            Some("[AI-AGENT] Fix type_error error in src/sum.test.js:6".to_string()),
        )
        .await
        .unwrap();

    let fixes = store.list_fixes(&run_id).await.unwrap();
    assert_eq!(fixes[0].status, FixStatus::Fixed);
    assert!(fixes[0].updated_at >= fixes[0].created_at);
}

#[tokio::test]
async fn store_fixes_kept_in_creation_order() {
    let store = MemoryHealStore::new();
    let run_id = store
        .create_run(sample_run("https://github.com/a/g.git"))
        .await
        .unwrap();

    for (file, line) in [("a.test.js", 3), ("b.test.js", 9), ("c.test.js", 1)] {
        store.record_fix(sample_fix(&run_id, file, line)).await.unwrap();
    }

    let fixes = store.list_fixes(&run_id).await.unwrap();
    let files: Vec<&str> = fixes.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(files, vec!["a.test.js", "b.test.js", "c.test.js"]);
}

#[tokio::test]
async fn store_mark_fix_unknown_id() {
    let store = MemoryHealStore::new();
    let err = store
        .mark_fix(&FixId::new(), FixStatus::Fixed, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::FixNotFound { .. }));
}

#[tokio::test]
async fn store_iteration_timeline() {
    let store = MemoryHealStore::new();
    let run_id = store
        .create_run(sample_run("https://github.com/a/h.git"))
        .await
        .unwrap();

    store.start_iteration(&run_id, 1).await.unwrap();
    store
        .finish_iteration(&run_id, 1, IterationStatus::FailedRun)
        .await
        .unwrap();
    store.start_iteration(&run_id, 2).await.unwrap();
    store
        .finish_iteration(&run_id, 2, IterationStatus::Passed)
        .await
        .unwrap();

    let iterations = store.list_iterations(&run_id).await.unwrap();
    assert_eq!(iterations.len(), 2);
    assert_eq!(iterations[0].number, 1);
    assert_eq!(iterations[0].status, IterationStatus::FailedRun);
    assert_eq!(iterations[1].number, 2);
    assert_eq!(iterations[1].status, IterationStatus::Passed);
}

#[tokio::test]
async fn store_finish_unknown_iteration() {
    let store = MemoryHealStore::new();
    let run_id = store
        .create_run(sample_run("https://github.com/a/i.git"))
        .await
        .unwrap();

    let err = store
        .finish_iteration(&run_id, 7, IterationStatus::Passed)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::IterationNotFound { .. }));
}

#[tokio::test]
async fn store_record_fix_rejects_finished_run() {
    let store = MemoryHealStore::new();
    let run_id = store
        .create_run(sample_run("https://github.com/a/j.git"))
        .await
        .unwrap();
    store.finish_run(&run_id, passed_totals()).await.unwrap();

    let err = store
        .record_fix(sample_fix(&run_id, "late.test.js", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidRunState { .. }));
}

#[tokio::test]
async fn store_list_runs_newest_first() {
    let store = MemoryHealStore::new();
    store
        .create_run(sample_run("https://github.com/a/old.git"))
        .await
        .unwrap();
    store
        .create_run(sample_run("https://github.com/a/new.git"))
        .await
        .unwrap();

    let runs = store.list_runs().await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs[0].created_at >= runs[1].created_at);
}

// ===========================================================================
// SurrealHealStore contract tests (mirrors MemoryHealStore tests above)
// ===========================================================================

async fn surreal_store() -> SurrealHealStore {
    SurrealHealStore::in_memory()
        .await
        .expect("in_memory() failed")
}

#[tokio::test]
async fn surreal_create_and_get_run() {
    let store = surreal_store().await;
    let run_id = store
        .create_run(sample_run("https://github.com/s/a.git"))
        .await
        .unwrap();

    let record = store.get_run(&run_id).await.unwrap();
    assert_eq!(record.run_id, run_id);
    assert_eq!(record.status, RunStatus::Running);
    assert_eq!(record.team_name, "Dockhands");
}

#[tokio::test]
async fn surreal_finish_run_is_terminal() {
    let store = surreal_store().await;
    let run_id = store
        .create_run(sample_run("https://github.com/s/b.git"))
        .await
        .unwrap();

    store.finish_run(&run_id, passed_totals()).await.unwrap();

    let record = store.get_run(&run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::Passed);
    assert_eq!(record.final_score, 110);

    let err = store
        .finish_run(&run_id, passed_totals())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidRunState { .. }));
}

#[tokio::test]
async fn surreal_fail_run_records_message() {
    let store = surreal_store().await;
    let run_id = store
        .create_run(sample_run("https://github.com/s/c.git"))
        .await
        .unwrap();

    store.fail_run(&run_id, "push rejected").await.unwrap();

    let record = store.get_run(&run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::FailedRun);
    assert_eq!(record.error_message.as_deref(), Some("push rejected"));
}

#[tokio::test]
async fn surreal_fix_lifecycle_by_id() {
    let store = surreal_store().await;
    let run_id = store
        .create_run(sample_run("https://github.com/s/d.git"))
        .await
        .unwrap();

    let fix_id = store
        .record_fix(sample_fix(&run_id, "tests/test_core.py", 14))
        .await
        .unwrap();
    store
        .mark_fix(&fix_id, FixStatus::Fixed, None)
        .await
        .unwrap();

    let fixes = store.list_fixes(&run_id).await.unwrap();
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].fix_id, fix_id);
    assert_eq!(fixes[0].status, FixStatus::Fixed);
}

#[tokio::test]
async fn surreal_iteration_timeline_ordered() {
    let store = surreal_store().await;
    let run_id = store
        .create_run(sample_run("https://github.com/s/e.git"))
        .await
        .unwrap();

    for n in 1..=3 {
        store.start_iteration(&run_id, n).await.unwrap();
        store
            .finish_iteration(&run_id, n, IterationStatus::FailedRun)
            .await
            .unwrap();
    }

    let iterations = store.list_iterations(&run_id).await.unwrap();
    let numbers: Vec<u32> = iterations.iter().map(|i| i.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[tokio::test]
async fn surreal_record_fix_rejects_finished_run() {
    let store = surreal_store().await;
    let run_id = store
        .create_run(sample_run("https://github.com/s/f.git"))
        .await
        .unwrap();
    store.finish_run(&run_id, passed_totals()).await.unwrap();

    let err = store
        .record_fix(sample_fix(&run_id, "late.test.js", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidRunState { .. }));
}
