//! Healing orchestrator.
//!
//! The state machine driving one run end to end: clone, analyze, test,
//! classify, branch, detection commit, the bounded fix/retest loop, push,
//! finalization, and cleanup. Owns all error recovery and partial-failure
//! policy: per-item failures inside the loops degrade to fallbacks or
//! skips, phase-transition failures abort the run as `FAILED_RUN` with
//! cleanup still attempted.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use mend_state::{
    FixStatus, HealStore, IterationStatus, NewFix, NewRun, RequestDigest, RunId, RunStatus,
    RunTotals,
};

use crate::analysis;
use crate::classifier;
use crate::config::HealConfig;
use crate::domain::{ClassifiedFailure, HealRequest, Result, RunPhase};
use crate::fixer::{self, OpenFailure};
use crate::patcher::{self, FixSuggestion};
use crate::providers::suggest::SuggestionProvider;
use crate::providers::testrun::TestExecutor;
use crate::providers::vcs::VcsProvider;
use crate::report::{self, ResultSummary};
use crate::scoring;
use crate::workspace::Workspace;

/// Outcome returned to the caller for a run that reached finalization.
#[derive(Debug, Clone)]
pub struct HealOutcome {
    pub run_id: RunId,
    pub summary: ResultSummary,
    pub message: String,
}

/// Orchestrates one healing run at a time over its exclusively-owned
/// workspace. Multiple instances may run concurrently; workspace paths
/// are derived from unique run ids and never shared.
pub struct HealOrchestrator {
    config: HealConfig,
    store: Arc<dyn HealStore>,
    vcs: Arc<dyn VcsProvider>,
    tests: Arc<dyn TestExecutor>,
    ai: Arc<dyn SuggestionProvider>,
}

impl HealOrchestrator {
    pub fn new(
        config: HealConfig,
        store: Arc<dyn HealStore>,
        vcs: Arc<dyn VcsProvider>,
        tests: Arc<dyn TestExecutor>,
        ai: Arc<dyn SuggestionProvider>,
    ) -> Self {
        Self {
            config,
            store,
            vcs,
            tests,
            ai,
        }
    }

    /// Run one healing attempt end to end.
    ///
    /// Returns the result summary, or a single error after the run has
    /// been marked `FAILED_RUN` and the workspace cleaned up.
    pub async fn heal(&self, request: HealRequest) -> Result<HealOutcome> {
        request.validate()?;
        let started = Instant::now();
        let branch_name = request.branch_name();
        let request_digest = RequestDigest::from_bytes(&serde_json::to_vec(&request)?);

        let run_id = self
            .store
            .create_run(NewRun {
                request_digest,
                repo_url: request.repo_url.clone(),
                team_name: request.team_name.clone(),
                leader_name: request.leader_name.clone(),
                branch_name: branch_name.clone(),
            })
            .await?;

        info!(run_id = %run_id, repo = %request.repo_url, branch = %branch_name, "starting heal run");

        let workspace = Workspace::for_run(&self.config.work_dir, &request.repo_url, &run_id.0);

        match self
            .drive(&run_id, &request, &branch_name, &workspace, started)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(run_id = %run_id, error = %e, "heal run aborted");
                if let Err(db_err) = self.store.fail_run(&run_id, &e.to_string()).await {
                    warn!(run_id = %run_id, error = %db_err, "failed to persist run failure");
                }
                workspace.cleanup_keep_results();
                Err(e)
            }
        }
    }

    /// The happy-path pipeline; any error escaping here aborts the run.
    async fn drive(
        &self,
        run_id: &RunId,
        request: &HealRequest,
        branch_name: &str,
        workspace: &Workspace,
        started: Instant,
    ) -> Result<HealOutcome> {
        let repo = workspace.root();

        info!(phase = %RunPhase::Clone, "cloning repository");
        self.vcs.clone_repo(&request.repo_url, repo).await?;

        info!(phase = %RunPhase::Analyze, "analyzing repository");
        analysis::scan(repo);

        info!(phase = %RunPhase::Test, "running initial checks");
        let initial = self.tests.run(repo).await?;
        let failures = initial.failures();
        info!(count = failures.len(), "initial check pass complete");

        if failures.is_empty() {
            return self
                .finalize(
                    run_id,
                    workspace,
                    started,
                    RunStatus::Passed,
                    0,
                    0,
                    0,
                    "No failures detected. Repository is healthy!",
                )
                .await;
        }

        info!(phase = %RunPhase::Classify, "classifying failures");
        let classified = classifier::classify(&failures, self.ai.as_ref(), workspace).await;

        // Record every detected failure up front so the analysis survives
        // even an all-failed run. A record that cannot be written drops
        // that failure from treatment, not the run.
        let mut open = Vec::with_capacity(classified.len());
        for failure in &classified {
            match self.record_detected(run_id, failure).await {
                Ok(fix_id) => open.push(OpenFailure {
                    fix_id,
                    failure: failure.clone(),
                }),
                Err(e) => {
                    warn!(file = %failure.file, line = failure.line, error = %e, "failed to record fix")
                }
            }
        }

        info!(phase = %RunPhase::Branch, branch = %branch_name, "creating healing branch");
        self.vcs.create_branch(repo, branch_name).await?;

        info!(phase = %RunPhase::DetectionCommit, "committing detection report");
        if let Err(e) = workspace.write_detection_report(&classified) {
            warn!(error = %e, "failed to write detection report");
        }
        if let Err(e) = self
            .vcs
            .commit_all(
                repo,
                &format!("[AI-AGENT] Detection: Found {} failures", classified.len()),
            )
            .await
        {
            warn!(error = %e, "detection commit failed");
        }

        let retry_limit = self.config.retry_limit;
        let mut all_passed = false;
        let mut iterations_used = 0u32;
        let mut commit_count = 0u32;

        for n in 1..=retry_limit {
            iterations_used = n;
            info!(phase = %RunPhase::Iterate, iteration = n, retry_limit, "starting iteration");
            self.store.start_iteration(run_id, n).await?;

            let fixes = fixer::generate_fixes(&open, self.ai.as_ref(), workspace).await;
            if fixes.is_empty() {
                // Nothing to apply; retrying without a change is pointless.
                warn!(iteration = n, "no fixes generated; stopping retry loop");
                self.store
                    .finish_iteration(run_id, n, IterationStatus::FailedRun)
                    .await?;
                break;
            }

            let suggestions: Vec<FixSuggestion> =
                fixes.iter().map(|f| f.suggestion.clone()).collect();
            let outcomes = patcher::apply_fixes(&suggestions, repo);
            let applied = outcomes.iter().filter(|o| o.applied()).count();
            info!(iteration = n, applied, total = fixes.len(), "applied fixes");

            match self
                .vcs
                .commit_all(
                    repo,
                    &format!("[AI-AGENT] Iteration {}: Applied {} fixes", n, fixes.len()),
                )
                .await
            {
                Ok(()) => commit_count += 1,
                Err(e) => warn!(iteration = n, error = %e, "iteration commit failed"),
            }

            let mut fixed_this_pass = HashSet::new();
            for (fix, outcome) in fixes.iter().zip(&outcomes) {
                if !outcome.applied() {
                    continue;
                }
                match self
                    .store
                    .mark_fix(
                        &fix.fix_id,
                        FixStatus::Fixed,
                        Some(fix.suggestion.commit_message.clone()),
                    )
                    .await
                {
                    Ok(()) => {
                        fixed_this_pass.insert(fix.fix_id.clone());
                    }
                    Err(e) => {
                        warn!(fix_id = %fix.fix_id, error = %e, "failed to update fix status")
                    }
                }
            }

            let retest = self.tests.run(repo).await?;
            let remaining = retest.failures();
            all_passed = remaining.is_empty();

            self.store
                .finish_iteration(
                    run_id,
                    n,
                    if all_passed {
                        IterationStatus::Passed
                    } else {
                        IterationStatus::FailedRun
                    },
                )
                .await?;

            if all_passed {
                info!(iteration = n, "all checks passed");
                break;
            }

            if n < retry_limit {
                let reclassified =
                    classifier::classify(&remaining, self.ai.as_ref(), workspace).await;
                open = self
                    .reconcile_open_failures(run_id, reclassified, &open, &fixed_this_pass)
                    .await;
            }
        }

        // The branch is pushed regardless of outcome so the detection
        // commit and any partial fixes survive on the remote.
        info!(phase = %RunPhase::Push, branch = %branch_name, "pushing healing branch");
        match self.vcs.push(repo, branch_name).await {
            Ok(true) => info!(branch = %branch_name, "pushed healing branch"),
            Ok(false) => warn!(branch = %branch_name, "push skipped or rejected; branch remains local"),
            Err(e) => warn!(branch = %branch_name, error = %e, "push failed; branch remains local"),
        }

        let (status, message) = if all_passed {
            (RunStatus::Passed, "All checks passed.")
        } else {
            (RunStatus::Failed, "Checks still failing after retry budget.")
        };
        self.finalize(
            run_id,
            workspace,
            started,
            status,
            failures.len() as u32,
            iterations_used,
            commit_count,
            message,
        )
        .await
    }

    async fn record_detected(
        &self,
        run_id: &RunId,
        failure: &ClassifiedFailure,
    ) -> Result<mend_state::FixId> {
        let fix_id = self
            .store
            .record_fix(NewFix {
                run_id: run_id.clone(),
                file: failure.file.clone(),
                line: failure.line,
                bug_type: failure.bug_type.as_str().to_string(),
                commit_message: format!(
                    "[DETECTED] {} error in {}:{}",
                    failure.bug_type, failure.file, failure.line
                ),
                description: failure.description.clone(),
            })
            .await?;
        Ok(fix_id)
    }

    /// Carry re-test results into the next iteration's open set.
    ///
    /// A resurfaced `(file, line)` keeps its fix record. If that record
    /// was just marked `FIXED`, the re-test disproved it: the record
    /// flips to `FAILED` and a fresh `DETECTED` record is opened for the
    /// next attempt. Failures at new locations get new records.
    async fn reconcile_open_failures(
        &self,
        run_id: &RunId,
        reclassified: Vec<ClassifiedFailure>,
        previous: &[OpenFailure],
        fixed_this_pass: &HashSet<mend_state::FixId>,
    ) -> Vec<OpenFailure> {
        let mut next = Vec::with_capacity(reclassified.len());

        for failure in reclassified {
            let prior = previous
                .iter()
                .find(|o| o.failure.file == failure.file && o.failure.line == failure.line);

            match prior {
                Some(entry) if fixed_this_pass.contains(&entry.fix_id) => {
                    if let Err(e) = self
                        .store
                        .mark_fix(&entry.fix_id, FixStatus::Failed, None)
                        .await
                    {
                        warn!(fix_id = %entry.fix_id, error = %e, "failed to mark disproved fix");
                    }
                    match self.record_detected(run_id, &failure).await {
                        Ok(fix_id) => next.push(OpenFailure { fix_id, failure }),
                        Err(e) => {
                            warn!(file = %failure.file, error = %e, "failed to reopen fix record")
                        }
                    }
                }
                Some(entry) => next.push(OpenFailure {
                    fix_id: entry.fix_id.clone(),
                    failure,
                }),
                None => match self.record_detected(run_id, &failure).await {
                    Ok(fix_id) => next.push(OpenFailure { fix_id, failure }),
                    Err(e) => {
                        warn!(file = %failure.file, error = %e, "failed to record new fix")
                    }
                },
            }
        }

        next
    }

    /// Finalization runs for every outcome: aggregate counts, score,
    /// update the run record, write `results.json`, and clean up the
    /// workspace keeping only the summary artifact.
    #[allow(clippy::too_many_arguments)]
    async fn finalize(
        &self,
        run_id: &RunId,
        workspace: &Workspace,
        started: Instant,
        status: RunStatus,
        failures_detected: u32,
        iterations_used: u32,
        commit_count: u32,
        message: &str,
    ) -> Result<HealOutcome> {
        info!(phase = %RunPhase::Finalize, run_id = %run_id, status = ?status, "finalizing run");

        let duration_seconds = started.elapsed().as_secs();
        let score = scoring::score(duration_seconds, iterations_used);

        let fixes = self.store.list_fixes(run_id).await?;
        let fixes_applied = fixes
            .iter()
            .filter(|f| f.status == FixStatus::Fixed)
            .count() as u32;

        self.store
            .finish_run(
                run_id,
                RunTotals {
                    status,
                    failures_detected,
                    fixes_applied,
                    iterations_used,
                    commit_count,
                    duration_seconds,
                    base_score: score.base,
                    speed_bonus: score.speed_bonus,
                    efficiency_penalty: score.efficiency_penalty,
                    final_score: score.final_score,
                },
            )
            .await?;

        let summary =
            report::build_summary(self.store.as_ref(), run_id, self.config.retry_limit).await?;
        if let Err(e) = workspace.write_results(&summary) {
            warn!(error = %e, "failed to write results.json");
        }

        info!(phase = %RunPhase::Cleanup, "cleaning up workspace");
        workspace.cleanup_keep_results();

        info!(
            run_id = %run_id,
            status = ?status,
            fixes_applied,
            iterations_used,
            final_score = score.final_score,
            "heal run finalized"
        );

        Ok(HealOutcome {
            run_id: run_id.clone(),
            summary,
            message: message.to_string(),
        })
    }
}
