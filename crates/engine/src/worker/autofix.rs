// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Native-autofix worker: one job per finding, rate limited in batches.

use super::{Unit, WorkerContext, WorkerOutcome};
use crate::recorder::Entry;
use rb_adapters::{AgentBackend, AlertSource, BackendError, PatchGenerator};
use rb_core::group::batches;
use rb_core::{group_by_file, metadata, Clock, EventKind, JobStatus, JobUpdate, Usage};

pub(super) async fn run<S, A, P, C>(ctx: &mut WorkerContext<S, A, P, C>) -> WorkerOutcome
where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    let groups = group_by_file(&ctx.findings);
    let batches = batches(&groups, ctx.timings.autofix_batch_size);
    ctx.scan_started(
        format!(
            "Starting native autofix for {} alerts in {} batch(es) on {}",
            ctx.findings.len(),
            batches.len(),
            ctx.branch
        ),
        groups.len(),
    )
    .await;

    let mut outcome = WorkerOutcome::default();
    let mut requested = false;
    'batches: for (index, batch) in batches.iter().enumerate() {
        if index > 0 {
            ctx.emit(
                Entry::new(
                    EventKind::BatchPause,
                    format!("Pausing before batch {}/{}", index + 1, batches.len()),
                )
                .metadata(metadata! {
                    "batch" => index + 1,
                    "total_batches" => batches.len(),
                    "pause_ms" => ctx.timings.autofix_batch_pause.as_millis() as u64,
                }),
            )
            .await;
            tokio::time::sleep(ctx.timings.autofix_batch_pause).await;
        }

        for (file_path, group) in batch {
            for finding in group.iter() {
                if ctx.cancelled() {
                    ctx.stop_cancelled(&mut outcome).await;
                    break 'batches;
                }
                let Some(unit) = ctx.claim(file_path, std::slice::from_ref(finding), &mut outcome).await
                else {
                    continue;
                };
                if requested {
                    tokio::time::sleep(ctx.timings.autofix_delay).await;
                }
                requested = true;

                match request_fix(ctx, &unit).await {
                    Ok(update) => {
                        let status = update.status;
                        ctx.settle(&unit.job, update).await;
                        if status == JobStatus::Completed {
                            outcome.completed += 1;
                        } else {
                            outcome.failed += 1;
                        }
                    }
                    Err(e) => {
                        ctx.fail_unit(&unit, JobStatus::Failed, &e.to_string()).await;
                        outcome.failed += 1;
                    }
                }
            }
        }
    }

    ctx.remediation_complete(outcome).await;
    outcome
}

/// Trigger, poll and (on success) commit one autofix.
///
/// Returns the job update: `completed` with the commit, `failed` for a
/// terminal non-success status, `timeout` when polling gave up.
async fn request_fix<S, A, P, C>(
    ctx: &mut WorkerContext<S, A, P, C>,
    unit: &Unit,
) -> Result<JobUpdate, BackendError>
where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    let Some(finding) = unit.findings.first() else {
        return Ok(JobUpdate::ended(JobStatus::Failed, "no finding claimed", ctx.recorder.epoch_ms()));
    };
    let number = finding.number;

    let cost = ctx.rates.cost(ctx.tool, Usage::Requests(1));
    ctx.emit(
        Entry::new(
            EventKind::AutofixTriggered,
            format!("Triggering autofix for alert #{number} ({})", finding.rule_id),
        )
        .finding(number)
        .cost(cost)
        .metadata(metadata! {
            "rule_id" => &finding.rule_id,
            "file_path" => &finding.file_path,
            "severity" => finding.severity,
        }),
    )
    .await;

    let source = ctx.backends.source.clone();
    let triggered = source.trigger_autofix(&ctx.repo, number).await?;
    let status =
        if triggered.is_terminal() { triggered } else { source.poll_autofix(&ctx.repo, number).await? };

    ctx.emit(
        Entry::new(
            EventKind::AutofixResult,
            format!("Autofix for alert #{number}: {}", status.status),
        )
        .finding(number)
        .metadata(metadata! {
            "autofix_status" => &status.status,
            "description" => &status.description,
        }),
    )
    .await;

    let now = ctx.recorder.epoch_ms();
    if !status.is_terminal() {
        return Ok(JobUpdate::ended(
            JobStatus::Timeout,
            format!("Autofix status: {} (polling ceiling reached)", status.status),
            now,
        ));
    }
    if !status.is_success() {
        return Ok(JobUpdate::ended(
            JobStatus::Failed,
            format!("Autofix status: {}", status.status),
            now,
        ));
    }

    let message = format!(
        "fix: autofix for alert #{number} ({}) in {} via {}",
        finding.rule_id, finding.file_path, ctx.tool
    );
    let commit = source.commit_autofix(&ctx.repo, number, &ctx.branch, &message).await?;
    ctx.emit(
        Entry::new(EventKind::PatchApplied, format!("Autofix committed for alert #{number}"))
            .finding(number)
            .metadata(metadata! {
                "commit_sha" => &commit,
                "branch" => &ctx.branch,
                "file_path" => &finding.file_path,
            }),
    )
    .await;
    Ok(JobUpdate::completed(Some(commit), ctx.recorder.epoch_ms()))
}
