// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-session worker: one session for the whole run.
//!
//! The first file group opens the session; later groups are sent as
//! follow-up messages once the agent reports its task done. Fixes are
//! detected as new commits on the remediation branch.

use super::{Unit, WorkerContext, WorkerOutcome};
use crate::recorder::Entry;
use rb_adapters::{
    AgentBackend, AlertSource, BackendError, PatchGenerator, SessionHandle, SessionStatus,
};
use rb_core::prompt::{agent_followup_prompt, agent_session_prompt};
use rb_core::{finding, group_by_file, metadata, Clock, EventKind, JobStatus, JobUpdate, Usage};
use std::time::Duration;
use tokio::time::Instant;

/// How a group's polling loop ended
enum PollEnd {
    Done(SessionStatus),
    Cancelled,
    TimedOut(Duration),
}

struct Session {
    handle: SessionHandle,
    /// Compute units already charged; the API reports a running total
    charged_units: f64,
}

pub(super) async fn run<S, A, P, C>(ctx: &mut WorkerContext<S, A, P, C>) -> WorkerOutcome
where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    let groups: Vec<_> = group_by_file(&ctx.findings).into_iter().collect();
    ctx.scan_started(
        format!(
            "Starting {} remediation for {} alerts across {} files on {} \
             (single session, follow-up messages)",
            ctx.tool,
            ctx.findings.len(),
            groups.len(),
            ctx.branch
        ),
        groups.len(),
    )
    .await;

    let mut outcome = WorkerOutcome::default();
    let source = ctx.backends.source.clone();
    let mut last_head = match source.branch_head(&ctx.repo, &ctx.branch).await {
        Ok(sha) => sha,
        Err(e) => {
            tracing::warn!(
                tool = %ctx.tool,
                branch = %ctx.branch,
                error = %e,
                "cannot read branch head",
            );
            ctx.emit(
                Entry::new(EventKind::Error, format!("Failed to read head of {}: {e}", ctx.branch))
                    .metadata(metadata! { "error" => e.to_string() }),
            )
            .await;
            ctx.fail_remaining(&mut outcome);
            ctx.remediation_complete(outcome).await;
            return outcome;
        }
    };

    let total = groups.len();
    let mut session: Option<Session> = None;
    for (index, (file_path, group)) in groups.iter().enumerate() {
        if ctx.cancelled() {
            ctx.stop_cancelled(&mut outcome).await;
            break;
        }
        let Some(unit) = ctx.claim(file_path, group, &mut outcome).await else {
            continue;
        };

        let label = format!("[{}/{}]", index + 1, total);
        if let Err(e) = hand_off(ctx, &mut session, &unit, &label).await {
            ctx.fail_unit(&unit, JobStatus::Failed, &e.to_string()).await;
            outcome.failed += unit.findings.len();
            if session.is_none() {
                // nothing to send follow-ups to
                break;
            }
            continue;
        }
        let Some(active) = session.as_mut() else {
            break;
        };

        let status = match poll_until_done(ctx, &active.handle.session_id, &label).await {
            PollEnd::Done(status) => status,
            PollEnd::Cancelled => {
                let now = ctx.recorder.epoch_ms();
                let update = JobUpdate::ended(JobStatus::Cancelled, "cancelled while polling", now);
                ctx.settle(&unit.job, update).await;
                outcome.failed += unit.findings.len();
                ctx.emit(
                    Entry::new(
                        EventKind::Cancelled,
                        format!(
                            "Cancelled while polling session {} for {file_path}",
                            active.handle.session_id
                        ),
                    )
                    .metadata(metadata! {
                        "session_id" => &active.handle.session_id,
                        "file_path" => file_path,
                    }),
                )
                .await;
                break;
            }
            PollEnd::TimedOut(elapsed) => {
                record_timeout(ctx, active, &unit, elapsed).await;
                outcome.failed += unit.findings.len();
                break;
            }
        };

        record_session_complete(ctx, active, &unit, &status, &label).await;
        match collect_commits(ctx, active, &unit, &last_head).await {
            Ok(Some(head)) => {
                outcome.completed += unit.findings.len();
                last_head = head;
            }
            Ok(None) => {
                let now = ctx.recorder.epoch_ms();
                let update = JobUpdate::ended(JobStatus::Failed, "no commits pushed", now);
                ctx.settle(&unit.job, update).await;
                outcome.failed += unit.findings.len();
            }
            Err(e) => {
                let message = format!("failed to check commits: {e}");
                ctx.fail_unit(&unit, JobStatus::Failed, &message).await;
                outcome.failed += unit.findings.len();
            }
        }

        if status.is_hard_terminal() {
            tracing::warn!(
                tool = %ctx.tool,
                session_id = %active.handle.session_id,
                status = %status.status,
                "session ended, remaining groups fail",
            );
            break;
        }
    }

    ctx.fail_remaining(&mut outcome);
    ctx.remediation_complete(outcome).await;
    outcome
}

async fn record_timeout<S, A, P, C>(
    ctx: &mut WorkerContext<S, A, P, C>,
    session: &Session,
    unit: &Unit,
    elapsed: Duration,
) where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    let file_path = &unit.job.file_path;
    tracing::warn!(
        tool = %ctx.tool,
        session_id = %session.handle.session_id,
        %file_path,
        elapsed_s = elapsed.as_secs(),
        "session polling timed out",
    );
    ctx.emit(
        Entry::new(
            EventKind::PollingTimeout,
            format!(
                "Session {} timed out after {}s for {file_path}",
                session.handle.session_id,
                elapsed.as_secs()
            ),
        )
        .finding(unit.job.findings.first().copied().unwrap_or_default())
        .metadata(metadata! {
            "session_id" => &session.handle.session_id,
            "elapsed_s" => elapsed.as_secs(),
            "file_path" => file_path,
        }),
    )
    .await;
    let now = ctx.recorder.epoch_ms();
    let update = JobUpdate::ended(
        JobStatus::Timeout,
        format!("session polling exceeded {}s", elapsed.as_secs()),
        now,
    );
    ctx.settle(&unit.job, update).await;
}

/// Look for commits pushed since `last_head`. On success completes the job,
/// records one `patch_applied` per finding and returns the new head.
async fn collect_commits<S, A, P, C>(
    ctx: &mut WorkerContext<S, A, P, C>,
    session: &Session,
    unit: &Unit,
    last_head: &str,
) -> Result<Option<String>, BackendError>
where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    let source = ctx.backends.source.clone();
    let commits = source.commits_since(&ctx.repo, &ctx.branch, last_head).await?;
    let Some(head) = commits.first().cloned() else {
        tracing::info!(
            tool = %ctx.tool,
            session_id = %session.handle.session_id,
            file_path = %unit.job.file_path,
            "no new commits",
        );
        return Ok(None);
    };

    for f in &unit.findings {
        ctx.emit(
            Entry::new(
                EventKind::PatchApplied,
                format!("{} fix for alert #{} ({}) in {}", ctx.tool, f.number, f.rule_id, f.file_path),
            )
            .finding(f.number)
            .metadata(metadata! {
                "commit_sha" => &head,
                "branch" => &ctx.branch,
                "commit_count" => commits.len(),
                "session_id" => &session.handle.session_id,
                "file_path" => &f.file_path,
            }),
        )
        .await;
    }
    let now = ctx.recorder.epoch_ms();
    ctx.settle(&unit.job, JobUpdate::completed(Some(head.clone()), now)).await;
    Ok(Some(head))
}

/// Open the session for the first claimed group, or message the open one.
async fn hand_off<S, A, P, C>(
    ctx: &mut WorkerContext<S, A, P, C>,
    session: &mut Option<Session>,
    unit: &Unit,
    label: &str,
) -> Result<(), BackendError>
where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    let file_path = unit.job.file_path.clone();
    let count = unit.findings.len();
    let first = unit.findings.first().map(|f| f.number).unwrap_or_default();
    let agent = ctx.backends.agent.clone();

    if let Some(open) = session.as_ref() {
        let message = agent_followup_prompt(&ctx.branch, &unit.findings);
        agent.send_message(&open.handle.session_id, &message).await?;
        ctx.emit(
            Entry::new(
                EventKind::MessageSent,
                format!("{label} Sent follow-up for {count} alert(s) in {file_path}"),
            )
            .finding(first)
            .metadata(metadata! {
                "session_id" => &open.handle.session_id,
                "session_url" => &open.handle.url,
                "file_path" => &file_path,
                "alert_count" => count,
                "alert_numbers" => finding::numbers(&unit.findings),
            }),
        )
        .await;
        return Ok(());
    }

    ctx.emit(
        Entry::new(
            EventKind::SessionCreated,
            format!("{label} Creating session for {count} alert(s) in {file_path}"),
        )
        .finding(first)
        .metadata(metadata! {
            "file_path" => &file_path,
            "alert_count" => count,
            "alert_numbers" => finding::numbers(&unit.findings),
            "branch" => &ctx.branch,
        }),
    )
    .await;
    let prompt = agent_session_prompt(&ctx.repo, &ctx.branch, &unit.findings);
    let handle = agent.create_session(&ctx.repo, &prompt).await?;
    ctx.emit(
        Entry::new(EventKind::Analyzing, format!("{label} Session started for {file_path}"))
            .finding(first)
            .metadata(metadata! {
                "session_id" => &handle.session_id,
                "session_url" => &handle.url,
                "file_path" => &file_path,
                "branch" => &ctx.branch,
            }),
    )
    .await;
    *session = Some(Session { handle, charged_units: 0.0 });
    Ok(())
}

/// Poll until the agent's current task is done.
///
/// Each iteration checks the token first, then the ceiling, then sleeps
/// and polls. Poll errors are logged and polling continues. Each change of
/// `(status, status_detail)` while the task is still running is recorded.
async fn poll_until_done<S, A, P, C>(
    ctx: &mut WorkerContext<S, A, P, C>,
    session_id: &str,
    label: &str,
) -> PollEnd
where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    let started = Instant::now();
    let mut last: Option<(String, Option<String>)> = None;
    loop {
        if ctx.cancelled() {
            return PollEnd::Cancelled;
        }
        let elapsed = started.elapsed();
        if elapsed > ctx.timings.agent_max_wait {
            return PollEnd::TimedOut(elapsed);
        }

        tokio::time::sleep(ctx.timings.agent_poll).await;

        match fetch_status(&ctx.backends.agent, session_id).await {
            Ok(status) if status.is_done() => return PollEnd::Done(status),
            Ok(status) => {
                tracing::debug!(%session_id, status = %status.status, "session still working");
                let seen = (status.status.clone(), status.status_detail.clone());
                if last.as_ref() != Some(&seen) {
                    ctx.emit(
                        Entry::new(
                            EventKind::Analyzing,
                            format!("{label} Session {session_id} is {}", status.effective_status()),
                        )
                        .metadata(metadata! {
                            "session_id" => session_id,
                            "status" => &status.status,
                            "status_detail" => &status.status_detail,
                        }),
                    )
                    .await;
                    last = Some(seen);
                }
            }
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "failed to poll session");
            }
        }
    }
}

/// The bulk listing carries `status_detail` reliably; fall back to a direct
/// lookup when the session is missing from it.
async fn fetch_status<A: AgentBackend>(agent: &A, session_id: &str) -> Result<SessionStatus, BackendError> {
    let listed = agent.list_sessions().await?;
    match listed.into_iter().find(|s| s.session_id == session_id) {
        Some(status) => Ok(status),
        None => agent.get_status(session_id).await,
    }
}

async fn record_session_complete<S, A, P, C>(
    ctx: &mut WorkerContext<S, A, P, C>,
    session: &mut Session,
    unit: &Unit,
    status: &SessionStatus,
    label: &str,
) where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    let units = status.acus_consumed.filter(|u| u.is_finite());
    let delta = units.map(|u| (u - session.charged_units).max(0.0));
    if let Some(u) = units {
        session.charged_units = session.charged_units.max(u);
    }
    let cost = ctx.rates.cost(ctx.tool, Usage::Units(delta));
    if let Some(url) = &status.url {
        session.handle.url = Some(url.clone());
    }
    let effective = status.effective_status();

    ctx.emit(
        Entry::new(
            EventKind::SessionComplete,
            format!(
                "{label} Session {} finished ({effective}) for {}",
                session.handle.session_id, unit.job.file_path
            ),
        )
        .finding(unit.job.findings.first().copied().unwrap_or_default())
        .cost(cost)
        .metadata(metadata! {
            "session_id" => &session.handle.session_id,
            "session_url" => &session.handle.url,
            "status" => &effective,
            "file_path" => &unit.job.file_path,
            "acus_consumed" => status.acus_consumed,
            "pr_url" => status.pr_url(),
        }),
    )
    .await;
}
