// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Patch-generator worker: one model call and one commit per file group.

use super::{commit_message, Unit, WorkerContext, WorkerOutcome};
use crate::recorder::Entry;
use rb_adapters::{AgentBackend, AlertSource, BackendError, PatchGenerator};
use rb_core::cost::estimate_tokens;
use rb_core::prompt::file_group_prompt;
use rb_core::{finding, group_by_file, metadata, truncate, Clock, EventKind, JobStatus, JobUpdate, Usage};

const PROMPT_PREVIEW_CHARS: usize = 500;

pub(super) async fn run<S, A, P, C>(ctx: &mut WorkerContext<S, A, P, C>) -> WorkerOutcome
where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    let groups = group_by_file(&ctx.findings);
    ctx.scan_started(
        format!(
            "Starting {} remediation for {} alerts across {} files on {}",
            ctx.tool,
            ctx.findings.len(),
            groups.len(),
            ctx.branch
        ),
        groups.len(),
    )
    .await;

    let mut outcome = WorkerOutcome::default();
    for (file_path, group) in &groups {
        if ctx.cancelled() {
            ctx.stop_cancelled(&mut outcome).await;
            break;
        }
        let Some(unit) = ctx.claim(file_path, group, &mut outcome).await else {
            continue;
        };
        match remediate(ctx, &unit).await {
            Ok(commit) => {
                let now = ctx.recorder.epoch_ms();
                ctx.settle(&unit.job, JobUpdate::completed(Some(commit), now)).await;
                outcome.completed += unit.findings.len();
            }
            Err(e) => {
                ctx.fail_unit(&unit, JobStatus::Failed, &e.to_string()).await;
                outcome.failed += unit.findings.len();
            }
        }
    }

    ctx.remediation_complete(outcome).await;
    outcome
}

/// Fetch, prompt, generate, commit. Returns the commit sha.
async fn remediate<S, A, P, C>(
    ctx: &mut WorkerContext<S, A, P, C>,
    unit: &Unit,
) -> Result<String, BackendError>
where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    let tool = ctx.tool;
    let file_path = unit.job.file_path.clone();
    let first = unit.findings.first().map(|f| f.number).unwrap_or_default();
    let count = unit.findings.len();

    ctx.emit(
        Entry::new(EventKind::AlertTriaged, format!("Fetching {file_path} for {count} alert(s)"))
            .finding(first)
            .metadata(metadata! {
                "file_path" => &file_path,
                "alert_count" => count,
                "alert_numbers" => finding::numbers(&unit.findings),
            }),
    )
    .await;
    let content = ctx.backends.source.get_file(&ctx.repo, &file_path, &ctx.branch).await?;

    let prompt = file_group_prompt(&file_path, &content, &unit.findings);
    let model = ctx.rates.model(tool).unwrap_or(tool.as_str()).to_string();
    ctx.emit(
        Entry::new(
            EventKind::ApiCallSent,
            format!("Sending {count} alert(s) for {file_path} to {tool}"),
        )
        .finding(first)
        .metadata(metadata! {
            "prompt_tokens" => estimate_tokens(&prompt),
            "prompt_preview" => truncate(&prompt, PROMPT_PREVIEW_CHARS),
            "model" => &model,
            "file_path" => &file_path,
            "alert_count" => count,
        }),
    )
    .await;

    let generated = ctx.backends.patches.generate(tool, &prompt).await;
    tokio::time::sleep(ctx.timings.patch_delay).await;
    let patch = generated?;
    if patch.patch_text.trim().is_empty() {
        return Err(BackendError::EmptyResult("LLM returned empty response".to_string()));
    }

    let cost = ctx.rates.cost(
        tool,
        Usage::Tokens { input: patch.input_tokens, output: patch.output_tokens },
    );
    ctx.emit(
        Entry::new(
            EventKind::PatchGenerated,
            format!("{} generated fix for {count} alert(s) in {file_path}", patch.model),
        )
        .finding(first)
        .cost(cost)
        .metadata(metadata! {
            "model" => &patch.model,
            "latency_ms" => patch.latency_ms,
            "input_tokens" => patch.input_tokens,
            "output_tokens" => patch.output_tokens,
            "file_path" => &file_path,
        }),
    )
    .await;

    let message = commit_message(&unit.findings, &file_path, tool);
    let commit = ctx
        .backends
        .source
        .write_file(&ctx.repo, &file_path, &ctx.branch, &patch.patch_text, &message)
        .await?;
    ctx.emit(
        Entry::new(
            EventKind::PatchApplied,
            format!("Patch committed to {} for {file_path}", ctx.branch),
        )
        .finding(first)
        .metadata(metadata! {
            "commit_sha" => &commit,
            "branch" => &ctx.branch,
            "file_path" => &file_path,
        }),
    )
    .await;
    Ok(commit)
}
