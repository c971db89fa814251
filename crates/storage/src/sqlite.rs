// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed ledger.
//!
//! All statements go through one connection behind a mutex. Cost increments
//! and job claims are single statements or transactions on that connection,
//! so concurrent workers never lose updates. Every call runs on the blocking
//! pool so a slow disk or a busy lock never stalls the runtime.

use crate::ledger::{check_finish, LedgerStore};
use crate::StoreError;
use async_trait::async_trait;
use parking_lot::Mutex;
use rb_core::{
    ClaimOutcome, CostStamp, Event, EventId, EventKind, JobClaim, JobId, JobStatus, JobUpdate,
    Metadata, RemediationJob, Run, RunId, RunStatus, SkippedFinding, Tool,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    id              TEXT PRIMARY KEY,
    repo            TEXT NOT NULL,
    scan_ref        TEXT,
    started_at_ms   INTEGER NOT NULL,
    ended_at_ms     INTEGER,
    status          TEXT NOT NULL,
    tools           TEXT NOT NULL,
    branch_label    TEXT,
    total_cost_usd  REAL NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS runs_repo ON runs (repo, started_at_ms);

CREATE TABLE IF NOT EXISTS events (
    seq                  INTEGER PRIMARY KEY AUTOINCREMENT,
    id                   TEXT NOT NULL UNIQUE,
    run_id               TEXT NOT NULL REFERENCES runs (id),
    tool                 TEXT NOT NULL,
    kind                 TEXT NOT NULL,
    detail               TEXT NOT NULL,
    finding              INTEGER,
    offset_ms            INTEGER NOT NULL,
    event_cost_usd       REAL NOT NULL,
    cumulative_cost_usd  REAL NOT NULL,
    metadata             TEXT NOT NULL,
    created_at_ms        INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS events_run ON events (run_id, offset_ms, seq);

CREATE TABLE IF NOT EXISTS jobs (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    id             TEXT NOT NULL UNIQUE,
    run_id         TEXT,
    repo           TEXT NOT NULL,
    tool           TEXT NOT NULL,
    findings       TEXT NOT NULL,
    rule_id        TEXT NOT NULL,
    file_path      TEXT NOT NULL,
    status         TEXT NOT NULL,
    commit_ref     TEXT,
    error          TEXT,
    created_at_ms  INTEGER NOT NULL,
    updated_at_ms  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS jobs_repo_tool ON jobs (repo, tool);

CREATE TABLE IF NOT EXISTS job_claims (
    job_id   TEXT NOT NULL REFERENCES jobs (id),
    repo     TEXT NOT NULL,
    tool     TEXT NOT NULL,
    finding  INTEGER NOT NULL,
    status   TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS job_claims_active
    ON job_claims (repo, tool, finding)
    WHERE status IN ('running', 'completed');
"#;

const RUN_COLUMNS: &str =
    "id, repo, scan_ref, started_at_ms, ended_at_ms, status, tools, branch_label, total_cost_usd";

const EVENT_COLUMNS: &str = "id, run_id, tool, kind, detail, finding, offset_ms, \
     event_cost_usd, cumulative_cost_usd, metadata, created_at_ms";

const JOB_COLUMNS: &str = "id, run_id, repo, tool, findings, rule_id, file_path, status, \
     commit_ref, error, created_at_ms, updated_at_ms";

pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || op(&mut conn.lock()))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn corrupt(what: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{what}: {err}"))
}

fn ms(value: i64) -> u64 {
    value.max(0) as u64
}

fn run_from_row(row: &Row<'_>) -> Result<Run, StoreError> {
    let status: String = row.get(5)?;
    let tools: String = row.get(6)?;
    Ok(Run {
        id: RunId::from_string(row.get::<_, String>(0)?),
        repo: row.get(1)?,
        scan_ref: row.get(2)?,
        started_at_ms: ms(row.get(3)?),
        ended_at_ms: row.get::<_, Option<i64>>(4)?.map(ms),
        status: RunStatus::from_str(&status).map_err(|e| corrupt("run status", e))?,
        tools: serde_json::from_str(&tools)?,
        branch_label: row.get(7)?,
        total_cost_usd: row.get(8)?,
    })
}

fn event_from_row(row: &Row<'_>) -> Result<Event, StoreError> {
    let kind: String = row.get(3)?;
    let metadata: String = row.get(9)?;
    Ok(Event {
        id: EventId::from_string(row.get::<_, String>(0)?),
        run_id: RunId::from_string(row.get::<_, String>(1)?),
        tool: row.get(2)?,
        kind: EventKind::from_str(&kind).map_err(|e| corrupt("event kind", e))?,
        detail: row.get(4)?,
        finding: row.get::<_, Option<i64>>(5)?.map(ms),
        offset_ms: ms(row.get(6)?),
        cost: CostStamp { event_cost_usd: row.get(7)?, cumulative_cost_usd: row.get(8)? },
        metadata: serde_json::from_str::<Metadata>(&metadata)?,
        created_at_ms: ms(row.get(10)?),
    })
}

fn job_from_row(row: &Row<'_>) -> Result<RemediationJob, StoreError> {
    let tool: String = row.get(3)?;
    let findings: String = row.get(4)?;
    let status: String = row.get(7)?;
    Ok(RemediationJob {
        id: JobId::from_string(row.get::<_, String>(0)?),
        run_id: row.get::<_, Option<String>>(1)?.map(RunId::from_string),
        repo: row.get(2)?,
        tool: Tool::from_str(&tool).map_err(|e| corrupt("job tool", e))?,
        findings: serde_json::from_str(&findings)?,
        rule_id: row.get(5)?,
        file_path: row.get(6)?,
        status: JobStatus::from_str(&status).map_err(|e| corrupt("job status", e))?,
        commit_ref: row.get(8)?,
        error: row.get(9)?,
        created_at_ms: ms(row.get(10)?),
        updated_at_ms: ms(row.get(11)?),
    })
}

/// Run a query and map every row with a fallible decoder.
fn collect<T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    decode: fn(&Row<'_>) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(decode(row)?);
    }
    Ok(out)
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    async fn create_run(&self, run: &Run) -> Result<(), StoreError> {
        let tools = serde_json::to_string(&run.tools)?;
        let run = run.clone();
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO runs ({RUN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    run.id.as_str(),
                    run.repo,
                    run.scan_ref,
                    run.started_at_ms as i64,
                    run.ended_at_ms.map(|v| v as i64),
                    run.status.as_str(),
                    tools,
                    run.branch_label,
                    run.total_cost_usd,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StoreError> {
        let run_id = run_id.clone();
        self.with_conn(move |conn| {
            let mut runs = collect(
                conn,
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?1"),
                params![run_id.as_str()],
                run_from_row,
            )?;
            Ok(runs.pop())
        })
        .await
    }

    async fn list_runs(&self, repo: Option<&str>) -> Result<Vec<Run>, StoreError> {
        let repo = repo.map(str::to_owned);
        self.with_conn(move |conn| match repo {
            Some(repo) => collect(
                conn,
                &format!(
                    "SELECT {RUN_COLUMNS} FROM runs WHERE repo = ?1 \
                     ORDER BY started_at_ms DESC, rowid DESC"
                ),
                params![repo],
                run_from_row,
            ),
            None => collect(
                conn,
                &format!("SELECT {RUN_COLUMNS} FROM runs ORDER BY started_at_ms DESC, rowid DESC"),
                params![],
                run_from_row,
            ),
        })
        .await
    }

    async fn increment_cost(&self, run_id: &RunId, delta_usd: f64) -> Result<(), StoreError> {
        let run_id = run_id.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE runs SET total_cost_usd = total_cost_usd + ?1 WHERE id = ?2",
                params![delta_usd, run_id.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::RunNotFound(run_id));
            }
            Ok(())
        })
        .await
    }

    async fn append_event(&self, event: &Event) -> Result<(), StoreError> {
        let metadata = serde_json::to_string(&event.metadata)?;
        let event = event.clone();
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO events ({EVENT_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                params![
                    event.id.as_str(),
                    event.run_id.as_str(),
                    event.tool,
                    event.kind.as_str(),
                    event.detail,
                    event.finding.map(|n| n as i64),
                    event.offset_ms as i64,
                    event.cost.event_cost_usd,
                    event.cost.cumulative_cost_usd,
                    metadata,
                    event.created_at_ms as i64,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_events(&self, run_id: &RunId) -> Result<Vec<Event>, StoreError> {
        let run_id = run_id.clone();
        self.with_conn(move |conn| {
            collect(
                conn,
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM events WHERE run_id = ?1 ORDER BY offset_ms, seq"
                ),
                params![run_id.as_str()],
                event_from_row,
            )
        })
        .await
    }

    async fn finish_run(
        &self,
        run_id: &RunId,
        status: RunStatus,
        ended_at_ms: u64,
    ) -> Result<bool, StoreError> {
        let run_id = run_id.clone();
        self.with_conn(move |conn| {
            let current: Option<String> = conn
                .query_row(
                    "SELECT status FROM runs WHERE id = ?1",
                    params![run_id.as_str()],
                    |r| r.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Err(StoreError::RunNotFound(run_id));
            };
            let current = RunStatus::from_str(&current).map_err(|e| corrupt("run status", e))?;
            if !check_finish(&run_id, current, status)? {
                return Ok(false);
            }
            // guarded on status so a concurrent finisher cannot overwrite
            let changed = conn.execute(
                "UPDATE runs SET status = ?1, ended_at_ms = ?2 WHERE id = ?3 AND status = 'running'",
                params![status.as_str(), ended_at_ms as i64, run_id.as_str()],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn claim_job(&self, claim: JobClaim) -> Result<ClaimOutcome, StoreError> {
        self.with_conn(move |conn| claim_in(conn, claim)).await
    }

    async fn update_job(&self, job_id: &JobId, update: JobUpdate) -> Result<(), StoreError> {
        let job_id = job_id.clone();
        self.with_conn(move |conn| update_in(conn, job_id, update)).await
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<RemediationJob>, StoreError> {
        let job_id = job_id.clone();
        self.with_conn(move |conn| {
            let mut jobs = collect(
                conn,
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![job_id.as_str()],
                job_from_row,
            )?;
            Ok(jobs.pop())
        })
        .await
    }

    async fn list_jobs(
        &self,
        repo: &str,
        tool: Option<Tool>,
    ) -> Result<Vec<RemediationJob>, StoreError> {
        let repo = repo.to_owned();
        self.with_conn(move |conn| match tool {
            Some(tool) => collect(
                conn,
                &format!(
                    "SELECT {JOB_COLUMNS} FROM jobs WHERE repo = ?1 AND tool = ?2 ORDER BY seq"
                ),
                params![repo, tool.as_str()],
                job_from_row,
            ),
            None => collect(
                conn,
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE repo = ?1 ORDER BY seq"),
                params![repo],
                job_from_row,
            ),
        })
        .await
    }
}

/// Claim the free findings of `claim` in one transaction.
fn claim_in(conn: &mut Connection, claim: JobClaim) -> Result<ClaimOutcome, StoreError> {
    let tx = conn.transaction()?;

    let mut blockers: HashMap<u64, JobStatus> = HashMap::new();
    {
        let mut stmt = tx.prepare(
            "SELECT finding, status FROM job_claims \
             WHERE repo = ?1 AND tool = ?2 AND status IN ('running', 'completed')",
        )?;
        let mut rows = stmt.query(params![claim.repo, claim.tool.as_str()])?;
        while let Some(row) = rows.next()? {
            let status: String = row.get(1)?;
            let status = JobStatus::from_str(&status).map_err(|e| corrupt("claim status", e))?;
            blockers.insert(ms(row.get(0)?), status);
        }
    }

    let mut free = Vec::new();
    let mut skipped = Vec::new();
    for &finding in &claim.findings {
        match blockers.get(&finding) {
            Some(&blocked_by) => skipped.push(SkippedFinding { finding, blocked_by }),
            None => free.push(finding),
        }
    }

    if free.is_empty() {
        tx.commit()?;
        return Ok(ClaimOutcome { job: None, skipped });
    }

    let job = claim.into_job(free);
    tx.execute(
        &format!(
            "INSERT INTO jobs ({JOB_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            job.id.as_str(),
            job.run_id.as_ref().map(|r| r.as_str()),
            job.repo,
            job.tool.as_str(),
            serde_json::to_string(&job.findings)?,
            job.rule_id,
            job.file_path,
            job.status.as_str(),
            job.commit_ref,
            job.error,
            job.created_at_ms as i64,
            job.updated_at_ms as i64,
        ],
    )?;
    for &finding in &job.findings {
        tx.execute(
            "INSERT INTO job_claims (job_id, repo, tool, finding, status) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![job.id.as_str(), job.repo, job.tool.as_str(), finding as i64, job.status.as_str()],
        )?;
    }
    tx.commit()?;
    Ok(ClaimOutcome { job: Some(job), skipped })
}

fn update_in(conn: &mut Connection, job_id: JobId, update: JobUpdate) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    let current: Option<String> = tx
        .query_row("SELECT status FROM jobs WHERE id = ?1", params![job_id.as_str()], |r| r.get(0))
        .optional()?;
    let Some(current) = current else {
        return Err(StoreError::JobNotFound(job_id));
    };
    let current = JobStatus::from_str(&current).map_err(|e| corrupt("job status", e))?;
    if current.is_terminal() {
        return Err(StoreError::JobAlreadyTerminal { job_id, status: current });
    }
    tx.execute(
        "UPDATE jobs SET status = ?1, commit_ref = ?2, error = ?3, updated_at_ms = ?4 \
         WHERE id = ?5",
        params![
            update.status.as_str(),
            update.commit_ref,
            update.error,
            update.now_ms as i64,
            job_id.as_str()
        ],
    )?;
    tx.execute(
        "UPDATE job_claims SET status = ?1 WHERE job_id = ?2",
        params![update.status.as_str(), job_id.as_str()],
    )?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
