// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{AgentBackend, SessionHandle, SessionStatus};
use crate::BackendError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Recorded agent-backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCall {
    CreateSession { repo: String, prompt: String },
    SendMessage { session_id: String, message: String },
    GetStatus { session_id: String },
    ListSessions,
}

type WorkHook = Arc<dyn Fn() + Send + Sync>;

struct FakeAgentState {
    configured: bool,
    sessions: u32,
    /// Polls answered in order; the fallback answers once drained
    script: VecDeque<Result<SessionStatus, BackendError>>,
    fallback: SessionStatus,
    listed: bool,
    create_error: Option<BackendError>,
    on_work: Option<WorkHook>,
    calls: Vec<AgentCall>,
}

/// Scripted agent backend for tests.
///
/// Every poll (list or get) consumes the next scripted status. Without a
/// script each poll reports the task done (`running` / `waiting_for_user`).
#[derive(Clone)]
pub struct FakeAgentBackend {
    inner: Arc<Mutex<FakeAgentState>>,
}

impl Default for FakeAgentBackend {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeAgentState {
                configured: true,
                sessions: 0,
                script: VecDeque::new(),
                fallback: SessionStatus::new("", "running").with_detail("waiting_for_user"),
                listed: true,
                create_error: None,
                on_work: None,
                calls: Vec::new(),
            })),
        }
    }
}

impl FakeAgentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unconfigured() -> Self {
        let fake = Self::default();
        fake.inner.lock().configured = false;
        fake
    }

    /// Queue poll answers; the session id is filled in automatically.
    pub fn script(&self, statuses: impl IntoIterator<Item = SessionStatus>) {
        self.inner.lock().script.extend(statuses.into_iter().map(Ok));
    }

    /// Queue a failing poll.
    pub fn script_error(&self, err: BackendError) {
        self.inner.lock().script.push_back(Err(err));
    }

    pub fn set_fallback(&self, status: SessionStatus) {
        self.inner.lock().fallback = status;
    }

    /// Leave sessions out of `list_sessions` so callers fall back to `get_status`.
    pub fn hide_from_list(&self) {
        self.inner.lock().listed = false;
    }

    pub fn fail_create(&self, err: BackendError) {
        self.inner.lock().create_error = Some(err);
    }

    /// Run `hook` whenever the agent is handed work (session or message).
    pub fn on_work(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.inner.lock().on_work = Some(Arc::new(hook));
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.inner.lock().calls.clone()
    }

    fn next_status(&self, session_id: &str) -> Result<SessionStatus, BackendError> {
        let mut state = self.inner.lock();
        let next = state.script.pop_front();
        let mut status = match next {
            Some(next) => next?,
            None => state.fallback.clone(),
        };
        status.session_id = session_id.to_string();
        Ok(status)
    }

    fn run_hook(&self) {
        let hook = self.inner.lock().on_work.clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}

#[async_trait]
impl AgentBackend for FakeAgentBackend {
    fn ensure_configured(&self) -> Result<(), BackendError> {
        if self.inner.lock().configured {
            Ok(())
        } else {
            Err(BackendError::ConfigurationMissing("DEVIN_API_KEY".to_string()))
        }
    }

    async fn create_session(&self, repo: &str, prompt: &str) -> Result<SessionHandle, BackendError> {
        let session_id = {
            let mut state = self.inner.lock();
            state.calls.push(AgentCall::CreateSession {
                repo: repo.to_string(),
                prompt: prompt.to_string(),
            });
            if let Some(err) = state.create_error.clone() {
                return Err(err);
            }
            state.sessions += 1;
            format!("sess-{}", state.sessions)
        };
        self.run_hook();
        Ok(SessionHandle {
            url: Some(format!("https://app.devin.ai/sessions/{session_id}")),
            session_id,
        })
    }

    async fn send_message(&self, session_id: &str, message: &str) -> Result<(), BackendError> {
        self.inner.lock().calls.push(AgentCall::SendMessage {
            session_id: session_id.to_string(),
            message: message.to_string(),
        });
        self.run_hook();
        Ok(())
    }

    async fn get_status(&self, session_id: &str) -> Result<SessionStatus, BackendError> {
        self.inner.lock().calls.push(AgentCall::GetStatus { session_id: session_id.to_string() });
        self.next_status(session_id)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionStatus>, BackendError> {
        let (listed, sessions) = {
            let mut state = self.inner.lock();
            state.calls.push(AgentCall::ListSessions);
            (state.listed, state.sessions)
        };
        if !listed || sessions == 0 {
            return Ok(Vec::new());
        }
        // single-session model: only the latest session is live
        Ok(vec![self.next_status(&format!("sess-{sessions}"))?])
    }
}
