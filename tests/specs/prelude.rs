// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fluent runner for the `rb` binary with an isolated state directory.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Locate the `rb` binary built alongside this test.
///
/// The binary lives in another workspace member, so cargo does not set
/// `CARGO_BIN_EXE_rb` here. Tests run from `target/<profile>/deps/`, so the
/// binary sits one directory up.
pub fn rb_binary() -> PathBuf {
    if let Some(path) = std::env::var_os("CARGO_BIN_EXE_rb") {
        return PathBuf::from(path);
    }
    let exe = std::env::current_exe().unwrap();
    let profile_dir = exe.parent().and_then(Path::parent).unwrap();
    let path = profile_dir.join(format!("rb{}", std::env::consts::EXE_SUFFIX));
    assert!(
        path.exists(),
        "rb binary not found at {}; build it with `cargo build -p rb`",
        path.display()
    );
    path
}

/// Variables scrubbed from every invocation so specs never reach a real backend.
const SCRUBBED: &[&str] = &[
    "RB_DB_PATH",
    "RB_RATES_FILE",
    "RB_LOG",
    "RUST_LOG",
    "GITHUB_TOKEN",
    "DEVIN_API_KEY",
    "DEVIN_ORG_ID",
    "ANTHROPIC_API_KEY",
    "OPENAI_API_KEY",
    "GEMINI_API_KEY",
];

pub struct Cli {
    state: TempDir,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

pub fn cli() -> Cli {
    Cli { state: tempfile::tempdir().unwrap(), args: Vec::new(), envs: Vec::new() }
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|a| a.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((key.to_string(), value.as_ref().display().to_string()));
        self
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state.path().to_path_buf()
    }

    /// Write a file under the state directory and return its path.
    pub fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.state.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn run(self) -> Output {
        let mut cmd = Command::new(rb_binary());
        for var in SCRUBBED {
            cmd.env_remove(var);
        }
        cmd.env("RB_STATE_DIR", self.state.path()).env("NO_COLOR", "1").args(&self.args);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        let output = cmd.output().unwrap();
        Output {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
            _state: self.state,
        }
    }

    pub fn passes(self) -> Output {
        let out = self.run();
        assert_eq!(out.code, Some(0), "expected success\nstdout:\n{}\nstderr:\n{}", out.stdout, out.stderr);
        out
    }

    pub fn fails(self) -> Output {
        let out = self.run();
        assert_ne!(out.code, Some(0), "expected failure\nstdout:\n{}", out.stdout);
        out
    }
}

pub struct Output {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
    _state: TempDir,
}

impl Output {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout missing {needle:?}:\n{}", self.stdout);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {needle:?}:\n{}", self.stderr);
        self
    }

    pub fn code_is(self, code: i32) -> Self {
        assert_eq!(self.code, Some(code), "stderr:\n{}", self.stderr);
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).unwrap()
    }
}
