// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup: stderr always, plus a daily `rb.log` in the state directory
//! when that directory already exists.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. The returned guard flushes the file writer
/// on drop and must outlive every log call.
pub fn init() -> Option<WorkerGuard> {
    let directives = crate::env::log_filter().unwrap_or_else(|| DEFAULT_FILTER.to_string());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, guard) = match crate::env::state_dir() {
        Ok(dir) if dir.is_dir() => {
            let appender = tracing_appender::rolling::daily(&dir, "rb.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
    if let Err(e) = result {
        eprintln!("warning: logging already initialized: {e}");
    }
    guard
}
