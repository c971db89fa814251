// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rb-storage: ledger persistence for runs, timeline events and jobs

mod error;
mod ledger;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use ledger::LedgerStore;
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;
