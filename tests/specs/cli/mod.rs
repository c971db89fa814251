// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod bench;
mod estimate;
mod help;
mod ledger;
