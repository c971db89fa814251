// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded text for stored details and errors.

/// Longest event detail stored for an error.
pub const MAX_DETAIL_CHARS: usize = 200;

/// Truncate to at most `max_chars` characters (never splits a code point).
pub fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
