// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use yare::parameterized;

#[parameterized(
    seconds = { 45, "45s" },
    minutes = { 125, "2m" },
    hours = { 7_300, "2h" },
    days = { 200_000, "2d" },
)]
fn elapsed_uses_coarsest_unit(secs: u64, expected: &str) {
    assert_eq!(format_elapsed(secs), expected);
}

#[test]
fn zero_timestamp_has_no_age() {
    assert_eq!(format_time_between(0, 10_000), "-");
    assert_eq!(format_time_between(4_000, 10_000), "6s");
}

#[test]
fn future_timestamp_is_zero_seconds() {
    assert_eq!(format_time_between(20_000, 10_000), "0s");
}

#[parameterized(
    zero = { 0, "0:00.000" },
    subsecond = { 250, "0:00.250" },
    minutes = { 125_042, "2:05.042" },
)]
fn offsets_render_as_minutes_seconds_millis(ms: u64, expected: &str) {
    assert_eq!(format_offset(ms), expected);
}

#[test]
fn usd_keeps_four_places() {
    assert_eq!(format_usd(0.0291), "$0.0291");
    assert_eq!(format_usd(6.75), "$6.7500");
}

#[test]
fn duration_of_open_run_is_dash() {
    assert_eq!(format_duration(None), "-");
    assert_eq!(format_duration(Some(90_500)), "1m");
}

#[test]
#[serial]
fn table_pads_columns_to_widest_cell() {
    std::env::set_var("NO_COLOR", "1");
    let rows = vec![
        vec!["run-1".to_string(), "completed".to_string(), "x".to_string()],
        vec!["run-22".to_string(), "failed".to_string(), "y".to_string()],
    ];
    let mut out = Vec::new();

    write_table(&mut out, &["ID", "STATUS", "REPO"], &rows, |_, cell| cell.to_string()).unwrap();

    let text = String::from_utf8(out).unwrap();
    assert_eq!(
        text,
        "ID      STATUS     REPO\nrun-1   completed  x\nrun-22  failed     y\n"
    );
    std::env::remove_var("NO_COLOR");
}
