// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_offsets_grow() {
    let clock = SystemClock;
    let start = clock.now();
    std::thread::sleep(Duration::from_millis(2));
    assert!(clock.offset_ms(start) >= 1);
}

#[test]
fn fake_clock_advances_both_clocks() {
    let clock = FakeClock::new();
    let start = clock.now();
    let epoch = clock.epoch_ms();

    clock.advance(Duration::from_millis(1500));

    assert_eq!(clock.offset_ms(start), 1500);
    assert_eq!(clock.epoch_ms(), epoch + 1500);
}

#[test]
fn fake_clock_clones_share_time() {
    let a = FakeClock::at_epoch_ms(0);
    let b = a.clone();
    let start = a.now();
    b.advance(Duration::from_secs(30));
    assert_eq!(a.offset_ms(start), 30_000);
    assert_eq!(a.epoch_ms(), 30_000);
}

#[test]
fn offset_saturates_for_future_start() {
    let clock = FakeClock::new();
    let future = clock.now() + Duration::from_secs(5);
    assert_eq!(clock.offset_ms(future), 0);
}
