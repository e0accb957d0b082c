//! Coarse statistical check for invariant 11 (§8): the hex comparator's
//! timing should not depend on where the first differing byte falls. This
//! is deliberately loose — a hard microsecond assertion would be flaky in
//! CI — it only guards against a comparator that short-circuits on the
//! first byte mismatch (e.g. a naive `==`).

use anchorpq_core::security::constant_time_eq;
use std::time::Instant;

fn timed_runs(a: &[u8], b: &[u8], trials: usize) -> u128 {
    let start = Instant::now();
    for _ in 0..trials {
        std::hint::black_box(constant_time_eq(std::hint::black_box(a), std::hint::black_box(b)));
    }
    start.elapsed().as_nanos()
}

#[test]
fn timing_does_not_correlate_with_diff_position() {
    let trials = 20_000;
    let reference = vec![0u8; 64];

    let mut early_diff = reference.clone();
    early_diff[0] = 0xFF;

    let mut late_diff = reference.clone();
    late_diff[63] = 0xFF;

    let early = timed_runs(&reference, &early_diff, trials);
    let late = timed_runs(&reference, &late_diff, trials);

    let ratio = if early > late {
        early as f64 / late as f64
    } else {
        late as f64 / early as f64
    };

    // A byte-wise XOR-accumulate comparator should show no meaningful skew
    // between an early and a late mismatch. A short-circuiting comparator
    // would be dramatically faster on the early-diff case.
    assert!(ratio < 3.0, "timing ratio {ratio} suggests early-exit on first mismatch");
}

#[test]
fn equal_and_unequal_inputs_are_judged_correctly() {
    let a = vec![7u8; 32];
    let b = vec![7u8; 32];
    assert!(constant_time_eq(&a, &b));

    let mut c = b.clone();
    c[31] ^= 1;
    assert!(!constant_time_eq(&a, &c));
}
