use super::*;

#[test]
fn now_ms_is_after_2020() {
    assert!(now_ms() > 1_577_836_800_000);
}

#[test]
fn is_fresh_within_window() {
    assert!(is_fresh(1_000, 1_500, 1_000));
}

#[test]
fn is_fresh_rejects_exact_window_edge() {
    assert!(!is_fresh(1_000, 2_000, 1_000));
}

#[test]
fn is_fresh_rejects_future_timestamps() {
    assert!(!is_fresh(5_000, 1_000, 1_000));
}
