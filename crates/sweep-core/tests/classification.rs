// crates/sweep-core/tests/classification.rs
// ============================================================================
// Module: Failure Classification Tests
// Description: Pins the ordering and totality of failure classification.
// ============================================================================
//! ## Overview
//! Validates structured failure kinds and the ordered message fallback.

use proptest::prelude::*;
use sweep_core::FailureKind;
use sweep_core::L1_OUT_OF_MEMORY_MARKER;
use sweep_core::TestStatus;
use sweep_core::WATCHER_MARKER;
use sweep_core::classify_failure;
use sweep_core::classify_failure_message;

#[test]
fn out_of_memory_message_maps_to_l1_status() {
    let message = format!("TT_THROW: {L1_OUT_OF_MEMORY_MARKER} 4096 B in bank 3");
    assert_eq!(classify_failure_message(&message), TestStatus::FailL1OutOfMem);
}

#[test]
fn watcher_message_maps_to_watcher_status() {
    assert_eq!(
        classify_failure_message("Watcher detected NOC error on core (1,1)"),
        TestStatus::FailWatcher
    );
}

#[test]
fn out_of_memory_wins_over_watcher_marker() {
    let message = format!("{WATCHER_MARKER} report: {L1_OUT_OF_MEMORY_MARKER}");
    assert_eq!(classify_failure_message(&message), TestStatus::FailL1OutOfMem);
}

#[test]
fn unrecognized_message_is_an_assertion_failure() {
    assert_eq!(classify_failure_message("PCC 0.91 < 0.99"), TestStatus::FailAssertException);
    assert_eq!(classify_failure_message(""), TestStatus::FailAssertException);
}

#[test]
fn marker_matching_is_case_sensitive() {
    assert_eq!(classify_failure_message("watcher lowercase"), TestStatus::FailAssertException);
}

#[test]
fn structured_kind_overrides_message_text() {
    assert_eq!(
        classify_failure(Some(FailureKind::Assertion), L1_OUT_OF_MEMORY_MARKER),
        TestStatus::FailAssertException
    );
    assert_eq!(classify_failure(Some(FailureKind::Watcher), "boom"), TestStatus::FailWatcher);
    assert_eq!(
        classify_failure(Some(FailureKind::OutOfMemory), "boom"),
        TestStatus::FailL1OutOfMem
    );
}

#[test]
fn missing_kind_falls_back_to_message() {
    assert_eq!(classify_failure(None, "Watcher hit"), TestStatus::FailWatcher);
}

#[test]
fn failure_kinds_never_map_to_pass_or_not_run() {
    for kind in [FailureKind::OutOfMemory, FailureKind::Watcher, FailureKind::Assertion] {
        assert!(!matches!(
            kind.status(),
            TestStatus::Pass | TestStatus::NotRun | TestStatus::FailCrashHang
        ));
    }
}

proptest! {
    #[test]
    fn out_of_memory_marker_always_wins(prefix in ".{0,32}", suffix in ".{0,32}") {
        let message = format!("{prefix}{L1_OUT_OF_MEMORY_MARKER}{suffix}");
        prop_assert_eq!(classify_failure_message(&message), TestStatus::FailL1OutOfMem);
    }

    #[test]
    fn text_without_markers_is_assertion(message in "[a-v0-9 :]{0,64}") {
        prop_assert_eq!(classify_failure_message(&message), TestStatus::FailAssertException);
    }
}
