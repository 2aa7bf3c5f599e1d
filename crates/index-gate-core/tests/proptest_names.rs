// index-gate-core/tests/proptest_names.rs
// ============================================================================
// Module: Name Property-Based Tests
// Description: Property tests for canonicalisation and matching stability.
// Purpose: Detect panics and invariant violations across wide input ranges.
// ============================================================================

//! Property-based tests for the typed name model.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use index_gate_core::IndexName;
use index_gate_core::NamePattern;
use proptest::prelude::*;

/// Strategy producing name texts over a small alphabet with glob characters.
fn name_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just('*'),
            Just('?'),
            prop_oneof![Just('a'), Just('b'), Just('1'), Just('-'), Just('_')],
        ],
        1 .. 10,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn parsing_never_panics(raw in name_text()) {
        let _ = NamePattern::parse(&raw);
        let _ = IndexName::parse(&raw);
    }

    #[test]
    fn wire_form_round_trips(raw in name_text()) {
        let Ok(name) = IndexName::parse(&raw) else {
            return Ok(());
        };
        let reparsed = IndexName::parse(&name.to_wire()).unwrap();
        prop_assert_eq!(name, reparsed);
    }

    #[test]
    fn remote_names_round_trip(cluster in "[a-c]{1,4}", index in "[a-c*?]{1,6}") {
        let raw = format!("{cluster}:{index}");
        let name = IndexName::parse(&raw).unwrap();
        prop_assert!(name.is_remote());
        prop_assert_eq!(name.to_wire(), raw);
    }

    #[test]
    fn covered_by_is_consistent_with_matching(
        outer_raw in name_text(),
        inner in "[ab1_-]{0,8}",
    ) {
        let Ok(outer) = NamePattern::parse(&outer_raw) else {
            return Ok(());
        };
        if inner.is_empty() {
            return Ok(());
        }
        let concrete = NamePattern::parse(&inner).unwrap();
        if concrete.is_concrete() && concrete.covered_by(&outer) {
            prop_assert!(outer.matches(&inner));
        }
    }
}
