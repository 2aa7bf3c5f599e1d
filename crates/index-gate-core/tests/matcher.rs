// index-gate-core/tests/matcher.rs
// ============================================================================
// Module: Name Matcher Tests
// Description: Configured-vs-requested admission across the four cases.
// Purpose: Exercise alias expansion, universes, and remote part matching.
// Dependencies: index-gate-core
// ============================================================================

//! Admission tests for the pattern set and indices matcher.

use std::collections::BTreeSet;

use index_gate_core::AliasName;
use index_gate_core::IndexName;
use index_gate_core::IndexWithAliases;
use index_gate_core::NamePattern;
use index_gate_core::runtime::IndicesMatcher;
use index_gate_core::runtime::PatternSet;

mod common;

type TestResult = Result<(), String>;

fn patterns(raw: &[&str]) -> Result<Vec<NamePattern>, String> {
    raw.iter().map(|text| NamePattern::parse(text).map_err(|err| err.to_string())).collect()
}

fn matcher(configured: &[&str]) -> Result<IndicesMatcher, String> {
    Ok(IndicesMatcher::new(&common::indices(configured)))
}

fn universe(names: &[&str]) -> Vec<IndexWithAliases> {
    names.iter().map(|name| IndexWithAliases::new(*name)).collect()
}

fn wire(admitted: &BTreeSet<IndexName>) -> Vec<String> {
    common::wire_set(admitted)
}

// ============================================================================
// SECTION: Pattern Set Cases
// ============================================================================

#[test]
fn plain_configured_admits_equal_plain_requested() -> TestResult {
    let set = PatternSet::new(patterns(&["test1_index"])?);
    let requested = NamePattern::parse("test1_index").map_err(|err| err.to_string())?;
    let admitted = set.admit(&requested, None);
    if admitted.len() != 1 || !admitted.contains(&requested) {
        return Err(format!("expected the exact name, got {admitted:?}"));
    }
    let denied = NamePattern::parse("test2_index").map_err(|err| err.to_string())?;
    if !set.admit(&denied, None).is_empty() {
        return Err("a different plain name must not be admitted".to_string());
    }
    Ok(())
}

#[test]
fn pattern_configured_glob_tests_plain_requested() -> TestResult {
    let set = PatternSet::new(patterns(&["test*"])?);
    let requested = NamePattern::parse("test1_index").map_err(|err| err.to_string())?;
    if set.admit(&requested, None).len() != 1 {
        return Err("glob-matching plain name must be admitted".to_string());
    }
    Ok(())
}

#[test]
fn plain_configured_reverse_globs_pattern_requested() -> TestResult {
    // With a universe, the requested pattern enumerates concrete names.
    let set = PatternSet::new(patterns(&["test1_index"])?);
    let requested = NamePattern::parse("test*").map_err(|err| err.to_string())?;
    let names: BTreeSet<String> =
        ["test1_index", "test2_index"].iter().map(ToString::to_string).collect();
    let admitted = set.admit(&requested, Some(&names));
    if admitted != BTreeSet::from([NamePattern::Full("test1_index".to_string())]) {
        return Err(format!("expected only the configured name, got {admitted:?}"));
    }
    // Without a universe, the configured name itself is yielded when the
    // requested pattern matches it.
    let fallback = set.admit(&requested, None);
    if fallback != BTreeSet::from([NamePattern::Full("test1_index".to_string())]) {
        return Err(format!("expected the configured name, got {fallback:?}"));
    }
    Ok(())
}

#[test]
fn pattern_configured_intersects_pattern_requested() -> TestResult {
    let set = PatternSet::new(patterns(&["test*"])?);
    let requested = NamePattern::parse("test1*").map_err(|err| err.to_string())?;
    let names: BTreeSet<String> =
        ["test1_index", "test2_index", "other"].iter().map(ToString::to_string).collect();
    let admitted = set.admit(&requested, Some(&names));
    if admitted != BTreeSet::from([NamePattern::Full("test1_index".to_string())]) {
        return Err(format!("expected universe narrowing, got {admitted:?}"));
    }
    // Structural fallback keeps the narrower pattern.
    let fallback = set.admit(&requested, None);
    if fallback != BTreeSet::from([requested]) {
        return Err(format!("expected the narrower pattern, got {fallback:?}"));
    }
    Ok(())
}

#[test]
fn match_idempotence_over_a_universe() -> TestResult {
    // match(p, match(p, n)) = match(p, n) over the admitted concrete names.
    let set = PatternSet::new(patterns(&["test*", "metrics-?"])?);
    let names: BTreeSet<String> = ["test1", "test2", "metrics-a", "metrics-long", "other"]
        .iter()
        .map(ToString::to_string)
        .collect();
    let requested = NamePattern::parse("*").map_err(|err| err.to_string())?;
    let first = set.admit(&requested, Some(&names));
    let first_names: BTreeSet<String> =
        first.iter().map(|name| name.as_str().to_string()).collect();
    let mut second = BTreeSet::new();
    for name in &first {
        second.extend(set.admit(name, Some(&first_names)));
    }
    if first != second {
        return Err(format!("admission must be idempotent: {first:?} vs {second:?}"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Alias Expansion
// ============================================================================

#[test]
fn requested_alias_expands_to_backing_indices() -> TestResult {
    let matcher = matcher(&["logs-2020"])?;
    let entries = vec![
        IndexWithAliases::with_aliases("logs-2020", [AliasName::new("logs")]),
        IndexWithAliases::with_aliases("logs-2021", [AliasName::new("logs")]),
    ];
    let requested = patterns(&["logs"])?;
    let admitted = matcher.admit_local(&requested, &entries);
    if wire(&admitted) != vec!["logs-2020".to_string()] {
        return Err(format!("alias must expand then filter, got {admitted:?}"));
    }
    Ok(())
}

#[test]
fn missing_concrete_requested_name_is_still_admitted_when_configured() -> TestResult {
    // The cluster answers with its native not-found response downstream.
    let matcher = matcher(&["test*"])?;
    let admitted = matcher.admit_local(&patterns(&["test_missing"])?, &universe(&["test1"]));
    if !wire(&admitted).contains(&"test_missing".to_string()) {
        return Err("configured concrete names pass through without a universe hit".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Remote Matching
// ============================================================================

#[test]
fn remote_parts_match_independently() -> TestResult {
    let matcher = matcher(&["odd:test1_index"])?;
    let requested = vec![(
        NamePattern::parse("odd").map_err(|err| err.to_string())?,
        NamePattern::parse("test1_index").map_err(|err| err.to_string())?,
    )];
    let admitted = matcher.admit_remote(&requested, None);
    if wire(&admitted) != vec!["odd:test1_index".to_string()] {
        return Err(format!("expected the remote name admitted, got {admitted:?}"));
    }
    Ok(())
}

#[test]
fn cross_cluster_requested_never_matches_local_configured() -> TestResult {
    let matcher = matcher(&["test1_index"])?;
    let requested = vec![(
        NamePattern::parse("odd").map_err(|err| err.to_string())?,
        NamePattern::parse("test1_index").map_err(|err| err.to_string())?,
    )];
    if !matcher.admit_remote(&requested, None).is_empty() {
        return Err("local configured names must not admit remote requests".to_string());
    }
    Ok(())
}

#[test]
fn local_requested_never_matches_remote_configured() -> TestResult {
    let matcher = matcher(&["odd:test1_index"])?;
    let admitted = matcher.admit_local(&patterns(&["test1_index"])?, &universe(&["test1_index"]));
    if !admitted.is_empty() {
        return Err("remote configured names must not admit local requests".to_string());
    }
    Ok(())
}

#[test]
fn remote_pattern_parts_narrow_structurally() -> TestResult {
    let matcher = matcher(&["e*:metrics-*"])?;
    let requested = vec![(
        NamePattern::parse("etl").map_err(|err| err.to_string())?,
        NamePattern::parse("metrics-2020-*").map_err(|err| err.to_string())?,
    )];
    let admitted = matcher.admit_remote(&requested, None);
    if wire(&admitted) != vec!["etl:metrics-2020-*".to_string()] {
        return Err(format!("expected structural narrowing, got {admitted:?}"));
    }
    Ok(())
}

#[test]
fn unknown_cluster_prefix_is_not_rejected_preemptively() -> TestResult {
    // Admission follows the pattern match; the remote cluster rejects
    // unknowns itself.
    let matcher = matcher(&["*:logs-*"])?;
    let requested = vec![(
        NamePattern::parse("unknown-cluster").map_err(|err| err.to_string())?,
        NamePattern::parse("logs-2020").map_err(|err| err.to_string())?,
    )];
    let admitted = matcher.admit_remote(&requested, None);
    if wire(&admitted) != vec!["unknown-cluster:logs-2020".to_string()] {
        return Err(format!("expected pattern-only admission, got {admitted:?}"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Allowed Expansion
// ============================================================================

#[test]
fn all_allowed_expands_patterns_over_the_universe() -> TestResult {
    let matcher = matcher(&["test*", "exact"])?;
    let allowed = matcher.all_allowed(&universe(&["test1", "test2", "other"]));
    let rendered = wire(&allowed);
    if rendered != vec!["exact".to_string(), "test1".to_string(), "test2".to_string()] {
        return Err(format!("unexpected allowed expansion: {rendered:?}"));
    }
    Ok(())
}
