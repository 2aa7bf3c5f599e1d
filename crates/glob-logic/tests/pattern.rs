// glob-logic/tests/pattern.rs
// ============================================================================
// Module: Glob Pattern Tests
// Description: Matching behavior for compiled wildcard patterns.
// Purpose: Exercise literal, star, and any-char matching plus edge shapes.
// Dependencies: glob-logic
// ============================================================================

//! Matching tests for `GlobPattern`.

use glob_logic::GlobError;
use glob_logic::GlobPattern;

type TestResult = Result<(), String>;

fn pattern(raw: &str) -> Result<GlobPattern, String> {
    GlobPattern::parse(raw).map_err(|err| err.to_string())
}

#[test]
fn literal_pattern_matches_exact_name_only() -> TestResult {
    let glob = pattern("logstash-2020")?;
    if !glob.matches("logstash-2020") {
        return Err("expected exact match".to_string());
    }
    if glob.matches("logstash-2021") || glob.matches("logstash-2020x") {
        return Err("literal pattern matched a different name".to_string());
    }
    Ok(())
}

#[test]
fn star_matches_empty_and_long_runs() -> TestResult {
    let glob = pattern("log*")?;
    for candidate in ["log", "logs", "logstash-2020"] {
        if !glob.matches(candidate) {
            return Err(format!("expected {candidate} to match log*"));
        }
    }
    if glob.matches("audit-log") {
        return Err("prefix pattern matched a suffix candidate".to_string());
    }
    Ok(())
}

#[test]
fn inner_star_requires_both_bounds() -> TestResult {
    let glob = pattern("t*1*")?;
    for candidate in ["t1", "test1", "test1-foo", "t-x-1-y"] {
        if !glob.matches(candidate) {
            return Err(format!("expected {candidate} to match t*1*"));
        }
    }
    for candidate in ["test2", "x-t1", "1t"] {
        if glob.matches(candidate) {
            return Err(format!("{candidate} should not match t*1*"));
        }
    }
    Ok(())
}

#[test]
fn question_mark_matches_exactly_one_character() -> TestResult {
    let glob = pattern("te?t")?;
    if !glob.matches("test") || !glob.matches("text") {
        return Err("expected single-character wildcard to match".to_string());
    }
    if glob.matches("tet") || glob.matches("teest") {
        return Err("single-character wildcard matched wrong length".to_string());
    }
    Ok(())
}

#[test]
fn consecutive_stars_collapse() -> TestResult {
    let glob = pattern("a**b")?;
    if !glob.matches("ab") || !glob.matches("a-middle-b") {
        return Err("collapsed star run should behave like one star".to_string());
    }
    Ok(())
}

#[test]
fn empty_pattern_is_rejected() {
    assert_eq!(GlobPattern::parse(""), Err(GlobError::Empty));
}

#[test]
fn literal_and_everything_classification() -> TestResult {
    if !pattern("exact-name")?.is_literal() {
        return Err("expected literal classification".to_string());
    }
    if pattern("ex?ct")?.is_literal() {
        return Err("wildcard pattern classified as literal".to_string());
    }
    if !pattern("*")?.matches_everything() {
        return Err("lone star should match everything".to_string());
    }
    if pattern("*a")?.matches_everything() {
        return Err("bounded pattern should not match everything".to_string());
    }
    Ok(())
}

#[test]
fn text_form_round_trips_through_serde() -> TestResult {
    let glob = pattern("kibana-?-*")?;
    let encoded = serde_json::to_string(&glob).map_err(|err| err.to_string())?;
    if encoded != "\"kibana-?-*\"" {
        return Err(format!("unexpected wire form: {encoded}"));
    }
    let decoded: GlobPattern = serde_json::from_str(&encoded).map_err(|err| err.to_string())?;
    if decoded != glob {
        return Err("serde round trip changed the pattern".to_string());
    }
    Ok(())
}
