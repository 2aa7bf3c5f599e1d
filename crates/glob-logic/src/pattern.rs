// glob-logic/src/pattern.rs
// ============================================================================
// Module: Glob Pattern Core Types
// Description: Compiled wildcard patterns over resource names.
// Purpose: Provide `GlobPattern` with linear-time matching and stable text form.
// Dependencies: serde::{Deserialize, Serialize}, thiserror
// ============================================================================

//! ## Overview
//! This module defines the compiled glob pattern used throughout the matcher
//! stack. The syntax is deliberately small: `*` matches any run of characters
//! (including the empty run) and `?` matches exactly one character. There are
//! no character classes and no escape sequences. Patterns are compiled once at
//! parse time and matched in linear time with star backtracking.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while compiling a glob pattern.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GlobError {
    /// The pattern text was empty.
    #[error("glob pattern cannot be empty")]
    Empty,
}

// ============================================================================
// SECTION: Match Operations
// ============================================================================

/// Single compiled matching operation.
///
/// # Invariants
/// - Consecutive `Star` operations are collapsed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchOp {
    /// Matches any run of characters, including the empty run.
    Star,
    /// Matches exactly one character.
    Any,
    /// Matches one literal character.
    Literal(char),
}

// ============================================================================
// SECTION: Glob Pattern
// ============================================================================

/// A compiled wildcard pattern.
///
/// # Invariants
/// - `raw` is non-empty and `ops` is the faithful compilation of `raw`,
///   except that runs of `*` collapse into one `Star`.
/// - Equality, ordering, and hashing follow the raw text form.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    /// Original pattern text.
    raw: String,
    /// Compiled operations.
    ops: Vec<MatchOp>,
}

impl GlobPattern {
    /// Compiles a pattern from its text form.
    ///
    /// # Errors
    ///
    /// Returns [`GlobError::Empty`] when the text is empty.
    pub fn parse(raw: impl Into<String>) -> Result<Self, GlobError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(GlobError::Empty);
        }
        let mut ops = Vec::with_capacity(raw.chars().count());
        for ch in raw.chars() {
            match ch {
                '*' => {
                    if ops.last() != Some(&MatchOp::Star) {
                        ops.push(MatchOp::Star);
                    }
                }
                '?' => ops.push(MatchOp::Any),
                other => ops.push(MatchOp::Literal(other)),
            }
        }
        Ok(Self {
            raw,
            ops,
        })
    }

    /// Returns the pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true when the pattern contains no wildcard operations.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, MatchOp::Literal(_)))
    }

    /// Returns true when the pattern is a single `*` matching every name.
    #[must_use]
    pub fn matches_everything(&self) -> bool {
        self.ops == [MatchOp::Star]
    }

    /// Tests a candidate name against the pattern.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let input: Vec<char> = candidate.chars().collect();
        match_ops(&self.ops, &input)
    }

    /// Returns the compiled operations for containment analysis.
    pub(crate) fn ops(&self) -> &[MatchOp] {
        &self.ops
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.fmt(f)
    }
}

impl PartialEq for GlobPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for GlobPattern {}

impl PartialOrd for GlobPattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GlobPattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl Hash for GlobPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Serialize for GlobPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for GlobPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Matching
// ============================================================================

/// Linear wildcard match with single-star backtracking.
fn match_ops(ops: &[MatchOp], input: &[char]) -> bool {
    let mut op_idx = 0;
    let mut in_idx = 0;
    let mut star_op: Option<usize> = None;
    let mut star_in = 0;

    while in_idx < input.len() {
        let step = ops.get(op_idx).copied();
        match step {
            Some(MatchOp::Any) => {
                op_idx += 1;
                in_idx += 1;
            }
            Some(MatchOp::Literal(ch)) if ch == input[in_idx] => {
                op_idx += 1;
                in_idx += 1;
            }
            Some(MatchOp::Star) => {
                star_op = Some(op_idx);
                star_in = in_idx;
                op_idx += 1;
            }
            _ => {
                let Some(star) = star_op else {
                    return false;
                };
                star_in += 1;
                in_idx = star_in;
                op_idx = star + 1;
            }
        }
    }

    while ops.get(op_idx) == Some(&MatchOp::Star) {
        op_idx += 1;
    }
    op_idx == ops.len()
}
