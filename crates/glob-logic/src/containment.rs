// glob-logic/src/containment.rs
// ============================================================================
// Module: Glob Containment Analysis
// Description: Language containment and structural intersection for globs.
// Purpose: Decide whether one pattern's language is a subset of another's.
// Dependencies: crate::pattern
// ============================================================================

//! ## Overview
//! Containment answers "does `outer` match every name `inner` could match?"
//! without enumerating a universe. The check is structural: a `*` in the outer
//! pattern absorbs any span of the inner pattern, a `?` covers exactly one
//! non-star inner position, and literals must align. The analysis is
//! conservative for exotic pattern pairs (it may report non-containment where
//! a full language-inclusion decision procedure would succeed) and never
//! reports containment that does not hold.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::pattern::GlobPattern;
use crate::pattern::MatchOp;

// ============================================================================
// SECTION: Containment
// ============================================================================

impl GlobPattern {
    /// Returns true when every name matched by `inner` is matched by `self`.
    #[must_use]
    pub fn covers(&self, inner: &Self) -> bool {
        let outer_ops = self.ops();
        let inner_ops = inner.ops();
        let mut memo = vec![None; (outer_ops.len() + 1) * (inner_ops.len() + 1)];
        covers_from(outer_ops, inner_ops, 0, 0, &mut memo)
    }

    /// Returns the structural intersection of two patterns, when one exists.
    ///
    /// The result is the more restrictive pattern when containment holds in
    /// either direction, or the concatenation of an open-ended prefix and an
    /// open-ended suffix (`abc*` with `*xyz` yields `abc*xyz`). Pairs outside
    /// those shapes return `None` even when their languages overlap; callers
    /// fall back to universe enumeration in that case.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        if self.covers(other) {
            return Some(other.clone());
        }
        if other.covers(self) {
            return Some(self.clone());
        }
        bounded_concat(self, other).or_else(|| bounded_concat(other, self))
    }
}

/// Joins `prefix*` and `*suffix` into `prefix*suffix`.
fn bounded_concat(prefix: &GlobPattern, suffix: &GlobPattern) -> Option<GlobPattern> {
    let head = prefix.as_str();
    let tail = suffix.as_str();
    if !head.ends_with('*') || !tail.starts_with('*') {
        return None;
    }
    GlobPattern::parse(format!(
        "{}*{}",
        head.trim_end_matches('*'),
        tail.trim_start_matches('*')
    ))
    .ok()
}

/// Memoized containment walk over compiled operations.
fn covers_from(
    outer: &[MatchOp],
    inner: &[MatchOp],
    outer_idx: usize,
    inner_idx: usize,
    memo: &mut [Option<bool>],
) -> bool {
    let slot = outer_idx * (inner.len() + 1) + inner_idx;
    if let Some(cached) = memo[slot] {
        return cached;
    }

    let result = match outer.get(outer_idx) {
        None => inner_idx == inner.len(),
        Some(MatchOp::Star) => {
            covers_from(outer, inner, outer_idx + 1, inner_idx, memo)
                || (inner_idx < inner.len()
                    && covers_from(outer, inner, outer_idx, inner_idx + 1, memo))
        }
        Some(MatchOp::Any) => match inner.get(inner_idx) {
            Some(MatchOp::Any | MatchOp::Literal(_)) => {
                covers_from(outer, inner, outer_idx + 1, inner_idx + 1, memo)
            }
            _ => false,
        },
        Some(MatchOp::Literal(ch)) => match inner.get(inner_idx) {
            Some(MatchOp::Literal(other)) if other == ch => {
                covers_from(outer, inner, outer_idx + 1, inner_idx + 1, memo)
            }
            _ => false,
        },
    };

    memo[slot] = Some(result);
    result
}
