// glob-logic/src/lib.rs
// ============================================================================
// Module: Glob Logic Root
// Description: Public API surface for the wildcard pattern algebra.
// Purpose: Wire together pattern compilation, matching, and containment.
// Dependencies: crate::{containment, pattern}
// ============================================================================

//! ## Overview
//! `glob-logic` is a dependency-light wildcard algebra: compile `*`/`?` globs
//! once, match candidates in linear time, and reason structurally about
//! pattern containment and intersection. It carries no resource semantics; the
//! access-control layers above decide what the names mean.

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod containment;
pub mod pattern;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use pattern::GlobError;
pub use pattern::GlobPattern;

// ============================================================================
// SECTION: Set Helpers
// ============================================================================

/// Returns true when any pattern in the set matches the candidate.
#[must_use]
pub fn any_matches(patterns: &[GlobPattern], candidate: &str) -> bool {
    patterns.iter().any(|pattern| pattern.matches(candidate))
}

/// Returns true when some pattern in the set covers the inner pattern.
#[must_use]
pub fn any_covers(patterns: &[GlobPattern], inner: &GlobPattern) -> bool {
    patterns.iter().any(|pattern| pattern.covers(inner))
}
