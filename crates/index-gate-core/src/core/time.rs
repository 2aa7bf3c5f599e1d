// index-gate-core/src/core/time.rs
// ============================================================================
// Module: Index Gate Time Model
// Description: Canonical timestamp representation for audit records.
// Purpose: Keep decisions replayable by never reading wall-clock time in the engine.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Audit events and histories embed explicit time values supplied by an
//! injected clock. The engine itself never reads wall-clock time, which keeps
//! `evaluate` a pure function of its inputs and collaborators.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in audit records.
///
/// # Invariants
/// - Values are explicitly provided by the injected clock; the engine never
///   reads wall-clock time directly.
/// - No validation is performed; monotonicity is a clock responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }
}
