// index-gate-core/src/core/history.rs
// ============================================================================
// Module: Index Gate Evaluation History
// Description: Append-only per-block evaluation records.
// Purpose: Capture rule outcomes for audit and debug without leaking payloads.
// Dependencies: crate::runtime::rules (cause type), serde
// ============================================================================

//! ## Overview
//! History is written append-only while blocks evaluate: one entry per block,
//! one item per rule that ran, plus a redacted snapshot of the context the
//! block resolved. The audit sink receives the full history together with the
//! final decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::runtime::rules::RejectCause;
use crate::runtime::rules::RuleKind;

// ============================================================================
// SECTION: Rule History
// ============================================================================

/// Outcome of a single rule evaluation, as recorded in history.
///
/// # Invariants
/// - Variants are stable for serialization and audit matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryOutcome {
    /// The rule accepted the request.
    Fulfilled,
    /// The rule rejected the request.
    Rejected {
        /// Optional structured cause.
        cause: Option<RejectCause>,
    },
}

/// One evaluated rule inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleHistoryItem {
    /// Rule kind that ran.
    pub rule: RuleKind,
    /// Outcome of the rule.
    pub outcome: HistoryOutcome,
}

// ============================================================================
// SECTION: Context Snapshot
// ============================================================================

/// Redacted view of the context a block resolved.
///
/// # Invariants
/// - Contains only names and labels, never payloads or credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Request shape label.
    pub shape: String,
    /// Logged user identifier, when authenticated.
    pub user: Option<String>,
    /// Narrowed index names in wire form.
    pub indices: Vec<String>,
}

// ============================================================================
// SECTION: Block History
// ============================================================================

/// Evaluation record for one block.
///
/// # Invariants
/// - `items` preserves rule evaluation order; evaluation stops after the
///   first rejected item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHistory {
    /// Block name.
    pub block: String,
    /// Per-rule outcomes in evaluation order.
    pub items: Vec<RuleHistoryItem>,
    /// Redacted snapshot of the resolved context.
    pub resolved: ContextSnapshot,
}
