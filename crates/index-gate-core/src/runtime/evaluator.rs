// index-gate-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Index Gate Block Evaluator
// Description: Ordered rule evaluation within one block.
// Purpose: Run rules by ordinal, short-circuit on rejection, record history.
// Dependencies: crate::{core, runtime::rules}, serde
// ============================================================================

//! ## Overview
//! A block is an ordered collection of rules evaluated as a unit: fulfilled
//! iff every rule fulfils. Rule order within a block is fixed by ordinal
//! (authentication, authorization, concrete resource, variable resource,
//! enhancements); declaration order is preserved within one ordinal. The
//! first rejection abandons the block and control falls to the next block.
//! Every evaluation appends a history record regardless of outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::context::BlockContext;
use crate::core::context::Indices;
use crate::core::history::BlockHistory;
use crate::core::history::ContextSnapshot;
use crate::core::history::HistoryOutcome;
use crate::core::history::RuleHistoryItem;
use crate::core::names::IndexName;
use crate::core::request::Request;
use crate::runtime::rules::EvalServices;
use crate::runtime::rules::RejectCause;
use crate::runtime::rules::Rule;
use crate::runtime::rules::RuleResult;

// ============================================================================
// SECTION: Block Policy
// ============================================================================

/// Policy a fulfilled block applies to the request.
///
/// # Invariants
/// - Variants are stable for serialization and config matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// The request proceeds with the rewritten context.
    #[default]
    Allow,
    /// The request is rejected.
    Forbid,
}

/// Logging verbosity for a block.
///
/// # Invariants
/// - Variants are stable for serialization and config matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Log matches at info level.
    #[default]
    Info,
    /// Log only abnormal outcomes.
    Error,
}

// ============================================================================
// SECTION: Block Creation
// ============================================================================

/// Errors raised while assembling a block.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockCreationError {
    /// The block name was empty.
    #[error("block name cannot be empty")]
    EmptyName,
    /// The block carried no rules.
    #[error("block {0} must contain at least one rule")]
    NoRules(String),
}

// ============================================================================
// SECTION: Block
// ============================================================================

/// Outcome of one block evaluation.
#[derive(Debug)]
pub enum BlockResult {
    /// Every rule fulfilled; the final context carries the rewrites.
    Fulfilled(Box<BlockContext>),
    /// Some rule rejected; the cause of the rejecting rule, when given.
    Rejected(Option<RejectCause>),
}

/// An ordered collection of rules evaluated as a unit.
pub struct Block {
    /// Block name used in history and logs.
    name: String,
    /// Policy applied when the block fulfils.
    policy: Policy,
    /// Logging verbosity.
    verbosity: Verbosity,
    /// Rules sorted by ordinal, stable within one ordinal.
    rules: Vec<Box<dyn Rule>>,
}

impl Block {
    /// Assembles a block, sorting its rules by ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`BlockCreationError`] when the name is empty or no rule is
    /// given.
    pub fn new(
        name: impl Into<String>,
        policy: Policy,
        verbosity: Verbosity,
        mut rules: Vec<Box<dyn Rule>>,
    ) -> Result<Self, BlockCreationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(BlockCreationError::EmptyName);
        }
        if rules.is_empty() {
            return Err(BlockCreationError::NoRules(name));
        }
        rules.sort_by_key(|rule| rule.ordinal());
        Ok(Self {
            name,
            policy,
            verbosity,
            rules,
        })
    }

    /// Returns the block name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the block policy.
    #[must_use]
    pub const fn policy(&self) -> Policy {
        self.policy
    }

    /// Returns the block verbosity.
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Evaluates the block against a fresh context for the request.
    pub async fn evaluate(
        &self,
        request: &Arc<Request>,
        services: &EvalServices,
    ) -> (BlockResult, BlockHistory) {
        let mut context = BlockContext::initial(Arc::clone(request));
        let mut items = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            match rule.check(context, services).await {
                RuleResult::Fulfilled(next) => {
                    items.push(RuleHistoryItem {
                        rule: rule.kind(),
                        outcome: HistoryOutcome::Fulfilled,
                    });
                    context = *next;
                }
                RuleResult::Rejected(cause) => {
                    items.push(RuleHistoryItem {
                        rule: rule.kind(),
                        outcome: HistoryOutcome::Rejected {
                            cause,
                        },
                    });
                    let history = BlockHistory {
                        block: self.name.clone(),
                        items,
                        resolved: ContextSnapshot::default(),
                    };
                    return (BlockResult::Rejected(cause), history);
                }
            }
        }

        let history = BlockHistory {
            block: self.name.clone(),
            items,
            resolved: snapshot(&context),
        };
        (BlockResult::Fulfilled(Box::new(context)), history)
    }
}

// ============================================================================
// SECTION: Context Snapshots
// ============================================================================

/// Builds the redacted history snapshot of a resolved context.
fn snapshot(context: &BlockContext) -> ContextSnapshot {
    let indices = match context {
        BlockContext::GeneralIndex(ctx) => {
            ctx.filtered_indices.iter().map(IndexName::to_wire).collect()
        }
        BlockContext::MultiIndex(ctx) => ctx
            .index_packs
            .iter()
            .filter_map(|pack| match pack {
                Indices::Found(set) => Some(set.iter().map(|name| name.to_wire())),
                Indices::NotFound => None,
            })
            .flatten()
            .collect(),
        BlockContext::Snapshot(ctx) => {
            ctx.filtered_indices.iter().map(|name| name.to_wire()).collect()
        }
        _ => Vec::new(),
    };
    ContextSnapshot {
        shape: context.shape().to_string(),
        user: context.common().user.logged_user.as_ref().map(|user| user.id.to_string()),
        indices,
    }
}
