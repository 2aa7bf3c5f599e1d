// index-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Index Gate Decision Engine
// Description: Block orchestration and final outcome production.
// Purpose: Evaluate blocks in declared order and always produce one outcome.
// Dependencies: crate::{core, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! The engine is the single canonical evaluation path: blocks run in declared
//! order, each against a fresh context derived from the immutable request;
//! the first fully-fulfilled block decides. When no block fulfils, the
//! distinct rejection causes are aggregated: a not-found cause on an
//! index-bearing (or template-bearing) request surfaces as `NotFound`, every
//! other mismatch as `ForbiddenByMismatched`. Invariant violations in
//! rewrites are engine bugs: they are logged at error level and surfaced as
//! [`EngineError::Interrupted`], never silently allowed. Every decision is
//! recorded on the audit sink, fire and forget.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::core::context::BlockContext;
use crate::core::history::BlockHistory;
use crate::core::history::HistoryOutcome;
use crate::core::request::Request;
use crate::interfaces::AuditEvent;
use crate::interfaces::AuditSink;
use crate::interfaces::Clock;
use crate::interfaces::DecisionLabel;
use crate::runtime::evaluator::Block;
use crate::runtime::evaluator::BlockResult;
use crate::runtime::evaluator::Policy;
use crate::runtime::evaluator::Verbosity;
use crate::runtime::rules::EvalServices;
use crate::runtime::rules::RejectCause;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Final decision for one request.
#[derive(Debug)]
pub enum Outcome {
    /// A block allowed the request; the context carries the rewrites the
    /// host adapter applies to the outbound action.
    Allow {
        /// The resolved block context.
        context: Box<BlockContext>,
        /// Name of the deciding block.
        block: String,
    },
    /// A forbid block matched the request.
    ForbiddenByMatched {
        /// Name of the deciding block.
        block: String,
    },
    /// No block matched; the distinct rejection causes are aggregated.
    ForbiddenByMismatched {
        /// Distinct causes in stable order.
        causes: BTreeSet<RejectCause>,
    },
    /// The requested resource is not visible to the caller.
    NotFound,
}

/// Outcome plus the evaluation history for audit and debug.
#[derive(Debug)]
pub struct EngineVerdict {
    /// Final decision.
    pub outcome: Outcome,
    /// Per-block history in evaluation order.
    pub history: Vec<BlockHistory>,
}

/// Engine invariant violations.
///
/// # Invariants
/// - Raised only for bugs in rewrites, never for recoverable conditions;
///   the host maps this to an internal server error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A rewrite violated a structural invariant.
    #[error("evaluation must be interrupted: {0}")]
    Interrupted(String),
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// The access-control decision engine.
///
/// The engine itself is immutable; hot reload builds a new engine from the
/// new configuration and swaps one shared reference.
pub struct AccessControlEngine {
    /// Blocks in declared order.
    blocks: Vec<Block>,
    /// Collaborator handles shared by all rules.
    services: EvalServices,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Clock for audit timestamps.
    clock: Arc<dyn Clock>,
}

impl AccessControlEngine {
    /// Creates an engine from assembled blocks and collaborators.
    #[must_use]
    pub fn new(
        blocks: Vec<Block>,
        services: EvalServices,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            blocks,
            services,
            audit,
            clock,
        }
    }

    /// Evaluates one classified request to its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Interrupted`] when a rewrite violates a
    /// structural invariant.
    pub async fn evaluate(&self, request: Request) -> Result<EngineVerdict, EngineError> {
        let request = Arc::new(request);
        let mut history: Vec<BlockHistory> = Vec::with_capacity(self.blocks.len());

        for block in &self.blocks {
            let (result, block_history) = block.evaluate(&request, &self.services).await;
            history.push(block_history);
            let BlockResult::Fulfilled(context) = result else {
                continue;
            };

            if let Err(violation) = verify_rewrite(&context) {
                error!(block = block.name(), violation = %violation, "rewrite invariant violated");
                self.record(&request, DecisionLabel::Interrupted, Some(block.name()), &history);
                return Err(EngineError::Interrupted(violation));
            }

            return Ok(match block.policy() {
                Policy::Allow => {
                    match block.verbosity() {
                        Verbosity::Info => {
                            info!(block = block.name(), request = %request.id, "request allowed");
                        }
                        Verbosity::Error => {
                            debug!(block = block.name(), request = %request.id, "request allowed");
                        }
                    }
                    self.record(&request, DecisionLabel::Allowed, Some(block.name()), &history);
                    EngineVerdict {
                        outcome: Outcome::Allow {
                            context,
                            block: block.name().to_string(),
                        },
                        history,
                    }
                }
                Policy::Forbid => {
                    info!(block = block.name(), request = %request.id, "request forbidden");
                    self.record(
                        &request,
                        DecisionLabel::ForbiddenByMatched,
                        Some(block.name()),
                        &history,
                    );
                    EngineVerdict {
                        outcome: Outcome::ForbiddenByMatched {
                            block: block.name().to_string(),
                        },
                        history,
                    }
                }
            });
        }

        let causes = collect_causes(&history);
        let outcome = if causes.contains(&RejectCause::IndexNotFound) && request.involves_indices()
        {
            self.record(&request, DecisionLabel::NotFound, None, &history);
            Outcome::NotFound
        } else if causes.contains(&RejectCause::TemplateNotFound) && request.involves_templates() {
            self.record(&request, DecisionLabel::NotFound, None, &history);
            Outcome::NotFound
        } else {
            debug!(request = %request.id, ?causes, "no block matched");
            self.record(&request, DecisionLabel::ForbiddenByMismatched, None, &history);
            Outcome::ForbiddenByMismatched {
                causes,
            }
        };
        Ok(EngineVerdict {
            outcome,
            history,
        })
    }

    /// Emits one audit event.
    fn record(
        &self,
        request: &Request,
        decision: DecisionLabel,
        block: Option<&str>,
        history: &[BlockHistory],
    ) {
        self.audit.record(AuditEvent {
            request_id: request.id.clone(),
            decision,
            block: block.map(str::to_string),
            decided_at: self.clock.now(),
            history: history.to_vec(),
        });
    }
}

// ============================================================================
// SECTION: Outcome Helpers
// ============================================================================

/// Aggregates the distinct rejection causes across all evaluated blocks.
fn collect_causes(history: &[BlockHistory]) -> BTreeSet<RejectCause> {
    history
        .iter()
        .flat_map(|block| &block.items)
        .filter_map(|item| match item.outcome {
            HistoryOutcome::Rejected {
                cause,
            } => cause,
            HistoryOutcome::Fulfilled => None,
        })
        .collect()
}

/// Checks the structural invariants of a fulfilled rewrite.
fn verify_rewrite(context: &BlockContext) -> Result<(), String> {
    match context {
        BlockContext::GeneralIndex(ctx) => {
            if !ctx.all_allowed_indices.is_empty()
                && !ctx.filtered_indices.is_subset(&ctx.all_allowed_indices)
            {
                return Err("filtered indices exceed the allowed set".to_string());
            }
            Ok(())
        }
        BlockContext::Snapshot(ctx) => {
            if !ctx.all_allowed_indices.is_empty()
                && !ctx.filtered_indices.is_subset(&ctx.all_allowed_indices)
            {
                return Err("filtered indices exceed the allowed set".to_string());
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
