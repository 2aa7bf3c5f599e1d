// index-gate-core/src/runtime/rules/snapshots.rs
// ============================================================================
// Module: Index Gate Snapshots Rule
// Description: Snapshot-name narrowing over the snapshot universe.
// Purpose: Constrain snapshot operations to configured snapshot selectors.
// Dependencies: crate::{core, runtime}, tracing
// ============================================================================

//! ## Overview
//! The snapshots rule applies the wildcard machinery to the snapshot name
//! universe. The universe is enumerated through the facade for every concrete
//! repository the request names; pattern repositories fall back to structural
//! admission. A configured set that resolves to `_all` or `*` is rejected at
//! creation time as redundant.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::warn;

use crate::core::context::BlockContext;
use crate::core::names::NamePattern;
use crate::core::names::RepositoryName;
use crate::core::names::SnapshotName;
use crate::runtime::matcher::PatternSet;
use crate::runtime::rules::EvalServices;
use crate::runtime::rules::RejectCause;
use crate::runtime::rules::Rule;
use crate::runtime::rules::RuleCreationError;
use crate::runtime::rules::RuleKind;
use crate::runtime::rules::RuleOrdinal;
use crate::runtime::rules::RuleResult;
use crate::runtime::variables::ResolutionContext;
use crate::runtime::variables::ResolvableSet;

// ============================================================================
// SECTION: Snapshots Rule
// ============================================================================

/// Snapshot-name narrowing rule.
///
/// # Invariants
/// - The configured set is non-empty and, when concrete, never matches all.
#[derive(Debug, Clone)]
pub struct SnapshotsRule {
    /// Configured snapshot selectors, possibly variable.
    patterns: ResolvableSet,
}

impl SnapshotsRule {
    /// Builds the rule from configured selectors.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCreationError`] when the set is empty, fails to compile,
    /// or concretely matches every snapshot.
    pub fn new(patterns: &[String]) -> Result<Self, RuleCreationError> {
        if patterns.is_empty() {
            return Err(RuleCreationError::Invalid(
                "snapshots rule requires at least one selector".to_string(),
            ));
        }
        let set = ResolvableSet::from_raw(patterns)?;
        reject_match_all(&set, "snapshots")?;
        Ok(Self {
            patterns: set,
        })
    }

    /// Returns the configured set for validation.
    #[must_use]
    pub const fn configured(&self) -> &ResolvableSet {
        &self.patterns
    }
}

/// Rejects concretely-resolved sets that match every resource.
pub(crate) fn reject_match_all(
    set: &ResolvableSet,
    rule: &'static str,
) -> Result<(), RuleCreationError> {
    let Some(values) = set.already_resolved() else {
        return Ok(());
    };
    for value in values {
        let parsed = NamePattern::parse(value)?;
        if parsed.matches_all() {
            return Err(RuleCreationError::MatchesAllRedundant {
                rule,
            });
        }
    }
    Ok(())
}

#[async_trait]
impl Rule for SnapshotsRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Snapshots
    }

    fn ordinal(&self) -> RuleOrdinal {
        if self.patterns.uses_variables() {
            RuleOrdinal::ResourceWithVariables
        } else {
            RuleOrdinal::Resource
        }
    }

    async fn check(&self, context: BlockContext, services: &EvalServices) -> RuleResult {
        let mut ctx = match context {
            BlockContext::Snapshot(ctx) => ctx,
            other => return RuleResult::fulfilled(other),
        };

        let resolved = {
            let resolution = ResolutionContext::from_common(&ctx.common, services.env.as_ref());
            match self.patterns.resolve(&resolution) {
                Ok(values) => values,
                Err(_) => return RuleResult::rejected_silently(),
            }
        };
        let mut configured = Vec::with_capacity(resolved.len());
        for value in &resolved {
            match NamePattern::parse(value) {
                Ok(pattern) => configured.push(pattern),
                Err(error) => {
                    warn!(selector = %value, error = %error, "configured snapshot selector is invalid");
                    return RuleResult::rejected(RejectCause::OperationNotAllowed);
                }
            }
        }
        let allowed = PatternSet::new(configured);
        if allowed.is_empty() {
            return RuleResult::rejected(RejectCause::OperationNotAllowed);
        }

        let universe = match snapshot_universe(&ctx.repositories, services).await {
            Ok(universe) => universe,
            Err(rejection) => return rejection,
        };
        let requested: Vec<NamePattern> = if ctx.snapshots.is_empty() {
            vec![NamePattern::Wildcard]
        } else {
            ctx.snapshots.iter().map(|name| name.pattern().clone()).collect()
        };

        let mut admitted = BTreeSet::new();
        for selector in &requested {
            admitted.extend(
                allowed.admit(selector, universe.as_ref()).into_iter().map(SnapshotName::new),
            );
        }
        if admitted.is_empty() {
            return RuleResult::rejected(RejectCause::OperationNotAllowed);
        }

        ctx.snapshots = admitted;
        RuleResult::fulfilled(BlockContext::Snapshot(ctx))
    }
}

/// Enumerates snapshots for every concrete requested repository.
///
/// Any failed enumeration rejects the rule; a partial universe would admit
/// against an incomplete view. `None` means no concrete repository was named
/// and structural admission applies.
async fn snapshot_universe(
    repositories: &BTreeSet<RepositoryName>,
    services: &EvalServices,
) -> Result<Option<BTreeSet<String>>, RuleResult> {
    let mut universe = BTreeSet::new();
    let mut fetched = false;
    for repository in repositories {
        let NamePattern::Full(name) = repository.pattern() else {
            continue;
        };
        match services.cluster.snapshots(name).await {
            Ok(names) => {
                fetched = true;
                universe.extend(names);
            }
            Err(error) => {
                warn!(repository = %name, error = %error, "snapshot lookup failed");
                return Err(RuleResult::rejected(RejectCause::OperationNotAllowed));
            }
        }
    }
    Ok(fetched.then_some(universe))
}
