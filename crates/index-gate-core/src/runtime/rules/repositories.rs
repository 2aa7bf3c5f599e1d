// index-gate-core/src/runtime/rules/repositories.rs
// ============================================================================
// Module: Index Gate Repositories Rule
// Description: Repository-name narrowing over the repository universe.
// Purpose: Constrain repository operations to configured selectors.
// Dependencies: crate::{core, runtime}, tracing
// ============================================================================

//! ## Overview
//! The repositories rule is the plain case of the wildcard machinery over the
//! repository name universe, enumerated through the facade. It narrows the
//! repository selectors on both snapshot-shaped and repository-shaped
//! contexts. A configured set that resolves to `_all` or `*` is rejected at
//! creation time as redundant.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::warn;

use crate::core::context::BlockContext;
use crate::core::context::CommonContext;
use crate::core::names::NamePattern;
use crate::core::names::RepositoryName;
use crate::runtime::matcher::PatternSet;
use crate::runtime::rules::EvalServices;
use crate::runtime::rules::RejectCause;
use crate::runtime::rules::Rule;
use crate::runtime::rules::RuleCreationError;
use crate::runtime::rules::RuleKind;
use crate::runtime::rules::RuleOrdinal;
use crate::runtime::rules::RuleResult;
use crate::runtime::rules::snapshots::reject_match_all;
use crate::runtime::variables::ResolutionContext;
use crate::runtime::variables::ResolvableSet;

// ============================================================================
// SECTION: Repositories Rule
// ============================================================================

/// Repository-name narrowing rule.
///
/// # Invariants
/// - The configured set is non-empty and, when concrete, never matches all.
#[derive(Debug, Clone)]
pub struct RepositoriesRule {
    /// Configured repository selectors, possibly variable.
    patterns: ResolvableSet,
}

impl RepositoriesRule {
    /// Builds the rule from configured selectors.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCreationError`] when the set is empty, fails to compile,
    /// or concretely matches every repository.
    pub fn new(patterns: &[String]) -> Result<Self, RuleCreationError> {
        if patterns.is_empty() {
            return Err(RuleCreationError::Invalid(
                "repositories rule requires at least one selector".to_string(),
            ));
        }
        let set = ResolvableSet::from_raw(patterns)?;
        reject_match_all(&set, "repositories")?;
        Ok(Self {
            patterns: set,
        })
    }

    /// Returns the configured set for validation.
    #[must_use]
    pub const fn configured(&self) -> &ResolvableSet {
        &self.patterns
    }

    /// Resolves the configured selectors into a pattern set.
    fn resolve_allowed(
        &self,
        common: &CommonContext,
        services: &EvalServices,
    ) -> Result<PatternSet, RuleResult> {
        let resolution = ResolutionContext::from_common(common, services.env.as_ref());
        let resolved = match self.patterns.resolve(&resolution) {
            Ok(values) => values,
            Err(_) => return Err(RuleResult::rejected_silently()),
        };
        let mut configured = Vec::with_capacity(resolved.len());
        for value in &resolved {
            match NamePattern::parse(value) {
                Ok(pattern) => configured.push(pattern),
                Err(error) => {
                    warn!(selector = %value, error = %error, "configured repository selector is invalid");
                    return Err(RuleResult::rejected(RejectCause::OperationNotAllowed));
                }
            }
        }
        let allowed = PatternSet::new(configured);
        if allowed.is_empty() {
            return Err(RuleResult::rejected(RejectCause::OperationNotAllowed));
        }
        Ok(allowed)
    }
}

#[async_trait]
impl Rule for RepositoriesRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Repositories
    }

    fn ordinal(&self) -> RuleOrdinal {
        if self.patterns.uses_variables() {
            RuleOrdinal::ResourceWithVariables
        } else {
            RuleOrdinal::Resource
        }
    }

    async fn check(&self, context: BlockContext, services: &EvalServices) -> RuleResult {
        match context {
            BlockContext::Repository(mut ctx) => {
                let allowed = match self.resolve_allowed(&ctx.common, services) {
                    Ok(allowed) => allowed,
                    Err(rejection) => return rejection,
                };
                let admitted = match narrow(&ctx.repositories, &allowed, services).await {
                    Ok(admitted) => admitted,
                    Err(rejection) => return rejection,
                };
                if admitted.is_empty() {
                    return RuleResult::rejected(RejectCause::OperationNotAllowed);
                }
                ctx.repositories = admitted;
                RuleResult::fulfilled(BlockContext::Repository(ctx))
            }
            BlockContext::Snapshot(mut ctx) => {
                let allowed = match self.resolve_allowed(&ctx.common, services) {
                    Ok(allowed) => allowed,
                    Err(rejection) => return rejection,
                };
                let admitted = match narrow(&ctx.repositories, &allowed, services).await {
                    Ok(admitted) => admitted,
                    Err(rejection) => return rejection,
                };
                if admitted.is_empty() {
                    return RuleResult::rejected(RejectCause::OperationNotAllowed);
                }
                ctx.repositories = admitted;
                RuleResult::fulfilled(BlockContext::Snapshot(ctx))
            }
            other => RuleResult::fulfilled(other),
        }
    }
}

/// Narrows requested repository selectors against the allowed set.
///
/// A failed universe lookup rejects the rule; it never degrades to
/// universe-less admission.
async fn narrow(
    requested: &BTreeSet<RepositoryName>,
    allowed: &PatternSet,
    services: &EvalServices,
) -> Result<BTreeSet<RepositoryName>, RuleResult> {
    let universe = match services.cluster.repositories().await {
        Ok(names) => names.into_iter().collect::<BTreeSet<String>>(),
        Err(error) => {
            warn!(error = %error, "repository lookup failed");
            return Err(RuleResult::rejected(RejectCause::OperationNotAllowed));
        }
    };

    let selectors: Vec<NamePattern> = if requested.is_empty() {
        vec![NamePattern::Wildcard]
    } else {
        requested.iter().map(|name| name.pattern().clone()).collect()
    };

    let mut admitted = BTreeSet::new();
    for selector in &selectors {
        admitted
            .extend(allowed.admit(selector, Some(&universe)).into_iter().map(RepositoryName::new));
    }
    Ok(admitted)
}
