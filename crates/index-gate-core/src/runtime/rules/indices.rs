// index-gate-core/src/runtime/rules/indices.rs
// ============================================================================
// Module: Index Gate Indices Rule
// Description: Index narrowing for general, multi, and template requests.
// Purpose: Rewrite the requested index view to the caller's permitted subset.
// Dependencies: crate::{core, runtime}, tracing
// ============================================================================

//! ## Overview
//! The indices rule is the heart of the engine. For single index-bearing
//! requests it substitutes the local universe for empty or match-all
//! selectors, expands aliases, splits local from remote names, and admits the
//! permitted subset; an empty result rejects with `IndexNotFound` when the
//! request demanded concrete names (or the rule requires involvement) and
//! `OperationNotAllowed` otherwise. Multi-search packs resolve independently:
//! packs asking only for patterns may legally reduce to the empty set. All
//! template operations delegate to the template narrowing logic, which shares
//! this rule's resolved pattern set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::warn;

use crate::core::context::BlockContext;
use crate::core::context::GeneralIndexContext;
use crate::core::context::Indices;
use crate::core::context::MultiIndexContext;
use crate::core::context::SnapshotContext;
use crate::core::metadata::IndexWithAliases;
use crate::core::metadata::RemoteIndexWithAliases;
use crate::core::names::IndexName;
use crate::core::names::NamePattern;
use crate::runtime::matcher::IndicesMatcher;
use crate::runtime::rules::EvalServices;
use crate::runtime::rules::RejectCause;
use crate::runtime::rules::Rule;
use crate::runtime::rules::RuleCreationError;
use crate::runtime::rules::RuleKind;
use crate::runtime::rules::RuleOrdinal;
use crate::runtime::rules::RuleResult;
use crate::runtime::rules::templates;
use crate::runtime::variables::ResolutionContext;
use crate::runtime::variables::ResolvableSet;

// ============================================================================
// SECTION: Rule Definition
// ============================================================================

/// The indices rule configuration.
///
/// # Invariants
/// - The configured set is non-empty.
#[derive(Debug, Clone)]
pub struct IndicesRule {
    /// Configured index selectors, possibly variable.
    patterns: ResolvableSet,
    /// Require a non-empty admitted set even for pattern-only requests.
    must_involve_indices: bool,
}

impl IndicesRule {
    /// Builds the rule from configured selectors.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCreationError`] when the set is empty or a definition
    /// fails to compile.
    pub fn new(patterns: &[String], must_involve_indices: bool) -> Result<Self, RuleCreationError> {
        if patterns.is_empty() {
            return Err(RuleCreationError::Invalid(
                "indices rule requires at least one selector".to_string(),
            ));
        }
        Ok(Self {
            patterns: ResolvableSet::from_raw(patterns)?,
            must_involve_indices,
        })
    }

    /// Returns the configured set for validation.
    #[must_use]
    pub const fn configured(&self) -> &ResolvableSet {
        &self.patterns
    }

    /// Resolves the configured selectors for the current request.
    fn resolve_matcher(
        &self,
        context: &BlockContext,
        services: &EvalServices,
    ) -> Result<IndicesMatcher, RuleResult> {
        let resolution = ResolutionContext::from_block(context, services.env.as_ref());
        let resolved = match self.patterns.resolve(&resolution) {
            Ok(values) => values,
            Err(_) => return Err(RuleResult::rejected_silently()),
        };
        let mut configured = Vec::with_capacity(resolved.len());
        for value in &resolved {
            match IndexName::parse(value) {
                Ok(name) => configured.push(name),
                Err(error) => {
                    warn!(selector = %value, error = %error, "configured index selector is invalid");
                    return Err(RuleResult::rejected(RejectCause::OperationNotAllowed));
                }
            }
        }
        let matcher = IndicesMatcher::new(&configured);
        if matcher.is_empty() {
            return Err(RuleResult::rejected(RejectCause::OperationNotAllowed));
        }
        Ok(matcher)
    }
}

#[async_trait]
impl Rule for IndicesRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Indices
    }

    fn ordinal(&self) -> RuleOrdinal {
        if self.patterns.uses_variables() {
            RuleOrdinal::ResourceWithVariables
        } else {
            RuleOrdinal::Resource
        }
    }

    async fn check(&self, context: BlockContext, services: &EvalServices) -> RuleResult {
        let matcher = match self.resolve_matcher(&context, services) {
            Ok(matcher) => matcher,
            Err(rejection) => return rejection,
        };

        match context {
            BlockContext::GeneralIndex(ctx) => {
                check_general(ctx, &matcher, self.must_involve_indices, services).await
            }
            BlockContext::MultiIndex(ctx) => check_multi(ctx, &matcher, services).await,
            BlockContext::Template(ctx) => templates::check_template(ctx, &matcher, services).await,
            BlockContext::Snapshot(ctx) => check_snapshot_indices(ctx, &matcher, services).await,
            other @ (BlockContext::Repository(_)
            | BlockContext::CurrentUserMetadata(_)
            | BlockContext::General(_)) => RuleResult::fulfilled(other),
        }
    }
}

// ============================================================================
// SECTION: Requested-Set Splitting
// ============================================================================

/// A requested index set split by locality.
struct SplitRequest {
    /// Local selectors; empty requests substitute the wildcard selector.
    locals: Vec<NamePattern>,
    /// Remote `(cluster, name)` selector pairs.
    remotes: Vec<(NamePattern, NamePattern)>,
}

/// Splits a requested set, substituting the wildcard for empty requests.
fn split_requested(requested: &BTreeSet<IndexName>) -> SplitRequest {
    let mut locals = Vec::new();
    let mut remotes = Vec::new();
    for name in requested {
        match name {
            IndexName::Local(pattern) => locals.push(pattern.clone()),
            IndexName::Remote {
                cluster,
                name,
            } => remotes.push((cluster.clone(), name.clone())),
        }
    }
    if locals.is_empty() && remotes.is_empty() {
        locals.push(NamePattern::Wildcard);
    }
    SplitRequest {
        locals,
        remotes,
    }
}

// ============================================================================
// SECTION: Universe Access
// ============================================================================

/// Fetches the local universe, translating lookup failures into rejections.
async fn local_universe(services: &EvalServices) -> Result<Vec<IndexWithAliases>, RuleResult> {
    services.cluster.local_indices().await.map_err(|error| {
        warn!(error = %error, "local indices lookup failed");
        RuleResult::rejected(RejectCause::OperationNotAllowed)
    })
}

/// Fetches the remote universe for every distinct requested cluster selector.
async fn remote_universe(
    services: &EvalServices,
    remotes: &[(NamePattern, NamePattern)],
) -> Result<Vec<RemoteIndexWithAliases>, RuleResult> {
    let mut clusters: Vec<&NamePattern> = Vec::new();
    for (cluster, _) in remotes {
        if !clusters.contains(&cluster) {
            clusters.push(cluster);
        }
    }
    let mut entries = Vec::new();
    for cluster in clusters {
        match services.cluster.remote_indices(cluster).await {
            Ok(batch) => entries.extend(batch),
            Err(error) => {
                warn!(cluster = %cluster, error = %error, "remote indices lookup failed");
                return Err(RuleResult::rejected(RejectCause::OperationNotAllowed));
            }
        }
    }
    Ok(entries)
}

/// Resolves one requested set into its admitted subset.
async fn admit(
    requested: &BTreeSet<IndexName>,
    matcher: &IndicesMatcher,
    universe: &[IndexWithAliases],
    services: &EvalServices,
) -> Result<BTreeSet<IndexName>, RuleResult> {
    let split = split_requested(requested);
    let mut found = matcher.admit_local(&split.locals, universe);
    if !split.remotes.is_empty() {
        let admitted_remote = if matcher.remote_needs_universe(&split.remotes) {
            let entries = remote_universe(services, &split.remotes).await?;
            matcher.admit_remote(&split.remotes, Some(&entries))
        } else {
            matcher.admit_remote(&split.remotes, None)
        };
        found.extend(admitted_remote);
    }
    Ok(found)
}

// ============================================================================
// SECTION: General Index Requests
// ============================================================================

/// Narrows a single index-bearing request.
async fn check_general(
    mut ctx: GeneralIndexContext,
    matcher: &IndicesMatcher,
    must_involve_indices: bool,
    services: &EvalServices,
) -> RuleResult {
    let universe = match local_universe(services).await {
        Ok(universe) => universe,
        Err(rejection) => return rejection,
    };
    let split_concrete = ctx.filtered_indices.iter().any(IndexName::is_concrete);
    let found = match admit(&ctx.filtered_indices, matcher, &universe, services).await {
        Ok(found) => found,
        Err(rejection) => return rejection,
    };

    if found.is_empty() {
        let cause = if must_involve_indices || split_concrete {
            RejectCause::IndexNotFound
        } else {
            RejectCause::OperationNotAllowed
        };
        return RuleResult::rejected(cause);
    }

    ctx.all_allowed_indices = matcher.all_allowed(&universe);
    ctx.all_allowed_indices.extend(found.iter().cloned());
    ctx.filtered_indices = found;
    RuleResult::fulfilled(BlockContext::GeneralIndex(ctx))
}

// ============================================================================
// SECTION: Multi-Search Requests
// ============================================================================

/// Narrows every pack of a multi-search request independently.
async fn check_multi(
    mut ctx: MultiIndexContext,
    matcher: &IndicesMatcher,
    services: &EvalServices,
) -> RuleResult {
    let universe = match local_universe(services).await {
        Ok(universe) => universe,
        Err(rejection) => return rejection,
    };

    let mut any_non_empty = false;
    let mut any_concrete_demand = false;
    let mut resolved_packs = Vec::with_capacity(ctx.index_packs.len());
    for pack in &ctx.index_packs {
        let Indices::Found(requested) = pack else {
            resolved_packs.push(Indices::NotFound);
            continue;
        };
        any_concrete_demand =
            any_concrete_demand || requested.iter().any(IndexName::is_concrete);
        let found = match admit(requested, matcher, &universe, services).await {
            Ok(found) => found,
            Err(rejection) => return rejection,
        };
        any_non_empty = any_non_empty || !found.is_empty();
        resolved_packs.push(Indices::Found(found));
    }

    if !any_non_empty && any_concrete_demand {
        return RuleResult::rejected(RejectCause::IndexNotFound);
    }

    ctx.index_packs = resolved_packs;
    RuleResult::fulfilled(BlockContext::MultiIndex(ctx))
}

// ============================================================================
// SECTION: Snapshot-Carried Indices
// ============================================================================

/// Narrows the indices carried by a snapshot request (restore, status).
async fn check_snapshot_indices(
    mut ctx: SnapshotContext,
    matcher: &IndicesMatcher,
    services: &EvalServices,
) -> RuleResult {
    let universe = match local_universe(services).await {
        Ok(universe) => universe,
        Err(rejection) => return rejection,
    };
    if !ctx.filtered_indices.is_empty() {
        let found = match admit(&ctx.filtered_indices, matcher, &universe, services).await {
            Ok(found) => found,
            Err(rejection) => return rejection,
        };
        if found.is_empty() {
            return RuleResult::rejected(RejectCause::IndexNotFound);
        }
        ctx.filtered_indices = found;
    }
    ctx.all_allowed_indices = matcher.all_allowed(&universe);
    ctx.all_allowed_indices.extend(ctx.filtered_indices.iter().cloned());
    RuleResult::fulfilled(BlockContext::Snapshot(ctx))
}
