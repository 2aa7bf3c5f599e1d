// index-gate-core/src/core/context.rs
// ============================================================================
// Module: Index Gate Block Context
// Description: The accumulated, possibly rewritten view of a request.
// Purpose: Thread a narrowing resource view through rules without mutation.
// Dependencies: crate::core::{metadata, names, request, user}
// ============================================================================

//! ## Overview
//! A block context is created fresh per request from the immutable request
//! handle, threaded through rules (each rule returns a new context), and
//! discarded once a decision is produced. The context is sum-typed per request
//! shape so rules can state which shapes they accept and fail closed on
//! anything else. The filter and field-restriction rewrites live on the
//! common part; resource narrowings live on the shape-specific parts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::metadata::TemplateOperation;
use crate::core::names::IndexName;
use crate::core::names::NamePattern;
use crate::core::names::RepositoryName;
use crate::core::names::SnapshotName;
use crate::core::request::Request;
use crate::core::request::RequestPayload;
use crate::core::user::UserMetadata;

// ============================================================================
// SECTION: Rewrite Payloads
// ============================================================================

/// An opaque query fragment injected into searches by the filter rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterQuery(String);

impl FilterQuery {
    /// Creates a filter query fragment.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self(query.into())
    }

    /// Returns the fragment as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Field-level security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Only the listed fields are surfaced.
    Whitelist,
    /// The listed fields are removed.
    Blacklist,
}

/// Field-level security restriction applied to response documents.
///
/// # Invariants
/// - `fields` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRestrictions {
    /// Restriction mode.
    pub mode: FieldMode,
    /// Field names the restriction applies to.
    pub fields: BTreeSet<String>,
}

/// Response rewrite narrowing templates to the caller's allowed view.
///
/// The host adapter applies this to the outbound template response; the
/// narrowing semantics live with the template rule logic.
///
/// # Invariants
/// - `allowed` is the resolved index-pattern set of the fulfilling rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTransformation {
    /// Resolved allowed index patterns.
    pub allowed: Vec<NamePattern>,
}

// ============================================================================
// SECTION: Index Packs
// ============================================================================

/// Resolved index set for one inner query of a multi-search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indices {
    /// The admitted index set; may be empty when only patterns were asked.
    Found(BTreeSet<IndexName>),
    /// The pack could not be resolved at all.
    NotFound,
}

impl Indices {
    /// Returns the admitted set when present and non-empty.
    #[must_use]
    pub fn non_empty(&self) -> Option<&BTreeSet<IndexName>> {
        match self {
            Self::Found(set) if !set.is_empty() => Some(set),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Common Context
// ============================================================================

/// State shared by every context shape.
#[derive(Debug, Clone)]
pub struct CommonContext {
    /// Immutable request handle.
    pub request: Arc<Request>,
    /// Identity and tenancy state accumulated so far.
    pub user: UserMetadata,
    /// Headers appended to the response by fulfilled rules.
    pub response_headers: BTreeMap<String, String>,
    /// Filter query injected into searches, when the filter rule fulfilled.
    pub filter: Option<FilterQuery>,
    /// Field-level security restriction, when the fields rule fulfilled.
    pub fields: Option<FieldRestrictions>,
}

impl CommonContext {
    /// Creates the initial common state for a request.
    #[must_use]
    pub fn new(request: Arc<Request>) -> Self {
        Self {
            request,
            user: UserMetadata::default(),
            response_headers: BTreeMap::new(),
            filter: None,
            fields: None,
        }
    }
}

// ============================================================================
// SECTION: Shape-Specific Contexts
// ============================================================================

/// Context for single index-bearing requests.
///
/// # Invariants
/// - `filtered_indices ⊆ all_allowed_indices` whenever both are populated.
#[derive(Debug, Clone)]
pub struct GeneralIndexContext {
    /// Shared state.
    pub common: CommonContext,
    /// What the caller asked for, narrowed to what the caller may see.
    pub filtered_indices: BTreeSet<IndexName>,
    /// Every concrete index the fulfilling rule would allow.
    pub all_allowed_indices: BTreeSet<IndexName>,
}

/// Context for multi-search requests.
#[derive(Debug, Clone)]
pub struct MultiIndexContext {
    /// Shared state.
    pub common: CommonContext,
    /// One resolved pack per inner query, in request order.
    pub index_packs: Vec<Indices>,
}

/// Context for template-oriented requests.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    /// Shared state.
    pub common: CommonContext,
    /// The template operation, possibly rewritten by the indices rule.
    pub operation: TemplateOperation,
    /// Every concrete index the fulfilling rule would allow.
    pub all_allowed_indices: BTreeSet<IndexName>,
    /// Response narrowing applied by the host adapter.
    pub response_template_filter: Option<TemplateTransformation>,
}

/// Context for snapshot-oriented requests.
#[derive(Debug, Clone)]
pub struct SnapshotContext {
    /// Shared state.
    pub common: CommonContext,
    /// Snapshot selectors, narrowed by the snapshots rule.
    pub snapshots: BTreeSet<SnapshotName>,
    /// Repository selectors, narrowed by the repositories rule.
    pub repositories: BTreeSet<RepositoryName>,
    /// Indices involved in restore operations, narrowed by the indices rule.
    pub filtered_indices: BTreeSet<IndexName>,
    /// Every concrete index the fulfilling rule would allow.
    pub all_allowed_indices: BTreeSet<IndexName>,
}

/// Context for repository-oriented requests.
#[derive(Debug, Clone)]
pub struct RepositoryContext {
    /// Shared state.
    pub common: CommonContext,
    /// Repository selectors, narrowed by the repositories rule.
    pub repositories: BTreeSet<RepositoryName>,
}

/// Context for requests without resource payload.
#[derive(Debug, Clone)]
pub struct GeneralContext {
    /// Shared state.
    pub common: CommonContext,
}

// ============================================================================
// SECTION: Block Context
// ============================================================================

/// The sum-typed evaluation context, one variant per request shape.
#[derive(Debug, Clone)]
pub enum BlockContext {
    /// Single index-bearing request.
    GeneralIndex(GeneralIndexContext),
    /// Multi-search request.
    MultiIndex(MultiIndexContext),
    /// Template-oriented request.
    Template(TemplateContext),
    /// Snapshot-oriented request.
    Snapshot(SnapshotContext),
    /// Repository-oriented request.
    Repository(RepositoryContext),
    /// Tenancy handshake request.
    CurrentUserMetadata(GeneralContext),
    /// Any other request.
    General(GeneralContext),
}

impl BlockContext {
    /// Builds the initial context for a classified request.
    #[must_use]
    pub fn initial(request: Arc<Request>) -> Self {
        let common = CommonContext::new(Arc::clone(&request));
        match &request.payload {
            RequestPayload::GeneralIndex {
                indices,
            } => Self::GeneralIndex(GeneralIndexContext {
                common,
                filtered_indices: indices.iter().cloned().collect(),
                all_allowed_indices: BTreeSet::new(),
            }),
            RequestPayload::MultiIndex {
                packs,
            } => Self::MultiIndex(MultiIndexContext {
                common,
                index_packs: packs
                    .iter()
                    .map(|pack| Indices::Found(pack.iter().cloned().collect()))
                    .collect(),
            }),
            RequestPayload::Template {
                operation,
            } => Self::Template(TemplateContext {
                common,
                operation: operation.clone(),
                all_allowed_indices: BTreeSet::new(),
                response_template_filter: None,
            }),
            RequestPayload::Snapshot {
                snapshots,
                repositories,
                indices,
            } => Self::Snapshot(SnapshotContext {
                common,
                snapshots: snapshots.iter().cloned().collect(),
                repositories: repositories.iter().cloned().collect(),
                filtered_indices: indices.iter().cloned().collect(),
                all_allowed_indices: BTreeSet::new(),
            }),
            RequestPayload::Repository {
                repositories,
            } => Self::Repository(RepositoryContext {
                common,
                repositories: repositories.iter().cloned().collect(),
            }),
            RequestPayload::CurrentUserMetadata => Self::CurrentUserMetadata(GeneralContext {
                common,
            }),
            RequestPayload::General => Self::General(GeneralContext {
                common,
            }),
        }
    }

    /// Returns the shared state.
    #[must_use]
    pub fn common(&self) -> &CommonContext {
        match self {
            Self::GeneralIndex(ctx) => &ctx.common,
            Self::MultiIndex(ctx) => &ctx.common,
            Self::Template(ctx) => &ctx.common,
            Self::Snapshot(ctx) => &ctx.common,
            Self::Repository(ctx) => &ctx.common,
            Self::CurrentUserMetadata(ctx) | Self::General(ctx) => &ctx.common,
        }
    }

    /// Returns the shared state for rewriting.
    pub fn common_mut(&mut self) -> &mut CommonContext {
        match self {
            Self::GeneralIndex(ctx) => &mut ctx.common,
            Self::MultiIndex(ctx) => &mut ctx.common,
            Self::Template(ctx) => &mut ctx.common,
            Self::Snapshot(ctx) => &mut ctx.common,
            Self::Repository(ctx) => &mut ctx.common,
            Self::CurrentUserMetadata(ctx) | Self::General(ctx) => &mut ctx.common,
        }
    }

    /// Returns the immutable request handle.
    #[must_use]
    pub fn request(&self) -> &Arc<Request> {
        &self.common().request
    }

    /// Returns a short label for history records.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::GeneralIndex(_) => "general_index",
            Self::MultiIndex(_) => "multi_index",
            Self::Template(_) => "template",
            Self::Snapshot(_) => "snapshot",
            Self::Repository(_) => "repository",
            Self::CurrentUserMetadata(_) => "current_user_metadata",
            Self::General(_) => "general",
        }
    }
}
