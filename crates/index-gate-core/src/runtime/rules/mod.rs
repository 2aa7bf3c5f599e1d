// index-gate-core/src/runtime/rules/mod.rs
// ============================================================================
// Module: Index Gate Rules
// Description: The rule seam and the shared rule vocabulary.
// Purpose: Define rule kinds, ordinals, outcomes, and evaluation services.
// Dependencies: crate::{core, interfaces, runtime}, async-trait
// ============================================================================

//! ## Overview
//! A rule is a predicate-with-rewrite on the block context: `check` receives
//! the accumulated context and returns either a fulfilled context (possibly
//! narrowed) or a rejection with an optional structured cause. Rules never
//! throw for recoverable conditions; causes are values. Ordering within a
//! block is fixed by ordinal: authentication, then authorization, then
//! variable-free resource rules, then resource rules using variables, then
//! filter, field, and response enhancements. Declaration order is preserved
//! within one ordinal.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod auth;
pub mod filter;
pub mod groups;
pub mod indices;
pub mod kibana;
pub mod repositories;
pub mod snapshots;
pub mod templates;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::core::context::BlockContext;
use crate::interfaces::AuthBackend;
use crate::interfaces::EnvVarProvider;
use crate::interfaces::IdGenerator;
use crate::runtime::facade::ClusterStateFacade;

// ============================================================================
// SECTION: Creation Errors
// ============================================================================

/// Errors raised while building a rule from configuration.
///
/// # Invariants
/// - Variants are stable for programmatic handling; validation is fail
///   closed and happens before any request is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleCreationError {
    /// The rule definition was syntactically or semantically invalid.
    #[error("invalid rule definition: {0}")]
    Invalid(String),
    /// The resolved configured set matches every resource.
    #[error("configured set for {rule} matches all resources and is redundant")]
    MatchesAllRedundant {
        /// Rule label.
        rule: &'static str,
    },
    /// A variable definition failed to compile.
    #[error(transparent)]
    Variable(#[from] crate::runtime::variables::VariableCreationError),
    /// A configured name failed to parse.
    #[error(transparent)]
    Name(#[from] crate::core::names::NameError),
}

// ============================================================================
// SECTION: Reject Causes
// ============================================================================

/// Structured causes attached to rule rejections.
///
/// # Invariants
/// - Variants are stable for serialization and outcome aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectCause {
    /// A requested index was not visible to the caller.
    IndexNotFound,
    /// A requested template was not visible to the caller.
    TemplateNotFound,
    /// The operation is not allowed for the caller.
    OperationNotAllowed,
    /// Impersonation was requested but not allowed.
    ImpersonationNotAllowed,
    /// Impersonation is not supported by the rule.
    ImpersonationNotSupported,
}

// ============================================================================
// SECTION: Rule Kinds and Ordinals
// ============================================================================

/// Rule kind labels used in history and diagnostics.
///
/// # Invariants
/// - Variants are stable for serialization and audit matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Basic credential comparison.
    AuthKey,
    /// Trusted proxy-header identity.
    ProxyAuth,
    /// JWT verification through the auth backend.
    JwtAuth,
    /// Group membership authorization.
    Groups,
    /// Index narrowing.
    Indices,
    /// Snapshot narrowing.
    Snapshots,
    /// Repository narrowing.
    Repositories,
    /// Kibana access enforcement.
    KibanaAccess,
    /// Kibana application hiding.
    KibanaHideApps,
    /// Search filter injection.
    Filter,
    /// Field-level security.
    Fields,
}

impl RuleKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthKey => "auth_key",
            Self::ProxyAuth => "proxy_auth",
            Self::JwtAuth => "jwt_auth",
            Self::Groups => "groups",
            Self::Indices => "indices",
            Self::Snapshots => "snapshots",
            Self::Repositories => "repositories",
            Self::KibanaAccess => "kibana_access",
            Self::KibanaHideApps => "kibana_hide_apps",
            Self::Filter => "filter",
            Self::Fields => "fields",
        }
    }
}

/// Evaluation phase assigned to each rule within a block.
///
/// # Invariants
/// - Ordering follows declaration order of the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleOrdinal {
    /// Rules establishing the caller's identity.
    Authentication,
    /// Rules checking what the identity may do.
    Authorization,
    /// Resource rules with a concrete configured set.
    Resource,
    /// Resource rules whose configured set resolves per request.
    ResourceWithVariables,
    /// Filter, field, and response enhancements.
    Enhancement,
}

// ============================================================================
// SECTION: Rule Outcome
// ============================================================================

/// Outcome of one rule evaluation.
#[derive(Debug)]
pub enum RuleResult {
    /// The rule accepted the request; the returned context replaces the
    /// current one.
    Fulfilled(Box<BlockContext>),
    /// The rule rejected the request; the block is abandoned.
    Rejected(Option<RejectCause>),
}

impl RuleResult {
    /// Wraps a fulfilled context.
    #[must_use]
    pub fn fulfilled(context: BlockContext) -> Self {
        Self::Fulfilled(Box::new(context))
    }

    /// Builds a rejection with a structured cause.
    #[must_use]
    pub const fn rejected(cause: RejectCause) -> Self {
        Self::Rejected(Some(cause))
    }

    /// Builds a rejection without a cause.
    #[must_use]
    pub const fn rejected_silently() -> Self {
        Self::Rejected(None)
    }
}

// ============================================================================
// SECTION: Evaluation Services
// ============================================================================

/// Collaborator handles available to rules during evaluation.
///
/// # Invariants
/// - Handles are immutable for the lifetime of one decision; hot reload swaps
///   the owning engine, never the services mid-flight.
#[derive(Clone)]
pub struct EvalServices {
    /// Cached cluster metadata access.
    pub cluster: Arc<ClusterStateFacade>,
    /// Authentication backend.
    pub auth: Arc<dyn AuthBackend>,
    /// Process environment access.
    pub env: Arc<dyn EnvVarProvider>,
    /// Identifier generator for delete sentinels.
    pub ids: Arc<dyn IdGenerator>,
}

// ============================================================================
// SECTION: Rule Seam
// ============================================================================

/// A predicate-with-rewrite evaluated against the block context.
#[async_trait]
pub trait Rule: Send + Sync {
    /// Returns the rule kind for history records.
    fn kind(&self) -> RuleKind;

    /// Returns the evaluation phase of this instance.
    fn ordinal(&self) -> RuleOrdinal;

    /// Evaluates the rule against the accumulated context.
    async fn check(&self, context: BlockContext, services: &EvalServices) -> RuleResult;
}
