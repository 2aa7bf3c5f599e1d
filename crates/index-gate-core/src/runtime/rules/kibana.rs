// index-gate-core/src/runtime/rules/kibana.rs
// ============================================================================
// Module: Index Gate Kibana Rules
// Description: Kibana access enforcement and application hiding.
// Purpose: Gate kibana traffic by access level and rewrite the kibana index.
// Dependencies: crate::{core, runtime}, glob-logic, tracing
// ============================================================================

//! ## Overview
//! The kibana access rule classifies the request action into read-only,
//! cluster, read-write, and admin classes and decides per access level:
//! `unrestricted` allows everything, `ro_strict` allows only reads, `ro` adds
//! cluster actions, `rw` additionally allows writes that target the tenant's
//! kibana index (including the small set of write URI shapes Kibana issues
//! against its own index), and `admin` adds the administrative actions. The
//! engine's own management actions require `admin` or `unrestricted`. On
//! fulfilment the rule records the access level and, when a custom kibana
//! index is configured, replaces the resolved kibana index on the user
//! metadata.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use async_trait::async_trait;
use glob_logic::GlobPattern;
use tracing::debug;

use crate::core::context::BlockContext;
use crate::core::context::Indices;
use crate::core::names::IndexName;
use crate::core::names::KibanaApp;
use crate::core::names::NamePattern;
use crate::core::user::KibanaAccess;
use crate::runtime::rules::EvalServices;
use crate::runtime::rules::RejectCause;
use crate::runtime::rules::Rule;
use crate::runtime::rules::RuleCreationError;
use crate::runtime::rules::RuleKind;
use crate::runtime::rules::RuleOrdinal;
use crate::runtime::rules::RuleResult;
use crate::runtime::rules::auth::resolve_single;
use crate::runtime::variables::SingleVariable;

/// Default kibana state index.
pub const DEFAULT_KIBANA_INDEX: &str = ".kibana";

/// Default configuration index owned by the engine host.
pub const DEFAULT_CONFIG_INDEX: &str = ".index_gate";

// ============================================================================
// SECTION: Action Classes
// ============================================================================

/// Read-only action patterns.
const RO_ACTIONS: &[&str] = &[
    "indices:admin/exists",
    "indices:admin/mappings/fields/get*",
    "indices:admin/mappings/get*",
    "indices:admin/validate/query",
    "indices:admin/get*",
    "indices:admin/refresh*",
    "indices:data/read/*",
];

/// Cluster-level action patterns tolerated outside strict read-only.
const CLUSTER_ACTIONS: &[&str] =
    &["cluster:monitor/*", "cluster:*/xpack/*", "indices:admin/template/get*"];

/// Read-write action patterns.
const RW_ACTIONS: &[&str] = &[
    "indices:admin/create",
    "indices:admin/create_index",
    "indices:admin/mapping/put",
    "indices:admin/settings/update",
    "indices:admin/template/*",
    "indices:data/write/delete*",
    "indices:data/write/index",
    "indices:data/write/update*",
    "indices:data/write/bulk*",
];

/// Administrative action patterns.
const ADMIN_ACTIONS: &[&str] =
    &["cluster:admin/rradmin/*", "indices:data/write/*", "indices:admin/create"];

/// Engine-owned management actions.
const ENGINE_ACTIONS: &[&str] = &[
    "cluster:ror/user_metadata",
    "cluster:ror/config/get",
    "cluster:ror/config/update",
    "cluster:ror/audit_event",
];

/// Write URI segments Kibana issues against its own index.
const KIBANA_WRITE_SEGMENTS: &[&str] =
    &["doc", "_create", "_update", "_doc", "url", "index-pattern", "config"];

/// Tests an action against a pattern class.
fn action_in(class: &[&str], action: &str) -> bool {
    class.iter().any(|pattern| {
        GlobPattern::parse(*pattern).map_or(false, |glob| glob.matches(action))
    })
}

// ============================================================================
// SECTION: Kibana Access Rule
// ============================================================================

/// Kibana access enforcement rule.
#[derive(Debug, Clone)]
pub struct KibanaAccessRule {
    /// Granted access level.
    access: KibanaAccess,
    /// Custom kibana index, possibly variable.
    kibana_index: Option<SingleVariable>,
    /// Engine configuration index name.
    config_index: String,
}

impl KibanaAccessRule {
    /// Builds the rule from an access level and optional index overrides.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCreationError`] when the kibana index definition fails
    /// to compile.
    pub fn new(
        access: KibanaAccess,
        kibana_index: Option<&str>,
        config_index: Option<&str>,
    ) -> Result<Self, RuleCreationError> {
        let kibana_index = kibana_index.map(SingleVariable::parse).transpose()?;
        Ok(Self {
            access,
            kibana_index,
            config_index: config_index.unwrap_or(DEFAULT_CONFIG_INDEX).to_string(),
        })
    }

    /// Returns the configured kibana index definition.
    #[must_use]
    pub const fn kibana_index(&self) -> Option<&SingleVariable> {
        self.kibana_index.as_ref()
    }

    /// Decides one action under the configured access level.
    fn decide(&self, action: &str, uri_path: &str, requested: &BTreeSet<IndexName>, kibana_index: &str) -> bool {
        if matches!(self.access, KibanaAccess::Unrestricted) {
            return true;
        }
        if action_in(ENGINE_ACTIONS, action) {
            return matches!(self.access, KibanaAccess::Admin);
        }
        if action_in(RO_ACTIONS, action) {
            return true;
        }
        if action_in(CLUSTER_ACTIONS, action) {
            return !matches!(self.access, KibanaAccess::RoStrict);
        }
        let rw_allowed = matches!(self.access, KibanaAccess::Rw | KibanaAccess::Admin);
        if action_in(RW_ACTIONS, action) {
            if !rw_allowed {
                return false;
            }
            return self.targets_kibana_index(requested, kibana_index)
                || kibana_write_uri(uri_path, kibana_index);
        }
        if action_in(ADMIN_ACTIONS, action) {
            return matches!(self.access, KibanaAccess::Admin);
        }
        false
    }

    /// Tests whether every requested index is the kibana index (or, for
    /// admin access, the engine configuration index).
    fn targets_kibana_index(&self, requested: &BTreeSet<IndexName>, kibana_index: &str) -> bool {
        if requested.is_empty() {
            return false;
        }
        requested.iter().all(|name| match name {
            IndexName::Local(NamePattern::Full(text)) => {
                text == kibana_index
                    || (matches!(self.access, KibanaAccess::Admin) && *text == self.config_index)
            }
            _ => false,
        })
    }
}

/// Detects the write URI shapes Kibana issues against its own index.
fn kibana_write_uri(uri_path: &str, kibana_index: &str) -> bool {
    if uri_path.starts_with("/_template/kibana_index_template") {
        return true;
    }
    let mut segments = uri_path.trim_start_matches('/').split('/');
    let Some(first) = segments.next() else {
        return false;
    };
    if first != kibana_index {
        return false;
    }
    segments.next().is_some_and(|segment| KIBANA_WRITE_SEGMENTS.contains(&segment))
}

/// Collects the currently requested index view of the context.
fn requested_indices(context: &BlockContext) -> BTreeSet<IndexName> {
    match context {
        BlockContext::GeneralIndex(ctx) => ctx.filtered_indices.clone(),
        BlockContext::MultiIndex(ctx) => ctx
            .index_packs
            .iter()
            .filter_map(|pack| match pack {
                Indices::Found(set) => Some(set.iter().cloned()),
                Indices::NotFound => None,
            })
            .flatten()
            .collect(),
        BlockContext::Snapshot(ctx) => ctx.filtered_indices.clone(),
        _ => BTreeSet::new(),
    }
}

#[async_trait]
impl Rule for KibanaAccessRule {
    fn kind(&self) -> RuleKind {
        RuleKind::KibanaAccess
    }

    fn ordinal(&self) -> RuleOrdinal {
        if self.kibana_index.as_ref().is_some_and(SingleVariable::uses_variables) {
            RuleOrdinal::ResourceWithVariables
        } else {
            RuleOrdinal::Resource
        }
    }

    async fn check(&self, mut context: BlockContext, services: &EvalServices) -> RuleResult {
        let resolved_index = match &self.kibana_index {
            Some(variable) => {
                let Some(resolved) = resolve_single(variable, &context, services.env.as_ref())
                else {
                    return RuleResult::rejected_silently();
                };
                Some(resolved)
            }
            None => None,
        };
        let kibana_index =
            resolved_index.clone().unwrap_or_else(|| DEFAULT_KIBANA_INDEX.to_string());

        let request = context.request().clone();
        let requested = requested_indices(&context);
        let allowed =
            self.decide(request.action.as_str(), &request.uri_path, &requested, &kibana_index);
        if !allowed {
            debug!(action = %request.action, access = ?self.access, "kibana access denied");
            return RuleResult::rejected(RejectCause::OperationNotAllowed);
        }

        let common = context.common_mut();
        common.user.kibana_access = Some(self.access);
        if resolved_index.is_some() {
            common.user.found_kibana_index = Some(kibana_index);
        }
        RuleResult::fulfilled(context)
    }
}

// ============================================================================
// SECTION: Hide Apps Rule
// ============================================================================

/// Records the kibana applications hidden from the caller.
///
/// # Invariants
/// - Never rejects; pure metadata enhancement.
#[derive(Debug, Clone)]
pub struct KibanaHideAppsRule {
    /// Applications to hide.
    apps: BTreeSet<KibanaApp>,
}

impl KibanaHideAppsRule {
    /// Builds the rule from application identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCreationError::Invalid`] when the list is empty.
    pub fn new(apps: &[String]) -> Result<Self, RuleCreationError> {
        if apps.is_empty() {
            return Err(RuleCreationError::Invalid(
                "kibana_hide_apps requires at least one application".to_string(),
            ));
        }
        Ok(Self {
            apps: apps.iter().map(KibanaApp::new).collect(),
        })
    }
}

#[async_trait]
impl Rule for KibanaHideAppsRule {
    fn kind(&self) -> RuleKind {
        RuleKind::KibanaHideApps
    }

    fn ordinal(&self) -> RuleOrdinal {
        RuleOrdinal::Enhancement
    }

    async fn check(&self, mut context: BlockContext, _services: &EvalServices) -> RuleResult {
        let rendered =
            self.apps.iter().map(KibanaApp::as_str).collect::<Vec<_>>().join(",");
        let common = context.common_mut();
        common.user.hidden_kibana_apps = self.apps.clone();
        common.response_headers.insert("x-ror-kibana-hidden-apps".to_string(), rendered);
        RuleResult::fulfilled(context)
    }
}
