// index-gate-core/src/core/user.rs
// ============================================================================
// Module: Index Gate User Metadata
// Description: Accumulated identity and tenancy state for a request.
// Purpose: Track the logged user, groups, and kibana state across rules.
// Dependencies: crate::core::names, serde
// ============================================================================

//! ## Overview
//! User metadata is accumulated across rules inside a block context:
//! authentication rules record the logged user and groups, the kibana rules
//! record access level, resolved kibana index, and hidden applications.
//! Each rule returns a new context; the metadata itself is plain data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::names::GroupName;
use crate::core::names::KibanaApp;
use crate::core::names::UserName;

// ============================================================================
// SECTION: Kibana Access
// ============================================================================

/// Kibana access level enforced by the kibana access rule.
///
/// # Invariants
/// - Variants are stable for serialization and config matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KibanaAccess {
    /// Read-only, cluster actions forbidden.
    RoStrict,
    /// Read-only.
    Ro,
    /// Read-write against the kibana index.
    Rw,
    /// Read-write plus administrative actions.
    Admin,
    /// No kibana-level restriction.
    Unrestricted,
}

// ============================================================================
// SECTION: Logged User
// ============================================================================

/// The authenticated identity attached to a request.
///
/// # Invariants
/// - `id` is the identity the decision is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedUser {
    /// Authenticated user identifier.
    pub id: UserName,
}

impl LoggedUser {
    /// Creates a logged user record.
    #[must_use]
    pub fn new(id: impl Into<UserName>) -> Self {
        Self {
            id: id.into(),
        }
    }
}

// ============================================================================
// SECTION: User Metadata
// ============================================================================

/// Identity and tenancy state accumulated across rules.
///
/// # Invariants
/// - `available_groups` preserves insertion order and contains no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Authenticated user, once an authentication rule fulfilled.
    pub logged_user: Option<LoggedUser>,
    /// Currently selected tenancy group.
    pub current_group: Option<GroupName>,
    /// Groups available to the user, ordered.
    pub available_groups: Vec<GroupName>,
    /// Kibana index resolved for the tenant.
    pub found_kibana_index: Option<String>,
    /// Kibana applications hidden from the user.
    pub hidden_kibana_apps: BTreeSet<KibanaApp>,
    /// Kibana access level recorded by the kibana access rule.
    pub kibana_access: Option<KibanaAccess>,
    /// Origin recorded for audit purposes.
    pub user_origin: Option<String>,
    /// Decoded JWT claims payload, when a JWT rule fulfilled.
    pub jwt_payload: Option<serde_json::Value>,
}

impl UserMetadata {
    /// Records the logged user.
    #[must_use]
    pub fn with_logged_user(mut self, user: LoggedUser) -> Self {
        self.logged_user = Some(user);
        self
    }

    /// Records the available groups, deduplicating while preserving order.
    #[must_use]
    pub fn with_available_groups(mut self, groups: impl IntoIterator<Item = GroupName>) -> Self {
        let mut seen = BTreeSet::new();
        self.available_groups =
            groups.into_iter().filter(|group| seen.insert(group.clone())).collect();
        self
    }

    /// Records the current group.
    #[must_use]
    pub fn with_current_group(mut self, group: GroupName) -> Self {
        self.current_group = Some(group);
        self
    }
}
