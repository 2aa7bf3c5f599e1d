// index-gate-core/src/runtime/rules/groups.rs
// ============================================================================
// Module: Index Gate Groups Rule
// Description: Group membership authorization.
// Purpose: Constrain authenticated callers to configured tenancy groups.
// Dependencies: crate::{core, runtime::rules, runtime::variables}
// ============================================================================

//! ## Overview
//! The groups rule runs after authentication and intersects the configured
//! group set (which may contain variables) with the groups the auth backend
//! attributed to the caller. A non-empty intersection fulfils the rule,
//! narrows `available_groups`, and pins `current_group` to a member of the
//! intersection, preferring the group the caller already selected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;

use crate::core::context::BlockContext;
use crate::core::names::GroupName;
use crate::runtime::rules::EvalServices;
use crate::runtime::rules::Rule;
use crate::runtime::rules::RuleCreationError;
use crate::runtime::rules::RuleKind;
use crate::runtime::rules::RuleOrdinal;
use crate::runtime::rules::RuleResult;
use crate::runtime::variables::ResolutionContext;
use crate::runtime::variables::ResolvableSet;

// ============================================================================
// SECTION: Groups Rule
// ============================================================================

/// Authorization rule over tenancy groups.
///
/// # Invariants
/// - The configured set is non-empty.
#[derive(Debug, Clone)]
pub struct GroupsRule {
    /// Configured group set, possibly variable.
    groups: ResolvableSet,
}

impl GroupsRule {
    /// Builds the rule from configured group definitions.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCreationError`] when the set is empty or a definition
    /// fails to compile.
    pub fn new(groups: &[String]) -> Result<Self, RuleCreationError> {
        if groups.is_empty() {
            return Err(RuleCreationError::Invalid(
                "groups rule requires at least one group".to_string(),
            ));
        }
        Ok(Self {
            groups: ResolvableSet::from_raw(groups)?,
        })
    }

    /// Returns the configured set for validation.
    #[must_use]
    pub const fn configured(&self) -> &ResolvableSet {
        &self.groups
    }
}

#[async_trait]
impl Rule for GroupsRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Groups
    }

    fn ordinal(&self) -> RuleOrdinal {
        RuleOrdinal::Authorization
    }

    async fn check(&self, mut context: BlockContext, services: &EvalServices) -> RuleResult {
        if context.common().user.logged_user.is_none() {
            return RuleResult::rejected_silently();
        }

        let resolved = {
            let resolution = ResolutionContext::from_block(&context, services.env.as_ref());
            match self.groups.resolve(&resolution) {
                Ok(values) => values,
                Err(_) => return RuleResult::rejected_silently(),
            }
        };
        let configured: Vec<GroupName> = resolved.into_iter().map(GroupName::new).collect();

        let available = context.common().user.available_groups.clone();
        let permitted: Vec<GroupName> =
            available.into_iter().filter(|group| configured.contains(group)).collect();
        if permitted.is_empty() {
            return RuleResult::rejected_silently();
        }

        let common = context.common_mut();
        let current = common
            .user
            .current_group
            .clone()
            .filter(|group| permitted.contains(group))
            .or_else(|| permitted.first().cloned());
        common.user.available_groups = permitted;
        common.user.current_group = current;
        RuleResult::fulfilled(context)
    }
}
