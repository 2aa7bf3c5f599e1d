// index-gate-core/src/runtime/rules/filter.rs
// ============================================================================
// Module: Index Gate Filter and Fields Rules
// Description: Query filter injection and field-level security.
// Purpose: Record response-shaping rewrites on the block context.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! The filter rule stores a query fragment the host adapter injects into
//! searches so the caller only sees matching documents; the fields rule
//! stores a field-level security restriction applied to response documents.
//! Both run last within a block and reject only when a referenced variable
//! cannot be resolved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::core::context::BlockContext;
use crate::core::context::FieldMode;
use crate::core::context::FieldRestrictions;
use crate::core::context::FilterQuery;
use crate::runtime::rules::EvalServices;
use crate::runtime::rules::Rule;
use crate::runtime::rules::RuleCreationError;
use crate::runtime::rules::RuleKind;
use crate::runtime::rules::RuleOrdinal;
use crate::runtime::rules::RuleResult;
use crate::runtime::rules::auth::resolve_single;
use crate::runtime::variables::SingleVariable;

// ============================================================================
// SECTION: Filter Rule
// ============================================================================

/// Injects a document-level filter into searches.
#[derive(Debug, Clone)]
pub struct FilterRule {
    /// Query fragment, possibly variable.
    query: SingleVariable,
}

impl FilterRule {
    /// Builds the rule from a query fragment definition.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCreationError`] when the definition fails to compile.
    pub fn new(query: &str) -> Result<Self, RuleCreationError> {
        if query.is_empty() {
            return Err(RuleCreationError::Invalid("filter query cannot be empty".to_string()));
        }
        Ok(Self {
            query: SingleVariable::parse(query)?,
        })
    }

    /// Returns the configured definition for validation.
    #[must_use]
    pub const fn configured(&self) -> &SingleVariable {
        &self.query
    }
}

#[async_trait]
impl Rule for FilterRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Filter
    }

    fn ordinal(&self) -> RuleOrdinal {
        RuleOrdinal::Enhancement
    }

    async fn check(&self, mut context: BlockContext, services: &EvalServices) -> RuleResult {
        let Some(resolved) = resolve_single(&self.query, &context, services.env.as_ref()) else {
            return RuleResult::rejected_silently();
        };
        context.common_mut().filter = Some(FilterQuery::new(resolved));
        RuleResult::fulfilled(context)
    }
}

// ============================================================================
// SECTION: Fields Rule
// ============================================================================

/// Restricts the document fields surfaced to the caller.
///
/// # Invariants
/// - All configured entries share one polarity: either plain names
///   (whitelist) or `~`-prefixed names (blacklist).
#[derive(Debug, Clone)]
pub struct FieldsRule {
    /// Restriction recorded on fulfilment.
    restriction: FieldRestrictions,
}

impl FieldsRule {
    /// Builds the rule from field entries.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCreationError::Invalid`] when the list is empty or
    /// mixes negated and plain entries.
    pub fn new(fields: &[String]) -> Result<Self, RuleCreationError> {
        if fields.is_empty() {
            return Err(RuleCreationError::Invalid(
                "fields rule requires at least one field".to_string(),
            ));
        }
        let negated = fields.iter().filter(|field| field.starts_with('~')).count();
        let mode = if negated == fields.len() {
            FieldMode::Blacklist
        } else if negated == 0 {
            FieldMode::Whitelist
        } else {
            return Err(RuleCreationError::Invalid(
                "fields rule cannot mix negated and plain fields".to_string(),
            ));
        };
        let names: BTreeSet<String> =
            fields.iter().map(|field| field.trim_start_matches('~').to_string()).collect();
        if names.iter().any(String::is_empty) {
            return Err(RuleCreationError::Invalid("field names cannot be empty".to_string()));
        }
        Ok(Self {
            restriction: FieldRestrictions {
                mode,
                fields: names,
            },
        })
    }
}

#[async_trait]
impl Rule for FieldsRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Fields
    }

    fn ordinal(&self) -> RuleOrdinal {
        RuleOrdinal::Enhancement
    }

    async fn check(&self, mut context: BlockContext, _services: &EvalServices) -> RuleResult {
        context.common_mut().fields = Some(self.restriction.clone());
        RuleResult::fulfilled(context)
    }
}
