// index-gate-core/src/runtime/rules/templates.rs
// ============================================================================
// Module: Index Gate Template Narrowing
// Description: Multi-tenant-safe template get, add, and delete handling.
// Purpose: Keep template entries from leaking patterns across tenants.
// Dependencies: crate::{core, runtime}, glob-logic, tracing
// ============================================================================

//! ## Overview
//! Templates are multi-tenant by nature: their patterns apply cluster-wide.
//! The narrowing logic guarantees a tenant can neither observe nor create
//! template entries touching indices or aliases outside its admitted
//! namespace. Gets rewrite surviving templates to their allowed patterns and
//! aliases and narrow the outbound selector list; adds require every pattern
//! and alias to be a subset of the allowed set (and, when overwriting, the
//! existing template too); deletes rewrite selectors matching nothing
//! admissible to unmatchable sentinels and refuse to touch templates that are
//! visible to other tenants.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use tracing::warn;

use crate::core::context::BlockContext;
use crate::core::context::TemplateContext;
use crate::core::context::TemplateTransformation;
use crate::core::metadata::INDEX_ALIAS_PLACEHOLDER;
use crate::core::metadata::Template;
use crate::core::metadata::TemplateCatalog;
use crate::core::metadata::TemplateOperation;
use crate::core::metadata::expand_alias;
use crate::core::names::AliasName;
use crate::core::names::NamePattern;
use crate::core::names::TemplateNamePattern;
use crate::runtime::matcher::IndicesMatcher;
use crate::runtime::matcher::PatternSet;
use crate::runtime::rules::EvalServices;
use crate::runtime::rules::RejectCause;
use crate::runtime::rules::RuleResult;

// ============================================================================
// SECTION: Subset Tests
// ============================================================================

/// Returns the template patterns that are subsets of the allowed set.
fn patterns_allowed(template: &Template, allowed: &PatternSet) -> Vec<NamePattern> {
    template
        .patterns()
        .iter()
        .filter(|pattern| allowed.covers(pattern))
        .cloned()
        .collect()
}

/// Tests one alias against the allowed set.
///
/// Placeholder aliases expand against every allowed pattern of the template;
/// each expansion must stay inside the allowed set.
fn alias_allowed(
    alias: &AliasName,
    allowed_patterns: &[NamePattern],
    allowed: &PatternSet,
) -> bool {
    if allowed.matches_all() {
        return true;
    }
    if alias.as_str().contains(INDEX_ALIAS_PLACEHOLDER) {
        if allowed_patterns.is_empty() {
            return false;
        }
        return allowed_patterns.iter().all(|pattern| {
            expand_alias(alias, pattern)
                .map_or(false, |expanded| allowed.covers(&expanded))
        });
    }
    NamePattern::parse(alias.as_str()).map_or(false, |parsed| allowed.covers(&parsed))
}

/// Returns the template aliases that are subsets of the allowed set.
fn aliases_allowed(
    template: &Template,
    allowed_patterns: &[NamePattern],
    allowed: &PatternSet,
) -> BTreeSet<AliasName> {
    template
        .aliases()
        .iter()
        .filter(|alias| alias_allowed(alias, allowed_patterns, allowed))
        .cloned()
        .collect()
}

/// Tests whether an existing template lies entirely inside the allowed set.
fn fully_allowed(template: &Template, allowed: &PatternSet) -> bool {
    if allowed.matches_all() {
        return true;
    }
    let allowed_patterns = patterns_allowed(template, allowed);
    if allowed_patterns.len() != template.patterns().len() {
        return false;
    }
    aliases_allowed(template, &allowed_patterns, allowed).len() == template.aliases().len()
}

/// Decides whether a template survives a get under the allowed set.
fn survives_get(template: &Template, allowed: &PatternSet) -> bool {
    if allowed.matches_all() {
        return true;
    }
    match template {
        Template::Component {
            ..
        } => {
            // Component templates carry no patterns; only the alias clause applies.
            aliases_allowed(template, &[], allowed).len() == template.aliases().len()
        }
        Template::Legacy {
            ..
        }
        | Template::Index {
            ..
        } => !patterns_allowed(template, allowed).is_empty(),
    }
}

// ============================================================================
// SECTION: Response Transformation
// ============================================================================

impl TemplateTransformation {
    /// Rewrites a template response to the caller's allowed view.
    ///
    /// Surviving templates keep only their allowed patterns and aliases;
    /// templates outside the allowed set disappear from the response.
    #[must_use]
    pub fn apply(&self, templates: &[Template]) -> Vec<Template> {
        let allowed = PatternSet::new(self.allowed.clone());
        templates
            .iter()
            .filter(|template| survives_get(template, &allowed))
            .map(|template| {
                if allowed.matches_all() {
                    return (*template).clone();
                }
                let kept_patterns = patterns_allowed(template, &allowed);
                let kept_aliases = aliases_allowed(template, &kept_patterns, &allowed);
                match template {
                    Template::Legacy {
                        name, ..
                    } => Template::Legacy {
                        name: name.clone(),
                        patterns: kept_patterns,
                        aliases: kept_aliases,
                    },
                    Template::Index {
                        name, ..
                    } => Template::Index {
                        name: name.clone(),
                        patterns: kept_patterns,
                        aliases: kept_aliases,
                    },
                    Template::Component {
                        name, ..
                    } => Template::Component {
                        name: name.clone(),
                        aliases: kept_aliases,
                    },
                }
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Template Check Entry Point
// ============================================================================

/// Evaluates a template operation under the resolved indices rule.
pub(crate) async fn check_template(
    mut ctx: TemplateContext,
    matcher: &IndicesMatcher,
    services: &EvalServices,
) -> RuleResult {
    let allowed = matcher.local().clone();

    let catalog = match services.cluster.templates().await {
        Ok(catalog) => catalog,
        Err(error) => {
            warn!(error = %error, "template catalog lookup failed");
            return RuleResult::rejected(RejectCause::OperationNotAllowed);
        }
    };
    match services.cluster.local_indices().await {
        Ok(universe) => ctx.all_allowed_indices = matcher.all_allowed(&universe),
        Err(error) => {
            warn!(error = %error, "local indices lookup failed");
            return RuleResult::rejected(RejectCause::OperationNotAllowed);
        }
    }

    let operation = ctx.operation.clone();
    match operation {
        TemplateOperation::GetLegacy(requested) => {
            check_get(ctx, &allowed, requested, &catalog.legacy, TemplateOperation::GetLegacy)
        }
        TemplateOperation::GetIndex(requested) => {
            check_get(ctx, &allowed, requested, &catalog.index, TemplateOperation::GetIndex)
        }
        TemplateOperation::GetLegacyAndIndex(requested) => {
            let combined: Vec<Template> =
                catalog.legacy.iter().chain(catalog.index.iter()).cloned().collect();
            check_get(ctx, &allowed, requested, &combined, TemplateOperation::GetLegacyAndIndex)
        }
        TemplateOperation::GetComponent(requested) => {
            check_get(ctx, &allowed, requested, &catalog.component, TemplateOperation::GetComponent)
        }
        TemplateOperation::AddLegacy {
            name,
            patterns,
            aliases,
        } => check_add(ctx, &allowed, &catalog, &name, &patterns, &aliases, false),
        TemplateOperation::AddIndex {
            name,
            patterns,
            aliases,
        } => check_add(ctx, &allowed, &catalog, &name, &patterns, &aliases, false),
        TemplateOperation::AddIndexAndGetAllowed {
            name,
            patterns,
            aliases,
        } => check_add(ctx, &allowed, &catalog, &name, &patterns, &aliases, true),
        TemplateOperation::AddComponent {
            name,
            aliases,
        } => check_add(ctx, &allowed, &catalog, &name, &[], &aliases, false),
        TemplateOperation::DeleteLegacy(requested) => {
            check_delete(ctx, &allowed, requested, &catalog.legacy, services, TemplateOperation::DeleteLegacy)
        }
        TemplateOperation::DeleteIndex(requested) => {
            check_delete(ctx, &allowed, requested, &catalog.index, services, TemplateOperation::DeleteIndex)
        }
        TemplateOperation::DeleteComponent(requested) => check_delete(
            ctx,
            &allowed,
            requested,
            &catalog.component,
            services,
            TemplateOperation::DeleteComponent,
        ),
    }
}

// ============================================================================
// SECTION: Get Operations
// ============================================================================

/// Narrows a get operation to surviving templates.
fn check_get(
    mut ctx: TemplateContext,
    allowed: &PatternSet,
    requested: Vec<TemplateNamePattern>,
    existing: &[Template],
    rebuild: fn(Vec<TemplateNamePattern>) -> TemplateOperation,
) -> RuleResult {
    let survivors: Vec<&Template> = existing
        .iter()
        .filter(|template| {
            requested.iter().any(|selector| selector.matches(template.name()))
        })
        .filter(|template| survives_get(template, allowed))
        .collect();

    if survivors.is_empty() {
        return RuleResult::rejected(RejectCause::TemplateNotFound);
    }

    // The outbound fetch names the surviving templates directly, so the
    // cluster never enumerates entries the caller may not observe.
    let mut seen = BTreeSet::new();
    let narrowed: Vec<TemplateNamePattern> = survivors
        .iter()
        .filter(|template| seen.insert(template.name().to_string()))
        .map(|template| TemplateNamePattern::new(NamePattern::Full(template.name().to_string())))
        .collect();

    ctx.operation = rebuild(narrowed);
    ctx.response_template_filter = Some(TemplateTransformation {
        allowed: allowed.patterns().to_vec(),
    });
    RuleResult::fulfilled(BlockContext::Template(ctx))
}

// ============================================================================
// SECTION: Add Operations
// ============================================================================

/// Validates an add operation against the allowed set.
fn check_add(
    mut ctx: TemplateContext,
    allowed: &PatternSet,
    catalog: &TemplateCatalog,
    name: &str,
    patterns: &[NamePattern],
    aliases: &BTreeSet<AliasName>,
    narrow_response: bool,
) -> RuleResult {
    if !allowed.matches_all() {
        if !patterns.iter().all(|pattern| allowed.covers(pattern)) {
            return RuleResult::rejected(RejectCause::OperationNotAllowed);
        }
        // Placeholder aliases are safe here: their expansions are subsets of
        // the template's own patterns, which were just checked against the
        // allowed set. Component templates carry no patterns, so their
        // placeholder aliases cannot be bounded and fail the test.
        let ok = aliases.iter().all(|alias| {
            if alias.as_str().contains(INDEX_ALIAS_PLACEHOLDER) {
                return !patterns.is_empty();
            }
            alias_allowed(alias, patterns, allowed)
        });
        if !ok {
            return RuleResult::rejected(RejectCause::OperationNotAllowed);
        }
    }

    // Overwriting a template visible to other tenants would hijack it.
    let existing = catalog
        .legacy
        .iter()
        .chain(catalog.index.iter())
        .chain(catalog.component.iter())
        .find(|template| template.name() == name);
    if let Some(current) = existing {
        if !fully_allowed(current, allowed) {
            return RuleResult::rejected(RejectCause::OperationNotAllowed);
        }
    }

    if narrow_response {
        ctx.response_template_filter = Some(TemplateTransformation {
            allowed: allowed.patterns().to_vec(),
        });
    }
    RuleResult::fulfilled(BlockContext::Template(ctx))
}

// ============================================================================
// SECTION: Delete Operations
// ============================================================================

/// Validates a delete operation, rewriting unmatched selectors to sentinels.
fn check_delete(
    mut ctx: TemplateContext,
    allowed: &PatternSet,
    requested: Vec<TemplateNamePattern>,
    existing: &[Template],
    services: &EvalServices,
    rebuild: fn(Vec<TemplateNamePattern>) -> TemplateOperation,
) -> RuleResult {
    let mut rewritten = Vec::with_capacity(requested.len());
    for selector in requested {
        let matched: Vec<&Template> =
            existing.iter().filter(|template| selector.matches(template.name())).collect();
        if matched.is_empty() {
            rewritten.push(sentinel(&selector, services));
            continue;
        }
        if !matched.iter().all(|template| fully_allowed(template, allowed)) {
            return RuleResult::rejected(RejectCause::OperationNotAllowed);
        }
        rewritten.push(selector);
    }

    ctx.operation = rebuild(rewritten);
    RuleResult::fulfilled(BlockContext::Template(ctx))
}

/// Rewrites a selector so the downstream delete cannot match anything.
fn sentinel(selector: &TemplateNamePattern, services: &EvalServices) -> TemplateNamePattern {
    let suffix = services.ids.generate();
    let text = format!("{}_ROR_{suffix}", selector.pattern().as_str());
    NamePattern::parse(&text).map_or_else(|_| selector.clone(), TemplateNamePattern::new)
}
