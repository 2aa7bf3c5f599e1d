// index-gate-core/tests/template_rules.rs
// ============================================================================
// Module: Template Narrowing Tests
// Description: Multi-tenant template get, add, and delete behavior.
// Purpose: Ensure tenants cannot observe or create foreign template entries.
// Dependencies: index-gate-core, tokio
// ============================================================================

//! Behavior tests for template operation narrowing.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use index_gate_core::ActionName;
use index_gate_core::AliasName;
use index_gate_core::BlockContext;
use index_gate_core::NamePattern;
use index_gate_core::RejectCause;
use index_gate_core::Request;
use index_gate_core::RequestPayload;
use index_gate_core::Rule;
use index_gate_core::Template;
use index_gate_core::TemplateCatalog;
use index_gate_core::TemplateContext;
use index_gate_core::TemplateNamePattern;
use index_gate_core::TemplateOperation;
use index_gate_core::runtime::RuleResult;
use index_gate_core::runtime::rules::indices::IndicesRule;

mod common;

use common::StaticAuth;
use common::StubCluster;

type TestResult = Result<(), String>;

fn name_patterns(raw: &[&str]) -> Result<Vec<NamePattern>, String> {
    raw.iter().map(|text| NamePattern::parse(text).map_err(|err| err.to_string())).collect()
}

fn selectors(raw: &[&str]) -> Result<Vec<TemplateNamePattern>, String> {
    raw.iter()
        .map(|text| TemplateNamePattern::parse(text).map_err(|err| err.to_string()))
        .collect()
}

fn aliases(raw: &[&str]) -> BTreeSet<AliasName> {
    raw.iter().map(|alias| AliasName::from(*alias)).collect()
}

fn legacy(name: &str, patterns: &[&str], alias_names: &[&str]) -> Result<Template, String> {
    Ok(Template::Legacy {
        name: name.to_string(),
        patterns: name_patterns(patterns)?,
        aliases: aliases(alias_names),
    })
}

fn template_request(operation: TemplateOperation) -> Request {
    Request {
        id: "req-1".to_string(),
        action: ActionName::new("indices:admin/template/get"),
        uri_path: "/_template".to_string(),
        headers: BTreeMap::new(),
        payload: RequestPayload::Template {
            operation,
        },
    }
}

async fn run(
    allowed: &[&str],
    operation: TemplateOperation,
    catalog: TemplateCatalog,
) -> Result<RuleResult, String> {
    let raw: Vec<String> = allowed.iter().map(ToString::to_string).collect();
    let rule = IndicesRule::new(&raw, false).map_err(|err| err.to_string())?;
    let cluster = StubCluster {
        templates: catalog,
        ..StubCluster::default()
    };
    let services = common::services(cluster, StaticAuth::default());
    let context = BlockContext::initial(Arc::new(template_request(operation)));
    Ok(rule.check(context, &services).await)
}

fn expect_template(result: RuleResult) -> Result<TemplateContext, String> {
    match result {
        RuleResult::Fulfilled(context) => match *context {
            BlockContext::Template(ctx) => Ok(ctx),
            other => Err(format!("unexpected context shape: {}", other.shape())),
        },
        RuleResult::Rejected(cause) => Err(format!("unexpected rejection: {cause:?}")),
    }
}

fn expect_rejection(result: RuleResult, expected: RejectCause) -> TestResult {
    match result {
        RuleResult::Rejected(Some(cause)) if cause == expected => Ok(()),
        RuleResult::Rejected(other) => Err(format!("unexpected cause: {other:?}")),
        RuleResult::Fulfilled(_) => Err("expected a rejection".to_string()),
    }
}

// ============================================================================
// SECTION: Add Operations
// ============================================================================

#[tokio::test]
async fn add_with_a_pattern_outside_the_allowed_set_is_rejected() -> TestResult {
    let operation = TemplateOperation::AddLegacy {
        name: "t1".to_string(),
        patterns: name_patterns(&["test1*", "test2*"])?,
        aliases: BTreeSet::new(),
    };
    let result = run(&["t*1*"], operation, TemplateCatalog::default()).await?;
    expect_rejection(result, RejectCause::OperationNotAllowed)
}

#[tokio::test]
async fn add_fully_inside_the_allowed_set_is_fulfilled() -> TestResult {
    let operation = TemplateOperation::AddLegacy {
        name: "t1".to_string(),
        patterns: name_patterns(&["test1*"])?,
        aliases: aliases(&["test1_alias", "{index}_alias"]),
    };
    let result = run(&["t*1*"], operation, TemplateCatalog::default()).await?;
    expect_template(result)?;
    Ok(())
}

#[tokio::test]
async fn overwriting_a_foreign_template_is_rejected() -> TestResult {
    let catalog = TemplateCatalog {
        legacy: vec![legacy("t1", &["foreign*"], &[])?],
        ..TemplateCatalog::default()
    };
    let operation = TemplateOperation::AddLegacy {
        name: "t1".to_string(),
        patterns: name_patterns(&["test1*"])?,
        aliases: BTreeSet::new(),
    };
    let result = run(&["t*1*"], operation, catalog).await?;
    expect_rejection(result, RejectCause::OperationNotAllowed)
}

#[tokio::test]
async fn component_placeholder_aliases_cannot_be_bounded() -> TestResult {
    let operation = TemplateOperation::AddComponent {
        name: "c1".to_string(),
        aliases: aliases(&["{index}_alias"]),
    };
    let result = run(&["test1*"], operation, TemplateCatalog::default()).await?;
    expect_rejection(result, RejectCause::OperationNotAllowed)
}

// ============================================================================
// SECTION: Get Operations
// ============================================================================

#[tokio::test]
async fn get_narrows_the_operation_and_rewrites_the_response() -> TestResult {
    let catalog = TemplateCatalog {
        legacy: vec![
            legacy("t1", &["test1*", "test2*"], &["test1_alias", "test2_alias"])?,
            legacy("t2", &["test3*", "test4*"], &[])?,
            legacy("a3", &["audit*"], &[])?,
        ],
        ..TemplateCatalog::default()
    };
    let result = run(&["t*1*"], TemplateOperation::GetLegacy(selectors(&["t*"])?), catalog.clone())
        .await?;
    let ctx = expect_template(result)?;

    // The outbound operation only fetches the surviving template names.
    let TemplateOperation::GetLegacy(narrowed) = &ctx.operation else {
        return Err(format!("unexpected operation: {:?}", ctx.operation));
    };
    if narrowed.len() != 1 || !narrowed[0].matches("t1") || narrowed[0].matches("t2") {
        return Err(format!("unexpected narrowing: {narrowed:?}"));
    }

    // The response transformation rewrites the surviving template to its
    // allowed patterns and aliases.
    let transformation =
        ctx.response_template_filter.as_ref().ok_or("missing response transformation")?;
    let rewritten = transformation.apply(&catalog.legacy);
    if rewritten.len() != 1 {
        return Err(format!("expected one surviving template, got {rewritten:?}"));
    }
    let survivor = &rewritten[0];
    if survivor.name() != "t1" {
        return Err(format!("unexpected survivor: {}", survivor.name()));
    }
    if survivor.patterns() != name_patterns(&["test1*"])? {
        return Err(format!("unexpected patterns: {:?}", survivor.patterns()));
    }
    if survivor.aliases() != &aliases(&["test1_alias"]) {
        return Err(format!("unexpected aliases: {:?}", survivor.aliases()));
    }
    Ok(())
}

#[tokio::test]
async fn get_with_no_surviving_template_is_template_not_found() -> TestResult {
    let catalog = TemplateCatalog {
        legacy: vec![legacy("t2", &["foreign*"], &[])?],
        ..TemplateCatalog::default()
    };
    let result = run(&["t*1*"], TemplateOperation::GetLegacy(selectors(&["t*"])?), catalog).await?;
    expect_rejection(result, RejectCause::TemplateNotFound)
}

#[tokio::test]
async fn get_with_a_match_all_rule_passes_templates_unchanged() -> TestResult {
    let catalog = TemplateCatalog {
        legacy: vec![legacy("t1", &["anything*"], &["any_alias"])?],
        ..TemplateCatalog::default()
    };
    let result =
        run(&["*"], TemplateOperation::GetLegacy(selectors(&["t*"])?), catalog.clone()).await?;
    let ctx = expect_template(result)?;
    let transformation =
        ctx.response_template_filter.as_ref().ok_or("missing response transformation")?;
    if transformation.apply(&catalog.legacy) != catalog.legacy {
        return Err("match-all rules must not rewrite templates".to_string());
    }
    Ok(())
}

#[tokio::test]
async fn component_templates_survive_on_their_alias_clause() -> TestResult {
    let catalog = TemplateCatalog {
        component: vec![
            Template::Component {
                name: "c1".to_string(),
                aliases: aliases(&["test1_alias"]),
            },
            Template::Component {
                name: "c2".to_string(),
                aliases: aliases(&["foreign_alias"]),
            },
        ],
        ..TemplateCatalog::default()
    };
    let result =
        run(&["test1*"], TemplateOperation::GetComponent(selectors(&["c*"])?), catalog).await?;
    let ctx = expect_template(result)?;
    let TemplateOperation::GetComponent(narrowed) = &ctx.operation else {
        return Err(format!("unexpected operation: {:?}", ctx.operation));
    };
    if narrowed.len() != 1 || !narrowed[0].matches("c1") || narrowed[0].matches("c2") {
        return Err(format!("unexpected narrowing: {narrowed:?}"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Delete Operations
// ============================================================================

#[tokio::test]
async fn delete_of_nothing_admissible_rewrites_to_a_sentinel() -> TestResult {
    let result = run(
        &["t*1*"],
        TemplateOperation::DeleteLegacy(selectors(&["ghost"])?),
        TemplateCatalog::default(),
    )
    .await?;
    let ctx = expect_template(result)?;
    let TemplateOperation::DeleteLegacy(rewritten) = &ctx.operation else {
        return Err(format!("unexpected operation: {:?}", ctx.operation));
    };
    if rewritten.len() != 1 {
        return Err(format!("expected one selector, got {rewritten:?}"));
    }
    let sentinel = rewritten[0].pattern().as_str();
    if !sentinel.starts_with("ghost_ROR_") {
        return Err(format!("unexpected sentinel: {sentinel}"));
    }
    if rewritten[0].matches("ghost") {
        return Err("the sentinel must not match the original name".to_string());
    }
    Ok(())
}

#[tokio::test]
async fn delete_of_a_fully_owned_template_keeps_the_selector() -> TestResult {
    let catalog = TemplateCatalog {
        legacy: vec![legacy("t1", &["test1*"], &["test1_alias"])?],
        ..TemplateCatalog::default()
    };
    let result =
        run(&["t*1*"], TemplateOperation::DeleteLegacy(selectors(&["t1"])?), catalog).await?;
    let ctx = expect_template(result)?;
    let TemplateOperation::DeleteLegacy(rewritten) = &ctx.operation else {
        return Err(format!("unexpected operation: {:?}", ctx.operation));
    };
    if rewritten != &selectors(&["t1"])? {
        return Err(format!("owned selectors must pass through, got {rewritten:?}"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Lookup Failures
// ============================================================================

#[tokio::test]
async fn catalog_lookup_failure_rejects_with_operation_not_allowed() -> TestResult {
    let raw = vec!["t*1*".to_string()];
    let rule = IndicesRule::new(&raw, false).map_err(|err| err.to_string())?;
    let cluster = StubCluster {
        failures: common::LookupFailures {
            templates: true,
            ..common::LookupFailures::default()
        },
        ..StubCluster::default()
    };
    let services = common::services(cluster, StaticAuth::default());
    let operation = TemplateOperation::GetLegacy(selectors(&["t*"])?);
    let context = BlockContext::initial(Arc::new(template_request(operation)));
    expect_rejection(rule.check(context, &services).await, RejectCause::OperationNotAllowed)
}

#[tokio::test]
async fn delete_touching_a_foreign_template_is_rejected() -> TestResult {
    let catalog = TemplateCatalog {
        legacy: vec![legacy("t1", &["test1*", "foreign*"], &[])?],
        ..TemplateCatalog::default()
    };
    let result =
        run(&["t*1*"], TemplateOperation::DeleteLegacy(selectors(&["t1"])?), catalog).await?;
    expect_rejection(result, RejectCause::OperationNotAllowed)
}
