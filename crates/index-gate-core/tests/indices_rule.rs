// index-gate-core/tests/indices_rule.rs
// ============================================================================
// Module: Indices Rule Tests
// Description: Narrowing behavior for general and multi-search requests.
// Purpose: Exercise admission, substitution, and rejection causes.
// Dependencies: index-gate-core, tokio
// ============================================================================

//! Behavior tests for the indices rule.

use std::sync::Arc;

use index_gate_core::AliasName;
use index_gate_core::BlockContext;
use index_gate_core::IndexWithAliases;
use index_gate_core::Indices;
use index_gate_core::RejectCause;
use index_gate_core::RemoteIndexWithAliases;
use index_gate_core::Request;
use index_gate_core::Rule;
use index_gate_core::runtime::RuleResult;
use index_gate_core::runtime::rules::indices::IndicesRule;

mod common;

use common::StaticAuth;
use common::StubCluster;

type TestResult = Result<(), String>;

fn rule(patterns: &[&str], must_involve: bool) -> Result<IndicesRule, String> {
    let raw: Vec<String> = patterns.iter().map(ToString::to_string).collect();
    IndicesRule::new(&raw, must_involve).map_err(|err| err.to_string())
}

async fn run(
    rule: &IndicesRule,
    request: Request,
    cluster: StubCluster,
) -> Result<RuleResult, String> {
    let services = common::services(cluster, StaticAuth::default());
    let context = BlockContext::initial(Arc::new(request));
    Ok(rule.check(context, &services).await)
}

fn expect_general(result: RuleResult) -> Result<(Vec<String>, Vec<String>), String> {
    match result {
        RuleResult::Fulfilled(context) => match *context {
            BlockContext::GeneralIndex(ctx) => Ok((
                common::wire_set(&ctx.filtered_indices),
                common::wire_set(&ctx.all_allowed_indices),
            )),
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
// SECTION: General Requests
// ============================================================================

#[tokio::test]
async fn empty_request_substitutes_the_allowed_universe() -> TestResult {
    let rule = rule(&["test*"], false)?;
    let cluster = StubCluster::with_locals(&["test1", "test2", "other"]);
    let result = run(&rule, common::search_request(&[]), cluster).await?;
    let (filtered, _) = expect_general(result)?;
    if filtered != vec!["test1".to_string(), "test2".to_string()] {
        return Err(format!("unexpected substitution: {filtered:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn match_all_request_behaves_like_empty() -> TestResult {
    let rule = rule(&["test*"], false)?;
    let cluster = StubCluster::with_locals(&["test1", "other"]);
    let result = run(&rule, common::search_request(&["_all"]), cluster).await?;
    let (filtered, allowed) = expect_general(result)?;
    if filtered != vec!["test1".to_string()] {
        return Err(format!("unexpected narrowing: {filtered:?}"));
    }
    if !allowed.contains(&"test1".to_string()) {
        return Err("allowed set must cover the admitted names".to_string());
    }
    Ok(())
}

#[tokio::test]
async fn empty_admission_with_involvement_required_is_not_found() -> TestResult {
    let rule = rule(&["test*"], true)?;
    let cluster = StubCluster::with_locals(&["other"]);
    let result = run(&rule, common::search_request(&[]), cluster).await?;
    expect_rejection(result, RejectCause::IndexNotFound)
}

#[tokio::test]
async fn concrete_demand_outside_the_allowed_set_is_not_found() -> TestResult {
    let rule = rule(&["test*"], false)?;
    let cluster = StubCluster::with_locals(&["test1", "secret"]);
    let result = run(&rule, common::search_request(&["secret"]), cluster).await?;
    expect_rejection(result, RejectCause::IndexNotFound)
}

#[tokio::test]
async fn pattern_only_miss_is_operation_not_allowed() -> TestResult {
    let rule = rule(&["test*"], false)?;
    let cluster = StubCluster::with_locals(&["other"]);
    let result = run(&rule, common::search_request(&["metrics*"]), cluster).await?;
    expect_rejection(result, RejectCause::OperationNotAllowed)
}

#[tokio::test]
async fn requested_alias_is_admitted_through_its_backing_index() -> TestResult {
    let rule = rule(&["logs-*"], false)?;
    let cluster = StubCluster {
        locals: vec![
            IndexWithAliases::with_aliases("logs-2020", [AliasName::new("logs")]),
            IndexWithAliases::with_aliases("audit-2020", [AliasName::new("audit")]),
        ],
        ..StubCluster::default()
    };
    let result = run(&rule, common::search_request(&["logs"]), cluster).await?;
    let (filtered, _) = expect_general(result)?;
    if filtered != vec!["logs-2020".to_string()] {
        return Err(format!("alias expansion failed: {filtered:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn remote_request_is_narrowed_against_remote_selectors() -> TestResult {
    let rule = rule(&["odd:test1_index"], false)?;
    let cluster = StubCluster::with_locals(&["local1"]);
    let result = run(&rule, common::search_request(&["odd:test1_index"]), cluster).await?;
    let (filtered, _) = expect_general(result)?;
    if filtered != vec!["odd:test1_index".to_string()] {
        return Err(format!("remote admission failed: {filtered:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn double_wildcard_remote_pair_consults_the_remote_universe() -> TestResult {
    let rule = rule(&["e*:metrics-?"], false)?;
    let cluster = StubCluster {
        remotes: vec![
            RemoteIndexWithAliases {
                cluster: "etl".to_string(),
                index: "metrics-a".to_string(),
                aliases: std::collections::BTreeSet::new(),
            },
            RemoteIndexWithAliases {
                cluster: "etl".to_string(),
                index: "audit-a".to_string(),
                aliases: std::collections::BTreeSet::new(),
            },
        ],
        ..StubCluster::default()
    };
    // Requested and configured name parts both carry wildcards with no
    // structural intersection, forcing universe enumeration.
    let result = run(&rule, common::search_request(&["et*:*-a"]), cluster).await?;
    let (filtered, _) = expect_general(result)?;
    if filtered != vec!["etl:metrics-a".to_string()] {
        return Err(format!("remote enumeration failed: {filtered:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn variable_selectors_resolve_from_headers() -> TestResult {
    let rule = rule(&["logs-@{header:x-tenant}-*"], false)?;
    let cluster = StubCluster::with_locals(&["logs-acme-1", "logs-globex-1"]);
    let mut request = common::search_request(&[]);
    request.headers.insert("x-tenant".to_string(), "acme".to_string());
    let result = run(&rule, request, cluster).await?;
    let (filtered, _) = expect_general(result)?;
    if filtered != vec!["logs-acme-1".to_string()] {
        return Err(format!("variable narrowing failed: {filtered:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn unresolvable_variable_rejects_without_a_cause() -> TestResult {
    let rule = rule(&["logs-@{user}-*"], false)?;
    let cluster = StubCluster::with_locals(&["logs-dev1-1"]);
    let result = run(&rule, common::search_request(&[]), cluster).await?;
    match result {
        RuleResult::Rejected(None) => Ok(()),
        other => Err(format!("expected a silent rejection, got {other:?}")),
    }
}

// ============================================================================
// SECTION: Multi-Search Requests
// ============================================================================

#[tokio::test]
async fn pattern_only_packs_may_reduce_to_empty() -> TestResult {
    let rule = rule(&["dev2_index"], false)?;
    let cluster = StubCluster::with_locals(&["dev2_index"]);
    let request = common::msearch_request(&[&["etl:etl*", "metrics*"]]);
    let result = run(&rule, request, cluster).await?;
    match result {
        RuleResult::Fulfilled(context) => match *context {
            BlockContext::MultiIndex(ctx) => match ctx.index_packs.as_slice() {
                [Indices::Found(set)] if set.is_empty() => Ok(()),
                other => Err(format!("expected one empty pack, got {other:?}")),
            },
            other => Err(format!("unexpected context shape: {}", other.shape())),
        },
        RuleResult::Rejected(cause) => Err(format!("unexpected rejection: {cause:?}")),
    }
}

#[tokio::test]
async fn one_surviving_pack_keeps_the_request_alive() -> TestResult {
    let rule = rule(&["dev2_index"], false)?;
    let cluster = StubCluster::with_locals(&["dev2_index", "other"]);
    let request = common::msearch_request(&[&["metrics*"], &["dev2_index"]]);
    let result = run(&rule, request, cluster).await?;
    match result {
        RuleResult::Fulfilled(context) => match *context {
            BlockContext::MultiIndex(ctx) => {
                let rendered: Vec<Vec<String>> = ctx
                    .index_packs
                    .iter()
                    .map(|pack| match pack {
                        Indices::Found(set) => common::wire_set(set),
                        Indices::NotFound => vec!["<not-found>".to_string()],
                    })
                    .collect();
                if rendered != vec![Vec::<String>::new(), vec!["dev2_index".to_string()]] {
                    return Err(format!("unexpected packs: {rendered:?}"));
                }
                Ok(())
            }
            other => Err(format!("unexpected context shape: {}", other.shape())),
        },
        RuleResult::Rejected(cause) => Err(format!("unexpected rejection: {cause:?}")),
    }
}

#[tokio::test]
async fn all_packs_empty_with_a_concrete_demand_is_not_found() -> TestResult {
    let rule = rule(&["dev2_index"], false)?;
    let cluster = StubCluster::with_locals(&["dev2_index"]);
    let request = common::msearch_request(&[&["secret_index"], &["metrics*"]]);
    let result = run(&rule, request, cluster).await?;
    expect_rejection(result, RejectCause::IndexNotFound)
}

// ============================================================================
// SECTION: Lookup Failures
// ============================================================================

#[tokio::test]
async fn local_lookup_failure_rejects_with_operation_not_allowed() -> TestResult {
    let rule = rule(&["test*"], false)?;
    let cluster = StubCluster {
        failures: common::LookupFailures {
            local_indices: true,
            ..common::LookupFailures::default()
        },
        ..StubCluster::default()
    };
    let result = run(&rule, common::search_request(&["test1"]), cluster).await?;
    expect_rejection(result, RejectCause::OperationNotAllowed)
}

#[tokio::test]
async fn remote_lookup_failure_rejects_with_operation_not_allowed() -> TestResult {
    // The double-wildcard pair forces remote enumeration, which fails.
    let rule = rule(&["e*:metrics-?"], false)?;
    let cluster = StubCluster {
        failures: common::LookupFailures {
            remote_indices: true,
            ..common::LookupFailures::default()
        },
        ..StubCluster::default()
    };
    let result = run(&rule, common::search_request(&["et*:*-a"]), cluster).await?;
    expect_rejection(result, RejectCause::OperationNotAllowed)
}
