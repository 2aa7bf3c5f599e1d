// index-gate-core/tests/kibana_rule.rs
// ============================================================================
// Module: Kibana Rule Tests
// Description: Access-level decision table and kibana-index rewriting.
// Purpose: Exercise action classes, URI special cases, and metadata updates.
// Dependencies: index-gate-core, tokio
// ============================================================================

//! Behavior tests for the kibana access and hide-apps rules.

use std::collections::BTreeMap;
use std::sync::Arc;

use index_gate_core::ActionName;
use index_gate_core::BlockContext;
use index_gate_core::KibanaAccess;
use index_gate_core::Request;
use index_gate_core::RequestPayload;
use index_gate_core::Rule;
use index_gate_core::runtime::RuleResult;
use index_gate_core::runtime::rules::kibana::KibanaAccessRule;
use index_gate_core::runtime::rules::kibana::KibanaHideAppsRule;

mod common;

use common::StaticAuth;
use common::StubCluster;

type TestResult = Result<(), String>;

fn request(action: &str, uri_path: &str, targets: &[&str]) -> Request {
    Request {
        id: "req-1".to_string(),
        action: ActionName::new(action),
        uri_path: uri_path.to_string(),
        headers: BTreeMap::new(),
        payload: if targets.is_empty() {
            RequestPayload::General
        } else {
            RequestPayload::GeneralIndex {
                indices: common::indices(targets),
            }
        },
    }
}

async fn run(rule: &KibanaAccessRule, request: Request) -> RuleResult {
    let services = common::services(StubCluster::default(), StaticAuth::default());
    rule.check(BlockContext::initial(Arc::new(request)), &services).await
}

fn rule(access: KibanaAccess, kibana_index: Option<&str>) -> Result<KibanaAccessRule, String> {
    KibanaAccessRule::new(access, kibana_index, None).map_err(|err| err.to_string())
}

async fn decide(access: KibanaAccess, action: &str) -> Result<bool, String> {
    let rule = rule(access, None)?;
    Ok(matches!(run(&rule, request(action, "/", &[])).await, RuleResult::Fulfilled(_)))
}

// ============================================================================
// SECTION: Decision Table
// ============================================================================

#[tokio::test]
async fn read_actions_are_allowed_at_every_level() -> TestResult {
    for access in [
        KibanaAccess::RoStrict,
        KibanaAccess::Ro,
        KibanaAccess::Rw,
        KibanaAccess::Admin,
        KibanaAccess::Unrestricted,
    ] {
        if !decide(access, "indices:data/read/search").await? {
            return Err(format!("read must be allowed under {access:?}"));
        }
    }
    Ok(())
}

#[tokio::test]
async fn cluster_actions_are_forbidden_only_under_ro_strict() -> TestResult {
    if decide(KibanaAccess::RoStrict, "cluster:monitor/health").await? {
        return Err("ro_strict must forbid cluster actions".to_string());
    }
    for access in [KibanaAccess::Ro, KibanaAccess::Rw, KibanaAccess::Admin] {
        if !decide(access, "cluster:monitor/health").await? {
            return Err(format!("cluster actions must be allowed under {access:?}"));
        }
    }
    Ok(())
}

#[tokio::test]
async fn write_actions_are_forbidden_for_read_only_levels() -> TestResult {
    for access in [KibanaAccess::RoStrict, KibanaAccess::Ro] {
        if decide(access, "indices:data/write/index").await? {
            return Err(format!("writes must be forbidden under {access:?}"));
        }
    }
    Ok(())
}

#[tokio::test]
async fn rw_writes_require_the_kibana_index() -> TestResult {
    let rule = rule(KibanaAccess::Rw, None)?;
    let allowed =
        run(&rule, request("indices:data/write/index", "/.kibana/_doc/1", &[".kibana"])).await;
    if !matches!(allowed, RuleResult::Fulfilled(_)) {
        return Err("rw writes to the kibana index must be allowed".to_string());
    }
    let denied =
        run(&rule, request("indices:data/write/index", "/logs/_doc/1", &["logs"])).await;
    if !matches!(denied, RuleResult::Rejected(_)) {
        return Err("rw writes outside the kibana index must be forbidden".to_string());
    }
    Ok(())
}

#[tokio::test]
async fn admin_actions_require_the_admin_level() -> TestResult {
    if decide(KibanaAccess::Rw, "cluster:admin/rradmin/refreshsettings").await? {
        return Err("admin actions must be forbidden under rw".to_string());
    }
    if !decide(KibanaAccess::Admin, "cluster:admin/rradmin/refreshsettings").await? {
        return Err("admin actions must be allowed under admin".to_string());
    }
    Ok(())
}

#[tokio::test]
async fn engine_management_actions_require_admin_or_unrestricted() -> TestResult {
    for access in [KibanaAccess::RoStrict, KibanaAccess::Ro, KibanaAccess::Rw] {
        if decide(access, "cluster:ror/config/update").await? {
            return Err(format!("management actions must be forbidden under {access:?}"));
        }
    }
    if !decide(KibanaAccess::Admin, "cluster:ror/config/update").await? {
        return Err("management actions must be allowed under admin".to_string());
    }
    if !decide(KibanaAccess::Unrestricted, "cluster:ror/config/update").await? {
        return Err("management actions must be allowed under unrestricted".to_string());
    }
    Ok(())
}

#[tokio::test]
async fn unrestricted_allows_everything() -> TestResult {
    for action in [
        "indices:data/write/index",
        "cluster:admin/rradmin/refreshsettings",
        "cluster:ror/config/update",
        "indices:admin/close",
    ] {
        if !decide(KibanaAccess::Unrestricted, action).await? {
            return Err(format!("unrestricted must allow {action}"));
        }
    }
    Ok(())
}

#[tokio::test]
async fn unclassified_actions_are_forbidden_below_unrestricted() -> TestResult {
    if decide(KibanaAccess::Admin, "indices:admin/close").await? {
        return Err("unclassified actions must be forbidden under admin".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Kibana Write URI Shapes
// ============================================================================

#[tokio::test]
async fn kibana_write_uris_bypass_the_index_overlap_check() -> TestResult {
    let rule = rule(KibanaAccess::Rw, Some(".custom_kibana"))?;
    // The write targets other indices per the payload, but the URI is one of
    // the shapes Kibana issues against its own index.
    let result = run(
        &rule,
        request("indices:data/write/update", "/.custom_kibana/_update/url1234", &["other"]),
    )
    .await;
    if !matches!(result, RuleResult::Fulfilled(_)) {
        return Err("kibana write URIs must be allowed under rw".to_string());
    }
    Ok(())
}

#[tokio::test]
async fn custom_kibana_index_write_records_metadata() -> TestResult {
    let rule = rule(KibanaAccess::Rw, Some(".custom_kibana"))?;
    let result = run(
        &rule,
        request(
            "indices:data/write/update",
            "/.custom_kibana/_update/url1234",
            &[".custom_kibana"],
        ),
    )
    .await;
    let RuleResult::Fulfilled(context) = result else {
        return Err("expected fulfilment".to_string());
    };
    let user = &context.common().user;
    if user.kibana_access != Some(KibanaAccess::Rw) {
        return Err(format!("unexpected access recording: {:?}", user.kibana_access));
    }
    if user.found_kibana_index.as_deref() != Some(".custom_kibana") {
        return Err(format!("unexpected kibana index: {:?}", user.found_kibana_index));
    }
    Ok(())
}

#[tokio::test]
async fn kibana_template_uri_is_tolerated() -> TestResult {
    let rule = rule(KibanaAccess::Rw, None)?;
    let result = run(
        &rule,
        request(
            "indices:data/write/index",
            "/_template/kibana_index_template:.kibana",
            &["other"],
        ),
    )
    .await;
    if !matches!(result, RuleResult::Fulfilled(_)) {
        return Err("the kibana template URI must be allowed under rw".to_string());
    }
    Ok(())
}

#[tokio::test]
async fn kibana_write_uris_stay_forbidden_under_ro() -> TestResult {
    let rule = rule(KibanaAccess::Ro, Some(".custom_kibana"))?;
    let result = run(
        &rule,
        request("indices:data/write/update", "/.custom_kibana/_update/url1234", &["other"]),
    )
    .await;
    if !matches!(result, RuleResult::Rejected(_)) {
        return Err("ro must forbid kibana write URIs".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Hide Apps
// ============================================================================

#[tokio::test]
async fn hide_apps_records_the_hidden_set() -> TestResult {
    let rule = KibanaHideAppsRule::new(&["timelion".to_string(), "monitoring".to_string()])
        .map_err(|err| err.to_string())?;
    let services = common::services(StubCluster::default(), StaticAuth::default());
    let context =
        BlockContext::initial(Arc::new(request("indices:data/read/search", "/", &[])));
    let result = rule.check(context, &services).await;
    let RuleResult::Fulfilled(context) = result else {
        return Err("hide apps must always fulfil".to_string());
    };
    let hidden = &context.common().user.hidden_kibana_apps;
    if hidden.len() != 2 || !hidden.iter().any(|app| app.as_str() == "timelion") {
        return Err(format!("unexpected hidden apps: {hidden:?}"));
    }
    Ok(())
}
