// index-gate-config/src/builder.rs
// ============================================================================
// Module: Index Gate Block Builder
// Description: Raw configuration to runtime blocks and engine assembly.
// Purpose: Build rules fail-closed and validate variable contexts per block.
// Dependencies: index-gate-core, crate::config
// ============================================================================

//! ## Overview
//! The builder turns raw blocks into runtime rules, surfacing every
//! construction failure as a typed configuration error. Beyond per-rule
//! construction it enforces the cross-rule constraints: a block using
//! user-, group-, or JWT-derived variables must authenticate the caller, and
//! `@{jwt:…}` variables specifically require a `jwt_auth` rule. Rule
//! evaluation order inside a block is handled by the block itself; the
//! builder only preserves declaration order within one ordinal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use index_gate_core::AccessControlEngine;
use index_gate_core::AuditSink;
use index_gate_core::Clock;
use index_gate_core::EvalServices;
use index_gate_core::runtime::Block;
use index_gate_core::runtime::Rule;
use index_gate_core::runtime::RuleCreationError;
use index_gate_core::runtime::VariableKind;
use index_gate_core::runtime::rules::auth::AuthKeyRule;
use index_gate_core::runtime::rules::auth::JwtAuthRule;
use index_gate_core::runtime::rules::auth::ProxyAuthRule;
use index_gate_core::runtime::rules::filter::FieldsRule;
use index_gate_core::runtime::rules::filter::FilterRule;
use index_gate_core::runtime::rules::groups::GroupsRule;
use index_gate_core::runtime::rules::indices::IndicesRule;
use index_gate_core::runtime::rules::kibana::KibanaAccessRule;
use index_gate_core::runtime::rules::kibana::KibanaHideAppsRule;
use index_gate_core::runtime::rules::repositories::RepositoriesRule;
use index_gate_core::runtime::rules::snapshots::SnapshotsRule;

use crate::config::AccessControlSection;
use crate::config::ConfigError;
use crate::config::RawBlock;
use crate::config::RawProxyAuth;

// ============================================================================
// SECTION: Variable Context Tracking
// ============================================================================

/// Variable usage collected while building one block.
#[derive(Debug, Default)]
struct VariableUsage {
    /// Some rule references user, group, or availability variables.
    needs_authentication: bool,
    /// Some rule references JWT claims.
    needs_jwt: bool,
}

impl VariableUsage {
    /// Records the kinds referenced by one rule.
    fn record<'a>(&mut self, kinds: impl IntoIterator<Item = &'a VariableKind>) {
        for kind in kinds {
            match kind {
                VariableKind::User
                | VariableKind::CurrentGroup
                | VariableKind::AvailableGroups => self.needs_authentication = true,
                VariableKind::Jwt(_) => {
                    self.needs_authentication = true;
                    self.needs_jwt = true;
                }
                VariableKind::Header(_) | VariableKind::Env(_) => {}
            }
        }
    }
}

// ============================================================================
// SECTION: Block Building
// ============================================================================

/// Builds all runtime blocks from a decoded configuration section.
///
/// # Errors
///
/// Returns [`ConfigError`] on any rule construction or validation failure.
pub fn build_blocks(section: &AccessControlSection) -> Result<Vec<Block>, ConfigError> {
    let mut names = BTreeSet::new();
    let mut blocks = Vec::with_capacity(section.blocks.len());
    for raw in &section.blocks {
        if !names.insert(raw.name.clone()) {
            return Err(ConfigError::DuplicateBlock(raw.name.clone()));
        }
        blocks.push(build_block(raw, section)?);
    }
    Ok(blocks)
}

/// Builds one runtime block.
fn build_block(raw: &RawBlock, section: &AccessControlSection) -> Result<Block, ConfigError> {
    let creation = |source: RuleCreationError| ConfigError::RulesLevelCreation {
        block: raw.name.clone(),
        source,
    };

    let mut rules: Vec<Box<dyn Rule>> = Vec::new();
    let mut usage = VariableUsage::default();
    let mut has_authentication = false;
    let mut has_jwt_auth = false;

    if let Some(definition) = &raw.auth_key {
        rules.push(Box::new(AuthKeyRule::new(definition).map_err(creation)?));
        has_authentication = true;
    }
    if let Some(proxy) = &raw.proxy_auth {
        let (users, header) = match proxy {
            RawProxyAuth::Short(users) => (users.to_vec(), None),
            RawProxyAuth::Extended {
                proxy_auth_config,
                users,
            } => {
                let definition = section
                    .proxy_auth_configs
                    .iter()
                    .find(|definition| definition.name == *proxy_auth_config)
                    .ok_or_else(|| ConfigError::UnknownDefinition {
                        block: raw.name.clone(),
                        kind: "proxy_auth",
                        name: proxy_auth_config.clone(),
                    })?;
                (users.clone(), Some(definition.user_id_header.clone()))
            }
        };
        rules.push(Box::new(ProxyAuthRule::new(&users, header.as_deref()).map_err(creation)?));
        has_authentication = true;
    }
    if let Some(name) = &raw.jwt_auth {
        if !section.jwt.iter().any(|definition| definition.name == *name) {
            return Err(ConfigError::UnknownDefinition {
                block: raw.name.clone(),
                kind: "jwt",
                name: name.clone(),
            });
        }
        rules.push(Box::new(JwtAuthRule::new(name).map_err(creation)?));
        has_authentication = true;
        has_jwt_auth = true;
    }

    if let Some(groups) = &raw.groups {
        let rule = GroupsRule::new(&groups.to_vec()).map_err(creation)?;
        usage.record(rule.configured().kinds());
        rules.push(Box::new(rule));
    }

    if let Some(indices) = &raw.indices {
        let rule = IndicesRule::new(&indices.patterns(), indices.must_involve_indices())
            .map_err(creation)?;
        usage.record(rule.configured().kinds());
        rules.push(Box::new(rule));
    }
    if let Some(snapshots) = &raw.snapshots {
        let rule = SnapshotsRule::new(&snapshots.to_vec()).map_err(creation)?;
        usage.record(rule.configured().kinds());
        rules.push(Box::new(rule));
    }
    if let Some(repositories) = &raw.repositories {
        let rule = RepositoriesRule::new(&repositories.to_vec()).map_err(creation)?;
        usage.record(rule.configured().kinds());
        rules.push(Box::new(rule));
    }

    if let Some(access) = raw.kibana_access {
        let rule =
            KibanaAccessRule::new(access, raw.kibana_index.as_deref(), None).map_err(creation)?;
        if let Some(variable) = rule.kibana_index() {
            usage.record(variable.kinds());
        }
        rules.push(Box::new(rule));
    }
    if let Some(apps) = &raw.kibana_hide_apps {
        rules.push(Box::new(KibanaHideAppsRule::new(&apps.to_vec()).map_err(creation)?));
    }

    if let Some(filter) = &raw.filter {
        let rule = FilterRule::new(filter).map_err(creation)?;
        usage.record(rule.configured().kinds());
        rules.push(Box::new(rule));
    }
    if let Some(fields) = &raw.fields {
        rules.push(Box::new(FieldsRule::new(&fields.to_vec()).map_err(creation)?));
    }

    if rules.is_empty() {
        return Err(ConfigError::BlockValidation {
            block: raw.name.clone(),
            reason: "block declares no rules".to_string(),
        });
    }
    if usage.needs_jwt && !has_jwt_auth {
        return Err(ConfigError::BlockValidation {
            block: raw.name.clone(),
            reason: "JWT variables require a jwt_auth rule in the same block".to_string(),
        });
    }
    if usage.needs_authentication && !has_authentication {
        return Err(ConfigError::BlockValidation {
            block: raw.name.clone(),
            reason: "user and group variables require an authentication rule in the same block"
                .to_string(),
        });
    }

    Ok(Block::new(raw.name.clone(), raw.policy, raw.verbosity, rules)?)
}

// ============================================================================
// SECTION: Engine Assembly
// ============================================================================

/// Builds a full engine from a decoded configuration section.
///
/// # Errors
///
/// Returns [`ConfigError`] on any construction or validation failure.
pub fn build_engine(
    section: &AccessControlSection,
    services: EvalServices,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
) -> Result<AccessControlEngine, ConfigError> {
    let blocks = build_blocks(section)?;
    Ok(AccessControlEngine::new(blocks, services, audit, clock))
}
