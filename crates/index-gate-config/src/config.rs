// index-gate-config/src/config.rs
// ============================================================================
// Module: Index Gate Configuration
// Description: Raw configuration model and YAML decoding.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: index-gate-core, serde, serde_yaml
// ============================================================================

//! ## Overview
//! Configuration is decoded from YAML into a raw model before any rule is
//! built: decoding enforces size limits and field shapes, the builder
//! enforces the semantic constraints (variable contexts, redundant match-all
//! sets, duplicate names). Missing or invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use index_gate_core::KibanaAccess;
use index_gate_core::Policy;
use index_gate_core::Verbosity;
use index_gate_core::runtime::BlockCreationError;
use index_gate_core::runtime::RuleCreationError;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum configuration document size in bytes.
pub const MAX_CONFIG_SIZE: usize = 1024 * 1024;
/// Maximum number of blocks per configuration.
pub const MAX_BLOCKS: usize = 512;
/// Default identity header for proxy auth definitions.
pub const DEFAULT_USER_ID_HEADER: &str = "X-Forwarded-User";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while decoding or validating configuration.
///
/// # Invariants
/// - Variants are stable for programmatic handling; the engine refuses to
///   swap to a configuration that produced any of them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML document failed to decode.
    #[error("config decode failure: {0}")]
    Decode(String),
    /// The document exceeded the size limit.
    #[error("config too large: {actual} > {max} bytes")]
    TooLarge {
        /// Maximum allowed bytes.
        max: usize,
        /// Actual document size in bytes.
        actual: usize,
    },
    /// Too many blocks were declared.
    #[error("too many blocks: {actual} > {max}")]
    TooManyBlocks {
        /// Maximum allowed blocks.
        max: usize,
        /// Declared block count.
        actual: usize,
    },
    /// A rule failed to build inside a block.
    #[error("rules level creation error in block {block}: {source}")]
    RulesLevelCreation {
        /// Owning block name.
        block: String,
        /// Underlying creation failure.
        source: RuleCreationError,
    },
    /// A block failed semantic validation.
    #[error("block validation error in block {block}: {reason}")]
    BlockValidation {
        /// Owning block name.
        block: String,
        /// Validation failure description.
        reason: String,
    },
    /// A block failed structural assembly.
    #[error(transparent)]
    Block(#[from] BlockCreationError),
    /// Two blocks shared one name.
    #[error("duplicate block name: {0}")]
    DuplicateBlock(String),
    /// A rule referenced an unknown named definition.
    #[error("block {block} references unknown {kind} definition: {name}")]
    UnknownDefinition {
        /// Owning block name.
        block: String,
        /// Definition kind label.
        kind: &'static str,
        /// Referenced name.
        name: String,
    },
}

// ============================================================================
// SECTION: Field Shapes
// ============================================================================

/// A YAML value accepted as either one string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// Single value.
    One(String),
    /// List of values.
    Many(Vec<String>),
}

impl OneOrMany {
    /// Flattens the shape into a list.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }

    /// Returns the values as a borrowed list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.clone().into_vec()
    }
}

/// The `indices` rule surface: short list form or extended form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawIndices {
    /// Extended form with explicit options.
    Extended {
        /// Index selectors.
        patterns: Vec<String>,
        /// Require a non-empty admitted set.
        #[serde(default)]
        must_involve_indices: bool,
    },
    /// Bare selector or selector list.
    Short(OneOrMany),
}

impl RawIndices {
    /// Returns the configured selectors.
    #[must_use]
    pub fn patterns(&self) -> Vec<String> {
        match self {
            Self::Short(values) => values.to_vec(),
            Self::Extended {
                patterns, ..
            } => patterns.clone(),
        }
    }

    /// Returns the involvement flag.
    #[must_use]
    pub const fn must_involve_indices(&self) -> bool {
        match self {
            Self::Short(_) => false,
            Self::Extended {
                must_involve_indices,
                ..
            } => *must_involve_indices,
        }
    }
}

/// The `proxy_auth` rule surface: bare users or users plus a named config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawProxyAuth {
    /// Users plus a reference to a proxy auth definition.
    Extended {
        /// Referenced definition name.
        proxy_auth_config: String,
        /// User selectors.
        users: Vec<String>,
    },
    /// Bare user selector or selector list, default header.
    Short(OneOrMany),
}

// ============================================================================
// SECTION: Named Definitions
// ============================================================================

/// A JWT verification definition referenced by `jwt_auth`.
///
/// # Invariants
/// - Token verification itself is performed by the host's auth backend; the
///   definition carries routing data only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwtDefinition {
    /// Definition name.
    pub name: String,
    /// Header carrying the token.
    #[serde(default = "default_jwt_header")]
    pub header_name: String,
}

/// Default header for JWT definitions.
fn default_jwt_header() -> String {
    "Authorization".to_string()
}

/// A proxy auth definition referenced by `proxy_auth`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyAuthDefinition {
    /// Definition name.
    pub name: String,
    /// Header carrying the asserted identity.
    #[serde(default = "default_user_id_header")]
    pub user_id_header: String,
}

/// Default identity header for proxy auth definitions.
fn default_user_id_header() -> String {
    DEFAULT_USER_ID_HEADER.to_string()
}

// ============================================================================
// SECTION: Blocks
// ============================================================================

/// One raw access-control block as declared in YAML.
///
/// # Invariants
/// - An omitted rule key is absent, never "default-match".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawBlock {
    /// Block name.
    pub name: String,
    /// Block policy.
    #[serde(default, rename = "type")]
    pub policy: Policy,
    /// Logging verbosity.
    #[serde(default)]
    pub verbosity: Verbosity,
    /// Basic credential rule.
    #[serde(default)]
    pub auth_key: Option<String>,
    /// Proxy identity rule.
    #[serde(default)]
    pub proxy_auth: Option<RawProxyAuth>,
    /// JWT rule referencing a named definition.
    #[serde(default)]
    pub jwt_auth: Option<String>,
    /// Group authorization rule.
    #[serde(default)]
    pub groups: Option<OneOrMany>,
    /// Index narrowing rule.
    #[serde(default)]
    pub indices: Option<RawIndices>,
    /// Snapshot narrowing rule.
    #[serde(default)]
    pub snapshots: Option<OneOrMany>,
    /// Repository narrowing rule.
    #[serde(default)]
    pub repositories: Option<OneOrMany>,
    /// Kibana access level.
    #[serde(default)]
    pub kibana_access: Option<KibanaAccess>,
    /// Custom kibana index.
    #[serde(default)]
    pub kibana_index: Option<String>,
    /// Kibana applications to hide.
    #[serde(default)]
    pub kibana_hide_apps: Option<OneOrMany>,
    /// Document filter rule.
    #[serde(default)]
    pub filter: Option<String>,
    /// Field-level security rule.
    #[serde(default)]
    pub fields: Option<OneOrMany>,
}

// ============================================================================
// SECTION: Document Root
// ============================================================================

/// The access-control section of the configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccessControlSection {
    /// Blocks in declaration order.
    #[serde(default, rename = "access_control_rules")]
    pub blocks: Vec<RawBlock>,
    /// JWT definitions.
    #[serde(default)]
    pub jwt: Vec<JwtDefinition>,
    /// Proxy auth definitions.
    #[serde(default)]
    pub proxy_auth_configs: Vec<ProxyAuthDefinition>,
}

/// The configuration document root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexGateConfig {
    /// Access-control section.
    pub index_gate: AccessControlSection,
}

impl IndexGateConfig {
    /// Decodes a configuration document from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is oversized, fails to
    /// decode, or declares too many blocks.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.len() > MAX_CONFIG_SIZE {
            return Err(ConfigError::TooLarge {
                max: MAX_CONFIG_SIZE,
                actual: text.len(),
            });
        }
        let config: Self =
            serde_yaml::from_str(text).map_err(|err| ConfigError::Decode(err.to_string()))?;
        if config.index_gate.blocks.len() > MAX_BLOCKS {
            return Err(ConfigError::TooManyBlocks {
                max: MAX_BLOCKS,
                actual: config.index_gate.blocks.len(),
            });
        }
        Ok(config)
    }
}
