// index-gate-core/src/core/metadata.rs
// ============================================================================
// Module: Index Gate Cluster Metadata Model
// Description: Snapshots of cluster state consumed during evaluation.
// Purpose: Model indices-with-aliases, templates, and template operations.
// Dependencies: crate::core::names, serde
// ============================================================================

//! ## Overview
//! Metadata records are read per evaluation through the external-lookup
//! facade and treated as immutable snapshots. Alias membership is
//! many-to-many: an alias may point at several indices and an index may carry
//! several aliases. Template aliases may contain the `{index}` placeholder,
//! which is expanded per concrete matching index pattern at apply time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::names::AliasName;
use crate::core::names::NameError;
use crate::core::names::NamePattern;
use crate::core::names::TemplateNamePattern;

/// Placeholder expanded against each concrete matching index pattern.
pub const INDEX_ALIAS_PLACEHOLDER: &str = "{index}";

// ============================================================================
// SECTION: Indices With Aliases
// ============================================================================

/// A concrete local index together with its aliases.
///
/// # Invariants
/// - `index` is a concrete name; aliases are concrete names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexWithAliases {
    /// Concrete index name.
    pub index: String,
    /// Aliases pointing at the index.
    pub aliases: BTreeSet<AliasName>,
}

impl IndexWithAliases {
    /// Creates a metadata entry without aliases.
    #[must_use]
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            aliases: BTreeSet::new(),
        }
    }

    /// Creates a metadata entry with aliases.
    #[must_use]
    pub fn with_aliases(
        index: impl Into<String>,
        aliases: impl IntoIterator<Item = AliasName>,
    ) -> Self {
        Self {
            index: index.into(),
            aliases: aliases.into_iter().collect(),
        }
    }
}

/// A concrete remote index together with its cluster and aliases.
///
/// # Invariants
/// - `cluster` and `index` are concrete names on the remote cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIndexWithAliases {
    /// Concrete remote cluster name.
    pub cluster: String,
    /// Concrete index name on the remote cluster.
    pub index: String,
    /// Aliases pointing at the index.
    pub aliases: BTreeSet<AliasName>,
}

// ============================================================================
// SECTION: Templates
// ============================================================================

/// An existing template as reported by the metadata source.
///
/// # Invariants
/// - `patterns` is non-empty for legacy and index templates and absent for
///   component templates.
/// - Aliases may carry the `{index}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Template {
    /// Legacy (v1) template.
    Legacy {
        /// Template name.
        name: String,
        /// Index patterns the template applies to.
        patterns: Vec<NamePattern>,
        /// Aliases the template contributes.
        aliases: BTreeSet<AliasName>,
    },
    /// Composable (v2) index template.
    Index {
        /// Template name.
        name: String,
        /// Index patterns the template applies to.
        patterns: Vec<NamePattern>,
        /// Aliases the template contributes.
        aliases: BTreeSet<AliasName>,
    },
    /// Component template referenced by index templates.
    Component {
        /// Template name.
        name: String,
        /// Aliases the template contributes.
        aliases: BTreeSet<AliasName>,
    },
}

impl Template {
    /// Returns the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Legacy {
                name, ..
            }
            | Self::Index {
                name, ..
            }
            | Self::Component {
                name, ..
            } => name,
        }
    }

    /// Returns the template's index patterns; empty for component templates.
    #[must_use]
    pub fn patterns(&self) -> &[NamePattern] {
        match self {
            Self::Legacy {
                patterns, ..
            }
            | Self::Index {
                patterns, ..
            } => patterns,
            Self::Component {
                ..
            } => &[],
        }
    }

    /// Returns the template's aliases.
    #[must_use]
    pub fn aliases(&self) -> &BTreeSet<AliasName> {
        match self {
            Self::Legacy {
                aliases, ..
            }
            | Self::Index {
                aliases, ..
            }
            | Self::Component {
                aliases, ..
            } => aliases,
        }
    }
}

/// All existing templates grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCatalog {
    /// Legacy (v1) templates.
    pub legacy: Vec<Template>,
    /// Composable (v2) index templates.
    pub index: Vec<Template>,
    /// Component templates.
    pub component: Vec<Template>,
}

// ============================================================================
// SECTION: Alias Expansion
// ============================================================================

/// Expands the `{index}` placeholder in a template alias against a pattern.
///
/// Aliases without the placeholder are parsed as-is.
///
/// # Errors
///
/// Returns [`NameError`] when the expansion produces an empty name.
pub fn expand_alias(alias: &AliasName, index_pattern: &NamePattern) -> Result<NamePattern, NameError> {
    let text = alias.as_str();
    if text.contains(INDEX_ALIAS_PLACEHOLDER) {
        let expanded = text.replace(INDEX_ALIAS_PLACEHOLDER, index_pattern.as_str());
        return NamePattern::parse(&expanded);
    }
    NamePattern::parse(text)
}

// ============================================================================
// SECTION: Template Operations
// ============================================================================

/// The template-shaped portion of an inbound request.
///
/// # Invariants
/// - Name-pattern lists are non-empty as produced by the request classifier;
///   the indices rule may narrow them or rewrite them to sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateOperation {
    /// Fetch legacy templates by name patterns.
    GetLegacy(Vec<TemplateNamePattern>),
    /// Fetch index templates by name patterns.
    GetIndex(Vec<TemplateNamePattern>),
    /// Fetch legacy and index templates in one call.
    GetLegacyAndIndex(Vec<TemplateNamePattern>),
    /// Fetch component templates by name patterns.
    GetComponent(Vec<TemplateNamePattern>),
    /// Create or overwrite a legacy template.
    AddLegacy {
        /// Template name.
        name: String,
        /// Index patterns the template applies to.
        patterns: Vec<NamePattern>,
        /// Aliases the template contributes.
        aliases: BTreeSet<AliasName>,
    },
    /// Create or overwrite an index template.
    AddIndex {
        /// Template name.
        name: String,
        /// Index patterns the template applies to.
        patterns: Vec<NamePattern>,
        /// Aliases the template contributes.
        aliases: BTreeSet<AliasName>,
    },
    /// Simulate an index template and return the allowed view.
    AddIndexAndGetAllowed {
        /// Template name.
        name: String,
        /// Index patterns the template applies to.
        patterns: Vec<NamePattern>,
        /// Aliases the template contributes.
        aliases: BTreeSet<AliasName>,
    },
    /// Create or overwrite a component template.
    AddComponent {
        /// Template name.
        name: String,
        /// Aliases the template contributes.
        aliases: BTreeSet<AliasName>,
    },
    /// Delete legacy templates by name patterns.
    DeleteLegacy(Vec<TemplateNamePattern>),
    /// Delete index templates by name patterns.
    DeleteIndex(Vec<TemplateNamePattern>),
    /// Delete component templates by name patterns.
    DeleteComponent(Vec<TemplateNamePattern>),
}

impl TemplateOperation {
    /// Returns true when the operation reads templates.
    #[must_use]
    pub const fn is_get(&self) -> bool {
        matches!(
            self,
            Self::GetLegacy(_) | Self::GetIndex(_) | Self::GetLegacyAndIndex(_) | Self::GetComponent(_)
        )
    }

    /// Returns true when the operation creates or overwrites a template.
    #[must_use]
    pub const fn is_add(&self) -> bool {
        matches!(
            self,
            Self::AddLegacy { .. }
                | Self::AddIndex { .. }
                | Self::AddIndexAndGetAllowed { .. }
                | Self::AddComponent { .. }
        )
    }

    /// Returns true when the operation deletes templates.
    #[must_use]
    pub const fn is_delete(&self) -> bool {
        matches!(self, Self::DeleteLegacy(_) | Self::DeleteIndex(_) | Self::DeleteComponent(_))
    }
}
