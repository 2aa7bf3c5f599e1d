// index-gate-core/src/core/names.rs
// ============================================================================
// Module: Index Gate Name Model
// Description: Canonical typed names for cluster resources.
// Purpose: Provide strongly typed, serializable names with wildcard awareness.
// Dependencies: glob-logic, serde
// ============================================================================

//! ## Overview
//! Every resource name handled by the engine is typed: indices, snapshots,
//! repositories, templates, aliases, groups, users, actions. String names are
//! canonicalised at parse time: the literal `_all` becomes [`NamePattern::All`],
//! the lone `*` becomes [`NamePattern::Wildcard`], anything carrying glob
//! characters is precompiled, and empty names are rejected at the boundary.
//! Index names additionally carry locality: `cluster:name` targets a remote
//! cluster and the cluster part may itself be a pattern.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use glob_logic::GlobPattern;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while parsing resource names.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// The name text was empty.
    #[error("resource name cannot be empty")]
    Empty,
    /// A remote index name was missing its cluster or index part.
    #[error("remote index name is incomplete: {0}")]
    IncompleteRemote(String),
}

// ============================================================================
// SECTION: Name Pattern
// ============================================================================

/// A canonicalised string name: concrete, glob, or one of the match-all forms.
///
/// # Invariants
/// - `Full` never contains glob characters and is never `_all` or `*`.
/// - `Pattern` always contains at least one glob character.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NamePattern {
    /// A concrete name.
    Full(String),
    /// A name pattern with glob characters.
    Pattern(GlobPattern),
    /// The literal `_all` selector.
    All,
    /// The lone `*` selector.
    Wildcard,
}

impl NamePattern {
    /// Parses and canonicalises a name.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::Empty`] when the text is empty.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        if raw.is_empty() {
            return Err(NameError::Empty);
        }
        if raw == "_all" {
            return Ok(Self::All);
        }
        if raw == "*" {
            return Ok(Self::Wildcard);
        }
        if raw.contains('*') || raw.contains('?') {
            let glob = GlobPattern::parse(raw).map_err(|_| NameError::Empty)?;
            return Ok(Self::Pattern(glob));
        }
        Ok(Self::Full(raw.to_string()))
    }

    /// Returns the textual form of the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Full(text) => text,
            Self::Pattern(glob) => glob.as_str(),
            Self::All => "_all",
            Self::Wildcard => "*",
        }
    }

    /// Returns true when the name selects every resource.
    #[must_use]
    pub const fn matches_all(&self) -> bool {
        matches!(self, Self::All | Self::Wildcard)
    }

    /// Returns true when the name is a single concrete resource.
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Tests a concrete candidate against the name.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Full(text) => text == candidate,
            Self::Pattern(glob) => glob.matches(candidate),
            Self::All | Self::Wildcard => true,
        }
    }

    /// Returns true when `outer` matches every name this pattern could match.
    ///
    /// Concrete names are treated as singleton languages; the match-all forms
    /// are equivalent to `*`.
    #[must_use]
    pub fn covered_by(&self, outer: &Self) -> bool {
        match (self, outer) {
            (_, Self::All | Self::Wildcard) => true,
            (Self::All | Self::Wildcard, _) => false,
            (Self::Full(inner), Self::Full(outer_text)) => inner == outer_text,
            (Self::Full(inner), Self::Pattern(outer_glob)) => outer_glob.matches(inner),
            (Self::Pattern(_), Self::Full(_)) => false,
            (Self::Pattern(inner), Self::Pattern(outer_glob)) => outer_glob.covers(inner),
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NamePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NamePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Index Name
// ============================================================================

/// An index name with locality.
///
/// # Invariants
/// - The wire form of a remote name is `cluster:name`; both parts are
///   non-empty and independently canonicalised.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexName {
    /// An index on the local cluster.
    Local(NamePattern),
    /// An index on a remote cluster reached through cross-cluster search.
    Remote {
        /// Cluster selector; may be a pattern.
        cluster: NamePattern,
        /// Index selector on the remote cluster.
        name: NamePattern,
    },
}

impl IndexName {
    /// Parses an index name, splitting remote names on the first `:`.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] when the name or either remote part is empty.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        if raw.is_empty() {
            return Err(NameError::Empty);
        }
        match raw.split_once(':') {
            Some((cluster, name)) => {
                if cluster.is_empty() || name.is_empty() {
                    return Err(NameError::IncompleteRemote(raw.to_string()));
                }
                Ok(Self::Remote {
                    cluster: NamePattern::parse(cluster)?,
                    name: NamePattern::parse(name)?,
                })
            }
            None => Ok(Self::Local(NamePattern::parse(raw)?)),
        }
    }

    /// Creates a local index name from an already-canonicalised pattern.
    #[must_use]
    pub const fn local(name: NamePattern) -> Self {
        Self::Local(name)
    }

    /// Returns true when the name targets a remote cluster.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Returns true when the name selects every local index.
    #[must_use]
    pub const fn matches_all_local(&self) -> bool {
        match self {
            Self::Local(name) => name.matches_all(),
            Self::Remote { .. } => false,
        }
    }

    /// Returns true when the name is a single concrete index.
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        match self {
            Self::Local(name) => name.is_concrete(),
            Self::Remote {
                cluster,
                name,
            } => cluster.is_concrete() && name.is_concrete(),
        }
    }

    /// Returns the wire form of the name.
    #[must_use]
    pub fn to_wire(&self) -> String {
        match self {
            Self::Local(name) => name.as_str().to_string(),
            Self::Remote {
                cluster,
                name,
            } => format!("{}:{}", cluster.as_str(), name.as_str()),
        }
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(name) => name.fmt(f),
            Self::Remote {
                cluster,
                name,
            } => write!(f, "{cluster}:{name}"),
        }
    }
}

impl Serialize for IndexName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for IndexName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Resource Name Wrappers
// ============================================================================

/// Snapshot name or selector.
///
/// # Invariants
/// - Wraps a canonicalised [`NamePattern`]; no locality applies to snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotName(NamePattern);

impl SnapshotName {
    /// Creates a snapshot name from a canonicalised pattern.
    #[must_use]
    pub const fn new(name: NamePattern) -> Self {
        Self(name)
    }

    /// Parses and canonicalises a snapshot name.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::Empty`] when the text is empty.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        NamePattern::parse(raw).map(Self)
    }

    /// Returns the underlying pattern.
    #[must_use]
    pub const fn pattern(&self) -> &NamePattern {
        &self.0
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Repository name or selector.
///
/// # Invariants
/// - Wraps a canonicalised [`NamePattern`]; no locality applies to repositories.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryName(NamePattern);

impl RepositoryName {
    /// Creates a repository name from a canonicalised pattern.
    #[must_use]
    pub const fn new(name: NamePattern) -> Self {
        Self(name)
    }

    /// Parses and canonicalises a repository name.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::Empty`] when the text is empty.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        NamePattern::parse(raw).map(Self)
    }

    /// Returns the underlying pattern.
    #[must_use]
    pub const fn pattern(&self) -> &NamePattern {
        &self.0
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Template name selector used by get and delete operations.
///
/// # Invariants
/// - Wraps a canonicalised [`NamePattern`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateNamePattern(NamePattern);

impl TemplateNamePattern {
    /// Creates a template selector from a canonicalised pattern.
    #[must_use]
    pub const fn new(name: NamePattern) -> Self {
        Self(name)
    }

    /// Parses and canonicalises a template selector.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::Empty`] when the text is empty.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        NamePattern::parse(raw).map(Self)
    }

    /// Returns the underlying pattern.
    #[must_use]
    pub const fn pattern(&self) -> &NamePattern {
        &self.0
    }

    /// Tests a concrete template name against the selector.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.matches(candidate)
    }
}

impl fmt::Display for TemplateNamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Opaque Identifiers
// ============================================================================

/// Concrete alias name attached to an index.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasName(String);

impl AliasName {
    /// Creates a new alias name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AliasName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for AliasName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AliasName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// User group name.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupName(String);

impl GroupName {
    /// Creates a new group name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for GroupName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GroupName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Authenticated user identifier.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserName(String);

impl UserName {
    /// Creates a new user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UserName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UserName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Kibana application identifier used by hide-apps rewriting.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KibanaApp(String);

impl KibanaApp {
    /// Creates a new application identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KibanaApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for KibanaApp {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for KibanaApp {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Cluster action identifier, e.g. `indices:data/read/search`.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionName(String);

impl ActionName {
    /// Creates a new action identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ActionName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActionName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
