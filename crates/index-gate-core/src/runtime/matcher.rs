// index-gate-core/src/runtime/matcher.rs
// ============================================================================
// Module: Index Gate Name Matching
// Description: Configured-pattern sets matched against requested name sets.
// Purpose: Compute the permitted subset of requested names, alias aware.
// Dependencies: crate::core::{metadata, names}, glob-logic
// ============================================================================

//! ## Overview
//! The matcher computes the permitted subset of a requested name set given a
//! configured pattern set. Four cases are handled per requested selector:
//! plain-vs-plain equality, configured-pattern glob tests, reverse globs
//! resolved through the universe, and pattern-vs-pattern intersection
//! (universe enumeration when available, structural intersection otherwise).
//! Requested aliases expand to their backing indices before matching, and
//! remote selectors match cluster and index parts independently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::metadata::IndexWithAliases;
use crate::core::metadata::RemoteIndexWithAliases;
use crate::core::names::IndexName;
use crate::core::names::NamePattern;

// ============================================================================
// SECTION: Pattern Set
// ============================================================================

/// A resolved configured pattern set over one resource universe.
///
/// # Invariants
/// - Patterns are canonicalised; `matches_all` reflects the presence of the
///   `_all`/`*` forms after canonicalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    /// Configured patterns in declaration order.
    patterns: Vec<NamePattern>,
}

impl PatternSet {
    /// Creates a pattern set.
    #[must_use]
    pub fn new(patterns: Vec<NamePattern>) -> Self {
        Self {
            patterns,
        }
    }

    /// Returns the configured patterns.
    #[must_use]
    pub fn patterns(&self) -> &[NamePattern] {
        &self.patterns
    }

    /// Returns true when the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns true when some pattern matches every name.
    #[must_use]
    pub fn matches_all(&self) -> bool {
        self.patterns.iter().any(NamePattern::matches_all)
    }

    /// Tests a concrete candidate against the set.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(candidate))
    }

    /// Returns true when some pattern covers every name `inner` could match.
    #[must_use]
    pub fn covers(&self, inner: &NamePattern) -> bool {
        self.patterns.iter().any(|pattern| inner.covered_by(pattern))
    }

    /// Computes the permitted subset for one requested selector.
    ///
    /// With a universe, requested patterns enumerate matching concrete names;
    /// without one, concrete configured names are admitted through reverse
    /// glob and pattern pairs fall back to structural intersection.
    #[must_use]
    pub fn admit(
        &self,
        requested: &NamePattern,
        universe: Option<&BTreeSet<String>>,
    ) -> BTreeSet<NamePattern> {
        let mut admitted = BTreeSet::new();
        if let NamePattern::Full(name) = requested {
            if self.matches(name) {
                admitted.insert(requested.clone());
            }
            return admitted;
        }

        if let Some(universe) = universe {
            for name in universe {
                if requested.matches(name) && self.matches(name) {
                    admitted.insert(NamePattern::Full(name.clone()));
                }
            }
            return admitted;
        }

        for configured in &self.patterns {
            match configured {
                NamePattern::Full(name) => {
                    if requested.matches(name) {
                        admitted.insert(configured.clone());
                    }
                }
                NamePattern::All | NamePattern::Wildcard => {
                    admitted.insert(requested.clone());
                }
                NamePattern::Pattern(configured_glob) => match requested {
                    NamePattern::All | NamePattern::Wildcard => {
                        admitted.insert(configured.clone());
                    }
                    NamePattern::Pattern(requested_glob) => {
                        if let Some(joined) = configured_glob.intersect(requested_glob) {
                            admitted.insert(NamePattern::Pattern(joined));
                        }
                    }
                    NamePattern::Full(_) => {}
                },
            }
        }
        admitted
    }
}

// ============================================================================
// SECTION: Indices Matcher
// ============================================================================

/// Configured index selectors split by locality.
///
/// # Invariants
/// - `local` holds the local selectors; `remote` holds `(cluster, name)`
///   selector pairs.
#[derive(Debug, Clone)]
pub struct IndicesMatcher {
    /// Configured local selectors.
    local: PatternSet,
    /// Configured remote selector pairs.
    remote: Vec<(NamePattern, NamePattern)>,
}

impl IndicesMatcher {
    /// Splits configured selectors by locality.
    #[must_use]
    pub fn new(configured: &[IndexName]) -> Self {
        let mut local = Vec::new();
        let mut remote = Vec::new();
        for entry in configured {
            match entry {
                IndexName::Local(name) => local.push(name.clone()),
                IndexName::Remote {
                    cluster,
                    name,
                } => remote.push((cluster.clone(), name.clone())),
            }
        }
        Self {
            local: PatternSet::new(local),
            remote,
        }
    }

    /// Returns the local selector set.
    #[must_use]
    pub const fn local(&self) -> &PatternSet {
        &self.local
    }

    /// Returns true when no selector is configured at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.remote.is_empty()
    }

    /// Computes the permitted local subset against the index universe.
    ///
    /// Requested aliases expand to their backing indices before matching;
    /// concrete requested names the cluster does not know are still admitted
    /// when a configured selector matches them, so the cluster can answer
    /// with its native not-found response.
    #[must_use]
    pub fn admit_local(
        &self,
        requested: &[NamePattern],
        universe: &[IndexWithAliases],
    ) -> BTreeSet<IndexName> {
        let mut admitted = BTreeSet::new();
        for selector in requested {
            for entry in universe {
                let selected = selector.matches(&entry.index)
                    || entry.aliases.iter().any(|alias| selector.matches(alias.as_str()));
                if selected && self.local.matches(&entry.index) {
                    admitted.insert(IndexName::Local(NamePattern::Full(entry.index.clone())));
                }
            }
            if let NamePattern::Full(name) = selector {
                if self.local.matches(name) {
                    admitted.insert(IndexName::Local(selector.clone()));
                }
            }
        }
        admitted
    }

    /// Returns true when some requested remote selector needs the remote
    /// universe: both its parts and the configured parts carry wildcards and
    /// no structural intersection exists.
    #[must_use]
    pub fn remote_needs_universe(&self, requested: &[(NamePattern, NamePattern)]) -> bool {
        requested.iter().any(|(_, requested_name)| {
            matches!(requested_name, NamePattern::Pattern(_) | NamePattern::All | NamePattern::Wildcard)
                && self.remote.iter().any(|(_, configured_name)| {
                    matches!(configured_name, NamePattern::Pattern(_))
                        && name_part_admit(configured_name, requested_name).is_none()
                })
        })
    }

    /// Computes the permitted remote subset.
    ///
    /// Cluster and index parts match independently. With a remote universe,
    /// concrete entries are enumerated; without one, admitted selectors are
    /// narrowed structurally and unknown names are left for the remote
    /// cluster to reject.
    #[must_use]
    pub fn admit_remote(
        &self,
        requested: &[(NamePattern, NamePattern)],
        universe: Option<&[RemoteIndexWithAliases]>,
    ) -> BTreeSet<IndexName> {
        let mut admitted = BTreeSet::new();
        for (requested_cluster, requested_name) in requested {
            if let Some(entries) = universe {
                for entry in entries {
                    let cluster_selected = requested_cluster.matches(&entry.cluster);
                    let name_selected = requested_name.matches(&entry.index)
                        || entry.aliases.iter().any(|alias| requested_name.matches(alias.as_str()));
                    if cluster_selected && name_selected && self.remote_matches(&entry.cluster, &entry.index)
                    {
                        admitted.insert(IndexName::Remote {
                            cluster: NamePattern::Full(entry.cluster.clone()),
                            name: NamePattern::Full(entry.index.clone()),
                        });
                    }
                }
                continue;
            }

            for (configured_cluster, configured_name) in &self.remote {
                let Some(cluster) = cluster_part_admit(configured_cluster, requested_cluster) else {
                    continue;
                };
                let Some(name) = name_part_admit(configured_name, requested_name) else {
                    continue;
                };
                admitted.insert(IndexName::Remote {
                    cluster,
                    name,
                });
            }
        }
        admitted
    }

    /// Tests a concrete remote index against the configured remote selectors.
    fn remote_matches(&self, cluster: &str, index: &str) -> bool {
        self.remote
            .iter()
            .any(|(configured_cluster, configured_name)| {
                configured_cluster.matches(cluster) && configured_name.matches(index)
            })
    }

    /// Expands the configured selectors into every concrete allowed index.
    #[must_use]
    pub fn all_allowed(&self, universe: &[IndexWithAliases]) -> BTreeSet<IndexName> {
        let mut allowed = BTreeSet::new();
        for pattern in self.local.patterns() {
            match pattern {
                NamePattern::Full(name) => {
                    allowed.insert(IndexName::Local(NamePattern::Full(name.clone())));
                }
                _ => {
                    for entry in universe {
                        if pattern.matches(&entry.index) {
                            allowed
                                .insert(IndexName::Local(NamePattern::Full(entry.index.clone())));
                        }
                    }
                }
            }
        }
        for (cluster, name) in &self.remote {
            allowed.insert(IndexName::Remote {
                cluster: cluster.clone(),
                name: name.clone(),
            });
        }
        allowed
    }
}

// ============================================================================
// SECTION: Part Matching
// ============================================================================

/// Admits a requested cluster selector against a configured cluster selector.
fn cluster_part_admit(configured: &NamePattern, requested: &NamePattern) -> Option<NamePattern> {
    part_admit(configured, requested)
}

/// Admits a requested index-name selector against a configured selector.
fn name_part_admit(configured: &NamePattern, requested: &NamePattern) -> Option<NamePattern> {
    part_admit(configured, requested)
}

/// Universe-free admission for one selector part.
fn part_admit(configured: &NamePattern, requested: &NamePattern) -> Option<NamePattern> {
    match (configured, requested) {
        (NamePattern::All | NamePattern::Wildcard, _) => Some(requested.clone()),
        (_, NamePattern::All | NamePattern::Wildcard) => Some(configured.clone()),
        (NamePattern::Full(configured_text), NamePattern::Full(requested_text)) => {
            (configured_text == requested_text).then(|| requested.clone())
        }
        (NamePattern::Pattern(configured_glob), NamePattern::Full(requested_text)) => {
            configured_glob.matches(requested_text).then(|| requested.clone())
        }
        (NamePattern::Full(configured_text), NamePattern::Pattern(requested_glob)) => {
            requested_glob.matches(configured_text).then(|| configured.clone())
        }
        (NamePattern::Pattern(configured_glob), NamePattern::Pattern(requested_glob)) => {
            configured_glob.intersect(requested_glob).map(NamePattern::Pattern)
        }
    }
}
