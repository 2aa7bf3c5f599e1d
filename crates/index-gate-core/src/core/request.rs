// index-gate-core/src/core/request.rs
// ============================================================================
// Module: Index Gate Request Model
// Description: The classified, read-only view of an inbound action.
// Purpose: Carry everything rules may read without touching the wire layer.
// Dependencies: crate::core::{metadata, names}, serde
// ============================================================================

//! ## Overview
//! The framing adapter classifies every intercepted action into a request
//! shape before evaluation: document-oriented, multi-search, template,
//! snapshot, repository, kibana/metadata, or general. The engine receives the
//! classified request as an immutable handle; rules never mutate it, they
//! narrow the derived block context instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::metadata::TemplateOperation;
use crate::core::names::ActionName;
use crate::core::names::IndexName;
use crate::core::names::RepositoryName;
use crate::core::names::SnapshotName;

// ============================================================================
// SECTION: Request Payload
// ============================================================================

/// The shape-specific portion of a classified request.
///
/// # Invariants
/// - Variants are produced once by the framing adapter and never rewritten;
///   narrowed views live on the block context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestPayload {
    /// Single index-bearing action (search, get, write, admin on indices).
    GeneralIndex {
        /// Indices the caller asked for; may be empty, `_all`, or patterns.
        indices: Vec<IndexName>,
    },
    /// Multi-search action carrying one index pack per inner query.
    MultiIndex {
        /// Ordered index packs, one per inner query.
        packs: Vec<Vec<IndexName>>,
    },
    /// Template-oriented action.
    Template {
        /// Classified template operation.
        operation: TemplateOperation,
    },
    /// Snapshot-oriented action.
    Snapshot {
        /// Snapshot selectors.
        snapshots: Vec<SnapshotName>,
        /// Repository selectors.
        repositories: Vec<RepositoryName>,
        /// Indices involved in restore or status operations.
        indices: Vec<IndexName>,
    },
    /// Repository-oriented action.
    Repository {
        /// Repository selectors.
        repositories: Vec<RepositoryName>,
    },
    /// The caller asks for its own metadata (tenancy handshake).
    CurrentUserMetadata,
    /// Any other action without resource payload.
    General,
}

impl RequestPayload {
    /// Returns true when the request inherently targets indices.
    #[must_use]
    pub const fn involves_indices(&self) -> bool {
        matches!(
            self,
            Self::GeneralIndex { .. } | Self::MultiIndex { .. } | Self::Snapshot { .. }
        )
    }

    /// Returns true when the request targets templates.
    #[must_use]
    pub const fn involves_templates(&self) -> bool {
        matches!(self, Self::Template { .. })
    }
}

// ============================================================================
// SECTION: Request
// ============================================================================

/// The immutable, classified view of one inbound action.
///
/// # Invariants
/// - Header names are stored lowercase; lookups are case-insensitive through
///   [`Request::header`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Request identifier assigned by the host adapter.
    pub id: String,
    /// Action identifier, e.g. `indices:data/read/search`.
    pub action: ActionName,
    /// URI path of the REST call, when one exists.
    pub uri_path: String,
    /// Request headers, lowercase names.
    pub headers: BTreeMap<String, String>,
    /// Shape-specific payload.
    pub payload: RequestPayload,
}

impl Request {
    /// Returns a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Returns true when the request inherently targets indices.
    #[must_use]
    pub const fn involves_indices(&self) -> bool {
        self.payload.involves_indices()
    }

    /// Returns true when the request targets templates.
    #[must_use]
    pub const fn involves_templates(&self) -> bool {
        self.payload.involves_templates()
    }
}
