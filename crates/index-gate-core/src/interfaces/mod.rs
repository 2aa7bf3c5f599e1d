// index-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Index Gate Interfaces
// Description: Backend-agnostic interfaces for metadata, auth, and audit.
// Purpose: Define the contract surfaces the decision engine consumes.
// Dependencies: crate::core, async-trait, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the engine integrates with the surrounding cluster
//! without embedding backend-specific details: the metadata source enumerates
//! what exists, auth backends resolve credentials to identities, the audit
//! sink records decisions, and the remaining singletons (environment,
//! identifier generation, clock) are injected so evaluation stays a pure
//! function of `(config, request, collaborators)`. Implementations must fail
//! closed on missing or invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::history::BlockHistory;
use crate::core::metadata::IndexWithAliases;
use crate::core::metadata::RemoteIndexWithAliases;
use crate::core::metadata::TemplateCatalog;
use crate::core::names::GroupName;
use crate::core::names::NamePattern;
use crate::core::names::UserName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Lookup Errors
// ============================================================================

/// Errors surfaced by external-lookup collaborators.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Rules translate every lookup error into an `OperationNotAllowed`
///   rejection; lookup failures never fulfil a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The backend reported an error.
    #[error("external lookup failed: {0}")]
    Backend(String),
    /// The lookup exceeded its deadline.
    #[error("external lookup timed out after {0:?}")]
    Timeout(Duration),
}

// ============================================================================
// SECTION: Metadata Source
// ============================================================================

/// Enumerates cluster resources known to exist at evaluation time.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Lists local indices together with their aliases.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the cluster state cannot be read.
    async fn local_indices(&self) -> Result<Vec<IndexWithAliases>, LookupError>;

    /// Lists remote indices for clusters matching the selector.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the remote state cannot be read.
    async fn remote_indices(
        &self,
        cluster: &NamePattern,
    ) -> Result<Vec<RemoteIndexWithAliases>, LookupError>;

    /// Lists existing templates of every kind.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the cluster state cannot be read.
    async fn templates(&self) -> Result<TemplateCatalog, LookupError>;

    /// Lists snapshots inside a repository.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the repository cannot be read.
    async fn snapshots(&self, repository: &str) -> Result<Vec<String>, LookupError>;

    /// Lists registered repositories.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the cluster state cannot be read.
    async fn repositories(&self) -> Result<Vec<String>, LookupError>;
}

// ============================================================================
// SECTION: Authentication Backend
// ============================================================================

/// Credential material extracted from a request.
///
/// # Invariants
/// - Secrets are held only for the duration of one authentication call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Basic user and secret pair.
    Basic {
        /// User identifier.
        user: String,
        /// Secret.
        secret: String,
    },
    /// Identity asserted by a trusted proxy header.
    ProxyHeader {
        /// User identifier from the header.
        user: String,
    },
    /// Bearer JWT.
    Jwt {
        /// Raw token.
        token: String,
    },
    /// Opaque API key.
    ApiKey {
        /// Raw key.
        key: String,
    },
}

/// Identity resolved by an authentication backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Resolved user identifier.
    pub id: UserName,
    /// Groups the backend attributes to the user, ordered.
    pub groups: Vec<GroupName>,
}

/// Uniform authentication seam over LDAP, JWT, proxy, and external services.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Resolves a credential into an identity, or `None` when unknown.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the backend cannot be reached.
    async fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<Option<AuthenticatedUser>, LookupError>;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Final decision label recorded by the audit sink.
///
/// # Invariants
/// - Variants are stable for serialization and audit matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionLabel {
    /// A block allowed the request.
    Allowed,
    /// A forbid block matched the request.
    ForbiddenByMatched,
    /// No block matched the request.
    ForbiddenByMismatched,
    /// The requested resource was not visible to the caller.
    NotFound,
    /// Evaluation hit an engine invariant violation.
    Interrupted,
}

/// One audited decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Request identifier.
    pub request_id: String,
    /// Decision label.
    pub decision: DecisionLabel,
    /// Name of the block that decided, when one did.
    pub block: Option<String>,
    /// Decision timestamp from the injected clock.
    pub decided_at: Timestamp,
    /// Per-block evaluation history.
    pub history: Vec<BlockHistory>,
}

/// Fire-and-forget audit recording.
pub trait AuditSink: Send + Sync {
    /// Records a decision; implementations must not block evaluation.
    fn record(&self, event: AuditEvent);
}

/// Audit sink that drops every event.
///
/// # Invariants
/// - Zero-sized marker type; carries no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

// ============================================================================
// SECTION: Injected Singletons
// ============================================================================

/// Process-environment access for `@{env:…}` variables.
pub trait EnvVarProvider: Send + Sync {
    /// Returns the value of an environment variable, when set.
    fn get(&self, name: &str) -> Option<String>;
}

/// Environment provider backed by the real process environment.
///
/// # Invariants
/// - Zero-sized marker type; carries no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvVarProvider for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Generates opaque identifiers for delete sentinels and audit records.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh identifier.
    fn generate(&self) -> String;
}

/// Deterministic counter-backed identifier generator.
///
/// # Invariants
/// - Identifiers are unique within one generator instance.
#[derive(Debug, Default)]
pub struct CounterIdGenerator {
    /// Monotonic counter.
    next: AtomicU64,
}

impl IdGenerator for CounterIdGenerator {
    fn generate(&self) -> String {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{value:016x}")
    }
}

/// Supplies timestamps for audit records.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Clock that always reports logical time zero, for tests and replay.
///
/// # Invariants
/// - Zero-sized marker type; carries no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogicalClock;

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        Timestamp::Logical(0)
    }
}
