// index-gate-core/src/lib.rs
// ============================================================================
// Module: Index Gate Core Library
// Description: Public API surface for the access-control decision engine.
// Purpose: Expose core types, interfaces, and runtime machinery.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! `index-gate-core` is the access-control decision engine placed in front of
//! an Elasticsearch-compatible cluster: every classified request is evaluated
//! against an ordered list of blocks, and the first block whose rules all
//! accept decides the policy and carries the rewritten resource view the host
//! adapter applies downstream. The engine is backend-agnostic and integrates
//! through explicit interfaces rather than embedding wire or storage details.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::AuditEvent;
pub use interfaces::AuditSink;
pub use interfaces::AuthBackend;
pub use interfaces::AuthenticatedUser;
pub use interfaces::Clock;
pub use interfaces::CounterIdGenerator;
pub use interfaces::Credential;
pub use interfaces::DecisionLabel;
pub use interfaces::EnvVarProvider;
pub use interfaces::IdGenerator;
pub use interfaces::LogicalClock;
pub use interfaces::LookupError;
pub use interfaces::MetadataSource;
pub use interfaces::NoopAuditSink;
pub use interfaces::ProcessEnv;
pub use runtime::AccessControlEngine;
pub use runtime::Block;
pub use runtime::BlockCreationError;
pub use runtime::ClusterStateFacade;
pub use runtime::EngineError;
pub use runtime::EngineVerdict;
pub use runtime::EvalServices;
pub use runtime::FacadeConfig;
pub use runtime::Outcome;
pub use runtime::Policy;
pub use runtime::RejectCause;
pub use runtime::Rule;
pub use runtime::RuleCreationError;
pub use runtime::RuleKind;
pub use runtime::Verbosity;
