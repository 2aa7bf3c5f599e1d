// index-gate-core/src/core/mod.rs
// ============================================================================
// Module: Index Gate Core Types
// Description: Domain model for names, metadata, contexts, and history.
// Purpose: Group the pure data types the runtime evaluates over.
// Dependencies: crate::core::{context, history, metadata, names, request, time, user}
// ============================================================================

//! ## Overview
//! The core module holds the typed vocabulary of the engine: canonicalised
//! resource names, cluster-metadata snapshots, the classified request, the
//! sum-typed block context, user metadata, and the evaluation history. All
//! types here are pure data; evaluation logic lives in `runtime`.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod context;
pub mod history;
pub mod metadata;
pub mod names;
pub mod request;
pub mod time;
pub mod user;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use context::BlockContext;
pub use context::CommonContext;
pub use context::FieldMode;
pub use context::FieldRestrictions;
pub use context::FilterQuery;
pub use context::GeneralIndexContext;
pub use context::Indices;
pub use context::MultiIndexContext;
pub use context::SnapshotContext;
pub use context::TemplateContext;
pub use context::TemplateTransformation;
pub use history::BlockHistory;
pub use history::ContextSnapshot;
pub use history::HistoryOutcome;
pub use history::RuleHistoryItem;
pub use metadata::INDEX_ALIAS_PLACEHOLDER;
pub use metadata::IndexWithAliases;
pub use metadata::RemoteIndexWithAliases;
pub use metadata::Template;
pub use metadata::TemplateCatalog;
pub use metadata::TemplateOperation;
pub use metadata::expand_alias;
pub use names::ActionName;
pub use names::AliasName;
pub use names::GroupName;
pub use names::IndexName;
pub use names::KibanaApp;
pub use names::NameError;
pub use names::NamePattern;
pub use names::RepositoryName;
pub use names::SnapshotName;
pub use names::TemplateNamePattern;
pub use names::UserName;
pub use request::Request;
pub use request::RequestPayload;
pub use time::Timestamp;
pub use user::KibanaAccess;
pub use user::LoggedUser;
pub use user::UserMetadata;
