// index-gate-config/src/lib.rs
// ============================================================================
// Module: Index Gate Config Library
// Description: Canonical config model, validation, and block building.
// Purpose: Single source of truth for the YAML access-control surface.
// Dependencies: index-gate-core, serde, serde_yaml
// ============================================================================

//! ## Overview
//! `index-gate-config` defines the canonical configuration model for the
//! access-control engine: YAML decoding into a raw model, strict fail-closed
//! validation, and the builder that assembles runtime blocks and engines.
//! A configuration that fails any check is never swapped in.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod builder;
pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use builder::build_blocks;
pub use builder::build_engine;
pub use config::AccessControlSection;
pub use config::ConfigError;
pub use config::IndexGateConfig;
pub use config::JwtDefinition;
pub use config::OneOrMany;
pub use config::ProxyAuthDefinition;
pub use config::RawBlock;
pub use config::RawIndices;
pub use config::RawProxyAuth;
