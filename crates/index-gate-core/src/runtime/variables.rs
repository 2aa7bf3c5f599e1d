// index-gate-core/src/runtime/variables.rs
// ============================================================================
// Module: Index Gate Runtime Variables
// Description: Parsing and resolution of runtime-resolvable values.
// Purpose: Feed user, header, JWT, and environment values into resource rules.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Rule configuration values may embed variables resolved per request:
//! `@{user}`, `@{current_group}`, `@{available_groups}`, `@{header:NAME}`,
//! `@{jwt:dotted.claim.path}`, `@{env:NAME}`, and the legacy `${NAME}` form
//! for environment variables. A variable written as `@explode{…}` is
//! multi-valued and expands a template into a set of strings; at most one
//! multi-valued variable may appear per template, and multi-valued variables
//! are rejected at configuration time in single-valued positions. A variable
//! missing from the resolution context causes the owning rule to reject.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::core::context::BlockContext;
use crate::core::context::CommonContext;
use crate::core::names::GroupName;
use crate::core::names::UserName;
use crate::interfaces::EnvVarProvider;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while compiling a variable definition.
///
/// # Invariants
/// - Variants are stable for programmatic handling; every error carries the
///   offending raw definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableCreationError {
    /// The definition contained an unterminated or empty variable reference.
    #[error("malformed variable definition: {0}")]
    Malformed(String),
    /// A multi-valued variable appeared in a single-valued position.
    #[error("multi-valued variable cannot be used in a single-variable context: {0}")]
    CannotUseMultiVariableInSingleVariableContext(String),
    /// More than one multi-valued variable appeared in one definition.
    #[error("only one multi-valued variable may be used per definition: {0}")]
    OnlyOneMultiVariable(String),
}

/// A variable required by a rule was absent from the resolution context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot resolve variable: {variable}")]
pub struct Unresolvable {
    /// Textual form of the unresolved variable.
    pub variable: String,
}

// ============================================================================
// SECTION: Variable Kinds
// ============================================================================

/// Dotted path selecting a claim inside a JWT payload.
///
/// # Invariants
/// - At least one non-empty segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimPath(Vec<String>);

impl ClaimPath {
    /// Parses a dotted claim path.
    ///
    /// # Errors
    ///
    /// Returns [`VariableCreationError::Malformed`] on empty segments.
    pub fn parse(raw: &str) -> Result<Self, VariableCreationError> {
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(VariableCreationError::Malformed(format!("jwt:{raw}")));
        }
        Ok(Self(segments))
    }

    /// Selects the claim value inside a decoded payload.
    #[must_use]
    pub fn select<'a>(&self, payload: &'a Value) -> Option<&'a Value> {
        let mut cursor = payload;
        for segment in &self.0 {
            cursor = cursor.as_object()?.get(segment)?;
        }
        Some(cursor)
    }
}

impl fmt::Display for ClaimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// The value source a variable reads from.
///
/// # Invariants
/// - Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// The authenticated user identifier.
    User,
    /// The currently selected tenancy group.
    CurrentGroup,
    /// The groups available to the user.
    AvailableGroups,
    /// A request header.
    Header(String),
    /// A claim inside the JWT payload.
    Jwt(ClaimPath),
    /// A process environment variable.
    Env(String),
}

impl VariableKind {
    /// Parses the selector text inside a variable reference.
    fn parse(selector: &str) -> Result<Self, VariableCreationError> {
        if selector.is_empty() {
            return Err(VariableCreationError::Malformed(selector.to_string()));
        }
        if let Some(name) = selector.strip_prefix("header:") {
            return Ok(Self::Header(name.to_ascii_lowercase()));
        }
        if let Some(path) = selector.strip_prefix("jwt:") {
            return Ok(Self::Jwt(ClaimPath::parse(path)?));
        }
        if let Some(name) = selector.strip_prefix("env:") {
            return Ok(Self::Env(name.to_string()));
        }
        match selector {
            "user" => Ok(Self::User),
            "current_group" => Ok(Self::CurrentGroup),
            "available_groups" => Ok(Self::AvailableGroups),
            // Unknown bare selectors fall back to header lookup.
            other => Ok(Self::Header(other.to_ascii_lowercase())),
        }
    }

    /// Returns the textual form used in diagnostics.
    fn describe(&self) -> String {
        match self {
            Self::User => "@{user}".to_string(),
            Self::CurrentGroup => "@{current_group}".to_string(),
            Self::AvailableGroups => "@{available_groups}".to_string(),
            Self::Header(name) => format!("@{{header:{name}}}"),
            Self::Jwt(path) => format!("@{{jwt:{path}}}"),
            Self::Env(name) => format!("@{{env:{name}}}"),
        }
    }
}

// ============================================================================
// SECTION: Template Model
// ============================================================================

/// One parsed segment of a variable template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    /// Literal text.
    Text(String),
    /// Single-valued variable reference.
    Single(VariableKind),
    /// Multi-valued (`@explode`) variable reference.
    Exploded(VariableKind),
}

/// A parsed template mixing literal text and variable references.
///
/// # Invariants
/// - `raw` is the original definition text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableTemplate {
    /// Original definition text.
    raw: String,
    /// Parsed segments.
    parts: Vec<TemplatePart>,
}

impl VariableTemplate {
    /// Parses a definition into template parts.
    ///
    /// # Errors
    ///
    /// Returns [`VariableCreationError::Malformed`] on unterminated references.
    pub fn parse(raw: &str) -> Result<Self, VariableCreationError> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut rest = raw;

        while !rest.is_empty() {
            let exploded = rest.starts_with("@explode{");
            let single = rest.starts_with("@{");
            let legacy_env = rest.starts_with("${");
            if exploded || single || legacy_env {
                let open = rest.find('{').map_or(0, |idx| idx + 1);
                let Some(close) = rest[open ..].find('}') else {
                    return Err(VariableCreationError::Malformed(raw.to_string()));
                };
                let selector = &rest[open .. open + close];
                if !text.is_empty() {
                    parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                }
                let kind = if legacy_env {
                    if selector.is_empty() {
                        return Err(VariableCreationError::Malformed(raw.to_string()));
                    }
                    VariableKind::Env(selector.to_string())
                } else {
                    VariableKind::parse(selector)
                        .map_err(|_| VariableCreationError::Malformed(raw.to_string()))?
                };
                if exploded {
                    parts.push(TemplatePart::Exploded(kind));
                } else {
                    parts.push(TemplatePart::Single(kind));
                }
                rest = &rest[open + close + 1 ..];
            } else {
                let mut chars = rest.chars();
                if let Some(ch) = chars.next() {
                    text.push(ch);
                }
                rest = chars.as_str();
            }
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Text(text));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    /// Returns the original definition text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns true when the template contains variable references.
    #[must_use]
    pub fn uses_variables(&self) -> bool {
        self.parts.iter().any(|part| !matches!(part, TemplatePart::Text(_)))
    }

    /// Returns the kinds of every referenced variable.
    #[must_use]
    pub fn kinds(&self) -> Vec<&VariableKind> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                TemplatePart::Text(_) => None,
                TemplatePart::Single(kind) | TemplatePart::Exploded(kind) => Some(kind),
            })
            .collect()
    }

    /// Counts the multi-valued references.
    fn exploded_count(&self) -> usize {
        self.parts.iter().filter(|part| matches!(part, TemplatePart::Exploded(_))).count()
    }

    /// Returns the static text when the template has no variables.
    fn static_text(&self) -> Option<String> {
        if self.uses_variables() {
            return None;
        }
        let mut out = String::new();
        for part in &self.parts {
            if let TemplatePart::Text(text) = part {
                out.push_str(text);
            }
        }
        Some(out)
    }
}

// ============================================================================
// SECTION: Resolution Context
// ============================================================================

/// Snapshot of the values variables may read, derived from a block context.
pub struct ResolutionContext<'a> {
    /// Authenticated user, when present.
    pub user: Option<&'a UserName>,
    /// Currently selected group, when present.
    pub current_group: Option<&'a GroupName>,
    /// Ordered available groups.
    pub available_groups: &'a [GroupName],
    /// Request headers, lowercase names.
    pub headers: &'a BTreeMap<String, String>,
    /// Decoded JWT payload, when present.
    pub jwt: Option<&'a Value>,
    /// Injected environment provider.
    pub env: &'a dyn EnvVarProvider,
}

impl<'a> ResolutionContext<'a> {
    /// Derives the resolution context from the current block context.
    #[must_use]
    pub fn from_block(context: &'a BlockContext, env: &'a dyn EnvVarProvider) -> Self {
        Self::from_common(context.common(), env)
    }

    /// Derives the resolution context from the shared context state.
    #[must_use]
    pub fn from_common(common: &'a CommonContext, env: &'a dyn EnvVarProvider) -> Self {
        Self {
            user: common.user.logged_user.as_ref().map(|logged| &logged.id),
            current_group: common.user.current_group.as_ref(),
            available_groups: &common.user.available_groups,
            headers: &common.request.headers,
            jwt: common.user.jwt_payload.as_ref(),
            env,
        }
    }

    /// Resolves a variable kind into its value list.
    fn resolve_kind(&self, kind: &VariableKind) -> Result<Vec<String>, Unresolvable> {
        let missing = || Unresolvable {
            variable: kind.describe(),
        };
        match kind {
            VariableKind::User => {
                self.user.map(|user| vec![user.to_string()]).ok_or_else(missing)
            }
            VariableKind::CurrentGroup => {
                self.current_group.map(|group| vec![group.to_string()]).ok_or_else(missing)
            }
            VariableKind::AvailableGroups => {
                if self.available_groups.is_empty() {
                    return Err(missing());
                }
                Ok(self.available_groups.iter().map(ToString::to_string).collect())
            }
            VariableKind::Header(name) => {
                self.headers.get(name).map(|value| vec![value.clone()]).ok_or_else(missing)
            }
            VariableKind::Env(name) => {
                self.env.get(name).map(|value| vec![value]).ok_or_else(missing)
            }
            VariableKind::Jwt(path) => {
                let payload = self.jwt.ok_or_else(missing)?;
                let claim = path.select(payload).ok_or_else(missing)?;
                claim_values(claim).ok_or_else(missing)
            }
        }
    }
}

/// Renders a scalar or array-of-scalars claim into strings.
fn claim_values(claim: &Value) -> Option<Vec<String>> {
    match claim {
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(scalar_text(item)?);
            }
            Some(out)
        }
        scalar => scalar_text(scalar).map(|text| vec![text]),
    }
}

/// Renders a scalar claim without JSON quoting.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// ============================================================================
// SECTION: Runtime Variables
// ============================================================================

/// A template resolving to exactly one string.
///
/// # Invariants
/// - Contains no `@explode` references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleVariable {
    /// Parsed template.
    template: VariableTemplate,
}

impl SingleVariable {
    /// Compiles a single-valued definition.
    ///
    /// # Errors
    ///
    /// Returns [`VariableCreationError`] on malformed definitions or when an
    /// `@explode` reference appears.
    pub fn parse(raw: &str) -> Result<Self, VariableCreationError> {
        let template = VariableTemplate::parse(raw)?;
        if template.exploded_count() > 0 {
            return Err(VariableCreationError::CannotUseMultiVariableInSingleVariableContext(
                raw.to_string(),
            ));
        }
        Ok(Self {
            template,
        })
    }

    /// Returns the original definition text.
    #[must_use]
    pub fn raw(&self) -> &str {
        self.template.raw()
    }

    /// Returns true when the definition contains variable references.
    #[must_use]
    pub fn uses_variables(&self) -> bool {
        self.template.uses_variables()
    }

    /// Returns the kinds of every referenced variable.
    #[must_use]
    pub fn kinds(&self) -> Vec<&VariableKind> {
        self.template.kinds()
    }

    /// Resolves the template into one string.
    ///
    /// Multi-capable sources (`available_groups`, array claims) are joined
    /// with `,` in single-valued position.
    ///
    /// # Errors
    ///
    /// Returns [`Unresolvable`] when any referenced value is absent.
    pub fn resolve(&self, context: &ResolutionContext<'_>) -> Result<String, Unresolvable> {
        let mut out = String::new();
        for part in &self.template.parts {
            match part {
                TemplatePart::Text(text) => out.push_str(text),
                TemplatePart::Single(kind) | TemplatePart::Exploded(kind) => {
                    out.push_str(&context.resolve_kind(kind)?.join(","));
                }
            }
        }
        Ok(out)
    }
}

/// A template resolving to a set of strings.
///
/// # Invariants
/// - Contains at most one `@explode` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiVariable {
    /// Parsed template.
    template: VariableTemplate,
}

impl MultiVariable {
    /// Compiles a multi-capable definition.
    ///
    /// # Errors
    ///
    /// Returns [`VariableCreationError`] on malformed definitions or when
    /// more than one `@explode` reference appears.
    pub fn parse(raw: &str) -> Result<Self, VariableCreationError> {
        let template = VariableTemplate::parse(raw)?;
        if template.exploded_count() > 1 {
            return Err(VariableCreationError::OnlyOneMultiVariable(raw.to_string()));
        }
        Ok(Self {
            template,
        })
    }

    /// Returns the original definition text.
    #[must_use]
    pub fn raw(&self) -> &str {
        self.template.raw()
    }

    /// Returns true when the definition contains variable references.
    #[must_use]
    pub fn uses_variables(&self) -> bool {
        self.template.uses_variables()
    }

    /// Returns the kinds of every referenced variable.
    #[must_use]
    pub fn kinds(&self) -> Vec<&VariableKind> {
        self.template.kinds()
    }

    /// Returns the static text when the definition has no variables.
    #[must_use]
    pub fn static_text(&self) -> Option<String> {
        self.template.static_text()
    }

    /// Resolves the template into its value set.
    ///
    /// # Errors
    ///
    /// Returns [`Unresolvable`] when any referenced value is absent.
    pub fn resolve(&self, context: &ResolutionContext<'_>) -> Result<Vec<String>, Unresolvable> {
        let mut prefix = String::new();
        let mut exploded: Option<Vec<String>> = None;
        let mut suffix = String::new();

        for part in &self.template.parts {
            let target = if exploded.is_some() { &mut suffix } else { &mut prefix };
            match part {
                TemplatePart::Text(text) => target.push_str(text),
                TemplatePart::Single(kind) => {
                    target.push_str(&context.resolve_kind(kind)?.join(","));
                }
                TemplatePart::Exploded(kind) => {
                    exploded = Some(context.resolve_kind(kind)?);
                }
            }
        }

        match exploded {
            Some(values) => {
                Ok(values.into_iter().map(|value| format!("{prefix}{value}{suffix}")).collect())
            }
            None => Ok(vec![prefix]),
        }
    }
}

// ============================================================================
// SECTION: Resolvable Sets
// ============================================================================

/// A configured value set: already concrete, or resolved per request.
///
/// # Invariants
/// - `precomputed` is `Some` exactly when no entry uses variables, which lets
///   creation-time validations short-circuit on concrete sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvableSet {
    /// Configured entries in declaration order.
    entries: Vec<MultiVariable>,
    /// Static values when every entry is concrete.
    precomputed: Option<Vec<String>>,
}

impl ResolvableSet {
    /// Compiles a configured value list.
    ///
    /// # Errors
    ///
    /// Returns [`VariableCreationError`] when any entry fails to compile.
    pub fn from_raw(values: &[String]) -> Result<Self, VariableCreationError> {
        let entries = values
            .iter()
            .map(|value| MultiVariable::parse(value))
            .collect::<Result<Vec<_>, _>>()?;
        let precomputed = entries
            .iter()
            .map(MultiVariable::static_text)
            .collect::<Option<Vec<_>>>();
        Ok(Self {
            entries,
            precomputed,
        })
    }

    /// Returns the static values when every entry is concrete.
    #[must_use]
    pub fn already_resolved(&self) -> Option<&[String]> {
        self.precomputed.as_deref()
    }

    /// Returns true when any entry uses variables.
    #[must_use]
    pub fn uses_variables(&self) -> bool {
        self.precomputed.is_none()
    }

    /// Returns the kinds of every referenced variable across entries.
    #[must_use]
    pub fn kinds(&self) -> Vec<&VariableKind> {
        self.entries.iter().flat_map(MultiVariable::kinds).collect()
    }

    /// Resolves every entry, flattening multi-valued expansions.
    ///
    /// # Errors
    ///
    /// Returns [`Unresolvable`] when any referenced value is absent.
    pub fn resolve(&self, context: &ResolutionContext<'_>) -> Result<Vec<String>, Unresolvable> {
        if let Some(precomputed) = &self.precomputed {
            return Ok(precomputed.clone());
        }
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            out.extend(entry.resolve(context)?);
        }
        Ok(out)
    }
}
