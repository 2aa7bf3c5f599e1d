// index-gate-core/src/runtime/rules/auth.rs
// ============================================================================
// Module: Index Gate Authentication Rules
// Description: Credential rules establishing the caller's identity.
// Purpose: Record the logged user and groups before resource rules run.
// Dependencies: crate::{core, interfaces, runtime::rules}, base64, tracing
// ============================================================================

//! ## Overview
//! Authentication rules run first within a block. `auth_key` compares basic
//! credentials locally, `proxy_auth` trusts an identity header, and
//! `jwt_auth` delegates token verification to the auth backend and keeps the
//! decoded claims payload on the user metadata so `@{jwt:…}` variables can
//! resolve. After a successful authentication the backend is consulted for
//! the user's groups; a backend failure at that point downgrades to an
//! identity without groups instead of failing the block.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::debug;
use tracing::warn;

use crate::core::context::BlockContext;
use crate::core::names::GroupName;
use crate::core::names::NamePattern;
use crate::core::user::LoggedUser;
use crate::interfaces::Credential;
use crate::interfaces::EnvVarProvider;
use crate::runtime::rules::EvalServices;
use crate::runtime::rules::RejectCause;
use crate::runtime::rules::Rule;
use crate::runtime::rules::RuleCreationError;
use crate::runtime::rules::RuleKind;
use crate::runtime::rules::RuleOrdinal;
use crate::runtime::rules::RuleResult;
use crate::runtime::variables::ResolutionContext;
use crate::runtime::variables::SingleVariable;

/// Header carrying the tenancy group selected in the Kibana UI.
const CURRENT_GROUP_HEADER: &str = "x-ror-current-group";

/// Default identity header for proxy authentication.
pub const DEFAULT_PROXY_AUTH_HEADER: &str = "x-forwarded-user";

// ============================================================================
// SECTION: Identity Application
// ============================================================================

/// Records an authenticated identity and its groups on the context.
fn apply_identity(
    mut context: BlockContext,
    user: LoggedUser,
    groups: Vec<GroupName>,
) -> BlockContext {
    let common = context.common_mut();
    let current = common
        .request
        .header(CURRENT_GROUP_HEADER)
        .map(GroupName::new)
        .filter(|selected| groups.contains(selected))
        .or_else(|| groups.first().cloned());
    let mut user_metadata = std::mem::take(&mut common.user)
        .with_logged_user(user)
        .with_available_groups(groups);
    if let Some(group) = current {
        user_metadata = user_metadata.with_current_group(group);
    }
    common.user = user_metadata;
    context
}

/// Fetches the user's groups through the auth backend, best effort.
async fn backend_groups(services: &EvalServices, credential: &Credential) -> Vec<GroupName> {
    match services.auth.authenticate(credential).await {
        Ok(Some(identity)) => identity.groups,
        Ok(None) => Vec::new(),
        Err(error) => {
            debug!(error = %error, "group enrichment failed, continuing without groups");
            Vec::new()
        }
    }
}

/// Extracts basic credentials from the `Authorization` header.
fn basic_credentials(context: &BlockContext) -> Option<(String, String)> {
    let header = context.request().header("authorization")?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, secret) = text.split_once(':')?;
    Some((user.to_string(), secret.to_string()))
}

// ============================================================================
// SECTION: Auth Key Rule
// ============================================================================

/// Basic-credential comparison rule (`auth_key: "user:secret"`).
///
/// # Invariants
/// - `user` and `secret` are non-empty.
#[derive(Debug, Clone)]
pub struct AuthKeyRule {
    /// Expected user identifier.
    user: String,
    /// Expected secret.
    secret: String,
}

impl AuthKeyRule {
    /// Builds the rule from its `user:secret` definition.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCreationError::Invalid`] when the definition is not a
    /// `user:secret` pair with non-empty parts.
    pub fn new(definition: &str) -> Result<Self, RuleCreationError> {
        let Some((user, secret)) = definition.split_once(':') else {
            return Err(RuleCreationError::Invalid(format!(
                "auth_key must be user:secret, got: {definition}"
            )));
        };
        if user.is_empty() || secret.is_empty() {
            return Err(RuleCreationError::Invalid(
                "auth_key user and secret cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            user: user.to_string(),
            secret: secret.to_string(),
        })
    }
}

#[async_trait]
impl Rule for AuthKeyRule {
    fn kind(&self) -> RuleKind {
        RuleKind::AuthKey
    }

    fn ordinal(&self) -> RuleOrdinal {
        RuleOrdinal::Authentication
    }

    async fn check(&self, context: BlockContext, services: &EvalServices) -> RuleResult {
        let Some((user, secret)) = basic_credentials(&context) else {
            return RuleResult::rejected_silently();
        };
        if user != self.user || secret != self.secret {
            return RuleResult::rejected_silently();
        }
        let credential = Credential::Basic {
            user: user.clone(),
            secret,
        };
        let groups = backend_groups(services, &credential).await;
        RuleResult::fulfilled(apply_identity(context, LoggedUser::new(user), groups))
    }
}

// ============================================================================
// SECTION: Proxy Auth Rule
// ============================================================================

/// Trusted identity-header rule (`proxy_auth`).
///
/// # Invariants
/// - `users` is non-empty; the header name is stored lowercase.
#[derive(Debug, Clone)]
pub struct ProxyAuthRule {
    /// User selectors the asserted identity must match.
    users: Vec<NamePattern>,
    /// Identity header name.
    header: String,
}

impl ProxyAuthRule {
    /// Builds the rule from user selectors and an optional header override.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCreationError`] when no selector is given or a selector
    /// fails to parse.
    pub fn new(users: &[String], header: Option<&str>) -> Result<Self, RuleCreationError> {
        if users.is_empty() {
            return Err(RuleCreationError::Invalid(
                "proxy_auth requires at least one user selector".to_string(),
            ));
        }
        let users = users
            .iter()
            .map(|raw| NamePattern::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            users,
            header: header.unwrap_or(DEFAULT_PROXY_AUTH_HEADER).to_ascii_lowercase(),
        })
    }
}

#[async_trait]
impl Rule for ProxyAuthRule {
    fn kind(&self) -> RuleKind {
        RuleKind::ProxyAuth
    }

    fn ordinal(&self) -> RuleOrdinal {
        RuleOrdinal::Authentication
    }

    async fn check(&self, context: BlockContext, services: &EvalServices) -> RuleResult {
        let Some(user) = context.request().header(&self.header).map(str::to_string) else {
            return RuleResult::rejected_silently();
        };
        if !self.users.iter().any(|selector| selector.matches(&user)) {
            return RuleResult::rejected_silently();
        }
        let credential = Credential::ProxyHeader {
            user: user.clone(),
        };
        let groups = backend_groups(services, &credential).await;
        RuleResult::fulfilled(apply_identity(context, LoggedUser::new(user), groups))
    }
}

// ============================================================================
// SECTION: JWT Auth Rule
// ============================================================================

/// Bearer-token rule delegating verification to the auth backend.
#[derive(Debug, Clone)]
pub struct JwtAuthRule {
    /// Name of the JWT definition this rule references.
    provider: String,
}

impl JwtAuthRule {
    /// Builds the rule referencing a named JWT definition.
    ///
    /// # Errors
    ///
    /// Returns [`RuleCreationError::Invalid`] when the name is empty.
    pub fn new(provider: &str) -> Result<Self, RuleCreationError> {
        if provider.is_empty() {
            return Err(RuleCreationError::Invalid(
                "jwt_auth requires a definition name".to_string(),
            ));
        }
        Ok(Self {
            provider: provider.to_string(),
        })
    }

    /// Returns the referenced definition name.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }
}

#[async_trait]
impl Rule for JwtAuthRule {
    fn kind(&self) -> RuleKind {
        RuleKind::JwtAuth
    }

    fn ordinal(&self) -> RuleOrdinal {
        RuleOrdinal::Authentication
    }

    async fn check(&self, context: BlockContext, services: &EvalServices) -> RuleResult {
        let Some(token) = context
            .request()
            .header("authorization")
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(str::to_string)
        else {
            return RuleResult::rejected_silently();
        };

        let credential = Credential::Jwt {
            token: token.clone(),
        };
        let identity = match services.auth.authenticate(&credential).await {
            Ok(Some(identity)) => identity,
            Ok(None) => return RuleResult::rejected_silently(),
            Err(error) => {
                warn!(provider = %self.provider, error = %error, "jwt verification lookup failed");
                return RuleResult::rejected(RejectCause::OperationNotAllowed);
            }
        };

        let mut context =
            apply_identity(context, LoggedUser::new(identity.id.as_str()), identity.groups);
        context.common_mut().user.jwt_payload = decode_claims(&token);
        RuleResult::fulfilled(context)
    }
}

/// Decodes the claims segment of a JWT without verifying it locally.
fn decode_claims(token: &str) -> Option<serde_json::Value> {
    let claims = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(claims).ok()?;
    serde_json::from_slice(&bytes).ok()
}

// ============================================================================
// SECTION: Resolution Helpers
// ============================================================================

/// Resolves a single-valued variable against the current context.
///
/// Shared by rules that accept variables in scalar positions, e.g. the
/// kibana index and the filter query.
pub(crate) fn resolve_single(
    variable: &SingleVariable,
    context: &BlockContext,
    env: &dyn EnvVarProvider,
) -> Option<String> {
    let resolution = ResolutionContext::from_block(context, env);
    variable.resolve(&resolution).ok()
}
