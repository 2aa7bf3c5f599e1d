// index-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Support
// Description: Stub collaborators and request builders shared by test suites.
// Purpose: Keep engine tests focused on behavior instead of fixture wiring.
// ============================================================================

//! Shared stubs: an in-memory metadata source, a static auth backend, and
//! request builders.

#![allow(dead_code, reason = "Each test suite uses a different subset of the helpers.")]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use index_gate_core::ActionName;
use index_gate_core::AuthBackend;
use index_gate_core::AuthenticatedUser;
use index_gate_core::ClusterStateFacade;
use index_gate_core::CounterIdGenerator;
use index_gate_core::Credential;
use index_gate_core::EnvVarProvider;
use index_gate_core::EvalServices;
use index_gate_core::FacadeConfig;
use index_gate_core::GroupName;
use index_gate_core::IndexName;
use index_gate_core::IndexWithAliases;
use index_gate_core::LookupError;
use index_gate_core::MetadataSource;
use index_gate_core::NamePattern;
use index_gate_core::RemoteIndexWithAliases;
use index_gate_core::Request;
use index_gate_core::RequestPayload;
use index_gate_core::TemplateCatalog;
use index_gate_core::UserName;

// ============================================================================
// SECTION: Metadata Stub
// ============================================================================

/// Lookup endpoints a [`StubCluster`] should fail, for error-path tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupFailures {
    pub local_indices: bool,
    pub remote_indices: bool,
    pub templates: bool,
    pub snapshots: bool,
    pub repositories: bool,
}

impl LookupFailures {
    /// Fails every endpoint.
    pub fn all() -> Self {
        Self {
            local_indices: true,
            remote_indices: true,
            templates: true,
            snapshots: true,
            repositories: true,
        }
    }
}

/// In-memory metadata source with per-endpoint failure injection.
#[derive(Debug, Clone, Default)]
pub struct StubCluster {
    pub locals: Vec<IndexWithAliases>,
    pub remotes: Vec<RemoteIndexWithAliases>,
    pub templates: TemplateCatalog,
    pub snapshots: BTreeMap<String, Vec<String>>,
    pub repositories: Vec<String>,
    pub failures: LookupFailures,
}

impl StubCluster {
    pub fn with_locals(names: &[&str]) -> Self {
        Self {
            locals: names.iter().map(|name| IndexWithAliases::new(*name)).collect(),
            ..Self::default()
        }
    }

    fn fail_when(flag: bool) -> Result<(), LookupError> {
        if flag {
            return Err(LookupError::Backend("stub lookup failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataSource for StubCluster {
    async fn local_indices(&self) -> Result<Vec<IndexWithAliases>, LookupError> {
        Self::fail_when(self.failures.local_indices)?;
        Ok(self.locals.clone())
    }

    async fn remote_indices(
        &self,
        cluster: &NamePattern,
    ) -> Result<Vec<RemoteIndexWithAliases>, LookupError> {
        Self::fail_when(self.failures.remote_indices)?;
        Ok(self
            .remotes
            .iter()
            .filter(|entry| cluster.matches(&entry.cluster))
            .cloned()
            .collect())
    }

    async fn templates(&self) -> Result<TemplateCatalog, LookupError> {
        Self::fail_when(self.failures.templates)?;
        Ok(self.templates.clone())
    }

    async fn snapshots(&self, repository: &str) -> Result<Vec<String>, LookupError> {
        Self::fail_when(self.failures.snapshots)?;
        Ok(self.snapshots.get(repository).cloned().unwrap_or_default())
    }

    async fn repositories(&self) -> Result<Vec<String>, LookupError> {
        Self::fail_when(self.failures.repositories)?;
        Ok(self.repositories.clone())
    }
}

// ============================================================================
// SECTION: Auth Stub
// ============================================================================

/// Static auth backend mapping users and tokens to groups.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    /// Groups per user identifier.
    pub groups: BTreeMap<String, Vec<String>>,
    /// JWT tokens mapped to an identity.
    pub tokens: BTreeMap<String, (String, Vec<String>)>,
}

#[async_trait]
impl AuthBackend for StaticAuth {
    async fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<Option<AuthenticatedUser>, LookupError> {
        let identity = match credential {
            Credential::Basic {
                user, ..
            }
            | Credential::ProxyHeader {
                user,
            } => self.groups.get(user).map(|groups| (user.clone(), groups.clone())),
            Credential::Jwt {
                token,
            } => self.tokens.get(token).cloned(),
            Credential::ApiKey {
                ..
            } => None,
        };
        Ok(identity.map(|(user, groups)| AuthenticatedUser {
            id: UserName::new(user),
            groups: groups.into_iter().map(GroupName::new).collect(),
        }))
    }
}

// ============================================================================
// SECTION: Environment Stub
// ============================================================================

/// Fixed-map environment provider.
#[derive(Debug, Clone, Default)]
pub struct StubEnv {
    pub values: BTreeMap<String, String>,
}

impl EnvVarProvider for StubEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

// ============================================================================
// SECTION: Service Assembly
// ============================================================================

/// Builds evaluation services over stub collaborators.
pub fn services(cluster: StubCluster, auth: StaticAuth) -> EvalServices {
    EvalServices {
        cluster: Arc::new(ClusterStateFacade::new(Arc::new(cluster), FacadeConfig::default())),
        auth: Arc::new(auth),
        env: Arc::new(StubEnv::default()),
        ids: Arc::new(CounterIdGenerator::default()),
    }
}

/// Builds evaluation services with a custom environment.
pub fn services_with_env(cluster: StubCluster, auth: StaticAuth, env: StubEnv) -> EvalServices {
    EvalServices {
        cluster: Arc::new(ClusterStateFacade::new(Arc::new(cluster), FacadeConfig::default())),
        auth: Arc::new(auth),
        env: Arc::new(env),
        ids: Arc::new(CounterIdGenerator::default()),
    }
}

// ============================================================================
// SECTION: Request Builders
// ============================================================================

/// Parses index names, panicking on fixture typos.
pub fn indices(names: &[&str]) -> Vec<IndexName> {
    names
        .iter()
        .map(|name| IndexName::parse(name).unwrap_or_else(|err| panic!("bad fixture {name}: {err}")))
        .collect()
}

/// Builds a search request over the given indices.
pub fn search_request(targets: &[&str]) -> Request {
    Request {
        id: "req-1".to_string(),
        action: ActionName::new("indices:data/read/search"),
        uri_path: format!("/{}/_search", targets.join(",")),
        headers: BTreeMap::new(),
        payload: RequestPayload::GeneralIndex {
            indices: indices(targets),
        },
    }
}

/// Builds a multi-search request with one pack per inner query.
pub fn msearch_request(packs: &[&[&str]]) -> Request {
    Request {
        id: "req-1".to_string(),
        action: ActionName::new("indices:data/read/msearch"),
        uri_path: "/_msearch".to_string(),
        headers: BTreeMap::new(),
        payload: RequestPayload::MultiIndex {
            packs: packs.iter().map(|pack| indices(pack)).collect(),
        },
    }
}

/// Adds a basic `Authorization` header to a request.
pub fn with_basic_auth(mut request: Request, user: &str, secret: &str) -> Request {
    let encoded = STANDARD.encode(format!("{user}:{secret}"));
    request.headers.insert("authorization".to_string(), format!("Basic {encoded}"));
    request
}

/// Builds the admitted set in wire form for assertions.
pub fn wire_set(set: &BTreeSet<IndexName>) -> Vec<String> {
    set.iter().map(IndexName::to_wire).collect()
}
