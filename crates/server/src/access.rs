//! The authorization gate.
//!
//! [`AccessChecker`] decides whether the caller of a request may view an
//! object. Rights records are fetched from the repository, parsed once,
//! and memoized in a [`TimeCache`] so repeated requests for the same
//! object do not refetch the rights document until the TTL lapses.

use async_trait::async_trait;
use axum::http::HeaderMap;
use portico_cache::TimeCache;
use portico_core::config::{AuthConfig, ResolverConfig};
use portico_core::{Access, RightsRecord, User, intersects, is_member};
use portico_repo::Repository;
use std::sync::Arc;
use time::OffsetDateTime;

/// Resolves the caller's identity for a request.
///
/// Implementations must return the anonymous user on failure or absence of
/// credentials, never an error. They may make network or database calls
/// and must support concurrent use.
#[async_trait]
pub trait IdentityResolver: Send + Sync + 'static {
    async fn resolve(&self, headers: &HeaderMap) -> User;
}

/// Trusts identity headers stamped by a fronting SSO proxy.
///
/// The user header carries the id; the groups header a comma-separated
/// group list. Only safe when the proxy strips these headers from client
/// requests.
pub struct HeaderResolver {
    user_header: String,
    groups_header: String,
}

impl HeaderResolver {
    pub fn new(user_header: impl Into<String>, groups_header: impl Into<String>) -> Self {
        Self {
            user_header: user_header.into(),
            groups_header: groups_header.into(),
        }
    }
}

#[async_trait]
impl IdentityResolver for HeaderResolver {
    async fn resolve(&self, headers: &HeaderMap) -> User {
        let id = headers
            .get(&self.user_header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .trim()
            .to_string();
        if id.is_empty() {
            return User::anonymous();
        }
        let groups = headers
            .get(&self.groups_header)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        User { id, groups }
    }
}

/// Resolver returning a fixed user regardless of the request. Test double.
pub struct FixedResolver(pub User);

#[async_trait]
impl IdentityResolver for FixedResolver {
    async fn resolve(&self, _headers: &HeaderMap) -> User {
        self.0.clone()
    }
}

/// Build a resolver from configuration, if one is configured.
pub fn resolver_from_config(config: &Option<ResolverConfig>) -> Option<Arc<dyn IdentityResolver>> {
    config.as_ref().map(|c| match c {
        ResolverConfig::Header {
            user_header,
            groups_header,
        } => {
            Arc::new(HeaderResolver::new(user_header, groups_header)) as Arc<dyn IdentityResolver>
        }
    })
}

/// Decides whether a request may view an object.
pub struct AccessChecker {
    repo: Arc<dyn Repository>,
    cache: TimeCache<Arc<RightsRecord>>,
    resolver: Option<Arc<dyn IdentityResolver>>,
    admin_users: Vec<String>,
    admin_groups: Vec<String>,
}

impl AccessChecker {
    /// Create a checker over the given repository. Must be called from
    /// within a tokio runtime (the rights cache spawns its sweeper here).
    pub fn new(
        repo: Arc<dyn Repository>,
        resolver: Option<Arc<dyn IdentityResolver>>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            repo,
            cache: TimeCache::new(config.cache_size, config.cache_ttl()),
            resolver,
            admin_users: config.admin_users.clone(),
            admin_groups: config.admin_groups.clone(),
        }
    }

    /// Decide whether the request carrying `headers` may view object `id`.
    ///
    /// The id is handed to the repository unaltered; the repository
    /// applies its own namespace prefix.
    pub async fn check(&self, headers: &HeaderMap, id: &str) -> Access {
        let Some(rights) = self.rights(id).await else {
            tracing::info!(object_id = %id, "rights not found");
            return Access::NotFound;
        };
        let now = OffsetDateTime::now_utc();

        // try the anonymous user first: public objects short-circuit
        // without paying for identity resolution
        if rights.decide(&User::anonymous(), now) == Access::Allow {
            tracing::info!(object_id = %id, "object is public");
            return Access::Allow;
        }

        // not public and no way to attribute the request to anyone
        let Some(resolver) = &self.resolver else {
            tracing::info!(object_id = %id, decision = "deny", "no identity resolver configured");
            return Access::Deny;
        };

        let user = resolver.resolve(headers).await;
        tracing::info!(object_id = %id, user_id = %user.id, groups = ?user.groups, "resolved user");

        if is_member(&user.id, &self.admin_users) || intersects(&user.groups, &self.admin_groups) {
            tracing::info!(object_id = %id, user_id = %user.id, "admin override");
            return Access::Allow;
        }

        let decision = rights.decide(&user, now);
        tracing::info!(object_id = %id, user_id = %user.id, decision = ?decision, "rights decision");
        decision
    }

    /// Fetch-or-reuse the parsed rights record for an object. Fetch and
    /// parse failures both collapse to `None` ("not found"); the parse
    /// failure is logged but deliberately not distinguished.
    async fn rights(&self, id: &str) -> Option<Arc<RightsRecord>> {
        if let Some(rights) = self.cache.get(id) {
            return Some(rights);
        }
        let body = match self.repo.rights_document(id).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(object_id = %id, error = %e, "rights document fetch failed");
                return None;
            }
        };
        let rights = match RightsRecord::from_xml(&body) {
            Ok(rights) => Arc::new(rights),
            Err(e) => {
                tracing::warn!(object_id = %id, error = %e, "rights document parse failed");
                return None;
            }
        };
        self.cache.put(id, rights.clone());
        Some(rights)
    }
}
