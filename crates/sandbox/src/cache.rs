//! Memoisation of per-member permission decisions.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use crate::member::Member;
use crate::signature::Signature;
use crate::{Error, Result};

/// Identity of a resolved member under one kind of check.
///
/// Wildcard and supertype matches depend on the hierarchy the member was
/// resolved in, so the registry snapshot is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberKey {
    registry: u64,
    signature: String,
}

impl MemberKey {
    /// Key for `member` checked as `signature`.
    pub fn new(member: Member<'_>, signature: &Signature) -> Self {
        Self {
            registry: member.registry().id(),
            signature: signature.to_string(),
        }
    }
}

/// Decision cache keyed by member identity.
pub trait MemberCache: Send + Sync + fmt::Debug {
    /// Returns the cached decision for `key`, computing and storing it on a
    /// miss.
    fn get_or_compute(&self, key: &MemberKey, compute: &mut dyn FnMut() -> bool) -> bool;

    /// A new, empty cache of the same kind.
    fn fresh(&self) -> Arc<dyn MemberCache>;
}

/// Caches nothing; every lookup recomputes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl MemberCache for NoCache {
    fn get_or_compute(&self, _key: &MemberKey, compute: &mut dyn FnMut() -> bool) -> bool {
        compute()
    }

    fn fresh(&self) -> Arc<dyn MemberCache> {
        Arc::new(NoCache)
    }
}

/// Sharded concurrent map; lookups on distinct members never contend.
#[derive(Debug, Default)]
pub struct ConcurrentCache {
    entries: DashMap<MemberKey, bool>,
}

impl ConcurrentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MemberCache for ConcurrentCache {
    fn get_or_compute(&self, key: &MemberKey, compute: &mut dyn FnMut() -> bool) -> bool {
        if let Some(hit) = self.entries.get(key) {
            return *hit;
        }
        // Computed outside the shard lock; a racing writer stores the same answer.
        let decision = compute();
        self.entries.insert(key.clone(), decision);
        decision
    }

    fn fresh(&self) -> Arc<dyn MemberCache> {
        Arc::new(ConcurrentCache::new())
    }
}

/// Builds the cache backend named `name` (`"concurrent"` or `"none"`).
pub fn cache_backend(name: &str) -> Result<Arc<dyn MemberCache>> {
    match name {
        "concurrent" => Ok(Arc::new(ConcurrentCache::new())),
        "none" => Ok(Arc::new(NoCache)),
        other => Err(Error::UnsupportedHost(format!(
            "unknown cache backend `{other}`"
        ))),
    }
}

/// Like [`cache_backend`], degrading to [`NoCache`] on unknown names.
pub fn cache_backend_or_default(name: &str) -> Arc<dyn MemberCache> {
    cache_backend(name).unwrap_or_else(|e| {
        warn!(error = %e, "member caching disabled");
        Arc::new(NoCache)
    })
}
