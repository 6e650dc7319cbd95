//! Aggregation of whitelists with live reconfiguration.
//!
//! A [`ProxyWhitelist`] flattens what it aggregates: enumerating delegates
//! and the contents of nested proxies are merged into one internal
//! [`EnumeratingWhitelist`] with its own cache, and everything else is kept
//! as an opaque delegate. Nested proxies remember their parents weakly, so
//! resetting an inner proxy rebuilds every proxy wrapping it.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{EnumeratingWhitelist, Whitelist};
use crate::cache::{ConcurrentCache, MemberCache};
use crate::member::{ConstructorRef, FieldRef, MethodRef};
use crate::signature::Signature;
use crate::value::Value;

/// Permits whatever any of its delegates permits.
///
/// Always handled through an `Arc`: construction returns one, and nested
/// proxies hold weak references back to it.
pub struct ProxyWhitelist {
    this: Weak<ProxyWhitelist>,
    /// Delegates as last passed to [`reset`](Self::reset).
    declared: Mutex<Vec<Arc<dyn Whitelist>>>,
    state: RwLock<Flattened>,
    parents: DashMap<usize, Weak<ProxyWhitelist>>,
    /// Serialises resets of this proxy.
    resetting: Mutex<()>,
    cache: Arc<dyn MemberCache>,
}

#[derive(Debug, Clone)]
struct Flattened {
    enumerating: Arc<EnumeratingWhitelist>,
    opaque: Arc<[Arc<dyn Whitelist>]>,
}

impl ProxyWhitelist {
    pub fn new(delegates: impl IntoIterator<Item = Arc<dyn Whitelist>>) -> Arc<Self> {
        Self::with_cache(delegates, Arc::new(ConcurrentCache::new()))
    }

    /// Like [`new`](Self::new), memoising through caches of the same kind as
    /// `cache`. A fresh cache is used after every reset.
    pub fn with_cache(
        delegates: impl IntoIterator<Item = Arc<dyn Whitelist>>,
        cache: Arc<dyn MemberCache>,
    ) -> Arc<Self> {
        let proxy = Arc::new_cyclic(|this| Self {
            this: this.clone(),
            declared: Mutex::new(Vec::new()),
            state: RwLock::new(Flattened {
                enumerating: Arc::new(EnumeratingWhitelist::with_cache(cache.fresh())),
                opaque: Arc::from(Vec::new()),
            }),
            parents: DashMap::new(),
            resetting: Mutex::new(()),
            cache,
        });
        proxy.reset(delegates);
        proxy
    }

    /// Replaces the delegates and rebuilds every proxy wrapping this one.
    pub fn reset(&self, delegates: impl IntoIterator<Item = Arc<dyn Whitelist>>) {
        let mut path = HashSet::new();
        self.rebuild_with(Some(delegates.into_iter().collect()), &mut path);
    }

    /// Re-reads the current delegates, picking up changes in nested proxies.
    pub fn rebuild(&self) {
        let mut path = HashSet::new();
        self.rebuild_with(None, &mut path);
    }

    /// `path` holds the proxies currently being rebuilt up the call stack,
    /// which stops propagation around cycles.
    fn rebuild_with(&self, delegates: Option<Vec<Arc<dyn Whitelist>>>, path: &mut HashSet<usize>) {
        let key = self.key();
        path.insert(key);
        {
            let _serial = self.resetting.lock();
            let mut declared = self.declared.lock();
            if let Some(delegates) = delegates {
                *declared = delegates;
            }
            let flattened = self.flatten(&declared);
            debug!(
                signatures = flattened.enumerating.len(),
                opaque = flattened.opaque.len(),
                "whitelist aggregate rebuilt"
            );
            *self.state.write() = flattened;
        }
        self.notify_parents(path);
        path.remove(&key);
    }

    fn flatten(&self, delegates: &[Arc<dyn Whitelist>]) -> Flattened {
        let mut enumerating = EnumeratingWhitelist::with_cache(self.cache.fresh());
        let mut opaque: Vec<Arc<dyn Whitelist>> = Vec::new();
        for delegate in delegates {
            if let Some(child) = delegate.as_proxy() {
                if std::ptr::eq(child, self) {
                    continue;
                }
                child.add_parent(&self.this);
                let snapshot = child.snapshot();
                enumerating.merge(&snapshot.enumerating);
                for inner in snapshot.opaque.iter() {
                    push_unique(&mut opaque, inner);
                }
            } else if let Some(list) = delegate.as_enumerating() {
                enumerating.merge(list);
            } else {
                push_unique(&mut opaque, delegate);
            }
        }
        Flattened {
            enumerating: Arc::new(enumerating),
            opaque: Arc::from(opaque),
        }
    }

    fn add_parent(&self, parent: &Weak<ProxyWhitelist>) {
        self.parents
            .insert(Weak::as_ptr(parent) as usize, parent.clone());
    }

    fn notify_parents(&self, path: &mut HashSet<usize>) {
        let mut live = Vec::new();
        self.parents.retain(|_, parent| match parent.upgrade() {
            Some(p) => {
                live.push(p);
                true
            }
            None => false,
        });
        for parent in live {
            if !path.contains(&parent.key()) {
                parent.rebuild_with(None, path);
            }
        }
    }

    fn key(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }

    fn snapshot(&self) -> Flattened {
        self.state.read().clone()
    }

    /// The delegates this proxy was last reset with.
    pub fn delegates(&self) -> Vec<Arc<dyn Whitelist>> {
        self.declared.lock().clone()
    }

    /// The merged signature lists of every enumerating delegate.
    pub fn enumerating(&self) -> Arc<EnumeratingWhitelist> {
        self.snapshot().enumerating
    }

    /// Merged signatures, sorted and deduplicated.
    pub fn signatures(&self) -> Vec<Signature> {
        let mut all: Vec<Signature> = self.enumerating().signatures().cloned().collect();
        all.sort();
        all.dedup();
        all
    }

    /// Number of live proxies wrapping this one.
    pub fn parent_count(&self) -> usize {
        self.parents
            .iter()
            .filter(|p| p.value().strong_count() > 0)
            .count()
    }
}

fn push_unique(list: &mut Vec<Arc<dyn Whitelist>>, whitelist: &Arc<dyn Whitelist>) {
    let ptr = Arc::as_ptr(whitelist).cast::<()>();
    if !list.iter().any(|w| Arc::as_ptr(w).cast::<()>() == ptr) {
        list.push(whitelist.clone());
    }
}

impl fmt::Debug for ProxyWhitelist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.snapshot();
        f.debug_struct("ProxyWhitelist")
            .field("signatures", &state.enumerating.len())
            .field("opaque", &state.opaque.len())
            .field("parents", &self.parents.len())
            .finish()
    }
}

impl Whitelist for ProxyWhitelist {
    fn permits_method(&self, method: &MethodRef, receiver: &Value, args: &[Value]) -> bool {
        let s = self.snapshot();
        s.enumerating.permits_method(method, receiver, args)
            || s.opaque.iter().any(|w| w.permits_method(method, receiver, args))
    }

    fn permits_constructor(&self, constructor: &ConstructorRef, args: &[Value]) -> bool {
        let s = self.snapshot();
        s.enumerating.permits_constructor(constructor, args)
            || s.opaque.iter().any(|w| w.permits_constructor(constructor, args))
    }

    fn permits_static_method(&self, method: &MethodRef, args: &[Value]) -> bool {
        let s = self.snapshot();
        s.enumerating.permits_static_method(method, args)
            || s.opaque.iter().any(|w| w.permits_static_method(method, args))
    }

    fn permits_field_get(&self, field: &FieldRef, receiver: &Value) -> bool {
        let s = self.snapshot();
        s.enumerating.permits_field_get(field, receiver)
            || s.opaque.iter().any(|w| w.permits_field_get(field, receiver))
    }

    fn permits_field_set(&self, field: &FieldRef, receiver: &Value, value: &Value) -> bool {
        let s = self.snapshot();
        s.enumerating.permits_field_set(field, receiver, value)
            || s.opaque.iter().any(|w| w.permits_field_set(field, receiver, value))
    }

    fn permits_static_field_get(&self, field: &FieldRef) -> bool {
        let s = self.snapshot();
        s.enumerating.permits_static_field_get(field)
            || s.opaque.iter().any(|w| w.permits_static_field_get(field))
    }

    fn permits_static_field_set(&self, field: &FieldRef, value: &Value) -> bool {
        let s = self.snapshot();
        s.enumerating.permits_static_field_set(field, value)
            || s.opaque.iter().any(|w| w.permits_static_field_set(field, value))
    }

    fn as_proxy(&self) -> Option<&ProxyWhitelist> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::types::TypeRegistry;
    use crate::whitelist::{AnnotatedWhitelist, BlanketWhitelist, StaticWhitelist};

    fn listed(text: &str) -> Arc<dyn Whitelist> {
        Arc::new(StaticWhitelist::from_text(text).unwrap())
    }

    fn length() -> MethodRef {
        let r = Resolver::new(Arc::new(TypeRegistry::with_builtins()));
        r.resolve_method(&Value::from("abc"), "length", &[]).unwrap()
    }

    fn permits_length(w: &dyn Whitelist) -> bool {
        w.permits_method(&length(), &Value::from("abc"), &[])
    }

    #[test]
    fn test_flattens_enumerating_delegates() {
        let proxy = ProxyWhitelist::new([
            listed("method java.lang.String length"),
            listed("method java.lang.String trim\nmethod java.lang.String length"),
            Arc::new(AnnotatedWhitelist::new()) as Arc<dyn Whitelist>,
        ]);
        assert_eq!(proxy.enumerating().len(), 2);
        assert_eq!(proxy.snapshot().opaque.len(), 1);
        assert!(permits_length(proxy.as_ref()));
    }

    #[test]
    fn test_nesting_is_idempotent() {
        let inner = ProxyWhitelist::new([
            listed("method java.lang.String length"),
            Arc::new(AnnotatedWhitelist::new()) as Arc<dyn Whitelist>,
        ]);
        let outer = ProxyWhitelist::new([inner.clone() as Arc<dyn Whitelist>]);
        assert_eq!(outer.signatures(), inner.signatures());
        assert_eq!(outer.snapshot().opaque.len(), inner.snapshot().opaque.len());
        assert_eq!(permits_length(outer.as_ref()), permits_length(inner.as_ref()));

        let twice = ProxyWhitelist::new([
            inner.clone() as Arc<dyn Whitelist>,
            inner.clone() as Arc<dyn Whitelist>,
        ]);
        assert_eq!(twice.signatures(), inner.signatures());
        assert_eq!(twice.snapshot().opaque.len(), 1);
    }

    #[test]
    fn test_reset_propagates_to_every_ancestor() {
        let base = ProxyWhitelist::new([]);
        let mid = ProxyWhitelist::new([base.clone() as Arc<dyn Whitelist>]);
        let top = ProxyWhitelist::new([mid.clone() as Arc<dyn Whitelist>]);
        assert!(!permits_length(top.as_ref()));

        base.reset([listed("method java.lang.String length")]);
        assert!(permits_length(mid.as_ref()));
        assert!(permits_length(top.as_ref()));

        base.reset([]);
        assert!(!permits_length(top.as_ref()));
    }

    #[test]
    fn test_diamond_sees_final_state() {
        let base = ProxyWhitelist::new([]);
        let left = ProxyWhitelist::new([base.clone() as Arc<dyn Whitelist>]);
        let right = ProxyWhitelist::new([base.clone() as Arc<dyn Whitelist>]);
        let top = ProxyWhitelist::new([
            left.clone() as Arc<dyn Whitelist>,
            right.clone() as Arc<dyn Whitelist>,
        ]);
        base.reset([Arc::new(BlanketWhitelist) as Arc<dyn Whitelist>]);
        assert!(permits_length(top.as_ref()));
        assert_eq!(top.snapshot().opaque.len(), 1);
    }

    #[test]
    fn test_dropped_parents_are_pruned() {
        let base = ProxyWhitelist::new([]);
        let parent = ProxyWhitelist::new([base.clone() as Arc<dyn Whitelist>]);
        assert_eq!(base.parent_count(), 1);
        drop(parent);
        assert_eq!(base.parent_count(), 0);
        base.reset([listed("method java.lang.String length")]);
        assert!(base.parents.is_empty());
    }

    #[test]
    fn test_cycles_terminate() {
        let a = ProxyWhitelist::new([]);
        let b = ProxyWhitelist::new([a.clone() as Arc<dyn Whitelist>]);
        a.reset([
            b.clone() as Arc<dyn Whitelist>,
            listed("method java.lang.String length"),
        ]);
        assert!(permits_length(a.as_ref()));
        assert!(permits_length(b.as_ref()));
        a.reset([a.clone() as Arc<dyn Whitelist>]);
    }

    #[test]
    fn test_concurrent_resets_and_reads() {
        let base = ProxyWhitelist::new([]);
        let top = ProxyWhitelist::new([base.clone() as Arc<dyn Whitelist>]);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let base = base.clone();
                let top = top.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if i % 2 == 0 {
                            base.reset([listed("method java.lang.String length")]);
                        } else {
                            let _ = permits_length(top.as_ref());
                            ProxyWhitelist::new([top.clone() as Arc<dyn Whitelist>]);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(permits_length(top.as_ref()));
    }
}
