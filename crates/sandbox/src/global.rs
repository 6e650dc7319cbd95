//! The process-wide whitelist aggregate.
//!
//! Built lazily on first use from the registered sources. Registering or
//! replacing sources resets the aggregate in place, so interceptors holding
//! it see the change without being rebuilt.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::debug;

use crate::whitelist::{ProxyWhitelist, Whitelist};

struct Global {
    proxy: Arc<ProxyWhitelist>,
    sources: Mutex<Vec<Arc<dyn Whitelist>>>,
}

static GLOBAL: OnceLock<Global> = OnceLock::new();

fn global() -> &'static Global {
    GLOBAL.get_or_init(|| Global {
        proxy: ProxyWhitelist::new([]),
        sources: Mutex::new(Vec::new()),
    })
}

/// Every registered whitelist, aggregated.
pub fn all() -> Arc<ProxyWhitelist> {
    global().proxy.clone()
}

/// Adds a source to the aggregate.
pub fn register(source: Arc<dyn Whitelist>) {
    let global = global();
    let mut sources = global.sources.lock();
    sources.push(source);
    debug!(sources = sources.len(), "whitelist source registered");
    global.proxy.reset(sources.iter().cloned());
}

/// Replaces every source of the aggregate.
pub fn set_sources(new_sources: impl IntoIterator<Item = Arc<dyn Whitelist>>) {
    let global = global();
    let mut sources = global.sources.lock();
    *sources = new_sources.into_iter().collect();
    debug!(sources = sources.len(), "whitelist sources replaced");
    global.proxy.reset(sources.iter().cloned());
}
