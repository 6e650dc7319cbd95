//! Execution identity attached to the current thread.
//!
//! Scripts run synchronously on the caller's thread, so the identity in
//! effect is thread-local. Restricted members are only callable when it is
//! something other than [`Identity::System`].

use std::cell::RefCell;

/// Who the current script execution acts as.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    /// The built-in system identity; no real user is attached.
    #[default]
    System,
    Anonymous,
    User(String),
}

impl Identity {
    pub fn is_system(&self) -> bool {
        matches!(self, Identity::System)
    }
}

thread_local! {
    static CURRENT: RefCell<Identity> = const { RefCell::new(Identity::System) };
}

/// The identity in effect on this thread.
pub fn current() -> Identity {
    CURRENT.with(|c| c.borrow().clone())
}

/// Acts as `identity` until the returned guard is dropped.
#[must_use = "the previous identity is restored when the guard is dropped"]
pub fn impersonate(identity: Identity) -> IdentityGuard {
    let previous = CURRENT.with(|c| c.replace(identity));
    IdentityGuard { previous }
}

/// Restores the previous identity on drop.
#[derive(Debug)]
pub struct IdentityGuard {
    previous: Identity,
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        let previous = std::mem::take(&mut self.previous);
        CURRENT.with(|c| *c.borrow_mut() = previous);
    }
}
