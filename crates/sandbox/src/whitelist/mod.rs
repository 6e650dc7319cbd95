//! Whitelist policies.
//!
//! A [`Whitelist`] answers one question per resolved member: may a script
//! use it? Policies compose. [`ProxyWhitelist`] aggregates others and can be
//! reconfigured at runtime, [`AclAwareWhitelist`] conditions a policy on the
//! execution identity, and the enumerated, annotated, blanket and
//! same-origin policies are the leaves.

mod acl;
mod annotated;
mod blanket;
mod enumerating;
mod origin;
mod proxy;

use std::fmt;

pub use acl::AclAwareWhitelist;
pub use annotated::AnnotatedWhitelist;
pub use blanket::BlanketWhitelist;
pub use enumerating::{EnumeratingWhitelist, StaticWhitelist};
pub use origin::OriginWhitelist;
pub use proxy::ProxyWhitelist;

use crate::member::{ConstructorRef, FieldRef, MethodRef};
use crate::value::Value;

/// Permission checks for resolved members.
///
/// Every predicate receives the resolved member together with the receiver
/// and arguments of the attempted operation. Implementations must be cheap
/// and side-effect free apart from caching.
pub trait Whitelist: Send + Sync + fmt::Debug {
    fn permits_method(&self, method: &MethodRef, receiver: &Value, args: &[Value]) -> bool;

    fn permits_constructor(&self, constructor: &ConstructorRef, args: &[Value]) -> bool;

    fn permits_static_method(&self, method: &MethodRef, args: &[Value]) -> bool;

    fn permits_field_get(&self, field: &FieldRef, receiver: &Value) -> bool;

    fn permits_field_set(&self, field: &FieldRef, receiver: &Value, value: &Value) -> bool;

    fn permits_static_field_get(&self, _field: &FieldRef) -> bool {
        false
    }

    fn permits_static_field_set(&self, _field: &FieldRef, _value: &Value) -> bool {
        false
    }

    /// Signature lists an aggregator can merge instead of delegating to.
    fn as_enumerating(&self) -> Option<&EnumeratingWhitelist> {
        None
    }

    fn as_proxy(&self) -> Option<&ProxyWhitelist> {
        None
    }
}
