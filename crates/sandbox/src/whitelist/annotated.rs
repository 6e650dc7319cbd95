//! Policies driven by markers on member declarations.

use std::sync::Arc;

use super::{AclAwareWhitelist, Whitelist};
use crate::member::{ConstructorRef, FieldRef, MethodRef};
use crate::types::Marker;
use crate::value::Value;

/// Permits instance methods and constructors whose declaration carries a
/// whitelisting [`Marker`].
///
/// Unrestricted members are always callable; restricted ones only under a
/// real identity. Static methods and fields are never permitted here.
#[derive(Debug, Clone)]
pub struct AnnotatedWhitelist {
    acl: AclAwareWhitelist,
}

impl AnnotatedWhitelist {
    pub fn new() -> Self {
        Self {
            acl: AclAwareWhitelist::new(
                Arc::new(MarkedWith(Marker::Unrestricted)),
                Arc::new(MarkedWith(Marker::Restricted)),
            ),
        }
    }
}

impl Default for AnnotatedWhitelist {
    fn default() -> Self {
        Self::new()
    }
}

impl Whitelist for AnnotatedWhitelist {
    fn permits_method(&self, method: &MethodRef, receiver: &Value, args: &[Value]) -> bool {
        self.acl.permits_method(method, receiver, args)
    }

    fn permits_constructor(&self, constructor: &ConstructorRef, args: &[Value]) -> bool {
        self.acl.permits_constructor(constructor, args)
    }

    fn permits_static_method(&self, _method: &MethodRef, _args: &[Value]) -> bool {
        false
    }

    fn permits_field_get(&self, _field: &FieldRef, _receiver: &Value) -> bool {
        false
    }

    fn permits_field_set(&self, _field: &FieldRef, _receiver: &Value, _value: &Value) -> bool {
        false
    }
}

/// Members carrying exactly one marker.
#[derive(Debug, Clone, Copy)]
struct MarkedWith(Marker);

impl Whitelist for MarkedWith {
    fn permits_method(&self, method: &MethodRef, _receiver: &Value, _args: &[Value]) -> bool {
        method.def().marker == Some(self.0)
    }

    fn permits_constructor(&self, constructor: &ConstructorRef, _args: &[Value]) -> bool {
        constructor.def().marker == Some(self.0)
    }

    fn permits_static_method(&self, _method: &MethodRef, _args: &[Value]) -> bool {
        false
    }

    fn permits_field_get(&self, _field: &FieldRef, _receiver: &Value) -> bool {
        false
    }

    fn permits_field_set(&self, _field: &FieldRef, _receiver: &Value, _value: &Value) -> bool {
        false
    }
}
