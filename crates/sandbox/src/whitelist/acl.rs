//! Identity-conditional composition.

use std::sync::Arc;

use super::Whitelist;
use crate::identity;
use crate::member::{ConstructorRef, FieldRef, MethodRef};
use crate::value::Value;

/// Combines a policy that always applies with one that applies only when a
/// real identity is attached to the execution.
///
/// Calls are permitted by `unrestricted`, or by `restricted` when the
/// current identity is not [`Identity::System`](crate::identity::Identity::System).
/// Field access only ever consults `unrestricted`.
#[derive(Debug, Clone)]
pub struct AclAwareWhitelist {
    unrestricted: Arc<dyn Whitelist>,
    restricted: Arc<dyn Whitelist>,
}

impl AclAwareWhitelist {
    pub fn new(unrestricted: Arc<dyn Whitelist>, restricted: Arc<dyn Whitelist>) -> Self {
        Self {
            unrestricted,
            restricted,
        }
    }

    fn acting_as_user() -> bool {
        !identity::current().is_system()
    }
}

impl Whitelist for AclAwareWhitelist {
    fn permits_method(&self, method: &MethodRef, receiver: &Value, args: &[Value]) -> bool {
        self.unrestricted.permits_method(method, receiver, args)
            || (self.restricted.permits_method(method, receiver, args) && Self::acting_as_user())
    }

    fn permits_constructor(&self, constructor: &ConstructorRef, args: &[Value]) -> bool {
        self.unrestricted.permits_constructor(constructor, args)
            || (self.restricted.permits_constructor(constructor, args) && Self::acting_as_user())
    }

    fn permits_static_method(&self, method: &MethodRef, args: &[Value]) -> bool {
        self.unrestricted.permits_static_method(method, args)
            || (self.restricted.permits_static_method(method, args) && Self::acting_as_user())
    }

    fn permits_field_get(&self, field: &FieldRef, receiver: &Value) -> bool {
        self.unrestricted.permits_field_get(field, receiver)
    }

    fn permits_field_set(&self, field: &FieldRef, receiver: &Value, value: &Value) -> bool {
        self.unrestricted.permits_field_set(field, receiver, value)
    }

    fn permits_static_field_get(&self, field: &FieldRef) -> bool {
        self.unrestricted.permits_static_field_get(field)
    }

    fn permits_static_field_set(&self, field: &FieldRef, value: &Value) -> bool {
        self.unrestricted.permits_static_field_set(field, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Identity, impersonate};
    use crate::resolver::Resolver;
    use crate::types::TypeRegistry;
    use crate::whitelist::{BlanketWhitelist, StaticWhitelist};

    fn acl(unrestricted: &str, restricted: &str) -> AclAwareWhitelist {
        AclAwareWhitelist::new(
            Arc::new(StaticWhitelist::from_text(unrestricted).unwrap()),
            Arc::new(StaticWhitelist::from_text(restricted).unwrap()),
        )
    }

    #[test]
    fn test_restricted_requires_real_identity() {
        let r = Resolver::new(Arc::new(TypeRegistry::with_builtins()));
        let s = Value::from("abc");
        let trim = r.resolve_method(&s, "trim", &[]).unwrap();
        let length = r.resolve_method(&s, "length", &[]).unwrap();
        let wl = acl("method java.lang.String length", "method java.lang.String trim");

        assert!(wl.permits_method(&length, &s, &[]));
        assert!(!wl.permits_method(&trim, &s, &[]));
        {
            let _user = impersonate(Identity::User("bob".into()));
            assert!(wl.permits_method(&trim, &s, &[]));
            assert!(wl.permits_method(&length, &s, &[]));
        }
        let _anon = impersonate(Identity::Anonymous);
        assert!(wl.permits_method(&trim, &s, &[]));
    }

    #[test]
    fn test_fields_ignore_restricted() {
        let r = Resolver::new(Arc::new(TypeRegistry::with_builtins()));
        let max = r.resolve_static_field("java.lang.Integer", "MAX_VALUE").unwrap();
        let wl = AclAwareWhitelist::new(
            Arc::new(StaticWhitelist::new()),
            Arc::new(BlanketWhitelist),
        );
        let _user = impersonate(Identity::User("bob".into()));
        assert!(!wl.permits_static_field_get(&max));
        assert!(!wl.permits_field_get(&max, &Value::type_of("java.lang.Integer")));
    }
}
