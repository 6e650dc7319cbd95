use super::Whitelist;
use crate::member::{ConstructorRef, FieldRef, MethodRef};
use crate::value::Value;

/// Permits everything. Only for trusted scripts and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlanketWhitelist;

impl Whitelist for BlanketWhitelist {
    fn permits_method(&self, _method: &MethodRef, _receiver: &Value, _args: &[Value]) -> bool {
        true
    }

    fn permits_constructor(&self, _constructor: &ConstructorRef, _args: &[Value]) -> bool {
        true
    }

    fn permits_static_method(&self, _method: &MethodRef, _args: &[Value]) -> bool {
        true
    }

    fn permits_field_get(&self, _field: &FieldRef, _receiver: &Value) -> bool {
        true
    }

    fn permits_field_set(&self, _field: &FieldRef, _receiver: &Value, _value: &Value) -> bool {
        true
    }

    fn permits_static_field_get(&self, _field: &FieldRef) -> bool {
        true
    }

    fn permits_static_field_set(&self, _field: &FieldRef, _value: &Value) -> bool {
        true
    }
}
