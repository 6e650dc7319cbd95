//! Same-origin policy for script-defined types.

use super::Whitelist;
use crate::member::{ConstructorRef, FieldRef, MethodRef};
use crate::types::{Origin, TypeDef};
use crate::value::Value;

/// Permits members of types compiled from one script.
///
/// A script may use whatever it defines itself, except compiler-generated
/// members. Of those only the few the engine needs to run ordinary script
/// code stay reachable: an inner type's `this$N` outer-instance field, an
/// enum's static `$VALUES` field and `$INIT` method, and the constructors
/// of anonymous types, which take the enclosing instance first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginWhitelist {
    origin: Origin,
}

impl OriginWhitelist {
    pub fn new(origin: Origin) -> Self {
        Self { origin }
    }

    /// Same-origin policy for script compilation unit `id`.
    pub fn script(id: u32) -> Self {
        Self::new(Origin::Script(id))
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    fn owns(&self, def: &TypeDef) -> bool {
        def.origin == self.origin
    }

    fn method_ok(&self, method: &MethodRef) -> bool {
        let owner = method.declaring_type();
        if !self.owns(owner) {
            return false;
        }
        let def = method.def();
        !def.modifiers.synthetic
            || (owner.is_enum() && def.modifiers.is_static && def.name == "$INIT")
    }

    fn field_ok(&self, field: &FieldRef) -> bool {
        let owner = field.declaring_type();
        if !self.owns(owner) {
            return false;
        }
        let def = field.def();
        if !def.modifiers.synthetic {
            return true;
        }
        let outer_instance = def.name.starts_with("this$")
            && owner.enclosing.as_deref() == Some(def.type_name.as_str());
        let enum_values = owner.is_enum() && def.modifiers.is_static && def.name == "$VALUES";
        outer_instance || enum_values
    }
}

impl Whitelist for OriginWhitelist {
    fn permits_method(&self, method: &MethodRef, _receiver: &Value, _args: &[Value]) -> bool {
        self.method_ok(method)
    }

    fn permits_constructor(&self, constructor: &ConstructorRef, _args: &[Value]) -> bool {
        let owner = constructor.declaring_type();
        if !self.owns(owner) {
            return false;
        }
        !constructor.def().modifiers.synthetic
            || (owner.enclosing.is_some()
                && constructor.params().first().map(String::as_str) == owner.enclosing.as_deref())
    }

    fn permits_static_method(&self, method: &MethodRef, _args: &[Value]) -> bool {
        self.method_ok(method)
    }

    fn permits_field_get(&self, field: &FieldRef, _receiver: &Value) -> bool {
        self.field_ok(field)
    }

    fn permits_field_set(&self, field: &FieldRef, _receiver: &Value, _value: &Value) -> bool {
        self.field_ok(field)
    }

    fn permits_static_field_get(&self, field: &FieldRef) -> bool {
        self.field_ok(field)
    }

    fn permits_static_field_set(&self, field: &FieldRef, _value: &Value) -> bool {
        self.field_ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::types::{ConstructorDef, FieldDef, MethodDef, TypeRegistry};
    use std::sync::Arc;

    fn resolver() -> Resolver {
        let registry = TypeRegistry::with_builtins()
            .with(
                TypeDef::class("Script1")
                    .defined_by(Origin::Script(1))
                    .method("run", &[])
                    .with_method(MethodDef::new("$getStaticMetaClass", &[]).synthetic())
                    .field("count", "int")
                    .with_field(FieldDef::new("$staticClassInfo", "java.lang.Object").into_static().synthetic()),
            )
            .with(
                TypeDef::class("Script1$1")
                    .defined_by(Origin::Script(1))
                    .enclosed_by("Script1")
                    .with_field(FieldDef::new("this$0", "Script1").synthetic())
                    .with_field(FieldDef::new("this$1", "java.lang.Object").synthetic())
                    .with_constructor(ConstructorDef::new(&["Script1"]).synthetic()),
            )
            .with(
                TypeDef::class("Script1$Inner")
                    .defined_by(Origin::Script(1))
                    .with_constructor(ConstructorDef::new(&["int"]).synthetic()),
            )
            .with(
                TypeDef::enumeration("Script1$Color")
                    .defined_by(Origin::Script(1))
                    .with_field(FieldDef::new("$VALUES", "Script1$Color[]").into_static().synthetic())
                    .with_method(MethodDef::new("$INIT", &["java.lang.Object[]"]).into_static().synthetic()),
            )
            .with(TypeDef::class("Other").defined_by(Origin::Script(2)).method("run", &[]));
        Resolver::new(Arc::new(registry))
    }

    #[test]
    fn test_permits_own_members() {
        let r = resolver();
        let wl = OriginWhitelist::script(1);
        let script = Value::object("Script1");
        let run = r.resolve_method(&script, "run", &[]).unwrap();
        assert!(wl.permits_method(&run, &script, &[]));
        let count = r.resolve_field(&script, "count").unwrap();
        assert!(wl.permits_field_set(&count, &script, &Value::Int(2)));
    }

    #[test]
    fn test_denies_other_origins() {
        let r = resolver();
        let wl = OriginWhitelist::script(1);
        let other = Value::object("Other");
        let run = r.resolve_method(&other, "run", &[]).unwrap();
        assert!(!wl.permits_method(&run, &other, &[]));
        let s = Value::from("x");
        let length = r.resolve_method(&s, "length", &[]).unwrap();
        assert!(!wl.permits_method(&length, &s, &[]));
    }

    #[test]
    fn test_synthetic_members_are_excluded() {
        let r = resolver();
        let wl = OriginWhitelist::script(1);
        let script = Value::object("Script1");
        let meta = r.resolve_method(&script, "$getStaticMetaClass", &[]).unwrap();
        assert!(!wl.permits_method(&meta, &script, &[]));
        let info = r.resolve_static_field("Script1", "$staticClassInfo").unwrap();
        assert!(!wl.permits_static_field_get(&info));
        let inner = r.resolve_constructor("Script1$Inner", &[Value::Int(1)]).unwrap();
        assert!(!wl.permits_constructor(&inner, &[Value::Int(1)]));
    }

    #[test]
    fn test_engine_synthetics_stay_reachable() {
        let r = resolver();
        let wl = OriginWhitelist::script(1);
        let anon = Value::object("Script1$1");
        let outer = r.resolve_field(&anon, "this$0").unwrap();
        assert!(wl.permits_field_get(&outer, &anon));
        let mistyped = r.resolve_field(&anon, "this$1").unwrap();
        assert!(!wl.permits_field_get(&mistyped, &anon));
        let ctor = r
            .resolve_constructor("Script1$1", &[Value::object("Script1")])
            .unwrap();
        assert!(wl.permits_constructor(&ctor, &[]));

        let values = r.resolve_static_field("Script1$Color", "$VALUES").unwrap();
        assert!(wl.permits_static_field_get(&values));
        let init = r
            .resolve_static_method("Script1$Color", "$INIT", &[Value::array("java.lang.Object", vec![])])
            .unwrap();
        assert!(wl.permits_static_method(&init, &[]));
    }
}
