//! End-to-end interception scenarios.

use std::sync::Arc;

use sandbox::identity::{self, Identity};
use sandbox::types::{Marker, MethodDef, TypeDef};
use sandbox::{
    AclAwareWhitelist, AnnotatedWhitelist, Error, Interceptor, MethodDispatch, PropertyAccess,
    ProxyWhitelist, Signature, StaticWhitelist, TypeRegistry, Value, Whitelist,
};

fn registry() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::with_builtins()
            .with(
                TypeDef::class("app.Person")
                    .field("name", "java.lang.String")
                    .method("getName", &[])
                    .method("setName", &["java.lang.String"])
                    .constructor(&[])
                    .constructor(&["java.lang.String"]),
            )
            .with(
                TypeDef::class("app.Service")
                    .with_method(MethodDef::new("status", &[]).marked(Marker::Unrestricted))
                    .with_method(MethodDef::new("shutdown", &[]).marked(Marker::Restricted)),
            ),
    )
}

fn listed(lines: &[&str]) -> Arc<dyn Whitelist> {
    Arc::new(StaticWhitelist::from_lines(lines).unwrap())
}

#[test]
fn string_length_is_permitted_when_listed() {
    let interceptor = Interceptor::new(registry(), listed(&["method java.lang.String length"]));
    let len = interceptor
        .on_method_call(&Value::from("abc"), "length", &[], |dispatch| {
            assert_eq!(dispatch, MethodDispatch::Direct);
            Ok(3)
        })
        .unwrap();
    assert_eq!(len, 3);
}

#[test]
fn empty_whitelist_rejects_with_signature() {
    let interceptor = Interceptor::new(registry(), listed(&[]));
    let err = interceptor
        .on_method_call(&Value::from("abc"), "length", &[], |_| Ok(()))
        .unwrap_err();
    assert_eq!(err.signature(), Some("method java.lang.String length"));
    assert_eq!(
        err.to_string(),
        "Scripts not permitted to use method java.lang.String length"
    );
    let approvable: Signature = err.signature().unwrap().parse().unwrap();
    let fixed = Interceptor::new(
        registry(),
        Arc::new(StaticWhitelist::from_signatures([approvable])),
    );
    assert!(
        fixed
            .authorize_method_call(&Value::from("abc"), "length", &[])
            .is_ok()
    );
}

#[test]
fn nonexistent_method_is_unclassified() {
    let interceptor = Interceptor::new(registry(), listed(&["method java.lang.Object *"]));
    let err = interceptor
        .on_method_call(&Value::object("app.Person"), "nonexistentMethod", &[], |_| Ok(()))
        .unwrap_err();
    assert!(matches!(err, Error::Unclassified { .. }));
    assert!(err.is_access_denial());
    assert_eq!(err.signature(), None);
}

#[test]
fn setter_permits_property_write_when_field_is_not_listed() {
    let interceptor = Interceptor::new(
        registry(),
        listed(&["method app.Person setName java.lang.String"]),
    );
    let person = Value::object("app.Person");
    let mut written = None;
    interceptor
        .on_set_property(&person, "name", &Value::from("Ada"), |access| {
            assert_eq!(access, PropertyAccess::Accessor);
            written = Some("Ada");
            Ok(())
        })
        .unwrap();
    assert_eq!(written, Some("Ada"));

    let err = interceptor
        .on_get_property(&person, "name", |_| Ok(()))
        .unwrap_err();
    assert_eq!(err.signature(), Some("field app.Person name"));
}

#[test]
fn constructors_and_static_calls() {
    let interceptor = Interceptor::new(
        registry(),
        listed(&[
            "new app.Person java.lang.String",
            "staticMethod java.lang.Integer parseInt java.lang.String",
        ]),
    );
    assert!(
        interceptor
            .on_constructor_call("app.Person", &[Value::from("Ada")], || Ok(()))
            .is_ok()
    );
    let err = interceptor
        .on_constructor_call("app.Person", &[], || Ok(()))
        .unwrap_err();
    assert_eq!(err.signature(), Some("new app.Person"));
    let n = interceptor
        .on_static_call("java.lang.Integer", "parseInt", &[Value::from("42")], || Ok(42))
        .unwrap();
    assert_eq!(n, 42);
}

#[test]
fn reset_propagates_through_nested_aggregates() {
    let base = ProxyWhitelist::new([]);
    let mid = ProxyWhitelist::new([base.clone() as Arc<dyn Whitelist>]);
    let top = ProxyWhitelist::new([mid.clone() as Arc<dyn Whitelist>]);
    let interceptor = Interceptor::new(registry(), top.clone());
    let abc = Value::from("abc");

    assert!(interceptor.authorize_method_call(&abc, "length", &[]).is_err());
    base.reset([listed(&["method java.lang.String length"])]);
    assert!(interceptor.authorize_method_call(&abc, "length", &[]).is_ok());
    base.reset([]);
    assert!(interceptor.authorize_method_call(&abc, "length", &[]).is_err());
}

#[test]
fn aggregation_is_idempotent() {
    let leaf = listed(&["method java.lang.String length", "field app.Person name"]);
    let once = ProxyWhitelist::new([leaf.clone()]);
    let twice = ProxyWhitelist::new([ProxyWhitelist::new([leaf]) as Arc<dyn Whitelist>]);
    assert_eq!(once.signatures(), twice.signatures());

    for whitelist in [once as Arc<dyn Whitelist>, twice as Arc<dyn Whitelist>] {
        let interceptor = Interceptor::new(registry(), whitelist);
        assert!(
            interceptor
                .authorize_method_call(&Value::from("x"), "length", &[])
                .is_ok()
        );
        assert!(
            interceptor
                .authorize_method_call(&Value::from("x"), "trim", &[])
                .is_err()
        );
    }
}

#[test]
fn acl_depends_on_identity() {
    let acl = AclAwareWhitelist::new(
        listed(&["method java.lang.String length"]),
        listed(&["method java.lang.String trim"]),
    );
    let interceptor = Interceptor::new(registry(), Arc::new(acl));
    let s = Value::from(" x ");
    assert!(interceptor.authorize_method_call(&s, "length", &[]).is_ok());
    assert!(interceptor.authorize_method_call(&s, "trim", &[]).is_err());

    let _guard = identity::impersonate(Identity::User("admin".into()));
    assert!(interceptor.authorize_method_call(&s, "trim", &[]).is_ok());
}

#[test]
fn annotated_members_under_aggregate() {
    let proxy = ProxyWhitelist::new([Arc::new(AnnotatedWhitelist::new()) as Arc<dyn Whitelist>]);
    let interceptor = Interceptor::new(registry(), proxy);
    let service = Value::object("app.Service");
    assert!(interceptor.authorize_method_call(&service, "status", &[]).is_ok());
    let err = interceptor
        .authorize_method_call(&service, "shutdown", &[])
        .unwrap_err();
    assert_eq!(err.signature(), Some("method app.Service shutdown"));
}

#[test]
fn global_aggregate_follows_registrations() {
    let interceptor = Interceptor::with_global_whitelist(registry());
    let abc = Value::from("abc");
    sandbox::set_sources([]);
    assert!(interceptor.authorize_method_call(&abc, "length", &[]).is_err());

    sandbox::register(listed(&["method java.lang.String length"]));
    assert!(interceptor.authorize_method_call(&abc, "length", &[]).is_ok());
    assert!(Arc::ptr_eq(&sandbox::all(), &sandbox::all()));

    sandbox::set_sources([]);
    assert!(interceptor.authorize_method_call(&abc, "length", &[]).is_err());
}
