//! The interception front end.
//!
//! The scripting engine calls into an [`Interceptor`] once per attempted
//! operation. Each event is resolved to the member it would actually reach,
//! checked against the whitelist, and then either handed back to the engine
//! through the `proceed` closure or aborted with a rejection naming what was
//! denied.
//!
//! Every `on_*` event has an `authorize_*` counterpart performing only the
//! check, for engines that want to run the operation themselves.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::member::{FieldRef, MethodRef};
use crate::resolver::Resolver;
use crate::types::{self, TypeRegistry};
use crate::value::{Value, describe_args};
use crate::whitelist::Whitelist;
use crate::{Error, Result};

/// How a permitted method call is to be carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodDispatch {
    /// The resolved method itself.
    Direct,
    /// Operator sugar the engine implements natively, such as arithmetic
    /// on numbers or string concatenation.
    Builtin,
    /// Routed through the receiver's `invokeMethod(String, Object)`.
    CatchAll,
    /// A static extension method of `holder` taking the receiver first.
    Extension { holder: String },
}

/// Which mechanism a permitted property access goes through.
///
/// When several mechanisms exist the first permitted one in declaration
/// order wins, and the engine must use that one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAccess {
    /// Entry lookup on a map receiver.
    MapEntry,
    /// `length` of an array.
    ArrayLength,
    Field,
    /// `getX()` / `setX(value)`.
    Accessor,
    /// The receiver's generic `getProperty` / `setProperty`.
    PropertyMethod,
    /// Static field, through a type object or an instance.
    StaticField,
}

/// Checks script operations against a whitelist.
#[derive(Debug, Clone)]
pub struct Interceptor {
    resolver: Resolver,
    whitelist: Arc<dyn Whitelist>,
}

impl Interceptor {
    pub fn new(registry: Arc<TypeRegistry>, whitelist: Arc<dyn Whitelist>) -> Self {
        Self {
            resolver: Resolver::new(registry),
            whitelist,
        }
    }

    /// An interceptor enforcing the process-wide aggregate, see [`crate::all`].
    pub fn with_global_whitelist(registry: Arc<TypeRegistry>) -> Self {
        Self::new(registry, crate::all())
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn whitelist(&self) -> &Arc<dyn Whitelist> {
        &self.whitelist
    }

    /// `receiver.method(args)`.
    pub fn on_method_call<T>(
        &self,
        receiver: &Value,
        method: &str,
        args: &[Value],
        proceed: impl FnOnce(MethodDispatch) -> Result<T>,
    ) -> Result<T> {
        let dispatch = self.authorize_method_call(receiver, method, args)?;
        proceed(dispatch)
    }

    /// `new type_name(args)`.
    pub fn on_constructor_call<T>(
        &self,
        type_name: &str,
        args: &[Value],
        proceed: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        self.authorize_constructor_call(type_name, args)?;
        proceed()
    }

    /// `type_name.method(args)` for a static method.
    pub fn on_static_call<T>(
        &self,
        type_name: &str,
        method: &str,
        args: &[Value],
        proceed: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        self.authorize_static_call(type_name, method, args)?;
        proceed()
    }

    /// Direct field read, bypassing accessors.
    pub fn on_field_get<T>(
        &self,
        receiver: &Value,
        field: &str,
        proceed: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        self.authorize_field_get(receiver, field)?;
        proceed()
    }

    /// Direct field write, bypassing accessors.
    pub fn on_field_set<T>(
        &self,
        receiver: &Value,
        field: &str,
        value: &Value,
        proceed: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        self.authorize_field_set(receiver, field, value)?;
        proceed()
    }

    /// `receiver.property` as an rvalue.
    pub fn on_get_property<T>(
        &self,
        receiver: &Value,
        property: &str,
        proceed: impl FnOnce(PropertyAccess) -> Result<T>,
    ) -> Result<T> {
        let access = self.authorize_get_property(receiver, property)?;
        proceed(access)
    }

    /// `receiver.property = value`.
    pub fn on_set_property<T>(
        &self,
        receiver: &Value,
        property: &str,
        value: &Value,
        proceed: impl FnOnce(PropertyAccess) -> Result<T>,
    ) -> Result<T> {
        let access = self.authorize_set_property(receiver, property, value)?;
        proceed(access)
    }

    pub fn authorize_method_call(
        &self,
        receiver: &Value,
        method: &str,
        args: &[Value],
    ) -> Result<MethodDispatch> {
        let Some(resolved) = self.resolver.resolve_method(receiver, method, args) else {
            return self.unresolved_method_call(receiver, method, args);
        };
        if self.permits_call(&resolved, receiver, args) {
            trace!(signature = %resolved.signature(), "permitted");
            return Ok(MethodDispatch::Direct);
        }
        if method == "invokeMethod" {
            if let [Value::Str(target), Value::Array { items, .. }] = args {
                let info = format!(
                    "{} {}{}",
                    receiver.display_type(),
                    target,
                    describe_args(items)
                );
                return Err(self.deny(Error::Rejected {
                    signature: resolved.signature().to_string(),
                    info: Some(info),
                }));
            }
        }
        Err(self.deny(Error::rejected(resolved.signature())))
    }

    fn unresolved_method_call(
        &self,
        receiver: &Value,
        method: &str,
        args: &[Value],
    ) -> Result<MethodDispatch> {
        if receiver.is_number() || (matches!(receiver, Value::Str(_)) && method == "plus") {
            trace!(method, "builtin operator");
            return Ok(MethodDispatch::Builtin);
        }
        if self.has_catch_all(receiver) {
            debug!(receiver = %receiver.display_type(), method, "routing through invokeMethod");
            let packed = [
                Value::str(method),
                Value::array(types::OBJECT, args.to_vec()),
            ];
            self.authorize_method_call(receiver, "invokeMethod", &packed)?;
            return Ok(MethodDispatch::CatchAll);
        }
        let mut self_args = Vec::with_capacity(args.len() + 1);
        self_args.push(receiver.clone());
        self_args.extend_from_slice(args);
        for holder in self.resolver.registry().extension_holders() {
            if self
                .resolver
                .resolve_static_method(holder, method, &self_args)
                .is_some()
            {
                debug!(receiver = %receiver.display_type(), method, %holder, "extension method");
                self.authorize_static_call(holder, method, &self_args)?;
                return Ok(MethodDispatch::Extension {
                    holder: holder.clone(),
                });
            }
        }
        Err(self.deny(Error::unclassified(format!(
            "method {} {}{}",
            receiver.display_type(),
            method,
            describe_args(args)
        ))))
    }

    /// Whether the receiver's type declares `invokeMethod(String, Object)`.
    fn has_catch_all(&self, receiver: &Value) -> bool {
        let Some(type_name) = receiver.type_name() else {
            return false;
        };
        self.resolver
            .registry()
            .lineage_defs(&type_name)
            .iter()
            .flat_map(|def| def.methods.iter())
            .any(|m| {
                m.name == "invokeMethod"
                    && !m.modifiers.is_static
                    && m.params == [types::STRING, types::OBJECT]
            })
    }

    pub fn authorize_constructor_call(&self, type_name: &str, args: &[Value]) -> Result<()> {
        let Some(constructor) = self.resolver.resolve_constructor(type_name, args) else {
            return Err(self.deny(Error::unclassified(format!(
                "new {}{}",
                type_name,
                describe_args(args)
            ))));
        };
        if self.whitelist.permits_constructor(&constructor, args) {
            trace!(signature = %constructor.signature(), "permitted");
            return Ok(());
        }
        Err(self.deny(Error::rejected(constructor.signature())))
    }

    pub fn authorize_static_call(&self, type_name: &str, method: &str, args: &[Value]) -> Result<()> {
        let Some(resolved) = self.resolver.resolve_static_method(type_name, method, args) else {
            return Err(self.deny(Error::unclassified(format!(
                "staticMethod {} {}{}",
                type_name,
                method,
                describe_args(args)
            ))));
        };
        if self.whitelist.permits_static_method(&resolved, args) {
            trace!(signature = %resolved.signature(), "permitted");
            return Ok(());
        }
        Err(self.deny(Error::rejected(resolved.signature())))
    }

    pub fn authorize_field_get(&self, receiver: &Value, field: &str) -> Result<()> {
        let resolved = self.resolve_any_field(receiver, field)?;
        if self.permits_read(&resolved, receiver) {
            return Ok(());
        }
        Err(self.deny(Error::rejected(resolved.signature())))
    }

    pub fn authorize_field_set(&self, receiver: &Value, field: &str, value: &Value) -> Result<()> {
        let resolved = self.resolve_any_field(receiver, field)?;
        if self.permits_write(&resolved, receiver, value) {
            return Ok(());
        }
        Err(self.deny(Error::rejected(resolved.signature())))
    }

    /// Instance field of the receiver, or static field of a type object.
    fn resolve_any_field(&self, receiver: &Value, field: &str) -> Result<FieldRef> {
        let resolved = match receiver.as_type() {
            Some(type_name) => self.resolver.resolve_static_field(type_name, field),
            None => self.resolver.resolve_field(receiver, field),
        };
        resolved.ok_or_else(|| {
            self.deny(Error::unclassified(format!(
                "field {} {}",
                receiver.display_type(),
                field
            )))
        })
    }

    pub fn authorize_get_property(&self, receiver: &Value, property: &str) -> Result<PropertyAccess> {
        if self.is_map(receiver) {
            return Ok(PropertyAccess::MapEntry);
        }
        if property == "length" && receiver.is_array() {
            return Ok(PropertyAccess::ArrayLength);
        }
        let field = self.resolver.resolve_field(receiver, property);
        if let Some(f) = &field {
            if self.permits_read(f, receiver) {
                return Ok(field_access(f));
            }
        }
        let getter = self
            .resolver
            .resolve_method(receiver, &accessor("get", property), &[]);
        if let Some(m) = &getter {
            if self.permits_call(m, receiver, &[]) {
                return Ok(PropertyAccess::Accessor);
            }
        }
        let generic_args = [Value::str(property)];
        let generic = self
            .resolver
            .resolve_method(receiver, "getProperty", &generic_args);
        if let Some(m) = &generic {
            if self.permits_call(m, receiver, &generic_args) {
                return Ok(PropertyAccess::PropertyMethod);
            }
        }
        let static_field = receiver
            .as_type()
            .and_then(|t| self.resolver.resolve_static_field(t, property));
        if let Some(f) = &static_field {
            if self.permits_read(f, receiver) {
                return Ok(PropertyAccess::StaticField);
            }
        }
        Err(self.reject_property(
            receiver,
            property,
            PropertyCandidates {
                field,
                accessor: getter,
                generic,
                static_field,
            },
        ))
    }

    pub fn authorize_set_property(
        &self,
        receiver: &Value,
        property: &str,
        value: &Value,
    ) -> Result<PropertyAccess> {
        let field = self.resolver.resolve_field(receiver, property);
        if let Some(f) = &field {
            if self.permits_write(f, receiver, value) {
                return Ok(field_access(f));
            }
        }
        let setter_args = [value.clone()];
        let setter = self
            .resolver
            .resolve_method(receiver, &accessor("set", property), &setter_args);
        if let Some(m) = &setter {
            if self.permits_call(m, receiver, &setter_args) {
                return Ok(PropertyAccess::Accessor);
            }
        }
        let generic_args = [Value::str(property), value.clone()];
        let generic = self
            .resolver
            .resolve_method(receiver, "setProperty", &generic_args);
        if let Some(m) = &generic {
            if self.permits_call(m, receiver, &generic_args) {
                return Ok(PropertyAccess::PropertyMethod);
            }
        }
        let static_field = receiver
            .as_type()
            .and_then(|t| self.resolver.resolve_static_field(t, property));
        if let Some(f) = &static_field {
            if self.permits_write(f, receiver, value) {
                return Ok(PropertyAccess::StaticField);
            }
        }
        Err(self.reject_property(
            receiver,
            property,
            PropertyCandidates {
                field,
                accessor: setter,
                generic,
                static_field,
            },
        ))
    }

    /// Rejection citing the most specific mechanism that exists.
    fn reject_property(
        &self,
        receiver: &Value,
        property: &str,
        candidates: PropertyCandidates,
    ) -> Error {
        let err = match candidates {
            PropertyCandidates {
                field: Some(f), ..
            } => Error::rejected(f.signature()),
            PropertyCandidates {
                accessor: Some(m), ..
            } => Error::rejected(m.signature()),
            PropertyCandidates {
                generic: Some(m), ..
            } => Error::Rejected {
                signature: m.signature().to_string(),
                info: Some(format!("{}.{}", receiver.display_type(), property)),
            },
            PropertyCandidates {
                static_field: Some(f),
                ..
            } => Error::rejected(f.signature()),
            _ => Error::unclassified(format!(
                "field {} {}",
                receiver.display_type(),
                property
            )),
        };
        self.deny(err)
    }

    /// Map receivers of any registered map type.
    fn is_map(&self, receiver: &Value) -> bool {
        receiver.is_map()
            || receiver
                .type_name()
                .is_some_and(|t| self.resolver.registry().is(types::MAP, &t))
    }

    /// Instance or static check depending on how the field is declared, so
    /// the decision always agrees with the signature a rejection cites.
    fn permits_read(&self, field: &FieldRef, receiver: &Value) -> bool {
        if field.is_static() {
            self.whitelist.permits_static_field_get(field)
        } else {
            self.whitelist.permits_field_get(field, receiver)
        }
    }

    fn permits_write(&self, field: &FieldRef, receiver: &Value, value: &Value) -> bool {
        if field.is_static() {
            self.whitelist.permits_static_field_set(field, value)
        } else {
            self.whitelist.permits_field_set(field, receiver, value)
        }
    }

    /// Instance or static check depending on how the method is declared.
    fn permits_call(&self, method: &MethodRef, receiver: &Value, args: &[Value]) -> bool {
        if method.is_static() {
            self.whitelist.permits_static_method(method, args)
        } else {
            self.whitelist.permits_method(method, receiver, args)
        }
    }

    fn deny(&self, err: Error) -> Error {
        warn!(signature = err.signature().unwrap_or("-"), "{err}");
        err
    }
}

struct PropertyCandidates {
    field: Option<FieldRef>,
    accessor: Option<MethodRef>,
    generic: Option<MethodRef>,
    static_field: Option<FieldRef>,
}

fn field_access(field: &FieldRef) -> PropertyAccess {
    if field.is_static() {
        PropertyAccess::StaticField
    } else {
        PropertyAccess::Field
    }
}

/// `getFoo` / `setFoo` for property `foo`.
fn accessor(prefix: &str, property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("{prefix}{}{}", first.to_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}
