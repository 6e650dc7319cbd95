//! Call-site resolution.
//!
//! Determines which declared member a dynamic call would actually bind to.
//! Instance lookups search the receiver's whole lineage supertypes first,
//! so the answer is the *most general* declaration: whitelisting a base
//! type's method covers every override of it.
//!
//! A `None` result means no such member exists at all, which callers must
//! keep distinct from a member that exists but is not permitted.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

use tracing::trace;

use crate::member::{ConstructorRef, FieldRef, MethodRef};
use crate::signature::Signature;
use crate::types::{self, TypeDef, TypeRegistry, component_of, is_primitive, wrapper_of};
use crate::value::Value;

/// Resolves call sites against a [`TypeRegistry`].
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: Arc<TypeRegistry>,
}

impl Resolver {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// The most general method `receiver.name(args)` would invoke.
    pub fn resolve_method(&self, receiver: &Value, name: &str, args: &[Value]) -> Option<MethodRef> {
        let type_name = receiver.type_name()?;
        for def in self.registry.lineage_defs(&type_name) {
            if let Some(found) = self.find_method(&def, name, args) {
                return Some(found);
            }
        }
        // Interpolated strings answer to every String method.
        if matches!(receiver, Value::GString(_)) {
            let string = self.registry.get(types::STRING)?;
            return self.find_method(&string, name, args);
        }
        trace!(receiver = %type_name, method = name, "no method matched");
        None
    }

    /// The constructor `new type_name(args)` would invoke.
    ///
    /// When nothing matches and the only argument is a map, the no-argument
    /// constructor is chosen: the engine then assigns the map's entries as
    /// properties.
    pub fn resolve_constructor(&self, type_name: &str, args: &[Value]) -> Option<ConstructorRef> {
        let def = self.registry.get(type_name)?;
        let candidates = def.constructors.iter().enumerate().filter_map(|(i, c)| {
            self.arguments_match(&c.params, args, c.modifiers.varargs)
                .then_some((i, c.params.as_slice(), c.modifiers.varargs))
        });
        let best = self.most_specific(candidates, |i| {
            ConstructorRef::new(self.registry.clone(), def.clone(), i).signature()
        });
        if let Some(i) = best {
            return Some(ConstructorRef::new(self.registry.clone(), def, i));
        }
        if let [Value::Map(_)] = args {
            let i = def
                .constructors
                .iter()
                .position(|c| c.params.is_empty() && !c.modifiers.varargs)?;
            return Some(ConstructorRef::new(self.registry.clone(), def, i));
        }
        None
    }

    /// The method `type_name.name(args)` would invoke, searching only the
    /// type itself.
    pub fn resolve_static_method(
        &self,
        type_name: &str,
        name: &str,
        args: &[Value],
    ) -> Option<MethodRef> {
        let def = self.registry.get(type_name)?;
        self.find_method(&def, name, args)
    }

    /// The most general field named `name` visible on `receiver`.
    pub fn resolve_field(&self, receiver: &Value, name: &str) -> Option<FieldRef> {
        let type_name = receiver.type_name()?;
        self.registry
            .lineage_defs(&type_name)
            .into_iter()
            .find_map(|def| self.find_field(def, name))
    }

    /// The field named `name` declared by `type_name` itself.
    pub fn resolve_static_field(&self, type_name: &str, name: &str) -> Option<FieldRef> {
        let def = self.registry.get(type_name)?;
        self.find_field(def, name)
    }

    fn find_field(&self, def: Arc<TypeDef>, name: &str) -> Option<FieldRef> {
        let i = def.fields.iter().position(|f| f.name == name)?;
        Some(FieldRef::new(self.registry.clone(), def, i))
    }

    /// The most specific method of `def` itself accepting `args`.
    fn find_method(&self, def: &Arc<TypeDef>, name: &str, args: &[Value]) -> Option<MethodRef> {
        let candidates = def.methods.iter().enumerate().filter_map(|(i, m)| {
            (m.name == name && self.arguments_match(&m.params, args, m.modifiers.varargs))
                .then_some((i, m.params.as_slice(), m.modifiers.varargs))
        });
        let best = self.most_specific(candidates, |i| {
            MethodRef::new(self.registry.clone(), def.clone(), i).signature()
        });
        best.map(|i| MethodRef::new(self.registry.clone(), def.clone(), i))
    }

    /// Whether `args` can be passed to a member declaring `params`.
    ///
    /// Arity must be exact once varargs are packed. `null` fits any
    /// reference parameter but no primitive one.
    pub fn arguments_match(&self, params: &[String], args: &[Value], varargs: bool) -> bool {
        let args = if varargs {
            self.pack_varargs(params, args)
        } else {
            Cow::Borrowed(args)
        };
        params.len() == args.len()
            && params
                .iter()
                .zip(args.iter())
                .all(|(p, a)| self.value_is(p, a))
    }

    /// Whether one argument value fits one declared parameter type.
    pub fn value_is(&self, param: &str, value: &Value) -> bool {
        let Some(actual) = value.type_name() else {
            return !is_primitive(param);
        };
        if self.registry.is(param, &actual) {
            return true;
        }
        if is_primitive(param) && self.boxed_fits(param, value, &actual) {
            return true;
        }
        param == types::STRING && matches!(value, Value::GString(_))
    }

    /// Boxed values passed to primitive parameters, including `int` to
    /// `long` widening and in-range `long` to `int` narrowing.
    fn boxed_fits(&self, param: &str, value: &Value, actual: &str) -> bool {
        if self.registry.is(wrapper_of(param), actual) {
            return true;
        }
        match (param, value) {
            ("long", Value::Int(_)) => true,
            ("int", Value::Long(n)) => i32::try_from(*n).is_ok(),
            _ => false,
        }
    }

    /// Rewrites trailing arguments of a varargs call into one array.
    ///
    /// Left untouched when the call already passes a single array of the
    /// right type, or when the trailing arguments do not fit the component.
    fn pack_varargs<'a>(&self, params: &[String], args: &'a [Value]) -> Cow<'a, [Value]> {
        let Some((last, fixed)) = params.split_last() else {
            return Cow::Borrowed(args);
        };
        let Some(component) = component_of(last) else {
            return Cow::Borrowed(args);
        };
        if args.len() < fixed.len() {
            return Cow::Borrowed(args);
        }
        let trailing = &args[fixed.len()..];
        if let [only] = trailing {
            if self.value_is(last, only) {
                return Cow::Borrowed(args);
            }
        }
        if !trailing.iter().all(|a| self.value_is(component, a)) {
            return Cow::Borrowed(args);
        }
        let mut packed = args[..fixed.len()].to_vec();
        packed.push(Value::array(component, trailing.to_vec()));
        Cow::Owned(packed)
    }

    /// Index of the preferred overload among applicable candidates.
    fn most_specific<'d>(
        &self,
        candidates: impl Iterator<Item = (usize, &'d [String], bool)>,
        signature: impl Fn(usize) -> Signature,
    ) -> Option<usize> {
        candidates
            .reduce(|best, next| {
                let wins = match self.compare_overloads((next.1, next.2), (best.1, best.2)) {
                    Some(ordering) => ordering == Ordering::Less,
                    None => signature(next.0) < signature(best.0),
                };
                if wins { next } else { best }
            })
            .map(|(i, _, _)| i)
    }

    /// `Less` when overload `a` is more specific than `b`.
    ///
    /// Fixed arity beats varargs; otherwise the first parameter pair where
    /// one type is a subtype of the other decides, with `int` preferred over
    /// `long`. `None` for incomparable overloads.
    fn compare_overloads(&self, a: (&[String], bool), b: (&[String], bool)) -> Option<Ordering> {
        let ((a_params, a_varargs), (b_params, b_varargs)) = (a, b);
        match (a_varargs, b_varargs) {
            (false, true) => return Some(Ordering::Less),
            (true, false) => return Some(Ordering::Greater),
            _ => {}
        }
        if a_params.len() != b_params.len() {
            return None;
        }
        for (x, y) in a_params.iter().zip(b_params) {
            let (x, y) = (wrapper_of(x), wrapper_of(y));
            if x == y {
                continue;
            }
            if self.registry.is(y, x) {
                return Some(Ordering::Less);
            }
            if self.registry.is(x, y) {
                return Some(Ordering::Greater);
            }
            match (x, y) {
                (types::INTEGER, types::LONG) => return Some(Ordering::Less),
                (types::LONG, types::INTEGER) => return Some(Ordering::Greater),
                _ => {}
            }
        }
        None
    }
}
