//! Host type model.
//!
//! The sandbox never looks at the scripting engine's own object layout.
//! Instead the embedding engine describes every type a script can reach
//! in a [`TypeRegistry`]: the type's supertypes, where it was defined and
//! which methods, constructors and fields it declares. Call-site resolution
//! and signature matching both walk this model.
//!
//! Type names are canonical strings: dotted names, nested types joined with
//! `$`, and one `[]` suffix per array dimension. Array types are never
//! registered; they are derived from their component type on lookup.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const GSTRING: &str = "groovy.lang.GString";
pub const CHAR_SEQUENCE: &str = "java.lang.CharSequence";
pub const COMPARABLE: &str = "java.lang.Comparable";
pub const SERIALIZABLE: &str = "java.io.Serializable";
pub const NUMBER: &str = "java.lang.Number";
pub const INTEGER: &str = "java.lang.Integer";
pub const LONG: &str = "java.lang.Long";
pub const DOUBLE: &str = "java.lang.Double";
pub const BOOLEAN: &str = "java.lang.Boolean";
pub const CLASS: &str = "java.lang.Class";
pub const MAP: &str = "java.util.Map";
pub const HASH_MAP: &str = "java.util.HashMap";
pub const LINKED_HASH_MAP: &str = "java.util.LinkedHashMap";
pub const GROOVY_OBJECT: &str = "groovy.lang.GroovyObject";
pub const DEFAULT_GROOVY_METHODS: &str = "org.codehaus.groovy.runtime.DefaultGroovyMethods";

const PRIMITIVES: [(&str, &str); 9] = [
    ("boolean", BOOLEAN),
    ("char", "java.lang.Character"),
    ("byte", "java.lang.Byte"),
    ("short", "java.lang.Short"),
    ("int", INTEGER),
    ("long", LONG),
    ("float", "java.lang.Float"),
    ("double", DOUBLE),
    ("void", "java.lang.Void"),
];

/// Whether `name` denotes a primitive type.
pub fn is_primitive(name: &str) -> bool {
    PRIMITIVES.iter().any(|(p, _)| *p == name)
}

/// The boxed type of a primitive, or the name itself for reference types.
pub fn wrapper_of(name: &str) -> &str {
    PRIMITIVES
        .iter()
        .find(|(p, _)| *p == name)
        .map(|(_, w)| *w)
        .unwrap_or(name)
}

/// The component type of an array type name, if it is one.
pub fn component_of(name: &str) -> Option<&str> {
    name.strip_suffix("[]")
}

/// What sort of type a [`TypeDef`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Primitive,
    Array,
}

/// Which compilation unit defined a type.
///
/// Types compiled from a script share the script's origin; everything the
/// host exposes is [`Origin::Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Host,
    Script(u32),
}

/// Whitelisting marker carried by a member declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Callable from any execution identity.
    Unrestricted,
    /// Callable only when a real identity is attached to the execution.
    Restricted,
}

/// Member modifiers relevant to access control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub is_static: bool,
    pub varargs: bool,
    pub synthetic: bool,
}

/// A declared method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<String>,
    pub modifiers: Modifiers,
    pub marker: Option<Marker>,
}

impl MethodDef {
    pub fn new(name: impl Into<String>, params: &[&str]) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            modifiers: Modifiers::default(),
            marker: None,
        }
    }

    pub fn into_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    pub fn varargs(mut self) -> Self {
        self.modifiers.varargs = true;
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.modifiers.synthetic = true;
        self
    }

    pub fn marked(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }
}

/// A declared constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorDef {
    pub params: Vec<String>,
    pub modifiers: Modifiers,
    pub marker: Option<Marker>,
}

impl ConstructorDef {
    pub fn new(params: &[&str]) -> Self {
        Self {
            params: params.iter().map(|p| p.to_string()).collect(),
            modifiers: Modifiers::default(),
            marker: None,
        }
    }

    pub fn varargs(mut self) -> Self {
        self.modifiers.varargs = true;
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.modifiers.synthetic = true;
        self
    }

    pub fn marked(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub type_name: String,
    pub modifiers: Modifiers,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            modifiers: Modifiers::default(),
        }
    }

    pub fn into_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.modifiers.synthetic = true;
        self
    }
}

/// A type definition as seen by the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub enclosing: Option<String>,
    pub origin: Origin,
    pub methods: Vec<MethodDef>,
    pub constructors: Vec<ConstructorDef>,
    pub fields: Vec<FieldDef>,
}

impl TypeDef {
    fn with_kind(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            superclass: None,
            interfaces: Vec::new(),
            enclosing: None,
            origin: Origin::Host,
            methods: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// A class extending `java.lang.Object` unless told otherwise.
    pub fn class(name: impl Into<String>) -> Self {
        let mut def = Self::with_kind(name, TypeKind::Class);
        if def.name != OBJECT {
            def.superclass = Some(OBJECT.to_string());
        }
        def
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Interface)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        let mut def = Self::with_kind(name, TypeKind::Enum);
        def.superclass = Some("java.lang.Enum".to_string());
        def
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Primitive)
    }

    fn array(name: &str) -> Self {
        let mut def = Self::with_kind(name, TypeKind::Array);
        def.superclass = Some(OBJECT.to_string());
        def.interfaces = vec!["java.lang.Cloneable".to_string(), SERIALIZABLE.to_string()];
        def
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn enclosed_by(mut self, outer: impl Into<String>) -> Self {
        self.enclosing = Some(outer.into());
        self
    }

    pub fn defined_by(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn method(mut self, name: &str, params: &[&str]) -> Self {
        self.methods.push(MethodDef::new(name, params));
        self
    }

    pub fn static_method(mut self, name: &str, params: &[&str]) -> Self {
        self.methods.push(MethodDef::new(name, params).into_static());
        self
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn constructor(mut self, params: &[&str]) -> Self {
        self.constructors.push(ConstructorDef::new(params));
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorDef) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn field(mut self, name: &str, type_name: &str) -> Self {
        self.fields.push(FieldDef::new(name, type_name));
        self
    }

    pub fn static_field(mut self, name: &str, type_name: &str) -> Self {
        self.fields.push(FieldDef::new(name, type_name).into_static());
        self
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }
}

/// Registry of every type a script can observe.
///
/// Built once by the embedding engine and then shared immutably (usually
/// behind an `Arc`) by resolvers and resolved member references.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<TypeDef>>,
    extension_holders: Vec<String>,
    /// Renewed on every mutation, so equal ids imply equal contents.
    id: u64,
}

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the types every script sees.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (primitive, _) in PRIMITIVES {
            registry.register(TypeDef::primitive(primitive));
        }
        for def in builtin_types() {
            registry.register(def);
        }
        registry.register_extension_holder(DEFAULT_GROOVY_METHODS);
        registry
    }

    /// Identifies this registry's current contents.
    ///
    /// Two registries share an id only when one is an unmodified clone of the
    /// other. Decisions that depend on the type hierarchy are cached under it.
    pub fn id(&self) -> u64 {
        self.id
    }

    fn touch(&mut self) {
        self.id = NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds or replaces a type definition.
    pub fn register(&mut self, def: TypeDef) -> &mut Self {
        self.types.insert(def.name.clone(), Arc::new(def));
        self.touch();
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, def: TypeDef) -> Self {
        self.register(def);
        self
    }

    /// Marks a type whose static methods act as extension methods on their
    /// first parameter.
    pub fn register_extension_holder(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.extension_holders.contains(&name) {
            self.extension_holders.push(name);
            self.touch();
        }
        self
    }

    pub fn extension_holders(&self) -> &[String] {
        &self.extension_holders
    }

    /// Looks up a type, deriving array types from their component.
    pub fn get(&self, name: &str) -> Option<Arc<TypeDef>> {
        if let Some(def) = self.types.get(name) {
            return Some(def.clone());
        }
        component_of(name)?;
        Some(Arc::new(TypeDef::array(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Direct supertypes of `name`: superclass first, then interfaces.
    fn supertypes(&self, name: &str) -> Vec<String> {
        let Some(def) = self.get(name) else {
            return Vec::new();
        };
        def.superclass
            .iter()
            .chain(def.interfaces.iter())
            .cloned()
            .collect()
    }

    /// `name` and every ancestor, supertypes first.
    ///
    /// Each type's superclass chain is visited before its interfaces, and a
    /// type is listed after all of its own supertypes. Types reachable along
    /// several paths are listed once.
    pub fn lineage(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.visit(name, &mut seen, &mut out);
        out
    }

    fn visit(&self, name: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        if !seen.insert(name.to_string()) {
            return;
        }
        for parent in self.supertypes(name) {
            self.visit(&parent, seen, out);
        }
        out.push(name.to_string());
    }

    /// Definitions along [`lineage`](Self::lineage), skipping unknown names.
    pub fn lineage_defs(&self, name: &str) -> Vec<Arc<TypeDef>> {
        self.lineage(name)
            .iter()
            .filter_map(|n| self.get(n))
            .collect()
    }

    /// Subtype test between type names.
    ///
    /// `expected` matches when it is the wildcard `*`, equals `actual`, names
    /// any supertype of `actual`, or both are arrays whose components match
    /// by the same rule.
    pub fn is(&self, expected: &str, actual: &str) -> bool {
        if expected == "*" || expected == actual {
            return true;
        }
        if self.lineage(actual).iter().any(|t| t == expected) {
            return true;
        }
        match (component_of(expected), component_of(actual)) {
            (Some(e), Some(a)) => self.is(e, a),
            _ => false,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
            TypeKind::Primitive => "primitive",
            TypeKind::Array => "array",
        };
        f.write_str(s)
    }
}

fn builtin_types() -> Vec<TypeDef> {
    vec![
        TypeDef::class(OBJECT)
            .constructor(&[])
            .method("equals", &[OBJECT])
            .method("hashCode", &[])
            .method("toString", &[])
            .method("getClass", &[]),
        TypeDef::interface(SERIALIZABLE),
        TypeDef::interface("java.lang.Cloneable"),
        TypeDef::interface(COMPARABLE).method("compareTo", &[OBJECT]),
        TypeDef::interface(CHAR_SEQUENCE)
            .method("charAt", &["int"])
            .method("subSequence", &["int", "int"]),
        TypeDef::class(STRING)
            .implements(SERIALIZABLE)
            .implements(COMPARABLE)
            .implements(CHAR_SEQUENCE)
            .constructor(&[])
            .constructor(&[STRING])
            .method("length", &[])
            .method("isEmpty", &[])
            .method("compareTo", &[STRING])
            .method("compareToIgnoreCase", &[STRING])
            .method("contains", &[CHAR_SEQUENCE])
            .method("startsWith", &[STRING])
            .method("endsWith", &[STRING])
            .method("substring", &["int"])
            .method("substring", &["int", "int"])
            .method("toUpperCase", &[])
            .method("toLowerCase", &[])
            .method("trim", &[])
            .method("split", &[STRING])
            .method("replace", &[CHAR_SEQUENCE, CHAR_SEQUENCE])
            .static_method("valueOf", &[OBJECT])
            .with_method(MethodDef::new("format", &[STRING, "java.lang.Object[]"]).into_static().varargs())
            .with_method(
                MethodDef::new("join", &[CHAR_SEQUENCE, "java.lang.CharSequence[]"])
                    .into_static()
                    .varargs(),
            )
            .static_field("CASE_INSENSITIVE_ORDER", "java.util.Comparator"),
        TypeDef::class(GSTRING)
            .implements(COMPARABLE)
            .implements(CHAR_SEQUENCE)
            .implements(SERIALIZABLE)
            .method("getValues", &[])
            .method("getStrings", &[])
            .method("plus", &[STRING]),
        TypeDef::class(NUMBER)
            .implements(SERIALIZABLE)
            .method("intValue", &[])
            .method("longValue", &[])
            .method("doubleValue", &[]),
        TypeDef::class(INTEGER)
            .extends(NUMBER)
            .implements(COMPARABLE)
            .constructor(&["int"])
            .method("compareTo", &[INTEGER])
            .static_method("valueOf", &["int"])
            .static_method("parseInt", &[STRING])
            .static_field("MAX_VALUE", "int")
            .static_field("MIN_VALUE", "int"),
        TypeDef::class(LONG)
            .extends(NUMBER)
            .implements(COMPARABLE)
            .constructor(&["long"])
            .method("compareTo", &[LONG])
            .static_method("valueOf", &["long"])
            .static_method("parseLong", &[STRING])
            .static_field("MAX_VALUE", "long")
            .static_field("MIN_VALUE", "long"),
        TypeDef::class(DOUBLE)
            .extends(NUMBER)
            .implements(COMPARABLE)
            .constructor(&["double"])
            .method("isNaN", &[])
            .static_method("parseDouble", &[STRING]),
        TypeDef::class(BOOLEAN)
            .implements(SERIALIZABLE)
            .implements(COMPARABLE)
            .method("booleanValue", &[])
            .static_method("parseBoolean", &[STRING])
            .static_field("TRUE", BOOLEAN)
            .static_field("FALSE", BOOLEAN),
        TypeDef::class(CLASS)
            .method("getName", &[])
            .method("getSimpleName", &[])
            .static_method("forName", &[STRING]),
        TypeDef::class("java.lang.Enum")
            .implements(COMPARABLE)
            .implements(SERIALIZABLE)
            .method("name", &[])
            .method("ordinal", &[]),
        TypeDef::interface(MAP)
            .method("get", &[OBJECT])
            .method("put", &[OBJECT, OBJECT])
            .method("containsKey", &[OBJECT])
            .method("size", &[])
            .method("isEmpty", &[])
            .method("keySet", &[])
            .method("values", &[]),
        TypeDef::class(HASH_MAP)
            .implements(MAP)
            .implements(SERIALIZABLE)
            .constructor(&[])
            .method("size", &[]),
        TypeDef::class(LINKED_HASH_MAP)
            .extends(HASH_MAP)
            .implements(MAP)
            .constructor(&[]),
        TypeDef::interface(GROOVY_OBJECT)
            .method("invokeMethod", &[STRING, OBJECT])
            .method("getProperty", &[STRING])
            .method("setProperty", &[STRING, OBJECT])
            .method("getMetaClass", &[]),
        TypeDef::class(DEFAULT_GROOVY_METHODS)
            .static_method("reverse", &[CHAR_SEQUENCE])
            .static_method("toInteger", &[CHAR_SEQUENCE])
            .static_method("isNumber", &[CHAR_SEQUENCE])
            .static_method("dump", &[OBJECT])
            .static_method("inspect", &[OBJECT]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_changes_with_contents() {
        let base = TypeRegistry::with_builtins();
        let copy = base.clone();
        assert_eq!(base.id(), copy.id());
        let extended = copy.with(TypeDef::class("a.Foo"));
        assert_ne!(base.id(), extended.id());
        assert_ne!(TypeRegistry::with_builtins().id(), base.id());
    }

    #[test]
    fn test_lineage_visits_supertypes_first() {
        let registry = TypeRegistry::with_builtins();
        let lineage = registry.lineage(STRING);
        assert_eq!(lineage.first().map(String::as_str), Some(OBJECT));
        assert_eq!(lineage.last().map(String::as_str), Some(STRING));
        let pos = |n: &str| lineage.iter().position(|t| t == n).unwrap();
        assert!(pos(SERIALIZABLE) < pos(COMPARABLE));
        assert!(pos(COMPARABLE) < pos(CHAR_SEQUENCE));
    }

    #[test]
    fn test_lineage_lists_shared_ancestors_once() {
        let registry = TypeRegistry::with_builtins();
        let lineage = registry.lineage(LINKED_HASH_MAP);
        assert_eq!(lineage.iter().filter(|t| *t == MAP).count(), 1);
        assert_eq!(lineage.iter().filter(|t| *t == OBJECT).count(), 1);
    }

    #[test]
    fn test_is_walks_hierarchy() {
        let registry = TypeRegistry::with_builtins();
        assert!(registry.is(STRING, STRING));
        assert!(registry.is(OBJECT, STRING));
        assert!(registry.is(CHAR_SEQUENCE, STRING));
        assert!(registry.is(NUMBER, INTEGER));
        assert!(registry.is("*", INTEGER));
        assert!(!registry.is(STRING, OBJECT));
        assert!(!registry.is(INTEGER, LONG));
    }

    #[test]
    fn test_is_on_arrays() {
        let registry = TypeRegistry::with_builtins();
        assert!(registry.is("java.lang.Object[]", "java.lang.String[]"));
        assert!(registry.is("java.lang.CharSequence[][]", "java.lang.String[][]"));
        assert!(registry.is(OBJECT, "java.lang.String[]"));
        assert!(!registry.is("java.lang.String[]", "java.lang.Object[]"));
        assert!(!registry.is("java.lang.String[]", STRING));
    }

    #[test]
    fn test_arrays_are_derived() {
        let registry = TypeRegistry::with_builtins();
        let def = registry.get("int[][]").unwrap();
        assert_eq!(def.kind, TypeKind::Array);
        assert_eq!(def.superclass.as_deref(), Some(OBJECT));
        assert!(registry.get("no.such.Type").is_none());
    }

    #[test]
    fn test_primitive_helpers() {
        assert!(is_primitive("int"));
        assert!(!is_primitive(INTEGER));
        assert_eq!(wrapper_of("long"), LONG);
        assert_eq!(wrapper_of(STRING), STRING);
        assert_eq!(component_of("int[][]"), Some("int[]"));
    }

    #[test]
    fn test_cyclic_hierarchy_terminates() {
        let registry = TypeRegistry::new()
            .with(TypeDef::interface("a.A").implements("a.B"))
            .with(TypeDef::interface("a.B").implements("a.A"));
        assert_eq!(registry.lineage("a.A"), vec!["a.B".to_string(), "a.A".to_string()]);
        assert!(registry.is("a.B", "a.A"));
    }
}
