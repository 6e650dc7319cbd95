//! Runtime values handed to the interceptor by the scripting engine.

use std::collections::BTreeMap;

use crate::types;

/// A script object instance: its concrete type and field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub type_name: String,
    pub fields: BTreeMap<String, Value>,
}

impl Instance {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }
}

/// A runtime value as observed at a call site.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
    /// An interpolated string produced by the engine.
    GString(String),
    Array {
        component: String,
        items: Vec<Value>,
    },
    Map(BTreeMap<String, Value>),
    Object(Instance),
    /// A type object, the receiver of static calls and static properties.
    Type(String),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn object(type_name: impl Into<String>) -> Self {
        Value::Object(Instance::new(type_name))
    }

    pub fn type_of(type_name: impl Into<String>) -> Self {
        Value::Type(type_name.into())
    }

    pub fn array(component: impl Into<String>, items: Vec<Value>) -> Self {
        Value::Array {
            component: component.into(),
            items,
        }
    }

    /// The canonical name of the value's concrete runtime type.
    ///
    /// `None` for `null`, which has no type.
    pub fn type_name(&self) -> Option<String> {
        let name = match self {
            Value::Null => return None,
            Value::Bool(_) => types::BOOLEAN,
            Value::Int(_) => types::INTEGER,
            Value::Long(_) => types::LONG,
            Value::Double(_) => types::DOUBLE,
            Value::Str(_) => types::STRING,
            Value::GString(_) => types::GSTRING,
            Value::Array { component, .. } => return Some(format!("{component}[]")),
            Value::Map(_) => types::LINKED_HASH_MAP,
            Value::Object(instance) => return Some(instance.type_name.clone()),
            Value::Type(_) => types::CLASS,
        };
        Some(name.to_string())
    }

    /// Type name used in diagnostics, `null` for the null value.
    pub fn display_type(&self) -> String {
        self.type_name().unwrap_or_else(|| "null".to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Long(_) | Value::Double(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array { .. })
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// The type named by a type object.
    pub fn as_type(&self) -> Option<&str> {
        match self {
            Value::Type(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::GString(s) => Some(s),
            _ => None,
        }
    }

    /// Array element type, if this value is an array.
    pub fn component_type(&self) -> Option<String> {
        match self {
            Value::Array { component, .. } => Some(component.clone()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Space-prefixed argument type list used in diagnostics.
pub(crate) fn describe_args(args: &[Value]) -> String {
    args.iter().map(|a| format!(" {}", a.display_type())).collect()
}
