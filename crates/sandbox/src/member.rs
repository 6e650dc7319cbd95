//! Resolved member references.
//!
//! A reference points at one declaration inside a [`TypeDef`] and keeps the
//! registry it came from, so policies can walk the declaring type's
//! hierarchy without being handed the registry separately.

use std::fmt;
use std::sync::Arc;

use crate::signature::Signature;
use crate::types::{ConstructorDef, FieldDef, MethodDef, TypeDef, TypeRegistry};

/// A declared method, static or not.
#[derive(Clone)]
pub struct MethodRef {
    registry: Arc<TypeRegistry>,
    owner: Arc<TypeDef>,
    index: usize,
}

/// A declared constructor.
#[derive(Clone)]
pub struct ConstructorRef {
    registry: Arc<TypeRegistry>,
    owner: Arc<TypeDef>,
    index: usize,
}

/// A declared field, static or not.
#[derive(Clone)]
pub struct FieldRef {
    registry: Arc<TypeRegistry>,
    owner: Arc<TypeDef>,
    index: usize,
}

impl MethodRef {
    pub(crate) fn new(registry: Arc<TypeRegistry>, owner: Arc<TypeDef>, index: usize) -> Self {
        debug_assert!(index < owner.methods.len());
        Self {
            registry,
            owner,
            index,
        }
    }

    pub fn def(&self) -> &MethodDef {
        &self.owner.methods[self.index]
    }

    pub fn name(&self) -> &str {
        &self.def().name
    }

    pub fn params(&self) -> &[String] {
        &self.def().params
    }

    pub fn is_static(&self) -> bool {
        self.def().modifiers.is_static
    }

    pub fn declaring_type(&self) -> &TypeDef {
        &self.owner
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Canonical signature, `staticMethod` or `method` depending on the
    /// declaration.
    pub fn signature(&self) -> Signature {
        if self.is_static() {
            Signature::of_static_method(self)
        } else {
            Signature::of_method(self)
        }
    }
}

impl ConstructorRef {
    pub(crate) fn new(registry: Arc<TypeRegistry>, owner: Arc<TypeDef>, index: usize) -> Self {
        debug_assert!(index < owner.constructors.len());
        Self {
            registry,
            owner,
            index,
        }
    }

    pub fn def(&self) -> &ConstructorDef {
        &self.owner.constructors[self.index]
    }

    pub fn params(&self) -> &[String] {
        &self.def().params
    }

    pub fn declaring_type(&self) -> &TypeDef {
        &self.owner
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn signature(&self) -> Signature {
        Signature::of_constructor(self)
    }
}

impl FieldRef {
    pub(crate) fn new(registry: Arc<TypeRegistry>, owner: Arc<TypeDef>, index: usize) -> Self {
        debug_assert!(index < owner.fields.len());
        Self {
            registry,
            owner,
            index,
        }
    }

    pub fn def(&self) -> &FieldDef {
        &self.owner.fields[self.index]
    }

    pub fn name(&self) -> &str {
        &self.def().name
    }

    pub fn is_static(&self) -> bool {
        self.def().modifiers.is_static
    }

    pub fn declaring_type(&self) -> &TypeDef {
        &self.owner
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn signature(&self) -> Signature {
        if self.is_static() {
            Signature::of_static_field(self)
        } else {
            Signature::of_field(self)
        }
    }
}

/// Any resolved member, borrowed for signature matching.
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    Method(&'a MethodRef),
    Constructor(&'a ConstructorRef),
    Field(&'a FieldRef),
}

impl Member<'_> {
    pub fn declaring_type(&self) -> &TypeDef {
        match self {
            Member::Method(m) => m.declaring_type(),
            Member::Constructor(c) => c.declaring_type(),
            Member::Field(f) => f.declaring_type(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        match self {
            Member::Method(m) => m.registry(),
            Member::Constructor(c) => c.registry(),
            Member::Field(f) => f.registry(),
        }
    }

    /// Member name; `None` for constructors.
    pub fn name(&self) -> Option<&str> {
        match self {
            Member::Method(m) => Some(m.name()),
            Member::Constructor(_) => None,
            Member::Field(f) => Some(f.name()),
        }
    }

    /// Parameter types; `None` for fields.
    pub fn params(&self) -> Option<&[String]> {
        match self {
            Member::Method(m) => Some(m.params()),
            Member::Constructor(c) => Some(c.params()),
            Member::Field(_) => None,
        }
    }

    pub fn signature(&self) -> Signature {
        match self {
            Member::Method(m) => m.signature(),
            Member::Constructor(c) => c.signature(),
            Member::Field(f) => f.signature(),
        }
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodRef({})", self.signature())
    }
}

impl fmt::Debug for ConstructorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstructorRef({})", self.signature())
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldRef({})", self.signature())
    }
}

impl PartialEq for MethodRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner) && self.index == other.index
    }
}

impl PartialEq for ConstructorRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner) && self.index == other.index
    }
}

impl PartialEq for FieldRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner) && self.index == other.index
    }
}
