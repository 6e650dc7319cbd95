//! Runtime access control for embedded scripts.
//!
//! Core principle: **a script may only use members a whitelist explicitly
//! permits.**
//!
//! # Overview
//!
//! - **Signature**: the canonical, textual name of a member
//!   (`method java.lang.String length`). Whitelist files are lists of these.
//! - **Resolver**: finds the member a dynamic call would actually bind to,
//!   searching the receiver's type hierarchy supertypes first.
//! - **Whitelist**: the policy trait and its variants, composable through
//!   [`ProxyWhitelist`] and conditioned on the execution [`identity`].
//! - **Interceptor**: the per-operation entry point the scripting engine
//!   calls before every method call, constructor, static call and property
//!   access.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sandbox::{Interceptor, StaticWhitelist, TypeRegistry, Value};
//!
//! # fn example() -> sandbox::Result<()> {
//! let whitelist = StaticWhitelist::from_text("method java.lang.String length")?;
//! let registry = Arc::new(TypeRegistry::with_builtins());
//! let interceptor = Interceptor::new(registry, Arc::new(whitelist));
//!
//! let len = interceptor.on_method_call(&Value::from("abc"), "length", &[], |_| Ok(3))?;
//! assert_eq!(len, 3);
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod error;
mod global;
pub mod identity;
mod interceptor;
mod member;
mod resolver;
mod signature;
pub mod types;
mod value;
pub mod whitelist;

pub use cache::{ConcurrentCache, MemberCache, NoCache};
pub use error::{Error, Result};
pub use global::{all, register, set_sources};
pub use identity::Identity;
pub use interceptor::{Interceptor, MethodDispatch, PropertyAccess};
pub use member::{ConstructorRef, FieldRef, Member, MethodRef};
pub use resolver::Resolver;
pub use signature::{Signature, SignatureKind};
pub use types::{TypeDef, TypeRegistry};
pub use value::{Instance, Value};
pub use whitelist::{
    AclAwareWhitelist, AnnotatedWhitelist, BlanketWhitelist, EnumeratingWhitelist,
    OriginWhitelist, ProxyWhitelist, StaticWhitelist, Whitelist,
};
