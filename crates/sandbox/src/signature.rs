//! Member signatures and the whitelist line grammar.
//!
//! A signature names a member abstractly: what kind of member it is, the
//! type declaring it, its name and its parameter types. The canonical
//! text form is both the whitelist file syntax and the token attached to
//! rejections:
//!
//! ```text
//! method java.lang.String substring int int
//! staticMethod java.lang.Integer parseInt java.lang.String
//! new java.lang.String java.lang.String
//! field some.Type name
//! staticField java.lang.Integer MAX_VALUE
//! ```
//!
//! `*` in any identifier position matches any identifier.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::member::{ConstructorRef, FieldRef, Member, MethodRef};
use crate::{Error, Result};

/// The kinds of member a signature can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignatureKind {
    Method,
    StaticMethod,
    Constructor,
    Field,
    StaticField,
}

impl SignatureKind {
    /// Leading keyword in the line grammar.
    pub fn keyword(self) -> &'static str {
        match self {
            SignatureKind::Method => "method",
            SignatureKind::StaticMethod => "staticMethod",
            SignatureKind::Constructor => "new",
            SignatureKind::Field => "field",
            SignatureKind::StaticField => "staticField",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "method" => SignatureKind::Method,
            "staticMethod" => SignatureKind::StaticMethod,
            "new" => SignatureKind::Constructor,
            "field" => SignatureKind::Field,
            "staticField" => SignatureKind::StaticField,
            _ => return None,
        })
    }

    pub fn is_field(self) -> bool {
        matches!(self, SignatureKind::Field | SignatureKind::StaticField)
    }
}

/// A member signature.
///
/// Field signatures carry no parameter list; method and constructor
/// signatures always do, possibly empty. Constructors carry no name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature {
    kind: SignatureKind,
    declaring_type: String,
    name: Option<String>,
    params: Option<Vec<String>>,
}

impl Signature {
    pub fn method(declaring_type: &str, name: &str, params: &[impl AsRef<str>]) -> Self {
        Self::callable(SignatureKind::Method, declaring_type, Some(name), params)
    }

    pub fn static_method(declaring_type: &str, name: &str, params: &[impl AsRef<str>]) -> Self {
        Self::callable(SignatureKind::StaticMethod, declaring_type, Some(name), params)
    }

    pub fn constructor(declaring_type: &str, params: &[impl AsRef<str>]) -> Self {
        Self::callable(SignatureKind::Constructor, declaring_type, None, params)
    }

    pub fn field(declaring_type: &str, name: &str) -> Self {
        Self {
            kind: SignatureKind::Field,
            declaring_type: declaring_type.to_string(),
            name: Some(name.to_string()),
            params: None,
        }
    }

    pub fn static_field(declaring_type: &str, name: &str) -> Self {
        Self {
            kind: SignatureKind::StaticField,
            ..Self::field(declaring_type, name)
        }
    }

    /// Signature of a resolved method in its instance form.
    pub fn of_method(method: &MethodRef) -> Self {
        Self::method(&method.declaring_type().name, method.name(), method.params())
    }

    pub fn of_static_method(method: &MethodRef) -> Self {
        Self::static_method(&method.declaring_type().name, method.name(), method.params())
    }

    pub fn of_constructor(constructor: &ConstructorRef) -> Self {
        Self::constructor(&constructor.declaring_type().name, constructor.params())
    }

    pub fn of_field(field: &FieldRef) -> Self {
        Self::field(&field.declaring_type().name, field.name())
    }

    pub fn of_static_field(field: &FieldRef) -> Self {
        Self::static_field(&field.declaring_type().name, field.name())
    }

    fn callable(
        kind: SignatureKind,
        declaring_type: &str,
        name: Option<&str>,
        params: &[impl AsRef<str>],
    ) -> Self {
        Self {
            kind,
            declaring_type: declaring_type.to_string(),
            name: name.map(str::to_string),
            params: Some(params.iter().map(|p| p.as_ref().to_string()).collect()),
        }
    }

    /// Parses one whitelist line.
    ///
    /// The line is split on whitespace; `method`/`staticMethod` need a type
    /// and a name, `new` needs a type, `field`/`staticField` need exactly a
    /// type and a name. Anything else is a [`Error::MalformedSignature`].
    pub fn parse(line: &str) -> Result<Self> {
        let malformed = || Error::MalformedSignature {
            line: line.to_string(),
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (&keyword, rest) = tokens.split_first().ok_or_else(malformed)?;
        let kind = SignatureKind::from_keyword(keyword).ok_or_else(malformed)?;
        match kind {
            SignatureKind::Method | SignatureKind::StaticMethod => match rest {
                [ty, name, params @ ..] => Ok(Self::callable(kind, ty, Some(*name), params)),
                _ => Err(malformed()),
            },
            SignatureKind::Constructor => match rest {
                [ty, params @ ..] => Ok(Self::callable(kind, ty, None, params)),
                _ => Err(malformed()),
            },
            SignatureKind::Field | SignatureKind::StaticField => match rest {
                [ty, name] => Ok(Self {
                    kind,
                    ..Self::field(ty, name)
                }),
                _ => Err(malformed()),
            },
        }
    }

    pub fn kind(&self) -> SignatureKind {
        self.kind
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn params(&self) -> Option<&[String]> {
        self.params.as_deref()
    }

    /// Whether the member name is the `*` wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.name.as_deref() == Some("*")
    }

    /// Whether this signature covers `member`.
    ///
    /// The declaring type matches if it is the member's declaring type or
    /// any supertype of it. Names and parameter types match exactly or by
    /// `*`. Parameter lists must have the same length.
    pub fn matches(&self, member: &Member<'_>) -> bool {
        let kind_fits = match member {
            Member::Method(_) => {
                matches!(self.kind, SignatureKind::Method | SignatureKind::StaticMethod)
            }
            Member::Constructor(_) => self.kind == SignatureKind::Constructor,
            Member::Field(_) => self.kind.is_field(),
        };
        if !kind_fits {
            return false;
        }
        if !member
            .registry()
            .is(&self.declaring_type, &member.declaring_type().name)
        {
            return false;
        }
        if let (Some(expected), Some(actual)) = (self.name.as_deref(), member.name()) {
            if !identifier_matches(expected, actual) {
                return false;
            }
        }
        match (self.params.as_deref(), member.params()) {
            (Some(expected), Some(actual)) => {
                expected.len() == actual.len()
                    && expected
                        .iter()
                        .zip(actual)
                        .all(|(e, a)| identifier_matches(e, a))
            }
            (None, None) => true,
            _ => false,
        }
    }

    /// Whether this signature textually covers another concrete signature.
    ///
    /// Used where no type model is at hand: types compare by name only,
    /// with `*` still acting as a wildcard.
    pub fn covers(&self, other: &Signature) -> bool {
        if self.kind != other.kind || !identifier_matches(&self.declaring_type, &other.declaring_type)
        {
            return false;
        }
        let names = match (self.name.as_deref(), other.name.as_deref()) {
            (Some(e), Some(a)) => identifier_matches(e, a),
            (None, None) => true,
            _ => false,
        };
        let params = match (self.params.as_deref(), other.params.as_deref()) {
            (Some(e), Some(a)) => {
                e.len() == a.len() && e.iter().zip(a).all(|(e, a)| identifier_matches(e, a))
            }
            (None, None) => true,
            _ => false,
        };
        names && params
    }

    /// Everything after the keyword.
    fn signature_part(&self) -> String {
        let mut out = self.declaring_type.clone();
        if let Some(name) = &self.name {
            out.push(' ');
            out.push_str(name);
        }
        for param in self.params.iter().flatten() {
            out.push(' ');
            out.push_str(param);
        }
        out
    }
}

fn identifier_matches(expected: &str, actual: &str) -> bool {
    expected == "*" || expected == actual
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.keyword(), self.signature_part())
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Signature {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        sig.to_string()
    }
}

impl PartialOrd for Signature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Signature {
    fn cmp(&self, other: &Self) -> Ordering {
        self.signature_part()
            .cmp(&other.signature_part())
            .then_with(|| self.to_string().cmp(&other.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::types::{TypeDef, TypeRegistry};
    use crate::value::Value;
    use std::sync::Arc;

    fn registry() -> Arc<TypeRegistry> {
        Arc::new(
            TypeRegistry::with_builtins().with(
                TypeDef::class("test.C")
                    .field("myField", "int")
                    .method("m", &["java.lang.Object[]"]),
            ),
        )
    }

    #[test]
    fn test_parse_round_trips_canonical_text() {
        for line in [
            "method java.lang.String length",
            "method java.lang.String substring int int",
            "staticMethod java.lang.Integer parseInt java.lang.String",
            "new java.lang.String",
            "new java.lang.String java.lang.String",
            "field test.C myField",
            "staticField java.lang.Integer MAX_VALUE",
        ] {
            assert_eq!(Signature::parse(line).unwrap().to_string(), line);
        }
    }

    #[test]
    fn test_parse_collapses_whitespace() {
        let sig = Signature::parse("  method\tjava.lang.String   length ").unwrap();
        assert_eq!(sig.to_string(), "method java.lang.String length");
    }

    #[test]
    fn test_parse_rejects_bad_token_counts() {
        for line in [
            "",
            "method java.lang.String",
            "staticMethod x",
            "new",
            "field a.B",
            "field a.B c d",
            "staticField a.B",
            "constructor a.B",
        ] {
            match Signature::parse(line) {
                Err(Error::MalformedSignature { line: l }) => assert_eq!(l, line),
                other => panic!("expected malformed for {line:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_field_signatures_have_no_params() {
        let sig = Signature::parse("field test.C myField").unwrap();
        assert_eq!(sig.params(), None);
        let sig = Signature::parse("method test.C m").unwrap();
        assert_eq!(sig.params(), Some(&[][..]));
        let sig = Signature::parse("new test.C").unwrap();
        assert_eq!(sig.name(), None);
    }

    #[test]
    fn test_matches_method() {
        let registry = registry();
        let resolver = Resolver::new(registry);
        let receiver = Value::object("test.C");
        let m = resolver
            .resolve_method(&receiver, "m", &[Value::array("java.lang.Object", vec![])])
            .unwrap();
        let member = Member::Method(&m);
        let yes = |s: &str| assert!(Signature::parse(s).unwrap().matches(&member), "{s}");
        let no = |s: &str| assert!(!Signature::parse(s).unwrap().matches(&member), "{s}");
        yes("method test.C m java.lang.Object[]");
        yes("method test.C * java.lang.Object[]");
        yes("method java.lang.Object m java.lang.Object[]");
        yes("method * m *");
        no("method test.C other java.lang.Object[]");
        no("method test.C m java.lang.String[]");
        no("method test.C m");
        no("method java.lang.String m java.lang.Object[]");
        no("field test.C m");
    }

    #[test]
    fn test_matches_field() {
        let resolver = Resolver::new(registry());
        let f = resolver.resolve_field(&Value::object("test.C"), "myField").unwrap();
        let member = Member::Field(&f);
        assert!(Signature::parse("field test.C *").unwrap().matches(&member));
        assert!(Signature::parse("field test.C myField").unwrap().matches(&member));
        assert!(!Signature::parse("field test.C other").unwrap().matches(&member));
        assert!(!Signature::parse("method test.C myField").unwrap().matches(&member));
    }

    #[test]
    fn test_wildcard_is_whole_identifier_only() {
        let resolver = Resolver::new(registry());
        let f = resolver.resolve_field(&Value::object("test.C"), "myField").unwrap();
        let member = Member::Field(&f);
        assert!(!Signature::parse("field test.C my*").unwrap().matches(&member));
        assert!(!Signature::parse("field test.* myField").unwrap().matches(&member));
        assert!(Signature::parse("field test.C *").unwrap().is_wildcard());
        assert!(!Signature::parse("field test.C myField").unwrap().is_wildcard());
    }

    #[test]
    fn test_ordering_is_by_signature_part_then_keyword() {
        let mut sigs: Vec<Signature> = [
            "staticMethod b.B m",
            "method b.B m",
            "field a.A x",
            "new a.A",
        ]
        .iter()
        .map(|s| Signature::parse(s).unwrap())
        .collect();
        sigs.sort();
        let text: Vec<String> = sigs.iter().map(ToString::to_string).collect();
        assert_eq!(
            text,
            ["new a.A", "field a.A x", "method b.B m", "staticMethod b.B m"]
        );
    }

    #[test]
    fn test_covers() {
        let wide = Signature::parse("method java.lang.String *").unwrap();
        let exact = Signature::parse("method java.lang.String length").unwrap();
        assert!(wide.covers(&exact));
        assert!(exact.covers(&exact));
        assert!(!exact.covers(&wide));
        assert!(!exact.covers(&Signature::parse("staticMethod java.lang.String length").unwrap()));
    }

    #[test]
    fn test_serde_uses_canonical_text() {
        let sig = Signature::parse("method java.lang.String length").unwrap();
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, "\"method java.lang.String length\"");
        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
        assert!(serde_json::from_str::<Signature>("\"bogus\"").is_err());
    }
}
