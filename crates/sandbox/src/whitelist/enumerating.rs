//! Whitelists given as explicit signature lists.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::Whitelist;
use crate::cache::{ConcurrentCache, MemberCache, MemberKey};
use crate::member::{ConstructorRef, FieldRef, Member, MethodRef};
use crate::signature::{Signature, SignatureKind};
use crate::value::Value;
use crate::Result;

/// Permits exactly the members covered by its signature lists.
///
/// Decisions are memoised per member signature; the cache is replaced
/// whenever a list changes.
#[derive(Debug)]
pub struct EnumeratingWhitelist {
    methods: Vec<Signature>,
    static_methods: Vec<Signature>,
    constructors: Vec<Signature>,
    fields: Vec<Signature>,
    static_fields: Vec<Signature>,
    cache: Arc<dyn MemberCache>,
}

/// An enumerating whitelist loaded from definition text.
pub type StaticWhitelist = EnumeratingWhitelist;

impl Default for EnumeratingWhitelist {
    fn default() -> Self {
        Self::with_cache(Arc::new(ConcurrentCache::new()))
    }
}

impl EnumeratingWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty whitelist memoising through `cache`.
    pub fn with_cache(cache: Arc<dyn MemberCache>) -> Self {
        Self {
            methods: Vec::new(),
            static_methods: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
            static_fields: Vec::new(),
            cache,
        }
    }

    /// Builds a whitelist from signatures, dropping duplicates.
    pub fn from_signatures(signatures: impl IntoIterator<Item = Signature>) -> Self {
        let mut whitelist = Self::new();
        whitelist.extend(signatures);
        whitelist
    }

    /// Parses definition lines. Blank lines and `#` comments are skipped.
    pub fn from_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut signatures = Vec::new();
        for line in lines {
            if let Some(sig) = parse_definition(line.as_ref())? {
                signatures.push(sig);
            }
        }
        Ok(Self::from_signatures(signatures))
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_lines(text.lines())
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut signatures = Vec::new();
        for line in BufReader::new(reader).lines() {
            if let Some(sig) = parse_definition(&line?)? {
                signatures.push(sig);
            }
        }
        Ok(Self::from_signatures(signatures))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let whitelist = Self::from_reader(File::open(path)?)?;
        debug!(path = %path.display(), entries = whitelist.len(), "loaded whitelist");
        Ok(whitelist)
    }

    /// Adds one signature unless already listed.
    pub fn add(&mut self, signature: Signature) {
        if self.push(signature) {
            self.cache = self.cache.fresh();
        }
    }

    pub fn extend(&mut self, signatures: impl IntoIterator<Item = Signature>) {
        let mut changed = false;
        for sig in signatures {
            changed |= self.push(sig);
        }
        if changed {
            self.cache = self.cache.fresh();
        }
    }

    /// Copies every list entry of `other`.
    pub fn merge(&mut self, other: &EnumeratingWhitelist) {
        self.extend(other.signatures().cloned());
    }

    fn push(&mut self, signature: Signature) -> bool {
        let list = self.list_mut(signature.kind());
        if list.contains(&signature) {
            return false;
        }
        list.push(signature);
        true
    }

    fn list_mut(&mut self, kind: SignatureKind) -> &mut Vec<Signature> {
        match kind {
            SignatureKind::Method => &mut self.methods,
            SignatureKind::StaticMethod => &mut self.static_methods,
            SignatureKind::Constructor => &mut self.constructors,
            SignatureKind::Field => &mut self.fields,
            SignatureKind::StaticField => &mut self.static_fields,
        }
    }

    pub fn method_signatures(&self) -> &[Signature] {
        &self.methods
    }

    pub fn static_method_signatures(&self) -> &[Signature] {
        &self.static_methods
    }

    pub fn constructor_signatures(&self) -> &[Signature] {
        &self.constructors
    }

    pub fn field_signatures(&self) -> &[Signature] {
        &self.fields
    }

    pub fn static_field_signatures(&self) -> &[Signature] {
        &self.static_fields
    }

    /// Every listed signature, grouped by kind in list order.
    pub fn signatures(&self) -> impl Iterator<Item = &Signature> {
        self.methods
            .iter()
            .chain(&self.static_methods)
            .chain(&self.constructors)
            .chain(&self.fields)
            .chain(&self.static_fields)
    }

    pub fn len(&self) -> usize {
        self.signatures().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any listed signature textually covers `signature`.
    pub fn covers(&self, signature: &Signature) -> bool {
        self.signatures().any(|s| s.covers(signature))
    }

    fn check(&self, list: &[Signature], key: &Signature, member: Member<'_>) -> bool {
        if list.is_empty() {
            return false;
        }
        self.cache.get_or_compute(&MemberKey::new(member, key), &mut || {
            list.iter().any(|s| s.matches(&member))
        })
    }
}

/// One definition line: `None` for blanks and comments.
fn parse_definition(line: &str) -> Result<Option<Signature>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    Signature::parse(line).map(Some)
}

impl Whitelist for EnumeratingWhitelist {
    fn permits_method(&self, method: &MethodRef, _receiver: &Value, _args: &[Value]) -> bool {
        self.check(&self.methods, &Signature::of_method(method), Member::Method(method))
    }

    fn permits_constructor(&self, constructor: &ConstructorRef, _args: &[Value]) -> bool {
        self.check(
            &self.constructors,
            &Signature::of_constructor(constructor),
            Member::Constructor(constructor),
        )
    }

    fn permits_static_method(&self, method: &MethodRef, _args: &[Value]) -> bool {
        self.check(
            &self.static_methods,
            &Signature::of_static_method(method),
            Member::Method(method),
        )
    }

    fn permits_field_get(&self, field: &FieldRef, _receiver: &Value) -> bool {
        self.check(&self.fields, &Signature::of_field(field), Member::Field(field))
    }

    fn permits_field_set(&self, field: &FieldRef, _receiver: &Value, _value: &Value) -> bool {
        self.check(&self.fields, &Signature::of_field(field), Member::Field(field))
    }

    fn permits_static_field_get(&self, field: &FieldRef) -> bool {
        self.check(
            &self.static_fields,
            &Signature::of_static_field(field),
            Member::Field(field),
        )
    }

    fn permits_static_field_set(&self, field: &FieldRef, _value: &Value) -> bool {
        self.check(
            &self.static_fields,
            &Signature::of_static_field(field),
            Member::Field(field),
        )
    }

    fn as_enumerating(&self) -> Option<&EnumeratingWhitelist> {
        Some(self)
    }
}
