//! Type Descriptor Model
//!
//! The compiler's input: an immutable universe of declared types, each with
//! its kind, generic parameters, ancestry, members and directives. The host
//! reflection layer produces it; [`crate::loader`] reads it from JSON.

mod primitive;
mod typeref;

pub use primitive::PrimitiveType;
pub use typeref::{NamedRef, TypeRef};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::directive::{DirectiveExtractor, Directives};
use crate::error::Result;

/// Generic parameter name → bound type, in declaration order
pub type Bindings = IndexMap<String, TypeRef>;

// =============================================================================
// Enumerations
// =============================================================================

/// Member or field visibility; also used as the exposure threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Package,
    Private,
}

impl Visibility {
    /// Whether a member of visibility `member` is exposed at this level
    pub fn allows(self, member: Visibility) -> bool {
        member <= self
    }
}

/// Declaration kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeclKind {
    #[default]
    Record,
    Interface,
    Enum,
    /// Collection whose first type argument is the element
    Iterable,
    /// Key/value container; first argument is the key, second the value
    Map,
    /// Value type mapped through [`PrimitiveType`]
    Primitive,
    /// Optional-like wrapper
    Optional,
    /// Multi-value async stream
    Stream,
    /// Single-value async wrapper
    Single,
}

/// Container wrappers peeled off before structural dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    Optional,
    Stream,
    Single,
}

/// Whether a member is a bean-style property or a raw field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    #[default]
    Property,
    Field,
}

// =============================================================================
// Declarations
// =============================================================================

/// Declared generic parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TypeParamRepr")]
pub struct TypeParam {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bounds: Vec<TypeRef>,
}

impl TypeParam {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TypeParamRepr {
    Name(String),
    Node {
        name: String,
        #[serde(default)]
        bounds: Vec<TypeRef>,
    },
}

impl From<TypeParamRepr> for TypeParam {
    fn from(repr: TypeParamRepr) -> Self {
        match repr {
            TypeParamRepr::Name(name) => Self::named(name),
            TypeParamRepr::Node { name, bounds } => Self { name, bounds },
        }
    }
}

/// Field or property of a declared type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedMember {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub member_kind: MemberKind,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    /// Host-level nullability: `Some(false)` for non-null types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Directives::is_empty")]
    pub directives: Directives,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl TypedMember {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            member_kind: MemberKind::Property,
            visibility: Visibility::Public,
            is_static: false,
            nullable: None,
            directives: Directives::default(),
            documentation: None,
        }
    }
}

/// Enum constant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "EnumConstantRepr")]
pub struct EnumConstant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Directives::is_empty")]
    pub directives: Directives,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnumConstantRepr {
    Name(String),
    Node {
        name: String,
        #[serde(default)]
        directives: Directives,
        #[serde(default)]
        documentation: Option<String>,
    },
}

impl From<EnumConstantRepr> for EnumConstant {
    fn from(repr: EnumConstantRepr) -> Self {
        match repr {
            EnumConstantRepr::Name(name) => Self {
                name,
                directives: Directives::default(),
                documentation: None,
            },
            EnumConstantRepr::Node { name, directives, documentation } => Self {
                name,
                directives,
                documentation,
            },
        }
    }
}

/// Primary constructor parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructorParam {
    pub name: String,
    #[serde(default)]
    pub nullable: bool,
}

/// One declared type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Qualified name; nested types use `$` (`com.acme.Outer$Inner`)
    pub name: String,
    #[serde(default)]
    pub kind: DeclKind,
    /// Value mapping for [`DeclKind::Primitive`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive: Option<PrimitiveType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<TypeParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_type: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<TypeRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<TypedMember>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<EnumConstant>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constructor: Vec<ConstructorParam>,
    /// Representation type of an enum serialized through a value method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_value_type: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "Directives::is_empty")]
    pub directives: Directives,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            name: name.into(),
            kind,
            primitive: None,
            type_params: Vec::new(),
            super_type: None,
            interfaces: Vec::new(),
            members: Vec::new(),
            constants: Vec::new(),
            constructor: Vec::new(),
            enum_value_type: None,
            directives: Directives::default(),
            documentation: None,
        }
    }

    fn builtin(primitive: PrimitiveType) -> Self {
        Self {
            primitive: Some(primitive),
            ..Self::new(primitive.name(), DeclKind::Primitive)
        }
    }

    fn container(name: &str, kind: DeclKind, params: &[&str]) -> Self {
        Self {
            type_params: params.iter().map(|p| TypeParam::named(*p)).collect(),
            ..Self::new(name, kind)
        }
    }

    /// Name without the package
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    /// Package part of the qualified name
    pub fn package(&self) -> &str {
        package_of(&self.name)
    }

    pub fn is_enum(&self) -> bool {
        self.kind == DeclKind::Enum
    }

    pub fn is_interface(&self) -> bool {
        self.kind == DeclKind::Interface
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self.kind {
            DeclKind::Primitive => Some(self.primitive.unwrap_or(PrimitiveType::Object)),
            _ => None,
        }
    }

    pub fn wrapper_kind(&self) -> Option<WrapperKind> {
        match self.kind {
            DeclKind::Optional => Some(WrapperKind::Optional),
            DeclKind::Stream => Some(WrapperKind::Stream),
            DeclKind::Single => Some(WrapperKind::Single),
            _ => None,
        }
    }

    /// Pair declared parameters with occurrence arguments.
    ///
    /// Missing arguments fall back to the parameter's first bound, then to
    /// `object`.
    pub fn bindings_for(&self, args: &[TypeRef]) -> Bindings {
        self.type_params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let bound = args
                    .get(i)
                    .cloned()
                    .or_else(|| param.bounds.first().cloned())
                    .unwrap_or_else(|| TypeRef::named(PrimitiveType::Object.name()));
                (param.name.clone(), bound)
            })
            .collect()
    }

    /// Whether a constructor parameter of this name must be supplied
    pub fn is_mandatory_in_constructor(&self, name: &str) -> bool {
        self.constructor.iter().any(|p| p.name == name && !p.nullable)
    }

    /// Normalize directives and rewrite own type parameters into placeholders
    fn normalized(mut self, extractor: &DirectiveExtractor) -> Self {
        let params = self.type_params.clone();
        self.directives = extractor.extract(std::mem::take(&mut self.directives));
        self.super_type = self.super_type.map(|t| normalize_ref(t, &params, extractor));
        self.interfaces = std::mem::take(&mut self.interfaces)
            .into_iter()
            .map(|t| normalize_ref(t, &params, extractor))
            .collect();
        for member in &mut self.members {
            member.directives = extractor.extract(std::mem::take(&mut member.directives));
            let ty = std::mem::replace(&mut member.ty, TypeRef::named(""));
            member.ty = normalize_ref(ty, &params, extractor);
        }
        for constant in &mut self.constants {
            constant.directives = extractor.extract(std::mem::take(&mut constant.directives));
        }
        self
    }
}

fn normalize_ref(ty: TypeRef, params: &[TypeParam], extractor: &DirectiveExtractor) -> TypeRef {
    match ty.with_placeholders(params) {
        TypeRef::Named(named) => TypeRef::Named(NamedRef {
            name: named.name,
            args: named
                .args
                .into_iter()
                .map(|a| normalize_ref(a, params, extractor))
                .collect(),
            directives: extractor.extract(named.directives),
        }),
        TypeRef::Array(element) => TypeRef::Array(Box::new(normalize_ref(*element, params, extractor))),
        other => other,
    }
}

/// Name without the package
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Package part of a qualified name
pub fn package_of(qualified: &str) -> &str {
    qualified.rsplit_once('.').map_or("", |(package, _)| package)
}

// =============================================================================
// Type Kind
// =============================================================================

/// Closed classification driving structural dispatch
#[derive(Debug, Clone, Copy)]
pub enum TypeKind<'a> {
    Primitive(PrimitiveType),
    Enum(&'a TypeDecl),
    Record(&'a TypeDecl),
    Interface(&'a TypeDecl),
    Iterable(&'a TypeDecl),
    Map(&'a TypeDecl),
    /// Host-specific container recognized by declaration kind
    Wrapper(WrapperKind, &'a TypeDecl),
    Array(&'a TypeRef),
    Placeholder,
    Wildcard,
    Unknown,
}

// =============================================================================
// Universe
// =============================================================================

/// All declared types visible to one compilation
#[derive(Debug, Clone)]
pub struct TypeUniverse {
    decls: IndexMap<String, TypeDecl>,
    builtins: usize,
    extractor: DirectiveExtractor,
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::with_extractor(DirectiveExtractor::default())
    }
}

impl TypeUniverse {
    /// Universe holding only built-in types
    pub fn new() -> Self {
        Self::default()
    }

    /// Universe normalizing directives through a custom handler table
    pub fn with_extractor(extractor: DirectiveExtractor) -> Self {
        let mut decls = IndexMap::new();
        for primitive in PrimitiveType::ALL {
            decls.insert(primitive.name().to_string(), TypeDecl::builtin(primitive));
        }
        for container in [
            TypeDecl::container("list", DeclKind::Iterable, &["E"]),
            TypeDecl::container("set", DeclKind::Iterable, &["E"]),
            TypeDecl::container("map", DeclKind::Map, &["K", "V"]),
            TypeDecl::container("optional", DeclKind::Optional, &["T"]),
            TypeDecl::container("stream", DeclKind::Stream, &["T"]),
            TypeDecl::container("future", DeclKind::Single, &["T"]),
        ] {
            decls.insert(container.name.clone(), container);
        }
        let builtins = decls.len();
        Self {
            decls,
            builtins,
            extractor,
        }
    }

    /// Parse declarations from JSON text (one declaration, a list, or
    /// `{"types": [...]}`)
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut universe = Self::new();
        universe.extend(parse_declarations(json)?);
        Ok(universe)
    }

    /// Add a declaration, normalizing its directives
    pub fn insert(&mut self, decl: TypeDecl) {
        let decl = decl.normalized(&self.extractor);
        tracing::trace!(name = %decl.name, kind = ?decl.kind, "declared type");
        self.decls.insert(decl.name.clone(), decl);
    }

    pub fn extend(&mut self, decls: impl IntoIterator<Item = TypeDecl>) {
        for decl in decls {
            self.insert(decl);
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDecl> {
        self.decls.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Declarations other than the built-ins
    pub fn declarations(&self) -> impl Iterator<Item = &TypeDecl> {
        self.decls.values().skip(self.builtins)
    }

    /// Declaration behind a named occurrence
    pub fn decl_of(&self, ty: &TypeRef) -> Option<&TypeDecl> {
        ty.name().and_then(|name| self.get(name))
    }

    pub fn kind_of<'a>(&'a self, ty: &'a TypeRef) -> TypeKind<'a> {
        match ty {
            TypeRef::Array(element) => TypeKind::Array(element),
            TypeRef::Placeholder { .. } => TypeKind::Placeholder,
            TypeRef::Wildcard { .. } => TypeKind::Wildcard,
            TypeRef::Named(named) => match self.get(&named.name) {
                None => TypeKind::Unknown,
                Some(decl) => match decl.kind {
                    DeclKind::Primitive => TypeKind::Primitive(decl.primitive.unwrap_or(PrimitiveType::Object)),
                    DeclKind::Enum => TypeKind::Enum(decl),
                    DeclKind::Record => TypeKind::Record(decl),
                    DeclKind::Interface => TypeKind::Interface(decl),
                    DeclKind::Iterable => TypeKind::Iterable(decl),
                    DeclKind::Map => TypeKind::Map(decl),
                    DeclKind::Optional => TypeKind::Wrapper(WrapperKind::Optional, decl),
                    DeclKind::Stream => TypeKind::Wrapper(WrapperKind::Stream, decl),
                    DeclKind::Single => TypeKind::Wrapper(WrapperKind::Single, decl),
                },
            },
        }
    }

    /// Primitive behind an occurrence, if any
    pub fn primitive_of(&self, ty: &TypeRef) -> Option<PrimitiveType> {
        match self.kind_of(ty) {
            TypeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_enum(&self, ty: &TypeRef) -> bool {
        matches!(self.kind_of(ty), TypeKind::Enum(_))
    }

    /// Iterable, array or map
    pub fn is_container(&self, ty: &TypeRef) -> bool {
        matches!(
            self.kind_of(ty),
            TypeKind::Iterable(_) | TypeKind::Map(_) | TypeKind::Array(_)
        )
    }

    /// Generic bindings of a named occurrence
    pub fn bindings(&self, ty: &TypeRef) -> Bindings {
        match (ty.as_named(), self.decl_of(ty)) {
            (Some(named), Some(decl)) => decl.bindings_for(&named.args),
            _ => Bindings::new(),
        }
    }

    /// Whether `from` is `to` or one of its descendants
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        let mut pending = vec![from.to_string()];
        let mut seen = std::collections::HashSet::new();
        while let Some(name) = pending.pop() {
            if name == to {
                return true;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(decl) = self.get(&name) {
                pending.extend(decl.super_type.iter().filter_map(|t| t.name().map(str::to_string)));
                pending.extend(decl.interfaces.iter().filter_map(|t| t.name().map(str::to_string)));
            }
        }
        false
    }

    /// Whether a declaration or any ancestor declares members
    pub fn has_properties(&self, decl: &TypeDecl) -> bool {
        let mut pending = vec![decl];
        let mut seen = std::collections::HashSet::new();
        while let Some(decl) = pending.pop() {
            if !seen.insert(decl.name.as_str()) {
                continue;
            }
            if decl.members.iter().any(|m| !m.is_static) {
                return true;
            }
            for ancestor in decl.super_type.iter().chain(decl.interfaces.iter()) {
                if let Some(parent) = self.decl_of(ancestor) {
                    pending.push(parent);
                }
            }
        }
        false
    }

    /// Closest declared name, for "did you mean" hints
    pub fn suggest(&self, name: &str) -> Option<String> {
        let matcher = SkimMatcherV2::default();
        self.declarations()
            .filter_map(|decl| {
                matcher
                    .fuzzy_match(&decl.name, simple_name(name))
                    .map(|score| (score, decl.name.as_str()))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, name)| name.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DeclarationFile {
    Wrapped { types: Vec<TypeDecl> },
    Many(Vec<TypeDecl>),
    One(Box<TypeDecl>),
}

/// Parse one JSON document of declarations
pub(crate) fn parse_declarations(json: &str) -> Result<Vec<TypeDecl>> {
    Ok(match serde_json::from_str(json)? {
        DeclarationFile::Wrapped { types } => types,
        DeclarationFile::Many(types) => types,
        DeclarationFile::One(decl) => vec![*decl],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::DirectiveKind;
    use serde_json::json;

    fn universe(value: serde_json::Value) -> TypeUniverse {
        TypeUniverse::from_json_str(&value.to_string()).unwrap()
    }

    #[test]
    fn test_builtins_present() {
        let universe = TypeUniverse::new();
        assert!(matches!(
            universe.kind_of(&TypeRef::named("date-time")),
            TypeKind::Primitive(PrimitiveType::DateTime)
        ));
        assert!(matches!(universe.kind_of(&TypeRef::named("list")), TypeKind::Iterable(_)));
        assert!(matches!(
            universe.kind_of(&TypeRef::named("optional")),
            TypeKind::Wrapper(WrapperKind::Optional, _)
        ));
        assert_eq!(universe.declarations().count(), 0);
    }

    #[test]
    fn test_members_get_placeholders() {
        let universe = universe(json!({
            "types": [{
                "name": "com.acme.Page",
                "type_params": ["T"],
                "members": [{ "name": "items", "type": "list<T>" }]
            }]
        }));

        let page = universe.get("com.acme.Page").unwrap();
        assert!(matches!(page.members[0].ty.args()[0], TypeRef::Placeholder { .. }));

        let bindings = universe.bindings(&TypeRef::parse("com.acme.Page<com.acme.Order>").unwrap());
        assert_eq!(bindings.get("T"), Some(&TypeRef::named("com.acme.Order")));

        let raw = universe.bindings(&TypeRef::named("com.acme.Page"));
        assert_eq!(raw.get("T"), Some(&TypeRef::named("object")));
    }

    #[test]
    fn test_directives_normalized_on_insert() {
        let universe = universe(json!([{
            "name": "com.acme.Order",
            "members": [{
                "name": "id",
                "type": "string",
                "directives": { "schema": { "accessMode": "READ_ONLY" } }
            }]
        }]));

        let member = &universe.get("com.acme.Order").unwrap().members[0];
        let schema = member.directives.get(DirectiveKind::Schema).unwrap();
        assert_eq!(schema.bool("readOnly"), Some(true));
    }

    #[test]
    fn test_assignability_and_properties() {
        let universe = universe(json!([
            { "name": "com.acme.Views$Public", "kind": "interface" },
            { "name": "com.acme.Views$Internal", "kind": "interface", "interfaces": ["com.acme.Views$Public"] },
            { "name": "com.acme.Base", "members": [{ "name": "id", "type": "long" }] },
            { "name": "com.acme.Child", "super_type": "com.acme.Base" }
        ]));

        assert!(universe.is_assignable("com.acme.Views$Internal", "com.acme.Views$Public"));
        assert!(!universe.is_assignable("com.acme.Views$Public", "com.acme.Views$Internal"));
        assert!(universe.has_properties(universe.get("com.acme.Child").unwrap()));
        assert!(!universe.has_properties(universe.get("com.acme.Views$Public").unwrap()));
    }

    #[test]
    fn test_suggest_close_name() {
        let universe = universe(json!([
            { "name": "com.acme.Customer" },
            { "name": "com.acme.Invoice" }
        ]));
        assert_eq!(universe.suggest("com.acme.Custmer").as_deref(), Some("com.acme.Customer"));
    }

    #[test]
    fn test_visibility_threshold() {
        assert!(Visibility::Protected.allows(Visibility::Public));
        assert!(Visibility::Protected.allows(Visibility::Protected));
        assert!(!Visibility::Protected.allows(Visibility::Private));
        assert!(Visibility::Private.allows(Visibility::Package));
    }
}
