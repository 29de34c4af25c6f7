//! Type occurrences
//!
//! A [`TypeRef`] is one use of a type: a named type with generic arguments,
//! an array, a generic placeholder or a wildcard. References are written as
//! text (`com.acme.Page<com.acme.Order>[]`, `? extends com.acme.Base`) or, when
//! type-use directives are attached, as a JSON node:
//!
//! ```json
//! { "name": "list", "args": [{ "name": "string", "directives": { "size": { "max": 8 } } }] }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Bindings, TypeParam};
use crate::directive::Directives;
use crate::error::CompileError;

/// Named type with generic arguments
#[derive(Debug, Clone, PartialEq)]
pub struct NamedRef {
    pub name: String,
    pub args: Vec<TypeRef>,
    /// Type-use directives attached to this occurrence
    pub directives: Directives,
}

/// One occurrence of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TypeRefRepr", into = "TypeRefRepr")]
pub enum TypeRef {
    Named(NamedRef),
    Array(Box<TypeRef>),
    Placeholder { name: String, bounds: Vec<TypeRef> },
    Wildcard { upper_bounds: Vec<TypeRef> },
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::generic(name, Vec::new())
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self::Named(NamedRef {
            name: name.into(),
            args,
            directives: Directives::default(),
        })
    }

    pub fn array_of(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    pub fn parse(input: &str) -> Result<Self, CompileError> {
        let mut parser = Parser { src: input, pos: 0 };
        let ty = parser.parse_type().and_then(|ty| {
            parser.skip_ws();
            if parser.pos == input.len() {
                Ok(ty)
            } else {
                Err(format!("unexpected '{}' at offset {}", &input[parser.pos..], parser.pos))
            }
        });
        ty.map_err(|reason| CompileError::InvalidTypeRef {
            input: input.to_string(),
            reason,
        })
    }

    pub fn as_named(&self) -> Option<&NamedRef> {
        match self {
            Self::Named(named) => Some(named),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.as_named().map(|n| n.name.as_str())
    }

    /// Generic arguments of a named occurrence
    pub fn args(&self) -> &[TypeRef] {
        match self {
            Self::Named(named) => &named.args,
            _ => &[],
        }
    }

    /// Type-use directives of a named occurrence
    pub fn directives(&self) -> Option<&Directives> {
        self.as_named().map(|n| &n.directives).filter(|d| !d.is_empty())
    }

    /// Replace placeholders with their bindings
    pub fn substitute(&self, bindings: &Bindings) -> TypeRef {
        match self {
            Self::Placeholder { name, .. } => match bindings.get(name) {
                Some(bound) => bound.clone(),
                None => self.clone(),
            },
            Self::Named(named) => Self::Named(NamedRef {
                name: named.name.clone(),
                args: named.args.iter().map(|a| a.substitute(bindings)).collect(),
                directives: named.directives.clone(),
            }),
            Self::Array(element) => Self::Array(Box::new(element.substitute(bindings))),
            Self::Wildcard { upper_bounds } => Self::Wildcard {
                upper_bounds: upper_bounds.iter().map(|b| b.substitute(bindings)).collect(),
            },
        }
    }

    /// Turn bare mentions of the given type parameters into placeholders
    pub fn with_placeholders(self, params: &[TypeParam]) -> TypeRef {
        if params.is_empty() {
            return self;
        }
        match self {
            Self::Named(named) => {
                if named.args.is_empty() {
                    if let Some(param) = params.iter().find(|p| p.name == named.name) {
                        return Self::Placeholder {
                            name: named.name,
                            bounds: param.bounds.clone(),
                        };
                    }
                }
                Self::Named(NamedRef {
                    name: named.name,
                    args: named.args.into_iter().map(|a| a.with_placeholders(params)).collect(),
                    directives: named.directives,
                })
            }
            Self::Array(element) => Self::Array(Box::new(element.with_placeholders(params))),
            Self::Wildcard { upper_bounds } => Self::Wildcard {
                upper_bounds: upper_bounds.into_iter().map(|b| b.with_placeholders(params)).collect(),
            },
            placeholder @ Self::Placeholder { .. } => placeholder,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(named) => {
                f.write_str(&named.name)?;
                if !named.args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in named.args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(",")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Self::Array(element) => write!(f, "{}[]", element),
            Self::Placeholder { name, .. } => f.write_str(name),
            Self::Wildcard { upper_bounds } => match upper_bounds.first() {
                Some(bound) => write!(f, "? extends {}", bound),
                None => f.write_str("?"),
            },
        }
    }
}

impl FromStr for TypeRef {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// Text parser
// =============================================================================

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        if let Some(after) = self.rest().strip_prefix(word) {
            if after.chars().next().map_or(true, char::is_whitespace) {
                self.pos += word.len();
                return true;
            }
        }
        false
    }

    fn ident(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || matches!(c, '_' | '.' | '$' | '-')))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            None
        } else {
            self.pos += len;
            Some(&rest[..len])
        }
    }

    fn parse_type(&mut self) -> Result<TypeRef, String> {
        if self.eat('?') {
            if self.keyword("extends") {
                let bound = self.parse_type()?;
                return Ok(TypeRef::Wildcard { upper_bounds: vec![bound] });
            }
            if self.keyword("super") {
                self.parse_type()?;
            }
            return Ok(TypeRef::Wildcard { upper_bounds: Vec::new() });
        }

        let name = self
            .ident()
            .ok_or_else(|| format!("expected a type name at offset {}", self.pos))?;

        let mut args = Vec::new();
        if self.eat('<') {
            loop {
                args.push(self.parse_type()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(format!("expected ',' or '>' at offset {}", self.pos));
            }
        }

        let mut ty = TypeRef::generic(name, args);
        loop {
            self.skip_ws();
            if self.rest().starts_with("[]") {
                self.pos += 2;
                ty = TypeRef::array_of(ty);
            } else {
                break;
            }
        }
        Ok(ty)
    }
}

// =============================================================================
// Serde representation
// =============================================================================

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TypeRefRepr {
    Text(String),
    Array {
        array: Box<TypeRef>,
    },
    Placeholder {
        placeholder: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bounds: Vec<TypeRef>,
    },
    Wildcard {
        wildcard: Vec<TypeRef>,
    },
    Named {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeRef>,
        #[serde(default, skip_serializing_if = "Directives::is_empty")]
        directives: Directives,
    },
}

impl TryFrom<TypeRefRepr> for TypeRef {
    type Error = String;

    fn try_from(repr: TypeRefRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            TypeRefRepr::Text(text) => TypeRef::parse(&text).map_err(|e| e.to_string())?,
            TypeRefRepr::Array { array } => TypeRef::Array(array),
            TypeRefRepr::Placeholder { placeholder, bounds } => TypeRef::Placeholder {
                name: placeholder,
                bounds,
            },
            TypeRefRepr::Wildcard { wildcard } => TypeRef::Wildcard { upper_bounds: wildcard },
            TypeRefRepr::Named { name, args, directives } => {
                TypeRef::Named(NamedRef { name, args, directives })
            }
        })
    }
}

impl From<TypeRef> for TypeRefRepr {
    fn from(ty: TypeRef) -> Self {
        match ty {
            TypeRef::Named(named) if named.directives.is_empty() && named.args.iter().all(is_plain) => {
                TypeRefRepr::Text(TypeRef::Named(named).to_string())
            }
            TypeRef::Named(named) => TypeRefRepr::Named {
                name: named.name,
                args: named.args,
                directives: named.directives,
            },
            TypeRef::Array(element) if is_plain(&element) => {
                TypeRefRepr::Text(TypeRef::Array(element).to_string())
            }
            TypeRef::Array(element) => TypeRefRepr::Array { array: element },
            TypeRef::Placeholder { name, bounds } => TypeRefRepr::Placeholder {
                placeholder: name,
                bounds,
            },
            TypeRef::Wildcard { upper_bounds } => TypeRefRepr::Wildcard { wildcard: upper_bounds },
        }
    }
}

/// Renders to text without losing information
fn is_plain(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Named(named) => named.directives.is_empty() && named.args.iter().all(is_plain),
        TypeRef::Array(element) => is_plain(element),
        TypeRef::Placeholder { .. } => false,
        TypeRef::Wildcard { upper_bounds } => upper_bounds.len() <= 1 && upper_bounds.iter().all(is_plain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::DirectiveKind;
    use serde_json::json;

    #[test]
    fn test_parse_nested_generics_and_arrays() {
        let ty = TypeRef::parse("map<com.acme.Status, list<string>>[]").unwrap();
        let TypeRef::Array(element) = &ty else {
            panic!("Expected array, got {:?}", ty);
        };
        assert_eq!(element.name(), Some("map"));
        assert_eq!(element.args().len(), 2);
        assert_eq!(element.args()[1].to_string(), "list<string>");
        assert_eq!(ty.to_string(), "map<com.acme.Status,list<string>>[]");
    }

    #[test]
    fn test_parse_wildcards() {
        match TypeRef::parse("? extends com.acme.Shape").unwrap() {
            TypeRef::Wildcard { upper_bounds } => {
                assert_eq!(upper_bounds, vec![TypeRef::named("com.acme.Shape")]);
            }
            other => panic!("Expected Wildcard, got {:?}", other),
        }
        match TypeRef::parse("?").unwrap() {
            TypeRef::Wildcard { upper_bounds } => assert!(upper_bounds.is_empty()),
            other => panic!("Expected Wildcard, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(TypeRef::parse("list<string").is_err());
        assert!(TypeRef::parse("").is_err());
        assert!(TypeRef::parse("a b").is_err());
    }

    #[test]
    fn test_placeholders_and_substitution() {
        let params = vec![TypeParam::named("T")];
        let ty = TypeRef::parse("list<T>").unwrap().with_placeholders(&params);
        assert!(matches!(ty.args()[0], TypeRef::Placeholder { .. }));

        let mut bindings = Bindings::new();
        bindings.insert("T".to_string(), TypeRef::named("com.acme.Order"));
        assert_eq!(ty.substitute(&bindings).to_string(), "list<com.acme.Order>");
    }

    #[test]
    fn test_serde_node_form_keeps_directives() {
        let ty: TypeRef = serde_json::from_value(json!({
            "name": "list",
            "args": [{ "name": "string", "directives": { "size": { "max": 8 } } }]
        }))
        .unwrap();

        let element = &ty.args()[0];
        assert!(element.directives().unwrap().has(DirectiveKind::Size));
        assert_eq!(serde_json::to_value(TypeRef::named("string")).unwrap(), json!("string"));
    }
}
