//! Declarative metadata attached to types, members and type arguments
//!
//! A directive is a normalized key/value map keyed by its [`DirectiveKind`].
//! Declarations arrive with raw directives; [`DirectiveExtractor`] rewrites
//! them once into canonical form when the declaration enters the universe.
//!
//! In JSON a directive set is an object keyed by kind. Marker directives may
//! be written as `true`, and single-valued ones as a bare scalar:
//!
//! ```json
//! {
//!   "schema": { "description": "Customer id", "accessMode": "READ_ONLY" },
//!   "json-property": "customer_id",
//!   "not-null": true,
//!   "size": { "min": 1, "max": 64 }
//! }
//! ```

mod extract;

pub use extract::{DirectiveExtractor, DirectiveHandler};

use indexmap::IndexMap;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

// =============================================================================
// Directive Kind
// =============================================================================

/// Every kind of declarative metadata the compiler understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectiveKind {
    /// Schema override (name, type, description, facets, composition)
    Schema,
    /// Array-level schema override plus item override
    ArraySchema,
    Hidden,
    Ignore,
    BackReference,
    AnySetter,
    /// Serialized property name, enum literal override, default, required
    JsonProperty,
    Nullable,
    NonNull,
    Deprecated,
    /// Configuration-binding default value
    Bindable,
    JsonView,
    Unwrapped,
    ExternalDocs,
    /// Class-level property naming strategy
    Naming,
    /// Meta-directive that renames the schema after itself
    Stereotype,

    // Validation constraints
    NotNull,
    NotEmpty,
    NotBlank,
    Size,
    Min,
    Max,
    DecimalMin,
    DecimalMax,
    Negative,
    NegativeOrZero,
    Positive,
    PositiveOrZero,
    Email,
    Pattern,
}

impl DirectiveKind {
    pub const CONSTRAINTS: [DirectiveKind; 14] = [
        Self::NotNull,
        Self::NotEmpty,
        Self::NotBlank,
        Self::Size,
        Self::Min,
        Self::Max,
        Self::DecimalMin,
        Self::DecimalMax,
        Self::Negative,
        Self::NegativeOrZero,
        Self::Positive,
        Self::PositiveOrZero,
        Self::Email,
        Self::Pattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::ArraySchema => "array-schema",
            Self::Hidden => "hidden",
            Self::Ignore => "ignore",
            Self::BackReference => "back-reference",
            Self::AnySetter => "any-setter",
            Self::JsonProperty => "json-property",
            Self::Nullable => "nullable",
            Self::NonNull => "non-null",
            Self::Deprecated => "deprecated",
            Self::Bindable => "bindable",
            Self::JsonView => "json-view",
            Self::Unwrapped => "unwrapped",
            Self::ExternalDocs => "external-docs",
            Self::Naming => "naming",
            Self::Stereotype => "stereotype",
            Self::NotNull => "not-null",
            Self::NotEmpty => "not-empty",
            Self::NotBlank => "not-blank",
            Self::Size => "size",
            Self::Min => "min",
            Self::Max => "max",
            Self::DecimalMin => "decimal-min",
            Self::DecimalMax => "decimal-max",
            Self::Negative => "negative",
            Self::NegativeOrZero => "negative-or-zero",
            Self::Positive => "positive",
            Self::PositiveOrZero => "positive-or-zero",
            Self::Email => "email",
            Self::Pattern => "pattern",
        }
    }

    /// PascalCase rendering used when a directive is folded into a name
    pub fn display_name(&self) -> String {
        self.as_str()
            .split('-')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect()
    }

    pub fn is_constraint(&self) -> bool {
        Self::CONSTRAINTS.contains(self)
    }
}

// =============================================================================
// Directive
// =============================================================================

/// Normalized value map of one directive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directive(Map<String, Value>);

impl Directive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Non-empty string value
    pub fn str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// `value` member, the usual slot of single-valued directives
    pub fn value(&self) -> Option<&str> {
        self.str("value")
    }

    /// Boolean value, accepting `"true"`/`"false"` text
    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Some(true),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Numeric value, accepting numeric text
    pub fn f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key) {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String list; a lone string counts as a one-element list
    pub fn strings(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Nested directive map
    pub fn sub(&self, key: &str) -> Option<Directive> {
        match self.0.get(key) {
            Some(Value::Object(map)) => Some(Directive(map.clone())),
            _ => None,
        }
    }
}

// =============================================================================
// Directive Set
// =============================================================================

/// All directives attached to one element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives(IndexMap<DirectiveKind, Directive>);

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, kind: DirectiveKind, directive: Directive) -> Self {
        self.0.insert(kind, directive);
        self
    }

    pub fn get(&self, kind: DirectiveKind) -> Option<&Directive> {
        self.0.get(&kind)
    }

    pub fn has(&self, kind: DirectiveKind) -> bool {
        self.0.contains_key(&kind)
    }

    pub fn insert(&mut self, kind: DirectiveKind, directive: Directive) -> Option<Directive> {
        self.0.insert(kind, directive)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DirectiveKind, &Directive)> {
        self.0.iter()
    }

    /// Constraint directives only, in attachment order
    pub fn constraints(&self) -> impl Iterator<Item = (&DirectiveKind, &Directive)> {
        self.0.iter().filter(|(kind, _)| kind.is_constraint())
    }

    /// Whether any hiding directive is present
    pub fn is_hidden(&self) -> bool {
        self.has(DirectiveKind::Hidden)
            || self.has(DirectiveKind::Ignore)
            || self.has(DirectiveKind::BackReference)
            || self
                .get(DirectiveKind::AnySetter)
                .map_or(false, |d| d.bool("enabled").unwrap_or(true))
            || self
                .get(DirectiveKind::Schema)
                .and_then(|d| d.bool("hidden"))
                .unwrap_or(false)
    }

    pub(crate) fn into_inner(self) -> IndexMap<DirectiveKind, Directive> {
        self.0
    }
}

impl FromIterator<(DirectiveKind, Directive)> for Directives {
    fn from_iter<I: IntoIterator<Item = (DirectiveKind, Directive)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Directives {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Directives {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: IndexMap<String, Value> = IndexMap::deserialize(deserializer)?;
        let mut directives = IndexMap::with_capacity(raw.len());
        for (key, value) in raw {
            let parsed: Result<DirectiveKind, D::Error> =
                DirectiveKind::deserialize(key.as_str().into_deserializer());
            let Ok(kind) = parsed else {
                tracing::debug!(kind = %key, "skipping unknown directive kind");
                continue;
            };
            let directive = match value {
                Value::Object(map) => Directive(map),
                Value::Bool(true) | Value::Null => Directive::default(),
                Value::Bool(false) => continue,
                scalar => Directive::default().with("value", scalar),
            };
            directives.insert(kind, directive);
        }
        Ok(Self(directives))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shorthand_forms() {
        let directives: Directives = serde_json::from_value(json!({
            "hidden": true,
            "deprecated": false,
            "json-property": "full_name",
            "size": { "min": 1, "max": "10" }
        }))
        .unwrap();

        assert!(directives.has(DirectiveKind::Hidden));
        assert!(!directives.has(DirectiveKind::Deprecated));
        assert_eq!(
            directives.get(DirectiveKind::JsonProperty).and_then(|d| d.value()),
            Some("full_name")
        );
        let size = directives.get(DirectiveKind::Size).unwrap();
        assert_eq!(size.u64("min"), Some(1));
        assert_eq!(size.u64("max"), Some(10));
    }

    #[test]
    fn test_unknown_kinds_are_skipped() {
        let directives: Directives = serde_json::from_value(json!({
            "lombok-builder": true,
            "not-null": true,
            "x-vendor": { "team": "billing" }
        }))
        .unwrap();

        assert_eq!(directives.len(), 1);
        assert!(directives.has(DirectiveKind::NotNull));
    }

    #[test]
    fn test_hidden_variants() {
        let hidden: Directives = serde_json::from_value(json!({ "schema": { "hidden": true } })).unwrap();
        assert!(hidden.is_hidden());
        let setter: Directives = serde_json::from_value(json!({ "any-setter": { "enabled": false } })).unwrap();
        assert!(!setter.is_hidden());
        let ignored: Directives = serde_json::from_value(json!({ "ignore": true })).unwrap();
        assert!(ignored.is_hidden());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(DirectiveKind::Size.display_name(), "Size");
        assert_eq!(DirectiveKind::NegativeOrZero.display_name(), "NegativeOrZero");
        assert!(DirectiveKind::DecimalMax.is_constraint());
        assert!(!DirectiveKind::Schema.is_constraint());
    }

    #[test]
    fn test_strings_accepts_single_value() {
        let d = Directive::new().with("value", "com.acme.Views$Public");
        assert_eq!(d.strings("value"), vec!["com.acme.Views$Public".to_string()]);
        let d = Directive::new().with("value", json!(["A", "", "B"]));
        assert_eq!(d.strings("value"), vec!["A".to_string(), "B".to_string()]);
    }
}
