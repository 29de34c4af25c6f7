//! Output schema nodes
//!
//! An OpenAPI 3.0 schema object. Named schemas live in the
//! [`SchemaRegistry`](crate::registry::SchemaRegistry); everything else is
//! built fresh per resolution and handed back inline.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::COMPONENTS_SCHEMAS_REF;

// =============================================================================
// Schema Type
// =============================================================================

/// JSON type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "integer" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "object" => Ok(Self::Object),
            "array" => Ok(Self::Array),
            "null" => Ok(Self::Null),
            other => Err(format!("unknown schema type '{}'", other)),
        }
    }
}

// =============================================================================
// Schema
// =============================================================================

/// `additionalProperties` is either a flag or a value schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<Schema>),
}

/// Polymorphism hint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    pub property_name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<String, String>,
}

/// Link to external documentation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalDocs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
}

fn serialize_number_constraint<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            #[allow(clippy::cast_possible_truncation)]
            let int_val = *v as i64;
            serializer.serialize_some(&int_val)
        }
        Some(v) => serializer.serialize_some(v),
        None => serializer.serialize_none(),
    }
}

/// Schema node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Registry name while the schema is being populated
    #[serde(skip)]
    pub name: Option<String>,
    /// Schema reference ($ref); other fields are decoration at most
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_path: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Value>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    // Number constraints
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "serialize_number_constraint")]
    pub multiple_of: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "serialize_number_constraint")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "serialize_number_constraint")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<bool>,

    // String constraints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    // Array constraints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,

    // Object constraints
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,

    // Composition
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    /// `x-` extensions
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Schema {
    /// `$ref`-only pointer to a registry entry
    pub fn reference(name: &str) -> Self {
        Self {
            ref_path: Some(format!("{}{}", COMPONENTS_SCHEMAS_REF, name)),
            ..Self::default()
        }
    }

    pub fn typed(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    pub fn object() -> Self {
        Self::typed(SchemaType::Object)
    }

    pub fn array(items: Schema) -> Self {
        Self {
            schema_type: Some(SchemaType::Array),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn is_ref(&self) -> bool {
        self.ref_path.is_some()
    }

    /// A pointer and nothing else
    pub fn is_bare_ref(&self) -> bool {
        self.is_ref()
            && *self
                == Self {
                    ref_path: self.ref_path.clone(),
                    name: self.name.clone(),
                    ..Self::default()
                }
    }

    /// Registry name a local `$ref` points at
    pub fn ref_name(&self) -> Option<&str> {
        self.ref_path
            .as_deref()
            .and_then(|r| r.strip_prefix(COMPONENTS_SCHEMAS_REF))
    }

    /// No field set (the registry name does not count)
    pub fn is_empty(&self) -> bool {
        *self
            == Self {
                name: self.name.clone(),
                ..Self::default()
            }
    }

    /// Anything beyond documentation, deprecation and nullability
    pub fn has_structure(&self) -> bool {
        let stripped = Self {
            name: None,
            title: None,
            description: None,
            deprecated: None,
            nullable: None,
            external_docs: None,
            ..self.clone()
        };
        !stripped.is_empty()
    }

    pub fn is_object(&self) -> bool {
        self.schema_type == Some(SchemaType::Object)
    }

    pub fn is_array(&self) -> bool {
        self.schema_type == Some(SchemaType::Array)
    }

    /// Object whose shape is given by `additionalProperties`
    pub fn is_map(&self) -> bool {
        self.additional_properties.is_some()
    }

    pub fn set_nullable(&mut self) {
        self.nullable = Some(true);
    }

    /// Insert a property and record whether it is required
    pub fn add_property(&mut self, name: &str, schema: Schema, required: bool) {
        self.properties.insert(name.to_string(), schema);
        if required && !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    /// Append to `allOf` unless an equal member is already there
    pub fn add_all_of(&mut self, schema: Schema) {
        if !self.all_of.contains(&schema) {
            self.all_of.push(schema);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_shape() {
        let schema = Schema::reference("Status");
        assert!(schema.is_bare_ref());
        assert_eq!(schema.ref_name(), Some("Status"));
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({ "$ref": "#/components/schemas/Status" })
        );

        let decorated = Schema::reference("Status").with_description("current state");
        assert!(decorated.is_ref());
        assert!(!decorated.is_bare_ref());
    }

    #[test]
    fn test_name_is_not_serialized() {
        let mut schema = Schema::object();
        schema.name = Some("Order".into());
        assert_eq!(serde_json::to_value(&schema).unwrap(), json!({ "type": "object" }));
        assert!(Schema { name: Some("x".into()), ..Schema::default() }.is_empty());
    }

    #[test]
    fn test_integral_constraints_serialize_as_integers() {
        let schema = Schema {
            minimum: Some(0.0),
            maximum: Some(9.5),
            ..Schema::typed(SchemaType::Number)
        };
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({ "type": "number", "minimum": 0, "maximum": 9.5 })
        );
    }

    #[test]
    fn test_structure_excludes_decoration() {
        let mut schema = Schema::default().with_description("docs");
        schema.deprecated = Some(true);
        schema.set_nullable();
        assert!(!schema.has_structure());

        schema.pattern = Some("^a".into());
        assert!(schema.has_structure());
    }

    #[test]
    fn test_extensions_flatten() {
        let mut schema = Schema::typed(SchemaType::String);
        schema.extensions.insert("x-internal".into(), json!(true));
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value, json!({ "type": "string", "x-internal": true }));

        let back: Schema = serde_json::from_value(value).unwrap();
        assert_eq!(back.extensions.get("x-internal"), Some(&json!(true)));
    }

    #[test]
    fn test_add_property_tracks_required_once() {
        let mut schema = Schema::object();
        schema.add_property("id", Schema::typed(SchemaType::Integer), true);
        schema.add_property("id", Schema::typed(SchemaType::Integer), true);
        schema.add_property("note", Schema::typed(SchemaType::String), false);
        assert_eq!(schema.required, vec!["id".to_string()]);
        assert_eq!(schema.properties.len(), 2);
    }
}
