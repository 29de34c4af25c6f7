//! Built-in value types and their fixed `(type, format)` mapping

use serde::{Deserialize, Serialize};

use crate::schema::{Schema, SchemaType};

/// Well-known value types every universe starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveType {
    String,
    Char,
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    Number,
    Uuid,
    Uri,
    Url,
    Date,
    DateTime,
    Time,
    File,
    Object,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 20] = [
        Self::String,
        Self::Char,
        Self::Boolean,
        Self::Byte,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::BigInteger,
        Self::BigDecimal,
        Self::Number,
        Self::Uuid,
        Self::Uri,
        Self::Url,
        Self::Date,
        Self::DateTime,
        Self::Time,
        Self::File,
        Self::Object,
    ];

    /// Name the type is declared under in a universe
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Char => "char",
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::BigInteger => "big-integer",
            Self::BigDecimal => "big-decimal",
            Self::Number => "number",
            Self::Uuid => "uuid",
            Self::Uri => "uri",
            Self::Url => "url",
            Self::Date => "date",
            Self::DateTime => "date-time",
            Self::Time => "time",
            Self::File => "file",
            Self::Object => "object",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Map a schema directive's `type` text onto a value type.
    ///
    /// Accepts both plain OpenAPI type names and format names.
    pub fn from_common_name(name: &str) -> Option<Self> {
        let primitive = match name {
            "string" | "email" | "password" => Self::String,
            "boolean" => Self::Boolean,
            "integer" | "int" | "int32" => Self::Int,
            "long" | "int64" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "number" => Self::BigDecimal,
            "byte" => Self::Byte,
            "binary" | "file" => Self::File,
            "uri" => Self::Uri,
            "url" => Self::Url,
            "uuid" => Self::Uuid,
            "date" => Self::Date,
            "date-time" => Self::DateTime,
            "partial-time" | "time" => Self::Time,
            "object" => Self::Object,
            _ => return None,
        };
        Some(primitive)
    }

    /// Fixed `(type, format)` pair
    pub fn type_and_format(&self) -> (SchemaType, Option<&'static str>) {
        match self {
            Self::String | Self::Char => (SchemaType::String, None),
            Self::Boolean => (SchemaType::Boolean, None),
            Self::Byte | Self::Short | Self::Int => (SchemaType::Integer, Some("int32")),
            Self::Long => (SchemaType::Integer, Some("int64")),
            Self::BigInteger => (SchemaType::Integer, None),
            Self::Float => (SchemaType::Number, Some("float")),
            Self::Double => (SchemaType::Number, Some("double")),
            Self::BigDecimal | Self::Number => (SchemaType::Number, None),
            Self::Uuid => (SchemaType::String, Some("uuid")),
            Self::Uri => (SchemaType::String, Some("uri")),
            Self::Url => (SchemaType::String, Some("url")),
            Self::Date => (SchemaType::String, Some("date")),
            Self::DateTime => (SchemaType::String, Some("date-time")),
            Self::Time => (SchemaType::String, Some("partial-time")),
            Self::File => (SchemaType::String, Some("binary")),
            Self::Object => (SchemaType::Object, None),
        }
    }

    /// Fresh inline schema
    pub fn schema(&self) -> Schema {
        let (schema_type, format) = self.type_and_format();
        let schema = Schema::typed(schema_type);
        match format {
            Some(format) => schema.with_format(format),
            None => schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for primitive in PrimitiveType::ALL {
            assert_eq!(PrimitiveType::from_name(primitive.name()), Some(primitive));
        }
        assert_eq!(PrimitiveType::from_name("java.lang.String"), None);
    }

    #[test]
    fn test_fixed_pairs() {
        assert_eq!(PrimitiveType::Long.type_and_format(), (SchemaType::Integer, Some("int64")));
        assert_eq!(PrimitiveType::Time.type_and_format(), (SchemaType::String, Some("partial-time")));
        assert_eq!(PrimitiveType::BigInteger.type_and_format(), (SchemaType::Integer, None));
        assert_eq!(PrimitiveType::File.schema().format.as_deref(), Some("binary"));
    }

    #[test]
    fn test_common_names() {
        assert_eq!(PrimitiveType::from_common_name("integer"), Some(PrimitiveType::Int));
        assert_eq!(PrimitiveType::from_common_name("number"), Some(PrimitiveType::BigDecimal));
        assert_eq!(PrimitiveType::from_common_name("array"), None);
    }
}
