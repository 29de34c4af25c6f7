//! Enum & default value coercion
//!
//! Textual defaults, examples and enum literals are parsed against the
//! `(type, format)` pair of the schema they end up in. Failures never abort a
//! pass: callers record a diagnostic and keep the raw text.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::directive::DirectiveKind;
use crate::schema::SchemaType;
use crate::types::{PrimitiveType, TypeDecl, TypeKind, TypeRef, TypeUniverse};

static URI: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S*$").expect("valid regex"));
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://\S+$").expect("valid regex"));
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").expect("valid regex")
});

/// Why a literal did not fit its schema type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoerceError {
    #[error("expected {expected}")]
    Mismatch { expected: String },

    #[error("{value} does not fit {format}")]
    OutOfRange { value: String, format: String },

    #[error("invalid JSON: {0}")]
    Json(String),
}

fn mismatch(schema_type: SchemaType, format: Option<&str>) -> CoerceError {
    let expected = match format {
        Some(format) => format!("{} ({})", schema_type, format),
        None => schema_type.to_string(),
    };
    CoerceError::Mismatch { expected }
}

/// Parse `raw` for a schema of the given type and format.
///
/// Empty text yields `None` (no value). Untyped and object schemas take
/// JSON text.
pub fn coerce(raw: &str, schema_type: Option<SchemaType>, format: Option<&str>) -> Result<Option<Value>, CoerceError> {
    if raw.is_empty() {
        return Ok(None);
    }

    let value = match schema_type {
        None => serde_json::from_str(raw).map_err(|e| CoerceError::Json(e.to_string()))?,
        Some(SchemaType::Object) => match serde_json::from_str(raw) {
            Ok(Value::Object(map)) => Value::Object(map),
            Ok(_) => return Err(mismatch(SchemaType::Object, None)),
            Err(e) => return Err(CoerceError::Json(e.to_string())),
        },
        Some(SchemaType::Array) => match serde_json::from_str(raw) {
            Ok(Value::Array(items)) => Value::Array(items),
            Ok(_) => return Err(mismatch(SchemaType::Array, None)),
            Err(e) => return Err(CoerceError::Json(e.to_string())),
        },
        Some(SchemaType::String) => coerce_string(raw, format)?,
        Some(SchemaType::Boolean) => {
            if raw.eq_ignore_ascii_case("true") {
                Value::Bool(true)
            } else if raw.eq_ignore_ascii_case("false") {
                Value::Bool(false)
            } else {
                return Err(mismatch(SchemaType::Boolean, None));
            }
        }
        Some(SchemaType::Integer) => coerce_integer(raw.trim(), format)?,
        Some(SchemaType::Number) => coerce_number(raw.trim(), format)?,
        Some(SchemaType::Null) => {
            if raw == "null" {
                Value::Null
            } else {
                return Err(mismatch(SchemaType::Null, None));
            }
        }
    };
    Ok(Some(value))
}

/// Like [`coerce`], but array defaults may be written comma-separated
pub fn coerce_multi_value(
    raw: &str,
    schema_type: Option<SchemaType>,
    format: Option<&str>,
) -> Result<Option<Value>, CoerceError> {
    if schema_type == Some(SchemaType::Array) && !raw.trim_start().starts_with('[') && !raw.is_empty() {
        let items = raw
            .split(',')
            .map(|item| Value::String(item.trim().to_string()))
            .collect();
        return Ok(Some(Value::Array(items)));
    }
    coerce(raw, schema_type, format)
}

fn coerce_string(raw: &str, format: Option<&str>) -> Result<Value, CoerceError> {
    let valid = match format {
        Some("uri") => URI.is_match(raw),
        Some("url") => URL.is_match(raw),
        Some("uuid") => UUID.is_match(raw),
        Some("date") => NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok(),
        Some("date-time") => DateTime::parse_from_rfc3339(raw).is_ok(),
        _ => true,
    };
    if valid {
        Ok(Value::String(raw.to_string()))
    } else {
        Err(mismatch(SchemaType::String, format))
    }
}

fn coerce_integer(raw: &str, format: Option<&str>) -> Result<Value, CoerceError> {
    let out_of_range = |format: &str| CoerceError::OutOfRange {
        value: raw.to_string(),
        format: format.to_string(),
    };
    let is_integral = !raw.is_empty()
        && raw
            .strip_prefix('-')
            .unwrap_or(raw)
            .chars()
            .all(|c| c.is_ascii_digit());
    if !is_integral {
        return Err(mismatch(SchemaType::Integer, format));
    }

    match format {
        Some("int32") => raw
            .parse::<i32>()
            .map(Value::from)
            .map_err(|_| out_of_range("int32")),
        Some("int64") => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| out_of_range("int64")),
        _ => raw
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| raw.parse::<u64>().map(Value::from))
            .map_err(|_| out_of_range("integer")),
    }
}

fn coerce_number(raw: &str, format: Option<&str>) -> Result<Value, CoerceError> {
    let parsed: f64 = raw
        .parse()
        .map_err(|_| mismatch(SchemaType::Number, format))?;
    if format == Some("float") && parsed.is_finite() && (parsed.abs() > f32::MAX as f64) {
        return Err(CoerceError::OutOfRange {
            value: raw.to_string(),
            format: "float".to_string(),
        });
    }
    if format.is_none() {
        if let Ok(integral) = raw.parse::<i64>() {
            return Ok(Value::from(integral));
        }
    }
    Number::from_f64(parsed)
        .map(Value::Number)
        .ok_or_else(|| mismatch(SchemaType::Number, format))
}

// =============================================================================
// Type/format of declared types
// =============================================================================

/// `(type, format)` an occurrence maps to when a directive needs to coerce
/// a literal for it
pub fn type_and_format_of(universe: &TypeUniverse, ty: &TypeRef) -> (SchemaType, Option<String>) {
    match universe.kind_of(ty) {
        TypeKind::Primitive(p) => {
            let (schema_type, format) = p.type_and_format();
            (schema_type, format.map(str::to_string))
        }
        TypeKind::Array(element) if universe.primitive_of(element) == Some(PrimitiveType::Byte) => {
            (SchemaType::String, Some("byte".to_string()))
        }
        TypeKind::Array(_) | TypeKind::Iterable(_) => (SchemaType::Array, None),
        TypeKind::Enum(decl) => enum_type_and_format(universe, decl),
        _ => (SchemaType::Object, None),
    }
}

/// Representation of an enum: its value type if declared, else string
pub fn enum_type_and_format(universe: &TypeUniverse, decl: &TypeDecl) -> (SchemaType, Option<String>) {
    let mut current = decl;
    let mut hops = 0;
    while let Some(value_type) = &current.enum_value_type {
        match universe.kind_of(value_type) {
            TypeKind::Enum(inner) if hops < 8 && inner.name != current.name => {
                current = inner;
                hops += 1;
            }
            TypeKind::Enum(_) => break,
            _ => return type_and_format_of(universe, value_type),
        }
    }
    (SchemaType::String, None)
}

/// Literal set of an enum, honoring hidden constants and value overrides
pub fn enum_values(
    decl: &TypeDecl,
    schema_type: Option<SchemaType>,
    format: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> Option<Vec<Value>> {
    let mut values = Vec::with_capacity(decl.constants.len());
    for constant in &decl.constants {
        if constant.directives.is_hidden() {
            continue;
        }
        let literal = constant
            .directives
            .get(DirectiveKind::JsonProperty)
            .and_then(|d| d.value());
        let value = match literal {
            None => Value::String(constant.name.clone()),
            Some(literal) => match coerce(literal, schema_type, format) {
                Ok(Some(value)) => value,
                Ok(None) => Value::String(constant.name.clone()),
                Err(e) => {
                    diagnostics.coercion_failed(format!("{}.{}", decl.name, constant.name), literal, &e);
                    Value::String(constant.name.clone())
                }
            },
        };
        values.push(value);
    }
    (!values.is_empty()).then_some(values)
}
