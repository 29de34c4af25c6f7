//! Directive normalization
//!
//! Each [`DirectiveKind`] maps to one pure transform over its value map. The
//! table is open: callers may replace or add handlers before building a
//! universe.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{Directive, DirectiveKind, Directives};
use crate::registry::COMPONENTS_SCHEMAS_REF;

/// Pure transform applied to one directive's value map
pub type DirectiveHandler = fn(Directive) -> Directive;

/// Handler table keyed by directive kind
#[derive(Debug, Clone)]
pub struct DirectiveExtractor {
    handlers: HashMap<DirectiveKind, DirectiveHandler>,
}

impl Default for DirectiveExtractor {
    fn default() -> Self {
        let mut handlers: HashMap<DirectiveKind, DirectiveHandler> = HashMap::new();
        handlers.insert(DirectiveKind::Schema, normalize_schema);
        handlers.insert(DirectiveKind::ArraySchema, normalize_array_schema);
        handlers.insert(DirectiveKind::JsonProperty, normalize_json_property);
        handlers.insert(DirectiveKind::Bindable, normalize_bindable);
        handlers.insert(DirectiveKind::JsonView, normalize_value_list);
        handlers.insert(DirectiveKind::Unwrapped, normalize_unwrapped);
        handlers.insert(DirectiveKind::Email, normalize_regexp);
        handlers.insert(DirectiveKind::Pattern, normalize_regexp);
        handlers.insert(DirectiveKind::Min, normalize_bound);
        handlers.insert(DirectiveKind::Max, normalize_bound);
        handlers.insert(DirectiveKind::DecimalMin, normalize_bound);
        handlers.insert(DirectiveKind::DecimalMax, normalize_bound);
        handlers.insert(DirectiveKind::Size, normalize_size);
        Self { handlers }
    }
}

impl DirectiveExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler, returning the one it replaces
    pub fn register(&mut self, kind: DirectiveKind, handler: DirectiveHandler) -> Option<DirectiveHandler> {
        self.handlers.insert(kind, handler)
    }

    /// Normalize one directive; kinds without a handler pass through
    pub fn normalize(&self, kind: DirectiveKind, directive: Directive) -> Directive {
        match self.handlers.get(&kind) {
            Some(handler) => handler(directive),
            None => directive,
        }
    }

    /// Normalize a whole directive set
    pub fn extract(&self, raw: Directives) -> Directives {
        raw.into_inner()
            .into_iter()
            .map(|(kind, directive)| (kind, self.normalize(kind, directive)))
            .collect()
    }
}

// =============================================================================
// Built-in handlers
// =============================================================================

fn rename(map: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = map.remove(from) {
        map.insert(to.to_string(), value);
    }
}

/// Parse text that looks like a JSON object or array
fn parse_json_text(value: Value) -> Value {
    if let Value::String(s) = &value {
        let trimmed = s.trim();
        let looks_structured = (trimmed.starts_with('{') && trimmed.ends_with('}'))
            || (trimmed.starts_with('[') && trimmed.ends_with(']'));
        if looks_structured {
            if let Ok(parsed) = serde_json::from_str(trimmed) {
                return parsed;
            }
        }
    }
    value
}

/// Prefix bare schema names with the components path
pub(crate) fn expand_ref(reference: &str) -> String {
    if reference.contains('/') {
        reference.to_string()
    } else {
        format!("{}{}", COMPONENTS_SCHEMAS_REF, reference)
    }
}

fn extension_key(name: &str) -> String {
    if name.starts_with("x-") {
        name.to_string()
    } else {
        format!("x-{}", name)
    }
}

fn extension_value(property: &Map<String, Value>) -> Value {
    let value = property.get("value").cloned().unwrap_or(Value::Null);
    let parse = property
        .get("parseValue")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if let (Value::String(text), true) = (&value, parse) {
        if let Ok(parsed) = serde_json::from_str(text) {
            return parsed;
        }
    }
    value
}

/// Extensions arrive either as a ready `x-` map or as a list of
/// `{ name, properties: [{ name, value, parseValue }] }` groups
fn normalize_extensions(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (extension_key(&key), value))
                .collect(),
        ),
        Value::Array(groups) => {
            let mut out = Map::new();
            for group in groups {
                let Value::Object(group) = group else { continue };
                let name = group.get("name").and_then(Value::as_str).unwrap_or("");
                let properties = group
                    .get("properties")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();

                let mut nested = Map::new();
                for property in properties {
                    let Value::Object(property) = property else { continue };
                    let Some(prop_name) = property.get("name").and_then(Value::as_str) else {
                        continue;
                    };
                    if name.is_empty() {
                        out.insert(extension_key(prop_name), extension_value(&property));
                    } else {
                        nested.insert(prop_name.to_string(), extension_value(&property));
                    }
                }
                if !name.is_empty() && !nested.is_empty() {
                    out.insert(extension_key(name), Value::Object(nested));
                }
            }
            Value::Object(out)
        }
        other => other,
    }
}

fn normalize_discriminator(map: &mut Map<String, Value>) {
    let property = map.remove("discriminatorProperty");
    let mapping = map.remove("discriminatorMapping");
    if property.is_none() && mapping.is_none() {
        return;
    }

    let mut discriminator = Map::new();
    if let Some(Value::String(name)) = property {
        if !name.is_empty() {
            discriminator.insert("propertyName".to_string(), Value::String(name));
        }
    }

    let mut refs = Map::new();
    let mut schemas = Map::new();
    if let Some(Value::Array(entries)) = mapping {
        for entry in entries {
            let Value::Object(entry) = entry else { continue };
            let Some(value) = entry.get("value").and_then(Value::as_str) else {
                continue;
            };
            if let Some(reference) = entry.get("ref").and_then(Value::as_str).filter(|r| !r.is_empty()) {
                refs.insert(value.to_string(), Value::String(expand_ref(reference)));
            } else if let Some(schema) = entry.get("schema").and_then(Value::as_str) {
                schemas.insert(value.to_string(), Value::String(schema.to_string()));
            }
        }
    }
    if !refs.is_empty() {
        discriminator.insert("mapping".to_string(), Value::Object(refs));
    }
    if !schemas.is_empty() {
        discriminator.insert("mappingSchemas".to_string(), Value::Object(schemas));
    }
    if !discriminator.is_empty() {
        map.insert("discriminator".to_string(), Value::Object(discriminator));
    }
}

fn normalize_schema(directive: Directive) -> Directive {
    let mut map = directive.into_map();

    if let Some(Value::String(reference)) = map.remove("ref") {
        if !reference.is_empty() {
            map.insert("$ref".to_string(), Value::String(expand_ref(&reference)));
        }
    }
    rename(&mut map, "defaultValue", "default");
    rename(&mut map, "allowableValues", "enum");

    match map.remove("accessMode").as_ref().and_then(Value::as_str) {
        Some("READ_ONLY") => {
            map.insert("readOnly".to_string(), Value::Bool(true));
        }
        Some("WRITE_ONLY") => {
            map.insert("writeOnly".to_string(), Value::Bool(true));
        }
        _ => {}
    }

    if let Some(value) = map.remove("additionalProperties") {
        match value {
            Value::String(s) if s.eq_ignore_ascii_case("true") => {
                map.insert("additionalProperties".to_string(), Value::Bool(true));
            }
            Value::String(s) if s.eq_ignore_ascii_case("false") => {}
            other => {
                map.insert("additionalProperties".to_string(), other);
            }
        }
    }

    normalize_discriminator(&mut map);

    if let Some(extensions) = map.remove("extensions") {
        map.insert("extensions".to_string(), normalize_extensions(extensions));
    }

    for key in ["example", "default"] {
        if let Some(value) = map.remove(key) {
            map.insert(key.to_string(), parse_json_text(value));
        }
    }

    Directive::from_map(map)
}

fn normalize_array_schema(directive: Directive) -> Directive {
    let mut map = directive.into_map();

    if let Some(Value::Object(array)) = map.remove("arraySchema") {
        let array = normalize_schema(Directive::from_map(array)).into_map();
        for (key, value) in array {
            if key != "implementation" {
                map.entry(key).or_insert(value);
            }
        }
    }
    if let Some(Value::Object(items)) = map.remove("schema") {
        let items = normalize_schema(Directive::from_map(items));
        if !items.is_empty() {
            map.insert("items".to_string(), Value::Object(items.into_map()));
        }
    }

    Directive::from_map(map)
}

fn normalize_json_property(directive: Directive) -> Directive {
    let mut map = directive.into_map();
    if let Some(Value::String(value)) = map.get_mut("value") {
        *value = value.trim().to_string();
    }
    rename(&mut map, "defaultValue", "default");
    Directive::from_map(map)
}

fn normalize_bindable(directive: Directive) -> Directive {
    let mut map = directive.into_map();
    rename(&mut map, "defaultValue", "default");
    Directive::from_map(map)
}

fn normalize_value_list(directive: Directive) -> Directive {
    let values = directive.strings("value");
    Directive::new().with(
        "value",
        Value::Array(values.into_iter().map(Value::String).collect()),
    )
}

fn normalize_unwrapped(directive: Directive) -> Directive {
    let prefix = directive.str("prefix").unwrap_or("").to_string();
    let suffix = directive.str("suffix").unwrap_or("").to_string();
    let enabled = directive.bool("enabled").unwrap_or(true);
    Directive::new()
        .with("prefix", prefix)
        .with("suffix", suffix)
        .with("enabled", enabled)
}

fn normalize_regexp(directive: Directive) -> Directive {
    let mut map = directive.into_map();
    if !map.contains_key("regexp") {
        rename(&mut map, "value", "regexp");
    }
    Directive::from_map(map)
}

fn normalize_bound(directive: Directive) -> Directive {
    let mut map = directive.into_map();
    if let Some(Value::String(text)) = map.get("value") {
        if let Some(number) = text.trim().parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            map.insert("value".to_string(), Value::Number(number));
        }
    }
    Directive::from_map(map)
}

fn normalize_size(directive: Directive) -> Directive {
    let mut map = Map::new();
    if let Some(min) = directive.u64("min") {
        map.insert("min".to_string(), Value::from(min));
    }
    if let Some(max) = directive.u64("max") {
        map.insert("max".to_string(), Value::from(max));
    }
    Directive::from_map(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn directive(value: Value) -> Directive {
        match value {
            Value::Object(map) => Directive::from_map(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_schema_renames() {
        let extractor = DirectiveExtractor::default();
        let out = extractor.normalize(
            DirectiveKind::Schema,
            directive(json!({
                "ref": "Money",
                "defaultValue": "{\"amount\": 1}",
                "allowableValues": ["a", "b"],
                "accessMode": "READ_ONLY",
                "additionalProperties": "TRUE"
            })),
        );

        assert_eq!(out.str("$ref"), Some("#/components/schemas/Money"));
        assert_eq!(out.get("default"), Some(&json!({"amount": 1})));
        assert_eq!(out.get("enum"), Some(&json!(["a", "b"])));
        assert_eq!(out.bool("readOnly"), Some(true));
        assert_eq!(out.get("additionalProperties"), Some(&json!(true)));
        assert!(!out.contains("accessMode"));
    }

    #[test]
    fn test_discriminator_mapping() {
        let out = normalize_schema(directive(json!({
            "discriminatorProperty": "kind",
            "discriminatorMapping": [
                { "value": "cat", "ref": "Cat" },
                { "value": "dog", "schema": "com.acme.Dog" }
            ]
        })));

        assert_eq!(
            out.get("discriminator"),
            Some(&json!({
                "propertyName": "kind",
                "mapping": { "cat": "#/components/schemas/Cat" },
                "mappingSchemas": { "dog": "com.acme.Dog" }
            }))
        );
    }

    #[test]
    fn test_extension_groups() {
        let out = normalize_schema(directive(json!({
            "extensions": [
                { "name": "", "properties": [{ "name": "internal", "value": "true", "parseValue": true }] },
                { "name": "audit", "properties": [{ "name": "owner", "value": "billing" }] }
            ]
        })));

        assert_eq!(
            out.get("extensions"),
            Some(&json!({ "x-internal": true, "x-audit": { "owner": "billing" } }))
        );
    }

    #[test]
    fn test_array_schema_flattening() {
        let out = normalize_array_schema(directive(json!({
            "arraySchema": { "description": "Tags", "implementation": "ignored" },
            "schema": { "allowableValues": ["red", "green"] },
            "minItems": 1
        })));

        assert_eq!(out.str("description"), Some("Tags"));
        assert!(!out.contains("implementation"));
        assert_eq!(out.u64("minItems"), Some(1));
        assert_eq!(out.sub("items").and_then(|i| i.get("enum").cloned()), Some(json!(["red", "green"])));
    }

    #[test]
    fn test_custom_handler_replaces_builtin() {
        fn drop_all(_: Directive) -> Directive {
            Directive::new()
        }

        let mut extractor = DirectiveExtractor::default();
        assert!(extractor.register(DirectiveKind::Size, drop_all).is_some());
        let out = extractor.normalize(DirectiveKind::Size, directive(json!({ "min": 3 })));
        assert!(out.is_empty());
    }

    #[test]
    fn test_pattern_value_alias() {
        let out = normalize_regexp(Directive::new().with("value", "^[a-z]+$"));
        assert_eq!(out.str("regexp"), Some("^[a-z]+$"));
    }
}
