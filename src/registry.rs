//! Schema Registry
//!
//! Pass-scoped interning table from canonical name to finished schema, plus
//! the in-progress set that breaks recursive type graphs.

use indexmap::{IndexMap, IndexSet};
use serde_json::{json, Value};

use crate::schema::Schema;

/// Prefix of every local schema reference
pub const COMPONENTS_SCHEMAS_REF: &str = "#/components/schemas/";

/// Named schemas produced by one compilation pass
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Schema>,
    in_progress: IndexSet<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.schemas.get_mut(name)
    }

    /// Follow a local `$ref` to its entry
    pub fn resolve_ref(&self, schema: &Schema) -> Option<&Schema> {
        schema.ref_name().and_then(|name| self.schemas.get(name))
    }

    /// Store a finished definition; the first definition of a name wins
    pub fn register(&mut self, name: &str, mut schema: Schema) -> bool {
        if self.schemas.contains_key(name) {
            return false;
        }
        if schema.is_bare_ref() {
            tracing::warn!(schema = name, "registering a bare reference as a definition");
        }
        schema.name = Some(name.to_string());
        tracing::debug!(schema = name, "registered schema");
        self.schemas.insert(name.to_string(), schema);
        true
    }

    /// Mark a name as being built; false when it already is
    pub fn begin(&mut self, name: &str) -> bool {
        self.in_progress.insert(name.to_string())
    }

    pub fn finish(&mut self, name: &str) {
        self.in_progress.shift_remove(name);
    }

    pub fn is_in_progress(&self, name: &str) -> bool {
        self.in_progress.contains(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn schemas(&self) -> &IndexMap<String, Schema> {
        &self.schemas
    }

    pub fn into_schemas(self) -> IndexMap<String, Schema> {
        self.schemas
    }

    /// `{"components": {"schemas": {...}}}` document fragment
    pub fn to_components(&self) -> serde_json::Result<Value> {
        Ok(json!({ "components": { "schemas": serde_json::to_value(&self.schemas)? } }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaType;

    #[test]
    fn test_first_registration_wins() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.register("Order", Schema::object()));
        assert!(!registry.register("Order", Schema::typed(SchemaType::String)));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("Order").unwrap().is_object());
        assert_eq!(registry.get("Order").unwrap().name.as_deref(), Some("Order"));
    }

    #[test]
    fn test_in_progress_tracking() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.begin("Node"));
        assert!(!registry.begin("Node"));
        assert!(registry.is_in_progress("Node"));
        registry.finish("Node");
        assert!(!registry.is_in_progress("Node"));
    }

    #[test]
    fn test_resolve_ref_and_components() {
        let mut registry = SchemaRegistry::new();
        registry.register("Status", Schema::typed(SchemaType::String));
        let pointer = Schema::reference("Status");
        assert_eq!(
            registry.resolve_ref(&pointer).and_then(|s| s.schema_type),
            Some(SchemaType::String)
        );
        assert_eq!(
            registry.to_components().unwrap(),
            json!({ "components": { "schemas": { "Status": { "type": "string" } } } })
        );
    }
}
