//! End-to-end Compilation Tests
//!
//! Compiles the declaration fixtures and checks the registered schemas.

use serde_json::json;
use typeschema::{
    AdditionalProperties, CompilationContext, CompileError, CompilerConfig, CustomSchema, DiagnosticCode,
    DuplicateResolution, ResolveRequest, Schema, SchemaType, TypeRef, TypeUniverse,
};

fn catalog() -> TypeUniverse {
    TypeUniverse::from_json_str(include_str!("fixtures/catalog.json")).unwrap()
}

fn interfaces() -> TypeUniverse {
    TypeUniverse::from_json_str(include_str!("fixtures/interfaces.json")).unwrap()
}

fn subscription() -> TypeUniverse {
    TypeUniverse::from_json_str(include_str!("fixtures/subscription.json")).unwrap()
}

fn money_config() -> CompilerConfig {
    let mut config = CompilerConfig::default();
    config.custom_schemas.push(CustomSchema {
        type_name: "org.money.Money".into(),
        replacement: "com.acme.MoneyView".into(),
    });
    config
}

fn compile(context: &mut CompilationContext<'_>, ty: &str) -> Schema {
    context.compile(&TypeRef::parse(ty).unwrap()).unwrap().unwrap()
}

// =============================================================================
// Interning, Cycles and Naming
// =============================================================================

#[test]
fn test_named_types_are_built_once() {
    let universe = catalog();
    let mut context = CompilationContext::new(&universe, CompilerConfig::default());

    let first = compile(&mut context, "com.acme.Status");
    let second = compile(&mut context, "com.acme.Status");
    assert_eq!(first, second);
    assert!(first.is_bare_ref());
    assert_eq!(context.registry().len(), 1);
}

#[test]
fn test_self_referential_type_terminates() {
    let universe = catalog();
    let mut context = CompilationContext::new(&universe, CompilerConfig::default());

    compile(&mut context, "com.acme.Category");
    let category = context.registry().get("Category").unwrap();
    assert_eq!(category.properties["parent"].ref_name(), Some("Category"));
    assert_eq!(
        category.properties["children"].items.as_ref().and_then(|i| i.ref_name()),
        Some("Category")
    );
    assert_eq!(category.description.as_deref(), Some("Catalog category tree"));
}

#[test]
fn test_generic_names_are_deterministic() {
    let universe = catalog();
    let run = || {
        let mut context = CompilationContext::new(&universe, CompilerConfig::default());
        let foo = compile(&mut context, "com.acme.Wrapper<com.acme.Foo>");
        let bar = compile(&mut context, "com.acme.Wrapper<com.acme.Bar>");
        (
            foo.ref_name().unwrap().to_string(),
            bar.ref_name().unwrap().to_string(),
        )
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first, ("Wrapper_Foo_".to_string(), "Wrapper_Bar_".to_string()));
}

#[test]
fn test_generic_instantiations_bind_members() {
    let universe = catalog();
    let mut context = CompilationContext::new(&universe, CompilerConfig::default());

    compile(&mut context, "com.acme.Wrapper<com.acme.Foo>");
    let wrapper = context.registry().get("Wrapper_Foo_").unwrap();
    assert_eq!(wrapper.properties["value"].ref_name(), Some("Foo"));
    assert!(context.registry().contains("Foo"));
}

#[test]
fn test_colliding_simple_names_get_suffixes() {
    let universe = catalog();
    let mut context = CompilationContext::new(&universe, CompilerConfig::default());

    let orders = compile(&mut context, "com.acme.orders.Item");
    let stock = compile(&mut context, "com.acme.stock.Item");
    assert_eq!(orders.ref_name(), Some("Item"));
    assert_eq!(stock.ref_name(), Some("Item_1"));
    assert!(context.registry().get("Item").unwrap().properties.contains_key("sku"));
    assert!(context.registry().get("Item_1").unwrap().properties.contains_key("count"));

    // Repeat requests keep their names
    assert_eq!(compile(&mut context, "com.acme.stock.Item").ref_name(), Some("Item_1"));
    assert_eq!(compile(&mut context, "com.acme.orders.Item").ref_name(), Some("Item"));
}

#[test]
fn test_strict_mode_rejects_collisions() {
    let universe = catalog();
    let mut config = CompilerConfig::default();
    config.naming.duplicate_resolution = DuplicateResolution::Error;
    let mut context = CompilationContext::new(&universe, config);

    compile(&mut context, "com.acme.orders.Item");
    match context.compile(&TypeRef::named("com.acme.stock.Item")) {
        Err(CompileError::DuplicateSchemaName { name, existing, incoming }) => {
            assert_eq!(name, "Item");
            assert_eq!(existing, "com.acme.orders.Item");
            assert_eq!(incoming, "com.acme.stock.Item");
        }
        other => panic!("Expected DuplicateSchemaName, got {:?}", other),
    }
    assert!(context.diagnostics().has_errors());
}

// =============================================================================
// Inheritance
// =============================================================================

#[test]
fn test_interface_ancestors_flatten_in_order() {
    let universe = interfaces();
    let mut context = CompilationContext::new(&universe, CompilerConfig::default());

    compile(&mut context, "com.acme.docs.Document");
    let document = context.registry().get("Document").unwrap();
    assert_eq!(document.all_of.len(), 3);
    assert_eq!(document.all_of[0].ref_name(), Some("Named"));
    assert_eq!(document.all_of[1].ref_name(), Some("Timestamped"));
    let own = &document.all_of[2];
    assert_eq!(own.schema_type, Some(SchemaType::Object));
    assert_eq!(own.properties.keys().collect::<Vec<_>>(), vec!["title"]);
    assert!(document.properties.is_empty());
    assert!(!context.registry().contains("Marker"));
}

// =============================================================================
// Members and Binding
// =============================================================================

#[test]
fn test_subscription_members() {
    let universe = subscription();
    let mut context = CompilationContext::new(&universe, money_config());

    let reference = compile(&mut context, "com.acme.Subscription");
    assert_eq!(reference.ref_name(), Some("Subscription"));
    let subscription = context.registry().get("Subscription").unwrap();
    let properties = &subscription.properties;

    assert_eq!(subscription.description.as_deref(), Some("A customer subscription"));
    assert_eq!(subscription.required, vec!["id"]);

    let plan = &properties["plan"];
    assert_eq!(plan.pattern.as_deref(), Some("^[A-Z]{3}$"));
    assert_eq!(plan.description.as_deref(), Some("the plan code"));

    assert!(properties["status"].is_bare_ref());

    let history = &properties["history"];
    assert!(history.is_array());
    assert_eq!(history.items.as_ref().and_then(|i| i.ref_name()), Some("Status"));

    let note = &properties["note"];
    assert_eq!(note.schema_type, Some(SchemaType::String));
    assert_eq!(note.nullable, Some(true));

    let events = &properties["events"];
    assert!(events.is_array());
    assert_eq!(events.items.as_ref().and_then(|i| i.schema_type), Some(SchemaType::String));

    assert_eq!(properties["price"].ref_name(), Some("MoneyView"));
    assert!(!context.registry().contains("Money"));

    let seats = &properties["seats"];
    assert_eq!(seats.minimum, Some(1.0));
    assert_eq!(seats.default, Some(json!(5)));
}

#[test]
fn test_reference_collapse_rule() {
    let universe = subscription();
    let mut context = CompilationContext::new(&universe, money_config());

    compile(&mut context, "com.acme.Subscription");
    let subscription = context.registry().get("Subscription").unwrap();

    // Description and deprecation alone keep the bare reference
    let state = &subscription.properties["state"];
    assert!(state.is_bare_ref());
    assert_eq!(state.ref_name(), Some("Status"));

    // A pattern is structure: reference plus overlay
    let legacy = &subscription.properties["legacyState"];
    assert!(!legacy.is_ref());
    assert_eq!(legacy.all_of.len(), 2);
    assert_eq!(legacy.all_of[0].ref_name(), Some("Status"));
    assert_eq!(legacy.all_of[1].pattern.as_deref(), Some("^[A-Z]+$"));
    assert_eq!(legacy.description.as_deref(), Some("Legacy state"));
}

#[test]
fn test_enum_scenarios() {
    let universe = subscription();
    let mut context = CompilationContext::new(&universe, money_config());

    compile(&mut context, "com.acme.Status");
    let status = serde_json::to_value(context.registry().get("Status").unwrap()).unwrap();
    assert_eq!(status, json!({ "type": "string", "enum": ["ACTIVE", "INACTIVE"] }));

    let list = serde_json::to_value(compile(&mut context, "list<com.acme.Status>")).unwrap();
    assert_eq!(
        list,
        json!({ "type": "array", "items": { "$ref": "#/components/schemas/Status" } })
    );

    let map = compile(&mut context, "map<com.acme.Status,string>");
    assert_eq!(map.additional_properties, None);
    assert_eq!(map.properties.keys().collect::<Vec<_>>(), vec!["ACTIVE", "INACTIVE"]);
    for value in map.properties.values() {
        assert_eq!(value, &Schema::typed(SchemaType::String));
    }
}

#[test]
fn test_plain_maps_use_additional_properties() {
    let universe = subscription();
    let mut context = CompilationContext::new(&universe, money_config());

    let map = compile(&mut context, "map<string,com.acme.MoneyView>");
    match map.additional_properties {
        Some(AdditionalProperties::Schema(value)) => assert_eq!(value.ref_name(), Some("MoneyView")),
        other => panic!("Expected a value schema, got {:?}", other),
    }
}

// =============================================================================
// Requests from the surrounding layer
// =============================================================================

#[test]
fn test_streaming_media_type_keeps_element_schema() {
    let universe = subscription();
    let mut context = CompilationContext::new(&universe, money_config());
    let ty = TypeRef::parse("stream<com.acme.Status>").unwrap();
    let media = vec!["application/x-json-stream".to_string()];

    let request = ResolveRequest {
        media_types: &media,
        ..ResolveRequest::new(&ty)
    };
    let schema = context.resolve(&request).unwrap().unwrap();
    assert_eq!(schema.ref_name(), Some("Status"));
}

#[test]
fn test_unknown_types_are_omitted_with_diagnostics() {
    let universe = subscription();
    let mut context = CompilationContext::new(&universe, money_config());

    assert!(context.compile(&TypeRef::named("com.acme.Subscripton")).unwrap().is_none());
    let output = context.finish();
    assert!(output.registry.is_empty());
    let item = output.diagnostics.with_code(DiagnosticCode::UnknownType).next().unwrap();
    assert_eq!(item.context, vec!["did you mean 'com.acme.Subscription'?".to_string()]);
    assert!(!output.diagnostics.has_errors());
}

#[test]
fn test_components_document() {
    let universe = catalog();
    let mut context = CompilationContext::new(&universe, CompilerConfig::default());
    compile(&mut context, "com.acme.Foo");

    let document = context.finish().registry.to_components().unwrap();
    assert_eq!(
        document,
        json!({
            "components": {
                "schemas": {
                    "Foo": {
                        "type": "object",
                        "properties": { "id": { "type": "integer", "format": "int64" } }
                    }
                }
            }
        })
    );
}
