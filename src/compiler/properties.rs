//! Member iteration, view filtering and required-ness

use std::collections::HashSet;

use super::resolve::Resolved;
use super::{CompilationContext, Element, PropertyNaming};
use crate::diagnostics::DiagnosticCode;
use crate::directive::{Directive, DirectiveKind};
use crate::error::Result;
use crate::schema::Schema;
use crate::types::{Bindings, MemberKind, TypeDecl, TypeRef, TypedMember};

const NON_NULL_MARKERS: [DirectiveKind; 4] = [
    DirectiveKind::NotNull,
    DirectiveKind::NotBlank,
    DirectiveKind::NotEmpty,
    DirectiveKind::NonNull,
];

impl<'u> CompilationContext<'u> {
    /// Add the visible members of `decl` to `schema`, in declaration order
    pub(super) fn populate_properties(
        &mut self,
        schema: &mut Schema,
        decl: &'u TypeDecl,
        bindings: &Bindings,
        media_types: &[String],
        view: Option<&str>,
    ) -> Result<()> {
        for member in &decl.members {
            if member.is_static {
                continue;
            }
            if member.member_kind == MemberKind::Field && !self.config.field_visibility.allows(member.visibility) {
                continue;
            }
            if member.directives.is_hidden() {
                tracing::trace!(owner = %decl.name, member = %member.name, "hidden member");
                continue;
            }
            if !self.in_view(decl, member, view) {
                tracing::trace!(owner = %decl.name, member = %member.name, "outside the active view");
                continue;
            }

            let element = Element::member(decl, member);
            let ty = member.ty.substitute(bindings);
            let Some(resolved) = self.resolve_occurrence(Some(element), &ty, media_types, view)? else {
                continue;
            };
            self.process_schema_property(schema, decl, member, &ty, resolved)?;
        }
        Ok(())
    }

    /// Whether a member is visible under the active view
    fn in_view(&self, decl: &TypeDecl, member: &TypedMember, view: Option<&str>) -> bool {
        let Some(view) = view else {
            return true;
        };
        let views = member
            .directives
            .get(DirectiveKind::JsonView)
            .or_else(|| decl.directives.get(DirectiveKind::JsonView))
            .map(|d| d.strings("value"))
            .unwrap_or_default();
        if views.is_empty() {
            return self.config.json_view.default_inclusion;
        }
        views.iter().any(|v| self.universe.is_assignable(view, v))
    }

    fn process_schema_property(
        &mut self,
        parent: &mut Schema,
        owner: &'u TypeDecl,
        member: &'u TypedMember,
        ty: &TypeRef,
        resolved: Resolved,
    ) -> Result<()> {
        let directives = &member.directives;

        if let Some(unwrapped) = directives
            .get(DirectiveKind::Unwrapped)
            .filter(|d| d.bool("enabled").unwrap_or(true))
        {
            self.inline_unwrapped(parent, unwrapped, &resolved.schema);
            return Ok(());
        }

        let schema_directive = directives.get(DirectiveKind::Schema);
        let json_property = directives.get(DirectiveKind::JsonProperty);

        let not_nullable = NON_NULL_MARKERS.iter().any(|kind| directives.has(*kind))
            || member.nullable == Some(false)
            || json_property.and_then(|d| d.bool("required")) == Some(true);
        let is_nullable =
            resolved.nullable || member.nullable == Some(true) || directives.has(DirectiveKind::Nullable);

        let explicit = schema_directive.and_then(|d| {
            d.bool("required").or(match d.str("requiredMode") {
                Some("REQUIRED") => Some(true),
                Some("NOT_REQUIRED") => Some(false),
                _ => None,
            })
        });
        let required = explicit.unwrap_or_else(|| {
            not_nullable || (owner.is_mandatory_in_constructor(&member.name) && !is_nullable)
        });

        let element = Element::member(owner, member);
        let bound = self.bind_schema_for_element(element, ty, resolved.schema, is_nullable && !not_nullable)?;
        let name = self.property_name(owner, member);
        parent.add_property(&name, bound, required);
        Ok(())
    }

    /// Serialized name: explicit name, then `json-property`, then the
    /// owner's naming strategy
    fn property_name(&mut self, owner: &TypeDecl, member: &TypedMember) -> String {
        let directives = &member.directives;
        if let Some(name) = directives.get(DirectiveKind::Schema).and_then(|d| d.str("name")) {
            return name.to_string();
        }
        if let Some(name) = directives.get(DirectiveKind::JsonProperty).and_then(|d| d.value()) {
            return name.to_string();
        }

        let strategy = owner
            .directives
            .get(DirectiveKind::Naming)
            .and_then(|d| d.value().or_else(|| d.str("strategy")));
        match strategy.map(str::parse::<PropertyNaming>) {
            Some(Ok(naming)) => naming.translate(&member.name),
            Some(Err(e)) => {
                self.diagnostics
                    .warning(&owner.name, DiagnosticCode::InvalidDirectiveValue, e);
                member.name.clone()
            }
            None => member.name.clone(),
        }
    }

    /// Copy the properties of an unwrapped member's type into the parent
    fn inline_unwrapped(&self, parent: &mut Schema, directive: &Directive, resolved: &Schema) {
        let prefix = directive.str("prefix").unwrap_or("");
        let suffix = directive.str("suffix").unwrap_or("");
        let mut seen = HashSet::new();
        let mut inlined = Vec::new();
        self.collect_properties(resolved, &mut seen, &mut inlined);
        for (name, schema, required) in inlined {
            parent.add_property(&format!("{}{}{}", prefix, name, suffix), schema, required);
        }
    }

    /// Properties of a schema, following references and `allOf` members
    fn collect_properties(&self, schema: &Schema, seen: &mut HashSet<String>, out: &mut Vec<(String, Schema, bool)>) {
        let target = if schema.is_ref() {
            match schema.ref_name() {
                Some(name) if seen.insert(name.to_string()) => self.registry.get(name),
                _ => None,
            }
        } else {
            Some(schema)
        };
        let Some(target) = target else {
            return;
        };
        for member in &target.all_of {
            self.collect_properties(member, seen, out);
        }
        for (name, property) in &target.properties {
            out.push((name.clone(), property.clone(), target.required.contains(name)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ResolveRequest;
    use crate::config::CompilerConfig;
    use crate::types::{TypeUniverse, Visibility};
    use serde_json::json;

    fn universe(value: serde_json::Value) -> TypeUniverse {
        TypeUniverse::from_json_str(&value.to_string()).unwrap()
    }

    #[test]
    fn test_hidden_static_and_private_members() {
        let universe = universe(json!([{
            "name": "com.acme.Account",
            "members": [
                { "name": "id", "type": "long" },
                { "name": "secret", "type": "string", "directives": { "hidden": true } },
                { "name": "parent", "type": "com.acme.Account", "directives": { "back-reference": true } },
                { "name": "VERSION", "type": "int", "static": true },
                { "name": "cache", "type": "string", "member_kind": "field", "visibility": "private" },
                { "name": "label", "type": "string", "member_kind": "field", "visibility": "protected" }
            ]
        }]));
        let mut config = CompilerConfig::default();
        config.field_visibility = Visibility::Protected;
        let mut context = CompilationContext::new(&universe, config);

        context.compile_named("com.acme.Account").unwrap();
        let account = context.registry().get("Account").unwrap();
        let names: Vec<_> = account.properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["id", "label"]);
    }

    #[test]
    fn test_required_rules() {
        let universe = universe(json!([{
            "name": "com.acme.Order",
            "constructor": [{ "name": "id" }, { "name": "note", "nullable": true }],
            "members": [
                { "name": "id", "type": "long" },
                { "name": "note", "type": "string" },
                { "name": "code", "type": "string", "directives": { "not-blank": true } },
                { "name": "total", "type": "big-decimal", "nullable": false },
                { "name": "memo", "type": "string", "directives": { "not-null": true, "schema": { "requiredMode": "NOT_REQUIRED" } } },
                { "name": "tag", "type": "string", "directives": { "schema": { "required": true } } },
                { "name": "hint", "type": "optional<string>" }
            ]
        }]));
        let mut context = CompilationContext::new(&universe, CompilerConfig::default());

        context.compile_named("com.acme.Order").unwrap();
        let order = context.registry().get("Order").unwrap();
        assert_eq!(order.required, vec!["id", "code", "total", "tag"]);
        assert_eq!(order.properties["hint"].nullable, Some(true));
        assert_eq!(order.properties["code"].min_length, Some(1));
    }

    #[test]
    fn test_property_names() {
        let universe = universe(json!([{
            "name": "com.acme.Event",
            "directives": { "naming": "SNAKE_CASE" },
            "members": [
                { "name": "createdAt", "type": "date-time" },
                { "name": "eventId", "type": "uuid", "directives": { "json-property": "id" } },
                { "name": "payloadSize", "type": "int", "directives": { "schema": { "name": "size" } } }
            ]
        }]));
        let mut context = CompilationContext::new(&universe, CompilerConfig::default());

        context.compile_named("com.acme.Event").unwrap();
        let event = context.registry().get("Event").unwrap();
        let names: Vec<_> = event.properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["created_at", "id", "size"]);
    }

    #[test]
    fn test_view_filtering() {
        let universe = universe(json!([
            { "name": "com.acme.Views$Public", "kind": "interface" },
            { "name": "com.acme.Views$Internal", "kind": "interface", "interfaces": ["com.acme.Views$Public"] },
            {
                "name": "com.acme.Profile",
                "members": [
                    { "name": "name", "type": "string", "directives": { "json-view": "com.acme.Views$Public" } },
                    { "name": "email", "type": "string", "directives": { "json-view": ["com.acme.Views$Internal"] } },
                    { "name": "score", "type": "int" }
                ]
            }
        ]));
        let mut config = CompilerConfig::default();
        config.json_view.default_inclusion = false;
        let mut context = CompilationContext::new(&universe, config);
        let ty = TypeRef::named("com.acme.Profile");

        let public = ResolveRequest {
            view: Some("com.acme.Views$Public"),
            ..ResolveRequest::new(&ty)
        };
        let reference = context.resolve(&public).unwrap().unwrap();
        assert_eq!(reference.ref_name(), Some("Profile_Public"));
        let profile = context.registry().get("Profile_Public").unwrap();
        assert_eq!(profile.properties.keys().collect::<Vec<_>>(), vec!["name"]);

        let internal = ResolveRequest {
            view: Some("com.acme.Views$Internal"),
            ..ResolveRequest::new(&ty)
        };
        context.resolve(&internal).unwrap();
        let profile = context.registry().get("Profile_Internal").unwrap();
        assert_eq!(profile.properties.keys().collect::<Vec<_>>(), vec!["name", "email"]);
    }

    #[test]
    fn test_unwrapped_member_inlines_properties() {
        let universe = universe(json!([
            {
                "name": "com.acme.Address",
                "members": [
                    { "name": "city", "type": "string", "directives": { "not-null": true } },
                    { "name": "zip", "type": "string" }
                ]
            },
            {
                "name": "com.acme.Customer",
                "members": [
                    { "name": "name", "type": "string" },
                    { "name": "home", "type": "com.acme.Address", "directives": { "unwrapped": { "prefix": "home_" } } }
                ]
            }
        ]));
        let mut context = CompilationContext::new(&universe, CompilerConfig::default());

        context.compile_named("com.acme.Customer").unwrap();
        let customer = context.registry().get("Customer").unwrap();
        let names: Vec<_> = customer.properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["name", "home_city", "home_zip"]);
        assert_eq!(customer.required, vec!["home_city"]);
    }

    #[test]
    fn test_optional_reference_nullable_on_outer_schema() {
        let universe = universe(json!([
            { "name": "com.acme.Addr", "members": [{ "name": "city", "type": "string" }] },
            {
                "name": "com.acme.Holder",
                "members": [
                    {
                        "name": "billing",
                        "type": "optional<com.acme.Addr>",
                        "directives": { "schema": { "minProperties": 1 } }
                    },
                    { "name": "shipping", "type": "optional<com.acme.Addr>" }
                ]
            }
        ]));
        let mut context = CompilationContext::new(&universe, CompilerConfig::default());

        context.compile_named("com.acme.Holder").unwrap();
        let holder = context.registry().get("Holder").unwrap();

        let billing = &holder.properties["billing"];
        assert_eq!(billing.nullable, Some(true));
        assert_eq!(billing.all_of.len(), 2);
        assert_eq!(billing.all_of[0], Schema::reference("Addr"));
        assert_eq!(billing.all_of[0].nullable, None);
        assert_eq!(billing.all_of[1].min_properties, Some(1));
        assert_eq!(billing.all_of[1].nullable, None);

        let shipping = &holder.properties["shipping"];
        assert_eq!(shipping.ref_name(), Some("Addr"));
        assert_eq!(shipping.nullable, Some(true));
        assert!(shipping.all_of.is_empty());
    }

    #[test]
    fn test_type_override_coerces_literals_once() {
        let universe = universe(json!([
            { "name": "com.acme.Qty", "members": [{ "name": "amount", "type": "long" }] },
            {
                "name": "com.acme.Line",
                "members": [{
                    "name": "qty",
                    "type": "com.acme.Qty",
                    "directives": { "schema": { "type": "integer", "example": "lots" } }
                }]
            }
        ]));
        let mut context = CompilationContext::new(&universe, CompilerConfig::default());

        context.compile_named("com.acme.Line").unwrap();
        let qty = &context.registry().get("Line").unwrap().properties["qty"];
        assert_eq!(qty.schema_type, Some(crate::schema::SchemaType::Integer));
        assert_eq!(qty.format.as_deref(), Some("int32"));
        assert_eq!(qty.example, Some(json!("lots")));
        assert_eq!(context.diagnostics().with_code(DiagnosticCode::CoercionFailed).count(), 1);
        assert!(!context.registry().contains("Qty"));
    }

    #[test]
    fn test_self_reference_breaks_cycle() {
        let universe = universe(json!([{
            "name": "com.acme.Node",
            "members": [
                { "name": "value", "type": "string" },
                { "name": "next", "type": "com.acme.Node" },
                { "name": "children", "type": "list<com.acme.Node>" }
            ]
        }]));
        let mut context = CompilationContext::new(&universe, CompilerConfig::default());

        let reference = context.compile_named("com.acme.Node").unwrap().unwrap();
        assert_eq!(reference.ref_name(), Some("Node"));
        let node = context.registry().get("Node").unwrap();
        assert_eq!(node.properties["next"].ref_name(), Some("Node"));
        let children = node.properties["children"].items.as_ref().unwrap();
        assert_eq!(children.ref_name(), Some("Node"));
        assert_eq!(context.registry().len(), 1);
    }
}
