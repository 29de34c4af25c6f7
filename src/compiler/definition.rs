//! Named definitions and inheritance flattening

use std::collections::HashSet;

use super::{CompilationContext, Element};
use crate::coerce::{enum_type_and_format, enum_values, type_and_format_of};
use crate::diagnostics::{DiagnosticCode, DiagnosticItem};
use crate::directive::{Directive, DirectiveKind};
use crate::doc::DocText;
use crate::error::{CompileError, Result};
use crate::names::NameRequest;
use crate::schema::{ExternalDocs, Schema, SchemaType};
use crate::types::{Bindings, DeclKind, TypeDecl, TypeRef};

impl<'u> CompilationContext<'u> {
    /// Build (once) and register the named schema of a declared type and
    /// return a `$ref` to it
    pub(crate) fn get_schema_definition(
        &mut self,
        element: Option<Element<'_>>,
        ty: &TypeRef,
        media_types: &[String],
        view: Option<&str>,
    ) -> Result<Option<Schema>> {
        let universe = self.universe;
        let Some(decl) = universe.decl_of(ty) else {
            let name = ty.name().unwrap_or_default();
            self.diagnostics.unknown_type(ty.to_string(), name, universe.suggest(name));
            return Ok(None);
        };

        let type_directive = decl.directives.get(DirectiveKind::Schema);
        let stereotype = element
            .and_then(|e| e.directive(DirectiveKind::Stereotype))
            .or_else(|| decl.directives.get(DirectiveKind::Stereotype))
            .and_then(|d| d.str("name").or_else(|| d.value()));
        let request = NameRequest {
            explicit: type_directive.and_then(|d| d.str("name")),
            stereotype,
            ty,
            view,
        };

        let name = match self.names.compute_name(&self.config, universe, request) {
            Ok(name) => name,
            Err(e) => {
                if let CompileError::DuplicateSchemaName { .. } = &e {
                    self.diagnostics.push(DiagnosticItem::new(
                        ty.to_string(),
                        DiagnosticCode::DuplicateSchemaName,
                        e.to_string(),
                    ));
                }
                return Err(e);
            }
        };

        if self.registry.contains(&name) || self.registry.is_in_progress(&name) {
            return Ok(Some(Schema::reference(&name)));
        }

        self.registry.begin(&name);
        let built = self.build_definition(decl, ty, type_directive, media_types, view);
        self.registry.finish(&name);
        let mut schema = built?;

        if let Some(docs) = decl.directives.get(DirectiveKind::ExternalDocs) {
            schema.external_docs = external_docs(docs);
        }
        if schema.description.is_none() {
            schema.description = DocText::from_option(decl.documentation.as_deref()).and_then(|doc| doc.description);
        }

        let mut reference = Schema::reference(&name);
        if decl.kind == DeclKind::Iterable {
            reference.description = schema
                .external_docs
                .as_ref()
                .and_then(|docs| docs.description.clone())
                .or_else(|| schema.description.clone());
        }
        self.registry.register(&name, schema);
        Ok(Some(reference))
    }

    fn build_definition(
        &mut self,
        decl: &'u TypeDecl,
        ty: &TypeRef,
        directive: Option<&Directive>,
        media_types: &[String],
        view: Option<&str>,
    ) -> Result<Schema> {
        let universe = self.universe;

        let mut schema = if decl.is_enum() {
            let (schema_type, format) = enum_type_and_format(universe, decl);
            let mut schema = Schema::typed(schema_type);
            schema.enum_values = enum_values(decl, Some(schema_type), format.as_deref(), &mut self.diagnostics);
            schema.format = format;
            schema
        } else {
            let bindings = universe.bindings(ty);
            let mut schema = self.process_super_types(decl, &bindings, media_types, view)?;
            self.populate_properties(&mut schema, decl, &bindings, media_types, view)?;
            check_all_of(&mut schema);
            schema
        };

        if let Some(directive) = directive {
            self.apply_schema_directive(&mut schema, directive, None, ty)?;
            if schema.schema_type.is_none() && schema.all_of.is_empty() && !schema.is_ref() {
                let (schema_type, format) = type_and_format_of(universe, ty);
                schema.schema_type = Some(schema_type);
                if schema.format.is_none() {
                    schema.format = format;
                }
            }
        }
        Ok(schema)
    }

    /// Start a definition from its ancestry: a plain object, or an `allOf`
    /// of ancestor references
    fn process_super_types(
        &mut self,
        decl: &'u TypeDecl,
        bindings: &Bindings,
        media_types: &[String],
        view: Option<&str>,
    ) -> Result<Schema> {
        let ancestors: Vec<TypeRef> = self
            .ancestors(decl)
            .into_iter()
            .map(|ancestor| ancestor.substitute(bindings))
            .collect();
        if ancestors.is_empty() {
            return Ok(Schema::object());
        }

        let mut composed = Schema::default();
        let mut seen = HashSet::from([decl.name.clone()]);
        for ancestor in &ancestors {
            self.read_all_interfaces(&mut composed, ancestor, &mut seen, media_types, view)?;
        }
        Ok(composed)
    }

    /// Ancestors that take part in composition: every parent interface with
    /// members for interfaces, the super type for everything else
    fn ancestors(&self, decl: &'u TypeDecl) -> Vec<&'u TypeRef> {
        let universe = self.universe;
        let composable = |ty: &&TypeRef| {
            universe
                .decl_of(ty)
                .map_or(false, |d| matches!(d.kind, DeclKind::Record | DeclKind::Interface))
        };
        if decl.is_interface() {
            decl.interfaces
                .iter()
                .filter(composable)
                .filter(|ty| universe.decl_of(ty).map_or(false, |d| universe.has_properties(d)))
                .collect()
        } else {
            decl.super_type.iter().filter(composable).collect()
        }
    }

    /// Reference an ancestor, then walk its own ancestry
    fn read_all_interfaces(
        &mut self,
        composed: &mut Schema,
        ancestor: &TypeRef,
        seen: &mut HashSet<String>,
        media_types: &[String],
        view: Option<&str>,
    ) -> Result<()> {
        let universe = self.universe;
        let Some(parent) = universe.decl_of(ancestor) else {
            return Ok(());
        };
        if !seen.insert(parent.name.clone()) {
            return Ok(());
        }

        if let Some(reference) = self.get_schema_definition(None, ancestor, media_types, view)? {
            composed.add_all_of(reference);
        }

        let bindings = universe.bindings(ancestor);
        for next in self.ancestors(parent) {
            let next = next.substitute(&bindings);
            self.read_all_interfaces(composed, &next, seen, media_types, view)?;
        }
        Ok(())
    }
}

/// Move own properties of a composed schema into a trailing `allOf` member
fn check_all_of(schema: &mut Schema) {
    if schema.all_of.is_empty() {
        return;
    }
    if !schema.properties.is_empty() {
        let own = Schema {
            properties: std::mem::take(&mut schema.properties),
            required: std::mem::take(&mut schema.required),
            ..Schema::object()
        };
        schema.all_of.push(own);
    }
    schema.schema_type = Some(SchemaType::Object);
}

pub(super) fn external_docs(directive: &Directive) -> Option<ExternalDocs> {
    let url = directive.str("url")?;
    Some(ExternalDocs {
        description: directive.str("description").map(str::to_string),
        url: url.to_string(),
    })
}
