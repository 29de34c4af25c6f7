//! Type occurrence resolution

use super::{CompilationContext, Element};
use crate::coerce::enum_values;
use crate::diagnostics::{DiagnosticCode, DiagnosticItem};
use crate::directive::{DirectiveKind, Directives};
use crate::doc::DocText;
use crate::error::Result;
use crate::schema::{AdditionalProperties, Schema, SchemaType};
use crate::types::{PrimitiveType, TypeKind, TypeRef, TypeUniverse, WrapperKind};

pub(super) fn object_ref() -> TypeRef {
    TypeRef::named(PrimitiveType::Object.name())
}

/// Where a constraint lands on the schema it is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ConstraintTarget {
    /// Arrays, iterables and maps: item counts
    Container,
    /// Everything else: lengths and bounds
    Value,
}

/// A resolved occurrence. Nullability found while unwrapping stays beside
/// the schema so it lands on the outermost node only.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub schema: Schema,
    pub nullable: bool,
}

impl Resolved {
    pub fn into_schema(self) -> Schema {
        let mut schema = self.schema;
        if self.nullable {
            schema.set_nullable();
        }
        schema
    }
}

impl<'u> CompilationContext<'u> {
    /// Resolve one occurrence to a finished schema. `None` means "not
    /// representable".
    pub(crate) fn resolve_schema(
        &mut self,
        element: Option<Element<'_>>,
        ty: &TypeRef,
        media_types: &[String],
        view: Option<&str>,
    ) -> Result<Option<Schema>> {
        Ok(self
            .resolve_occurrence(element, ty, media_types, view)?
            .map(Resolved::into_schema))
    }

    /// Resolve one occurrence, leaving nullability to the caller
    pub(crate) fn resolve_occurrence(
        &mut self,
        element: Option<Element<'_>>,
        ty: &TypeRef,
        media_types: &[String],
        view: Option<&str>,
    ) -> Result<Option<Resolved>> {
        let universe = self.universe;
        let subject = element.map_or_else(|| ty.to_string(), |e| e.subject());
        let schema_directive = element.and_then(|e| e.directive(DirectiveKind::Schema));

        // Override substitution
        let mut ty = ty.clone();
        if let Some(directive) = schema_directive {
            if let Some(implementation) = directive.str("implementation") {
                match TypeRef::parse(implementation) {
                    Ok(replacement) if universe.decl_of(&replacement).is_some() => {
                        tracing::trace!(subject = %subject, from = %ty, to = %replacement, "implementation override");
                        ty = replacement;
                    }
                    _ => {
                        let mut item = DiagnosticItem::new(
                            &subject,
                            DiagnosticCode::UnknownImplementation,
                            format!("Implementation '{}' is not declared; keeping {}", implementation, ty),
                        );
                        if let Some(suggestion) = universe.suggest(implementation) {
                            item = item.with_context(format!("did you mean '{}'?", suggestion));
                        }
                        self.diagnostics.push(item);
                    }
                }
            } else if let Some(primitive) = directive
                .str("type")
                .filter(|t| *t != "object")
                .and_then(PrimitiveType::from_common_name)
            {
                ty = TypeRef::named(primitive.name());
            }
        }

        // Placeholders, wildcards and wrappers
        let mut ty = self.peel_unbound(ty, &subject);
        let mut nullable = false;
        let mut stream = false;
        loop {
            let kind = match universe.kind_of(&ty) {
                TypeKind::Wrapper(kind, _) => kind,
                _ => break,
            };
            match kind {
                WrapperKind::Optional => nullable = true,
                WrapperKind::Stream => stream = true,
                WrapperKind::Single => {}
            }
            tracing::trace!(subject = %subject, wrapper = %ty, "unwrapping");
            let inner = ty.args().first().cloned().unwrap_or_else(object_ref);
            ty = self.peel_unbound(inner, &subject);
        }

        // Custom substitution table
        let replacement = self
            .config
            .custom_schema(&ty.to_string())
            .or_else(|| ty.name().and_then(|name| self.config.custom_schema(name)))
            .map(str::to_string);
        if let Some(replacement) = replacement {
            match TypeRef::parse(&replacement) {
                Ok(target) if universe.decl_of(&target).is_some() => {
                    tracing::trace!(subject = %subject, from = %ty, to = %target, "custom schema");
                    ty = carry_bindings(universe, target, &ty);
                }
                _ => self.diagnostics.warning(
                    &subject,
                    DiagnosticCode::CustomSchemaNotFound,
                    format!("Custom schema '{}' for {} is not declared; ignoring it", replacement, ty),
                ),
            }
        }

        // Structural dispatch
        let resolved = match universe.kind_of(&ty) {
            TypeKind::Array(element_ty) => {
                if universe.primitive_of(element_ty) == Some(PrimitiveType::Byte) {
                    Some(Schema::typed(SchemaType::String).with_format("byte"))
                } else {
                    self.resolve_type_arg(element_ty, media_types, view)?
                        .map(Schema::array)
                }
            }
            TypeKind::Primitive(primitive) => {
                let mut schema = primitive.schema();
                if let Some(directives) = ty.directives() {
                    self.apply_type_use(&mut schema, directives, ConstraintTarget::Value);
                }
                Some(schema)
            }
            TypeKind::Map(_) => Some(self.map_schema(&ty, media_types, view)?),
            TypeKind::Iterable(decl) => {
                if universe.has_properties(decl) {
                    self.get_schema_definition(element, &ty, media_types, view)?
                } else {
                    let items = match universe.bindings(&ty).into_values().next() {
                        Some(element_ty) => self.resolve_type_arg(&element_ty, media_types, view)?,
                        None => Some(Schema::object()),
                    };
                    items.map(Schema::array)
                }
            }
            TypeKind::Enum(_) | TypeKind::Record(_) | TypeKind::Interface(_) => {
                self.get_schema_definition(element, &ty, media_types, view)?
            }
            TypeKind::Wrapper(..) | TypeKind::Placeholder | TypeKind::Wildcard | TypeKind::Unknown => {
                let name = ty.name().unwrap_or_default().to_string();
                self.diagnostics
                    .unknown_type(&subject, &name, universe.suggest(&name));
                None
            }
        };

        let Some(mut schema) = resolved else {
            return Ok(None);
        };

        // Post-resolution decoration. The override directive itself is
        // layered on by the binder, which sees every element passed here.
        if schema.description.is_none() && !schema.is_ref() {
            schema.description = element.and_then(element_description);
        }

        let streaming_media = media_types
            .iter()
            .any(|media_type| self.config.is_stream_media_type(media_type));
        if stream && !streaming_media {
            schema = Schema::array(schema);
        }

        Ok(Some(Resolved { schema, nullable }))
    }

    /// Replace wildcards and placeholders with their first bound
    fn peel_unbound(&mut self, mut ty: TypeRef, subject: &str) -> TypeRef {
        loop {
            ty = match ty {
                TypeRef::Wildcard { upper_bounds } => upper_bounds.into_iter().next().unwrap_or_else(object_ref),
                TypeRef::Placeholder { name, bounds } => match bounds.into_iter().next() {
                    Some(bound) => bound,
                    None => {
                        self.diagnostics.warning(
                            subject,
                            DiagnosticCode::UnresolvedPlaceholder,
                            format!("Type parameter '{}' is unbound; using object", name),
                        );
                        object_ref()
                    }
                },
                other => return other,
            }
        }
    }

    /// Resolve a generic argument, honoring type-use directives attached to it
    pub(super) fn resolve_type_arg(
        &mut self,
        arg: &TypeRef,
        media_types: &[String],
        view: Option<&str>,
    ) -> Result<Option<Schema>> {
        let universe = self.universe;
        let Some(mut schema) = self.resolve_schema(None, arg, media_types, view)? else {
            return Ok(None);
        };
        let Some(directives) = arg.directives() else {
            return Ok(Some(schema));
        };
        if universe.primitive_of(arg).is_some() {
            return Ok(Some(schema));
        }

        let target = if universe.is_container(arg) {
            ConstraintTarget::Container
        } else {
            ConstraintTarget::Value
        };
        if !schema.is_ref() {
            self.apply_type_use(&mut schema, directives, target);
            return Ok(Some(schema));
        }

        let mut constraints = Schema::default();
        self.apply_type_use(&mut constraints, directives, target);
        if constraints.is_empty() {
            return Ok(Some(schema));
        }
        Ok(Some(Schema {
            all_of: vec![schema, constraints],
            ..Schema::default()
        }))
    }

    fn apply_type_use(&mut self, schema: &mut Schema, directives: &Directives, target: ConstraintTarget) {
        self.apply_constraints(schema, directives, target);
        if directives.has(DirectiveKind::Nullable) {
            schema.set_nullable();
        }
    }

    fn map_schema(&mut self, ty: &TypeRef, media_types: &[String], view: Option<&str>) -> Result<Schema> {
        let universe = self.universe;
        let mut schema = Schema::object();
        let args = ty.args();
        if args.is_empty() {
            schema.additional_properties = Some(AdditionalProperties::Allowed(true));
            return Ok(schema);
        }

        let value_ty = args.get(1).cloned().unwrap_or_else(object_ref);
        let value_is_object = matches!(
            value_ty,
            TypeRef::Wildcard { ref upper_bounds } if upper_bounds.is_empty()
        ) || universe.primitive_of(&value_ty) == Some(PrimitiveType::Object);

        if let TypeKind::Enum(key_decl) = universe.kind_of(&args[0]) {
            self.get_schema_definition(None, &args[0], media_types, view)?;
            let value = self
                .resolve_type_arg(&value_ty, media_types, view)?
                .unwrap_or_else(Schema::object);
            let keys = enum_values(key_decl, Some(SchemaType::String), None, &mut self.diagnostics).unwrap_or_default();
            for key in keys {
                let key = match key {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                schema.properties.insert(key, value.clone());
            }
            return Ok(schema);
        }

        let additional = if value_is_object {
            AdditionalProperties::Allowed(true)
        } else {
            match self.resolve_type_arg(&value_ty, media_types, view)? {
                Some(value) => AdditionalProperties::Schema(Box::new(value)),
                None => AdditionalProperties::Allowed(true),
            }
        };
        schema.additional_properties = Some(additional);
        Ok(schema)
    }
}

/// Description from the element's own docs, else from the owner's
/// `@param` line for it
pub(super) fn element_description(element: Element<'_>) -> Option<String> {
    DocText::from_option(element.documentation)
        .and_then(|doc| doc.description)
        .or_else(|| {
            element
                .owner
                .and_then(|owner| DocText::from_option(owner.documentation.as_deref()))
                .and_then(|doc| doc.param(element.name).map(str::to_string))
        })
}

/// Give an unparameterized substitute the bindings of the type it replaces
fn carry_bindings(universe: &TypeUniverse, target: TypeRef, original: &TypeRef) -> TypeRef {
    let Some(decl) = universe.decl_of(&target) else {
        return target;
    };
    if decl.type_params.is_empty() || !target.args().is_empty() {
        return target;
    }
    let original = universe.bindings(original);
    let args = decl
        .type_params
        .iter()
        .map(|param| {
            original
                .get(&param.name)
                .cloned()
                .or_else(|| param.bounds.first().cloned())
                .unwrap_or_else(object_ref)
        })
        .collect();
    TypeRef::generic(decl.name.clone(), args)
}
