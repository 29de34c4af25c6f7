//! Directive binding
//!
//! Layers an element's directives over the schema derived for its type.
//! Inline schemas are edited in place. A `$ref` is never edited: the
//! directives build a standalone overlay, and the result is either the
//! untouched `$ref` (when the overlay only decorates) or an `allOf` of the
//! `$ref` and the overlay. Nullability goes on the outermost node only.
//!
//! Member docs fall back onto a composed schema only; a bare `$ref` keeps
//! no description of its own.

use serde_json::Value;

use super::definition::external_docs;
use super::resolve::{element_description, object_ref, ConstraintTarget};
use super::{CompilationContext, Element};
use crate::coerce::{coerce, coerce_multi_value, type_and_format_of};
use crate::diagnostics::DiagnosticCode;
use crate::directive::{Directive, DirectiveKind, Directives};
use crate::error::Result;
use crate::schema::{AdditionalProperties, Discriminator, Schema, SchemaType};
use crate::types::{TypeKind, TypeRef};

impl<'u> CompilationContext<'u> {
    /// Bind the element's directives onto `derived`.
    ///
    /// `nullable` is the nullability detected for the element; an explicit
    /// `nullable` on the schema directive takes precedence.
    pub(crate) fn bind_schema_for_element(
        &mut self,
        element: Element<'_>,
        ty: &TypeRef,
        derived: Schema,
        nullable: bool,
    ) -> Result<Schema> {
        let schema_directive = element.directive(DirectiveKind::Schema);
        let array_directive = element.directive(DirectiveKind::ArraySchema);
        let target = self.constraint_target(ty, &derived);
        let nullable = schema_directive
            .and_then(|d| d.bool("nullable"))
            .unwrap_or(nullable);
        let deprecated = element.directives.has(DirectiveKind::Deprecated);

        if !derived.is_ref() {
            let mut schema = derived;
            if let Some(directive) = schema_directive {
                self.apply_schema_directive(&mut schema, directive, Some(element), ty)?;
            }
            if let Some(directive) = array_directive {
                self.apply_array_directive(&mut schema, directive, ty)?;
            }
            self.apply_constraints(&mut schema, element.directives, target);
            let (value_type, value_format) = self.literal_type(&[&schema], ty);
            self.apply_defaults(&mut schema, element, value_type, value_format.as_deref());
            if deprecated {
                schema.deprecated = Some(true);
            }
            if nullable {
                schema.set_nullable();
            }
            return Ok(schema);
        }

        let mut overlay = Schema::default();
        if let Some(directive) = schema_directive {
            self.apply_schema_directive(&mut overlay, directive, Some(element), ty)?;
        }
        if let Some(directive) = array_directive {
            self.apply_array_directive(&mut overlay, directive, ty)?;
        }
        self.apply_constraints(&mut overlay, element.directives, target);
        let (value_type, value_format) = self.literal_type(&[&overlay, &derived], ty);
        self.apply_defaults(&mut overlay, element, value_type, value_format.as_deref());

        let keep_reference = |mut reference: Schema| {
            if nullable {
                reference.set_nullable();
            }
            reference
        };
        if !overlay.has_structure() {
            tracing::trace!(subject = %element.subject(), "decoration only; keeping the reference");
            return Ok(keep_reference(derived));
        }

        let mut composed = Schema {
            description: overlay.description.take().or_else(|| element_description(element)),
            deprecated: (overlay.deprecated.take() == Some(true) || deprecated).then_some(true),
            nullable: nullable.then_some(true),
            external_docs: overlay.external_docs.take(),
            ..Schema::default()
        };
        overlay.nullable = None;
        if overlay.is_object() && !overlay.is_map() {
            overlay.schema_type = None;
            composed.schema_type = Some(SchemaType::Object);
        }
        if overlay.is_empty() {
            return Ok(keep_reference(derived));
        }
        composed.all_of = vec![derived, overlay];
        Ok(composed)
    }

    /// Copy the fields of a schema directive onto `schema`
    pub(crate) fn apply_schema_directive(
        &mut self,
        schema: &mut Schema,
        directive: &Directive,
        element: Option<Element<'_>>,
        ty: &TypeRef,
    ) -> Result<()> {
        let subject = element.map_or_else(|| ty.to_string(), |e| e.subject());

        if let Some(title) = directive.str("title") {
            schema.title = Some(title.to_string());
        }
        if let Some(description) = directive.str("description") {
            schema.description = Some(description.to_string());
        }
        if let Some(reference) = directive.str("$ref") {
            schema.ref_path = Some(reference.to_string());
        }
        if let Some(raw) = directive.str("type") {
            match raw.parse::<SchemaType>() {
                Ok(schema_type) => schema.schema_type = Some(schema_type),
                Err(e) => self
                    .diagnostics
                    .warning(&subject, DiagnosticCode::InvalidDirectiveValue, e),
            }
        }
        if let Some(format) = directive.str("format") {
            schema.format = Some(format.to_string());
        }

        // Facets
        if let Some(v) = directive.f64("multipleOf") {
            schema.multiple_of = Some(v);
        }
        if let Some(v) = directive.f64("minimum") {
            schema.minimum = Some(v);
        }
        if let Some(v) = directive.f64("maximum") {
            schema.maximum = Some(v);
        }
        if directive.bool("exclusiveMinimum") == Some(true) {
            schema.exclusive_minimum = Some(true);
        }
        if directive.bool("exclusiveMaximum") == Some(true) {
            schema.exclusive_maximum = Some(true);
        }
        if let Some(v) = directive.u64("minLength") {
            schema.min_length = Some(v);
        }
        if let Some(v) = directive.u64("maxLength") {
            schema.max_length = Some(v);
        }
        if let Some(pattern) = directive.str("pattern") {
            schema.pattern = Some(pattern.to_string());
        }
        if let Some(v) = directive.u64("minProperties") {
            schema.min_properties = Some(v);
        }
        if let Some(v) = directive.u64("maxProperties") {
            schema.max_properties = Some(v);
        }
        for name in directive.strings("requiredProperties") {
            if !schema.required.contains(&name) {
                schema.required.push(name);
            }
        }

        // Flags
        let detached = element.map_or(true, |e| !e.is_member());
        if detached && directive.bool("nullable") == Some(true) {
            schema.set_nullable();
        }
        if directive.bool("readOnly") == Some(true) {
            schema.read_only = Some(true);
        }
        if directive.bool("writeOnly") == Some(true) {
            schema.write_only = Some(true);
        }
        if directive.bool("deprecated") == Some(true) {
            schema.deprecated = Some(true);
        }
        if let Some(docs) = directive.sub("externalDocs").as_ref().and_then(external_docs) {
            schema.external_docs = Some(docs);
        }

        // Literals, coerced against the final type
        let (literal_type, literal_format) = self.literal_type(&[&*schema], ty);
        let literal_format = literal_format.as_deref();
        match directive.get("enum") {
            Some(Value::Array(items)) => {
                let values: Vec<Value> = items
                    .iter()
                    .filter_map(|item| self.coerce_literal(&subject, item, literal_type, literal_format))
                    .collect();
                if !values.is_empty() {
                    schema.enum_values = Some(values);
                }
            }
            Some(single @ Value::String(_)) => {
                schema.enum_values = self
                    .coerce_literal(&subject, single, literal_type, literal_format)
                    .map(|v| vec![v]);
            }
            _ => {}
        }
        if let Some(example) = directive.get("example") {
            if let Some(value) = self.coerce_literal(&subject, example, literal_type, literal_format) {
                schema.example = Some(value);
            }
        }
        if let Some(Value::Array(items)) = directive.get("examples") {
            let values: Vec<Value> = items
                .iter()
                .filter_map(|item| self.coerce_literal(&subject, item, literal_type, literal_format))
                .collect();
            if !values.is_empty() {
                schema.examples = Some(values);
            }
        }
        if let Some(default) = directive.get("default") {
            if let Some(value) = self.coerce_literal(&subject, default, literal_type, literal_format) {
                schema.default = Some(value);
            }
        }

        // Structure referencing other types
        if let Some(discriminator) = directive.sub("discriminator") {
            self.apply_discriminator(schema, &discriminator, &subject)?;
        }
        if let Some(Value::Object(extensions)) = directive.get("extensions") {
            for (key, value) in extensions {
                schema.extensions.insert(key.clone(), value.clone());
            }
        }
        match directive.get("additionalProperties") {
            Some(Value::Bool(allowed)) => {
                schema.additional_properties = Some(AdditionalProperties::Allowed(*allowed));
            }
            Some(Value::String(type_name)) => {
                if let Some(value) = self.resolve_type_name(&subject, type_name)? {
                    schema.additional_properties = Some(AdditionalProperties::Schema(Box::new(value)));
                }
            }
            _ => {}
        }
        if let Some(type_name) = directive.str("not") {
            if let Some(not) = self.resolve_type_name(&subject, type_name)? {
                schema.not = Some(Box::new(not));
            }
        }
        for type_name in directive.strings("allOf") {
            if let Some(member) = self.resolve_type_name(&subject, &type_name)? {
                schema.add_all_of(member);
            }
        }
        for type_name in directive.strings("anyOf") {
            if let Some(member) = self.resolve_type_name(&subject, &type_name)? {
                if !schema.any_of.contains(&member) {
                    schema.any_of.push(member);
                }
            }
        }
        for type_name in directive.strings("oneOf") {
            if let Some(member) = self.resolve_type_name(&subject, &type_name)? {
                if !schema.one_of.contains(&member) {
                    schema.one_of.push(member);
                }
            }
        }
        Ok(())
    }

    /// Array-level facets plus the item override
    fn apply_array_directive(&mut self, schema: &mut Schema, directive: &Directive, ty: &TypeRef) -> Result<()> {
        self.apply_schema_directive(schema, directive, None, ty)?;
        if let Some(v) = directive.u64("minItems") {
            schema.min_items = Some(v);
        }
        if let Some(v) = directive.u64("maxItems") {
            schema.max_items = Some(v);
        }
        if directive.bool("uniqueItems") == Some(true) {
            schema.unique_items = Some(true);
        }

        let Some(items) = directive.sub("items") else {
            return Ok(());
        };
        if let Some(implementation) = items.str("implementation") {
            if let Some(replacement) = self.resolve_type_name(&ty.to_string(), implementation)? {
                schema.items = Some(Box::new(replacement));
            }
        } else if let Some(mut current) = schema.items.take() {
            let item_ty = self.item_type(ty);
            self.apply_schema_directive(&mut current, &items, None, &item_ty)?;
            schema.items = Some(current);
        }
        Ok(())
    }

    /// Translate validation constraints into facets
    pub(super) fn apply_constraints(&self, schema: &mut Schema, directives: &Directives, target: ConstraintTarget) {
        let container = target == ConstraintTarget::Container;
        for (kind, directive) in directives.constraints() {
            match kind {
                DirectiveKind::NotNull => {}
                DirectiveKind::NotEmpty if container => schema.min_items = Some(1),
                DirectiveKind::NotEmpty | DirectiveKind::NotBlank => schema.min_length = Some(1),
                DirectiveKind::Size => {
                    let (min, max) = (directive.u64("min"), directive.u64("max"));
                    if container {
                        schema.min_items = min.or(schema.min_items);
                        schema.max_items = max.or(schema.max_items);
                    } else {
                        schema.min_length = min.or(schema.min_length);
                        schema.max_length = max.or(schema.max_length);
                    }
                }
                DirectiveKind::Negative => {
                    schema.maximum = Some(0.0);
                    schema.exclusive_maximum = Some(true);
                }
                DirectiveKind::NegativeOrZero => schema.maximum = Some(0.0),
                DirectiveKind::Positive => {
                    schema.minimum = Some(0.0);
                    schema.exclusive_minimum = Some(true);
                }
                DirectiveKind::PositiveOrZero => schema.minimum = Some(0.0),
                DirectiveKind::Min | DirectiveKind::DecimalMin => {
                    if let Some(value) = directive.f64("value") {
                        schema.minimum = Some(value);
                        if directive.bool("inclusive") == Some(false) {
                            schema.exclusive_minimum = Some(true);
                        }
                    }
                }
                DirectiveKind::Max | DirectiveKind::DecimalMax => {
                    if let Some(value) = directive.f64("value") {
                        schema.maximum = Some(value);
                        if directive.bool("inclusive") == Some(false) {
                            schema.exclusive_maximum = Some(true);
                        }
                    }
                }
                DirectiveKind::Email => {
                    if schema.format.is_none() {
                        schema.format = Some("email".to_string());
                    }
                    if let Some(regexp) = directive.str("regexp") {
                        schema.pattern = Some(regexp.to_string());
                    }
                }
                DirectiveKind::Pattern => {
                    if let Some(regexp) = directive.str("regexp") {
                        schema.pattern = Some(regexp.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    /// Defaults from configuration binding and `json-property`
    fn apply_defaults(
        &mut self,
        schema: &mut Schema,
        element: Element<'_>,
        value_type: Option<SchemaType>,
        value_format: Option<&str>,
    ) {
        let sources = [
            (DirectiveKind::Bindable, true),
            (DirectiveKind::JsonProperty, false),
        ];
        for (kind, multi_value) in sources {
            if schema.default.is_some() {
                return;
            }
            let Some(raw) = element.directive(kind).and_then(|d| d.get("default")) else {
                continue;
            };
            let Value::String(text) = raw else {
                schema.default = Some(raw.clone());
                continue;
            };
            let coerced = if multi_value {
                coerce_multi_value(text, value_type, value_format)
            } else {
                coerce(text, value_type, value_format)
            };
            schema.default = match coerced {
                Ok(value) => value,
                Err(e) => {
                    self.diagnostics.coercion_failed(element.subject(), text, &e);
                    Some(Value::String(text.clone()))
                }
            };
        }
    }

    fn apply_discriminator(&mut self, schema: &mut Schema, directive: &Directive, subject: &str) -> Result<()> {
        let Some(property_name) = directive.str("propertyName") else {
            self.diagnostics.warning(
                subject,
                DiagnosticCode::InvalidDirectiveValue,
                "Discriminator without a property name; ignoring it",
            );
            return Ok(());
        };
        let mut discriminator = Discriminator {
            property_name: property_name.to_string(),
            ..Discriminator::default()
        };
        if let Some(Value::Object(mapping)) = directive.get("mapping") {
            for (value, reference) in mapping {
                if let Some(reference) = reference.as_str() {
                    discriminator.mapping.insert(value.clone(), reference.to_string());
                }
            }
        }
        if let Some(Value::Object(schemas)) = directive.get("mappingSchemas") {
            for (value, type_name) in schemas {
                let Some(type_name) = type_name.as_str() else { continue };
                let reference = self
                    .resolve_type_name(subject, type_name)?
                    .and_then(|schema| schema.ref_path);
                if let Some(reference) = reference {
                    discriminator.mapping.insert(value.clone(), reference);
                }
            }
        }
        schema.discriminator = Some(discriminator);
        Ok(())
    }

    /// Compile a type named inside a directive
    fn resolve_type_name(&mut self, subject: &str, text: &str) -> Result<Option<Schema>> {
        match TypeRef::parse(text) {
            Ok(ty) => self.resolve_schema(None, &ty, &[], None),
            Err(e) => {
                self.diagnostics
                    .warning(subject, DiagnosticCode::InvalidDirectiveValue, e.to_string());
                Ok(None)
            }
        }
    }

    /// String literals are coerced; JSON values pass through
    fn coerce_literal(
        &mut self,
        subject: &str,
        value: &Value,
        schema_type: Option<SchemaType>,
        format: Option<&str>,
    ) -> Option<Value> {
        let Value::String(raw) = value else {
            return Some(value.clone());
        };
        match coerce(raw, schema_type, format) {
            Ok(value) => value,
            Err(e) => {
                self.diagnostics.coercion_failed(subject, raw, &e);
                Some(Value::String(raw.clone()))
            }
        }
    }

    /// `(type, format)` literals are parsed against: the first candidate
    /// with a type (following references), else the occurrence's own
    fn literal_type(&self, candidates: &[&Schema], ty: &TypeRef) -> (Option<SchemaType>, Option<String>) {
        for &candidate in candidates {
            let schema = if candidate.is_ref() {
                match self.registry.resolve_ref(candidate) {
                    Some(target) => target,
                    None => continue,
                }
            } else {
                candidate
            };
            if let Some(schema_type) = schema.schema_type {
                return (Some(schema_type), schema.format.clone());
            }
        }
        let (schema_type, format) = type_and_format_of(self.universe, &self.unwrapped(ty));
        (Some(schema_type), format)
    }

    fn constraint_target(&self, ty: &TypeRef, derived: &Schema) -> ConstraintTarget {
        let shape = if derived.is_ref() {
            self.registry.resolve_ref(derived)
        } else {
            Some(derived)
        };
        let container = shape.map_or(false, |s| s.is_array() || s.is_map())
            || self.universe.is_container(&self.unwrapped(ty));
        if container {
            ConstraintTarget::Container
        } else {
            ConstraintTarget::Value
        }
    }

    fn unwrapped(&self, ty: &TypeRef) -> TypeRef {
        let mut ty = ty.clone();
        while matches!(self.universe.kind_of(&ty), TypeKind::Wrapper(..)) {
            ty = ty.args().first().cloned().unwrap_or_else(object_ref);
        }
        ty
    }

    /// Element type of an array or iterable occurrence
    fn item_type(&self, ty: &TypeRef) -> TypeRef {
        let ty = self.unwrapped(ty);
        match self.universe.kind_of(&ty) {
            TypeKind::Array(element) => element.clone(),
            TypeKind::Iterable(_) => self
                .universe
                .bindings(&ty)
                .into_values()
                .next()
                .unwrap_or_else(object_ref),
            _ => object_ref(),
        }
    }
}
