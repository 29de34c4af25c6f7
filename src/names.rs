//! Name Resolution
//!
//! Computes the canonical registry name of a type instantiation:
//! - Generic arguments are mangled into the name (`Wrapper_Foo_`)
//! - Type-use directives on primitive arguments are folded in
//! - Per-package prefix/postfix decorations are applied
//! - Collisions between distinct origins get a numeric suffix, or fail the
//!   pass when duplicate resolution is strict
//!
//! Suffix assignment depends on the order names are first requested. Callers
//! wanting stable names across runs must visit roots in a stable order.

use std::collections::{HashMap, HashSet};

use crate::config::{CompilerConfig, DuplicateResolution};
use crate::directive::Directives;
use crate::error::{CompileError, Result};
use crate::types::{package_of, simple_name, PrimitiveType, TypeKind, TypeRef, TypeUniverse};

// =============================================================================
// Name Request
// =============================================================================

/// Inputs of one name computation
#[derive(Debug, Clone, Copy)]
pub struct NameRequest<'a> {
    /// Name given by a schema directive, used verbatim
    pub explicit: Option<&'a str>,
    /// Qualified name of a stereotype directive on the defining element
    pub stereotype: Option<&'a str>,
    pub ty: &'a TypeRef,
    /// Active view; its simple name becomes a postfix
    pub view: Option<&'a str>,
}

impl<'a> NameRequest<'a> {
    pub fn new(ty: &'a TypeRef) -> Self {
        Self {
            explicit: None,
            stereotype: None,
            ty,
            view: None,
        }
    }
}

// =============================================================================
// Name Resolver
// =============================================================================

/// Pass-scoped collision table
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    /// assigned name -> fully qualified origin (with generics)
    name_to_origin: HashMap<String, String>,

    /// (candidate name, origin) -> name assigned earlier
    assigned: HashMap<(String, String), String>,

    /// candidate name -> last suffix handed out
    suffix_counters: HashMap<String, usize>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the collision-free name for a request
    pub fn compute_name(
        &mut self,
        config: &CompilerConfig,
        universe: &TypeUniverse,
        request: NameRequest<'_>,
    ) -> Result<String> {
        let generic_sep = config.naming.generic_separator();
        let inner_sep = config.naming.inner_class_separator();

        let view_postfix = request
            .view
            .map(|view| format!("{}{}", generic_sep, simple_name(&view.replace('$', "."))))
            .unwrap_or_default();

        let (mangled, origin) = full_name_with_generics(config, universe, request.ty, &view_postfix);

        let candidate = match (request.explicit, request.stereotype) {
            (Some(explicit), _) => explicit.to_string(),
            (None, Some(stereotype)) => {
                let name = format!("{}{}", simple_name(&stereotype.replace('$', ".")), view_postfix);
                if inner_sep == "." {
                    name
                } else {
                    name.replace('.', inner_sep)
                }
            }
            (None, None) => mangled,
        };

        self.disambiguate(config, candidate, origin)
    }

    fn disambiguate(&mut self, config: &CompilerConfig, candidate: String, origin: String) -> Result<String> {
        let key = (candidate.clone(), origin.clone());
        if let Some(assigned) = self.assigned.get(&key) {
            return Ok(assigned.clone());
        }

        let name = match self.name_to_origin.get(&candidate) {
            Some(existing) if *existing != origin => {
                if config.naming.duplicate_resolution == DuplicateResolution::Error {
                    return Err(CompileError::DuplicateSchemaName {
                        name: candidate,
                        existing: existing.clone(),
                        incoming: origin,
                    });
                }
                let counter = self.suffix_counters.entry(candidate.clone()).or_insert(0);
                *counter += 1;
                let suffixed = format!("{}{}{}", candidate, config.naming.generic_separator(), counter);
                tracing::debug!(name = %candidate, assigned = %suffixed, origin = %origin, "schema name collision");
                suffixed
            }
            _ => candidate,
        };

        self.name_to_origin.insert(name.clone(), origin);
        self.assigned.insert(key, name.clone());
        Ok(name)
    }

    /// Origin recorded for an assigned name
    pub fn origin_of(&self, name: &str) -> Option<&str> {
        self.name_to_origin.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.name_to_origin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_origin.is_empty()
    }
}

// =============================================================================
// Mangling
// =============================================================================

/// Returns (decorated mangled name, `package.` + that name)
fn full_name_with_generics(
    config: &CompilerConfig,
    universe: &TypeUniverse,
    ty: &TypeRef,
    view_postfix: &str,
) -> (String, String) {
    let qualified = occurrence_name(ty);
    let package = package_of(&qualified).to_string();

    let mut name = simple_name(&qualified).to_string();
    if !universe.is_enum(ty) {
        let mut computed = HashSet::new();
        mangle_generics(config, universe, ty, &mut name, &mut computed);
    }

    let mut name = name.replace('$', config.naming.inner_class_separator()) + view_postfix;
    if let Some(decorator) = config.decorator_for(&package) {
        name = format!(
            "{}{}{}",
            decorator.prefix.as_deref().unwrap_or(""),
            name,
            decorator.postfix.as_deref().unwrap_or("")
        );
    }

    let origin = format!("{}.{}", package, name);
    (name, origin)
}

fn occurrence_name(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Named(named) => named.name.clone(),
        TypeRef::Array(element) => format!("{}Array", occurrence_name(element)),
        TypeRef::Placeholder { name, bounds } => bounds.first().map_or_else(|| name.clone(), occurrence_name),
        TypeRef::Wildcard { upper_bounds } => upper_bounds
            .first()
            .map_or_else(|| PrimitiveType::Object.name().to_string(), occurrence_name),
    }
}

/// Generic arguments of an occurrence, padded from declared parameters
fn effective_args(universe: &TypeUniverse, ty: &TypeRef) -> Vec<TypeRef> {
    match universe.decl_of(ty) {
        Some(decl) if !decl.type_params.is_empty() => decl.bindings_for(ty.args()).into_values().collect(),
        _ => ty.args().to_vec(),
    }
}

fn mangle_generics(
    config: &CompilerConfig,
    universe: &TypeUniverse,
    ty: &TypeRef,
    out: &mut String,
    computed: &mut HashSet<String>,
) {
    let generic_sep = config.naming.generic_separator();
    let inner_sep = config.naming.inner_class_separator();

    computed.insert(ty.to_string());
    let args = effective_args(universe, ty);
    if args.is_empty() {
        return;
    }

    out.push_str(generic_sep);
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(inner_sep);
        }
        if matches!(universe.kind_of(arg), TypeKind::Primitive(_)) {
            if let Some(directives) = arg.directives() {
                out.push_str(&fold_directives(config, directives));
            }
        }

        let arg = match config.custom_schema(&arg.to_string()) {
            Some(replacement) => TypeRef::parse(replacement).unwrap_or_else(|_| arg.clone()),
            None => arg.clone(),
        };
        out.push_str(simple_name(&occurrence_name(&arg)));
        if !computed.contains(&arg.to_string()) {
            mangle_generics(config, universe, &arg, out, computed);
        }
    }
    out.push_str(generic_sep);
}

/// `Size_min_1_max_8_` style rendering of type-use directives
fn fold_directives(config: &CompilerConfig, directives: &Directives) -> String {
    let generic_sep = config.naming.generic_separator();
    let inner_sep = config.naming.inner_class_separator();

    let mut out = String::new();
    for (kind, directive) in directives.iter() {
        out.push_str(&kind.display_name());
        if directive.is_empty() {
            continue;
        }
        out.push_str(generic_sep);
        for (key, value) in directive.iter() {
            if key != "value" {
                out.push_str(key);
                out.push_str(generic_sep);
            }
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.push_str(&rendered.replace('.', inner_sep));
            out.push_str(generic_sep);
        }
    }
    out
}
