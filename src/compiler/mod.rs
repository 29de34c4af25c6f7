//! Schema Compiler
//!
//! Turns type occurrences into OpenAPI schemas. All pass-scoped state (the
//! registry, the name collision table, the in-progress set and the collected
//! diagnostics) lives in one [`CompilationContext`] that is threaded through
//! every call.
//!
//! The work is split the same way the algorithm is:
//! - [`resolve`]: one occurrence to an inline schema or a `$ref`
//! - [`definition`]: named definitions, inheritance flattening, enums
//! - [`properties`]: member iteration, view filtering, required-ness
//! - [`bind`]: layering directives over derived schemas
//!
//! `resolve` and `definition` call each other; the in-progress set in the
//! registry is what stops recursive type graphs.

mod bind;
mod definition;
mod naming;
mod properties;
mod resolve;

pub use naming::PropertyNaming;

use resolve::Resolved;

use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;

use crate::config::CompilerConfig;
use crate::diagnostics::Diagnostics;
use crate::directive::{Directive, DirectiveKind, Directives};
use crate::error::{CompileError, Result};
use crate::names::NameResolver;
use crate::registry::SchemaRegistry;
use crate::schema::Schema;
use crate::types::{TypeDecl, TypeRef, TypeUniverse, TypedMember};

static NO_DIRECTIVES: Lazy<Directives> = Lazy::new(Directives::default);

// =============================================================================
// Element
// =============================================================================

/// The annotated thing a type occurrence hangs off: a member of a declared
/// type, or a detached element supplied by the caller (a parameter, a body)
#[derive(Debug, Clone, Copy)]
pub(crate) struct Element<'e> {
    pub name: &'e str,
    pub directives: &'e Directives,
    pub documentation: Option<&'e str>,
    pub owner: Option<&'e TypeDecl>,
    pub member: Option<&'e TypedMember>,
}

impl<'e> Element<'e> {
    pub fn member(owner: &'e TypeDecl, member: &'e TypedMember) -> Self {
        Self {
            name: &member.name,
            directives: &member.directives,
            documentation: member.documentation.as_deref(),
            owner: Some(owner),
            member: Some(member),
        }
    }

    pub fn detached(name: &'e str, directives: Option<&'e Directives>, documentation: Option<&'e str>) -> Self {
        Self {
            name,
            directives: directives.unwrap_or(&NO_DIRECTIVES),
            documentation,
            owner: None,
            member: None,
        }
    }

    pub fn directive(&self, kind: DirectiveKind) -> Option<&'e Directive> {
        self.directives.get(kind)
    }

    pub fn is_member(&self) -> bool {
        self.member.is_some()
    }

    /// `Owner.member` path used in diagnostics
    pub fn subject(&self) -> String {
        match self.owner {
            Some(owner) => format!("{}.{}", owner.name, self.name),
            None => self.name.to_string(),
        }
    }
}

// =============================================================================
// Requests and output
// =============================================================================

/// One resolution request from the surrounding layer
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    pub ty: &'a TypeRef,
    /// Name of the parameter or body the type belongs to
    pub element_name: Option<&'a str>,
    /// Directives already extracted for the element
    pub directives: Option<&'a Directives>,
    pub documentation: Option<&'a str>,
    pub media_types: &'a [String],
    /// Qualified name of the active view
    pub view: Option<&'a str>,
}

impl<'a> ResolveRequest<'a> {
    pub fn new(ty: &'a TypeRef) -> Self {
        Self {
            ty,
            element_name: None,
            directives: None,
            documentation: None,
            media_types: &[],
            view: None,
        }
    }
}

/// Result of a finished pass
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub registry: SchemaRegistry,
    pub diagnostics: Diagnostics,
}

// =============================================================================
// Compilation Context
// =============================================================================

/// Pass-scoped compiler state over an immutable universe
pub struct CompilationContext<'u> {
    universe: &'u TypeUniverse,
    config: CompilerConfig,
    registry: SchemaRegistry,
    names: NameResolver,
    diagnostics: Diagnostics,
}

impl<'u> CompilationContext<'u> {
    pub fn new(universe: &'u TypeUniverse, config: CompilerConfig) -> Self {
        Self {
            universe,
            config,
            registry: SchemaRegistry::new(),
            names: NameResolver::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn universe(&self) -> &'u TypeUniverse {
        self.universe
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Resolve a request to an inline schema or a `$ref`.
    ///
    /// `Ok(None)` means the type has no representation and the caller should
    /// leave the element out.
    pub fn resolve(&mut self, request: &ResolveRequest<'_>) -> Result<Option<Schema>> {
        let element = (request.element_name.is_some() || request.directives.is_some()).then(|| {
            Element::detached(
                request.element_name.unwrap_or_default(),
                request.directives,
                request.documentation,
            )
        });

        let resolved = self.resolve_occurrence(element, request.ty, request.media_types, request.view)?;
        match (resolved, element) {
            (Some(resolved), Some(element)) if !element.directives.is_empty() => {
                let nullable = resolved.nullable || element.directives.has(DirectiveKind::Nullable);
                self.bind_schema_for_element(element, request.ty, resolved.schema, nullable)
                    .map(Some)
            }
            (resolved, _) => Ok(resolved.map(Resolved::into_schema)),
        }
    }

    /// Resolve a bare type occurrence
    pub fn compile(&mut self, ty: &TypeRef) -> Result<Option<Schema>> {
        self.resolve(&ResolveRequest::new(ty))
    }

    /// Resolve a declared type by qualified name
    pub fn compile_named(&mut self, name: &str) -> Result<Option<Schema>> {
        if !self.universe.contains(name) {
            return Err(CompileError::UnknownType(name.to_string()));
        }
        self.compile(&TypeRef::named(name))
    }

    pub fn finish(self) -> CompileOutput {
        tracing::debug!(
            schemas = self.registry.len(),
            diagnostics = self.diagnostics.len(),
            "compilation finished"
        );
        CompileOutput {
            registry: self.registry,
            diagnostics: self.diagnostics,
        }
    }
}

// =============================================================================
// Shared Compilation
// =============================================================================

/// A context shared by concurrent callers; every request holds the lock for
/// its whole resolution
pub struct SharedCompilation<'u> {
    inner: Mutex<CompilationContext<'u>>,
}

impl<'u> SharedCompilation<'u> {
    pub fn new(context: CompilationContext<'u>) -> Self {
        Self {
            inner: Mutex::new(context),
        }
    }

    /// Run `f` with exclusive access to the context
    pub fn with<R>(&self, f: impl FnOnce(&mut CompilationContext<'u>) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Option<Schema>> {
        self.with(|context| context.resolve(request))
    }

    pub fn compile(&self, ty: &TypeRef) -> Result<Option<Schema>> {
        self.with(|context| context.compile(ty))
    }

    pub fn into_inner(self) -> CompilationContext<'u> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn finish(self) -> CompileOutput {
        self.into_inner().finish()
    }
}
