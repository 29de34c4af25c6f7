//! Typeschema
//!
//! A type-directed compiler from declared type graphs to OpenAPI component
//! schemas.
//!
//! ## Features
//!
//! - **Interning**: every named type is built once per pass and referenced by `$ref`
//! - **Cycle Safety**: recursive type graphs terminate through an in-progress set
//! - **Name Mangling**: generic instantiations get stable, collision-free names
//! - **Inheritance Flattening**: ancestors become `allOf` references
//! - **Directive Binding**: overrides and validation constraints layer over
//!   derived schemas without editing referenced definitions
//!
//! ## Architecture
//!
//! ```text
//! declarations (JSON) ──► loader ──► TypeUniverse
//!                                        │
//!                     CompilationContext ┤ names ─ NameResolver
//!                       resolve ◄──► definition
//!                       properties ─► bind ─► coerce
//!                                        │
//!                                        ▼
//!                          SchemaRegistry + Diagnostics
//! ```
//!
//! ## Example
//!
//! ```
//! use typeschema::{CompilationContext, CompilerConfig, TypeUniverse};
//!
//! let universe = TypeUniverse::from_json_str(
//!     r#"[{ "name": "com.acme.Status", "kind": "enum", "constants": ["ACTIVE", "INACTIVE"] }]"#,
//! ).unwrap();
//! let mut context = CompilationContext::new(&universe, CompilerConfig::default());
//! let reference = context.compile_named("com.acme.Status").unwrap().unwrap();
//! assert_eq!(reference.ref_name(), Some("Status"));
//! ```

pub mod coerce;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod directive;
pub mod doc;
pub mod error;
pub mod loader;
pub mod names;
pub mod registry;
pub mod schema;
pub mod types;

pub use compiler::{CompilationContext, CompileOutput, PropertyNaming, ResolveRequest, SharedCompilation};
pub use config::{CompilerConfig, CustomSchema, DuplicateResolution, PackageDecorator};
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use directive::{Directive, DirectiveExtractor, DirectiveKind, Directives};
pub use error::{CompileError, Result};
pub use loader::load_universe;
pub use registry::{SchemaRegistry, COMPONENTS_SCHEMAS_REF};
pub use schema::{AdditionalProperties, Schema, SchemaType};
pub use types::{DeclKind, PrimitiveType, TypeDecl, TypeRef, TypeUniverse, TypedMember};
