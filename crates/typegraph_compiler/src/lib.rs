//! Metadata-to-schema compiler for typegraph.
//!
//! This crate turns collected metadata into a linked schema:
//! - `options`: Build settings and options
//! - `context`: Shared state of one build
//! - `registry`: Type Definition Registry
//! - `orphans`: Orphaned Reference Registry
//! - `output`: Output Type Resolver and the wrapping rule
//! - `args`: Argument Compiler
//! - `object`: Object/Interface Type Compiler
//! - `input`: Input object, enum and union compilation
//! - `generator`: Two-phase schema assembly

pub mod args;
pub mod context;
pub mod generator;
pub mod input;
pub mod object;
pub mod options;
pub mod orphans;
pub mod output;
pub mod registry;

pub use context::BuildContext;
pub use generator::{SchemaGenerator, SchemaRoots};
pub use input::CompiledInputNode;
pub use object::{CompiledType, CompiledTypeNode};
pub use options::{BuildOptions, BuildSettings};
pub use orphans::OrphanedReferenceRegistry;
pub use output::{resolve_input_type, resolve_output_type, Position};
pub use registry::TypeDefinitionRegistry;
