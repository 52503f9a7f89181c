//! typegraph
//!
//! Compile declarative type metadata into an executable GraphQL schema graph.
//!
//! Types are described with builders and registered in a metadata store. A
//! build compiles a snapshot of the store into linked object, interface,
//! input, enum and union types whose fields carry composed resolvers.
//!
//! ```
//! use typegraph::prelude::*;
//!
//! struct Query;
//! struct User;
//!
//! typegraph::reset();
//! typegraph::metadata_write()
//!     .register_type(
//!         TypeMetadata::object::<Query>("Query")
//!             .field(PropertyMetadata::new("me", TypeValue::entity::<User>)),
//!     )
//!     .register_type(
//!         TypeMetadata::object::<User>("User")
//!             .field(PropertyMetadata::new("name", || Scalar::String.into())),
//!     );
//!
//! let schema = typegraph::build_schema(&SchemaRoots::query::<Query>(), BuildOptions::new())?;
//! assert!(schema.get_type("User").is_some());
//! # Ok::<(), typegraph::BuildError>(())
//! ```

use tracing::debug;

// Core re-exports
pub use typegraph_core::{BuildError, BuildResult, EntityId, ReferenceKind};

// Syntax re-exports
pub use typegraph_syntax::{parse_directives, DefinitionNode, Directive, ParseResult};

// Metadata re-exports
pub use typegraph_metadata::{
    freeze, metadata_read, metadata_write, reset, ArgMetadata, DirectiveMetadata, EnumMetadata,
    EnumValueMetadata, MetadataStorage, Nullable, ParamMetadata, PropertyMetadata, Scalar,
    TypeKind, TypeMetadata, TypeOptions, TypeValue, UnionMetadata,
};

// Runtime re-exports
pub use typegraph_runtime::{
    Container, ContainerError, Context, EnumType, Field, FieldError, FieldMiddleware,
    FieldResolverHandler, HandlerBinding, InputObjectType, InputValue, InterfaceType, NamedType,
    Next, ObjectType, RequestId, RequestScope, Resolver, ResolverArgs, ResolverError,
    ResolverFuture, ResolverInfo, ResolverParams, ResolverResult, Schema, Scope, ScopedContainer,
    TypeRef, TypeResolution, UnionType,
};

// Compiler re-exports
pub use typegraph_compiler::{
    BuildContext, BuildOptions, BuildSettings, CompiledTypeNode, SchemaGenerator, SchemaRoots,
};

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        ArgMetadata, BuildOptions, BuildSettings, DirectiveMetadata, EntityId, EnumMetadata,
        EnumValueMetadata, FieldMiddleware, FieldResolverHandler, HandlerBinding, Nullable,
        PropertyMetadata, ResolverParams, Scalar, SchemaRoots, Scope, ScopedContainer,
        TypeMetadata, TypeValue, UnionMetadata,
    };
}

/// Builds a schema from a snapshot of the process-wide metadata store.
///
/// Registrations made after the snapshot is taken do not affect the build.
pub fn build_schema(roots: &SchemaRoots, options: BuildOptions) -> BuildResult<Schema> {
    let snapshot = freeze();
    debug!(types = snapshot.len(), "building schema from metadata snapshot");
    SchemaGenerator::build(snapshot, options, roots)
}
