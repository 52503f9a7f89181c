//! Runtime primitives for typegraph.
//!
//! This crate provides the pieces a compiled schema is made of:
//! - `deferred`: Memoized, thread-safe deferred values
//! - `schema`: Type-system nodes and the assembled schema
//! - `resolver`: Resolver trait, arguments and errors
//! - `context`: Request context and field errors
//! - `container`: Dependency injection for field resolver handlers
//! - `middleware`: Field middleware chain
//! - `compose`: Construction of the resolve function of each field

pub mod compose;
pub mod container;
pub mod context;
pub mod deferred;
pub mod middleware;
pub mod resolver;
pub mod schema;

pub use compose::{FieldResolverCompositor, HandlerBinding, ResolverSpec, RootResolver};
pub use container::{
    Container, ContainerError, FieldResolverHandler, RequestScope, Scope, ScopedContainer,
};
pub use context::{Context, FieldError, PathSegment, RequestId};
pub use deferred::{Deferred, DeferredSource};
pub use middleware::{FieldMiddleware, MiddlewareResolver, Next};
pub use resolver::{
    FnResolver, Resolver, ResolverArgs, ResolverError, ResolverFuture, ResolverInfo,
    ResolverParams, ResolverResult,
};
pub use schema::{
    EnumType, EnumValue, Field, FieldMap, InputFieldMap, InputObjectType, InputValue,
    InterfaceType, IsTypeOfFn, NamedType, ObjectType, ResolveTypeFn, ScalarType, Schema,
    SchemaBuilder, TypeRef, TypeResolution, UnionType,
};
