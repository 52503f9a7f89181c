//! Type metadata for typegraph.
//!
//! This crate provides:
//! - `types`: Type identities, scalars and nullability options
//! - `definitions`: Metadata of types, fields, arguments, enums and unions
//! - `storage`: The metadata store and its process-wide instance

pub mod definitions;
pub mod storage;
pub mod types;

pub use definitions::{
    ArgMetadata, EnumMetadata, EnumValueMetadata, MembersFn, ParamMetadata, PropertyMetadata,
    TypeKind, TypeMetadata, UnionMetadata,
};
pub use storage::{freeze, metadata_read, metadata_write, reset, MetadataStorage};
pub use types::{Nullable, Scalar, TypeFn, TypeOptions, TypeValue};
pub use typegraph_syntax::DirectiveAnnotation as DirectiveMetadata;
