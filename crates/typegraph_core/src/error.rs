//! Schema build errors.
//!
//! Every structural problem discovered while compiling metadata aborts the
//! build. Errors name the offending type and, where relevant, the field and
//! the missing entity, so they can be rendered by `miette` without a trace.

use crate::entity::EntityId;
use miette::{Diagnostic, SourceSpan};
use std::fmt;
use thiserror::Error;

/// What kind of reference could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// An implemented interface.
    Interface,
    /// A parent type in the inheritance chain.
    Parent,
    /// A union member.
    UnionMember,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interface => "interface",
            Self::Parent => "parent type",
            Self::UnionMember => "union member",
        })
    }
}

/// Error raised while compiling metadata into a schema.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum BuildError {
    /// A referenced interface or parent type was never compiled.
    #[error("type `{type_name}` references {kind} `{missing}` which was never compiled")]
    #[diagnostic(
        code(typegraph::missing_type_definition),
        help("register metadata for `{missing}` before building the schema")
    )]
    MissingTypeDefinition {
        type_name: String,
        kind: ReferenceKind,
        missing: EntityId,
    },

    /// The interface or parent chain revisits an entity on the current path.
    #[error("circular inheritance detected for `{type_name}`: {}", display_path(.path))]
    #[diagnostic(code(typegraph::circular_inheritance))]
    CircularInheritance {
        type_name: String,
        path: Vec<EntityId>,
    },

    /// The inheritance chain is deeper than the configured bound.
    #[error("inheritance chain of `{type_name}` exceeds the maximum depth of {max_depth}")]
    #[diagnostic(
        code(typegraph::inheritance_too_deep),
        help("raise `max_inheritance_depth` in the build settings")
    )]
    InheritanceTooDeep { type_name: String, max_depth: usize },

    /// A field, argument or union member refers to an entity with no
    /// compiled type of the expected kind.
    #[error(
        "cannot determine GraphQL {expected} type for `{type_name}.{field}`: `{entity}` has no compiled {expected} type"
    )]
    #[diagnostic(
        code(typegraph::unresolvable_type),
        help("declare `{entity}` as {expected} type metadata")
    )]
    UnresolvableType {
        type_name: String,
        field: String,
        entity: EntityId,
        expected: &'static str,
    },

    /// Metadata was handed to a compiler for another kind of type.
    #[error("`{type_name}` is declared as {kind} metadata, expected {expected}")]
    #[diagnostic(code(typegraph::wrong_type_kind))]
    WrongTypeKind {
        type_name: String,
        kind: String,
        expected: &'static str,
    },

    /// No metadata was registered for an entity that compilation needed.
    #[error("no metadata registered for `{entity}`")]
    #[diagnostic(code(typegraph::missing_metadata))]
    MissingMetadata { entity: EntityId },

    /// A nullable-items option was used on a field that is not a list.
    #[error("`{type_name}.{field}` uses a nullable list option but its type is not a list")]
    #[diagnostic(
        code(typegraph::wrong_nullable_list_option),
        help("use `Nullable::Yes` or `Nullable::No` for non-list fields")
    )]
    WrongNullableListOption { type_name: String, field: String },

    /// Two entities claim the same schema type name.
    #[error("type name `{name}` is declared by both `{first}` and `{second}`")]
    #[diagnostic(code(typegraph::duplicate_type_name))]
    DuplicateTypeName {
        name: String,
        first: EntityId,
        second: EntityId,
    },

    /// A directive annotation could not be turned into a syntax node.
    #[error("invalid directive on `{target}`: {message}")]
    #[diagnostic(code(typegraph::invalid_directive))]
    InvalidDirective {
        target: String,
        message: String,
        #[source_code]
        source_code: String,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    /// A deferred value outlived the build context that was meant to evaluate it.
    #[error("build context for `{type_name}` was released before its {what} were evaluated")]
    #[diagnostic(
        code(typegraph::context_released),
        help("keep the schema generator alive until the schema is built")
    )]
    ContextReleased { type_name: String, what: &'static str },
}

/// Result alias for schema build operations.
pub type BuildResult<T> = Result<T, BuildError>;

fn display_path(path: &[EntityId]) -> String {
    path.iter()
        .map(EntityId::name)
        .collect::<Vec<_>>()
        .join(" -> ")
}
