//! Output Type Resolver.
//!
//! Turns a declared [`TypeValue`] and its [`TypeOptions`] into the wrapped
//! schema type. Entity references are looked up in the Type Definition
//! Registry, so this only runs while a deferred field map is evaluated.

use crate::context::BuildContext;
use typegraph_core::{BuildError, BuildResult, EntityId};
use typegraph_metadata::{Nullable, TypeOptions, TypeValue};
use typegraph_runtime::TypeRef;

/// Where a resolved type is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Field of an object or interface.
    Output,
    /// Argument or input object field.
    Input,
}

impl Position {
    fn expected(self) -> &'static str {
        match self {
            Self::Output => "output",
            Self::Input => "input",
        }
    }
}

/// Resolves the type of an object or interface field.
pub fn resolve_output_type(
    ctx: &BuildContext,
    type_name: &str,
    field: &str,
    ty: &TypeValue,
    options: &TypeOptions,
) -> BuildResult<TypeRef> {
    resolve_type(ctx, Position::Output, type_name, field, ty, options)
}

/// Resolves the type of an argument or input object field.
pub fn resolve_input_type(
    ctx: &BuildContext,
    type_name: &str,
    field: &str,
    ty: &TypeValue,
    options: &TypeOptions,
) -> BuildResult<TypeRef> {
    resolve_type(ctx, Position::Input, type_name, field, ty, options)
}

fn resolve_type(
    ctx: &BuildContext,
    position: Position,
    type_name: &str,
    field: &str,
    ty: &TypeValue,
    options: &TypeOptions,
) -> BuildResult<TypeRef> {
    let depth = ty.list_depth();
    if depth == 0 && options.nullable.is_some_and(Nullable::requires_list) {
        return Err(BuildError::WrongNullableListOption {
            type_name: type_name.to_string(),
            field: field.to_string(),
        });
    }

    let name = match ty.innermost() {
        TypeValue::Entity(id) => lookup(ctx, position, *id).ok_or_else(|| {
            BuildError::UnresolvableType {
                type_name: type_name.to_string(),
                field: field.to_string(),
                entity: *id,
                expected: position.expected(),
            }
        })?,
        scalar => scalar.to_string(),
    };

    let keep_nullable = position == Position::Input && options.default_value.is_some();
    Ok(wrap(
        TypeRef::named(name),
        depth,
        options.nullable,
        ctx.options().settings.nullable_by_default,
        keep_nullable,
    ))
}

fn lookup(ctx: &BuildContext, position: Position, id: EntityId) -> Option<String> {
    match position {
        Position::Output => ctx.registry().output_type_name(id),
        Position::Input => ctx.registry().input_type_name(id),
    }
}

/// Applies list and non-null wrappers to a named type.
///
/// Items are non-null unless `Items`/`ItemsAndList` is set or the option is
/// unset while nullable by default. The outer type is non-null for `No` and
/// `Items`, or when unset while not nullable by default. `keep_nullable`
/// leaves the outer type nullable unless `No` is set explicitly.
pub fn wrap(
    named: TypeRef,
    depth: usize,
    nullable: Option<Nullable>,
    nullable_by_default: bool,
    keep_nullable: bool,
) -> TypeRef {
    let items_nullable = match nullable {
        Some(option) => matches!(option, Nullable::Items | Nullable::ItemsAndList),
        None => nullable_by_default,
    };
    let outer_non_null = match nullable {
        Some(Nullable::No) => true,
        Some(Nullable::Items) => !keep_nullable,
        Some(Nullable::Yes | Nullable::ItemsAndList) => false,
        None => !nullable_by_default && !keep_nullable,
    };

    let mut ty = named;
    for _ in 0..depth {
        if !items_nullable {
            ty = TypeRef::non_null(ty);
        }
        ty = TypeRef::list(ty);
    }
    if outer_non_null {
        ty = TypeRef::non_null(ty);
    }
    ty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{BuildOptions, BuildSettings};
    use std::sync::Arc;
    use typegraph_metadata::{MetadataStorage, Scalar};

    struct User;

    fn user() -> TypeRef {
        TypeRef::named("User")
    }

    fn printed(depth: usize, nullable: Option<Nullable>, by_default: bool) -> String {
        wrap(user(), depth, nullable, by_default, false).to_string()
    }

    #[test]
    fn test_wrap_plain_types() {
        assert_eq!(printed(0, None, false), "User!");
        assert_eq!(printed(0, None, true), "User");
        assert_eq!(printed(0, Some(Nullable::Yes), false), "User");
        assert_eq!(printed(0, Some(Nullable::No), true), "User!");
    }

    #[test]
    fn test_wrap_lists() {
        assert_eq!(printed(1, None, false), "[User!]!");
        assert_eq!(printed(1, None, true), "[User]");
        assert_eq!(printed(1, Some(Nullable::Yes), false), "[User!]");
        assert_eq!(printed(1, Some(Nullable::Items), false), "[User]!");
        assert_eq!(printed(1, Some(Nullable::ItemsAndList), false), "[User]");
        assert_eq!(printed(2, None, false), "[[User!]!]!");
    }

    #[test]
    fn test_wrap_keep_nullable() {
        assert_eq!(wrap(user(), 0, None, false, true).to_string(), "User");
        assert_eq!(wrap(user(), 1, Some(Nullable::Items), false, true).to_string(), "[User]");
        assert_eq!(wrap(user(), 0, Some(Nullable::No), false, true).to_string(), "User!");
    }

    fn context() -> Arc<BuildContext> {
        BuildContext::new(Arc::new(MetadataStorage::new()), BuildOptions::new())
    }

    #[test]
    fn test_scalar_output_type() {
        let ctx = context();
        let ty = resolve_output_type(
            &ctx,
            "User",
            "tags",
            &TypeValue::list(Scalar::String.into()),
            &TypeOptions::default(),
        )
        .unwrap();
        assert_eq!(ty.to_string(), "[String!]!");
    }

    #[test]
    fn test_input_default_keeps_type_nullable() {
        let ctx = context();
        let options = TypeOptions {
            nullable: None,
            default_value: Some(serde_json::json!(10)),
        };
        let ty = resolve_input_type(&ctx, "Query", "users(first)", &Scalar::Int.into(), &options)
            .unwrap();
        assert_eq!(ty.to_string(), "Int");

        // Output fields ignore the default for nullability.
        let ty = resolve_output_type(&ctx, "User", "age", &Scalar::Int.into(), &options).unwrap();
        assert_eq!(ty.to_string(), "Int!");
    }

    #[test]
    fn test_nullable_items_on_non_list() {
        let ctx = context();
        let options = TypeOptions {
            nullable: Some(Nullable::Items),
            default_value: None,
        };
        let err = resolve_output_type(&ctx, "User", "name", &Scalar::String.into(), &options)
            .unwrap_err();
        assert!(matches!(err, BuildError::WrongNullableListOption { .. }));
        assert_eq!(
            err.to_string(),
            "`User.name` uses a nullable list option but its type is not a list"
        );
    }

    #[test]
    fn test_unknown_entity_is_unresolvable() {
        let ctx = BuildContext::new(
            Arc::new(MetadataStorage::new()),
            BuildOptions::new().with_settings(BuildSettings::default().nullable_by_default(true)),
        );
        let err = resolve_output_type(
            &ctx,
            "Query",
            "me",
            &TypeValue::entity::<User>(),
            &TypeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot determine GraphQL output type for `Query.me`: `User` has no compiled output type"
        );
    }
}
