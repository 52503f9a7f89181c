//! Argument Compiler.

use crate::context::BuildContext;
use crate::output::resolve_input_type;
use indexmap::IndexMap;
use typegraph_core::{BuildError, BuildResult, EntityId};
use typegraph_metadata::{ArgMetadata, ParamMetadata, PropertyMetadata, TypeMetadata};
use typegraph_runtime::InputValue;
use typegraph_syntax::{synth::synthesize, DefinitionKind};

/// Compiles the parameters of `type_name.field` into schema arguments.
///
/// Args types are flattened in place, fields of parent args types first.
/// A later argument with the same name replaces an earlier one.
pub fn compile_args(
    ctx: &BuildContext,
    type_name: &str,
    field: &str,
    params: &[ParamMetadata],
) -> BuildResult<IndexMap<String, InputValue>> {
    let mut args = IndexMap::new();
    for param in params {
        match param {
            ParamMetadata::Arg(arg) => {
                let value = compile_arg(ctx, type_name, field, arg)?;
                args.insert(value.name.clone(), value);
            }
            ParamMetadata::Args(entity) => {
                for args_type in args_chain(ctx, *entity)? {
                    for property in &args_type.fields {
                        let site = format!("{field}({})", property.schema_name);
                        let value = property_input_value(ctx, type_name, &site, property)?;
                        args.insert(value.name.clone(), value);
                    }
                }
            }
        }
    }
    Ok(args)
}

fn compile_arg(
    ctx: &BuildContext,
    type_name: &str,
    field: &str,
    arg: &ArgMetadata,
) -> BuildResult<InputValue> {
    let declared = arg.type_value();
    ctx.orphans().register(&declared);
    let site = format!("{field}({})", arg.name);
    let ty = resolve_input_type(ctx, type_name, &site, &declared, &arg.options)?;

    let mut value = InputValue::new(arg.name.clone(), ty);
    value.description.clone_from(&arg.description);
    value.default_value.clone_from(&arg.options.default_value);
    value.deprecation_reason.clone_from(&arg.deprecation_reason);
    value.ast_node = synthesize(DefinitionKind::InputValueDefinition, &arg.name, &arg.directives)?;
    Ok(value)
}

/// Compiles a property of an input or args type into an input value.
pub(crate) fn property_input_value(
    ctx: &BuildContext,
    type_name: &str,
    site: &str,
    property: &PropertyMetadata,
) -> BuildResult<InputValue> {
    let declared = property.type_value();
    ctx.orphans().register(&declared);
    let ty = resolve_input_type(ctx, type_name, site, &declared, &property.options)?;

    let mut value = InputValue::new(property.schema_name.clone(), ty);
    value.description.clone_from(&property.description);
    value.default_value.clone_from(&property.options.default_value);
    value.deprecation_reason.clone_from(&property.deprecation_reason);
    value.ast_node = synthesize(
        DefinitionKind::InputValueDefinition,
        &property.schema_name,
        &property.directives,
    )?;
    value.extensions.clone_from(&property.extensions);
    Ok(value)
}

/// Returns the args type `entity` and its parents, root first.
fn args_chain(ctx: &BuildContext, entity: EntityId) -> BuildResult<Vec<&TypeMetadata>> {
    let max_depth = ctx.options().settings.max_inheritance_depth;
    let mut chain: Vec<&TypeMetadata> = Vec::new();
    let mut next = Some(entity);
    while let Some(id) = next {
        if chain.iter().any(|m| m.target == id) {
            let mut path: Vec<EntityId> = chain.iter().map(|m| m.target).collect();
            path.push(id);
            return Err(BuildError::CircularInheritance {
                type_name: entity.name().to_string(),
                path,
            });
        }
        if chain.len() > max_depth {
            return Err(BuildError::InheritanceTooDeep {
                type_name: entity.name().to_string(),
                max_depth,
            });
        }
        let metadata = ctx
            .storage()
            .args_metadata_for(id)
            .ok_or(BuildError::MissingMetadata { entity: id })?;
        next = metadata.parent;
        chain.push(metadata);
    }
    chain.reverse();
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{BuildOptions, BuildSettings};
    use std::sync::Arc;
    use typegraph_metadata::{MetadataStorage, Nullable, Scalar};
    use typegraph_syntax::DirectiveAnnotation;

    struct PageArgs;
    struct SearchArgs;
    struct LoopArgs;

    fn storage() -> MetadataStorage {
        let mut storage = MetadataStorage::new();
        storage
            .register_type(
                TypeMetadata::args::<PageArgs>()
                    .field(
                        PropertyMetadata::new("first", || Scalar::Int.into())
                            .default_value(serde_json::json!(10)),
                    )
                    .field(
                        PropertyMetadata::new("after", || Scalar::String.into())
                            .nullable(Nullable::Yes),
                    ),
            )
            .register_type(
                TypeMetadata::args::<SearchArgs>()
                    .extends::<PageArgs>()
                    .field(PropertyMetadata::new("term", || Scalar::String.into())),
            );
        storage
    }

    fn context(storage: MetadataStorage) -> Arc<BuildContext> {
        BuildContext::new(Arc::new(storage), BuildOptions::new())
    }

    #[test]
    fn test_single_args() {
        let ctx = context(MetadataStorage::new());
        let params = vec![ParamMetadata::Arg(
            ArgMetadata::new("id", || Scalar::Id.into())
                .description("Lookup key")
                .directive(DirectiveAnnotation::named("sensitive")),
        )];

        let args = compile_args(&ctx, "Query", "user", &params).unwrap();
        let id = &args["id"];
        assert_eq!(id.ty.to_string(), "ID!");
        assert_eq!(id.description.as_deref(), Some("Lookup key"));
        assert!(id.ast_node.as_ref().unwrap().has_directive("sensitive"));
    }

    #[test]
    fn test_args_type_flattened_parent_first() {
        let ctx = context(storage());
        let params = vec![ParamMetadata::Args(EntityId::of::<SearchArgs>())];

        let args = compile_args(&ctx, "Query", "search", &params).unwrap();
        assert_eq!(
            args.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["first", "after", "term"]
        );
        assert_eq!(args["first"].ty.to_string(), "Int");
        assert_eq!(args["first"].default_value, Some(serde_json::json!(10)));
        assert_eq!(args["after"].ty.to_string(), "String");
        assert_eq!(args["term"].ty.to_string(), "String!");
    }

    #[test]
    fn test_missing_args_type() {
        let ctx = context(MetadataStorage::new());
        let params = vec![ParamMetadata::Args(EntityId::of::<PageArgs>())];

        let err = compile_args(&ctx, "Query", "users", &params).unwrap_err();
        assert_eq!(err.to_string(), "no metadata registered for `PageArgs`");
    }

    #[test]
    fn test_cyclic_args_type() {
        let mut storage = MetadataStorage::new();
        storage.register_type(TypeMetadata::args::<LoopArgs>().extends::<LoopArgs>());
        let ctx = BuildContext::new(
            Arc::new(storage),
            BuildOptions::new().with_settings(BuildSettings::default().max_inheritance_depth(4)),
        );
        let params = vec![ParamMetadata::Args(EntityId::of::<LoopArgs>())];

        let err = compile_args(&ctx, "Query", "spin", &params).unwrap_err();
        assert!(matches!(err, BuildError::CircularInheritance { ref path, .. } if path.len() == 2));
    }
}
