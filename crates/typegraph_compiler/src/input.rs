//! Compilation of input objects, enums and unions.

use crate::args::property_input_value;
use crate::context::{upgrade, BuildContext};
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;
use typegraph_core::{BuildError, BuildResult, EntityId, ReferenceKind};
use typegraph_metadata::{EnumMetadata, TypeKind, TypeMetadata, UnionMetadata};
use typegraph_runtime::{
    Deferred, DeferredSource, EnumType, EnumValue, InputFieldMap, InputObjectType, ObjectType,
    TypeResolution, UnionType,
};
use typegraph_syntax::{synth::synthesize, DefinitionKind};

/// A compiled input object type.
#[derive(Clone)]
pub struct CompiledInputNode {
    pub target: EntityId,
    pub metadata: Arc<TypeMetadata>,
    pub ty: Arc<InputObjectType>,
}

impl fmt::Debug for CompiledInputNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledInputNode")
            .field("target", &self.target)
            .field("name", &self.metadata.name)
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Compiles an input object type and registers it.
    ///
    /// Fields of the parent input type are inherited; own fields win.
    pub fn compile_input(&self, metadata: &TypeMetadata) -> BuildResult<CompiledInputNode> {
        if metadata.kind != TypeKind::InputObject {
            return Err(BuildError::WrongTypeKind {
                type_name: metadata.name.clone(),
                kind: metadata.kind.to_string(),
                expected: "input",
            });
        }
        self.registry().claim_name(&metadata.name, metadata.target)?;

        let metadata = Arc::new(metadata.clone());
        let ty = Arc::new(InputObjectType {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            fields: Deferred::new(InputFieldsSource {
                ctx: self.handle(),
                metadata: Arc::clone(&metadata),
            }),
            ast_node: synthesize(
                DefinitionKind::InputObjectType,
                &metadata.name,
                &metadata.directives,
            )?,
            extensions: metadata.extensions.clone(),
        });
        let node = CompiledInputNode {
            target: metadata.target,
            metadata,
            ty,
        };
        debug!(entity = %node.target, name = %node.ty.name, "compiled input skeleton");
        self.registry().insert_input(node.clone());
        Ok(node)
    }

    fn input_fields(&self, metadata: &TypeMetadata) -> BuildResult<InputFieldMap> {
        self.check_chain(metadata)?;

        let mut fields = match metadata.parent {
            Some(parent) => self
                .registry()
                .compiled_input_for(parent)
                .ok_or_else(|| BuildError::MissingTypeDefinition {
                    type_name: metadata.name.clone(),
                    kind: ReferenceKind::Parent,
                    missing: parent,
                })?
                .ty
                .fields()?
                .clone(),
            None => InputFieldMap::new(),
        };
        for property in &metadata.fields {
            let value = property_input_value(self, &metadata.name, &property.schema_name, property)?;
            fields.insert(value.name.clone(), value);
        }

        debug!(name = %metadata.name, count = fields.len(), "resolved input fields");
        Ok(fields)
    }

    /// Compiles an enum type and registers it.
    pub fn compile_enum(&self, metadata: &EnumMetadata) -> BuildResult<Arc<EnumType>> {
        self.registry().claim_name(&metadata.name, metadata.target)?;

        let mut values = IndexMap::with_capacity(metadata.values.len());
        for value in &metadata.values {
            values.insert(
                value.name.clone(),
                EnumValue {
                    name: value.name.clone(),
                    description: value.description.clone(),
                    deprecation_reason: value.deprecation_reason.clone(),
                    value: value.value.clone(),
                    ast_node: synthesize(DefinitionKind::EnumValue, &value.name, &value.directives)?,
                },
            );
        }
        let ty = Arc::new(EnumType {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            values,
            ast_node: synthesize(DefinitionKind::EnumType, &metadata.name, &metadata.directives)?,
        });

        debug!(entity = %metadata.target, name = %ty.name, values = ty.values.len(), "compiled enum");
        self.registry().insert_enum(metadata.target, Arc::clone(&ty));
        Ok(ty)
    }

    /// Compiles a union type and registers it. Members are resolved on first
    /// access and must all be compiled object types.
    pub fn compile_union(&self, metadata: &UnionMetadata) -> BuildResult<Arc<UnionType>> {
        self.registry().claim_name(&metadata.name, metadata.target)?;

        let metadata = Arc::new(metadata.clone());
        let ty = Arc::new(UnionType {
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            members: Deferred::new(UnionMembersSource {
                ctx: self.handle(),
                metadata: Arc::clone(&metadata),
            }),
            resolve_type: metadata
                .resolve_type
                .clone()
                .map_or(TypeResolution::Typename, TypeResolution::Custom),
            ast_node: synthesize(DefinitionKind::UnionType, &metadata.name, &metadata.directives)?,
        });

        debug!(entity = %metadata.target, name = %ty.name, "compiled union skeleton");
        self.registry().insert_union(metadata.target, Arc::clone(&ty));
        Ok(ty)
    }

    fn union_members(&self, metadata: &UnionMetadata) -> BuildResult<Vec<Arc<ObjectType>>> {
        let mut members: Vec<Arc<ObjectType>> = Vec::new();
        for id in metadata.members() {
            let node = self.registry().compiled_object_for(id).ok_or_else(|| {
                BuildError::MissingTypeDefinition {
                    type_name: metadata.name.clone(),
                    kind: ReferenceKind::UnionMember,
                    missing: id,
                }
            })?;
            if let Some(object) = node.as_object() {
                if !members.iter().any(|m| Arc::ptr_eq(m, object)) {
                    members.push(Arc::clone(object));
                }
            }
        }
        debug!(name = %metadata.name, count = members.len(), "resolved union members");
        Ok(members)
    }
}

struct InputFieldsSource {
    ctx: Weak<BuildContext>,
    metadata: Arc<TypeMetadata>,
}

impl DeferredSource<InputFieldMap> for InputFieldsSource {
    fn evaluate(&self) -> BuildResult<InputFieldMap> {
        upgrade(&self.ctx, &self.metadata.name, "input fields")?.input_fields(&self.metadata)
    }
}

struct UnionMembersSource {
    ctx: Weak<BuildContext>,
    metadata: Arc<UnionMetadata>,
}

impl DeferredSource<Vec<Arc<ObjectType>>> for UnionMembersSource {
    fn evaluate(&self) -> BuildResult<Vec<Arc<ObjectType>>> {
        upgrade(&self.ctx, &self.metadata.name, "members")?.union_members(&self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildOptions;
    use serde_json::json;
    use typegraph_metadata::{
        EnumValueMetadata, MetadataStorage, Nullable, PropertyMetadata, Scalar, TypeValue,
    };
    use typegraph_syntax::DirectiveAnnotation;

    struct PageInput;
    struct FilterInput;
    struct Role;
    struct SearchResult;
    struct User;
    struct Post;

    fn context() -> Arc<BuildContext> {
        BuildContext::new(Arc::new(MetadataStorage::new()), BuildOptions::new())
    }

    #[test]
    fn test_input_inherits_parent_fields() {
        let ctx = context();
        ctx.compile_enum(&EnumMetadata::new::<Role>("Role").value(EnumValueMetadata::new("ADMIN")))
            .unwrap();
        ctx.compile_input(
            &TypeMetadata::input::<PageInput>("PageInput")
                .field(PropertyMetadata::new("first", || Scalar::Int.into()).default_value(json!(20)))
                .field(PropertyMetadata::new("after", || Scalar::String.into()).nullable(Nullable::Yes)),
        )
        .unwrap();
        let filter = ctx
            .compile_input(
                &TypeMetadata::input::<FilterInput>("FilterInput")
                    .extends::<PageInput>()
                    .field(PropertyMetadata::new("after", || Scalar::String.into()))
                    .field(PropertyMetadata::new("roles", || {
                        TypeValue::list(TypeValue::entity::<Role>())
                    })),
            )
            .unwrap();

        let fields = filter.ty.fields().unwrap();
        assert_eq!(
            fields.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["first", "after", "roles"]
        );
        assert_eq!(fields["first"].ty.to_string(), "Int");
        assert_eq!(fields["after"].ty.to_string(), "String!");
        assert_eq!(fields["roles"].ty.to_string(), "[Role!]!");
        assert!(ctx.orphans().contains(EntityId::of::<Role>()));
    }

    #[test]
    fn test_object_is_not_an_input_type() {
        let ctx = context();
        ctx.compile(&TypeMetadata::object::<User>("User")).unwrap();
        let input = ctx
            .compile_input(
                &TypeMetadata::input::<PageInput>("PageInput")
                    .field(PropertyMetadata::new("owner", TypeValue::entity::<User>)),
            )
            .unwrap();

        let err = input.ty.fields().unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot determine GraphQL input type for `PageInput.owner`: `User` has no compiled input type"
        );
    }

    #[test]
    fn test_enum_values() {
        let ctx = context();
        let role = ctx
            .compile_enum(
                &EnumMetadata::new::<Role>("Role")
                    .description("Access level")
                    .value(EnumValueMetadata::new("ADMIN").value(json!(1)))
                    .value(
                        EnumValueMetadata::new("GUEST")
                            .deprecated("Use VIEWER")
                            .directive(DirectiveAnnotation::named("internal")),
                    ),
            )
            .unwrap();

        assert_eq!(role.values["ADMIN"].value, json!(1));
        assert_eq!(role.values["GUEST"].value, json!("GUEST"));
        assert_eq!(role.values["GUEST"].deprecation_reason.as_deref(), Some("Use VIEWER"));
        assert!(role.values["GUEST"].ast_node.as_ref().unwrap().has_directive("internal"));
        assert!(role.ast_node.is_none());
    }

    #[test]
    fn test_union_members_resolved_lazily() {
        let ctx = context();
        let union = ctx
            .compile_union(&UnionMetadata::new::<SearchResult, _>("SearchResult", || {
                vec![
                    EntityId::of::<User>(),
                    EntityId::of::<Post>(),
                    EntityId::of::<User>(),
                ]
            }))
            .unwrap();
        ctx.compile(&TypeMetadata::object::<User>("User")).unwrap();
        ctx.compile(&TypeMetadata::object::<Post>("Post")).unwrap();

        let members = union.members().unwrap();
        assert_eq!(
            members.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            vec!["User", "Post"]
        );
    }

    #[test]
    fn test_union_member_must_be_compiled_object() {
        let ctx = context();
        let union = ctx
            .compile_union(&UnionMetadata::new::<SearchResult, _>("SearchResult", || {
                vec![EntityId::of::<User>()]
            }))
            .unwrap();

        assert_eq!(
            union.members().unwrap_err().to_string(),
            "type `SearchResult` references union member `User` which was never compiled"
        );
    }

    #[test]
    fn test_duplicate_type_name() {
        let ctx = context();
        ctx.compile_enum(&EnumMetadata::new::<Role>("Role")).unwrap();
        let err = ctx
            .compile_input(&TypeMetadata::input::<PageInput>("Role"))
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateTypeName { ref name, .. } if name == "Role"));
    }
}
