//! Object/Interface Type Compiler.
//!
//! [`BuildContext::compile`] turns one [`TypeMetadata`] into a
//! [`CompiledTypeNode`] and registers it. Only the skeleton is built eagerly;
//! the interface list and the field map are deferred until first access,
//! when every type they refer to has been compiled.
//!
//! The field map of a type is made of, lowest precedence first:
//! 1. fields of its parent type, as compiled for the parent,
//! 2. fields of every transitively implemented interface,
//! 3. its own fields.

use crate::args::compile_args;
use crate::context::{upgrade, BuildContext};
use crate::output::resolve_output_type;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};
use typegraph_core::{BuildError, BuildResult, EntityId, ReferenceKind};
use typegraph_metadata::{PropertyMetadata, TypeKind, TypeMetadata};
use typegraph_runtime::{
    Deferred, DeferredSource, Field, FieldMap, InterfaceType, NamedType, ObjectType,
    ResolverSpec, TypeResolution,
};
use typegraph_syntax::{synth::synthesize, DefinitionKind};

/// The schema type of a compiled node.
#[derive(Debug, Clone)]
pub enum CompiledType {
    Object(Arc<ObjectType>),
    Interface(Arc<InterfaceType>),
}

/// A compiled object or interface type.
#[derive(Clone)]
pub struct CompiledTypeNode {
    /// The declaring entity.
    pub target: EntityId,
    pub metadata: Arc<TypeMetadata>,
    pub ty: CompiledType,
    pub is_abstract: bool,
    /// Directly implemented interfaces, without duplicates.
    pub interfaces: Vec<EntityId>,
}

impl CompiledTypeNode {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn kind(&self) -> TypeKind {
        self.metadata.kind
    }

    /// Returns the field map, evaluating it on first access.
    pub fn fields(&self) -> BuildResult<&FieldMap> {
        match &self.ty {
            CompiledType::Object(ty) => ty.fields(),
            CompiledType::Interface(ty) => ty.fields(),
        }
    }

    /// Returns every implemented interface, inherited ones included.
    pub fn resolved_interfaces(&self) -> BuildResult<&[Arc<InterfaceType>]> {
        match &self.ty {
            CompiledType::Object(ty) => ty.interfaces(),
            CompiledType::Interface(ty) => ty.interfaces(),
        }
    }

    pub fn as_object(&self) -> Option<&Arc<ObjectType>> {
        match &self.ty {
            CompiledType::Object(ty) => Some(ty),
            CompiledType::Interface(_) => None,
        }
    }

    pub fn as_interface(&self) -> Option<&Arc<InterfaceType>> {
        match &self.ty {
            CompiledType::Interface(ty) => Some(ty),
            CompiledType::Object(_) => None,
        }
    }

    pub fn to_named_type(&self) -> NamedType {
        match &self.ty {
            CompiledType::Object(ty) => NamedType::Object(Arc::clone(ty)),
            CompiledType::Interface(ty) => NamedType::Interface(Arc::clone(ty)),
        }
    }
}

impl fmt::Debug for CompiledTypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTypeNode")
            .field("target", &self.target)
            .field("kind", &self.metadata.kind)
            .field("name", &self.metadata.name)
            .field("is_abstract", &self.is_abstract)
            .field("interfaces", &self.interfaces)
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Compiles an object or interface type and registers it.
    ///
    /// Compiling an entity again replaces its node.
    pub fn compile(&self, metadata: &TypeMetadata) -> BuildResult<CompiledTypeNode> {
        let definition_kind = match metadata.kind {
            TypeKind::Object => DefinitionKind::ObjectType,
            TypeKind::Interface => DefinitionKind::InterfaceType,
            kind => {
                return Err(BuildError::WrongTypeKind {
                    type_name: metadata.name.clone(),
                    kind: kind.to_string(),
                    expected: "object or interface",
                })
            }
        };
        self.registry().claim_name(&metadata.name, metadata.target)?;

        let metadata = Arc::new(metadata.clone());
        let ast_node = synthesize(definition_kind, &metadata.name, &metadata.directives)?;
        let fields = Deferred::new(FieldMapSource {
            ctx: self.handle(),
            metadata: Arc::clone(&metadata),
        });
        let interfaces = Deferred::new(InterfaceListSource {
            ctx: self.handle(),
            metadata: Arc::clone(&metadata),
        });

        let ty = match metadata.kind {
            TypeKind::Interface => CompiledType::Interface(Arc::new(InterfaceType {
                name: metadata.name.clone(),
                description: metadata.description.clone(),
                fields,
                interfaces,
                resolve_type: metadata
                    .resolve_type
                    .clone()
                    .map_or(TypeResolution::Typename, TypeResolution::Custom),
                ast_node,
                extensions: metadata.extensions.clone(),
            })),
            _ => CompiledType::Object(Arc::new(ObjectType {
                name: metadata.name.clone(),
                description: metadata.description.clone(),
                fields,
                interfaces,
                is_type_of: metadata.is_type_of.clone(),
                ast_node,
                extensions: metadata.extensions.clone(),
            })),
        };

        let mut direct = Vec::with_capacity(metadata.interfaces.len());
        for id in &metadata.interfaces {
            if !direct.contains(id) {
                direct.push(*id);
            }
        }

        let node = CompiledTypeNode {
            target: metadata.target,
            is_abstract: metadata.is_abstract,
            interfaces: direct,
            metadata,
            ty,
        };
        debug!(entity = %node.target, kind = %node.kind(), name = %node.name(), "compiled type skeleton");
        match node.ty {
            CompiledType::Object(_) => self.registry().insert_object(node.clone()),
            CompiledType::Interface(_) => self.registry().insert_interface(node.clone()),
        }
        Ok(node)
    }

    fn parent_node(&self, metadata: &TypeMetadata, parent: EntityId) -> BuildResult<CompiledTypeNode> {
        let node = match metadata.kind {
            TypeKind::Interface => self.registry().compiled_interface_for(parent),
            _ => self.registry().compiled_object_for(parent),
        };
        node.ok_or_else(|| BuildError::MissingTypeDefinition {
            type_name: metadata.name.clone(),
            kind: ReferenceKind::Parent,
            missing: parent,
        })
    }

    fn interface_node(&self, metadata: &TypeMetadata, id: EntityId) -> BuildResult<CompiledTypeNode> {
        self.registry()
            .compiled_interface_for(id)
            .ok_or_else(|| BuildError::MissingTypeDefinition {
                type_name: metadata.name.clone(),
                kind: ReferenceKind::Interface,
                missing: id,
            })
    }

    fn interface_list(&self, metadata: &TypeMetadata) -> BuildResult<Vec<Arc<InterfaceType>>> {
        self.check_chain(metadata)?;

        let mut interfaces: Vec<Arc<InterfaceType>> = Vec::new();
        let mut push = |ty: &Arc<InterfaceType>| {
            if !interfaces.iter().any(|seen| Arc::ptr_eq(seen, ty)) {
                interfaces.push(Arc::clone(ty));
            }
        };
        for id in &metadata.interfaces {
            let node = self.interface_node(metadata, *id)?;
            if let Some(ty) = node.as_interface() {
                push(ty);
            }
        }
        if let Some(parent) = metadata.parent {
            for ty in self.parent_node(metadata, parent)?.resolved_interfaces()? {
                push(ty);
            }
        }

        debug!(name = %metadata.name, count = interfaces.len(), "resolved interface list");
        Ok(interfaces)
    }

    /// Collects the metadata of every transitively implemented interface,
    /// ancestors before the interfaces extending them.
    fn interface_ancestors(&self, metadata: &TypeMetadata) -> BuildResult<Vec<Arc<TypeMetadata>>> {
        fn visit(
            ctx: &BuildContext,
            metadata: &TypeMetadata,
            seen: &mut FxHashSet<EntityId>,
            out: &mut Vec<Arc<TypeMetadata>>,
        ) -> BuildResult<()> {
            let parent = metadata
                .parent
                .filter(|_| metadata.kind == TypeKind::Interface);
            for id in metadata.interfaces.iter().copied().chain(parent) {
                if !seen.insert(id) {
                    continue;
                }
                let node = ctx.interface_node(metadata, id)?;
                visit(ctx, &node.metadata, seen, out)?;
                out.push(Arc::clone(&node.metadata));
            }
            Ok(())
        }

        let mut seen = FxHashSet::default();
        seen.insert(metadata.target);
        let mut out = Vec::new();
        visit(self, metadata, &mut seen, &mut out)?;
        Ok(out)
    }

    fn field_map(&self, metadata: &TypeMetadata) -> BuildResult<FieldMap> {
        self.check_chain(metadata)?;

        let ancestors = self.interface_ancestors(metadata)?;
        let mut declared: IndexMap<&str, (EntityId, &PropertyMetadata)> = IndexMap::new();
        for ancestor in &ancestors {
            for property in &ancestor.fields {
                declared.insert(&property.schema_name, (ancestor.target, property));
            }
        }
        for property in &metadata.fields {
            declared.insert(&property.schema_name, (metadata.target, property));
        }

        let mut fields = match metadata.parent {
            Some(parent) => self.parent_node(metadata, parent)?.fields()?.clone(),
            None => FieldMap::new(),
        };
        for (name, (declaring, property)) in declared {
            let field = self.compile_field(metadata, declaring, property)?;
            fields.insert(name.to_string(), field);
        }

        debug!(name = %metadata.name, count = fields.len(), "resolved field map");
        Ok(fields)
    }

    fn compile_field(
        &self,
        owner: &TypeMetadata,
        declaring: EntityId,
        property: &PropertyMetadata,
    ) -> BuildResult<Field> {
        let field_name = &property.schema_name;
        let declared = property.type_value();
        self.orphans().register(&declared);
        let ty = resolve_output_type(self, &owner.name, field_name, &declared, &property.options)?;
        let args = compile_args(self, &owner.name, field_name, &property.params)?;

        let handler = self
            .storage()
            .field_resolver_handler_for(owner.target, &property.name)
            .or_else(|| {
                self.storage()
                    .field_resolver_handler_for(declaring, &property.name)
            })
            .cloned();
        trace!(
            type_name = %owner.name,
            field = %field_name,
            handler = handler.is_some(),
            middlewares = property.middlewares.len(),
            "composing field resolver"
        );
        let resolve = self.compositor().compose(
            &owner.name,
            field_name,
            ResolverSpec {
                property: property.name.clone(),
                default_value: property.options.default_value.clone(),
                handler,
                middlewares: property.middlewares.clone(),
                simple: property.simple,
            },
        );

        Ok(Field {
            name: field_name.clone(),
            description: property.description.clone(),
            ty,
            args,
            resolve,
            deprecation_reason: property.deprecation_reason.clone(),
            complexity: property.complexity,
            ast_node: synthesize(DefinitionKind::FieldDefinition, field_name, &property.directives)?,
            extensions: property.extensions.clone(),
        })
    }
}

struct FieldMapSource {
    ctx: Weak<BuildContext>,
    metadata: Arc<TypeMetadata>,
}

impl DeferredSource<FieldMap> for FieldMapSource {
    fn evaluate(&self) -> BuildResult<FieldMap> {
        upgrade(&self.ctx, &self.metadata.name, "fields")?.field_map(&self.metadata)
    }
}

struct InterfaceListSource {
    ctx: Weak<BuildContext>,
    metadata: Arc<TypeMetadata>,
}

impl DeferredSource<Vec<Arc<InterfaceType>>> for InterfaceListSource {
    fn evaluate(&self) -> BuildResult<Vec<Arc<InterfaceType>>> {
        upgrade(&self.ctx, &self.metadata.name, "interfaces")?.interface_list(&self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{BuildOptions, BuildSettings};
    use serde_json::{json, Value};
    use typegraph_metadata::{ArgMetadata, MetadataStorage, Nullable, Scalar, TypeValue};
    use typegraph_runtime::{Context, ResolverArgs, ResolverInfo, ResolverParams, TypeRef};
    use typegraph_syntax::DirectiveAnnotation;

    struct Node;
    struct Entity;
    struct Named;
    struct User;
    struct Admin;
    struct Post;
    struct Author;

    fn context(storage: MetadataStorage) -> Arc<BuildContext> {
        context_with(storage, BuildOptions::new())
    }

    fn context_with(storage: MetadataStorage, options: BuildOptions) -> Arc<BuildContext> {
        let storage = Arc::new(storage);
        let ctx = BuildContext::new(Arc::clone(&storage), options);
        for kind in [TypeKind::Interface, TypeKind::Object] {
            for metadata in storage.types_of_kind(kind) {
                ctx.compile(metadata).unwrap();
            }
        }
        ctx
    }

    fn field_names(fields: &FieldMap) -> Vec<&str> {
        fields.keys().map(String::as_str).collect()
    }

    fn id_field() -> PropertyMetadata {
        PropertyMetadata::new("id", || Scalar::Id.into())
    }

    /// `Named -> Entity -> Node`, `User` implements `Named`.
    fn interface_chain() -> MetadataStorage {
        let mut storage = MetadataStorage::new();
        storage
            .register_type(TypeMetadata::interface::<Node>("Node").field(id_field()))
            .register_type(
                TypeMetadata::interface::<Entity>("Entity")
                    .implements::<Node>()
                    .field(PropertyMetadata::new("createdAt", || Scalar::String.into())),
            )
            .register_type(
                TypeMetadata::interface::<Named>("Named")
                    .implements::<Entity>()
                    .field(PropertyMetadata::new("name", || Scalar::String.into())),
            )
            .register_type(
                TypeMetadata::object::<User>("User")
                    .implements::<Named>()
                    .field(PropertyMetadata::new("email", || Scalar::String.into())),
            );
        storage
    }

    async fn resolve(field: &Field, root: Value) -> Value {
        let args = ResolverArgs::new();
        let context = Context::new();
        let info = ResolverInfo::new(&field.name, "User");
        ResolverParams::new(&root, &args, &context, &info)
            .call(field.resolve.as_ref())
            .await
            .unwrap()
    }

    #[test]
    fn test_interface_chain_fields_are_merged() {
        let ctx = context(interface_chain());
        let user = ctx.registry().compiled_object_for(EntityId::of::<User>()).unwrap();

        let fields = user.fields().unwrap();
        assert_eq!(field_names(fields), vec!["id", "createdAt", "name", "email"]);
        assert_eq!(fields["id"].ty, TypeRef::non_null(TypeRef::named("ID")));
    }

    #[test]
    fn test_own_field_wins_over_interface_field() {
        let mut storage = MetadataStorage::new();
        storage
            .register_type(TypeMetadata::interface::<Node>("Node").field(id_field()))
            .register_type(
                TypeMetadata::object::<User>("User")
                    .implements::<Node>()
                    .field(id_field().nullable(Nullable::Yes).description("Own id")),
            );
        let ctx = context(storage);
        let user = ctx.registry().compiled_object_for(EntityId::of::<User>()).unwrap();

        let fields = user.fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["id"].ty, TypeRef::named("ID"));
        assert_eq!(fields["id"].description.as_deref(), Some("Own id"));
    }

    #[tokio::test]
    async fn test_parent_fields_are_inherited() {
        let mut storage = MetadataStorage::new();
        storage
            .register_type(TypeMetadata::interface::<Node>("Node").field(id_field()))
            .register_type(
                TypeMetadata::object::<User>("User")
                    .implements::<Node>()
                    .field(PropertyMetadata::new("name", || Scalar::String.into()))
                    .field(PropertyMetadata::new("role", || Scalar::String.into())),
            )
            .register_type(
                TypeMetadata::object::<Admin>("Admin")
                    .extends::<User>()
                    .field(
                        PropertyMetadata::new("role", || Scalar::String.into())
                            .default_value(json!("admin")),
                    )
                    .field(PropertyMetadata::new("level", || Scalar::Int.into())),
            );
        let ctx = context(storage);
        let admin = ctx.registry().compiled_object_for(EntityId::of::<Admin>()).unwrap();

        let fields = admin.fields().unwrap();
        assert_eq!(field_names(fields), vec!["id", "name", "role", "level"]);
        assert_eq!(resolve(&fields["role"], json!({})).await, json!("admin"));

        let interfaces = admin.resolved_interfaces().unwrap();
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].name, "Node");
    }

    #[test]
    fn test_interface_list_is_deduplicated() {
        let mut storage = MetadataStorage::new();
        storage
            .register_type(TypeMetadata::interface::<Node>("Node").field(id_field()))
            .register_type(TypeMetadata::object::<User>("User").implements::<Node>())
            .register_type(
                TypeMetadata::object::<Admin>("Admin")
                    .implements::<Node>()
                    .implements::<Node>()
                    .extends::<User>(),
            );
        let ctx = context(storage);
        let metadata = ctx.storage().object_metadata_for(EntityId::of::<Admin>()).unwrap().clone();

        let first = ctx.compile(&metadata).unwrap();
        let second = ctx.compile(&metadata).unwrap();
        assert_eq!(second.interfaces, vec![EntityId::of::<Node>()]);
        assert_eq!(first.resolved_interfaces().unwrap().len(), 1);
        assert_eq!(second.resolved_interfaces().unwrap().len(), 1);
    }

    #[test]
    fn test_mutually_referencing_types() {
        let mut storage = MetadataStorage::new();
        storage
            .register_type(
                TypeMetadata::object::<Post>("Post")
                    .field(PropertyMetadata::new("author", TypeValue::entity::<Author>)),
            )
            .register_type(TypeMetadata::object::<Author>("Author").field(
                PropertyMetadata::new("posts", || TypeValue::list(TypeValue::entity::<Post>())),
            ));
        let ctx = context(storage);

        let post = ctx.registry().compiled_object_for(EntityId::of::<Post>()).unwrap();
        let author = ctx.registry().compiled_object_for(EntityId::of::<Author>()).unwrap();
        assert_eq!(post.fields().unwrap()["author"].ty.to_string(), "Author!");
        assert_eq!(author.fields().unwrap()["posts"].ty.to_string(), "[Post!]!");
        assert!(ctx.orphans().contains(EntityId::of::<Author>()));
        assert!(ctx.orphans().contains(EntityId::of::<Post>()));
    }

    #[test]
    fn test_self_reference() {
        let mut storage = MetadataStorage::new();
        storage.register_type(
            TypeMetadata::object::<User>("User").field(
                PropertyMetadata::new("friends", || TypeValue::list(TypeValue::entity::<User>()))
                    .nullable(Nullable::Items),
            ),
        );
        let ctx = context(storage);
        let user = ctx.registry().compiled_object_for(EntityId::of::<User>()).unwrap();
        assert_eq!(user.fields().unwrap()["friends"].ty.to_string(), "[User]!");
    }

    #[test]
    fn test_missing_interface_fails_fast() {
        let mut storage = MetadataStorage::new();
        storage.register_type(TypeMetadata::object::<User>("User").implements::<Node>());
        let ctx = context(storage);
        let user = ctx.registry().compiled_object_for(EntityId::of::<User>()).unwrap();

        let err = user.resolved_interfaces().unwrap_err();
        assert_eq!(
            err.to_string(),
            "type `User` references interface `Node` which was never compiled"
        );
        assert!(matches!(
            user.fields().unwrap_err(),
            BuildError::MissingTypeDefinition { kind: ReferenceKind::Interface, .. }
        ));
    }

    #[test]
    fn test_missing_parent_fails_fast() {
        let mut storage = MetadataStorage::new();
        storage.register_type(TypeMetadata::object::<Admin>("Admin").extends::<User>());
        let ctx = context(storage);
        let admin = ctx.registry().compiled_object_for(EntityId::of::<Admin>()).unwrap();

        assert!(matches!(
            admin.fields().unwrap_err(),
            BuildError::MissingTypeDefinition { kind: ReferenceKind::Parent, missing, .. }
                if missing == EntityId::of::<User>()
        ));
    }

    #[test]
    fn test_cyclic_interfaces_are_rejected() {
        let mut storage = MetadataStorage::new();
        storage
            .register_type(TypeMetadata::interface::<Node>("Node").implements::<Named>())
            .register_type(TypeMetadata::interface::<Named>("Named").implements::<Node>())
            .register_type(TypeMetadata::object::<User>("User").implements::<Named>());
        let ctx = context(storage);
        let user = ctx.registry().compiled_object_for(EntityId::of::<User>()).unwrap();

        let err = user.fields().unwrap_err();
        assert_eq!(
            err.to_string(),
            "circular inheritance detected for `User`: User -> Named -> Node -> Named"
        );
        assert!(matches!(
            user.resolved_interfaces().unwrap_err(),
            BuildError::CircularInheritance { .. }
        ));
    }

    #[test]
    fn test_cyclic_parents_are_rejected() {
        let mut storage = MetadataStorage::new();
        storage
            .register_type(TypeMetadata::object::<Admin>("Admin").extends::<User>().field(id_field()))
            .register_type(TypeMetadata::object::<User>("User").extends::<Admin>());
        let ctx = context(storage);
        let admin = ctx.registry().compiled_object_for(EntityId::of::<Admin>()).unwrap();
        let user = ctx.registry().compiled_object_for(EntityId::of::<User>()).unwrap();

        assert_eq!(
            admin.fields().unwrap_err().to_string(),
            "circular inheritance detected for `Admin`: Admin -> User -> Admin"
        );
        assert!(matches!(
            admin.resolved_interfaces().unwrap_err(),
            BuildError::CircularInheritance { ref type_name, .. } if type_name == "Admin"
        ));
        assert!(matches!(
            user.fields().unwrap_err(),
            BuildError::CircularInheritance { ref type_name, .. } if type_name == "User"
        ));
    }

    #[test]
    fn test_inheritance_depth_is_bounded() {
        let options =
            BuildOptions::new().with_settings(BuildSettings::default().max_inheritance_depth(1));
        let ctx = context_with(interface_chain(), options);
        let user = ctx.registry().compiled_object_for(EntityId::of::<User>()).unwrap();

        assert!(matches!(
            user.fields().unwrap_err(),
            BuildError::InheritanceTooDeep { max_depth: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_field_details_and_directives() {
        let mut storage = MetadataStorage::new();
        storage.register_type(
            TypeMetadata::object::<User>("User")
                .description("A registered user")
                .directive(DirectiveAnnotation::sdl(r#"@key(fields: "id")"#))
                .field(
                    PropertyMetadata::new("display_name", || Scalar::String.into())
                        .schema_name("displayName")
                        .deprecated("Use name")
                        .complexity(3)
                        .extension("owner", json!("accounts"))
                        .directive(DirectiveAnnotation::named("lowercase"))
                        .arg(ArgMetadata::new("locale", || Scalar::String.into()).nullable(Nullable::Yes)),
                ),
        );
        let ctx = context(storage);
        let user = ctx.registry().compiled_object_for(EntityId::of::<User>()).unwrap();
        let object = user.as_object().unwrap();
        assert_eq!(object.description.as_deref(), Some("A registered user"));
        assert!(object.ast_node.as_ref().unwrap().has_directive("key"));

        let field = &user.fields().unwrap()["displayName"];
        assert_eq!(field.deprecation_reason.as_deref(), Some("Use name"));
        assert_eq!(field.complexity, Some(3));
        assert_eq!(field.extensions["owner"], json!("accounts"));
        assert!(field.ast_node.as_ref().unwrap().has_directive("lowercase"));
        assert_eq!(field.args["locale"].ty.to_string(), "String");
        assert_eq!(resolve(field, json!({"display_name": "Ada"})).await, json!("Ada"));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let ctx = context(MetadataStorage::new());
        let err = ctx.compile(&TypeMetadata::input::<User>("UserInput")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`UserInput` is declared as input metadata, expected object or interface"
        );
    }

    #[test]
    fn test_released_context() {
        let mut storage = MetadataStorage::new();
        storage.register_type(TypeMetadata::object::<User>("User").field(id_field()));
        let ctx = context(storage);
        let user = ctx.registry().compiled_object_for(EntityId::of::<User>()).unwrap();
        drop(ctx);

        assert!(matches!(
            user.fields().unwrap_err(),
            BuildError::ContextReleased { what: "fields", .. }
        ));
    }
}
