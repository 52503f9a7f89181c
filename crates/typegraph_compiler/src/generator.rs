//! Schema assembly.
//!
//! A build runs in two phases. Phase 1 compiles a skeleton for every
//! registered interface, object, input, enum and union. Phase 2 starts at the
//! operation roots and the explicitly orphaned types, forces the deferred
//! parts of every included type and keeps draining the Orphaned Reference
//! Registry until no new type shows up. Implementations of included
//! interfaces and members of included unions are included as well.
//!
//! Abstract types only enter the schema when an included type names them.
//! Explicit orphans and implementations that are abstract are left out
//! unless `include_abstract_types` is set.

use crate::context::BuildContext;
use crate::options::BuildOptions;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};
use typegraph_core::{BuildError, BuildResult, EntityId};
use typegraph_metadata::{MetadataStorage, TypeKind};
use typegraph_runtime::{NamedType, ScalarType, Schema, SchemaBuilder};

/// Operation root types of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaRoots {
    pub query: EntityId,
    pub mutation: Option<EntityId>,
    pub subscription: Option<EntityId>,
}

impl SchemaRoots {
    /// Uses `Q` as the query root.
    pub fn query<Q: 'static>() -> Self {
        Self {
            query: EntityId::of::<Q>(),
            mutation: None,
            subscription: None,
        }
    }

    #[must_use]
    pub fn mutation<M: 'static>(mut self) -> Self {
        self.mutation = Some(EntityId::of::<M>());
        self
    }

    #[must_use]
    pub fn subscription<S: 'static>(mut self) -> Self {
        self.subscription = Some(EntityId::of::<S>());
        self
    }

    fn iter(&self) -> impl Iterator<Item = EntityId> {
        std::iter::once(self.query)
            .chain(self.mutation)
            .chain(self.subscription)
    }
}

/// How a queued type was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    /// A root, or named by a field, argument, interface list or union.
    Named,
    /// An explicit orphan or an implementation of an included interface.
    Unreferenced,
}

/// Builds a [`Schema`] from a metadata snapshot.
#[derive(Debug)]
pub struct SchemaGenerator {
    ctx: Arc<BuildContext>,
}

impl SchemaGenerator {
    pub fn new(storage: Arc<MetadataStorage>, options: BuildOptions) -> Self {
        Self {
            ctx: BuildContext::new(storage, options),
        }
    }

    /// Compiles `storage` into a schema rooted at `roots`.
    pub fn build(
        storage: Arc<MetadataStorage>,
        options: BuildOptions,
        roots: &SchemaRoots,
    ) -> BuildResult<Schema> {
        Self::new(storage, options).generate(roots)
    }

    pub fn context(&self) -> &Arc<BuildContext> {
        &self.ctx
    }

    /// Runs both build phases.
    pub fn generate(&self, roots: &SchemaRoots) -> BuildResult<Schema> {
        self.compile_skeletons()?;

        let root_name = |id: EntityId| {
            self.ctx
                .registry()
                .compiled_object_for(id)
                .map(|node| node.name().to_string())
                .ok_or(BuildError::MissingMetadata { entity: id })
        };
        let mut builder = SchemaBuilder::new(root_name(roots.query)?);
        if let Some(mutation) = roots.mutation {
            builder = builder.mutation_type(root_name(mutation)?);
        }
        if let Some(subscription) = roots.subscription {
            builder = builder.subscription_type(root_name(subscription)?);
        }

        let included = self.collect_types(roots)?;

        let (mut objects, mut interfaces, mut others) = (0usize, 0usize, 0usize);
        for ty in &included {
            match ty {
                NamedType::Object(_) => objects += 1,
                NamedType::Interface(_) => interfaces += 1,
                _ => others += 1,
            }
            builder.add_type(ty.clone());
        }

        let descriptions = &self.ctx.options().scalar_descriptions;
        let mut scalars = 0usize;
        for name in self.ctx.orphans().drain_scalars() {
            scalars += 1;
            builder.add_type(NamedType::Scalar(Arc::new(ScalarType {
                description: descriptions.get(&name).cloned(),
                name,
            })));
        }

        let schema = builder.build();
        info!(
            types = schema.types.len(),
            objects,
            interfaces,
            other = others,
            custom_scalars = scalars,
            "schema built"
        );
        Ok(schema)
    }

    fn compile_skeletons(&self) -> BuildResult<()> {
        let storage = self.ctx.storage();
        for kind in [TypeKind::Interface, TypeKind::Object] {
            for metadata in storage.types_of_kind(kind) {
                self.ctx.compile(metadata)?;
            }
        }
        for metadata in storage.types_of_kind(TypeKind::InputObject) {
            self.ctx.compile_input(metadata)?;
        }
        for metadata in storage.enums() {
            self.ctx.compile_enum(metadata)?;
        }
        for metadata in storage.unions() {
            self.ctx.compile_union(metadata)?;
        }
        debug!(count = self.ctx.registry().len(), "compiled type skeletons");
        Ok(())
    }

    /// Returns every type reachable from the roots, in inclusion order.
    fn collect_types(&self, roots: &SchemaRoots) -> BuildResult<Vec<NamedType>> {
        let registry = self.ctx.registry();
        let include_abstract = self.ctx.options().settings.include_abstract_types;

        let mut queue: VecDeque<(EntityId, Reach)> =
            roots.iter().map(|id| (id, Reach::Named)).collect();
        queue.extend(
            self.ctx
                .options()
                .orphaned_types
                .iter()
                .map(|&id| (id, Reach::Unreferenced)),
        );

        let mut included: FxHashSet<EntityId> = FxHashSet::default();
        let mut skipped: FxHashSet<EntityId> = FxHashSet::default();
        let mut types = Vec::new();
        let mut interface_names: FxHashSet<String> = FxHashSet::default();

        loop {
            while let Some((id, reach)) = queue.pop_front() {
                if included.contains(&id) {
                    continue;
                }
                if reach == Reach::Unreferenced && !include_abstract && registry.is_abstract(id)
                {
                    if skipped.insert(id) {
                        debug!(entity = %id, "skipped abstract type");
                    }
                    continue;
                }
                let ty = registry
                    .named_type_for(id)
                    .ok_or(BuildError::MissingMetadata { entity: id })?;
                self.expand(&ty, &mut queue)?;
                if let NamedType::Interface(interface) = &ty {
                    interface_names.insert(interface.name.clone());
                }
                included.insert(id);
                types.push(ty);
                let referenced = self.ctx.orphans().drain();
                queue.extend(referenced.into_iter().map(|id| (id, Reach::Named)));
            }

            for node in registry.objects() {
                if included.contains(&node.target) || skipped.contains(&node.target) {
                    continue;
                }
                if node
                    .resolved_interfaces()?
                    .iter()
                    .any(|interface| interface_names.contains(&interface.name))
                {
                    queue.push_back((node.target, Reach::Unreferenced));
                }
            }
            if queue.is_empty() {
                break;
            }
        }
        Ok(types)
    }

    /// Forces the deferred parts of `ty` and queues the types they name.
    fn expand(&self, ty: &NamedType, queue: &mut VecDeque<(EntityId, Reach)>) -> BuildResult<()> {
        let registry = self.ctx.registry();
        let mut push_named = |name: &str| {
            if let Some(id) = registry.entity_named(name) {
                queue.push_back((id, Reach::Named));
            }
        };
        match ty {
            NamedType::Object(object) => {
                object.fields()?;
                for interface in object.interfaces()? {
                    push_named(&interface.name);
                }
            }
            NamedType::Interface(interface) => {
                interface.fields()?;
                for parent in interface.interfaces()? {
                    push_named(&parent.name);
                }
            }
            NamedType::Union(union) => {
                for member in union.members()? {
                    push_named(&member.name);
                }
            }
            NamedType::InputObject(input) => {
                input.fields()?;
            }
            NamedType::Enum(_) | NamedType::Scalar(_) => {}
        }
        Ok(())
    }
}
