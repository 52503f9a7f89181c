//! Type Definition Registry.
//!
//! Maps each declaring entity to its compiled node. Skeletons are inserted
//! while a build compiles its metadata; afterwards the registry is only read,
//! mostly by deferred field maps and interface lists looking up the types they
//! reference.

use crate::input::CompiledInputNode;
use crate::object::CompiledTypeNode;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use typegraph_core::{BuildError, BuildResult, EntityId};
use typegraph_metadata::TypeMetadata;
use typegraph_runtime::{EnumType, NamedType, UnionType};

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

#[derive(Default)]
struct Definitions {
    objects: FxIndexMap<EntityId, CompiledTypeNode>,
    interfaces: FxIndexMap<EntityId, CompiledTypeNode>,
    inputs: FxIndexMap<EntityId, CompiledInputNode>,
    enums: FxIndexMap<EntityId, Arc<EnumType>>,
    unions: FxIndexMap<EntityId, Arc<UnionType>>,
    names: FxIndexMap<String, EntityId>,
}

/// Compiled nodes of one build, keyed by declaring entity.
#[derive(Default)]
pub struct TypeDefinitionRegistry {
    definitions: RwLock<Definitions>,
}

impl TypeDefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Definitions> {
        self.definitions
            .read()
            .expect("type registry RwLock poisoned while acquiring read lock")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Definitions> {
        self.definitions
            .write()
            .expect("type registry RwLock poisoned while acquiring write lock")
    }

    /// Reserves `name` for `entity`.
    ///
    /// The same entity may claim its name again when recompiled.
    pub fn claim_name(&self, name: &str, entity: EntityId) -> BuildResult<()> {
        let mut definitions = self.write();
        match definitions.names.get(name) {
            Some(&first) if first != entity => Err(BuildError::DuplicateTypeName {
                name: name.to_string(),
                first,
                second: entity,
            }),
            Some(_) => Ok(()),
            None => {
                definitions.names.insert(name.to_string(), entity);
                Ok(())
            }
        }
    }

    pub(crate) fn insert_object(&self, node: CompiledTypeNode) {
        self.write().objects.insert(node.target, node);
    }

    pub(crate) fn insert_interface(&self, node: CompiledTypeNode) {
        self.write().interfaces.insert(node.target, node);
    }

    pub(crate) fn insert_input(&self, node: CompiledInputNode) {
        self.write().inputs.insert(node.target, node);
    }

    pub(crate) fn insert_enum(&self, target: EntityId, ty: Arc<EnumType>) {
        self.write().enums.insert(target, ty);
    }

    pub(crate) fn insert_union(&self, target: EntityId, ty: Arc<UnionType>) {
        self.write().unions.insert(target, ty);
    }

    pub fn compiled_object_for(&self, target: EntityId) -> Option<CompiledTypeNode> {
        self.read().objects.get(&target).cloned()
    }

    pub fn compiled_interface_for(&self, target: EntityId) -> Option<CompiledTypeNode> {
        self.read().interfaces.get(&target).cloned()
    }

    pub fn compiled_input_for(&self, target: EntityId) -> Option<CompiledInputNode> {
        self.read().inputs.get(&target).cloned()
    }

    pub fn compiled_enum_for(&self, target: EntityId) -> Option<Arc<EnumType>> {
        self.read().enums.get(&target).cloned()
    }

    pub fn compiled_union_for(&self, target: EntityId) -> Option<Arc<UnionType>> {
        self.read().unions.get(&target).cloned()
    }

    /// Returns the metadata behind a compiled object, interface or input.
    pub fn type_metadata_for(&self, target: EntityId) -> Option<Arc<TypeMetadata>> {
        let definitions = self.read();
        definitions
            .objects
            .get(&target)
            .or_else(|| definitions.interfaces.get(&target))
            .map(|node| Arc::clone(&node.metadata))
            .or_else(|| {
                definitions
                    .inputs
                    .get(&target)
                    .map(|node| Arc::clone(&node.metadata))
            })
    }

    /// Returns the entity that claimed `name`.
    pub fn entity_named(&self, name: &str) -> Option<EntityId> {
        self.read().names.get(name).copied()
    }

    /// Returns true if `target` was compiled as an abstract object or interface.
    pub fn is_abstract(&self, target: EntityId) -> bool {
        let definitions = self.read();
        definitions
            .objects
            .get(&target)
            .or_else(|| definitions.interfaces.get(&target))
            .is_some_and(|node| node.is_abstract)
    }

    /// Returns the schema type compiled for `target`, whatever its kind.
    pub fn named_type_for(&self, target: EntityId) -> Option<NamedType> {
        let definitions = self.read();
        if let Some(node) = definitions.objects.get(&target) {
            return Some(node.to_named_type());
        }
        if let Some(node) = definitions.interfaces.get(&target) {
            return Some(node.to_named_type());
        }
        if let Some(node) = definitions.inputs.get(&target) {
            return Some(NamedType::InputObject(Arc::clone(&node.ty)));
        }
        if let Some(ty) = definitions.enums.get(&target) {
            return Some(NamedType::Enum(Arc::clone(ty)));
        }
        definitions
            .unions
            .get(&target)
            .map(|ty| NamedType::Union(Arc::clone(ty)))
    }

    /// Returns the name of the output type compiled for `target`.
    ///
    /// Objects, interfaces, enums and unions are output types.
    pub fn output_type_name(&self, target: EntityId) -> Option<String> {
        let definitions = self.read();
        definitions
            .objects
            .get(&target)
            .or_else(|| definitions.interfaces.get(&target))
            .map(|node| node.name().to_string())
            .or_else(|| definitions.enums.get(&target).map(|ty| ty.name.clone()))
            .or_else(|| definitions.unions.get(&target).map(|ty| ty.name.clone()))
    }

    /// Returns the name of the input type compiled for `target`.
    ///
    /// Input objects and enums are input types.
    pub fn input_type_name(&self, target: EntityId) -> Option<String> {
        let definitions = self.read();
        definitions
            .inputs
            .get(&target)
            .map(|node| node.ty.name.clone())
            .or_else(|| definitions.enums.get(&target).map(|ty| ty.name.clone()))
    }

    /// Returns every compiled object, in compilation order.
    pub fn objects(&self) -> Vec<CompiledTypeNode> {
        self.read().objects.values().cloned().collect()
    }

    /// Returns the number of compiled named types.
    pub fn len(&self) -> usize {
        let definitions = self.read();
        definitions.objects.len()
            + definitions.interfaces.len()
            + definitions.inputs.len()
            + definitions.enums.len()
            + definitions.unions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
