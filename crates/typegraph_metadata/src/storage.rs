//! The metadata store.
//!
//! [`MetadataStorage`] is a plain value, so tests and embedders can build
//! isolated stores. The process-wide instance follows a collect, freeze,
//! reset lifecycle: declarations are registered through [`metadata_write`],
//! a build compiles a [`freeze`] snapshot, and [`reset`] clears the store
//! between independent builds.

use crate::definitions::{EnumMetadata, TypeKind, TypeMetadata, UnionMetadata};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::sync::{Arc, LazyLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};
use typegraph_core::EntityId;
use typegraph_runtime::HandlerBinding;

/// Registry of collected type descriptions, keyed by declaring entity.
#[derive(Debug, Clone, Default)]
pub struct MetadataStorage {
    types: IndexMap<EntityId, TypeMetadata>,
    enums: IndexMap<EntityId, EnumMetadata>,
    unions: IndexMap<EntityId, UnionMetadata>,
    field_resolvers: FxHashMap<(EntityId, String), HandlerBinding>,
}

impl MetadataStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an object, interface, input or args type.
    ///
    /// Registering the same entity again replaces the earlier metadata.
    pub fn register_type(&mut self, metadata: TypeMetadata) -> &mut Self {
        debug!(entity = %metadata.target, kind = %metadata.kind, name = %metadata.name, "registered type metadata");
        if let Some(previous) = self.types.insert(metadata.target, metadata) {
            warn!(entity = %previous.target, "type metadata registered twice, keeping the latest");
        }
        self
    }

    /// Registers an enum type.
    pub fn register_enum(&mut self, metadata: EnumMetadata) -> &mut Self {
        debug!(entity = %metadata.target, name = %metadata.name, "registered enum metadata");
        self.enums.insert(metadata.target, metadata);
        self
    }

    /// Registers a union type.
    pub fn register_union(&mut self, metadata: UnionMetadata) -> &mut Self {
        debug!(entity = %metadata.target, name = %metadata.name, "registered union metadata");
        self.unions.insert(metadata.target, metadata);
        self
    }

    /// Records that `field` of `target` is computed by a handler method.
    ///
    /// `field` is the declaration name of the property.
    pub fn register_field_resolver(
        &mut self,
        target: EntityId,
        field: impl Into<String>,
        binding: HandlerBinding,
    ) -> &mut Self {
        let field = field.into();
        debug!(%target, field = %field, handler = %binding.handler, method = %binding.method, "registered field resolver");
        self.field_resolvers.insert((target, field), binding);
        self
    }

    /// Returns the metadata of `target` regardless of its kind.
    pub fn type_metadata_for(&self, target: EntityId) -> Option<&TypeMetadata> {
        self.types.get(&target)
    }

    fn of_kind(&self, target: EntityId, kind: TypeKind) -> Option<&TypeMetadata> {
        self.types.get(&target).filter(|m| m.kind == kind)
    }

    pub fn object_metadata_for(&self, target: EntityId) -> Option<&TypeMetadata> {
        self.of_kind(target, TypeKind::Object)
    }

    pub fn interface_metadata_for(&self, target: EntityId) -> Option<&TypeMetadata> {
        self.of_kind(target, TypeKind::Interface)
    }

    pub fn input_metadata_for(&self, target: EntityId) -> Option<&TypeMetadata> {
        self.of_kind(target, TypeKind::InputObject)
    }

    pub fn args_metadata_for(&self, target: EntityId) -> Option<&TypeMetadata> {
        self.of_kind(target, TypeKind::Args)
    }

    pub fn enum_metadata_for(&self, target: EntityId) -> Option<&EnumMetadata> {
        self.enums.get(&target)
    }

    pub fn union_metadata_for(&self, target: EntityId) -> Option<&UnionMetadata> {
        self.unions.get(&target)
    }

    /// Returns the handler method recorded for `field` of `target`.
    pub fn field_resolver_handler_for(&self, target: EntityId, field: &str) -> Option<&HandlerBinding> {
        self.field_resolvers.get(&(target, field.to_string()))
    }

    /// Iterates over types of `kind` in registration order.
    pub fn types_of_kind(&self, kind: TypeKind) -> impl Iterator<Item = &TypeMetadata> {
        self.types.values().filter(move |m| m.kind == kind)
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumMetadata> {
        self.enums.values()
    }

    pub fn unions(&self) -> impl Iterator<Item = &UnionMetadata> {
        self.unions.values()
    }

    /// Returns the schema name declared for `target`, whatever its kind.
    pub fn name_of(&self, target: EntityId) -> Option<&str> {
        self.types
            .get(&target)
            .map(|m| m.name.as_str())
            .or_else(|| self.enums.get(&target).map(|m| m.name.as_str()))
            .or_else(|| self.unions.get(&target).map(|m| m.name.as_str()))
    }

    /// Returns the number of registered named types.
    pub fn len(&self) -> usize {
        self.types.len() + self.enums.len() + self.unions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

///
/// METADATA
/// the process-wide store
///

static METADATA: LazyLock<RwLock<MetadataStorage>> =
    LazyLock::new(|| RwLock::new(MetadataStorage::new()));

/// Acquire a write guard to the process-wide store while collecting metadata.
pub fn metadata_write() -> RwLockWriteGuard<'static, MetadataStorage> {
    METADATA
        .write()
        .expect("metadata RwLock poisoned while acquiring write lock")
}

/// Acquire a read guard to the process-wide store.
pub fn metadata_read() -> RwLockReadGuard<'static, MetadataStorage> {
    METADATA
        .read()
        .expect("metadata RwLock poisoned while acquiring read lock")
}

/// Snapshot the process-wide store for compilation.
///
/// Later registrations do not affect the snapshot.
pub fn freeze() -> Arc<MetadataStorage> {
    Arc::new(metadata_read().clone())
}

/// Clear the process-wide store.
pub fn reset() {
    *metadata_write() = MetadataStorage::new();
}
