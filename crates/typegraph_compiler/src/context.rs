//! Shared state of one schema build.

use crate::options::BuildOptions;
use crate::orphans::OrphanedReferenceRegistry;
use crate::registry::TypeDefinitionRegistry;
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::{Arc, Weak};
use typegraph_core::{BuildError, BuildResult, EntityId};
use typegraph_metadata::{MetadataStorage, TypeMetadata};
use typegraph_runtime::FieldResolverCompositor;

/// Collaborators shared by every compiled type of one build.
///
/// The context is always held in an [`Arc`]. Deferred field maps, interface
/// lists and union members keep a [`Weak`] handle to it, so they can be
/// evaluated while the build is alive without keeping it alive themselves.
pub struct BuildContext {
    storage: Arc<MetadataStorage>,
    options: BuildOptions,
    compositor: FieldResolverCompositor,
    registry: TypeDefinitionRegistry,
    orphans: OrphanedReferenceRegistry,
    this: Weak<BuildContext>,
}

impl BuildContext {
    /// Creates a context compiling against a metadata snapshot.
    pub fn new(storage: Arc<MetadataStorage>, options: BuildOptions) -> Arc<Self> {
        let compositor = FieldResolverCompositor::new(options.field_middleware.clone())
            .with_container(options.container.clone())
            .with_simple_resolvers(options.settings.simple_resolvers);
        Arc::new_cyclic(|this| Self {
            storage,
            options,
            compositor,
            registry: TypeDefinitionRegistry::new(),
            orphans: OrphanedReferenceRegistry::new(),
            this: this.clone(),
        })
    }

    pub fn storage(&self) -> &MetadataStorage {
        &self.storage
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn registry(&self) -> &TypeDefinitionRegistry {
        &self.registry
    }

    pub fn orphans(&self) -> &OrphanedReferenceRegistry {
        &self.orphans
    }

    pub(crate) fn compositor(&self) -> &FieldResolverCompositor {
        &self.compositor
    }

    /// Returns the handle given to deferred sources.
    pub(crate) fn handle(&self) -> Weak<BuildContext> {
        self.this.clone()
    }

    /// Walks the interface and parent chain of `metadata` through compiled
    /// types, rejecting cycles and chains longer than the configured depth.
    ///
    /// Must succeed before any deferred part of the chain is forced.
    pub(crate) fn check_chain(&self, metadata: &TypeMetadata) -> BuildResult<()> {
        let mut walk = ChainWalk {
            registry: &self.registry,
            type_name: &metadata.name,
            max_depth: self.options.settings.max_inheritance_depth,
            path: vec![metadata.target],
            finished: FxHashSet::default(),
        };
        walk.visit(metadata)
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("options", &self.options)
            .field("metadata", &self.storage.len())
            .field("compiled", &self.registry.len())
            .finish_non_exhaustive()
    }
}

/// Upgrades a deferred source's handle to the build context.
pub(crate) fn upgrade(
    handle: &Weak<BuildContext>,
    type_name: &str,
    what: &'static str,
) -> BuildResult<Arc<BuildContext>> {
    handle.upgrade().ok_or_else(|| BuildError::ContextReleased {
        type_name: type_name.to_string(),
        what,
    })
}

struct ChainWalk<'a> {
    registry: &'a TypeDefinitionRegistry,
    type_name: &'a str,
    max_depth: usize,
    path: Vec<EntityId>,
    finished: FxHashSet<EntityId>,
}

impl ChainWalk<'_> {
    fn visit(&mut self, metadata: &TypeMetadata) -> BuildResult<()> {
        for supertype in metadata.supertypes() {
            if self.path.contains(&supertype) {
                self.path.push(supertype);
                return Err(BuildError::CircularInheritance {
                    type_name: self.type_name.to_string(),
                    path: std::mem::take(&mut self.path),
                });
            }
            if self.finished.contains(&supertype) {
                continue;
            }
            // Missing supertypes are reported by the lookup that needs them.
            let Some(next) = self.registry.type_metadata_for(supertype) else {
                continue;
            };
            if self.path.len() > self.max_depth {
                return Err(BuildError::InheritanceTooDeep {
                    type_name: self.type_name.to_string(),
                    max_depth: self.max_depth,
                });
            }
            self.path.push(supertype);
            self.visit(&next)?;
            self.path.pop();
            self.finished.insert(supertype);
        }
        Ok(())
    }
}
