//! Orphaned Reference Registry.
//!
//! Field types are only known once a field map is forced, so every type a
//! field, argument or input field refers to is recorded here. Schema assembly
//! drains the registry until no new types appear.

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use typegraph_core::EntityId;
use typegraph_metadata::{Scalar, TypeValue};

#[derive(Default)]
struct Pending {
    entities: IndexSet<EntityId, FxBuildHasher>,
    scalars: IndexSet<String, FxBuildHasher>,
}

/// Types referenced by compiled fields and not yet taken into a schema.
#[derive(Default)]
pub struct OrphanedReferenceRegistry {
    pending: Mutex<Pending>,
}

impl OrphanedReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending
            .lock()
            .expect("orphan registry Mutex poisoned")
    }

    /// Records the type behind a declared type value.
    ///
    /// Built-in scalars need no record.
    pub fn register(&self, ty: &TypeValue) {
        match ty.innermost() {
            TypeValue::Entity(id) => {
                if self.lock().entities.insert(*id) {
                    debug!(entity = %id, "registered referenced type");
                }
            }
            TypeValue::Scalar(Scalar::Custom(name)) => {
                if self.lock().scalars.insert(name.clone()) {
                    debug!(scalar = %name, "registered custom scalar");
                }
            }
            TypeValue::Scalar(_) | TypeValue::List(_) => {}
        }
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.lock().entities.contains(&entity)
    }

    pub fn contains_scalar(&self, name: &str) -> bool {
        self.lock().scalars.contains(name)
    }

    /// Takes every recorded entity, in registration order.
    pub fn drain(&self) -> Vec<EntityId> {
        self.lock().entities.drain(..).collect()
    }

    /// Takes every recorded custom scalar name, in registration order.
    pub fn drain_scalars(&self) -> Vec<String> {
        self.lock().scalars.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        let pending = self.lock();
        pending.entities.is_empty() && pending.scalars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Post;
    struct User;

    #[test]
    fn test_register_looks_through_lists() {
        let orphans = OrphanedReferenceRegistry::new();
        orphans.register(&TypeValue::list(TypeValue::entity::<Post>()));
        orphans.register(&TypeValue::entity::<User>());
        orphans.register(&TypeValue::entity::<Post>());
        orphans.register(&Scalar::Int.into());

        assert!(orphans.contains(EntityId::of::<Post>()));
        assert_eq!(
            orphans.drain(),
            vec![EntityId::of::<Post>(), EntityId::of::<User>()]
        );
        assert!(orphans.is_empty());
    }

    #[test]
    fn test_custom_scalars_are_recorded_by_name() {
        let orphans = OrphanedReferenceRegistry::new();
        orphans.register(&Scalar::Custom("DateTime".into()).into());

        assert!(orphans.contains_scalar("DateTime"));
        assert_eq!(orphans.drain_scalars(), vec!["DateTime".to_string()]);
    }
}
