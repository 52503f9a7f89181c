//! Identities of declaring entities.
//!
//! Metadata is always keyed by the Rust type it was collected from. An
//! [`EntityId`] is a cheap, copyable handle to that type: equality and hashing
//! use the [`TypeId`], while the type path is kept around for error messages.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a declaring entity.
#[derive(Clone, Copy)]
pub struct EntityId {
    type_id: TypeId,
    path: &'static str,
}

impl EntityId {
    /// Returns the identity of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            path: type_name::<T>(),
        }
    }

    /// Returns the full type path (e.g. `my_app::model::User`).
    #[must_use]
    pub const fn path(&self) -> &'static str {
        self.path
    }

    /// Returns the short type name without module path or generics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        let base = self.path.split('<').next().unwrap_or(self.path);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.name())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
