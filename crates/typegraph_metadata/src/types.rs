//! Type identities and nullability options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use typegraph_core::EntityId;

/// A scalar type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    Int,
    Float,
    String,
    Boolean,
    Id,
    /// A custom scalar registered by name.
    Custom(String),
}

impl Scalar {
    /// Returns the schema name of the scalar.
    pub fn name(&self) -> &str {
        match self {
            Self::Int => "Int",
            Self::Float => "Float",
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Id => "ID",
            Self::Custom(name) => name,
        }
    }

    /// Returns true for the five built-in scalars.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

/// The declared type of a field or argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeValue {
    Scalar(Scalar),
    /// A type declared by an entity (object, interface, input, enum or union).
    Entity(EntityId),
    List(Box<TypeValue>),
}

impl TypeValue {
    /// Refers to the type declared by `T`.
    pub fn entity<T: 'static>() -> Self {
        Self::Entity(EntityId::of::<T>())
    }

    /// Wraps a type in a list.
    #[must_use]
    pub fn list(inner: TypeValue) -> Self {
        Self::List(Box::new(inner))
    }

    /// Returns the number of list wrappers.
    pub fn list_depth(&self) -> usize {
        match self {
            Self::List(inner) => 1 + inner.list_depth(),
            _ => 0,
        }
    }

    /// Returns the type inside every list wrapper.
    pub fn innermost(&self) -> &TypeValue {
        match self {
            Self::List(inner) => inner.innermost(),
            other => other,
        }
    }

    /// Returns the referenced entity, looking through lists.
    pub fn entity_id(&self) -> Option<EntityId> {
        match self.innermost() {
            Self::Entity(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<Scalar> for TypeValue {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl fmt::Display for TypeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => f.write_str(scalar.name()),
            Self::Entity(id) => write!(f, "{id}"),
            Self::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

/// A zero-argument function producing a declared type.
///
/// Must be idempotent and free of side effects; it may be called many times.
pub type TypeFn = Arc<dyn Fn() -> TypeValue + Send + Sync>;

/// Nullability of a field or argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Nullable {
    /// The value may be null.
    Yes,
    /// The value is never null.
    No,
    /// List items may be null, the list itself may not.
    Items,
    /// Both list items and the list may be null.
    ItemsAndList,
}

impl Nullable {
    /// Returns true if the option only makes sense on lists.
    pub fn requires_list(self) -> bool {
        matches!(self, Self::Items | Self::ItemsAndList)
    }
}

/// Options shaping the wrapped type of a field or argument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeOptions {
    /// Nullability, or `None` to use the build-wide default.
    pub nullable: Option<Nullable>,
    /// Default value, used when the root value lacks the property.
    pub default_value: Option<serde_json::Value>,
}
