//! Build configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use typegraph_core::EntityId;
use typegraph_runtime::{Container, FieldMiddleware};

/// Serializable build settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildSettings {
    /// Nullability used when a field or argument does not declare one.
    pub nullable_by_default: bool,
    /// Skip middleware for every field.
    pub simple_resolvers: bool,
    /// Include abstract object and interface types in the schema.
    pub include_abstract_types: bool,
    /// Maximum length of an interface or parent chain.
    pub max_inheritance_depth: usize,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            nullable_by_default: false,
            simple_resolvers: false,
            include_abstract_types: false,
            max_inheritance_depth: 32,
        }
    }
}

impl BuildSettings {
    /// Parses settings from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets the default nullability.
    #[must_use]
    pub fn nullable_by_default(mut self, nullable: bool) -> Self {
        self.nullable_by_default = nullable;
        self
    }

    /// Skips middleware for every field.
    #[must_use]
    pub fn simple_resolvers(mut self, simple: bool) -> Self {
        self.simple_resolvers = simple;
        self
    }

    /// Includes abstract types in the schema.
    #[must_use]
    pub fn include_abstract_types(mut self, include: bool) -> Self {
        self.include_abstract_types = include;
        self
    }

    /// Sets the maximum inheritance depth.
    #[must_use]
    pub fn max_inheritance_depth(mut self, depth: usize) -> Self {
        self.max_inheritance_depth = depth;
        self
    }
}

/// Everything a build needs besides the metadata.
#[derive(Clone, Default)]
pub struct BuildOptions {
    pub settings: BuildSettings,
    /// Build-wide field middleware, run outside field-level middleware.
    pub field_middleware: Vec<Arc<dyn FieldMiddleware>>,
    /// Container providing field resolver handlers.
    pub container: Option<Arc<dyn Container>>,
    /// Types included even when nothing references them.
    pub orphaned_types: Vec<EntityId>,
    /// Descriptions of custom scalars, by scalar name.
    pub scalar_descriptions: IndexMap<String, String>,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(mut self, settings: BuildSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Appends a build-wide middleware. Earlier middleware runs outer.
    #[must_use]
    pub fn add_field_middleware(mut self, middleware: Arc<dyn FieldMiddleware>) -> Self {
        self.field_middleware.push(middleware);
        self
    }

    #[must_use]
    pub fn with_container(mut self, container: Arc<dyn Container>) -> Self {
        self.container = Some(container);
        self
    }

    /// Includes `T` in the schema whether or not it is referenced.
    #[must_use]
    pub fn add_orphaned_type<T: 'static>(mut self) -> Self {
        self.orphaned_types.push(EntityId::of::<T>());
        self
    }

    #[must_use]
    pub fn with_scalar_description(
        mut self,
        scalar: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.scalar_descriptions
            .insert(scalar.into(), description.into());
        self
    }
}

impl fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOptions")
            .field("settings", &self.settings)
            .field("field_middleware", &self.field_middleware.len())
            .field("container", &self.container.is_some())
            .field("orphaned_types", &self.orphaned_types)
            .field("scalar_descriptions", &self.scalar_descriptions)
            .finish()
    }
}
