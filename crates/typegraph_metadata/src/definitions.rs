//! Metadata definitions and their registration builders.
//!
//! Metadata is created once, while declarations are registered, and is
//! read-only afterwards. Builders take ownership and return `Self` so a whole
//! type can be declared in one expression:
//!
//! ```
//! use typegraph_metadata::{PropertyMetadata, Scalar, TypeMetadata, TypeValue};
//!
//! struct Node;
//! struct User;
//!
//! let user = TypeMetadata::object::<User>("User")
//!     .implements::<Node>()
//!     .field(PropertyMetadata::new("id", || TypeValue::Scalar(Scalar::Id)))
//!     .field(PropertyMetadata::new("name", || Scalar::String.into()));
//! assert_eq!(user.fields.len(), 2);
//! ```

use crate::types::{Nullable, TypeFn, TypeOptions, TypeValue};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use typegraph_core::EntityId;
use typegraph_runtime::{FieldMiddleware, IsTypeOfFn, ResolveTypeFn};
use typegraph_syntax::DirectiveAnnotation;

/// The kind of a type described by [`TypeMetadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Object,
    Interface,
    InputObject,
    /// A group of arguments flattened into the field that uses it.
    Args,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Object => "object",
            Self::Interface => "interface",
            Self::InputObject => "input",
            Self::Args => "args",
        })
    }
}

/// Metadata of an object, interface, input or args type.
#[derive(Clone)]
pub struct TypeMetadata {
    pub target: EntityId,
    pub kind: TypeKind,
    pub name: String,
    pub description: Option<String>,
    pub is_abstract: bool,
    /// Directly implemented interfaces, in declaration order.
    pub interfaces: Vec<EntityId>,
    /// The type this one extends.
    pub parent: Option<EntityId>,
    pub fields: Vec<PropertyMetadata>,
    pub directives: Vec<DirectiveAnnotation>,
    pub extensions: IndexMap<String, Value>,
    pub resolve_type: Option<ResolveTypeFn>,
    pub is_type_of: Option<IsTypeOfFn>,
}

impl TypeMetadata {
    fn new(target: EntityId, kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            target,
            kind,
            name: name.into(),
            description: None,
            is_abstract: false,
            interfaces: Vec::new(),
            parent: None,
            fields: Vec::new(),
            directives: Vec::new(),
            extensions: IndexMap::new(),
            resolve_type: None,
            is_type_of: None,
        }
    }

    /// Declares `T` as an object type.
    pub fn object<T: 'static>(name: impl Into<String>) -> Self {
        Self::new(EntityId::of::<T>(), TypeKind::Object, name)
    }

    /// Declares `T` as an interface type.
    pub fn interface<T: 'static>(name: impl Into<String>) -> Self {
        Self::new(EntityId::of::<T>(), TypeKind::Interface, name)
    }

    /// Declares `T` as an input object type.
    pub fn input<T: 'static>(name: impl Into<String>) -> Self {
        Self::new(EntityId::of::<T>(), TypeKind::InputObject, name)
    }

    /// Declares `T` as an args type, named after the entity.
    pub fn args<T: 'static>() -> Self {
        let target = EntityId::of::<T>();
        Self::new(target, TypeKind::Args, target.name())
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the type abstract. Abstract types are compiled but only enter
    /// the schema when the build settings ask for them.
    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn implements<I: 'static>(mut self) -> Self {
        self.interfaces.push(EntityId::of::<I>());
        self
    }

    /// Sets the parent type whose fields and interfaces are inherited.
    #[must_use]
    pub fn extends<P: 'static>(mut self) -> Self {
        self.parent = Some(EntityId::of::<P>());
        self
    }

    #[must_use]
    pub fn field(mut self, field: PropertyMetadata) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn directive(mut self, directive: DirectiveAnnotation) -> Self {
        self.directives.push(directive);
        self
    }

    #[must_use]
    pub fn extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Sets the strategy resolving concrete types of an interface.
    #[must_use]
    pub fn resolve_type<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.resolve_type = Some(Arc::new(resolve));
        self
    }

    /// Sets the predicate recognizing values of an object type.
    #[must_use]
    pub fn is_type_of<F>(mut self, is_type_of: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.is_type_of = Some(Arc::new(is_type_of));
        self
    }

    /// Returns the direct supertypes: interfaces first, then the parent.
    pub fn supertypes(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.interfaces.iter().copied().chain(self.parent)
    }
}

impl fmt::Debug for TypeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMetadata")
            .field("target", &self.target)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("is_abstract", &self.is_abstract)
            .field("interfaces", &self.interfaces)
            .field("parent", &self.parent)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Metadata of a field of an object, interface, input or args type.
#[derive(Clone)]
pub struct PropertyMetadata {
    /// Declaration name, also the key read from the root value.
    pub name: String,
    /// Name exposed in the schema.
    pub schema_name: String,
    pub type_fn: TypeFn,
    pub options: TypeOptions,
    pub params: Vec<ParamMetadata>,
    pub directives: Vec<DirectiveAnnotation>,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    pub complexity: Option<u32>,
    pub middlewares: Vec<Arc<dyn FieldMiddleware>>,
    pub extensions: IndexMap<String, Value>,
    /// Skips all middleware for this field.
    pub simple: bool,
}

impl PropertyMetadata {
    /// Creates a field whose schema name equals its declaration name.
    pub fn new<F>(name: impl Into<String>, type_fn: F) -> Self
    where
        F: Fn() -> TypeValue + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            schema_name: name.clone(),
            name,
            type_fn: Arc::new(type_fn),
            options: TypeOptions::default(),
            params: Vec::new(),
            directives: Vec::new(),
            description: None,
            deprecation_reason: None,
            complexity: None,
            middlewares: Vec::new(),
            extensions: IndexMap::new(),
            simple: false,
        }
    }

    /// Evaluates the type-producing function.
    pub fn type_value(&self) -> TypeValue {
        (self.type_fn)()
    }

    /// Exposes the field under another name.
    #[must_use]
    pub fn schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = schema_name.into();
        self
    }

    #[must_use]
    pub fn nullable(mut self, nullable: Nullable) -> Self {
        self.options.nullable = Some(nullable);
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.options.default_value = Some(value);
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: ArgMetadata) -> Self {
        self.params.push(ParamMetadata::Arg(arg));
        self
    }

    /// Flattens the fields of args type `A` into arguments.
    #[must_use]
    pub fn args<A: 'static>(mut self) -> Self {
        self.params.push(ParamMetadata::Args(EntityId::of::<A>()));
        self
    }

    #[must_use]
    pub fn directive(mut self, directive: DirectiveAnnotation) -> Self {
        self.directives.push(directive);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn complexity(mut self, complexity: u32) -> Self {
        self.complexity = Some(complexity);
        self
    }

    /// Adds a field-level middleware, run inside the build-wide ones.
    #[must_use]
    pub fn middleware(mut self, middleware: Arc<dyn FieldMiddleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    #[must_use]
    pub fn extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Resolves the field without any middleware.
    #[must_use]
    pub fn simple(mut self) -> Self {
        self.simple = true;
        self
    }
}

impl fmt::Debug for PropertyMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("name", &self.name)
            .field("schema_name", &self.schema_name)
            .field("type", &self.type_value())
            .field("options", &self.options)
            .field("params", &self.params)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

/// A parameter of a field.
#[derive(Debug, Clone)]
pub enum ParamMetadata {
    /// A single argument.
    Arg(ArgMetadata),
    /// An args type whose fields become arguments.
    Args(EntityId),
}

/// Metadata of a single argument.
#[derive(Clone)]
pub struct ArgMetadata {
    pub name: String,
    pub type_fn: TypeFn,
    pub options: TypeOptions,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    pub directives: Vec<DirectiveAnnotation>,
}

impl ArgMetadata {
    pub fn new<F>(name: impl Into<String>, type_fn: F) -> Self
    where
        F: Fn() -> TypeValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            type_fn: Arc::new(type_fn),
            options: TypeOptions::default(),
            description: None,
            deprecation_reason: None,
            directives: Vec::new(),
        }
    }

    /// Evaluates the type-producing function.
    pub fn type_value(&self) -> TypeValue {
        (self.type_fn)()
    }

    #[must_use]
    pub fn nullable(mut self, nullable: Nullable) -> Self {
        self.options.nullable = Some(nullable);
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.options.default_value = Some(value);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn directive(mut self, directive: DirectiveAnnotation) -> Self {
        self.directives.push(directive);
        self
    }
}

impl fmt::Debug for ArgMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgMetadata")
            .field("name", &self.name)
            .field("type", &self.type_value())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Metadata of an enum value.
#[derive(Debug, Clone)]
pub struct EnumValueMetadata {
    pub name: String,
    /// Runtime value; defaults to the name as a string.
    pub value: Value,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    pub directives: Vec<DirectiveAnnotation>,
}

impl EnumValueMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: Value::String(name.clone()),
            name,
            description: None,
            deprecation_reason: None,
            directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn directive(mut self, directive: DirectiveAnnotation) -> Self {
        self.directives.push(directive);
        self
    }
}

/// Metadata of an enum type.
#[derive(Debug, Clone)]
pub struct EnumMetadata {
    pub target: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<EnumValueMetadata>,
    pub directives: Vec<DirectiveAnnotation>,
}

impl EnumMetadata {
    /// Declares `T` as an enum type.
    pub fn new<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            target: EntityId::of::<T>(),
            name: name.into(),
            description: None,
            values: Vec::new(),
            directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn value(mut self, value: EnumValueMetadata) -> Self {
        self.values.push(value);
        self
    }

    #[must_use]
    pub fn directive(mut self, directive: DirectiveAnnotation) -> Self {
        self.directives.push(directive);
        self
    }
}

/// Function producing the member entities of a union.
pub type MembersFn = Arc<dyn Fn() -> Vec<EntityId> + Send + Sync>;

/// Metadata of a union type.
#[derive(Clone)]
pub struct UnionMetadata {
    pub target: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub members_fn: MembersFn,
    pub resolve_type: Option<ResolveTypeFn>,
    pub directives: Vec<DirectiveAnnotation>,
}

impl UnionMetadata {
    /// Declares `T` as a union of the entities returned by `members`.
    pub fn new<T: 'static, F>(name: impl Into<String>, members: F) -> Self
    where
        F: Fn() -> Vec<EntityId> + Send + Sync + 'static,
    {
        Self {
            target: EntityId::of::<T>(),
            name: name.into(),
            description: None,
            members_fn: Arc::new(members),
            resolve_type: None,
            directives: Vec::new(),
        }
    }

    /// Evaluates the member function.
    pub fn members(&self) -> Vec<EntityId> {
        (self.members_fn)()
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn resolve_type<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.resolve_type = Some(Arc::new(resolve));
        self
    }

    #[must_use]
    pub fn directive(mut self, directive: DirectiveAnnotation) -> Self {
        self.directives.push(directive);
        self
    }
}

impl fmt::Debug for UnionMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionMetadata")
            .field("target", &self.target)
            .field("name", &self.name)
            .field("members", &self.members())
            .finish_non_exhaustive()
    }
}
