//! Schema definition for typegraph.
//!
//! Named types refer to each other by name through [`TypeRef`], so the graph
//! has no reference cycles. Field maps, interface lists and union members are
//! [`Deferred`] values: they are computed on first access, after every type
//! skeleton of the build exists.

use crate::deferred::Deferred;
use crate::resolver::{Resolver, ResolverError};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use typegraph_core::BuildResult;
use typegraph_syntax::DefinitionNode;

/// Type reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    #[must_use]
    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    #[must_use]
    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// Returns the name of the innermost named type.
    pub fn named_type(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.named_type(),
        }
    }

    /// Returns true if the outermost wrapper is non-null.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Returns true if the type is a list, ignoring a non-null wrapper.
    pub fn is_list(&self) -> bool {
        match self {
            Self::List(_) => true,
            Self::NonNull(inner) => inner.is_list(),
            Self::Named(_) => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// An argument or input field.
#[derive(Debug, Clone)]
pub struct InputValue {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
    pub deprecation_reason: Option<String>,
    pub ast_node: Option<DefinitionNode>,
    pub extensions: IndexMap<String, Value>,
}

impl InputValue {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
            deprecation_reason: None,
            ast_node: None,
            extensions: IndexMap::new(),
        }
    }
}

/// An output field.
#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub args: IndexMap<String, InputValue>,
    pub resolve: Arc<dyn Resolver>,
    pub deprecation_reason: Option<String>,
    pub complexity: Option<u32>,
    pub ast_node: Option<DefinitionNode>,
    pub extensions: IndexMap<String, Value>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("args", &self.args.keys().collect::<Vec<_>>())
            .field("deprecation_reason", &self.deprecation_reason)
            .field("complexity", &self.complexity)
            .finish_non_exhaustive()
    }
}

/// Field map of an object or interface type.
pub type FieldMap = IndexMap<String, Field>;

/// Field map of an input object type.
pub type InputFieldMap = IndexMap<String, InputValue>;

/// Custom strategy returning the concrete type name of an abstract value.
pub type ResolveTypeFn = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Predicate telling whether a value belongs to an object type.
pub type IsTypeOfFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// How interfaces and unions determine the concrete type of a value.
#[derive(Clone, Default)]
pub enum TypeResolution {
    /// Read the `__typename` key of the value.
    #[default]
    Typename,
    /// Call a custom function.
    Custom(ResolveTypeFn),
}

impl TypeResolution {
    /// Returns the concrete type name the strategy picks for `value`.
    pub fn resolve(&self, value: &Value) -> Option<String> {
        match self {
            Self::Typename => value
                .get("__typename")
                .and_then(Value::as_str)
                .map(str::to_string),
            Self::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for TypeResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Typename => f.write_str("Typename"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Scalar type definition.
#[derive(Debug, Clone)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
}

/// Object type definition.
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Deferred<FieldMap>,
    pub interfaces: Deferred<Vec<Arc<InterfaceType>>>,
    pub is_type_of: Option<IsTypeOfFn>,
    pub ast_node: Option<DefinitionNode>,
    pub extensions: IndexMap<String, Value>,
}

impl ObjectType {
    /// Returns the field map, computing it on first access.
    pub fn fields(&self) -> BuildResult<&FieldMap> {
        self.fields.get()
    }

    /// Returns the implemented interfaces, computing them on first access.
    pub fn interfaces(&self) -> BuildResult<&[Arc<InterfaceType>]> {
        self.interfaces.get().map(Vec::as_slice)
    }

    /// Returns true if the type implements the interface `name`.
    pub fn implements(&self, name: &str) -> BuildResult<bool> {
        Ok(self.interfaces()?.iter().any(|i| i.name == name))
    }
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Interface type definition.
pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Deferred<FieldMap>,
    pub interfaces: Deferred<Vec<Arc<InterfaceType>>>,
    pub resolve_type: TypeResolution,
    pub ast_node: Option<DefinitionNode>,
    pub extensions: IndexMap<String, Value>,
}

impl InterfaceType {
    /// Returns the field map, computing it on first access.
    pub fn fields(&self) -> BuildResult<&FieldMap> {
        self.fields.get()
    }

    /// Returns the implemented interfaces, computing them on first access.
    pub fn interfaces(&self) -> BuildResult<&[Arc<InterfaceType>]> {
        self.interfaces.get().map(Vec::as_slice)
    }
}

impl fmt::Debug for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Input object type definition.
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Deferred<InputFieldMap>,
    pub ast_node: Option<DefinitionNode>,
    pub extensions: IndexMap<String, Value>,
}

impl InputObjectType {
    /// Returns the input field map, computing it on first access.
    pub fn fields(&self) -> BuildResult<&InputFieldMap> {
        self.fields.get()
    }
}

impl fmt::Debug for InputObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputObjectType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Enum value definition.
#[derive(Debug, Clone)]
pub struct EnumValue {
    pub name: String,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    /// Runtime value the enum value stands for.
    pub value: Value,
    pub ast_node: Option<DefinitionNode>,
}

/// Enum type definition.
#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: IndexMap<String, EnumValue>,
    pub ast_node: Option<DefinitionNode>,
}

/// Union type definition.
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub members: Deferred<Vec<Arc<ObjectType>>>,
    pub resolve_type: TypeResolution,
    pub ast_node: Option<DefinitionNode>,
}

impl UnionType {
    /// Returns the member types, computing them on first access.
    pub fn members(&self) -> BuildResult<&[Arc<ObjectType>]> {
        self.members.get().map(Vec::as_slice)
    }
}

impl fmt::Debug for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionType")
            .field("name", &self.name)
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

/// A named type of the schema.
#[derive(Debug, Clone)]
pub enum NamedType {
    Scalar(Arc<ScalarType>),
    Object(Arc<ObjectType>),
    Interface(Arc<InterfaceType>),
    Union(Arc<UnionType>),
    Enum(Arc<EnumType>),
    InputObject(Arc<InputObjectType>),
}

impl NamedType {
    /// Returns the type name.
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(t) => &t.name,
            Self::Object(t) => &t.name,
            Self::Interface(t) => &t.name,
            Self::Union(t) => &t.name,
            Self::Enum(t) => &t.name,
            Self::InputObject(t) => &t.name,
        }
    }

    /// Returns the SDL keyword of the type kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Object(_) => "type",
            Self::Interface(_) => "interface",
            Self::Union(_) => "union",
            Self::Enum(_) => "enum",
            Self::InputObject(_) => "input",
        }
    }

    /// Returns the object type, if this is one.
    pub fn as_object(&self) -> Option<&Arc<ObjectType>> {
        match self {
            Self::Object(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the interface type, if this is one.
    pub fn as_interface(&self) -> Option<&Arc<InterfaceType>> {
        match self {
            Self::Interface(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the union type, if this is one.
    pub fn as_union(&self) -> Option<&Arc<UnionType>> {
        match self {
            Self::Union(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the enum type, if this is one.
    pub fn as_enum(&self) -> Option<&Arc<EnumType>> {
        match self {
            Self::Enum(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the input object type, if this is one.
    pub fn as_input_object(&self) -> Option<&Arc<InputObjectType>> {
        match self {
            Self::InputObject(t) => Some(t),
            _ => None,
        }
    }

    fn is_builtin_scalar(&self) -> bool {
        matches!(self, Self::Scalar(s) if BUILTIN_SCALARS.contains(&s.name.as_str()))
    }
}

/// Names of the built-in scalars.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// A GraphQL schema.
#[derive(Debug, Clone)]
pub struct Schema {
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
    pub types: IndexMap<String, NamedType>,
}

impl Schema {
    /// Gets a type by name.
    pub fn get_type(&self, name: &str) -> Option<&NamedType> {
        self.types.get(name)
    }

    /// Gets an object type by name.
    pub fn object(&self, name: &str) -> Option<&Arc<ObjectType>> {
        self.get_type(name).and_then(NamedType::as_object)
    }

    /// Gets an interface type by name.
    pub fn interface(&self, name: &str) -> Option<&Arc<InterfaceType>> {
        self.get_type(name).and_then(NamedType::as_interface)
    }

    /// Returns the query root type.
    pub fn query(&self) -> Option<&Arc<ObjectType>> {
        self.object(&self.query_type)
    }

    /// Returns all types.
    pub fn types(&self) -> impl Iterator<Item = (&String, &NamedType)> {
        self.types.iter()
    }

    /// Returns the object types implementing the interface `name`.
    pub fn implementations(&self, name: &str) -> BuildResult<Vec<&Arc<ObjectType>>> {
        let mut found = Vec::new();
        for ty in self.types.values() {
            if let NamedType::Object(object) = ty {
                if object.implements(name)? {
                    found.push(object);
                }
            }
        }
        Ok(found)
    }

    /// Returns the name of the concrete object type of `value`, which was
    /// produced for the interface or union `abstract_name`.
    ///
    /// The strategy of the abstract type is consulted first, then the
    /// `is_type_of` predicates of its possible types. The chosen type must
    /// implement the interface or be a member of the union.
    pub fn resolve_abstract_type(
        &self,
        abstract_name: &str,
        value: &Value,
    ) -> Result<String, ResolverError> {
        let fail = |message: String| ResolverError::AbstractType {
            abstract_type: abstract_name.to_string(),
            message,
        };
        let build_failed = |err: typegraph_core::BuildError| fail(err.to_string());

        let (strategy, possible): (&TypeResolution, Vec<&Arc<ObjectType>>) =
            match self.get_type(abstract_name) {
                Some(NamedType::Interface(interface)) => (
                    &interface.resolve_type,
                    self.implementations(abstract_name).map_err(build_failed)?,
                ),
                Some(NamedType::Union(union)) => (
                    &union.resolve_type,
                    union.members().map_err(build_failed)?.iter().collect(),
                ),
                _ => return Err(fail("not an interface or union in this schema".into())),
            };

        let name = strategy
            .resolve(value)
            .or_else(|| {
                possible
                    .iter()
                    .find(|o| o.is_type_of.as_ref().is_some_and(|is_type_of| is_type_of(value)))
                    .map(|o| o.name.clone())
            })
            .ok_or_else(|| fail("could not determine the concrete type of the value".into()))?;

        if possible.iter().any(|o| o.name == name) {
            Ok(name)
        } else {
            Err(fail(format!("`{name}` is not a possible type")))
        }
    }

    /// Prints the schema as SDL, forcing every deferred part.
    pub fn to_sdl(&self) -> BuildResult<String> {
        let mut out = String::new();
        let mut first = true;
        for ty in self.types.values() {
            if ty.is_builtin_scalar() {
                continue;
            }
            if !first {
                out.push('\n');
            }
            first = false;
            print_type(&mut out, ty)?;
        }
        Ok(out)
    }
}

fn print_directives(out: &mut String, node: Option<&DefinitionNode>) {
    if let Some(node) = node {
        for directive in &node.directives {
            let _ = write!(out, " {directive}");
        }
    }
}

fn print_implements(out: &mut String, interfaces: &[Arc<InterfaceType>]) {
    if !interfaces.is_empty() {
        let names: Vec<_> = interfaces.iter().map(|i| i.name.as_str()).collect();
        let _ = write!(out, " implements {}", names.join(" & "));
    }
}

fn print_input_value(out: &mut String, value: &InputValue) {
    let _ = write!(out, "{}: {}", value.name, value.ty);
    if let Some(default) = &value.default_value {
        let _ = write!(out, " = {}", typegraph_syntax::Value::from_json(default));
    }
    print_directives(out, value.ast_node.as_ref());
}

fn print_fields(out: &mut String, fields: &FieldMap) {
    out.push_str(" {\n");
    for field in fields.values() {
        let _ = write!(out, "  {}", field.name);
        if !field.args.is_empty() {
            out.push('(');
            for (i, arg) in field.args.values().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_input_value(out, arg);
            }
            out.push(')');
        }
        let _ = write!(out, ": {}", field.ty);
        if let Some(reason) = &field.deprecation_reason {
            let _ = write!(
                out,
                " @deprecated(reason: {})",
                typegraph_syntax::Value::String(reason.clone())
            );
        }
        print_directives(out, field.ast_node.as_ref());
        out.push('\n');
    }
    out.push_str("}\n");
}

fn print_type(out: &mut String, ty: &NamedType) -> BuildResult<()> {
    let _ = write!(out, "{} {}", ty.kind(), ty.name());
    match ty {
        NamedType::Scalar(_) => out.push('\n'),
        NamedType::Object(object) => {
            print_implements(out, object.interfaces()?);
            print_directives(out, object.ast_node.as_ref());
            print_fields(out, object.fields()?);
        }
        NamedType::Interface(interface) => {
            print_implements(out, interface.interfaces()?);
            print_directives(out, interface.ast_node.as_ref());
            print_fields(out, interface.fields()?);
        }
        NamedType::Union(union) => {
            print_directives(out, union.ast_node.as_ref());
            let names: Vec<_> = union.members()?.iter().map(|m| m.name.as_str()).collect();
            let _ = writeln!(out, " = {}", names.join(" | "));
        }
        NamedType::Enum(enum_type) => {
            print_directives(out, enum_type.ast_node.as_ref());
            out.push_str(" {\n");
            for value in enum_type.values.values() {
                let _ = write!(out, "  {}", value.name);
                print_directives(out, value.ast_node.as_ref());
                out.push('\n');
            }
            out.push_str("}\n");
        }
        NamedType::InputObject(input) => {
            print_directives(out, input.ast_node.as_ref());
            out.push_str(" {\n");
            for value in input.fields()?.values() {
                out.push_str("  ");
                print_input_value(out, value);
                out.push('\n');
            }
            out.push_str("}\n");
        }
    }
    Ok(())
}

/// Schema builder.
#[derive(Debug)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Creates a builder with the query root and the built-in scalars.
    pub fn new(query_type: impl Into<String>) -> Self {
        let mut types = IndexMap::new();
        for name in BUILTIN_SCALARS {
            types.insert(
                name.to_string(),
                NamedType::Scalar(Arc::new(ScalarType {
                    name: name.to_string(),
                    description: Some(format!("Built-in {name} scalar")),
                })),
            );
        }
        Self {
            schema: Schema {
                query_type: query_type.into(),
                mutation_type: None,
                subscription_type: None,
                types,
            },
        }
    }

    /// Sets the mutation type.
    #[must_use]
    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.schema.mutation_type = Some(name.into());
        self
    }

    /// Sets the subscription type.
    #[must_use]
    pub fn subscription_type(mut self, name: impl Into<String>) -> Self {
        self.schema.subscription_type = Some(name.into());
        self
    }

    /// Adds a type. A type already present under the same name is kept.
    pub fn add_type(&mut self, ty: NamedType) -> &mut Self {
        self.schema
            .types
            .entry(ty.name().to_string())
            .or_insert(ty);
        self
    }

    /// Returns true if a type with this name was added.
    pub fn contains(&self, name: &str) -> bool {
        self.schema.types.contains_key(name)
    }

    /// Returns the number of types, built-in scalars included.
    pub fn len(&self) -> usize {
        self.schema.types.len()
    }

    /// Returns true if the builder holds no types.
    pub fn is_empty(&self) -> bool {
        self.schema.types.is_empty()
    }

    /// Builds the schema.
    pub fn build(self) -> Schema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::RootResolver;

    fn field(name: &str, ty: TypeRef) -> Field {
        Field {
            name: name.to_string(),
            description: None,
            ty,
            args: IndexMap::new(),
            resolve: Arc::new(RootResolver::new(name, None)),
            deprecation_reason: None,
            complexity: None,
            ast_node: None,
            extensions: IndexMap::new(),
        }
    }

    fn node_interface() -> Arc<InterfaceType> {
        Arc::new(InterfaceType {
            name: "Node".into(),
            description: None,
            fields: Deferred::new(|| {
                let mut fields = FieldMap::new();
                fields.insert("id".into(), field("id", TypeRef::non_null(TypeRef::named("ID"))));
                Ok(fields)
            }),
            interfaces: Deferred::ready(Vec::new()),
            resolve_type: TypeResolution::Typename,
            ast_node: None,
            extensions: IndexMap::new(),
        })
    }

    fn object(name: &str, node: &Arc<InterfaceType>, is_type_of: Option<IsTypeOfFn>) -> Arc<ObjectType> {
        let mut fields = FieldMap::new();
        fields.insert("id".into(), field("id", TypeRef::non_null(TypeRef::named("ID"))));
        fields.insert(
            "tags".into(),
            field("tags", TypeRef::list(TypeRef::non_null(TypeRef::named("String")))),
        );
        Arc::new(ObjectType {
            name: name.into(),
            description: None,
            fields: Deferred::ready(fields),
            interfaces: Deferred::ready(vec![Arc::clone(node)]),
            is_type_of,
            ast_node: None,
            extensions: IndexMap::new(),
        })
    }

    fn schema() -> Schema {
        let node = node_interface();
        let is_post: IsTypeOfFn = Arc::new(|v: &Value| v.get("title").is_some());
        let mut builder = SchemaBuilder::new("User");
        builder
            .add_type(NamedType::Interface(Arc::clone(&node)))
            .add_type(NamedType::Object(object("User", &node, None)))
            .add_type(NamedType::Object(object("Post", &node, Some(is_post))));
        builder.build()
    }

    #[test]
    fn test_type_ref_display() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("User"))));
        assert_eq!(ty.to_string(), "[User!]!");
        assert_eq!(ty.named_type(), "User");
        assert!(ty.is_list());
        assert!(ty.is_non_null());
    }

    #[test]
    fn test_builtin_scalars() {
        let schema = SchemaBuilder::new("Query").build();
        for name in BUILTIN_SCALARS {
            assert!(matches!(schema.get_type(name), Some(NamedType::Scalar(_))));
        }
    }

    #[test]
    fn test_resolve_abstract_type() {
        let schema = schema();

        assert_eq!(
            schema
                .resolve_abstract_type("Node", &serde_json::json!({"__typename": "User"}))
                .unwrap(),
            "User"
        );
        assert_eq!(
            schema
                .resolve_abstract_type("Node", &serde_json::json!({"title": "Hello"}))
                .unwrap(),
            "Post"
        );

        let err = schema
            .resolve_abstract_type("Node", &serde_json::json!({"__typename": "Comment"}))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot resolve abstract type `Node`: `Comment` is not a possible type"
        );
    }

    #[test]
    fn test_print_sdl() {
        let sdl = schema().to_sdl().unwrap();
        insta::assert_snapshot!(sdl, @r"
        interface Node {
          id: ID!
        }

        type User implements Node {
          id: ID!
          tags: [String!]
        }

        type Post implements Node {
          id: ID!
          tags: [String!]
        }
        ");
    }
}
