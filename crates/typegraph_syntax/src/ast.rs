//! Syntax nodes attached to generated schema types.
//!
//! These nodes never come from a parsed schema document. They are synthesized
//! from metadata so that directives can travel with the compiled types, and
//! they print back to SDL for inspection.

use std::fmt;
use typegraph_core::Span;

/// A name with its source span (empty for synthesized names).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub value: String,
    pub span: Span,
}

impl Name {
    /// Creates a synthesized name with no source location.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            span: Span::default(),
        }
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A constant value inside a directive argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(Name, Value)>),
}

impl Value {
    /// Converts a JSON value into a syntax value.
    ///
    /// Integers that fit into `i64` become `Int`, every other number becomes
    /// `Float`. JSON has no enum literal, so strings always stay strings.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => {
                Self::List(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (Name::new(k.clone()), Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::String(s) => write_string(f, s),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
            Self::Enum(e) => f.write_str(e),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Object(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\u{:04X}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

/// Argument of a directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Name,
    pub value: Value,
    pub span: Span,
}

/// A directive application such as `@key(fields: "id")`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: Name,
    pub arguments: Vec<Argument>,
    pub span: Span,
}

impl Directive {
    /// Returns the value of an argument by name.
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|a| a.name.as_str() == name)
            .map(|a| &a.value)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.arguments.is_empty() {
            f.write_str("(")?;
            for (i, arg) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}: {}", arg.name, arg.value)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// The kind of definition a synthesized node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    ObjectType,
    InterfaceType,
    InputObjectType,
    UnionType,
    EnumType,
    EnumValue,
    FieldDefinition,
    InputValueDefinition,
}

impl DefinitionKind {
    /// Returns the SDL keyword introducing this definition, if it has one.
    #[must_use]
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            Self::ObjectType => Some("type"),
            Self::InterfaceType => Some("interface"),
            Self::InputObjectType => Some("input"),
            Self::UnionType => Some("union"),
            Self::EnumType => Some("enum"),
            Self::EnumValue | Self::FieldDefinition | Self::InputValueDefinition => None,
        }
    }
}

/// A synthesized definition node carrying directives.
///
/// Only the parts the type system reads back are kept: the definition kind,
/// its name, and the attached directives.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionNode {
    pub kind: DefinitionKind,
    pub name: Name,
    pub directives: Vec<Directive>,
}

impl DefinitionNode {
    /// Returns true if a directive with the given name is attached.
    pub fn has_directive(&self, name: &str) -> bool {
        self.directive(name).is_some()
    }

    /// Returns the first directive with the given name.
    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name.as_str() == name)
    }
}

impl fmt::Display for DefinitionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(keyword) = self.kind.keyword() {
            write!(f, "{keyword} ")?;
        }
        write!(f, "{}", self.name)?;
        for directive in &self.directives {
            write!(f, " {directive}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_json() {
        let value = Value::from_json(&serde_json::json!({
            "count": 3,
            "fields": "id name",
            "tags": ["a", null, true],
            "weight": 1.5,
        }));
        insta::assert_snapshot!(
            value.to_string(),
            @r#"{count: 3, fields: "id name", tags: ["a", null, true], weight: 1.5}"#
        );
    }

    #[test]
    fn test_string_escaping() {
        let value = Value::String("say \"hi\"\n".into());
        assert_eq!(value.to_string(), r#""say \"hi\"\n""#);
    }

    #[test]
    fn test_definition_node_display() {
        let node = DefinitionNode {
            kind: DefinitionKind::ObjectType,
            name: Name::new("User"),
            directives: vec![Directive {
                name: Name::new("key"),
                arguments: vec![Argument {
                    name: Name::new("fields"),
                    value: Value::String("id".into()),
                    span: Span::default(),
                }],
                span: Span::default(),
            }],
        };
        assert_eq!(node.to_string(), r#"type User @key(fields: "id")"#);
        assert!(node.has_directive("key"));
        assert!(!node.has_directive("external"));
    }
}
