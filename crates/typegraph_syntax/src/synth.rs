//! Synthesis of definition nodes from directive annotations.
//!
//! Metadata records directives either as raw SDL (`@key(fields: "id")`) or as
//! a name with JSON arguments. Both forms end up as [`Directive`] nodes on a
//! synthesized [`DefinitionNode`], which is what compiled types expose.

use crate::ast::{Argument, DefinitionKind, DefinitionNode, Directive, Name, Value};
use crate::parser::parse_directives;
use indexmap::IndexMap;
use typegraph_core::{BuildError, BuildResult, Span};

/// A directive recorded on a type, field, argument or enum value.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveAnnotation {
    /// Raw SDL for exactly one directive, e.g. `@key(fields: "id")`.
    Sdl(String),
    /// A directive name with JSON arguments.
    Named {
        name: String,
        args: IndexMap<String, serde_json::Value>,
    },
}

impl DirectiveAnnotation {
    /// Creates an SDL annotation.
    pub fn sdl(source: impl Into<String>) -> Self {
        Self::Sdl(source.into())
    }

    /// Creates a named annotation without arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            args: IndexMap::new(),
        }
    }

    /// Adds an argument to a named annotation. SDL annotations are left as is.
    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        if let Self::Named { args, .. } = &mut self {
            args.insert(key.into(), value);
        }
        self
    }

    /// Converts the annotation into a directive node.
    ///
    /// `target` names the annotated element and only appears in errors.
    pub fn to_directive(&self, target: &str) -> BuildResult<Directive> {
        match self {
            Self::Sdl(source) => parse_sdl(target, source),
            Self::Named { name, args } => {
                let name = name.strip_prefix('@').unwrap_or(name);
                if name.is_empty() {
                    return Err(invalid(target, "directive name is empty", name, None));
                }
                Ok(Directive {
                    name: Name::new(name),
                    arguments: args
                        .iter()
                        .map(|(key, value)| Argument {
                            name: Name::new(key.clone()),
                            value: Value::from_json(value),
                            span: Span::default(),
                        })
                        .collect(),
                    span: Span::default(),
                })
            }
        }
    }
}

fn parse_sdl(target: &str, source: &str) -> BuildResult<Directive> {
    let result = parse_directives(source);
    if let Some(error) = result.diagnostics.first_error() {
        return Err(invalid(
            target,
            error.primary_message(),
            source,
            error.primary_span(),
        ));
    }

    let mut directives = result.directives.into_iter();
    match (directives.next(), directives.next()) {
        (Some(directive), None) => Ok(directive),
        (None, _) => Err(invalid(target, "expected a directive", source, None)),
        (Some(_), Some(extra)) => Err(invalid(
            target,
            "an SDL annotation must contain exactly one directive",
            source,
            Some(extra.span),
        )),
    }
}

fn invalid(target: &str, message: &str, source: &str, span: Option<Span>) -> BuildError {
    BuildError::InvalidDirective {
        target: target.to_string(),
        message: message.to_string(),
        source_code: source.to_string(),
        span: span.map(Into::into),
    }
}

/// Builds the definition node for an annotated element.
///
/// Returns `None` when there is nothing to attach.
pub fn synthesize(
    kind: DefinitionKind,
    name: &str,
    annotations: &[DirectiveAnnotation],
) -> BuildResult<Option<DefinitionNode>> {
    if annotations.is_empty() {
        return Ok(None);
    }
    let directives = annotations
        .iter()
        .map(|a| a.to_directive(name))
        .collect::<BuildResult<Vec<_>>>()?;
    Ok(Some(DefinitionNode {
        kind,
        name: Name::new(name),
        directives,
    }))
}
