//! Resolver system for typegraph.
//!
//! This module provides the resolver trait and the values a resolver receives.

use crate::container::ContainerError;
use crate::context::{Context, FieldError};
use indexmap::IndexMap;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Arguments passed to a resolver.
#[derive(Debug, Clone, Default)]
pub struct ResolverArgs {
    args: IndexMap<String, Value>,
}

impl ResolverArgs {
    /// Creates new resolver args.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates resolver args from a list of (name, value) pairs.
    pub fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        Self {
            args: pairs.into_iter().collect(),
        }
    }

    /// Gets an argument by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Gets an argument as a specific type.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.args
            .get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Gets a required argument, returning an error if not found.
    pub fn require<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T, ResolverError> {
        self.args
            .get(name)
            .ok_or_else(|| ResolverError::MissingArgument(name.to_string()))
            .and_then(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| ResolverError::ArgumentParseError(name.to_string(), e.to_string()))
            })
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Sets an argument.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.args.insert(name.into(), value);
    }
}

/// Info about the field being resolved.
#[derive(Debug, Clone)]
pub struct ResolverInfo {
    /// The field name being resolved.
    pub field_name: String,

    /// The parent type name.
    pub parent_type: String,
}

impl ResolverInfo {
    /// Creates new resolver info.
    pub fn new(field_name: impl Into<String>, parent_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            parent_type: parent_type.into(),
        }
    }
}

/// The original call arguments of a resolver invocation.
///
/// Middleware and handlers receive these and forward them unchanged.
#[derive(Debug, Clone, Copy)]
pub struct ResolverParams<'a> {
    pub root: &'a Value,
    pub args: &'a ResolverArgs,
    pub context: &'a Context,
    pub info: &'a ResolverInfo,
}

impl<'a> ResolverParams<'a> {
    /// Bundles resolver call arguments.
    pub fn new(
        root: &'a Value,
        args: &'a ResolverArgs,
        context: &'a Context,
        info: &'a ResolverInfo,
    ) -> Self {
        Self {
            root,
            args,
            context,
            info,
        }
    }

    /// Invokes a resolver with these arguments.
    pub fn call(self, resolver: &'a dyn Resolver) -> ResolverFuture<'a> {
        resolver.resolve(self.root, self.args, self.context, self.info)
    }
}

/// Result type for resolvers.
pub type ResolverResult = Result<Value, ResolverError>;

/// Future type for async resolvers.
pub type ResolverFuture<'a> = Pin<Box<dyn Future<Output = ResolverResult> + Send + 'a>>;

/// Error from a resolver.
#[derive(Debug, Clone, Error)]
pub enum ResolverError {
    /// Missing required argument.
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// Argument parse error.
    #[error("Failed to parse argument '{0}': {1}")]
    ArgumentParseError(String, String),

    /// The field resolver handler instance could not be obtained.
    #[error("Failed to resolve field resolver handler: {0}")]
    HandlerResolution(#[from] ContainerError),

    /// A handler or middleware failed.
    #[error("Resolver for `{field}` failed: {message}")]
    Handler { field: String, message: String },

    /// The concrete type of an abstract value could not be determined.
    #[error("Cannot resolve abstract type `{abstract_type}`: {message}")]
    AbstractType {
        abstract_type: String,
        message: String,
    },

    /// Custom error.
    #[error("{0}")]
    Custom(String),
}

impl ResolverError {
    /// Returns a stable error code for the error extensions.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingArgument(_) | Self::ArgumentParseError(..) => "BAD_USER_INPUT",
            Self::HandlerResolution(_) => "HANDLER_RESOLUTION_FAILED",
            Self::Handler { .. } | Self::Custom(_) => "RESOLVER_ERROR",
            Self::AbstractType { .. } => "ABSTRACT_TYPE_RESOLUTION_FAILED",
        }
    }
}

impl From<ResolverError> for FieldError {
    fn from(error: ResolverError) -> Self {
        FieldError::new(error.to_string()).with_code(error.code())
    }
}

/// Trait for field resolvers.
pub trait Resolver: Send + Sync {
    /// Resolves a field value.
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a>;
}

/// A sync resolver function.
pub type SyncResolverFn =
    Arc<dyn Fn(&Value, &ResolverArgs, &Context, &ResolverInfo) -> ResolverResult + Send + Sync>;

/// A wrapper for sync resolver functions.
pub struct FnResolver {
    func: SyncResolverFn,
}

impl FnResolver {
    /// Creates a new function resolver.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &ResolverArgs, &Context, &ResolverInfo) -> ResolverResult
            + Send
            + Sync
            + 'static,
    {
        Self { func: Arc::new(f) }
    }
}

impl Resolver for FnResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        let result = (self.func)(parent, args, ctx, info);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typegraph_core::EntityId;

    #[test]
    fn test_resolver_args() {
        let mut args = ResolverArgs::new();
        args.set("id", serde_json::json!(123));
        args.set("name", serde_json::json!("test"));

        assert_eq!(args.get_as::<i64>("id"), Some(123));
        assert_eq!(args.get_as::<String>("name"), Some("test".to_string()));
        assert_eq!(args.get_as::<i64>("missing"), None);
    }

    #[test]
    fn test_require_reports_parse_error() {
        let args = ResolverArgs::from_pairs(vec![("id".into(), serde_json::json!("abc"))]);
        let err = args.require::<i64>("id").unwrap_err();
        assert!(matches!(err, ResolverError::ArgumentParseError(ref name, _) if name == "id"));

        let err = args.require::<i64>("limit").unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument: limit");
    }

    #[test]
    fn test_handler_resolution_into_field_error() {
        struct UserFieldsHandler;
        let err = ResolverError::from(ContainerError::NotRegistered {
            handler: EntityId::of::<UserFieldsHandler>(),
        });
        let field_error = FieldError::from(err);

        assert_eq!(
            field_error.message,
            "Failed to resolve field resolver handler: no provider registered for `UserFieldsHandler`"
        );
        assert_eq!(
            field_error.extensions.unwrap()["code"],
            serde_json::json!("HANDLER_RESOLUTION_FAILED")
        );
    }

    #[tokio::test]
    async fn test_fn_resolver() {
        let resolver = FnResolver::new(|_parent, args, _ctx, _info| {
            let id: i64 = args.require("id")?;
            Ok(serde_json::json!({"id": id, "name": "User"}))
        });

        let parent = serde_json::json!({});
        let mut args = ResolverArgs::new();
        args.set("id", serde_json::json!(42));
        let ctx = Context::new();
        let info = ResolverInfo::new("user", "Query");

        let result = ResolverParams::new(&parent, &args, &ctx, &info)
            .call(&resolver)
            .await;
        assert_eq!(
            result.unwrap(),
            serde_json::json!({"id": 42, "name": "User"})
        );
    }
}
