//! Construction of field resolve functions.
//!
//! Every compiled field gets a resolver built from three layers:
//! - a root policy reading the field's property from the root value,
//! - optional dispatch to a field resolver handler obtained from the container,
//! - the effective middleware chain (build-wide first, then field-level).
//!
//! Building a resolver has no side effects; everything happens per call.

use crate::container::Container;
use crate::context::Context;
use crate::middleware::{FieldMiddleware, MiddlewareResolver};
use crate::resolver::{
    Resolver, ResolverArgs, ResolverError, ResolverFuture, ResolverInfo, ResolverParams,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{trace, warn};
use typegraph_core::EntityId;

/// Reads a property of the root value.
///
/// A missing property (or a root that is not an object) yields the default
/// value, or null without one. A property that is present, even as an
/// explicit null, is returned as is.
#[derive(Debug, Clone)]
pub struct RootResolver {
    property: String,
    default_value: Option<Value>,
}

impl RootResolver {
    /// Creates a root resolver for `property`.
    pub fn new(property: impl Into<String>, default_value: Option<Value>) -> Self {
        Self {
            property: property.into(),
            default_value,
        }
    }

    fn read(&self, root: &Value) -> Value {
        match root.get(&self.property) {
            Some(value) => value.clone(),
            None => self.default_value.clone().unwrap_or(Value::Null),
        }
    }
}

impl Resolver for RootResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        _args: &'a ResolverArgs,
        _ctx: &'a Context,
        _info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        let value = self.read(parent);
        Box::pin(async move { Ok(value) })
    }
}

/// The handler method recorded for a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerBinding {
    pub handler: EntityId,
    pub method: String,
}

impl HandlerBinding {
    /// Binds `method` of handler `H`.
    pub fn of<H: 'static>(method: impl Into<String>) -> Self {
        Self {
            handler: EntityId::of::<H>(),
            method: method.into(),
        }
    }
}

/// Dispatches to a handler instance, falling back to the root policy.
struct DelegateResolver {
    binding: HandlerBinding,
    container: Arc<dyn Container>,
    fallback: RootResolver,
}

impl Resolver for DelegateResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        Box::pin(async move {
            let request = self.container.request_id(ctx);
            let instance = self
                .container
                .resolve_instance(self.binding.handler, request, false)
                .await
                .map_err(ResolverError::HandlerResolution)?;

            if let Some(instance) = instance {
                let params = ResolverParams::new(parent, args, ctx, info);
                if let Some(result) = instance.call(&self.binding.method, params).await {
                    return result;
                }
                warn!(
                    handler = %self.binding.handler,
                    method = %self.binding.method,
                    field = %info.field_name,
                    "handler does not expose the mapped method"
                );
            }
            Ok(self.fallback.read(parent))
        })
    }
}

/// What a field's resolver is built from.
#[derive(Clone, Default)]
pub struct ResolverSpec {
    /// Property read from the root value.
    pub property: String,
    /// Value used when the property is missing.
    pub default_value: Option<Value>,
    /// Handler method computing the field, if any.
    pub handler: Option<HandlerBinding>,
    /// Field-level middleware, run inside the build-wide middleware.
    pub middlewares: Vec<Arc<dyn FieldMiddleware>>,
    /// Skips all middleware for this field.
    pub simple: bool,
}

impl ResolverSpec {
    /// Creates a spec reading `property`.
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ..Self::default()
        }
    }
}

/// Builds the resolve function of each field.
#[derive(Clone, Default)]
pub struct FieldResolverCompositor {
    global_middlewares: Vec<Arc<dyn FieldMiddleware>>,
    container: Option<Arc<dyn Container>>,
    simple_resolvers: bool,
}

impl FieldResolverCompositor {
    /// Creates a compositor with the build-wide middleware list.
    pub fn new(global_middlewares: Vec<Arc<dyn FieldMiddleware>>) -> Self {
        Self {
            global_middlewares,
            ..Self::default()
        }
    }

    /// Sets the container handler instances are obtained from.
    #[must_use]
    pub fn with_container(mut self, container: Option<Arc<dyn Container>>) -> Self {
        self.container = container;
        self
    }

    /// Skips middleware for every field.
    #[must_use]
    pub fn with_simple_resolvers(mut self, simple: bool) -> Self {
        self.simple_resolvers = simple;
        self
    }

    /// Builds the resolver of `type_name.field_name`.
    pub fn compose(&self, type_name: &str, field_name: &str, spec: ResolverSpec) -> Arc<dyn Resolver> {
        let root = RootResolver::new(spec.property, spec.default_value);

        let base: Arc<dyn Resolver> = match (spec.handler, &self.container) {
            (Some(binding), Some(container)) => Arc::new(DelegateResolver {
                binding,
                container: Arc::clone(container),
                fallback: root,
            }),
            (Some(binding), None) => {
                warn!(
                    type_name,
                    field_name,
                    handler = %binding.handler,
                    "field has a resolver handler but no container is configured"
                );
                Arc::new(root)
            }
            (None, _) => Arc::new(root),
        };

        if spec.simple || self.simple_resolvers {
            trace!(type_name, field_name, "composed simple resolver");
            return base;
        }

        let middlewares: Vec<_> = self
            .global_middlewares
            .iter()
            .chain(&spec.middlewares)
            .cloned()
            .collect();
        trace!(type_name, field_name, middlewares = middlewares.len(), "composed resolver");

        if middlewares.is_empty() {
            base
        } else {
            Arc::new(MiddlewareResolver::new(middlewares, base))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{FieldResolverHandler, Scope, ScopedContainer};
    use crate::context::RequestId;
    use crate::middleware::Next;
    use crate::resolver::ResolverResult;
    use crate::ContainerError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    async fn call(resolver: &dyn Resolver, root: Value) -> ResolverResult {
        let args = ResolverArgs::new();
        let ctx = Context::new();
        let info = ResolverInfo::new("count", "Stats");
        resolver.resolve(&root, &args, &ctx, &info).await
    }

    #[tokio::test]
    async fn test_root_policy() {
        let compositor = FieldResolverCompositor::default();
        let resolver = compositor.compose(
            "Stats",
            "count",
            ResolverSpec {
                default_value: Some(json!(0)),
                ..ResolverSpec::new("count")
            },
        );

        assert_eq!(call(resolver.as_ref(), json!({"count": 5})).await.unwrap(), json!(5));
        assert_eq!(call(resolver.as_ref(), json!({})).await.unwrap(), json!(0));
        assert_eq!(
            call(resolver.as_ref(), json!({"count": null})).await.unwrap(),
            Value::Null
        );
    }

    #[tokio::test]
    async fn test_root_policy_without_default() {
        let resolver = FieldResolverCompositor::default().compose(
            "Stats",
            "count",
            ResolverSpec::new("count"),
        );
        assert_eq!(call(resolver.as_ref(), json!([1, 2])).await.unwrap(), Value::Null);
    }

    struct StatsHandler;

    #[async_trait]
    impl FieldResolverHandler for StatsHandler {
        async fn call(&self, method: &str, params: ResolverParams<'_>) -> Option<ResolverResult> {
            match method {
                "count" => Some(Ok(json!({"computed": params.root["count"]}))),
                _ => None,
            }
        }
    }

    #[tokio::test]
    async fn test_handler_result_used_verbatim() {
        let container: Arc<dyn Container> =
            Arc::new(ScopedContainer::new().with(Scope::Request, || StatsHandler));
        let compositor = FieldResolverCompositor::default().with_container(Some(container));
        let resolver = compositor.compose(
            "Stats",
            "count",
            ResolverSpec {
                handler: Some(HandlerBinding::of::<StatsHandler>("count")),
                ..ResolverSpec::new("count")
            },
        );

        assert_eq!(
            call(resolver.as_ref(), json!({"count": 3})).await.unwrap(),
            json!({"computed": 3})
        );
    }

    #[tokio::test]
    async fn test_missing_method_falls_through() {
        let container: Arc<dyn Container> =
            Arc::new(ScopedContainer::new().with(Scope::Singleton, || StatsHandler));
        let compositor = FieldResolverCompositor::default().with_container(Some(container));
        let resolver = compositor.compose(
            "Stats",
            "count",
            ResolverSpec {
                handler: Some(HandlerBinding::of::<StatsHandler>("total")),
                ..ResolverSpec::new("count")
            },
        );

        assert_eq!(call(resolver.as_ref(), json!({"count": 3})).await.unwrap(), json!(3));
    }

    #[tokio::test]
    async fn test_unregistered_handler_falls_through() {
        let container: Arc<dyn Container> = Arc::new(ScopedContainer::new());
        let compositor = FieldResolverCompositor::default().with_container(Some(container));
        let resolver = compositor.compose(
            "Stats",
            "count",
            ResolverSpec {
                handler: Some(HandlerBinding::of::<StatsHandler>("count")),
                ..ResolverSpec::new("count")
            },
        );

        assert_eq!(call(resolver.as_ref(), json!({"count": 3})).await.unwrap(), json!(3));
    }

    struct BrokenContainer;

    #[async_trait]
    impl Container for BrokenContainer {
        async fn resolve_instance(
            &self,
            handler: EntityId,
            _request: RequestId,
            _strict: bool,
        ) -> Result<Option<Arc<dyn FieldResolverHandler>>, ContainerError> {
            Err(ContainerError::Provider {
                handler,
                message: "database unavailable".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_handler_resolution_failure_is_not_masked() {
        let container: Arc<dyn Container> = Arc::new(BrokenContainer);
        let compositor = FieldResolverCompositor::default().with_container(Some(container));
        let resolver = compositor.compose(
            "Stats",
            "count",
            ResolverSpec {
                handler: Some(HandlerBinding::of::<StatsHandler>("count")),
                ..ResolverSpec::new("count")
            },
        );

        let err = call(resolver.as_ref(), json!({"count": 3})).await.unwrap_err();
        assert!(matches!(err, ResolverError::HandlerResolution(_)));
        assert_eq!(
            err.to_string(),
            "Failed to resolve field resolver handler: provider for `StatsHandler` failed: database unavailable"
        );
    }

    struct Record {
        label: &'static str,
        trace: Arc<Mutex<Vec<String>>>,
    }

    impl FieldMiddleware for Record {
        fn handle<'a>(&'a self, _params: ResolverParams<'a>, next: Next<'a>) -> ResolverFuture<'a> {
            Box::pin(async move {
                self.trace.lock().unwrap().push(self.label.to_string());
                next.run().await
            })
        }
    }

    #[tokio::test]
    async fn test_global_middleware_runs_outer() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let global: Arc<dyn FieldMiddleware> = Arc::new(Record {
            label: "global",
            trace: Arc::clone(&trace),
        });
        let local: Arc<dyn FieldMiddleware> = Arc::new(Record {
            label: "field",
            trace: Arc::clone(&trace),
        });

        let compositor = FieldResolverCompositor::new(vec![global]);
        let resolver = compositor.compose(
            "Stats",
            "count",
            ResolverSpec {
                middlewares: vec![local],
                ..ResolverSpec::new("count")
            },
        );

        assert_eq!(call(resolver.as_ref(), json!({"count": 1})).await.unwrap(), json!(1));
        assert_eq!(*trace.lock().unwrap(), vec!["global", "field"]);
    }

    #[tokio::test]
    async fn test_simple_field_skips_middleware() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let global: Arc<dyn FieldMiddleware> = Arc::new(Record {
            label: "global",
            trace: Arc::clone(&trace),
        });

        let compositor = FieldResolverCompositor::new(vec![global]);
        let resolver = compositor.compose(
            "Stats",
            "count",
            ResolverSpec {
                simple: true,
                ..ResolverSpec::new("count")
            },
        );

        assert_eq!(call(resolver.as_ref(), json!({"count": 1})).await.unwrap(), json!(1));
        assert!(trace.lock().unwrap().is_empty());
    }
}
