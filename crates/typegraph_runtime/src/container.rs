//! Dependency injection for field resolver handlers.
//!
//! A field resolver handler is a component that computes the values of some
//! fields instead of reading them from the root value. Its instances come from
//! a [`Container`], which decides their lifetime.

use crate::context::{Context, RequestId};
use crate::resolver::{ResolverParams, ResolverResult};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use thiserror::Error;
use tracing::debug;
use typegraph_core::EntityId;

/// A component that resolves fields through named methods.
#[async_trait]
pub trait FieldResolverHandler: Send + Sync {
    /// Invokes `method` with the original resolver arguments.
    ///
    /// Returns `None` if the handler does not expose `method`.
    async fn call(&self, method: &str, params: ResolverParams<'_>) -> Option<ResolverResult>;
}

/// Error raised while obtaining a handler instance.
#[derive(Debug, Clone, Error)]
pub enum ContainerError {
    /// A strict lookup found no provider.
    #[error("no provider registered for `{handler}`")]
    NotRegistered { handler: EntityId },

    /// The provider exists but failed to produce an instance.
    #[error("provider for `{handler}` failed: {message}")]
    Provider { handler: EntityId, message: String },
}

/// Source of handler instances.
#[async_trait]
pub trait Container: Send + Sync {
    /// Derives the request identity used to scope instances.
    fn request_id(&self, ctx: &Context) -> RequestId {
        ctx.request_id()
    }

    /// Returns the instance of `handler` for `request`.
    ///
    /// A non-strict lookup of an unknown handler yields `Ok(None)`; a strict
    /// one fails with [`ContainerError::NotRegistered`].
    async fn resolve_instance(
        &self,
        handler: EntityId,
        request: RequestId,
        strict: bool,
    ) -> Result<Option<Arc<dyn FieldResolverHandler>>, ContainerError>;
}

/// Lifetime of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One instance for the lifetime of the container.
    Singleton,
    /// One instance per request.
    Request,
}

type Factory = Arc<dyn Fn() -> Arc<dyn FieldResolverHandler> + Send + Sync>;

struct Provider {
    scope: Scope,
    factory: Factory,
    singleton: OnceLock<Arc<dyn FieldResolverHandler>>,
}

/// A container with singleton and request scopes.
///
/// Request-scoped instances stay cached until their request is released.
/// Callers must end every request, either with [`ScopedContainer::release`]
/// or by dropping the [`RequestScope`] returned from
/// [`ScopedContainer::scope`].
#[derive(Default)]
pub struct ScopedContainer {
    providers: RwLock<FxHashMap<EntityId, Arc<Provider>>>,
    request_instances: Mutex<FxHashMap<(RequestId, EntityId), Arc<dyn FieldResolverHandler>>>,
}

impl ScopedContainer {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for handler `H`.
    pub fn register<H, F>(&self, scope: Scope, factory: F)
    where
        H: FieldResolverHandler + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let provider = Provider {
            scope,
            factory: Arc::new(move || Arc::new(factory()) as Arc<dyn FieldResolverHandler>),
            singleton: OnceLock::new(),
        };
        self.providers
            .write()
            .expect("container providers lock poisoned")
            .insert(EntityId::of::<H>(), Arc::new(provider));
    }

    /// Registers a factory for handler `H` and returns the container.
    #[must_use]
    pub fn with<H, F>(self, scope: Scope, factory: F) -> Self
    where
        H: FieldResolverHandler + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.register::<H, F>(scope, factory);
        self
    }

    /// Drops every request-scoped instance created for `request`.
    pub fn release(&self, request: RequestId) {
        let mut instances = self
            .request_instances
            .lock()
            .expect("container instances lock poisoned");
        let before = instances.len();
        instances.retain(|(owner, _), _| *owner != request);
        debug!(%request, released = before - instances.len(), "released request scope");
    }

    /// Opens the request scope of `ctx`, released when the guard drops.
    pub fn scope(&self, ctx: &Context) -> RequestScope<'_> {
        RequestScope {
            container: self,
            request: self.request_id(ctx),
        }
    }

    fn provider(&self, handler: EntityId) -> Option<Arc<Provider>> {
        self.providers
            .read()
            .expect("container providers lock poisoned")
            .get(&handler)
            .cloned()
    }
}

/// Releases the request-scoped instances of one request on drop.
#[must_use = "dropping the scope releases the request immediately"]
pub struct RequestScope<'a> {
    container: &'a ScopedContainer,
    request: RequestId,
}

impl RequestScope<'_> {
    pub fn request_id(&self) -> RequestId {
        self.request
    }
}

impl Drop for RequestScope<'_> {
    fn drop(&mut self) {
        self.container.release(self.request);
    }
}

#[async_trait]
impl Container for ScopedContainer {
    async fn resolve_instance(
        &self,
        handler: EntityId,
        request: RequestId,
        strict: bool,
    ) -> Result<Option<Arc<dyn FieldResolverHandler>>, ContainerError> {
        let Some(provider) = self.provider(handler) else {
            return if strict {
                Err(ContainerError::NotRegistered { handler })
            } else {
                Ok(None)
            };
        };

        let instance = match provider.scope {
            Scope::Singleton => Arc::clone(provider.singleton.get_or_init(|| (provider.factory)())),
            Scope::Request => {
                let mut instances = self
                    .request_instances
                    .lock()
                    .expect("container instances lock poisoned");
                Arc::clone(
                    instances
                        .entry((request, handler))
                        .or_insert_with(|| (provider.factory)()),
                )
            }
        };
        Ok(Some(instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeter;

    #[async_trait]
    impl FieldResolverHandler for Greeter {
        async fn call(&self, method: &str, _params: ResolverParams<'_>) -> Option<ResolverResult> {
            (method == "greeting").then(|| Ok(serde_json::json!("hello")))
        }
    }

    struct Unregistered;

    #[async_trait]
    impl FieldResolverHandler for Unregistered {
        async fn call(&self, _method: &str, _params: ResolverParams<'_>) -> Option<ResolverResult> {
            None
        }
    }

    fn same(a: &Arc<dyn FieldResolverHandler>, b: &Arc<dyn FieldResolverHandler>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
    }

    #[tokio::test]
    async fn test_scopes() {
        let container = ScopedContainer::new().with(Scope::Request, || Greeter);
        let handler = EntityId::of::<Greeter>();
        let first = RequestId::from_raw(1);
        let second = RequestId::from_raw(2);

        let a = container.resolve_instance(handler, first, true).await.unwrap().unwrap();
        let b = container.resolve_instance(handler, first, true).await.unwrap().unwrap();
        let c = container.resolve_instance(handler, second, true).await.unwrap().unwrap();
        assert!(same(&a, &b));
        assert!(!same(&a, &c));

        container.release(first);
        let d = container.resolve_instance(handler, first, true).await.unwrap().unwrap();
        assert!(!same(&a, &d));
    }

    #[tokio::test]
    async fn test_request_scope_guard_releases_instances() {
        let container = ScopedContainer::new().with(Scope::Request, || Greeter);
        let handler = EntityId::of::<Greeter>();
        let ctx = Context::new().with_request_id(RequestId::from_raw(7));

        let first = {
            let scope = container.scope(&ctx);
            assert_eq!(scope.request_id(), RequestId::from_raw(7));
            let a = container
                .resolve_instance(handler, scope.request_id(), true)
                .await
                .unwrap()
                .unwrap();
            let b = container
                .resolve_instance(handler, scope.request_id(), true)
                .await
                .unwrap()
                .unwrap();
            assert!(same(&a, &b));
            a
        };

        let after = container
            .resolve_instance(handler, ctx.request_id(), true)
            .await
            .unwrap()
            .unwrap();
        assert!(!same(&first, &after));
    }

    #[tokio::test]
    async fn test_singleton_scope() {
        let container = ScopedContainer::new().with(Scope::Singleton, || Greeter);
        let handler = EntityId::of::<Greeter>();

        let a = container
            .resolve_instance(handler, RequestId::from_raw(1), false)
            .await
            .unwrap()
            .unwrap();
        let b = container
            .resolve_instance(handler, RequestId::from_raw(2), false)
            .await
            .unwrap()
            .unwrap();
        assert!(same(&a, &b));
    }

    #[tokio::test]
    async fn test_strict_and_lenient_misses() {
        let container = ScopedContainer::new();
        let handler = EntityId::of::<Unregistered>();
        let request = RequestId::from_raw(1);

        assert!(container
            .resolve_instance(handler, request, false)
            .await
            .unwrap()
            .is_none());

        let err = container
            .resolve_instance(handler, request, true)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ContainerError::NotRegistered { .. }));
    }
}
