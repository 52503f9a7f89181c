//! Field middleware.
//!
//! Middleware wraps a field's resolver. Each one receives the original call
//! arguments and a [`Next`] handle; it may run code before and after calling
//! `next.run()`, transform the result, or return without calling it at all.

use crate::context::Context;
use crate::resolver::{Resolver, ResolverArgs, ResolverFuture, ResolverInfo, ResolverParams};
use serde_json::Value;
use std::sync::Arc;

/// An interceptor around a field resolver.
pub trait FieldMiddleware: Send + Sync {
    /// Handles one resolver invocation.
    fn handle<'a>(&'a self, params: ResolverParams<'a>, next: Next<'a>) -> ResolverFuture<'a>;
}

/// The rest of a middleware chain.
pub struct Next<'a> {
    params: ResolverParams<'a>,
    chain: &'a [Arc<dyn FieldMiddleware>],
    resolver: &'a dyn Resolver,
}

impl<'a> Next<'a> {
    /// Runs the remaining middleware and the resolver with the original arguments.
    pub fn run(self) -> ResolverFuture<'a> {
        match self.chain.split_first() {
            Some((middleware, rest)) => middleware.handle(
                self.params,
                Next {
                    params: self.params,
                    chain: rest,
                    resolver: self.resolver,
                },
            ),
            None => self.params.call(self.resolver),
        }
    }
}

/// A resolver wrapped by an ordered list of middleware.
///
/// The first middleware is the outermost one.
pub struct MiddlewareResolver {
    middlewares: Vec<Arc<dyn FieldMiddleware>>,
    inner: Arc<dyn Resolver>,
}

impl MiddlewareResolver {
    /// Wraps `inner` with `middlewares`.
    pub fn new(middlewares: Vec<Arc<dyn FieldMiddleware>>, inner: Arc<dyn Resolver>) -> Self {
        Self { middlewares, inner }
    }

    /// Returns the number of middleware in the chain.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns true if the chain has no middleware.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl Resolver for MiddlewareResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        Next {
            params: ResolverParams::new(parent, args, ctx, info),
            chain: &self.middlewares,
            resolver: self.inner.as_ref(),
        }
        .run()
    }
}
