//! Memoized deferred values.
//!
//! A [`Deferred`] holds a source that is evaluated on first access. The result,
//! including a failure, is stored and returned on every later access. Sources
//! are owned trait objects and never borrow mutable outer state.

use std::fmt;
use std::sync::OnceLock;
use typegraph_core::BuildResult;

/// Producer of a deferred value.
pub trait DeferredSource<T>: Send + Sync {
    /// Computes the value. Called at most once per [`Deferred`].
    fn evaluate(&self) -> BuildResult<T>;
}

impl<T, F> DeferredSource<T> for F
where
    F: Fn() -> BuildResult<T> + Send + Sync,
{
    fn evaluate(&self) -> BuildResult<T> {
        self()
    }
}

/// A value computed on first access and memoized.
pub struct Deferred<T> {
    cell: OnceLock<BuildResult<T>>,
    source: Option<Box<dyn DeferredSource<T>>>,
}

impl<T> Deferred<T> {
    /// Creates a deferred value from a source.
    pub fn new(source: impl DeferredSource<T> + 'static) -> Self {
        Self {
            cell: OnceLock::new(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an already evaluated value.
    pub fn ready(value: T) -> Self {
        Self {
            cell: OnceLock::from(Ok(value)),
            source: None,
        }
    }

    /// Returns the value, evaluating the source on first access.
    ///
    /// Concurrent first accesses block until the single evaluation finishes.
    pub fn get(&self) -> BuildResult<&T> {
        let result = self.cell.get_or_init(|| match &self.source {
            Some(source) => source.evaluate(),
            None => unreachable!("a deferred value without source is created evaluated"),
        });
        result.as_ref().map_err(Clone::clone)
    }

    /// Returns true once the source has been evaluated.
    pub fn is_evaluated(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(Ok(value)) => f.debug_tuple("Deferred").field(value).finish(),
            Some(Err(err)) => f.debug_tuple("Deferred").field(err).finish(),
            None => f.write_str("Deferred(<pending>)"),
        }
    }
}
