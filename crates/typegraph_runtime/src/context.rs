//! Request context and field errors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one request, used to scope handler instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocates a fresh request identity.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a request identity from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Execution context.
#[derive(Debug, Clone)]
pub struct Context {
    /// Request-scoped data.
    pub data: HashMap<String, serde_json::Value>,
    request_id: RequestId,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a new context with a fresh request identity.
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            request_id: RequestId::next(),
        }
    }

    /// Replaces the request identity.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns the request identity.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Sets a value in the context.
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        if let Ok(v) = serde_json::to_value(value) {
            self.data.insert(key.into(), v);
        }
    }

    /// Gets a value from the context.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// A field error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// The error message.
    pub message: String,
    /// The path to the field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    /// Error extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<HashMap<String, serde_json::Value>>,
}

/// A path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl FieldError {
    /// Creates a new field error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }

    /// Adds a path to the error.
    #[must_use]
    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = Some(path);
        self
    }

    /// Adds an extension.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }

    /// Sets the error code extension.
    #[must_use]
    pub fn with_code(self, code: impl Into<String>) -> Self {
        self.with_extension("code", serde_json::Value::String(code.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context() {
        let mut ctx = Context::new();
        ctx.set("user_id", 42);
        assert_eq!(ctx.get::<i32>("user_id"), Some(42));
        assert_eq!(ctx.get::<i32>("missing"), None);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = Context::new();
        let b = Context::new();
        assert_ne!(a.request_id(), b.request_id());

        let pinned = Context::new().with_request_id(RequestId::from_raw(7));
        assert_eq!(pinned.request_id().to_string(), "req-7");
        assert_eq!(pinned.clone().request_id(), pinned.request_id());
    }

    #[test]
    fn test_field_error_serialization() {
        let error = FieldError::new("boom")
            .with_path(vec![PathSegment::Field("user".into()), PathSegment::Index(0)])
            .with_code("RESOLVER_ERROR");
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            serde_json::json!({
                "message": "boom",
                "path": ["user", 0],
                "extensions": {"code": "RESOLVER_ERROR"}
            })
        );
    }
}
