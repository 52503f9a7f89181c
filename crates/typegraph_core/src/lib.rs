//! Core types for typegraph.
//!
//! This crate provides foundational types used throughout typegraph:
//! - `entity`: Identities of declaring entities
//! - `span`: Source location tracking for directive syntax
//! - `diagnostics`: Syntax error collection
//! - `error`: Schema build errors

pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod span;

pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticSeverity, Label};
pub use entity::EntityId;
pub use error::{BuildError, BuildResult, ReferenceKind};
pub use span::Span;
