//! Schema layer for Confector.
//!
//! A Kubun archive holds one schema per collection. A schema is a tree of
//! property definitions whose leaves carry typed values and whose boxes only
//! group them. This crate validates those trees when they are loaded:
//!
//! - [`ValueKind`] — the closed set of property kinds and their static descriptors
//! - [`ConfigGrammar`] — per-kind config parameters and their expected [`Shape`]
//! - [`PropertyDef`] — a validated property tree with pre-order [`Leaves`]
//! - [`Schema`] — `main`/`mini` trees plus an identifier lookup of `main`'s leaves
//!
//! Cross-collection link resolution happens later, once all schemata of an
//! archive are known; see `confector-core`.

pub mod error;
pub mod grammar;
pub mod kind;
pub mod property;
pub mod schema;

pub use error::{SchemaError, SchemaResult};
pub use grammar::{ConfigGrammar, ConfigParam, Shape};
pub use kind::{AssignmentType, ValueKind};
pub use property::{DefinitionValue, Leaves, LinkTarget, PropertyDef, PropertyDefinition};
pub use schema::{Schema, SchemaDefinition};
