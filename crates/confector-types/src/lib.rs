//! Foundation types for Confector.
//!
//! Every property definition and every node property in a Kubun archive is
//! keyed by an [`Identifier`]: a UUID restricted to version 4. All other
//! Confector crates depend on `confector-types`.
//!
//! # Key Types
//!
//! - [`Identifier`] — validated UUID v4 key for properties
//! - [`IntoIdentifier`] — accepts either a string or an existing identifier
//! - [`TypeError`] — construction failures

pub mod error;
pub mod identity;

pub use error::TypeError;
pub use identity::{Identifier, IntoIdentifier};
