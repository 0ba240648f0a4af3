use confector_types::{Identifier, TypeError};
use thiserror::Error;

/// Errors raised while loading or querying schemata.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown value kind: {0}")]
    UnknownValueKind(String),

    #[error("config of property {property:?} is missing parameter {parameter:?}")]
    MissingConfigParameter { property: String, parameter: String },

    #[error(
        "config of property {property:?} has invalid parameter {parameter:?}: found {found}, expected {expected}"
    )]
    InvalidConfigParameter {
        property: String,
        parameter: String,
        found: String,
        expected: String,
    },

    /// A leaf without an identifier, or a box that carries one.
    #[error("property {property:?}: {reason}")]
    StructuralIdentifierViolation { property: String, reason: String },

    #[error("property not found in schema: {0}")]
    PropertyNotFound(Identifier),

    #[error("invalid definition of property {property:?}: {reason}")]
    InvalidDefinition { property: String, reason: String },

    #[error("identifier {ident} is used by more than one property ({first:?}, {second:?})")]
    DuplicateIdentifier {
        ident: Identifier,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Identifier(#[from] TypeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
