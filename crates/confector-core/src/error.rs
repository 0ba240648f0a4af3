use confector_pack::PackError;
use confector_schema::{SchemaError, ValueKind};
use confector_types::{Identifier, TypeError};
use serde_json::Value;
use thiserror::Error;

/// Errors raised by the collection registry.
#[derive(Debug, Error)]
pub enum ConfectorError {
    #[error("link {property} in collection {collection:?} targets unregistered collection {target_tag:?}")]
    UnresolvedLinkCollection {
        collection: String,
        property: Identifier,
        target_tag: String,
    },

    #[error(
        "link {property} in collection {collection:?} targets unknown property {target_ident:?} of collection {target_tag:?}"
    )]
    UnresolvedLinkProperty {
        collection: String,
        property: Identifier,
        target_tag: String,
        target_ident: String,
    },

    #[error(
        "link {property} in collection {collection:?} targets property {target_ident:?} of collection {target_tag:?}, whose kind {kind} cannot be selected"
    )]
    UnselectableLinkTarget {
        collection: String,
        property: Identifier,
        target_tag: String,
        target_ident: String,
        kind: ValueKind,
    },

    /// Nodes were added before the registered schemata were checked.
    #[error("schemata are not checked; call check_schemata after registering all schemata")]
    NotReady,

    #[error("unknown collection: {0:?}")]
    UnknownCollection(String),

    #[error("property {property} not found in schema of collection {collection:?}")]
    PropertyNotFound {
        collection: String,
        property: Identifier,
    },

    #[error("link {property} in collection {collection:?} has no resolved target; does it declare one?")]
    LinkTargetUnresolved {
        collection: String,
        property: Identifier,
    },

    #[error("cannot cast {value} to {expected} for property {property} in collection {collection:?}: {reason}")]
    CastFailure {
        collection: String,
        property: Identifier,
        value: Value,
        expected: String,
        reason: String,
    },

    #[error("value for property {property} in collection {collection:?} has type {found}, expected {expected}")]
    TypeInvariantViolation {
        collection: String,
        property: Identifier,
        found: String,
        expected: String,
    },

    #[error("property {property} is already set on node {node:?} in collection {collection:?}")]
    DuplicateProperty {
        collection: String,
        property: Identifier,
        node: String,
    },

    #[error("null value for property {property} in collection {collection:?} while nulls are rejected")]
    UnexpectedNull {
        collection: String,
        property: Identifier,
    },

    #[error("confector is finalized already")]
    AlreadyFinalized,

    #[error("collection {0:?} is already registered with a different schema")]
    DuplicateCollection(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Identifier(#[from] TypeError),

    #[error("archive error: {0}")]
    Archive(#[from] PackError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for registry operations.
pub type ConfectorResult<T> = Result<T, ConfectorError>;
