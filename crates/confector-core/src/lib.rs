//! Collection registry for Confector.
//!
//! Turns schemata and source records into a Kubun archive:
//!
//! 1. register one [`Schema`] per collection,
//! 2. check the schemata, which resolves every cross-collection link into a
//!    [`LinkTable`],
//! 3. build [`Node`]s, assigning each property through the registry so the
//!    value is cast to its declared kind,
//! 4. finalize, which writes the staged nodes and the metadata and closes
//!    the archive.
//!
//! [`Confector`] encodes the stages in its type; [`Session`] wraps it for
//! callers that need a single handle and runtime stage errors.
//!
//! ```
//! use confector_core::{ArchiveMetadata, Confector, Node, Schema};
//! use confector_pack::InMemoryArchive;
//!
//! # fn main() -> Result<(), confector_core::ConfectorError> {
//! let schema = Schema::from_json(r#"{
//!     "main": {"title": "", "type": "KubunBox", "value": [
//!         {"title": "Legs", "ident": "bc1e7372-3c89-44e1-853b-6c97b24fb8a4", "prop_type": "KubunInt"}
//!     ]},
//!     "mini": {"title": "", "type": "KubunBox", "value": []}
//! }"#)?;
//!
//! let mut confector = Confector::new(InMemoryArchive::new());
//! confector.register_schema("animal", schema)?;
//! let mut confector = confector.check_schemata()?;
//!
//! let mut node = Node::new("Aardvark");
//! confector.add_property("animal", "bc1e7372-3c89-44e1-853b-6c97b24fb8a4", &mut node, "4", false)?;
//! confector.add_node("animal", &node)?;
//!
//! let summary = confector.finalize(&ArchiveMetadata::new("animals"))?;
//! assert_eq!(summary.total_nodes(), 1);
//! # Ok(())
//! # }
//! ```

pub mod cast;
pub mod error;
pub mod link;
pub mod metadata;
pub mod node;
pub mod registry;
pub mod session;
pub mod value;

pub use cast::{try_cast, CastError};
pub use error::{ConfectorError, ConfectorResult};
pub use link::{LinkTable, OutboundLink};
pub use metadata::{ArchiveMetadata, Attribution};
pub use node::Node;
pub use registry::{ArchiveSummary, Building, Checked, Confector, Rejected, Stage};
pub use session::Session;
pub use value::{RawValue, Selector, TypedValue};

pub use confector_schema::{PropertyDef, Schema, ValueKind};
pub use confector_types::Identifier;
