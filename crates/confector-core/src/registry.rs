//! # Collection registry
//!
//! [`Confector`] moves through two stages, each a distinct type:
//!
//! ```text
//! Confector<Building> ──check_schemata()──▶ Confector<Checked>
//!        ▲                                        │
//!        └──────────register_schema()─────────────┘
//!
//! finalize() consumes either stage.
//! ```
//!
//! Nodes and properties can only be added to a `Confector<Checked>`, so a
//! late schema registration always forces a new link check:
//!
//! ```compile_fail
//! use confector_core::{Confector, Node};
//! use confector_pack::InMemoryArchive;
//!
//! let mut confector = Confector::new(InMemoryArchive::new());
//! // ERROR: no method named `add_node` found for `Confector<Building>`
//! let _ = confector.add_node("animal", &Node::new("Aardvark"));
//! ```
//!
//! `finalize` takes the registry by value; nothing can be called on it
//! afterwards:
//!
//! ```compile_fail
//! use confector_core::{ArchiveMetadata, Confector, Schema};
//! use confector_pack::InMemoryArchive;
//!
//! let mut confector = Confector::new(InMemoryArchive::new());
//! let _ = confector.finalize(&ArchiveMetadata::default());
//! // ERROR: borrow of moved value: `confector`
//! let _ = confector.register_schema("animal", Schema::empty());
//! ```

use std::borrow::Borrow;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use confector_pack::{ArchiveStore, PackArchive, PackConfig};
use confector_schema::{AssignmentType, PropertyDef, Schema};
use confector_types::{Identifier, IntoIdentifier};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::cast;
use crate::error::{ConfectorError, ConfectorResult};
use crate::link::{self, LinkTable};
use crate::node::Node;
use crate::value::{RawValue, Selector, TypedValue};

// ─── Stages ──────────────────────────────────────────────────────────

/// Stage: accepting schema registrations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Building;

/// Stage: links resolved, accepting nodes.
#[derive(Debug, Clone)]
pub struct Checked {
    links: LinkTable,
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Building {}
    impl Sealed for super::Checked {}
}

/// Marker trait for registry stages.
pub trait Stage: private::Sealed + fmt::Debug {
    fn name() -> &'static str;
}

impl Stage for Building {
    fn name() -> &'static str {
        "building"
    }
}

impl Stage for Checked {
    fn name() -> &'static str {
        "checked"
    }
}

// ─── Registry ────────────────────────────────────────────────────────

/// Registers collection schemata, validates nodes against them and writes
/// the result to an archive.
pub struct Confector<S: Stage = Building> {
    schemata: BTreeMap<String, Schema>,
    node_counts: BTreeMap<String, u64>,
    staging: BTreeMap<String, StagingBuffer>,
    archive: Box<dyn ArchiveStore>,
    stage: S,
}

/// A failed transition: the error plus the registry, unchanged.
pub struct Rejected<S: Stage> {
    pub error: ConfectorError,
    pub confector: Confector<S>,
}

impl<S: Stage> Rejected<S> {
    pub fn into_parts(self) -> (ConfectorError, Confector<S>) {
        (self.error, self.confector)
    }
}

impl<S: Stage> fmt::Debug for Rejected<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .field("confector", &self.confector)
            .finish()
    }
}

impl<S: Stage> fmt::Display for Rejected<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl<S: Stage> std::error::Error for Rejected<S> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<S: Stage> From<Rejected<S>> for ConfectorError {
    fn from(rejected: Rejected<S>) -> Self {
        rejected.error
    }
}

/// What `finalize` wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Nodes added per collection.
    pub node_counts: BTreeMap<String, u64>,
    /// Entry paths of the closed archive, sorted.
    pub entries: Vec<String>,
}

impl ArchiveSummary {
    pub fn total_nodes(&self) -> u64 {
        self.node_counts.values().sum()
    }
}

impl Confector<Building> {
    /// Start a registry writing into `archive`.
    pub fn new(archive: impl ArchiveStore + 'static) -> Self {
        Self {
            schemata: BTreeMap::new(),
            node_counts: BTreeMap::new(),
            staging: BTreeMap::new(),
            archive: Box::new(archive),
            stage: Building,
        }
    }

    /// Start a registry writing a new pack file at `path`.
    ///
    /// Fails right away if the pack file's directory cannot be written.
    pub fn create(path: impl Into<PathBuf>, config: PackConfig) -> ConfectorResult<Self> {
        Ok(Self::new(PackArchive::create(path, config)?))
    }

    /// Register (or re-register) the schema of a collection.
    ///
    /// The schema is written to `schemata/<name>.json` right away.
    /// Re-registering a name is allowed only with an equal schema.
    pub fn register_schema(&mut self, name: &str, schema: Schema) -> ConfectorResult<()> {
        self.insert_schema(name, schema)
    }

    /// Resolve every outbound link and move to [`Checked`].
    pub fn check_schemata(self) -> Result<Confector<Checked>, Rejected<Building>> {
        match LinkTable::build(&self.schemata) {
            Ok(links) => {
                debug!(
                    collections = self.schemata.len(),
                    links = links.len(),
                    "schemata checked"
                );
                Ok(self.into_stage(Checked { links }))
            }
            Err(error) => Err(Rejected {
                error,
                confector: self,
            }),
        }
    }
}

impl Confector<Checked> {
    /// Register (or re-register) a schema. The registry goes back to
    /// [`Building`] and must be checked again before nodes are added.
    pub fn register_schema(
        mut self,
        name: &str,
        schema: Schema,
    ) -> Result<Confector<Building>, Rejected<Checked>> {
        match self.insert_schema(name, schema) {
            Ok(()) => Ok(self.into_stage(Building)),
            Err(error) => Err(Rejected {
                error,
                confector: self,
            }),
        }
    }

    /// Resolved link targets.
    pub fn link_table(&self) -> &LinkTable {
        &self.stage.links
    }

    /// Stage a node for `collection`. Nodes are written in the order they
    /// are added.
    pub fn add_node(&mut self, collection: &str, node: &Node) -> ConfectorResult<()> {
        if !self.schemata.contains_key(collection) {
            return Err(ConfectorError::UnknownCollection(collection.to_string()));
        }
        let buffer = match self.staging.entry(collection.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!(collection, "opened staging buffer");
                entry.insert(StagingBuffer::new()?)
            }
        };
        buffer.append(node)?;
        *self.node_counts.entry(collection.to_string()).or_default() += 1;
        trace!(collection, title = node.title(), "staged node");
        Ok(())
    }

    /// Stage several nodes, stopping at the first failure.
    pub fn add_nodes<I>(&mut self, collection: &str, nodes: I) -> ConfectorResult<()>
    where
        I: IntoIterator,
        I::Item: Borrow<Node>,
    {
        for node in nodes {
            self.add_node(collection, node.borrow())?;
        }
        Ok(())
    }

    /// Cast `value` for `property` and set it on `node`.
    ///
    /// A null value is skipped unless `reject_null` is set. Link properties
    /// take a scalar or a list; an empty list is skipped.
    pub fn add_property(
        &self,
        collection: &str,
        property: impl IntoIdentifier,
        node: &mut Node,
        value: impl Into<RawValue>,
        reject_null: bool,
    ) -> ConfectorResult<()> {
        let property = property.into_identifier()?;
        let value = value.into();

        if value.is_null() {
            if reject_null {
                return Err(ConfectorError::UnexpectedNull {
                    collection: collection.to_string(),
                    property,
                });
            }
            trace!(collection, %property, "null value skipped");
            return Ok(());
        }

        let schema = self
            .schemata
            .get(collection)
            .ok_or_else(|| ConfectorError::UnknownCollection(collection.to_string()))?;
        let definition =
            schema
                .get_property(property)
                .map_err(|_| ConfectorError::PropertyNotFound {
                    collection: collection.to_string(),
                    property,
                })?;
        let expected = definition.kind().expected_assignment_type();

        let cast = match expected {
            AssignmentType::Selector => {
                match self.cast_selector(collection, property, value)? {
                    Some(selector) => TypedValue::Selector(selector),
                    None => {
                        trace!(collection, %property, "empty selector skipped");
                        return Ok(());
                    }
                }
            }
            AssignmentType::Kind(_) => cast_leaf(collection, property, definition, value)?,
        };

        let found = cast.assignment_type();
        if found != expected {
            return Err(ConfectorError::TypeInvariantViolation {
                collection: collection.to_string(),
                property,
                found: found.to_string(),
                expected: expected.to_string(),
            });
        }

        if !node.insert(property, cast) {
            return Err(ConfectorError::DuplicateProperty {
                collection: collection.to_string(),
                property,
                node: node.title().to_string(),
            });
        }
        Ok(())
    }

    /// Assign several properties in order, stopping at the first failure.
    pub fn add_properties<I, K, V>(
        &self,
        collection: &str,
        node: &mut Node,
        values: I,
        reject_null: bool,
    ) -> ConfectorResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: IntoIdentifier,
        V: Into<RawValue>,
    {
        for (property, value) in values {
            self.add_property(collection, property, node, value, reject_null)?;
        }
        Ok(())
    }

    fn cast_selector(
        &self,
        collection: &str,
        property: Identifier,
        value: RawValue,
    ) -> ConfectorResult<Option<Selector>> {
        let items: Vec<Value> = match value {
            RawValue::Typed(TypedValue::Selector(selector)) => {
                selector.values().iter().map(TypedValue::to_json).collect()
            }
            other => match other.to_json() {
                Value::Array(items) => items,
                scalar => vec![scalar],
            },
        };
        if items.is_empty() {
            return Ok(None);
        }

        let target = self.stage.links.target_kind(&property).ok_or_else(|| {
            ConfectorError::LinkTargetUnresolved {
                collection: collection.to_string(),
                property,
            }
        })?;

        let values = items
            .into_iter()
            .map(|item| {
                cast::try_cast(&item, target).map_err(|e| ConfectorError::CastFailure {
                    collection: collection.to_string(),
                    property,
                    value: item,
                    expected: target.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<ConfectorResult<Vec<_>>>()?;

        Selector::new(target, values)
            .map(Some)
            .ok_or_else(|| ConfectorError::TypeInvariantViolation {
                collection: collection.to_string(),
                property,
                found: "mixed selector".into(),
                expected: target.to_string(),
            })
    }
}

fn cast_leaf(
    collection: &str,
    property: Identifier,
    definition: &PropertyDef,
    value: RawValue,
) -> ConfectorResult<TypedValue> {
    let kind = definition.kind();
    if let RawValue::Typed(typed) = value {
        if typed.kind() == Some(kind) {
            return Ok(typed);
        }
        return cast_leaf(collection, property, definition, RawValue::Json(typed.to_json()));
    }
    let json = value.to_json();
    cast::cast_for(definition, &json).map_err(|e| ConfectorError::CastFailure {
        collection: collection.to_string(),
        property,
        value: json,
        expected: kind.to_string(),
        reason: e.to_string(),
    })
}

impl<S: Stage> Confector<S> {
    fn into_stage<T: Stage>(self, stage: T) -> Confector<T> {
        Confector {
            schemata: self.schemata,
            node_counts: self.node_counts,
            staging: self.staging,
            archive: self.archive,
            stage,
        }
    }

    fn insert_schema(&mut self, name: &str, schema: Schema) -> ConfectorResult<()> {
        if let Some(existing) = self.schemata.get(name) {
            if *existing != schema {
                return Err(ConfectorError::DuplicateCollection(name.to_string()));
            }
        }
        self.archive
            .write_entry(&format!("schemata/{name}.json"), &schema.to_json()?)?;
        debug!(
            collection = name,
            properties = schema.property_count(),
            "registered schema"
        );
        self.schemata.insert(name.to_string(), schema);
        Ok(())
    }

    pub fn schema(&self, collection: &str) -> Option<&Schema> {
        self.schemata.get(collection)
    }

    /// Registered collection names, sorted.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.schemata.keys().map(String::as_str)
    }

    pub fn node_count(&self, collection: &str) -> u64 {
        self.node_counts.get(collection).copied().unwrap_or(0)
    }

    pub fn node_counts(&self) -> &BTreeMap<String, u64> {
        &self.node_counts
    }

    /// Source collection -> target collections of all outbound links.
    pub fn link_graph(&self) -> BTreeMap<String, Vec<String>> {
        link::link_graph(&self.schemata)
    }

    /// Printable overview of links and schemata.
    pub fn outline(&self) -> String {
        let graph = self.link_graph();
        let width = graph
            .iter()
            .flat_map(|(source, targets)| std::iter::once(source).chain(targets))
            .map(String::len)
            .max()
            .unwrap_or(0);

        let mut out = String::from("Links:\n");
        for (source, targets) in &graph {
            let _ = writeln!(out, "{source:<w$} -> {}", targets.join(", "), w = width + 5);
        }
        out.push_str("\nSchemata:\n");
        for (name, schema) in &self.schemata {
            let _ = write!(out, "\n{name}\n{}\n{}", "-".repeat(25), schema.outline());
        }
        out
    }

    /// Write all staged nodes and `metadata`, then close the archive.
    ///
    /// The archive is closed even if writing an entry fails; the first
    /// error is returned.
    pub fn finalize(self, metadata: &impl Serialize) -> ConfectorResult<ArchiveSummary> {
        let Confector {
            mut archive,
            staging,
            node_counts,
            ..
        } = self;
        let mut first_error: Option<ConfectorError> = None;

        let mut by_count: Vec<_> = node_counts.iter().collect();
        by_count.sort_by(|a, b| b.1.cmp(a.1));
        for (collection, count) in by_count {
            info!(%collection, nodes = count, "writing nodes");
        }

        for (collection, buffer) in staging {
            let result = buffer
                .into_bytes()
                .map_err(ConfectorError::from)
                .and_then(|data| {
                    archive
                        .write_entry(&format!("data/{collection}.json"), &data)
                        .map_err(ConfectorError::from)
                });
            if let Err(err) = result {
                keep_first(&mut first_error, err, "data");
            }
        }

        let meta = serde_json::to_vec(metadata)
            .map_err(ConfectorError::from)
            .and_then(|bytes| {
                archive
                    .write_entry("meta.json", &bytes)
                    .map_err(ConfectorError::from)
            });
        if let Err(err) = meta {
            keep_first(&mut first_error, err, "metadata");
        }

        if let Err(err) = archive.close() {
            keep_first(&mut first_error, err.into(), "close");
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        let entries = archive.list_entries("**")?;
        info!(entries = entries.len(), "archive finalized");
        Ok(ArchiveSummary {
            node_counts,
            entries,
        })
    }
}

fn keep_first(slot: &mut Option<ConfectorError>, err: ConfectorError, step: &str) {
    warn!(step, error = %err, "finalize step failed, continuing to close the archive");
    slot.get_or_insert(err);
}

impl<S: Stage> fmt::Debug for Confector<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Confector")
            .field("stage", &S::name())
            .field("collections", &self.schemata.keys().collect::<Vec<_>>())
            .field("node_counts", &self.node_counts)
            .finish()
    }
}

// ─── Staging ─────────────────────────────────────────────────────────

/// Anonymous temporary file holding one serialized node per line.
struct StagingBuffer {
    file: BufWriter<File>,
}

impl StagingBuffer {
    fn new() -> std::io::Result<Self> {
        Ok(Self {
            file: BufWriter::new(tempfile::tempfile()?),
        })
    }

    fn append(&mut self, node: &Node) -> ConfectorResult<()> {
        serde_json::to_writer(&mut self.file, node)?;
        self.file.write_all(b"\n")?;
        Ok(())
    }

    fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        let mut file = self.file.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(0))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }
}
