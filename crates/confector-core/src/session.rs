use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::path::PathBuf;

use confector_pack::{ArchiveStore, PackConfig};
use confector_schema::Schema;
use confector_types::IntoIdentifier;
use serde::Serialize;
use tracing::debug;

use crate::error::{ConfectorError, ConfectorResult};
use crate::node::Node;
use crate::registry::{ArchiveSummary, Building, Checked, Confector, Rejected};
use crate::value::RawValue;

enum SessionStage {
    Building(Confector<Building>),
    Checked(Confector<Checked>),
    /// Transient while a transition or `finalize` runs.
    Finalizing,
    Closed,
}

/// A [`Confector`] held in one place across all stages.
///
/// The stage is tracked at runtime: node and property operations before a
/// successful [`check_schemata`](Self::check_schemata) fail with
/// [`ConfectorError::NotReady`], and every call after
/// [`finalize`](Self::finalize) fails with
/// [`ConfectorError::AlreadyFinalized`].
#[derive(Debug)]
pub struct Session {
    stage: SessionStage,
}

impl std::fmt::Debug for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Building(c) => c.fmt(f),
            Self::Checked(c) => c.fmt(f),
            Self::Finalizing => f.write_str("Finalizing"),
            Self::Closed => f.write_str("Closed"),
        }
    }
}

impl Session {
    pub fn new(archive: impl ArchiveStore + 'static) -> Self {
        Self::from(Confector::new(archive))
    }

    pub fn create(path: impl Into<PathBuf>, config: PackConfig) -> ConfectorResult<Self> {
        Confector::create(path, config).map(Self::from)
    }

    pub fn is_checked(&self) -> bool {
        matches!(self.stage, SessionStage::Checked(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.stage, SessionStage::Closed)
    }

    /// Register a schema. A checked session goes back to building.
    pub fn register_schema(&mut self, name: &str, schema: Schema) -> ConfectorResult<()> {
        match std::mem::replace(&mut self.stage, SessionStage::Finalizing) {
            SessionStage::Building(mut confector) => {
                let result = confector.register_schema(name, schema);
                self.stage = SessionStage::Building(confector);
                result
            }
            SessionStage::Checked(confector) => match confector.register_schema(name, schema) {
                Ok(building) => {
                    debug!(collection = name, "late registration, schemata need a new check");
                    self.stage = SessionStage::Building(building);
                    Ok(())
                }
                Err(Rejected { error, confector }) => {
                    self.stage = SessionStage::Checked(confector);
                    Err(error)
                }
            },
            other => {
                self.stage = other;
                Err(ConfectorError::AlreadyFinalized)
            }
        }
    }

    /// Resolve all links. A session that is already checked stays checked;
    /// on failure it stays building.
    pub fn check_schemata(&mut self) -> ConfectorResult<()> {
        match std::mem::replace(&mut self.stage, SessionStage::Finalizing) {
            SessionStage::Building(confector) => match confector.check_schemata() {
                Ok(checked) => {
                    self.stage = SessionStage::Checked(checked);
                    Ok(())
                }
                Err(Rejected { error, confector }) => {
                    self.stage = SessionStage::Building(confector);
                    Err(error)
                }
            },
            checked @ SessionStage::Checked(_) => {
                self.stage = checked;
                Ok(())
            }
            other => {
                self.stage = other;
                Err(ConfectorError::AlreadyFinalized)
            }
        }
    }

    pub fn add_node(&mut self, collection: &str, node: &Node) -> ConfectorResult<()> {
        self.checked_mut()?.add_node(collection, node)
    }

    pub fn add_nodes<I>(&mut self, collection: &str, nodes: I) -> ConfectorResult<()>
    where
        I: IntoIterator,
        I::Item: Borrow<Node>,
    {
        self.checked_mut()?.add_nodes(collection, nodes)
    }

    pub fn add_property(
        &self,
        collection: &str,
        property: impl IntoIdentifier,
        node: &mut Node,
        value: impl Into<RawValue>,
        reject_null: bool,
    ) -> ConfectorResult<()> {
        self.checked()?
            .add_property(collection, property, node, value, reject_null)
    }

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
        self.checked()?
            .add_properties(collection, node, values, reject_null)
    }

    pub fn schema(&self, collection: &str) -> ConfectorResult<Option<&Schema>> {
        Ok(match &self.stage {
            SessionStage::Building(c) => c.schema(collection),
            SessionStage::Checked(c) => c.schema(collection),
            _ => return Err(ConfectorError::AlreadyFinalized),
        })
    }

    pub fn node_counts(&self) -> ConfectorResult<&BTreeMap<String, u64>> {
        match &self.stage {
            SessionStage::Building(c) => Ok(c.node_counts()),
            SessionStage::Checked(c) => Ok(c.node_counts()),
            _ => Err(ConfectorError::AlreadyFinalized),
        }
    }

    pub fn link_graph(&self) -> ConfectorResult<BTreeMap<String, Vec<String>>> {
        match &self.stage {
            SessionStage::Building(c) => Ok(c.link_graph()),
            SessionStage::Checked(c) => Ok(c.link_graph()),
            _ => Err(ConfectorError::AlreadyFinalized),
        }
    }

    pub fn outline(&self) -> ConfectorResult<String> {
        match &self.stage {
            SessionStage::Building(c) => Ok(c.outline()),
            SessionStage::Checked(c) => Ok(c.outline()),
            _ => Err(ConfectorError::AlreadyFinalized),
        }
    }

    /// Write everything and close the archive. The session is closed
    /// afterwards, whether or not finalizing succeeded.
    pub fn finalize(&mut self, metadata: &impl Serialize) -> ConfectorResult<ArchiveSummary> {
        let result = match std::mem::replace(&mut self.stage, SessionStage::Finalizing) {
            SessionStage::Building(c) => c.finalize(metadata),
            SessionStage::Checked(c) => c.finalize(metadata),
            other => {
                self.stage = other;
                return Err(ConfectorError::AlreadyFinalized);
            }
        };
        self.stage = SessionStage::Closed;
        result
    }

    fn checked(&self) -> ConfectorResult<&Confector<Checked>> {
        match &self.stage {
            SessionStage::Checked(c) => Ok(c),
            SessionStage::Building(_) => Err(ConfectorError::NotReady),
            SessionStage::Finalizing | SessionStage::Closed => {
                Err(ConfectorError::AlreadyFinalized)
            }
        }
    }

    fn checked_mut(&mut self) -> ConfectorResult<&mut Confector<Checked>> {
        match &mut self.stage {
            SessionStage::Checked(c) => Ok(c),
            SessionStage::Building(_) => Err(ConfectorError::NotReady),
            SessionStage::Finalizing | SessionStage::Closed => {
                Err(ConfectorError::AlreadyFinalized)
            }
        }
    }
}

impl From<Confector<Building>> for Session {
    fn from(confector: Confector<Building>) -> Self {
        Self {
            stage: SessionStage::Building(confector),
        }
    }
}

impl From<Confector<Checked>> for Session {
    fn from(confector: Confector<Checked>) -> Self {
        Self {
            stage: SessionStage::Checked(confector),
        }
    }
}
