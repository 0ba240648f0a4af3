use std::collections::{BTreeMap, HashMap};

use confector_schema::{LinkTarget, Schema, ValueKind};
use confector_types::Identifier;
use tracing::debug;

use crate::error::{ConfectorError, ConfectorResult};

/// An outbound link declared in a registered schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundLink {
    /// Collection whose schema declares the link.
    pub source_tag: String,
    /// Identifier of the link property.
    pub property: Identifier,
    pub target: LinkTarget,
}

/// All outbound links of `schemata`, in collection order and pre-order
/// within each schema.
pub fn outbound_links(schemata: &BTreeMap<String, Schema>) -> Vec<OutboundLink> {
    let mut links = Vec::new();
    for (tag, schema) in schemata {
        for leaf in schema.main().leaves() {
            let (Some(property), Some(target)) = (leaf.ident(), leaf.link_target()) else {
                continue;
            };
            links.push(OutboundLink {
                source_tag: tag.clone(),
                property: *property,
                target,
            });
        }
    }
    links
}

/// Source collection -> target collections of its outbound links.
pub fn link_graph(schemata: &BTreeMap<String, Schema>) -> BTreeMap<String, Vec<String>> {
    let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for link in outbound_links(schemata) {
        graph
            .entry(link.source_tag)
            .or_default()
            .push(link.target.target_tag);
    }
    graph
}

/// Resolved kind of every outbound link's target.
///
/// Built once all schemata are registered; assignments to a link property
/// cast each selected value to the kind recorded here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkTable {
    targets: HashMap<Identifier, ValueKind>,
}

impl LinkTable {
    /// Resolve every outbound link against `schemata`.
    ///
    /// A target of `"title"` resolves to [`ValueKind::String`]; any other
    /// target must name a leaf of the target collection's schema.
    pub fn build(schemata: &BTreeMap<String, Schema>) -> ConfectorResult<Self> {
        let mut targets = HashMap::new();
        for link in outbound_links(schemata) {
            let OutboundLink {
                source_tag,
                property,
                target,
            } = link;

            let Some(target_schema) = schemata.get(&target.target_tag) else {
                return Err(ConfectorError::UnresolvedLinkCollection {
                    collection: source_tag,
                    property,
                    target_tag: target.target_tag,
                });
            };

            let kind = if target.targets_title() {
                ValueKind::String
            } else {
                let unresolved = || ConfectorError::UnresolvedLinkProperty {
                    collection: source_tag.clone(),
                    property,
                    target_tag: target.target_tag.clone(),
                    target_ident: target.target_ident.clone(),
                };
                let ident = Identifier::parse(&target.target_ident).map_err(|_| unresolved())?;
                let kind = target_schema
                    .get_property(ident)
                    .map_err(|_| unresolved())?
                    .kind();
                if !is_selectable(kind) {
                    return Err(ConfectorError::UnselectableLinkTarget {
                        collection: source_tag,
                        property,
                        target_tag: target.target_tag,
                        target_ident: target.target_ident,
                        kind,
                    });
                }
                kind
            };

            debug!(
                collection = %source_tag,
                %property,
                target = %target.target_tag,
                %kind,
                "resolved link target"
            );
            targets.insert(property, kind);
        }
        Ok(Self { targets })
    }

    /// Resolved target kind of a link property.
    pub fn target_kind(&self, property: &Identifier) -> Option<ValueKind> {
        self.targets.get(property).copied()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Kinds a selector value can be cast to on its own.
fn is_selectable(kind: ValueKind) -> bool {
    !matches!(kind, ValueKind::Box | ValueKind::Link | ValueKind::List)
}
