use std::fmt::Write as _;

use confector_types::Identifier;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaResult};
use crate::kind::ValueKind;

/// Declarative form of a property, as found in schema files.
///
/// `type` is only ever `"KubunBox"`; every leaf names its kind in
/// `prop_type`. Serializing a [`PropertyDef`] always yields all keys, with
/// `null` for the unused ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub title: String,
    #[serde(default)]
    pub ident: Option<String>,
    #[serde(default)]
    pub value: Option<DefinitionValue>,
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default, rename = "type")]
    pub structural_type: Option<String>,
    #[serde(default)]
    pub prop_type: Option<String>,
}

/// The `value` slot of a definition: children for boxes, ignored for leaves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefinitionValue {
    Children(Vec<PropertyDefinition>),
    Other(Value),
}

/// Target of an outbound link, taken from the `target` config parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    /// Name of the collection the link points into.
    pub target_tag: String,
    /// Identifier of a leaf in that collection's schema, or `"title"`.
    pub target_ident: String,
}

impl LinkTarget {
    pub const TITLE: &'static str = "title";

    pub fn targets_title(&self) -> bool {
        self.target_ident == Self::TITLE
    }
}

/// A validated, immutable property definition.
///
/// Boxes carry children and no identifier; every other kind carries an
/// identifier and no children.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDef {
    title: String,
    ident: Option<Identifier>,
    kind: ValueKind,
    config: Option<Map<String, Value>>,
    hidden: bool,
    children: Vec<PropertyDef>,
}

impl PropertyDef {
    /// Build and validate a property tree from its declarative form.
    pub fn from_definition(def: PropertyDefinition) -> SchemaResult<Self> {
        let PropertyDefinition {
            title,
            ident,
            value,
            config,
            hidden,
            structural_type,
            prop_type,
        } = def;

        let kind = resolve_kind(&title, structural_type.as_deref(), prop_type.as_deref())?;

        let (ident, children) = if kind.is_structural() {
            if ident.is_some() {
                return Err(SchemaError::StructuralIdentifierViolation {
                    property: title,
                    reason: "a box must not carry an identifier".into(),
                });
            }
            let children = match value {
                Some(DefinitionValue::Children(children)) => children
                    .into_iter()
                    .map(Self::from_definition)
                    .collect::<SchemaResult<Vec<_>>>()?,
                _ => {
                    return Err(SchemaError::InvalidDefinition {
                        property: title,
                        reason: "a box needs a list of child properties as its value".into(),
                    })
                }
            };
            (None, children)
        } else {
            let Some(ident) = ident else {
                return Err(SchemaError::StructuralIdentifierViolation {
                    property: title,
                    reason: format!("{kind} property requires an identifier"),
                });
            };
            (Some(Identifier::parse(&ident)?), Vec::new())
        };

        kind.config_grammar()
            .validate(config.as_ref().unwrap_or(&Map::new()), &title)?;

        Ok(Self {
            title,
            ident,
            kind,
            config,
            hidden: hidden.unwrap_or(false),
            children,
        })
    }

    /// Construct a leaf property directly.
    pub fn leaf(
        title: impl Into<String>,
        ident: Identifier,
        kind: ValueKind,
        config: Option<Map<String, Value>>,
    ) -> SchemaResult<Self> {
        let title = title.into();
        if kind.is_structural() {
            return Err(SchemaError::StructuralIdentifierViolation {
                property: title,
                reason: "a box must not carry an identifier".into(),
            });
        }
        kind.config_grammar()
            .validate(config.as_ref().unwrap_or(&Map::new()), &title)?;
        Ok(Self {
            title,
            ident: Some(ident),
            kind,
            config,
            hidden: false,
            children: Vec::new(),
        })
    }

    /// Construct a box around `children`.
    pub fn boxed(title: impl Into<String>, children: Vec<PropertyDef>) -> Self {
        Self {
            title: title.into(),
            ident: None,
            kind: ValueKind::Box,
            config: None,
            hidden: false,
            children,
        }
    }

    /// Mark this property hidden.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn ident(&self) -> Option<&Identifier> {
        self.ident.as_ref()
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn config(&self) -> Option<&Map<String, Value>> {
        self.config.as_ref()
    }

    /// A single config value, treating `null` as absent.
    pub fn config_value(&self, name: &str) -> Option<&Value> {
        self.config
            .as_ref()
            .and_then(|c| c.get(name))
            .filter(|v| !v.is_null())
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn children(&self) -> &[PropertyDef] {
        &self.children
    }

    /// All non-structural descendants, depth-first in definition order.
    ///
    /// Each call starts a fresh traversal.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    pub fn is_outbound_link(&self) -> bool {
        self.kind == ValueKind::Link && self.config_value("target").is_some()
    }

    /// The declared link target, for outbound links.
    pub fn link_target(&self) -> Option<LinkTarget> {
        if !self.is_outbound_link() {
            return None;
        }
        self.config_value("target")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Back to the declarative form; feeding it to
    /// [`from_definition`](Self::from_definition) reproduces this tree.
    pub fn to_definition(&self) -> PropertyDefinition {
        let structural = self.kind.is_structural();
        PropertyDefinition {
            title: self.title.clone(),
            ident: self.ident.map(|i| i.to_string()),
            value: structural.then(|| {
                DefinitionValue::Children(self.children.iter().map(Self::to_definition).collect())
            }),
            config: self.config.clone(),
            hidden: Some(self.hidden),
            structural_type: structural.then(|| self.kind.name().to_string()),
            prop_type: (!structural).then(|| self.kind.name().to_string()),
        }
    }

    /// Indented, human-readable rendering of the tree.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        let _ = write!(out, "{}◦ {}   [ {}", "\t".repeat(depth), self.title, self.kind);
        if let Some(target) = self.link_target() {
            let _ = write!(out, " -> {}", target.target_tag);
        }
        out.push_str(" ]\n");
        for child in &self.children {
            child.write_outline(out, depth + 1);
        }
    }
}

fn resolve_kind(
    title: &str,
    structural_type: Option<&str>,
    prop_type: Option<&str>,
) -> SchemaResult<ValueKind> {
    let invalid = |reason: String| SchemaError::InvalidDefinition {
        property: title.to_string(),
        reason,
    };
    match (structural_type, prop_type) {
        (Some(_), Some(_)) => Err(invalid("both 'type' and 'prop_type' are set".into())),
        (None, None) => Err(invalid("one of 'type' or 'prop_type' is required".into())),
        (Some(name), None) => {
            let kind = ValueKind::resolve(name)?;
            if !kind.is_structural() {
                return Err(invalid(format!(
                    "'type' is reserved for {}, declare {name} with 'prop_type'",
                    ValueKind::Box
                )));
            }
            Ok(kind)
        }
        (None, Some(name)) => {
            let kind = ValueKind::resolve(name)?;
            if kind.is_structural() {
                return Err(invalid(format!("{name} must be declared with 'type'")));
            }
            Ok(kind)
        }
    }
}

/// Pre-order iterator over the leaves of a property tree.
#[derive(Clone, Debug)]
pub struct Leaves<'a> {
    stack: Vec<&'a PropertyDef>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a PropertyDef;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(prop) = self.stack.pop() {
            if prop.kind.is_structural() {
                self.stack.extend(prop.children.iter().rev());
            } else {
                return Some(prop);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const LEGS: &str = "bc1e7372-3c89-44e1-853b-6c97b24fb8a4";
    const CLASS: &str = "6b7df71e-c21d-4162-8e9f-2eec39010362";
    const TAIL: &str = "97a93039-b614-4b9d-ac49-b99f0d0b41e9";

    fn parse(value: Value) -> SchemaResult<PropertyDef> {
        PropertyDef::from_definition(serde_json::from_value(value).unwrap())
    }

    fn animal_tree() -> Value {
        json!({
            "title": "",
            "type": "KubunBox",
            "value": [
                {"title": "Legs", "ident": LEGS, "prop_type": "KubunInt", "value": null,
                 "config": {"suffix": " legs"}},
                {"title": "Body", "type": "KubunBox", "value": [
                    {"title": "Tail", "ident": TAIL, "prop_type": "KubunBool", "value": null,
                     "config": null, "hidden": true}
                ], "config": null},
                {"title": "Class", "ident": CLASS, "prop_type": "KubunLink", "value": null,
                 "config": {"target": {"target_tag": "animalclass", "target_ident": "title"}}}
            ],
            "config": null
        })
    }

    #[test]
    fn parses_nested_tree() {
        let root = parse(animal_tree()).unwrap();
        assert_eq!(root.kind(), ValueKind::Box);
        assert!(root.ident().is_none());
        assert_eq!(root.children().len(), 3);

        let body = &root.children()[1];
        assert_eq!(body.title(), "Body");
        assert!(body.children()[0].is_hidden());
    }

    #[test]
    fn leaves_are_preorder() {
        let root = parse(animal_tree()).unwrap();
        let titles: Vec<_> = root.leaves().map(|p| p.title()).collect();
        assert_eq!(titles, vec!["Legs", "Tail", "Class"]);
    }

    #[test]
    fn leaves_restart_each_call() {
        let root = parse(animal_tree()).unwrap();
        let first: Vec<_> = root.leaves().collect();
        let second: Vec<_> = root.leaves().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn leaf_yields_itself() {
        let leaf = parse(json!({"title": "Legs", "ident": LEGS, "prop_type": "KubunInt"})).unwrap();
        assert_eq!(leaf.leaves().count(), 1);
    }

    #[test]
    fn empty_box_has_no_leaves() {
        let root = parse(json!({"title": "", "type": "KubunBox", "value": []})).unwrap();
        assert_eq!(root.leaves().count(), 0);
    }

    #[test]
    fn leaf_without_ident_fails() {
        let err = parse(json!({"title": "Legs", "prop_type": "KubunInt"})).unwrap_err();
        assert!(matches!(err, SchemaError::StructuralIdentifierViolation { .. }));
    }

    #[test]
    fn box_with_ident_fails() {
        let err = parse(json!({"title": "", "ident": LEGS, "type": "KubunBox", "value": []}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::StructuralIdentifierViolation { .. }));
    }

    #[test]
    fn box_without_value_fails() {
        let err = parse(json!({"title": "", "type": "KubunBox"})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinition { .. }));
    }

    #[test]
    fn type_and_prop_type_cannot_be_mixed() {
        let both = json!({"title": "x", "ident": LEGS, "type": "KubunBox", "prop_type": "KubunInt"});
        assert!(matches!(parse(both), Err(SchemaError::InvalidDefinition { .. })));

        let neither = json!({"title": "x", "ident": LEGS});
        assert!(matches!(parse(neither), Err(SchemaError::InvalidDefinition { .. })));

        let leaf_as_type = json!({"title": "x", "ident": LEGS, "type": "KubunInt"});
        assert!(matches!(parse(leaf_as_type), Err(SchemaError::InvalidDefinition { .. })));

        let box_as_prop_type = json!({"title": "x", "prop_type": "KubunBox", "value": []});
        assert!(matches!(parse(box_as_prop_type), Err(SchemaError::InvalidDefinition { .. })));
    }

    #[test]
    fn unknown_kind_fails() {
        let err = parse(json!({"title": "x", "ident": LEGS, "prop_type": "KubunVideo"})).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownValueKind(_)));
    }

    #[test]
    fn invalid_ident_fails() {
        let err = parse(json!({"title": "x", "ident": "legs", "prop_type": "KubunInt"})).unwrap_err();
        assert!(matches!(err, SchemaError::Identifier(_)));
    }

    #[test]
    fn config_is_validated_against_kind() {
        let err = parse(json!({"title": "Diet", "ident": LEGS, "prop_type": "KubunEnum"})).unwrap_err();
        assert!(matches!(err, SchemaError::MissingConfigParameter { .. }));
    }

    #[test]
    fn outbound_link_detection() {
        let root = parse(animal_tree()).unwrap();
        let links: Vec<_> = root.leaves().filter(|p| p.is_outbound_link()).collect();
        assert_eq!(links.len(), 1);
        let target = links[0].link_target().unwrap();
        assert_eq!(target.target_tag, "animalclass");
        assert!(target.targets_title());

        let untargeted = parse(json!({"title": "See also", "ident": LEGS, "prop_type": "KubunLink",
                                      "config": {"target": null, "navigate": true}}))
            .unwrap();
        assert!(!untargeted.is_outbound_link());
        assert!(untargeted.link_target().is_none());
    }

    #[test]
    fn definition_roundtrip() {
        let root = parse(animal_tree()).unwrap();
        let def = root.to_definition();
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["type"], "KubunBox");
        assert!(json["prop_type"].is_null());
        assert!(json["value"][0]["type"].is_null());
        assert_eq!(json["value"][0]["prop_type"], "KubunInt");
        assert!(json["value"][0]["value"].is_null());

        let reparsed = parse(json).unwrap();
        assert_eq!(reparsed, root);
    }

    #[test]
    fn outline_shows_link_targets() {
        let root = parse(animal_tree()).unwrap();
        let outline = root.outline();
        assert!(outline.contains("◦ Legs   [ KubunInt ]"));
        assert!(outline.contains("\t\t◦ Tail   [ KubunBool ]"));
        assert!(outline.contains("[ KubunLink -> animalclass ]"));
    }

    #[test]
    fn direct_constructors() {
        let legs = PropertyDef::leaf("Legs", Identifier::parse(LEGS).unwrap(), ValueKind::Integer, None)
            .unwrap();
        let root = PropertyDef::boxed("", vec![legs.clone().hidden()]);
        assert_eq!(root.leaves().count(), 1);
        assert!(root.children()[0].is_hidden());
        assert!(PropertyDef::leaf("Box", Identifier::generate(), ValueKind::Box, None).is_err());
    }

    fn arb_tree() -> impl Strategy<Value = PropertyDef> {
        let leaf = "[a-z]{1,8}".prop_map(|title| {
            PropertyDef::leaf(title, Identifier::generate(), ValueKind::String, None).unwrap()
        });
        leaf.prop_recursive(4, 32, 5, |inner| {
            ("[a-z]{0,8}", prop::collection::vec(inner, 0..5))
                .prop_map(|(title, children)| PropertyDef::boxed(title, children))
        })
    }

    fn reference_leaves<'a>(prop: &'a PropertyDef, out: &mut Vec<&'a PropertyDef>) {
        if prop.kind().is_structural() {
            for child in prop.children() {
                reference_leaves(child, out);
            }
        } else {
            out.push(prop);
        }
    }

    proptest! {
        #[test]
        fn leaves_match_recursive_preorder(tree in arb_tree()) {
            let mut expected = Vec::new();
            reference_leaves(&tree, &mut expected);
            let first: Vec<_> = tree.leaves().collect();
            let second: Vec<_> = tree.leaves().collect();
            prop_assert_eq!(&first, &expected);
            prop_assert_eq!(first, second);
        }
    }
}
