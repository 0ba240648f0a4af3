use std::collections::BTreeMap;

use confector_types::Identifier;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::value::TypedValue;

/// One record of a collection.
///
/// Properties are only set through the registry, which casts each value
/// and refuses to set an identifier twice.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    title: String,
    cover_images: Vec<String>,
    properties: BTreeMap<Identifier, TypedValue>,
}

impl Node {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_cover_images(mut self, cover_images: Vec<String>) -> Self {
        self.cover_images = cover_images;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn cover_images(&self) -> &[String] {
        &self.cover_images
    }

    pub fn properties(&self) -> &BTreeMap<Identifier, TypedValue> {
        &self.properties
    }

    pub fn get(&self, property: &Identifier) -> Option<&TypedValue> {
        self.properties.get(property)
    }

    pub fn contains(&self, property: &Identifier) -> bool {
        self.properties.contains_key(property)
    }

    /// Returns `false` (and keeps the old value) if already set.
    pub(crate) fn insert(&mut self, property: Identifier, value: TypedValue) -> bool {
        if self.properties.contains_key(&property) {
            return false;
        }
        self.properties.insert(property, value);
        true
    }
}

/// `{"title": .., "coverImages": [..], "<identifier>": <value>, ..}`
impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.properties.len()))?;
        map.serialize_entry("title", &self.title)?;
        map.serialize_entry("coverImages", &self.cover_images)?;
        for (ident, value) in &self.properties {
            map.serialize_entry(&ident.to_string(), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_flat() {
        let ident = Identifier::parse("bc1e7372-3c89-44e1-853b-6c97b24fb8a4").unwrap();
        let mut node = Node::new("Aardvark").with_cover_images(vec!["https://img/a.png".into()]);
        assert!(node.insert(ident, TypedValue::Integer(4)));

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "Aardvark",
                "coverImages": ["https://img/a.png"],
                "bc1e7372-3c89-44e1-853b-6c97b24fb8a4": 4,
            })
        );
    }

    #[test]
    fn empty_node() {
        let value = serde_json::to_value(Node::new("Bare")).unwrap();
        assert_eq!(value, json!({"title": "Bare", "coverImages": []}));
    }

    #[test]
    fn insert_keeps_first_value() {
        let ident = Identifier::generate();
        let mut node = Node::new("A");
        assert!(node.insert(ident, TypedValue::Integer(1)));
        assert!(!node.insert(ident, TypedValue::Integer(2)));
        assert_eq!(node.get(&ident), Some(&TypedValue::Integer(1)));
    }
}
