use std::collections::HashMap;
use std::path::Path;

use confector_types::{Identifier, IntoIdentifier};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::property::{PropertyDef, PropertyDefinition};

/// Declarative form of a schema file: `{"main": ..., "mini": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub main: PropertyDefinition,
    pub mini: PropertyDefinition,
}

/// Schema of one collection.
///
/// `main` is the full property structure, `mini` the compact one shown in
/// previews. Properties are looked up by identifier among the leaves of
/// `main`; `mini` only rearranges them for display.
#[derive(Clone, Debug)]
pub struct Schema {
    main: PropertyDef,
    mini: PropertyDef,
    lookup: HashMap<Identifier, PropertyDef>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        // `lookup` is derived from `main`.
        self.main == other.main && self.mini == other.mini
    }
}

impl Schema {
    /// Build a schema from its declarative form.
    pub fn from_definition(def: SchemaDefinition) -> SchemaResult<Self> {
        let main = PropertyDef::from_definition(def.main)?;
        let mini = PropertyDef::from_definition(def.mini)?;
        Self::new(main, mini)
    }

    /// Build a schema from two already validated trees.
    pub fn new(main: PropertyDef, mini: PropertyDef) -> SchemaResult<Self> {
        for root in [&main, &mini] {
            if !root.kind().is_structural() {
                return Err(SchemaError::InvalidDefinition {
                    property: root.title().to_string(),
                    reason: "schema roots must be boxes".into(),
                });
            }
        }

        let mut lookup: HashMap<Identifier, PropertyDef> = HashMap::new();
        for leaf in main.leaves() {
            let Some(ident) = leaf.ident() else { continue };
            if let Some(existing) = lookup.get(ident) {
                return Err(SchemaError::DuplicateIdentifier {
                    ident: *ident,
                    first: existing.title().to_string(),
                    second: leaf.title().to_string(),
                });
            }
            lookup.insert(*ident, leaf.clone());
        }

        Ok(Self { main, mini, lookup })
    }

    /// A schema with two empty roots.
    pub fn empty() -> Self {
        Self {
            main: PropertyDef::boxed("", Vec::new()),
            mini: PropertyDef::boxed("", Vec::new()),
            lookup: HashMap::new(),
        }
    }

    pub fn from_json(json: &str) -> SchemaResult<Self> {
        Self::from_definition(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> SchemaResult<Self> {
        debug!(path = %path.display(), "loading schema");
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn main(&self) -> &PropertyDef {
        &self.main
    }

    pub fn mini(&self) -> &PropertyDef {
        &self.mini
    }

    /// Look up a leaf of `main` by identifier.
    pub fn get_property(&self, ident: impl IntoIdentifier) -> SchemaResult<&PropertyDef> {
        let ident = ident.into_identifier()?;
        self.lookup
            .get(&ident)
            .ok_or(SchemaError::PropertyNotFound(ident))
    }

    pub fn contains(&self, ident: &Identifier) -> bool {
        self.lookup.contains_key(ident)
    }

    /// Number of identified leaves.
    pub fn property_count(&self) -> usize {
        self.lookup.len()
    }

    pub fn to_definition(&self) -> SchemaDefinition {
        SchemaDefinition {
            main: self.main.to_definition(),
            mini: self.mini.to_definition(),
        }
    }

    pub fn to_json(&self) -> SchemaResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.to_definition())?)
    }

    /// Outline of the main tree.
    pub fn outline(&self) -> String {
        self.main.outline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ValueKind;
    use serde_json::json;

    const LEGS: &str = "bc1e7372-3c89-44e1-853b-6c97b24fb8a4";
    const CLASS: &str = "6b7df71e-c21d-4162-8e9f-2eec39010362";

    fn animal_schema_json() -> serde_json::Value {
        json!({
            "main": {
                "title": "", "type": "KubunBox", "config": null, "value": [
                    {"title": "Legs", "ident": LEGS, "prop_type": "KubunInt", "value": null,
                     "config": {"suffix": " legs"}},
                    {"title": "Class", "ident": CLASS, "prop_type": "KubunLink", "value": null,
                     "config": {"target": {"target_tag": "animalclass", "target_ident": "title"}}}
                ]
            },
            "mini": {
                "title": "", "type": "KubunBox", "config": null, "value": [
                    {"title": "Legs", "ident": LEGS, "prop_type": "KubunInt", "value": null,
                     "config": null}
                ]
            }
        })
    }

    fn animal_schema() -> Schema {
        Schema::from_json(&animal_schema_json().to_string()).unwrap()
    }

    #[test]
    fn lookup_contains_main_leaves() {
        let schema = animal_schema();
        assert_eq!(schema.property_count(), 2);
        let legs = schema.get_property(LEGS).unwrap();
        assert_eq!(legs.kind(), ValueKind::Integer);
        assert_eq!(legs.title(), "Legs");
    }

    #[test]
    fn get_property_accepts_identifier() {
        let schema = animal_schema();
        let id = Identifier::parse(CLASS).unwrap();
        assert_eq!(schema.get_property(id).unwrap().kind(), ValueKind::Link);
        assert!(schema.contains(&id));
    }

    #[test]
    fn get_property_missing() {
        let schema = animal_schema();
        let missing = Identifier::generate();
        let err = schema.get_property(missing).unwrap_err();
        assert!(matches!(err, SchemaError::PropertyNotFound(id) if id == missing));
    }

    #[test]
    fn get_property_invalid_string() {
        let err = animal_schema().get_property("legs").unwrap_err();
        assert!(matches!(err, SchemaError::Identifier(_)));
    }

    #[test]
    fn empty_schema() {
        let schema = Schema::empty();
        assert_eq!(schema.property_count(), 0);
        assert_eq!(schema.main().kind(), ValueKind::Box);
        assert_eq!(schema.mini().children().len(), 0);
    }

    #[test]
    fn duplicate_identifier_in_main_fails() {
        let mut def = animal_schema_json();
        def["main"]["value"][1]["ident"] = json!(LEGS);
        def["main"]["value"][1]["prop_type"] = json!("KubunFloat");
        def["main"]["value"][1]["config"] = json!(null);
        let err = Schema::from_json(&def.to_string()).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateIdentifier { .. }));
    }

    #[test]
    fn leaf_root_is_rejected() {
        let mut def = animal_schema_json();
        def["mini"] = json!({"title": "x", "ident": LEGS, "prop_type": "KubunInt"});
        let err = Schema::from_json(&def.to_string()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinition { .. }));
    }

    #[test]
    fn definition_roundtrip() {
        let schema = animal_schema();
        let bytes = schema.to_json().unwrap();
        let reparsed = Schema::from_json(std::str::from_utf8(&bytes).unwrap()).unwrap();
        assert_eq!(reparsed, schema);

        let original: Vec<_> = schema
            .main()
            .leaves()
            .map(|p| (p.ident().copied(), p.kind(), p.config().cloned()))
            .collect();
        let again: Vec<_> = reparsed
            .main()
            .leaves()
            .map(|p| (p.ident().copied(), p.kind(), p.config().cloned()))
            .collect();
        assert_eq!(original, again);
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("animal.json");
        std::fs::write(&path, animal_schema_json().to_string()).unwrap();
        let schema = Schema::from_path(&path).unwrap();
        assert_eq!(schema, animal_schema());
    }

    #[test]
    fn from_path_missing_file() {
        let err = Schema::from_path(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert!(matches!(err, SchemaError::Io(_)));
    }

    #[test]
    fn outline_lists_main() {
        let outline = animal_schema().outline();
        assert!(outline.contains("Legs"));
        assert!(outline.contains("-> animalclass"));
    }
}
