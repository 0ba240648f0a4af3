use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::grammar::{self, ConfigGrammar};

/// The closed set of property kinds a schema may declare.
///
/// Each kind is a stateless descriptor; its behaviour is looked up in a
/// static table rather than attached to values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ValueKind {
    Integer,
    Float,
    String,
    Boolean,
    Enum,
    Date,
    /// Structural container; holds child properties instead of a value.
    Box,
    /// Reference into another collection; assigned as a selector.
    Link,
    List,
    FeatureList,
    Url,
    TextArea,
    Tags,
    Hierarchies,
    Location,
}

/// What a property of a given kind must hold once a value has been cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssignmentType {
    Kind(ValueKind),
    /// A non-empty list of values of the link's resolved target kind.
    Selector,
}

impl fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => write!(f, "{kind}"),
            Self::Selector => write!(f, "KubunSelector"),
        }
    }
}

struct KindDescriptor {
    kind: ValueKind,
    name: &'static str,
    grammar: ConfigGrammar,
    structural: bool,
    link: bool,
}

const fn leaf(kind: ValueKind, name: &'static str, grammar: ConfigGrammar) -> KindDescriptor {
    KindDescriptor {
        kind,
        name,
        grammar,
        structural: false,
        link: false,
    }
}

/// Dispatch table, indexed by the enum discriminant.
static DESCRIPTORS: [KindDescriptor; 15] = [
    leaf(ValueKind::Integer, "KubunInt", grammar::NUMERIC),
    leaf(ValueKind::Float, "KubunFloat", grammar::NUMERIC),
    leaf(ValueKind::String, "KubunString", ConfigGrammar::EMPTY),
    leaf(ValueKind::Boolean, "KubunBool", ConfigGrammar::EMPTY),
    leaf(ValueKind::Enum, "KubunEnum", grammar::ENUM),
    leaf(ValueKind::Date, "KubunDate", grammar::DATE),
    KindDescriptor {
        kind: ValueKind::Box,
        name: "KubunBox",
        grammar: ConfigGrammar::EMPTY,
        structural: true,
        link: false,
    },
    KindDescriptor {
        kind: ValueKind::Link,
        name: "KubunLink",
        grammar: grammar::LINK,
        structural: false,
        link: true,
    },
    leaf(ValueKind::List, "KubunList", grammar::LIST),
    leaf(ValueKind::FeatureList, "KubunFeatureList", grammar::ENUM),
    leaf(ValueKind::Url, "KubunURL", grammar::URL),
    leaf(ValueKind::TextArea, "KubunTextArea", ConfigGrammar::EMPTY),
    leaf(ValueKind::Tags, "KubunTags", ConfigGrammar::EMPTY),
    leaf(ValueKind::Hierarchies, "KubunHierarchies", grammar::HIERARCHIES),
    leaf(ValueKind::Location, "KubunLocation", ConfigGrammar::EMPTY),
];

impl ValueKind {
    pub const ALL: [ValueKind; 15] = [
        Self::Integer,
        Self::Float,
        Self::String,
        Self::Boolean,
        Self::Enum,
        Self::Date,
        Self::Box,
        Self::Link,
        Self::List,
        Self::FeatureList,
        Self::Url,
        Self::TextArea,
        Self::Tags,
        Self::Hierarchies,
        Self::Location,
    ];

    fn descriptor(self) -> &'static KindDescriptor {
        &DESCRIPTORS[self as usize]
    }

    /// Look up a kind by its wire name (e.g. `"KubunInt"`).
    pub fn resolve(name: &str) -> SchemaResult<Self> {
        DESCRIPTORS
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.kind)
            .ok_or_else(|| SchemaError::UnknownValueKind(name.to_string()))
    }

    /// Wire name used in schema files and selector serialization.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn config_grammar(self) -> ConfigGrammar {
        self.descriptor().grammar
    }

    pub fn is_structural(self) -> bool {
        self.descriptor().structural
    }

    pub fn is_link(self) -> bool {
        self.descriptor().link
    }

    pub fn expected_assignment_type(self) -> AssignmentType {
        if self.is_link() {
            AssignmentType::Selector
        } else {
            AssignmentType::Kind(self)
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for ValueKind {
    type Error = SchemaError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::resolve(&name)
    }
}

impl From<ValueKind> for &'static str {
    fn from(kind: ValueKind) -> Self {
        kind.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_discriminant() {
        for (i, kind) in ValueKind::ALL.iter().enumerate() {
            assert_eq!(DESCRIPTORS[i].kind, *kind);
        }
    }

    #[test]
    fn every_kind_resolves_by_name() {
        for kind in ValueKind::ALL {
            assert_eq!(ValueKind::resolve(kind.name()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_name_fails() {
        let err = ValueKind::resolve("KubunYoutubeVideo").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownValueKind(name) if name == "KubunYoutubeVideo"));
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = ValueKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ValueKind::ALL.len());
    }

    #[test]
    fn only_box_is_structural() {
        let structural: Vec<_> = ValueKind::ALL
            .into_iter()
            .filter(|k| k.is_structural())
            .collect();
        assert_eq!(structural, vec![ValueKind::Box]);
    }

    #[test]
    fn link_expects_selector() {
        assert!(ValueKind::Link.is_link());
        assert_eq!(
            ValueKind::Link.expected_assignment_type(),
            AssignmentType::Selector
        );
        for kind in ValueKind::ALL.into_iter().filter(|k| *k != ValueKind::Link) {
            assert!(!kind.is_link());
            assert_eq!(kind.expected_assignment_type(), AssignmentType::Kind(kind));
        }
    }

    #[test]
    fn feature_list_shares_enum_grammar() {
        assert_eq!(
            ValueKind::FeatureList.config_grammar(),
            ValueKind::Enum.config_grammar()
        );
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ValueKind::Url).unwrap();
        assert_eq!(json, "\"KubunURL\"");
        let kind: ValueKind = serde_json::from_str("\"KubunHierarchies\"").unwrap();
        assert_eq!(kind, ValueKind::Hierarchies);
        assert!(serde_json::from_str::<ValueKind>("\"Integer\"").is_err());
    }

    #[test]
    fn display() {
        assert_eq!(ValueKind::Integer.to_string(), "KubunInt");
        assert_eq!(AssignmentType::Selector.to_string(), "KubunSelector");
        assert_eq!(
            AssignmentType::Kind(ValueKind::Date).to_string(),
            "KubunDate"
        );
    }
}
