use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Contents of `meta.json`.
///
/// The recommended fields are typed; anything else is kept in `extra` and
/// written alongside them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    /// Identifier of the archive, e.g. `"animals"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubun_ident: Option<String>,
    /// Collection shown first when the archive is opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Source credited for the data of an archive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl ArchiveMetadata {
    pub fn new(kubun_ident: impl Into<String>) -> Self {
        Self {
            kubun_ident: Some(kubun_ident.into()),
            ..Self::default()
        }
    }

    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tag = Some(tag.into());
        self
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = Some(attribution);
        self
    }

    pub fn with_public(mut self, public: bool) -> Self {
        self.public = Some(public);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_recommended_fields() {
        let meta = ArchiveMetadata::new("animals")
            .with_default_tag("animal")
            .with_attribution(Attribution {
                name: "Kaggle.com".into(),
                url: Some("https://www.kaggle.com/uciml/zoo-animal-classification".into()),
                logo: None,
            })
            .with_public(true);
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({
                "kubun_ident": "animals",
                "default_tag": "animal",
                "attribution": {
                    "name": "Kaggle.com",
                    "url": "https://www.kaggle.com/uciml/zoo-animal-classification",
                },
                "public": true,
            })
        );
    }

    #[test]
    fn keeps_extra_fields() {
        let raw = json!({"kubun_ident": "animals", "version": 2, "tags": ["zoo"]});
        let meta: ArchiveMetadata = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(meta.kubun_ident.as_deref(), Some("animals"));
        assert_eq!(meta.extra.get("version"), Some(&json!(2)));
        assert_eq!(serde_json::to_value(&meta).unwrap(), raw);
    }
}
