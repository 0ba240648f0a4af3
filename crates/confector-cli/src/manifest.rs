use std::path::{Path, PathBuf};

use anyhow::Context;
use confector_core::ArchiveMetadata;
use confector_pack::PackConfig;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// What `confector build` reads.
///
/// ```toml
/// archive = "digest/animals.kbn"
/// compression_level = 9
///
/// [meta]
/// kubun_ident = "animals"
/// default_tag = "animal"
///
/// [[collection]]
/// name = "animal"
/// schema = "schemata/animal.json"
/// records = "records/animal.ndjson"
/// ```
///
/// Relative paths are resolved against the manifest's directory.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildManifest {
    pub archive: PathBuf,
    #[serde(default)]
    pub compression_level: Option<i32>,
    #[serde(default)]
    pub reject_null: bool,
    #[serde(default)]
    pub meta: ArchiveMetadata,
    #[serde(default, rename = "collection")]
    pub collections: Vec<CollectionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionEntry {
    pub name: String,
    pub schema: PathBuf,
    /// Newline-delimited [`Record`]s.
    #[serde(default)]
    pub records: Option<PathBuf>,
}

/// One line of a records file.
#[derive(Debug, Deserialize)]
pub struct Record {
    pub title: String,
    #[serde(default, rename = "coverImages")]
    pub cover_images: Vec<String>,
    /// Property identifier -> raw value, in file order.
    #[serde(default, deserialize_with = "ordered_entries")]
    pub properties: Vec<(String, Value)>,
}

fn ordered_entries<'de, D>(deserializer: D) -> Result<Vec<(String, Value)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Entries;

    impl<'de> Visitor<'de> for Entries {
        type Value = Vec<(String, Value)>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a map of property identifiers to values")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(Entries)
}

impl BuildManifest {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid build manifest")
    }

    /// Load a manifest and make its paths absolute relative to its location.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        let mut manifest = Self::from_toml(&text)
            .with_context(|| format!("parsing manifest {}", path.display()))?;
        let base = path.parent().unwrap_or(Path::new(""));
        manifest.rebase(base);
        Ok(manifest)
    }

    fn rebase(&mut self, base: &Path) {
        self.archive = base.join(&self.archive);
        for collection in &mut self.collections {
            collection.schema = base.join(&collection.schema);
            if let Some(records) = &mut collection.records {
                *records = base.join(&*records);
            }
        }
    }

    pub fn pack_config(&self) -> PackConfig {
        self.compression_level
            .map(PackConfig::with_compression_level)
            .unwrap_or_default()
    }
}
