use serde::{Deserialize, Serialize};

/// Settings for writing pack files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// zstd compression level applied to every entry.
    pub compression_level: i32,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
        }
    }
}

impl PackConfig {
    pub fn with_compression_level(compression_level: i32) -> Self {
        Self { compression_level }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        assert_eq!(PackConfig::default().compression_level, 3);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: PackConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PackConfig::default());
        let config: PackConfig = serde_json::from_str(r#"{"compression_level": 19}"#).unwrap();
        assert_eq!(config, PackConfig::with_compression_level(19));
    }
}
