use crate::error::{PackError, PackResult};

/// A single named entry of a pack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackEntry {
    /// Slash-separated path, e.g. `data/animal.json`.
    pub path: String,
    /// Uncompressed data.
    pub data: Vec<u8>,
}

impl PackEntry {
    pub fn new(path: impl Into<String>, data: Vec<u8>) -> PackResult<Self> {
        let path = path.into();
        check_path(&path)?;
        Ok(Self { path, data })
    }
}

/// Entry paths are relative, slash-separated and free of empty segments.
pub(crate) fn check_path(path: &str) -> PackResult<()> {
    let valid = !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && !path.contains('\0')
        && path.split('/').all(|seg| !seg.is_empty() && seg != "." && seg != "..");
    if valid {
        Ok(())
    } else {
        Err(PackError::InvalidPath(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nested_relative_paths() {
        assert!(PackEntry::new("meta.json", vec![]).is_ok());
        assert!(PackEntry::new("schemata/animal.json", vec![1]).is_ok());
    }

    #[test]
    fn rejects_bad_paths() {
        for path in ["", "/abs.json", "a//b", "../up", "a/./b", "win\\path", "trailing/"] {
            let err = PackEntry::new(path, vec![]).unwrap_err();
            assert!(matches!(err, PackError::InvalidPath(_)), "{path:?} accepted");
        }
    }
}
