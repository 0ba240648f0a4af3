use globset::{Glob, GlobMatcher};

use crate::error::{PackError, PackResult};

/// Path-addressed archive that a collection registry writes into.
///
/// Implementations must satisfy these invariants:
/// - Writing an existing path replaces its content.
/// - Reads never observe partially written entries.
/// - After `close`, writes fail with [`PackError::Closed`]; reads keep working.
/// - `close` succeeds at most once.
pub trait ArchiveStore: Send {
    /// Write (or replace) an entry.
    fn write_entry(&mut self, path: &str, data: &[u8]) -> PackResult<()>;

    /// Read an entry. Fails with [`PackError::EntryNotFound`] if absent.
    fn read_entry(&self, path: &str) -> PackResult<Vec<u8>>;

    /// Check whether an entry exists.
    fn entry_exists(&self, path: &str) -> bool;

    /// Paths matching a glob pattern, sorted.
    ///
    /// `*` does not cross `/`; use `**` for recursive matches.
    fn list_entries(&self, pattern: &str) -> PackResult<Vec<String>>;

    /// Flush and release the archive.
    fn close(&mut self) -> PackResult<()>;
}

/// Compile an entry glob. `*` stops at path separators.
pub(crate) fn entry_matcher(pattern: &str) -> PackResult<GlobMatcher> {
    globset::GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob: Glob| glob.compile_matcher())
        .map_err(|e| PackError::InvalidPattern(e.to_string()))
}

/// Sorted paths from `paths` that match `pattern`.
pub(crate) fn matching<'a>(
    paths: impl Iterator<Item = &'a str>,
    pattern: &str,
) -> PackResult<Vec<String>> {
    let matcher = entry_matcher(pattern)?;
    let mut matched: Vec<String> = paths
        .filter(|p| matcher.is_match(p))
        .map(str::to_string)
        .collect();
    matched.sort();
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATHS: [&str; 5] = [
        "meta.json",
        "schemata/plant.json",
        "schemata/animal.json",
        "data/animal.json",
        "data/nested/deep.json",
    ];

    #[test]
    fn star_does_not_cross_separator() {
        let got = matching(PATHS.into_iter(), "data/*.json").unwrap();
        assert_eq!(got, vec!["data/animal.json"]);
    }

    #[test]
    fn double_star_recurses() {
        let got = matching(PATHS.into_iter(), "data/**").unwrap();
        assert_eq!(got, vec!["data/animal.json", "data/nested/deep.json"]);
    }

    #[test]
    fn results_are_sorted() {
        let got = matching(PATHS.into_iter(), "schemata/*").unwrap();
        assert_eq!(got, vec!["schemata/animal.json", "schemata/plant.json"]);
    }

    #[test]
    fn invalid_pattern() {
        let err = matching(PATHS.into_iter(), "data/[").unwrap_err();
        assert!(matches!(err, PackError::InvalidPattern(_)));
    }
}
