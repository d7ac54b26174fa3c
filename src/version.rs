//! Version parsing for Eclipse-style plugin entry names.
//!
//! Plugin bundles are named `<name>_<version>[.vYYYYMMDD-HHMM]`, optionally with a
//! packaged-file suffix such as `.jar`. The build qualifier after `.v` is ignored
//! for ordering; the remaining dotted version is compared numerically per segment.

use std::fmt;

/// Marker that separates the comparable version from its build qualifier.
const QUALIFIER_MARKER: &str = ".v";

/// Number of numeric components kept for ordering (major.minor.patch.build).
const KEY_WIDTH: usize = 4;

/// The pieces of an entry name that carries a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub base_name: String,
    pub raw_version: String,
    pub qualifier: Option<String>,
}

/// Split an entry name into base name and version.
///
/// Returns `None` when the name has no `_`, or when either side of the last `_`
/// is empty. Only one packaged suffix is stripped, and only if it is a true suffix.
pub fn parse_entry_name(name: &str, packaged_suffixes: &[String]) -> Option<ParsedName> {
    let stem = packaged_suffixes
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix.as_str()))
        .unwrap_or(name);

    let (base_name, version) = stem.rsplit_once('_')?;
    if base_name.is_empty() || version.is_empty() {
        return None;
    }

    let (raw_version, qualifier) = match version.split_once(QUALIFIER_MARKER) {
        Some((main, qualifier)) => (main, Some(qualifier.to_string())),
        None => (version, None),
    };

    Some(ParsedName {
        base_name: base_name.to_string(),
        raw_version: raw_version.to_string(),
        qualifier,
    })
}

/// Fixed-width numeric version used to rank variants of one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VersionKey([u64; KEY_WIDTH]);

impl VersionKey {
    pub fn new(components: [u64; KEY_WIDTH]) -> Self {
        VersionKey(components)
    }

    /// Derive the key from a raw version string. Never fails: anything that is not a
    /// digit or `.` is dropped and every unparsable segment counts as `0`.
    pub fn parse(raw_version: &str) -> Self {
        let cleaned: String = raw_version
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let mut components = [0u64; KEY_WIDTH];
        for (slot, segment) in components.iter_mut().zip(cleaned.split('.')) {
            *slot = segment.parse().unwrap_or(0);
        }
        VersionKey(components)
    }

    pub fn components(&self) -> [u64; KEY_WIDTH] {
        self.0
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch, build] = self.0;
        write!(f, "{major}.{minor}.{patch}.{build}")
    }
}
