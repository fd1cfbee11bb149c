use std::path::Path;

/// An interned identifier for an absolute file path.
///
/// Rather than hashing and comparing full path strings throughout the
/// snapshot store, reporting, and driver, every component keys off this
/// small `Copy` value instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct FileId(u64);

impl FileId {
    /// Derives a `FileId` from an absolute path's string representation.
    ///
    /// The hash is stable across runs (not the default randomized `HashMap` hasher),
    /// so two builds over the same paths produce identical ids.
    pub fn from_path(path: &Path) -> Self {
        Self::from_str(&path.to_string_lossy())
    }

    pub fn from_str(name: &str) -> Self {
        Self(xxhash_rust::xxh3::xxh3_64(name.as_bytes()))
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_yields_same_id() {
        assert_eq!(FileId::from_str("/a/b.ts"), FileId::from_str("/a/b.ts"));
        assert_ne!(FileId::from_str("/a/b.ts"), FileId::from_str("/a/c.ts"));
    }
}
