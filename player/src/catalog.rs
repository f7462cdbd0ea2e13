use glob::{MatchOptions, glob_with};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Files discovered by scanning directories for a set of extensions.
///
/// Keyed by file name so that a later directory can shadow an earlier one.
/// An empty catalog is a normal outcome, not an error.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, PathBuf>,
}

impl Catalog {
    /// Scan `dirs` in order. Missing directories are skipped.
    pub fn scan<P: AsRef<Path>>(dirs: &[P], extensions: &[&str]) -> Self {
        let mut catalog = Self::default();

        for dir in dirs {
            let dir = dir.as_ref();
            if !dir.is_dir() {
                log::debug!("Skipping missing directory: {}", dir.display());
                continue;
            }

            for path in Self::scan_dir(dir, extensions) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    catalog.entries.insert(name.to_string(), path.clone());
                }
            }
        }

        catalog
    }

    fn scan_dir(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let escaped = glob::Pattern::escape(&dir.to_string_lossy());

        let mut found = Vec::new();
        for ext in extensions {
            let pattern = format!("{}/*.{}", escaped, ext);
            match glob_with(&pattern, options) {
                Ok(entries) => {
                    found.extend(entries.flatten().filter(|entry| {
                        entry.is_file() && common::has_extension(entry, extensions)
                    }));
                }
                Err(e) => {
                    log::warn!("Failed to glob pattern '{}': {}", pattern, e);
                }
            }
        }

        found.sort();
        found.dedup();
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full paths, ordered by file name
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.values().cloned().collect()
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }
}
