//! Theme info file (`<theme>.info.yml`) with its component-library table.
//!
//! ```yaml
//! name: Example
//! component-libraries:
//!   atoms:
//!     paths:
//!       - components/atoms
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{io_err, RegistryError};

/// Paths registered for one component library namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryPaths {
    #[serde(default)]
    pub paths: Vec<String>,
}

impl LibraryPaths {
    /// First registered path; the loader only rewrites onto this one.
    pub fn primary(&self) -> Option<&str> {
        self.paths.first().map(String::as_str)
    }
}

/// Parsed theme info.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "component-libraries", default)]
    pub libraries: IndexMap<String, LibraryPaths>,
}

impl ThemeInfo {
    /// Load the first `*.info.yml` (in file-name order) found directly in `dir`.
    pub fn load_at(dir: &Path) -> Result<Self, RegistryError> {
        let path = find_info_file(dir)?.ok_or_else(|| RegistryError::InfoNotFound {
            dir: dir.to_path_buf(),
        })?;
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse { path, source: e })
    }
}

fn find_info_file(dir: &Path) -> Result<Option<PathBuf>, RegistryError> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .map(|n| n.to_string_lossy().ends_with(".info.yml"))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_component_libraries_in_file_order() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join("theme.info.yml"),
            "name: Theme\ncomponent-libraries:\n  molecules:\n    paths: [components/molecules]\n  atoms:\n    paths:\n      - components/atoms\n",
        )
        .expect("write");
        let info = ThemeInfo::load_at(dir.path()).expect("load");
        let names: Vec<_> = info.libraries.keys().cloned().collect();
        assert_eq!(names, ["molecules", "atoms"]);
        assert_eq!(info.libraries["atoms"].primary(), Some("components/atoms"));
    }

    #[test]
    fn missing_info_file_is_reported() {
        let dir = TempDir::new().expect("tempdir");
        let err = ThemeInfo::load_at(dir.path()).unwrap_err();
        assert!(matches!(err, RegistryError::InfoNotFound { .. }));
        assert!(err.to_string().contains("info.yml"));
    }
}
