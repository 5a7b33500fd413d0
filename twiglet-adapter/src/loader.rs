//! Template loader resolving handles and paths against the component registry.
//!
//! # Search order
//!
//! For every registered library `<lib>` (first path `<dir>`), with
//! `<base>` the file stem of the location:
//!
//! | # | Candidate                                               |
//! |---|---------------------------------------------------------|
//! | 1 | `<prefix><base>` (the handle)                            |
//! | 2 | the location as given                                    |
//! | 3 | `<prefix><lib>/<base>`                                   |
//! | 4 | `<root>/<location>`                                      |
//! | 5 | `<theme>/<location with <prefix><lib> replaced by <dir>>` |
//! | 6 | `<root>/<location without <prefix><lib>>/<base>.twig`     |
//!
//! The first candidate matching a view handle or view path wins. When no
//! view matches, the first candidate naming an existing file is read as a
//! plain asset (inline SVG and the like).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use twiglet_core::info::LibraryPaths;
use twiglet_core::{ComponentSource, View};
use twiglet_engine::{Loader, TemplateError};

pub struct ComponentLoader {
    source: Arc<dyn ComponentSource>,
    prefix: String,
    libraries: IndexMap<String, LibraryPaths>,
}

impl ComponentLoader {
    pub fn new(
        source: Arc<dyn ComponentSource>,
        prefix: &str,
        libraries: IndexMap<String, LibraryPaths>,
    ) -> Self {
        ComponentLoader {
            source,
            prefix: prefix.to_string(),
            libraries,
        }
    }

    /// Candidate handles and paths for `location`, in search order.
    pub fn candidates(&self, location: &str) -> Vec<String> {
        let root = self.source.root();
        let basename = Path::new(location)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| location.to_string());
        let handle = if basename.starts_with(&self.prefix) {
            basename.clone()
        } else {
            format!("{}{basename}", self.prefix)
        };

        let mut paths = Vec::new();
        if self.libraries.is_empty() {
            paths.push(handle);
            paths.push(location.to_string());
            paths.push(join(root, location));
            return paths;
        }
        for (library, library_paths) in &self.libraries {
            let Some(dir) = library_paths.primary() else {
                continue;
            };
            let name = format!("{}{library}", self.prefix);
            let theme = theme_root(root, dir);
            paths.push(handle.clone());
            paths.push(location.to_string());
            paths.push(format!("{name}/{basename}"));
            paths.push(join(root, location));
            paths.push(join(&theme, &location.replacen(&name, dir, 1)));
            let collection = location.replacen(&name, "", 1);
            paths.push(join(&root.join(collection.trim_start_matches('/')), &format!("{basename}.twig")));
        }
        let mut seen = Vec::with_capacity(paths.len());
        paths.retain(|p| {
            if seen.contains(p) {
                false
            } else {
                seen.push(p.clone());
                true
            }
        });
        paths
    }

    /// The registered view a location resolves to.
    pub fn find_view(&self, location: &str) -> Option<&View> {
        let views = self.source.views();
        self.candidates(location).iter().find_map(|candidate| {
            views.iter().find(|view| {
                view.handle.with_prefix(&self.prefix) == *candidate || view.path == Path::new(candidate)
            })
        })
    }
}

impl Loader for ComponentLoader {
    fn load(&self, location: &str) -> Result<Option<String>, TemplateError> {
        if let Some(view) = self.find_view(location) {
            tracing::trace!(location, view = %view.path.display(), "resolved view");
            return self
                .source
                .view_content(view)
                .map(Some)
                .map_err(|e| TemplateError::runtime(e.to_string()));
        }
        for candidate in self.candidates(location) {
            let path = PathBuf::from(&candidate);
            if path.is_absolute() && path.is_file() {
                tracing::trace!(location, file = %path.display(), "resolved plain file");
                return std::fs::read_to_string(&path)
                    .map(Some)
                    .map_err(|e| TemplateError::runtime(format!("{}: {e}", path.display())));
            }
        }
        Ok(None)
    }
}

fn join(base: &Path, rel: &str) -> String {
    base.join(rel.trim_start_matches('/')).to_string_lossy().into_owned()
}

/// The directory a library path such as `components/atoms` is relative to,
/// derived from the source root (`/theme/components` -> `/theme`).
fn theme_root(root: &Path, library_dir: &str) -> PathBuf {
    let parent = Path::new(library_dir).parent().unwrap_or(Path::new(""));
    let depth = parent.components().count();
    if depth > 0 && root.ends_with(parent) {
        root.ancestors().nth(depth).unwrap_or(root).to_path_buf()
    } else {
        root.to_path_buf()
    }
}
