//! Virtual path resolution.
//!
//! Jobs carry the *virtual* path of their source file as the hosting
//! platform knows it; the worker resolves it to a local filesystem path at
//! execution time through this boundary.

use std::path::{Path, PathBuf};

/// Maps virtual input paths to local filesystem paths.
pub trait FileResolver: Send + Sync {
    /// Resolve a virtual path to a local path.  Existence is checked by the
    /// caller so a missing file is reported against the resolved location.
    fn resolve(&self, virtual_path: &str) -> PathBuf;
}

/// Resolver that anchors virtual paths under a local storage root.
pub struct LocalFileResolver {
    root: PathBuf,
}

impl LocalFileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileResolver for LocalFileResolver {
    fn resolve(&self, virtual_path: &str) -> PathBuf {
        self.root.join(virtual_path.trim_start_matches('/'))
    }
}

/// Externally visible path of the output folder, derived from the virtual
/// input path: the folder lands next to the source file.
pub fn public_output_path(input_path: &str, folder_name: &str) -> String {
    let parent = Path::new(input_path)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    let parent = parent.trim_matches('/');

    if parent.is_empty() {
        format!("/{folder_name}")
    } else {
        format!("/{parent}/{folder_name}")
    }
}
