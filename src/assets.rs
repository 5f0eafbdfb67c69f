//! Static assets injected ahead of chapter content.
//!
//! Loaded synchronously once at startup; a missing asset is fatal before
//! any session starts rather than mid-stream.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Style sheets shipped in the preface event, in injection order.
const STYLE_FILES: &[&str] = &["styles/reset.css", "styles/footer_note.css"];

/// Scripts shipped in the preface event.
const SCRIPT_FILES: &[&str] = &["js/footer_note.js"];

/// Asset loading errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// An asset file could not be read.
    #[error("failed to read asset {path}: {source}")]
    Read {
        /// The file that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// The preloaded style/script catalog.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    /// Style sheet contents, in injection order.
    pub styles: Vec<String>,
    /// Script contents.
    pub scripts: Vec<String>,
}

impl AssetCatalog {
    /// Reads the catalog from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Read`] for the first file that cannot be
    /// read; partial catalogs are never produced.
    pub fn load(dir: &Path) -> Result<Self, AssetError> {
        Ok(Self {
            styles: read_all(dir, STYLE_FILES)?,
            scripts: read_all(dir, SCRIPT_FILES)?,
        })
    }
}

fn read_all(dir: &Path, files: &[&str]) -> Result<Vec<String>, AssetError> {
    files
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|source| AssetError::Read { path, source })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write_fixture(dir: &Path) {
        std::fs::create_dir_all(dir.join("styles")).unwrap();
        std::fs::create_dir_all(dir.join("js")).unwrap();
        std::fs::write(dir.join("styles/reset.css"), "html { margin: 0; }").unwrap();
        std::fs::write(dir.join("styles/footer_note.css"), ".note { }").unwrap();
        std::fs::write(dir.join("js/footer_note.js"), "init();").unwrap();
    }

    #[test]
    fn test_load_reads_all_assets() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let catalog = AssetCatalog::load(dir.path()).unwrap();
        assert_eq!(catalog.styles.len(), 2);
        assert_eq!(catalog.scripts.len(), 1);
        assert_eq!(catalog.styles[0], "html { margin: 0; }");
        assert_eq!(catalog.scripts[0], "init();");
    }

    #[test]
    fn test_missing_asset_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // No fixture files at all.
        let error = AssetCatalog::load(dir.path()).unwrap_err();
        assert!(error.to_string().contains("reset.css"));
    }
}
