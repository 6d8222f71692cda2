//! Logical image names to files on disk

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::desktop::platform::Platform;
use crate::error::{Error, Result};

/// Immutable once built; owned by the manager rather than a global
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    images: HashMap<String, PathBuf>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every `.png` below `root` that lives under a directory tagged
    /// for `platform` (e.g. `tests/firefox/osx/url_bar.png`), keyed by file name.
    pub fn scan(root: &Path, platform: Platform) -> Self {
        let tag = platform.asset_tag();
        let mut registry = Self::new();

        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            let is_png = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
            if !entry.file_type().is_file() || !is_png {
                continue;
            }

            let tagged = path
                .strip_prefix(root)
                .unwrap_or(path)
                .parent()
                .is_some_and(|dir| dir.components().any(|c| c.as_os_str() == tag));
            if !tagged {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            if let Some(previous) = registry.images.insert(name.clone(), absolute) {
                tracing::warn!("Duplicate image asset {} (replacing {:?})", name, previous);
            }
        }

        tracing::info!(
            "Registered {} image assets for {} from {:?}",
            registry.len(),
            platform,
            root
        );
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.images.insert(name.into(), path.into());
    }

    pub fn resolve(&self, name: &str) -> Result<&Path> {
        self.images
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::AssetNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_picks_platform_images_only() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for dir in ["suite/linux", "suite/osx", "suite/win"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join("suite/linux/ok.png"), b"").unwrap();
        fs::write(root.join("suite/linux/notes.txt"), b"").unwrap();
        fs::write(root.join("suite/osx/cmd.png"), b"").unwrap();
        fs::write(root.join("suite/win/start.png"), b"").unwrap();

        let registry = AssetRegistry::scan(root, Platform::Linux);
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("ok.png").unwrap().ends_with("suite/linux/ok.png"));
        assert!(matches!(
            registry.resolve("cmd.png"),
            Err(Error::AssetNotFound(name)) if name == "cmd.png"
        ));
    }

    #[test]
    fn test_insert_and_resolve() {
        let mut registry = AssetRegistry::new();
        registry.insert("button.png", "/tmp/button.png");
        assert_eq!(registry.resolve("button.png").unwrap(), Path::new("/tmp/button.png"));
        assert!(registry.resolve("missing.png").is_err());
    }
}
