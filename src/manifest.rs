//! Static artwork manifest.
//!
//! The manifest is a JSON array of `{ "src": ..., "description": ... }`
//! objects, read once at startup. Order is navigation order.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

/// One artwork item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtworkEntry {
    /// Web-style image locator, resolved against the asset root.
    pub src: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Ordered, non-empty list of artwork entries.
#[derive(Debug, Clone)]
pub struct ArtworkManifest {
    entries: Vec<ArtworkEntry>,
    len: NonZeroUsize,
    asset_root: PathBuf,
}

impl ArtworkManifest {
    /// Build a manifest from parsed entries. Rejects an empty list and blank
    /// locators.
    pub fn new(
        entries: Vec<ArtworkEntry>,
        asset_root: impl Into<PathBuf>,
        origin: &Path,
    ) -> Result<Self, Error> {
        let Some(len) = NonZeroUsize::new(entries.len()) else {
            return Err(Error::EmptyManifest(origin.to_path_buf()));
        };
        if let Some(index) = entries.iter().position(|e| e.src.trim().is_empty()) {
            return Err(Error::EmptyLocator { index });
        }
        Ok(Self {
            entries,
            len,
            asset_root: asset_root.into(),
        })
    }

    /// Parse a manifest from JSON text.
    pub fn from_json_str(
        json: &str,
        asset_root: impl Into<PathBuf>,
        origin: &Path,
    ) -> Result<Self, Error> {
        let entries: Vec<ArtworkEntry> = serde_json::from_str(json)?;
        Self::new(entries, asset_root, origin)
    }

    /// Read a manifest file. Locators resolve against `asset_root` when given,
    /// otherwise against the manifest's own directory.
    pub fn from_json_file(path: impl AsRef<Path>, asset_root: Option<&Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let root = match asset_root {
            Some(root) => root.to_path_buf(),
            None => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        let manifest = Self::from_json_str(&json, root, path)?;
        debug!(
            path = %path.display(),
            entries = manifest.entries.len(),
            asset_root = %manifest.asset_root.display(),
            "manifest parsed"
        );
        Ok(manifest)
    }

    pub fn len(&self) -> NonZeroUsize {
        self.len
    }

    pub fn entries(&self) -> &[ArtworkEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ArtworkEntry> {
        self.entries.get(index)
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Filesystem path for the entry at `index`.
    pub fn resolve(&self, index: usize) -> Option<PathBuf> {
        self.get(index)
            .map(|entry| resolve_locator(&self.asset_root, &entry.src))
    }
}

/// A leading `/` means "relative to the asset root", as it would on a web
/// server; everything else is plainly relative to it.
pub fn resolve_locator(asset_root: &Path, locator: &str) -> PathBuf {
    asset_root.join(locator.trim_start_matches('/'))
}
