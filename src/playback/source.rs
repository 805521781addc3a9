//! Source reference resolution
//!
//! Maps a logical source reference from the host onto a concrete path the
//! playback backend can open. Three forms are accepted: bundled asset
//! references (`assets/...`), paths relative to the data root, and absolute
//! paths, which pass through untouched.

use std::path::{Path, PathBuf};

use crate::config::PlaybackConfig;
use crate::error::AudioError;

/// Resolves logical source references to playable paths.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    asset_root: Option<PathBuf>,
    data_root: Option<PathBuf>,
}

impl SourceResolver {
    /// Create a resolver with explicit roots
    pub fn new(asset_root: Option<PathBuf>, data_root: Option<PathBuf>) -> Self {
        Self {
            asset_root,
            data_root,
        }
    }

    /// Create a resolver from configuration, falling back to the platform
    /// data directory where no root is configured
    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self {
            asset_root: config.effective_asset_root(),
            data_root: config.effective_data_root(),
        }
    }

    /// Map a source reference to a concrete path.
    ///
    /// Whether the file exists (or decodes) is the backend's concern; this
    /// step only fails when a reference class has no configured root.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, AudioError> {
        let path = Path::new(reference);

        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }

        if reference.starts_with("assets/") {
            let root = self
                .asset_root
                .as_ref()
                .ok_or_else(|| AudioError::ResolutionFailed {
                    reference: reference.to_string(),
                    reason: "no asset root configured".to_string(),
                })?;
            return Ok(root.join(reference));
        }

        let root = self
            .data_root
            .as_ref()
            .ok_or_else(|| AudioError::ResolutionFailed {
                reference: reference.to_string(),
                reason: "no data root configured".to_string(),
            })?;
        Ok(root.join(reference))
    }
}
