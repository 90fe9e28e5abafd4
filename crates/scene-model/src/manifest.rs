//! Scene manifest (`scenes.json`).
//!
//! The manifest is the on-disk form of an editing session: an ordered list
//! of scene entries that reference image files by path, plus an optional
//! audio file for the whole video. Relative paths are resolved against the
//! directory that contains the manifest.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::scene::{Scene, SceneStore, DEFAULT_SCENE_SECS, MIN_SCENE_SECS};

/// Current manifest schema version.
pub const MANIFEST_VERSION: &str = "1.0";

/// Top-level manifest file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneManifest {
    /// Schema version.
    pub version: String,

    /// Human-readable title, used as the upload title.
    #[serde(default)]
    pub title: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Scenes in timeline order.
    #[serde(default)]
    pub scenes: Vec<SceneEntry>,

    /// Optional soundtrack for the whole video.
    #[serde(default)]
    pub audio: Option<PathBuf>,
}

/// One scene as stored in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneEntry {
    /// Caption text.
    #[serde(default)]
    pub caption: Option<String>,

    /// Image file path.
    #[serde(default)]
    pub image: Option<PathBuf>,

    /// Duration in whole seconds.
    #[serde(default = "default_duration")]
    pub duration_secs: u32,
}

fn default_duration() -> u32 {
    DEFAULT_SCENE_SECS
}

/// A manifest together with the file it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    /// Path of the manifest file.
    pub path: PathBuf,

    /// Manifest contents.
    pub manifest: SceneManifest,
}

impl SceneManifest {
    /// Create an empty manifest.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            title: title.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            scenes: vec![],
            audio: None,
        }
    }

    /// Display title, falling back to "Untitled".
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }
}

impl LoadedManifest {
    /// Load a manifest from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref().to_path_buf();
        let json = std::fs::read_to_string(&path).map_err(|e| ManifestError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let mut manifest: SceneManifest =
            serde_json::from_str(&json).map_err(|e| ManifestError::ParseError {
                path: path.clone(),
                source: e,
            })?;

        for entry in &mut manifest.scenes {
            entry.duration_secs = entry.duration_secs.max(MIN_SCENE_SECS);
        }

        Ok(Self { path, manifest })
    }

    /// Create a new empty manifest on disk.
    pub fn create(path: impl AsRef<Path>, title: impl Into<String>) -> Result<Self, ManifestError> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            return Err(ManifestError::ValidationError {
                message: format!("manifest already exists at {}", path.display()),
            });
        }
        let loaded = Self {
            path,
            manifest: SceneManifest::new(title),
        };
        loaded.save()?;
        Ok(loaded)
    }

    /// Write the manifest back to its file.
    pub fn save(&self) -> Result<(), ManifestError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ManifestError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(&self.manifest).map_err(|e| {
            ManifestError::ParseError {
                path: self.path.clone(),
                source: e,
            }
        })?;
        std::fs::write(&self.path, json).map_err(|e| ManifestError::IoError {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Directory relative paths are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve a manifest path against the manifest directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    /// Resolved soundtrack path, if any.
    pub fn audio_path(&self) -> Option<PathBuf> {
        self.manifest.audio.as_deref().map(|p| self.resolve(p))
    }

    /// Build the in-memory scene store, reading every referenced image.
    ///
    /// Image bytes are loaded as-is; they are decoded later by the preloader.
    pub fn to_store(&self) -> Result<SceneStore, ManifestError> {
        let mut store = SceneStore::new();
        for entry in &self.manifest.scenes {
            let image = match &entry.image {
                Some(path) => {
                    let resolved = self.resolve(path);
                    let bytes = std::fs::read(&resolved).map_err(|e| ManifestError::IoError {
                        path: resolved,
                        source: e,
                    })?;
                    Some(Arc::<[u8]>::from(bytes))
                }
                None => None,
            };
            store.push(Scene::new(entry.caption.clone(), image, entry.duration_secs));
        }
        Ok(store)
    }

    /// Validate that all referenced files exist.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];
        for (idx, entry) in self.manifest.scenes.iter().enumerate() {
            if let Some(image) = &entry.image {
                if !self.resolve(image).exists() {
                    errors.push(format!("Scene {} image missing: {}", idx + 1, image.display()));
                }
            }
        }
        if let Some(audio) = &self.manifest.audio {
            if !self.resolve(audio).exists() {
                errors.push(format!("Audio missing: {}", audio.display()));
            }
        }
        errors
    }
}

/// Errors that can occur when working with manifests.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid manifest: {message}")]
    ValidationError { message: String },
}

impl From<ManifestError> for scenereel_common::error::ReelError {
    fn from(err: ManifestError) -> Self {
        scenereel_common::error::ReelError::manifest(err.to_string())
    }
}
