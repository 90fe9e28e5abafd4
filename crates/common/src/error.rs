//! Error types shared across SceneReel crates.

use std::path::PathBuf;

/// A single image that could not be decoded during preload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("scene {scene} image could not be decoded: {message}")]
pub struct AssetDecodeError {
    /// Zero-based position of the scene in the list.
    pub scene: usize,
    pub message: String,
}

/// Top-level error type for SceneReel operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelError {
    #[error("Asset decode error: {0}")]
    AssetDecode(#[from] AssetDecodeError),

    #[error("Preload failed ({failed} image(s) could not be decoded): {source}")]
    PreloadFailure {
        #[source]
        source: AssetDecodeError,
        failed: usize,
    },

    #[error("Audio unavailable: {message}")]
    AudioUnavailable { message: String },

    #[error("Capture unsupported: {message}")]
    CaptureUnsupported { message: String },

    #[error("Invalid recorder state: cannot {operation} while {state}")]
    InvalidRecorderState {
        operation: &'static str,
        state: String,
    },

    #[error("Scene index {index} out of range (scene count: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Timeline is empty: add at least one scene")]
    EmptyTimeline,

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Manifest error: {message}")]
    Manifest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelError.
pub type ReelResult<T> = Result<T, ReelError>;

impl ReelError {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest {
            message: msg.into(),
        }
    }

    pub fn audio_unavailable(msg: impl Into<String>) -> Self {
        Self::AudioUnavailable {
            message: msg.into(),
        }
    }

    pub fn capture_unsupported(msg: impl Into<String>) -> Self {
        Self::CaptureUnsupported {
            message: msg.into(),
        }
    }

    pub fn invalid_state(operation: &'static str, state: impl std::fmt::Debug) -> Self {
        Self::InvalidRecorderState {
            operation,
            state: format!("{state:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preload_failure_names_failing_scene() {
        let err = ReelError::PreloadFailure {
            source: AssetDecodeError {
                scene: 2,
                message: "bad magic".to_string(),
            },
            failed: 1,
        };
        let text = err.to_string();
        assert!(text.contains("scene 2"));
        assert!(text.contains("1 image(s)"));
    }

    #[test]
    fn invalid_state_formats_state_name() {
        #[derive(Debug)]
        enum Dummy {
            Finalized,
        }
        let err = ReelError::invalid_state("start", Dummy::Finalized);
        assert_eq!(
            err.to_string(),
            "Invalid recorder state: cannot start while Finalized"
        );
    }
}
