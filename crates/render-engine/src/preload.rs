//! Concurrent image preload.
//!
//! Every scene image is decoded before recording begins so that scene
//! rendering never waits on a decode. Decoding is all-or-nothing: if any
//! image fails, the whole preload fails and nothing is handed to the
//! compositor.

use image::RgbaImage;
use scenereel_common::error::{AssetDecodeError, ReelError, ReelResult};
use scenereel_scene_model::Scene;

/// A scene with its image decoded and ready to draw.
#[derive(Debug, Clone)]
pub struct DecodedScene {
    index: usize,
    scene: Scene,
    bitmap: Option<RgbaImage>,
}

impl DecodedScene {
    pub fn new(index: usize, scene: Scene, bitmap: Option<RgbaImage>) -> Self {
        Self {
            index,
            scene,
            bitmap,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn caption(&self) -> Option<&str> {
        self.scene.caption()
    }

    pub fn duration_secs(&self) -> u32 {
        self.scene.duration_secs()
    }

    pub fn bitmap(&self) -> Option<&RgbaImage> {
        self.bitmap.as_ref()
    }
}

/// Decoded scenes in timeline order.
#[derive(Debug, Clone, Default)]
pub struct PreloadedScenes {
    scenes: Vec<DecodedScene>,
}

impl PreloadedScenes {
    pub fn iter(&self) -> std::slice::Iter<'_, DecodedScene> {
        self.scenes.iter()
    }

    pub fn get(&self, index: usize) -> Option<&DecodedScene> {
        self.scenes.get(index)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Sum of scene durations in seconds.
    pub fn total_duration_secs(&self) -> u64 {
        self.scenes.iter().map(|s| s.duration_secs() as u64).sum()
    }
}

impl<'a> IntoIterator for &'a PreloadedScenes {
    type Item = &'a DecodedScene;
    type IntoIter = std::slice::Iter<'a, DecodedScene>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenes.iter()
    }
}

/// Decode raw image bytes into an RGBA bitmap.
///
/// An image with no pixels is rejected like any other undecodable input.
pub fn decode_image(scene: usize, bytes: &[u8]) -> Result<RgbaImage, AssetDecodeError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| AssetDecodeError {
        scene,
        message: e.to_string(),
    })?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(AssetDecodeError {
            scene,
            message: format!("image is empty ({}x{})", decoded.width(), decoded.height()),
        });
    }
    Ok(decoded.to_rgba8())
}

/// Decodes all scene images concurrently.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImagePreloader;

impl ImagePreloader {
    pub fn new() -> Self {
        Self
    }

    /// Decode every image in `scenes`.
    ///
    /// Decodes run in parallel on the blocking pool. The call waits for all
    /// of them to settle; if any failed, the error names the lowest-index
    /// failure and the number of failed images.
    pub async fn preload(&self, scenes: &[Scene]) -> ReelResult<PreloadedScenes> {
        let handles: Vec<_> = scenes
            .iter()
            .enumerate()
            .map(|(index, scene)| {
                let scene = scene.clone();
                tokio::task::spawn_blocking(move || {
                    let bitmap = match scene.image_bytes() {
                        Some(bytes) => Some(decode_image(index, bytes)?),
                        None => None,
                    };
                    Ok::<_, AssetDecodeError>(DecodedScene::new(index, scene, bitmap))
                })
            })
            .collect();

        let mut decoded = Vec::with_capacity(handles.len());
        let mut failures: Vec<AssetDecodeError> = Vec::new();

        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(scene)) => decoded.push(scene),
                Ok(Err(e)) => {
                    tracing::warn!(scene = index, error = %e.message, "Image decode failed");
                    failures.push(e);
                }
                Err(join_err) => {
                    tracing::warn!(scene = index, error = %join_err, "Image decode task aborted");
                    failures.push(AssetDecodeError {
                        scene: index,
                        message: join_err.to_string(),
                    });
                }
            }
        }

        if !failures.is_empty() {
            let failed = failures.len();
            // Handles are awaited in order, so the first failure has the lowest index.
            let source = failures.swap_remove(0);
            return Err(ReelError::PreloadFailure { source, failed });
        }

        tracing::info!(
            scenes = decoded.len(),
            images = decoded.iter().filter(|s| s.bitmap().is_some()).count(),
            "Scene images preloaded"
        );
        Ok(PreloadedScenes { scenes: decoded })
    }
}
