//! Manifest edits: add and remove scenes, set the soundtrack.

use std::path::PathBuf;

use scenereel_common::config::AppConfig;
use scenereel_common::error::ReelError;
use scenereel_scene_model::{SceneEntry, MIN_SCENE_SECS};

use super::{load_manifest, scene_index};

pub fn add(
    config: &AppConfig,
    manifest: PathBuf,
    caption: Option<String>,
    image: Option<PathBuf>,
    duration: Option<u32>,
) -> anyhow::Result<()> {
    let mut loaded = load_manifest(&manifest)?;

    if let Some(image) = &image {
        let resolved = loaded.resolve(image);
        if !resolved.exists() {
            return Err(ReelError::FileNotFound { path: resolved }.into());
        }
    }

    let caption = caption
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let duration_secs = duration
        .unwrap_or(config.recording.default_scene_secs)
        .max(MIN_SCENE_SECS);

    loaded.manifest.scenes.push(SceneEntry {
        caption,
        image,
        duration_secs,
    });
    loaded
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save manifest: {e}"))?;

    let number = loaded.manifest.scenes.len();
    tracing::info!(scene = number, duration_secs, "Scene added");
    println!("Added scene {number} ({duration_secs}s)");
    Ok(())
}

pub fn remove(manifest: PathBuf, scene: usize) -> anyhow::Result<()> {
    let mut loaded = load_manifest(&manifest)?;
    let index = scene_index(scene)?;
    let len = loaded.manifest.scenes.len();
    if index >= len {
        return Err(ReelError::IndexOutOfRange { index, len }.into());
    }

    loaded.manifest.scenes.remove(index);
    loaded
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save manifest: {e}"))?;

    println!(
        "Removed scene {scene}; {} scene(s) remaining",
        loaded.manifest.scenes.len()
    );
    Ok(())
}

pub fn set_audio(manifest: PathBuf, file: Option<PathBuf>) -> anyhow::Result<()> {
    let mut loaded = load_manifest(&manifest)?;

    if let Some(file) = &file {
        let resolved = loaded.resolve(file);
        if !resolved.exists() {
            return Err(ReelError::FileNotFound { path: resolved }.into());
        }
    }

    match &file {
        Some(path) => println!("Soundtrack set to {}", path.display()),
        None => println!("Soundtrack cleared"),
    }
    loaded.manifest.audio = file;
    loaded
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save manifest: {e}"))?;
    Ok(())
}
