//! Render a single frame to PNG.

use std::path::PathBuf;

use scenereel_common::config::AppConfig;
use scenereel_common::error::ReelError;
use scenereel_render_engine::{
    CompositorStyle, FrameCompositor, ImagePreloader, TextRenderer, IDLE_MESSAGE,
};

use super::{load_manifest, scene_index};

pub async fn run(
    config: &AppConfig,
    manifest: PathBuf,
    scene: Option<usize>,
    output: PathBuf,
) -> anyhow::Result<()> {
    let loaded = load_manifest(&manifest)?;
    let store = loaded.to_store().map_err(ReelError::from)?;

    let text = TextRenderer::discover(config.recording.font_path.as_deref());
    let mut compositor = FrameCompositor::new(
        config.recording.width,
        config.recording.height,
        CompositorStyle::default(),
        text,
    )?;

    match scene {
        Some(number) => {
            let index = scene_index(number)?;
            let selected = store.get(index).cloned().ok_or(ReelError::IndexOutOfRange {
                index,
                len: store.len(),
            })?;
            let preloaded = ImagePreloader::new().preload(&[selected]).await?;
            for decoded in &preloaded {
                compositor.draw(decoded);
            }
            println!("Rendering scene {number}/{}", store.len());
        }
        None => {
            compositor.draw_placeholder(IDLE_MESSAGE);
            println!("Rendering idle frame");
        }
    }

    compositor
        .surface()
        .to_image()
        .save(&output)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", output.display()))?;

    println!(
        "Preview written: {} ({}x{})",
        output.display(),
        config.recording.width,
        config.recording.height
    );
    Ok(())
}
