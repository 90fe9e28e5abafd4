//! Create a new scene manifest.

use std::path::PathBuf;

use scenereel_scene_model::LoadedManifest;

pub fn run(manifest: PathBuf, title: String) -> anyhow::Result<()> {
    let loaded = LoadedManifest::create(&manifest, title)
        .map_err(|e| anyhow::anyhow!("Failed to create manifest: {e}"))?;

    println!("Manifest created: {}", loaded.path.display());
    println!("  Title: {}", loaded.manifest.display_title());
    println!();
    println!("Next steps:");
    println!("  scenereel add {} --image photo.jpg --caption \"...\"", manifest.display());
    println!("  scenereel generate {}", manifest.display());
    Ok(())
}
