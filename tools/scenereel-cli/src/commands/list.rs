//! List the scenes in a manifest.

use std::path::PathBuf;

use super::load_manifest;

pub fn run(manifest: PathBuf) -> anyhow::Result<()> {
    let loaded = load_manifest(&manifest)?;

    let missing = loaded.validate_sources();
    if !missing.is_empty() {
        println!("Missing files:");
        for problem in &missing {
            println!("  [ERR] {problem}");
        }
        anyhow::bail!("{} referenced file(s) are missing", missing.len());
    }

    let store = loaded
        .to_store()
        .map_err(|e| anyhow::anyhow!("Failed to read scenes: {e}"))?;

    println!("{}", loaded.manifest.display_title());
    println!("{}", "=".repeat(50));
    if store.is_empty() {
        println!("No scenes yet.");
    }
    for line in store.preview_lines() {
        println!("{line}");
    }
    println!();
    println!(
        "{} scene(s), {}s total",
        store.len(),
        store.total_duration_secs()
    );
    if let Some(audio) = loaded.audio_path() {
        println!("Soundtrack: {}", audio.display());
    }
    Ok(())
}
