//! Check capture capabilities.

use scenereel_capture_engine::{default_backend, ContainerFormat};
use scenereel_common::config::{config_file_path, AppConfig};
use scenereel_render_engine::TextRenderer;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("SceneReel System Check");
    println!("{}", "=".repeat(50));

    // Capture backend
    let mut ready = true;
    match default_backend() {
        Ok(backend) => {
            println!("[OK] Capture backend: {}", backend.name());
            let mut any = false;
            for container in ContainerFormat::FALLBACK_ORDER {
                if backend.supports_container(container) {
                    any = true;
                    println!("[OK]   {container} ({})", container.mime_type());
                } else {
                    println!("[WARN] {container} encoder not available");
                }
            }
            if !any {
                ready = false;
                println!("[ERR] No container can be recorded");
            }
        }
        Err(e) => {
            ready = false;
            println!("[ERR] Capture backend: {e}");
        }
    }

    let preferred = config
        .recording
        .container
        .parse::<ContainerFormat>()
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("[OK] Preferred container: {preferred}");

    // Caption font
    let text = TextRenderer::discover(config.recording.font_path.as_deref());
    match text.source() {
        Some(path) => println!("[OK] Caption font: {}", path.display()),
        None => println!("[WARN] Caption font: none found, captions use block glyphs"),
    }

    println!();
    println!("Config:     {}", config_file_path().display());
    println!("Output dir: {}", config.output_dir.display());
    println!(
        "Recording:  {}x{} @ {} fps",
        config.recording.width, config.recording.height, config.recording.fps
    );

    println!();
    if ready {
        println!("SceneReel is ready to record.");
    } else {
        println!("Recording is unavailable; `generate --dry-run` still works.");
    }
    Ok(())
}
