//! Record a manifest's scenes into a video file.

use std::path::PathBuf;
use std::sync::Arc;

use scenereel_capture_engine::{
    default_backend, AudioAsset, AudioStatus, CaptureBackend, ContainerChoice, DriverSettings,
    DriverState, GenerateOutcome, MemoryBackend, TimelineDriver, TokioRefresh,
};
use scenereel_common::config::AppConfig;
use scenereel_common::error::ReelError;
use scenereel_render_engine::{CompositorStyle, FrameCompositor, TextRenderer};
use scenereel_scene_model::UploadForm;

use super::load_manifest;

/// Flags of the `generate` command.
pub struct GenerateArgs {
    pub manifest: PathBuf,
    pub output: Option<PathBuf>,
    pub container: Option<String>,
    pub fps: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub no_audio: bool,
    pub dry_run: bool,
}

pub async fn run(config: &AppConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let loaded = load_manifest(&args.manifest)?;

    let missing = loaded.validate_sources();
    if !missing.is_empty() {
        for problem in &missing {
            println!("  [ERR] {problem}");
        }
        anyhow::bail!("{} referenced file(s) are missing", missing.len());
    }
    let store = loaded.to_store().map_err(ReelError::from)?;

    let mut settings = DriverSettings::from_config(&config.recording)?;
    if let Some(container) = &args.container {
        settings.container = container.parse()?;
    }
    if let Some(fps) = args.fps {
        settings.fps = fps.max(1);
    }
    let width = args.width.unwrap_or(config.recording.width);
    let height = args.height.unwrap_or(config.recording.height);

    let backend: Arc<dyn CaptureBackend> = if args.dry_run {
        Arc::new(MemoryBackend::default())
    } else {
        default_backend()?
    };

    let audio = if args.no_audio {
        None
    } else {
        loaded.audio_path().map(AudioAsset::new)
    };

    println!("Generating: {}", loaded.manifest.display_title());
    println!("  Scenes: {} ({}s)", store.len(), store.total_duration_secs());
    println!("  Backend: {}", backend.name());
    println!("  Resolution: {width}x{height} @ {} fps", settings.fps);
    if let Some(audio) = &audio {
        println!("  Soundtrack: {}", audio.label());
    }

    let text = TextRenderer::discover(config.recording.font_path.as_deref());
    let compositor = FrameCompositor::new(width, height, CompositorStyle::default(), text)?;
    let driver = TimelineDriver::new(backend, settings, compositor);

    let total = store.len();
    let mut states = driver.subscribe();
    let progress = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            match state {
                DriverState::Preloading => println!("  Loading images..."),
                DriverState::Rendering { scene } => {
                    println!("  Rendering scene {}/{total}", scene + 1)
                }
                DriverState::Stopping => println!("  Finalizing..."),
                _ => {}
            }
        }
    });

    let mut refresh = TokioRefresh::new(settings.fps);
    let outcome = driver.generate(store.list(), audio, &mut refresh).await;
    drop(driver);
    progress.await.ok();

    let report = match outcome? {
        GenerateOutcome::Completed(report) => report,
        GenerateOutcome::Ignored => anyhow::bail!("A generate run is already in progress"),
    };

    let output_dir = args.output.unwrap_or_else(|| config.output_dir.clone());
    std::fs::create_dir_all(&output_dir)?;
    let video_path = output_dir.join(report.video.file_name());
    std::fs::write(&video_path, report.video.data())?;

    let form = UploadForm {
        title: loaded.manifest.title.clone(),
        file_name: report.video.file_name().to_string(),
        content_type: report.video.mime_type().to_string(),
        size_bytes: report.video.size_bytes(),
        size_label: report.video.size_label(),
        created_at: report.started_at.clone(),
    };
    let form_path = video_path.with_extension("json");
    std::fs::write(&form_path, serde_json::to_string_pretty(&form)?)?;

    println!();
    if let Some(ContainerChoice::Fallback { preferred, chosen }) = report.container {
        println!("  [WARN] {preferred} unsupported, recorded as {chosen}");
    }
    for timing in &report.timings {
        println!(
            "  Scene {}: {:.2}s - {:.2}s ({} frames)",
            timing.index + 1,
            timing.start.as_secs_f64(),
            timing.end.as_secs_f64(),
            timing.frames
        );
    }
    match &report.audio {
        AudioStatus::Muxed => println!("  Audio: included"),
        AudioStatus::Unavailable(reason) => println!("  [WARN] Audio skipped: {reason}"),
        AudioStatus::Absent => println!("  Audio: none"),
    }
    println!();
    println!("Download video ({})", report.video.size_label());
    println!("  {}", video_path.display());
    println!("  Upload form: {}", form_path.display());
    Ok(())
}
