use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use scenereel_capture_engine::{
    AudioAsset, AudioStatus, ContainerChoice, ContainerFormat, DriverSettings, DriverState,
    GenerateOutcome, MemoryBackend, MemoryBackendConfig, RunReport, TimelineDriver, TokioRefresh,
};
use scenereel_common::error::ReelError;
use scenereel_render_engine::{CompositorStyle, FrameCompositor, TextRenderer};
use scenereel_scene_model::Scene;

const FPS: u32 = 10;

fn png(px: [u8; 4]) -> Arc<[u8]> {
    let img = RgbaImage::from_pixel(8, 8, image::Rgba(px));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    Arc::from(buf.into_inner())
}

fn colored_scene(px: [u8; 4], secs: u32) -> Scene {
    Scene::new(None, Some(png(px)), secs)
}

fn driver(config: MemoryBackendConfig) -> (TimelineDriver, MemoryBackend) {
    let backend = MemoryBackend::new(config);
    let compositor =
        FrameCompositor::new(64, 36, CompositorStyle::default(), TextRenderer::fallback()).unwrap();
    let settings = DriverSettings {
        fps: FPS,
        ..Default::default()
    };
    (
        TimelineDriver::new(Arc::new(backend.clone()), settings, compositor),
        backend,
    )
}

fn completed(outcome: GenerateOutcome) -> RunReport {
    match outcome {
        GenerateOutcome::Completed(report) => report,
        GenerateOutcome::Ignored => panic!("run was ignored"),
    }
}

fn audio_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("scenereel_{name}_{}.ogg", std::process::id()));
    std::fs::write(&path, b"OggS").unwrap();
    path
}

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

#[tokio::test(start_paused = true)]
async fn scenes_are_held_for_their_duration_in_order() {
    let (driver, backend) = driver(MemoryBackendConfig::default());
    let scenes = vec![
        colored_scene(RED, 1),
        colored_scene(GREEN, 2),
        colored_scene(BLUE, 1),
    ];
    let mut refresh = TokioRefresh::new(FPS);

    let report = completed(driver.generate(&scenes, None, &mut refresh).await.unwrap());

    assert_eq!(report.timings.len(), 3);
    for (timing, scene) in report.timings.iter().zip(&scenes) {
        assert!(timing.held() >= Duration::from_secs(scene.duration_secs() as u64));
        assert!(timing.frames >= (scene.duration_secs() * FPS) as u64);
    }
    let mut elapsed = Duration::ZERO;
    for (timing, scene) in report.timings.iter().zip(&scenes) {
        assert!(timing.start >= elapsed, "scene {} started early", timing.index);
        elapsed += Duration::from_secs(scene.duration_secs() as u64);
    }

    let frames = backend.stats().frames();
    assert_eq!(frames.len() as u64, report.frames);
    assert!(frames.windows(2).all(|w| w[0].pts <= w[1].pts));

    // Colors appear as contiguous runs in scene order; settle frames repeat the last one.
    let mut runs: Vec<[u8; 4]> = frames.iter().map(|f| f.center).collect();
    runs.dedup();
    assert_eq!(runs, vec![RED, GREEN, BLUE]);

    // The first frame of each scene is stamped with the scene start.
    for timing in &report.timings {
        assert!(frames.iter().any(|f| f.pts == timing.start));
    }

    assert_eq!(report.audio, AudioStatus::Absent);
    assert_eq!(
        report.container,
        Some(ContainerChoice::Preferred(ContainerFormat::WebM))
    );
    assert!(report.video.file_name().ends_with(".webm"));
    assert!(report.video.size_bytes() > 0);
    assert_eq!(driver.state(), DriverState::Idle);
    assert!(!driver.is_busy());
}

#[tokio::test(start_paused = true)]
async fn settle_keeps_capturing_the_last_scene() {
    let (driver, backend) = driver(MemoryBackendConfig::default());
    let scenes = vec![colored_scene(GREEN, 1)];
    let mut refresh = TokioRefresh::new(FPS);

    let report = completed(driver.generate(&scenes, None, &mut refresh).await.unwrap());

    let last_scene_end = report.timings[0].end;
    let frames = backend.stats().frames();
    let after: Vec<_> = frames.iter().filter(|f| f.pts > last_scene_end).collect();
    assert!(!after.is_empty());
    assert!(after.iter().all(|f| f.center == GREEN));
    assert!(frames.last().unwrap().pts >= last_scene_end + Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn corrupt_image_fails_before_recording_starts() {
    let (driver, backend) = driver(MemoryBackendConfig::default());
    let scenes = vec![
        colored_scene(RED, 1),
        Scene::new(Some("broken".into()), Some(Arc::from(&b"garbage"[..])), 1),
        colored_scene(BLUE, 1),
    ];
    let mut refresh = TokioRefresh::new(FPS);

    let err = driver.generate(&scenes, None, &mut refresh).await.unwrap_err();
    match err {
        ReelError::PreloadFailure { source, failed } => {
            assert_eq!(source.scene, 1);
            assert_eq!(failed, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.stats().encoders_opened(), 0);
    assert_eq!(backend.stats().frame_count(), 0);
    assert_eq!(driver.state(), DriverState::Idle);
    assert!(!driver.is_busy());
}

#[tokio::test(start_paused = true)]
async fn second_generate_while_running_is_ignored() {
    let (driver, backend) = driver(MemoryBackendConfig::default());
    let scenes = vec![colored_scene(RED, 1)];
    let mut first_refresh = TokioRefresh::new(FPS);
    let mut second_refresh = TokioRefresh::new(FPS);

    let (first, second) = tokio::join!(
        driver.generate(&scenes, None, &mut first_refresh),
        driver.generate(&scenes, None, &mut second_refresh),
    );

    assert!(matches!(first.unwrap(), GenerateOutcome::Completed(_)));
    assert!(matches!(second.unwrap(), GenerateOutcome::Ignored));
    assert_eq!(backend.stats().encoders_opened(), 1);
    assert_eq!(backend.stats().max_concurrent_encoders(), 1);

    // Once idle, the driver accepts a new run.
    let mut refresh = TokioRefresh::new(FPS);
    let again = driver.generate(&scenes, None, &mut refresh).await.unwrap();
    assert!(matches!(again, GenerateOutcome::Completed(_)));
    assert_eq!(backend.stats().encoders_opened(), 2);
}

#[tokio::test(start_paused = true)]
async fn empty_timeline_is_rejected() {
    let (driver, backend) = driver(MemoryBackendConfig::default());
    let mut refresh = TokioRefresh::new(FPS);
    let err = driver.generate(&[], None, &mut refresh).await.unwrap_err();
    assert!(matches!(err, ReelError::EmptyTimeline));
    assert_eq!(backend.stats().encoders_opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn soundtrack_is_connected_and_played() {
    let (driver, backend) = driver(MemoryBackendConfig::default());
    let path = audio_file("muxed");
    let scenes = vec![colored_scene(RED, 1)];
    let mut refresh = TokioRefresh::new(FPS);

    let report = completed(
        driver
            .generate(&scenes, Some(AudioAsset::new(&path)), &mut refresh)
            .await
            .unwrap(),
    );

    assert_eq!(report.audio, AudioStatus::Muxed);
    let stats = backend.stats();
    assert_eq!(stats.audio_graphs_opened(), 1);
    assert_eq!(stats.audio_tracks_connected(), 1);
    assert!(stats.audio_chunks() > 0);
    std::fs::remove_file(path).ok();
}

#[tokio::test(start_paused = true)]
async fn blocked_playback_degrades_to_silent_video() {
    let (driver, backend) = driver(MemoryBackendConfig {
        audio_playback_fails: true,
        ..Default::default()
    });
    let path = audio_file("blocked");
    let scenes = vec![colored_scene(RED, 1)];
    let mut refresh = TokioRefresh::new(FPS);

    let report = completed(
        driver
            .generate(&scenes, Some(AudioAsset::new(&path)), &mut refresh)
            .await
            .unwrap(),
    );

    assert!(matches!(report.audio, AudioStatus::Unavailable(_)));
    assert!(report.video.size_bytes() > 0);
    let stats = backend.stats();
    assert_eq!(stats.audio_chunks(), 0);
    // The encoder's audio branch is ended so it does not wait for samples.
    assert_eq!(stats.audio_tracks_ended(), 1);
    std::fs::remove_file(path).ok();
}

#[tokio::test(start_paused = true)]
async fn missing_soundtrack_records_video_only() {
    let (driver, backend) = driver(MemoryBackendConfig::default());
    let scenes = vec![colored_scene(RED, 1)];
    let mut refresh = TokioRefresh::new(FPS);

    let report = completed(
        driver
            .generate(
                &scenes,
                Some(AudioAsset::new("/definitely/not/here.ogg")),
                &mut refresh,
            )
            .await
            .unwrap(),
    );

    assert!(matches!(report.audio, AudioStatus::Unavailable(_)));
    assert_eq!(backend.stats().audio_tracks_connected(), 0);
}

#[tokio::test(start_paused = true)]
async fn unsupported_preferred_container_falls_back() {
    let (driver, _backend) = driver(MemoryBackendConfig {
        supported: vec![ContainerFormat::Mp4],
        ..Default::default()
    });
    let scenes = vec![colored_scene(RED, 1)];
    let mut refresh = TokioRefresh::new(FPS);

    let report = completed(driver.generate(&scenes, None, &mut refresh).await.unwrap());

    assert_eq!(
        report.container,
        Some(ContainerChoice::Fallback {
            preferred: ContainerFormat::WebM,
            chosen: ContainerFormat::Mp4,
        })
    );
    assert!(report.video.file_name().ends_with(".mp4"));
    assert_eq!(report.video.mime_type(), "video/mp4");
}

#[tokio::test(start_paused = true)]
async fn no_supported_container_fails_without_recording() {
    let (driver, backend) = driver(MemoryBackendConfig {
        supported: vec![],
        ..Default::default()
    });
    let scenes = vec![colored_scene(RED, 1)];
    let mut refresh = TokioRefresh::new(FPS);

    let err = driver.generate(&scenes, None, &mut refresh).await.unwrap_err();
    assert!(matches!(err, ReelError::CaptureUnsupported { .. }));
    assert_eq!(backend.stats().frame_count(), 0);
    assert_eq!(driver.state(), DriverState::Idle);
}

#[tokio::test(start_paused = true)]
async fn encoder_fault_aborts_run_and_releases_encoder() {
    let (driver, backend) = driver(MemoryBackendConfig {
        fail_after_frames: Some(5),
        ..Default::default()
    });
    let scenes = vec![colored_scene(RED, 2)];
    let mut refresh = TokioRefresh::new(FPS);

    let err = driver.generate(&scenes, None, &mut refresh).await.unwrap_err();
    assert!(matches!(err, ReelError::Capture { .. }));
    assert_eq!(backend.stats().active_encoders(), 0);
    assert_eq!(backend.stats().frame_count(), 5);
    assert_eq!(driver.state(), DriverState::Idle);
    assert!(!driver.is_busy());
}

#[tokio::test(start_paused = true)]
async fn soundtrack_refused_by_encoder_is_reported_unavailable() {
    let (driver, backend) = driver(MemoryBackendConfig {
        audio_encoder_available: false,
        ..Default::default()
    });
    let path = audio_file("refused");
    let scenes = vec![colored_scene(RED, 1)];
    let mut refresh = TokioRefresh::new(FPS);

    let report = completed(
        driver
            .generate(&scenes, Some(AudioAsset::new(&path)), &mut refresh)
            .await
            .unwrap(),
    );

    assert!(matches!(report.audio, AudioStatus::Unavailable(_)));
    assert!(report.video.size_bytes() > 0);
    assert_eq!(backend.stats().audio_tracks_connected(), 0);
    assert_eq!(backend.stats().audio_chunks(), 0);
    std::fs::remove_file(path).ok();
}

/// Runs on the real clock so slow draws push the first frame of each scene
/// past the next scheduled refresh.
#[tokio::test]
async fn frame_times_never_go_backwards_with_slow_draws() {
    let backend = MemoryBackend::default();
    let compositor =
        FrameCompositor::new(1280, 720, CompositorStyle::default(), TextRenderer::fallback()).unwrap();
    let driver = TimelineDriver::new(
        Arc::new(backend.clone()),
        DriverSettings {
            fps: 30,
            ..Default::default()
        },
        compositor,
    );
    let large = |px: [u8; 4]| {
        let img = RgbaImage::from_pixel(3000, 2000, image::Rgba(px));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        Scene::new(None, Some(Arc::from(buf.into_inner())), 1)
    };
    let scenes = vec![large(RED), large(GREEN), large(BLUE)];
    let mut refresh = TokioRefresh::new(30);

    let report = completed(driver.generate(&scenes, None, &mut refresh).await.unwrap());

    let frames = backend.stats().frames();
    assert!(frames.windows(2).all(|w| w[0].pts <= w[1].pts));
    for (timing, color) in report.timings.iter().zip([RED, GREEN, BLUE]) {
        let first = frames.iter().find(|f| f.center == color).unwrap();
        assert!(first.pts >= timing.start, "scene {} shown early", timing.index);
        assert!(frames
            .iter()
            .filter(|f| f.center == color)
            .all(|f| f.pts >= timing.start));
    }
}
