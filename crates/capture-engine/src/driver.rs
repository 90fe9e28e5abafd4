//! Timeline driver.
//!
//! Runs one generate pass: preload every image, start recording, show each
//! scene for its duration while capturing every refresh, settle briefly,
//! then stop and hand back the finished video.
//!
//! ```text
//! Idle ─► Preloading ─► Recording ─► Rendering{0..n} ─► Settling ─► Stopping ─► Finalized ─► Idle
//!             │                           │
//!             └──── failure ──────────────┴──────────► Idle
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scenereel_common::config::RecordingDefaults;
use scenereel_common::error::{ReelError, ReelResult};
use scenereel_render_engine::{FrameCompositor, ImagePreloader, PreloadedScenes};
use scenereel_scene_model::Scene;
use tokio::sync::{watch, Mutex};

use crate::audio::AudioAsset;
use crate::backend::CaptureBackend;
use crate::container::{ContainerChoice, ContainerFormat};
use crate::mixer::VideoTrack;
use crate::recorder::RecordedVideo;
use crate::refresh::{hold_until, RefreshSource};
use crate::session::{AudioStatus, RecordingSession, SceneTiming};

/// Default hold after the last scene so its final frames are captured.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(200);

/// Driver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Preloading,
    Recording,
    Rendering { scene: usize },
    Settling,
    Stopping,
    Finalized,
}

/// Run parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    pub fps: u32,
    pub container: ContainerFormat,
    pub settle: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            container: ContainerFormat::WebM,
            settle: DEFAULT_SETTLE,
        }
    }
}

impl DriverSettings {
    pub fn from_config(config: &RecordingDefaults) -> ReelResult<Self> {
        Ok(Self {
            fps: config.fps.max(1),
            container: config.container.parse()?,
            settle: Duration::from_millis(config.settle_ms),
        })
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub video: RecordedVideo,
    pub timings: Vec<SceneTiming>,
    pub container: Option<ContainerChoice>,
    pub audio: AudioStatus,
    pub frames: u64,
    pub started_at: String,
}

/// Outcome of [`TimelineDriver::generate`].
#[derive(Debug)]
pub enum GenerateOutcome {
    Completed(RunReport),
    /// Another run was already active; this call did nothing.
    Ignored,
}

/// Orchestrates one generate run at a time.
pub struct TimelineDriver {
    backend: Arc<dyn CaptureBackend>,
    settings: DriverSettings,
    compositor: Mutex<FrameCompositor>,
    preloader: ImagePreloader,
    state: watch::Sender<DriverState>,
    busy: AtomicBool,
}

/// Clears the busy flag and returns the driver to Idle however a run ends.
struct RunGuard<'a> {
    driver: &'a TimelineDriver,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.driver.set_state(DriverState::Idle);
        self.driver.busy.store(false, Ordering::SeqCst);
    }
}

impl TimelineDriver {
    pub fn new(backend: Arc<dyn CaptureBackend>, settings: DriverSettings, compositor: FrameCompositor) -> Self {
        let (state, _) = watch::channel(DriverState::Idle);
        Self {
            backend,
            settings,
            compositor: Mutex::new(compositor),
            preloader: ImagePreloader::new(),
            state,
            busy: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> DriverState {
        *self.state.borrow()
    }

    /// Follow state transitions.
    pub fn subscribe(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    pub fn backend(&self) -> &Arc<dyn CaptureBackend> {
        &self.backend
    }

    /// Render `scenes` into a video, optionally with a soundtrack.
    ///
    /// Returns [`GenerateOutcome::Ignored`] without doing anything if a run
    /// is already in progress.
    pub async fn generate(
        &self,
        scenes: &[Scene],
        audio: Option<AudioAsset>,
        refresh: &mut dyn RefreshSource,
    ) -> ReelResult<GenerateOutcome> {
        if scenes.is_empty() {
            return Err(ReelError::EmptyTimeline);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Generate ignored; a run is already active");
            return Ok(GenerateOutcome::Ignored);
        }
        let _guard = RunGuard { driver: self };

        tracing::info!(
            scenes = scenes.len(),
            total_secs = scenes.iter().map(|s| s.duration_secs() as u64).sum::<u64>(),
            audio = audio.is_some(),
            "Generate started"
        );

        self.set_state(DriverState::Preloading);
        let preloaded = self.preloader.preload(scenes).await?;

        let mut compositor = self.compositor.lock().await;
        let video = VideoTrack::new(
            compositor.surface().width(),
            compositor.surface().height(),
            self.settings.fps,
        );

        let mut session = RecordingSession::new(Arc::clone(&self.backend), self.settings.container, audio);
        let stream = session.stream(video);

        self.set_state(DriverState::Recording);
        session.start(&stream, refresh.now())?;

        if let Err(e) = self
            .render_scenes(&mut session, &preloaded, &mut compositor, &mut *refresh)
            .await
        {
            session.abort();
            tracing::warn!(error = %e, "Generate failed; recording discarded");
            return Err(e);
        }

        self.set_state(DriverState::Stopping);
        let finished = session.finish().await?;
        self.set_state(DriverState::Finalized);

        tracing::info!(
            file = %finished.video.file_name(),
            size = %finished.video.size_label(),
            frames = finished.frames,
            audio = ?finished.audio_status,
            "Generate finished"
        );

        Ok(GenerateOutcome::Completed(RunReport {
            video: finished.video,
            timings: finished.timings,
            container: finished.container,
            audio: finished.audio_status,
            frames: finished.frames,
            started_at: finished.started_at,
        }))
    }

    async fn render_scenes(
        &self,
        session: &mut RecordingSession,
        scenes: &PreloadedScenes,
        compositor: &mut FrameCompositor,
        refresh: &mut dyn RefreshSource,
    ) -> ReelResult<()> {
        for scene in scenes {
            self.set_state(DriverState::Rendering { scene: scene.index() });
            compositor.draw(scene);

            let start = refresh.now();
            session.capture(compositor.surface(), start)?;
            let deadline = start + Duration::from_secs(scene.duration_secs() as u64);
            let ticks = hold_until(&mut *refresh, deadline, |now| {
                session.capture(compositor.surface(), now)
            })
            .await?;

            let end = refresh.now();
            session.record_timing(SceneTiming {
                index: scene.index(),
                start: session.pts(start),
                end: session.pts(end),
                frames: ticks + 1,
            });
        }

        self.set_state(DriverState::Settling);
        let deadline = refresh.now() + self.settings.settle;
        hold_until(&mut *refresh, deadline, |now| {
            session.capture(compositor.surface(), now)
        })
        .await?;
        Ok(())
    }

    fn set_state(&self, state: DriverState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = ?previous, to = ?state, "Driver state changed");
        }
    }
}

impl std::fmt::Debug for TimelineDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineDriver")
            .field("backend", &self.backend.name())
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish()
    }
}
