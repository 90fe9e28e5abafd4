//! Per-run recording state.

use std::sync::Arc;
use std::time::Duration;

use scenereel_common::clock::RecordingClock;
use scenereel_common::error::{ReelError, ReelResult};
use scenereel_render_engine::Surface;

use crate::audio::{AudioAsset, AudioGraphBridge};
use crate::backend::CaptureBackend;
use crate::container::{ContainerChoice, ContainerFormat};
use crate::mixer::{CombinedStream, StreamMixer, VideoTrack};
use crate::recorder::{CaptureRecorder, RecordedVideo};

/// What happened to the soundtrack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioStatus {
    /// Audio played and its track was muxed.
    Muxed,
    /// Audio was requested but could not be used; the video is silent.
    Unavailable(String),
    /// No audio was requested.
    Absent,
}

/// When one scene was on screen, relative to the start of recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneTiming {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    /// Frames submitted while the scene was shown.
    pub frames: u64,
}

impl SceneTiming {
    pub fn held(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Everything owned by one generate run: recorder, optional soundtrack,
/// clock and the scene timings collected so far.
///
/// Dropped once the run is finalized or has failed.
#[derive(Debug)]
pub struct RecordingSession {
    recorder: CaptureRecorder,
    audio: Option<AudioGraphBridge>,
    audio_status: AudioStatus,
    clock: RecordingClock,
    origin: Duration,
    last_pts: Duration,
    timings: Vec<SceneTiming>,
}

impl RecordingSession {
    /// Create a session. An audio asset that cannot be opened degrades the
    /// run to a silent video.
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        container: ContainerFormat,
        audio: Option<AudioAsset>,
    ) -> Self {
        let (audio, audio_status) = match audio {
            None => (None, AudioStatus::Absent),
            Some(asset) => match AudioGraphBridge::open(backend.as_ref(), asset) {
                Ok(bridge) => (Some(bridge), AudioStatus::Muxed),
                Err(e) => {
                    tracing::warn!(error = %e, "Soundtrack unavailable; recording silent video");
                    (None, AudioStatus::Unavailable(e.to_string()))
                }
            },
        };

        Self {
            recorder: CaptureRecorder::new(backend, container),
            audio,
            audio_status,
            clock: RecordingClock::start(),
            origin: Duration::ZERO,
            last_pts: Duration::ZERO,
            timings: Vec::new(),
        }
    }

    /// Combine the video track with the soundtrack tap, if any.
    pub fn stream(&self, video: VideoTrack) -> CombinedStream {
        let mut mixer = StreamMixer::new(video);
        if let Some(bridge) = &self.audio {
            mixer.add_audio(bridge.capture_track());
        }
        mixer.combine()
    }

    /// Start recording, then start the soundtrack.
    ///
    /// `origin` is the refresh time that becomes pts zero.
    pub fn start(&mut self, stream: &CombinedStream, origin: Duration) -> ReelResult<ContainerChoice> {
        let choice = self.recorder.start(stream)?;
        self.origin = origin;
        self.last_pts = Duration::ZERO;
        self.clock = RecordingClock::start();

        if let Some(bridge) = self.audio.as_mut() {
            if !bridge.is_connected() {
                let e = ReelError::audio_unavailable(format!(
                    "{} was not connected to the encoder",
                    bridge.asset().label()
                ));
                tracing::warn!(error = %e, "Recording silent video");
                self.audio_status = AudioStatus::Unavailable(e.to_string());
            } else if let Err(e) = bridge.start() {
                tracing::warn!(error = %e, "Audio playback failed; recording silent video");
                self.audio_status = AudioStatus::Unavailable(e.to_string());
            }
        }

        tracing::info!(
            started_at = %self.clock.epoch_wall(),
            audio = ?self.audio_status,
            "Recording session started"
        );
        Ok(choice)
    }

    /// Submit `surface` as the frame shown at refresh time `now`.
    ///
    /// Stream time never goes backwards, even if `now` does.
    pub fn capture(&mut self, surface: &Surface, now: Duration) -> ReelResult<()> {
        let pts = self.pts(now).max(self.last_pts);
        self.recorder.push_frame(surface, pts)?;
        self.last_pts = pts;
        Ok(())
    }

    /// Convert a refresh time into stream time.
    pub fn pts(&self, now: Duration) -> Duration {
        now.saturating_sub(self.origin)
    }

    pub fn record_timing(&mut self, timing: SceneTiming) {
        tracing::debug!(
            scene = timing.index,
            start_ms = timing.start.as_millis() as u64,
            held_ms = timing.held().as_millis() as u64,
            frames = timing.frames,
            "Scene held"
        );
        self.timings.push(timing);
    }

    pub fn timings(&self) -> &[SceneTiming] {
        &self.timings
    }

    pub fn audio_status(&self) -> &AudioStatus {
        &self.audio_status
    }

    pub fn recorder(&self) -> &CaptureRecorder {
        &self.recorder
    }

    pub fn clock(&self) -> &RecordingClock {
        &self.clock
    }

    /// Stop the recorder, then pause the soundtrack.
    pub async fn finish(mut self) -> ReelResult<FinishedSession> {
        let result = self.recorder.stop().await;
        self.stop_audio();
        let video = result?;
        tracing::debug!(
            elapsed_ms = self.clock.elapsed().as_millis() as u64,
            "Recording session finished"
        );
        Ok(FinishedSession {
            video,
            container: self.recorder.container_choice(),
            frames: self.recorder.frames_submitted(),
            timings: self.timings,
            audio_status: self.audio_status,
            started_at: self.clock.epoch_wall(),
        })
    }

    /// Tear everything down after a failure.
    pub fn abort(&mut self) {
        self.recorder.abort();
        self.stop_audio();
    }

    fn stop_audio(&mut self) {
        if let Some(bridge) = self.audio.as_mut() {
            bridge.stop();
        }
    }
}

/// Output of a finished session.
#[derive(Debug)]
pub struct FinishedSession {
    pub video: RecordedVideo,
    pub container: Option<ContainerChoice>,
    pub frames: u64,
    pub timings: Vec<SceneTiming>,
    pub audio_status: AudioStatus,
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, MemoryBackendConfig};

    fn audio_file(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("scenereel_session_{name}_{}.ogg", std::process::id()));
        std::fs::write(&path, b"OggS").unwrap();
        path
    }

    #[tokio::test]
    async fn test_capture_never_moves_stream_time_backwards() {
        let backend = MemoryBackend::default();
        let mut session = RecordingSession::new(Arc::new(backend.clone()), ContainerFormat::WebM, None);
        let stream = session.stream(VideoTrack::new(4, 4, 10));
        let surface = Surface::new(4, 4).unwrap();

        session.start(&stream, Duration::from_millis(500)).unwrap();
        session.capture(&surface, Duration::from_millis(600)).unwrap();
        session.capture(&surface, Duration::from_millis(550)).unwrap();
        session.capture(&surface, Duration::from_millis(700)).unwrap();

        let pts: Vec<u128> = backend.stats().frames().iter().map(|f| f.pts.as_millis()).collect();
        assert_eq!(pts, vec![100, 100, 200]);
        session.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_unconnected_soundtrack_is_reported_unavailable() {
        let backend = MemoryBackend::new(MemoryBackendConfig {
            audio_encoder_available: false,
            ..Default::default()
        });
        let path = audio_file("unconnected");
        let mut session = RecordingSession::new(
            Arc::new(backend.clone()),
            ContainerFormat::WebM,
            Some(AudioAsset::new(&path)),
        );
        assert_eq!(session.audio_status(), &AudioStatus::Muxed);

        let stream = session.stream(VideoTrack::new(4, 4, 10));
        assert!(stream.has_audio());
        session.start(&stream, Duration::ZERO).unwrap();

        assert!(matches!(session.audio_status(), AudioStatus::Unavailable(_)));
        assert_eq!(backend.stats().audio_tracks_connected(), 0);
        assert_eq!(backend.stats().audio_chunks(), 0);

        let finished = session.finish().await.unwrap();
        assert!(matches!(finished.audio_status, AudioStatus::Unavailable(_)));
        std::fs::remove_file(path).ok();
    }
}
