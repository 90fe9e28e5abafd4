//! In-memory capture backend.
//!
//! Records every submitted frame and emits a small deterministic byte stream
//! instead of real media. Used by tests and `--dry-run`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use scenereel_common::error::{ReelError, ReelResult};
use scenereel_render_engine::Surface;

use super::{CaptureBackend, EncoderEvent, EncoderEvents, EncoderPipeline};
use crate::audio::{AudioAsset, AudioChunk, AudioGraph, AudioSink, AudioTap, AUDIO_CHANNELS};
use crate::container::ContainerFormat;
use crate::mixer::CombinedStream;

/// Behaviour knobs for [`MemoryBackend`].
#[derive(Debug, Clone)]
pub struct MemoryBackendConfig {
    /// Containers the backend claims to support.
    pub supported: Vec<ContainerFormat>,

    /// Make audio playback fail to start.
    pub audio_playback_fails: bool,

    /// Whether encoders accept audio tracks. When false, taps are left
    /// unattached and only video is recorded.
    pub audio_encoder_available: bool,

    /// Frames buffered before a fragment is emitted.
    pub frames_per_fragment: u32,

    /// Report an encoder fault once this many frames were submitted.
    pub fail_after_frames: Option<u64>,

    /// Silent chunks delivered to the tap when playback starts.
    pub audio_chunks_on_play: u32,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self {
            supported: ContainerFormat::FALLBACK_ORDER.to_vec(),
            audio_playback_fails: false,
            audio_encoder_available: true,
            frames_per_fragment: 30,
            fail_after_frames: None,
            audio_chunks_on_play: 4,
        }
    }
}

/// A frame as seen by the memory encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
    pub pts: Duration,
    /// Center pixel of the submitted surface.
    pub center: [u8; 4],
}

#[derive(Debug, Default)]
struct StatsInner {
    encoders_opened: u32,
    active_encoders: u32,
    max_concurrent_encoders: u32,
    frames: Vec<FrameRecord>,
    audio_graphs_opened: u32,
    audio_tracks_connected: u32,
    audio_chunks: u64,
    audio_tracks_ended: u32,
    fragments_emitted: u64,
}

/// Counters shared between a [`MemoryBackend`] and everything it built.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    inner: Arc<Mutex<StatsInner>>,
}

impl MemoryStats {
    fn lock(&self) -> MutexGuard<'_, StatsInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn encoders_opened(&self) -> u32 {
        self.lock().encoders_opened
    }

    pub fn active_encoders(&self) -> u32 {
        self.lock().active_encoders
    }

    pub fn max_concurrent_encoders(&self) -> u32 {
        self.lock().max_concurrent_encoders
    }

    /// Every frame submitted to any encoder, in submission order.
    pub fn frames(&self) -> Vec<FrameRecord> {
        self.lock().frames.clone()
    }

    pub fn frame_count(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn audio_graphs_opened(&self) -> u32 {
        self.lock().audio_graphs_opened
    }

    pub fn audio_tracks_connected(&self) -> u32 {
        self.lock().audio_tracks_connected
    }

    pub fn audio_chunks(&self) -> u64 {
        self.lock().audio_chunks
    }

    pub fn audio_tracks_ended(&self) -> u32 {
        self.lock().audio_tracks_ended
    }

    pub fn fragments_emitted(&self) -> u64 {
        self.lock().fragments_emitted
    }
}

/// Capture backend that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    config: MemoryBackendConfig,
    stats: MemoryStats,
}

impl MemoryBackend {
    pub fn new(config: MemoryBackendConfig) -> Self {
        Self {
            config,
            stats: MemoryStats::default(),
        }
    }

    pub fn stats(&self) -> MemoryStats {
        self.stats.clone()
    }

    pub fn config(&self) -> &MemoryBackendConfig {
        &self.config
    }
}

impl CaptureBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn supports_container(&self, container: ContainerFormat) -> bool {
        self.config.supported.contains(&container)
    }

    fn open_audio_graph(&self, asset: &AudioAsset, tap: AudioTap) -> ReelResult<Box<dyn AudioGraph>> {
        if !asset.path().exists() {
            return Err(ReelError::FileNotFound {
                path: asset.path().to_path_buf(),
            });
        }
        self.stats.lock().audio_graphs_opened += 1;
        Ok(Box::new(MemoryAudioGraph {
            tap,
            fails: self.config.audio_playback_fails,
            chunks_on_play: self.config.audio_chunks_on_play,
            position: Duration::ZERO,
        }))
    }

    fn open_encoder(
        &self,
        stream: &CombinedStream,
        container: ContainerFormat,
        events: EncoderEvents,
    ) -> ReelResult<Box<dyn EncoderPipeline>> {
        if !self.supports_container(container) {
            return Err(ReelError::capture_unsupported(format!(
                "memory backend not configured for {container}"
            )));
        }

        let video = stream.video();
        let header = format!(
            "SCENEREEL {} {}x{}@{}\n",
            container.extension(),
            video.width,
            video.height,
            video.fps
        );
        events
            .send(EncoderEvent::Fragment(header.into_bytes()))
            .map_err(|_| ReelError::capture("encoder event channel closed"))?;

        let mut connected = 0;
        if self.config.audio_encoder_available {
            for track in stream.audio_tracks() {
                track.tap().attach(Box::new(CountingSink {
                    stats: self.stats.clone(),
                }));
                connected += 1;
            }
        }

        {
            let mut stats = self.stats.lock();
            stats.encoders_opened += 1;
            stats.active_encoders += 1;
            stats.max_concurrent_encoders = stats.max_concurrent_encoders.max(stats.active_encoders);
            stats.audio_tracks_connected += connected;
            stats.fragments_emitted += 1;
        }

        Ok(Box::new(MemoryEncoder {
            events: Some(events),
            stats: self.stats.clone(),
            pending: Vec::new(),
            pending_frames: 0,
            frames_per_fragment: self.config.frames_per_fragment.max(1),
            fail_after_frames: self.config.fail_after_frames,
            submitted: 0,
            faulted: false,
        }))
    }
}

struct MemoryEncoder {
    events: Option<EncoderEvents>,
    stats: MemoryStats,
    pending: Vec<u8>,
    pending_frames: u32,
    frames_per_fragment: u32,
    fail_after_frames: Option<u64>,
    submitted: u64,
    faulted: bool,
}

impl MemoryEncoder {
    fn emit(&mut self, event: EncoderEvent) {
        if let Some(events) = &self.events {
            if matches!(event, EncoderEvent::Fragment(_)) {
                self.stats.lock().fragments_emitted += 1;
            }
            // The receiver is gone only after an abort; nothing to report to.
            let _ = events.send(event);
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let fragment = std::mem::take(&mut self.pending);
        self.pending_frames = 0;
        self.emit(EncoderEvent::Fragment(fragment));
    }

    fn close(&mut self) {
        if self.events.take().is_some() {
            let mut stats = self.stats.lock();
            stats.active_encoders = stats.active_encoders.saturating_sub(1);
        }
    }
}

impl EncoderPipeline for MemoryEncoder {
    fn push_frame(&mut self, frame: &Surface, pts: Duration) -> ReelResult<()> {
        if self.events.is_none() {
            return Err(ReelError::capture("memory encoder already finished"));
        }

        self.submitted += 1;
        if let Some(limit) = self.fail_after_frames {
            if self.submitted > limit && !self.faulted {
                self.faulted = true;
                self.emit(EncoderEvent::Fault(format!(
                    "simulated encoder fault after {limit} frames"
                )));
                return Ok(());
            }
        }

        let center = frame
            .pixel(frame.width() / 2, frame.height() / 2)
            .unwrap_or([0, 0, 0, 0]);
        self.stats.lock().frames.push(FrameRecord { pts, center });

        self.pending.extend_from_slice(&(pts.as_millis() as u64).to_le_bytes());
        self.pending.extend_from_slice(&center);
        self.pending_frames += 1;
        if self.pending_frames >= self.frames_per_fragment {
            self.flush();
        }
        Ok(())
    }

    fn finish(&mut self) -> ReelResult<()> {
        self.flush();
        self.emit(EncoderEvent::Fragment(b"END\n".to_vec()));
        self.close();
        Ok(())
    }
}

impl Drop for MemoryEncoder {
    fn drop(&mut self) {
        self.close();
    }
}

struct CountingSink {
    stats: MemoryStats,
}

impl AudioSink for CountingSink {
    fn push(&mut self, _chunk: AudioChunk) {
        self.stats.lock().audio_chunks += 1;
    }

    fn end(&mut self) {
        self.stats.lock().audio_tracks_ended += 1;
    }
}

struct MemoryAudioGraph {
    tap: AudioTap,
    fails: bool,
    chunks_on_play: u32,
    position: Duration,
}

impl AudioGraph for MemoryAudioGraph {
    fn play(&mut self) -> ReelResult<()> {
        if self.fails {
            return Err(ReelError::audio_unavailable("playback was not allowed to start"));
        }
        for _ in 0..self.chunks_on_play {
            let chunk = AudioChunk {
                samples: vec![0.0; 480 * AUDIO_CHANNELS as usize],
                position: Some(self.position),
            };
            self.position += chunk.duration();
            self.tap.deliver(chunk);
        }
        Ok(())
    }

    fn pause(&mut self) -> ReelResult<()> {
        Ok(())
    }
}
