//! Soundtrack playback and capture.
//!
//! An [`AudioGraphBridge`] routes one audio file to two places at once: the
//! live monitor output, and an [`AudioTap`] the encoder attaches to. The tap
//! is a relay: the graph delivers decoded chunks into it and whichever sink
//! is attached (if any) receives them.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use scenereel_common::error::{ReelError, ReelResult};

use crate::backend::CaptureBackend;
use crate::mixer::AudioTrack;

/// Sample rate of captured audio.
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;

/// Channel count of captured audio (interleaved).
pub const AUDIO_CHANNELS: u32 = 2;

/// An audio file chosen as the soundtrack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    path: PathBuf,
}

impl AudioAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used to label the captured track.
    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string())
    }
}

/// A block of interleaved F32 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    /// Position in the source file, when known.
    pub position: Option<Duration>,
}

impl AudioChunk {
    /// Duration covered by the chunk at the capture rate.
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() as u64 / AUDIO_CHANNELS as u64;
        Duration::from_nanos(frames * 1_000_000_000 / AUDIO_SAMPLE_RATE as u64)
    }
}

/// Receiver side of an [`AudioTap`].
pub trait AudioSink: Send {
    fn push(&mut self, chunk: AudioChunk);

    /// No more chunks will arrive.
    fn end(&mut self);
}

/// Shared relay between an audio graph and an encoder.
#[derive(Clone, Default)]
pub struct AudioTap {
    sink: Arc<Mutex<Option<Box<dyn AudioSink>>>>,
}

impl AudioTap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route future chunks to `sink`, replacing any previous sink.
    pub fn attach(&self, sink: Box<dyn AudioSink>) {
        *self.lock() = Some(sink);
    }

    /// Stop routing chunks. The detached sink is not ended.
    pub fn detach(&self) {
        self.lock().take();
    }

    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    /// Forward a chunk. Returns `false` when nothing is attached.
    pub fn deliver(&self, chunk: AudioChunk) -> bool {
        match self.lock().as_mut() {
            Some(sink) => {
                sink.push(chunk);
                true
            }
            None => false,
        }
    }

    /// End the attached sink's stream and detach it.
    pub fn close(&self) {
        if let Some(mut sink) = self.lock().take() {
            sink.end();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn AudioSink>>> {
        // A panicking sink must not take the relay down with it.
        self.sink.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for AudioTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioTap")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Backend-specific playback graph for one audio file.
pub trait AudioGraph: Send {
    /// Begin playback to the monitor output and the tap.
    fn play(&mut self) -> ReelResult<()>;

    /// Pause playback.
    fn pause(&mut self) -> ReelResult<()>;
}

/// Wires an [`AudioAsset`] into a playback graph with a capturable tap.
pub struct AudioGraphBridge {
    asset: AudioAsset,
    graph: Box<dyn AudioGraph>,
    tap: AudioTap,
    playing: bool,
}

impl AudioGraphBridge {
    /// Build the graph. Failure means the soundtrack cannot be used at all.
    pub fn open(backend: &dyn CaptureBackend, asset: AudioAsset) -> ReelResult<Self> {
        let tap = AudioTap::new();
        let graph = backend
            .open_audio_graph(&asset, tap.clone())
            .map_err(|e| ReelError::audio_unavailable(format!("{}: {e}", asset.label())))?;
        tracing::debug!(asset = %asset.path().display(), "Audio graph opened");
        Ok(Self {
            asset,
            graph,
            tap,
            playing: false,
        })
    }

    pub fn asset(&self) -> &AudioAsset {
        &self.asset
    }

    /// Track to hand to the stream mixer.
    pub fn capture_track(&self) -> AudioTrack {
        AudioTrack::new(self.asset.label(), self.tap.clone())
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Whether an encoder has attached to the captured track.
    pub fn is_connected(&self) -> bool {
        self.tap.is_attached()
    }

    /// Start playback. On failure the captured track stays silent.
    pub fn start(&mut self) -> ReelResult<()> {
        match self.graph.play() {
            Ok(()) => {
                self.playing = true;
                tracing::info!(asset = %self.asset.label(), "Audio playback started");
                Ok(())
            }
            Err(e) => {
                // Ends the encoder's audio branch so it never waits on silence.
                self.tap.close();
                Err(ReelError::audio_unavailable(e.to_string()))
            }
        }
    }

    /// Pause playback. Errors are logged, never returned.
    pub fn stop(&mut self) {
        if !self.playing {
            return;
        }
        if let Err(e) = self.graph.pause() {
            tracing::warn!(error = %e, "Failed to pause audio playback");
        }
        self.playing = false;
        tracing::debug!(asset = %self.asset.label(), "Audio playback paused");
    }
}

impl std::fmt::Debug for AudioGraphBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioGraphBridge")
            .field("asset", &self.asset)
            .field("playing", &self.playing)
            .finish()
    }
}
