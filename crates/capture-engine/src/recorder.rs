//! Encoder lifecycle.
//!
//! The recorder owns one encoder at a time and accumulates the fragments it
//! emits. Fragments are kept strictly in arrival order; the final video is
//! their concatenation.

use std::sync::Arc;
use std::time::Duration;

use scenereel_common::error::{ReelError, ReelResult};
use scenereel_common::format::{format_size, output_file_name};
use scenereel_render_engine::Surface;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

use crate::backend::{CaptureBackend, EncoderEvent, EncoderPipeline};
use crate::container::{negotiate, ContainerChoice, ContainerFormat};
use crate::mixer::CombinedStream;

/// Recorder lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Stopping,
    Finalized,
}

/// The finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedVideo {
    data: Vec<u8>,
    container: ContainerFormat,
    fragment_count: usize,
    file_name: String,
}

impl RecordedVideo {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn container(&self) -> ContainerFormat {
        self.container
    }

    pub fn mime_type(&self) -> &'static str {
        self.container.mime_type()
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    /// Human-readable size, e.g. `1.5 MB`.
    pub fn size_label(&self) -> String {
        format_size(self.size_bytes())
    }

    /// Download name, `ai_video_<unix ms>.<ext>`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Drives one backend encoder through start, frames, and finalize.
pub struct CaptureRecorder {
    backend: Arc<dyn CaptureBackend>,
    preferred: ContainerFormat,
    state: RecorderState,
    encoder: Option<Box<dyn EncoderPipeline>>,
    events: Option<UnboundedReceiver<EncoderEvent>>,
    fragments: Vec<Vec<u8>>,
    choice: Option<ContainerChoice>,
    frames_submitted: u64,
}

impl CaptureRecorder {
    pub fn new(backend: Arc<dyn CaptureBackend>, preferred: ContainerFormat) -> Self {
        Self {
            backend,
            preferred,
            state: RecorderState::Idle,
            encoder: None,
            events: None,
            fragments: Vec::new(),
            choice: None,
            frames_submitted: 0,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Container picked by the last successful `start`.
    pub fn container_choice(&self) -> Option<ContainerChoice> {
        self.choice
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Negotiate a container and start encoding `stream`.
    ///
    /// On any failure the recorder stays `Idle`.
    pub fn start(&mut self, stream: &CombinedStream) -> ReelResult<ContainerChoice> {
        if self.state != RecorderState::Idle {
            return Err(ReelError::invalid_state("start", self.state));
        }

        let backend = Arc::clone(&self.backend);
        let choice = negotiate(self.preferred, |c| backend.supports_container(c))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let encoder = self.backend.open_encoder(stream, choice.format(), tx)?;

        self.encoder = Some(encoder);
        self.events = Some(rx);
        self.fragments.clear();
        self.frames_submitted = 0;
        self.choice = Some(choice);
        self.state = RecorderState::Recording;

        tracing::info!(
            backend = self.backend.name(),
            container = %choice.format(),
            fallback = choice.is_fallback(),
            tracks = stream.tracks().len(),
            "Recorder started"
        );
        Ok(choice)
    }

    /// Submit the current surface as the frame at `pts`.
    pub fn push_frame(&mut self, frame: &Surface, pts: Duration) -> ReelResult<()> {
        if self.state != RecorderState::Recording {
            return Err(ReelError::invalid_state("push a frame", self.state));
        }
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| ReelError::invalid_state("push a frame", RecorderState::Idle))?;
        encoder.push_frame(frame, pts)?;
        self.frames_submitted += 1;
        self.collect()
    }

    /// Move fragments that have already arrived into the buffer.
    pub fn collect(&mut self) -> ReelResult<()> {
        let Some(events) = self.events.as_mut() else {
            return Ok(());
        };
        loop {
            match events.try_recv() {
                Ok(EncoderEvent::Fragment(bytes)) => {
                    tracing::trace!(bytes = bytes.len(), "Fragment received");
                    self.fragments.push(bytes);
                }
                Ok(EncoderEvent::Fault(message)) => return Err(ReelError::capture(message)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
    }

    /// Flush the encoder and assemble the final video.
    ///
    /// Waits until the encoder has dropped its event channel, so every
    /// fragment is in the result.
    pub async fn stop(&mut self) -> ReelResult<RecordedVideo> {
        if self.state != RecorderState::Recording {
            return Err(ReelError::invalid_state("stop", self.state));
        }
        self.state = RecorderState::Stopping;

        let result = self.finalize().await;
        match &result {
            Ok(video) => {
                self.state = RecorderState::Finalized;
                tracing::info!(
                    file = %video.file_name(),
                    size = %video.size_label(),
                    fragments = video.fragment_count(),
                    frames = self.frames_submitted,
                    "Recording finalized"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Recording failed to finalize");
                self.clear();
            }
        }
        result
    }

    async fn finalize(&mut self) -> ReelResult<RecordedVideo> {
        let container = self
            .choice
            .map(ContainerChoice::format)
            .ok_or_else(|| ReelError::invalid_state("stop", RecorderState::Idle))?;

        if let Some(mut encoder) = self.encoder.take() {
            // Finishing blocks on the encoder's flush.
            tokio::task::spawn_blocking(move || encoder.finish())
                .await
                .map_err(|e| ReelError::capture(format!("encoder finish task failed: {e}")))??;
        }

        if let Some(mut events) = self.events.take() {
            while let Some(event) = events.recv().await {
                match event {
                    EncoderEvent::Fragment(bytes) => self.fragments.push(bytes),
                    EncoderEvent::Fault(message) => return Err(ReelError::capture(message)),
                }
            }
        }

        let fragments = std::mem::take(&mut self.fragments);
        let fragment_count = fragments.len();
        Ok(RecordedVideo {
            data: fragments.concat(),
            container,
            fragment_count,
            file_name: output_file_name(chrono::Utc::now().timestamp_millis(), container.extension()),
        })
    }

    /// Tear down without producing output. Safe in any state.
    pub fn abort(&mut self) {
        if self.state == RecorderState::Idle && self.encoder.is_none() {
            return;
        }
        tracing::warn!(state = ?self.state, "Recorder aborted");
        self.clear();
    }

    /// Return a finalized recorder to `Idle` for another run.
    pub fn reset(&mut self) -> ReelResult<()> {
        match self.state {
            RecorderState::Finalized | RecorderState::Idle => {
                self.clear();
                Ok(())
            }
            state => Err(ReelError::invalid_state("reset", state)),
        }
    }

    fn clear(&mut self) {
        // Dropping the encoder tears its pipeline down.
        self.encoder = None;
        self.events = None;
        self.fragments.clear();
        self.choice = None;
        self.frames_submitted = 0;
        self.state = RecorderState::Idle;
    }
}

impl std::fmt::Debug for CaptureRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureRecorder")
            .field("backend", &self.backend.name())
            .field("preferred", &self.preferred)
            .field("state", &self.state)
            .field("fragments", &self.fragments.len())
            .finish()
    }
}
