//! Capture backends.
//!
//! A backend knows which containers it can write, how to play an audio file
//! while tapping its samples, and how to build an encoder for a combined
//! stream. The recorder and driver only talk to these traits.

use std::sync::Arc;
use std::time::Duration;

use scenereel_common::error::ReelResult;
use scenereel_render_engine::Surface;
use tokio::sync::mpsc::UnboundedSender;

use crate::audio::{AudioAsset, AudioGraph, AudioTap};
use crate::container::ContainerFormat;
use crate::mixer::CombinedStream;

#[cfg(feature = "gstreamer")]
pub mod gst;
pub mod memory;

#[cfg(feature = "gstreamer")]
pub use self::gst::GstBackend;
pub use memory::{FrameRecord, MemoryBackend, MemoryBackendConfig, MemoryStats};

/// Message from a running encoder to its recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// A chunk of muxed output, in stream order.
    Fragment(Vec<u8>),
    /// The encoder hit an unrecoverable error.
    Fault(String),
}

/// Channel an encoder reports on. The recorder treats the channel closing
/// (every sender dropped) as "all fragments delivered".
pub type EncoderEvents = UnboundedSender<EncoderEvent>;

/// A running encoder for one combined stream.
pub trait EncoderPipeline: Send {
    /// Submit one frame of the video track at presentation time `pts`.
    fn push_frame(&mut self, frame: &Surface, pts: Duration) -> ReelResult<()>;

    /// Signal end of stream and block until output is flushed. After this
    /// returns the encoder must have dropped its event senders.
    fn finish(&mut self) -> ReelResult<()>;
}

/// Platform capture capabilities.
pub trait CaptureBackend: Send + Sync {
    /// Short name for logs and capability reports.
    fn name(&self) -> &'static str;

    /// Whether an encoder for `container` can be built.
    fn supports_container(&self, container: ContainerFormat) -> bool;

    /// Build a playback graph for `asset` that also feeds `tap`.
    fn open_audio_graph(&self, asset: &AudioAsset, tap: AudioTap) -> ReelResult<Box<dyn AudioGraph>>;

    /// Build and start an encoder writing `stream` into `container`.
    fn open_encoder(
        &self,
        stream: &CombinedStream,
        container: ContainerFormat,
        events: EncoderEvents,
    ) -> ReelResult<Box<dyn EncoderPipeline>>;
}

/// The backend used for real recordings.
#[cfg(feature = "gstreamer")]
pub fn default_backend() -> ReelResult<Arc<dyn CaptureBackend>> {
    Ok(Arc::new(GstBackend::new()?))
}

/// The backend used for real recordings.
#[cfg(not(feature = "gstreamer"))]
pub fn default_backend() -> ReelResult<Arc<dyn CaptureBackend>> {
    Err(scenereel_common::error::ReelError::capture_unsupported(
        "built without the gstreamer feature; use --dry-run",
    ))
}
