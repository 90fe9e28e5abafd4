//! SceneReel Capture Engine
//!
//! Turns a scene list into an encoded video in real time. The driver paints
//! each scene onto the compositor surface and submits a frame on every
//! refresh tick; the recorder feeds those frames to a backend encoder and
//! collects the muxed fragments it emits.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   TimelineDriver                      │
//! │  ImagePreloader ─► FrameCompositor ─► RefreshSource   │
//! │                           │ frames                    │
//! │  ┌────────────────────────▼─────────────────────────┐ │
//! │  │               RecordingSession                    │ │
//! │  │  AudioGraphBridge ─► StreamMixer ─► CaptureRecorder│ │
//! │  └────────────────────────┬─────────────────────────┘ │
//! └───────────────────────────┼──────────────────────────┘
//!                             ▼
//!             CaptureBackend (GStreamer / memory)
//!                             │ fragments
//!                             ▼
//!                       RecordedVideo
//! ```

pub mod audio;
pub mod backend;
pub mod container;
pub mod driver;
pub mod mixer;
pub mod recorder;
pub mod refresh;
pub mod session;

pub use audio::{AudioAsset, AudioChunk, AudioGraph, AudioGraphBridge, AudioSink, AudioTap};
pub use backend::{
    default_backend, CaptureBackend, EncoderEvent, EncoderPipeline, FrameRecord, MemoryBackend,
    MemoryBackendConfig, MemoryStats,
};
pub use container::{negotiate, ContainerChoice, ContainerFormat};
pub use driver::*;
pub use mixer::*;
pub use recorder::*;
pub use refresh::*;
pub use session::*;
