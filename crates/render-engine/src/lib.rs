//! SceneReel Render Engine
//!
//! Turns scenes into frames on a fixed-size RGBA surface.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Scene bytes ──► ImagePreloader (parallel decode, all-or-nothing)
//!                        │
//!                        ▼
//!                  DecodedScene ──► FrameCompositor
//!                                      ├── background fill
//!                                      ├── cover-scaled bitmap
//!                                      └── caption band + wrapped text
//!                                              │
//!                                              ▼
//!                                           Surface (RGBA8)
//! ```

pub mod compositor;
pub mod preload;
pub mod surface;
pub mod text;

pub use compositor::*;
pub use preload::*;
pub use surface::*;
pub use text::*;
