//! SceneReel Scene Model
//!
//! Defines the core data contracts for SceneReel:
//! - **Scenes:** One timeline entry each (optional image, optional caption, duration)
//! - **Store:** The ordered, editable scene list owned by one editing session
//! - **Manifest:** The on-disk form of a scene list (image paths, audio path)
//! - **Gallery:** Record shapes exchanged with the upload and listing services
//!
//! Scene identity is positional: a scene is addressed by its index in the list.

pub mod gallery;
pub mod manifest;
pub mod scene;

pub use gallery::*;
pub use manifest::*;
pub use scene::*;
