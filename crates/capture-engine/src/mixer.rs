//! Combines the frame capture track with soundtrack tracks.

use crate::audio::AudioTap;

/// Frames captured from the compositor surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTrack {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl VideoTrack {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps: fps.max(1),
        }
    }
}

/// A capturable audio stream fed through an [`AudioTap`].
#[derive(Debug, Clone)]
pub struct AudioTrack {
    label: String,
    tap: AudioTap,
}

impl AudioTrack {
    pub fn new(label: impl Into<String>, tap: AudioTap) -> Self {
        Self {
            label: label.into(),
            tap,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn tap(&self) -> &AudioTap {
        &self.tap
    }
}

#[derive(Debug, Clone)]
pub enum MediaTrack {
    Video(VideoTrack),
    Audio(AudioTrack),
}

/// One video track followed by zero or more audio tracks.
#[derive(Debug, Clone)]
pub struct CombinedStream {
    video: VideoTrack,
    tracks: Vec<MediaTrack>,
}

impl CombinedStream {
    /// All tracks; the video track is always first.
    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video(&self) -> VideoTrack {
        self.video
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &AudioTrack> {
        self.tracks.iter().filter_map(|t| match t {
            MediaTrack::Audio(audio) => Some(audio),
            MediaTrack::Video(_) => None,
        })
    }

    pub fn has_audio(&self) -> bool {
        self.tracks.len() > 1
    }
}

/// Builds a [`CombinedStream`]. Pure aggregation; nothing is transcoded.
#[derive(Debug)]
pub struct StreamMixer {
    video: VideoTrack,
    audio: Vec<AudioTrack>,
}

impl StreamMixer {
    pub fn new(video: VideoTrack) -> Self {
        Self {
            video,
            audio: Vec::new(),
        }
    }

    /// Append an audio track after those already added.
    pub fn add_audio(&mut self, track: AudioTrack) -> &mut Self {
        self.audio.push(track);
        self
    }

    pub fn combine(self) -> CombinedStream {
        let mut tracks = Vec::with_capacity(1 + self.audio.len());
        tracks.push(MediaTrack::Video(self.video));
        tracks.extend(self.audio.into_iter().map(MediaTrack::Audio));
        tracing::debug!(tracks = tracks.len(), "Streams combined");
        CombinedStream {
            video: self.video,
            tracks,
        }
    }
}
