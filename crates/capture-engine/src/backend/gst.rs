//! GStreamer capture backend.
//!
//! Encoders are `appsrc`-fed launch pipelines that mux into an `appsink`,
//! so muxed output arrives as in-memory fragments rather than a file:
//!
//! ```text
//! appsrc(video, RGBA) ! videoconvert ! <video enc> ! <mux> ! appsink
//! appsrc(audioN, F32) ! audioconvert ! audioresample ! <audio enc> ! mux.
//! ```
//!
//! The soundtrack graph decodes the file once and tees it to the speakers
//! and to an `appsink` whose samples feed the [`AudioTap`].

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use scenereel_common::clock::RecordingClock;
use scenereel_common::error::{ReelError, ReelResult};
use scenereel_render_engine::Surface;

use super::{CaptureBackend, EncoderEvent, EncoderEvents, EncoderPipeline};
use crate::audio::{
    AudioAsset, AudioChunk, AudioGraph, AudioSink, AudioTap, AUDIO_CHANNELS, AUDIO_SAMPLE_RATE,
};
use crate::container::ContainerFormat;
use crate::mixer::CombinedStream;

const EOS_DRAIN_DEADLINE: Duration = Duration::from_secs(10);
const STATE_CHANGE_TIMEOUT_SECS: u64 = 5;

/// Elements used to write one container.
struct ContainerRecipe {
    muxer: &'static str,
    mux_props: &'static str,
    video_encoder: &'static str,
    video_parser: Option<&'static str>,
    audio_encoder: &'static str,
}

fn recipe(container: ContainerFormat) -> ContainerRecipe {
    match container {
        ContainerFormat::WebM => ContainerRecipe {
            muxer: "webmmux",
            mux_props: "streamable=true",
            video_encoder: "vp8enc",
            video_parser: None,
            audio_encoder: "opusenc",
        },
        ContainerFormat::Matroska => ContainerRecipe {
            muxer: "matroskamux",
            mux_props: "streamable=true",
            video_encoder: "x264enc",
            video_parser: Some("h264parse"),
            audio_encoder: "opusenc",
        },
        ContainerFormat::Mp4 => ContainerRecipe {
            muxer: "mp4mux",
            mux_props: "fragment-duration=1000 streamable=true",
            video_encoder: "x264enc",
            video_parser: Some("h264parse"),
            audio_encoder: "avenc_aac",
        },
    }
}

impl ContainerRecipe {
    fn video_chain(&self, fps: u32) -> String {
        // One keyframe every 2 seconds.
        let keyint = fps.saturating_mul(2).max(2);
        let encoder = match self.video_encoder {
            "vp8enc" => format!("vp8enc deadline=1 cpu-used=8 keyframe-max-dist={keyint}"),
            other => format!("{other} tune=zerolatency speed-preset=veryfast key-int-max={keyint}"),
        };
        match self.video_parser {
            Some(parser) => format!("{encoder} ! {parser}"),
            None => encoder,
        }
    }
}

fn element_available(factory: &str) -> bool {
    gst::ElementFactory::find(factory).is_some()
}

/// Backend that encodes with GStreamer.
#[derive(Debug, Clone, Copy)]
pub struct GstBackend {
    _private: (),
}

impl GstBackend {
    pub fn new() -> ReelResult<Self> {
        init_gstreamer()?;
        Ok(Self { _private: () })
    }
}

impl CaptureBackend for GstBackend {
    fn name(&self) -> &'static str {
        "gstreamer"
    }

    fn supports_container(&self, container: ContainerFormat) -> bool {
        let recipe = recipe(container);
        ["appsrc", "appsink", "videoconvert", recipe.muxer, recipe.video_encoder]
            .into_iter()
            .chain(recipe.video_parser)
            .all(element_available)
    }

    fn open_audio_graph(&self, asset: &AudioAsset, tap: AudioTap) -> ReelResult<Box<dyn AudioGraph>> {
        if !asset.path().exists() {
            return Err(ReelError::FileNotFound {
                path: asset.path().to_path_buf(),
            });
        }

        let path = escape_path(asset.path());
        let launch = format!(
            "filesrc location=\"{path}\" ! decodebin ! audioconvert ! audioresample ! \
             audio/x-raw,format=F32LE,layout=interleaved,rate={AUDIO_SAMPLE_RATE},channels={AUDIO_CHANNELS} ! \
             tee name=t \
             t. ! queue ! audioconvert ! autoaudiosink \
             t. ! queue ! appsink name=tap sync=true"
        );
        let pipeline = pipeline_from_launch(&launch)?;
        let appsink = app_sink(&pipeline, "tap")?;

        let sample_tap = tap.clone();
        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                    let samples = map
                        .as_slice()
                        .chunks_exact(4)
                        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                        .collect();
                    sample_tap.deliver(AudioChunk {
                        samples,
                        position: buffer.pts().map(|p| Duration::from_nanos(p.nseconds())),
                    });
                    Ok(gst::FlowSuccess::Ok)
                })
                .eos(move |_| tap.close())
                .build(),
        );

        Ok(Box::new(GstAudioGraph { pipeline }))
    }

    fn open_encoder(
        &self,
        stream: &CombinedStream,
        container: ContainerFormat,
        events: EncoderEvents,
    ) -> ReelResult<Box<dyn EncoderPipeline>> {
        let recipe = recipe(container);
        let video = stream.video();

        let mut launch = format!(
            "appsrc name=video is-live=true format=time do-timestamp=false \
             caps=\"video/x-raw,format=RGBA,width={w},height={h},framerate={fps}/1\" ! \
             queue ! videoconvert ! {venc} ! queue ! {mux} {mux_props} name=mux ! \
             appsink name=sink sync=false",
            w = video.width,
            h = video.height,
            fps = video.fps,
            venc = recipe.video_chain(video.fps),
            mux = recipe.muxer,
            mux_props = recipe.mux_props,
        );

        let audio_tracks: Vec<_> = stream.audio_tracks().collect();
        let with_audio = !audio_tracks.is_empty() && element_available(recipe.audio_encoder);
        if !audio_tracks.is_empty() && !with_audio {
            // Taps stay unattached; the session reports the soundtrack as unavailable.
            tracing::warn!(
                encoder = recipe.audio_encoder,
                "Audio encoder unavailable; recording video only"
            );
        }
        if with_audio {
            for (i, _) in audio_tracks.iter().enumerate() {
                launch.push_str(&format!(
                    " appsrc name=audio{i} is-live=true format=time do-timestamp=true \
                     caps=\"audio/x-raw,format=F32LE,layout=interleaved,rate={AUDIO_SAMPLE_RATE},channels={AUDIO_CHANNELS}\" ! \
                     queue ! audioconvert ! audioresample ! {aenc} ! queue ! mux.",
                    aenc = recipe.audio_encoder,
                ));
            }
        }

        let pipeline = pipeline_from_launch(&launch)?;
        let video_src = app_src(&pipeline, "video")?;
        let sink = app_sink(&pipeline, "sink")?;

        let mut taps = Vec::new();
        if with_audio {
            for (i, track) in audio_tracks.iter().enumerate() {
                let src = app_src(&pipeline, &format!("audio{i}"))?;
                track.tap().attach(Box::new(AppSrcSink { src }));
                taps.push(track.tap().clone());
            }
        }

        let slot = Arc::new(Mutex::new(Some(events)));
        let sample_slot = Arc::clone(&slot);
        let eos_slot = Arc::clone(&slot);
        sink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                    if let Some(tx) = lock_slot(&sample_slot).as_ref() {
                        // A closed receiver means the recording was aborted.
                        let _ = tx.send(EncoderEvent::Fragment(map.as_slice().to_vec()));
                    }
                    Ok(gst::FlowSuccess::Ok)
                })
                .eos(move |_| {
                    lock_slot(&eos_slot).take();
                })
                .build(),
        );

        pipeline.set_state(gst::State::Playing).map_err(|e| {
            ReelError::capture(format!("Failed to start {container} encoder: {e:?}"))
        })?;

        tracing::info!(
            %container,
            width = video.width,
            height = video.height,
            fps = video.fps,
            audio_tracks = taps.len(),
            "GStreamer encoder started"
        );

        Ok(Box::new(GstEncoder {
            name: format!("encoder-{container}"),
            pipeline,
            video_src,
            taps,
            events: slot,
            frame_duration: gst::ClockTime::from_nseconds(1_000_000_000 / video.fps.max(1) as u64),
            finished: false,
        }))
    }
}

struct GstEncoder {
    name: String,
    pipeline: gst::Pipeline,
    video_src: gst_app::AppSrc,
    taps: Vec<AudioTap>,
    events: Arc<Mutex<Option<EncoderEvents>>>,
    frame_duration: gst::ClockTime,
    finished: bool,
}

impl GstEncoder {
    fn check_bus(&self) -> ReelResult<()> {
        let Some(bus) = self.pipeline.bus() else {
            return Ok(());
        };
        if let Some(msg) = bus.pop_filtered(&[gst::MessageType::Error]) {
            if let gst::MessageView::Error(e) = msg.view() {
                return Err(ReelError::capture(format!(
                    "{} pipeline error: {}",
                    self.name,
                    e.error()
                )));
            }
        }
        Ok(())
    }

    fn teardown(&mut self) {
        for tap in self.taps.drain(..) {
            tap.detach();
        }
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(pipeline = %self.name, error = ?e, "Failed to stop pipeline");
        }
        lock_slot(&self.events).take();
        self.finished = true;
    }
}

impl EncoderPipeline for GstEncoder {
    fn push_frame(&mut self, frame: &Surface, pts: Duration) -> ReelResult<()> {
        self.check_bus()?;

        let mut buffer = gst::Buffer::from_mut_slice(frame.as_bytes().to_vec());
        {
            let buffer = buffer
                .get_mut()
                .ok_or_else(|| ReelError::capture("frame buffer is not writable"))?;
            buffer.set_pts(gst::ClockTime::from_nseconds(RecordingClock::duration_to_ns(pts)));
            buffer.set_duration(self.frame_duration);
        }
        self.video_src
            .push_buffer(buffer)
            .map_err(|e| ReelError::capture(format!("{} rejected frame: {e:?}", self.name)))?;
        Ok(())
    }

    fn finish(&mut self) -> ReelResult<()> {
        if self.finished {
            return Ok(());
        }

        if let Err(e) = self.video_src.end_of_stream() {
            tracing::warn!(pipeline = %self.name, error = ?e, "Failed to end video stream");
        }
        // Ends each audio appsrc so the muxer can finalize.
        for tap in &self.taps {
            tap.close();
        }

        let drained = drain_eos(&self.pipeline, &self.name);
        self.teardown();
        drained
    }
}

impl Drop for GstEncoder {
    fn drop(&mut self) {
        if !self.finished {
            self.teardown();
        }
    }
}

/// Feeds tapped audio into one of the encoder's audio appsrcs.
struct AppSrcSink {
    src: gst_app::AppSrc,
}

impl AudioSink for AppSrcSink {
    fn push(&mut self, chunk: AudioChunk) {
        let bytes: Vec<u8> = chunk.samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        if let Err(e) = self.src.push_buffer(gst::Buffer::from_mut_slice(bytes)) {
            tracing::trace!(error = ?e, "Audio appsrc rejected chunk");
        }
    }

    fn end(&mut self) {
        if let Err(e) = self.src.end_of_stream() {
            tracing::debug!(error = ?e, "Audio appsrc already ended");
        }
    }
}

struct GstAudioGraph {
    pipeline: gst::Pipeline,
}

impl AudioGraph for GstAudioGraph {
    fn play(&mut self) -> ReelResult<()> {
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| ReelError::audio_unavailable(format!("playback refused: {e:?}")))?;

        match self
            .pipeline
            .state(gst::ClockTime::from_seconds(STATE_CHANGE_TIMEOUT_SECS))
        {
            (Ok(_), gst::State::Playing, _) => Ok(()),
            (Ok(_), state, _) => {
                tracing::warn!(?state, "Audio graph did not reach Playing state within timeout");
                Ok(())
            }
            (Err(e), _, _) => Err(ReelError::audio_unavailable(format!(
                "audio graph failed to reach Playing state: {e:?}"
            ))),
        }
    }

    fn pause(&mut self) -> ReelResult<()> {
        self.pipeline
            .set_state(gst::State::Paused)
            .map(|_| ())
            .map_err(|e| ReelError::capture(format!("Failed to pause audio graph: {e:?}")))
    }
}

impl Drop for GstAudioGraph {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

/// Wait for EOS to reach the sink so muxers write their trailers.
fn drain_eos(pipeline: &gst::Pipeline, name: &str) -> ReelResult<()> {
    let Some(bus) = pipeline.bus() else {
        return Ok(());
    };
    let start = std::time::Instant::now();
    loop {
        let elapsed = start.elapsed();
        if elapsed >= EOS_DRAIN_DEADLINE {
            tracing::warn!(pipeline = %name, "EOS drain timed out after 10s");
            return Ok(());
        }
        let remaining =
            gst::ClockTime::from_nseconds(RecordingClock::duration_to_ns(EOS_DRAIN_DEADLINE - elapsed));
        match bus.timed_pop_filtered(remaining, &[gst::MessageType::Eos, gst::MessageType::Error]) {
            Some(msg) => match msg.view() {
                gst::MessageView::Eos(_) => {
                    tracing::debug!(pipeline = %name, "EOS received; pipeline drained");
                    return Ok(());
                }
                gst::MessageView::Error(e) => {
                    return Err(ReelError::capture(format!(
                        "{name} pipeline error during EOS drain: {}",
                        e.error()
                    )));
                }
                _ => {}
            },
            None => {
                tracing::warn!(pipeline = %name, "EOS drain timed out after 10s");
                return Ok(());
            }
        }
    }
}

fn pipeline_from_launch(launch: &str) -> ReelResult<gst::Pipeline> {
    init_gstreamer()?;
    let element = gst::parse::launch(launch)
        .map_err(|e| ReelError::capture(format!("Failed to build pipeline: {e}")))?;
    element
        .dynamic_cast::<gst::Pipeline>()
        .map_err(|_| ReelError::capture("Launch string did not produce a pipeline"))
}

fn app_src(pipeline: &gst::Pipeline, name: &str) -> ReelResult<gst_app::AppSrc> {
    pipeline
        .by_name(name)
        .and_then(|e| e.downcast::<gst_app::AppSrc>().ok())
        .ok_or_else(|| ReelError::capture(format!("pipeline has no appsrc named {name}")))
}

fn app_sink(pipeline: &gst::Pipeline, name: &str) -> ReelResult<gst_app::AppSink> {
    pipeline
        .by_name(name)
        .and_then(|e| e.downcast::<gst_app::AppSink>().ok())
        .ok_or_else(|| ReelError::capture(format!("pipeline has no appsink named {name}")))
}

fn lock_slot(slot: &Mutex<Option<EncoderEvents>>) -> MutexGuard<'_, Option<EncoderEvents>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

fn init_gstreamer() -> ReelResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    match GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string())) {
        Ok(()) => Ok(()),
        Err(e) => Err(ReelError::capture(format!("Failed to initialize GStreamer: {e}"))),
    }
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h264_recipes_include_parser() {
        let chain = recipe(ContainerFormat::Mp4).video_chain(30);
        assert_eq!(
            chain,
            "x264enc tune=zerolatency speed-preset=veryfast key-int-max=60 ! h264parse"
        );
    }

    #[test]
    fn test_webm_recipe_uses_vp8() {
        let chain = recipe(ContainerFormat::WebM).video_chain(1);
        assert_eq!(chain, "vp8enc deadline=1 cpu-used=8 keyframe-max-dist=2");
    }

    #[test]
    fn test_escape_path_quotes() {
        assert_eq!(escape_path(Path::new("/tmp/a\"b.ogg")), "/tmp/a\\\"b.ogg");
    }
}
