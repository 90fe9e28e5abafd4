//! Scenes and the ordered scene store.

use std::sync::Arc;

use scenereel_common::error::{ReelError, ReelResult};
use scenereel_common::format::truncate_chars;

/// Duration given to scenes added without one.
pub const DEFAULT_SCENE_SECS: u32 = 3;

/// Shortest allowed scene.
pub const MIN_SCENE_SECS: u32 = 1;

/// Number of caption characters shown in list previews.
pub const PREVIEW_CAPTION_CHARS: usize = 80;

/// One timeline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    caption: Option<String>,
    image: Option<Arc<[u8]>>,
    duration_secs: u32,
}

impl Scene {
    /// Create a scene. Blank captions are dropped and the duration is
    /// clamped to at least one second.
    pub fn new(caption: Option<String>, image: Option<Arc<[u8]>>, duration_secs: u32) -> Self {
        let caption = caption
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Self {
            caption,
            image,
            duration_secs: duration_secs.max(MIN_SCENE_SECS),
        }
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    /// Raw, undecoded image bytes.
    pub fn image_bytes(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Caption prefix shown in list previews.
    pub fn caption_preview(&self) -> &str {
        self.caption
            .as_deref()
            .map(|c| truncate_chars(c, PREVIEW_CAPTION_CHARS))
            .unwrap_or("")
    }
}

/// The ordered scene list owned by one editing session.
///
/// Append and remove-by-index are the only mutations; order is never changed
/// implicitly.
#[derive(Debug, Clone, Default)]
pub struct SceneStore {
    scenes: Vec<Scene>,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scene and return its index.
    ///
    /// The image is stored as raw bytes; decoding happens at preload time.
    /// A missing duration defaults to three seconds.
    pub fn add(
        &mut self,
        caption: Option<String>,
        image: Option<impl Into<Arc<[u8]>>>,
        duration_secs: Option<u32>,
    ) -> usize {
        let scene = Scene::new(
            caption,
            image.map(Into::into),
            duration_secs.unwrap_or(DEFAULT_SCENE_SECS),
        );
        self.push(scene)
    }

    /// Append an already constructed scene and return its index.
    pub fn push(&mut self, scene: Scene) -> usize {
        self.scenes.push(scene);
        let index = self.scenes.len() - 1;
        tracing::debug!(
            index,
            duration_secs = self.scenes[index].duration_secs(),
            has_image = self.scenes[index].has_image(),
            "Scene added"
        );
        index
    }

    /// Remove the scene at `index`, shifting later scenes down.
    pub fn remove(&mut self, index: usize) -> ReelResult<Scene> {
        if index >= self.scenes.len() {
            return Err(ReelError::IndexOutOfRange {
                index,
                len: self.scenes.len(),
            });
        }
        let removed = self.scenes.remove(index);
        tracing::debug!(index, remaining = self.scenes.len(), "Scene removed");
        Ok(removed)
    }

    /// The scenes in timeline order.
    pub fn list(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn get(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Sum of all scene durations.
    pub fn total_duration_secs(&self) -> u64 {
        self.scenes.iter().map(|s| s.duration_secs() as u64).sum()
    }

    /// One listing line per scene, with the caption cut to 80 characters.
    pub fn preview_lines(&self) -> Vec<String> {
        self.scenes
            .iter()
            .enumerate()
            .map(|(idx, scene)| {
                let marker = if scene.has_image() { " [image]" } else { "" };
                let caption = scene.caption_preview();
                if caption.is_empty() {
                    format!("Scene {} — {}s{marker}", idx + 1, scene.duration_secs())
                } else {
                    format!(
                        "Scene {} — {}s{marker}: {caption}",
                        idx + 1,
                        scene.duration_secs()
                    )
                }
            })
            .collect()
    }
}

impl FromIterator<Scene> for SceneStore {
    fn from_iter<I: IntoIterator<Item = Scene>>(iter: I) -> Self {
        Self {
            scenes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn captioned(text: &str) -> Scene {
        Scene::new(Some(text.to_string()), None, 2)
    }

    #[test]
    fn test_add_defaults_and_clamps_duration() {
        let mut store = SceneStore::new();
        store.add(Some("a".into()), None::<Vec<u8>>, None);
        store.add(Some("b".into()), None::<Vec<u8>>, Some(0));
        store.add(Some("c".into()), None::<Vec<u8>>, Some(7));

        let durations: Vec<u32> = store.list().iter().map(Scene::duration_secs).collect();
        assert_eq!(durations, vec![3, 1, 7]);
        assert_eq!(store.total_duration_secs(), 11);
    }

    #[test]
    fn test_add_keeps_raw_image_bytes() {
        let mut store = SceneStore::new();
        let idx = store.add(None, Some(vec![1u8, 2, 3]), Some(1));
        assert_eq!(idx, 0);
        assert_eq!(store.get(0).unwrap().image_bytes(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_blank_caption_is_dropped() {
        let scene = Scene::new(Some("   ".into()), None, 1);
        assert_eq!(scene.caption(), None);
        let scene = Scene::new(Some("  hi  ".into()), None, 1);
        assert_eq!(scene.caption(), Some("hi"));
    }

    #[test]
    fn test_remove_out_of_range_does_not_mutate() {
        let mut store: SceneStore = ["a", "b"].iter().map(|t| captioned(t)).collect();
        let err = store.remove(2).unwrap_err();
        assert!(matches!(err, ReelError::IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_shifts_later_scenes_down() {
        let mut store: SceneStore = ["a", "b", "c"].iter().map(|t| captioned(t)).collect();
        let removed = store.remove(1).unwrap();
        assert_eq!(removed.caption(), Some("b"));
        let captions: Vec<_> = store.list().iter().filter_map(Scene::caption).collect();
        assert_eq!(captions, vec!["a", "c"]);
    }

    #[test]
    fn test_preview_truncates_caption_to_80_chars() {
        let mut store = SceneStore::new();
        store.add(Some("y".repeat(120)), Some(vec![0u8]), Some(4));
        store.add(None, None::<Vec<u8>>, None);

        let lines = store.preview_lines();
        assert_eq!(lines[0], format!("Scene 1 — 4s [image]: {}", "y".repeat(80)));
        assert_eq!(lines[1], "Scene 2 — 3s");
    }

    proptest! {
        #[test]
        fn prop_remove_preserves_relative_order(len in 1usize..40, pick in 0usize..40) {
            let k = pick % len;
            let mut store: SceneStore = (0..len)
                .map(|i| captioned(&format!("scene-{i}")))
                .collect();

            store.remove(k).unwrap();

            let expected: Vec<String> = (0..len)
                .filter(|i| *i != k)
                .map(|i| format!("scene-{i}"))
                .collect();
            let actual: Vec<String> = store
                .list()
                .iter()
                .filter_map(|s| s.caption().map(str::to_string))
                .collect();
            prop_assert_eq!(store.len(), len - 1);
            prop_assert_eq!(actual, expected);
        }
    }
}
