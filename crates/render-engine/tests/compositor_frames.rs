use std::io::Cursor;
use std::sync::Arc;

use image::RgbaImage;
use scenereel_common::error::ReelError;
use scenereel_render_engine::{
    CompositorStyle, DecodedScene, FrameCompositor, ImagePreloader, TextRenderer,
};
use scenereel_scene_model::Scene;

fn png(w: u32, h: u32, px: [u8; 4]) -> Arc<[u8]> {
    let img = RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    Arc::from(buf.into_inner())
}

fn compositor(w: u32, h: u32) -> FrameCompositor {
    FrameCompositor::new(w, h, CompositorStyle::default(), TextRenderer::fallback()).unwrap()
}

#[tokio::test]
async fn solid_image_covers_whole_surface() {
    let scenes = vec![Scene::new(None, Some(png(10, 30, [200, 10, 10, 255])), 1)];
    let preloaded = ImagePreloader::new().preload(&scenes).await.unwrap();

    let mut comp = compositor(64, 48);
    comp.draw(preloaded.get(0).unwrap());

    let surface = comp.surface();
    for (x, y) in [(0, 0), (32, 24), (63, 47), (0, 47)] {
        assert_eq!(surface.pixel(x, y), Some([200, 10, 10, 255]), "pixel {x},{y}");
    }
}

#[tokio::test]
async fn caption_band_darkens_and_text_is_drawn() {
    let scenes = vec![Scene::new(
        Some("hi".into()),
        Some(png(16, 9, [255, 255, 255, 255])),
        1,
    )];
    let preloaded = ImagePreloader::new().preload(&scenes).await.unwrap();

    let mut comp = compositor(1280, 720);
    comp.draw(preloaded.get(0).unwrap());
    let surface = comp.surface();

    // Above the band: untouched image.
    assert_eq!(surface.pixel(640, 100), Some([255, 255, 255, 255]));
    // Inside the band (y 540..680, x 40..1240) away from text: white under 40% black.
    assert_eq!(surface.pixel(60, 545), Some([153, 153, 153, 255]));
    // Outside the band horizontally.
    assert_eq!(surface.pixel(20, 545), Some([255, 255, 255, 255]));
    // "hi" at 36px block glyphs: 36px wide centered on 640, baseline at 620.
    assert_eq!(surface.pixel(625, 610), Some([255, 255, 255, 255]));
}

#[tokio::test]
async fn scene_without_image_or_caption_is_background_only() {
    let scenes = vec![Scene::new(None, None, 1)];
    let preloaded = ImagePreloader::new().preload(&scenes).await.unwrap();

    let mut comp = compositor(32, 32);
    comp.draw_placeholder("Waiting");
    comp.draw(preloaded.get(0).unwrap());
    assert!(comp
        .surface()
        .as_bytes()
        .chunks_exact(4)
        .all(|px| px == [0, 0, 0, 255]));
}

#[test]
fn empty_bitmap_draws_background_without_panicking() {
    let mut comp = compositor(32, 18);
    for (w, h) in [(0, 5), (5, 0), (0, 0)] {
        let scene = DecodedScene::new(0, Scene::new(None, None, 1), Some(RgbaImage::new(w, h)));
        comp.draw(&scene);
        assert_eq!(comp.surface().pixel(16, 9), Some([0, 0, 0, 255]));
    }
}

#[tokio::test]
async fn corrupt_image_fails_whole_preload() {
    let scenes = vec![
        Scene::new(Some("ok".into()), Some(png(4, 4, [1, 2, 3, 255])), 1),
        Scene::new(Some("broken".into()), Some(Arc::from(&[0u8, 1, 2, 3][..])), 1),
    ];
    let err = ImagePreloader::new().preload(&scenes).await.unwrap_err();
    assert!(matches!(err, ReelError::PreloadFailure { failed: 1, .. }));
}

#[test]
fn long_caption_wraps_within_band_width() {
    let comp = compositor(1280, 720);
    // 18px per char at 36px -> 62 chars per 1120px line.
    let caption = "word ".repeat(40);
    let lines = comp.caption_lines(&caption);
    assert!(lines.len() > 1);
    assert!(lines.iter().all(|l| l.chars().count() * 18 <= 1120));
    assert_eq!(lines.join(" "), caption.trim());
}
