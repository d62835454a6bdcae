//! Tests for thumbnail sources and the fallback chain

use crate::config::ThumbnailSettings;
use crate::error::UploaderError;
use crate::services::thumbnail::{
    PlaceholderRenderer, StaticFallback, ThumbnailChain, PLACEHOLDER_HEIGHT, PLACEHOLDER_WIDTH,
};
use crate::traits::{MockThumbnailSource, ThumbnailProvider, ThumbnailSource};
use crate::types::ImageRef;

fn failing_source(name: &'static str) -> MockThumbnailSource {
    let mut source = MockThumbnailSource::new();
    source.expect_name().return_const(name);
    source.expect_produce().times(1).returning(|_| {
        Err(UploaderError::Thumbnail {
            message: "no luck".to_string(),
        })
    });
    source
}

#[tokio::test]
async fn test_chain_returns_first_success() {
    let mut second = MockThumbnailSource::new();
    second.expect_name().return_const("second");
    second
        .expect_produce()
        .times(1)
        .returning(|_| Ok(ImageRef::Url("https://cdn/second.jpg".to_string())));
    let mut third = MockThumbnailSource::new();
    third.expect_name().return_const("third");
    third.expect_produce().times(0);

    let sources: Vec<Box<dyn ThumbnailSource>> = vec![Box::new(failing_source("first")), Box::new(second), Box::new(third)];
    let chain = ThumbnailChain::new(sources);

    let reference = chain.thumbnail_for("https://x/v.mp4").await.unwrap();
    assert_eq!(reference, ImageRef::Url("https://cdn/second.jpg".to_string()));
}

#[tokio::test]
async fn test_chain_fails_only_when_every_source_fails() {
    let sources: Vec<Box<dyn ThumbnailSource>> = vec![Box::new(failing_source("a")), Box::new(failing_source("b"))];
    let chain = ThumbnailChain::new(sources);

    let error = chain.thumbnail_for("https://x/v.mp4").await.unwrap_err();
    assert!(error.to_string().contains("a: "));
    assert!(error.to_string().contains("b: "));
}

#[tokio::test]
async fn test_placeholder_is_written_as_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = PlaceholderRenderer::new(dir.path());

    let reference = renderer.produce("https://x/v.mp4").await.unwrap();
    let ImageRef::File(path) = reference else {
        panic!("expected a local file");
    };
    assert!(path.starts_with(dir.path()));

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_concurrent_placeholders_for_one_url_get_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = PlaceholderRenderer::new(dir.path());

    let (first, second) = tokio::join!(
        renderer.produce("https://x/shared.mp4"),
        renderer.produce("https://x/shared.mp4")
    );
    let (ImageRef::File(first), ImageRef::File(second)) = (first.unwrap(), second.unwrap()) else {
        panic!("expected local files");
    };

    assert_ne!(first, second);
    for path in [first, second] {
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}

#[test]
fn test_placeholder_colour_is_stable_with_white_frame() {
    let a = PlaceholderRenderer::render("https://x/one.mp4");
    let b = PlaceholderRenderer::render("https://x/one.mp4");

    assert_eq!(a.dimensions(), (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT));
    assert_eq!(a.get_pixel(640, 360), b.get_pixel(640, 360));
    assert_eq!(a.get_pixel(0, 0).0, [255, 255, 255]);
    assert_eq!(
        *a.get_pixel(640, 360),
        PlaceholderRenderer::colour_for("https://x/one.mp4")
    );
}

#[tokio::test]
async fn test_static_fallback() {
    let fallback = StaticFallback::new("https://cdn/fallback.jpg");
    assert_eq!(
        fallback.produce("anything").await.unwrap(),
        ImageRef::Url("https://cdn/fallback.jpg".to_string())
    );
    assert!(StaticFallback::new("").produce("anything").await.is_err());
}

#[tokio::test]
async fn test_standard_chain_falls_back_without_ffmpeg() {
    let settings = ThumbnailSettings {
        ffmpeg_path: "/nonexistent/ffmpeg-binary".to_string(),
        static_fallback_url: "https://cdn/fallback.jpg".to_string(),
    };
    let chain = ThumbnailChain::standard(&settings).unwrap();
    assert_eq!(chain.source_names(), vec!["ffmpeg", "placeholder", "static"]);

    let reference = chain.thumbnail_for("https://x/v.mp4").await.unwrap();
    assert!(matches!(reference, ImageRef::File(_)));
}
