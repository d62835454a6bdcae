//! Video thumbnail sources and the fallback chain that composes them

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{TempDir, TempPath};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ThumbnailSettings;
use crate::error::{UploaderError, UploaderResult};
use crate::traits::{ThumbnailProvider, ThumbnailSource};
use crate::types::ImageRef;

pub const PLACEHOLDER_WIDTH: u32 = 1280;
pub const PLACEHOLDER_HEIGHT: u32 = 720;
const FRAME_WIDTH: u32 = 24;
const FFMPEG_TIMEOUT: Duration = Duration::from_secs(60);

fn thumbnail_error(message: impl Into<String>) -> UploaderError {
    UploaderError::Thumbnail {
        message: message.into(),
    }
}

fn url_digest(media_url: &str) -> [u8; 32] {
    Sha256::digest(media_url.as_bytes()).into()
}

/// Stable file name for a media URL's thumbnail
fn file_stem(media_url: &str) -> String {
    let digest = url_digest(media_url);
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Fresh file in the work dir; concurrent calls for one URL never share a path
fn scratch_file(work_dir: &Path, media_url: &str, kind: &str) -> UploaderResult<TempPath> {
    let file = tempfile::Builder::new()
        .prefix(&format!("{}-{}-", file_stem(media_url), kind))
        .suffix(".jpg")
        .tempfile_in(work_dir)?;
    Ok(file.into_temp_path())
}

/// Stop deleting a finished file on drop; the work dir still cleans it up
fn keep(path: TempPath) -> UploaderResult<PathBuf> {
    path.keep()
        .map_err(|e| thumbnail_error(format!("cannot keep thumbnail: {}", e.error)))
}

/// First frame of the video, grabbed with the ffmpeg binary
pub struct FfmpegFrameExtractor {
    ffmpeg_path: String,
    work_dir: PathBuf,
}

impl FfmpegFrameExtractor {
    pub fn new(ffmpeg_path: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            work_dir: work_dir.into(),
        }
    }
}

#[async_trait]
impl ThumbnailSource for FfmpegFrameExtractor {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn produce(&self, media_url: &str) -> UploaderResult<ImageRef> {
        let output = scratch_file(&self.work_dir, media_url, "frame")?;

        let run = Command::new(&self.ffmpeg_path)
            .args(["-y", "-loglevel", "error", "-i", media_url, "-frames:v", "1", "-q:v", "2"])
            .arg(output.as_os_str())
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(FFMPEG_TIMEOUT, run)
            .await
            .map_err(|_| thumbnail_error("ffmpeg timed out"))?
            .map_err(|e| thumbnail_error(format!("cannot run {}: {}", self.ffmpeg_path, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(thumbnail_error(format!("ffmpeg exited with {}: {}", result.status, stderr.trim())));
        }
        let written = tokio::fs::metadata(&*output)
            .await
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        if !written {
            return Err(thumbnail_error("ffmpeg produced no frame"));
        }
        Ok(ImageRef::File(keep(output)?))
    }
}

/// Solid placeholder with a white frame; the colour is derived from the URL
/// so each video gets a stable, distinct image.
pub struct PlaceholderRenderer {
    work_dir: PathBuf,
}

impl PlaceholderRenderer {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn colour_for(media_url: &str) -> Rgb<u8> {
        let digest = url_digest(media_url);
        // Keep it away from white so the frame stays visible
        Rgb([digest[0] / 2 + 32, digest[1] / 2 + 32, digest[2] / 2 + 32])
    }

    pub fn render(media_url: &str) -> RgbImage {
        let fill = Self::colour_for(media_url);
        let white = Rgb([255, 255, 255]);
        RgbImage::from_fn(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, |x, y| {
            let on_frame = x < FRAME_WIDTH
                || y < FRAME_WIDTH
                || x >= PLACEHOLDER_WIDTH - FRAME_WIDTH
                || y >= PLACEHOLDER_HEIGHT - FRAME_WIDTH;
            if on_frame {
                white
            } else {
                fill
            }
        })
    }
}

#[async_trait]
impl ThumbnailSource for PlaceholderRenderer {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    async fn produce(&self, media_url: &str) -> UploaderResult<ImageRef> {
        let output = scratch_file(&self.work_dir, media_url, "placeholder")?;
        let url = media_url.to_string();

        let path = tokio::task::spawn_blocking(move || {
            Self::render(&url)
                .save_with_format(&*output, ImageFormat::Jpeg)
                .map_err(|e| thumbnail_error(format!("cannot write placeholder: {e}")))?;
            keep(output)
        })
        .await
        .map_err(|e| thumbnail_error(format!("placeholder task failed: {e}")))??;

        Ok(ImageRef::File(path))
    }
}

/// Configured image URL used when nothing else works
pub struct StaticFallback {
    url: String,
}

impl StaticFallback {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ThumbnailSource for StaticFallback {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn produce(&self, _media_url: &str) -> UploaderResult<ImageRef> {
        if self.url.trim().is_empty() {
            return Err(thumbnail_error("no static fallback image configured"));
        }
        Ok(ImageRef::Url(self.url.clone()))
    }
}

/// Ordered sources tried in turn; the first success wins
pub struct ThumbnailChain {
    sources: Vec<Box<dyn ThumbnailSource>>,
    _work_dir: Option<Arc<TempDir>>,
}

impl ThumbnailChain {
    pub fn new(sources: Vec<Box<dyn ThumbnailSource>>) -> Self {
        Self {
            sources,
            _work_dir: None,
        }
    }

    /// ffmpeg, then placeholder, then the static image, sharing a temp dir
    /// that lives as long as the chain
    pub fn standard(settings: &ThumbnailSettings) -> UploaderResult<Self> {
        let work_dir = tempfile::Builder::new().prefix("uploader-thumbs").tempdir()?;
        let path: &Path = work_dir.path();

        let sources: Vec<Box<dyn ThumbnailSource>> = vec![
            Box::new(FfmpegFrameExtractor::new(settings.ffmpeg_path.clone(), path)),
            Box::new(PlaceholderRenderer::new(path)),
            Box::new(StaticFallback::new(settings.static_fallback_url.clone())),
        ];

        Ok(Self {
            sources,
            _work_dir: Some(Arc::new(work_dir)),
        })
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }
}

#[async_trait]
impl ThumbnailProvider for ThumbnailChain {
    async fn thumbnail_for(&self, media_url: &str) -> UploaderResult<ImageRef> {
        let mut failures = Vec::new();
        for source in &self.sources {
            match source.produce(media_url).await {
                Ok(reference) => {
                    debug!("Thumbnail for {} from {}", media_url, source.name());
                    return Ok(reference);
                }
                Err(e) => {
                    warn!("Thumbnail source {} failed for {}: {}", source.name(), media_url, e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }
        Err(thumbnail_error(format!("every source failed ({})", failures.join("; "))))
    }
}
