// Thumbnail cache - fetch, preview rendering and on-demand persistence
//
// At most one raw thumbnail is cached, at a fixed path inside the scratch
// directory. Every fetch overwrites it; the last fetch wins. The preview is
// always exactly `preview_width` x `preview_height`: the source is scaled
// down (never up) to fit, then centered on a solid canvas.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use parking_lot::Mutex;
use regex::Regex;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::classifier::{classify, ClassifiedError, ErrorCategory};
use super::errors::DownloadError;
use super::models::{MediaMetadata, ThumbnailAsset};
use super::utils;
use crate::config::Config;

/// Fixed name of the cached raw thumbnail
pub const CACHED_THUMBNAIL_NAME: &str = "thumbnail.jpg";

/// Suffix appended to the video title when saving
pub const SAVED_SUFFIX: &str = "_thumbnail";

const SAVED_EXTENSION: &str = "jpg";

lazy_static::lazy_static! {
    static ref ILLEGAL_FILENAME_CHARS: Regex = Regex::new(r#"[<>:"/\\|?*]"#).unwrap();
}

pub struct ThumbnailCache {
    scratch_dir: PathBuf,
    width: u32,
    height: u32,
    background: Rgb<u8>,
    client: reqwest::Client,
    current: Mutex<Option<ThumbnailAsset>>,
}

impl ThumbnailCache {
    pub fn new(config: &Config) -> Result<Self, DownloadError> {
        let client = utils::http_client(config)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &Config, client: reqwest::Client) -> Self {
        Self {
            scratch_dir: config.scratch_dir.clone(),
            width: config.preview_width,
            height: config.preview_height,
            background: Rgb(config.preview_background),
            client,
            current: Mutex::new(None),
        }
    }

    /// Path the raw thumbnail is cached at
    pub fn cached_path(&self) -> PathBuf {
        self.scratch_dir.join(CACHED_THUMBNAIL_NAME)
    }

    /// Most recently fetched asset, if any
    pub fn current(&self) -> Option<ThumbnailAsset> {
        self.current.lock().clone()
    }

    pub fn has_asset(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Forget the current asset. The raw file stays until the next fetch.
    pub fn clear(&self) {
        *self.current.lock() = None;
    }

    /// Fetch the thumbnail named by probed metadata.
    ///
    /// Without a thumbnail URL nothing is downloaded, the current asset is
    /// dropped and `Ok(None)` is returned.
    pub async fn fetch_for(&self, metadata: &MediaMetadata) -> Result<Option<ThumbnailAsset>, ClassifiedError> {
        match metadata.thumbnail_url.as_deref() {
            Some(url) => self
                .fetch(url, Some(metadata.title.clone()))
                .await
                .map(Some),
            None => {
                info!(title = %metadata.title, "No thumbnail available for this video");
                self.clear();
                Ok(None)
            }
        }
    }

    /// Download `thumbnail_url` into the scratch directory and render its preview
    pub async fn fetch(
        &self,
        thumbnail_url: &str,
        video_title: Option<String>,
    ) -> Result<ThumbnailAsset, ClassifiedError> {
        let result = self.fetch_inner(thumbnail_url, video_title).await;
        match result {
            Ok(asset) => {
                *self.current.lock() = Some(asset.clone());
                Ok(asset)
            }
            Err(e) => {
                warn!(url = thumbnail_url, error = %e, "Thumbnail fetch failed");
                self.clear();
                Err(classify(&e))
            }
        }
    }

    async fn fetch_inner(
        &self,
        thumbnail_url: &str,
        video_title: Option<String>,
    ) -> Result<ThumbnailAsset, DownloadError> {
        debug!(url = thumbnail_url, "Downloading thumbnail");
        let bytes = self
            .client
            .get(thumbnail_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let cached_raw_path = self.cached_path();
        tokio::fs::write(&cached_raw_path, &bytes).await?;

        let (width, height, background) = (self.width, self.height, self.background);
        let path = cached_raw_path.clone();
        let rendered_image = tokio::task::spawn_blocking(move || -> Result<RgbImage, DownloadError> {
            let source = image::io::Reader::open(&path)?.with_guessed_format()?.decode()?;
            Ok(render_preview(&source, width, height, background))
        })
        .await
        .map_err(|e| DownloadError::Other(format!("Thumbnail render task failed: {}", e)))??;

        info!(path = %cached_raw_path.display(), "Thumbnail loaded");
        Ok(ThumbnailAsset {
            source_url: thumbnail_url.to_string(),
            cached_raw_path,
            rendered_image,
            video_title,
        })
    }

    /// Save a copy of the current thumbnail into `destination_dir`
    pub fn persist_current(&self, destination_dir: &Path) -> Result<PathBuf, ClassifiedError> {
        let asset = self
            .current()
            .ok_or_else(|| classify(&DownloadError::NoAsset))?;
        let title = asset.video_title.clone();
        persist(&asset, destination_dir, title.as_deref())
    }
}

/// Scale `source` down to fit `width` x `height` and center it on a canvas of that size
pub fn render_preview(source: &DynamicImage, width: u32, height: u32, background: Rgb<u8>) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, background);

    let fits = source.width() <= width && source.height() <= height;
    let scaled = if fits {
        source.to_rgb8()
    } else {
        source.resize(width, height, FilterType::Lanczos3).to_rgb8()
    };

    let offset_x = (width - scaled.width().min(width)) / 2;
    let offset_y = (height - scaled.height().min(height)) / 2;
    imageops::overlay(&mut canvas, &scaled, i64::from(offset_x), i64::from(offset_y));
    canvas
}

/// Strip characters that are illegal in filenames
pub fn sanitize_title(title: &str) -> String {
    ILLEGAL_FILENAME_CHARS.replace_all(title, "").to_string()
}

/// Filename for a saved thumbnail: title based, or timestamp based when untitled
pub fn thumbnail_filename(video_title: Option<&str>) -> String {
    let sanitized = video_title
        .map(|title| sanitize_title(title).trim().to_string())
        .filter(|title| !title.is_empty());

    match sanitized {
        Some(title) => format!("{}{}.{}", title, SAVED_SUFFIX, SAVED_EXTENSION),
        None => {
            let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            let stamp = now
                .format(format_description!("[year][month][day]_[hour][minute][second]"))
                .unwrap_or_else(|_| now.unix_timestamp().to_string());
            format!("thumbnail_{}.{}", stamp, SAVED_EXTENSION)
        }
    }
}

/// First free path for `filename` in `dir`, appending `_1`, `_2`, ... to the stem
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let base = dir.join(filename);
    if !base.exists() {
        return base;
    }

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = base.extension().map(|e| e.to_string_lossy().to_string());

    let mut counter = 1u32;
    loop {
        let name = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Copy the cached raw thumbnail into `destination_dir` without overwriting anything
pub fn persist(
    asset: &ThumbnailAsset,
    destination_dir: &Path,
    video_title: Option<&str>,
) -> Result<PathBuf, ClassifiedError> {
    if !asset.cached_raw_path.exists() {
        return Err(classify(&DownloadError::NoAsset));
    }

    if !destination_dir.is_dir() {
        return Err(ClassifiedError::new(
            ErrorCategory::FilesystemError,
            format!(
                "Download directory is not set or doesn't exist: {}",
                destination_dir.display()
            ),
        ));
    }

    let save_path = unique_path(destination_dir, &thumbnail_filename(video_title));
    std::fs::copy(&asset.cached_raw_path, &save_path).map_err(|e| {
        ClassifiedError::new(
            ErrorCategory::FilesystemError,
            format!("Failed to save thumbnail to {}: {}", save_path.display(), e),
        )
    })?;

    info!(path = %save_path.display(), "Thumbnail saved");
    Ok(save_path)
}
