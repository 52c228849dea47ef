// Common data models for downloader

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output format chosen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaFormat {
    /// Best video + best audio, muxed into MP4
    Video,
    /// Best audio only, transcoded to MP3
    Audio,
}

impl MediaFormat {
    /// Extension of the final output file
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Video => "mp4",
            Self::Audio => "mp3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Video => "MP4 (Best Quality Video)",
            Self::Audio => "MP3 (Audio Only)",
        }
    }
}

/// A download as submitted by the user. Never mutated after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub target_directory: PathBuf,
    pub format: MediaFormat,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, target_directory: impl Into<PathBuf>, format: MediaFormat) -> Self {
        Self {
            url: url.into(),
            target_directory: target_directory.into(),
            format,
        }
    }
}

/// Lifecycle of a download session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Snapshot of the current (or last) download session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSession {
    /// Monotonic id, bumped on every accepted submission
    pub id: u64,
    pub request: Option<DownloadRequest>,
    pub state: SessionState,
    /// Always within 0..=100 and never decreasing within a session
    pub progress_percent: f64,
    pub result_file_path: Option<PathBuf>,
    pub error: Option<crate::downloader::classifier::ClassifiedError>,
}

impl DownloadSession {
    pub fn idle() -> Self {
        Self {
            id: 0,
            request: None,
            state: SessionState::Idle,
            progress_percent: 0.0,
            result_file_path: None,
            error: None,
        }
    }

    pub(crate) fn running(id: u64, request: DownloadRequest) -> Self {
        Self {
            id,
            request: Some(request),
            state: SessionState::Running,
            progress_percent: 0.0,
            result_file_path: None,
            error: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }
}

impl Default for DownloadSession {
    fn default() -> Self {
        Self::idle()
    }
}

/// Metadata resolved for a URL without downloading the media body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    pub duration_seconds: u64,
    pub thumbnail_url: Option<String>,
}

impl MediaMetadata {
    pub fn duration_minutes(&self) -> u64 {
        self.duration_seconds / 60
    }
}

/// Result of a resolver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub metadata: MediaMetadata,
    /// Filename the tool prepared before post-processing, when it downloaded
    pub prepared_filename: Option<PathBuf>,
}

/// A fetched thumbnail and its fixed-size preview
#[derive(Debug, Clone)]
pub struct ThumbnailAsset {
    pub source_url: String,
    pub cached_raw_path: PathBuf,
    pub rendered_image: RgbImage,
    pub video_title: Option<String>,
}

impl ThumbnailAsset {
    pub fn cached_raw_path(&self) -> &Path {
        &self.cached_raw_path
    }
}

/// Status reported by a raw progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Downloading,
    Finished,
    Error,
}

/// Raw progress event as emitted by the download tool.
///
/// Every field except `status` may be missing or unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProgressEvent {
    pub status: ProgressStatus,
    #[serde(default)]
    pub downloaded_bytes: Option<f64>,
    #[serde(default)]
    pub total_bytes: Option<f64>,
    #[serde(default)]
    pub total_bytes_estimate: Option<f64>,
    #[serde(default, rename = "_percent_str")]
    pub percent_str: Option<String>,
}

impl RawProgressEvent {
    pub fn downloading() -> Self {
        Self {
            status: ProgressStatus::Downloading,
            downloaded_bytes: None,
            total_bytes: None,
            total_bytes_estimate: None,
            percent_str: None,
        }
    }

    pub fn finished() -> Self {
        Self {
            status: ProgressStatus::Finished,
            ..Self::downloading()
        }
    }

    pub fn with_bytes(mut self, downloaded: f64, total: Option<f64>, estimate: Option<f64>) -> Self {
        self.downloaded_bytes = Some(downloaded);
        self.total_bytes = total;
        self.total_bytes_estimate = estimate;
        self
    }

    pub fn with_percent_str(mut self, percent: impl Into<String>) -> Self {
        self.percent_str = Some(percent.into());
        self
    }
}

/// Options bundle handed to the resolver for one download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub format: MediaFormat,
    /// yt-dlp format selector
    pub format_selector: String,
    /// Output path template, e.g. `/tmp/out/%(title)s.%(ext)s`
    pub output_template: String,
    /// Container for merged video output
    pub merge_output_format: Option<String>,
    /// Post-processing step, if any
    pub postprocessor: Option<PostProcessor>,
}

/// Post-processing directive applied after transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    ExtractAudio { codec: String, bitrate_kbps: u32 },
}
