// Error classification - maps raw errors into user-facing categories
//
// Classification looks at the declared kind first. Only a generic tool
// error is inspected further, by searching its message for the name of
// the transcoding binary. That text match is best-effort: it relies on
// the tool mentioning ffmpeg/ffprobe when post-processing cannot run.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{DownloadError, ToolErrorKind};

/// Names of the transcoding binaries the download tool shells out to
pub const TRANSCODER_NAMES: [&str; 2] = ["ffmpeg", "ffprobe"];

/// Closed set of error categories surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    InvalidRequest,
    AlreadyRunning,
    NetworkError,
    ResolutionError,
    TranscodeToolMissing,
    PermissionError,
    FilesystemError,
    DownloadToolError,
    NoAssetError,
    UnknownError,
}

impl ErrorCategory {
    /// Dialog title for this category
    pub fn title(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "Invalid Request",
            Self::AlreadyRunning => "Download in Progress",
            Self::NetworkError => "Network Error",
            Self::ResolutionError => "Video Not Available",
            Self::TranscodeToolMissing => "FFmpeg Missing",
            Self::PermissionError => "Permission Error",
            Self::FilesystemError => "File System Error",
            Self::DownloadToolError => "Download Error",
            Self::NoAssetError => "No Thumbnail",
            Self::UnknownError => "Error",
        }
    }

    /// Remediation message shown with the error
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::InvalidRequest => {
                "Please enter a valid YouTube URL and select an existing download directory."
            }
            Self::AlreadyRunning => "A download is already in progress. Please wait.",
            Self::NetworkError => {
                "Could not connect to the internet.\n\
                 Please check your connection and try again."
            }
            Self::ResolutionError => {
                "The video could not be resolved.\n\
                 It may be private, removed, blocked in your country,\n\
                 or the URL may contain an invalid video ID."
            }
            Self::TranscodeToolMissing => {
                "FFmpeg is required for this operation.\n\n\
                 Install it using:\n\
                 - Ubuntu/Debian: sudo apt install ffmpeg\n\
                 - macOS: brew install ffmpeg\n\
                 - Windows: Download from ffmpeg.org"
            }
            Self::PermissionError => {
                "Cannot write to the selected directory.\n\
                 Please choose a different location."
            }
            Self::FilesystemError => "Error accessing the file system.",
            Self::DownloadToolError => "The download tool reported an error.",
            Self::NoAssetError => "Please fetch a thumbnail first before saving.",
            Self::UnknownError => "An unexpected error occurred.",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// An error after classification, ready for presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    /// Original error text, kept for details/logs
    pub detail: String,
}

impl ClassifiedError {
    pub fn new(category: ErrorCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            detail: detail.into(),
        }
    }

    pub fn title(&self) -> &'static str {
        self.category.title()
    }

    pub fn remediation(&self) -> &'static str {
        self.category.remediation()
    }

    /// Full dialog body: remediation followed by the raw detail
    pub fn user_message(&self) -> String {
        if self.detail.is_empty() {
            self.remediation().to_string()
        } else {
            format!("{}\n\nDetails:\n{}", self.remediation(), self.detail)
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category.title(), self.detail)
    }
}

impl std::error::Error for ClassifiedError {}

impl From<DownloadError> for ClassifiedError {
    fn from(err: DownloadError) -> Self {
        classify(&err)
    }
}

fn mentions_transcoder(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSCODER_NAMES.iter().any(|name| lower.contains(name))
}

/// Map a raw error from any layer into its user-facing category
pub fn classify(err: &DownloadError) -> ClassifiedError {
    let category = match err {
        DownloadError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
        DownloadError::AlreadyRunning => ErrorCategory::AlreadyRunning,
        DownloadError::Http(_) => ErrorCategory::NetworkError,
        DownloadError::Tool { kind, message } => match kind {
            ToolErrorKind::Network => ErrorCategory::NetworkError,
            ToolErrorKind::Resolution => ErrorCategory::ResolutionError,
            ToolErrorKind::Generic if mentions_transcoder(message) => {
                ErrorCategory::TranscodeToolMissing
            }
            ToolErrorKind::Generic | ToolErrorKind::NotInstalled => {
                ErrorCategory::DownloadToolError
            }
        },
        DownloadError::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
            ErrorCategory::PermissionError
        }
        DownloadError::Io(_) => ErrorCategory::FilesystemError,
        DownloadError::NoAsset => ErrorCategory::NoAssetError,
        DownloadError::Image(_) | DownloadError::Json(_) | DownloadError::Other(_) => {
            ErrorCategory::UnknownError
        }
    };

    let detail = match err {
        DownloadError::Tool { message, .. } => message.clone(),
        other => other.to_string(),
    };

    ClassifiedError::new(category, detail)
}
