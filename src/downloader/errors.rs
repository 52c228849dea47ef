// Error types raised by the downloader layers
//
// These are the raw errors. Nothing user-facing is decided here;
// `classifier::classify` turns them into the closed set of categories
// the UI layer understands.

use thiserror::Error;

/// Kind declared by the download tool when it fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// Connectivity problem while talking to the platform
    Network,
    /// The tool could not identify the media (bad ID, removed, private, geo-blocked)
    Resolution,
    /// Any other reported failure, including post-processing
    Generic,
    /// The tool binary itself could not be started
    NotInstalled,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Resolution => "resolution",
            Self::Generic => "generic",
            Self::NotInstalled => "not-installed",
        }
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    /// URL or target directory rejected before anything started
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A download session is already running
    #[error("A download is already in progress")]
    AlreadyRunning,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure reported by the resolution/download tool
    #[error("{} tool error: {message}", kind.as_str())]
    Tool { kind: ToolErrorKind, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No thumbnail has been fetched yet
    #[error("No thumbnail has been fetched")]
    NoAsset,

    #[error("{0}")]
    Other(String),
}

impl DownloadError {
    pub fn tool(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self::Tool {
            kind,
            message: message.into(),
        }
    }

    pub fn generic_tool(message: impl Into<String>) -> Self {
        Self::tool(ToolErrorKind::Generic, message)
    }
}
