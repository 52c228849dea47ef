pub mod app;
pub mod config;
pub mod downloader;
pub mod logging;

pub use app::{App, AppEvent, ViewState};
pub use config::Config;
pub use downloader::{
    ClassifiedError, DownloadOrchestrator, DownloadRequest, ErrorCategory, MediaFormat, MediaProbe,
    MediaResolver, ThumbnailCache, YtDlp,
};
