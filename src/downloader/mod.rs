// Downloader module - validation, probing, thumbnails and download sessions

pub mod backends;
pub mod classifier;
pub mod diagnostics;
pub mod errors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod probe;
pub mod progress;
pub mod thumbnail;
pub mod tools;
pub mod traits;
pub mod utils;
pub mod validator;

pub use backends::YtDlp;
pub use classifier::{classify, ClassifiedError, ErrorCategory};
pub use errors::DownloadError;
pub use format_selector::FormatSelector;
pub use models::{
    DownloadOptions, DownloadRequest, DownloadSession, MediaFormat, MediaMetadata, RawProgressEvent,
    ResolvedMedia, SessionState, ThumbnailAsset,
};
pub use orchestrator::{DownloadOrchestrator, SessionEvent, SessionHandle};
pub use probe::MediaProbe;
pub use progress::ProgressTracker;
pub use thumbnail::ThumbnailCache;
pub use tools::{ToolManager, ToolType};
pub use traits::{MediaResolver, ProgressCallback};
pub use validator::is_supported_url;
