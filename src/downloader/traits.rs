// Media resolver trait definition

use async_trait::async_trait;
use std::sync::Arc;

use super::errors::DownloadError;
use super::models::{DownloadOptions, RawProgressEvent, ResolvedMedia};

/// Callback invoked by the resolver for every raw progress event.
///
/// Called from the worker context, never from the coordinating one.
pub type ProgressCallback = Arc<dyn Fn(RawProgressEvent) + Send + Sync>;

/// Capability that resolves URLs and downloads media
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Resolve metadata for `url` without downloading the media body
    async fn resolve(&self, url: &str) -> Result<ResolvedMedia, DownloadError>;

    /// Download `url` according to `options`, reporting progress through `progress`
    async fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        progress: ProgressCallback,
    ) -> Result<ResolvedMedia, DownloadError>;
}
