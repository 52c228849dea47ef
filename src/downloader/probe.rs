// Media probe - resolves title, duration and thumbnail without downloading

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::classifier::{classify, ClassifiedError};
use super::errors::DownloadError;
use super::models::MediaMetadata;
use super::traits::MediaResolver;
use super::validator::is_supported_url;

pub struct MediaProbe<R: MediaResolver> {
    resolver: Arc<R>,
}

impl<R: MediaResolver> Clone for MediaProbe<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<R: MediaResolver + 'static> MediaProbe<R> {
    pub fn new(resolver: Arc<R>) -> Self {
        Self { resolver }
    }

    /// Resolve metadata for `url`.
    ///
    /// Fails with `ResolutionError` when the platform cannot identify the
    /// media and `NetworkError` on connectivity problems.
    pub async fn probe(&self, url: &str) -> Result<MediaMetadata, ClassifiedError> {
        let url = url.trim();
        if !is_supported_url(url) {
            return Err(classify(&DownloadError::InvalidRequest(format!(
                "Not a supported video URL: {}",
                url
            ))));
        }

        match self.resolver.resolve(url).await {
            Ok(resolved) => {
                let metadata = resolved.metadata;
                info!(
                    title = %metadata.title,
                    minutes = metadata.duration_minutes(),
                    has_thumbnail = metadata.thumbnail_url.is_some(),
                    "Resolved video info"
                );
                Ok(metadata)
            }
            Err(e) => {
                let classified = classify(&e);
                warn!(backend = self.resolver.name(), error = %e, "Probe failed");
                Err(classified)
            }
        }
    }

    /// Run the probe on a worker task; the handle yields the result
    pub fn spawn(&self, url: String) -> JoinHandle<Result<MediaMetadata, ClassifiedError>> {
        let probe = self.clone();
        tokio::spawn(async move { probe.probe(&url).await })
    }
}
