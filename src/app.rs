// Application facade
//
// Wires probe, thumbnail cache and orchestrator together for a front end.
// Long work runs on worker tasks; every result comes back as an `AppEvent`
// on one channel that the coordinating context drains with `next_event`.
// `ViewState` folds those events into what a UI needs to render.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::downloader::classifier::ClassifiedError;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadRequest, MediaMetadata, ThumbnailAsset};
use crate::downloader::orchestrator::{DownloadOrchestrator, SessionEvent};
use crate::downloader::probe::MediaProbe;
use crate::downloader::thumbnail::ThumbnailCache;
use crate::downloader::traits::MediaResolver;

#[derive(Debug, Clone)]
pub enum AppEvent {
    InfoLoaded(MediaMetadata),
    InfoFailed(ClassifiedError),
    ThumbnailReady(ThumbnailAsset),
    /// The video has no thumbnail
    ThumbnailUnavailable,
    /// The thumbnail exists but could not be fetched; downloading is unaffected
    ThumbnailFailed(ClassifiedError),
    ThumbnailSaved(PathBuf),
    DownloadStarted(u64),
    Progress(f64),
    DownloadFinished(PathBuf),
    DownloadFailed(ClassifiedError),
    /// A request refused before any work started (bad input, busy, no asset)
    Rejected(ClassifiedError),
}

pub struct App<R: MediaResolver> {
    probe: MediaProbe<R>,
    thumbnails: Arc<ThumbnailCache>,
    orchestrator: DownloadOrchestrator<R>,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl<R: MediaResolver + 'static> App<R> {
    pub fn new(resolver: Arc<R>, config: &Config) -> Result<Self, DownloadError> {
        let thumbnails = ThumbnailCache::new(config)?;
        Ok(Self::with_parts(resolver, thumbnails, config.audio_bitrate_kbps))
    }

    pub fn with_parts(resolver: Arc<R>, thumbnails: ThumbnailCache, audio_bitrate_kbps: u32) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            probe: MediaProbe::new(Arc::clone(&resolver)),
            thumbnails: Arc::new(thumbnails),
            orchestrator: DownloadOrchestrator::new(resolver).with_audio_bitrate(audio_bitrate_kbps),
            events_tx,
            events_rx,
        }
    }

    pub fn orchestrator(&self) -> &DownloadOrchestrator<R> {
        &self.orchestrator
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    /// Probe `url`, then fetch its thumbnail.
    ///
    /// Emits `InfoLoaded` followed by `ThumbnailReady`, `ThumbnailUnavailable`
    /// or `ThumbnailFailed`, or a single `InfoFailed`.
    pub fn fetch_info(&self, url: impl Into<String>) -> JoinHandle<()> {
        let url = url.into();
        let probe = self.probe.clone();
        let thumbnails = Arc::clone(&self.thumbnails);
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let metadata = match probe.probe(&url).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    let _ = tx.send(AppEvent::InfoFailed(e));
                    return;
                }
            };
            let _ = tx.send(AppEvent::InfoLoaded(metadata.clone()));

            let event = match thumbnails.fetch_for(&metadata).await {
                Ok(Some(asset)) => AppEvent::ThumbnailReady(asset),
                Ok(None) => AppEvent::ThumbnailUnavailable,
                Err(e) => AppEvent::ThumbnailFailed(e),
            };
            let _ = tx.send(event);
        })
    }

    /// Save the current thumbnail into `destination_dir`
    pub fn save_thumbnail(&self, destination_dir: &Path) -> Result<PathBuf, ClassifiedError> {
        let result = self.thumbnails.persist_current(destination_dir);
        let event = match &result {
            Ok(path) => AppEvent::ThumbnailSaved(path.clone()),
            Err(e) => AppEvent::Rejected(e.clone()),
        };
        let _ = self.events_tx.send(event);
        result
    }

    /// Submit a download and forward its session events
    pub fn start_download(&self, request: DownloadRequest) -> Result<u64, ClassifiedError> {
        let mut handle = match self.orchestrator.submit(request) {
            Ok(handle) => handle,
            Err(e) => {
                let _ = self.events_tx.send(AppEvent::Rejected(e.clone()));
                return Err(e);
            }
        };

        let id = handle.id();
        let _ = self.events_tx.send(AppEvent::DownloadStarted(id));

        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = handle.next_event().await {
                let forwarded = match event {
                    SessionEvent::Progress { percent, .. } => AppEvent::Progress(percent),
                    SessionEvent::Succeeded { path, .. } => AppEvent::DownloadFinished(path),
                    SessionEvent::Failed { error, .. } => AppEvent::DownloadFailed(error),
                };
                if tx.send(forwarded).is_err() {
                    break;
                }
            }
            debug!(id, "Session event stream closed");
        });

        info!(id, "Download submitted");
        Ok(id)
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.events_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<AppEvent> {
        self.events_rx.try_recv().ok()
    }
}

/// What a front end renders, derived only from `AppEvent`s
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub metadata: Option<MediaMetadata>,
    pub has_thumbnail: bool,
    pub downloading: bool,
    pub progress_percent: f64,
    pub last_download: Option<PathBuf>,
    pub last_saved_thumbnail: Option<PathBuf>,
    pub last_error: Option<ClassifiedError>,
}

impl ViewState {
    pub fn apply(&mut self, event: &AppEvent) {
        match event {
            AppEvent::InfoLoaded(metadata) => {
                self.metadata = Some(metadata.clone());
                self.has_thumbnail = false;
                self.last_error = None;
            }
            AppEvent::InfoFailed(error) => {
                self.metadata = None;
                self.has_thumbnail = false;
                self.last_error = Some(error.clone());
            }
            AppEvent::ThumbnailReady(_) => self.has_thumbnail = true,
            AppEvent::ThumbnailUnavailable => self.has_thumbnail = false,
            AppEvent::ThumbnailFailed(error) => {
                self.has_thumbnail = false;
                self.last_error = Some(error.clone());
            }
            AppEvent::ThumbnailSaved(path) => self.last_saved_thumbnail = Some(path.clone()),
            AppEvent::DownloadStarted(_) => {
                self.downloading = true;
                self.progress_percent = 0.0;
                self.last_error = None;
            }
            AppEvent::Progress(percent) => {
                // Guards against a late event after a reset
                if *percent > self.progress_percent {
                    self.progress_percent = *percent;
                }
            }
            AppEvent::DownloadFinished(path) => {
                self.downloading = false;
                self.progress_percent = 100.0;
                self.last_download = Some(path.clone());
            }
            AppEvent::DownloadFailed(error) => {
                self.downloading = false;
                self.last_error = Some(error.clone());
            }
            AppEvent::Rejected(error) => self.last_error = Some(error.clone()),
        }
    }

    pub fn can_save_thumbnail(&self) -> bool {
        self.has_thumbnail
    }

    pub fn can_start_download(&self) -> bool {
        !self.downloading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::classifier::ErrorCategory;
    use crate::downloader::models::{DownloadOptions, MediaFormat, ResolvedMedia};
    use crate::downloader::traits::ProgressCallback;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FakeResolver {
        thumbnail_url: Option<String>,
    }

    #[async_trait]
    impl MediaResolver for FakeResolver {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn resolve(&self, _url: &str) -> Result<ResolvedMedia, DownloadError> {
            Ok(ResolvedMedia {
                metadata: MediaMetadata {
                    title: "Lecture".to_string(),
                    duration_seconds: 600,
                    thumbnail_url: self.thumbnail_url.clone(),
                },
                prepared_filename: None,
            })
        }

        async fn download(
            &self,
            url: &str,
            _options: &DownloadOptions,
            _progress: ProgressCallback,
        ) -> Result<ResolvedMedia, DownloadError> {
            self.resolve(url).await
        }
    }

    fn app(scratch: &Path) -> App<FakeResolver> {
        app_with_thumbnail(scratch, None)
    }

    fn app_with_thumbnail(scratch: &Path, thumbnail_url: Option<String>) -> App<FakeResolver> {
        let config = Config::default().with_scratch_dir(scratch);
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let cache = ThumbnailCache::with_client(&config, client);
        App::with_parts(Arc::new(FakeResolver { thumbnail_url }), cache, 192)
    }

    async fn next(app: &mut App<FakeResolver>) -> AppEvent {
        tokio::time::timeout(Duration::from_secs(5), app.next_event())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_fetch_info_without_thumbnail() {
        let scratch = tempfile::tempdir().unwrap();
        let mut app = app(scratch.path());
        let mut view = ViewState::default();

        app.fetch_info("https://www.youtube.com/watch?v=abc").await.unwrap();

        let first = next(&mut app).await;
        assert!(matches!(&first, AppEvent::InfoLoaded(m) if m.title == "Lecture"));
        view.apply(&first);
        let second = next(&mut app).await;
        assert!(matches!(second, AppEvent::ThumbnailUnavailable));
        view.apply(&second);

        assert_eq!(view.metadata.as_ref().map(|m| m.duration_minutes()), Some(10));
        assert!(!view.can_save_thumbnail());
    }

    #[tokio::test]
    async fn test_unreachable_thumbnail_surfaces_network_error() {
        // Bind then drop so nothing listens on the port
        let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let mut app = app_with_thumbnail(scratch.path(), Some(format!("http://{}/x.jpg", addr)));
        let mut view = ViewState::default();

        app.fetch_info("https://youtu.be/abc").await.unwrap();

        let first = next(&mut app).await;
        assert!(matches!(first, AppEvent::InfoLoaded(_)));
        view.apply(&first);
        let second = next(&mut app).await;
        match &second {
            AppEvent::ThumbnailFailed(e) => assert_eq!(e.category, ErrorCategory::NetworkError),
            other => panic!("unexpected event: {:?}", other),
        }
        view.apply(&second);

        assert_eq!(
            view.last_error.as_ref().map(|e| e.category),
            Some(ErrorCategory::NetworkError)
        );
        assert!(!view.can_save_thumbnail());
        assert!(view.can_start_download());
    }

    #[tokio::test]
    async fn test_fetch_info_rejects_foreign_url() {
        let scratch = tempfile::tempdir().unwrap();
        let mut app = app(scratch.path());

        app.fetch_info("https://example.com/video").await.unwrap();
        match next(&mut app).await {
            AppEvent::InfoFailed(e) => assert_eq!(e.category, ErrorCategory::InvalidRequest),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_without_thumbnail_is_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let mut app = app(scratch.path());

        let err = app.save_thumbnail(scratch.path()).unwrap_err();
        assert_eq!(err.category, ErrorCategory::NoAssetError);
        assert!(matches!(next(&mut app).await, AppEvent::Rejected(_)));
    }

    #[tokio::test]
    async fn test_download_events_reach_view_state() {
        let scratch = tempfile::tempdir().unwrap();
        let mut app = app(scratch.path());
        let mut view = ViewState::default();

        let request = DownloadRequest::new("https://youtu.be/abc", scratch.path(), MediaFormat::Video);
        app.start_download(request).unwrap();

        loop {
            let event = next(&mut app).await;
            view.apply(&event);
            if matches!(event, AppEvent::DownloadFinished(_) | AppEvent::DownloadFailed(_)) {
                break;
            }
        }

        assert!(view.can_start_download());
        assert_eq!(view.progress_percent, 100.0);
        assert_eq!(
            view.last_download,
            Some(scratch.path().join("Lecture.mp4"))
        );
    }

    #[test]
    fn test_view_progress_never_goes_back() {
        let mut view = ViewState::default();
        view.apply(&AppEvent::DownloadStarted(1));
        view.apply(&AppEvent::Progress(40.0));
        view.apply(&AppEvent::Progress(30.0));
        assert_eq!(view.progress_percent, 40.0);
        assert!(!view.can_start_download());
    }

    #[test]
    fn test_rejection_keeps_download_running() {
        let mut view = ViewState::default();
        view.apply(&AppEvent::DownloadStarted(1));
        view.apply(&AppEvent::Rejected(ClassifiedError::new(
            ErrorCategory::AlreadyRunning,
            "busy",
        )));
        assert!(view.downloading);
        assert_eq!(
            view.last_error.as_ref().map(|e| e.category),
            Some(ErrorCategory::AlreadyRunning)
        );
    }
}
