use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use tube_grab::downloader::errors::{DownloadError, ToolErrorKind};
use tube_grab::downloader::models::{
    DownloadOptions, MediaMetadata, PostProcessor, RawProgressEvent, ResolvedMedia, SessionState,
};
use tube_grab::downloader::orchestrator::SessionEvent;
use tube_grab::downloader::traits::ProgressCallback;
use tube_grab::{DownloadOrchestrator, DownloadRequest, ErrorCategory, MediaFormat, MediaProbe, MediaResolver};

enum Script {
    /// Emit progress, wait for the gate, then succeed with this prepared name
    Succeed { prepared: &'static str, gate: Option<Arc<Notify>> },
    Fail(ToolErrorKind, &'static str),
    Panic,
}

struct ScriptedResolver {
    script: Script,
    seen_options: parking_lot::Mutex<Vec<DownloadOptions>>,
}

impl ScriptedResolver {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            seen_options: parking_lot::Mutex::new(Vec::new()),
        })
    }
}

fn metadata() -> MediaMetadata {
    MediaMetadata {
        title: "Test Clip".to_string(),
        duration_seconds: 125,
        thumbnail_url: Some("https://i.ytimg.com/vi/abc/hq.jpg".to_string()),
    }
}

#[async_trait]
impl MediaResolver for ScriptedResolver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn resolve(&self, _url: &str) -> Result<ResolvedMedia, DownloadError> {
        match &self.script {
            Script::Fail(kind, message) => Err(DownloadError::tool(*kind, *message)),
            _ => Ok(ResolvedMedia { metadata: metadata(), prepared_filename: None }),
        }
    }

    async fn download(
        &self,
        _url: &str,
        options: &DownloadOptions,
        progress: ProgressCallback,
    ) -> Result<ResolvedMedia, DownloadError> {
        self.seen_options.lock().push(options.clone());

        match &self.script {
            Script::Succeed { prepared, gate } => {
                progress(RawProgressEvent::downloading().with_bytes(25.0, Some(100.0), None));
                // Regression from a second stream must not move progress back
                progress(RawProgressEvent::downloading().with_bytes(10.0, Some(100.0), None));
                progress(RawProgressEvent::downloading().with_percent_str("\u{1b}[0;94m 60.0%\u{1b}[0m"));
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                let target = Path::new(&options.output_template)
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                Ok(ResolvedMedia {
                    metadata: metadata(),
                    prepared_filename: Some(target.join(prepared)),
                })
            }
            Script::Fail(kind, message) => {
                progress(RawProgressEvent::downloading().with_percent_str("5.0%"));
                Err(DownloadError::tool(*kind, *message))
            }
            Script::Panic => panic!("resolver blew up"),
        }
    }
}

async fn collect(mut handle: tube_grab::downloader::SessionHandle) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), handle.next_event())
            .await
            .expect("timed out waiting for session event")
            .expect("session ended without a terminal event");
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

fn progress_values(events: &[SessionEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_audio_download_reports_mp3_path() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ScriptedResolver::new(Script::Succeed { prepared: "Test Clip.webm", gate: None });
    let orchestrator = DownloadOrchestrator::new(Arc::clone(&resolver));

    let request = DownloadRequest::new("https://www.youtube.com/watch?v=abc", dir.path(), MediaFormat::Audio);
    let handle = orchestrator.submit(request).unwrap();
    let events = collect(handle).await;

    assert_eq!(progress_values(&events), vec![25.0, 60.0, 100.0]);
    match events.last() {
        Some(SessionEvent::Succeeded { path, .. }) => {
            assert_eq!(path, &dir.path().join("Test Clip.mp3"));
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }

    let options = resolver.seen_options.lock()[0].clone();
    assert_eq!(options.format_selector, "bestaudio/best");
    assert!(matches!(
        options.postprocessor,
        Some(PostProcessor::ExtractAudio { bitrate_kbps: 192, .. })
    ));

    let session = orchestrator.snapshot();
    assert_eq!(session.state, SessionState::Succeeded);
    assert_eq!(session.progress_percent, 100.0);
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn test_second_submission_is_rejected_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(Notify::new());
    let resolver = ScriptedResolver::new(Script::Succeed {
        prepared: "Test Clip.mp4",
        gate: Some(Arc::clone(&gate)),
    });
    let orchestrator = DownloadOrchestrator::new(resolver);

    let request = DownloadRequest::new("https://youtu.be/abc", dir.path(), MediaFormat::Video);
    let handle = orchestrator.submit(request.clone()).unwrap();
    let first_id = handle.id();

    let err = orchestrator.submit(request.clone()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::AlreadyRunning);

    // The rejection leaves the running session untouched
    let session = orchestrator.snapshot();
    assert_eq!(session.id, first_id);
    assert_eq!(session.state, SessionState::Running);

    gate.notify_one();
    let path = handle.wait().await.unwrap();
    assert_eq!(path, dir.path().join("Test Clip.mp4"));

    // Lock released: a new submission is accepted
    gate.notify_one();
    let handle = orchestrator.submit(request).unwrap();
    assert_eq!(handle.id(), first_id + 1);
    handle.wait().await.unwrap();
}

#[tokio::test]
async fn test_missing_ffmpeg_is_classified_and_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ScriptedResolver::new(Script::Fail(
        ToolErrorKind::Generic,
        "ERROR: Postprocessing: ffprobe and ffmpeg not found. Please install or provide the path",
    ));
    let orchestrator = DownloadOrchestrator::new(resolver);

    let request = DownloadRequest::new("https://youtu.be/abc", dir.path(), MediaFormat::Audio);
    let err = orchestrator.submit(request.clone()).unwrap().wait().await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::TranscodeToolMissing);

    let session = orchestrator.snapshot();
    assert_eq!(session.state, SessionState::Failed);
    assert_eq!(session.error.map(|e| e.category), Some(ErrorCategory::TranscodeToolMissing));
    assert!(orchestrator.submit(request).is_ok());
}

#[tokio::test]
async fn test_network_kind_wins_over_transcoder_mention() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ScriptedResolver::new(Script::Fail(
        ToolErrorKind::Network,
        "Connection reset while ffmpeg was merging",
    ));
    let orchestrator = DownloadOrchestrator::new(resolver);

    let request = DownloadRequest::new("https://youtu.be/abc", dir.path(), MediaFormat::Video);
    let err = orchestrator.submit(request).unwrap().wait().await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::NetworkError);
}

#[tokio::test]
async fn test_worker_panic_still_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = DownloadOrchestrator::new(ScriptedResolver::new(Script::Panic));

    let request = DownloadRequest::new("https://youtu.be/abc", dir.path(), MediaFormat::Video);
    let err = orchestrator.submit(request).unwrap().wait().await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::UnknownError);
    assert!(!orchestrator.is_running());
    assert_eq!(orchestrator.snapshot().state, SessionState::Failed);
}

#[tokio::test]
async fn test_invalid_requests_never_start() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ScriptedResolver::new(Script::Succeed { prepared: "x.mp4", gate: None });
    let orchestrator = DownloadOrchestrator::new(Arc::clone(&resolver));

    let bad_url = DownloadRequest::new("https://vimeo.com/123", dir.path(), MediaFormat::Video);
    assert_eq!(orchestrator.submit(bad_url).unwrap_err().category, ErrorCategory::InvalidRequest);

    let bad_dir = DownloadRequest::new("https://youtu.be/abc", dir.path().join("nope"), MediaFormat::Video);
    assert_eq!(orchestrator.submit(bad_dir).unwrap_err().category, ErrorCategory::InvalidRequest);

    assert_eq!(orchestrator.snapshot().state, SessionState::Idle);
    assert!(resolver.seen_options.lock().is_empty());
}

#[tokio::test]
async fn test_probe_maps_resolution_failure() {
    let resolver = ScriptedResolver::new(Script::Fail(ToolErrorKind::Resolution, "Video unavailable"));
    let probe = MediaProbe::new(resolver);

    let err = probe.probe("https://www.youtube.com/watch?v=gone").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::ResolutionError);
}

#[tokio::test]
async fn test_probe_on_worker_task() {
    let probe = MediaProbe::new(ScriptedResolver::new(Script::Succeed { prepared: "x.mp4", gate: None }));

    let metadata = probe.spawn("https://youtu.be/abc".to_string()).await.unwrap().unwrap();
    assert_eq!(metadata.title, "Test Clip");
    assert_eq!(metadata.duration_minutes(), 2);
}
