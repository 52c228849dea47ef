// Orchestrator - single-flight download sessions
//
// Session lifecycle: Idle -> Running -> Succeeded | Failed. A terminal
// session stays visible until the next accepted submission replaces it.
// Only one session may be Running; a second submission is rejected with
// AlreadyRunning, never queued.
//
// The worker task reports through an event channel. A guard owned by the
// worker moves the session out of Running on every exit path, panics
// included, so a failed download can never wedge the orchestrator.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::classifier::{classify, ClassifiedError, ErrorCategory};
use super::errors::DownloadError;
use super::format_selector::{FormatSelector, DEFAULT_AUDIO_BITRATE_KBPS};
use super::models::{
    DownloadOptions, DownloadRequest, DownloadSession, MediaFormat, RawProgressEvent, ResolvedMedia,
    SessionState,
};
use super::progress::ProgressTracker;
use super::thumbnail::sanitize_title;
use super::traits::{MediaResolver, ProgressCallback};
use super::validator::is_supported_url;

/// Events emitted by a running session, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Progress { id: u64, percent: f64 },
    Succeeded { id: u64, path: PathBuf },
    Failed { id: u64, error: ClassifiedError },
}

impl SessionEvent {
    pub fn session_id(&self) -> u64 {
        match self {
            Self::Progress { id, .. } | Self::Succeeded { id, .. } | Self::Failed { id, .. } => *id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Receiving end of one accepted submission
#[derive(Debug)]
pub struct SessionHandle {
    id: u64,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next event, or `None` once the session has finished and drained
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Non-blocking poll for UI loops
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// Drain events until the session ends and return its outcome
    pub async fn wait(mut self) -> Result<PathBuf, ClassifiedError> {
        while let Some(event) = self.events.recv().await {
            match event {
                SessionEvent::Succeeded { path, .. } => return Ok(path),
                SessionEvent::Failed { error, .. } => return Err(error),
                SessionEvent::Progress { .. } => {}
            }
        }
        Err(ClassifiedError::new(
            ErrorCategory::UnknownError,
            "Download session ended without a result",
        ))
    }
}

pub struct DownloadOrchestrator<R: MediaResolver> {
    resolver: Arc<R>,
    audio_bitrate_kbps: u32,
    session: Arc<Mutex<DownloadSession>>,
}

impl<R: MediaResolver + 'static> DownloadOrchestrator<R> {
    pub fn new(resolver: Arc<R>) -> Self {
        Self {
            resolver,
            audio_bitrate_kbps: DEFAULT_AUDIO_BITRATE_KBPS,
            session: Arc::new(Mutex::new(DownloadSession::idle())),
        }
    }

    pub fn with_audio_bitrate(mut self, kbps: u32) -> Self {
        self.audio_bitrate_kbps = kbps;
        self
    }

    /// Copy of the current (or last) session
    pub fn snapshot(&self) -> DownloadSession {
        self.session.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.session.lock().is_running()
    }

    /// Return a finished session to Idle. No-op while a download runs.
    pub fn reset(&self) {
        let mut session = self.session.lock();
        if !session.is_running() {
            let id = session.id;
            *session = DownloadSession { id, ..DownloadSession::idle() };
        }
    }

    /// Validate and start a download on a worker task.
    ///
    /// Must be called from within a tokio runtime. Rejections
    /// (`InvalidRequest`, `AlreadyRunning`) happen here, synchronously,
    /// and never touch the current session.
    pub fn submit(&self, request: DownloadRequest) -> Result<SessionHandle, ClassifiedError> {
        validate(&request).map_err(|e| classify(&e))?;

        let id = {
            let mut session = self.session.lock();
            if session.is_running() {
                warn!(url = %request.url, "Rejected submission: download already in progress");
                return Err(classify(&DownloadError::AlreadyRunning));
            }
            let id = session.id + 1;
            *session = DownloadSession::running(id, request.clone());
            id
        };

        info!(
            id,
            url = %request.url,
            dir = %request.target_directory.display(),
            format = request.format.label(),
            "Starting download"
        );

        let options = FormatSelector::options_for(
            request.format,
            &request.target_directory,
            self.audio_bitrate_kbps,
        );
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = SessionWorker {
            resolver: Arc::clone(&self.resolver),
            session: Arc::clone(&self.session),
            id,
            request,
            options,
            events: tx,
        };
        tokio::spawn(worker.run());

        Ok(SessionHandle { id, events: rx })
    }
}

fn validate(request: &DownloadRequest) -> Result<(), DownloadError> {
    if !is_supported_url(&request.url) {
        return Err(DownloadError::InvalidRequest(format!(
            "Please enter a valid YouTube URL: {}",
            request.url
        )));
    }
    if !request.target_directory.is_dir() {
        return Err(DownloadError::InvalidRequest(format!(
            "Please select a valid download directory: {}",
            request.target_directory.display()
        )));
    }
    Ok(())
}

/// Path of the finished file.
///
/// Audio is transcoded after download, so the tool's prepared name keeps
/// the pre-transcode extension; swap it for the audio one.
pub fn final_output_path(request: &DownloadRequest, resolved: &ResolvedMedia) -> PathBuf {
    let prepared = match &resolved.prepared_filename {
        Some(path) if path.is_relative() => request.target_directory.join(path),
        Some(path) => path.clone(),
        None => request.target_directory.join(format!(
            "{}.{}",
            sanitize_title(&resolved.metadata.title),
            request.format.extension()
        )),
    };

    match request.format {
        MediaFormat::Audio => prepared.with_extension(MediaFormat::Audio.extension()),
        MediaFormat::Video => prepared,
    }
}

struct SessionWorker<R: MediaResolver> {
    resolver: Arc<R>,
    session: Arc<Mutex<DownloadSession>>,
    id: u64,
    request: DownloadRequest,
    options: DownloadOptions,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<R: MediaResolver> SessionWorker<R> {
    async fn run(self) {
        let mut guard = CompletionGuard {
            session: Arc::clone(&self.session),
            id: self.id,
            events: self.events.clone(),
            done: false,
        };

        let progress = self.progress_callback();
        let outcome = self
            .resolver
            .download(&self.request.url, &self.options, Arc::clone(&progress))
            .await;

        match outcome {
            Ok(resolved) => {
                progress(RawProgressEvent::finished());
                let path = final_output_path(&self.request, &resolved);
                info!(id = self.id, path = %path.display(), "Download completed successfully");
                guard.finish(Ok(path));
            }
            Err(e) => {
                let classified = classify(&e);
                error!(
                    id = self.id,
                    category = ?classified.category,
                    error = %e,
                    "Download failed"
                );
                guard.finish(Err(classified));
            }
        }
    }

    fn progress_callback(&self) -> ProgressCallback {
        let tracker = Arc::new(Mutex::new(ProgressTracker::new()));
        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        let id = self.id;

        Arc::new(move |event: RawProgressEvent| {
            let Some(percent) = tracker.lock().observe(&event) else {
                return;
            };
            {
                let mut session = session.lock();
                if session.id == id {
                    session.progress_percent = percent;
                }
            }
            let _ = events.send(SessionEvent::Progress { id, percent });
        })
    }
}

/// Moves the session out of Running exactly once, whatever happens
struct CompletionGuard {
    session: Arc<Mutex<DownloadSession>>,
    id: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
    done: bool,
}

impl CompletionGuard {
    fn finish(&mut self, outcome: Result<PathBuf, ClassifiedError>) {
        if self.done {
            return;
        }
        self.done = true;

        let event = {
            let mut session = self.session.lock();
            if session.id == self.id {
                match &outcome {
                    Ok(path) => {
                        session.state = SessionState::Succeeded;
                        session.result_file_path = Some(path.clone());
                    }
                    Err(error) => {
                        session.state = SessionState::Failed;
                        session.error = Some(error.clone());
                    }
                }
            }
            match outcome {
                Ok(path) => SessionEvent::Succeeded { id: self.id, path },
                Err(error) => SessionEvent::Failed { id: self.id, error },
            }
        };

        let _ = self.events.send(event);
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.done {
            self.finish(Err(ClassifiedError::new(
                ErrorCategory::UnknownError,
                "Download task ended unexpectedly",
            )));
        }
    }
}
