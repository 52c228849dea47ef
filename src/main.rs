use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, Level};

use tube_grab::config::{default_download_dir, Config};
use tube_grab::downloader::tools::ToolManager;
use tube_grab::downloader::{classify, ClassifiedError, DownloadRequest, MediaFormat, YtDlp};
use tube_grab::logging::init_logging;
use tube_grab::{App, AppEvent, ViewState};

/// Download a YouTube video as MP4 or its audio as MP3
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Video URL
    url: String,

    /// Extract audio to MP3 instead of downloading the video
    #[arg(short, long)]
    audio: bool,

    /// Destination directory (defaults to the user's download folder)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Also save the video thumbnail next to the download
    #[arg(short, long)]
    thumbnail: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    if let Err(e) = init_logging(level) {
        eprintln!("Could not initialize logging: {}", e);
    }

    match run(args).await {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(category = ?e.category, detail = %e.detail, "{}", e.title());
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<PathBuf, ClassifiedError> {
    let config = Config::from_env();
    ToolManager::new(config.clone())
        .check_prerequisites()
        .map_err(|e| classify(&e))?;

    let target_directory = args.dir.unwrap_or_else(default_download_dir);
    let format = if args.audio { MediaFormat::Audio } else { MediaFormat::Video };

    let resolver = Arc::new(YtDlp::new(config.clone()));
    let mut app = App::new(resolver, &config).map_err(|e| classify(&e))?;
    let mut view = ViewState::default();

    app.fetch_info(args.url.clone());
    let mut download_started = false;

    while let Some(event) = app.next_event().await {
        view.apply(&event);
        match event {
            AppEvent::InfoLoaded(metadata) => {
                eprintln!("{} ({} min)", metadata.title, metadata.duration_minutes());
            }
            AppEvent::InfoFailed(e) => return Err(e),
            AppEvent::ThumbnailReady(_) | AppEvent::ThumbnailUnavailable | AppEvent::ThumbnailFailed(_) => {
                if let AppEvent::ThumbnailFailed(e) = &event {
                    eprintln!("{}: {}", e.title(), e.detail);
                }
                if args.thumbnail && view.can_save_thumbnail() {
                    // Failure to save a thumbnail does not abort the download
                    if let Err(e) = app.save_thumbnail(&target_directory) {
                        eprintln!("{}", e.user_message());
                    }
                }
                if !download_started {
                    download_started = true;
                    let request = DownloadRequest::new(args.url.clone(), target_directory.clone(), format);
                    app.start_download(request)?;
                }
            }
            AppEvent::ThumbnailSaved(path) => eprintln!("Thumbnail saved: {}", path.display()),
            AppEvent::Progress(percent) => {
                eprint!("\rDownloading: {:5.1}%", percent);
                let _ = std::io::stderr().flush();
            }
            AppEvent::DownloadFinished(path) => {
                eprintln!();
                return Ok(path);
            }
            AppEvent::DownloadFailed(e) => {
                eprintln!();
                return Err(e);
            }
            AppEvent::DownloadStarted(_) | AppEvent::Rejected(_) => {}
        }
    }

    Err(ClassifiedError::new(
        tube_grab::ErrorCategory::UnknownError,
        "Event stream closed unexpectedly",
    ))
}
