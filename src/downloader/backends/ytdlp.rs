// yt-dlp backend - drives the yt-dlp binary as a MediaResolver
//
// Resolution uses `--dump-json`. Downloads stream stdout/stderr line by
// line; progress and the prepared filename come back on marked lines
// produced by `--progress-template` and `--print`.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::downloader::diagnostics::{diagnose, summarize};
use crate::downloader::errors::DownloadError;
use crate::downloader::format_selector::FormatSelector;
use crate::downloader::models::{DownloadOptions, MediaMetadata, RawProgressEvent, ResolvedMedia};
use crate::downloader::traits::{MediaResolver, ProgressCallback};
use crate::downloader::utils::{self, run_output_with_timeout, spawn_error};

const PROGRESS_MARKER: &str = "__tg_progress__";
const FILENAME_MARKER: &str = "__tg_file__";
const INFO_MARKER: &str = "__tg_info__";

/// Fields of yt-dlp's info JSON we care about
#[derive(Debug, Deserialize)]
struct InfoJson {
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
}

impl From<InfoJson> for MediaMetadata {
    fn from(info: InfoJson) -> Self {
        Self {
            title: info.title.unwrap_or_else(|| "Unknown".to_string()),
            duration_seconds: info.duration.filter(|d| *d > 0.0).unwrap_or(0.0) as u64,
            thumbnail_url: info.thumbnail.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// What a single output line carried
#[derive(Debug, PartialEq)]
enum ToolLine {
    Progress(RawProgressEvent),
    PreparedFilename(PathBuf),
    Info(MediaMetadata),
    Other,
}

pub struct YtDlp {
    ytdlp_bin: String,
    config: Config,
}

impl YtDlp {
    pub fn new(config: Config) -> Self {
        let ytdlp_bin = utils::find_ytdlp(&config);
        Self { ytdlp_bin, config }
    }

    pub fn binary(&self) -> &str {
        &self.ytdlp_bin
    }

    fn resolve_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];
        args.extend(utils::get_timeout_args(&self.config));
        args.extend(utils::get_proxy_args(&self.config));
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    fn download_args(&self, url: &str, options: &DownloadOptions) -> Vec<String> {
        let mut args = FormatSelector::to_ytdlp_args(options);
        args.extend(vec![
            "--no-playlist".to_string(),
            "--newline".to_string(),
            // --print implies --quiet; keep progress lines coming
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{}%(progress.{{status,downloaded_bytes,total_bytes,total_bytes_estimate,_percent_str}})j",
                PROGRESS_MARKER
            ),
            "--print".to_string(),
            format!("before_dl:{}%(filename)s", FILENAME_MARKER),
            "--print".to_string(),
            format!("before_dl:{}%(.{{title,duration,thumbnail}})j", INFO_MARKER),
            "--no-simulate".to_string(),
        ]);
        args.extend(utils::get_timeout_args(&self.config));
        args.extend(utils::get_proxy_args(&self.config));
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[async_trait]
impl MediaResolver for YtDlp {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedMedia, DownloadError> {
        debug!(url, "Resolving metadata");
        let output = run_output_with_timeout(
            &self.ytdlp_bin,
            self.resolve_args(url),
            self.config.probe_timeout_secs,
        )
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(tool_failure(&stderr));
        }

        let metadata = parse_info_json(&output.stdout)?;
        Ok(ResolvedMedia {
            metadata,
            prepared_filename: None,
        })
    }

    async fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        progress: ProgressCallback,
    ) -> Result<ResolvedMedia, DownloadError> {
        let args = self.download_args(url, options);
        info!(url, format = ?options.format, "Starting yt-dlp download");

        let mut child = Command::new(&self.ytdlp_bin)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.ytdlp_bin, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Other("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Other("Failed to capture stderr".to_string()))?;

        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        let stdout_task = tokio::spawn(forward_lines(stdout, Stream::Stdout, line_tx.clone()));
        let stderr_task = tokio::spawn(forward_lines(stderr, Stream::Stderr, line_tx));

        let mut prepared_filename = None;
        let mut metadata = None;
        let mut stderr_lines = Vec::new();

        while let Some((stream, line)) = line_rx.recv().await {
            match parse_line(&line) {
                ToolLine::Progress(event) => progress(event),
                ToolLine::PreparedFilename(path) => {
                    debug!(path = %path.display(), "Prepared filename");
                    prepared_filename = Some(path);
                }
                ToolLine::Info(info) => metadata = Some(info),
                ToolLine::Other => {
                    trace!(?stream, "[yt-dlp] {}", line);
                    if stream == Stream::Stderr {
                        stderr_lines.push(line);
                    }
                }
            }
        }

        let _ = stdout_task.await;
        let _ = stderr_task.await;
        let status = child.wait().await?;

        if !status.success() {
            let stderr = stderr_lines.join("\n");
            warn!(code = ?status.code(), "yt-dlp exited with failure");
            return Err(tool_failure(&stderr));
        }

        let metadata = match metadata {
            Some(metadata) => metadata,
            None => self.resolve(url).await?.metadata,
        };

        Ok(ResolvedMedia {
            metadata,
            prepared_filename,
        })
    }
}

async fn forward_lines<R>(reader: R, stream: Stream, tx: mpsc::UnboundedSender<(Stream, String)>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send((stream, line)).is_err() {
            break;
        }
    }
}

fn parse_line(line: &str) -> ToolLine {
    let trimmed = line.trim();

    if let Some(json) = trimmed.strip_prefix(PROGRESS_MARKER) {
        return match serde_json::from_str::<RawProgressEvent>(json) {
            Ok(event) => ToolLine::Progress(event),
            Err(e) => {
                debug!(error = %e, json, "Skipping malformed progress line");
                ToolLine::Other
            }
        };
    }

    if let Some(path) = trimmed.strip_prefix(FILENAME_MARKER) {
        if !path.is_empty() && path != "NA" {
            return ToolLine::PreparedFilename(PathBuf::from(path));
        }
        return ToolLine::Other;
    }

    if let Some(json) = trimmed.strip_prefix(INFO_MARKER) {
        return match serde_json::from_str::<InfoJson>(json) {
            Ok(info) => ToolLine::Info(info.into()),
            Err(_) => ToolLine::Other,
        };
    }

    ToolLine::Other
}

fn parse_info_json(stdout: &[u8]) -> Result<MediaMetadata, DownloadError> {
    let json_str = String::from_utf8_lossy(stdout);
    // --dump-json prints one object per line; take the first
    let first = json_str
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| DownloadError::generic_tool("yt-dlp returned no metadata"))?;
    let info: InfoJson = serde_json::from_str(first)?;
    Ok(info.into())
}

fn tool_failure(stderr: &str) -> DownloadError {
    let kind = diagnose(stderr);
    let summary = summarize(stderr);
    let message = if summary.is_empty() {
        "yt-dlp failed without output".to_string()
    } else {
        summary
    };
    DownloadError::tool(kind, message)
}
