// Helper functions for backend implementations

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::errors::{DownloadError, ToolErrorKind};
use crate::config::Config;

/// Map a spawn failure to a tool error, keeping "binary missing" distinct
pub fn spawn_error(program: &str, err: std::io::Error) -> DownloadError {
    if err.kind() == std::io::ErrorKind::NotFound {
        DownloadError::tool(
            ToolErrorKind::NotInstalled,
            format!("{} not found: {}", program, err),
        )
    } else {
        DownloadError::tool(
            ToolErrorKind::Generic,
            format!("Failed to start {}: {}", program, err),
        )
    }
}

/// Run command with timeout (shared utility)
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::Other(format!("Failed to capture stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::Other(format!("Failed to capture stderr from {}", program)))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await?;
        Ok::<Vec<u8>, std::io::Error>(buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await?;
        Ok::<Vec<u8>, std::io::Error>(buf)
    });

    let waited = timeout(Duration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status = status_res?;
            let stdout = stdout_task
                .await
                .map_err(|e| DownloadError::Other(format!("stdout task failed: {}", e)))??;
            let stderr = stderr_task
                .await
                .map_err(|e| DownloadError::Other(format!("stderr task failed: {}", e)))??;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::tool(
                ToolErrorKind::Network,
                format!("{} timed out after {}s", program, timeout_secs),
            ))
        }
    }
}

/// Find an executable in common install locations, then on PATH
pub fn find_binary(binary_name: &str) -> Option<PathBuf> {
    let exe = if cfg!(target_os = "windows") {
        format!("{}.exe", binary_name)
    } else {
        binary_name.to_string()
    };

    // Common paths where tools might be installed
    let common_dirs = ["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"];
    for dir in common_dirs {
        let candidate = Path::new(dir).join(&exe);
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(&exe))
        .find(|candidate| candidate.is_file())
}

/// yt-dlp executable: configured override, discovered path, or bare name
pub fn find_ytdlp(config: &Config) -> String {
    if let Some(path) = &config.ytdlp_path {
        return path.to_string_lossy().to_string();
    }

    match find_binary("yt-dlp") {
        Some(path) => {
            debug!(path = %path.display(), "Found yt-dlp");
            path.to_string_lossy().to_string()
        }
        // Last resort: hope it's in PATH
        None => "yt-dlp".to_string(),
    }
}

/// Build proxy arguments for yt-dlp
pub fn get_proxy_args(config: &Config) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(proxy) = &config.proxy {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }

    args
}

/// Build timeout arguments for yt-dlp
pub fn get_timeout_args(config: &Config) -> Vec<String> {
    vec![
        "--socket-timeout".to_string(),
        config.socket_timeout_secs.to_string(),
    ]
}

/// HTTP client honoring the configured proxy
pub fn http_client(config: &Config) -> Result<reqwest::Client, DownloadError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));

    if let Some(proxy_url) = config.proxy.as_deref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }

    Ok(builder.build()?)
}
