// Runtime configuration
//
// Defaults match the desktop app; a handful of environment variables can
// override them (see `Config::from_env`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::downloader::format_selector::DEFAULT_AUDIO_BITRATE_KBPS;

pub const ENV_YTDLP: &str = "TUBE_GRAB_YTDLP";
pub const ENV_SCRATCH_DIR: &str = "TUBE_GRAB_SCRATCH_DIR";
pub const ENV_PROXY: &str = "TUBE_GRAB_PROXY";

/// Name of the scratch directory under the user's home
pub const SCRATCH_DIR_NAME: &str = ".youtube_downloader_temp";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Explicit yt-dlp binary; discovered on PATH when `None`
    pub ytdlp_path: Option<PathBuf>,
    /// Where the single cached thumbnail lives
    pub scratch_dir: PathBuf,
    /// SOCKS5/HTTP proxy URL passed to yt-dlp and the thumbnail client
    pub proxy: Option<String>,
    /// Socket timeout handed to yt-dlp, in seconds
    pub socket_timeout_secs: u32,
    /// Upper bound for a metadata probe, in seconds
    pub probe_timeout_secs: u64,
    /// MP3 bitrate for audio downloads
    pub audio_bitrate_kbps: u32,
    pub preview_width: u32,
    pub preview_height: u32,
    /// Canvas color behind the letterboxed preview
    pub preview_background: [u8; 3],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            scratch_dir: default_scratch_dir(),
            proxy: None,
            socket_timeout_secs: 30,
            probe_timeout_secs: 60,
            audio_bitrate_kbps: DEFAULT_AUDIO_BITRATE_KBPS,
            preview_width: 360,
            preview_height: 200,
            preview_background: [0xF5, 0xF7, 0xFA],
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = non_empty_env(ENV_YTDLP) {
            config.ytdlp_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = non_empty_env(ENV_SCRATCH_DIR) {
            config.scratch_dir = PathBuf::from(dir);
        }
        if let Some(proxy) = non_empty_env(ENV_PROXY) {
            config.proxy = Some(proxy);
        }

        config
    }

    pub fn with_ytdlp_path(mut self, path: Option<PathBuf>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.socket_timeout_secs = seconds;
        self
    }

    pub fn with_audio_bitrate(mut self, kbps: u32) -> Self {
        self.audio_bitrate_kbps = kbps;
        self
    }

    pub fn with_preview_size(mut self, width: u32, height: u32) -> Self {
        self.preview_width = width;
        self.preview_height = height;
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn default_scratch_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(SCRATCH_DIR_NAME)
}

/// Platform download directory, falling back to `~/Downloads`
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.preview_width, 360);
        assert_eq!(config.preview_height, 200);
        assert_eq!(config.audio_bitrate_kbps, 192);
        assert!(config.scratch_dir.ends_with(SCRATCH_DIR_NAME));
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .with_scratch_dir("/tmp/scratch")
            .with_proxy(Some("socks5://127.0.0.1:1080".to_string()))
            .with_audio_bitrate(320)
            .with_preview_size(100, 50);

        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/scratch"));
        assert_eq!(config.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(config.audio_bitrate_kbps, 320);
        assert_eq!((config.preview_width, config.preview_height), (100, 50));
    }
}
