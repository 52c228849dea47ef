use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

use super::classifier::TRANSCODER_NAMES;
use super::errors::{DownloadError, ToolErrorKind};
use super::utils::find_binary;
use crate::config::Config;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => TRANSCODER_NAMES[0],
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

pub struct ToolManager {
    config: Config,
}

impl ToolManager {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let (path, version) = self.detect_tool(tool_type);

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            is_available: path.is_some(),
            path,
        }
    }

    pub fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp),
            self.get_tool_info(ToolType::Ffmpeg),
        ]
    }

    /// yt-dlp is required; a missing ffmpeg only breaks merging and audio
    /// extraction, so it is reported but not fatal.
    pub fn check_prerequisites(&self) -> Result<Vec<ToolInfo>, DownloadError> {
        let tools = self.get_all_tools();

        for tool in &tools {
            match (tool.tool_type, tool.is_available) {
                (ToolType::YtDlp, false) => {
                    return Err(DownloadError::tool(
                        ToolErrorKind::NotInstalled,
                        "yt-dlp not found. Install it with `pip install -U yt-dlp`",
                    ));
                }
                (ToolType::Ffmpeg, false) => {
                    warn!("ffmpeg not found: merging and audio extraction will fail");
                }
                (_, true) => {
                    info!(
                        tool = %tool.name,
                        version = tool.version.as_deref().unwrap_or("unknown"),
                        "Tool available"
                    );
                }
            }
        }

        Ok(tools)
    }

    fn detect_tool(&self, tool_type: ToolType) -> (Option<String>, Option<String>) {
        let path = match (tool_type, &self.config.ytdlp_path) {
            (ToolType::YtDlp, Some(configured)) => resolve_configured(configured),
            _ => find_binary(tool_type.as_str()),
        };

        match path {
            Some(path) => {
                let path = path.to_string_lossy().to_string();
                let version = get_version(&path, tool_type);
                (Some(path), version)
            }
            None => (None, None),
        }
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// A bare command name is looked up like any other binary; a path must exist
fn resolve_configured(configured: &Path) -> Option<PathBuf> {
    let bare = configured.parent().map_or(true, |p| p.as_os_str().is_empty());
    if bare {
        find_binary(&configured.to_string_lossy())
    } else {
        Some(configured.to_path_buf()).filter(|p| p.exists())
    }
}

fn get_version(path: &str, tool_type: ToolType) -> Option<String> {
    match Command::new(path).arg(tool_type.version_arg()).output() {
        Ok(output) if output.status.success() => {
            let out = String::from_utf8_lossy(&output.stdout);
            // ffmpeg prints a banner; the first line carries the version
            out.lines().next().map(|line| line.trim().to_string())
        }
        _ => None,
    }
}
