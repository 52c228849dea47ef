// FormatSelector - builds format-specific download options
//
// VIDEO: best MP4 video + best M4A audio, merged into MP4, with
//        pre-muxed fallbacks when separate streams are not offered.
// AUDIO: best audio-only stream, extracted to MP3 at a fixed bitrate.
//
// Both name the output after the resolved title.

use std::path::Path;

use super::models::{DownloadOptions, MediaFormat, PostProcessor};

/// Format selector for separate best video + best audio, with fallbacks
pub const VIDEO_FORMAT_SPEC: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Format selector for audio-only downloads
pub const AUDIO_FORMAT_SPEC: &str = "bestaudio/best";

/// Output filename template, relative to the target directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Default MP3 bitrate in kbps
pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 192;

pub struct FormatSelector;

impl FormatSelector {
    /// Build the options bundle for one download
    pub fn options_for(format: MediaFormat, target_directory: &Path, audio_bitrate_kbps: u32) -> DownloadOptions {
        let output_template = target_directory
            .join(OUTPUT_TEMPLATE)
            .to_string_lossy()
            .to_string();

        match format {
            MediaFormat::Video => DownloadOptions {
                format,
                format_selector: VIDEO_FORMAT_SPEC.to_string(),
                output_template,
                merge_output_format: Some(MediaFormat::Video.extension().to_string()),
                postprocessor: None,
            },
            MediaFormat::Audio => DownloadOptions {
                format,
                format_selector: AUDIO_FORMAT_SPEC.to_string(),
                output_template,
                merge_output_format: None,
                postprocessor: Some(PostProcessor::ExtractAudio {
                    codec: MediaFormat::Audio.extension().to_string(),
                    bitrate_kbps: audio_bitrate_kbps,
                }),
            },
        }
    }

    /// Translate options into yt-dlp command-line arguments (URL excluded)
    pub fn to_ytdlp_args(options: &DownloadOptions) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            options.format_selector.clone(),
            "-o".to_string(),
            options.output_template.clone(),
        ];

        if let Some(container) = &options.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(container.clone());
        }

        if let Some(PostProcessor::ExtractAudio { codec, bitrate_kbps }) = &options.postprocessor {
            args.extend(vec![
                "-x".to_string(),
                "--audio-format".to_string(),
                codec.clone(),
                "--audio-quality".to_string(),
                format!("{}K", bitrate_kbps),
            ]);
        }

        args
    }
}
