// Tool diagnostics - identifies what kind of failure the download tool hit
//
// Analyzes yt-dlp's stderr to determine the declared kind of a failure.
// Only network and resolution problems are recognised here; everything
// else stays generic so the classifier can look at it further.

use super::errors::ToolErrorKind;

/// Text that means the platform could not identify or serve the media
const RESOLUTION_PATTERNS: &[&str] = &[
    "video unavailable",
    "video is unavailable",
    "this video is no longer available",
    "video has been removed",
    "private video",
    "video is private",
    "sign in if you've been granted access",
    "available in your country",
    "blocked in your country",
    "geo restricted",
    "unsupported url",
    "incomplete youtube id",
    "is not a valid url",
    "confirm your age",
];

/// Text that means the network failed underneath the tool
const NETWORK_PATTERNS: &[&str] = &[
    "unable to download webpage",
    "urlopen error",
    "timed out",
    "timeout",
    "connection refused",
    "connection reset",
    "network is unreachable",
    "name or service not known",
    "temporary failure in name resolution",
    "getaddrinfo failed",
];

/// `ERROR:` lines if there are any, otherwise everything except `WARNING:` lines.
/// Retry warnings often precede an unrelated fatal error.
fn failure_text(stderr: &str) -> String {
    let lines = stderr.lines().map(str::trim);
    let errors: Vec<&str> = lines.clone().filter(|l| l.starts_with("ERROR:")).collect();
    if !errors.is_empty() {
        return errors.join("\n");
    }
    lines
        .filter(|l| !l.starts_with("WARNING:"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Analyze an error message and return the kind the tool declared
pub fn diagnose(stderr: &str) -> ToolErrorKind {
    let lower = failure_text(stderr).to_lowercase();

    // Resolution first: "unavailable" beats a timeout mention in the same output
    if RESOLUTION_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ToolErrorKind::Resolution;
    }

    if NETWORK_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ToolErrorKind::Network;
    }

    ToolErrorKind::Generic
}

/// First `ERROR:` line of the output, or the last non-empty line
pub fn summarize(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| stderr.lines().map(str::trim).filter(|l| !l.is_empty()).last())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_detection() {
        let error = "ERROR: [youtube] abc123: Video unavailable";
        assert_eq!(diagnose(error), ToolErrorKind::Resolution);
    }

    #[test]
    fn test_private_detection() {
        let error = "ERROR: [youtube] abc123: Private video. Sign in if you've been granted access to this video";
        assert_eq!(diagnose(error), ToolErrorKind::Resolution);
    }

    #[test]
    fn test_geo_detection() {
        let error = "ERROR: [youtube] abc: The uploader has not made this video available in your country";
        assert_eq!(diagnose(error), ToolErrorKind::Resolution);
    }

    #[test]
    fn test_invalid_id_detection() {
        let error = "ERROR: [youtube:truncated_id] abc: Incomplete YouTube ID abc.";
        assert_eq!(diagnose(error), ToolErrorKind::Resolution);
    }

    #[test]
    fn test_network_detection() {
        let error = "ERROR: [youtube] abc: Unable to download webpage: <urlopen error [Errno -3] Temporary failure in name resolution>";
        assert_eq!(diagnose(error), ToolErrorKind::Network);
    }

    #[test]
    fn test_ffmpeg_stays_generic() {
        let error = "ERROR: Postprocessing: ffprobe and ffmpeg not found. Please install or provide the path using --ffmpeg-location";
        assert_eq!(diagnose(error), ToolErrorKind::Generic);
    }

    #[test]
    fn test_retry_warning_does_not_decide_kind() {
        let stderr = "WARNING: [youtube] abc: Unable to download webpage: The read operation timed out. Retrying (1/3)...\n\
                      ERROR: Postprocessing: ffprobe and ffmpeg not found. Please install or provide the path using --ffmpeg-location";
        assert_eq!(diagnose(stderr), ToolErrorKind::Generic);
    }

    #[test]
    fn test_warnings_ignored_without_error_line() {
        assert_eq!(diagnose("WARNING: connection reset, retrying\nsomething broke"), ToolErrorKind::Generic);
        assert_eq!(diagnose("WARNING: x\nconnection refused"), ToolErrorKind::Network);
    }

    #[test]
    fn test_summarize_prefers_error_line() {
        let stderr = "WARNING: something\nERROR: Video unavailable\nmore noise";
        assert_eq!(summarize(stderr), "ERROR: Video unavailable");
        assert_eq!(summarize("first\nlast\n\n"), "last");
        assert_eq!(summarize(""), "");
    }
}
