// Progress tracking - turns raw tool events into a monotonic percentage
//
// Derivation order:
//   1. downloaded / (total or estimate) when both are present and total > 0
//   2. the tool's percent string, when it parses
//   3. a finished event forces 100
// Anything unusable leaves the previous value untouched.

use regex::Regex;
use tracing::debug;

use super::models::{ProgressStatus, RawProgressEvent};

lazy_static::lazy_static! {
    // yt-dlp colors its percent string when attached to a terminal
    static ref ANSI_RE: Regex = Regex::new(r"\x1b\[[0-9;]*m").unwrap();
}

/// Per-session progress state
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    percent: f64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current percentage, always within 0..=100
    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Start over for a new session
    pub fn reset(&mut self) {
        self.percent = 0.0;
    }

    /// Feed one raw event.
    ///
    /// Returns the new percentage when it changed, `None` when the event
    /// was ignored or did not move the value.
    pub fn observe(&mut self, event: &RawProgressEvent) -> Option<f64> {
        let candidate = match event.status {
            ProgressStatus::Finished => Some(100.0),
            ProgressStatus::Downloading => derive_percent(event),
            ProgressStatus::Error => None,
        }?;

        let next = candidate.clamp(0.0, 100.0).max(self.percent);
        if next > self.percent {
            self.percent = next;
            Some(next)
        } else {
            None
        }
    }
}

fn derive_percent(event: &RawProgressEvent) -> Option<f64> {
    if let Some(percent) = percent_from_bytes(event) {
        return Some(percent);
    }

    let raw = event.percent_str.as_deref()?;
    match parse_percent_str(raw) {
        Some(percent) => Some(percent),
        None => {
            debug!(raw, "Ignoring unparseable progress percentage");
            None
        }
    }
}

fn percent_from_bytes(event: &RawProgressEvent) -> Option<f64> {
    let downloaded = event.downloaded_bytes?;
    let total = event
        .total_bytes
        .filter(|t| *t > 0.0)
        .or(event.total_bytes_estimate)?;

    if total > 0.0 && downloaded.is_finite() && total.is_finite() {
        Some(downloaded / total * 100.0)
    } else {
        debug!(downloaded, total, "Ignoring unusable byte counts");
        None
    }
}

/// Parse strings like `" 42.5%"` (possibly colored) into `42.5`
pub fn parse_percent_str(raw: &str) -> Option<f64> {
    let cleaned = ANSI_RE.replace_all(raw, "");
    let number = cleaned.trim().trim_end_matches('%').trim();
    let value: f64 = number.parse().ok()?;
    value.is_finite().then_some(value)
}
