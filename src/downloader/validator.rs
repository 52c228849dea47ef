// URL validation - cheap syntactic gate before probing or downloading
//
// Substring match only. The resolver does the authoritative check, so a
// false positive here just surfaces later as a resolution error.

/// Host fragments that identify the supported platform
pub const KNOWN_HOSTS: [&str; 3] = ["youtube.com", "youtu.be", "www.youtube.com"];

/// Check that `url` plausibly points to a video on the supported platform
pub fn is_supported_url(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return false;
    }

    let lower = trimmed.to_lowercase();
    KNOWN_HOSTS.iter().any(|host| lower.contains(host))
}
