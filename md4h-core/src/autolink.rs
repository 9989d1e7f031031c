//! Auto-linkification heuristic
//!
//! Decides whether bare typed text should become a hyperlink. The rule is
//! an allowlist/denylist, not a URL grammar: missing a real link is
//! acceptable, turning a mention of `notes.md` into a link is not.

/// Common top-level-domain-shaped suffixes accepted for bare domain
/// tokens. Everything else without a scheme or path stays plain text.
const TLD_SUFFIXES: &[&str] = &[
    "com", "org", "net", "io", "dev", "app", "edu", "gov", "mil", "int",
    "info", "biz", "co", "me", "ai", "sh", "so", "to", "xyz", "cloud",
];

/// Whether `candidate` should be converted into a hyperlink.
pub fn should_auto_link(candidate: &str) -> bool {
    let text = candidate.trim();
    if text.is_empty() {
        return false;
    }
    if text.starts_with("http://") || text.starts_with("https://") {
        return true;
    }
    // A bare dot-extension token like `.md` is a file mention.
    if text.starts_with('.') && !text[1..].contains('.') {
        return false;
    }
    // A path segment means the author typed something address-like.
    if text.contains('/') {
        return true;
    }
    // name.suffix with no scheme and no path: only domain-shaped
    // suffixes qualify; file extensions do not.
    match text.rsplit_once('.') {
        Some((stem, suffix)) if !stem.is_empty() && !suffix.is_empty() => {
            let suffix = suffix.to_lowercase();
            TLD_SUFFIXES.contains(&suffix.as_str())
        }
        _ => false,
    }
}
