//! Small text helpers shared by the tracker and host adapters.

const PRIVILEGED_SCHEMES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "edge://",
    "devtools://",
    "about:",
];

/// Internal browser pages that can be neither captured nor scripted.
pub fn is_privileged_url(url: &str) -> bool {
    PRIVILEGED_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
}

/// Keep at most `max_words` whitespace-separated words.
///
/// Text that already fits is returned trimmed but otherwise unchanged.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let mut words = text.split_whitespace();
    let kept: Vec<&str> = words.by_ref().take(max_words).collect();
    if words.next().is_none() {
        return text.trim().to_string();
    }
    kept.join(" ")
}

/// Strip a `data:image/...;base64,` prefix if present.
pub fn strip_data_url_prefix(data: &str) -> &str {
    if data.starts_with("data:") {
        if let Some(idx) = data.find(";base64,") {
            return &data[idx + ";base64,".len()..];
        }
    }
    data
}
