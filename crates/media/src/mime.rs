//! File naming from MIME types.

/// Provided name if usable, else `<timestamp>.<subtype>`.
///
/// The subtype drops parameters, so `audio/ogg; codecs=opus` gives `ogg`.
#[must_use]
pub fn derive_file_name(provided: Option<&str>, mime_type: &str, timestamp: i64) -> String {
    if let Some(name) = provided.and_then(sanitize_file_name) {
        return name;
    }
    let subtype = mime_type
        .split(';')
        .next()
        .and_then(|essence| essence.split_once('/'))
        .map(|(_, sub)| sub.trim())
        .filter(|sub| !sub.is_empty())
        .unwrap_or("bin");
    format!("{timestamp}.{subtype}")
}

/// Top-level MIME type (`image`, `audio`, ...), used as the message media type.
#[must_use]
pub fn media_type(mime_type: &str) -> String {
    mime_type
        .split('/')
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("application")
        .to_ascii_lowercase()
}

/// Keep only the final path component; `None` if nothing usable remains.
#[must_use]
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}
