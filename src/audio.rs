//! Filename and audio format helpers for uploads.

use std::path::Path;

/// Audio file extensions accepted when uploads are restricted to audio.
pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "aiff", "aif", "ogg", "flac", "m4a", "aac", "opus", "wma", "webm",
];

fn extension_lowercase(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Check if a file extension is a supported audio format.
pub fn is_supported_audio_format(filename: &str) -> bool {
    let ext = extension_lowercase(filename);
    SUPPORTED_AUDIO_EXTENSIONS.contains(&ext.as_str())
}

/// Make a client-supplied filename safe to use as a local path and object name.
///
/// Keeps only the last path component, joins whitespace runs with `_`, drops
/// anything outside `[A-Za-z0-9_.-]` and trims leading/trailing dots and
/// underscores. May return an empty string.
pub fn sanitize_filename(input: &str) -> String {
    let last_component = input.rsplit(['/', '\\']).next().unwrap_or("");

    let joined = last_component.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    kept.trim_matches(['.', '_']).to_string()
}

/// Pick the content type stored with the object.
///
/// Guessed from the extension first, then the part's declared type.
pub fn content_type_for(filename: &str, declared: Option<&str>) -> String {
    if let Some(mime) = mime_guess::from_path(filename).first() {
        return mime.essence_str().to_string();
    }

    declared
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string()
}
