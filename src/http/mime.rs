//! MIME type detection module
//!
//! Detects the Content-Type from the first bytes of a file, falling back to the
//! file extension and finally to `application/octet-stream`.

/// Fallback when nothing else matches
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Number of leading bytes inspected by [`sniff_content_type`]
pub const SNIFF_LEN: usize = 512;

/// Resolve the Content-Type of a file
///
/// Content sniffing wins over the extension, like `file(1)` would.
///
/// # Examples
/// ```
/// use sendfile::http::mime::detect_content_type;
/// assert_eq!(detect_content_type(b"%PDF-1.7\n", Some("bin")), "application/pdf");
/// assert_eq!(detect_content_type(&[0, 1, 2, 3], Some("mp4")), "video/mp4");
/// assert_eq!(detect_content_type(&[0, 1, 2, 3], None), "application/octet-stream");
/// ```
pub fn detect_content_type(head: &[u8], extension: Option<&str>) -> &'static str {
    sniff_content_type(head)
        .or_else(|| get_content_type(extension))
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Guess the Content-Type from magic numbers in the first bytes of a file
pub fn sniff_content_type(head: &[u8]) -> Option<&'static str> {
    match head {
        // Documents and archives
        [b'%', b'P', b'D', b'F', b'-', ..] => Some("application/pdf"),
        [b'P', b'K', 0x03, 0x04, ..] => Some("application/zip"),
        [0x1f, 0x8b, ..] => Some("application/gzip"),

        // Images
        [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', ..] => Some("image/png"),
        [0xff, 0xd8, 0xff, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),

        // Audio/Video
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some("audio/wav"),
        [b'I', b'D', b'3', ..] | [0xff, 0xfb | 0xf3 | 0xf2, ..] => Some("audio/mpeg"),
        [b'f', b'L', b'a', b'C', ..] => Some("audio/flac"),
        [b'O', b'g', b'g', b'S', ..] => Some("application/ogg"),
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => Some("video/mp4"),
        [0x1a, 0x45, 0xdf, 0xa3, ..] => Some("video/webm"),

        _ => sniff_text(head),
    }
}

/// Text formats, recognised only when the sample is valid UTF-8
fn sniff_text(head: &[u8]) -> Option<&'static str> {
    if head.is_empty() {
        return None;
    }

    let text = match std::str::from_utf8(head) {
        Ok(text) => text,
        // The sample may end in the middle of a multi-byte character
        Err(e) if e.error_len().is_none() => {
            std::str::from_utf8(&head[..e.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => return None,
    };

    if text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\x0c'))
    {
        return None;
    }

    let lead = text.trim_start().to_ascii_lowercase();
    if lead.starts_with("<!doctype html") || lead.starts_with("<html") {
        Some("text/html; charset=utf-8")
    } else if lead.starts_with("<?xml") {
        Some("application/xml")
    } else if lead.starts_with('{') || lead.starts_with('[') {
        Some("application/json")
    } else {
        Some("text/plain; charset=utf-8")
    }
}

/// Get MIME Content-Type based on file extension
pub fn get_content_type(extension: Option<&str>) -> Option<&'static str> {
    let ext = extension?.to_ascii_lowercase();
    let content_type = match ext.as_str() {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "json" => "application/json",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mov" => "video/quicktime",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",

        // Documents
        "pdf" => "application/pdf",
        "epub" => "application/epub+zip",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",

        _ => return None,
    };
    Some(content_type)
}
