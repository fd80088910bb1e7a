//! Content-type resolution
//!
//! Extension lookup first, then a small magic-number sniff, then a text vs
//! binary default. Pure and deterministic.

use crate::deploy::Content;

const OCTET_STREAM: &str = "application/octet-stream";
const TEXT_PLAIN: &str = "text/plain";

/// Resolve the MIME type for a named piece of content
pub fn resolve_content_type(name: &str, content: Option<&Content>) -> String {
    if let Some(mime) = mime_guess::from_path(name).first_raw() {
        return mime.to_string();
    }

    match content {
        Some(Content::Text(_)) => TEXT_PLAIN.to_string(),
        Some(Content::Bytes(bytes)) => sniff(bytes).to_string(),
        None => OCTET_STREAM.to_string(),
    }
}

fn sniff(bytes: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
        (b"\0asm", "application/wasm"),
    ];

    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| bytes.starts_with(magic)) {
        return *mime;
    }

    if looks_like_text(bytes) {
        TEXT_PLAIN
    } else {
        OCTET_STREAM
    }
}

fn looks_like_text(bytes: &[u8]) -> bool {
    !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok()
}
