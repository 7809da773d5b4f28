//! Content-Type selection.
//!
//! The type of a served object is decided in order by:
//!
//! 1. The extension of its key ([`by_extension`]).
//! 2. The content type stored with the object, unless it is one of the
//!    generic octet-stream types uploaders default to ([`is_generic`]).
//! 3. Sniffing the first [`SNIFF_LEN`] bytes ([`sniff`]).

use mime::Mime;

/// Number of leading bytes inspected by [`sniff`].
pub const SNIFF_LEN: usize = 512;

/// Guess a content type from the extension of `name`.
///
/// # Examples
///
/// ```
/// use bucketsite_http::content_type::by_extension;
///
/// assert_eq!(by_extension("about/index.html"), Some(mime::TEXT_HTML_UTF_8));
/// assert_eq!(by_extension("LOGO.PNG"), Some(mime::IMAGE_PNG));
/// assert_eq!(by_extension("README"), None);
/// ```
#[must_use]
pub fn by_extension(name: &str) -> Option<Mime> {
    let file = name.rsplit('/').next().unwrap_or(name);
    let (_, ext) = file.rsplit_once('.')?;

    let mime = match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => mime::TEXT_HTML_UTF_8,
        "css" => mime::TEXT_CSS_UTF_8,
        "js" | "mjs" => mime::APPLICATION_JAVASCRIPT_UTF_8,
        "json" | "map" => mime::APPLICATION_JSON,
        "txt" => mime::TEXT_PLAIN_UTF_8,
        "csv" => mime::TEXT_CSV_UTF_8,
        "xml" => mime::TEXT_XML,
        "pdf" => mime::APPLICATION_PDF,
        "svg" => mime::IMAGE_SVG,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "bmp" => mime::IMAGE_BMP,
        "woff" => mime::FONT_WOFF,
        "woff2" => mime::FONT_WOFF2,
        other => return extra_type(other),
    };
    Some(mime)
}

/// Types without a constant in the `mime` crate.
fn extra_type(ext: &str) -> Option<Mime> {
    let raw = match ext {
        "avif" => "image/avif",
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",
        "wasm" => "application/wasm",
        "md" => "text/markdown; charset=utf-8",
        "webmanifest" => "application/manifest+json",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => return None,
    };
    raw.parse().ok()
}

/// Whether a stored content type carries no information.
///
/// # Examples
///
/// ```
/// use bucketsite_http::content_type::is_generic;
///
/// assert!(is_generic("binary/octet-stream"));
/// assert!(is_generic("application/octet-stream; charset=binary"));
/// assert!(!is_generic("text/html"));
/// ```
#[must_use]
pub fn is_generic(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.is_empty() || essence == "binary/octet-stream" || essence == "application/octet-stream"
}

/// Signatures matched against the start of the content.
const MAGIC: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"\xFE\xFF", "text/plain; charset=utf-16be"),
    (b"\xFF\xFE", "text/plain; charset=utf-16le"),
    (b"\xEF\xBB\xBF", "text/plain; charset=utf-8"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x89PNG\r\n\x1A\n", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x00asm", "application/wasm"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"OggS\x00", "application/ogg"),
];

/// Tags that identify an HTML document when they open the content.
const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

/// Guess a content type from the leading bytes of the content.
///
/// Only the first [`SNIFF_LEN`] bytes are considered. Content that matches
/// no signature and contains no binary control bytes is plain text.
///
/// # Examples
///
/// ```
/// use bucketsite_http::content_type::sniff;
///
/// assert_eq!(sniff(b"  <!doctype html><p>hi"), "text/html; charset=utf-8");
/// assert_eq!(sniff(b"just words"), "text/plain; charset=utf-8");
/// assert_eq!(sniff(&[0u8, 1, 2, 3]), "application/octet-stream");
/// ```
#[must_use]
pub fn sniff(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    let text = data.trim_ascii_start();

    if HTML_TAGS.iter().any(|tag| is_html_tag(text, tag)) {
        return "text/html; charset=utf-8";
    }
    if text.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }
    if let Some(&(_, mime)) = MAGIC.iter().find(|(sig, _)| data.starts_with(sig)) {
        return mime;
    }
    if data.len() >= 14 && data.starts_with(b"RIFF") && &data[8..14] == b"WEBPVP" {
        return "image/webp";
    }
    if data.iter().any(|b| is_binary_byte(*b)) {
        return "application/octet-stream";
    }
    "text/plain; charset=utf-8"
}

/// Case-insensitive tag prefix followed by a space or `>`.
fn is_html_tag(data: &[u8], tag: &[u8]) -> bool {
    data.len() > tag.len()
        && data[..tag.len()].eq_ignore_ascii_case(tag)
        && matches!(data[tag.len()], b' ' | b'>')
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
