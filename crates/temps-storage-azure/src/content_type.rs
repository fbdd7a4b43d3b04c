//! Content type resolution for uploads

use std::path::Path;

use temps_storage::Uploadable;

/// Sent when nothing better is known
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type stored with a new blob.
///
/// A declared type wins; otherwise the original file name's extension is
/// consulted, falling back to [`DEFAULT_CONTENT_TYPE`].
pub fn resolve_content_type(uploadable: &dyn Uploadable) -> String {
    if let Some(declared) = uploadable
        .content_type()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return declared.to_string();
    }

    uploadable
        .original_filename()
        .map(guess_content_type)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

/// Guess content type from a file name extension
pub fn guess_content_type(filename: &str) -> &'static str {
    let extension = match Path::new(filename).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.to_lowercase(),
        None => return DEFAULT_CONTENT_TYPE,
    };

    match extension.as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        // Text
        "txt" => "text/plain",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        // Archives
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" | "gzip" => "application/gzip",
        // Media
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
