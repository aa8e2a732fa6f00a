//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension. The static
//! file engine consults a [`MimeResolver`], so applications can plug in their own
//! table.

use std::path::Path;

/// Fallback content type for unknown or missing extensions
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Maps a file path to a content type
pub trait MimeResolver: Send + Sync {
    fn content_type(&self, path: &Path) -> String;
}

/// Built-in resolver matching on the lowercased file extension
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionMimeResolver;

impl MimeResolver for ExtensionMimeResolver {
    fn content_type(&self, path: &Path) -> String {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        get_content_type(extension.as_deref()).to_string()
    }
}

/// Get MIME Content-Type based on a lowercase file extension
///
/// # Examples
/// ```
/// use waypost::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("html")), "text/html");
/// assert_eq!(get_content_type(Some("mp4")), "video/mp4");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        // Text
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("txt" | "text" | "md" | "log") => "text/plain",
        Some("csv") => "text/csv",
        Some("xml") => "application/xml",

        // JavaScript/WASM
        Some("js" | "mjs") => "text/javascript",
        Some("json") => "application/json",
        Some("wasm") => "application/wasm",

        // Images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",

        // Video
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("ogv") => "video/ogg",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("mpeg" | "mpg") => "video/mpeg",

        // Audio
        Some("mp3") => "audio/mpeg",
        Some("ogg" | "oga") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("eot") => "application/vnd.ms-fontobject",

        // Documents
        Some("pdf") => "application/pdf",
        Some("rtf") => "application/rtf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("ppt") => "application/vnd.ms-powerpoint",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }

        // Archives
        Some("zip") => "application/zip",
        Some("gz" | "gzip") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("bz2") => "application/x-bzip2",
        Some("7z") => "application/x-7z-compressed",

        // Default
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(get_content_type(Some("html")), "text/html");
        assert_eq!(get_content_type(Some("css")), "text/css");
        assert_eq!(get_content_type(Some("js")), "text/javascript");
        assert_eq!(get_content_type(Some("json")), "application/json");
        assert_eq!(get_content_type(Some("png")), "image/png");
        assert_eq!(get_content_type(Some("mp4")), "video/mp4");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Some("xyz")), DEFAULT_CONTENT_TYPE);
        assert_eq!(get_content_type(None), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_resolver_uses_file_name() {
        let resolver = ExtensionMimeResolver;
        assert_eq!(resolver.content_type(Path::new("index.html")), "text/html");
        assert_eq!(
            resolver.content_type(Path::new("docs/report.pdf")),
            "application/pdf"
        );
        assert_eq!(resolver.content_type(Path::new("photo.jpg")), "image/jpeg");
        assert_eq!(resolver.content_type(Path::new("foo")), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_resolver_ignores_extension_case() {
        let resolver = ExtensionMimeResolver;
        assert_eq!(resolver.content_type(Path::new("PHOTO.JPG")), "image/jpeg");
        assert_eq!(resolver.content_type(Path::new("Notes.Txt")), "text/plain");
    }

    #[test]
    fn test_custom_resolver() {
        struct Fixed;
        impl MimeResolver for Fixed {
            fn content_type(&self, _path: &Path) -> String {
                "text/x-fixed".to_string()
            }
        }
        let resolver: &dyn MimeResolver = &Fixed;
        assert_eq!(resolver.content_type(Path::new("a.html")), "text/x-fixed");
    }
}
