//! Directory listing generation
//!
//! Lists the immediate children of a directory, directories first, each group
//! sorted by name.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write as _;
use std::io;
use std::path::Path;
use tokio::fs;

/// Characters escaped in one URL path segment: everything but RFC 3986 unreserved
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub directories: Vec<String>,
    pub files: Vec<FileEntry>,
}

impl DirectoryListing {
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }
}

/// Read the immediate children of `dir`
///
/// Symlinks are followed; entries whose target cannot be read (broken links) are
/// skipped.
pub async fn read_listing(dir: &Path) -> io::Result<DirectoryListing> {
    let mut listing = DirectoryListing::default();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(metadata) = fs::metadata(entry.path()).await else {
            continue;
        };
        if metadata.is_dir() {
            listing.directories.push(name);
        } else {
            listing.files.push(FileEntry {
                name,
                size: metadata.len(),
            });
        }
    }

    listing.directories.sort();
    listing.files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listing)
}

/// Human readable size, e.g. `512 B` or `1.5 KiB`
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Render the listing page for the directory served at `directory_url`
///
/// `directory_url` is the decoded path and must end with `/`; entry links are
/// built below it, percent-encoded.
pub fn render(directory_url: &str, listing: &DirectoryListing) -> String {
    let title = escape_html(directory_url);
    let base = escape_html(&encode_path(directory_url));
    let mut html = String::with_capacity(1024);
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Index of {title}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 2em; }}
        table {{ border-collapse: collapse; min-width: 40%; }}
        th, td {{ text-align: left; padding: 0.25em 1em 0.25em 0; }}
        td.size {{ text-align: right; font-family: monospace; }}
        .empty {{ color: #777; font-style: italic; }}
    </style>
</head>
<body>
    <h1>Index of {title}</h1>
"#
    );

    if listing.is_empty() {
        html.push_str("    <p class=\"empty\">This directory is empty</p>\n");
    } else {
        html.push_str("    <table>\n        <tr><th>Name</th><th>Size</th></tr>\n");
        for name in &listing.directories {
            let _ = writeln!(
                html,
                "        <tr><td><a href=\"{}{}/\">{}/</a></td><td class=\"size\">-</td></tr>",
                base,
                encode_segment(name),
                escape_html(name),
            );
        }
        for file in &listing.files {
            let _ = writeln!(
                html,
                "        <tr><td><a href=\"{}{}\">{}</a></td><td class=\"size\">{}</td></tr>",
                base,
                encode_segment(&file.name),
                escape_html(&file.name),
                format_size(file.size),
            );
        }
        html.push_str("    </table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Percent-encode a file name for use as one URL path segment
fn encode_segment(name: &str) -> String {
    utf8_percent_encode(name, SEGMENT).to_string()
}

/// Percent-encode every segment of a `/`-separated path
fn encode_path(path: &str) -> String {
    path.split('/').map(encode_segment).collect::<Vec<_>>().join("/")
}
