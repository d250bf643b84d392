//! Source documents and bookmark folder paths.

use serde::{Deserialize, Serialize};

/// One scraped bookmark page, as handed over by the external scrape step.
///
/// Immutable once produced; the sync pipeline consumes these and never
/// mutates them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceDocument {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Extracted page body text. May be empty when scraping yielded nothing.
    #[serde(default)]
    pub body: String,
    /// Folder path of the bookmark in the user's bookmark tree.
    #[serde(default)]
    pub path: BookmarkPath,
}

/// Hierarchical bookmark folder path.
///
/// Only the segments are stored; the display name and parent path are
/// derived, never persisted redundantly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkPath {
    pub segments: Vec<String>,
}

impl BookmarkPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Last segment, or "" for an empty path.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// All segments but the last.
    pub fn parent(&self) -> BookmarkPath {
        let end = self.segments.len().saturating_sub(1);
        BookmarkPath {
            segments: self.segments[..end].to_vec(),
        }
    }

    /// Display form of the folder path.
    pub fn folder(&self) -> String {
        self.segments.join(" / ")
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Pack the fields that exact/fuzzy search match against into one string.
///
/// Fields are separated by a single `'\n'`. Titles, urls and folder
/// segments are single-line, so the delimiter cannot collide with field
/// content.
pub fn build_search_text(url: &str, title: &str, path: &BookmarkPath) -> String {
    let folder = path.folder();
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    let title = title.trim();
    if !title.is_empty() {
        parts.push(title);
    }
    parts.push(url);
    if !folder.is_empty() {
        parts.push(&folder);
    }
    parts.join("\n")
}
