//! Book metadata from the host reader page.
//!
//! The reader page embeds its bootstrap state as a
//! `window.__INITIAL_STATE__ = {...};` assignment. That blob carries the
//! book title, author, cover, and the ordered chapter list that export
//! pipelines iterate over. Decoding it is the one fallible surface in this
//! crate: callers sit outside the draw path and can retry or report.

use core::fmt;

use serde::{Deserialize, Serialize};

const STATE_MARKER: &str = "window.__INITIAL_STATE__";

/// Failure to decode the embedded reader state.
#[derive(Debug)]
pub enum MetadataError {
    /// The page carries no embedded state assignment.
    StateNotFound,
    /// The embedded state payload failed to decode.
    Json(serde_json::Error),
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateNotFound => write!(f, "embedded reader state not found in page"),
            Self::Json(err) => write!(f, "embedded reader state decode failed: {err}"),
        }
    }
}

impl std::error::Error for MetadataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StateNotFound => None,
            Self::Json(err) => Some(err),
        }
    }
}

/// Anchor inside a chapter (sub-heading level navigation point).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterAnchor {
    /// Anchor title.
    #[serde(default)]
    pub title: String,
    /// Nesting level.
    #[serde(default)]
    pub level: u32,
}

/// One chapter of the book, in reading order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    /// Host-assigned chapter identifier.
    pub id: u64,
    /// Chapter title.
    #[serde(default)]
    pub title: String,
    /// Nesting level.
    #[serde(default)]
    pub level: u32,
    /// Word count reported by the host.
    #[serde(default)]
    pub words: u64,
    /// Sub-chapter anchors, empty for flat chapters.
    #[serde(default)]
    pub anchors: Vec<ChapterAnchor>,
}

/// Book-level metadata plus the ordered chapter list.
///
/// Serializable both ways: export pipelines cache the decoded metadata
/// between runs instead of re-fetching the reader page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInfo {
    /// Book title.
    pub title: String,
    /// Author name.
    #[serde(default)]
    pub author: String,
    /// Cover image URI.
    #[serde(default)]
    pub cover: String,
    /// Publisher blurb.
    #[serde(default)]
    pub intro: String,
    /// Chapters in reading order.
    #[serde(default)]
    pub chapters: Vec<ChapterInfo>,
}

impl BookInfo {
    /// Decode book metadata from a reader page's HTML.
    pub fn from_reader_html(html: &str) -> Result<Self, MetadataError> {
        let json = embedded_state_json(html).ok_or(MetadataError::StateNotFound)?;
        let state: EmbeddedState = serde_json::from_str(json).map_err(MetadataError::Json)?;
        Ok(state.into())
    }
}

/// Slice the embedded state JSON out of a reader page.
///
/// Returns the object assigned to the state marker, through its closing
/// brace. `None` when the page carries no such assignment.
pub fn embedded_state_json(html: &str) -> Option<&str> {
    let marker = html.find(STATE_MARKER)?;
    let assign = marker + html[marker..].find('=')?;
    let end = assign + html[assign..].find("};")?;
    Some(html[assign + 1..=end].trim())
}

// Wire shape of the embedded state; only the parts the exporter reads.

#[derive(Deserialize)]
struct EmbeddedState {
    reader: ReaderState,
}

#[derive(Deserialize)]
struct ReaderState {
    #[serde(rename = "bookInfo")]
    book_info: EmbeddedBookInfo,
    #[serde(rename = "chapterInfos", default)]
    chapter_infos: Vec<EmbeddedChapter>,
}

#[derive(Deserialize)]
struct EmbeddedBookInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    cover: String,
    #[serde(default)]
    intro: String,
}

#[derive(Deserialize)]
struct EmbeddedChapter {
    #[serde(rename = "chapterUid")]
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    level: u32,
    #[serde(rename = "wordCount", default)]
    words: u64,
    #[serde(default)]
    anchors: Option<Vec<EmbeddedAnchor>>,
}

#[derive(Deserialize)]
struct EmbeddedAnchor {
    #[serde(default)]
    title: String,
    #[serde(default)]
    level: u32,
}

impl From<EmbeddedState> for BookInfo {
    fn from(state: EmbeddedState) -> Self {
        let book = state.reader.book_info;
        Self {
            title: book.title,
            author: book.author,
            cover: book.cover,
            intro: book.intro,
            chapters: state
                .reader
                .chapter_infos
                .into_iter()
                .map(|chapter| ChapterInfo {
                    id: chapter.id,
                    title: chapter.title,
                    level: chapter.level,
                    words: chapter.words,
                    anchors: chapter
                        .anchors
                        .unwrap_or_default()
                        .into_iter()
                        .map(|anchor| ChapterAnchor {
                            title: anchor.title,
                            level: anchor.level,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><script>
        window.__INITIAL_STATE__={"reader":{"bookInfo":{"title":"测试书","author":"某人","cover":"https://host/s_cover.jpg","intro":"intro text"},"chapterInfos":[{"chapterUid":1,"title":"第一章","level":1,"wordCount":4200,"anchors":[{"title":"一节","level":2}]},{"chapterUid":2,"title":"第二章","level":1,"wordCount":3100,"anchors":null}]}};(function(){})();
    </script></head><body></body></html>"#;

    #[test]
    fn decodes_book_and_chapters() {
        let info = BookInfo::from_reader_html(PAGE).unwrap();
        assert_eq!(info.title, "测试书");
        assert_eq!(info.author, "某人");
        assert_eq!(info.chapters.len(), 2);
        assert_eq!(info.chapters[0].id, 1);
        assert_eq!(info.chapters[0].words, 4200);
        assert_eq!(info.chapters[0].anchors[0].title, "一节");
        assert!(info.chapters[1].anchors.is_empty());
    }

    #[test]
    fn missing_marker_is_reported() {
        assert!(matches!(
            BookInfo::from_reader_html("<html></html>"),
            Err(MetadataError::StateNotFound)
        ));
    }

    #[test]
    fn malformed_payload_is_reported() {
        let page = "window.__INITIAL_STATE__={\"reader\":};";
        assert!(matches!(
            BookInfo::from_reader_html(page),
            Err(MetadataError::Json(_))
        ));
    }

    #[test]
    fn metadata_round_trips_through_cache_format() {
        let info = BookInfo::from_reader_html(PAGE).unwrap();
        let cached = serde_json::to_string(&info).unwrap();
        let reloaded: BookInfo = serde_json::from_str(&cached).unwrap();
        assert_eq!(info, reloaded);
    }
}
