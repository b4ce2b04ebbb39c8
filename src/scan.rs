//! Positioned-element scan of the host's content container.
//!
//! The host renderer draws body text onto the canvas but keeps code blocks,
//! images, and rule lines as off-canvas DOM elements, each tagged with the
//! canvas coordinates where it belongs via an inline `translate(x, y)` style.
//! [`PageScan::from_html`] walks a serialized snapshot of that markup and
//! collects the anchors the reconstruction engine splices between text lines.
//!
//! The scan never fails: malformed position styles skip the element, and a
//! tokenizer error aborts the walk with whatever was collected so far.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use smallvec::SmallVec;

use crate::engine::Heuristics;

/// Code block anchored to canvas coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeAnchor {
    /// Anchor x.
    pub x: i32,
    /// Anchor y.
    pub y: i32,
    /// Preformatted text content.
    pub text: String,
}

/// Image anchored to canvas coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAnchor {
    /// Anchor x.
    pub x: i32,
    /// Anchor y.
    pub y: i32,
    /// Image source URI.
    pub src: String,
}

/// Horizontal rule anchored to canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleAnchor {
    /// Anchor x.
    pub x: i32,
    /// Anchor y.
    pub y: i32,
}

/// One session's snapshot of positioned auxiliary elements.
///
/// Lists preserve document order. A handful of anchors per chapter is the
/// norm, hence the inline capacity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageScan {
    /// Code-block elements in document order.
    pub code_blocks: SmallVec<[CodeAnchor; 4]>,
    /// Image elements in document order.
    pub images: SmallVec<[ImageAnchor; 4]>,
    /// Rule elements in document order.
    pub rules: SmallVec<[RuleAnchor; 4]>,
    /// Text of the chapter-title element, when the page carries one.
    pub chapter_title: Option<String>,
}

impl PageScan {
    /// Scan a serialized snapshot of the host page markup.
    ///
    /// Anchors are collected only from subtrees whose root carries the
    /// configured container class; the chapter-title element is matched
    /// anywhere in the snapshot (the host places it outside the container).
    pub fn from_html(html: &str, cfg: &Heuristics) -> Self {
        let mut reader = Reader::from_reader(html.as_bytes());
        let config = reader.config_mut();
        config.trim_text(false);
        // Host snapshots are serialized HTML, not XHTML.
        config.check_end_names = false;

        let mut scan = Self::default();
        let mut buf = Vec::with_capacity(64);
        // Subtree depth counters; 0 = outside.
        let mut container_depth = 0usize;
        let mut pre_depth = 0usize;
        let mut title_depth = 0usize;
        let mut pre_pending: Option<(Option<(i32, i32)>, String)> = None;
        let mut title_pending: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let tag = local_tag(&reader, e.name().as_ref());
                    if is_void_tag(&tag) {
                        // Serialized HTML leaves these unclosed; treat them as
                        // leaves so depth accounting stays balanced.
                        if container_depth > 0 {
                            collect_leaf(&reader, &e, &tag, &mut scan);
                        }
                        buf.clear();
                        continue;
                    }
                    if container_depth > 0 {
                        container_depth += 1;
                    } else if has_class(&reader, &e, &cfg.container_class) {
                        container_depth = 1;
                    }
                    if title_depth > 0 {
                        title_depth += 1;
                    } else if title_pending.is_none()
                        && scan.chapter_title.is_none()
                        && has_class(&reader, &e, &cfg.title_class)
                    {
                        title_depth = 1;
                        title_pending = Some(String::new());
                    }
                    if pre_depth > 0 {
                        pre_depth += 1;
                    } else if container_depth > 0 && tag == "pre" {
                        pre_depth = 1;
                        pre_pending = Some((style_anchor(&reader, &e), String::new()));
                    }
                }
                Ok(Event::Empty(e)) => {
                    let tag = local_tag(&reader, e.name().as_ref());
                    if container_depth > 0 {
                        collect_leaf(&reader, &e, &tag, &mut scan);
                    }
                }
                Ok(Event::End(e)) => {
                    let tag = local_tag(&reader, e.name().as_ref());
                    if is_void_tag(&tag) {
                        buf.clear();
                        continue;
                    }
                    if pre_depth > 0 {
                        pre_depth -= 1;
                        if pre_depth == 0 {
                            if let Some((anchor, text)) = pre_pending.take() {
                                if let Some((x, y)) = anchor {
                                    scan.code_blocks.push(CodeAnchor { x, y, text });
                                }
                            }
                        }
                    }
                    if title_depth > 0 {
                        title_depth -= 1;
                        if title_depth == 0 {
                            if let Some(text) = title_pending.take() {
                                let trimmed = text.trim();
                                if !trimmed.is_empty() {
                                    scan.chapter_title = Some(trimmed.to_string());
                                }
                            }
                        }
                    }
                    if container_depth > 0 {
                        container_depth -= 1;
                    }
                }
                Ok(Event::Text(e)) => {
                    if pre_depth > 0 || title_depth > 0 {
                        if let Ok(text) = e.decode() {
                            append_captured(
                                text.as_ref(),
                                pre_depth,
                                &mut pre_pending,
                                &mut title_pending,
                            );
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if pre_depth > 0 || title_depth > 0 {
                        if let Ok(text) = reader.decoder().decode(&e) {
                            append_captured(
                                text.as_ref(),
                                pre_depth,
                                &mut pre_pending,
                                &mut title_pending,
                            );
                        }
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if pre_depth > 0 || title_depth > 0 {
                        if let Ok(name) = e.decode() {
                            let entity = format!("&{};", name.as_ref());
                            let resolved = quick_xml::escape::unescape(&entity)
                                .map(|value| value.into_owned())
                                .unwrap_or(entity);
                            append_captured(
                                &resolved,
                                pre_depth,
                                &mut pre_pending,
                                &mut title_pending,
                            );
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    log::warn!("container scan aborted: {:?}", err);
                    break;
                }
            }
            buf.clear();
        }

        scan
    }

    /// Re-scan only the image elements of a snapshot.
    ///
    /// Used by the deferred post-restore rescan, which cares about images the
    /// host mounted after the render pass finished.
    pub fn images_from_html(html: &str, cfg: &Heuristics) -> SmallVec<[ImageAnchor; 4]> {
        Self::from_html(html, cfg).images
    }
}

fn append_captured(
    text: &str,
    pre_depth: usize,
    pre_pending: &mut Option<(Option<(i32, i32)>, String)>,
    title_pending: &mut Option<String>,
) {
    if pre_depth > 0 {
        if let Some((_, buffer)) = pre_pending.as_mut() {
            buffer.push_str(text);
        }
    } else if let Some(buffer) = title_pending.as_mut() {
        buffer.push_str(text);
    }
}

fn collect_leaf(reader: &Reader<&[u8]>, e: &BytesStart<'_>, tag: &str, scan: &mut PageScan) {
    match tag {
        "img" => {
            let Some((x, y)) = style_anchor(reader, e) else {
                return;
            };
            let Some(src) = attr_value(reader, e, b"src") else {
                return;
            };
            if !src.is_empty() {
                scan.images.push(ImageAnchor { x, y, src });
            }
        }
        "hr" => {
            if let Some((x, y)) = style_anchor(reader, e) {
                scan.rules.push(RuleAnchor { x, y });
            }
        }
        _ => {}
    }
}

fn local_tag(reader: &Reader<&[u8]>, raw: &[u8]) -> String {
    let decoded = reader.decoder().decode(raw).unwrap_or_default();
    let local = decoded.rsplit(':').next().unwrap_or(decoded.as_ref());
    local.to_ascii_lowercase()
}

fn attr_value(reader: &Reader<&[u8]>, e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref().eq_ignore_ascii_case(name) {
            return reader
                .decoder()
                .decode(&attr.value)
                .ok()
                .map(|value| value.into_owned());
        }
    }
    None
}

fn has_class(reader: &Reader<&[u8]>, e: &BytesStart<'_>, class: &str) -> bool {
    attr_value(reader, e, b"class")
        .map(|value| value.split_whitespace().any(|item| item == class))
        .unwrap_or(false)
}

fn style_anchor(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Option<(i32, i32)> {
    parse_anchor(&attr_value(reader, e, b"style")?)
}

/// Extract the first parenthesized integer pair from an inline style.
///
/// `"position: absolute; transform: translate(662, 9212);"` yields
/// `(662, 9212)`. Anything without such a pair yields `None`.
pub(crate) fn parse_anchor(style: &str) -> Option<(i32, i32)> {
    let open = style.find('(')?;
    let close = open + style[open..].find(')')?;
    let inner = &style[open + 1..close];
    let mut parts = inner.split(',');
    let x = leading_int(parts.next()?)?;
    let y = leading_int(parts.next()?)?;
    Some((x, y))
}

fn leading_int(text: &str) -> Option<i32> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let start = usize::from(bytes.first() == Some(&b'-'));
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == start {
        return None;
    }
    text[..end].parse().ok()
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}
