//! Post-processing for reconstructed chapter markdown.
//!
//! The engine emits one piece of text per drawn line, separated by single
//! newlines, with blank lines only at real paragraph breaks. Before export
//! the soft line breaks get joined back into paragraphs (the host text is
//! CJK; lines carry no inter-word spaces to preserve), fenced code blocks
//! keep their interior lines, and remote image sources can be rewritten to
//! wherever the embedder mirrors them.

/// Join drawn lines into paragraphs, fence-aware.
///
/// Rules, applied per input line:
/// - a bare fence delimiter is isolated (a blank line is forced before an
///   opener) and toggles fence mode;
/// - inside a fence, lines pass through verbatim;
/// - a blank line marks a paragraph break, emitted before the next content
///   line;
/// - any other consecutive lines are joined with no separator.
///
/// Output always ends with a single newline.
pub fn normalize_chapter(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_fence = false;
    let mut pending_break = false;
    for line in text.split('\n') {
        if line == "```" {
            if in_fence {
                out.push_str("```\n");
            } else {
                out.push_str("\n```\n");
            }
            in_fence = !in_fence;
        } else if in_fence {
            out.push_str(line);
            out.push('\n');
        } else if line.is_empty() {
            pending_break = true;
        } else if pending_break {
            out.push_str("\n\n");
            out.push_str(line);
            pending_break = false;
        } else {
            out.push_str(line);
        }
    }
    out.push('\n');
    out
}

/// Concatenate chapter markdown in reading order, one newline after each.
pub fn merge_chapters<'a, I>(chapters: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for chapter in chapters {
        out.push_str(chapter);
        out.push('\n');
    }
    out
}

/// Rewrite every `![](...)` image target through `rewrite`.
///
/// The callback returns the replacement target, or `None` to keep the
/// original. No fetching happens here; mirroring policy belongs to the
/// embedder.
pub fn rewrite_image_sources<F>(text: &str, mut rewrite: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("![](") {
        let target_start = pos + 4;
        let Some(len) = rest[target_start..].find(')') else {
            break;
        };
        out.push_str(&rest[..target_start]);
        let target = &rest[target_start..target_start + len];
        match rewrite(target) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(target),
        }
        out.push(')');
        rest = &rest[target_start + len + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_soft_line_breaks() {
        assert_eq!(normalize_chapter("第一行\n第二行\n第三行"), "第一行第二行第三行\n");
    }

    #[test]
    fn blank_line_becomes_paragraph_break() {
        assert_eq!(normalize_chapter("one\n\ntwo\nmore"), "one\n\ntwomore\n");
    }

    #[test]
    fn fenced_lines_pass_through_verbatim() {
        let input = "intro\n\n```\nlet a = 1;\nlet b = 2;\n```\noutro";
        assert_eq!(
            normalize_chapter(input),
            "intro\n```\nlet a = 1;\nlet b = 2;\n```\n\n\noutro\n"
        );
    }

    #[test]
    fn merge_appends_newline_per_chapter() {
        assert_eq!(merge_chapters(["## A\n\ntext", "## B"]), "## A\n\ntext\n## B\n");
    }

    #[test]
    fn rewrites_only_mapped_targets() {
        let text = "a\n\n![](https://host/a.jpg)\n\n![](keep.jpg)\n";
        let out = rewrite_image_sources(text, |target| {
            target
                .starts_with("https://")
                .then(|| "images/a.jpg".to_string())
        });
        assert_eq!(out, "a\n\n![](images/a.jpg)\n\n![](keep.jpg)\n");
    }

    #[test]
    fn unterminated_target_is_left_alone() {
        let text = "broken ![](https://host/a.jpg";
        let out = rewrite_image_sources(text, |_| Some("x".to_string()));
        assert_eq!(out, text);
    }
}
