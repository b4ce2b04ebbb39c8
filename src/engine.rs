//! Document reconstruction engine.
//!
//! Consumes the stream of observed draw calls plus the positioned-element
//! scan and grows a markdown rendition of the chapter. The whole machine is
//! keyed off two signals: style-property writes (font specification and fill
//! color) that set dirty flags, and the vertical delta between consecutive
//! text baselines that marks line breaks. Classification happens per text
//! draw, synchronously, in host call order.
//!
//! Nothing in the draw path returns an error: a draw call that cannot be
//! classified is appended as plain text, and a missing anchor simply never
//! matches. The engine must never take the host page down with it.

use serde::{Deserialize, Serialize};

use crate::scan::{ImageAnchor, PageScan};

/// Classification thresholds and host-specific markers.
///
/// Every value is empirical, tuned against one host renderer's layout; they
/// are carried as configuration rather than re-derived. The defaults are the
/// tuned values. Deserialization fills missing fields from the defaults so
/// embedders can ship partial profiles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    /// Minimum baseline advance treated as a line break.
    pub line_break_dy: f64,
    /// Baseline advance at which a body line break becomes a paragraph break.
    pub paragraph_gap_dy: f64,
    /// Previous-baseline x below which a body line break becomes a paragraph
    /// break (a short previous line means the paragraph ended there).
    pub indent_margin_x: f64,
    /// Font size at or below which a size change enters a superscript span.
    pub sup_max_px: f32,
    /// Minimum font size handled by the body-text branch of the classifier.
    pub body_min_px: f32,
    /// Minimum font size classified as a level-3 heading.
    pub h3_min_px: f32,
    /// Minimum font size classified as a level-2 heading.
    pub h2_min_px: f32,
    /// The host's default body text color; any other fill color on body text
    /// opens a highlight span.
    pub body_color: String,
    /// Prefix of the host's layout-measurement probe strings, which are drawn
    /// but are not content.
    pub probe_prefix: String,
    /// Vertical window below the last baseline checked for trailing anchors
    /// when a render pass ends.
    pub trailing_window_dy: f64,
    /// Delay before the deferred post-restore image rescan.
    pub rescan_delay_ms: u64,
    /// Class of the content container holding positioned elements.
    pub container_class: String,
    /// Class of the chapter-title element.
    pub title_class: String,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            line_break_dy: 10.0,
            paragraph_gap_dy: 55.0,
            indent_margin_x: 750.0,
            sup_max_px: 18.0,
            body_min_px: 18.0,
            h3_min_px: 23.0,
            h2_min_px: 27.0,
            body_color: "rgb(208, 211, 216)".to_string(),
            probe_prefix: "abcdefghijklmn".to_string(),
            trailing_window_dy: 200.0,
            rescan_delay_ms: 1000,
            container_class: "passage-content".to_string(),
            title_class: "chapterTitle".to_string(),
        }
    }
}

impl Heuristics {
    /// Load a profile from JSON, falling back to defaults for absent fields.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Mutable reconstruction state for the current session.
///
/// Exposed read-only for external polling; every mutation goes through the
/// engine. `markdown` is append-only except for one controlled retraction:
/// a highlight span that closes while the buffer still ends on its opening
/// delimiter takes that delimiter back out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconstructionState {
    /// Markdown produced so far.
    pub markdown: String,
    /// Baseline of the previous text draw.
    pub last_pos: (f64, f64),
    /// Most recently assigned font size in px (0 when none parsed yet).
    pub font_size: f32,
    /// Most recently assigned fill color.
    pub font_color: String,
    /// Font size changed since a superscript transition last consumed it.
    pub font_size_changed: bool,
    /// Fill color changed since the classifier last consumed it.
    pub font_color_changed: bool,
    /// Currently emitting a heading line.
    pub title_mode: bool,
    /// Buffer currently ends inside a highlight span opened by this engine.
    pub highlight_mode: bool,
    /// Currently inside a superscript span.
    pub sup_mode: bool,
    /// A render pass has completed since the last reset.
    pub complete: bool,
}

/// Per-draw-call reconstruction state machine.
#[derive(Clone, Debug)]
pub struct ReconstructionEngine {
    cfg: Heuristics,
    scan: PageScan,
    state: ReconstructionState,
}

impl ReconstructionEngine {
    /// Create an engine primed with a positioned-element snapshot.
    pub fn new(cfg: Heuristics, scan: PageScan) -> Self {
        Self {
            cfg,
            scan,
            state: ReconstructionState::default(),
        }
    }

    /// Markdown produced so far.
    pub fn markdown(&self) -> &str {
        &self.state.markdown
    }

    /// Read-only view of the reconstruction state.
    pub fn state(&self) -> &ReconstructionState {
        &self.state
    }

    /// Active heuristics.
    pub fn heuristics(&self) -> &Heuristics {
        &self.cfg
    }

    /// Current positioned-element snapshot.
    pub fn scan(&self) -> &PageScan {
        &self.scan
    }

    /// Whether a render pass has completed since the last reset.
    pub fn is_complete(&self) -> bool {
        self.state.complete
    }

    /// Number of image anchors currently accounted for.
    pub fn known_image_count(&self) -> usize {
        self.scan.images.len()
    }

    /// Replace the positioned-element snapshot (never merged).
    pub fn replace_scan(&mut self, scan: PageScan) {
        self.scan = scan;
    }

    /// Reset all reconstruction state, discarding the element snapshot.
    ///
    /// Issued when the host clears the surface for a new page or chapter.
    pub fn reset(&mut self) {
        self.scan = PageScan::default();
        self.state = ReconstructionState::default();
    }

    /// Observe a text draw at baseline `(x, y)`.
    pub fn observe_text(&mut self, text: &str, x: f64, y: f64) {
        if self.state.markdown.is_empty() {
            if let Some(title) = self.scan.chapter_title.as_deref() {
                self.state.markdown = format!("## {title}\n\n");
            }
        }
        if text.starts_with(self.cfg.probe_prefix.as_str()) {
            return;
        }

        if self.state.font_size_changed && self.state.font_size <= self.cfg.sup_max_px {
            log::debug!("entering superscript at {}px", self.state.font_size);
            if self.state.highlight_mode {
                // Park the highlight span; it reopens when the superscript ends.
                self.state.markdown.push('`');
            }
            self.state.markdown.push_str("<sup>");
            self.state.sup_mode = true;
            self.state.font_size_changed = false;
            self.state.font_color_changed = false;
        } else if self.state.font_size_changed && self.state.sup_mode {
            self.state.markdown.push_str("</sup>");
            if self.state.highlight_mode {
                self.state.markdown.push('`');
            }
            self.state.sup_mode = false;
            self.state.font_size_changed = false;
            self.state.font_color_changed = false;
        } else if y > self.state.last_pos.1 + self.cfg.line_break_dy {
            self.classify_line(y);
        } else if !self.state.title_mode && self.state.font_color_changed {
            self.state.markdown.push('`');
            self.state.highlight_mode = !self.state.highlight_mode;
            self.state.font_color_changed = false;
        }

        self.state.markdown.push_str(text);
        self.state.last_pos = (x, y);
    }

    /// Classify a detected line break ending at baseline `y`.
    fn classify_line(&mut self, y: f64) {
        let (prev_x, prev_y) = self.state.last_pos;
        self.check_anchors(prev_y, y);
        log::debug!(
            "line break dy={:.0} font={}px color={}",
            y - prev_y,
            self.state.font_size,
            self.state.font_color
        );

        if self.state.font_size >= self.cfg.h2_min_px {
            self.ensure_highlight_closed();
            self.state.markdown.push_str("\n\n## ");
            self.state.title_mode = true;
        } else if self.state.font_size >= self.cfg.h3_min_px {
            self.ensure_highlight_closed();
            self.state.markdown.push_str("\n\n### ");
            self.state.title_mode = true;
        } else if self.state.font_size >= self.cfg.body_min_px {
            if y - prev_y >= self.cfg.paragraph_gap_dy || prev_x < self.cfg.indent_margin_x {
                self.ensure_highlight_closed();
                self.state.markdown.push_str("\n\n");
                if self.state.font_color != self.cfg.body_color {
                    self.state.markdown.push('`');
                    self.state.highlight_mode = true;
                }
                self.state.font_color_changed = false;
            } else if self.state.font_color_changed {
                self.state.markdown.push('`');
                self.state.highlight_mode = !self.state.highlight_mode;
                self.state.font_color_changed = false;
            } else {
                self.state.markdown.push('\n');
            }
            self.state.title_mode = false;
        }
        // Below body_min_px nothing happens here; the superscript branches
        // already own that range.
    }

    /// Splice block markup for anchors between two baselines.
    ///
    /// Each kind is checked independently and only its first match in the
    /// band is emitted; bands advance monotonically with the text, so later
    /// breaks pick up later anchors.
    fn check_anchors(&mut self, start_y: f64, end_y: f64) {
        let in_band = |anchor_y: i32| {
            let anchor_y = f64::from(anchor_y);
            anchor_y > start_y && anchor_y < end_y
        };

        let code = self
            .scan
            .code_blocks
            .iter()
            .find(|anchor| in_band(anchor.y))
            .map(|anchor| anchor.text.clone());
        if let Some(text) = code {
            self.ensure_highlight_closed();
            self.state.markdown.push_str("\n\n```\n");
            self.state.markdown.push_str(&text);
            self.state.markdown.push_str("\n```");
        }

        let image = self
            .scan
            .images
            .iter()
            .find(|anchor| in_band(anchor.y))
            .map(|anchor| anchor.src.clone());
        if let Some(src) = image {
            self.ensure_highlight_closed();
            self.state.markdown.push_str("\n\n![](");
            self.state.markdown.push_str(&src);
            self.state.markdown.push_str(")\n");
        }

        if self.scan.rules.iter().any(|anchor| in_band(anchor.y)) {
            self.ensure_highlight_closed();
            self.state.markdown.push_str("\n\n------\n");
        }
    }

    /// Close an open highlight span, idempotently.
    ///
    /// A span that would close immediately after opening leaves a dangling
    /// delimiter as the buffer's last character; retract it instead of
    /// doubling it.
    pub fn ensure_highlight_closed(&mut self) {
        if !self.state.highlight_mode {
            return;
        }
        if self.state.markdown.ends_with('`') {
            self.state.markdown.pop();
        } else {
            self.state.markdown.push('`');
        }
        self.state.highlight_mode = false;
    }

    /// Observe a font-specification property write.
    pub fn observe_font(&mut self, spec: &str) {
        let size = parse_px_token(spec).unwrap_or(0.0);
        if self.state.font_size != size {
            self.state.font_size_changed = true;
        }
        self.state.font_size = size;
    }

    /// Observe a fill-color property write.
    ///
    /// Heading text recolors freely, so color changes are not flagged while
    /// in title mode; the tracked color still updates.
    pub fn observe_fill_style(&mut self, color: &str) {
        if !self.state.title_mode && color != self.state.font_color {
            self.state.font_color_changed = true;
        }
        self.state.font_color.clear();
        self.state.font_color.push_str(color);
    }

    /// Finish a render pass: close any open span and pick up trailing anchors
    /// below the last text baseline.
    pub fn finish_pass(&mut self) {
        self.ensure_highlight_closed();
        let last_y = self.state.last_pos.1;
        self.check_anchors(last_y, last_y + self.cfg.trailing_window_dy);
        self.state.complete = true;
    }

    /// Append image embeds for rescanned images beyond the first `known`.
    ///
    /// Absorbed anchors are recorded so a repeated rescan cannot re-append
    /// them.
    pub fn absorb_images(&mut self, discovered: &[ImageAnchor], known: usize) {
        if discovered.len() <= known {
            return;
        }
        log::debug!("image rescan found {} new images", discovered.len() - known);
        for anchor in &discovered[known..] {
            self.state.markdown.push_str("\n\n![](");
            self.state.markdown.push_str(&anchor.src);
            self.state.markdown.push_str(")\n");
            self.scan.images.push(anchor.clone());
        }
    }

    /// Insert a paragraph separator between paginated render passes.
    ///
    /// Drivers that page through a chapter call this before triggering the
    /// next page so its first line does not run into the previous one.
    pub fn append_page_break(&mut self) {
        self.state.markdown.push_str("\n\n");
    }

    /// Emit an embed for every scanned image.
    ///
    /// Fallback for image-only chapters, where a completed pass leaves the
    /// buffer empty because nothing was drawn as text.
    pub fn fallback_images(&mut self) {
        for anchor in &self.scan.images {
            self.state.markdown.push_str("![](");
            self.state.markdown.push_str(&anchor.src);
            self.state.markdown.push_str(")\n");
        }
    }
}

/// Parse the pixel-size token out of a font specification string.
///
/// The first whitespace-separated token ending in `px` wins; a spec without
/// one yields `None`.
fn parse_px_token(spec: &str) -> Option<f32> {
    spec.split_whitespace()
        .find_map(|token| token.strip_suffix("px").and_then(|n| n.parse::<f32>().ok()))
}
