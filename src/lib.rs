//! Draw-call interception and markdown reconstruction for canvas-only web
//! readers.
//!
//! Some reading applications paint chapter text straight onto a canvas, so
//! the page holds no selectable text to extract. This crate rebuilds the
//! document from the drawing itself: wrap the host's drawing context in a
//! [`SurfaceInterceptor`], let the host render as usual, and poll the
//! session for a growing markdown rendition: headings, paragraphs,
//! highlight and superscript spans, fenced code blocks, image embeds, and
//! horizontal rules.
//!
//! The heuristics are tuned to one host renderer's drawing conventions (see
//! [`Heuristics`]); this is not general-purpose canvas OCR, and the output
//! is a semantic approximation rather than a pixel-accurate transcript.
//!
//! ```
//! use canvas_scribe::{DrawSurface, Heuristics, NullSurface, SnapshotPage, SurfaceInterceptor};
//!
//! let page = SnapshotPage::new(r#"<div class="passage-content"></div>"#);
//! let mut surface =
//!     SurfaceInterceptor::acquire(NullSurface::new(), page, Heuristics::default());
//!
//! // The host renderer draws through the wrapped surface as usual.
//! surface.set_font("30px PingFang");
//! surface.fill_text("Hello", 10.0, 5.0);
//! surface.fill_text("World", 10.0, 500.0);
//!
//! assert!(surface.markdown().ends_with("Hello\n\n## World"));
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod engine;
mod intercept;
mod markdown;
mod metadata;
mod scan;
mod session;
mod surface;

pub use engine::{Heuristics, ReconstructionEngine, ReconstructionState};
pub use intercept::SurfaceInterceptor;
pub use markdown::{merge_chapters, normalize_chapter, rewrite_image_sources};
pub use metadata::{embedded_state_json, BookInfo, ChapterAnchor, ChapterInfo, MetadataError};
pub use scan::{CodeAnchor, ImageAnchor, PageScan, RuleAnchor};
pub use session::{HostPage, RescanTicket, Session, SnapshotPage};
pub use surface::{DrawSurface, NullSurface};
