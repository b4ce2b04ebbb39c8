//! Session context: one acquired drawing surface, one reconstruction.
//!
//! The hook state lives in an explicit per-acquisition [`Session`] rather
//! than a shared singleton. A session owns the host-page collaborator, the
//! engine, and the deferred-rescan bookkeeping; resetting installs fresh
//! state and invalidates anything scheduled against the old one.

use crate::engine::{Heuristics, ReconstructionEngine};
use crate::scan::PageScan;

/// Read-only queries and side-effecting triggers on the surrounding document.
///
/// Everything the reconstruction needs from outside the canvas goes through
/// this seam: the serialized content-container markup (scanned for
/// positioned elements and the chapter title) and the scroll trigger the
/// engine fires at the end of a render pass to force lazy content to mount.
pub trait HostPage {
    /// Serialized markup snapshot of the host page content.
    fn container_html(&self) -> String;
    /// Scroll the page to the bottom so pending content mounts.
    fn scroll_to_bottom(&mut self);
}

/// [`HostPage`] backed by a fixed markup snapshot.
///
/// The snapshot can be swapped to model a page whose content mounts over
/// time; the scroll trigger is a no-op.
#[derive(Clone, Debug, Default)]
pub struct SnapshotPage {
    html: String,
}

impl SnapshotPage {
    /// Create a page from a markup snapshot.
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Replace the snapshot.
    pub fn set_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }
}

impl HostPage for SnapshotPage {
    fn container_html(&self) -> String {
        self.html.clone()
    }

    fn scroll_to_bottom(&mut self) {}
}

/// Armed deferred image rescan.
///
/// Stamped with the session generation that armed it; a reset bumps the
/// generation, so a stale ticket can never append into a newer session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RescanTicket {
    generation: u64,
    known_images: usize,
}

/// Reconstruction scoped to one drawing-surface acquisition.
#[derive(Debug)]
pub struct Session<H> {
    host: H,
    engine: ReconstructionEngine,
    generation: u64,
    pending: Option<RescanTicket>,
}

impl<H: HostPage> Session<H> {
    /// Start a session: scan the host page and prime the engine.
    pub fn acquire(host: H, cfg: Heuristics) -> Self {
        let scan = PageScan::from_html(&host.container_html(), &cfg);
        Self {
            host,
            engine: ReconstructionEngine::new(cfg, scan),
            generation: 0,
            pending: None,
        }
    }

    /// Markdown reconstructed so far.
    pub fn markdown(&self) -> &str {
        self.engine.markdown()
    }

    /// Whether a render pass has completed since the last reset.
    pub fn is_complete(&self) -> bool {
        self.engine.is_complete()
    }

    /// The reconstruction engine.
    pub fn engine(&self) -> &ReconstructionEngine {
        &self.engine
    }

    /// The host-page collaborator.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host-page collaborator.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The armed rescan ticket, if any.
    pub fn pending_rescan(&self) -> Option<RescanTicket> {
        self.pending
    }

    /// Re-scan the host page and replace the engine's element snapshot.
    pub fn reprime(&mut self) {
        let scan = PageScan::from_html(&self.host.container_html(), self.engine.heuristics());
        self.engine.replace_scan(scan);
    }

    /// Reset to a fresh session state.
    ///
    /// Cancels any armed rescan: the generation moves on and the ticket is
    /// dropped, so content mounted for the previous page cannot leak into
    /// the next one.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.pending = None;
        self.engine.reset();
    }

    pub(crate) fn observe_text(&mut self, text: &str, x: f64, y: f64) {
        self.engine.observe_text(text, x, y);
    }

    pub(crate) fn observe_font(&mut self, spec: &str) {
        self.engine.observe_font(spec);
    }

    pub(crate) fn observe_fill_style(&mut self, color: &str) {
        self.engine.observe_fill_style(color);
    }

    /// End-of-render-pass handling: scroll, finish the engine pass, and arm
    /// the deferred image rescan.
    pub(crate) fn observe_restore(&mut self) {
        self.host.scroll_to_bottom();
        self.engine.finish_pass();
        self.pending = Some(RescanTicket {
            generation: self.generation,
            known_images: self.engine.known_image_count(),
        });
    }

    /// Run the armed rescan now.
    ///
    /// Meant to be called after the host's own asynchronous content mounting
    /// has had time to finish. Appends embeds for images beyond those the
    /// session already accounted for. Does nothing without a ticket, and a
    /// ticket from before a reset never survives to here.
    pub fn run_pending_rescan(&mut self) {
        let Some(ticket) = self.pending.take() else {
            return;
        };
        if ticket.generation != self.generation {
            return;
        }
        let images =
            PageScan::images_from_html(&self.host.container_html(), self.engine.heuristics());
        self.engine.absorb_images(&images, ticket.known_images);
    }

    /// Insert a paragraph separator before the next paginated render pass.
    pub fn append_page_break(&mut self) {
        self.engine.append_page_break();
    }

    /// Emit an embed for every scanned image (image-only chapter fallback).
    pub fn fallback_images(&mut self) {
        self.engine.fallback_images();
    }

    /// Sleep the configured rescan delay, then run the armed rescan.
    ///
    /// Dropping or aborting the future cancels the rescan; so does a session
    /// reset that happens while sleeping.
    #[cfg(feature = "async")]
    pub async fn run_rescan_after_delay(&mut self) {
        let delay = core::time::Duration::from_millis(self.engine.heuristics().rescan_delay_ms);
        tokio::time::sleep(delay).await;
        self.run_pending_rescan();
    }
}
