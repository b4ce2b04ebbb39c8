//! Transparent draw-call interception.
//!
//! [`SurfaceInterceptor`] decorates a real [`DrawSurface`]: every call and
//! property write is routed to the reconstruction session first and then
//! forwarded to the wrapped surface with the original arguments, so the
//! visible canvas output is untouched. From the host renderer's point of view
//! the wrapped surface behaves identically to the bare one.

use crate::session::{HostPage, Session};
use crate::surface::DrawSurface;
use crate::Heuristics;

/// Decorator that feeds a reconstruction [`Session`] from a drawing surface.
///
/// Constructing one is "surface acquisition": the session scans the host page
/// and primes the engine with a fresh positioned-element snapshot.
#[derive(Debug)]
pub struct SurfaceInterceptor<S, H> {
    target: S,
    session: Session<H>,
}

impl<S: DrawSurface, H: HostPage> SurfaceInterceptor<S, H> {
    /// Wrap `target`, priming a new session from `host`.
    pub fn acquire(target: S, host: H, cfg: Heuristics) -> Self {
        Self {
            target,
            session: Session::acquire(host, cfg),
        }
    }

    /// Markdown reconstructed so far.
    pub fn markdown(&self) -> &str {
        self.session.markdown()
    }

    /// The active reconstruction session.
    pub fn session(&self) -> &Session<H> {
        &self.session
    }

    /// Mutable access to the active session (rescans, fallbacks).
    pub fn session_mut(&mut self) -> &mut Session<H> {
        &mut self.session
    }

    /// Re-scan the host page and replace the session's element snapshot.
    ///
    /// For embedders that keep one interceptor across a host-driven
    /// re-acquisition instead of constructing a new one.
    pub fn reprime(&mut self) {
        self.session.reprime();
    }

    /// Unwrap into the inner surface and the session.
    pub fn release(self) -> (S, Session<H>) {
        (self.target, self.session)
    }
}

impl<S: DrawSurface, H: HostPage> DrawSurface for SurfaceInterceptor<S, H> {
    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.session.observe_text(text, x, y);
        self.target.fill_text(text, x, y);
    }

    fn draw_image(&mut self, src: &str, dx: f64, dy: f64, width: f64, height: f64) {
        // Observed but not acted on; images come back via the element scan.
        log::trace!("draw_image {} at ({}, {})", src, dx, dy);
        self.target.draw_image(src, dx, dy, width, height);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        log::trace!("fill_rect ({}, {}) {}x{}", x, y, width, height);
        self.target.fill_rect(x, y, width, height);
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.session.reset();
        self.target.clear_rect(x, y, width, height);
    }

    fn save(&mut self) {
        log::trace!("save");
        self.target.save();
    }

    fn restore(&mut self) {
        self.session.observe_restore();
        self.target.restore();
    }

    fn set_font(&mut self, spec: &str) {
        self.session.observe_font(spec);
        self.target.set_font(spec);
    }

    fn set_fill_style(&mut self, color: &str) {
        self.session.observe_fill_style(color);
        self.target.set_fill_style(color);
    }

    fn font(&self) -> &str {
        log::trace!("read font");
        self.target.font()
    }

    fn fill_style(&self) -> &str {
        log::trace!("read fill_style");
        self.target.fill_style()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SnapshotPage;

    /// Records every forwarded call for transparency checks.
    #[derive(Debug, Default)]
    struct RecordingSurface {
        calls: Vec<String>,
        font: String,
        fill_style: String,
    }

    impl DrawSurface for RecordingSurface {
        fn fill_text(&mut self, text: &str, x: f64, y: f64) {
            self.calls.push(format!("fill_text({text},{x},{y})"));
        }

        fn draw_image(&mut self, src: &str, dx: f64, dy: f64, width: f64, height: f64) {
            self.calls
                .push(format!("draw_image({src},{dx},{dy},{width},{height})"));
        }

        fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
            self.calls.push(format!("fill_rect({x},{y},{width},{height})"));
        }

        fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
            self.calls.push(format!("clear_rect({x},{y},{width},{height})"));
        }

        fn save(&mut self) {
            self.calls.push("save".to_string());
        }

        fn restore(&mut self) {
            self.calls.push("restore".to_string());
        }

        fn set_font(&mut self, spec: &str) {
            self.font = spec.to_string();
            self.calls.push(format!("set_font({spec})"));
        }

        fn set_fill_style(&mut self, color: &str) {
            self.fill_style = color.to_string();
            self.calls.push(format!("set_fill_style({color})"));
        }

        fn font(&self) -> &str {
            &self.font
        }

        fn fill_style(&self) -> &str {
            &self.fill_style
        }
    }

    fn interceptor() -> SurfaceInterceptor<RecordingSurface, SnapshotPage> {
        SurfaceInterceptor::acquire(
            RecordingSurface::default(),
            SnapshotPage::new(""),
            Heuristics::default(),
        )
    }

    #[test]
    fn every_call_is_forwarded_with_original_arguments() {
        let mut surface = interceptor();
        surface.set_font("20px PingFang");
        surface.set_fill_style("rgb(208, 211, 216)");
        surface.fill_text("Hello", 100.0, 100.0);
        surface.draw_image("https://host/a.jpg", 1.0, 2.0, 3.0, 4.0);
        surface.save();
        surface.fill_rect(0.0, 0.0, 10.0, 10.0);
        surface.restore();
        surface.clear_rect(0.0, 0.0, 10.0, 10.0);
        let (inner, _) = surface.release();
        assert_eq!(
            inner.calls,
            vec![
                "set_font(20px PingFang)",
                "set_fill_style(rgb(208, 211, 216))",
                "fill_text(Hello,100,100)",
                "draw_image(https://host/a.jpg,1,2,3,4)",
                "save",
                "fill_rect(0,0,10,10)",
                "restore",
                "clear_rect(0,0,10,10)",
            ]
        );
    }

    #[test]
    fn probe_draws_are_forwarded_but_not_accumulated() {
        let mut surface = interceptor();
        surface.set_font("20px PingFang");
        surface.fill_text("abcdefghijklmn-probe", 0.0, 100.0);
        assert_eq!(surface.markdown(), "");
        let (inner, _) = surface.release();
        assert!(inner.calls.iter().any(|call| call.contains("probe")));
    }

    #[test]
    fn property_reads_come_from_the_wrapped_surface() {
        let mut surface = interceptor();
        surface.set_font("20px PingFang");
        surface.set_fill_style("red");
        assert_eq!(surface.font(), "20px PingFang");
        assert_eq!(surface.fill_style(), "red");
    }

    #[test]
    fn clear_rect_resets_the_session() {
        let mut surface = interceptor();
        surface.set_font("20px PingFang");
        surface.fill_text("Hello", 800.0, 100.0);
        assert!(!surface.markdown().is_empty());
        surface.clear_rect(0.0, 0.0, 1000.0, 1000.0);
        assert_eq!(surface.markdown(), "");
        assert_eq!(surface.session().engine().state().last_pos, (0.0, 0.0));
    }
}
