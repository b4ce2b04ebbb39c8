//! Capability interface of the host's 2D drawing context.
//!
//! The host reader paints every piece of chapter content through a small
//! subset of the canvas 2D API. [`DrawSurface`] names exactly that subset so
//! the interceptor can wrap a real context as a plain decorator instead of a
//! dynamic proxy: anything that can draw implements the trait, and anything
//! that wants to observe drawing wraps another implementation.

/// Drawing operations and style properties the host renderer uses.
///
/// Method names follow the canvas 2D vocabulary (`fillText` → [`fill_text`],
/// the `font`/`fillStyle` property writes → [`set_font`]/[`set_fill_style`]).
/// Coordinates are canvas-space; `fill_text` receives the baseline position.
///
/// [`fill_text`]: DrawSurface::fill_text
/// [`set_font`]: DrawSurface::set_font
/// [`set_fill_style`]: DrawSurface::set_fill_style
pub trait DrawSurface {
    /// Draw `text` with its baseline starting at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64);
    /// Draw an image resource into the rectangle at `(dx, dy)`.
    fn draw_image(&mut self, src: &str, dx: f64, dy: f64, width: f64, height: f64);
    /// Fill a rectangle.
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    /// Clear a rectangle. The host issues this when it starts a new page.
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    /// Push the current drawing state.
    fn save(&mut self);
    /// Pop the drawing state. The host issues this at the end of a render pass.
    fn restore(&mut self);
    /// Assign the font specification string (e.g. `"italic 22px PingFang"`).
    fn set_font(&mut self, spec: &str);
    /// Assign the fill color string (e.g. `"rgb(208, 211, 216)"`).
    fn set_fill_style(&mut self, color: &str);
    /// Current font specification string.
    fn font(&self) -> &str;
    /// Current fill color string.
    fn fill_style(&self) -> &str;
}

/// Surface that swallows every call.
///
/// Useful when reconstruction is wanted without a visible canvas behind it,
/// and as the inner surface in tests. Style property writes are retained so
/// reads stay faithful to the canvas property contract.
#[derive(Clone, Debug, Default)]
pub struct NullSurface {
    font: String,
    fill_style: String,
}

impl NullSurface {
    /// Create a surface with empty style properties.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DrawSurface for NullSurface {
    fn fill_text(&mut self, _text: &str, _x: f64, _y: f64) {}

    fn draw_image(&mut self, _src: &str, _dx: f64, _dy: f64, _width: f64, _height: f64) {}

    fn fill_rect(&mut self, _x: f64, _y: f64, _width: f64, _height: f64) {}

    fn clear_rect(&mut self, _x: f64, _y: f64, _width: f64, _height: f64) {}

    fn save(&mut self) {}

    fn restore(&mut self) {}

    fn set_font(&mut self, spec: &str) {
        self.font.clear();
        self.font.push_str(spec);
    }

    fn set_fill_style(&mut self, color: &str) {
        self.fill_style.clear();
        self.fill_style.push_str(color);
    }

    fn font(&self) -> &str {
        &self.font
    }

    fn fill_style(&self) -> &str {
        &self.fill_style
    }
}
