//! Gesture composition: pan/zoom math and canvas/view coordinate mapping.
//!
//! Everything here is a pure function over `Copy` value types. Nothing
//! mutates a document and nothing holds state, so these are safe to call
//! from any thread at any time. The document engine owns the committed
//! (steady) pan/zoom; the host view layer owns the in-progress gesture
//! values; this module combines the two into the effective transform and
//! inverts it for hit-testing and drops.
//!
//! Canvas space has its origin at the viewport center, so mapping to view
//! space is: scale by zoom, translate by half the viewport, translate by
//! pan * zoom, then (for a glyph under an active drag) add the live,
//! unscaled drag delta.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::canvas::Glyph;
use crate::input::LiveGesture;

/// A point in canvas or view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Truncate to integer canvas coordinates (toward zero), the form
    /// `Canvas::add_glyph` takes.
    #[must_use]
    pub fn canvas_coords(self) -> (i64, i64) {
        (self.x as i64, self.y as i64)
    }
}

/// A translation in canvas or view space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of a viewport or image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// The effective zoom while a magnification gesture is live.
#[must_use]
pub fn combined_zoom(steady: f64, live: f64) -> f64 {
    steady * live
}

/// The effective pan while a drag gesture is live. The live delta arrives in
/// view-space pixels and is stored unscaled, so it is divided by the
/// effective zoom before combining.
#[must_use]
pub fn combined_pan(steady: Offset, live_delta: Offset, zoom: f64) -> Offset {
    Offset::new(steady.x + live_delta.x / zoom, steady.y + live_delta.y / zoom)
}

/// The effective view transform: committed state combined with any live
/// gesture values.
///
/// `pan` is unscaled canvas-space translation; the view-space translation it
/// produces is `pan * zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pan: Offset,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan: Offset::ZERO, zoom: 1.0 }
    }
}

impl Camera {
    /// Combine committed pan/zoom with live gesture values into the
    /// effective camera for this frame.
    #[must_use]
    pub fn composed(steady_pan: Offset, steady_zoom: f64, live: &LiveGesture) -> Self {
        let zoom = combined_zoom(steady_zoom, live.magnification);
        Self { pan: combined_pan(steady_pan, live.pan_delta, zoom), zoom }
    }

    /// Map a canvas-space point to view space.
    #[must_use]
    pub fn canvas_to_view(&self, canvas_pt: Point, viewport: Size) -> Point {
        Point {
            x: canvas_pt.x * self.zoom + viewport.width / 2.0 + self.pan.x * self.zoom,
            y: canvas_pt.y * self.zoom + viewport.height / 2.0 + self.pan.y * self.zoom,
        }
    }

    /// Map a view-space point (a tap or drop location) back to canvas space.
    /// Exact inverse of [`Camera::canvas_to_view`] for `zoom > 0`.
    #[must_use]
    pub fn view_to_canvas(&self, view_pt: Point, viewport: Size) -> Point {
        Point {
            x: (view_pt.x - viewport.width / 2.0 - self.pan.x * self.zoom) / self.zoom,
            y: (view_pt.y - viewport.height / 2.0 - self.pan.y * self.zoom) / self.zoom,
        }
    }
}

/// View-space position of a glyph. While the glyph participates in an active
/// drag, the live delta is added unscaled on top of the camera transform.
#[must_use]
pub fn glyph_view_position(glyph: &Glyph, viewport: Size, camera: Camera, dragging: bool, drag_delta: Offset) -> Point {
    let mut pt = camera.canvas_to_view(Point::new(glyph.x as f64, glyph.y as f64), viewport);
    if dragging {
        pt.x += drag_delta.x;
        pt.y += drag_delta.y;
    }
    pt
}

/// Rendered size of a glyph: base size scaled by the effective zoom, and by
/// the live pinch magnification when the glyph is selected. Visual only; the
/// engine commits the magnification into the model at gesture end.
#[must_use]
pub fn glyph_render_size(glyph: &Glyph, camera: Camera, selected: bool, glyph_magnification: f64) -> f64 {
    let pinch = if selected { glyph_magnification } else { 1.0 };
    glyph.size as f64 * camera.zoom * pinch
}

/// Zoom factor that fits an image inside a viewport: the smaller of the two
/// axis ratios. `None` when any dimension is non-positive, in which case the
/// caller keeps its previous zoom.
#[must_use]
pub fn fit_zoom(image: Size, viewport: Size) -> Option<f64> {
    if image.width <= 0.0 || image.height <= 0.0 || viewport.width <= 0.0 || viewport.height <= 0.0 {
        return None;
    }
    Some((viewport.width / image.width).min(viewport.height / image.height))
}
