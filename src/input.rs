//! Input model: live gesture values and drop payload resolution.
//!
//! `LiveGesture` carries the in-progress, not-yet-committed values the host's
//! gesture recognizers report continuously while a gesture is active. The
//! identity default describes the idle state; the renderer feeds the current
//! value into the [`crate::camera`] composition functions every frame and the
//! engine commits the final values at gesture end.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Offset;

/// In-progress gesture values, identity while idle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveGesture {
    /// Unscaled view-space translation of an active canvas pan.
    pub pan_delta: Offset,
    /// Magnification of an active whole-canvas pinch (1.0 = none).
    pub magnification: f64,
    /// Unscaled view-space translation of an active glyph drag.
    pub drag_delta: Offset,
    /// Magnification of an active pinch over the selection (1.0 = none).
    pub glyph_magnification: f64,
}

impl Default for LiveGesture {
    fn default() -> Self {
        Self {
            pan_delta: Offset::ZERO,
            magnification: 1.0,
            drag_delta: Offset::ZERO,
            glyph_magnification: 1.0,
        }
    }
}

/// What a drop or paste resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropPayload {
    /// A location reference; becomes the new background reference.
    Background(String),
    /// Plain text; becomes a new glyph's symbol at the drop point.
    Glyph(String),
}

/// Resolve a dropped/pasted payload by fixed priority: a location reference
/// wins, plain text applies only when no location is present.
#[must_use]
pub fn resolve_drop(location: Option<&str>, text: Option<&str>) -> Option<DropPayload> {
    if let Some(reference) = location {
        return Some(DropPayload::Background(reference.to_owned()));
    }
    text.map(|symbol| DropPayload::Glyph(symbol.to_owned()))
}
