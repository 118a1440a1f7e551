//! Canvas model: placed glyphs, structural mutations, and the persistence codec.
//!
//! This module defines the pure value types that describe what is on a
//! document's canvas (`Glyph`, `Canvas`) independent of any view transform.
//! Glyph insertion order is display z-order (later entries draw on top) and
//! is preserved by the codec. Mutations flow in exclusively through the
//! document engine; renderers only read.
//!
//! Decoding never fails: malformed or absent bytes produce an empty canvas so
//! a document can always be opened.

#[cfg(test)]
#[path = "canvas_test.rs"]
mod canvas_test;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::consts::MIN_GLYPH_SIZE;

/// Identifier of a glyph, unique within its canvas.
///
/// Ids are assigned as max-existing-id + 1 (0 for an empty canvas) and are
/// never reassigned while their glyph lives. Deleting every glyph restarts
/// the sequence at 0.
pub type GlyphId = i64;

/// Errors from canvas mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanvasError {
    /// Input rejected at the call boundary; no state was touched.
    #[error("invalid glyph input: {0}")]
    InvalidInput(&'static str),
    /// The referenced glyph does not exist; no partial mutation occurred.
    #[error("glyph not found: {0}")]
    NotFound(GlyphId),
}

/// One placed symbol on the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glyph {
    /// Unique within the owning canvas.
    pub id: GlyphId,
    /// The displayed text, one emoji in practice but any non-empty string.
    pub symbol: String,
    /// Canvas-space x, origin at the canvas center.
    pub x: i64,
    /// Canvas-space y, origin at the canvas center.
    pub y: i64,
    /// Base rendering size before zoom, always >= 1.
    pub size: i64,
}

/// The document's drawable content: a background reference plus an ordered
/// glyph collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    background_reference: Option<String>,
    glyphs: Vec<Glyph>,
}

impl Canvas {
    /// Create an empty canvas with no background.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Mutations ---

    /// Place a new glyph on top of the canvas and return its id.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `symbol` is empty or `size` is not positive.
    pub fn add_glyph(&mut self, symbol: &str, x: i64, y: i64, size: i64) -> Result<GlyphId, CanvasError> {
        if symbol.is_empty() {
            return Err(CanvasError::InvalidInput("symbol must not be empty"));
        }
        if size <= 0 {
            return Err(CanvasError::InvalidInput("size must be positive"));
        }
        let id = self.next_id();
        self.glyphs.push(Glyph { id, symbol: symbol.to_owned(), x, y, size });
        Ok(id)
    }

    /// Remove a glyph by id, returning it if it was present. Removing an
    /// absent id is a no-op, not an error.
    pub fn delete_glyph(&mut self, id: GlyphId) -> Option<Glyph> {
        let index = self.glyphs.iter().position(|g| g.id == id)?;
        Some(self.glyphs.remove(index))
    }

    /// Translate a glyph by integer canvas-space deltas.
    ///
    /// # Errors
    ///
    /// `NotFound` if no glyph has this id.
    pub fn move_glyph(&mut self, id: GlyphId, dx: i64, dy: i64) -> Result<(), CanvasError> {
        let glyph = self.glyph_mut(id)?;
        glyph.x += dx;
        glyph.y += dy;
        Ok(())
    }

    /// Scale a glyph's base size by `factor`, rounding half to even and
    /// clamping to the minimum size.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `factor` is not a positive finite number;
    /// `NotFound` if no glyph has this id.
    pub fn resize_glyph(&mut self, id: GlyphId, factor: f64) -> Result<(), CanvasError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(CanvasError::InvalidInput("scale factor must be positive"));
        }
        let glyph = self.glyph_mut(id)?;
        let scaled = (glyph.size as f64 * factor).round_ties_even() as i64;
        glyph.size = scaled.max(MIN_GLYPH_SIZE);
        Ok(())
    }

    /// Replace the background reference unconditionally, including clearing it.
    pub fn set_background(&mut self, reference: Option<String>) {
        self.background_reference = reference;
    }

    // --- Queries ---

    /// All glyphs in z-order, bottom to top.
    #[must_use]
    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    /// Look up a glyph by id.
    #[must_use]
    pub fn glyph(&self, id: GlyphId) -> Option<&Glyph> {
        self.glyphs.iter().find(|g| g.id == id)
    }

    /// The current background reference, if any.
    #[must_use]
    pub fn background_reference(&self) -> Option<&str> {
        self.background_reference.as_deref()
    }

    /// Number of placed glyphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Returns `true` if no glyph is placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    // --- Codec ---

    /// Serialize the canvas for persistence.
    ///
    /// Serialization of a reachable canvas cannot fail; should it ever, the
    /// error is logged and empty bytes (which decode to an empty canvas) are
    /// returned rather than propagating.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match serde_json::to_vec(self) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "canvas encode failed");
                Vec::new()
            }
        }
    }

    /// Reconstruct a canvas from persisted bytes.
    ///
    /// Malformed bytes, missing fields, or content violating the model
    /// invariants (duplicate ids, empty symbols, non-positive sizes) all
    /// yield an empty canvas. A document never fails to open.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Self>(bytes) {
            Ok(canvas) if canvas.invariants_hold() => canvas,
            Ok(_) => {
                tracing::warn!("persisted canvas violates model invariants; starting empty");
                Self::default()
            }
            Err(e) => {
                tracing::debug!(error = %e, "persisted canvas unreadable; starting empty");
                Self::default()
            }
        }
    }

    fn next_id(&self) -> GlyphId {
        self.glyphs.iter().map(|g| g.id).max().map_or(0, |max| max + 1)
    }

    fn glyph_mut(&mut self, id: GlyphId) -> Result<&mut Glyph, CanvasError> {
        self.glyphs
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(CanvasError::NotFound(id))
    }

    fn invariants_hold(&self) -> bool {
        let mut seen = HashSet::new();
        self.glyphs
            .iter()
            .all(|g| !g.symbol.is_empty() && g.size >= MIN_GLYPH_SIZE && seen.insert(g.id))
    }
}
