//! Shared constants for the document engine.

/// Base size assigned to a glyph dropped onto the canvas.
pub const DEFAULT_GLYPH_SIZE: i64 = 40;

/// Smallest size a glyph can shrink to; resize clamps here.
pub const MIN_GLYPH_SIZE: i64 = 1;

/// Default emoji palette offered for dragging onto a document.
pub const DEFAULT_PALETTE: &str = "😄😆😅😂😍";

/// Capacity of each subscriber's change-notification channel.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;
