//! Document state engine for an emoji canvas editor.
//!
//! A document is a background image reference plus an ordered collection of
//! placed, scalable, movable emoji glyphs. This crate owns everything between
//! the gesture layer and the renderer: the mutable document model, selection
//! and transient drag focus, committed pan/zoom, the asynchronous background
//! image fetch (last request wins), change notifications, and best-effort
//! autosave. A multi-document store keyed by stable ids persists one blob per
//! document in a directory and survives restarts.
//!
//! Rendering, gesture recognition, and dialog presentation are the host's
//! job: the host feeds numeric gesture deltas and drop payloads in, and reads
//! back snapshots when notified.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`canvas`] | Glyph and canvas model with the persistence codec |
//! | [`document`] | Document engine: intents, selection, fetch pipeline, autosave |
//! | [`store`] | Directory-backed multi-document store |
//! | [`camera`] | Pan/zoom composition and canvas/view coordinate mapping |
//! | [`fetch`] | Background image fetch capability and decoding |
//! | [`input`] | Live gesture values and drop payload resolution |
//! | [`consts`] | Shared constants (default glyph size, palette, capacities) |

pub mod camera;
pub mod canvas;
pub mod consts;
pub mod document;
pub mod fetch;
pub mod input;
pub mod store;
