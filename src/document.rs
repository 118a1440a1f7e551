//! Document engine: intents, selection state, fetch pipeline, autosave.
//!
//! `Document` is a cheap handle over state behind a `tokio::sync::RwLock`.
//! All user-facing intents are async methods on the handle; the host drives
//! them from a single logical event sequence, and the lock is the re-entry
//! point for the one genuinely concurrent operation, background image fetch:
//! its completion acquires the same lock as every other mutation, so applies
//! are serialized with user intents.
//!
//! The fetch pipeline is last-request-wins. Setting a background reference
//! clears the current image, aborts any in-flight fetch, and starts a new
//! one; a completion only applies if its reference still equals the canvas's
//! current reference. The abort is an optimization; the equality check at
//! apply time is the correctness backstop.
//!
//! Every committed canvas mutation re-encodes the canvas and writes it
//! through to the backing path. Autosave is best-effort and never blocks or
//! fails an intent; write errors are logged.

#[cfg(test)]
#[path = "document_test.rs"]
mod document_test;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::camera::{self, Offset, Size};
use crate::canvas::{Canvas, CanvasError, Glyph, GlyphId};
use crate::consts::{CHANGE_CHANNEL_CAPACITY, DEFAULT_PALETTE};
use crate::fetch::{BackgroundImage, ImageFetch, decode_image};

/// Identifies a change-notification subscription.
pub type SubscriberId = Uuid;

/// Dirty signal emitted after each committed mutation. Consumers re-read the
/// snapshot; the signal only says which facet moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentChange {
    /// Glyphs or background reference changed (and were autosaved).
    Canvas,
    /// Selection or drag focus changed.
    Selection,
    /// Committed pan or zoom changed.
    View,
    /// The decoded background image appeared, disappeared, or was replaced.
    Background,
}

/// Read-only view of the document for the renderer.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    /// Glyphs in z-order, bottom to top.
    pub glyphs: Vec<Glyph>,
    pub background_reference: Option<String>,
    /// Decoded image for the current reference, absent while loading/failed.
    pub background: Option<Arc<BackgroundImage>>,
    pub selected_ids: HashSet<GlyphId>,
    /// Transient single-glyph drag target, armed before any selection exists.
    pub focus_id: Option<GlyphId>,
    pub steady_pan: Offset,
    pub steady_zoom: f64,
}

struct DocumentState {
    canvas: Canvas,
    selected_ids: HashSet<GlyphId>,
    focus_id: Option<GlyphId>,
    steady_pan: Offset,
    steady_zoom: f64,
    background: Option<Arc<BackgroundImage>>,
    subscribers: HashMap<SubscriberId, mpsc::Sender<DocumentChange>>,
    backing: Option<PathBuf>,
    fetch_task: Option<JoinHandle<()>>,
}

impl DocumentState {
    fn notify(&mut self, change: DocumentChange) {
        self.subscribers.retain(|id, tx| match tx.try_send(change) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = %id, ?change, "change channel full; dropping notification");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    /// Fire-and-forget write-through of the canvas to the backing path.
    fn autosave(&self) {
        let Some(path) = self.backing.clone() else {
            return;
        };
        let bytes = self.canvas.encode();
        tokio::spawn(async move {
            if let Err(e) = tokio::fs::write(&path, &bytes).await {
                warn!(error = %e, path = %path.display(), "autosave failed");
            }
        });
    }

    fn abort_fetch(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
    }
}

/// One open canvas document: model, selection, view transform, background
/// image, and subscribers.
pub struct Document {
    state: Arc<RwLock<DocumentState>>,
    fetcher: Arc<dyn ImageFetch>,
}

impl Document {
    /// Create an empty, unbacked document.
    #[must_use]
    pub fn new(fetcher: Arc<dyn ImageFetch>) -> Self {
        Self::with_canvas(Canvas::new(), None, fetcher)
    }

    /// Create a document around an existing canvas, optionally backed by a
    /// file that autosave writes through to. Does not start a background
    /// fetch; call [`Document::refresh_background`] after construction.
    #[must_use]
    pub fn with_canvas(canvas: Canvas, backing: Option<PathBuf>, fetcher: Arc<dyn ImageFetch>) -> Self {
        let state = DocumentState {
            canvas,
            selected_ids: HashSet::new(),
            focus_id: None,
            steady_pan: Offset::ZERO,
            steady_zoom: 1.0,
            background: None,
            subscribers: HashMap::new(),
            backing,
            fetch_task: None,
        };
        Self { state: Arc::new(RwLock::new(state)), fetcher }
    }

    // --- Glyph intents ---

    /// Place a new glyph at integer canvas coordinates and return its id.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty symbol or non-positive size.
    pub async fn add_glyph(&self, symbol: &str, x: i64, y: i64, size: i64) -> Result<GlyphId, CanvasError> {
        let mut state = self.state.write().await;
        let id = state.canvas.add_glyph(symbol, x, y, size)?;
        state.autosave();
        state.notify(DocumentChange::Canvas);
        Ok(id)
    }

    /// Translate one glyph by integer deltas.
    ///
    /// # Errors
    ///
    /// `NotFound` if the glyph does not exist.
    pub async fn move_glyph(&self, id: GlyphId, dx: i64, dy: i64) -> Result<(), CanvasError> {
        let mut state = self.state.write().await;
        state.canvas.move_glyph(id, dx, dy)?;
        state.autosave();
        state.notify(DocumentChange::Canvas);
        Ok(())
    }

    /// Scale one glyph's base size.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a non-positive factor, `NotFound` for an unknown id.
    pub async fn resize_glyph(&self, id: GlyphId, factor: f64) -> Result<(), CanvasError> {
        let mut state = self.state.write().await;
        state.canvas.resize_glyph(id, factor)?;
        state.autosave();
        state.notify(DocumentChange::Canvas);
        Ok(())
    }

    /// Look up a glyph by id.
    pub async fn glyph(&self, id: GlyphId) -> Option<Glyph> {
        self.state.read().await.canvas.glyph(id).cloned()
    }

    // --- Selection and focus ---

    /// Tap on a glyph: toggle it between selected and unselected. Unknown
    /// ids are ignored so the selection stays a subset of live glyphs.
    pub async fn toggle_selection(&self, id: GlyphId) {
        let mut state = self.state.write().await;
        if state.canvas.glyph(id).is_none() {
            debug!(id, "selection toggle for unknown glyph ignored");
            return;
        }
        if !state.selected_ids.remove(&id) {
            state.selected_ids.insert(id);
        }
        state.notify(DocumentChange::Selection);
    }

    /// Tap on empty canvas: deselect everything. Focus is untouched.
    pub async fn clear_selection(&self) {
        let mut state = self.state.write().await;
        if state.selected_ids.is_empty() {
            return;
        }
        state.selected_ids.clear();
        state.notify(DocumentChange::Selection);
    }

    /// Arm the transient drag focus on a glyph. Only the first touch of a
    /// drag arms; later calls while a focus is held are ignored.
    pub async fn set_focus(&self, id: GlyphId) {
        let mut state = self.state.write().await;
        if state.focus_id.is_some() || state.canvas.glyph(id).is_none() {
            return;
        }
        state.focus_id = Some(id);
        state.notify(DocumentChange::Selection);
    }

    /// Disarm the drag focus without committing anything.
    pub async fn clear_focus(&self) {
        let mut state = self.state.write().await;
        if state.focus_id.take().is_some() {
            state.notify(DocumentChange::Selection);
        }
    }

    /// Drag end. With a non-empty selection, every selected glyph moves by
    /// the same delta regardless of which glyph the drag started on; with an
    /// empty selection, only the focused glyph moves. Focus is cleared on
    /// every branch.
    pub async fn commit_glyph_drag(&self, dx: i64, dy: i64) {
        let mut state = self.state.write().await;
        if state.selected_ids.is_empty() {
            let Some(id) = state.focus_id.take() else {
                return;
            };
            if let Err(e) = state.canvas.move_glyph(id, dx, dy) {
                debug!(error = %e, id, "focused glyph disappeared before drag commit");
            }
            state.autosave();
            state.notify(DocumentChange::Canvas);
            state.notify(DocumentChange::Selection);
            return;
        }
        let ids: Vec<GlyphId> = state.selected_ids.iter().copied().collect();
        for id in ids {
            if let Err(e) = state.canvas.move_glyph(id, dx, dy) {
                debug!(error = %e, id, "selected glyph disappeared before drag commit");
            }
        }
        let had_focus = state.focus_id.take().is_some();
        state.autosave();
        state.notify(DocumentChange::Canvas);
        if had_focus {
            state.notify(DocumentChange::Selection);
        }
    }

    /// Pinch end over a non-empty selection: commit the final magnification
    /// into each selected glyph's persisted size.
    pub async fn commit_selection_scale(&self, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            warn!(factor, "ignoring non-positive selection scale");
            return;
        }
        let mut state = self.state.write().await;
        if state.selected_ids.is_empty() {
            return;
        }
        let ids: Vec<GlyphId> = state.selected_ids.iter().copied().collect();
        for id in ids {
            if let Err(e) = state.canvas.resize_glyph(id, factor) {
                debug!(error = %e, id, "selected glyph disappeared before scale commit");
            }
        }
        state.autosave();
        state.notify(DocumentChange::Canvas);
    }

    /// Delete every selected glyph, then empty the selection.
    pub async fn delete_selected(&self) {
        let mut state = self.state.write().await;
        if state.selected_ids.is_empty() {
            return;
        }
        let ids: Vec<GlyphId> = state.selected_ids.iter().copied().collect();
        for id in ids {
            state.canvas.delete_glyph(id);
        }
        state.selected_ids.clear();
        state.autosave();
        state.notify(DocumentChange::Canvas);
        state.notify(DocumentChange::Selection);
    }

    // --- View transform ---

    /// Commit a finished magnification gesture into the steady zoom.
    pub async fn commit_zoom(&self, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            warn!(factor, "ignoring non-positive zoom commit");
            return;
        }
        let mut state = self.state.write().await;
        state.steady_zoom *= factor;
        state.notify(DocumentChange::View);
    }

    /// Commit a finished pan gesture. `delta` is the final view-space
    /// translation; it is stored unscaled, divided by the steady zoom.
    pub async fn commit_pan(&self, delta: Offset) {
        let mut state = self.state.write().await;
        state.steady_pan.x += delta.x / state.steady_zoom;
        state.steady_pan.y += delta.y / state.steady_zoom;
        state.notify(DocumentChange::View);
    }

    /// Fit the background image inside the viewport: set the steady zoom to
    /// the smaller axis ratio and reset the pan. No-op without a decoded
    /// image or with degenerate dimensions.
    pub async fn zoom_to_fit(&self, viewport: Size) {
        let mut state = self.state.write().await;
        let Some(image) = state.background.as_ref() else {
            return;
        };
        let image_size = Size::new(f64::from(image.width), f64::from(image.height));
        let Some(zoom) = camera::fit_zoom(image_size, viewport) else {
            return;
        };
        state.steady_zoom = zoom;
        state.steady_pan = Offset::ZERO;
        state.notify(DocumentChange::View);
    }

    // --- Background ---

    /// Replace the background reference and restart the fetch pipeline.
    ///
    /// The current image is cleared immediately so stale content never
    /// lingers, any in-flight fetch is aborted, and the new reference (if
    /// any) starts fetching. A superseded fetch that still completes is
    /// discarded by the reference check at apply time.
    pub async fn set_background_reference(&self, reference: Option<String>) {
        let mut state = self.state.write().await;
        state.background = None;
        state.abort_fetch();
        state.canvas.set_background(reference.clone());
        state.autosave();
        state.notify(DocumentChange::Canvas);
        state.notify(DocumentChange::Background);
        if let Some(reference) = reference {
            self.start_fetch(&mut state, reference);
        }
    }

    /// Re-run the fetch pipeline for the current reference, e.g. after a
    /// failed load. No-op when no reference is set.
    pub async fn refresh_background(&self) {
        let mut state = self.state.write().await;
        let Some(reference) = state.canvas.background_reference().map(ToOwned::to_owned) else {
            return;
        };
        state.background = None;
        state.abort_fetch();
        state.notify(DocumentChange::Background);
        self.start_fetch(&mut state, reference);
    }

    /// Whether a background reference is set but no image is displayable
    /// yet: the renderer's "loading or failed" signal.
    pub async fn is_loading(&self) -> bool {
        let state = self.state.read().await;
        state.canvas.background_reference().is_some() && state.background.is_none()
    }

    fn start_fetch(&self, state: &mut DocumentState, reference: String) {
        state.abort_fetch();
        let state_arc = Arc::clone(&self.state);
        let fetcher = Arc::clone(&self.fetcher);
        state.fetch_task = Some(tokio::spawn(async move {
            let result = fetcher.fetch(&reference).await;
            let mut state = state_arc.write().await;
            // A newer reference may have superseded this fetch while it was
            // in flight; its result must never override newer state.
            if state.canvas.background_reference() != Some(reference.as_str()) {
                debug!(%reference, "background fetch superseded; result discarded");
                return;
            }
            state.background = match result {
                Ok(bytes) => decode_image(&bytes).map(Arc::new),
                Err(e) => {
                    warn!(error = %e, %reference, "background fetch failed");
                    None
                }
            };
            state.notify(DocumentChange::Background);
        }));
    }

    // --- Renderer boundary ---

    /// Clone out everything the renderer needs for one frame.
    pub async fn snapshot(&self) -> DocumentSnapshot {
        let state = self.state.read().await;
        DocumentSnapshot {
            glyphs: state.canvas.glyphs().to_vec(),
            background_reference: state.canvas.background_reference().map(ToOwned::to_owned),
            background: state.background.clone(),
            selected_ids: state.selected_ids.clone(),
            focus_id: state.focus_id,
            steady_pan: state.steady_pan,
            steady_zoom: state.steady_zoom,
        }
    }

    /// Register for change notifications. Delivery is best-effort: a full
    /// channel drops the signal, a dropped receiver removes the subscription.
    pub async fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<DocumentChange>) {
        let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let id = Uuid::new_v4();
        self.state.write().await.subscribers.insert(id, tx);
        (id, rx)
    }

    /// Remove a subscription.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        self.state.write().await.subscribers.remove(&id);
    }

    /// The emoji palette offered for dragging onto this document.
    #[must_use]
    pub fn palette(&self) -> &'static str {
        DEFAULT_PALETTE
    }

    // --- Persistence ---

    /// Write the canvas to the backing path and wait for the write, unlike
    /// the spawned autosave. Failures are logged, not returned; in-memory
    /// state is always intact.
    pub async fn flush(&self) {
        let (path, bytes) = {
            let state = self.state.read().await;
            let Some(path) = state.backing.clone() else {
                return;
            };
            (path, state.canvas.encode())
        };
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            warn!(error = %e, path = %path.display(), "flush failed");
        }
    }
}
