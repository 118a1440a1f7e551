//! Multi-document store backed by a directory of files.
//!
//! One canvas blob per document at `<dir>/<uuid>.json`, written by each
//! document's own autosave, plus an ordered manifest at `<dir>/store.json`
//! carrying display names and the listing order. Opening the store recovers
//! every previously created, non-removed document with its content and name
//! intact; a missing or corrupt manifest is rebuilt from the blobs on disk,
//! and a missing or corrupt blob opens as an empty canvas rather than
//! failing.
//!
//! The store is single-writer: mutations go through `&mut self`, while the
//! renderer looks documents up by id and holds only a borrow.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::canvas::Canvas;
use crate::document::Document;
use crate::fetch::ImageFetch;

const MANIFEST_FILE: &str = "store.json";

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document with this id exists in the store.
    #[error("document not found: {0}")]
    NotFound(Uuid),
    /// The store directory or a required write could not be produced.
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable identity of a document within a store.
pub type DocumentId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    id: DocumentId,
    name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    documents: Vec<ManifestEntry>,
}

struct DocumentEntry {
    id: DocumentId,
    name: String,
    document: Document,
}

/// Owns every open document, keyed by stable id, with user-editable display
/// names.
pub struct DocumentStore {
    dir: PathBuf,
    fetcher: Arc<dyn ImageFetch>,
    entries: Vec<DocumentEntry>,
}

impl DocumentStore {
    /// Open (or create) a store rooted at `dir` and recover every persisted
    /// document. Each recovered document starts fetching its background.
    ///
    /// # Errors
    ///
    /// Propagates the I/O error if the directory cannot be created or read.
    pub async fn open(dir: impl Into<PathBuf>, fetcher: Arc<dyn ImageFetch>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let mut store = Self { dir, fetcher, entries: Vec::new() };
        let manifest = store.read_manifest().await;
        for entry in manifest.documents {
            store.recover_document(entry.id, entry.name).await;
        }
        store.adopt_orphans().await?;

        info!(dir = %store.dir.display(), count = store.entries.len(), "document store opened");
        Ok(store)
    }

    // --- CRUD ---

    /// Create a new empty document, persist it, and return its id. The
    /// display name is `name` if given, else the first unused "Untitled N".
    ///
    /// # Errors
    ///
    /// Propagates the I/O error if the blob or manifest cannot be written.
    pub async fn create_document(&mut self, name: Option<&str>) -> Result<DocumentId, StoreError> {
        let id = Uuid::new_v4();
        let name = match name {
            Some(given) if !given.is_empty() => given.to_owned(),
            _ => self.next_untitled_name(),
        };

        let path = self.document_path(id);
        let canvas = Canvas::new();
        tokio::fs::write(&path, canvas.encode()).await?;

        let document = Document::with_canvas(canvas, Some(path), Arc::clone(&self.fetcher));
        self.entries.push(DocumentEntry { id, name, document });
        self.write_manifest().await?;

        info!(%id, "document created");
        Ok(id)
    }

    /// Delete a document's persisted backing and drop it from the store.
    ///
    /// # Errors
    ///
    /// `NotFound` if no document has this id. Backing cleanup failures are
    /// logged, not surfaced.
    pub async fn remove_document(&mut self, id: DocumentId) -> Result<(), StoreError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        self.entries.remove(index);

        let path = self.document_path(id);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(error = %e, path = %path.display(), "failed to delete document backing");
        }
        if let Err(e) = self.write_manifest().await {
            warn!(error = %e, "failed to rewrite manifest after removal");
        }

        info!(%id, "document removed");
        Ok(())
    }

    /// Change a document's display name. Canvas content is untouched.
    ///
    /// # Errors
    ///
    /// `NotFound` if no document has this id. A manifest write failure is
    /// logged; the rename still applies in memory.
    pub async fn rename_document(&mut self, id: DocumentId, new_name: &str) -> Result<(), StoreError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        entry.name = new_name.to_owned();

        if let Err(e) = self.write_manifest().await {
            warn!(error = %e, "failed to rewrite manifest after rename");
        }
        Ok(())
    }

    /// All documents as `(id, display name)`, in creation order. The order
    /// is stable across calls and across restarts.
    #[must_use]
    pub fn list_documents(&self) -> Vec<(DocumentId, String)> {
        self.entries.iter().map(|e| (e.id, e.name.clone())).collect()
    }

    /// Borrow a document by id for driving intents or snapshotting.
    #[must_use]
    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.document)
    }

    /// Number of open documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // --- Recovery ---

    async fn read_manifest(&self) -> Manifest {
        let path = self.dir.join(MANIFEST_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                info!(error = %e, path = %path.display(), "no readable manifest; rebuilding from blobs");
                return Manifest::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(error = %e, "manifest corrupt; rebuilding from blobs");
                Manifest::default()
            }
        }
    }

    async fn write_manifest(&self) -> Result<(), StoreError> {
        let manifest = Manifest {
            documents: self
                .entries
                .iter()
                .map(|e| ManifestEntry { id: e.id, name: e.name.clone() })
                .collect(),
        };
        let bytes = match serde_json::to_vec(&manifest) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "manifest encode failed");
                return Ok(());
            }
        };
        tokio::fs::write(self.dir.join(MANIFEST_FILE), bytes).await?;
        Ok(())
    }

    /// Rebuild one document from its blob. A missing or malformed blob
    /// becomes an empty canvas; opening never fails.
    async fn recover_document(&mut self, id: DocumentId, name: String) {
        let path = self.document_path(id);
        let canvas = match tokio::fs::read(&path).await {
            Ok(bytes) => Canvas::decode(&bytes),
            Err(e) => {
                warn!(error = %e, %id, "document blob unreadable; opening empty");
                Canvas::new()
            }
        };
        let document = Document::with_canvas(canvas, Some(path), Arc::clone(&self.fetcher));
        document.refresh_background().await;
        self.entries.push(DocumentEntry { id, name, document });
    }

    /// Adopt blobs on disk that the manifest does not mention, in filename
    /// order, with generated names. Covers manifest loss and out-of-band
    /// file drops.
    async fn adopt_orphans(&mut self) -> Result<(), StoreError> {
        let mut orphans: Vec<DocumentId> = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(id) = Uuid::parse_str(stem) else {
                continue;
            };
            if self.entries.iter().all(|e| e.id != id) {
                orphans.push(id);
            }
        }
        if orphans.is_empty() {
            return Ok(());
        }

        orphans.sort_unstable();
        for id in orphans {
            let name = self.next_untitled_name();
            warn!(%id, %name, "adopting document blob missing from manifest");
            self.recover_document(id, name).await;
        }
        self.write_manifest().await
    }

    // --- Helpers ---

    fn document_path(&self, id: DocumentId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Directory this store persists into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_untitled_name(&self) -> String {
        let mut n: u32 = 1;
        loop {
            let candidate = format!("Untitled {n}");
            if self.entries.iter().all(|e| e.name != candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}
