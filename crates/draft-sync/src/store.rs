//! LocalStore: durable key-addressed storage for documents, scenes,
//! annotations, and the pending-operation queue.
//!
//! The store is the single source of truth for the UI and the only resource
//! shared with the sync engine. All operations are synchronous (`&self` with
//! interior locking) so a UI action never waits on I/O; durability is an
//! explicit snapshot boundary: `load` at process start, `save` at process
//! stop. A single `put` of one record is atomic; a multi-record overwrite is
//! not transactional.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use draft_core::model::{Annotation, Document, Scene};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::queue::PendingOp;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// On-disk shape of the whole store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    documents: Vec<Document>,
    scenes: Vec<Scene>,
    annotations: Vec<Annotation>,
    queue: Vec<PendingOp>,
}

/// In-memory record tables with an explicit JSON snapshot boundary.
#[derive(Default)]
pub struct LocalStore {
    documents: RwLock<HashMap<String, Document>>,
    scenes: RwLock<HashMap<String, Scene>>,
    annotations: RwLock<HashMap<String, Annotation>>,
    queue: RwLock<Vec<PendingOp>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a snapshot file. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let contents = fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&contents)?;

        let store = Self::new();
        for doc in snapshot.documents {
            store.put_document(doc);
        }
        for scene in snapshot.scenes {
            store.put_scene(scene);
        }
        for ann in snapshot.annotations {
            store.put_annotation(ann);
        }
        *store.queue.write().unwrap_or_else(|e| e.into_inner()) = snapshot.queue;

        Ok(store)
    }

    /// Serialize the whole store (records + queue) to a snapshot file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut snapshot = StoreSnapshot {
            documents: self.documents(),
            scenes: self
                .scenes
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .values()
                .cloned()
                .collect(),
            annotations: self
                .annotations
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .values()
                .cloned()
                .collect(),
            queue: self.pending_ops(),
        };
        // Deterministic file contents across runs
        snapshot.documents.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot.scenes.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot.annotations.sort_by(|a, b| a.id.cmp(&b.id));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, contents)?;
        Ok(())
    }

    // ========== Documents ==========

    /// Upsert a document by id. Idempotent.
    pub fn put_document(&self, document: Document) {
        self.documents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(document.id.clone(), document);
    }

    pub fn document(&self, id: &str) -> Option<Document> {
        self.documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn documents(&self) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }

    /// All documents owned by a user, most recently updated first.
    pub fn documents_for_user(&self, user_id: &str) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        docs
    }

    pub fn delete_document(&self, id: &str) {
        self.documents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    // ========== Scenes ==========

    /// Upsert a scene by id. Idempotent.
    pub fn put_scene(&self, scene: Scene) {
        self.scenes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(scene.id.clone(), scene);
    }

    pub fn scene(&self, id: &str) -> Option<Scene> {
        self.scenes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// All scenes of a document, ordered by section then position.
    pub fn scenes_of(&self, document_id: &str) -> Vec<Scene> {
        let mut scenes: Vec<Scene> = self
            .scenes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect();
        scenes.sort_by(|a, b| (a.section, a.position).cmp(&(b.section, b.position)));
        scenes
    }

    pub fn delete_scene(&self, id: &str) {
        self.scenes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    // ========== Annotations ==========

    /// Upsert an annotation by id. Idempotent.
    pub fn put_annotation(&self, annotation: Annotation) {
        self.annotations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(annotation.id.clone(), annotation);
    }

    pub fn annotation(&self, id: &str) -> Option<Annotation> {
        self.annotations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn annotations_of(&self, document_id: &str) -> Vec<Annotation> {
        let mut anns: Vec<Annotation> = self
            .annotations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|a| a.document_id == document_id)
            .cloned()
            .collect();
        anns.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        anns
    }

    pub fn annotations_of_scene(&self, scene_id: &str) -> Vec<Annotation> {
        let mut anns: Vec<Annotation> = self
            .annotations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|a| a.scene_id == scene_id)
            .cloned()
            .collect();
        anns.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        anns
    }

    pub fn delete_annotation(&self, id: &str) {
        self.annotations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    // ========== Aggregate operations ==========

    /// Wholesale overwrite of one document and all its children: the pull
    /// path's unit of write. Existing children of the document are removed
    /// first; each record write is individually atomic, the overwrite as a
    /// whole is not transactional.
    pub fn replace_document_tree(
        &self,
        document: Document,
        scenes: Vec<Scene>,
        annotations: Vec<Annotation>,
    ) {
        let document_id = document.id.clone();
        self.remove_document_tree(&document_id);

        debug!(
            "Replacing document tree {} ({} scenes, {} annotations)",
            document_id,
            scenes.len(),
            annotations.len()
        );
        self.put_document(document);
        for scene in scenes {
            self.put_scene(scene);
        }
        for ann in annotations {
            self.put_annotation(ann);
        }
    }

    /// Remove one document and all its children.
    pub fn remove_document_tree(&self, document_id: &str) {
        self.delete_document(document_id);
        self.scenes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|_, s| s.document_id != document_id);
        self.annotations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|_, a| a.document_id != document_id);
    }

    // ========== Operation queue ==========

    /// Append an operation to the queue.
    pub fn enqueue(&self, op: PendingOp) {
        self.queue.write().unwrap_or_else(|e| e.into_inner()).push(op);
    }

    /// Outstanding operations, in insertion order.
    pub fn pending_ops(&self) -> Vec<PendingOp> {
        self.queue.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of outstanding operations, for UI indicators.
    pub fn queue_len(&self) -> usize {
        self.queue.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Remove confirmed entries by op id.
    pub fn clear_ops(&self, ids: &[String]) {
        self.queue
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|op| !ids.contains(&op.id));
    }
}
