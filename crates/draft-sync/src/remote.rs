//! RemoteStore: the contract the sync engine consumes.
//!
//! Any remote store offering these four read shapes and one write shape per
//! table satisfies the contract; the engine never sees anything else. The
//! write is an upsert keyed by id, so replaying queued intent is harmless.
//!
//! `InMemoryRemote` implements the trait for tests, including switches for
//! injecting whole-store and per-record failures.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use crate::rows::{AnnotationRow, DocumentRow, SceneRow};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected for {table} record {id}")]
    Rejected { table: &'static str, id: String },
}

pub type Result<T> = std::result::Result<T, RemoteError>;

/// The remote store as consumed by the sync engine.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All documents owned by a user.
    async fn select_documents(&self, user_id: &str) -> Result<Vec<DocumentRow>>;

    /// All scenes of a document.
    async fn select_scenes(&self, document_id: &str) -> Result<Vec<SceneRow>>;

    /// All annotations of a document.
    async fn select_annotations(&self, document_id: &str) -> Result<Vec<AnnotationRow>>;

    /// Upsert by id (insert-on-conflict-update).
    async fn upsert_document(&self, row: DocumentRow) -> Result<()>;

    /// Upsert by id.
    async fn upsert_scene(&self, row: SceneRow) -> Result<()>;

    /// Upsert by id.
    async fn upsert_annotation(&self, row: AnnotationRow) -> Result<()>;
}

/// In-memory remote store for tests.
#[derive(Default)]
pub struct InMemoryRemote {
    documents: RwLock<HashMap<String, DocumentRow>>,
    scenes: RwLock<HashMap<String, SceneRow>>,
    annotations: RwLock<HashMap<String, AnnotationRow>>,
    /// When set, every call fails (simulates the remote being unreachable).
    offline: AtomicBool,
    /// Record ids whose upserts fail (simulates per-record write rejection).
    reject_ids: RwLock<HashSet<String>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Make upserts of the given record id fail.
    pub fn reject_writes_to(&self, id: impl Into<String>) {
        self.reject_ids
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.into());
    }

    pub fn clear_rejections(&self) {
        self.reject_ids
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(RemoteError::Unavailable("remote is offline".into()));
        }
        Ok(())
    }

    fn check_accepts(&self, table: &'static str, id: &str) -> Result<()> {
        let rejected = self
            .reject_ids
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(id);
        if rejected {
            return Err(RemoteError::Rejected {
                table,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // Direct inspection for assertions.

    pub fn document(&self, id: &str) -> Option<DocumentRow> {
        self.documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn scene(&self, id: &str) -> Option<SceneRow> {
        self.scenes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn annotation(&self, id: &str) -> Option<AnnotationRow> {
        self.annotations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Full contents sorted by id, for whole-store equality assertions.
    pub fn dump(&self) -> (Vec<DocumentRow>, Vec<SceneRow>, Vec<AnnotationRow>) {
        let mut docs: Vec<DocumentRow> = self
            .documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        let mut scenes: Vec<SceneRow> = self
            .scenes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        let mut anns: Vec<AnnotationRow> = self
            .annotations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        scenes.sort_by(|a, b| a.id.cmp(&b.id));
        anns.sort_by(|a, b| a.id.cmp(&b.id));
        (docs, scenes, anns)
    }

    /// Seed a document row directly (test setup, bypasses the engine).
    pub fn seed_document(&self, row: DocumentRow) {
        self.documents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(row.id.clone(), row);
    }

    pub fn seed_scene(&self, row: SceneRow) {
        self.scenes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(row.id.clone(), row);
    }

    pub fn seed_annotation(&self, row: AnnotationRow) {
        self.annotations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(row.id.clone(), row);
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn select_documents(&self, user_id: &str) -> Result<Vec<DocumentRow>> {
        self.check_online()?;
        let mut rows: Vec<DocumentRow> = self
            .documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows)
    }

    async fn select_scenes(&self, document_id: &str) -> Result<Vec<SceneRow>> {
        self.check_online()?;
        let mut rows: Vec<SceneRow> = self
            .scenes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows)
    }

    async fn select_annotations(&self, document_id: &str) -> Result<Vec<AnnotationRow>> {
        self.check_online()?;
        let mut rows: Vec<AnnotationRow> = self
            .annotations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|a| a.document_id == document_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows)
    }

    async fn upsert_document(&self, row: DocumentRow) -> Result<()> {
        self.check_online()?;
        self.check_accepts("documents", &row.id)?;
        self.documents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(row.id.clone(), row);
        Ok(())
    }

    async fn upsert_scene(&self, row: SceneRow) -> Result<()> {
        self.check_online()?;
        self.check_accepts("scenes", &row.id)?;
        self.scenes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(row.id.clone(), row);
        Ok(())
    }

    async fn upsert_annotation(&self, row: AnnotationRow) -> Result<()> {
        self.check_online()?;
        self.check_accepts("annotations", &row.id)?;
        self.annotations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(row.id.clone(), row);
        Ok(())
    }
}
