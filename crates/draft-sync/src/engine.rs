//! SyncEngine: reconciles one user's documents between the local store and
//! the shared remote copy.
//!
//! The protocol is deliberately simple:
//!
//! 1. `pull` fetches the user's remote documents and compares `updated_at`
//!    per document. A remote copy that is absent locally or strictly newer
//!    replaces the local aggregate wholesale (document plus all children).
//!    Last-writer-wins at document granularity: concurrent edits to
//!    different scenes of the same document on two devices are not both
//!    preserved.
//! 2. `push` upserts every local document of the user, then its scenes and
//!    annotations. A failed record is logged and skipped; siblings and
//!    other documents continue.
//! 3. `full_sync` is pull-then-push. A pull failure is fatal to the pass
//!    (pushing on possibly-stale state risks clobbering newer remote data)
//!    and leaves local state untouched. After push, queue entries whose
//!    target record uploaded are cleared; entries for failed records stay
//!    queued for the next explicit retry. There is no background retry
//!    loop.
//!
//! Both `pull` and `push` are safe to call repeatedly.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{EventBus, SyncEvent};
use crate::queue::RecordTable;
use crate::remote::{RemoteError, RemoteStore};
use crate::rows::{
    annotation_from_row, annotation_to_row, document_from_row, document_to_row, scene_from_row,
    scene_to_row,
};
use crate::store::LocalStore;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Result of a full sync pass, shaped for UI consumption.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyncSummary {
    pub uploaded: usize,
    pub downloaded: usize,
    pub success: bool,
    pub error: Option<String>,
}

/// What a push pass accomplished.
#[derive(Debug, Default)]
pub struct PushOutcome {
    /// Records successfully upserted.
    pub uploaded: usize,
    /// Records whose upsert failed and was skipped.
    pub failed: Vec<(RecordTable, String)>,
}

pub struct SyncEngine {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    events: Arc<EventBus>,
}

impl SyncEngine {
    pub fn new(store: Arc<LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            remote,
            events: Arc::new(EventBus::new()),
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Pull the user's documents from the remote store.
    ///
    /// Returns the number of documents replaced locally. Any remote error is
    /// fatal to the pull and leaves local state exactly as it was.
    pub async fn pull(&self, user_id: &str) -> Result<usize> {
        let remote_docs = self.remote.select_documents(user_id).await?;
        debug!("Pull: {} remote documents for {}", remote_docs.len(), user_id);

        let mut downloaded = 0;
        for row in remote_docs {
            let keep_local = self
                .store
                .document(&row.id)
                .is_some_and(|local| local.updated_at >= row.updated_at);
            if keep_local {
                debug!("Pull: local copy of {} is newer or equal, untouched", row.id);
                continue;
            }

            // Fetch the full aggregate before touching local state, so a
            // failed child fetch leaves the document as it was.
            let scene_rows = self.remote.select_scenes(&row.id).await?;
            let annotation_rows = self.remote.select_annotations(&row.id).await?;

            // The only point where the wire shape enters the system.
            let document = document_from_row(row);
            let scenes = scene_rows.into_iter().map(scene_from_row).collect();
            let annotations = annotation_rows.into_iter().map(annotation_from_row).collect();

            let document_id = document.id.clone();
            self.store.replace_document_tree(document, scenes, annotations);
            self.events.emit(SyncEvent::DocumentDownloaded {
                document_id: document_id.clone(),
            });
            info!("Pull: replaced local document {}", document_id);
            downloaded += 1;
        }

        Ok(downloaded)
    }

    /// Push every local document of the user to the remote store.
    ///
    /// Best-effort, continue-on-error: a failed record upsert is logged and
    /// skipped without aborting siblings or other documents.
    pub async fn push(&self, user_id: &str) -> PushOutcome {
        let mut outcome = PushOutcome::default();

        for document in self.store.documents_for_user(user_id) {
            let document_id = document.id.clone();
            self.upsert_one(
                RecordTable::Documents,
                document_id.clone(),
                self.remote.upsert_document(document_to_row(&document)).await,
                &mut outcome,
            );

            for scene in self.store.scenes_of(&document_id) {
                let scene_id = scene.id.clone();
                self.upsert_one(
                    RecordTable::Scenes,
                    scene_id,
                    self.remote.upsert_scene(scene_to_row(&scene)).await,
                    &mut outcome,
                );
            }

            for annotation in self.store.annotations_of(&document_id) {
                let annotation_id = annotation.id.clone();
                self.upsert_one(
                    RecordTable::Annotations,
                    annotation_id,
                    self.remote.upsert_annotation(annotation_to_row(&annotation)).await,
                    &mut outcome,
                );
            }
        }

        outcome
    }

    fn upsert_one(
        &self,
        table: RecordTable,
        record_id: String,
        result: std::result::Result<(), RemoteError>,
        outcome: &mut PushOutcome,
    ) {
        match result {
            Ok(()) => outcome.uploaded += 1,
            Err(e) => {
                warn!("Push: failed to upsert {} record {}: {}", table.name(), record_id, e);
                self.events.emit(SyncEvent::RecordUploadFailed {
                    table: table.name(),
                    record_id: record_id.clone(),
                });
                outcome.failed.push((table, record_id));
            }
        }
    }

    /// Pull then push, clearing confirmed queue entries afterwards.
    pub async fn full_sync(&self, user_id: &str) -> SyncSummary {
        self.events.emit(SyncEvent::SyncStarted {
            user_id: user_id.to_string(),
        });

        let downloaded = match self.pull(user_id).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Full sync aborted, pull failed: {}", e);
                self.events.emit(SyncEvent::SyncFinished {
                    uploaded: 0,
                    downloaded: 0,
                    success: false,
                });
                return SyncSummary {
                    uploaded: 0,
                    downloaded: 0,
                    success: false,
                    error: Some(e.to_string()),
                };
            }
        };

        // Snapshot the queue before pushing: entries enqueued mid-push belong
        // to the next pass.
        let pending = self.store.pending_ops();
        let outcome = self.push(user_id).await;

        let failed_records: HashSet<&String> = outcome.failed.iter().map(|(_, id)| id).collect();
        let confirmed: Vec<String> = pending
            .iter()
            .filter(|op| !failed_records.contains(&op.record_id))
            .map(|op| op.id.clone())
            .collect();
        self.store.clear_ops(&confirmed);

        let success = outcome.failed.is_empty();
        let error = if success {
            None
        } else {
            Some(format!("{} records failed to upload", outcome.failed.len()))
        };
        info!(
            "Full sync for {}: {} uploaded, {} downloaded, success={}",
            user_id, outcome.uploaded, downloaded, success
        );
        self.events.emit(SyncEvent::SyncFinished {
            uploaded: outcome.uploaded,
            downloaded,
            success,
        });

        SyncSummary {
            uploaded: outcome.uploaded,
            downloaded,
            success,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{OpKind, PendingOp};
    use crate::remote::InMemoryRemote;
    use crate::rows::{document_to_row, scene_to_row};
    use draft_core::model::{Document, Scene, Section, VoicePair};

    fn engine_with(remote: Arc<InMemoryRemote>) -> (Arc<LocalStore>, SyncEngine) {
        let store = Arc::new(LocalStore::new());
        let engine = SyncEngine::new(Arc::clone(&store), remote);
        (store, engine)
    }

    fn document(user_id: &str) -> Document {
        Document::new(user_id, "Tidewater", "The Lake House", VoicePair::new("June", "Junie"))
    }

    #[tokio::test]
    async fn test_pull_downloads_unknown_documents() {
        let remote = Arc::new(InMemoryRemote::new());
        let (store, engine) = engine_with(Arc::clone(&remote));

        let doc = document("user-1");
        let scene = Scene::new(doc.id.clone(), Section::Before, "Cold open", 0);
        remote.seed_document(document_to_row(&doc));
        remote.seed_scene(scene_to_row(&scene));

        let downloaded = engine.pull("user-1").await.unwrap();
        assert_eq!(downloaded, 1);
        assert_eq!(store.document(&doc.id).unwrap(), doc);
        assert_eq!(store.scenes_of(&doc.id), vec![scene]);
    }

    #[tokio::test]
    async fn test_pull_replaces_older_local_wholesale() {
        let remote = Arc::new(InMemoryRemote::new());
        let (store, engine) = engine_with(Arc::clone(&remote));

        // Local copy at t=100 with a scene the remote no longer has.
        let mut local_doc = document("user-1");
        local_doc.updated_at = 100;
        let local_scene = Scene::new(local_doc.id.clone(), Section::Before, "Local only", 0);
        store.put_document(local_doc.clone());
        store.put_scene(local_scene.clone());

        // Remote copy at t=200 with a different scene.
        let mut remote_doc = local_doc.clone();
        remote_doc.title = "Tidewater, remote".into();
        remote_doc.updated_at = 200;
        let remote_scene = Scene::new(remote_doc.id.clone(), Section::Turning, "Remote only", 0);
        remote.seed_document(document_to_row(&remote_doc));
        remote.seed_scene(scene_to_row(&remote_scene));

        let downloaded = engine.pull("user-1").await.unwrap();
        assert_eq!(downloaded, 1);

        // Wholesale replacement: the local-only scene is gone.
        let stored = store.document(&local_doc.id).unwrap();
        assert_eq!(stored.title, "Tidewater, remote");
        assert_eq!(stored.updated_at, 200);
        assert!(store.scene(&local_scene.id).is_none());
        assert_eq!(store.scenes_of(&local_doc.id), vec![remote_scene]);
    }

    #[tokio::test]
    async fn test_pull_leaves_newer_or_equal_local_untouched() {
        let remote = Arc::new(InMemoryRemote::new());
        let (store, engine) = engine_with(Arc::clone(&remote));

        let mut local_doc = document("user-1");
        local_doc.title = "Local wins".into();
        local_doc.updated_at = 300;
        store.put_document(local_doc.clone());

        let mut remote_doc = local_doc.clone();
        remote_doc.title = "Remote loses".into();
        remote_doc.updated_at = 300; // equal timestamp: local kept
        remote.seed_document(document_to_row(&remote_doc));

        let downloaded = engine.pull("user-1").await.unwrap();
        assert_eq!(downloaded, 0);
        assert_eq!(store.document(&local_doc.id).unwrap().title, "Local wins");
    }

    #[tokio::test]
    async fn test_push_uploads_full_aggregates() {
        let remote = Arc::new(InMemoryRemote::new());
        let (store, engine) = engine_with(Arc::clone(&remote));

        let doc = document("user-1");
        let scene = Scene::new(doc.id.clone(), Section::Before, "Cold open", 0);
        store.put_document(doc.clone());
        store.put_scene(scene.clone());

        let outcome = engine.push("user-1").await;
        assert_eq!(outcome.uploaded, 2);
        assert!(outcome.failed.is_empty());
        assert!(remote.document(&doc.id).is_some());
        assert!(remote.scene(&scene.id).is_some());
    }

    #[tokio::test]
    async fn test_push_is_idempotent() {
        let remote = Arc::new(InMemoryRemote::new());
        let (store, engine) = engine_with(Arc::clone(&remote));

        let doc = document("user-1");
        let scene = Scene::new(doc.id.clone(), Section::Before, "Cold open", 0);
        store.put_document(doc);
        store.put_scene(scene);

        engine.push("user-1").await;
        let first = remote.dump();
        engine.push("user-1").await;
        let second = remote.dump();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_push_continues_past_failed_records() {
        let remote = Arc::new(InMemoryRemote::new());
        let (store, engine) = engine_with(Arc::clone(&remote));

        let doc = document("user-1");
        let bad_scene = Scene::new(doc.id.clone(), Section::Before, "Rejected", 0);
        let good_scene = Scene::new(doc.id.clone(), Section::Before, "Accepted", 1);
        store.put_document(doc.clone());
        store.put_scene(bad_scene.clone());
        store.put_scene(good_scene.clone());
        remote.reject_writes_to(bad_scene.id.clone());

        let outcome = engine.push("user-1").await;
        assert_eq!(outcome.uploaded, 2); // document + good scene
        assert_eq!(outcome.failed, vec![(RecordTable::Scenes, bad_scene.id.clone())]);
        assert!(remote.scene(&good_scene.id).is_some());
        assert!(remote.scene(&bad_scene.id).is_none());
    }

    #[tokio::test]
    async fn test_full_sync_aborts_on_pull_failure() {
        let remote = Arc::new(InMemoryRemote::new());
        let (store, engine) = engine_with(Arc::clone(&remote));

        let doc = document("user-1");
        store.put_document(doc.clone());
        store.enqueue(PendingOp::new(
            OpKind::Create,
            RecordTable::Documents,
            doc.id.clone(),
            serde_json::Value::Null,
        ));
        remote.set_offline(true);

        let summary = engine.full_sync("user-1").await;
        assert!(!summary.success);
        assert_eq!(summary.uploaded, 0);
        assert_eq!(summary.downloaded, 0);
        assert!(summary.error.is_some());

        // Nothing pushed, nothing cleared: local state exactly as it was.
        assert_eq!(store.queue_len(), 1);
        assert!(remote.document(&doc.id).is_none());
    }

    #[tokio::test]
    async fn test_full_sync_clears_confirmed_queue_entries() {
        let remote = Arc::new(InMemoryRemote::new());
        let (store, engine) = engine_with(Arc::clone(&remote));

        let doc = document("user-1");
        store.put_document(doc.clone());
        store.enqueue(PendingOp::new(
            OpKind::Create,
            RecordTable::Documents,
            doc.id.clone(),
            serde_json::Value::Null,
        ));
        store.enqueue(PendingOp::new(
            OpKind::Update,
            RecordTable::Documents,
            doc.id.clone(),
            serde_json::Value::Null,
        ));

        let summary = engine.full_sync("user-1").await;
        assert!(summary.success);
        assert_eq!(summary.uploaded, 1);
        assert_eq!(store.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_full_sync_keeps_queue_entries_for_failed_records() {
        let remote = Arc::new(InMemoryRemote::new());
        let (store, engine) = engine_with(Arc::clone(&remote));

        let doc = document("user-1");
        let bad_scene = Scene::new(doc.id.clone(), Section::Before, "Rejected", 0);
        store.put_document(doc.clone());
        store.put_scene(bad_scene.clone());
        store.enqueue(PendingOp::new(
            OpKind::Create,
            RecordTable::Documents,
            doc.id.clone(),
            serde_json::Value::Null,
        ));
        store.enqueue(PendingOp::new(
            OpKind::Create,
            RecordTable::Scenes,
            bad_scene.id.clone(),
            serde_json::Value::Null,
        ));
        remote.reject_writes_to(bad_scene.id.clone());

        let summary = engine.full_sync("user-1").await;
        assert!(!summary.success);
        assert!(summary.error.as_deref().unwrap().contains("1 records"));

        // The failed scene's operation stays queued for the next retry.
        let remaining = store.pending_ops();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].record_id, bad_scene.id);

        // The retry succeeds once the remote accepts the record again.
        remote.clear_rejections();
        let summary = engine.full_sync("user-1").await;
        assert!(summary.success);
        assert_eq!(store.queue_len(), 0);
        assert!(remote.scene(&bad_scene.id).is_some());
    }

    #[tokio::test]
    async fn test_full_sync_emits_events() {
        use std::sync::Mutex;

        let remote = Arc::new(InMemoryRemote::new());
        let (store, engine) = engine_with(Arc::clone(&remote));

        let doc = document("user-1");
        remote.seed_document(document_to_row(&doc));
        store.put_document({
            let mut mine = document("user-1");
            mine.updated_at = 0;
            mine
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let _sub = engine.events().subscribe(move |event| {
            seen_clone
                .lock()
                .unwrap()
                .push(serde_json::to_string(&event).unwrap());
        });

        engine.full_sync("user-1").await;

        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|e| e.contains("syncStarted")));
        assert!(seen.iter().any(|e| e.contains("documentDownloaded")));
        assert!(seen.iter().any(|e| e.contains("syncFinished")));
    }
}
