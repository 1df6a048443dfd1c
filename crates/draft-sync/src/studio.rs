//! Studio: the state container owning the UI-facing mutation path.
//!
//! Every mutation is one method that performs the Local-Store write and the
//! Operation-Queue append as a single unit, re-running the validation
//! engine immediately whenever a field that feeds it changes. The UI never
//! writes records or statuses directly.
//!
//! All methods are synchronous: the store is in-memory with an explicit
//! snapshot boundary, so a UI action never waits.

use std::sync::Arc;

use draft_core::checklist::regenerate_checklist;
use draft_core::gates::{review_ready, sensory_coverage_met};
use draft_core::model::{
    Annotation, AnnotationCategory, Document, Scene, Section, VoicePair,
};
use draft_core::motif::flag_mention;
use draft_core::status::validate_scene;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::queue::{OpKind, PendingOp, RecordTable};
use crate::store::LocalStore;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    #[error("Annotation not found: {0}")]
    AnnotationNotFound(String),

    #[error("An annotation cannot echo its own scene")]
    SelfEcho,

    #[error("Document is already in its final section")]
    AtFinalSection,

    #[error("Entering {0:?} requires every sense activated at least once")]
    CoverageNotMet(Section),
}

pub type Result<T> = std::result::Result<T, StudioError>;

pub struct Studio {
    store: Arc<LocalStore>,
}

impl Studio {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Outstanding sync work, for UI indicators.
    pub fn queue_len(&self) -> usize {
        self.store.queue_len()
    }

    fn payload_of<T: serde::Serialize>(record: &T) -> Value {
        serde_json::to_value(record).unwrap_or(Value::Null)
    }

    fn write_document(&self, kind: OpKind, document: &Document) {
        self.store.put_document(document.clone());
        self.store.enqueue(PendingOp::new(
            kind,
            RecordTable::Documents,
            document.id.clone(),
            Self::payload_of(document),
        ));
    }

    fn write_scene(&self, kind: OpKind, scene: &Scene) {
        self.store.put_scene(scene.clone());
        self.store.enqueue(PendingOp::new(
            kind,
            RecordTable::Scenes,
            scene.id.clone(),
            Self::payload_of(scene),
        ));
    }

    fn write_annotation(&self, kind: OpKind, annotation: &Annotation) {
        self.store.put_annotation(annotation.clone());
        self.store.enqueue(PendingOp::new(
            kind,
            RecordTable::Annotations,
            annotation.id.clone(),
            Self::payload_of(annotation),
        ));
    }

    // ========== Documents ==========

    pub fn create_document(
        &self,
        user_id: impl Into<String>,
        title: impl Into<String>,
        real_name: impl Into<String>,
        voice_pair: VoicePair,
    ) -> Document {
        let document = Document::new(user_id, title, real_name, voice_pair);
        self.write_document(OpKind::Create, &document);
        debug!("Created document {}", document.id);
        document
    }

    /// The single Document update path. Applies `f`, stamps `updated_at`,
    /// writes, enqueues.
    pub fn update_document(
        &self,
        id: &str,
        f: impl FnOnce(&mut Document),
    ) -> Result<Document> {
        let mut document = self
            .store
            .document(id)
            .ok_or_else(|| StudioError::DocumentNotFound(id.to_string()))?;
        f(&mut document);
        if sensory_coverage_met(&document.palette) {
            document.ending_unlocked = true;
        }
        document.touch();
        self.write_document(OpKind::Update, &document);
        Ok(document)
    }

    /// Delete a document and everything under it.
    pub fn delete_document(&self, id: &str) -> Result<()> {
        if self.store.document(id).is_none() {
            return Err(StudioError::DocumentNotFound(id.to_string()));
        }

        for scene in self.store.scenes_of(id) {
            self.store.enqueue(PendingOp::new(
                OpKind::Delete,
                RecordTable::Scenes,
                scene.id,
                Value::Null,
            ));
        }
        for annotation in self.store.annotations_of(id) {
            self.store.enqueue(PendingOp::new(
                OpKind::Delete,
                RecordTable::Annotations,
                annotation.id,
                Value::Null,
            ));
        }
        self.store.enqueue(PendingOp::new(
            OpKind::Delete,
            RecordTable::Documents,
            id,
            Value::Null,
        ));
        self.store.remove_document_tree(id);
        debug!("Deleted document {}", id);
        Ok(())
    }

    /// Advance the document to its next section.
    ///
    /// Entering the full-sensory-coverage phase is gated on every tracked
    /// sense having been activated at least once.
    pub fn advance_section(&self, document_id: &str) -> Result<Section> {
        let document = self
            .store
            .document(document_id)
            .ok_or_else(|| StudioError::DocumentNotFound(document_id.to_string()))?;
        let next = document
            .current_section
            .next()
            .ok_or(StudioError::AtFinalSection)?;

        if next == Section::Reawakening && !sensory_coverage_met(&document.palette) {
            return Err(StudioError::CoverageNotMet(next));
        }

        self.update_document(document_id, |doc| {
            doc.current_section = next;
        })?;
        Ok(next)
    }

    /// Final-review gate, recomputed on demand. Never stored.
    pub fn review_ready(&self, document_id: &str) -> Result<bool> {
        let document = self
            .store
            .document(document_id)
            .ok_or_else(|| StudioError::DocumentNotFound(document_id.to_string()))?;
        let annotations = self.store.annotations_of(document_id);
        Ok(review_ready(&document, &annotations))
    }

    // ========== Scenes ==========

    /// Create a scene at the next free position within its section.
    pub fn create_scene(
        &self,
        document_id: &str,
        section: Section,
        title: impl Into<String>,
    ) -> Result<Scene> {
        if self.store.document(document_id).is_none() {
            return Err(StudioError::DocumentNotFound(document_id.to_string()));
        }

        let position = self
            .store
            .scenes_of(document_id)
            .iter()
            .filter(|s| s.section == section)
            .map(|s| s.position + 1)
            .max()
            .unwrap_or(0);

        let mut scene = Scene::new(document_id, section, title, position);
        scene.checklist = regenerate_checklist(&scene);
        scene.validation = validate_scene(&scene, &[]);
        self.write_scene(OpKind::Create, &scene);

        self.update_document(document_id, |_| {})?;
        Ok(scene)
    }

    /// The single scene update path.
    ///
    /// Applies `f`, then recomputes every derived field: word count,
    /// checklist (preserving checked state by item-id continuity), and
    /// validation status. The owning document's palette and word count are
    /// updated in the same pass.
    pub fn update_scene(&self, id: &str, f: impl FnOnce(&mut Scene)) -> Result<Scene> {
        let mut scene = self
            .store
            .scene(id)
            .ok_or_else(|| StudioError::SceneNotFound(id.to_string()))?;
        let focus_before = scene.sensory_focus;

        f(&mut scene);
        scene.recount_words();
        scene.checklist = regenerate_checklist(&scene);
        let annotations = self.store.annotations_of_scene(&scene.id);
        scene.validation = validate_scene(&scene, &annotations);
        self.write_scene(OpKind::Update, &scene);

        let focus_now = scene.sensory_focus;
        let document_id = scene.document_id.clone();
        let total_words: u32 = self
            .store
            .scenes_of(&document_id)
            .iter()
            .map(|s| s.word_count)
            .sum();
        self.update_document(&document_id, |doc| {
            // A newly tagged sense activates and accumulates; retagging the
            // same sense records nothing.
            if let Some(focus) = focus_now {
                if focus_before != Some(focus) {
                    doc.palette.record(focus);
                }
            }
            doc.word_count = total_words;
        })?;

        Ok(scene)
    }

    /// User-driven checked state on a checklist item.
    pub fn set_checklist_item(&self, scene_id: &str, item_id: &str, checked: bool) -> Result<Scene> {
        self.update_scene(scene_id, |scene| {
            if let Some(item) = scene.checklist.iter_mut().find(|i| i.id == item_id) {
                item.checked = checked;
            }
        })
    }

    /// Move a scene to a new position within its section, renumbering its
    /// section siblings. This is the only operation that renumbers.
    pub fn reorder_scene(&self, id: &str, new_position: u32) -> Result<()> {
        let scene = self
            .store
            .scene(id)
            .ok_or_else(|| StudioError::SceneNotFound(id.to_string()))?;

        let mut siblings: Vec<Scene> = self
            .store
            .scenes_of(&scene.document_id)
            .into_iter()
            .filter(|s| s.section == scene.section)
            .collect();
        let current_index = siblings
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| StudioError::SceneNotFound(id.to_string()))?;

        let moved = siblings.remove(current_index);
        let target = (new_position as usize).min(siblings.len());
        siblings.insert(target, moved);

        for (index, sibling) in siblings.iter_mut().enumerate() {
            if sibling.position != index as u32 {
                sibling.position = index as u32;
                self.write_scene(OpKind::Update, sibling);
            }
        }

        self.update_document(&scene.document_id, |_| {})?;
        Ok(())
    }

    /// Delete a scene and its annotations. Siblings keep their positions.
    pub fn delete_scene(&self, id: &str) -> Result<()> {
        let scene = self
            .store
            .scene(id)
            .ok_or_else(|| StudioError::SceneNotFound(id.to_string()))?;

        for annotation in self.store.annotations_of_scene(id) {
            self.store.delete_annotation(&annotation.id);
            self.store.enqueue(PendingOp::new(
                OpKind::Delete,
                RecordTable::Annotations,
                annotation.id,
                Value::Null,
            ));
        }
        self.store.delete_scene(id);
        self.store.enqueue(PendingOp::new(
            OpKind::Delete,
            RecordTable::Scenes,
            id,
            Value::Null,
        ));

        let document_id = scene.document_id;
        let total_words: u32 = self
            .store
            .scenes_of(&document_id)
            .iter()
            .map(|s| s.word_count)
            .sum();
        self.update_document(&document_id, |doc| {
            doc.word_count = total_words;
        })?;
        Ok(())
    }

    // ========== Annotations ==========

    /// Raise an annotation within a scene. The motif classifier runs here;
    /// an active-tool mention arrives flagged and turns the scene red.
    pub fn add_annotation(
        &self,
        scene_id: &str,
        text: impl Into<String>,
        speaker: impl Into<String>,
        category: AnnotationCategory,
    ) -> Result<Annotation> {
        let scene = self
            .store
            .scene(scene_id)
            .ok_or_else(|| StudioError::SceneNotFound(scene_id.to_string()))?;

        let mut annotation =
            Annotation::new(scene.document_id.clone(), scene_id, text, speaker, category);
        annotation.flagged = flag_mention(&annotation.text).is_flagged();
        self.write_annotation(OpKind::Create, &annotation);

        let annotation_id = annotation.id.clone();
        self.update_scene(scene_id, |s| {
            s.annotation_ids.push(annotation_id);
        })?;

        Ok(annotation)
    }

    /// Link an annotation to the scene that echoes it. The echo must be a
    /// different scene of the same document.
    pub fn link_annotation(&self, annotation_id: &str, echo_scene_id: &str) -> Result<Annotation> {
        let mut annotation = self
            .store
            .annotation(annotation_id)
            .ok_or_else(|| StudioError::AnnotationNotFound(annotation_id.to_string()))?;
        if annotation.scene_id == echo_scene_id {
            return Err(StudioError::SelfEcho);
        }
        if self.store.scene(echo_scene_id).is_none() {
            return Err(StudioError::SceneNotFound(echo_scene_id.to_string()));
        }

        annotation.echo_scene_id = Some(echo_scene_id.to_string());
        self.write_annotation(OpKind::Update, &annotation);

        let id_for_crossref = annotation.id.clone();
        self.update_document(&annotation.document_id, |doc| {
            if !doc.crossref_ids.contains(&id_for_crossref) {
                doc.crossref_ids.push(id_for_crossref);
            }
        })?;

        Ok(annotation)
    }
}
