//! Wire rows for the remote store and the mapping layer between them and
//! the model types.
//!
//! Remote data enters the system in exactly one place (the pull path) and
//! leaves in exactly one place (the push path); both go through the
//! conversions here, so nothing else in the core ever sees the wire shape.
//! The checklist and the sensory palette travel as JSON-encoded text
//! columns; a payload that fails to decode maps to the empty value rather
//! than an error, and the validation engine regenerates on the next
//! metadata change.

use draft_core::model::{
    Annotation, AnnotationCategory, ChecklistItem, Document, DraftStage, IdentityKind, Scene,
    Section, SensoryFocus, SensoryPalette, ValidationStatus, VoicePair,
};
use draft_core::model::{AwarenessLevel, FootnoteTone};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Row shape of the `documents` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub mask_title: bool,
    pub real_name: String,
    pub current_section: Section,
    pub word_count: u32,
    pub voice_a: String,
    pub voice_b: String,
    /// JSON-encoded sensory palette.
    pub palette_json: String,
    pub crossref_ids: Vec<String>,
    pub ending_unlocked: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Row shape of the `scenes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRow {
    pub id: String,
    pub document_id: String,
    pub order_index: u32,
    pub title: String,
    pub section: Section,
    pub chapter: Option<String>,
    pub body: String,
    pub footnote: String,
    pub word_count: u32,
    pub identity: Option<IdentityKind>,
    pub sensory_focus: Option<SensoryFocus>,
    pub awareness: Option<AwarenessLevel>,
    pub footnote_tone: Option<FootnoteTone>,
    pub stage: DraftStage,
    pub validation: ValidationStatus,
    /// JSON-encoded checklist.
    pub checklist_json: String,
    pub annotation_ids: Vec<String>,
}

/// Row shape of the `annotations` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub id: String,
    pub document_id: String,
    pub scene_id: String,
    pub text: String,
    pub speaker: String,
    pub category: AnnotationCategory,
    /// Optional link to the scene that echoes this annotation.
    pub echo_scene_id: Option<String>,
    pub flagged: bool,
    pub created_at: u64,
}

// ========== Codecs ==========

/// Encode a checklist for the JSON text column.
pub fn encode_checklist(items: &[ChecklistItem]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a checklist column. An unparseable payload is an empty checklist.
pub fn decode_checklist(payload: &str) -> Vec<ChecklistItem> {
    match serde_json::from_str(payload) {
        Ok(items) => items,
        Err(e) => {
            warn!("Unparseable checklist payload, treating as empty: {}", e);
            Vec::new()
        }
    }
}

/// Encode a sensory palette for the JSON text column.
pub fn encode_palette(palette: &SensoryPalette) -> String {
    serde_json::to_string(palette).unwrap_or_else(|_| "{}".to_string())
}

/// Decode a palette column. An unparseable payload is an empty palette.
pub fn decode_palette(payload: &str) -> SensoryPalette {
    match serde_json::from_str(payload) {
        Ok(palette) => palette,
        Err(e) => {
            warn!("Unparseable palette payload, treating as empty: {}", e);
            SensoryPalette::default()
        }
    }
}

// ========== Mapping ==========

pub fn document_to_row(document: &Document) -> DocumentRow {
    DocumentRow {
        id: document.id.clone(),
        user_id: document.user_id.clone(),
        title: document.title.clone(),
        mask_title: document.mask_title,
        real_name: document.real_name.clone(),
        current_section: document.current_section,
        word_count: document.word_count,
        voice_a: document.voice_pair.first.clone(),
        voice_b: document.voice_pair.second.clone(),
        palette_json: encode_palette(&document.palette),
        crossref_ids: document.crossref_ids.clone(),
        ending_unlocked: document.ending_unlocked,
        created_at: document.created_at,
        updated_at: document.updated_at,
    }
}

pub fn document_from_row(row: DocumentRow) -> Document {
    Document {
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        mask_title: row.mask_title,
        real_name: row.real_name,
        current_section: row.current_section,
        word_count: row.word_count,
        voice_pair: VoicePair::new(row.voice_a, row.voice_b),
        palette: decode_palette(&row.palette_json),
        crossref_ids: row.crossref_ids,
        ending_unlocked: row.ending_unlocked,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub fn scene_to_row(scene: &Scene) -> SceneRow {
    SceneRow {
        id: scene.id.clone(),
        document_id: scene.document_id.clone(),
        order_index: scene.position,
        title: scene.title.clone(),
        section: scene.section,
        chapter: scene.chapter.clone(),
        body: scene.body.clone(),
        footnote: scene.footnote.clone(),
        word_count: scene.word_count,
        identity: scene.identity,
        sensory_focus: scene.sensory_focus,
        awareness: scene.awareness,
        footnote_tone: scene.footnote_tone,
        stage: scene.stage,
        validation: scene.validation,
        checklist_json: encode_checklist(&scene.checklist),
        annotation_ids: scene.annotation_ids.clone(),
    }
}

pub fn scene_from_row(row: SceneRow) -> Scene {
    Scene {
        id: row.id,
        document_id: row.document_id,
        position: row.order_index,
        title: row.title,
        section: row.section,
        chapter: row.chapter,
        body: row.body,
        footnote: row.footnote,
        word_count: row.word_count,
        identity: row.identity,
        sensory_focus: row.sensory_focus,
        awareness: row.awareness,
        footnote_tone: row.footnote_tone,
        stage: row.stage,
        validation: row.validation,
        checklist: decode_checklist(&row.checklist_json),
        annotation_ids: row.annotation_ids,
    }
}

pub fn annotation_to_row(annotation: &Annotation) -> AnnotationRow {
    AnnotationRow {
        id: annotation.id.clone(),
        document_id: annotation.document_id.clone(),
        scene_id: annotation.scene_id.clone(),
        text: annotation.text.clone(),
        speaker: annotation.speaker.clone(),
        category: annotation.category,
        echo_scene_id: annotation.echo_scene_id.clone(),
        flagged: annotation.flagged,
        created_at: annotation.created_at,
    }
}

pub fn annotation_from_row(row: AnnotationRow) -> Annotation {
    Annotation {
        id: row.id,
        document_id: row.document_id,
        scene_id: row.scene_id,
        text: row.text,
        speaker: row.speaker,
        category: row.category,
        echo_scene_id: row.echo_scene_id,
        flagged: row.flagged,
        created_at: row.created_at,
    }
}
