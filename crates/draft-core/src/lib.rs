//! draft-core: record types and the validation engine for the manuscript
//! editor.
//!
//! This crate provides:
//! - The shared entity graph (Document, Scene, Annotation)
//! - Checklist generation from a scene's classification fields
//! - Traffic-light status classification
//! - Document-wide gates (sensory coverage, final review)
//!
//! Everything here is pure and synchronous. The validation functions are
//! total over their input domain: they never fail, they classify.

pub mod checklist;
pub mod gates;
pub mod model;
pub mod motif;
pub mod status;

pub use checklist::{generate_checklist, regenerate_checklist};
pub use gates::{review_ready, sensory_coverage_met};
pub use model::{
    Annotation, AnnotationCategory, AwarenessLevel, ChecklistCategory, ChecklistItem, Document,
    DraftStage, FootnoteTone, IdentityKind, Scene, Section, SenseRecord, SenseTier, SensoryFocus,
    SensoryPalette, ValidationStatus, VoicePair,
};
pub use motif::{MentionUse, flag_mention};
pub use status::validate_scene;
