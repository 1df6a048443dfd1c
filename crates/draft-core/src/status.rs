//! Traffic-light status classification.
//!
//! `validate_scene` is a total function: every combination of inputs maps to
//! a status, in strict priority order. It reads only the scene itself and
//! the annotations raised within it.

use crate::model::{Annotation, Scene, ValidationStatus};

/// Classify a scene's status.
///
/// Priority order:
/// 1. red: logic error (drift awareness without the cutting footnote tone,
///    or any flagged motif mention)
/// 2. yellow: non-empty body, checklist not fully checked
/// 3. green: non-empty body, checklist fully checked
/// 4. yellow: default (e.g. empty body)
pub fn validate_scene(scene: &Scene, annotations: &[Annotation]) -> ValidationStatus {
    let drift_without_cutting = scene.awareness.is_some_and(|a| a.is_drift())
        && !scene.footnote_tone.is_some_and(|t| t.is_sharpest());
    let flagged_mention = annotations.iter().any(|a| a.flagged);
    if drift_without_cutting || flagged_mention {
        return ValidationStatus::Red;
    }

    let has_body = !scene.body.trim().is_empty();
    // An empty checklist means the items have not been generated yet, so the
    // scene cannot count as fully checked.
    let complete = !scene.checklist.is_empty() && scene.checklist.iter().all(|i| i.checked);

    match (has_body, complete) {
        (true, true) => ValidationStatus::Green,
        (true, false) => ValidationStatus::Yellow,
        _ => ValidationStatus::Yellow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::generate_checklist;
    use crate::model::{
        Annotation, AnnotationCategory, AwarenessLevel, FootnoteTone, Scene, Section,
    };

    fn drafted_scene() -> Scene {
        let mut s = Scene::new("doc-1", Section::Turning, "The call", 0);
        s.body = "She let it ring twice before answering.".into();
        s.recount_words();
        s.checklist = generate_checklist(&s);
        s
    }

    #[test]
    fn test_drift_without_cutting_tone_is_red() {
        let mut s = drafted_scene();
        s.awareness = Some(AwarenessLevel::HighDrift);
        s.footnote_tone = Some(FootnoteTone::Wry);
        s.checklist = generate_checklist(&s);
        // Even a fully checked checklist cannot outrank the logic error.
        for item in &mut s.checklist {
            item.checked = true;
        }
        assert_eq!(validate_scene(&s, &[]), ValidationStatus::Red);
    }

    #[test]
    fn test_drift_with_missing_tone_is_red() {
        let mut s = drafted_scene();
        s.awareness = Some(AwarenessLevel::LowDrift);
        s.footnote_tone = None;
        assert_eq!(validate_scene(&s, &[]), ValidationStatus::Red);
    }

    #[test]
    fn test_drift_with_cutting_tone_is_not_red() {
        let mut s = drafted_scene();
        s.awareness = Some(AwarenessLevel::HighDrift);
        s.footnote_tone = Some(FootnoteTone::Cutting);
        s.checklist = generate_checklist(&s);
        assert_eq!(validate_scene(&s, &[]), ValidationStatus::Yellow);
    }

    #[test]
    fn test_flagged_mention_is_red() {
        let s = drafted_scene();
        let mut ann = Annotation::new("doc-1", s.id.clone(), "wearing it again", "June", AnnotationCategory::Motif);
        ann.flagged = true;
        assert_eq!(validate_scene(&s, &[ann]), ValidationStatus::Red);
    }

    #[test]
    fn test_unflagged_mentions_do_not_trip_red() {
        let s = drafted_scene();
        let ann = Annotation::new("doc-1", s.id.clone(), "the pull of it", "June", AnnotationCategory::Motif);
        assert_eq!(validate_scene(&s, &[ann]), ValidationStatus::Yellow);
    }

    #[test]
    fn test_body_with_incomplete_checklist_is_yellow() {
        let s = drafted_scene();
        assert_eq!(validate_scene(&s, &[]), ValidationStatus::Yellow);
    }

    #[test]
    fn test_body_with_complete_checklist_is_green() {
        let mut s = drafted_scene();
        for item in &mut s.checklist {
            item.checked = true;
        }
        assert_eq!(validate_scene(&s, &[]), ValidationStatus::Green);
    }

    #[test]
    fn test_empty_body_defaults_to_yellow() {
        let mut s = Scene::new("doc-1", Section::Before, "Untitled", 0);
        s.checklist = generate_checklist(&s);
        for item in &mut s.checklist {
            item.checked = true;
        }
        assert_eq!(validate_scene(&s, &[]), ValidationStatus::Yellow);
    }

    #[test]
    fn test_empty_checklist_with_body_is_yellow() {
        let mut s = drafted_scene();
        s.checklist.clear();
        assert_eq!(validate_scene(&s, &[]), ValidationStatus::Yellow);
    }
}
