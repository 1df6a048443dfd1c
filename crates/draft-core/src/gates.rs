//! Document-wide gates.
//!
//! Both gates are pure predicates over the whole document's state, read many
//! scenes/annotations and mutate nothing. The section-advance gate guards
//! entry into the full-sensory-coverage phase; the final-review gate is
//! recomputed on demand when the review screen opens.

use crate::model::{Annotation, AnnotationCategory, Document, SensoryPalette};

/// Section-advance gate: every tracked sense activated at least once.
///
/// Only the activation booleans matter here; strength tiers are ignored.
pub fn sensory_coverage_met(palette: &SensoryPalette) -> bool {
    palette.all_activated()
}

/// Final-review gate.
///
/// Every secondary-voice annotation anywhere in the document must carry an
/// echo link, AND every annotation spoken by either half of the document's
/// voice pair must likewise be linked. Logical AND of both conditions.
pub fn review_ready(document: &Document, annotations: &[Annotation]) -> bool {
    let secondary_linked = annotations
        .iter()
        .filter(|a| a.category == AnnotationCategory::SecondaryVoice)
        .all(|a| a.echo_scene_id.is_some());

    let pair_linked = annotations
        .iter()
        .filter(|a| document.voice_pair.contains(&a.speaker))
        .all(|a| a.echo_scene_id.is_some());

    secondary_linked && pair_linked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SensoryFocus, VoicePair};

    fn document() -> Document {
        Document::new("user-1", "Tidewater", "The Lake House", VoicePair::new("June", "Junie"))
    }

    #[test]
    fn test_coverage_fails_with_four_of_five_senses() {
        let mut palette = SensoryPalette::default();
        for focus in [
            SensoryFocus::Sight,
            SensoryFocus::Sound,
            SensoryFocus::Smell,
            SensoryFocus::Taste,
        ] {
            palette.record(focus);
        }
        assert!(!sensory_coverage_met(&palette));

        // Activating the fifth sense opens the gate, one occurrence is enough.
        palette.record(SensoryFocus::Touch);
        assert!(sensory_coverage_met(&palette));
    }

    #[test]
    fn test_coverage_ignores_strength_tiers() {
        let mut palette = SensoryPalette::default();
        for focus in SensoryFocus::ALL {
            palette.record(focus);
        }
        // All tiers are still weak; the gate only reads activation.
        assert!(sensory_coverage_met(&palette));
    }

    #[test]
    fn test_unlinked_secondary_voice_blocks_review() {
        let doc = document();
        let mut ann = Annotation::new(
            doc.id.clone(),
            "scene-1",
            "you never said it out loud",
            "Marlowe",
            AnnotationCategory::SecondaryVoice,
        );
        assert!(!review_ready(&doc, std::slice::from_ref(&ann)));

        ann.echo_scene_id = Some("scene-4".into());
        assert!(review_ready(&doc, &[ann]));
    }

    #[test]
    fn test_unlinked_pair_speaker_blocks_review() {
        let doc = document();
        // An aside spoken by half of the voice pair still needs its echo.
        let mut ann = Annotation::new(
            doc.id.clone(),
            "scene-2",
            "I wanted to stay under",
            "Junie",
            AnnotationCategory::Aside,
        );
        assert!(!review_ready(&doc, std::slice::from_ref(&ann)));

        ann.echo_scene_id = Some("scene-3".into());
        assert!(review_ready(&doc, &[ann]));
    }

    #[test]
    fn test_gate_is_conjunction_of_both_conditions() {
        let doc = document();
        let mut secondary = Annotation::new(
            doc.id.clone(),
            "scene-1",
            "she won't say it",
            "Marlowe",
            AnnotationCategory::SecondaryVoice,
        );
        secondary.echo_scene_id = Some("scene-2".into());

        let pair_aside = Annotation::new(
            doc.id.clone(),
            "scene-2",
            "it was never about the water",
            "June",
            AnnotationCategory::Aside,
        );

        // Secondary condition holds, pair condition does not.
        assert!(!review_ready(&doc, &[secondary.clone(), pair_aside.clone()]));

        let mut linked = pair_aside;
        linked.echo_scene_id = Some("scene-5".into());
        assert!(review_ready(&doc, &[secondary, linked]));
    }

    #[test]
    fn test_review_ready_with_no_annotations() {
        // Vacuously true: nothing requires a link.
        let doc = document();
        assert!(review_ready(&doc, &[]));
    }
}
