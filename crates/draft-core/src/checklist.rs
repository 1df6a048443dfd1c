//! Checklist generation.
//!
//! A scene's checklist is fully determined by its own classification fields
//! and section tag, never by sibling state. Generation never checks items;
//! checked state is user-driven and carried across regeneration by item-id
//! continuity.

use crate::model::{
    ChecklistCategory, ChecklistItem, IdentityKind, Scene, Section, SensoryFocus,
};

/// Recovery-moment label for each tracked sense.
fn recovery_label(focus: SensoryFocus) -> &'static str {
    match focus {
        SensoryFocus::Sight => "A moment of seeing clearly again is described",
        SensoryFocus::Sound => "A sound coming back into focus is described",
        SensoryFocus::Smell => "A remembered smell returning is described",
        SensoryFocus::Taste => "A taste registering again is described",
        SensoryFocus::Touch => "A moment of touch landing is described",
    }
}

/// One required item per narrative phase.
fn section_label(section: Section) -> &'static str {
    match section {
        Section::Before => "Ground the reader in the ordinary world",
        Section::Undertow => "Name what is pulling underneath the surface",
        Section::Turning => "Show the moment the cost becomes visible",
        Section::Reawakening => "Let a returning sense carry the scene",
        Section::Accord => "Close the distance between the two voices",
    }
}

/// Generate a fresh, unchecked checklist for a scene.
///
/// Deterministic: two calls on an unchanged scene produce identical item-id
/// sets, in the same order.
pub fn generate_checklist(scene: &Scene) -> Vec<ChecklistItem> {
    let mut items = Vec::new();

    match scene.identity {
        Some(IdentityKind::PrimaryIdentity) => {
            items.push(ChecklistItem::new(
                "identity-voice-consistency",
                "Voice stays consistent with the primary identity",
                ChecklistCategory::Identity,
            ));
            items.push(ChecklistItem::new(
                "identity-core-insight",
                "Core insight is tagged in the margin",
                ChecklistCategory::Identity,
            ));
        }
        Some(IdentityKind::SecondaryIssue) => {
            items.push(ChecklistItem::new(
                "identity-issue-visible",
                "Secondary issue is clearly represented",
                ChecklistCategory::Identity,
            ));
        }
        None => {}
    }

    if let Some(focus) = scene.sensory_focus {
        items.push(ChecklistItem::new(
            format!("sense-{}-recovery", focus.slug()),
            recovery_label(focus),
            ChecklistCategory::Sensory,
        ));
    }

    // Also enforced as a hard rule in classification, not just a reminder.
    if scene.awareness.is_some_and(|a| a.is_drift()) {
        items.push(ChecklistItem::new(
            "awareness-cutting-tone",
            "Footnote tone is marked cutting",
            ChecklistCategory::Awareness,
        ));
    }

    items.push(ChecklistItem::new(
        format!("section-{}", scene.section.slug()),
        section_label(scene.section),
        ChecklistCategory::Section,
    ));

    items
}

/// Regenerate a scene's checklist, preserving user-checked state wherever the
/// item id still applies. Items whose producing rule no longer applies drop
/// out; newly applicable items arrive unchecked.
pub fn regenerate_checklist(scene: &Scene) -> Vec<ChecklistItem> {
    let mut items = generate_checklist(scene);
    for item in &mut items {
        if let Some(old) = scene.checklist.iter().find(|o| o.id == item.id) {
            item.checked = old.checked;
        }
    }
    items
}
