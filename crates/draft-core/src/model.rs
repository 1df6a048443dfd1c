//! The shared entity graph: Document, Scene, Annotation.
//!
//! Records are plain serde structs with public fields. All mutation goes
//! through the `Studio` in draft-sync, which stamps timestamps and re-runs
//! validation; nothing in this module performs I/O.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use web_time::{SystemTime, UNIX_EPOCH};

/// Generate a fresh record identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Ordered narrative phases of a manuscript.
///
/// `Reawakening` is the phase that requires full sensory coverage before a
/// document may advance into it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    #[default]
    Before,
    Undertow,
    Turning,
    Reawakening,
    Accord,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Before,
        Section::Undertow,
        Section::Turning,
        Section::Reawakening,
        Section::Accord,
    ];

    /// The phase after this one, or `None` at the end of the arc.
    pub fn next(self) -> Option<Section> {
        let idx = Section::ALL.iter().position(|s| *s == self)?;
        Section::ALL.get(idx + 1).copied()
    }

    pub fn slug(self) -> &'static str {
        match self {
            Section::Before => "before",
            Section::Undertow => "undertow",
            Section::Turning => "turning",
            Section::Reawakening => "reawakening",
            Section::Accord => "accord",
        }
    }
}

/// How a scene relates to the narrator's identity work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityKind {
    PrimaryIdentity,
    SecondaryIssue,
}

/// The sense a scene centers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensoryFocus {
    Sight,
    Sound,
    Smell,
    Taste,
    Touch,
}

impl SensoryFocus {
    pub const ALL: [SensoryFocus; 5] = [
        SensoryFocus::Sight,
        SensoryFocus::Sound,
        SensoryFocus::Smell,
        SensoryFocus::Taste,
        SensoryFocus::Touch,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            SensoryFocus::Sight => "sight",
            SensoryFocus::Sound => "sound",
            SensoryFocus::Smell => "smell",
            SensoryFocus::Taste => "taste",
            SensoryFocus::Touch => "touch",
        }
    }
}

/// How present the narrator is on the page.
///
/// `LowDrift` and `HighDrift` are the two drift values: a scene carrying
/// either must mark its footnote with the cutting tone, or it classifies red.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AwarenessLevel {
    Present,
    Wavering,
    LowDrift,
    HighDrift,
}

impl AwarenessLevel {
    pub fn is_drift(self) -> bool {
        matches!(self, AwarenessLevel::LowDrift | AwarenessLevel::HighDrift)
    }
}

/// Register of a scene's side-annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FootnoteTone {
    Gentle,
    Wry,
    Pointed,
    Cutting,
}

impl FootnoteTone {
    /// The sharpest tone. Drift scenes are required to carry it.
    pub fn is_sharpest(self) -> bool {
        matches!(self, FootnoteTone::Cutting)
    }
}

/// Lifecycle of a scene's draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DraftStage {
    #[default]
    Sketch,
    Draft,
    Polished,
}

/// Derived traffic-light status of a scene. Never set directly by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Red,
    #[default]
    Yellow,
    Green,
}

/// Which rule family produced a checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChecklistCategory {
    Identity,
    Sensory,
    Awareness,
    Section,
}

/// A single required follow-up on a scene.
///
/// Item ids are deterministic slugs so user-checked state survives
/// regeneration whenever the rule that produced the item is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub label: String,
    pub checked: bool,
    pub category: ChecklistCategory,
}

impl ChecklistItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>, category: ChecklistCategory) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            checked: false,
            category,
        }
    }
}

/// Strength of one sense's presence across a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenseTier {
    Weak,
    Moderate,
    Strong,
}

/// Occurrence thresholds for raising a sense's tier.
const MODERATE_AT: u32 = 2;
const STRONG_AT: u32 = 5;

/// Per-sense coverage record inside a document's palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SenseRecord {
    /// Set the first time any scene is tagged with this sense. Sticky:
    /// deleting the scene later does not clear it.
    pub activated: bool,
    pub occurrences: u32,
}

impl SenseRecord {
    pub fn tier(self) -> SenseTier {
        if self.occurrences >= STRONG_AT {
            SenseTier::Strong
        } else if self.occurrences >= MODERATE_AT {
            SenseTier::Moderate
        } else {
            SenseTier::Weak
        }
    }
}

/// The sensory-coverage tracker embedded in a Document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SensoryPalette {
    pub sight: SenseRecord,
    pub sound: SenseRecord,
    pub smell: SenseRecord,
    pub taste: SenseRecord,
    pub touch: SenseRecord,
}

impl SensoryPalette {
    pub fn get(&self, focus: SensoryFocus) -> SenseRecord {
        match focus {
            SensoryFocus::Sight => self.sight,
            SensoryFocus::Sound => self.sound,
            SensoryFocus::Smell => self.smell,
            SensoryFocus::Taste => self.taste,
            SensoryFocus::Touch => self.touch,
        }
    }

    /// Record one scene tagging of `focus`: activates the sense and
    /// accumulates its occurrence count.
    pub fn record(&mut self, focus: SensoryFocus) {
        let record = match focus {
            SensoryFocus::Sight => &mut self.sight,
            SensoryFocus::Sound => &mut self.sound,
            SensoryFocus::Smell => &mut self.smell,
            SensoryFocus::Taste => &mut self.taste,
            SensoryFocus::Touch => &mut self.touch,
        };
        record.activated = true;
        record.occurrences += 1;
    }

    /// True once every tracked sense has been activated at least once.
    pub fn all_activated(&self) -> bool {
        SensoryFocus::ALL.iter().all(|f| self.get(*f).activated)
    }
}

/// The dual-voice identity pair embedded in a Document.
///
/// Annotations spoken by either half are held to the echo-link requirement
/// of the final-review gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VoicePair {
    pub first: String,
    pub second: String,
}

impl VoicePair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn contains(&self, speaker: &str) -> bool {
        speaker == self.first || speaker == self.second
    }
}

/// The manuscript-level aggregate, owned by exactly one user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// When set, the UI displays `title` in place of `real_name`.
    pub mask_title: bool,
    pub real_name: String,
    pub current_section: Section,
    /// Derived: sum of scene word counts.
    pub word_count: u32,
    pub voice_pair: VoicePair,
    pub palette: SensoryPalette,
    /// Annotation ids raised anywhere in the document that carry echo links.
    pub crossref_ids: Vec<String>,
    /// Stored "final gate unlocked" flag, set once sensory coverage is met.
    pub ending_unlocked: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Document {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        real_name: impl Into<String>,
        voice_pair: VoicePair,
    ) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            user_id: user_id.into(),
            title: title.into(),
            mask_title: false,
            real_name: real_name.into(),
            current_section: Section::Before,
            word_count: 0,
            voice_pair,
            palette: SensoryPalette::default(),
            crossref_ids: Vec::new(),
            ending_unlocked: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stamp a new `updated_at`. Monotonically non-decreasing: the sync
    /// engine's conflict policy depends on this never moving backwards.
    pub fn touch(&mut self) {
        self.updated_at = now_ms().max(self.updated_at);
    }
}

/// An ordered scene within a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub document_id: String,
    /// Position within the scene's section. Unique per section; only the
    /// explicit reorder operation renumbers siblings.
    pub position: u32,
    pub title: String,
    pub section: Section,
    pub chapter: Option<String>,
    pub body: String,
    /// Free-text side-annotation.
    pub footnote: String,
    /// Derived from `body`.
    pub word_count: u32,
    pub identity: Option<IdentityKind>,
    pub sensory_focus: Option<SensoryFocus>,
    pub awareness: Option<AwarenessLevel>,
    pub footnote_tone: Option<FootnoteTone>,
    pub stage: DraftStage,
    /// Derived traffic-light status; recomputed whenever a feeding field
    /// changes, never set by the UI.
    pub validation: ValidationStatus,
    pub checklist: Vec<ChecklistItem>,
    /// Back-references to annotations raised within this scene.
    pub annotation_ids: Vec<String>,
}

impl Scene {
    pub fn new(
        document_id: impl Into<String>,
        section: Section,
        title: impl Into<String>,
        position: u32,
    ) -> Self {
        Self {
            id: new_id(),
            document_id: document_id.into(),
            position,
            title: title.into(),
            section,
            chapter: None,
            body: String::new(),
            footnote: String::new(),
            word_count: 0,
            identity: None,
            sensory_focus: None,
            awareness: None,
            footnote_tone: None,
            stage: DraftStage::Sketch,
            validation: ValidationStatus::Yellow,
            checklist: Vec::new(),
            annotation_ids: Vec::new(),
        }
    }

    /// Recompute the derived word count from the body.
    pub fn recount_words(&mut self) {
        self.word_count = self.body.split_whitespace().count() as u32;
    }
}

/// Category of a quoted annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationCategory {
    SecondaryVoice,
    Motif,
    Aside,
}

/// A quoted, speaker-tagged excerpt tied to one scene.
///
/// `echo_scene_id` links the excerpt to a *different* scene that echoes it;
/// the final-review gate requires this link on secondary-voice annotations
/// and on anything spoken by the document's voice pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub document_id: String,
    pub scene_id: String,
    pub text: String,
    pub speaker: String,
    pub category: AnnotationCategory,
    pub echo_scene_id: Option<String>,
    /// Set by the motif classifier when the quoted text reads as active-tool
    /// usage. Feeds the red classification; never set by the UI.
    pub flagged: bool,
    pub created_at: u64,
}

impl Annotation {
    pub fn new(
        document_id: impl Into<String>,
        scene_id: impl Into<String>,
        text: impl Into<String>,
        speaker: impl Into<String>,
        category: AnnotationCategory,
    ) -> Self {
        Self {
            id: new_id(),
            document_id: document_id.into(),
            scene_id: scene_id.into(),
            text: text.into(),
            speaker: speaker.into(),
            category,
            echo_scene_id: None,
            flagged: false,
            created_at: now_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_is_monotonic() {
        let mut doc = Document::new("user-1", "Tidewater", "The Lake House", VoicePair::default());

        // Simulate a clock that ran ahead of now_ms()
        doc.updated_at = u64::MAX - 1;
        doc.touch();
        assert_eq!(doc.updated_at, u64::MAX - 1);

        // Normal case: touch moves the timestamp forward
        let mut doc = Document::new("user-1", "Tidewater", "The Lake House", VoicePair::default());
        doc.updated_at = 0;
        doc.touch();
        assert!(doc.updated_at > 0);
    }

    #[test]
    fn test_scene_word_count() {
        let mut scene = Scene::new("doc-1", Section::Before, "Cold open", 0);
        scene.body = "the water was  colder\nthan remembered".into();
        scene.recount_words();
        assert_eq!(scene.word_count, 6);

        scene.body.clear();
        scene.recount_words();
        assert_eq!(scene.word_count, 0);
    }

    #[test]
    fn test_section_ordering_and_next() {
        assert!(Section::Before < Section::Undertow);
        assert!(Section::Reawakening < Section::Accord);
        assert_eq!(Section::Before.next(), Some(Section::Undertow));
        assert_eq!(Section::Accord.next(), None);
    }

    #[test]
    fn test_palette_activation_and_tiers() {
        let mut palette = SensoryPalette::default();
        assert!(!palette.all_activated());

        palette.record(SensoryFocus::Sound);
        assert!(palette.sound.activated);
        assert_eq!(palette.sound.tier(), SenseTier::Weak);

        palette.record(SensoryFocus::Sound);
        assert_eq!(palette.sound.tier(), SenseTier::Moderate);

        for _ in 0..3 {
            palette.record(SensoryFocus::Sound);
        }
        assert_eq!(palette.sound.occurrences, 5);
        assert_eq!(palette.sound.tier(), SenseTier::Strong);

        // Only sound activated so far
        assert!(!palette.all_activated());
        for focus in SensoryFocus::ALL {
            palette.record(focus);
        }
        assert!(palette.all_activated());
    }

    #[test]
    fn test_voice_pair_contains() {
        let pair = VoicePair::new("June", "Junie");
        assert!(pair.contains("June"));
        assert!(pair.contains("Junie"));
        assert!(!pair.contains("Marlowe"));
    }

    #[test]
    fn test_classification_serde_names() {
        let json = serde_json::to_string(&IdentityKind::PrimaryIdentity).unwrap();
        assert_eq!(json, "\"primary-identity\"");

        let json = serde_json::to_string(&IdentityKind::SecondaryIssue).unwrap();
        assert_eq!(json, "\"secondary-issue\"");

        let json = serde_json::to_string(&AwarenessLevel::HighDrift).unwrap();
        assert_eq!(json, "\"high-drift\"");

        let json = serde_json::to_string(&ValidationStatus::Red).unwrap();
        assert_eq!(json, "\"red\"");

        let json = serde_json::to_string(&AnnotationCategory::SecondaryVoice).unwrap();
        assert_eq!(json, "\"secondary-voice\"");
    }
}
