//! Lexical classification of motif mentions.
//!
//! Quoted passages that mention the tracked motif are classified by word
//! lists: draw/anchor wording is valid usage, tool/wearing wording is
//! invalid. Tool wording takes priority when both appear. Only the invalid
//! classification sets the `flagged` bit that feeds the red status rule.

/// Words that read the motif as a draw or anchor (valid usage).
const DRAW_WORDS: &[&str] = &[
    "desire", "desired", "desires", "longing", "longed", "pull", "pulled", "pulls", "pulling",
    "ache", "ached", "aching", "drawn", "draw", "draws", "want", "wanted", "wants", "craving",
    "craved", "anchor", "anchored",
];

/// Words that read the motif as an active tool (invalid usage).
const TOOL_WORDS: &[&str] = &[
    "wearing", "wears", "wore", "worn", "wield", "wields", "wielded", "wielding", "use", "uses",
    "used", "using", "strapped", "straps", "brandished", "brandishing", "armor", "armored",
];

/// How a quoted passage uses the tracked motif.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionUse {
    /// Valid: the motif pulls at the narrator.
    Draw,
    /// Invalid: the motif is wielded or worn.
    ActiveTool,
    /// Neither word set matched.
    Unclear,
}

impl MentionUse {
    /// Only active-tool usage sets the flagged bit.
    pub fn is_flagged(self) -> bool {
        matches!(self, MentionUse::ActiveTool)
    }
}

/// Classify a quoted passage's motif usage.
///
/// Matching is case-insensitive on whole words. Tool words take priority
/// over draw words when both are present.
pub fn flag_mention(text: &str) -> MentionUse {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| TOOL_WORDS.contains(w)) {
        return MentionUse::ActiveTool;
    }
    if words.iter().any(|w| DRAW_WORDS.contains(w)) {
        return MentionUse::Draw;
    }
    MentionUse::Unclear
}
