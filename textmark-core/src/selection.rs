//! Deciding which raw text selections are worth recording.

use once_cell::sync::Lazy;
use regex::Regex;

/// Zoom above which a single word of three or more characters is enough.
pub const HIGH_ZOOM_THRESHOLD: f32 = 2.0;

static WORD_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w{3,}").expect("valid word-run regex"));
static WORD_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w").expect("valid word regex"));

/// A finished selection as reported by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSelection {
    pub text: String,
    pub collapsed: bool,
    pub inside_text_layer: bool,
    pub spans_multiple_containers: bool,
}

pub fn is_meaningful(text: &str, zoom: f32, spans_multiple_containers: bool) -> bool {
    is_meaningful_at(text, zoom, spans_multiple_containers, HIGH_ZOOM_THRESHOLD)
}

/// Rules apply in order; the first that matches decides.
pub fn is_meaningful_at(
    text: &str,
    zoom: f32,
    spans_multiple_containers: bool,
    high_zoom_threshold: f32,
) -> bool {
    let length = text.chars().count();
    if length == 0 {
        return false;
    }
    if zoom > high_zoom_threshold && length >= 3 && WORD_RUN.is_match(text) {
        return true;
    }
    // A lone character never passes here, word character or not.
    if length >= 2 && WORD_CHAR.is_match(text) {
        return true;
    }
    if text.chars().filter(|c| !c.is_whitespace()).count() >= 2 {
        return true;
    }
    spans_multiple_containers
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Nothing selected, or only whitespace.
    Ignored,
    /// Selection lies outside every text layer.
    OutsideTextLayer,
    /// Likely an accidental whole-page drag; the caller clears it.
    TooLarge,
    Rejected,
    Accepted(String),
}

impl SelectionOutcome {
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::TooLarge => Some("Selection too large. Please select smaller text portions."),
            Self::Rejected => Some("Try selecting more meaningful text"),
            Self::Accepted(_) => Some("Text marked successfully!"),
            Self::Ignored | Self::OutsideTextLayer => None,
        }
    }

    /// Whether the caller should drop its active selection.
    pub fn clears_selection(&self) -> bool {
        matches!(self, Self::TooLarge | Self::Rejected | Self::Accepted(_))
    }
}

/// Caller-side screening in front of the validator.
#[derive(Debug, Clone, Copy)]
pub struct SelectionGate {
    pub max_chars: usize,
    pub high_zoom_threshold: f32,
}

impl Default for SelectionGate {
    fn default() -> Self {
        Self {
            max_chars: 2000,
            high_zoom_threshold: HIGH_ZOOM_THRESHOLD,
        }
    }
}

impl SelectionGate {
    pub fn evaluate(&self, raw: &RawSelection, zoom: f32) -> SelectionOutcome {
        if raw.collapsed {
            return SelectionOutcome::Ignored;
        }
        let trimmed = raw.text.trim();
        let length = trimmed.chars().count();
        if length == 0 {
            return SelectionOutcome::Ignored;
        }
        if length >= self.max_chars {
            return SelectionOutcome::TooLarge;
        }
        if !raw.inside_text_layer {
            return SelectionOutcome::OutsideTextLayer;
        }
        if is_meaningful_at(
            trimmed,
            zoom,
            raw.spans_multiple_containers,
            self.high_zoom_threshold,
        ) {
            SelectionOutcome::Accepted(trimmed.to_string())
        } else {
            SelectionOutcome::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str) -> RawSelection {
        RawSelection {
            text: text.to_string(),
            collapsed: false,
            inside_text_layer: true,
            spans_multiple_containers: false,
        }
    }

    #[test]
    fn empty_text_is_never_meaningful() {
        for zoom in [0.5, 1.0, 4.0] {
            assert!(!is_meaningful("", zoom, false));
            assert!(!is_meaningful("", zoom, true));
        }
    }

    #[test]
    fn two_characters_are_enough_at_normal_zoom() {
        assert!(is_meaningful("ab", 1.0, false));
        assert!(is_meaningful("a1", 0.5, false));
        assert!(!is_meaningful("a", 1.0, false));
    }

    #[test]
    fn two_visible_symbols_are_enough() {
        assert!(is_meaningful("--", 1.0, false));
        assert!(is_meaningful("§ ¶", 1.0, false));
        assert!(!is_meaningful("- ", 1.0, false));
    }

    #[test]
    fn high_zoom_accepts_single_words() {
        assert!(is_meaningful("cat", 2.5, false));
        assert!(!is_meaningful("a", 2.5, false));
    }

    #[test]
    fn short_runs_do_not_trigger_the_high_zoom_rule() {
        // Falls through to the normal-zoom rules, which still accept it.
        assert!(is_meaningful("a b", 3.0, false));
        assert!(!is_meaningful("x", 3.0, false));
    }

    #[test]
    fn crossing_containers_rescues_single_characters() {
        assert!(is_meaningful("a", 1.0, true));
        assert!(!is_meaningful("·", 1.0, false));
        assert!(is_meaningful("·", 1.0, true));
    }

    #[test]
    fn gate_trims_before_validating() {
        let gate = SelectionGate::default();
        assert_eq!(
            gate.evaluate(&raw("  quote  "), 1.0),
            SelectionOutcome::Accepted("quote".to_string())
        );
        assert_eq!(gate.evaluate(&raw(" \n "), 1.0), SelectionOutcome::Ignored);
    }

    #[test]
    fn gate_rejects_oversized_selections() {
        let gate = SelectionGate::default();
        let outcome = gate.evaluate(&raw(&"x".repeat(2000)), 1.0);
        assert_eq!(outcome, SelectionOutcome::TooLarge);
        assert!(outcome.clears_selection());
        assert!(outcome.hint().is_some());

        assert!(matches!(
            gate.evaluate(&raw(&"x".repeat(1999)), 1.0),
            SelectionOutcome::Accepted(_)
        ));
    }

    #[test]
    fn gate_ignores_collapsed_and_foreign_selections() {
        let gate = SelectionGate::default();
        let mut collapsed = raw("text");
        collapsed.collapsed = true;
        assert_eq!(gate.evaluate(&collapsed, 1.0), SelectionOutcome::Ignored);

        let mut outside = raw("text");
        outside.inside_text_layer = false;
        assert_eq!(
            gate.evaluate(&outside, 1.0),
            SelectionOutcome::OutsideTextLayer
        );
        assert!(!SelectionOutcome::OutsideTextLayer.clears_selection());
    }

    #[test]
    fn gate_reports_rejections_with_a_hint() {
        let gate = SelectionGate::default();
        let outcome = gate.evaluate(&raw("»"), 1.0);
        assert_eq!(outcome, SelectionOutcome::Rejected);
        assert_eq!(outcome.hint(), Some("Try selecting more meaningful text"));
    }
}
