//! # Text Measurement
//!
//! The layout managers treat measurement as an opaque service: given a span
//! of text and a font, how wide is it, and where may a line break. This
//! module defines that boundary ([`TextMeasurer`]) and the word segmentation
//! built on UAX#14 break opportunities.

use crate::style::FontSpec;
use unicode_linebreak::{linebreaks, BreakOpportunity};

/// Measures the advance width of text.
pub trait TextMeasurer {
    /// Advance width of `text` in points.
    fn advance(&self, text: &str, font: &FontSpec) -> f64;
}

/// Every character advances by the same fraction of the font size.
///
/// Deterministic and font-free, which makes it the default for tests and
/// for callers without font data.
#[derive(Debug, Clone, Copy)]
pub struct FixedPitchMeasurer {
    pub char_width: f64,
}

impl Default for FixedPitchMeasurer {
    fn default() -> Self {
        Self { char_width: 0.5 }
    }
}

impl TextMeasurer for FixedPitchMeasurer {
    fn advance(&self, text: &str, font: &FontSpec) -> f64 {
        text.chars().count() as f64 * self.char_width * font.size
    }
}

/// An atomic unit of line layout: the text between two break
/// opportunities, with its trailing whitespace split off.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    /// The visible text.
    pub text: String,
    /// Collapsed trailing whitespace: `" "` or empty.
    pub space: String,
    /// A mandatory break (newline) follows this word.
    pub hard_break: bool,
}

/// A word with its measured widths.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredWord {
    pub word: Word,
    pub width: f64,
    pub space_width: f64,
}

/// Split text into words at UAX#14 break opportunities.
///
/// Whitespace-only segments vanish unless they end in a mandatory break, in
/// which case they become an empty word carrying the break (an empty line).
pub fn segment_words(text: &str) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();
    let mut start = 0;

    for (offset, opp) in linebreaks(text) {
        let segment = &text[start..offset];
        start = offset;

        let visible = segment.trim_end_matches(char::is_whitespace);
        let trailing = &segment[visible.len()..];
        // linebreaks() reports a Mandatory opportunity at end of text; only
        // real newlines count as hard breaks.
        let hard_break = matches!(opp, BreakOpportunity::Mandatory)
            && trailing.chars().any(|c| matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}'));
        let space = if trailing.chars().any(|c| c.is_whitespace() && !matches!(c, '\n' | '\r')) && !hard_break {
            " ".to_string()
        } else {
            String::new()
        };

        if visible.is_empty() && !hard_break {
            // Leading or repeated whitespace collapses into the previous word.
            if let Some(prev) = words.last_mut() {
                if prev.space.is_empty() && !prev.hard_break && !trailing.is_empty() {
                    prev.space = " ".to_string();
                }
            }
            continue;
        }

        words.push(Word {
            text: visible.to_string(),
            space,
            hard_break,
        });
    }

    words
}

/// Segment and measure in one go.
pub fn measure_words(text: &str, font: &FontSpec, measurer: &dyn TextMeasurer) -> Vec<MeasuredWord> {
    segment_words(text)
        .into_iter()
        .map(|word| MeasuredWord {
            width: measurer.advance(&word.text, font),
            space_width: measurer.advance(&word.space, font),
            word,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font(size: f64) -> FontSpec {
        FontSpec {
            family: "Helvetica".to_string(),
            size,
            weight: 400,
        }
    }

    #[test]
    fn words_split_at_spaces() {
        let words = segment_words("Hello brave  world");
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "brave", "world"]);
        assert_eq!(words[0].space, " ");
        assert_eq!(words[1].space, " ");
        assert_eq!(words[2].space, "");
    }

    #[test]
    fn newline_is_a_hard_break() {
        let words = segment_words("one\ntwo");
        assert_eq!(words.len(), 2);
        assert!(words[0].hard_break);
        assert!(!words[1].hard_break);
    }

    #[test]
    fn blank_line_survives_as_empty_word() {
        let words = segment_words("a\n\nb");
        assert_eq!(words.len(), 3);
        assert_eq!(words[1].text, "");
        assert!(words[1].hard_break);
    }

    #[test]
    fn hyphen_is_a_break_opportunity() {
        let words = segment_words("well-known");
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "well-");
        assert_eq!(words[0].space, "");
    }

    #[test]
    fn fixed_pitch_measures_by_char_count() {
        let m = FixedPitchMeasurer { char_width: 0.5 };
        assert_eq!(m.advance("abcd", &font(10.0)), 20.0);
        assert_eq!(m.advance("", &font(10.0)), 0.0);
    }

    #[test]
    fn measured_words_carry_space_width() {
        let m = FixedPitchMeasurer::default();
        let words = measure_words("ab cd", &font(10.0), &m);
        assert_eq!(words[0].width, 10.0);
        assert_eq!(words[0].space_width, 5.0);
        assert_eq!(words[1].space_width, 0.0);
    }
}
