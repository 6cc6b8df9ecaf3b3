//! # Font Metrics
//!
//! A [`TextMeasurer`] backed by real TrueType/OpenType advance widths.
//! Families without loaded font data fall back to fixed-pitch measurement.

use std::collections::HashMap;

use crate::style::FontSpec;
use crate::text::{FixedPitchMeasurer, TextMeasurer};

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
}

impl FontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut default_advance = 0u16;

        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    if ch == ' ' {
                        default_advance = advance;
                    }
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Some(FontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
        })
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct FontKey {
    family: String,
    bold: bool,
}

impl FontKey {
    fn new(family: &str, weight: u32) -> Self {
        Self {
            family: family.to_string(),
            bold: weight >= 600,
        }
    }
}

/// Measures with registered font metrics, per family and weight class.
pub struct TrueTypeMeasurer {
    fonts: HashMap<FontKey, FontMetrics>,
    fallback: FixedPitchMeasurer,
}

impl Default for TrueTypeMeasurer {
    fn default() -> Self {
        Self::new(FixedPitchMeasurer::default())
    }
}

impl TrueTypeMeasurer {
    pub fn new(fallback: FixedPitchMeasurer) -> Self {
        Self {
            fonts: HashMap::new(),
            fallback,
        }
    }

    /// Register font bytes for a family. Returns false if the data could not
    /// be parsed.
    pub fn register(&mut self, family: &str, weight: u32, data: &[u8]) -> bool {
        match FontMetrics::from_font_data(data) {
            Some(metrics) => {
                self.fonts.insert(FontKey::new(family, weight), metrics);
                true
            }
            None => {
                log::warn!("could not parse font data for family {:?}", family);
                false
            }
        }
    }

    pub fn register_metrics(&mut self, family: &str, weight: u32, metrics: FontMetrics) {
        self.fonts.insert(FontKey::new(family, weight), metrics);
    }

    fn lookup(&self, font: &FontSpec) -> Option<&FontMetrics> {
        self.fonts
            .get(&FontKey::new(&font.family, font.weight))
            .or_else(|| self.fonts.get(&FontKey::new(&font.family, 400)))
    }
}

impl TextMeasurer for TrueTypeMeasurer {
    fn advance(&self, text: &str, font: &FontSpec) -> f64 {
        match self.lookup(font) {
            Some(metrics) => text.chars().map(|ch| metrics.char_width(ch, font.size)).sum(),
            None => self.fallback.advance(text, font),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font_spec(family: &str, weight: u32) -> FontSpec {
        FontSpec {
            family: family.to_string(),
            size: 10.0,
            weight,
        }
    }

    fn narrow_metrics() -> FontMetrics {
        let mut advance_widths = HashMap::new();
        advance_widths.insert('i', 250);
        advance_widths.insert('m', 750);
        FontMetrics {
            units_per_em: 1000,
            advance_widths,
            default_advance: 500,
        }
    }

    #[test]
    fn registered_metrics_drive_advance() {
        let mut m = TrueTypeMeasurer::default();
        m.register_metrics("Body", 400, narrow_metrics());
        assert!((m.advance("im", &font_spec("Body", 400)) - 10.0).abs() < 1e-9);
        // Unknown chars use the default advance.
        assert!((m.advance("x", &font_spec("Body", 400)) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn bold_falls_back_to_regular_then_fixed_pitch() {
        let mut m = TrueTypeMeasurer::default();
        m.register_metrics("Body", 400, narrow_metrics());
        assert!((m.advance("i", &font_spec("Body", 700)) - 2.5).abs() < 1e-9);
        assert!((m.advance("i", &font_spec("Other", 400)) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn garbage_font_data_is_rejected() {
        let mut m = TrueTypeMeasurer::default();
        assert!(!m.register("Broken", 400, b"not a font"));
    }
}
