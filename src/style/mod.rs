//! # Style System
//!
//! The already-cascaded properties a formatting node carries into layout.
//! Computing these from markup is somebody else's job; this module only
//! applies inheritance of the few properties that inherit and fills in
//! defaults so layout managers work with concrete values.

use crate::config::FontDefaults;
use crate::model::Edges;
use serde::{Deserialize, Serialize};

/// The set of layout properties a node may specify.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    // ── Spacing ─────────────────────────────────────────────────
    /// Space before the block. Discarded at the top of a page.
    pub space_before: Option<f64>,
    /// Space after the block. Discarded at the bottom of a page.
    pub space_after: Option<f64>,
    /// Indent from the start edge of the containing area.
    pub start_indent: Option<f64>,
    /// Indent from the end edge of the containing area.
    pub end_indent: Option<f64>,
    pub padding: Option<Edges>,
    pub border_width: Option<Edges>,

    // ── Typography ─────────────────────────────────────────────
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub font_weight: Option<u32>,
    /// Line height as a multiplier of font size.
    pub line_height: Option<f64>,
    pub text_align: Option<TextAlign>,
    pub text_decoration: Option<TextDecoration>,
    pub color: Option<Color>,

    // ── Page Behavior ──────────────────────────────────────────
    /// Keep the whole block on one page when possible.
    pub keep_together: Option<bool>,
    /// Don't break between this block and the next one.
    pub keep_with_next: Option<bool>,
    /// Don't break between this block and the previous one.
    pub keep_with_previous: Option<bool>,
    /// Force a page break before this node.
    pub break_before: Option<bool>,
    /// Force a page break after this node.
    pub break_after: Option<bool>,
    /// Minimum number of lines left at the bottom of a page (orphans).
    pub min_orphan_lines: Option<u32>,
    /// Minimum number of lines carried to the top of the next page (widows).
    pub min_widow_lines: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
    /// Laid out as `Left`; inter-word stretching is a renderer concern.
    Justify,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    Overline,
    LineThrough,
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0) as f64 / 255.0;
        match hex.len() {
            3 => Self::rgb(
                channel(&hex[0..1].repeat(2)),
                channel(&hex[1..2].repeat(2)),
                channel(&hex[2..3].repeat(2)),
            ),
            6 => Self::rgb(channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
            _ => Color::BLACK,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Font selection handed to the measurement service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub weight: u32,
}

/// Resolved style: every value concrete.
#[derive(Debug, Clone)]
pub struct ResolvedStyle {
    pub space_before: f64,
    pub space_after: f64,
    pub start_indent: f64,
    pub end_indent: f64,
    pub padding: Edges,
    pub border_width: Edges,

    pub font: FontSpec,
    pub line_height: f64,
    pub text_align: TextAlign,
    pub text_decoration: TextDecoration,
    pub color: Color,

    pub keep_together: bool,
    pub keep_with_next: bool,
    pub keep_with_previous: bool,
    pub break_before: bool,
    pub break_after: bool,
    pub min_orphan_lines: u32,
    pub min_widow_lines: u32,
}

impl ResolvedStyle {
    /// The style a flow or static region starts from.
    pub fn root(defaults: &FontDefaults, orphans: u32, widows: u32) -> Self {
        ResolvedStyle {
            space_before: 0.0,
            space_after: 0.0,
            start_indent: 0.0,
            end_indent: 0.0,
            padding: Edges::default(),
            border_width: Edges::default(),
            font: FontSpec {
                family: defaults.family.clone(),
                size: defaults.size,
                weight: 400,
            },
            line_height: defaults.line_height,
            text_align: TextAlign::default(),
            text_decoration: TextDecoration::None,
            color: Color::BLACK,
            keep_together: false,
            keep_with_next: false,
            keep_with_previous: false,
            break_before: false,
            break_after: false,
            min_orphan_lines: orphans,
            min_widow_lines: widows,
        }
    }

    /// Height of one line box.
    pub fn line_box_height(&self) -> f64 {
        self.font.size * self.line_height
    }

    /// Padding plus border before the content, block-progression direction.
    pub fn leading_edge(&self) -> f64 {
        self.padding.top + self.border_width.top
    }

    /// Padding plus border after the content, block-progression direction.
    pub fn trailing_edge(&self) -> f64 {
        self.padding.bottom + self.border_width.bottom
    }

    /// Inline-progression space consumed by indents, padding and borders.
    pub fn inline_inset(&self) -> f64 {
        self.start_indent + self.end_indent + self.padding.horizontal() + self.border_width.horizontal()
    }
}

impl Style {
    /// Resolve this style against the parent's resolved style.
    ///
    /// Typography, color and orphans/widows inherit; spacing, keeps and
    /// breaks apply to the node itself only.
    pub fn resolve(&self, parent: &ResolvedStyle) -> ResolvedStyle {
        ResolvedStyle {
            space_before: self.space_before.unwrap_or(0.0),
            space_after: self.space_after.unwrap_or(0.0),
            start_indent: self.start_indent.unwrap_or(0.0),
            end_indent: self.end_indent.unwrap_or(0.0),
            padding: self.padding.unwrap_or_default(),
            border_width: self.border_width.unwrap_or_default(),

            font: FontSpec {
                family: self
                    .font_family
                    .clone()
                    .unwrap_or_else(|| parent.font.family.clone()),
                size: self.font_size.unwrap_or(parent.font.size),
                weight: self.font_weight.unwrap_or(parent.font.weight),
            },
            line_height: self.line_height.unwrap_or(parent.line_height),
            text_align: self.text_align.unwrap_or(parent.text_align),
            text_decoration: self.text_decoration.unwrap_or(parent.text_decoration),
            color: self.color.unwrap_or(parent.color),

            keep_together: self.keep_together.unwrap_or(false),
            keep_with_next: self.keep_with_next.unwrap_or(false),
            keep_with_previous: self.keep_with_previous.unwrap_or(false),
            break_before: self.break_before.unwrap_or(false),
            break_after: self.break_after.unwrap_or(false),
            min_orphan_lines: self.min_orphan_lines.unwrap_or(parent.min_orphan_lines),
            min_widow_lines: self.min_widow_lines.unwrap_or(parent.min_widow_lines),
        }
    }
}
