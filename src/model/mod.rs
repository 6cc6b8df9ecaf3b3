//! # Document Model
//!
//! The input representation for the layout engine: a tree of formatting
//! nodes whose properties have already been cascaded. Page sequences hold a
//! flow of block content plus optional header/footer static content; blocks
//! hold further blocks or runs of inline content.
//!
//! The tree is immutable for the duration of a layout pass. Layout managers
//! borrow it; marker content is shared into the marker registry by `Rc`.

use crate::config::LayoutConfig;
use crate::style::Style;
use serde::{Deserialize, Serialize};

/// A complete document ready for layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Page sequences, or content nodes that get auto-wrapped into a
    /// sequence using `default_page`.
    pub children: Vec<Node>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Page configuration for sequences that don't carry their own.
    #[serde(default)]
    pub default_page: PageConfig,

    /// Layout tuning embedded in the document.
    #[serde(default)]
    pub config: LayoutConfig,
}

/// Document metadata carried through to the area tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// Configuration for the pages of one sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    #[serde(default)]
    pub size: PageSize,

    /// Page margins in points (1/72 inch).
    #[serde(default = "default_margin")]
    pub margin: Edges,

    /// Height of the header region, taken from the top of the content box.
    #[serde(default)]
    pub header_extent: f64,

    /// Height of the footer region, taken from the bottom of the content box.
    #[serde(default)]
    pub footer_extent: f64,

    /// Restart numbering at this value. Continues from the previous
    /// sequence when absent.
    #[serde(default)]
    pub initial_page_number: Option<u32>,

    #[serde(default)]
    pub number_format: NumberFormat,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: default_margin(),
            header_extent: 0.0,
            footer_extent: 0.0,
            initial_page_number: None,
            number_format: NumberFormat::default(),
        }
    }
}

fn default_margin() -> Edges {
    Edges::uniform(54.0) // ~0.75 inch
}

impl PageConfig {
    /// Width and height of the body region, after margins and static regions.
    pub fn body_dimensions(&self) -> (f64, f64) {
        let (w, h) = self.size.dimensions();
        (
            (w - self.margin.horizontal()).max(0.0),
            (h - self.margin.vertical() - self.header_extent - self.footer_extent).max(0.0),
        )
    }
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// How page numbers are formatted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberFormat {
    #[default]
    #[serde(rename = "1")]
    Decimal,
    #[serde(rename = "i")]
    LowerRoman,
    #[serde(rename = "I")]
    UpperRoman,
    #[serde(rename = "a")]
    LowerAlpha,
    #[serde(rename = "A")]
    UpperAlpha,
}

impl NumberFormat {
    pub fn format(&self, n: u32) -> String {
        match self {
            NumberFormat::Decimal => n.to_string(),
            NumberFormat::LowerRoman => to_roman(n).to_lowercase(),
            NumberFormat::UpperRoman => to_roman(n),
            NumberFormat::LowerAlpha => to_alpha(n).to_lowercase(),
            NumberFormat::UpperAlpha => to_alpha(n),
        }
    }
}

fn to_roman(mut n: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    if n == 0 {
        return "0".to_string();
    }
    let mut out = String::new();
    for (value, glyphs) in TABLE {
        while n >= value {
            out.push_str(glyphs);
            n -= value;
        }
    }
    out
}

/// Bijective base-26: 1 → A, 26 → Z, 27 → AA.
fn to_alpha(mut n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Edge values (top, right, bottom, left) used for margin and padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// A node in the formatting tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub kind: NodeKind,

    #[serde(default)]
    pub style: Style,

    #[serde(default)]
    pub children: Vec<Node>,

    /// Identifier other content can reference (page-number citations).
    #[serde(default)]
    pub id: Option<String>,

    /// Where this node came from, for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,

    /// Outline title. An empty string takes the title from the text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
}

/// The different kinds of formatting nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// A run of pages sharing one page configuration and one marker scope.
    PageSequence {
        #[serde(default)]
        config: Option<PageConfig>,
    },

    /// The body content of a page sequence.
    Flow,

    /// Content repeated on every page of the sequence.
    StaticContent { position: FixedPosition },

    /// A block-level container.
    Block,

    /// An inline-level container.
    Inline,

    /// Literal text.
    Text { content: String },

    /// The number of the page the content lands on.
    PageNumber,

    /// The number of the page on which `ref_id` is declared.
    PageNumberCitation {
        #[serde(rename = "refId")]
        ref_id: String,
    },

    /// Content captured for retrieval by static content. Children are the
    /// captured content.
    Marker {
        #[serde(rename = "className")]
        class_name: String,
    },

    /// Lays out a previously captured marker. Only valid in static content.
    RetrieveMarker {
        #[serde(rename = "className")]
        class_name: String,
        #[serde(default)]
        boundary: Boundary,
    },

    /// An explicit page break.
    PageBreak,
}

/// Which marker a retrieve-marker picks relative to the current page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    /// Nearest marker captured on or before the page.
    #[default]
    AtOrBefore,
    /// Nearest marker captured on or after the page.
    AtOrAfter,
    /// First marker of the page sequence.
    FirstInSequence,
    /// Last marker of the page sequence.
    LastInSequence,
}

/// Which static region a piece of static content fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixedPosition {
    Header,
    Footer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

impl Node {
    fn with_kind(kind: NodeKind, style: Style, children: Vec<Node>) -> Self {
        Self {
            kind,
            style,
            children,
            id: None,
            source_location: None,
            bookmark: None,
        }
    }

    /// Create a Block node with children.
    pub fn block(style: Style, children: Vec<Node>) -> Self {
        Self::with_kind(NodeKind::Block, style, children)
    }

    /// Create an Inline node with children.
    pub fn inline(style: Style, children: Vec<Node>) -> Self {
        Self::with_kind(NodeKind::Inline, style, children)
    }

    /// Create a Text node.
    pub fn text(content: &str) -> Self {
        Self::with_kind(
            NodeKind::Text {
                content: content.to_string(),
            },
            Style::default(),
            vec![],
        )
    }

    /// A block holding a single run of text.
    pub fn paragraph(content: &str, style: Style) -> Self {
        Self::block(style, vec![Node::text(content)])
    }

    pub fn page_number() -> Self {
        Self::with_kind(NodeKind::PageNumber, Style::default(), vec![])
    }

    pub fn citation(ref_id: &str) -> Self {
        Self::with_kind(
            NodeKind::PageNumberCitation {
                ref_id: ref_id.to_string(),
            },
            Style::default(),
            vec![],
        )
    }

    pub fn marker(class_name: &str, children: Vec<Node>) -> Self {
        Self::with_kind(
            NodeKind::Marker {
                class_name: class_name.to_string(),
            },
            Style::default(),
            children,
        )
    }

    pub fn retrieve_marker(class_name: &str, boundary: Boundary) -> Self {
        Self::with_kind(
            NodeKind::RetrieveMarker {
                class_name: class_name.to_string(),
                boundary,
            },
            Style::default(),
            vec![],
        )
    }

    pub fn page_break() -> Self {
        Self::with_kind(NodeKind::PageBreak, Style::default(), vec![])
    }

    pub fn flow(children: Vec<Node>) -> Self {
        Self::with_kind(NodeKind::Flow, Style::default(), children)
    }

    pub fn static_content(position: FixedPosition, children: Vec<Node>) -> Self {
        Self::with_kind(NodeKind::StaticContent { position }, Style::default(), children)
    }

    pub fn page_sequence(config: Option<PageConfig>, children: Vec<Node>) -> Self {
        Self::with_kind(NodeKind::PageSequence { config }, Style::default(), children)
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_bookmark(mut self, title: &str) -> Self {
        self.bookmark = Some(title.to_string());
        self
    }

    /// Inline-level content: may only appear inside blocks and inlines.
    pub fn is_inline_level(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Inline
                | NodeKind::Text { .. }
                | NodeKind::PageNumber
                | NodeKind::PageNumberCitation { .. }
        )
    }

    /// Block-level content: may appear in flows, static content and blocks.
    pub fn is_block_level(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Block | NodeKind::PageBreak | NodeKind::RetrieveMarker { .. }
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::PageSequence { .. } => "PageSequence",
            NodeKind::Flow => "Flow",
            NodeKind::StaticContent { .. } => "StaticContent",
            NodeKind::Block => "Block",
            NodeKind::Inline => "Inline",
            NodeKind::Text { .. } => "Text",
            NodeKind::PageNumber => "PageNumber",
            NodeKind::PageNumberCitation { .. } => "PageNumberCitation",
            NodeKind::Marker { .. } => "Marker",
            NodeKind::RetrieveMarker { .. } => "RetrieveMarker",
            NodeKind::PageBreak => "PageBreak",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roman_and_alpha_numbering() {
        assert_eq!(NumberFormat::UpperRoman.format(1994), "MCMXCIV");
        assert_eq!(NumberFormat::LowerRoman.format(4), "iv");
        assert_eq!(NumberFormat::UpperAlpha.format(1), "A");
        assert_eq!(NumberFormat::UpperAlpha.format(27), "AA");
        assert_eq!(NumberFormat::LowerAlpha.format(52), "az");
        assert_eq!(NumberFormat::Decimal.format(12), "12");
    }

    #[test]
    fn body_dimensions_subtract_static_regions() {
        let config = PageConfig {
            size: PageSize::Custom {
                width: 200.0,
                height: 300.0,
            },
            margin: Edges::uniform(10.0),
            header_extent: 20.0,
            footer_extent: 30.0,
            ..Default::default()
        };
        assert_eq!(config.body_dimensions(), (180.0, 230.0));
    }

    #[test]
    fn node_kinds_deserialize_from_tagged_json() {
        let node: Node = serde_json::from_str(
            r#"{ "kind": { "type": "PageNumberCitation", "refId": "intro" } }"#,
        )
        .unwrap();
        assert!(matches!(node.kind, NodeKind::PageNumberCitation { ref ref_id } if ref_id == "intro"));
        assert!(node.is_inline_level());

        let marker: Node = serde_json::from_str(
            r#"{ "kind": { "type": "RetrieveMarker", "className": "chapter", "boundary": "LastInSequence" } }"#,
        )
        .unwrap();
        assert!(matches!(
            marker.kind,
            NodeKind::RetrieveMarker { boundary: Boundary::LastInSequence, .. }
        ));
    }
}
