//! # Folio
//!
//! A paginating layout engine.
//!
//! Folio takes a formatting tree (page sequences of blocks, inline runs,
//! page numbers, citations and markers) and produces an area tree of
//! positioned pages. Layout managers offer break possibilities, a page
//! driver picks among them and may backtrack to honor keeps, orphans and
//! widows, and only then are areas materialized for the chosen span.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [model]    Formatting tree: nodes, styles, page sequences
//!       ↓
//!   [style]    Inheritance and defaults
//!       ↓
//!   [layout]   Layout managers, break possibilities, page driver,
//!              id and marker registries
//!       ↓
//!   [area]     Area tree: pages, regions, blocks, lines, inlines
//! ```

pub mod area;
pub mod config;
pub mod error;
pub mod font;
pub mod layout;
pub mod model;
pub mod style;
pub mod text;

pub use error::{FolioError, Result};

use layout::{LayoutEngine, LayoutOutput};
use model::Document;
use text::FixedPitchMeasurer;

/// Lay out a document with its embedded configuration and the fixed-pitch
/// measurer.
pub fn layout(document: &Document) -> Result<LayoutOutput> {
    let measurer = FixedPitchMeasurer {
        char_width: document.config.font.char_width,
    };
    LayoutEngine::new().layout(document, &measurer)
}

/// Lay out a document described as JSON.
pub fn layout_json(json: &str) -> Result<LayoutOutput> {
    let document: Document = serde_json::from_str(json)?;
    layout(&document)
}

/// Lay out a JSON document and serialize the result (area tree plus
/// diagnostics) as JSON.
pub fn render_json(json: &str) -> Result<String> {
    let output = layout_json(json)?;
    Ok(serde_json::to_string_pretty(&output)?)
}
