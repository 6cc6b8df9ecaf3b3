//! # Area Tree
//!
//! The geometric output of layout: an ordered list of page viewports, each
//! owning a tree of regions, block areas, line areas and inline areas.
//! Every area belongs to exactly one page. Cross-page relations (citations
//! of ids declared elsewhere) are recorded as slot ids and page indices and
//! patched out-of-band, never as links between areas.
//!
//! Geometry is relative: a child's `y` is measured from the top of its
//! parent's border box, an inline's `x` from the start of its line.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{FolioError, Result};
use crate::model::Metadata;
use crate::style::{Color, FontSpec, TextDecoration};

/// A lightweight handle to a committed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRef {
    pub index: usize,
    pub number: String,
}

/// Identifies one resolveable area for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SlotId(pub u64);

/// An area waiting for the page on which an id is declared.
pub trait Resolveable {
    /// The id this area refers to.
    fn id_ref(&self) -> &str;

    /// Deliver the outcome: the declaring page, or `None` when the id was
    /// never declared.
    fn resolve_id_ref(&mut self, page: Option<&PageRef>);

    fn is_resolved(&self) -> bool;
}

/// A page-number citation area.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationArea {
    pub ref_id: String,
    pub slot: SlotId,
    pub state: RefState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RefState {
    Unresolved,
    #[serde(rename_all = "camelCase")]
    Resolved { page_index: usize, text: String },
    NotFound,
}

/// Text shown for a citation whose id was never declared.
pub const NOT_FOUND_TEXT: &str = "?";

impl CitationArea {
    pub fn text(&self) -> &str {
        match &self.state {
            RefState::Resolved { text, .. } => text,
            RefState::Unresolved | RefState::NotFound => NOT_FOUND_TEXT,
        }
    }
}

impl Resolveable for CitationArea {
    fn id_ref(&self) -> &str {
        &self.ref_id
    }

    fn resolve_id_ref(&mut self, page: Option<&PageRef>) {
        self.state = match page {
            Some(p) => RefState::Resolved {
                page_index: p.index,
                text: p.number.clone(),
            },
            None => RefState::NotFound,
        };
    }

    fn is_resolved(&self) -> bool {
        !matches!(self.state, RefState::Unresolved)
    }
}

/// A block-progression child of a region or block.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Area {
    Block(BlockArea),
    Line(LineArea),
}

impl Area {
    pub fn height(&self) -> f64 {
        match self {
            Area::Block(b) => b.height,
            Area::Line(l) => l.height,
        }
    }

    fn set_y(&mut self, y: f64) {
        match self {
            Area::Block(b) => b.y = y,
            Area::Line(l) => l.y = y,
        }
    }

    fn shift_x(&mut self, dx: f64) {
        match self {
            Area::Block(b) => b.x += dx,
            Area::Line(l) => l.x += dx,
        }
    }

    fn space_before(&self) -> f64 {
        match self {
            Area::Block(b) => b.space_before,
            Area::Line(_) => 0.0,
        }
    }

    fn space_after(&self) -> f64 {
        match self {
            Area::Block(b) => b.space_after,
            Area::Line(_) => 0.0,
        }
    }

    fn collect_text(&self, out: &mut Vec<String>) {
        match self {
            Area::Block(b) => b.children.iter().for_each(|c| c.collect_text(out)),
            Area::Line(l) => out.push(l.text()),
        }
    }

    fn find_citation_mut(&mut self, slot: SlotId) -> Option<&mut CitationArea> {
        match self {
            Area::Block(b) => b.children.iter_mut().find_map(|c| c.find_citation_mut(slot)),
            Area::Line(l) => l.children.iter_mut().find_map(|c| c.find_citation_mut(slot)),
        }
    }
}

/// Something areas can be added to while layout managers materialize.
pub trait AreaContainer {
    fn add_child(&mut self, area: Area) -> Result<()>;

    fn add_inline(&mut self, area: InlineArea) -> Result<()> {
        let _ = area;
        Err(FolioError::Internal(
            "inline area added to a block-level container".to_string(),
        ))
    }
}

/// Stacking state shared by regions and blocks.
#[derive(Debug, Clone, Default)]
struct Stack {
    content_height: f64,
    last_space_after: f64,
}

impl Stack {
    /// Place `area` below the previous child, separated by the resolved
    /// spaces. The first child's space-before is left to the container.
    fn place(&mut self, children: &mut Vec<Area>, top: f64, mut area: Area) {
        let gap = if children.is_empty() {
            0.0
        } else {
            self.last_space_after + area.space_before()
        };
        area.set_y(top + self.content_height + gap);
        self.content_height += gap + area.height();
        self.last_space_after = area.space_after();
        children.push(area);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub space_before: f64,
    pub space_after: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// This area holds the start of its block (later areas are continuations).
    pub is_first: bool,
    /// This area holds the end of its block.
    pub is_last: bool,
    pub children: Vec<Area>,
    #[serde(skip)]
    stack: Stack,
    #[serde(skip)]
    content_top: f64,
    #[serde(skip)]
    content_left: f64,
}

impl BlockArea {
    /// `content_top` and `content_left` locate the content box inside the
    /// border box; children are positioned relative to the border box.
    pub fn new(x: f64, width: f64, content_top: f64, content_left: f64) -> Self {
        Self {
            x,
            y: 0.0,
            width,
            height: 0.0,
            space_before: 0.0,
            space_after: 0.0,
            id: None,
            is_first: false,
            is_last: false,
            children: Vec::new(),
            stack: Stack::default(),
            content_top,
            content_left,
        }
    }

    /// Close the area: fix its height and take over the last child's
    /// space-after.
    pub fn finish(&mut self, trailing_edge: f64, own_space_after: f64) {
        self.height = self.content_top + self.stack.content_height + trailing_edge;
        self.space_after = own_space_after.max(self.stack.last_space_after);
    }
}

impl AreaContainer for BlockArea {
    fn add_child(&mut self, mut area: Area) -> Result<()> {
        area.shift_x(self.content_left);
        if self.children.is_empty() {
            self.space_before = self.space_before.max(area.space_before());
        }
        self.stack.place(&mut self.children, self.content_top, area);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub children: Vec<InlineArea>,
    #[serde(skip)]
    last_space_after: f64,
}

impl LineArea {
    pub fn new(height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height,
            children: Vec::new(),
            last_space_after: 0.0,
        }
    }

    /// The line's text with inter-word spaces.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, child) in self.children.iter().enumerate() {
            child.write_text(&mut out);
            if i + 1 < self.children.len() && child.space_after > 0.0 {
                out.push(' ');
            }
        }
        out
    }
}

/// Advance an inline cursor: place `area` after the previous sibling.
fn place_inline(children: &mut Vec<InlineArea>, width: &mut f64, last_space: &mut f64, mut area: InlineArea) {
    let gap = if children.is_empty() { 0.0 } else { *last_space };
    area.x = *width + gap;
    *width += gap + area.width;
    *last_space = area.space_after;
    children.push(area);
}

impl AreaContainer for LineArea {
    fn add_child(&mut self, _area: Area) -> Result<()> {
        Err(FolioError::Internal(
            "block-level area added to a line".to_string(),
        ))
    }

    fn add_inline(&mut self, area: InlineArea) -> Result<()> {
        place_inline(&mut self.children, &mut self.width, &mut self.last_space_after, area);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineArea {
    pub x: f64,
    pub width: f64,
    pub height: f64,
    /// Inter-word space owed to the next inline sibling.
    pub space_after: f64,
    pub decoration: TextDecoration,
    pub kind: InlineKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InlineKind {
    Text {
        text: String,
        font: FontSpec,
        color: Color,
    },
    Container {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        children: Vec<InlineArea>,
    },
    PageNumber {
        text: String,
    },
    Citation(CitationArea),
}

impl InlineArea {
    pub fn new(width: f64, height: f64, kind: InlineKind) -> Self {
        Self {
            x: 0.0,
            width,
            height,
            space_after: 0.0,
            decoration: TextDecoration::None,
            kind,
        }
    }

    fn write_text(&self, out: &mut String) {
        match &self.kind {
            InlineKind::Text { text, .. } => out.push_str(text),
            InlineKind::PageNumber { text } => out.push_str(text),
            InlineKind::Citation(c) => out.push_str(c.text()),
            InlineKind::Container { children, .. } => {
                for (i, child) in children.iter().enumerate() {
                    child.write_text(out);
                    if i + 1 < children.len() && child.space_after > 0.0 {
                        out.push(' ');
                    }
                }
            }
        }
    }

    fn find_citation_mut(&mut self, slot: SlotId) -> Option<&mut CitationArea> {
        match &mut self.kind {
            InlineKind::Citation(c) if c.slot == slot => Some(c),
            InlineKind::Container { children, .. } => {
                children.iter_mut().find_map(|c| c.find_citation_mut(slot))
            }
            _ => None,
        }
    }
}

/// An inline container under construction (e.g. a decorated span).
#[derive(Debug, Clone)]
pub struct InlineContainer {
    pub id: Option<String>,
    pub children: Vec<InlineArea>,
    pub width: f64,
    pub height: f64,
    last_space_after: f64,
}

impl InlineContainer {
    pub fn new(id: Option<String>) -> Self {
        Self {
            id,
            children: Vec::new(),
            width: 0.0,
            height: 0.0,
            last_space_after: 0.0,
        }
    }

    pub fn into_area(self, decoration: TextDecoration) -> InlineArea {
        let mut area = InlineArea::new(
            self.width,
            self.height,
            InlineKind::Container {
                id: self.id,
                children: self.children,
            },
        );
        area.space_after = self.last_space_after;
        area.decoration = decoration;
        area
    }
}

impl AreaContainer for InlineContainer {
    fn add_child(&mut self, _area: Area) -> Result<()> {
        Err(FolioError::Internal(
            "block-level area added to an inline".to_string(),
        ))
    }

    fn add_inline(&mut self, area: InlineArea) -> Result<()> {
        self.height = self.height.max(area.height);
        place_inline(&mut self.children, &mut self.width, &mut self.last_space_after, area);
        Ok(())
    }
}

/// One region of a page (header, body or footer), positioned on the page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub children: Vec<Area>,
    #[serde(skip)]
    stack: Stack,
}

impl RegionArea {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            children: Vec::new(),
            stack: Stack::default(),
        }
    }

    /// Height actually consumed by content.
    pub fn content_height(&self) -> f64 {
        self.stack.content_height
    }

    pub fn text_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.children.iter().for_each(|c| c.collect_text(&mut out));
        out
    }
}

impl AreaContainer for RegionArea {
    fn add_child(&mut self, area: Area) -> Result<()> {
        // Space-before at the top of a region is discarded.
        self.stack.place(&mut self.children, 0.0, area);
        Ok(())
    }
}

/// A committed page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewport {
    pub index: usize,
    pub number: String,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RegionArea>,
    pub body: RegionArea,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<RegionArea>,
    /// Ids first declared on this page.
    pub ids: BTreeSet<String>,
}

impl PageViewport {
    pub fn page_ref(&self) -> PageRef {
        PageRef {
            index: self.index,
            number: self.number.clone(),
        }
    }

    /// Text of every line in the body region, top to bottom.
    pub fn body_lines(&self) -> Vec<String> {
        self.body.text_lines()
    }

    pub fn header_lines(&self) -> Vec<String> {
        self.header.as_ref().map(|r| r.text_lines()).unwrap_or_default()
    }

    pub fn footer_lines(&self) -> Vec<String> {
        self.footer.as_ref().map(|r| r.text_lines()).unwrap_or_default()
    }

    fn regions_mut(&mut self) -> impl Iterator<Item = &mut RegionArea> {
        self.header
            .iter_mut()
            .chain(std::iter::once(&mut self.body))
            .chain(self.footer.iter_mut())
    }

    /// Every citation area on the page, in document order.
    pub fn citations(&self) -> Vec<&CitationArea> {
        fn walk_inline<'a>(area: &'a InlineArea, out: &mut Vec<&'a CitationArea>) {
            match &area.kind {
                InlineKind::Citation(c) => out.push(c),
                InlineKind::Container { children, .. } => children.iter().for_each(|c| walk_inline(c, out)),
                _ => {}
            }
        }
        fn walk<'a>(area: &'a Area, out: &mut Vec<&'a CitationArea>) {
            match area {
                Area::Block(b) => b.children.iter().for_each(|c| walk(c, out)),
                Area::Line(l) => l.children.iter().for_each(|c| walk_inline(c, out)),
            }
        }
        let mut out = Vec::new();
        for region in self.header.iter().chain(std::iter::once(&self.body)).chain(self.footer.iter()) {
            region.children.iter().for_each(|c| walk(c, &mut out));
        }
        out
    }

    fn find_citation_mut(&mut self, slot: SlotId) -> Option<&mut CitationArea> {
        self.regions_mut()
            .flat_map(|region| region.children.iter_mut())
            .find_map(|child| child.find_citation_mut(slot))
    }
}

/// An outline entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub title: String,
    pub page_index: usize,
}

/// Final resolution status of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum IdStatus {
    #[serde(rename_all = "camelCase")]
    Resolved { page_index: usize, page_number: String },
    NotFound,
}

/// One resolve callback to deliver: the area in `slot` on page `area_page`
/// gets `target` (or "not found").
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub id: String,
    pub slot: SlotId,
    pub area_page: usize,
    pub target: Option<PageRef>,
}

/// The complete output of a layout run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaTree {
    pub metadata: Metadata,
    pub pages: Vec<PageViewport>,
    pub bookmarks: Vec<Bookmark>,
    pub ids: BTreeMap<String, IdStatus>,
}

impl AreaTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self, page: PageViewport) {
        self.pages.push(page);
    }

    pub fn page(&self, index: usize) -> Option<&PageViewport> {
        self.pages.get(index)
    }

    /// Deliver resolve callbacks to areas already in the tree.
    pub fn apply_resolutions(&mut self, resolutions: Vec<Resolution>) -> Result<()> {
        for res in resolutions {
            let page = self.pages.get_mut(res.area_page).ok_or_else(|| {
                FolioError::Internal(format!(
                    "resolution for {:?} targets missing page {}",
                    res.id, res.area_page
                ))
            })?;
            let citation = page.find_citation_mut(res.slot).ok_or_else(|| {
                FolioError::Internal(format!("no area in slot {:?} for {:?}", res.slot, res.id))
            })?;
            if citation.is_resolved() {
                return Err(FolioError::Internal(format!(
                    "area in slot {:?} resolved twice",
                    res.slot
                )));
            }
            citation.resolve_id_ref(res.target.as_ref());
        }
        Ok(())
    }

    /// Areas that never received their resolve callback. Empty after a
    /// completed run.
    pub fn unresolved_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| p.citations())
            .filter(|c| !c.is_resolved())
            .count()
    }

    /// Serialize for a backend renderer.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(FolioError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(height: f64) -> Area {
        Area::Line(LineArea::new(height))
    }

    fn spaced_block(before: f64, after: f64, height: f64) -> Area {
        let mut b = BlockArea::new(0.0, 100.0, 0.0, 0.0);
        b.space_before = before;
        b.add_child(line(height)).unwrap();
        b.finish(0.0, after);
        Area::Block(b)
    }

    #[test]
    fn region_discards_leading_space_and_sums_gaps() {
        let mut region = RegionArea::new(0.0, 0.0, 100.0, 500.0);
        region.add_child(spaced_block(10.0, 4.0, 20.0)).unwrap();
        region.add_child(spaced_block(6.0, 0.0, 20.0)).unwrap();
        match &region.children[1] {
            Area::Block(b) => assert_eq!(b.y, 30.0),
            _ => panic!("expected block"),
        }
        assert_eq!(region.content_height(), 50.0);
    }

    #[test]
    fn block_hoists_first_child_space() {
        let mut outer = BlockArea::new(0.0, 100.0, 2.0, 0.0);
        outer.add_child(spaced_block(8.0, 3.0, 10.0)).unwrap();
        outer.finish(2.0, 1.0);
        assert_eq!(outer.space_before, 8.0);
        assert_eq!(outer.space_after, 3.0);
        assert_eq!(outer.height, 14.0);
    }

    #[test]
    fn lines_place_inlines_with_word_spaces() {
        let mut l = LineArea::new(12.0);
        let mut a = InlineArea::new(
            20.0,
            12.0,
            InlineKind::PageNumber {
                text: "12".to_string(),
            },
        );
        a.space_after = 5.0;
        l.add_inline(a).unwrap();
        l.add_inline(InlineArea::new(10.0, 12.0, InlineKind::PageNumber { text: "x".to_string() }))
            .unwrap();
        assert_eq!(l.children[1].x, 25.0);
        assert_eq!(l.width, 35.0);
        assert_eq!(l.text(), "12 x");
        assert!(l.add_child(line(1.0)).is_err());
    }

    #[test]
    fn resolutions_patch_citations_exactly_once() {
        let mut l = LineArea::new(12.0);
        l.add_inline(InlineArea::new(
            10.0,
            12.0,
            InlineKind::Citation(CitationArea {
                ref_id: "x".to_string(),
                slot: SlotId(1),
                state: RefState::Unresolved,
            }),
        ))
        .unwrap();
        let mut body = RegionArea::new(0.0, 0.0, 100.0, 100.0);
        body.add_child(Area::Line(l)).unwrap();
        let mut tree = AreaTree::new();
        tree.add_page(PageViewport {
            index: 0,
            number: "1".to_string(),
            width: 100.0,
            height: 100.0,
            header: None,
            body,
            footer: None,
            ids: BTreeSet::new(),
        });
        assert_eq!(tree.unresolved_count(), 1);

        let res = Resolution {
            id: "x".to_string(),
            slot: SlotId(1),
            area_page: 0,
            target: Some(PageRef {
                index: 0,
                number: "1".to_string(),
            }),
        };
        tree.apply_resolutions(vec![res.clone()]).unwrap();
        assert_eq!(tree.unresolved_count(), 0);
        assert_eq!(tree.pages[0].body_lines(), vec!["1".to_string()]);
        assert!(tree.apply_resolutions(vec![res]).is_err());
    }
}
