//! # Block Layout
//!
//! Stacks block-level children in the block-progression direction. The same
//! manager drives a flow or static region, where it adds no area, edges or
//! keeps of its own and hands children straight to the region.
//!
//! A block reports its own edges on the first and last of its break
//! possibilities. If the last child ends without saying so (an empty
//! trailing child), the block closes with an extra zero-content possibility.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::area::{Area, AreaContainer, BlockArea, Bookmark};
use crate::error::{FolioError, Result};
use crate::model::{Node, SourceLocation};
use crate::style::ResolvedStyle;

use super::break_poss::BreakPoss;
use super::context::LayoutContext;
use super::manager::{check_position, check_positions, child_mut, cursor_range, LayoutManager};
use super::position::{LmId, Position, PositionIterator};
use super::run::LayoutRun;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    /// The body of a flow or static region.
    Flow,
    Block,
}

pub struct BlockLayoutManager {
    id: LmId,
    role: BlockRole,
    style: ResolvedStyle,
    node_id: Option<String>,
    location: Option<SourceLocation>,
    bookmark: Option<String>,
    markers: Vec<(String, Rc<Vec<Node>>)>,
    /// Whether this copy of the content declares its id and bookmark.
    declares: bool,
    children: Vec<Box<dyn LayoutManager>>,
    cur: usize,
    started: bool,
    closed: bool,
    finished: bool,
    first_position: Option<Position>,
    last_position: Option<Position>,
}

impl BlockLayoutManager {
    pub fn new(id: LmId, role: BlockRole, style: ResolvedStyle, children: Vec<Box<dyn LayoutManager>>) -> Self {
        let style = match role {
            BlockRole::Block => style,
            // Regions have no box of their own; only inherited values matter.
            BlockRole::Flow => ResolvedStyle {
                space_before: 0.0,
                space_after: 0.0,
                start_indent: 0.0,
                end_indent: 0.0,
                padding: Default::default(),
                border_width: Default::default(),
                keep_together: false,
                keep_with_next: false,
                keep_with_previous: false,
                break_before: false,
                break_after: false,
                ..style
            },
        };
        Self {
            id,
            role,
            style,
            node_id: None,
            location: None,
            bookmark: None,
            markers: Vec::new(),
            declares: true,
            children,
            cur: 0,
            started: false,
            closed: false,
            finished: false,
            first_position: None,
            last_position: None,
        }
    }

    pub fn with_node_id(mut self, node_id: Option<String>) -> Self {
        self.node_id = node_id;
        self
    }

    pub fn with_location(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    pub fn with_bookmark(mut self, bookmark: Option<String>) -> Self {
        self.bookmark = bookmark;
        self
    }

    pub fn with_markers(mut self, markers: Vec<(String, Rc<Vec<Node>>)>) -> Self {
        self.markers = markers;
        self
    }

    /// Content repeated on every page (static regions) declares its id and
    /// bookmark only once.
    pub fn declaring(mut self, declares: bool) -> Self {
        self.declares = declares;
        self
    }

    fn child_context(&self, ctx: &LayoutContext) -> LayoutContext {
        ctx.with_ref_ipd(ctx.ref_ipd - self.style.inline_inset())
    }

    fn is_flow(&self) -> bool {
        self.role == BlockRole::Flow
    }

    /// Apply this block's edges, spaces, keeps and breaks to a candidate.
    fn decorate(&mut self, ctx: &LayoutContext, bp: BreakPoss, first: bool, last: bool) -> BreakPoss {
        let s = &self.style;
        let mut bpd = bp.bpd();
        let mut out = bp.clone().first(first).last(last);

        if first {
            let child_space = if bp.is_first() { bp.space_before() } else { 0.0 };
            bpd += s.leading_edge();
            out = out
                .with_space_before(s.space_before.max(child_space))
                .with_can_break_before(bp.can_break_before() && !s.keep_with_previous)
                // An empty page already satisfies a break-before.
                .with_forced_before((bp.forced_before() || s.break_before) && !ctx.at_page_top);
        } else if self.started && bp.position().inner().is_none() {
            // A closing possibility must not start a page on its own.
            out = out.with_can_break_before(false);
        }

        if last {
            bpd += s.trailing_edge();
            out = out
                .with_space_after(s.space_after.max(bp.space_after()))
                .with_can_break_after(bp.can_break_after() && !s.keep_with_next)
                .with_forced_after(bp.forced_after() || s.break_after);
        } else {
            out = out.with_can_break_after(bp.can_break_after() && !s.keep_together);
        }

        out = out.with_bpd(bpd);
        if first {
            self.first_position = Some(out.position().clone());
        }
        if last {
            self.last_position = Some(out.position().clone());
            self.closed = true;
        }
        self.started = true;
        out
    }

    /// A flow flags the candidate that does not fit what is left of the page.
    fn check_fit(&self, ctx: &LayoutContext, bp: BreakPoss) -> BreakPoss {
        if !self.is_flow() {
            return bp;
        }
        let fits = ctx.fits(bp.space_before(), bp.bpd());
        bp.with_overflow(!fits)
    }

    /// Declarations made where the block starts: id, markers, bookmark.
    fn open(&self, run: &mut LayoutRun) {
        for (class_name, content) in &self.markers {
            self.add_marker(run, class_name, content.clone(), true);
        }
        if !self.declares {
            return;
        }
        if let Some(id) = &self.node_id {
            self.add_id_to_page(run, id, self.location.as_ref());
        }
        if let Some(title) = &self.bookmark {
            let title = if title.is_empty() {
                let mut buf = String::new();
                self.get_word_chars(&mut buf, None, None);
                buf.trim().to_string()
            } else {
                title.clone()
            };
            run.bookmarks.push(Bookmark {
                title,
                page_index: run.current_page().index,
            });
        }
    }

    fn close(&self, run: &mut LayoutRun) {
        for (class_name, content) in &self.markers {
            self.add_marker(run, class_name, content.clone(), false);
        }
    }

    fn add_child_areas(
        &mut self,
        mut positions: PositionIterator,
        ctx: &LayoutContext,
        run: &mut LayoutRun,
        parent: &mut dyn AreaContainer,
    ) -> Result<()> {
        while let Some((child_id, span)) = positions.next_child_run() {
            let child = child_mut(self.id, &mut self.children, child_id)?;
            if child.generates_inline_areas() {
                return Err(FolioError::Internal(format!(
                    "{} cannot stack inline-level child {}",
                    self.id, child_id
                )));
            }
            child.add_areas(span, ctx, run, parent)?;
        }
        Ok(())
    }
}

impl LayoutManager for BlockLayoutManager {
    fn id(&self) -> LmId {
        self.id
    }

    fn can_break_before(&self, ctx: &LayoutContext) -> bool {
        if !self.started && self.style.keep_with_previous {
            return false;
        }
        self.children
            .get(self.cur)
            .map_or(true, |c| c.can_break_before(ctx))
    }

    fn get_next_break_poss(&mut self, ctx: &LayoutContext, run: &mut LayoutRun) -> Result<Option<BreakPoss>> {
        if self.finished {
            return Ok(None);
        }
        let child_ctx = self.child_context(ctx);
        let n = self.children.len();

        while self.cur < n {
            let idx = self.cur;
            if self.children[idx].is_finished() {
                self.cur += 1;
                continue;
            }
            let before_ok = self.can_break_before(&child_ctx);
            if let Some(bp) = self.children[idx].get_next_break_poss(&child_ctx, run)? {
                let last = bp.is_last() && idx + 1 == n;
                let wrapped = bp
                    .rewrap(Position::wrap(self.id, idx, bp.position().clone()))
                    .with_can_break_before(bp.can_break_before() && before_ok);
                let first = !self.started;
                let out = self.decorate(ctx, wrapped, first, last);
                return Ok(Some(self.check_fit(ctx, out)));
            }
            self.cur += 1;
        }

        if !self.closed {
            let first = !self.started;
            let closing = BreakPoss::new(Position::leaf(self.id, n), 0.0);
            let out = self.decorate(ctx, closing, first, true);
            return Ok(Some(self.check_fit(ctx, out)));
        }
        self.finished = true;
        Ok(None)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn set_finished(&mut self, finished: bool) {
        self.finished = finished;
    }

    fn reset_position(&mut self, pos: Option<&Position>) -> Result<()> {
        check_position(self.id, pos)?;
        self.finished = false;
        match pos {
            Some(p) => {
                let idx = p.index();
                self.cur = idx.min(self.children.len());
                self.started = true;
                self.closed = self.last_position.as_ref() == Some(p);
                for (i, child) in self.children.iter_mut().enumerate() {
                    match i.cmp(&idx) {
                        Ordering::Less => child.set_finished(true),
                        Ordering::Equal => child.reset_position(p.inner())?,
                        Ordering::Greater => child.reset_position(None)?,
                    }
                }
            }
            None => {
                self.cur = 0;
                self.started = false;
                self.closed = false;
                for child in self.children.iter_mut() {
                    child.reset_position(None)?;
                }
            }
        }
        Ok(())
    }

    fn add_areas(
        &mut self,
        positions: PositionIterator,
        ctx: &LayoutContext,
        run: &mut LayoutRun,
        parent: &mut dyn AreaContainer,
    ) -> Result<()> {
        let positions: Vec<Position> = positions.collect();
        check_positions(self.id, &positions)?;
        let starts = positions.first().is_some() && positions.first() == self.first_position.as_ref();
        let ends = positions.last().is_some() && positions.last() == self.last_position.as_ref();
        let child_ctx = self.child_context(ctx);

        if self.is_flow() {
            if starts {
                self.open(run);
            }
            self.add_child_areas(PositionIterator::new(positions), &child_ctx, run, parent)?;
            if ends {
                self.close(run);
            }
            return Ok(());
        }

        let s = &self.style;
        let width = (ctx.ref_ipd - s.start_indent - s.end_indent).max(0.0);
        let content_top = if starts { s.leading_edge() } else { 0.0 };
        let content_left = s.padding.left + s.border_width.left;
        let mut area = BlockArea::new(s.start_indent, width, content_top, content_left);
        area.is_first = starts;
        area.is_last = ends;
        if starts {
            area.space_before = s.space_before;
            area.id = self.node_id.clone().filter(|_| self.declares);
            self.open(run);
        }

        self.add_child_areas(PositionIterator::new(positions), &child_ctx, run, &mut area)?;

        let (trailing, space_after) = if ends {
            self.close(run);
            (self.style.trailing_edge(), self.style.space_after)
        } else {
            (0.0, 0.0)
        };
        area.finish(trailing, space_after);
        parent.add_child(Area::Block(area))
    }

    fn get_word_chars(&self, buf: &mut String, from: Option<&Position>, to: Option<&Position>) {
        for i in cursor_range(from, to, self.children.len()) {
            let inner_from = from.filter(|p| p.index() == i).and_then(|p| p.inner());
            let inner_to = to.filter(|p| p.index() == i).and_then(|p| p.inner());
            if !buf.is_empty() && !buf.ends_with(' ') {
                buf.push(' ');
            }
            self.children[i].get_word_chars(buf, inner_from, inner_to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::RegionArea;
    use crate::config::{FontDefaults, LayoutConfig};
    use crate::layout::inline::TextLayoutManager;
    use crate::layout::line::LineLayoutManager;
    use crate::model::Edges;
    use crate::style::Style;
    use crate::text::{measure_words, FixedPitchMeasurer};

    fn root() -> ResolvedStyle {
        ResolvedStyle::root(&FontDefaults::default(), 1, 1)
    }

    fn paragraph(base: usize, content: &str, style: ResolvedStyle) -> BlockLayoutManager {
        let m = FixedPitchMeasurer::default();
        let words = measure_words(content, &style.font, &m);
        let text = TextLayoutManager::new(LmId(base + 2), words, style.clone());
        let line = LineLayoutManager::new(LmId(base + 1), style.clone(), None, vec![Box::new(text)]);
        BlockLayoutManager::new(LmId(base), BlockRole::Block, style, vec![Box::new(line)])
    }

    fn drain(lm: &mut dyn LayoutManager, run: &mut LayoutRun, width: f64) -> Vec<BreakPoss> {
        let ctx = LayoutContext::new(1000.0, width);
        let mut out = Vec::new();
        while let Some(bp) = lm.get_next_break_poss(&ctx, run).unwrap() {
            out.push(bp);
        }
        out
    }

    #[test]
    fn edges_and_spaces_land_on_first_and_last() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let style = Style {
            padding: Some(Edges::uniform(3.0)),
            space_before: Some(10.0),
            space_after: Some(8.0),
            ..Default::default()
        }
        .resolve(&root());
        // Three 24pt words on 30pt (36 minus padding) lines.
        let mut block = paragraph(0, "aaaa bbbb cccc", style);
        let bps = drain(&mut block, &mut run, 36.0);
        assert_eq!(bps.len(), 3);
        assert!((bps[0].bpd() - 17.4).abs() < 1e-9);
        assert_eq!(bps[0].space_before(), 10.0);
        assert!((bps[1].bpd() - 14.4).abs() < 1e-9);
        assert!((bps[2].bpd() - 17.4).abs() < 1e-9);
        assert_eq!(bps[2].space_after(), 8.0);
        assert!(bps[0].is_first() && bps[2].is_last());
    }

    #[test]
    fn keeps_clear_break_permissions() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let style = Style {
            keep_together: Some(true),
            keep_with_next: Some(true),
            keep_with_previous: Some(true),
            ..Default::default()
        }
        .resolve(&root());
        let mut block = paragraph(0, "aaaa bbbb", style);
        let bps = drain(&mut block, &mut run, 30.0);
        assert_eq!(bps.len(), 2);
        assert!(!bps[0].can_break_before());
        assert!(!bps[0].can_break_after());
        assert!(!bps[1].can_break_after());
    }

    #[test]
    fn empty_block_still_yields_one_possibility() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let style = Style {
            border_width: Some(Edges::uniform(2.0)),
            ..Default::default()
        }
        .resolve(&root());
        let mut block = BlockLayoutManager::new(LmId(0), BlockRole::Block, style, vec![]);
        let bps = drain(&mut block, &mut run, 100.0);
        assert_eq!(bps.len(), 1);
        assert!(bps[0].is_first() && bps[0].is_last());
        assert_eq!(bps[0].bpd(), 4.0);
    }

    #[test]
    fn split_spans_know_whether_they_start_or_end() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let style = Style {
            padding: Some(Edges::uniform(3.0)),
            ..Default::default()
        }
        .resolve(&root());
        let mut block = paragraph(0, "aaaa bbbb cccc", style).with_node_id(Some("p".to_string()));
        let bps = drain(&mut block, &mut run, 36.0);
        let ctx = LayoutContext::new(1000.0, 36.0);

        let mut page1 = RegionArea::new(0.0, 0.0, 36.0, 1000.0);
        let head = bps[..2].iter().map(|b| b.position().clone()).collect();
        block.add_areas(PositionIterator::new(head), &ctx, &mut run, &mut page1).unwrap();
        let mut page2 = RegionArea::new(0.0, 0.0, 36.0, 1000.0);
        let tail = vec![bps[2].position().clone()];
        block.add_areas(PositionIterator::new(tail), &ctx, &mut run, &mut page2).unwrap();

        match (&page1.children[0], &page2.children[0]) {
            (Area::Block(a), Area::Block(b)) => {
                assert!(a.is_first && !a.is_last);
                assert!(!b.is_first && b.is_last);
                assert_eq!(a.id.as_deref(), Some("p"));
                assert!(b.id.is_none());
                assert!((a.height - 31.8).abs() < 1e-9);
                assert!((b.height - 17.4).abs() < 1e-9);
            }
            _ => panic!("expected blocks"),
        }
        assert_eq!(page1.text_lines(), vec!["aaaa", "bbbb"]);
        assert_eq!(page2.text_lines(), vec!["cccc"]);
    }

    #[test]
    fn reset_rewinds_into_the_child() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let mut block = paragraph(0, "aaaa bbbb cccc", root());
        let bps = drain(&mut block, &mut run, 30.0);
        block.reset_position(Some(bps[0].position())).unwrap();
        let again = drain(&mut block, &mut run, 30.0);
        assert_eq!(again, bps[1..].to_vec());
    }

    #[test]
    fn replay_naming_a_stranger_is_an_error() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let mut block = paragraph(0, "aaaa bbbb", root());
        drain(&mut block, &mut run, 100.0);
        let ctx = LayoutContext::new(1000.0, 100.0);
        let mut region = RegionArea::new(0.0, 0.0, 100.0, 1000.0);

        let stranger = vec![Position::wrap(LmId(0), 0, Position::leaf(LmId(999), 0))];
        let err = block
            .add_areas(PositionIterator::new(stranger), &ctx, &mut run, &mut region)
            .unwrap_err();
        assert!(matches!(
            err,
            FolioError::UnknownChild {
                parent: LmId(0),
                child: LmId(999)
            }
        ));
        assert!(region.children.is_empty());

        let foreign = Position::leaf(LmId(7), 0);
        assert!(matches!(
            block.reset_position(Some(&foreign)),
            Err(FolioError::PositionMismatch { .. })
        ));
    }

    #[test]
    fn break_before_is_satisfied_at_page_top() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let style = Style {
            break_before: Some(true),
            ..Default::default()
        }
        .resolve(&root());

        let mut block = paragraph(0, "aaaa", style.clone());
        let top = LayoutContext::new(1000.0, 100.0);
        let bp = block.get_next_break_poss(&top, &mut run).unwrap().unwrap();
        assert!(!bp.forced_before());

        let mut block = paragraph(10, "aaaa", style);
        let below = top.at_top(false);
        let bp = block.get_next_break_poss(&below, &mut run).unwrap().unwrap();
        assert!(bp.forced_before());
    }

    #[test]
    fn flow_flags_candidates_past_the_remaining_space() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let para = paragraph(1, "aaaa bbbb", root());
        let mut flow = BlockLayoutManager::new(LmId(0), BlockRole::Flow, root(), vec![Box::new(para)]);
        let h = root().line_box_height();

        let ctx = LayoutContext::new(h, 30.0);
        let first = flow.get_next_break_poss(&ctx, &mut run).unwrap().unwrap();
        assert!(!first.overflow());

        let rest = ctx.with_stack_limit(h / 2.0).at_top(false);
        let second = flow.get_next_break_poss(&rest, &mut run).unwrap().unwrap();
        assert!(second.overflow());
    }
}
