//! Inline-level layout managers.
//!
//! Each offers word-sized break possibilities to the line manager above it:
//! `ipd` is the word's advance and `space_after` the collapsible space that
//! separates it from the next word on the same line.

use crate::area::{AreaContainer, CitationArea, InlineArea, InlineContainer, InlineKind, RefState};
use crate::error::Result;
use crate::model::SourceLocation;
use crate::style::ResolvedStyle;
use crate::text::MeasuredWord;

use super::break_poss::BreakPoss;
use super::context::LayoutContext;
use super::manager::{check_position, check_positions, child_mut, cursor_range, LayoutManager};
use super::position::{LmId, Position, PositionIterator};
use super::run::LayoutRun;

/// Digits reserved for a page number whose value is not known while
/// breaking.
const RESERVED_DIGITS: &str = "000";

pub struct TextLayoutManager {
    id: LmId,
    words: Vec<MeasuredWord>,
    style: ResolvedStyle,
    cursor: usize,
    finished: bool,
}

impl TextLayoutManager {
    pub fn new(id: LmId, words: Vec<MeasuredWord>, style: ResolvedStyle) -> Self {
        Self {
            id,
            words,
            style,
            cursor: 0,
            finished: false,
        }
    }
}

impl LayoutManager for TextLayoutManager {
    fn id(&self) -> LmId {
        self.id
    }

    fn generates_inline_areas(&self) -> bool {
        true
    }

    fn can_break_before(&self, _ctx: &LayoutContext) -> bool {
        true
    }

    fn get_next_break_poss(&mut self, _ctx: &LayoutContext, _run: &mut LayoutRun) -> Result<Option<BreakPoss>> {
        let Some(word) = self.words.get(self.cursor) else {
            self.finished = true;
            return Ok(None);
        };
        let bp = BreakPoss::new(Position::leaf(self.id, self.cursor), self.style.line_box_height())
            .with_ipd(word.width)
            .with_space_after(word.space_width)
            .with_forced_after(word.word.hard_break)
            .first(self.cursor == 0)
            .last(self.cursor + 1 == self.words.len());
        self.cursor += 1;
        Ok(Some(bp))
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn set_finished(&mut self, finished: bool) {
        self.finished = finished;
    }

    fn reset_position(&mut self, pos: Option<&Position>) -> Result<()> {
        check_position(self.id, pos)?;
        self.cursor = pos.map_or(0, |p| p.index() + 1);
        self.finished = false;
        Ok(())
    }

    fn add_areas(
        &mut self,
        positions: PositionIterator,
        _ctx: &LayoutContext,
        _run: &mut LayoutRun,
        parent: &mut dyn AreaContainer,
    ) -> Result<()> {
        let positions: Vec<Position> = positions.collect();
        check_positions(self.id, &positions)?;
        let (Some(first), Some(last)) = (positions.first(), positions.last()) else {
            return Ok(());
        };
        let span = &self.words[cursor_range(Some(first), Some(last), self.words.len())];

        let mut text = String::new();
        let mut width = 0.0;
        for (i, w) in span.iter().enumerate() {
            text.push_str(&w.word.text);
            width += w.width;
            if i + 1 < span.len() {
                text.push_str(&w.word.space);
                width += w.space_width;
            }
        }

        let mut area = InlineArea::new(
            width,
            self.style.line_box_height(),
            InlineKind::Text {
                text,
                font: self.style.font.clone(),
                color: self.style.color,
            },
        );
        area.space_after = span.last().map_or(0.0, |w| w.space_width);
        area.decoration = self.style.text_decoration;
        parent.add_inline(area)
    }

    fn get_word_chars(&self, buf: &mut String, from: Option<&Position>, to: Option<&Position>) {
        for w in &self.words[cursor_range(from, to, self.words.len())] {
            buf.push_str(&w.word.text);
            buf.push_str(&w.word.space);
        }
    }
}

/// An inline container: decorates and identifies a run of inline children.
pub struct InlineLayoutManager {
    id: LmId,
    node_id: Option<String>,
    location: Option<SourceLocation>,
    style: ResolvedStyle,
    children: Vec<Box<dyn LayoutManager>>,
    cur: usize,
    finished: bool,
    declared: bool,
}

impl InlineLayoutManager {
    pub fn new(
        id: LmId,
        node_id: Option<String>,
        location: Option<SourceLocation>,
        style: ResolvedStyle,
        children: Vec<Box<dyn LayoutManager>>,
    ) -> Self {
        Self {
            id,
            node_id,
            location,
            style,
            children,
            cur: 0,
            finished: false,
            declared: false,
        }
    }

    /// Repeated copies of the content leave the id to the first one.
    pub fn declaring(mut self, declares: bool) -> Self {
        self.declared = !declares;
        self
    }
}

impl LayoutManager for InlineLayoutManager {
    fn id(&self) -> LmId {
        self.id
    }

    fn generates_inline_areas(&self) -> bool {
        true
    }

    fn can_break_before(&self, ctx: &LayoutContext) -> bool {
        self.children
            .get(self.cur)
            .map_or(true, |c| c.can_break_before(ctx))
    }

    fn get_next_break_poss(&mut self, ctx: &LayoutContext, run: &mut LayoutRun) -> Result<Option<BreakPoss>> {
        while let Some(child) = self.children.get_mut(self.cur) {
            if let Some(bp) = child.get_next_break_poss(ctx, run)? {
                let pos = Position::wrap(self.id, self.cur, bp.position().clone());
                let is_last = bp.is_last() && self.cur + 1 == self.children.len();
                return Ok(Some(bp.rewrap(pos).last(is_last)));
            }
            self.cur += 1;
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
        self.cur = pos.map_or(0, |p| p.index());
        for (i, child) in self.children.iter_mut().enumerate() {
            match pos {
                Some(p) if i == p.index() => child.reset_position(p.inner())?,
                Some(p) if i < p.index() => {}
                _ => child.reset_position(None)?,
            }
        }
        Ok(())
    }

    fn add_areas(
        &mut self,
        mut positions: PositionIterator,
        ctx: &LayoutContext,
        run: &mut LayoutRun,
        parent: &mut dyn AreaContainer,
    ) -> Result<()> {
        if let Some(p) = positions.peek() {
            check_positions(self.id, std::slice::from_ref(p))?;
        }
        let mut container = InlineContainer::new(None);
        if !self.declared {
            self.declared = true;
            if let Some(id) = self.node_id.clone() {
                self.add_id_to_page(run, &id, self.location.as_ref());
                container.id = Some(id);
            }
        }
        while let Some((child_id, run_positions)) = positions.next_child_run() {
            let child = child_mut(self.id, &mut self.children, child_id)?;
            child.add_areas(run_positions, ctx, run, &mut container)?;
        }
        parent.add_inline(container.into_area(self.style.text_decoration))
    }

    fn get_word_chars(&self, buf: &mut String, from: Option<&Position>, to: Option<&Position>) {
        let range = cursor_range(from, to, self.children.len());
        for i in range {
            let inner_from = from.filter(|p| p.index() == i).and_then(|p| p.inner());
            let inner_to = to.filter(|p| p.index() == i).and_then(|p| p.inner());
            self.children[i].get_word_chars(buf, inner_from, inner_to);
        }
    }
}

/// The number of the page the content lands on.
pub struct PageNumberLayoutManager {
    id: LmId,
    style: ResolvedStyle,
    done: bool,
}

impl PageNumberLayoutManager {
    pub fn new(id: LmId, style: ResolvedStyle) -> Self {
        Self {
            id,
            style,
            done: false,
        }
    }
}

impl LayoutManager for PageNumberLayoutManager {
    fn id(&self) -> LmId {
        self.id
    }

    fn generates_inline_areas(&self) -> bool {
        true
    }

    fn can_break_before(&self, _ctx: &LayoutContext) -> bool {
        true
    }

    fn get_next_break_poss(&mut self, _ctx: &LayoutContext, run: &mut LayoutRun) -> Result<Option<BreakPoss>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let width = run.measurer.advance(&self.current_page_number(run), &self.style.font);
        Ok(Some(
            BreakPoss::new(Position::leaf(self.id, 0), self.style.line_box_height())
                .with_ipd(width)
                .first(true)
                .last(true),
        ))
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn set_finished(&mut self, finished: bool) {
        self.done = finished;
    }

    fn reset_position(&mut self, pos: Option<&Position>) -> Result<()> {
        check_position(self.id, pos)?;
        self.done = pos.is_some();
        Ok(())
    }

    fn add_areas(
        &mut self,
        positions: PositionIterator,
        _ctx: &LayoutContext,
        run: &mut LayoutRun,
        parent: &mut dyn AreaContainer,
    ) -> Result<()> {
        let positions: Vec<Position> = positions.collect();
        check_positions(self.id, &positions)?;
        let text = self.current_page_number(run);
        let width = run.measurer.advance(&text, &self.style.font);
        let mut area = InlineArea::new(width, self.style.line_box_height(), InlineKind::PageNumber { text });
        area.decoration = self.style.text_decoration;
        parent.add_inline(area)
    }

    fn get_word_chars(&self, _buf: &mut String, _from: Option<&Position>, _to: Option<&Position>) {}
}

/// The number of the page on which another piece of content is declared.
///
/// A reference to an id already laid out is measured and filled in at once.
/// Otherwise the citation reserves room for a few digits and its area waits
/// in the id registry.
pub struct PageNumberCitationLayoutManager {
    id: LmId,
    ref_id: String,
    style: ResolvedStyle,
    /// Width offered while breaking; the area keeps it so lines don't shift.
    width: f64,
    done: bool,
}

impl PageNumberCitationLayoutManager {
    pub fn new(id: LmId, ref_id: String, style: ResolvedStyle) -> Self {
        Self {
            id,
            ref_id,
            style,
            width: 0.0,
            done: false,
        }
    }

    fn measure(&self, run: &LayoutRun) -> f64 {
        let text = match self.resolve_ref_id(run, &self.ref_id) {
            Some(page) => page.number,
            None => RESERVED_DIGITS.to_string(),
        };
        run.measurer.advance(&text, &self.style.font)
    }
}

impl LayoutManager for PageNumberCitationLayoutManager {
    fn id(&self) -> LmId {
        self.id
    }

    fn generates_inline_areas(&self) -> bool {
        true
    }

    fn can_break_before(&self, _ctx: &LayoutContext) -> bool {
        true
    }

    fn get_next_break_poss(&mut self, _ctx: &LayoutContext, run: &mut LayoutRun) -> Result<Option<BreakPoss>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        self.width = self.measure(run);
        Ok(Some(
            BreakPoss::new(Position::leaf(self.id, 0), self.style.line_box_height())
                .with_ipd(self.width)
                .first(true)
                .last(true),
        ))
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn set_finished(&mut self, finished: bool) {
        self.done = finished;
    }

    fn reset_position(&mut self, pos: Option<&Position>) -> Result<()> {
        check_position(self.id, pos)?;
        self.done = pos.is_some();
        Ok(())
    }

    fn add_areas(
        &mut self,
        positions: PositionIterator,
        _ctx: &LayoutContext,
        run: &mut LayoutRun,
        parent: &mut dyn AreaContainer,
    ) -> Result<()> {
        let positions: Vec<Position> = positions.collect();
        check_positions(self.id, &positions)?;
        let slot = run.allocate_slot();
        let resolved = self.resolve_ref_id(run, &self.ref_id);
        let state = match &resolved {
            Some(page) => RefState::Resolved {
                page_index: page.index,
                text: page.number.clone(),
            },
            None => RefState::Unresolved,
        };
        let mut area = InlineArea::new(
            self.width,
            self.style.line_box_height(),
            InlineKind::Citation(CitationArea {
                ref_id: self.ref_id.clone(),
                slot,
                state,
            }),
        );
        area.decoration = self.style.text_decoration;
        parent.add_inline(area)?;
        if resolved.is_none() {
            // Registered after the area exists so an immediate resolution finds it.
            self.add_unresolved_area(run, &self.ref_id, slot);
        }
        Ok(())
    }

    fn get_word_chars(&self, _buf: &mut String, _from: Option<&Position>, _to: Option<&Position>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::{LineArea, PageRef};
    use crate::config::{FontDefaults, LayoutConfig};
    use crate::text::{measure_words, FixedPitchMeasurer};

    fn style() -> ResolvedStyle {
        ResolvedStyle::root(&FontDefaults::default(), 2, 2)
    }

    fn text_lm(id: usize, content: &str) -> TextLayoutManager {
        let m = FixedPitchMeasurer::default();
        let style = style();
        TextLayoutManager::new(LmId(id), measure_words(content, &style.font, &m), style)
    }

    fn drain(lm: &mut dyn LayoutManager, run: &mut LayoutRun) -> Vec<BreakPoss> {
        let ctx = LayoutContext::new(1000.0, 500.0);
        let mut out = Vec::new();
        while let Some(bp) = lm.get_next_break_poss(&ctx, run).unwrap() {
            out.push(bp);
        }
        out
    }

    #[test]
    fn text_offers_one_break_per_word() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let mut lm = text_lm(0, "one two three");
        let bps = drain(&mut lm, &mut run);
        assert_eq!(bps.len(), 3);
        assert_eq!(bps[0].ipd(), 18.0);
        assert_eq!(bps[0].space_after(), 6.0);
        assert!(bps[2].is_last());
        assert!(lm.is_finished());
    }

    #[test]
    fn reset_replays_from_the_following_word() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let mut lm = text_lm(0, "a b c");
        let bps = drain(&mut lm, &mut run);
        lm.reset_position(Some(bps[0].position())).unwrap();
        let again = drain(&mut lm, &mut run);
        assert_eq!(again.len(), 2);
        assert_eq!(again[0], bps[1]);
    }

    #[test]
    fn text_areas_join_words_of_the_span() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let mut lm = text_lm(4, "alpha beta gamma");
        let bps = drain(&mut lm, &mut run);

        let mut line = LineArea::new(14.4);
        let ctx = LayoutContext::new(1000.0, 500.0);
        let span = PositionIterator::new(vec![bps[0].position().clone(), bps[1].position().clone()]);
        lm.add_areas(span, &ctx, &mut run, &mut line).unwrap();
        assert_eq!(line.text(), "alpha beta");

        let foreign = PositionIterator::new(vec![Position::leaf(LmId(9), 0)]);
        assert!(lm.add_areas(foreign, &ctx, &mut run, &mut line).is_err());

        let mut words = String::new();
        lm.get_word_chars(&mut words, None, None);
        assert_eq!(words, "alpha beta gamma");
    }

    #[test]
    fn citation_registers_its_area() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let mut lm = PageNumberCitationLayoutManager::new(LmId(1), "target".to_string(), style());
        let bps = drain(&mut lm, &mut run);
        assert_eq!(bps.len(), 1);
        assert_eq!(bps[0].ipd(), 18.0);

        let mut line = LineArea::new(14.4);
        let ctx = LayoutContext::new(1000.0, 500.0);
        lm.add_areas(PositionIterator::new(vec![bps[0].position().clone()]), &ctx, &mut run, &mut line)
            .unwrap();
        assert!(run.ids.has_pending());
        run.declare_id("target", None);
        assert_eq!(run.ids.take_resolutions().len(), 1);
    }

    #[test]
    fn citation_to_a_laid_out_id_is_measured_and_filled_in() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        run.begin_page(PageRef {
            index: 0,
            number: "7".to_string(),
        });
        run.declare_id("target", None);

        let mut lm = PageNumberCitationLayoutManager::new(LmId(1), "target".to_string(), style());
        let bps = drain(&mut lm, &mut run);
        assert_eq!(bps[0].ipd(), 6.0);

        let mut line = LineArea::new(14.4);
        let ctx = LayoutContext::new(1000.0, 500.0);
        lm.add_areas(PositionIterator::new(vec![bps[0].position().clone()]), &ctx, &mut run, &mut line)
            .unwrap();
        assert!(!run.ids.has_pending());
        assert_eq!(line.width, 6.0);
        assert_eq!(line.text(), "7");
    }

    #[test]
    fn container_rejects_runs_of_unknown_children() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let mut lm = InlineLayoutManager::new(LmId(0), None, None, style(), vec![Box::new(text_lm(1, "word"))]);
        drain(&mut lm, &mut run);
        let mut line = LineArea::new(14.4);
        let ctx = LayoutContext::new(1000.0, 500.0);
        let stray = PositionIterator::new(vec![Position::wrap(LmId(0), 0, Position::leaf(LmId(42), 0))]);
        assert!(lm.add_areas(stray, &ctx, &mut run, &mut line).is_err());
    }
}
