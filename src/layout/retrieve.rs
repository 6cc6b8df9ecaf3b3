//! Retrieve-marker and explicit page-break managers.

use crate::area::AreaContainer;
use crate::error::{FolioError, Result};
use crate::model::Boundary;
use crate::style::ResolvedStyle;

use super::block::BlockLayoutManager;
use super::break_poss::BreakPoss;
use super::builder::TreeBuilder;
use super::context::LayoutContext;
use super::manager::{check_position, check_positions, LayoutManager};
use super::position::{LmId, Position, PositionIterator};
use super::run::LayoutRun;

/// Lays out the content of a marker chosen for the current page. The
/// marker is looked up on the first request, after the page's flow content
/// has been materialized.
pub struct RetrieveMarkerLayoutManager {
    id: LmId,
    class_name: String,
    boundary: Boundary,
    style: ResolvedStyle,
    content: Option<BlockLayoutManager>,
    looked_up: bool,
    finished: bool,
}

impl RetrieveMarkerLayoutManager {
    pub fn new(id: LmId, class_name: String, boundary: Boundary, style: ResolvedStyle) -> Self {
        Self {
            id,
            class_name,
            boundary,
            style,
            content: None,
            looked_up: false,
            finished: false,
        }
    }

    fn look_up(&mut self, run: &mut LayoutRun) {
        if self.looked_up {
            return;
        }
        self.looked_up = true;
        let page = run.current_page().index;
        match self.retrieve_marker(run, &self.class_name, page, self.boundary) {
            Some(nodes) => {
                let content = TreeBuilder::new(run, false)
                    .declaring(false)
                    .build_marker_content(&nodes, &self.style);
                self.content = Some(content);
            }
            None => log::debug!(
                "no {:?} marker for page {} ({:?})",
                self.class_name,
                run.current_page().number,
                self.boundary
            ),
        }
    }
}

impl LayoutManager for RetrieveMarkerLayoutManager {
    fn id(&self) -> LmId {
        self.id
    }

    fn can_break_before(&self, ctx: &LayoutContext) -> bool {
        self.content.as_ref().map_or(true, |c| c.can_break_before(ctx))
    }

    fn get_next_break_poss(&mut self, ctx: &LayoutContext, run: &mut LayoutRun) -> Result<Option<BreakPoss>> {
        self.look_up(run);
        let Some(content) = self.content.as_mut() else {
            self.finished = true;
            return Ok(None);
        };
        match content.get_next_break_poss(ctx, run)? {
            Some(bp) => Ok(Some(bp.rewrap(Position::wrap(self.id, 0, bp.position().clone())))),
            None => {
                self.finished = true;
                Ok(None)
            }
        }
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
        match self.content.as_mut() {
            Some(content) => content.reset_position(pos.and_then(|p| p.inner())),
            None => Ok(()),
        }
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
        let Some(content) = self.content.as_mut() else {
            return match positions.next_child_run() {
                Some((child, _)) => Err(FolioError::UnknownChild { parent: self.id, child }),
                None => Ok(()),
            };
        };
        while let Some((child, span)) = positions.next_child_run() {
            if child != content.id() {
                return Err(FolioError::UnknownChild { parent: self.id, child });
            }
            content.add_areas(span, ctx, run, parent)?;
        }
        Ok(())
    }

    fn get_word_chars(&self, buf: &mut String, from: Option<&Position>, to: Option<&Position>) {
        if let Some(content) = &self.content {
            content.get_word_chars(buf, from.and_then(|p| p.inner()), to.and_then(|p| p.inner()));
        }
    }
}

/// An explicit page break: no extent, and the page must end after it.
pub struct BreakLayoutManager {
    id: LmId,
    done: bool,
}

impl BreakLayoutManager {
    pub fn new(id: LmId) -> Self {
        Self { id, done: false }
    }
}

impl LayoutManager for BreakLayoutManager {
    fn id(&self) -> LmId {
        self.id
    }

    fn can_break_before(&self, _ctx: &LayoutContext) -> bool {
        true
    }

    fn get_next_break_poss(&mut self, _ctx: &LayoutContext, _run: &mut LayoutRun) -> Result<Option<BreakPoss>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        Ok(Some(
            BreakPoss::new(Position::leaf(self.id, 0), 0.0)
                .first(true)
                .last(true)
                .with_forced_after(true),
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
        _run: &mut LayoutRun,
        _parent: &mut dyn AreaContainer,
    ) -> Result<()> {
        let positions: Vec<Position> = positions.collect();
        check_positions(self.id, &positions)
    }

    fn get_word_chars(&self, _buf: &mut String, _from: Option<&Position>, _to: Option<&Position>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::area::RegionArea;
    use crate::config::{FontDefaults, LayoutConfig};
    use crate::model::Node;
    use crate::style::Style;
    use crate::text::FixedPitchMeasurer;

    fn root() -> ResolvedStyle {
        ResolvedStyle::root(&FontDefaults::default(), 2, 2)
    }

    #[test]
    fn retrieved_content_is_laid_out() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        run.markers.add_marker(
            "chapter",
            LmId(50),
            Rc::new(vec![Node::paragraph("Chapter One", Style::default())]),
            0,
            true,
        );

        let mut lm = RetrieveMarkerLayoutManager::new(LmId(0), "chapter".to_string(), Boundary::AtOrBefore, root());
        let ctx = LayoutContext::new(100.0, 400.0);
        let mut positions = Vec::new();
        while let Some(bp) = lm.get_next_break_poss(&ctx, &mut run).unwrap() {
            positions.push(bp.into_position());
        }
        let mut region = RegionArea::new(0.0, 0.0, 400.0, 100.0);
        lm.add_areas(PositionIterator::new(positions), &ctx, &mut run, &mut region)
            .unwrap();
        assert_eq!(region.text_lines(), vec!["Chapter One"]);
    }

    #[test]
    fn retrieved_content_only_accepts_its_own_positions() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        run.markers.add_marker(
            "chapter",
            LmId(50),
            Rc::new(vec![Node::paragraph("Chapter One", Style::default())]),
            0,
            true,
        );
        let mut lm = RetrieveMarkerLayoutManager::new(LmId(0), "chapter".to_string(), Boundary::AtOrBefore, root());
        let ctx = LayoutContext::new(100.0, 400.0);
        while lm.get_next_break_poss(&ctx, &mut run).unwrap().is_some() {}

        let mut region = RegionArea::new(0.0, 0.0, 400.0, 100.0);
        let stray = PositionIterator::new(vec![Position::wrap(LmId(0), 0, Position::leaf(LmId(999), 0))]);
        let err = lm.add_areas(stray, &ctx, &mut run, &mut region).unwrap_err();
        assert!(matches!(err, FolioError::UnknownChild { child: LmId(999), .. }));
        assert!(lm.reset_position(Some(&Position::leaf(LmId(3), 0))).is_err());
    }

    #[test]
    fn missing_marker_yields_nothing() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let mut lm = RetrieveMarkerLayoutManager::new(LmId(0), "none".to_string(), Boundary::AtOrBefore, root());
        let ctx = LayoutContext::new(100.0, 400.0);
        assert!(lm.get_next_break_poss(&ctx, &mut run).unwrap().is_none());
        assert!(lm.is_finished());
    }

    #[test]
    fn page_break_forces_a_break_after_itself() {
        let m = FixedPitchMeasurer::default();
        let config = LayoutConfig::default();
        let mut run = LayoutRun::new(&m, &config);
        let mut lm = BreakLayoutManager::new(LmId(3));
        let ctx = LayoutContext::new(100.0, 400.0);
        let bp = lm.get_next_break_poss(&ctx, &mut run).unwrap().unwrap();
        assert!(bp.forced_after());
        assert_eq!(bp.bpd(), 0.0);
        assert!(lm.get_next_break_poss(&ctx, &mut run).unwrap().is_none());
    }
}
