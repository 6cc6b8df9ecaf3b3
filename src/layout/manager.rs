//! The layout manager contract.

use std::rc::Rc;

use crate::area::{AreaContainer, PageRef, SlotId};
use crate::error::{FolioError, Result};
use crate::model::{Boundary, Node, SourceLocation};

use super::break_poss::BreakPoss;
use super::context::LayoutContext;
use super::position::{LmId, Position, PositionIterator};
use super::resolve::ResolveHandle;
use super::run::LayoutRun;

/// One manager per formatting node (a line manager covers a run of inline
/// nodes). Parents own their children; shared state travels in the
/// [`LayoutRun`].
///
/// A manager goes from fresh to producing to finished. Only
/// [`reset_position`](LayoutManager::reset_position) makes a finished
/// manager produce again.
pub trait LayoutManager {
    fn id(&self) -> LmId;

    /// Whether the areas this manager creates go on a line rather than
    /// stacking in a block.
    fn generates_inline_areas(&self) -> bool {
        false
    }

    /// Whether the next content may start a new line or page without
    /// violating a keep.
    fn can_break_before(&self, ctx: &LayoutContext) -> bool;

    /// Advance past the next span that can be broken after, or return `None`
    /// once the content is exhausted.
    fn get_next_break_poss(&mut self, ctx: &LayoutContext, run: &mut LayoutRun) -> Result<Option<BreakPoss>>;

    fn is_finished(&self) -> bool;

    fn set_finished(&mut self, finished: bool);

    /// Rewind so the next break possibility is the one following `pos`, or
    /// the first one when `pos` is `None`. Fails on a position this manager
    /// did not issue.
    fn reset_position(&mut self, pos: Option<&Position>) -> Result<()>;

    /// Create the areas for exactly the span of `positions`, adding them to
    /// `parent`.
    fn add_areas(
        &mut self,
        positions: PositionIterator,
        ctx: &LayoutContext,
        run: &mut LayoutRun,
        parent: &mut dyn AreaContainer,
    ) -> Result<()>;

    /// Append the literal text between two positions (inclusive; `None`
    /// means from the start or to the end).
    fn get_word_chars(&self, buf: &mut String, from: Option<&Position>, to: Option<&Position>);

    fn resolve_ref_id(&self, run: &LayoutRun, id: &str) -> Option<PageRef> {
        run.ids.resolve_ref_id(id).cloned()
    }

    fn add_id_to_page(&self, run: &mut LayoutRun, id: &str, location: Option<&SourceLocation>) {
        run.declare_id(id, location);
    }

    /// Register an area placed on the current page as waiting for `id`.
    fn add_unresolved_area(&self, run: &mut LayoutRun, id: &str, slot: SlotId) {
        let page = run.current_page().index;
        run.ids.add_unresolved_area(id, ResolveHandle { slot, page });
    }

    fn add_marker(&self, run: &mut LayoutRun, class_name: &str, content: Rc<Vec<Node>>, start: bool) {
        let page = run.current_page().index;
        run.markers.add_marker(class_name, self.id(), content, page, start);
    }

    /// The content of the `class_name` marker chosen for page `page`.
    fn retrieve_marker(
        &self,
        run: &LayoutRun,
        class_name: &str,
        page: usize,
        boundary: Boundary,
    ) -> Option<Rc<Vec<Node>>> {
        run.markers
            .retrieve_marker(class_name, page, boundary)
            .map(|entry| entry.content.clone())
    }

    fn current_page_number(&self, run: &LayoutRun) -> String {
        run.current_page().number.clone()
    }
}

/// Fail unless every position was issued by `lm`.
pub(crate) fn check_positions(lm: LmId, positions: &[Position]) -> Result<()> {
    match positions.iter().find(|p| p.lm() != lm) {
        Some(p) => Err(FolioError::PositionMismatch {
            expected: lm,
            found: p.lm(),
        }),
        None => Ok(()),
    }
}

/// Fail unless `pos`, when given, was issued by `lm`.
pub(crate) fn check_position(lm: LmId, pos: Option<&Position>) -> Result<()> {
    check_positions(lm, pos.map(std::slice::from_ref).unwrap_or_default())
}

/// The child of `parent` with id `child`.
pub(crate) fn child_mut(
    parent: LmId,
    children: &mut [Box<dyn LayoutManager>],
    child: LmId,
) -> Result<&mut Box<dyn LayoutManager>> {
    children
        .iter_mut()
        .find(|c| c.id() == child)
        .ok_or(FolioError::UnknownChild { parent, child })
}

/// Index range of own cursors covered by `from..=to`.
pub(crate) fn cursor_range(from: Option<&Position>, to: Option<&Position>, len: usize) -> std::ops::Range<usize> {
    let start = from.map_or(0, |p| p.index());
    let end = to.map_or(len, |p| (p.index() + 1).min(len));
    start.min(end)..end
}
