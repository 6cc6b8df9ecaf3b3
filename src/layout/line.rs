//! # Line Building
//!
//! Groups a run of inline children into lines. Lines are built on the first
//! request by pulling word-sized break possibilities from the children; when
//! a word does not fit, the child is rewound to the last word it placed and
//! the line is closed. Knowing every line up front is what lets orphans and
//! widows be expressed as plain break permissions between lines.

use crate::area::{Area, AreaContainer, LineArea};
use crate::error::{FolioError, Result};
use crate::model::SourceLocation;
use crate::style::{ResolvedStyle, TextAlign};

use super::break_poss::BreakPoss;
use super::context::LayoutContext;
use super::diagnostics::DiagnosticKind;
use super::manager::{check_position, check_positions, cursor_range, LayoutManager};
use super::position::{LmId, Position, PositionIterator};
use super::run::LayoutRun;

const EPSILON: f64 = 0.001;

#[derive(Debug, Clone)]
struct LineInfo {
    /// (child index, child position) for every word on the line.
    items: Vec<(usize, Position)>,
    width: f64,
    height: f64,
}

pub struct LineLayoutManager {
    id: LmId,
    style: ResolvedStyle,
    location: Option<SourceLocation>,
    children: Vec<Box<dyn LayoutManager>>,
    lines: Option<Vec<LineInfo>>,
    available: f64,
    cursor: usize,
    finished: bool,
}

impl LineLayoutManager {
    pub fn new(
        id: LmId,
        style: ResolvedStyle,
        location: Option<SourceLocation>,
        children: Vec<Box<dyn LayoutManager>>,
    ) -> Self {
        Self {
            id,
            style,
            location,
            children,
            lines: None,
            available: 0.0,
            cursor: 0,
            finished: false,
        }
    }

    fn build_lines(&mut self, ctx: &LayoutContext, run: &mut LayoutRun) -> Result<Vec<LineInfo>> {
        let available = ctx.ref_ipd;
        let min_height = self.style.line_box_height();
        let mut lines = Vec::new();
        let mut accepted: Vec<Option<Position>> = vec![None; self.children.len()];

        let mut current = LineInfo {
            items: Vec::new(),
            width: 0.0,
            height: min_height,
        };
        let mut pending_space = 0.0;
        let mut child_idx = 0;

        while child_idx < self.children.len() {
            let Some(bp) = self.children[child_idx].get_next_break_poss(ctx, run)? else {
                child_idx += 1;
                continue;
            };

            let gap = if current.items.is_empty() { 0.0 } else { pending_space };
            let needed = current.width + gap + bp.ipd();
            if needed > available + EPSILON && !current.items.is_empty() {
                // Give the word back and start a new line with it.
                self.children[child_idx].reset_position(accepted[child_idx].as_ref())?;
                lines.push(std::mem::replace(
                    &mut current,
                    LineInfo {
                        items: Vec::new(),
                        width: 0.0,
                        height: min_height,
                    },
                ));
                pending_space = 0.0;
                continue;
            }
            if bp.ipd() > available + EPSILON {
                let mut word = String::new();
                self.children[child_idx].get_word_chars(&mut word, Some(bp.position()), Some(bp.position()));
                run.diagnostics.warn(
                    DiagnosticKind::Overflow,
                    self.location.as_ref().map(|l| l.to_string()),
                    format!(
                        "{:?} is {:.1}pt wide but the line is {:.1}pt; placed on a line of its own",
                        word.trim_end(),
                        bp.ipd(),
                        available
                    ),
                );
            }

            current.width = needed;
            current.height = current.height.max(bp.bpd());
            pending_space = bp.space_after();
            accepted[child_idx] = Some(bp.position().clone());
            current.items.push((child_idx, bp.position().clone()));

            if bp.forced_after() {
                lines.push(std::mem::replace(
                    &mut current,
                    LineInfo {
                        items: Vec::new(),
                        width: 0.0,
                        height: min_height,
                    },
                ));
                pending_space = 0.0;
            }
        }
        if !current.items.is_empty() {
            lines.push(current);
        }
        log::debug!("{} built {} lines at {:.1}pt", self.id, lines.len(), available);
        Ok(lines)
    }

    /// Whether the page may break after line `k` (0-based) of `n`.
    fn break_allowed_after(&self, k: usize, n: usize) -> bool {
        let before = k + 1;
        let after = n - before;
        after == 0
            || (before >= self.style.min_orphan_lines as usize && after >= self.style.min_widow_lines as usize)
    }

    fn align_offset(&self, width: f64) -> f64 {
        let slack = (self.available - width).max(0.0);
        match self.style.text_align {
            TextAlign::Left | TextAlign::Justify => 0.0,
            TextAlign::Right => slack,
            TextAlign::Center => slack / 2.0,
        }
    }
}

impl LayoutManager for LineLayoutManager {
    fn id(&self) -> LmId {
        self.id
    }

    fn can_break_before(&self, _ctx: &LayoutContext) -> bool {
        match &self.lines {
            Some(lines) if self.cursor > 0 => self.break_allowed_after(self.cursor - 1, lines.len()),
            _ => true,
        }
    }

    fn get_next_break_poss(&mut self, ctx: &LayoutContext, run: &mut LayoutRun) -> Result<Option<BreakPoss>> {
        if self.lines.is_none() {
            self.available = ctx.ref_ipd;
            let lines = self.build_lines(ctx, run)?;
            self.lines = Some(lines);
        }
        let n = self.lines.as_ref().map_or(0, |l| l.len());
        let Some(line) = self.lines.as_ref().and_then(|l| l.get(self.cursor)) else {
            self.finished = true;
            return Ok(None);
        };
        let k = self.cursor;
        let bp = BreakPoss::new(Position::leaf(self.id, k), line.height)
            .with_ipd(line.width)
            .first(k == 0)
            .last(k + 1 == n)
            .with_can_break_before(self.can_break_before(ctx))
            .with_can_break_after(self.break_allowed_after(k, n));
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
        ctx: &LayoutContext,
        run: &mut LayoutRun,
        parent: &mut dyn AreaContainer,
    ) -> Result<()> {
        let positions: Vec<Position> = positions.collect();
        check_positions(self.id, &positions)?;
        let lines = self
            .lines
            .clone()
            .ok_or_else(|| FolioError::Internal(format!("{} replayed before its lines were built", self.id)))?;

        for pos in &positions {
            let info = lines
                .get(pos.index())
                .ok_or_else(|| FolioError::Internal(format!("{} has no line {}", self.id, pos.index())))?;
            let mut area = LineArea::new(info.height);
            area.x = self.align_offset(info.width);

            let mut items = info.items.iter().peekable();
            while let Some((child_idx, first)) = items.next() {
                let mut span = vec![first.clone()];
                while let Some((_, next)) = items.next_if(|(idx, _)| idx == child_idx) {
                    span.push(next.clone());
                }
                self.children[*child_idx].add_areas(PositionIterator::new(span), ctx, run, &mut area)?;
            }
            // Inline placement sums the widths; keep the measured line width.
            area.width = info.width;
            parent.add_child(Area::Line(area))?;
        }
        Ok(())
    }

    fn get_word_chars(&self, buf: &mut String, from: Option<&Position>, to: Option<&Position>) {
        match &self.lines {
            Some(lines) => {
                for line in &lines[cursor_range(from, to, lines.len())] {
                    for (child_idx, pos) in &line.items {
                        self.children[*child_idx].get_word_chars(buf, Some(pos), Some(pos));
                    }
                }
            }
            None => {
                for child in &self.children {
                    child.get_word_chars(buf, None, None);
                }
            }
        }
    }
}
