//! # Page Sequence Driver
//!
//! Fills pages one at a time:
//!
//! 1. Ask the flow for break possibilities until one no longer fits, a
//!    break is forced, or the content ends.
//! 2. If the page is full, walk back to a permitted break and rewind the
//!    flow to it.
//! 3. Replay the chosen positions into the body region, then lay out the
//!    header and footer for this page (they may retrieve markers the body
//!    just captured).
//! 4. Commit the page and deliver any citation resolutions that became
//!    ready.

use crate::area::{AreaTree, PageRef, PageViewport, RegionArea};
use crate::error::Result;
use crate::model::{Node, PageConfig};
use crate::style::ResolvedStyle;

use super::block::BlockLayoutManager;
use super::break_poss::BreakPoss;
use super::builder::build_static;
use super::context::LayoutContext;
use super::diagnostics::DiagnosticKind;
use super::manager::LayoutManager;
use super::marker::MarkerRegistry;
use super::page_break::{break_permitted, choose_break, BreakDecision};
use super::position::{LmId, Position, PositionIterator};
use super::run::LayoutRun;

const EPSILON: f64 = 0.001;

/// Whether the previous page was cut inside content with no permitted
/// break, so a run spilling onto this page is reported only once.
#[derive(Debug, Default)]
struct Spill {
    forced: bool,
}

pub struct PageSequenceLayoutManager {
    id: LmId,
    config: PageConfig,
    style: ResolvedStyle,
    flow: Option<BlockLayoutManager>,
    header: Option<Node>,
    footer: Option<Node>,
}

impl PageSequenceLayoutManager {
    pub fn new(
        id: LmId,
        config: PageConfig,
        style: ResolvedStyle,
        flow: Option<BlockLayoutManager>,
        header: Option<Node>,
        footer: Option<Node>,
    ) -> Self {
        Self {
            id,
            config,
            style,
            flow,
            header,
            footer,
        }
    }

    /// Lay out every page of the sequence into `tree`. Numbering starts at
    /// `next_number` unless the sequence restarts it; returns the number the
    /// following sequence continues from.
    pub fn layout_pages(&mut self, run: &mut LayoutRun, tree: &mut AreaTree, next_number: u32) -> Result<u32> {
        run.markers = MarkerRegistry::new();
        let mut number = self.config.initial_page_number.unwrap_or(next_number);
        let Some(flow) = self.flow.as_mut() else {
            log::debug!("{} has no flow to lay out", self.id);
            return Ok(number);
        };

        let (page_w, page_h) = self.config.size.dimensions();
        let (body_w, body_h) = self.config.body_dimensions();
        let margin = self.config.margin;
        let header_h = self.config.header_extent;
        let footer_h = self.config.footer_extent;
        let max_backtrack = run.config.max_backtrack;
        let mut spill = Spill::default();
        let mut first_page = true;

        loop {
            let page = PageRef {
                index: tree.pages.len(),
                number: self.config.number_format.format(number),
            };
            run.begin_page(page.clone());

            let ctx = LayoutContext::new(body_h, body_w);
            let Some(span) = fill_page(flow, &ctx, run, body_h, max_backtrack, &mut spill)? else {
                break;
            };

            let mut body = RegionArea::new(margin.left, margin.top + header_h, body_w, body_h);
            flow.add_areas(PositionIterator::new(span), &ctx, run, &mut body)?;

            let header = match &self.header {
                Some(node) => Some(static_region(
                    run,
                    node,
                    &self.style,
                    RegionArea::new(margin.left, margin.top, body_w, header_h),
                    first_page,
                )?),
                None => None,
            };
            let footer = match &self.footer {
                Some(node) => Some(static_region(
                    run,
                    node,
                    &self.style,
                    RegionArea::new(margin.left, page_h - margin.bottom - footer_h, body_w, footer_h),
                    first_page,
                )?),
                None => None,
            };

            log::debug!(
                "{} committed page {} ({}) with {:.1}pt of {:.1}pt used",
                self.id,
                page.index,
                page.number,
                body.content_height(),
                body_h
            );
            tree.add_page(PageViewport {
                index: page.index,
                number: page.number,
                width: page_w,
                height: page_h,
                header,
                body,
                footer,
                ids: run.take_page_ids(),
            });
            tree.apply_resolutions(run.ids.take_resolutions())?;
            first_page = false;
            number = number.saturating_add(1);
        }
        Ok(number)
    }
}

/// Collect the candidates for one page and settle where it ends. Returns
/// the positions to materialize, or `None` when the flow is exhausted.
fn fill_page(
    flow: &mut dyn LayoutManager,
    ctx: &LayoutContext,
    run: &mut LayoutRun,
    body_h: f64,
    max_backtrack: usize,
    spill: &mut Spill,
) -> Result<Option<Vec<Position>>> {
    let mut candidates: Vec<BreakPoss> = Vec::new();
    let mut used = 0.0;
    let mut pending_space = 0.0;
    let mut overflowing: Option<BreakPoss> = None;

    loop {
        let request = ctx
            .with_stack_limit((body_h - used).max(0.0))
            .with_pending_space(pending_space)
            .at_top(candidates.is_empty());
        let Some(bp) = flow.get_next_break_poss(&request, run)? else {
            break;
        };

        if let Some(prev) = candidates.last() {
            if bp.forced_before() {
                flow.reset_position(Some(prev.position()))?;
                break;
            }
            if bp.overflow() {
                flow.reset_position(Some(prev.position()))?;
                overflowing = Some(bp);
                break;
            }
            // Conditional space survives only between two pieces of content
            // on the same page.
            used += pending_space + bp.space_before() + bp.bpd();
        } else {
            used = bp.bpd();
            if bp.overflow() {
                run.diagnostics.warn(
                    DiagnosticKind::Overflow,
                    None,
                    format!(
                        "content {:.1}pt tall does not fit the {:.1}pt body of page {}; placed alone",
                        used,
                        body_h,
                        run.current_page().number
                    ),
                );
            }
        }

        pending_space = bp.space_after();
        let forced = bp.forced_after();
        candidates.push(bp);
        if forced {
            break;
        }
    }

    let Some(last) = candidates.len().checked_sub(1) else {
        spill.forced = false;
        return Ok(None);
    };
    let chosen = match &overflowing {
        None => {
            spill.forced = false;
            last
        }
        Some(next) => match choose_break(&candidates, Some(next), max_backtrack) {
            BreakDecision::Break { index } => {
                spill.forced = false;
                index
            }
            BreakDecision::Forced { index } => {
                let continued = spill.forced && !(0..index).any(|k| break_permitted(&candidates, Some(next), k));
                // Content taller than the page was reported when placed.
                if !continued && !candidates[0].overflow() {
                    run.diagnostics.warn(
                        DiagnosticKind::Overflow,
                        None,
                        format!(
                            "no permitted break within {} candidates on page {}; breaking anyway",
                            max_backtrack,
                            run.current_page().number
                        ),
                    );
                }
                spill.forced = true;
                index
            }
        },
    };
    if chosen < last {
        log::debug!("backtracked {} candidates on page {}", last - chosen, run.current_page().number);
        flow.reset_position(Some(candidates[chosen].position()))?;
    }

    candidates.truncate(chosen + 1);
    Ok(Some(candidates.into_iter().map(BreakPoss::into_position).collect()))
}

/// Lay out static content completely into `region`.
fn static_region(
    run: &mut LayoutRun,
    node: &Node,
    style: &ResolvedStyle,
    mut region: RegionArea,
    declare: bool,
) -> Result<RegionArea> {
    let Some(mut lm) = build_static(run, node, style, declare) else {
        return Ok(region);
    };
    let ctx = LayoutContext::new(region.height, region.width);
    let mut positions = Vec::new();
    while let Some(bp) = lm.get_next_break_poss(&ctx, run)? {
        positions.push(bp.into_position());
    }
    lm.add_areas(PositionIterator::new(positions), &ctx, run, &mut region)?;

    if region.content_height() > region.height + EPSILON {
        run.diagnostics.warn(
            DiagnosticKind::Overflow,
            node.source_location.as_ref().map(|l| l.to_string()),
            format!(
                "static content is {:.1}pt tall but its region is {:.1}pt on page {}",
                region.content_height(),
                region.height,
                run.current_page().number
            ),
        );
    }
    Ok(region)
}
