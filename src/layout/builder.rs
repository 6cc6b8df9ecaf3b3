//! Builds layout managers from the document tree.
//!
//! Content-model checks happen here: inline content directly in a flow or
//! static region, block content inside an inline, retrieve-markers outside
//! static content, and nested sequence structure are all violations. The
//! leniency flag of the enclosing construct decides whether the offending
//! child is skipped with a warning or the construct itself is abandoned
//! with an error.

use std::rc::Rc;

use crate::config::Construct;
use crate::model::{Document, FixedPosition, Node, NodeKind, PageConfig, SourceLocation};
use crate::style::ResolvedStyle;
use crate::text::measure_words;

use super::block::{BlockLayoutManager, BlockRole};
use super::diagnostics::DiagnosticKind;
use super::inline::{
    InlineLayoutManager, PageNumberCitationLayoutManager, PageNumberLayoutManager, TextLayoutManager,
};
use super::line::LineLayoutManager;
use super::manager::LayoutManager;
use super::page::PageSequenceLayoutManager;
use super::retrieve::{BreakLayoutManager, RetrieveMarkerLayoutManager};
use super::run::LayoutRun;

type Markers = Vec<(String, Rc<Vec<Node>>)>;

struct BlockContent {
    children: Vec<Box<dyn LayoutManager>>,
    markers: Markers,
}

/// Where block-level children are being built.
#[derive(Debug, Clone, Copy)]
struct Scope {
    construct: Construct,
    in_static: bool,
}

pub(crate) struct TreeBuilder<'r, 'a> {
    run: &'r mut LayoutRun<'a>,
    /// Record content-model violations. Off when rebuilding content that
    /// was already checked (static content for every page, retrieved
    /// markers).
    report: bool,
    /// Let blocks and inlines declare their ids and bookmarks. Off for every
    /// copy of repeated content but the first.
    declare: bool,
}

impl<'r, 'a> TreeBuilder<'r, 'a> {
    pub fn new(run: &'r mut LayoutRun<'a>, report: bool) -> Self {
        Self {
            run,
            report,
            declare: true,
        }
    }

    pub fn declaring(mut self, declare: bool) -> Self {
        self.declare = declare;
        self
    }

    pub fn root_style(&self) -> ResolvedStyle {
        let config = self.run.config;
        ResolvedStyle::root(&config.font, config.orphans, config.widows)
    }

    /// One driver per page sequence. Top-level content outside any sequence
    /// is wrapped into sequences using the document's default page.
    pub fn build_document(&mut self, doc: &Document) -> Vec<PageSequenceLayoutManager> {
        let root = self.root_style();
        let mut sequences = Vec::new();
        let mut loose: Vec<Node> = Vec::new();

        for node in &doc.children {
            match &node.kind {
                NodeKind::PageSequence { config } => {
                    if !loose.is_empty() {
                        let wrapped = Node::page_sequence(None, std::mem::take(&mut loose));
                        sequences.push(self.build_page_sequence(&wrapped, doc.default_page.clone(), &root));
                    }
                    let config = config.clone().unwrap_or_else(|| doc.default_page.clone());
                    sequences.push(self.build_page_sequence(node, config, &root));
                }
                _ => loose.push(node.clone()),
            }
        }
        if !loose.is_empty() {
            let wrapped = Node::page_sequence(None, loose);
            sequences.push(self.build_page_sequence(&wrapped, doc.default_page.clone(), &root));
        }
        sequences
    }

    fn build_page_sequence(
        &mut self,
        node: &Node,
        config: PageConfig,
        root: &ResolvedStyle,
    ) -> PageSequenceLayoutManager {
        let id = self.run.allocate_lm_id();
        let style = node.style.resolve(root);

        let mut flow = Node::flow(Vec::new());
        let mut header = None;
        let mut footer = None;
        for child in &node.children {
            match &child.kind {
                NodeKind::Flow => {
                    flow.style = child.style.clone();
                    flow.source_location = child.source_location.clone();
                    flow.children.extend(child.children.iter().cloned());
                }
                NodeKind::StaticContent { position } => match position {
                    FixedPosition::Header => header = Some(child.clone()),
                    FixedPosition::Footer => footer = Some(child.clone()),
                },
                _ => flow.children.push(child.clone()),
            }
        }

        let flow_lm = self.build_region(&flow, &style, Construct::Flow, false);
        // Static content is rebuilt for every page; check it once here.
        for region in header.iter().chain(footer.iter()) {
            let _ = self.build_region(region, &style, Construct::StaticContent, true);
        }
        log::debug!(
            "{} page sequence: {} flow children, header: {}, footer: {}",
            id,
            flow.children.len(),
            header.is_some(),
            footer.is_some()
        );
        PageSequenceLayoutManager::new(id, config, style, flow_lm, header, footer)
    }

    /// A flow or static region: a block manager in the flow role.
    pub fn build_region(
        &mut self,
        node: &Node,
        parent_style: &ResolvedStyle,
        construct: Construct,
        in_static: bool,
    ) -> Option<BlockLayoutManager> {
        let id = self.run.allocate_lm_id();
        let style = node.style.resolve(parent_style);
        let scope = Scope { construct, in_static };
        let content = self.build_block_children(&node.children, &style, scope, node)?;
        Some(
            BlockLayoutManager::new(id, BlockRole::Flow, style, content.children)
                .with_location(node.source_location.clone()),
        )
    }

    /// Content of a retrieved marker, laid out like the inside of a block.
    pub fn build_marker_content(&mut self, nodes: &[Node], style: &ResolvedStyle) -> BlockLayoutManager {
        let id = self.run.allocate_lm_id();
        let holder = Node::block(Default::default(), Vec::new());
        let scope = Scope {
            construct: Construct::Block,
            in_static: true,
        };
        let children = self
            .build_block_children(nodes, style, scope, &holder)
            .map(|c| c.children)
            .unwrap_or_default();
        BlockLayoutManager::new(id, BlockRole::Flow, style.clone(), children)
    }

    /// Returns `false` when the enclosing construct must be abandoned.
    fn violation(&mut self, construct: Construct, child: &Node, parent: &Node) -> bool {
        let lenient = self.run.config.leniency.is_lenient(construct);
        if self.report {
            let location = child
                .source_location
                .as_ref()
                .or(parent.source_location.as_ref())
                .map(SourceLocation::to_string);
            if lenient {
                self.run.diagnostics.warn(
                    DiagnosticKind::Structural,
                    location,
                    format!("{} is not allowed in {}; skipped", child.kind_name(), parent.kind_name()),
                );
            } else {
                self.run.diagnostics.error(
                    DiagnosticKind::Structural,
                    location,
                    format!(
                        "{} is not allowed in {}; the {} is not laid out",
                        child.kind_name(),
                        parent.kind_name(),
                        parent.kind_name()
                    ),
                );
            }
        }
        lenient
    }

    fn build_block_children(
        &mut self,
        children: &[Node],
        style: &ResolvedStyle,
        scope: Scope,
        parent: &Node,
    ) -> Option<BlockContent> {
        let inline_allowed = matches!(scope.construct, Construct::Block);
        let mut out: Vec<Box<dyn LayoutManager>> = Vec::new();
        let mut markers = Vec::new();
        let mut inline_run: Vec<&Node> = Vec::new();

        for child in children {
            if child.is_inline_level() {
                if inline_allowed {
                    inline_run.push(child);
                } else if !self.violation(scope.construct, child, parent) {
                    return None;
                }
                continue;
            }
            self.flush_line(&mut inline_run, style, parent, scope, &mut out);

            match &child.kind {
                NodeKind::Block => {
                    if let Some(block) = self.build_block(child, style, scope.in_static) {
                        out.push(Box::new(block));
                    }
                }
                NodeKind::PageBreak if !scope.in_static => {
                    out.push(Box::new(BreakLayoutManager::new(self.run.allocate_lm_id())));
                }
                NodeKind::RetrieveMarker { class_name, boundary } if scope.in_static => {
                    let id = self.run.allocate_lm_id();
                    out.push(Box::new(RetrieveMarkerLayoutManager::new(
                        id,
                        class_name.clone(),
                        *boundary,
                        style.clone(),
                    )));
                }
                NodeKind::Marker { class_name } if matches!(scope.construct, Construct::Block) && !scope.in_static => {
                    if self.report {
                        // Check the content now; retrieval rebuilds it quietly.
                        let _ = self.build_marker_content(&child.children, style);
                    }
                    markers.push((class_name.clone(), Rc::new(child.children.clone())));
                }
                _ => {
                    if !self.violation(scope.construct, child, parent) {
                        return None;
                    }
                }
            }
        }
        self.flush_line(&mut inline_run, style, parent, scope, &mut out);

        Some(BlockContent {
            children: out,
            markers,
        })
    }

    fn build_block(&mut self, node: &Node, parent_style: &ResolvedStyle, in_static: bool) -> Option<BlockLayoutManager> {
        let id = self.run.allocate_lm_id();
        let style = node.style.resolve(parent_style);
        let scope = Scope {
            construct: Construct::Block,
            in_static,
        };
        let content = self.build_block_children(&node.children, &style, scope, node)?;
        Some(
            BlockLayoutManager::new(id, BlockRole::Block, style, content.children)
                .with_node_id(node.id.clone())
                .with_location(node.source_location.clone())
                .with_bookmark(node.bookmark.clone())
                .with_markers(content.markers)
                .declaring(self.declare),
        )
    }

    /// Turn a pending run of inline nodes into one line manager.
    fn flush_line(
        &mut self,
        inline_run: &mut Vec<&Node>,
        style: &ResolvedStyle,
        parent: &Node,
        scope: Scope,
        out: &mut Vec<Box<dyn LayoutManager>>,
    ) {
        if inline_run.is_empty() {
            return;
        }
        let id = self.run.allocate_lm_id();
        let mut children = Vec::new();
        for node in inline_run.drain(..) {
            if let Some(lm) = self.build_inline(node, style, scope.in_static) {
                children.push(lm);
            }
        }
        out.push(Box::new(LineLayoutManager::new(
            id,
            style.clone(),
            parent.source_location.clone(),
            children,
        )));
    }

    fn build_inline(&mut self, node: &Node, parent_style: &ResolvedStyle, in_static: bool) -> Option<Box<dyn LayoutManager>> {
        let style = node.style.resolve(parent_style);
        let id = self.run.allocate_lm_id();
        match &node.kind {
            NodeKind::Text { content } => {
                let words = measure_words(content, &style.font, self.run.measurer);
                Some(Box::new(TextLayoutManager::new(id, words, style)))
            }
            NodeKind::PageNumber => Some(Box::new(PageNumberLayoutManager::new(id, style))),
            NodeKind::PageNumberCitation { ref_id } => Some(Box::new(PageNumberCitationLayoutManager::new(
                id,
                ref_id.clone(),
                style,
            ))),
            NodeKind::Inline => {
                let mut children = Vec::new();
                for child in &node.children {
                    if child.is_inline_level() {
                        if let Some(lm) = self.build_inline(child, &style, in_static) {
                            children.push(lm);
                        }
                    } else if !self.violation(Construct::Inline, child, node) {
                        return None;
                    }
                }
                Some(Box::new(
                    InlineLayoutManager::new(id, node.id.clone(), node.source_location.clone(), style, children)
                        .declaring(self.declare),
                ))
            }
            _ => None,
        }
    }
}

/// Lay out one static region's content for the current page. Only the copy
/// built for the first page of a sequence declares ids and bookmarks.
pub(crate) fn build_static(
    run: &mut LayoutRun,
    node: &Node,
    style: &ResolvedStyle,
    declare: bool,
) -> Option<BlockLayoutManager> {
    TreeBuilder::new(run, false)
        .declaring(declare)
        .build_region(node, style, Construct::StaticContent, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::diagnostics::Severity;
    use crate::style::Style;
    use crate::text::FixedPitchMeasurer;

    fn build(doc: &Document, config: &LayoutConfig) -> (usize, Vec<(Severity, String)>) {
        let m = FixedPitchMeasurer::default();
        let mut run = LayoutRun::new(&m, config);
        let sequences = TreeBuilder::new(&mut run, true).build_document(doc);
        let found = run
            .diagnostics
            .iter()
            .map(|d| (d.severity, d.message.clone()))
            .collect();
        (sequences.len(), found)
    }

    #[test]
    fn loose_content_is_wrapped_into_a_sequence() {
        let doc = Document {
            children: vec![Node::paragraph("Hello", Style::default())],
            ..Default::default()
        };
        let (sequences, diagnostics) = build(&doc, &LayoutConfig::default());
        assert_eq!(sequences, 1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn inline_under_flow_is_reported() {
        let mut config = LayoutConfig::default();
        config.leniency.flow = true;
        let doc = Document {
            children: vec![Node::page_sequence(None, vec![Node::flow(vec![Node::text("stray")])])],
            ..Default::default()
        };
        let (_, diagnostics) = build(&doc, &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].0, Severity::Warning);
        assert!(diagnostics[0].1.contains("Text is not allowed in Flow"));
    }

    #[test]
    fn block_in_inline_is_an_error_when_strict() {
        let mut config = LayoutConfig::default();
        config.leniency.inline = false;
        let doc = Document {
            children: vec![Node::block(
                Style::default(),
                vec![Node::inline(Style::default(), vec![Node::block(Style::default(), vec![])])],
            )],
            ..Default::default()
        };
        let (_, diagnostics) = build(&doc, &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].0, Severity::Error);
    }

    #[test]
    fn retrieve_marker_outside_static_content() {
        let doc = Document {
            children: vec![Node::retrieve_marker("chapter", Default::default())],
            ..Default::default()
        };
        let mut config = LayoutConfig::default();
        config.leniency.flow = true;
        let (_, diagnostics) = build(&doc, &config);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].1.starts_with("RetrieveMarker"));
    }
}
