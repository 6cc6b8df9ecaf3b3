//! # Layout Managers
//!
//! Layout happens in two phases per page, and keeping them apart is the
//! point of the design:
//!
//! 1. **Breaking.** The page driver asks the flow for break possibilities.
//!    Each manager answers for its own content, asking its children in turn
//!    and accumulating their extents. Nothing is placed yet, so when a
//!    tentative break turns out to violate a keep, an orphan or widow
//!    constraint, the driver simply rewinds the flow to an earlier
//!    [`Position`] and asks again.
//! 2. **Materializing.** Once the break is final, the driver replays the
//!    chosen positions through `add_areas`, which builds the areas for
//!    exactly that span and never revisits a break decision.
//!
//! References to ids on later pages can't be settled during either phase.
//! Citation areas register with the [`IdRegistry`](resolve::IdRegistry) and
//! are patched once the declaring page is committed, or marked "not found"
//! when the document ends.

pub mod block;
pub mod break_poss;
pub mod builder;
pub mod context;
pub mod diagnostics;
pub mod inline;
pub mod line;
pub mod manager;
pub mod marker;
pub mod page;
pub mod page_break;
pub mod position;
pub mod resolve;
pub mod retrieve;
pub mod run;

use serde::Serialize;

pub use self::break_poss::BreakPoss;
pub use self::context::LayoutContext;
pub use self::diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use self::manager::LayoutManager;
pub use self::position::{LmId, Position, PositionIterator};
pub use self::run::LayoutRun;

use crate::area::AreaTree;
use crate::config::LayoutConfig;
use crate::error::{FolioError, Result};
use crate::model::Document;
use crate::text::TextMeasurer;

use self::builder::TreeBuilder;

/// The result of a layout run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOutput {
    pub area_tree: AreaTree,
    pub diagnostics: Vec<Diagnostic>,
}

impl LayoutOutput {
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: Option<LayoutConfig>,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` instead of the configuration embedded in documents.
    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    /// Main entry point: lay out a document into an area tree.
    ///
    /// An error aborts the whole run; no partial tree is returned.
    pub fn layout(&self, document: &Document, measurer: &dyn TextMeasurer) -> Result<LayoutOutput> {
        let config = self.config.as_ref().unwrap_or(&document.config);
        let mut run = LayoutRun::new(measurer, config);
        let mut tree = AreaTree::new();
        tree.metadata = document.metadata.clone();

        let mut sequences = TreeBuilder::new(&mut run, true).build_document(document);
        let mut next_number = 1;
        for sequence in sequences.iter_mut() {
            next_number = sequence.layout_pages(&mut run, &mut tree, next_number)?;
        }

        let (leftovers, missing) = run.ids.finish();
        for (id, count) in missing {
            run.diagnostics.warn(
                DiagnosticKind::UnresolvedReference,
                None,
                format!("id {:?} is referenced {} time(s) but never declared", id, count),
            );
        }
        tree.apply_resolutions(leftovers)?;

        let unresolved = tree.unresolved_count();
        if unresolved > 0 {
            return Err(FolioError::Internal(format!(
                "{} citation areas left unresolved",
                unresolved
            )));
        }

        tree.ids = run.ids.statuses();
        tree.bookmarks = std::mem::take(&mut run.bookmarks);
        log::debug!("laid out {} pages", tree.pages.len());

        Ok(LayoutOutput {
            area_tree: tree,
            diagnostics: run.diagnostics.into_vec(),
        })
    }
}
