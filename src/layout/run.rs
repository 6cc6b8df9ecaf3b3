//! Per-run state shared by every layout manager.

use std::collections::BTreeSet;

use crate::area::{Bookmark, PageRef, SlotId};
use crate::config::LayoutConfig;
use crate::model::SourceLocation;
use crate::text::TextMeasurer;

use super::diagnostics::{DiagnosticKind, Diagnostics};
use super::marker::MarkerRegistry;
use super::position::LmId;
use super::resolve::{Declaration, IdRegistry};

/// Everything one layout run owns besides the manager tree: the registries,
/// the diagnostics, and the page currently being filled.
pub struct LayoutRun<'a> {
    pub measurer: &'a dyn TextMeasurer,
    pub config: &'a LayoutConfig,
    pub ids: IdRegistry,
    /// Replaced at the start of every page sequence.
    pub markers: MarkerRegistry,
    pub diagnostics: Diagnostics,
    pub bookmarks: Vec<Bookmark>,
    page: PageRef,
    page_ids: BTreeSet<String>,
    next_lm: usize,
    next_slot: u64,
}

impl<'a> LayoutRun<'a> {
    pub fn new(measurer: &'a dyn TextMeasurer, config: &'a LayoutConfig) -> Self {
        Self {
            measurer,
            config,
            ids: IdRegistry::new(),
            markers: MarkerRegistry::new(),
            diagnostics: Diagnostics::default(),
            bookmarks: Vec::new(),
            page: PageRef {
                index: 0,
                number: "1".to_string(),
            },
            page_ids: BTreeSet::new(),
            next_lm: 0,
            next_slot: 0,
        }
    }

    pub fn allocate_lm_id(&mut self) -> LmId {
        let id = LmId(self.next_lm);
        self.next_lm += 1;
        id
    }

    pub fn allocate_slot(&mut self) -> SlotId {
        let slot = SlotId(self.next_slot);
        self.next_slot += 1;
        slot
    }

    /// The page being filled or materialized.
    pub fn current_page(&self) -> &PageRef {
        &self.page
    }

    pub fn begin_page(&mut self, page: PageRef) {
        self.page = page;
        self.page_ids.clear();
    }

    /// Ids first declared on the current page.
    pub fn take_page_ids(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.page_ids)
    }

    /// Declare `id` on the current page. Later declarations of the same id
    /// lose and are reported.
    pub fn declare_id(&mut self, id: &str, location: Option<&SourceLocation>) {
        let page = self.page.clone();
        match self.ids.add_id_to_page(id, &page) {
            Declaration::First => {
                self.page_ids.insert(id.to_string());
            }
            Declaration::Duplicate { first } => self.diagnostics.warn(
                DiagnosticKind::DuplicateId,
                location.map(|l| l.to_string()),
                format!(
                    "id {:?} declared again on page {}; keeping page {}",
                    id, page.number, first.number
                ),
            ),
        }
    }
}
