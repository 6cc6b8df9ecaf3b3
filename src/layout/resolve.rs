//! # Identifier Resolution
//!
//! Maps ids to the page that declares them and queues the areas waiting for
//! that page. A citation may be laid out before or after its target; either
//! way the registry hands the page tree one resolution per waiting area,
//! exactly once.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::area::{IdStatus, PageRef, Resolution, SlotId};

/// Where a waiting area lives: its slot and the page it was placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveHandle {
    pub slot: SlotId,
    pub page: usize,
}

/// Outcome of declaring an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    First,
    /// Already declared; the earlier page keeps the id.
    Duplicate { first: PageRef },
}

#[derive(Debug, Default)]
pub struct IdRegistry {
    declared: HashMap<String, PageRef>,
    pending: BTreeMap<String, Vec<ResolveHandle>>,
    ready: Vec<Resolution>,
    delivered: HashSet<SlotId>,
    not_found: BTreeMap<String, usize>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page declaring `id`, if it has been laid out.
    pub fn resolve_ref_id(&self, id: &str) -> Option<&PageRef> {
        self.declared.get(id)
    }

    /// Record that `id` is declared on `page`. The first declaration wins.
    pub fn add_id_to_page(&mut self, id: &str, page: &PageRef) -> Declaration {
        if let Some(first) = self.declared.get(id) {
            return Declaration::Duplicate {
                first: first.clone(),
            };
        }
        self.declared.insert(id.to_string(), page.clone());
        if let Some(waiting) = self.pending.remove(id) {
            log::debug!("id {:?} on page {} resolves {} waiting areas", id, page.index, waiting.len());
            for handle in waiting {
                self.queue(id, handle, Some(page.clone()));
            }
        }
        Declaration::First
    }

    /// Register an area waiting for `id`. Resolves at once when the id is
    /// already declared.
    pub fn add_unresolved_area(&mut self, id: &str, handle: ResolveHandle) {
        match self.declared.get(id).cloned() {
            Some(page) => self.queue(id, handle, Some(page)),
            None => self.pending.entry(id.to_string()).or_default().push(handle),
        }
    }

    fn queue(&mut self, id: &str, handle: ResolveHandle, target: Option<PageRef>) {
        debug_assert!(!self.delivered.contains(&handle.slot));
        self.delivered.insert(handle.slot);
        self.ready.push(Resolution {
            id: id.to_string(),
            slot: handle.slot,
            area_page: handle.page,
            target,
        });
    }

    /// Resolutions ready to be applied to pages already in the tree.
    pub fn take_resolutions(&mut self) -> Vec<Resolution> {
        std::mem::take(&mut self.ready)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// End of document: every area still waiting is resolved as "not found".
    /// Returns the remaining resolutions and the ids that were never
    /// declared, each with the number of areas that referenced it.
    pub fn finish(&mut self) -> (Vec<Resolution>, Vec<(String, usize)>) {
        let pending = std::mem::take(&mut self.pending);
        let mut missing = Vec::new();
        for (id, handles) in pending {
            missing.push((id.clone(), handles.len()));
            *self.not_found.entry(id.clone()).or_default() += handles.len();
            for handle in handles {
                self.queue(&id, handle, None);
            }
        }
        (self.take_resolutions(), missing)
    }

    /// Final status of every declared or referenced id.
    pub fn statuses(&self) -> BTreeMap<String, IdStatus> {
        let mut out: BTreeMap<String, IdStatus> = self
            .declared
            .iter()
            .map(|(id, page)| {
                (
                    id.clone(),
                    IdStatus::Resolved {
                        page_index: page.index,
                        page_number: page.number.clone(),
                    },
                )
            })
            .collect();
        for id in self.not_found.keys() {
            out.entry(id.clone()).or_insert(IdStatus::NotFound);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(index: usize) -> PageRef {
        PageRef {
            index,
            number: (index + 1).to_string(),
        }
    }

    fn handle(slot: u64, page: usize) -> ResolveHandle {
        ResolveHandle {
            slot: SlotId(slot),
            page,
        }
    }

    #[test]
    fn forward_reference_resolves_on_declaration() {
        let mut reg = IdRegistry::new();
        reg.add_unresolved_area("ch2", handle(1, 0));
        assert!(reg.take_resolutions().is_empty());
        assert!(reg.has_pending());

        assert_eq!(reg.add_id_to_page("ch2", &page(3)), Declaration::First);
        let res = reg.take_resolutions();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].area_page, 0);
        assert_eq!(res[0].target, Some(page(3)));
        assert!(!reg.has_pending());
    }

    #[test]
    fn backward_reference_resolves_immediately() {
        let mut reg = IdRegistry::new();
        reg.add_id_to_page("intro", &page(0));
        reg.add_unresolved_area("intro", handle(7, 2));
        let res = reg.take_resolutions();
        assert_eq!(res[0].slot, SlotId(7));
        assert_eq!(res[0].target, Some(page(0)));
    }

    #[test]
    fn first_declaration_wins() {
        let mut reg = IdRegistry::new();
        reg.add_id_to_page("x", &page(0));
        assert_eq!(
            reg.add_id_to_page("x", &page(1)),
            Declaration::Duplicate { first: page(0) }
        );
        assert_eq!(reg.resolve_ref_id("x"), Some(&page(0)));
    }

    #[test]
    fn finish_resolves_leftovers_as_not_found() {
        let mut reg = IdRegistry::new();
        reg.add_unresolved_area("ghost", handle(1, 0));
        reg.add_unresolved_area("ghost", handle(2, 1));
        reg.add_id_to_page("real", &page(0));

        let (res, missing) = reg.finish();
        assert_eq!(res.len(), 2);
        assert!(res.iter().all(|r| r.target.is_none()));
        assert_eq!(missing, vec![("ghost".to_string(), 2)]);

        let statuses = reg.statuses();
        assert_eq!(statuses["ghost"], IdStatus::NotFound);
        assert!(matches!(statuses["real"], IdStatus::Resolved { page_index: 0, .. }));
    }
}
