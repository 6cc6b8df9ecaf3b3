//! # Marker Registry
//!
//! Markers are captured while the flow materializes and retrieved by static
//! content of the same page sequence. A marker opens on the page where its
//! owning block starts and closes on the page where the block ends.

use std::rc::Rc;

use crate::model::{Boundary, Node};

use super::position::LmId;

#[derive(Debug, Clone)]
pub struct MarkerEntry {
    pub class_name: String,
    pub owner: LmId,
    pub content: Rc<Vec<Node>>,
    /// Page index where the marker was captured.
    pub page: usize,
    /// Page index where the owning block ended, once known.
    pub closed_on: Option<usize>,
    seq: usize,
}

impl MarkerEntry {
    /// Still open on `page`: not closed before it.
    fn is_open_on(&self, page: usize) -> bool {
        self.closed_on.map_or(true, |closed| closed >= page)
    }
}

/// Markers of one page sequence.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    entries: Vec<MarkerEntry>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a marker. `start` is true for the area holding the start of
    /// the owning block and false for the area holding its end; a block laid
    /// out in one area reports both.
    pub fn add_marker(&mut self, class_name: &str, owner: LmId, content: Rc<Vec<Node>>, page: usize, start: bool) {
        if start {
            let seq = self.entries.len();
            self.entries.push(MarkerEntry {
                class_name: class_name.to_string(),
                owner,
                content,
                page,
                closed_on: None,
                seq,
            });
            return;
        }
        if let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|e| e.owner == owner && e.class_name == class_name)
        {
            entry.closed_on.get_or_insert(page);
        }
    }

    /// The marker of `class_name` that static content on page `page` shows.
    pub fn retrieve_marker(&self, class_name: &str, page: usize, boundary: Boundary) -> Option<&MarkerEntry> {
        let of_class = || self.entries.iter().filter(move |e| e.class_name == class_name);
        match boundary {
            Boundary::AtOrBefore => {
                let open = of_class()
                    .filter(|e| e.page <= page && e.is_open_on(page))
                    .max_by_key(|e| e.seq);
                open.or_else(|| of_class().filter(|e| e.page <= page).max_by_key(|e| e.seq))
            }
            Boundary::AtOrAfter => {
                let first_page = of_class().filter(|e| e.page >= page).map(|e| e.page).min()?;
                of_class()
                    .filter(|e| e.page == first_page)
                    .max_by_key(|e| e.seq)
            }
            Boundary::FirstInSequence => of_class().min_by_key(|e| e.seq),
            Boundary::LastInSequence => of_class().max_by_key(|e| e.seq),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(text: &str) -> Rc<Vec<Node>> {
        Rc::new(vec![Node::text(text)])
    }

    fn text_of(entry: &MarkerEntry) -> String {
        match &entry.content[0].kind {
            crate::model::NodeKind::Text { content } => content.clone(),
            _ => String::new(),
        }
    }

    #[test]
    fn at_or_before_sees_earlier_pages_only() {
        let mut reg = MarkerRegistry::new();
        reg.add_marker("chapter", LmId(3), content("Three"), 2, true);
        reg.add_marker("chapter", LmId(3), content("Three"), 2, false);

        let found = reg.retrieve_marker("chapter", 4, Boundary::AtOrBefore);
        assert_eq!(found.map(text_of).as_deref(), Some("Three"));
        assert!(reg.retrieve_marker("chapter", 1, Boundary::AtOrBefore).is_none());
    }

    #[test]
    fn ties_on_one_page_pick_the_last_captured() {
        let mut reg = MarkerRegistry::new();
        reg.add_marker("h", LmId(1), content("A"), 0, true);
        reg.add_marker("h", LmId(2), content("B"), 0, true);
        let found = reg.retrieve_marker("h", 0, Boundary::AtOrBefore).unwrap();
        assert_eq!(text_of(found), "B");
    }

    #[test]
    fn closed_marker_yields_to_open_one() {
        let mut reg = MarkerRegistry::new();
        // An outer section spanning pages 0..=3 with a nested subsection
        // that ends on page 1.
        reg.add_marker("s", LmId(1), content("Outer"), 0, true);
        reg.add_marker("s", LmId(2), content("Inner"), 1, true);
        reg.add_marker("s", LmId(2), content("Inner"), 1, false);

        assert_eq!(text_of(reg.retrieve_marker("s", 1, Boundary::AtOrBefore).unwrap()), "Inner");
        assert_eq!(text_of(reg.retrieve_marker("s", 3, Boundary::AtOrBefore).unwrap()), "Outer");
    }

    #[test]
    fn sequence_boundaries() {
        let mut reg = MarkerRegistry::new();
        reg.add_marker("h", LmId(1), content("A"), 0, true);
        reg.add_marker("h", LmId(2), content("B"), 2, true);
        reg.add_marker("other", LmId(3), content("X"), 3, true);

        assert_eq!(text_of(reg.retrieve_marker("h", 5, Boundary::FirstInSequence).unwrap()), "A");
        assert_eq!(text_of(reg.retrieve_marker("h", 0, Boundary::LastInSequence).unwrap()), "B");
        assert_eq!(text_of(reg.retrieve_marker("h", 1, Boundary::AtOrAfter).unwrap()), "B");
        assert!(reg.retrieve_marker("h", 3, Boundary::AtOrAfter).is_none());
    }
}
