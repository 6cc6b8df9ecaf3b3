//! # Page Break Decisions
//!
//! Which of the candidates collected for a full page to break after. Keeps,
//! orphans and widows have already been folded into each candidate's
//! `can_break_after` / `can_break_before` permissions; this module only walks
//! back from the last candidate looking for a permitted break.

use super::break_poss::BreakPoss;

/// Where to end a full page.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakDecision {
    /// Break after candidate `index`; everything later moves to the next
    /// page.
    Break { index: usize },
    /// Nothing within reach is permitted; break after the last candidate
    /// anyway.
    Forced { index: usize },
}

impl BreakDecision {
    pub fn index(&self) -> usize {
        match self {
            BreakDecision::Break { index } | BreakDecision::Forced { index } => *index,
        }
    }
}

/// Whether the page may end after candidate `k`. `next` stands in for the
/// candidate following the last one.
pub fn break_permitted(candidates: &[BreakPoss], next: Option<&BreakPoss>, k: usize) -> bool {
    let Some(here) = candidates.get(k) else {
        return false;
    };
    let before_ok = match candidates.get(k + 1) {
        Some(following) => following.can_break_before(),
        None => next.map_or(true, |n| n.can_break_before()),
    };
    here.can_break_after() && before_ok
}

/// Choose a break among `candidates` (all of which fit on the page).
/// `next` is the candidate that did not fit, if any. At most
/// `max_backtrack` candidates before the last one are considered.
pub fn choose_break(candidates: &[BreakPoss], next: Option<&BreakPoss>, max_backtrack: usize) -> BreakDecision {
    let Some(last) = candidates.len().checked_sub(1) else {
        return BreakDecision::Forced { index: 0 };
    };

    for step in 0..=max_backtrack.min(last) {
        let k = last - step;
        if break_permitted(candidates, next, k) {
            return BreakDecision::Break { index: k };
        }
    }

    BreakDecision::Forced { index: last }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::position::{LmId, Position};

    fn cand(i: usize, can_break_after: bool) -> BreakPoss {
        BreakPoss::new(Position::leaf(LmId(0), i), 20.0).with_can_break_after(can_break_after)
    }

    #[test]
    fn last_candidate_when_permitted() {
        let cands = vec![cand(0, true), cand(1, true), cand(2, true)];
        assert_eq!(choose_break(&cands, None, 16), BreakDecision::Break { index: 2 });
    }

    #[test]
    fn keep_together_walks_back() {
        // The last two belong to a block that must stay together.
        let cands = vec![cand(0, true), cand(1, false), cand(2, false)];
        assert_eq!(choose_break(&cands, None, 16), BreakDecision::Break { index: 0 });
    }

    #[test]
    fn keep_with_previous_on_the_overflowing_candidate() {
        let cands = vec![cand(0, true), cand(1, true)];
        let next = cand(2, true).with_can_break_before(false);
        assert_eq!(choose_break(&cands, Some(&next), 16), BreakDecision::Break { index: 0 });
    }

    #[test]
    fn orphan_control() {
        // Lines of a paragraph: a break after the first line would leave an
        // orphan, so only the break before the paragraph remains.
        let cands = vec![cand(0, true), cand(1, false)];
        let next = cand(2, true);
        assert_eq!(choose_break(&cands, Some(&next), 16), BreakDecision::Break { index: 0 });
    }

    #[test]
    fn backtrack_limit_forces_a_break() {
        let cands = vec![cand(0, true), cand(1, false), cand(2, false), cand(3, false)];
        assert_eq!(choose_break(&cands, None, 2), BreakDecision::Forced { index: 3 });
        assert_eq!(choose_break(&cands, None, 3), BreakDecision::Break { index: 0 });
    }

    #[test]
    fn permission_needs_both_sides() {
        let cands = vec![cand(0, true), cand(1, true).with_can_break_before(false), cand(2, false)];
        assert!(!break_permitted(&cands, None, 0));
        assert!(break_permitted(&cands, None, 1));
        assert!(!break_permitted(&cands, None, 2));
        assert!(!break_permitted(&cands, None, 3));
    }
}
